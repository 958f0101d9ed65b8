//! Seeds the `municipalities` table from the jurisdiction catalog.
//!
//! Submissions resolve a position to a catalog name and look the id up by
//! that name, so every catalog jurisdiction needs a row.

use civic_map_database::{DbError, queries};
use civic_map_jurisdiction::JurisdictionCatalog;
use switchy_database::Database;

const SKIPPED_WORDS: &[&str] = &["of", "and", "the"];

/// Short code derived from a municipality name, e.g. `"City of Cape Town"`
/// becomes `"CCT"`.
#[must_use]
pub fn municipality_code(name: &str) -> String {
    name.split(|c: char| c.is_whitespace() || c == '-')
        .filter(|word| !word.is_empty())
        .filter(|word| !SKIPPED_WORDS.contains(&word.to_lowercase().as_str()))
        .filter_map(|word| word.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Upserts every catalog jurisdiction. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError`] if an upsert fails.
pub async fn seed_municipalities(
    db: &dyn Database,
    catalog: &JurisdictionCatalog,
) -> Result<usize, DbError> {
    let mut count = 0;

    for jurisdiction in catalog.jurisdictions() {
        let id = queries::upsert_municipality(
            db,
            &jurisdiction.name,
            &municipality_code(&jurisdiction.name),
            jurisdiction.kind.as_ref(),
            &jurisdiction.province,
            None,
        )
        .await?;
        log::debug!("Seeded {jurisdiction} as {id}");
        count += 1;
    }

    log::info!("Seeded {count} municipalit(ies)");

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_from_initials() {
        assert_eq!(municipality_code("City of Cape Town"), "CCT");
        assert_eq!(municipality_code("Nelson Mandela Bay"), "NMB");
        assert_eq!(municipality_code("Ekurhuleni"), "E");
        assert_eq!(municipality_code("Dr Kenneth Kaunda"), "DKK");
        assert_eq!(municipality_code("Sol Plaatje-Kimberley"), "SPK");
    }
}
