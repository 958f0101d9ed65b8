//! Subcommand implementations shared by the argument and menu front ends.

use chrono::{DateTime, Utc};
use civic_map_analytics_models::SummaryParams;
use civic_map_database::{db, queries, run_migrations};
use civic_map_database_models::{IncidentRow, MunicipalityRow};
use civic_map_jurisdiction::{JurisdictionCatalog, LocationResolver};
use civic_map_jurisdiction_models::{Coordinate, JurisdictionKind};
use civic_map_server::config::ServerConfig;
use std::sync::Arc;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Loads the catalog named by `CIVIC_MAP_CATALOG`, or the bundled one.
///
/// # Errors
///
/// Returns an error if the override file is unreadable or invalid.
pub fn load_catalog() -> Result<JurisdictionCatalog, Box<dyn std::error::Error>> {
    Ok(ServerConfig::from_env().load_catalog()?)
}

/// Prints the jurisdiction a coordinate resolves to.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub fn resolve(lat: f64, lng: f64) -> CliResult {
    let resolver = LocationResolver::new(Arc::new(load_catalog()?));
    let resolution = resolver.resolve_detailed(Coordinate::new(lat, lng));

    println!("{}", resolution.jurisdiction);
    if !resolution.matched {
        println!("  (no box contains {lat}, {lng}; using the default jurisdiction)");
    }

    Ok(())
}

/// Lists catalog jurisdictions, optionally narrowed by a search query.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded.
pub fn jurisdictions(query: Option<&str>) -> CliResult {
    let catalog = load_catalog()?;

    if let Some(query) = query {
        let matches = catalog.search(query);
        if matches.is_empty() {
            println!("No jurisdictions match '{query}'.");
        }
        for j in matches {
            println!("{j}");
        }
        return Ok(());
    }

    println!("Metropolitan municipalities:");
    for j in catalog.of_kind(JurisdictionKind::Metro) {
        println!("  {} ({})", j.name, j.province);
    }

    println!();
    println!("District municipalities:");
    for (province, districts) in catalog.districts_by_province() {
        println!("  {province}");
        for name in districts {
            println!("    {name}");
        }
    }

    println!();
    println!("Default: {}", catalog.default_jurisdiction());

    Ok(())
}

/// Classifies a transcript with the configured model and prints the
/// report as JSON.
///
/// # Errors
///
/// Returns an error if no model is configured or classification fails.
pub async fn classify(transcript: &str) -> CliResult {
    let provider = civic_map_ai::create_provider_from_env()?;
    let report = civic_map_ai::classify_transcript(provider.as_ref(), transcript).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Runs pending migrations against `DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if the connection or a migration fails.
pub async fn migrate() -> CliResult {
    let db = db::connect_from_env().await?;
    run_migrations(db.as_ref()).await?;
    println!("Migrations complete.");
    Ok(())
}

/// Runs migrations and upserts every catalog municipality.
///
/// # Errors
///
/// Returns an error if the catalog, connection or an upsert fails.
pub async fn seed() -> CliResult {
    let catalog = load_catalog()?;
    let db = db::connect_from_env().await?;
    run_migrations(db.as_ref()).await?;
    let count = civic_map_server::seed::seed_municipalities(db.as_ref(), &catalog).await?;
    println!("Seeded {count} municipalities.");
    Ok(())
}

/// Seeded rows whose name the catalog no longer knows. Submissions can
/// never resolve to these.
#[must_use]
pub fn missing_from_catalog<'a>(
    catalog: &JurisdictionCatalog,
    rows: &'a [MunicipalityRow],
) -> Vec<&'a MunicipalityRow> {
    rows.iter().filter(|row| catalog.find(&row.name).is_none()).collect()
}

/// Lists the municipalities stored in the database.
///
/// # Errors
///
/// Returns an error if the catalog, connection or the read fails.
pub async fn municipalities() -> CliResult {
    let catalog = load_catalog()?;
    let db = db::connect_from_env().await?;
    let rows = queries::list_municipalities(db.as_ref()).await?;

    if rows.is_empty() {
        println!("No municipalities stored. Run `seed` first.");
        return Ok(());
    }

    let mut province = None;
    for row in &rows {
        if province != Some(row.province.as_str()) {
            println!("{}", row.province);
            province = Some(row.province.as_str());
        }
        println!("  {} [{}] {} ({})", row.name, row.code, row.kind, row.id);
    }

    let missing = missing_from_catalog(&catalog, &rows);
    if !missing.is_empty() {
        println!();
        println!("Not in the current catalog:");
        for row in missing {
            println!("  {}", row.name);
        }
    }

    Ok(())
}

/// Prints the dashboard summary over every stored incident.
///
/// # Errors
///
/// Returns an error if the connection or the read fails.
pub async fn summary(since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> CliResult {
    let db = db::connect_from_env().await?;
    let incidents: Vec<_> = queries::fetch_incidents(db.as_ref())
        .await?
        .into_iter()
        .map(IncidentRow::into_incident)
        .collect();

    let summary = civic_map_analytics::summarize(&incidents, &SummaryParams { since, until });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str) -> MunicipalityRow {
        MunicipalityRow {
            id: "4f1c".to_string(),
            name: name.to_string(),
            code: "X".to_string(),
            kind: "metro".to_string(),
            province: "Gauteng".to_string(),
        }
    }

    #[test]
    fn flags_rows_the_catalog_does_not_know() {
        let catalog = JurisdictionCatalog::south_africa();
        let rows = vec![
            row("City of Johannesburg"),
            row("Mangaung"),
            row("Atlantis Metro"),
        ];

        let missing: Vec<&str> = missing_from_catalog(&catalog, &rows)
            .into_iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(missing, vec!["Atlantis Metro"]);
    }
}
