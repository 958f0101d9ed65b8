//! Database query functions for incidents and municipalities.
//!
//! Everything goes through `query_raw_params()`/`exec_raw_params()`. UUID
//! columns are cast to text on the way out and from text on the way in so
//! the rest of the workspace only ever sees `String` ids.

use chrono::{DateTime, NaiveDateTime, Utc};
use civic_map_database_models::{
    ChangeFingerprint, IncidentRow, MunicipalityRow, NewIncident, StatusChange,
};
use civic_map_incident_models::IncidentStatus;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

fn to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
}

fn opt_string(value: Option<&str>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |v| DatabaseValue::String(v.to_string()))
}

/// Reads every incident, newest first, joined with its municipality.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn fetch_incidents(db: &dyn Database) -> Result<Vec<IncidentRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT i.id::text AS id, i.incident_type, i.priority, i.status,
                    i.title, i.description, i.location_address,
                    i.location_lat, i.location_lng,
                    i.estimated_resolution_time, i.created_at, i.updated_at,
                    i.resolved_at,
                    m.name AS municipality_name, m.province AS province
             FROM incidents i
             LEFT JOIN municipalities m ON m.id = i.municipality_id
             ORDER BY i.created_at DESC",
            &[],
        )
        .await?;

    let mut incidents = Vec::with_capacity(rows.len());

    for row in &rows {
        let created_at: NaiveDateTime = row.to_value("created_at").map_err(|e| {
            DbError::Conversion {
                message: format!("Failed to parse incident created_at: {e}"),
            }
        })?;
        let eta: Option<NaiveDateTime> =
            row.to_value("estimated_resolution_time").unwrap_or(None);
        let updated_at: Option<NaiveDateTime> = row.to_value("updated_at").unwrap_or(None);
        let resolved_at: Option<NaiveDateTime> = row.to_value("resolved_at").unwrap_or(None);

        incidents.push(IncidentRow {
            id: row.to_value("id").unwrap_or_default(),
            incident_type: row.to_value("incident_type").unwrap_or_default(),
            priority: row.to_value("priority").unwrap_or(None),
            status: row.to_value("status").unwrap_or_default(),
            title: row.to_value("title").unwrap_or_default(),
            description: row.to_value("description").unwrap_or_default(),
            location_address: row.to_value("location_address").unwrap_or(None),
            location_lat: row.to_value("location_lat").unwrap_or(None),
            location_lng: row.to_value("location_lng").unwrap_or(None),
            municipality_name: row.to_value("municipality_name").unwrap_or(None),
            province: row.to_value("province").unwrap_or(None),
            estimated_resolution_time: eta.map(to_utc),
            created_at: to_utc(created_at),
            updated_at: updated_at.map(to_utc),
            resolved_at: resolved_at.map(to_utc),
        });
    }

    Ok(incidents)
}

/// Inserts a citizen submission and returns the new incident id.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails or returns no id.
pub async fn insert_incident(
    db: &dyn Database,
    incident: &NewIncident,
    now: DateTime<Utc>,
) -> Result<String, DbError> {
    let images = serde_json::to_string(&incident.images).map_err(|e| DbError::Conversion {
        message: format!("Failed to encode images: {e}"),
    })?;

    let rows = db
        .query_raw_params(
            "INSERT INTO incidents (
                 reporter_id, municipality_id, incident_type, priority, status,
                 title, description, location_lat, location_lng,
                 location_address, images, created_at, updated_at
             )
             VALUES ($1, $2::text::uuid, $3, $4, $5, $6, $7, $8, $9, $10, $11::text::jsonb, $12, $12)
             RETURNING id::text AS id",
            &[
                DatabaseValue::String(incident.reporter_id.clone()),
                DatabaseValue::String(incident.municipality_id.clone()),
                DatabaseValue::String(incident.incident_type.to_string()),
                DatabaseValue::String(incident.priority.to_string()),
                DatabaseValue::String(incident.status.to_string()),
                DatabaseValue::String(incident.title.clone()),
                DatabaseValue::String(incident.description.clone()),
                incident
                    .coordinates
                    .map_or(DatabaseValue::Null, |c| DatabaseValue::Real64(c.latitude)),
                incident
                    .coordinates
                    .map_or(DatabaseValue::Null, |c| DatabaseValue::Real64(c.longitude)),
                DatabaseValue::String(incident.location_address.clone()),
                DatabaseValue::String(images),
                DatabaseValue::DateTime(now.naive_utc()),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Failed to get incident id from insert".to_string(),
    })?;

    let id: String = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse incident id: {e}"),
    })?;

    Ok(id)
}

/// Applies a staff status change.
///
/// Sets `resolved_at` when the new status is `resolved`, replaces the ETA
/// only when one is given, and records an `incident_updates` row when the
/// change carries a message. Returns `false` if no incident has `id`.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn update_incident_status(
    db: &dyn Database,
    id: &str,
    change: &StatusChange,
    now: DateTime<Utc>,
) -> Result<bool, DbError> {
    let resolved_at = if change.status == IncidentStatus::Resolved {
        DatabaseValue::DateTime(now.naive_utc())
    } else {
        DatabaseValue::Null
    };

    let rows = db
        .query_raw_params(
            "UPDATE incidents SET
                 status = $2,
                 updated_at = $3,
                 resolved_at = COALESCE($4, resolved_at),
                 estimated_resolution_time = COALESCE($5, estimated_resolution_time)
             WHERE id = $1::text::uuid
             RETURNING id::text AS id",
            &[
                DatabaseValue::String(id.to_string()),
                DatabaseValue::String(change.status.to_string()),
                DatabaseValue::DateTime(now.naive_utc()),
                resolved_at,
                change
                    .eta
                    .map_or(DatabaseValue::Null, |eta| DatabaseValue::DateTime(eta.naive_utc())),
            ],
        )
        .await?;

    if rows.is_empty() {
        return Ok(false);
    }

    if let Some(message) = change.message.as_deref().filter(|m| !m.trim().is_empty()) {
        insert_incident_update(db, id, change, message, now).await?;
    }

    Ok(true)
}

async fn insert_incident_update(
    db: &dyn Database,
    incident_id: &str,
    change: &StatusChange,
    message: &str,
    now: DateTime<Utc>,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "INSERT INTO incident_updates (incident_id, user_id, message, status, eta_update, created_at)
         VALUES ($1::text::uuid, $2, $3, $4, $5, $6)",
        &[
            DatabaseValue::String(incident_id.to_string()),
            DatabaseValue::String(change.user_id.clone()),
            DatabaseValue::String(message.to_string()),
            DatabaseValue::String(change.status.to_string()),
            change
                .eta
                .map_or(DatabaseValue::Null, |eta| DatabaseValue::DateTime(eta.naive_utc())),
            DatabaseValue::DateTime(now.naive_utc()),
        ],
    )
    .await?;

    Ok(())
}

/// Reads the change-detection fingerprint of the incidents table.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn change_fingerprint(db: &dyn Database) -> Result<ChangeFingerprint, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT COUNT(*) AS count,
                    MAX(updated_at) AS max_updated_at,
                    MAX(created_at) AS max_created_at
             FROM incidents",
            &[],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(ChangeFingerprint::default());
    };

    let max_updated_at: Option<NaiveDateTime> = row.to_value("max_updated_at").unwrap_or(None);
    let max_created_at: Option<NaiveDateTime> = row.to_value("max_created_at").unwrap_or(None);

    Ok(ChangeFingerprint {
        count: row.to_value("count").unwrap_or(0),
        max_updated_at: max_updated_at.map(to_utc),
        max_created_at: max_created_at.map(to_utc),
    })
}

/// Looks up a municipality id by exact name.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn find_municipality_id(
    db: &dyn Database,
    name: &str,
) -> Result<Option<String>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id::text AS id FROM municipalities WHERE name = $1 LIMIT 1",
            &[DatabaseValue::String(name.to_string())],
        )
        .await?;

    Ok(rows.first().and_then(|row| row.to_value("id").ok()))
}

/// Lists every municipality ordered by province, then name.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_municipalities(db: &dyn Database) -> Result<Vec<MunicipalityRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id::text AS id, name, code, kind, province
             FROM municipalities
             ORDER BY province, name",
            &[],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| MunicipalityRow {
            id: row.to_value("id").unwrap_or_default(),
            name: row.to_value("name").unwrap_or_default(),
            code: row.to_value("code").unwrap_or_default(),
            kind: row.to_value("kind").unwrap_or_default(),
            province: row.to_value("province").unwrap_or_default(),
        })
        .collect())
}

/// Inserts or updates a municipality by name and returns its id.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn upsert_municipality(
    db: &dyn Database,
    name: &str,
    code: &str,
    kind: &str,
    province: &str,
    contact_email: Option<&str>,
) -> Result<String, DbError> {
    let rows = db
        .query_raw_params(
            "INSERT INTO municipalities (name, code, kind, province, contact_email)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (name) DO UPDATE SET
                 code = EXCLUDED.code,
                 kind = EXCLUDED.kind,
                 province = EXCLUDED.province
             RETURNING id::text AS id",
            &[
                DatabaseValue::String(name.to_string()),
                DatabaseValue::String(code.to_string()),
                DatabaseValue::String(kind.to_string()),
                DatabaseValue::String(province.to_string()),
                opt_string(contact_email),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: format!("Failed to get municipality id for {name}"),
    })?;

    let id: String = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse municipality id: {e}"),
    })?;

    Ok(id)
}
