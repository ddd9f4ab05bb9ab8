//! Scanner sighting storage.
//!
//! The `sightings` table is written by the scanner and only read here,
//! except for [`insert_sightings`] which imports rows (and seeds tests).
//! Columns are nullable so incomplete scanner rows reach the analyzer and
//! are reported there instead of silently vanishing in SQL.

use std::path::Path;

use duckdb::{Connection, ToSql};
use nestwatch_analyze::{SightingQuery, SightingSource};
use nestwatch_nest_models::RawSighting;

use crate::{DbError, format_timestamp, parse_timestamp};

/// Number of rows per INSERT chunk.
const CHUNK_SIZE: usize = 5_000;

/// Opens (or creates) the scanner `DuckDB` and ensures the schema exists.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    crate::paths::ensure_parent(path)?;

    let conn = Connection::open(path)?;

    conn.execute_batch(
        "SET threads = 4;
         SET memory_limit = '512MB';",
    )?;

    create_schema(&conn)?;

    Ok(conn)
}

/// Creates the `sightings` and `nests` tables if they do not exist.
///
/// # Errors
///
/// Returns [`DbError`] if a statement fails.
pub fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sightings (
            species TEXT,
            spawnpoint_id TEXT,
            lat DOUBLE,
            lon DOUBLE,
            seen_at TIMESTAMP,
            confirmed BOOLEAN NOT NULL DEFAULT FALSE
        );

        CREATE INDEX IF NOT EXISTS sightings_spawnpoint_idx
            ON sightings (spawnpoint_id, species);",
    )?;

    crate::nests::create_schema(conn)?;

    Ok(())
}

/// Appends sightings to the `sightings` table.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError`] if any insert fails.
pub fn insert_sightings(conn: &Connection, sightings: &[RawSighting]) -> Result<u64, DbError> {
    if sightings.is_empty() {
        return Ok(0);
    }

    let mut total_inserted = 0u64;

    for chunk in sightings.chunks(CHUNK_SIZE) {
        let mut sql = String::from(
            "INSERT INTO sightings (species, spawnpoint_id, lat, lon, seen_at, confirmed) VALUES ",
        );
        for i in 0..chunk.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str("(?, ?, ?, ?, CAST(? AS TIMESTAMP), ?)");
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut param_idx = 1usize;

        for sighting in chunk {
            stmt.raw_bind_parameter(param_idx, &sighting.species)?;
            stmt.raw_bind_parameter(param_idx + 1, &sighting.spawnpoint_id)?;
            stmt.raw_bind_parameter(param_idx + 2, sighting.lat)?;
            stmt.raw_bind_parameter(param_idx + 3, sighting.lon)?;
            stmt.raw_bind_parameter(
                param_idx + 4,
                sighting.seen_at.as_ref().map(format_timestamp),
            )?;
            stmt.raw_bind_parameter(param_idx + 5, sighting.confirmed)?;
            param_idx += 6;
        }

        let rows = stmt.raw_execute()?;
        total_inserted += u64::try_from(rows).unwrap_or(0);
    }

    Ok(total_inserted)
}

/// Returns the number of rows in the `sightings` table.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get_record_count(conn: &Connection) -> Result<u64, DbError> {
    let count: i64 = conn
        .prepare("SELECT COUNT(*) FROM sightings")?
        .query_row([], |row| row.get(0))?;
    u64::try_from(count).map_err(|e| DbError::Conversion {
        message: format!("negative row count {count}: {e}"),
    })
}

/// Bounding box filter. Rows without a coordinate pass so the analyzer
/// can count them as malformed.
const BOUNDS_FILTER: &str = "(s.lat IS NULL OR s.lon IS NULL
         OR (s.lat BETWEEN ? AND ? AND s.lon BETWEEN ? AND ?))";

/// A [`SightingSource`] backed by the `sightings` table.
pub struct DuckDbSightingSource<'a> {
    conn: &'a Connection,
}

impl<'a> DuckDbSightingSource<'a> {
    /// Wraps an open connection.
    #[must_use]
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn query_sql(since: bool) -> String {
        if since {
            // Only combinations whose latest sighting falls inside the
            // window; their full history is returned.
            format!(
                "WITH recent AS (
                    SELECT spawnpoint_id, species
                    FROM sightings
                    GROUP BY spawnpoint_id, species
                    HAVING MAX(seen_at) >= CAST(? AS TIMESTAMP)
                )
                SELECT s.species, s.spawnpoint_id, s.lat, s.lon, s.seen_at::TEXT, s.confirmed
                FROM sightings s
                JOIN recent r
                  ON s.spawnpoint_id = r.spawnpoint_id AND s.species = r.species
                WHERE {BOUNDS_FILTER}"
            )
        } else {
            format!(
                "SELECT s.species, s.spawnpoint_id, s.lat, s.lon, s.seen_at::TEXT, s.confirmed
                 FROM sightings s
                 WHERE {BOUNDS_FILTER}"
            )
        }
    }
}

impl SightingSource for DuckDbSightingSource<'_> {
    type Error = DbError;

    fn sightings(&self, query: &SightingQuery) -> Result<Vec<RawSighting>, Self::Error> {
        let mut stmt = self.conn.prepare(&Self::query_sql(query.since.is_some()))?;

        let since = query.since.as_ref().map(format_timestamp);
        let mut params: Vec<&dyn ToSql> = Vec::with_capacity(5);
        if let Some(since) = &since {
            params.push(since);
        }
        params.push(&query.bounds.min_lat);
        params.push(&query.bounds.max_lat);
        params.push(&query.bounds.min_lon);
        params.push(&query.bounds.max_lon);

        let mut rows = stmt.query(params.as_slice())?;
        let mut sightings = Vec::new();

        while let Some(row) = rows.next()? {
            let seen_at: Option<String> = row.get(4)?;
            sightings.push(RawSighting {
                species: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                spawnpoint_id: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                lat: row.get(2)?,
                lon: row.get(3)?,
                seen_at: seen_at.as_deref().and_then(parse_timestamp),
                confirmed: row.get::<_, Option<bool>>(5)?.unwrap_or(false),
            });
        }

        log::debug!("Fetched {} sightings", sightings.len());

        Ok(sightings)
    }
}
