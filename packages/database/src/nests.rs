//! Nest store.
//!
//! Each run replaces the whole `nests` table. Rows are first written to
//! `nests_staging`; [`swap_staged`] then replaces `nests` inside one
//! transaction, so a failed run leaves the previous nests in place.

use chrono::{DateTime, Utc};
use duckdb::Connection;
use nestwatch_nest_models::{Coordinate, NestCandidate, SpawnPoint, SpawnPointId, SpeciesId};

use crate::{DbError, format_timestamp, parse_timestamp};

/// Number of rows per INSERT chunk.
const CHUNK_SIZE: usize = 2_000;

const COLUMNS: &str = "area, spawnpoint_id, species, count, average, ratio, lat, lon, updated_at";

/// A stored nest row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredNest {
    /// The nest.
    pub nest: NestCandidate,
    /// When the run that produced it finished.
    pub updated_at: DateTime<Utc>,
}

/// Creates the `nests` table if it does not exist.
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails.
pub fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(&table_ddl("nests"))?;
    Ok(())
}

fn table_ddl(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            area TEXT NOT NULL,
            spawnpoint_id TEXT NOT NULL,
            species TEXT NOT NULL,
            count BIGINT NOT NULL,
            average DOUBLE NOT NULL,
            ratio DOUBLE NOT NULL,
            lat DOUBLE NOT NULL,
            lon DOUBLE NOT NULL,
            updated_at TIMESTAMP NOT NULL
        );"
    )
}

/// Writes `nests` into a fresh `nests_staging` table.
///
/// Any leftover staging table from an aborted run is dropped first.
/// Returns the number of staged rows.
///
/// # Errors
///
/// Returns [`DbError`] if a statement fails or a count does not fit.
pub fn stage(
    conn: &Connection,
    nests: &[NestCandidate],
    updated_at: DateTime<Utc>,
) -> Result<u64, DbError> {
    conn.execute_batch("DROP TABLE IF EXISTS nests_staging;")?;
    conn.execute_batch(&table_ddl("nests_staging"))?;

    let updated_at = format_timestamp(&updated_at);
    let mut total = 0u64;

    for chunk in nests.chunks(CHUNK_SIZE) {
        let mut sql = format!("INSERT INTO nests_staging ({COLUMNS}) VALUES ");
        for i in 0..chunk.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str("(?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP))");
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut param_idx = 1usize;

        for nest in chunk {
            let count = i64::try_from(nest.count).map_err(|e| DbError::Conversion {
                message: format!("nest count {} out of range: {e}", nest.count),
            })?;

            stmt.raw_bind_parameter(param_idx, &nest.area)?;
            stmt.raw_bind_parameter(param_idx + 1, nest.spawnpoint.id.as_str())?;
            stmt.raw_bind_parameter(param_idx + 2, nest.species.as_str())?;
            stmt.raw_bind_parameter(param_idx + 3, count)?;
            stmt.raw_bind_parameter(param_idx + 4, nest.average)?;
            stmt.raw_bind_parameter(param_idx + 5, nest.ratio)?;
            stmt.raw_bind_parameter(param_idx + 6, nest.spawnpoint.coordinate.lat)?;
            stmt.raw_bind_parameter(param_idx + 7, nest.spawnpoint.coordinate.lon)?;
            stmt.raw_bind_parameter(param_idx + 8, &updated_at)?;
            param_idx += 9;
        }

        let rows = stmt.raw_execute()?;
        total += u64::try_from(rows).unwrap_or(0);
    }

    log::debug!("Staged {total} nests");

    Ok(total)
}

/// Replaces `nests` with the staged rows in one transaction and drops the
/// staging table.
///
/// # Errors
///
/// Returns [`DbError`] if nothing is staged or the transaction fails; the
/// `nests` table is left untouched in that case.
pub fn swap_staged(conn: &mut Connection) -> Result<u64, DbError> {
    let staged: i64 = conn
        .prepare(
            "SELECT COUNT(*) FROM information_schema.tables
             WHERE table_name = 'nests_staging'",
        )?
        .query_row([], |row| row.get(0))?;

    if staged == 0 {
        return Err(DbError::Conversion {
            message: "no staged nests to swap in".to_string(),
        });
    }

    let tx = conn.transaction()?;
    tx.execute_batch("DELETE FROM nests;")?;
    let inserted = tx.execute(
        &format!("INSERT INTO nests ({COLUMNS}) SELECT {COLUMNS} FROM nests_staging"),
        [],
    )?;
    tx.execute_batch("DROP TABLE nests_staging;")?;
    tx.commit()?;

    log::info!("Replaced nest table with {inserted} rows");

    Ok(u64::try_from(inserted).unwrap_or(0))
}

/// Stages `nests` and swaps them in.
///
/// # Errors
///
/// Returns [`DbError`] if staging or the swap fails.
pub fn replace(
    conn: &mut Connection,
    nests: &[NestCandidate],
    updated_at: DateTime<Utc>,
) -> Result<u64, DbError> {
    stage(conn, nests, updated_at)?;
    swap_staged(conn)
}

/// Loads every stored nest ordered by area, then average and count
/// descending.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be converted.
pub fn load(conn: &Connection) -> Result<Vec<StoredNest>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT area, spawnpoint_id, species, count, average, ratio, lat, lon, updated_at::TEXT
         FROM nests
         ORDER BY area, average DESC, count DESC, spawnpoint_id",
    )?;
    let mut rows = stmt.query([])?;

    let mut nests = Vec::new();
    while let Some(row) = rows.next()? {
        let count: i64 = row.get(3)?;
        let updated_at: String = row.get(8)?;

        let count = u64::try_from(count).map_err(|e| DbError::Conversion {
            message: format!("negative nest count {count}: {e}"),
        })?;
        let Some(updated_at) = parse_timestamp(&updated_at) else {
            return Err(DbError::Conversion {
                message: format!("invalid updated_at {updated_at:?}"),
            });
        };

        nests.push(StoredNest {
            nest: NestCandidate {
                area: row.get(0)?,
                spawnpoint: SpawnPoint {
                    id: SpawnPointId::new(row.get::<_, String>(1)?),
                    coordinate: Coordinate::new(row.get(6)?, row.get(7)?),
                },
                species: SpeciesId::new(row.get::<_, String>(2)?),
                count,
                average: row.get(4)?,
                ratio: row.get(5)?,
            },
            updated_at,
        });
    }

    Ok(nests)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        conn
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, hour, 0, 0).unwrap()
    }

    fn nest(area: &str, spawnpoint: &str, species: &str, count: u64) -> NestCandidate {
        #[allow(clippy::cast_precision_loss)]
        let average = count as f64 / 24.0;
        NestCandidate {
            area: area.to_string(),
            spawnpoint: SpawnPoint {
                id: SpawnPointId::from(spawnpoint),
                coordinate: Coordinate::new(52.5, 13.4),
            },
            species: SpeciesId::from(species),
            count,
            average,
            ratio: 1.0,
        }
    }

    #[test]
    fn replace_supersedes_previous_run() {
        let mut conn = conn();

        replace(
            &mut conn,
            &[nest("Park", "a", "Eevee", 10), nest("Park", "b", "Eevee", 12)],
            at(1),
        )
        .unwrap();
        assert_eq!(load(&conn).unwrap().len(), 2);

        let written = replace(&mut conn, &[nest("Park", "c", "Rattata", 9)], at(2)).unwrap();
        assert_eq!(written, 1);

        let stored = load(&conn).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].nest, nest("Park", "c", "Rattata", 9));
        assert_eq!(stored[0].updated_at, at(2));
    }

    #[test]
    fn staging_alone_does_not_touch_published_nests() {
        let mut conn = conn();
        replace(&mut conn, &[nest("Park", "a", "Eevee", 10)], at(1)).unwrap();

        stage(&conn, &[], at(2)).unwrap();

        let stored = load(&conn).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].updated_at, at(1));
    }

    #[test]
    fn swap_without_staging_fails_and_keeps_nests() {
        let mut conn = conn();
        replace(&mut conn, &[nest("Park", "a", "Eevee", 10)], at(1)).unwrap();

        assert!(matches!(
            swap_staged(&mut conn),
            Err(DbError::Conversion { .. })
        ));
        assert_eq!(load(&conn).unwrap().len(), 1);
    }

    #[test]
    fn empty_run_clears_table() {
        let mut conn = conn();
        replace(&mut conn, &[nest("Park", "a", "Eevee", 10)], at(1)).unwrap();
        assert_eq!(replace(&mut conn, &[], at(2)).unwrap(), 0);
        assert!(load(&conn).unwrap().is_empty());
    }

    #[test]
    fn load_orders_by_area_then_average() {
        let mut conn = conn();
        replace(
            &mut conn,
            &[
                nest("Zoo", "z", "Eevee", 30),
                nest("Park", "a", "Eevee", 10),
                nest("Park", "b", "Eevee", 20),
            ],
            at(1),
        )
        .unwrap();

        let order: Vec<(String, String)> = load(&conn)
            .unwrap()
            .into_iter()
            .map(|s| (s.nest.area, s.nest.spawnpoint.id.to_string()))
            .collect();
        assert_eq!(
            order,
            [
                ("Park".to_string(), "b".to_string()),
                ("Park".to_string(), "a".to_string()),
                ("Zoo".to_string(), "z".to_string()),
            ]
        );
    }
}
