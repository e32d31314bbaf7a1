use std::path::Path;

use rusqlite::{Connection, params};
use tracing::info;

use crate::error::PipelineError;

pub const TABLE_NAME: &str = "speciesdata";
pub const WRITE_BATCH: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct RangeRecord {
    pub sid: i64,
    pub species: String,
    pub threshold: u32,
    pub source: String,
    pub scenario: String,
    pub year: String,
    pub geometry: String,
    pub area: f64,
}

pub trait RangeStore {
    fn replace(&mut self) -> Result<(), PipelineError>;
    fn append(&mut self, records: &[RangeRecord]) -> Result<(), PipelineError>;
}

pub struct SqliteRangeStore {
    conn: Connection,
}

impl SqliteRangeStore {
    pub fn open(path: &Path) -> Result<Self, PipelineError> {
        let conn = Connection::open(path).map_err(store_err)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, PipelineError> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Ok(Self { conn })
    }

    pub fn count_rows(&self) -> Result<i64, PipelineError> {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {TABLE_NAME}"), [], |row| {
                row.get(0)
            })
            .map_err(store_err)
    }

    pub fn rows_for_species(&self, species: &str) -> Result<i64, PipelineError> {
        self.conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {TABLE_NAME} WHERE species = ?1"),
                params![species],
                |row| row.get(0),
            )
            .map_err(store_err)
    }
}

impl RangeStore for SqliteRangeStore {
    fn replace(&mut self) -> Result<(), PipelineError> {
        self.conn
            .execute_batch(&format!(
                "DROP TABLE IF EXISTS {TABLE_NAME};
                 CREATE TABLE {TABLE_NAME} (
                     sid INTEGER PRIMARY KEY,
                     species TEXT NOT NULL,
                     threshold INTEGER NOT NULL,
                     source TEXT NOT NULL,
                     scenario TEXT NOT NULL,
                     year TEXT NOT NULL,
                     geometry TEXT NOT NULL,
                     area REAL NOT NULL
                 );"
            ))
            .map_err(store_err)
    }

    fn append(&mut self, records: &[RangeRecord]) -> Result<(), PipelineError> {
        let tx = self.conn.transaction().map_err(store_err)?;
        {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO {TABLE_NAME}
                     (sid, species, threshold, source, scenario, year, geometry, area)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ))
                .map_err(store_err)?;
            for record in records {
                stmt.execute(params![
                    record.sid,
                    record.species,
                    record.threshold,
                    record.source,
                    record.scenario,
                    record.year,
                    record.geometry,
                    record.area,
                ])
                .map_err(store_err)?;
            }
        }
        tx.commit().map_err(store_err)
    }
}

pub fn write_records(
    store: &mut dyn RangeStore,
    records: &[RangeRecord],
) -> Result<(), PipelineError> {
    store.replace()?;
    for batch in records.chunks(WRITE_BATCH) {
        store.append(batch)?;
    }
    info!(rows = records.len(), table = TABLE_NAME, "loaded aggregated table");
    Ok(())
}

fn store_err(err: rusqlite::Error) -> PipelineError {
    PipelineError::Store(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sid: i64, species: &str) -> RangeRecord {
        RangeRecord {
            sid,
            species: species.to_string(),
            threshold: 25,
            source: "vtech".to_string(),
            scenario: "current".to_string(),
            year: "2020".to_string(),
            geometry: "MULTIPOLYGON(((0 0,1 0,1 1,0 1,0 0)))".to_string(),
            area: 1.0,
        }
    }

    #[test]
    fn write_replaces_prior_table() {
        let mut store = SqliteRangeStore::open_in_memory().unwrap();
        let first: Vec<RangeRecord> = (0..7).map(|i| record(i, "abies-balsamea")).collect();
        write_records(&mut store, &first).unwrap();
        assert_eq!(store.count_rows().unwrap(), 7);

        let second: Vec<RangeRecord> = (0..3).map(|i| record(i, "acer-rubrum")).collect();
        write_records(&mut store, &second).unwrap();
        assert_eq!(store.count_rows().unwrap(), 3);
        assert_eq!(store.rows_for_species("abies-balsamea").unwrap(), 0);
        assert_eq!(store.rows_for_species("acer-rubrum").unwrap(), 3);
    }

    #[test]
    fn batches_exceeding_chunk_size_all_land() {
        let mut store = SqliteRangeStore::open_in_memory().unwrap();
        let records: Vec<RangeRecord> = (0..23).map(|i| record(i, "abies-balsamea")).collect();
        write_records(&mut store, &records).unwrap();
        assert_eq!(store.count_rows().unwrap(), 23);
    }
}
