use chrono::Utc;
use redb::ReadableTable;
use uuid::Uuid;

use crate::constants::ERR_EMISSIONS_NOT_FINITE;
use crate::db::{tables, Db};
use crate::error::{AppError, Result};
use crate::models::{Footprint, FootprintPatch, FootprintRecord, NewFootprint};

const BINCODE_CONFIG: bincode::config::Configuration = bincode::config::standard();

/// The footprint store: wraps the database with identity generation,
/// derived-field computation and update-merge semantics.
///
/// Sole owner and mutator of record state. Every operation is a single
/// transaction against the footprints table; there are no intermediate
/// observable states and no cross-record transactions. Concurrent
/// updates to the same id race at caller granularity (last write wins).
///
/// Operations are blocking; handlers call them via `spawn_blocking`.
#[derive(Clone)]
pub struct FootprintStore {
    db: Db,
}

impl FootprintStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create a footprint entry
    ///
    /// Assigns a fresh UUID v4 id and the creation timestamp, computes
    /// reward points from the submitted emissions, and persists the
    /// record. Rejects a non-finite emissions value, which would
    /// corrupt the derived field.
    pub fn create(&self, input: NewFootprint) -> Result<Footprint> {
        if !input.carbon_emissions.is_finite() {
            return Err(AppError::InvalidInput(ERR_EMISSIONS_NOT_FINITE.to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let record = FootprintRecord {
            user_id: input.user_id,
            activity: input.activity,
            carbon_emissions: input.carbon_emissions,
            reward_points: FootprintRecord::reward_points(input.carbon_emissions),
            created_at: Utc::now().timestamp(),
            updated_at: None,
        };

        let bytes = bincode::serde::encode_to_vec(&record, BINCODE_CONFIG)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(tables::FOOTPRINTS)?;
            table.insert(id.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;

        Ok(Footprint::from_record(id, record))
    }

    /// Return all stored footprints; order is unspecified
    pub fn get_all(&self) -> Result<Vec<Footprint>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::FOOTPRINTS)?;

        let mut footprints = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            let (record, _): (FootprintRecord, usize) =
                bincode::serde::decode_from_slice(value.value(), BINCODE_CONFIG)?;
            footprints.push(Footprint::from_record(key.value().to_string(), record));
        }

        Ok(footprints)
    }

    /// Look up a footprint by id
    pub fn get(&self, id: &str) -> Result<Footprint> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::FOOTPRINTS)?;

        let record: FootprintRecord = table
            .get(id)?
            .map(|guard| bincode::serde::decode_from_slice(guard.value(), BINCODE_CONFIG))
            .transpose()?
            .map(|(record, _)| record)
            .ok_or(AppError::FootprintNotFound)?;

        Ok(Footprint::from_record(id.to_string(), record))
    }

    /// Merge a patch over an existing footprint
    ///
    /// Patch fields win; omitted fields keep their stored value. Reward
    /// points are recomputed from the merged emissions and the update
    /// timestamp is set. The read-merge-write happens inside one write
    /// transaction.
    pub fn update(&self, id: &str, patch: FootprintPatch) -> Result<Footprint> {
        if let Some(carbon_emissions) = patch.carbon_emissions {
            if !carbon_emissions.is_finite() {
                return Err(AppError::InvalidInput(ERR_EMISSIONS_NOT_FINITE.to_string()));
            }
        }

        let write_txn = self.db.begin_write()?;
        let record = {
            let mut table = write_txn.open_table(tables::FOOTPRINTS)?;

            let mut record: FootprintRecord = table
                .get(id)?
                .map(|guard| bincode::serde::decode_from_slice(guard.value(), BINCODE_CONFIG))
                .transpose()?
                .map(|(record, _)| record)
                .ok_or(AppError::FootprintNotFound)?;

            record.apply_patch(patch);
            record.updated_at = Some(Utc::now().timestamp());

            let bytes = bincode::serde::encode_to_vec(&record, BINCODE_CONFIG)?;
            table.insert(id, bytes.as_slice())?;

            record
        };
        write_txn.commit()?;

        Ok(Footprint::from_record(id.to_string(), record))
    }

    /// Delete a footprint permanently, returning its prior state
    ///
    /// There is no tombstoning; a removed id answers FootprintNotFound
    /// on every subsequent call.
    pub fn remove(&self, id: &str) -> Result<Footprint> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut table = write_txn.open_table(tables::FOOTPRINTS)?;

            let record = match table.remove(id)? {
                Some(guard) => {
                    let (record, _): (FootprintRecord, usize) =
                        bincode::serde::decode_from_slice(guard.value(), BINCODE_CONFIG)?;
                    record
                }
                None => return Err(AppError::FootprintNotFound),
            };
            record
        };
        write_txn.commit()?;

        Ok(Footprint::from_record(id.to_string(), record))
    }

    /// Probe database connectivity (used by the health endpoint)
    pub fn ping(&self) -> Result<()> {
        self.db.begin_read()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_footprint(carbon_emissions: f64) -> NewFootprint {
        NewFootprint {
            user_id: "u1".to_string(),
            activity: "bike".to_string(),
            carbon_emissions,
        }
    }

    fn test_store() -> (TempDir, FootprintStore) {
        let temp_dir = TempDir::new().unwrap();
        let db = crate::db::open_database(temp_dir.path().join("test.db")).unwrap();
        (temp_dir, FootprintStore::new(db))
    }

    #[test]
    fn test_create_assigns_derived_fields() {
        let (_dir, store) = test_store();

        let footprint = store.create(new_footprint(25.0)).unwrap();

        assert!(!footprint.id.is_empty());
        assert_eq!(footprint.reward_points, 2);
        assert!(footprint.updated_at.is_none());
    }

    #[test]
    fn test_create_assigns_unique_ids() {
        let (_dir, store) = test_store();

        let a = store.create(new_footprint(25.0)).unwrap();
        let b = store.create(new_footprint(25.0)).unwrap();

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_create_rejects_non_finite_emissions() {
        let (_dir, store) = test_store();

        assert!(matches!(
            store.create(new_footprint(f64::NAN)),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            store.create(new_footprint(f64::INFINITY)),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_get_round_trips_created_record() {
        let (_dir, store) = test_store();

        let created = store.create(new_footprint(25.0)).unwrap();
        let fetched = store.get(&created.id).unwrap();

        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.user_id, created.user_id);
        assert_eq!(fetched.activity, created.activity);
        assert_eq!(fetched.carbon_emissions, created.carbon_emissions);
        assert_eq!(fetched.reward_points, created.reward_points);
        assert_eq!(fetched.created_at, created.created_at);
        assert_eq!(fetched.updated_at, created.updated_at);
    }

    #[test]
    fn test_get_missing_id_is_not_found() {
        let (_dir, store) = test_store();

        assert!(matches!(
            store.get("no-such-id"),
            Err(AppError::FootprintNotFound)
        ));
    }

    #[test]
    fn test_update_recomputes_reward_points() {
        let (_dir, store) = test_store();

        let created = store.create(new_footprint(25.0)).unwrap();
        let updated = store
            .update(
                &created.id,
                FootprintPatch {
                    carbon_emissions: Some(47.0),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.carbon_emissions, 47.0);
        assert_eq!(updated.reward_points, 4);
        assert!(updated.updated_at.is_some());
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn test_update_without_emissions_keeps_points() {
        let (_dir, store) = test_store();

        let created = store.create(new_footprint(25.0)).unwrap();
        let updated = store
            .update(
                &created.id,
                FootprintPatch {
                    activity: Some("train".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.activity, "train");
        assert_eq!(updated.user_id, "u1");
        assert_eq!(updated.carbon_emissions, 25.0);
        assert_eq!(updated.reward_points, 2);
    }

    #[test]
    fn test_update_missing_id_is_not_found() {
        let (_dir, store) = test_store();

        assert!(matches!(
            store.update("no-such-id", FootprintPatch::default()),
            Err(AppError::FootprintNotFound)
        ));
    }

    #[test]
    fn test_remove_returns_prior_state_once() {
        let (_dir, store) = test_store();

        let created = store.create(new_footprint(25.0)).unwrap();
        let removed = store.remove(&created.id).unwrap();

        assert_eq!(removed.id, created.id);
        assert_eq!(removed.carbon_emissions, 25.0);

        assert!(matches!(
            store.get(&created.id),
            Err(AppError::FootprintNotFound)
        ));
        assert!(matches!(
            store.remove(&created.id),
            Err(AppError::FootprintNotFound)
        ));
    }

    #[test]
    fn test_get_all_returns_every_record() {
        let (_dir, store) = test_store();

        assert!(store.get_all().unwrap().is_empty());

        let a = store.create(new_footprint(25.0)).unwrap();
        let b = store.create(new_footprint(47.0)).unwrap();

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|f| f.id == a.id));
        assert!(all.iter().any(|f| f.id == b.id));
    }

    #[test]
    fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let id = {
            let db = crate::db::open_database(&db_path).unwrap();
            let store = FootprintStore::new(db);
            store.create(new_footprint(25.0)).unwrap().id
        };

        let db = crate::db::open_database(&db_path).unwrap();
        let store = FootprintStore::new(db);
        let fetched = store.get(&id).unwrap();

        assert_eq!(fetched.carbon_emissions, 25.0);
        assert_eq!(fetched.reward_points, 2);
    }
}
