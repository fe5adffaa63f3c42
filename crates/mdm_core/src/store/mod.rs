//! Persistent device registry backed by SQLite.
//!
//! The store owns four tables: devices, the feature catalog, per-device
//! feature state and per-device last status. A single connection sits
//! behind a mutex, so store operations execute one at a time and every
//! caller observes them in a total order. Multi-row writes run inside a
//! transaction that is rolled back on any failure.

mod schema;

use crate::catalog::FeatureCatalog;
use crate::error::{StoreError, StoreResult};
use crate::types::{Device, DeviceFeatures, DeviceId, DeviceKey, DeviceStatus, DeviceType};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// One flat row of the feature join, before grouping by device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRow {
    /// Internal key of the device.
    pub key: i64,
    /// Stored external identifier.
    pub uuid: String,
    /// Feature name.
    pub name: String,
    /// Feature state.
    pub state: bool,
}

/// SQLite-backed device registry.
pub struct Store {
    conn: Mutex<Connection>,
    catalog: Arc<FeatureCatalog>,
}

impl Store {
    /// Opens or creates a store at `path`.
    pub fn open(path: &Path, catalog: Arc<FeatureCatalog>) -> StoreResult<Self> {
        let mut conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        schema::init(&mut conn, &catalog)?;

        debug!(path = %path.display(), features = catalog.len(), "opened device store");

        Ok(Self {
            conn: Mutex::new(conn),
            catalog,
        })
    }

    /// Creates an in-memory store (useful for tests).
    pub fn open_in_memory(catalog: Arc<FeatureCatalog>) -> StoreResult<Self> {
        let mut conn = Connection::open_in_memory()?;
        schema::init(&mut conn, &catalog)?;

        Ok(Self {
            conn: Mutex::new(conn),
            catalog,
        })
    }

    /// Returns the catalog this store seeds new devices from.
    pub fn catalog(&self) -> &FeatureCatalog {
        &self.catalog
    }

    /// Registers a device and seeds its default configuration.
    ///
    /// Idempotent: an already-known identifier keeps its key, type,
    /// configuration and status. Catalog features added since the first
    /// registration are backfilled with their defaults.
    pub fn register_device(&self, id: &DeviceId, device_type: DeviceType) -> StoreResult<DeviceKey> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let created = tx.execute(
            "INSERT INTO devices (uuid, type) VALUES (?1, ?2) ON CONFLICT (uuid) DO NOTHING",
            params![id.to_string(), device_type.as_i32()],
        )? == 1;
        let key = lookup_key(&tx, id)?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO device_features (device_id, feature_id, state)
                 VALUES (?1, (SELECT id FROM features WHERE name = ?2), ?3)
                 ON CONFLICT (device_id, feature_id) DO NOTHING",
            )?;
            for feature in self.catalog.iter() {
                stmt.execute(params![key.as_i64(), feature.name, feature.default])?;
            }
        }

        tx.commit()?;

        debug!(device_id = %id, %key, created, "device registration committed");
        Ok(key)
    }

    /// Looks up a device by external identifier.
    pub fn device(&self, id: &DeviceId) -> StoreResult<Device> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, uuid, type FROM devices WHERE uuid = ?1",
                params![id.to_string()],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, i32>(2)?)),
            )
            .optional()?;

        match row {
            Some((key, uuid, ty)) => decode_device(key, &uuid, ty),
            None => Err(StoreError::NotFound { device_id: *id }),
        }
    }

    /// Lists all registered devices ordered by key.
    pub fn list_devices(&self) -> StoreResult<Vec<Device>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, uuid, type FROM devices ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, i32>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(key, uuid, ty)| decode_device(key, &uuid, ty))
            .collect()
    }

    /// Returns the number of registered devices.
    pub fn device_count(&self) -> StoreResult<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM devices", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Overwrites the last reported status of a device.
    ///
    /// The battery level is range-checked by the schema; an out-of-range
    /// value fails with [`StoreError::Constraint`] and leaves the previous
    /// status untouched.
    pub fn update_status(&self, id: &DeviceId, location: &str, battery: i32) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let key = lookup_key(&tx, id)?;
        tx.execute(
            "INSERT INTO device_statuses (device_id, location, battery) VALUES (?1, ?2, ?3)
             ON CONFLICT (device_id) DO UPDATE
             SET location = excluded.location, battery = excluded.battery",
            params![key.as_i64(), location, battery],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Returns the last status reported by a device.
    pub fn status(&self, id: &DeviceId) -> StoreResult<DeviceStatus> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT d.id, d.uuid, s.location, s.battery
                 FROM devices AS d
                 LEFT JOIN device_statuses AS s ON s.device_id = d.id
                 WHERE d.uuid = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Err(StoreError::NotFound { device_id: *id }),
            Some((_, _, None, _)) | Some((_, _, _, None)) => {
                Err(StoreError::NoStatus { device_id: *id })
            }
            Some((key, uuid, Some(location), Some(battery))) => {
                decode_status(key, &uuid, location, battery)
            }
        }
    }

    /// Lists the status of every device that has pinged at least once.
    pub fn list_statuses(&self) -> StoreResult<Vec<DeviceStatus>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT d.id, d.uuid, s.location, s.battery
             FROM device_statuses AS s
             JOIN devices AS d ON d.id = s.device_id
             ORDER BY d.id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(key, uuid, location, battery)| decode_status(key, &uuid, location, battery))
            .collect()
    }

    /// Sets one feature of one device.
    pub fn set_feature(&self, id: &DeviceId, feature: &str, state: bool) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let key = lookup_key(&tx, id)?;
        let unknown = || StoreError::UnknownFeature {
            name: feature.to_string(),
        };
        // Names dropped from the catalog stay in the table but are retired.
        if !self.catalog.contains(feature) {
            return Err(unknown());
        }
        let feature_id: i64 = tx
            .query_row(
                "SELECT id FROM features WHERE name = ?1",
                params![feature],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(unknown)?;

        tx.execute(
            "INSERT INTO device_features (device_id, feature_id, state) VALUES (?1, ?2, ?3)
             ON CONFLICT (device_id, feature_id) DO UPDATE SET state = excluded.state",
            params![key.as_i64(), feature_id, state],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Returns the full configuration of one device.
    ///
    /// Only current catalog features are reported.
    pub fn features(&self, id: &DeviceId) -> StoreResult<DeviceFeatures> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let key = lookup_key(&tx, id)?;
        let features = {
            let mut stmt = tx.prepare(
                "SELECT f.name, df.state
                 FROM device_features AS df
                 JOIN features AS f ON f.id = df.feature_id
                 WHERE df.device_id = ?1",
            )?;
            let rows = stmt.query_map(params![key.as_i64()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
            })?;
            rows.filter(|row| {
                row.as_ref()
                    .map_or(true, |(name, _)| self.catalog.contains(name))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?
        };

        tx.commit()?;

        Ok(DeviceFeatures {
            key,
            id: *id,
            features,
        })
    }

    /// Returns the configuration of every device, one entry per device.
    pub fn list_features(&self) -> StoreResult<Vec<DeviceFeatures>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT d.id, d.uuid, f.name, df.state
             FROM device_features AS df
             JOIN features AS f ON f.id = df.feature_id
             JOIN devices AS d ON d.id = df.device_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(FeatureRow {
                    key: row.get(0)?,
                    uuid: row.get(1)?,
                    name: row.get(2)?,
                    state: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        group_feature_rows(
            rows.into_iter()
                .filter(|row| self.catalog.contains(&row.name)),
        )
    }
}

/// Groups flat feature rows into one configuration per device.
///
/// Grouping is keyed by internal key, so the result does not depend on
/// the order rows arrive in. Output is ordered by key.
pub fn group_feature_rows(
    rows: impl IntoIterator<Item = FeatureRow>,
) -> StoreResult<Vec<DeviceFeatures>> {
    let mut grouped: BTreeMap<i64, DeviceFeatures> = BTreeMap::new();

    for row in rows {
        match grouped.get_mut(&row.key) {
            Some(entry) => {
                entry.features.insert(row.name, row.state);
            }
            None => {
                let id = decode_id(&row.uuid)?;
                let mut features = BTreeMap::new();
                features.insert(row.name, row.state);
                grouped.insert(
                    row.key,
                    DeviceFeatures {
                        key: DeviceKey::new(row.key),
                        id,
                        features,
                    },
                );
            }
        }
    }

    Ok(grouped.into_values().collect())
}

fn lookup_key(tx: &Transaction<'_>, id: &DeviceId) -> StoreResult<DeviceKey> {
    tx.query_row(
        "SELECT id FROM devices WHERE uuid = ?1",
        params![id.to_string()],
        |row| row.get::<_, i64>(0),
    )
    .optional()?
    .map(DeviceKey::new)
    .ok_or(StoreError::NotFound { device_id: *id })
}

fn decode_id(uuid: &str) -> StoreResult<DeviceId> {
    DeviceId::parse(uuid).map_err(|e| StoreError::corrupt(format!("devices.uuid: {e}")))
}

fn decode_device(key: i64, uuid: &str, ty: i32) -> StoreResult<Device> {
    Ok(Device {
        key: DeviceKey::new(key),
        id: decode_id(uuid)?,
        device_type: DeviceType::try_from(ty)
            .map_err(|e| StoreError::corrupt(format!("devices.type: {e}")))?,
    })
}

fn decode_status(key: i64, uuid: &str, location: String, battery: i64) -> StoreResult<DeviceStatus> {
    Ok(DeviceStatus {
        key: DeviceKey::new(key),
        id: decode_id(uuid)?,
        location,
        battery: u8::try_from(battery)
            .map_err(|_| StoreError::corrupt(format!("device_statuses.battery: {battery}")))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CAMERA, STORAGE};
    use proptest::prelude::*;

    fn store() -> Store {
        Store::open_in_memory(Arc::new(FeatureCatalog::default())).unwrap()
    }

    #[test]
    fn register_seeds_defaults() {
        let store = store();
        let id = DeviceId::new_v4();

        store.register_device(&id, DeviceType::Android).unwrap();

        let features = store.features(&id).unwrap();
        assert_eq!(features.id, id);
        assert_eq!(features.features, store.catalog().defaults());
    }

    #[test]
    fn register_is_idempotent() {
        let store = store();
        let id = DeviceId::new_v4();

        let first = store.register_device(&id, DeviceType::Android).unwrap();
        store.set_feature(&id, CAMERA, true).unwrap();
        let second = store.register_device(&id, DeviceType::Windows).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.device_count().unwrap(), 1);

        let device = store.device(&id).unwrap();
        assert_eq!(device.device_type, DeviceType::Android);

        let features = store.features(&id).unwrap();
        assert_eq!(features.features.len(), 2);
        assert_eq!(features.features[CAMERA], true);
    }

    #[test]
    fn register_distinct_devices_get_distinct_keys() {
        let store = store();
        let a = store.register_device(&DeviceId::new_v4(), DeviceType::Ios).unwrap();
        let b = store.register_device(&DeviceId::new_v4(), DeviceType::Ios).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn register_rolls_back_on_seed_failure() {
        let store = store();
        store
            .conn
            .lock()
            .execute("DELETE FROM features WHERE name = ?1", params![STORAGE])
            .unwrap();

        let id = DeviceId::new_v4();
        let err = store.register_device(&id, DeviceType::Android).unwrap_err();
        assert!(matches!(err, StoreError::Constraint { .. }));

        assert!(matches!(store.device(&id), Err(StoreError::NotFound { .. })));
        let orphans: i64 = store
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM device_features", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn device_lookup() {
        let store = store();
        let id = DeviceId::new_v4();
        assert!(matches!(store.device(&id), Err(StoreError::NotFound { .. })));

        let key = store.register_device(&id, DeviceType::Ios).unwrap();
        let device = store.device(&id).unwrap();
        assert_eq!(device.key, key);
        assert_eq!(device.device_type, DeviceType::Ios);
    }

    #[test]
    fn status_round_trip_keeps_fields_apart() {
        let store = store();
        let id = DeviceId::new_v4();
        store.register_device(&id, DeviceType::Android).unwrap();

        assert!(matches!(store.status(&id), Err(StoreError::NoStatus { .. })));

        store.update_status(&id, "room-1", 80).unwrap();
        let status = store.status(&id).unwrap();
        assert_eq!(status.location, "room-1");
        assert_eq!(status.battery, 80);

        store.update_status(&id, "room-2", 7).unwrap();
        let status = store.status(&id).unwrap();
        assert_eq!(status.location, "room-2");
        assert_eq!(status.battery, 7);
    }

    #[test]
    fn status_rejects_out_of_range_battery() {
        let store = store();
        let id = DeviceId::new_v4();
        store.register_device(&id, DeviceType::Android).unwrap();
        store.update_status(&id, "lab", 50).unwrap();

        for battery in [-1, 101] {
            let err = store.update_status(&id, "elsewhere", battery).unwrap_err();
            assert!(matches!(err, StoreError::Constraint { .. }));
        }

        let status = store.status(&id).unwrap();
        assert_eq!(status.location, "lab");
        assert_eq!(status.battery, 50);
    }

    #[test]
    fn status_for_unknown_device() {
        let store = store();
        let id = DeviceId::new_v4();
        assert!(matches!(
            store.update_status(&id, "lab", 50),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(store.status(&id), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn list_statuses_skips_silent_devices() {
        let store = store();
        let pinged = DeviceId::new_v4();
        let silent = DeviceId::new_v4();
        store.register_device(&pinged, DeviceType::Android).unwrap();
        store.register_device(&silent, DeviceType::Android).unwrap();
        store.update_status(&pinged, "dock", 100).unwrap();

        let statuses = store.list_statuses().unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].id, pinged);
        assert_eq!(statuses[0].battery, 100);
    }

    #[test]
    fn set_feature_errors() {
        let store = store();
        let id = DeviceId::new_v4();
        assert!(matches!(
            store.set_feature(&id, CAMERA, true),
            Err(StoreError::NotFound { .. })
        ));

        store.register_device(&id, DeviceType::Android).unwrap();
        assert!(matches!(
            store.set_feature(&id, "gps", true),
            Err(StoreError::UnknownFeature { .. })
        ));
        assert!(matches!(store.features(&DeviceId::new_v4()), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn list_features_groups_per_device() {
        let store = store();
        let ids: Vec<_> = (0..3).map(|_| DeviceId::new_v4()).collect();
        for id in &ids {
            store.register_device(id, DeviceType::Android).unwrap();
        }
        store.set_feature(&ids[1], STORAGE, true).unwrap();

        let all = store.list_features().unwrap();
        assert_eq!(all.len(), 3);
        for entry in &all {
            assert_eq!(entry.features.len(), 2);
        }
        let second = all.iter().find(|f| f.id == ids[1]).unwrap();
        assert_eq!(second.features[STORAGE], true);
    }

    #[test]
    fn list_devices_in_key_order() {
        let store = store();
        let ids: Vec<_> = (0..4).map(|_| DeviceId::new_v4()).collect();
        for id in &ids {
            store.register_device(id, DeviceType::Windows).unwrap();
        }
        let listed: Vec<_> = store.list_devices().unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn grouping_rejects_corrupt_uuid() {
        let rows = vec![FeatureRow {
            key: 1,
            uuid: "garbage".into(),
            name: CAMERA.into(),
            state: true,
        }];
        assert!(matches!(group_feature_rows(rows), Err(StoreError::Corrupt { .. })));
    }

    fn interleaved_rows() -> Vec<FeatureRow> {
        let mut rows = Vec::new();
        for i in 0..3 {
            let uuid = DeviceId::new_v4().to_string();
            for (name, state) in [(CAMERA, i % 2 == 0), (STORAGE, i == 2)] {
                rows.push(FeatureRow {
                    key: i + 1,
                    uuid: uuid.clone(),
                    name: name.to_string(),
                    state,
                });
            }
        }
        rows
    }

    proptest! {
        /// Any interleaving of the same rows yields the same grouping.
        #[test]
        fn grouping_ignores_row_order(rows in Just(interleaved_rows()).prop_shuffle()) {
            let mut sorted = rows.clone();
            sorted.sort_by(|a, b| (a.key, &a.name).cmp(&(b.key, &b.name)));
            let expected = group_feature_rows(sorted).unwrap();

            let grouped = group_feature_rows(rows).unwrap();
            prop_assert_eq!(grouped.len(), 3);
            for entry in &grouped {
                prop_assert_eq!(entry.features.len(), 2);
            }
            prop_assert_eq!(grouped, expected);
        }
    }
}
