//! Relational schema and startup seeding.

use crate::catalog::FeatureCatalog;
use crate::error::StoreResult;
use rusqlite::{params, Connection};

/// Tables of the device registry. Safe to run on every open.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS devices (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid TEXT    NOT NULL UNIQUE,
    type INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS features (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT    NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS device_features (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id  INTEGER NOT NULL REFERENCES devices(id),
    feature_id INTEGER NOT NULL REFERENCES features(id),
    state      INTEGER NOT NULL CHECK (state IN (0, 1)),
    UNIQUE (device_id, feature_id)
);

CREATE TABLE IF NOT EXISTS device_statuses (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id INTEGER NOT NULL UNIQUE REFERENCES devices(id),
    location  TEXT    NOT NULL,
    battery   INTEGER NOT NULL CHECK (battery BETWEEN 0 AND 100)
);
";

/// Creates missing tables, inserts catalog names not yet known and gives
/// every existing device an entry for each catalog feature.
///
/// Entries a device already has keep their state.
pub(crate) fn init(conn: &mut Connection, catalog: &FeatureCatalog) -> StoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA)?;
    {
        let mut names =
            tx.prepare("INSERT INTO features (name) VALUES (?1) ON CONFLICT (name) DO NOTHING")?;
        let mut backfill = tx.prepare(
            "INSERT INTO device_features (device_id, feature_id, state)
             SELECT d.id, f.id, ?2 FROM devices AS d, features AS f WHERE f.name = ?1
             ON CONFLICT (device_id, feature_id) DO NOTHING",
        )?;
        for feature in catalog.iter() {
            names.execute(params![feature.name])?;
            backfill.execute(params![feature.name, feature.default])?;
        }
    }
    tx.commit()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_count(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
             ('devices', 'features', 'device_features', 'device_statuses')",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn init_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        let catalog = FeatureCatalog::default();

        init(&mut conn, &catalog).unwrap();
        init(&mut conn, &catalog).unwrap();

        assert_eq!(table_count(&conn), 4);
        let features: i64 = conn
            .query_row("SELECT COUNT(*) FROM features", [], |row| row.get(0))
            .unwrap();
        assert_eq!(features, 2);
    }

    #[test]
    fn init_adds_new_catalog_names() {
        let mut conn = Connection::open_in_memory().unwrap();
        init(&mut conn, &FeatureCatalog::default()).unwrap();

        let extended =
            FeatureCatalog::from_pairs([("camera", false), ("storage", false), ("gps", true)])
                .unwrap();
        init(&mut conn, &extended).unwrap();

        let features: i64 = conn
            .query_row("SELECT COUNT(*) FROM features", [], |row| row.get(0))
            .unwrap();
        assert_eq!(features, 3);
    }

    #[test]
    fn init_backfills_existing_devices() {
        let mut conn = Connection::open_in_memory().unwrap();
        init(&mut conn, &FeatureCatalog::default()).unwrap();
        conn.execute("INSERT INTO devices (uuid, type) VALUES ('a', 0), ('b', 1)", [])
            .unwrap();

        let extended =
            FeatureCatalog::from_pairs([("camera", false), ("storage", false), ("gps", true)])
                .unwrap();
        init(&mut conn, &extended).unwrap();

        let gps_on: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM device_features AS df
                 JOIN features AS f ON f.id = df.feature_id
                 WHERE f.name = 'gps' AND df.state = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(gps_on, 2);
        let entries: i64 = conn
            .query_row("SELECT COUNT(*) FROM device_features", [], |row| row.get(0))
            .unwrap();
        assert_eq!(entries, 6);
    }
}
