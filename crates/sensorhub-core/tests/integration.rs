//! Integration tests for sensorhub-core.
//!
//! Every scenario runs against both backends:
//! payload → normalize → store → query/mutate.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use sensorhub_core::{
    Device, DeviceChanges, DeviceRegistry, Error, Measurement, ReadingChanges, RecordStore,
    SqliteStore, StorageConfig, Stores, ingest, open,
};

fn payload(v: Value) -> Map<String, Value> {
    v.as_object().unwrap().clone()
}

fn backends() -> Vec<(&'static str, Stores, Option<tempfile::TempDir>)> {
    let tmp = tempfile::tempdir().unwrap();
    let sqlite = open(&StorageConfig::Sqlite {
        path: tmp.path().join("nested").join("sensorhub.db"),
    })
    .unwrap();
    vec![
        ("memory", open(&StorageConfig::default()).unwrap(), None),
        ("sqlite", sqlite, Some(tmp)),
    ]
}

fn ingest(stores: &Stores, body: Value) -> sensorhub_core::Result<sensorhub_core::TelemetryRecord> {
    let reading = ingest::normalize(payload(body), Utc::now())?;
    stores.records.insert(reading)
}

#[test]
fn ingest_without_timestamp_gets_parseable_one() {
    for (name, stores, _tmp) in backends() {
        let r = ingest(&stores, json!({"device_id": "sensor001"})).unwrap();
        let ts = serde_json::to_value(&r).unwrap()["timestamp"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(
            DateTime::parse_from_rfc3339(&ts).is_ok(),
            "[{name}] timestamp {ts} does not parse"
        );
    }
}

#[test]
fn ingest_without_device_id_creates_nothing() {
    for (name, stores, _tmp) in backends() {
        let err = ingest(&stores, json!({"temperature": 20})).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "[{name}]");
        assert_eq!(stores.records.count().unwrap(), 0, "[{name}]");
    }
}

#[test]
fn ingest_coerces_string_measurements() {
    for (name, stores, _tmp) in backends() {
        let r = ingest(
            &stores,
            json!({"device_id": "sensor001", "temperature": "21.5", "battery": "80"}),
        )
        .unwrap();
        let stored = stores.records.get(r.id).unwrap().unwrap();
        assert_eq!(stored.temperature, Some(Measurement::Float(21.5)), "[{name}]");
        assert_eq!(stored.battery, Some(Measurement::Integer(80)), "[{name}]");
    }
}

#[test]
fn query_by_device_filters_exactly() {
    for (name, stores, _tmp) in backends() {
        ingest(&stores, json!({"device_id": "sensor001", "temperature": 20})).unwrap();
        ingest(&stores, json!({"device_id": "sensor002", "temperature": 30})).unwrap();
        ingest(&stores, json!({"device_id": "sensor001", "temperature": 21})).unwrap();

        let records = stores.records.by_device("sensor001").unwrap();
        assert_eq!(records.len(), 2, "[{name}]");
        assert!(records.iter().all(|r| r.device_id == "sensor001"));
        assert!(records[0].id < records[1].id);

        assert!(stores.records.by_device("nobody").unwrap().is_empty());
        assert_eq!(stores.records.all().unwrap().len(), 3, "[{name}]");
    }
}

#[test]
fn delete_record_twice() {
    for (name, stores, _tmp) in backends() {
        let r = ingest(&stores, json!({"device_id": "a"})).unwrap();
        assert!(stores.records.delete(r.id).is_ok(), "[{name}]");
        assert!(
            matches!(stores.records.delete(r.id), Err(Error::NotFound(_))),
            "[{name}]"
        );
    }
}

#[test]
fn update_missing_record_creates_nothing() {
    for (name, stores, _tmp) in backends() {
        let changes = ingest::reading_changes(&payload(json!({"temperature": 5}))).unwrap();
        assert!(
            matches!(stores.records.update(42, &changes), Err(Error::NotFound(_))),
            "[{name}]"
        );
        assert_eq!(stores.records.count().unwrap(), 0, "[{name}]");
    }
}

#[test]
fn update_only_touches_measurements() {
    for (name, stores, _tmp) in backends() {
        let r = ingest(
            &stores,
            json!({"device_id": "a", "temperature": "18.5", "humidity": "40.5", "battery": 90}),
        )
        .unwrap();
        let changes = ingest::reading_changes(&payload(json!({
            "battery": "75",
            "humidity": null,
            "device_id": "hijack",
            "timestamp": "2000-01-01T00:00:00Z",
        })))
        .unwrap();
        let updated = stores.records.update(r.id, &changes).unwrap();
        assert_eq!(updated.device_id, "a", "[{name}]");
        assert_eq!(updated.timestamp, r.timestamp, "[{name}]");
        assert_eq!(updated.temperature, Some(Measurement::Float(18.5)), "[{name}]");
        assert_eq!(updated.humidity, None, "[{name}]");
        assert_eq!(updated.battery, Some(Measurement::Integer(75)), "[{name}]");

        let unchanged = stores
            .records
            .update(r.id, &ReadingChanges::default())
            .unwrap();
        assert_eq!(unchanged, updated, "[{name}]");
    }
}

#[test]
fn device_edit_preserves_omitted_fields() {
    for (name, stores, _tmp) in backends() {
        stores
            .devices
            .add(Device::new("sensor001", "Room 1", "Server Room"))
            .unwrap();
        let edited = stores
            .devices
            .edit(
                "sensor001",
                ingest::device_changes(&payload(json!({"name": "Room 2"}))),
            )
            .unwrap();
        assert_eq!(edited.name.as_deref(), Some("Room 2"), "[{name}]");
        assert_eq!(edited.location.as_deref(), Some("Server Room"), "[{name}]");

        let cleared = stores
            .devices
            .edit("sensor001", DeviceChanges { name: None, location: Some(None) })
            .unwrap();
        assert_eq!(cleared.location, None, "[{name}]");
        assert_eq!(
            stores.devices.get("sensor001").unwrap(),
            Some(cleared),
            "[{name}]"
        );
    }
}

#[test]
fn deleting_device_keeps_its_telemetry() {
    for (name, stores, _tmp) in backends() {
        stores.devices.add(Device::new("d", "n", "l")).unwrap();
        ingest(&stores, json!({"device_id": "d"})).unwrap();
        stores.devices.delete("d").unwrap();
        assert!(matches!(stores.devices.delete("d"), Err(Error::NotFound(_))));
        assert_eq!(stores.devices.count().unwrap(), 0, "[{name}]");
        assert_eq!(stores.records.by_device("d").unwrap().len(), 1, "[{name}]");
    }
}

#[test]
fn sqlite_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("sensorhub.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        store.add(Device::new("sensor001", "Room 1", "Lab")).unwrap();
        let reading = ingest::normalize(
            payload(json!({"device_id": "sensor001", "humidity": "55.5"})),
            Utc::now(),
        )
        .unwrap();
        store.insert(reading).unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    assert_eq!(DeviceRegistry::count(&store).unwrap(), 1);
    let all = store.all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].humidity, Some(Measurement::Float(55.5)));
}
