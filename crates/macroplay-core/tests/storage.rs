use macroplay_core::prelude::*;
use macroplay_core::storage::{RecordStorage, SettingsStorage};
use std::fs;

fn sample(name: &str) -> Record {
    Record::new(
        name,
        vec![
            BaseAreaAction {
                rect: Rect::from_points(0, 0, 100, 100),
                ..Default::default()
            }
            .into(),
            WaitAction {
                delay: TimingSpec::fixed(0.2),
            }
            .into(),
        ],
    )
}

#[test]
fn missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let storage = RecordStorage::with_dir(dir.path()).unwrap();
    assert!(storage.load_all().unwrap().is_empty());
}

#[test]
fn upsert_find_delete() {
    let dir = tempfile::tempdir().unwrap();
    let storage = RecordStorage::with_dir(dir.path()).unwrap();
    storage.upsert(sample("a")).unwrap();
    storage.upsert(sample("b")).unwrap();

    let mut changed = sample("a");
    changed.move_mouse = false;
    storage.upsert(changed).unwrap();

    let all = storage.load_all().unwrap();
    assert_eq!(all.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(), ["a", "b"]);
    assert!(!storage.find("a").unwrap().unwrap().move_mouse);

    storage.delete("a").unwrap();
    assert!(storage.find("a").unwrap().is_none());
    assert!(storage.delete("a").is_err());
}

#[test]
fn file_uses_records_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let storage = RecordStorage::with_dir(dir.path()).unwrap();
    storage.save_all(&[sample("a")]).unwrap();
    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(storage.path()).unwrap()).unwrap();
    assert_eq!(raw["records"][0]["name"], "a");
    assert_eq!(raw["records"][0]["actions"][0]["type"], "base_area");
    assert_eq!(raw["records"][0]["actions"][1]["delay"]["a"], 0.2);
}

#[test]
fn duplicate_gets_free_name() {
    let dir = tempfile::tempdir().unwrap();
    let storage = RecordStorage::with_dir(dir.path()).unwrap();
    storage.save_all(&[sample("a"), sample("a copy")]).unwrap();
    let copy = storage.duplicate("a", "a copy").unwrap();
    assert_eq!(copy.name, "a copy (2)");
    let names: Vec<String> = storage.load_all().unwrap().into_iter().map(|r| r.name).collect();
    assert_eq!(names, ["a", "a copy (2)", "a copy"]);
}

#[test]
fn import_envelope_and_single() {
    let dir = tempfile::tempdir().unwrap();
    let storage = RecordStorage::with_dir(dir.path()).unwrap();
    storage.upsert(sample("a")).unwrap();

    let envelope = dir.path().join("in.json");
    fs::write(
        &envelope,
        r#"{"records": [{"name": "a", "actions": [{"type": "wait"}]}, {"name": "c"}]}"#,
    )
    .unwrap();
    assert_eq!(storage.import(&envelope).unwrap(), ["a (2)", "c"]);

    let single = dir.path().join("one.json");
    fs::write(&single, r#"{"name": "solo", "actions": [{"type": "key", "keys": ["f5"]}]}"#).unwrap();
    assert_eq!(storage.import(&single).unwrap(), ["solo"]);
    assert_eq!(storage.load_all().unwrap().len(), 4);
}

#[test]
fn export_then_import_elsewhere() {
    let dir = tempfile::tempdir().unwrap();
    let storage = RecordStorage::with_dir(dir.path().join("one")).unwrap();
    storage.upsert(sample("a")).unwrap();
    let out = storage.export("a", dir.path().join("a.json")).unwrap();

    let other = RecordStorage::with_dir(dir.path().join("two")).unwrap();
    other.import(out).unwrap();
    assert_eq!(other.find("a").unwrap(), Some(sample("a")));
}

#[test]
fn settings_default_and_persist() {
    let dir = tempfile::tempdir().unwrap();
    let storage = SettingsStorage::with_dir(dir.path()).unwrap();
    assert_eq!(storage.load(), Settings::default());

    let settings = Settings {
        stop_word: Some(StopWordConfig::new(TextSearch::new("Defeat", Region::default()))),
        stop_word_enabled: true,
    };
    storage.save(&settings).unwrap();
    assert_eq!(storage.load(), settings);
    let raw = fs::read_to_string(storage.path()).unwrap();
    assert!(raw.contains("stop_word_cfg"));

    fs::write(storage.path(), "{ not json").unwrap();
    assert_eq!(storage.load(), Settings::default());
}
