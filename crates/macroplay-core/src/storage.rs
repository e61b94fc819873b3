//! Record and settings persistence - plain JSON files in the data directory

use crate::config::AppPaths;
use crate::record::Record;
use crate::stopword::StopWordConfig;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
struct RecordsFile {
    #[serde(default)]
    records: Vec<Record>,
}

/// Either the `{ "records": [...] }` envelope or one bare record.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Envelope { records: Vec<Record> },
    Single(Record),
}

pub struct RecordStorage {
    file: PathBuf,
}

impl RecordStorage {
    pub fn new() -> Result<Self> {
        Self::with_dir(AppPaths::new()?.dir())
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let paths = AppPaths::with_dir(dir);
        fs::create_dir_all(paths.dir())
            .with_context(|| format!("creating {}", paths.dir().display()))?;
        Ok(Self {
            file: paths.records_file(),
        })
    }

    /// All records; a missing file is an empty list.
    pub fn load_all(&self) -> Result<Vec<Record>> {
        if !self.file.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.file)
            .with_context(|| format!("reading {}", self.file.display()))?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let parsed: RecordsFile = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", self.file.display()))?;
        Ok(parsed.records)
    }

    /// Replace the file contents. Writes a sibling first so a crash never
    /// leaves a truncated file behind.
    pub fn save_all(&self, records: &[Record]) -> Result<()> {
        let body = serde_json::to_string_pretty(&serde_json::json!({ "records": records }))?;
        write_atomic(&self.file, &body)
    }

    pub fn find(&self, name: &str) -> Result<Option<Record>> {
        Ok(self.load_all()?.into_iter().find(|r| r.name == name))
    }

    /// Replace the record with the same name, or append.
    pub fn upsert(&self, record: Record) -> Result<()> {
        let mut records = self.load_all()?;
        match records.iter_mut().find(|r| r.name == record.name) {
            Some(slot) => *slot = record,
            None => records.push(record),
        }
        self.save_all(&records)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let mut records = self.load_all()?;
        let before = records.len();
        records.retain(|r| r.name != name);
        if records.len() == before {
            bail!("No record named '{}'", name);
        }
        self.save_all(&records)
    }

    /// Deep copy under a new name, inserted right after the original.
    pub fn duplicate(&self, name: &str, new_name: &str) -> Result<Record> {
        let mut records = self.load_all()?;
        let pos = records
            .iter()
            .position(|r| r.name == name)
            .with_context(|| format!("No record named '{}'", name))?;
        let mut copy = records[pos].clone();
        copy.name = unique_name(&records, new_name);
        records.insert(pos + 1, copy.clone());
        self.save_all(&records)?;
        Ok(copy)
    }

    /// Merge records from another file. Returns the names they were stored under.
    pub fn import(&self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let incoming = match serde_json::from_str::<ImportFile>(&text)
            .with_context(|| format!("parsing {}", path.display()))?
        {
            ImportFile::Envelope { records } => records,
            ImportFile::Single(r) => vec![r],
        };
        let mut records = self.load_all()?;
        let mut names = Vec::new();
        for mut record in incoming {
            record.name = unique_name(&records, &record.name);
            names.push(record.name.clone());
            records.push(record);
        }
        self.save_all(&records)?;
        Ok(names)
    }

    /// Write one record in the envelope format.
    pub fn export(&self, name: &str, path: impl AsRef<Path>) -> Result<PathBuf> {
        let record = self
            .find(name)?
            .with_context(|| format!("No record named '{}'", name))?;
        let path = path.as_ref().to_path_buf();
        let body = serde_json::to_string_pretty(&serde_json::json!({ "records": [record] }))?;
        write_atomic(&path, &body)?;
        Ok(path)
    }

    /// Default export file name: `<name>_<timestamp>.json` in `dir`.
    pub fn export_path(dir: impl AsRef<Path>, name: &str) -> PathBuf {
        let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
        dir.as_ref().join(format!("{}_{}.json", sanitize(name), ts))
    }

    pub fn path(&self) -> &Path {
        &self.file
    }
}

/// `name`, or `name (2)`, `name (3)`, ... whichever is free.
fn unique_name(records: &[Record], name: &str) -> String {
    let taken = |n: &str| records.iter().any(|r| r.name == n);
    if !taken(name) {
        return name.to_string();
    }
    (2..)
        .map(|i| format!("{} ({})", name, i))
        .find(|n| !taken(n))
        .unwrap_or_else(|| name.to_string())
}

fn write_atomic(path: &Path, body: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "stop_word_cfg")]
    pub stop_word: Option<StopWordConfig>,
    pub stop_word_enabled: bool,
}

pub struct SettingsStorage {
    file: PathBuf,
}

impl SettingsStorage {
    pub fn new() -> Result<Self> {
        Self::with_dir(AppPaths::new()?.dir())
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let paths = AppPaths::with_dir(dir);
        fs::create_dir_all(paths.dir())?;
        Ok(Self {
            file: paths.settings_file(),
        })
    }

    /// Missing or unreadable settings fall back to defaults.
    pub fn load(&self) -> Settings {
        let text = match fs::read_to_string(&self.file) {
            Ok(t) => t,
            Err(_) => return Settings::default(),
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            tracing::warn!(file = %self.file.display(), error = %e, "ignoring unreadable settings");
            Settings::default()
        })
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        write_atomic(&self.file, &serde_json::to_string_pretty(settings)?)
    }

    pub fn path(&self) -> &Path {
        &self.file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_names() {
        let records = vec![Record::new("a", vec![]), Record::new("a (2)", vec![])];
        assert_eq!(unique_name(&records, "b"), "b");
        assert_eq!(unique_name(&records, "a"), "a (3)");
    }

    #[test]
    fn sanitized_export_name() {
        let p = RecordStorage::export_path("/tmp", "my run/1");
        let name = p.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("my_run_1_"), "{}", name);
        assert!(name.ends_with(".json"));
    }
}
