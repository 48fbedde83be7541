//! Append-only JSON-lines table files
//!
//! Every mutation appends one log entry. Opening a table replays the log;
//! compaction rewrites it with only the live records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::records::Row;
use super::schema::TableSchema;
use super::{io_error, DataError, Result};

/// One line of a table file
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum LogEntry {
    Put { id: u64, data: Row },
    Del { id: u64 },
}

/// Size summary of a table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub live: usize,
    pub dead: usize,
    pub bytes: u64,
}

/// A single table backed by a log file
pub struct Table {
    schema: TableSchema,
    path: PathBuf,
    rows: BTreeMap<u64, Row>,
    next_id: u64,
    dead: usize,
    file: File,
}

impl Table {
    /// Open (or create) a table file and replay its log
    pub fn open<P: AsRef<Path>>(path: P, schema: TableSchema) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = if path.exists() {
            fs::read_to_string(&path).map_err(io_error(&path))?
        } else {
            String::new()
        };

        let mut rows = BTreeMap::new();
        let mut next_id = 1;
        let mut dead = 0;

        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(line) {
                Ok(LogEntry::Put { id, data }) => {
                    if rows.insert(id, data).is_some() {
                        dead += 1;
                    }
                    next_id = next_id.max(id + 1);
                }
                Ok(LogEntry::Del { id }) => {
                    dead += if rows.remove(&id).is_some() { 2 } else { 1 };
                    next_id = next_id.max(id + 1);
                }
                Err(e) => {
                    tracing::warn!(
                        "Skipping malformed line {} in {:?}: {}",
                        lineno + 1,
                        path,
                        e
                    );
                    dead += 1;
                }
            }
        }

        let mut file = Self::open_log(&path)?;
        // Terminate a torn final line so the next append starts cleanly
        if !content.is_empty() && !content.ends_with('\n') {
            file.write_all(b"\n").map_err(io_error(&path))?;
        }
        tracing::debug!(
            "Opened table '{}' ({} live, {} dead)",
            schema.name,
            rows.len(),
            dead
        );

        Ok(Self {
            schema,
            path,
            rows,
            next_id,
            dead,
            file,
        })
    }

    fn open_log(path: &Path) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_error(path))
    }

    pub fn name(&self) -> &'static str {
        self.schema.name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Row> {
        self.rows.get(&id)
    }

    /// All live records in id order
    pub fn all(&self) -> impl Iterator<Item = (u64, &Row)> {
        self.rows.iter().map(|(id, row)| (*id, row))
    }

    /// Records whose `field` equals `value`
    pub fn find_by(&self, field: &str, value: &Value) -> Vec<(u64, &Row)> {
        self.all()
            .filter(|(_, row)| row.get(field) == Some(value))
            .collect()
    }

    /// First record whose `field` equals `value`
    pub fn find_one(&self, field: &str, value: &Value) -> Option<(u64, &Row)> {
        self.all().find(|(_, row)| row.get(field) == Some(value))
    }

    /// Insert a new record and return its id
    pub fn insert(&mut self, row: Row) -> Result<u64> {
        self.schema.validate(&row)?;
        self.check_unique(&row, None)?;

        let id = self.next_id;
        self.append(&LogEntry::Put {
            id,
            data: row.clone(),
        })?;
        self.rows.insert(id, row);
        self.next_id += 1;
        Ok(id)
    }

    /// Replace an existing record
    pub fn update(&mut self, id: u64, row: Row) -> Result<()> {
        if !self.rows.contains_key(&id) {
            return Err(self.not_found(id));
        }
        self.schema.validate(&row)?;
        self.check_unique(&row, Some(id))?;

        self.append(&LogEntry::Put {
            id,
            data: row.clone(),
        })?;
        self.rows.insert(id, row);
        self.dead += 1;
        Ok(())
    }

    /// Remove a record
    pub fn delete(&mut self, id: u64) -> Result<()> {
        if !self.rows.contains_key(&id) {
            return Err(self.not_found(id));
        }
        self.append(&LogEntry::Del { id })?;
        self.rows.remove(&id);
        self.dead += 2;
        Ok(())
    }

    pub fn stats(&self) -> TableStats {
        TableStats {
            live: self.rows.len(),
            dead: self.dead,
            bytes: fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0),
        }
    }

    /// Whether enough of the log is dead to be worth rewriting
    pub fn needs_compaction(&self, min_dead: usize, ratio: f64) -> bool {
        if self.dead == 0 || self.dead < min_dead {
            return false;
        }
        let total = (self.rows.len() + self.dead) as f64;
        self.dead as f64 / total >= ratio
    }

    /// Rewrite the log with only live records; returns bytes reclaimed
    pub fn compact(&mut self) -> Result<u64> {
        let before = self.stats().bytes;
        let tmp_path = self.path.with_extension("jsonl.tmp");

        {
            let mut tmp = File::create(&tmp_path).map_err(io_error(&tmp_path))?;
            for (id, row) in &self.rows {
                let line = serde_json::to_string(&LogEntry::Put {
                    id: *id,
                    data: row.clone(),
                })?;
                writeln!(tmp, "{}", line).map_err(io_error(&tmp_path))?;
            }
            tmp.sync_all().map_err(io_error(&tmp_path))?;
        }

        fs::rename(&tmp_path, &self.path).map_err(io_error(&self.path))?;
        self.file = Self::open_log(&self.path)?;
        self.dead = 0;

        let after = self.stats().bytes;
        tracing::debug!(
            "Compacted table '{}': {} -> {} bytes",
            self.schema.name,
            before,
            after
        );
        Ok(before.saturating_sub(after))
    }

    fn append(&mut self, entry: &LogEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(io_error(&self.path))
    }

    fn check_unique(&self, row: &Row, own_id: Option<u64>) -> Result<()> {
        for field in self.schema.unique_fields() {
            let Some(value) = row.get(field.name).filter(|v| !v.is_null()) else {
                continue;
            };
            let clash = self
                .rows
                .iter()
                .any(|(id, other)| Some(*id) != own_id && other.get(field.name) == Some(value));
            if clash {
                return Err(DataError::Duplicate {
                    table: self.schema.name.to_string(),
                    field: field.name.to_string(),
                    value: value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string()),
                });
            }
        }
        Ok(())
    }

    fn not_found(&self, id: u64) -> DataError {
        DataError::NotFound {
            table: self.schema.name.to_string(),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn setting(key: &str, value: &str) -> Row {
        row(json!({"key": key, "value": value}))
    }

    fn open(dir: &TempDir) -> Table {
        Table::open(dir.path().join("settings.jsonl"), TableSchema::settings()).unwrap()
    }

    #[test]
    fn test_insert_and_reopen() {
        let dir = TempDir::new().unwrap();
        let mut table = open(&dir);
        let a = table.insert(setting("a", "1")).unwrap();
        let b = table.insert(setting("b", "2")).unwrap();
        assert_eq!((a, b), (1, 2));

        let table = open(&dir);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(2).unwrap()["value"], "2");
    }

    #[test]
    fn test_unique_field_enforced() {
        let dir = TempDir::new().unwrap();
        let mut table = open(&dir);
        let id = table.insert(setting("a", "1")).unwrap();
        assert!(matches!(
            table.insert(setting("a", "2")),
            Err(DataError::Duplicate { .. })
        ));
        // Updating a record with its own unique value is fine
        table.update(id, setting("a", "3")).unwrap();
        assert_eq!(table.find_one("key", &json!("a")).unwrap().1["value"], "3");
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let dir = TempDir::new().unwrap();
        let mut table = open(&dir);
        table.insert(setting("a", "1")).unwrap();
        let b = table.insert(setting("b", "2")).unwrap();
        table.delete(b).unwrap();

        let mut table = open(&dir);
        assert_eq!(table.insert(setting("c", "3")).unwrap(), 3);
        assert!(matches!(table.delete(b), Err(DataError::NotFound { .. })));
    }

    #[test]
    fn test_malformed_tail_is_skipped() {
        let dir = TempDir::new().unwrap();
        {
            let mut table = open(&dir);
            table.insert(setting("a", "1")).unwrap();
        }
        let path = dir.path().join("settings.jsonl");
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        write!(file, "{{\"op\":\"put\",\"id\":2,\"da").unwrap();

        let mut table = open(&dir);
        assert_eq!(table.len(), 1);
        assert_eq!(table.stats().dead, 1);

        table.insert(setting("b", "2")).unwrap();
        let table = open(&dir);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_compaction_drops_dead_lines() {
        let dir = TempDir::new().unwrap();
        let mut table = open(&dir);
        let id = table.insert(setting("a", "0")).unwrap();
        for i in 1..10 {
            table.update(id, setting("a", &i.to_string())).unwrap();
        }
        let tmp = table.insert(setting("tmp", "x")).unwrap();
        table.delete(tmp).unwrap();

        let stats = table.stats();
        assert_eq!(stats.live, 1);
        assert_eq!(stats.dead, 11);
        assert!(table.needs_compaction(4, 0.5));
        assert!(!table.needs_compaction(20, 0.5));

        let reclaimed = table.compact().unwrap();
        assert!(reclaimed > 0);
        assert_eq!(table.stats().dead, 0);

        let content = fs::read_to_string(dir.path().join("settings.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 1);

        // Appends keep working after the file was swapped
        table.insert(setting("b", "1")).unwrap();
        let table = open(&dir);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(id).unwrap()["value"], "9");
    }

    #[test]
    fn test_find_by() {
        let dir = TempDir::new().unwrap();
        let mut table = Table::open(
            dir.path().join("navigation.jsonl"),
            TableSchema::navigation(),
        )
        .unwrap();
        for (label, visible) in [("a", true), ("b", false), ("c", true)] {
            table
                .insert(row(json!({"label": label, "url": "/", "position": 0, "visible": visible})))
                .unwrap();
        }
        assert_eq!(table.find_by("visible", &json!(true)).len(), 2);
    }
}
