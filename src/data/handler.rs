//! Data handler - typed access to all tables

use indexmap::IndexMap;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::records::{normalize_path, NavItem, Record, Role, Setting, Stored, UrlMapping, User};
use super::schema::{Defaults, TableSchema, NAVIGATION, URL_MAPPINGS};
use super::store::{Table, TableStats};
use super::{io_error, Config, DataError, Result};

/// Redirect statuses accepted for URL mappings
pub const REDIRECT_STATUSES: [u16; 4] = [301, 302, 307, 308];

/// Entry point to the flat-file data layer
pub struct Handler {
    dir: PathBuf,
    config: Config,
    tables: Mutex<HashMap<&'static str, Table>>,
}

impl Handler {
    /// Open all tables under `dir`, retrying on failure, then seed defaults
    pub fn open<P: AsRef<Path>>(dir: P, config: Config, defaults: &Defaults) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let tables = Self::open_with_retry(&dir, &config)?;

        let handler = Self {
            dir,
            config,
            tables: Mutex::new(tables),
        };

        let seeded = handler.seed_defaults(defaults)?;
        if seeded > 0 {
            tracing::info!("Seeded {} default rows", seeded);
        }

        Ok(handler)
    }

    fn open_with_retry(dir: &Path, config: &Config) -> Result<HashMap<&'static str, Table>> {
        let attempts = config.init_attempts.max(1);
        let mut last = String::new();

        for attempt in 1..=attempts {
            match Self::open_tables(dir) {
                Ok(tables) => {
                    if attempt > 1 {
                        tracing::info!("Data store opened on attempt {}", attempt);
                    }
                    return Ok(tables);
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        attempts,
                        "Failed to open data store at {:?}: {}",
                        dir,
                        e
                    );
                    last = e.to_string();
                    if attempt < attempts {
                        std::thread::sleep(config.backoff(attempt));
                    }
                }
            }
        }

        Err(DataError::InitFailed { attempts, last })
    }

    fn open_tables(dir: &Path) -> Result<HashMap<&'static str, Table>> {
        fs::create_dir_all(dir).map_err(io_error(dir))?;
        let mut tables = HashMap::new();
        for schema in TableSchema::all() {
            let path = dir.join(format!("{}.jsonl", schema.name));
            let name = schema.name;
            tables.insert(name, Table::open(path, schema)?);
        }
        Ok(tables)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Insert missing default rows; returns the number inserted
    ///
    /// Settings are repaired key by key. Navigation and URL mappings are
    /// only seeded into empty tables. Users are never seeded.
    pub fn seed_defaults(&self, defaults: &Defaults) -> Result<usize> {
        let mut inserted = 0;

        let existing = self.settings()?;
        for (key, value) in &defaults.settings {
            if !existing.contains_key(key) {
                self.insert(&Setting {
                    key: key.clone(),
                    value: value.clone(),
                })?;
                inserted += 1;
            }
        }

        if self.with_table(NAVIGATION, |t| Ok(t.is_empty()))? {
            for item in &defaults.navigation {
                self.insert(item)?;
                inserted += 1;
            }
        }

        if self.with_table(URL_MAPPINGS, |t| Ok(t.is_empty()))? {
            for mapping in &defaults.url_mappings {
                self.insert(mapping)?;
                inserted += 1;
            }
        }

        Ok(inserted)
    }

    fn with_table<R>(&self, name: &str, f: impl FnOnce(&mut Table) -> Result<R>) -> Result<R> {
        let mut tables = self.tables.lock().map_err(|_| DataError::Poisoned)?;
        let table = tables
            .get_mut(name)
            .ok_or_else(|| DataError::UnknownTable(name.to_string()))?;
        f(table)
    }

    fn list<T: Record>(&self) -> Result<Vec<Stored<T>>> {
        self.with_table(T::TABLE, |table| {
            table
                .all()
                .map(|(id, row)| {
                    Ok(Stored {
                        id,
                        record: T::from_row(row)?,
                    })
                })
                .collect()
        })
    }

    fn get<T: Record>(&self, id: u64) -> Result<Option<Stored<T>>> {
        self.with_table(T::TABLE, |table| {
            table
                .get(id)
                .map(|row| {
                    Ok(Stored {
                        id,
                        record: T::from_row(row)?,
                    })
                })
                .transpose()
        })
    }

    fn find_one<T: Record>(&self, field: &str, value: Value) -> Result<Option<Stored<T>>> {
        self.with_table(T::TABLE, |table| {
            table
                .find_one(field, &value)
                .map(|(id, row)| {
                    Ok(Stored {
                        id,
                        record: T::from_row(row)?,
                    })
                })
                .transpose()
        })
    }

    fn insert<T: Record>(&self, record: &T) -> Result<u64> {
        let row = record.to_row()?;
        self.with_table(T::TABLE, |table| table.insert(row))
    }

    fn update<T: Record>(&self, id: u64, record: &T) -> Result<()> {
        let row = record.to_row()?;
        self.with_table(T::TABLE, |table| table.update(id, row))
    }

    fn delete<T: Record>(&self, id: u64) -> Result<()> {
        self.with_table(T::TABLE, |table| table.delete(id))
    }

    // ---- settings ----

    pub fn setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .find_one::<Setting>("key", json!(key))?
            .map(|s| s.record.value))
    }

    /// All settings ordered by key
    pub fn settings(&self) -> Result<IndexMap<String, String>> {
        let mut settings: Vec<_> = self
            .list::<Setting>()?
            .into_iter()
            .map(|s| (s.record.key, s.record.value))
            .collect();
        settings.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(settings.into_iter().collect())
    }

    /// Insert or replace a setting
    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let setting = Setting {
            key: key.to_string(),
            value: value.to_string(),
        };
        match self.find_one::<Setting>("key", json!(key))? {
            Some(existing) => self.update(existing.id, &setting),
            None => self.insert(&setting).map(|_| ()),
        }
    }

    pub fn set_settings<'a, I>(&self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (key, value) in values {
            self.set_setting(key, value)?;
        }
        Ok(())
    }

    // ---- navigation ----

    /// Navigation items sorted by position, then id
    pub fn navigation(&self) -> Result<Vec<Stored<NavItem>>> {
        let mut items = self.list::<NavItem>()?;
        items.sort_by_key(|i| (i.position, i.id));
        Ok(items)
    }

    pub fn visible_navigation(&self) -> Result<Vec<Stored<NavItem>>> {
        Ok(self
            .navigation()?
            .into_iter()
            .filter(|i| i.visible)
            .collect())
    }

    pub fn nav_item(&self, id: u64) -> Result<Option<Stored<NavItem>>> {
        self.get(id)
    }

    pub fn add_nav_item(&self, item: &NavItem) -> Result<u64> {
        self.check_nav_parent(item, None)?;
        self.insert(item)
    }

    pub fn update_nav_item(&self, id: u64, item: &NavItem) -> Result<()> {
        self.check_nav_parent(item, Some(id))?;
        if item.parent_id.is_some()
            && self
                .navigation()?
                .iter()
                .any(|i| i.parent_id == Some(id))
        {
            return Err(DataError::Invalid {
                table: NAVIGATION.to_string(),
                message: "an item with children cannot be nested".to_string(),
            });
        }
        self.update(id, item)
    }

    /// Delete an item, moving its children to the top level
    pub fn delete_nav_item(&self, id: u64) -> Result<()> {
        for child in self.navigation()?.into_iter().filter(|i| i.parent_id == Some(id)) {
            let mut item = child.record;
            item.parent_id = None;
            self.update(child.id, &item)?;
        }
        self.delete::<NavItem>(id)
    }

    fn check_nav_parent(&self, item: &NavItem, own_id: Option<u64>) -> Result<()> {
        let Some(parent_id) = item.parent_id else {
            return Ok(());
        };
        let invalid = |message: &str| DataError::Invalid {
            table: NAVIGATION.to_string(),
            message: message.to_string(),
        };
        if Some(parent_id) == own_id {
            return Err(invalid("an item cannot be its own parent"));
        }
        match self.nav_item(parent_id)? {
            None => Err(invalid("parent item does not exist")),
            Some(parent) if parent.parent_id.is_some() => {
                Err(invalid("menus only nest one level deep"))
            }
            Some(_) => Ok(()),
        }
    }

    // ---- users ----

    pub fn users(&self) -> Result<Vec<Stored<User>>> {
        self.list()
    }

    pub fn user(&self, id: u64) -> Result<Option<Stored<User>>> {
        self.get(id)
    }

    pub fn user_by_username(&self, username: &str) -> Result<Option<Stored<User>>> {
        self.find_one("username", json!(username))
    }

    pub fn add_user(&self, user: &User) -> Result<u64> {
        self.insert(user)
    }

    pub fn update_user(&self, id: u64, user: &User) -> Result<()> {
        self.update(id, user)
    }

    pub fn delete_user(&self, id: u64) -> Result<()> {
        self.delete::<User>(id)
    }

    pub fn count_admins(&self) -> Result<usize> {
        Ok(self
            .users()?
            .iter()
            .filter(|u| u.role == Role::Admin)
            .count())
    }

    // ---- URL mappings ----

    pub fn url_mappings(&self) -> Result<Vec<Stored<UrlMapping>>> {
        let mut mappings = self.list::<UrlMapping>()?;
        mappings.sort_by(|a, b| a.from.cmp(&b.from));
        Ok(mappings)
    }

    /// Find the mapping for a request path
    pub fn resolve_url(&self, path: &str) -> Result<Option<UrlMapping>> {
        Ok(self
            .find_one::<UrlMapping>("from", json!(normalize_path(path)))?
            .map(|m| m.record))
    }

    /// Add a mapping, replacing any existing one for the same source path
    ///
    /// The exact reverse mapping (new target back to new source) is removed
    /// so renames back and forth never produce a redirect loop.
    pub fn add_url_mapping(&self, mapping: &UrlMapping) -> Result<u64> {
        let mapping = UrlMapping {
            from: normalize_path(&mapping.from),
            to: normalize_path(&mapping.to),
            status: mapping.status,
        };
        let invalid = |message: String| DataError::Invalid {
            table: URL_MAPPINGS.to_string(),
            message,
        };

        if mapping.from == mapping.to {
            return Err(invalid("a mapping cannot point to itself".to_string()));
        }
        if !REDIRECT_STATUSES.contains(&mapping.status) {
            return Err(invalid(format!(
                "unsupported redirect status {}",
                mapping.status
            )));
        }

        let reverse = self
            .find_one::<UrlMapping>("from", json!(mapping.to))?
            .filter(|m| m.to == mapping.from);
        let existing = self.find_one::<UrlMapping>("from", json!(mapping.from))?;

        if let Some(reverse) = reverse {
            self.delete::<UrlMapping>(reverse.id)?;
        }
        match existing {
            Some(existing) => {
                self.update(existing.id, &mapping)?;
                Ok(existing.id)
            }
            None => self.insert(&mapping),
        }
    }

    pub fn delete_url_mapping(&self, id: u64) -> Result<()> {
        self.delete::<UrlMapping>(id)
    }

    // ---- maintenance ----

    /// Per-table statistics, in table order
    pub fn stats(&self) -> Result<Vec<(String, TableStats)>> {
        let tables = self.tables.lock().map_err(|_| DataError::Poisoned)?;
        let mut stats: Vec<_> = tables
            .values()
            .map(|t| (t.name().to_string(), t.stats()))
            .collect();
        stats.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(stats)
    }

    /// Compact tables over the configured thresholds; returns tables compacted
    pub fn compact_if_needed(&self) -> Result<usize> {
        let mut tables = self.tables.lock().map_err(|_| DataError::Poisoned)?;
        let mut compacted = 0;
        for table in tables.values_mut() {
            if table.needs_compaction(self.config.compaction_min_dead, self.config.compaction_ratio)
            {
                let reclaimed = table.compact()?;
                tracing::info!(
                    table = table.name(),
                    reclaimed,
                    "Compacted table"
                );
                compacted += 1;
            }
        }
        Ok(compacted)
    }

    /// Compact every table; returns total bytes reclaimed
    pub fn compact_all(&self) -> Result<u64> {
        let mut tables = self.tables.lock().map_err(|_| DataError::Poisoned)?;
        let mut reclaimed = 0;
        for table in tables.values_mut() {
            reclaimed += table.compact()?;
        }
        Ok(reclaimed)
    }
}

/// Run `compact_if_needed` periodically on the tokio runtime
pub fn spawn_compactor(handler: Arc<Handler>) -> Option<JoinHandle<()>> {
    let secs = handler.config.compaction_interval_secs;
    if secs == 0 {
        tracing::debug!("Background compaction disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(secs));
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let handler = handler.clone();
            match tokio::task::spawn_blocking(move || handler.compact_if_needed()).await {
                Ok(Ok(0)) => tracing::debug!("Compaction pass: nothing to do"),
                Ok(Ok(n)) => tracing::info!("Compaction pass: {} tables compacted", n),
                Ok(Err(e)) => tracing::error!("Compaction failed: {}", e),
                Err(e) => tracing::error!("Compaction task panicked: {}", e),
            }
        }
    }))
}
