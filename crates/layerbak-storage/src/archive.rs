//! Timestamped backup objects on an OpenDAL operator
//!
//! Objects are named `<name_prefix>_YYYYMMDD_HHMMSS.<extension>` and stored
//! under `<prefix>/`. Names that do not follow the pattern are ignored by
//! `list` but can still be fetched directly.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use layerbak_core::config::BackupConfig;
use opendal::Operator;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Backup file naming scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupNaming {
    pub name_prefix: String,
    pub extension: String,
}

impl BackupNaming {
    pub fn from_config(cfg: &BackupConfig) -> Self {
        Self {
            name_prefix: cfg.name_prefix.clone(),
            extension: cfg.extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn name_for(&self, timestamp: NaiveDateTime) -> String {
        format!(
            "{}_{}.{}",
            self.name_prefix,
            timestamp.format(TIMESTAMP_FORMAT),
            self.extension
        )
    }

    /// Name for a backup taken now, in local time.
    pub fn name_now(&self) -> String {
        let now: DateTime<Local> = Local::now();
        self.name_for(now.naive_local())
    }

    /// Timestamp embedded in `name`, or `None` if `name` is not ours.
    pub fn parse_timestamp(&self, name: &str) -> Option<NaiveDateTime> {
        let stamp = name
            .strip_prefix(self.name_prefix.as_str())?
            .strip_prefix('_')?
            .strip_suffix(self.extension.as_str())?
            .strip_suffix('.')?;
        NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
    }
}

impl Default for BackupNaming {
    fn default() -> Self {
        Self::from_config(&BackupConfig::default())
    }
}

/// One stored backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub name: String,
    pub timestamp: NaiveDateTime,
}

/// Backup objects under one prefix of an operator.
pub struct BackupStore {
    op: Operator,
    prefix: String,
    naming: BackupNaming,
}

impl BackupStore {
    pub fn new(op: Operator, prefix: &str, naming: BackupNaming) -> Self {
        Self {
            op,
            prefix: prefix.trim_matches('/').to_string(),
            naming,
        }
    }

    pub fn naming(&self) -> &BackupNaming {
        &self.naming
    }

    fn key(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{name}", self.prefix)
        }
    }

    fn dir(&self) -> String {
        if self.prefix.is_empty() {
            "/".to_string()
        } else {
            format!("{}/", self.prefix)
        }
    }

    /// Store a finished backup. Refuses to replace an existing object.
    pub async fn put(&self, name: &str, data: Vec<u8>) -> Result<String> {
        check_name(name)?;
        let key = self.key(name);
        if self
            .op
            .exists(&key)
            .await
            .with_context(|| format!("checking for existing backup: {key}"))?
        {
            anyhow::bail!("backup already exists: {key}");
        }

        let size = data.len();
        self.op
            .write(&key, data)
            .await
            .with_context(|| format!("writing backup: {key}"))?;

        tracing::info!(key = %key, bytes = size, "backup stored");
        Ok(key)
    }

    pub async fn get(&self, name: &str) -> Result<Vec<u8>> {
        check_name(name)?;
        let key = self.key(name);
        let data = self
            .op
            .read(&key)
            .await
            .with_context(|| format!("reading backup: {key}"))?;

        tracing::debug!(key = %key, bytes = data.len(), "backup fetched");
        Ok(data.to_vec())
    }

    /// Backups following the naming scheme, newest first.
    pub async fn list(&self) -> Result<Vec<BackupEntry>> {
        let dir = self.dir();
        let entries = self
            .op
            .list(&dir)
            .await
            .with_context(|| format!("listing backups under {dir}"))?;

        let mut backups: Vec<BackupEntry> = entries
            .iter()
            .filter(|e| e.metadata().is_file())
            .filter_map(|e| {
                let name = e.name();
                self.naming.parse_timestamp(name).map(|timestamp| BackupEntry {
                    name: name.to_string(),
                    timestamp,
                })
            })
            .collect();

        backups.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(backups)
    }

    pub async fn latest(&self) -> Result<Option<BackupEntry>> {
        Ok(self.list().await?.into_iter().next())
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        anyhow::bail!("invalid backup name: {name:?}");
    }
    Ok(())
}
