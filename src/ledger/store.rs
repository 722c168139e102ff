//! Durable JSON storage for the ledger
//!
//! The document layout keeps trade history in execution order alongside
//! per-strategy positions, entry prices and realized totals. Writes go
//! through a temp file that is fsynced and then renamed over the target, so
//! a crash leaves either the previous or the new document, never a partial one.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::types::TradeRecord;
use crate::common::errors::{ArenaError, Result};

/// Persisted form of the ledger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerDocument {
    #[serde(default)]
    pub trades: Vec<TradeRecord>,
    /// strategy -> symbol -> signed quantity
    #[serde(default)]
    pub positions: BTreeMap<String, BTreeMap<String, i64>>,
    /// strategy -> symbol -> entry price (null when flat)
    #[serde(default)]
    pub entry_prices: BTreeMap<String, BTreeMap<String, Option<Decimal>>>,
    /// strategy -> realized total
    #[serde(default)]
    pub realized_pnl: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// File-backed ledger store
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document, `None` if the file does not exist yet
    pub fn load(&self) -> Result<Option<LedgerDocument>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data =
            fs::read_to_string(&self.path).map_err(|e| ArenaError::persistence(&self.path, e))?;
        let document = serde_json::from_str(&data)
            .map_err(|e| ArenaError::persistence(&self.path, format!("corrupt ledger: {}", e)))?;
        Ok(Some(document))
    }

    /// Write the document atomically
    pub fn save(&self, document: &LedgerDocument) -> Result<()> {
        let json = serde_json::to_string_pretty(document)?;
        let temp_path = self.temp_path();

        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
            fs::rename(&temp_path, &self.path)
        };

        write().map_err(|e| ArenaError::persistence(&self.path, e))?;
        debug!(path = %self.path.display(), trades = document.trades.len(), "Ledger saved");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
