//! Versioned on-disk checkpoint of the ledger's durable fields

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use super::position::PnlLedger;
use crate::common::errors::{Result, TraderError};

pub const CHECKPOINT_VERSION: u32 = 1;

/// Fields of the ledger that survive a restart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerCheckpoint {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub trade_count: u64,
    pub total_volume: f64,
    pub pnl: PnlLedger,
    pub risk_pause_until: Option<DateTime<Utc>>,
}

/// JSON file holding one [`LedgerCheckpoint`]
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write atomically through a sibling temp file
    pub async fn write(&self, checkpoint: &LedgerCheckpoint) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let data = serde_json::to_vec_pretty(checkpoint)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &self.path).await?;

        debug!("Checkpoint written to {}", self.path.display());
        Ok(())
    }

    /// Read the checkpoint; `Ok(None)` when no file exists yet
    pub async fn read(&self) -> Result<Option<LedgerCheckpoint>> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let checkpoint = serde_json::from_slice(&data).map_err(|e| {
            TraderError::Checkpoint(format!(
                "unreadable checkpoint at {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(Some(checkpoint))
    }
}
