//! Best-effort notification of accepted tiles.
//!
//! Every time the scheduler accepts a tile it hands the updated night list to
//! an [`AlertSink`]. Delivery failures are reported as
//! [`TilingError::AlertDelivery`]; the scheduler logs them and carries on.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::domain::ScheduledTile;
use crate::error::{TilingError, TilingResult};

/// Consumer of accepted-tile notifications.
pub trait AlertSink: Send + Sync {
    fn notify(&self, is_active: bool, event_type: &str, tiles: &[ScheduledTile]) -> TilingResult<()>;
}

/// Writes one log line per notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn notify(&self, is_active: bool, event_type: &str, tiles: &[ScheduledTile]) -> TilingResult<()> {
        match tiles.last() {
            Some(latest) => {
                info!(
                    "Alert ({}, active={}): {} tiles, latest {} at {} ({} mode)",
                    event_type,
                    is_active,
                    tiles.len(),
                    latest.name(),
                    latest.position,
                    latest.setup.mode
                );
                debug!("{}", latest.galaxy_listing());
            }
            None => info!("Alert ({}, active={}): no tiles", event_type, is_active),
        }
        Ok(())
    }
}

/// Discards notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAlertSink;

impl AlertSink for NullAlertSink {
    fn notify(&self, _is_active: bool, _event_type: &str, _tiles: &[ScheduledTile]) -> TilingResult<()> {
        Ok(())
    }
}

/// One line of a JSON-lines alert file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub sent_at: DateTime<Utc>,
    pub is_active: bool,
    pub event_type: String,
    pub tiles: Vec<ScheduledTile>,
}

/// Appends one JSON document per notification to a file.
pub struct JsonLinesAlertSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesAlertSink {
    pub fn open<P: AsRef<Path>>(path: P) -> TilingResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                TilingError::AlertDelivery(format!("cannot open {}: {}", path.display(), e))
            })?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AlertSink for JsonLinesAlertSink {
    fn notify(&self, is_active: bool, event_type: &str, tiles: &[ScheduledTile]) -> TilingResult<()> {
        let record = AlertRecord {
            sent_at: Utc::now(),
            is_active,
            event_type: event_type.to_string(),
            tiles: tiles.to_vec(),
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| TilingError::AlertDelivery(format!("cannot encode alert: {}", e)))?;

        let mut file = self.file.lock();
        writeln!(file, "{}", line)
            .and_then(|_| file.flush())
            .map_err(|e| {
                TilingError::AlertDelivery(format!("cannot write {}: {}", self.path.display(), e))
            })
    }
}

/// Alert sinks selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSinkKind {
    #[default]
    Log,
    JsonLines,
    Null,
}

impl AlertSinkKind {
    /// Instantiate the sink; `path` is required for [`AlertSinkKind::JsonLines`].
    pub fn build(&self, path: Option<&Path>) -> TilingResult<Box<dyn AlertSink>> {
        match self {
            AlertSinkKind::Log => Ok(Box::new(LogAlertSink)),
            AlertSinkKind::Null => Ok(Box::new(NullAlertSink)),
            AlertSinkKind::JsonLines => {
                let path = path.ok_or_else(|| {
                    TilingError::Configuration(
                        "alerts.path is required for the json_lines sink".to_string(),
                    )
                })?;
                Ok(Box::new(JsonLinesAlertSink::open(path)?))
            }
        }
    }
}
