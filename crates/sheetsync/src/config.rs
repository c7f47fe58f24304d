//! Engine configuration
//!
//! Every field has a default, so a JSON config file only needs to name what
//! it changes.
//!
//! ```rust
//! use sheetsync::SyncConfig;
//!
//! let config = SyncConfig::from_json(r#"{ "lineOffset": { "row": 6, "col": 0 } }"#).unwrap();
//! assert_eq!(config.line_offset.row, 6);
//! assert_eq!(config.retry.max_attempts, 3);
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sheetsync_core::{AuxiliaryPriority, ColumnPolicy, SheetOffset};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// Where template content lands in a line sheet
    pub line_offset: SheetOffset,
    /// Workbook character units to document pixels
    pub column_width_scale: f64,
    /// Style of the table created over the bound list
    pub table_style: String,
    /// Sheet name used when a record has no display name
    pub fallback_sheet_name: String,
    pub columns: ColumnPolicy,
    pub auxiliary_priority: AuxiliaryPriority,
    pub retry: RetryConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            line_offset: SheetOffset::new(4, 0),
            column_width_scale: 7.0,
            table_style: "TableStyleMedium5".into(),
            fallback_sheet_name: "Item".into(),
            columns: ColumnPolicy::default(),
            auxiliary_priority: AuxiliaryPriority::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Parse a configuration, filling absent fields with defaults
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| sheetsync_core::Error::from(e).into())
    }
}

/// Bounded retry with exponential backoff for conflicting updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            backoff_multiplier: 2.0,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay_ms = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let delay_ms = delay_ms.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(delay_ms as u64)
    }
}
