//! Synchronization entry point
//!
//! Ties reconciliation to a document session: each trigger plans a batch
//! from the current records and dispatches it with bounded retry. Failures
//! are reported as [`SyncOutcome::Deferred`] and never surface as errors to
//! the record operation that caused them.

use crate::config::SyncConfig;
use crate::dispatch::{dispatch, DocumentSession, Sleeper, SyncOutcome, ThreadSleeper};
use crate::reconcile::Reconciler;
use crate::source::TemplateSource;
use crate::validation::{RandomRuleIds, RuleIdGenerator};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sheetsync_core::{list_id_for, sheet_name_for, BackingRecord, RecordId, SheetId};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Why a synchronization runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTrigger {
    RecordCreated(RecordId),
    RecordChanged(RecordId),
    RecordDeleted(RecordId),
    /// A collaborator opened the document
    SessionJoined,
    Manual,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncTrigger::RecordCreated(id) => write!(f, "record {id} created"),
            SyncTrigger::RecordChanged(id) => write!(f, "record {id} changed"),
            SyncTrigger::RecordDeleted(id) => write!(f, "record {id} deleted"),
            SyncTrigger::SessionJoined => f.write_str("session joined"),
            SyncTrigger::Manual => f.write_str("manual"),
        }
    }
}

/// Descriptor of one bound list, as shown to the document client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainList {
    pub list_id: String,
    pub sheet_id: String,
    pub name: String,
    pub columns: Vec<String>,
}

/// Keeps one shared document in line with its records
pub struct Synchronizer<T: TemplateSource, S: DocumentSession> {
    config: SyncConfig,
    templates: Arc<T>,
    session: Arc<S>,
    sleeper: Arc<dyn Sleeper>,
    ids: Mutex<Box<dyn RuleIdGenerator>>,
}

impl<T: TemplateSource, S: DocumentSession> Synchronizer<T, S> {
    pub fn new(config: SyncConfig, templates: Arc<T>, session: Arc<S>) -> Self {
        Self {
            config,
            templates,
            session,
            sleeper: Arc::new(ThreadSleeper),
            ids: Mutex::new(Box::new(RandomRuleIds::new())),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_rule_ids(mut self, ids: Box<dyn RuleIdGenerator>) -> Self {
        self.ids = Mutex::new(ids);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    /// Bring the document in line with `records`
    ///
    /// `records` is the full current record set of the parent entity; the
    /// trigger only labels the run.
    pub fn handle(&self, trigger: &SyncTrigger, records: &[BackingRecord]) -> SyncOutcome {
        debug!(trigger = %trigger, records = records.len(), "synchronizing");
        let reconciler = Reconciler::new(&self.config, self.templates.as_ref());
        dispatch(
            self.session.as_ref(),
            &self.config.retry,
            self.sleeper.as_ref(),
            |document, pending| {
                let mut ids = self.ids.lock();
                reconciler.reconcile(document, pending, records, &mut **ids)
            },
        )
    }

    /// One descriptor per record, whether or not its sheet exists yet
    pub fn main_lists(&self, records: &[BackingRecord]) -> Vec<MainList> {
        records
            .iter()
            .map(|record| MainList {
                list_id: list_id_for(&record.id),
                sheet_id: SheetId::for_record(&record.id).to_string(),
                name: sheet_name_for(&record.display_name, &self.config.fallback_sheet_name),
                columns: self.config.columns.expected_columns(record),
            })
            .collect()
    }
}
