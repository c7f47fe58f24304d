//! Batch dispatch with optimistic concurrency
//!
//! Every attempt reads a fresh snapshot, plans against it, and asks the
//! session to apply the batch only if the snapshot revision is still current.
//! Conflicts are retried with exponential backoff; anything else, and a
//! conflict on the last attempt, defers the synchronization to the next
//! trigger.

use crate::config::RetryConfig;
use crate::error::{Result, SyncError};
use parking_lot::Mutex;
use sheetsync_core::{Document, MutationCommand};
use std::time::Duration;
use tracing::{debug, warn};

/// Boundary to a shared document
pub trait DocumentSession: Send + Sync {
    /// Committed document state
    fn snapshot(&self) -> Document;

    /// Sheet ids created by batches that are not committed yet
    fn pending_sheet_ids(&self) -> Vec<String>;

    /// Apply `commands` atomically if the document is still at
    /// `expected_revision`, returning the new revision
    fn apply(&self, expected_revision: u64, commands: &[MutationCommand]) -> Result<u64>;
}

#[derive(Debug, Default)]
struct SessionState {
    document: Document,
    pending: Vec<String>,
    injected_conflicts: u32,
    batches: usize,
}

/// Session over a document held in memory
#[derive(Debug, Default)]
pub struct InMemorySession {
    state: Mutex<SessionState>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: Document) -> Self {
        Self {
            state: Mutex::new(SessionState {
                document,
                ..Default::default()
            }),
        }
    }

    /// Copy of the current document
    pub fn document(&self) -> Document {
        self.state.lock().document.clone()
    }

    /// Sheet ids reported as pending by [`DocumentSession::pending_sheet_ids`]
    pub fn set_pending<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().pending = ids.into_iter().map(Into::into).collect();
    }

    /// Make the next `count` batches lose against a concurrent writer
    pub fn inject_conflicts(&self, count: u32) {
        self.state.lock().injected_conflicts = count;
    }

    /// Number of batches applied so far
    pub fn batches(&self) -> usize {
        self.state.lock().batches
    }
}

impl DocumentSession for InMemorySession {
    fn snapshot(&self) -> Document {
        self.document()
    }

    fn pending_sheet_ids(&self) -> Vec<String> {
        self.state.lock().pending.clone()
    }

    fn apply(&self, expected_revision: u64, commands: &[MutationCommand]) -> Result<u64> {
        let mut state = self.state.lock();
        if state.injected_conflicts > 0 {
            state.injected_conflicts -= 1;
            // another writer commits an empty batch first
            state.document.apply(&[])?;
        }

        let actual = state.document.revision();
        if actual != expected_revision {
            return Err(SyncError::ConflictingUpdate {
                expected: expected_revision,
                actual,
            });
        }

        state
            .document
            .apply(commands)
            .map_err(|e| SyncError::Rejected(e.to_string()))?;
        state.batches += 1;
        Ok(state.document.revision())
    }
}

/// Waits between attempts
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Blocks the current thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested delays without waiting
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays.lock().push(duration);
    }
}

/// Result of one synchronization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A batch was committed
    Applied {
        revision: u64,
        commands: usize,
        attempts: u32,
    },
    /// The document already matched
    UpToDate,
    /// Gave up for now; the next trigger tries again
    Deferred { attempts: u32, reason: String },
}

impl SyncOutcome {
    pub fn is_deferred(&self) -> bool {
        matches!(self, SyncOutcome::Deferred { .. })
    }
}

/// Plan and apply one batch against `session`
///
/// `plan` is called on every attempt with the fresh snapshot and the pending
/// sheet ids.
pub fn dispatch<F>(
    session: &dyn DocumentSession,
    retry: &RetryConfig,
    sleeper: &dyn Sleeper,
    mut plan: F,
) -> SyncOutcome
where
    F: FnMut(&Document, &[String]) -> Vec<MutationCommand>,
{
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let snapshot = session.snapshot();
        let pending = session.pending_sheet_ids();
        let commands = plan(&snapshot, &pending);
        if commands.is_empty() {
            debug!(attempt, "document up to date");
            return SyncOutcome::UpToDate;
        }

        match session.apply(snapshot.revision(), &commands) {
            Ok(revision) => {
                debug!(attempt, revision, commands = commands.len(), "batch applied");
                return SyncOutcome::Applied {
                    revision,
                    commands: commands.len(),
                    attempts: attempt,
                };
            }
            Err(err) if err.is_conflict() && attempt < max_attempts => {
                let delay = retry.delay(attempt);
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "conflicting update, retrying after delay"
                );
                sleeper.sleep(delay);
            }
            Err(err) => {
                warn!(attempt, error = %err, "synchronization deferred");
                return SyncOutcome::Deferred {
                    attempts: attempt,
                    reason: err.to_string(),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn create(id: &str) -> Vec<MutationCommand> {
        vec![MutationCommand::CreateSheet {
            sheet_id: id.into(),
            name: id.into(),
            position: 0,
        }]
    }

    #[test]
    fn test_conflict_retried_then_applied() {
        let session = InMemorySession::new();
        session.inject_conflicts(1);
        let sleeper = RecordingSleeper::new();
        let mut plans = 0;

        let outcome = dispatch(&session, &RetryConfig::default(), &sleeper, |doc, _| {
            plans += 1;
            if doc.contains_sheet("a") {
                Vec::new()
            } else {
                create("a")
            }
        });

        assert_eq!(plans, 2);
        assert!(matches!(outcome, SyncOutcome::Applied { attempts: 2, .. }));
        assert_eq!(sleeper.delays(), vec![Duration::from_millis(100)]);
        assert!(session.document().contains_sheet("a"));
    }

    #[test]
    fn test_persistent_conflict_deferred() {
        let session = InMemorySession::new();
        session.inject_conflicts(10);
        let sleeper = RecordingSleeper::new();

        let outcome = dispatch(&session, &RetryConfig::default(), &sleeper, |_, _| create("a"));

        assert!(matches!(outcome, SyncOutcome::Deferred { attempts: 3, .. }));
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
        assert_eq!(session.batches(), 0);
    }

    #[test]
    fn test_rejection_not_retried() {
        let session = InMemorySession::new();
        let sleeper = RecordingSleeper::new();
        let outcome = dispatch(&session, &RetryConfig::default(), &sleeper, |_, _| {
            vec![MutationCommand::DeleteSheet {
                sheet_id: "missing".into(),
            }]
        });

        assert!(matches!(outcome, SyncOutcome::Deferred { attempts: 1, .. }));
        assert!(sleeper.delays().is_empty());
    }

    #[test]
    fn test_stale_revision_conflicts() {
        let session = InMemorySession::new();
        assert_eq!(session.apply(0, &create("a")).unwrap(), 1);
        assert!(session.apply(0, &create("b")).unwrap_err().is_conflict());
        assert_eq!(session.batches(), 1);
    }

    #[test]
    fn test_pending_reported() {
        let session = InMemorySession::new();
        session.set_pending(["sheet_4"]);
        assert_eq!(session.pending_sheet_ids(), vec!["sheet_4".to_string()]);
    }
}
