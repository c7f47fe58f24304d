//! # sheetsync
//!
//! Keeps a collaborative spreadsheet document in line with a set of backing
//! records: one line sheet per record, instantiated from the template of the
//! record's classification, plus the auxiliary sheets those templates share.
//!
//! ## Features
//!
//! - Template instantiation with formula relocation and validation expansion
//! - Idempotent reconciliation against the live document
//! - Optimistic dispatch with bounded exponential retry
//! - List binding preload and edit-back
//!
//! ## Example
//!
//! ```rust
//! use sheetsync::prelude::*;
//! use std::sync::Arc;
//!
//! let templates = TemplateCatalog::new().with(Template::new(
//!     "windows",
//!     vec![
//!         TemplateSheet::new("main", "Costing").with_cell("B1", "=A1*2"),
//!         TemplateSheet::new("resin", "Resin").with_cell("A1", "Grade"),
//!     ],
//! ));
//! let session = Arc::new(InMemorySession::new());
//! let sync = Synchronizer::new(SyncConfig::default(), Arc::new(templates), session.clone());
//!
//! let records = vec![BackingRecord::new(1)
//!     .with_classification("windows")
//!     .with_name("Casement Window")];
//! let outcome = sync.handle(&SyncTrigger::Manual, &records);
//! assert!(matches!(outcome, SyncOutcome::Applied { .. }));
//!
//! let document = session.document();
//! assert_eq!(document.sheet_names(), vec!["Casement Window", "Resin"]);
//! let line = document.sheet("sheet_1").unwrap();
//! assert_eq!(line.cell_a1("B5").unwrap(), Some("=A5*2"));
//!
//! // nothing left to do
//! assert_eq!(sync.handle(&SyncTrigger::Manual, &records), SyncOutcome::UpToDate);
//! ```

pub mod auxiliary;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod instantiate;
pub mod layout;
pub mod list_data;
pub mod prelude;
pub mod reconcile;
pub mod source;
pub mod sync;
pub mod validation;

pub use auxiliary::{ensure_auxiliaries, AuxiliaryBatch, Planned};
pub use config::{RetryConfig, SyncConfig};
pub use dispatch::{
    dispatch, DocumentSession, InMemorySession, RecordingSleeper, Sleeper, SyncOutcome,
    ThreadSleeper,
};
pub use error::{Result, SyncError};
pub use instantiate::{
    bind_record, header_label, instantiate, line_sheet, refresh_record, SheetTarget,
};
pub use layout::SheetLayout;
pub use list_data::{apply_edit, list_row, list_rows};
pub use reconcile::{Reconciler, RecordState};
pub use source::{TemplateCatalog, TemplateSource};
pub use sync::{MainList, SyncTrigger, Synchronizer};
pub use validation::{
    translate as translate_validation, RandomRuleIds, RuleIdGenerator, SequentialRuleIds,
    ValidationTarget,
};

// Re-export the model and formula crates
pub use sheetsync_core::{
    list_id_for, sheet_name_for, AuxiliaryPriority, AuxiliaryRole, Axis, BackingRecord,
    CellAddress, CellRange, ColumnPolicy, Criterion, Document, FieldValue, ListBinding,
    MutationCommand, RecordId, Sheet, SheetId, SheetKind, SheetOffset, Template, TemplateCell,
    TemplateSheet, ValidationSource, WorkbookValidation,
};
pub use sheetsync_formula::{rewrite, FormulaError, MainSheetRename, RewriteRequest};
