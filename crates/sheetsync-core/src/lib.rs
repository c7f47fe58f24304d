//! # sheetsync-core
//!
//! Core data structures for the sheetsync template engine.
//!
//! This crate provides the fundamental types used throughout sheetsync:
//! - [`CellAddress`], [`CellRange`] and [`SheetOffset`] - Cell addressing
//! - [`Template`] and [`TemplateSheet`] - Parsed workbook templates
//! - [`BackingRecord`] and [`ColumnPolicy`] - The records line sheets represent
//! - [`MutationCommand`] - The command vocabulary sent to a document
//! - [`Document`] - An in-memory document that applies command batches atomically
//!
//! ## Example
//!
//! ```rust
//! use sheetsync_core::{CellAddress, Document, MutationCommand};
//!
//! let mut doc = Document::new();
//! doc.apply(&[
//!     MutationCommand::CreateSheet {
//!         sheet_id: "sheet_1".into(),
//!         name: "Window".into(),
//!         position: 0,
//!     },
//!     MutationCommand::update_cell("sheet_1", CellAddress::new(4, 0), "=B5*2"),
//! ])
//! .unwrap();
//!
//! let sheet = doc.sheet("sheet_1").unwrap();
//! assert_eq!(sheet.cell_a1("A5").unwrap(), Some("=B5*2"));
//! ```

pub mod cell;
pub mod command;
pub mod document;
pub mod error;
pub mod record;
pub mod template;
pub mod validation;

// Re-exports for convenience
pub use cell::{CellAddress, CellRange, SheetOffset};
pub use command::{Axis, Criterion, MutationCommand};
pub use document::{
    list_id_for, sheet_name_for, Document, ListBinding, Sheet, SheetId, SheetKind, Table,
    ValidationRule,
};
pub use error::{Error, Result};
pub use record::{BackingRecord, ColumnPolicy, FieldValue, RecordId};
pub use template::{
    AuxiliaryPriority, AuxiliaryRole, ClassificationId, Template, TemplateCell, TemplateSheet,
};
pub use validation::{ValidationSource, WorkbookValidation};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
