//! Prelude module - common imports for sheetsync users
//!
//! ```rust
//! use sheetsync::prelude::*;
//! ```

pub use crate::{
    // Records and templates
    BackingRecord,
    CellAddress,
    CellRange,
    // Documents
    Document,
    DocumentSession,
    FieldValue,
    InMemorySession,
    MutationCommand,
    RecordId,
    // Engine
    Reconciler,
    Result,
    SheetId,
    SyncConfig,
    SyncError,
    SyncOutcome,
    SyncTrigger,
    Synchronizer,
    Template,
    TemplateCatalog,
    TemplateSheet,
    TemplateSource,
    WorkbookValidation,
};
