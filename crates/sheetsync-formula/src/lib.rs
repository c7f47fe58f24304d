//! # sheetsync-formula
//!
//! Formula reference handling for sheetsync.
//!
//! This crate provides:
//! - A reference tokenizer (text → tokens, references parsed, everything else verbatim)
//! - A small reference AST with fill-style shifting
//! - The relocation pipeline that moves template formulas into line sheets
//! - Sheet name quoting rules
//!
//! ## Example
//!
//! ```rust
//! use sheetsync_core::CellAddress;
//! use sheetsync_formula::{rewrite, RewriteRequest};
//!
//! let names = vec!["Costing".to_string()];
//! let request = RewriteRequest {
//!     origin: CellAddress::new(0, 0),
//!     dest: CellAddress::new(4, 0),
//!     origin_sheet: "Costing",
//!     dest_sheet: "Door",
//!     sheet_names: &names,
//!     main_sheet: None,
//! };
//! assert_eq!(rewrite("=SUM(A1:A3)", &request).unwrap(), "=SUM(A5:A7)");
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod quoting;
pub mod rewrite;

pub use ast::{render, ColumnRef, RefTarget, Reference, SheetQualifier, Token};
pub use error::{FormulaError, FormulaResult};
pub use lexer::{parse_reference, references, tokenize};
pub use quoting::{always_quote, needs_quotes, quote_sheet_name, unquote};
pub use rewrite::{rewrite, MainSheetRename, RewriteRequest};
