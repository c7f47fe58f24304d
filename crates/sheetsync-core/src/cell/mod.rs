//! Cell addressing
//!
//! This module contains:
//! - [`CellAddress`] - A cell's location (e.g., "A1", "$B$3")
//! - [`CellRange`] - A range of cells (e.g., "A1:B10")
//! - [`SheetOffset`] - Where a template lands inside a destination sheet

mod address;

pub use address::{CellAddress, CellRange, CellRangeIterator, SheetOffset};
