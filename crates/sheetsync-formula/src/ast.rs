//! Reference AST
//!
//! A formula is kept as a flat token stream: opaque text runs, string
//! literals, and parsed references. Only references are ever modified, so
//! everything else renders back exactly as it was written.

use crate::error::{FormulaError, FormulaResult};
use crate::quoting::quote_sheet_name;
use sheetsync_core::{CellAddress, MAX_COLS};
use std::fmt;

/// Sheet prefix of a reference (`Sheet1!`, `'Profile Master'!`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetQualifier {
    /// Unescaped sheet name
    pub name: String,
    /// Whether the source text wrapped the name in single quotes
    pub quoted: bool,
}

impl SheetQualifier {
    pub fn new<S: Into<String>>(name: S, quoted: bool) -> Self {
        Self {
            name: name.into(),
            quoted,
        }
    }

    /// Case-insensitive name comparison, the way spreadsheet applications match sheets
    pub fn is(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

impl fmt::Display for SheetQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "'{}'", self.name.replace('\'', "''"))
        } else {
            f.write_str(&quote_sheet_name(&self.name))
        }
    }
}

/// A column coordinate of a whole-column span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRef {
    pub col: u16,
    pub fixed: bool,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fixed {
            f.write_str("$")?;
        }
        f.write_str(&CellAddress::column_to_letters(self.col))
    }
}

/// What a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefTarget {
    /// `A1`, `$B$3`
    Cell(CellAddress),
    /// `A1:C9`; corners kept in source order
    Range(CellAddress, CellAddress),
    /// `A:C`
    Columns(ColumnRef, ColumnRef),
}

impl fmt::Display for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefTarget::Cell(a) => write!(f, "{a}"),
            RefTarget::Range(a, b) => write!(f, "{a}:{b}"),
            RefTarget::Columns(a, b) => write!(f, "{a}:{b}"),
        }
    }
}

/// A reference with its optional sheet prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub sheet: Option<SheetQualifier>,
    pub target: RefTarget,
}

impl Reference {
    pub fn new(sheet: Option<SheetQualifier>, target: RefTarget) -> Self {
        Self { sheet, target }
    }

    /// Move the reference.
    ///
    /// `rows` applies to relative rows and, when `fixed_rows` is set, to fixed
    /// rows as well. `cols` applies to relative columns only. A component that
    /// leaves the grid yields [`FormulaError::InvalidReference`].
    pub fn shifted(&self, rows: i64, cols: i64, fixed_rows: bool) -> FormulaResult<Reference> {
        let move_cell = |addr: &CellAddress| -> FormulaResult<CellAddress> {
            let dr = if addr.row_absolute && !fixed_rows { 0 } else { rows };
            let dc = if addr.col_absolute { 0 } else { cols };
            addr.offset(dr, dc)
                .map_err(|e| FormulaError::InvalidReference(e.to_string()))
        };
        let move_col = |c: &ColumnRef| -> FormulaResult<ColumnRef> {
            if c.fixed {
                return Ok(*c);
            }
            let col = i64::from(c.col) + cols;
            if col < 0 || col >= i64::from(MAX_COLS) {
                return Err(FormulaError::InvalidReference(format!(
                    "column {col} out of bounds"
                )));
            }
            Ok(ColumnRef {
                col: col as u16,
                fixed: false,
            })
        };

        let target = match &self.target {
            RefTarget::Cell(a) => RefTarget::Cell(move_cell(a)?),
            RefTarget::Range(a, b) => RefTarget::Range(move_cell(a)?, move_cell(b)?),
            RefTarget::Columns(a, b) => RefTarget::Columns(move_col(a)?, move_col(b)?),
        };
        Ok(Reference {
            sheet: self.sheet.clone(),
            target,
        })
    }

    /// Move every row, fixed or not, leaving columns alone
    pub fn shifted_rows(&self, rows: i64) -> FormulaResult<Reference> {
        self.shifted(rows, 0, true)
    }

    /// Last row a reference touches, if it has rows at all
    pub fn max_row(&self) -> Option<u32> {
        match &self.target {
            RefTarget::Cell(a) => Some(a.row),
            RefTarget::Range(a, b) => Some(a.row.max(b.row)),
            RefTarget::Columns(..) => None,
        }
    }

    /// Render with the sheet name always single-quoted
    pub fn to_quoted_string(&self) -> String {
        match &self.sheet {
            Some(q) => format!("'{}'!{}", q.name.replace('\'', "''"), self.target),
            None => self.target.to_string(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            write!(f, "{sheet}!")?;
        }
        write!(f, "{}", self.target)
    }
}

/// One lexical element of a formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Operators, function names, numbers, names: rendered verbatim
    Text(String),
    /// A string literal including its surrounding double quotes
    Str(String),
    Ref(Reference),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(s) | Token::Str(s) => f.write_str(s),
            Token::Ref(r) => write!(f, "{r}"),
        }
    }
}

/// Render a token stream back to formula text
pub fn render(tokens: &[Token]) -> String {
    tokens.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn test_shift_respects_anchors() {
        let r = Reference::new(None, RefTarget::Range(cell("A1"), cell("$B$2")));
        assert_eq!(r.shifted(4, 1, false).unwrap().to_string(), "B5:$B$2");
        assert_eq!(r.shifted(4, 1, true).unwrap().to_string(), "B5:$B$6");
    }

    #[test]
    fn test_shift_out_of_grid() {
        let r = Reference::new(None, RefTarget::Cell(cell("A1")));
        assert!(matches!(
            r.shifted(-1, 0, false),
            Err(FormulaError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_columns_move_only_when_relative() {
        let r = Reference::new(
            None,
            RefTarget::Columns(
                ColumnRef { col: 0, fixed: true },
                ColumnRef { col: 2, fixed: false },
            ),
        );
        assert_eq!(r.shifted(10, 1, true).unwrap().to_string(), "$A:D");
        assert_eq!(r.max_row(), None);
    }

    #[test]
    fn test_qualifier_rendering() {
        let r = Reference::new(
            Some(SheetQualifier::new("Profile Master", false)),
            RefTarget::Cell(cell("A1")),
        );
        assert_eq!(r.to_string(), "'Profile Master'!A1");

        let r = Reference::new(
            Some(SheetQualifier::new("Helper", false)),
            RefTarget::Cell(cell("A1")),
        );
        assert_eq!(r.to_string(), "Helper!A1");
        assert_eq!(r.to_quoted_string(), "'Helper'!A1");

        let q = SheetQualifier::new("Bob's", true);
        assert_eq!(q.to_string(), "'Bob''s'");
        assert!(q.is("BOB'S"));
    }

    #[test]
    fn test_render_tokens() {
        let tokens = vec![
            Token::Text("=".into()),
            Token::Ref(Reference::new(None, RefTarget::Cell(cell("A1")))),
            Token::Text("&".into()),
            Token::Str("\"A1\"".into()),
        ];
        assert_eq!(render(&tokens), "=A1&\"A1\"");
    }
}
