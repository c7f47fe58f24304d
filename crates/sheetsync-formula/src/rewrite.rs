//! Formula relocation
//!
//! Moves a template formula to its position in a destination sheet:
//!
//! 1. References into the sheet being copied (unqualified, or qualified with
//!    the origin sheet name) are fill-translated by `dest - origin`. Relative
//!    rows and columns move; fixed columns stay; fixed rows move by the same
//!    row displacement, since the whole template block moved down.
//! 2. Those references are renamed to the destination sheet when qualified.
//! 3. References to the template main sheet, seen from an auxiliary sheet,
//!    follow the main sheet's rename and row offset.
//! 4. References to any other sheet are left where they point.
//! 5. A doubled leading `=` and doubled quotes around sheet names are
//!    collapsed; sheet names that need quoting are quoted.

use crate::ast::{render, Reference, SheetQualifier, Token};
use crate::error::FormulaResult;
use crate::lexer::tokenize;
use sheetsync_core::CellAddress;

/// Where the template main sheet ended up, for formulas living on auxiliary sheets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainSheetRename {
    /// Main sheet name in the template workbook
    pub old_name: String,
    /// Name of the line sheet the main sheet became
    pub new_name: String,
    /// Rows the main sheet content moved down by
    pub row_offset: i64,
}

/// Everything needed to move one formula
#[derive(Debug, Clone, Copy)]
pub struct RewriteRequest<'a> {
    /// Template coordinate the formula was written at
    pub origin: CellAddress,
    /// Coordinate it is written to
    pub dest: CellAddress,
    pub origin_sheet: &'a str,
    pub dest_sheet: &'a str,
    /// Every sheet name the formula may mention
    pub sheet_names: &'a [String],
    pub main_sheet: Option<&'a MainSheetRename>,
}

/// Rewrite cell content for its destination. Non-formula content is returned as is.
///
/// # Example
/// ```rust
/// use sheetsync_core::CellAddress;
/// use sheetsync_formula::{rewrite, RewriteRequest};
///
/// let names = vec!["Costing".to_string(), "Profile Master".to_string()];
/// let request = RewriteRequest {
///     origin: CellAddress::new(2, 2),
///     dest: CellAddress::new(6, 2),
///     origin_sheet: "Costing",
///     dest_sheet: "Casement Window",
///     sheet_names: &names,
///     main_sheet: None,
/// };
/// assert_eq!(
///     rewrite("='Profile Master'!A1 + B3*$B$3", &request).unwrap(),
///     "='Profile Master'!A1 + B7*$B$7"
/// );
/// ```
pub fn rewrite(content: &str, request: &RewriteRequest<'_>) -> FormulaResult<String> {
    if !content.starts_with('=') {
        return Ok(content.to_string());
    }
    let mut body = content;
    while body.starts_with("==") {
        body = &body[1..];
    }

    let names = known_names(request);
    let rows = i64::from(request.dest.row) - i64::from(request.origin.row);
    let cols = i64::from(request.dest.col) - i64::from(request.origin.col);

    let tokens: Vec<Token> = tokenize(body, &names)?
        .into_iter()
        .map(|token| match token {
            Token::Ref(reference) => relocate(reference, request, rows, cols),
            other => other,
        })
        .collect();

    Ok(render(&tokens))
}

fn known_names(request: &RewriteRequest<'_>) -> Vec<String> {
    let mut names: Vec<String> = request.sheet_names.to_vec();
    names.push(request.origin_sheet.to_string());
    names.push(request.dest_sheet.to_string());
    if let Some(main) = request.main_sheet {
        names.push(main.old_name.clone());
        names.push(main.new_name.clone());
    }
    names.sort();
    names.dedup();
    names
}

fn relocate(reference: Reference, request: &RewriteRequest<'_>, rows: i64, cols: i64) -> Token {
    let same_sheet = reference
        .sheet
        .as_ref()
        .map_or(true, |q| q.is(request.origin_sheet));

    if same_sheet {
        return match reference.shifted(rows, cols, true) {
            Ok(mut moved) => {
                if moved.sheet.is_some() {
                    moved.sheet = Some(SheetQualifier::new(request.dest_sheet, false));
                }
                Token::Ref(moved)
            }
            Err(_) => Token::Text("#REF!".into()),
        };
    }

    let main = request.main_sheet.filter(|main| {
        reference
            .sheet
            .as_ref()
            .is_some_and(|q| q.is(&main.old_name))
    });
    match main {
        Some(main) => match reference.shifted_rows(main.row_offset) {
            Ok(mut moved) => {
                moved.sheet = Some(SheetQualifier::new(main.new_name.as_str(), false));
                Token::Ref(moved)
            }
            Err(_) => Token::Text("#REF!".into()),
        },
        None => Token::Ref(reference),
    }
}
