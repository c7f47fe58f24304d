//! Sheet name quoting
//!
//! A sheet name can appear bare in a reference only when it reads as a plain
//! identifier and could not be confused with a cell address. Everything else
//! is wrapped in single quotes, with embedded quotes doubled.

use lazy_regex::regex_is_match;

/// Whether a sheet name must be single-quoted inside a reference
pub fn needs_quotes(name: &str) -> bool {
    if !regex_is_match!(r"^[A-Za-z_][A-Za-z0-9_.]*$", name) {
        return true;
    }
    // `AB12` or `R1C1` would be read as a cell
    regex_is_match!(r"^[A-Za-z]{1,3}[0-9]+$", name)
        || regex_is_match!(r"^[Rr][0-9]*[Cc][0-9]*$", name)
        || name.eq_ignore_ascii_case("true")
        || name.eq_ignore_ascii_case("false")
}

/// Render a sheet name for use before `!`, quoting only when needed
pub fn quote_sheet_name(name: &str) -> String {
    if needs_quotes(name) {
        always_quote(name)
    } else {
        name.to_string()
    }
}

/// Render a sheet name single-quoted regardless of its content
pub fn always_quote(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Strip surrounding quotes and un-double embedded ones
pub fn unquote(raw: &str) -> String {
    match raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_stay_bare() {
        assert_eq!(quote_sheet_name("Helper"), "Helper");
        assert_eq!(quote_sheet_name("Sheet_2.v1"), "Sheet_2.v1");
    }

    #[test]
    fn test_names_needing_quotes() {
        assert_eq!(quote_sheet_name("Profile Master"), "'Profile Master'");
        assert_eq!(quote_sheet_name("2024"), "'2024'");
        assert_eq!(quote_sheet_name("AB12"), "'AB12'");
        assert_eq!(quote_sheet_name("R1C1"), "'R1C1'");
        assert_eq!(quote_sheet_name("Bob's"), "'Bob''s'");
        assert_eq!(quote_sheet_name("Prix €"), "'Prix €'");
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'Bob''s'"), "Bob's");
        assert_eq!(unquote("Helper"), "Helper");
        assert_eq!(always_quote("Helper"), "'Helper'");
    }
}
