//! Reference tokenizer
//!
//! Splits formula text into [`Token`]s. Anything that is not a reference or a
//! string literal is kept as verbatim text, so the tokenizer never needs to
//! understand operator precedence or function signatures.

use crate::ast::{ColumnRef, RefTarget, Reference, SheetQualifier, Token};
use crate::error::{FormulaError, FormulaResult};
use crate::quoting::needs_quotes;
use lazy_regex::regex_captures;
use sheetsync_core::CellAddress;

/// Tokenize formula text.
///
/// `sheet_names` lets names containing spaces or other special characters be
/// recognized even when they were written without quotes (`Profile Master!A1`).
///
/// # Example
/// ```rust
/// use sheetsync_formula::{tokenize, Token};
///
/// let tokens = tokenize("=SUM(A1:A3)*'Profile Master'!$B$2", &[]).unwrap();
/// let refs = tokens.iter().filter(|t| matches!(t, Token::Ref(_))).count();
/// assert_eq!(refs, 2);
/// ```
pub fn tokenize(formula: &str, sheet_names: &[String]) -> FormulaResult<Vec<Token>> {
    let mut known: Vec<&str> = sheet_names
        .iter()
        .map(String::as_str)
        .filter(|n| !n.is_empty() && needs_quotes(n) && !n.starts_with('\''))
        .collect();
    // Longest first so "Profile Master 2" wins over "Profile Master"
    known.sort_by_key(|n| std::cmp::Reverse(n.len()));

    let mut lexer = Lexer {
        input: formula,
        pos: 0,
        known,
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

/// Collect the references of a formula, in order of appearance
pub fn references(formula: &str, sheet_names: &[String]) -> FormulaResult<Vec<Reference>> {
    Ok(tokenize(formula, sheet_names)?
        .into_iter()
        .filter_map(|t| match t {
            Token::Ref(r) => Some(r),
            _ => None,
        })
        .collect())
}

/// Parse text that must consist of exactly one reference (`'Resin'!A2:A20`)
pub fn parse_reference(text: &str, sheet_names: &[String]) -> FormulaResult<Reference> {
    let text = text.trim();
    let mut tokens = tokenize(text, sheet_names)?;
    match (tokens.pop(), tokens.is_empty()) {
        (Some(Token::Ref(r)), true) => Ok(r),
        _ => Err(FormulaError::InvalidReference(text.to_string())),
    }
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    known: Vec<&'a str>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn run(&mut self) -> FormulaResult<()> {
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                if let Some(name) = self.match_known_name() {
                    let start = self.pos;
                    self.pos += name.len() + 1; // name and '!'
                    self.scan_after_qualifier(SheetQualifier::new(name, false), start);
                    continue;
                }
            }

            match c {
                '"' => self.scan_string()?,
                '\'' => self.scan_quoted_qualifier()?,
                '#' => self.scan_error_literal(),
                c if c.is_ascii_digit() || c == '.' => {
                    let input = self.input;
                    let start = self.pos;
                    self.skip_word();
                    self.push_text(&input[start..self.pos]);
                }
                c if c.is_ascii_alphabetic() || c == '_' || c == '$' => self.scan_word(),
                c => {
                    self.advance();
                    let mut buf = [0u8; 4];
                    self.push_text(c.encode_utf8(&mut buf));
                }
            }
        }
        Ok(())
    }

    /// A known special sheet name followed by `!` at the current position
    fn match_known_name(&self) -> Option<&'a str> {
        let input: &'a str = self.input;
        let rest = &input[self.pos..];
        self.known.iter().copied().find_map(|name| {
            let head = rest.get(..name.len())?;
            let matches = head.eq_ignore_ascii_case(name) && rest[name.len()..].starts_with('!');
            // Keep the spelling the formula used
            matches.then_some(head)
        })
    }

    fn scan_string(&mut self) -> FormulaResult<()> {
        let start = self.pos;
        self.advance(); // opening quote
        loop {
            match self.peek_char() {
                None => {
                    return Err(FormulaError::Parse(format!(
                        "unterminated string literal at {start}"
                    )))
                }
                Some('"') if self.peek_char_at(1) == Some('"') => {
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some(_) => self.advance(),
            }
        }
        self.tokens
            .push(Token::Str(self.input[start..self.pos].to_string()));
        Ok(())
    }

    fn scan_quoted_qualifier(&mut self) -> FormulaResult<()> {
        let input = self.input;
        let start = self.pos;
        // `''Sheet Name''!` reads as `'Sheet Name'!`
        if let Some((whole, name)) = regex_captures!(r"^''([^']+)''!", &input[start..]) {
            self.pos += whole.len();
            self.scan_after_qualifier(SheetQualifier::new(name, true), start);
            return Ok(());
        }
        self.advance(); // opening quote
        let mut name = String::new();
        loop {
            match self.peek_char() {
                None => {
                    return Err(FormulaError::Parse(format!(
                        "unterminated sheet name at {start}"
                    )))
                }
                Some('\'') if self.peek_char_at(1) == Some('\'') => {
                    name.push('\'');
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
            }
        }

        if self.peek_char() == Some('!') {
            self.advance();
            self.scan_after_qualifier(SheetQualifier::new(name, true), start);
        } else {
            self.push_text(&input[start..self.pos]);
        }
        Ok(())
    }

    /// `#REF!`, `#N/A`, `#DIV/0!` and friends
    fn scan_error_literal(&mut self) {
        let input = self.input;
        let start = self.pos;
        self.advance();
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '/' || c == '?' || c == '!')
        {
            self.advance();
        }
        self.push_text(&input[start..self.pos]);
    }

    fn scan_word(&mut self) {
        let input = self.input;
        let start = self.pos;
        self.skip_word();
        let word = &input[start..self.pos];

        match self.peek_char() {
            Some('!') => {
                self.advance();
                self.scan_after_qualifier(SheetQualifier::new(word, false), start);
            }
            Some('(') => self.push_text(word),
            _ => match self.scan_target(word) {
                Some(target) => self.tokens.push(Token::Ref(Reference::new(None, target))),
                None => self.push_text(word),
            },
        }
    }

    /// Parse the reference following `Sheet!`; `start` is where the qualifier began
    fn scan_after_qualifier(&mut self, sheet: SheetQualifier, start: usize) {
        let input = self.input;
        let word_start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '$')
        {
            self.advance();
        }
        let word = &input[word_start..self.pos];

        match self.scan_target(word) {
            Some(target) if self.peek_char() != Some('(') => self
                .tokens
                .push(Token::Ref(Reference::new(Some(sheet), target))),
            _ => self.push_text(&input[start..self.pos]),
        }
    }

    /// Interpret `first` as a cell or column, extending it with `:second` when
    /// the text continues as a range
    fn scan_target(&mut self, first: &str) -> Option<RefTarget> {
        let cell = parse_cell(first);
        let column = parse_column(first);
        if cell.is_none() && column.is_none() {
            return None;
        }

        if self.peek_char() == Some(':') {
            let input = self.input;
            let saved = self.pos;
            self.advance();
            let second_start = self.pos;
            while self
                .peek_char()
                .map_or(false, |c| c.is_ascii_alphanumeric() || c == '$')
            {
                self.advance();
            }
            let second = &input[second_start..self.pos];
            let followed_ok = !self
                .peek_char()
                .map_or(false, |c| c == '!' || c == '(' || c == '_' || c == '.');

            if followed_ok {
                match (cell, column, parse_cell(second), parse_column(second)) {
                    (Some(a), _, Some(b), _) => return Some(RefTarget::Range(a, b)),
                    (_, Some(a), _, Some(b)) => return Some(RefTarget::Columns(a, b)),
                    _ => {}
                }
            }
            self.pos = saved;
        }

        cell.map(RefTarget::Cell)
    }

    fn skip_word(&mut self) {
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$')
        {
            self.advance();
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Token::Text(last)) = self.tokens.last_mut() {
            last.push_str(text);
        } else {
            self.tokens.push(Token::Text(text.to_string()));
        }
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }
}

/// `A1`, `$B$3`; rejects anything with trailing characters
fn parse_cell(text: &str) -> Option<CellAddress> {
    if !lazy_regex::regex_is_match!(r"^\$?[A-Za-z]{1,3}\$?[0-9]+$", text) {
        return None;
    }
    CellAddress::parse(text).ok()
}

/// `C`, `$AB`
fn parse_column(text: &str) -> Option<ColumnRef> {
    let (fixed, letters) = match text.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if !lazy_regex::regex_is_match!(r"^[A-Za-z]{1,3}$", letters) {
        return None;
    }
    CellAddress::letters_to_column(letters)
        .ok()
        .map(|col| ColumnRef { col, fixed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::render;
    use pretty_assertions::assert_eq;

    fn refs(formula: &str, names: &[&str]) -> Vec<String> {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        references(formula, &names)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_roundtrip_is_verbatim() {
        for formula in [
            "=SUM(A1:B2)+$C$3*2",
            "=IF(A1>0,\"A1 is positive\",#N/A)",
            "=VLOOKUP($A5,'Profile Master'!$A$2:$D$200,4,FALSE)",
            "=LOG10(100)+1.5E3",
            "=Helper!A:A",
            "= A1 &  \"x\"",
        ] {
            assert_eq!(render(&tokenize(formula, &[]).unwrap()), formula);
        }
    }

    #[test]
    fn test_reference_kinds() {
        assert_eq!(
            refs("=SUM(A1:B2)+$C$3+Helper!A:C+'Resin'!B2", &[]),
            vec!["A1:B2", "$C$3", "Helper!A:C", "'Resin'!B2"]
        );
    }

    #[test]
    fn test_strings_and_functions_are_not_references() {
        assert_eq!(refs("=CONCAT(\"B2\",TRUE,ROUND(2))", &[]), Vec::<String>::new());
        assert_eq!(refs("=Rate*2", &[]), Vec::<String>::new());
    }

    #[test]
    fn test_error_literal_is_opaque() {
        assert_eq!(refs("=#REF!+A1", &[]), vec!["A1"]);
        assert_eq!(refs("=Sheet1!#REF!", &[]), Vec::<String>::new());
    }

    #[test]
    fn test_known_unquoted_names() {
        let found = refs("=Profile Master!A1+profile master!B2", &["Profile Master"]);
        assert_eq!(found, vec!["'Profile Master'!A1", "'profile master'!B2"]);
    }

    #[test]
    fn test_doubled_quotes_collapse() {
        assert_eq!(refs("=''Profile Master''!A1", &[]), vec!["'Profile Master'!A1"]);
        assert_eq!(refs("=B1&''Resin''!A2", &[]), vec!["B1", "'Resin'!A2"]);
    }

    #[test]
    fn test_doubled_quotes_inside_string_untouched() {
        let formula = "=\"''x''!\"&A1";
        let tokens = tokenize(formula, &[]).unwrap();
        assert_eq!(render(&tokens), formula);
        assert_eq!(tokens[1], Token::Str("\"''x''!\"".into()));
        assert_eq!(refs(formula, &[]), vec!["A1"]);
    }

    #[test]
    fn test_escaped_quote_in_name() {
        let found = references("='Bob''s'!C4", &[]).unwrap();
        assert_eq!(found[0].sheet.as_ref().unwrap().name, "Bob's");
    }

    #[test]
    fn test_unterminated() {
        assert!(matches!(tokenize("='Open!A1", &[]), Err(FormulaError::Parse(_))));
        assert!(matches!(tokenize("=\"abc", &[]), Err(FormulaError::Parse(_))));
    }

    #[test]
    fn test_parse_reference() {
        let r = parse_reference("Resin!$A$2:$A$20", &[]).unwrap();
        assert_eq!(r.to_quoted_string(), "'Resin'!$A$2:$A$20");
        assert!(parse_reference("A1+B1", &[]).is_err());
        assert!(parse_reference("Rate", &[]).is_err());
    }
}
