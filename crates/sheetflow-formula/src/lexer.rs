//! Formula tokenizer
//!
//! Turns formula text into a flat token stream and validates the structure
//! the parser relies on (leading `=`, terminated strings, balanced brackets).
//! Failures are reported as the error kind the cell should show.

use sheetflow_core::CellError;

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),

    // Identifiers and references
    Identifier(String), // Function name, named range, `$1` or column letters
    CellRef(String),    // Cell reference like A1, $A$1
    SheetRef(String),   // Sheet reference like Sheet1! or 'My Sheet'!

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Colon,
    Comma,
    Semicolon,
    At,
    Hash,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,

    // End of input
    Eof,
}

/// Tokens of one formula, without the leading `=`
#[derive(Debug, Clone, PartialEq)]
pub struct TokenStream {
    source: String,
    tokens: Vec<Token>,
}

impl TokenStream {
    /// The formula text the tokens were read from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Tokenize a formula string
///
/// Structural problems (missing `=`, unterminated strings, unbalanced
/// brackets) yield `#VALUE!`; an empty body or an unreadable token yields
/// `#NAME?`.
///
/// # Example
/// ```rust
/// use sheetflow_formula::lexer::{tokenize, Token};
///
/// let stream = tokenize("=A1+1").unwrap();
/// assert_eq!(stream.tokens()[1], Token::Plus);
/// ```
pub fn tokenize(formula: &str) -> Result<TokenStream, CellError> {
    let trimmed = formula.trim();
    let body = trimmed.strip_prefix('=').ok_or(CellError::Value)?;

    let mut lexer = Lexer::new(body);
    let mut tokens = Vec::new();
    let mut parens = 0usize;
    let mut braces = 0usize;

    loop {
        let token = lexer.scan_token(tokens.last())?;
        match token {
            Token::Eof => break,
            Token::LeftParen => parens += 1,
            Token::RightParen => parens = parens.checked_sub(1).ok_or(CellError::Value)?,
            Token::LeftBrace => braces += 1,
            Token::RightBrace => braces = braces.checked_sub(1).ok_or(CellError::Value)?,
            _ => {}
        }
        tokens.push(token);
    }

    if parens != 0 || braces != 0 {
        return Err(CellError::Value);
    }
    if tokens.is_empty() {
        return Err(CellError::Name);
    }

    Ok(TokenStream {
        source: trimmed.to_string(),
        tokens,
    })
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    // === Token scanning ===

    fn scan_token(&mut self, previous: Option<&Token>) -> Result<Token, CellError> {
        self.skip_whitespace();

        let Some(c) = self.peek_char() else {
            return Ok(Token::Eof);
        };

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '%' => Some(Token::Percent),
            '&' => Some(Token::Ampersand),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '@' => Some(Token::At),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            '{' => Some(Token::LeftBrace),
            '}' => Some(Token::RightBrace),
            '=' => Some(Token::Equal),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        // Two-character operators
        if c == '<' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Ok(Token::LessEqual);
            } else if self.peek_char() == Some('>') {
                self.advance();
                return Ok(Token::NotEqual);
            }
            return Ok(Token::LessThan);
        }

        if c == '>' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Ok(Token::GreaterEqual);
            }
            return Ok(Token::GreaterThan);
        }

        if c == '"' {
            return self.scan_string();
        }

        if c == '\'' {
            return self.scan_quoted_sheet();
        }

        // `#` right after a reference is the spill operator
        if c == '#' && follows_reference(previous) {
            self.advance();
            return Ok(Token::Hash);
        }

        if c == '#' {
            return self.scan_error();
        }

        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return Ok(self.scan_number());
        }

        if c.is_alphabetic() || c == '_' || c == '$' || c == '\\' {
            return Ok(self.scan_identifier_or_ref());
        }

        Err(CellError::Name)
    }

    fn scan_string(&mut self) -> Result<Token, CellError> {
        self.advance(); // Skip opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                Some('"') if self.peek_char_at(1) == Some('"') => {
                    s.push('"');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    return Ok(Token::String(s));
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                None => return Err(CellError::Value),
            }
        }
    }

    /// `'My Sheet'!` with `''` as an escaped quote
    fn scan_quoted_sheet(&mut self) -> Result<Token, CellError> {
        self.advance();

        let mut name = String::new();
        loop {
            match self.peek_char() {
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
                None => return Err(CellError::Value),
            }
        }

        if self.peek_char() != Some('!') || name.is_empty() {
            return Err(CellError::Value);
        }
        self.advance();
        Ok(Token::SheetRef(name))
    }

    fn scan_error(&mut self) -> Result<Token, CellError> {
        let start = self.pos;
        self.advance();
        while self.peek_char().map_or(false, |c| {
            c.is_ascii_alphanumeric() || c == '!' || c == '/' || c == '?'
        }) {
            self.advance();
        }
        CellError::parse(&self.input[start..self.pos])
            .map(Token::Error)
            .ok_or(CellError::Name)
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part, only when digits follow
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            let signed = self.peek_char_at(1).map_or(false, |c| c == '+' || c == '-');
            let digit_at = if signed { 2 } else { 1 };
            if self
                .peek_char_at(digit_at)
                .map_or(false, |c| c.is_ascii_digit())
            {
                for _ in 0..digit_at {
                    self.advance();
                }
                while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let num_str = &self.input[start..self.pos];
        Token::Number(num_str.parse().unwrap_or(0.0))
    }

    fn scan_identifier_or_ref(&mut self) -> Token {
        let start = self.pos;

        while self.peek_char().map_or(false, |c| {
            c.is_alphanumeric() || c == '_' || c == '$' || c == '.' || c == '\\'
        }) {
            self.advance();
        }

        let text = &self.input[start..self.pos];

        // Sheet reference (ends with !)
        if self.peek_char() == Some('!') {
            self.advance();
            return Token::SheetRef(text.to_string());
        }

        // Booleans, unless used as a function name
        let upper = text.to_uppercase();
        if upper == "TRUE" && self.peek_char() != Some('(') {
            return Token::Boolean(true);
        }
        if upper == "FALSE" && self.peek_char() != Some('(') {
            return Token::Boolean(false);
        }

        // LOG10(100) is a function call, not a cell reference
        if is_cell_reference(text) && self.peek_char() != Some('(') {
            return Token::CellRef(text.to_string());
        }

        Token::Identifier(text.to_string())
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

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }
}

fn follows_reference(previous: Option<&Token>) -> bool {
    matches!(
        previous,
        Some(Token::CellRef(_) | Token::Identifier(_) | Token::RightParen)
    )
}

/// `[$]letters[$]digits`, consuming the whole text
pub(crate) fn is_cell_reference(text: &str) -> bool {
    let rest = text.strip_prefix('$').unwrap_or(text);
    let letters = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    if letters == 0 {
        return false;
    }
    let rest = &rest[letters..];
    let digits = rest.strip_prefix('$').unwrap_or(rest);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokenize_simple() {
        let stream = tokenize("=A1+B1").unwrap();
        assert_eq!(
            stream.tokens(),
            &[
                Token::CellRef("A1".into()),
                Token::Plus,
                Token::CellRef("B1".into()),
            ]
        );
        assert_eq!(stream.source(), "=A1+B1");
    }

    #[test]
    fn test_tokenize_spill_and_at() {
        let stream = tokenize("=@A1:A3+B1#").unwrap();
        assert_eq!(
            stream.tokens(),
            &[
                Token::At,
                Token::CellRef("A1".into()),
                Token::Colon,
                Token::CellRef("A3".into()),
                Token::Plus,
                Token::CellRef("B1".into()),
                Token::Hash,
            ]
        );
    }

    #[test]
    fn test_tokenize_error_literal_vs_spill() {
        let stream = tokenize("=1+#REF!").unwrap();
        assert_eq!(stream.tokens()[2], Token::Error(CellError::Ref));

        assert_eq!(tokenize("=#FOO!"), Err(CellError::Name));
    }

    #[test]
    fn test_tokenize_quoted_sheet() {
        let stream = tokenize("='My ''Big'' Sheet'!A1").unwrap();
        assert_eq!(
            stream.tokens(),
            &[
                Token::SheetRef("My 'Big' Sheet".into()),
                Token::CellRef("A1".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_row_and_column_parts() {
        let stream = tokenize("=SUM(1:3,$A:C)").unwrap();
        assert_eq!(
            stream.tokens(),
            &[
                Token::Identifier("SUM".into()),
                Token::LeftParen,
                Token::Number(1.0),
                Token::Colon,
                Token::Number(3.0),
                Token::Comma,
                Token::Identifier("$A".into()),
                Token::Colon,
                Token::Identifier("C".into()),
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_tokenize_structural_failures() {
        assert_eq!(tokenize("A1+1"), Err(CellError::Value));
        assert_eq!(tokenize("=\"open"), Err(CellError::Value));
        assert_eq!(tokenize("=SUM(A1"), Err(CellError::Value));
        assert_eq!(tokenize("=A1)"), Err(CellError::Value));
        assert_eq!(tokenize("={1,2"), Err(CellError::Value));
        assert_eq!(tokenize("='Sheet1A1"), Err(CellError::Value));
    }

    #[test]
    fn test_tokenize_name_failures() {
        assert_eq!(tokenize("="), Err(CellError::Name));
        assert_eq!(tokenize("=   "), Err(CellError::Name));
        assert_eq!(tokenize("=A1 ~ 2"), Err(CellError::Name));
    }

    #[test]
    fn test_tokenize_numbers() {
        let stream = tokenize("=1.5e3+.5").unwrap();
        assert_eq!(
            stream.tokens(),
            &[Token::Number(1500.0), Token::Plus, Token::Number(0.5)]
        );
    }

    #[test]
    fn test_is_cell_reference() {
        assert!(is_cell_reference("A1"));
        assert!(is_cell_reference("$XFD$1048576"));
        assert!(!is_cell_reference("LOG10X"));
        assert!(!is_cell_reference("A"));
        assert!(!is_cell_reference("$1"));
    }
}
