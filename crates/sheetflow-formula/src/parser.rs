//! Formula parser
//!
//! A recursive descent parser over the token stream produced by
//! [`tokenize`], with spreadsheet operator precedence. Relative parts of
//! references are shifted by the offsets handed to [`parse`], so one
//! formula text can be read at several positions.

use crate::ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::lexer::{tokenize, Token, TokenStream};
use sheetflow_core::{CellAddress, CellError, CellRange, RangeKind, MAX_COLS, MAX_ROWS};

/// Parse a formula string into an AST
///
/// # Example
/// ```rust
/// use sheetflow_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("=SUM(A1:A10)").unwrap();
/// let ast = parse_formula("=OFFSET(A1,0,1)").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let tokens = tokenize(formula).map_err(|kind| {
        FormulaError::Parse(format!("cannot tokenize '{}': {}", formula.trim(), kind))
    })?;
    parse(&tokens, 0, 0)
}

/// Parse a token stream into an AST
///
/// `offset_x` shifts relative columns and `offset_y` relative rows. A
/// reference pushed off the sheet by the shift becomes `#REF!`.
pub fn parse(tokens: &TokenStream, offset_x: i64, offset_y: i64) -> FormulaResult<FormulaExpr> {
    let mut parser = FormulaParser::new(tokens.tokens(), offset_x, offset_y);
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if !parser.is_at_end() {
        return Err(FormulaError::Parse(format!(
            "Unexpected token after expression: {:?}",
            parser.current_token()
        )));
    }

    Ok(expr)
}

/// Formula parser
struct FormulaParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    offset_x: i64,
    offset_y: i64,
}

impl<'a> FormulaParser<'a> {
    fn new(tokens: &'a [Token], offset_x: i64, offset_y: i64) -> Self {
        Self {
            tokens,
            pos: 0,
            offset_x,
            offset_y,
        }
    }

    // === Helper methods ===

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current_token(&self) -> &Token {
        self.peek_token(0)
    }

    fn peek_token(&self, ahead: usize) -> &Token {
        self.tokens.get(self.pos + ahead).unwrap_or(&Token::Eof)
    }

    fn consume(&mut self) -> Token {
        let token = self.current_token().clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume();
            Ok(())
        } else {
            Err(FormulaError::Parse(format!(
                "Expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: =, <>, <, <=, >, >=
    // 2. Concatenation: &
    // 3. Addition/Subtraction: +, -
    // 4. Multiplication/Division: *, /
    // 5. Exponentiation: ^
    // 6. Unary: -, +, @, %
    // 7. Range: :
    // 8. Spill: #
    // 9. Primary: literals, references, function calls, parentheses

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_concatenation()?;

        loop {
            let op = match self.current_token() {
                Token::Equal => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.consume();
            let right = self.parse_concatenation()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_concatenation(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_additive()?;

        while matches!(self.current_token(), Token::Ampersand) {
            self.consume();
            let right = self.parse_additive()?;
            left = binary(BinaryOperator::Concat, left, right);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_exponent()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };

            self.consume();
            let right = self.parse_exponent()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_exponent(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_unary()?;

        if matches!(self.current_token(), Token::Caret) {
            self.consume();
            let right = self.parse_exponent()?; // Right associative
            return Ok(binary(BinaryOperator::Power, left, right));
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.current_token() {
            Token::Minus => {
                self.consume();
                let operand = self.parse_unary()?;
                return Ok(unary(UnaryOperator::Negate, operand));
            }
            // Prefix plus (no-op)
            Token::Plus => {
                self.consume();
                return self.parse_unary();
            }
            _ => {}
        }

        let mut expr = if matches!(self.current_token(), Token::At) {
            self.consume();
            let operand = self.parse_range()?;
            unary(UnaryOperator::ImplicitIntersection, operand)
        } else {
            self.parse_range()?
        };

        while matches!(self.current_token(), Token::Percent) {
            self.consume();
            expr = unary(UnaryOperator::Percent, expr);
        }

        Ok(expr)
    }

    fn parse_range(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_spill()?;

        while matches!(self.current_token(), Token::Colon) {
            self.consume();
            let right = self.parse_spill()?;
            left = join_range(left, right)?;
        }

        Ok(left)
    }

    fn parse_spill(&mut self) -> FormulaResult<FormulaExpr> {
        let mut expr = self.parse_primary()?;

        while matches!(self.current_token(), Token::Hash) {
            self.consume();
            expr = unary(UnaryOperator::Spill, expr);
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        if let Some(line_range) = self.try_parse_line_range(None)? {
            return Ok(line_range);
        }

        match self.current_token().clone() {
            Token::Number(n) => {
                self.consume();
                Ok(FormulaExpr::Number(n))
            }

            Token::String(s) => {
                self.consume();
                Ok(FormulaExpr::String(s))
            }

            Token::Boolean(b) => {
                self.consume();
                Ok(FormulaExpr::Boolean(b))
            }

            Token::Error(e) => {
                self.consume();
                Ok(FormulaExpr::Error(e))
            }

            Token::LeftParen => {
                self.consume();
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }

            Token::LeftBrace => self.parse_array(),

            Token::SheetRef(sheet) => {
                self.consume();
                self.parse_sheet_reference(sheet)
            }

            Token::CellRef(ref_str) => {
                self.consume();
                self.parse_cell_reference(None, &ref_str)
            }

            Token::Identifier(name) => {
                self.consume();
                // Check if it's a function call
                if matches!(self.current_token(), Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    // Named range
                    Ok(FormulaExpr::NameRef(name))
                }
            }

            _ => Err(FormulaError::Parse(format!(
                "Unexpected token: {:?}",
                self.current_token()
            ))),
        }
    }

    fn parse_array(&mut self) -> FormulaResult<FormulaExpr> {
        self.expect(&Token::LeftBrace)?;

        let mut rows = Vec::new();
        let mut current_row = Vec::new();

        // Parse first element
        if !matches!(self.current_token(), Token::RightBrace) {
            current_row.push(self.parse_expression()?);

            loop {
                match self.current_token() {
                    Token::Comma => {
                        self.consume();
                        current_row.push(self.parse_expression()?);
                    }
                    Token::Semicolon => {
                        self.consume();
                        rows.push(current_row);
                        current_row = Vec::new();
                        current_row.push(self.parse_expression()?);
                    }
                    Token::RightBrace => break,
                    _ => {
                        return Err(FormulaError::Parse(
                            "Expected ',' ';' or '}' in array".into(),
                        ))
                    }
                }
            }
        }

        if !current_row.is_empty() {
            rows.push(current_row);
        }

        self.expect(&Token::RightBrace)?;
        Ok(FormulaExpr::Array(rows))
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();

        // Parse arguments
        if !matches!(self.current_token(), Token::RightParen) {
            args.push(self.parse_expression()?);

            while matches!(self.current_token(), Token::Comma) {
                self.consume();
                args.push(self.parse_expression()?);
            }
        }

        self.expect(&Token::RightParen)?;

        Ok(FormulaExpr::Function {
            name: name.to_uppercase(),
            args,
        })
    }

    fn parse_sheet_reference(&mut self, sheet: String) -> FormulaResult<FormulaExpr> {
        if let Some(line_range) = self.try_parse_line_range(Some(sheet.clone()))? {
            return Ok(line_range);
        }

        // After Sheet1!, we expect a cell reference
        match self.current_token().clone() {
            Token::CellRef(ref_str) => {
                self.consume();
                self.parse_cell_reference(Some(sheet), &ref_str)
            }
            _ => Err(FormulaError::Parse(
                "Expected cell reference after sheet name".into(),
            )),
        }
    }

    fn parse_cell_reference(
        &mut self,
        sheet: Option<String>,
        ref_str: &str,
    ) -> FormulaResult<FormulaExpr> {
        let address = CellAddress::parse(ref_str).map_err(|e| {
            FormulaError::Parse(format!("Invalid cell reference '{}': {}", ref_str, e))
        })?;

        match address.translate_relative(self.offset_x, self.offset_y) {
            Ok(address) => Ok(FormulaExpr::CellRef(CellReference { sheet, address })),
            Err(_) => Ok(FormulaExpr::Error(CellError::Ref)),
        }
    }

    /// Whole-row (`1:3`, `$2:$2`) or whole-column (`A:C`) references.
    ///
    /// Only consumes tokens when the full `bound : bound` shape matches.
    fn try_parse_line_range(
        &mut self,
        sheet: Option<String>,
    ) -> FormulaResult<Option<FormulaExpr>> {
        if !matches!(self.peek_token(1), Token::Colon) {
            return Ok(None);
        }
        let (first, second) = (self.current_token(), self.peek_token(2));

        // Function names never qualify: `A:B(` is not a column range
        if matches!(self.peek_token(3), Token::LeftParen) {
            return Ok(None);
        }

        let expr = if let (Some(start), Some(end)) = (row_bound(first), row_bound(second)) {
            let start = self.shift_row(start);
            let end = self.shift_row(end);
            match (start, end) {
                (Some(start), Some(end)) => FormulaExpr::RangeRef(RangeReference {
                    sheet,
                    range: CellRange::new(
                        CellAddress::with_absolute(start.0, 0, start.1, true),
                        CellAddress::with_absolute(end.0, MAX_COLS - 1, end.1, true),
                    ),
                    kind: RangeKind::Row,
                }),
                _ => FormulaExpr::Error(CellError::Ref),
            }
        } else if let (Some(start), Some(end)) = (column_bound(first), column_bound(second)) {
            let start = self.shift_column(start);
            let end = self.shift_column(end);
            match (start, end) {
                (Some(start), Some(end)) => FormulaExpr::RangeRef(RangeReference {
                    sheet,
                    range: CellRange::new(
                        CellAddress::with_absolute(0, start.0, true, start.1),
                        CellAddress::with_absolute(MAX_ROWS - 1, end.0, true, end.1),
                    ),
                    kind: RangeKind::Column,
                }),
                _ => FormulaExpr::Error(CellError::Ref),
            }
        } else {
            return Ok(None);
        };

        self.pos += 3;
        Ok(Some(expr))
    }

    fn shift_row(&self, (row, absolute): (u32, bool)) -> Option<(u32, bool)> {
        if absolute {
            return Some((row, absolute));
        }
        let shifted = (row as i64).checked_add(self.offset_y)?;
        (0..MAX_ROWS as i64)
            .contains(&shifted)
            .then_some((shifted as u32, absolute))
    }

    fn shift_column(&self, (col, absolute): (u16, bool)) -> Option<(u16, bool)> {
        if absolute {
            return Some((col, absolute));
        }
        let shifted = (col as i64).checked_add(self.offset_x)?;
        (0..MAX_COLS as i64)
            .contains(&shifted)
            .then_some((shifted as u16, absolute))
    }
}

fn binary(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> FormulaExpr {
    FormulaExpr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn unary(op: UnaryOperator, operand: FormulaExpr) -> FormulaExpr {
    FormulaExpr::UnaryOp {
        op,
        operand: Box::new(operand),
    }
}

/// Combine the two sides of `:`. Two plain cells on the same sheet fold
/// into a range reference, anything else stays a range combinator.
fn join_range(left: FormulaExpr, right: FormulaExpr) -> FormulaResult<FormulaExpr> {
    if let (FormulaExpr::CellRef(start_ref), FormulaExpr::CellRef(end_ref)) = (&left, &right) {
        let sheet = match (&start_ref.sheet, &end_ref.sheet) {
            (Some(a), Some(b)) if a != b => {
                return Err(FormulaError::Parse(
                    "Range references must be on the same sheet".into(),
                ))
            }
            (Some(a), _) => Some(a.clone()),
            (None, b) => b.clone(),
        };

        return Ok(FormulaExpr::RangeRef(RangeReference {
            sheet,
            range: CellRange::new(start_ref.address, end_ref.address),
            kind: RangeKind::Cell,
        }));
    }

    Ok(binary(BinaryOperator::Range, left, right))
}

/// A 1-based row number, optionally `$`-prefixed, as a 0-based index
fn row_bound(token: &Token) -> Option<(u32, bool)> {
    match token {
        Token::Number(n) if n.fract() == 0.0 && *n >= 1.0 && *n <= MAX_ROWS as f64 => {
            Some((*n as u32 - 1, false))
        }
        Token::Identifier(text) => {
            let digits = text.strip_prefix('$')?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let row: u32 = digits.parse().ok()?;
            (1..=MAX_ROWS).contains(&row).then_some((row - 1, true))
        }
        _ => None,
    }
}

/// Column letters, optionally `$`-prefixed, as a 0-based index
fn column_bound(token: &Token) -> Option<(u16, bool)> {
    let Token::Identifier(text) = token else {
        return None;
    };
    let (absolute, letters) = match text.strip_prefix('$') {
        Some(letters) => (true, letters),
        None => (false, text.as_str()),
    };
    if letters.is_empty() || letters.len() > 3 || !letters.bytes().all(|b| b.is_ascii_alphabetic())
    {
        return None;
    }
    CellAddress::letters_to_column(letters)
        .ok()
        .map(|col| (col, absolute))
}
