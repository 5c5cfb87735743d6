//! Statement grammar (spec.md §4.6's `StatementValue`).
//!
//! A bare block `{ ... }` at statement position parses as [`StatementValue::Block`]; the same
//! brace sequence at expression position (handled in `parser::expressions`) parses as
//! `ExpressionValue::Block` instead. The two share no parsing code because the node shapes differ
//! (the expression form needs a trailing tail expression value, the statement form doesn't).

use super::Parser;
use crate::error::ParseError;
use crate::lexer::Token;
use afil_core::incomplete::{Statement, StatementValue};
use afil_core::span::Span;

impl Parser {
    pub(super) fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let start = self.peek_span();
        match self.peek() {
            Token::Let => self.parse_variable_declaration(start),
            Token::Precondition => self.parse_precondition(start),
            Token::Return => self.parse_return(start),
            Token::If => self.parse_if_statement(start),
            Token::While => self.parse_while(start),
            Token::For => self.parse_for(start),
            Token::Break => {
                self.advance();
                let end = self.expect(Token::Semicolon, "`;` terminating `break`")?;
                Ok(Statement { value: StatementValue::Break, span: Span::new(start.start, end.end) })
            }
            Token::Continue => {
                self.advance();
                let end = self.expect(Token::Semicolon, "`;` terminating `continue`")?;
                Ok(Statement { value: StatementValue::Continue, span: Span::new(start.start, end.end) })
            }
            Token::OpenBrace => self.parse_block_statement(start),
            _ => self.parse_expression_statement(start),
        }
    }

    fn parse_variable_declaration(&mut self, start: Span) -> Result<Statement, ParseError> {
        self.advance();
        let is_mutable = self.eat(&Token::Mut);
        let (name, _) = self.expect_identifier("variable name")?;
        let declared_type = if self.eat(&Token::Colon) { Some(self.parse_type()?) } else { None };
        self.expect(Token::Equal, "`=`")?;
        let initializer = self.parse_expression()?;
        let end = self.expect(Token::Semicolon, "`;` terminating a variable declaration")?;
        Ok(Statement {
            value: StatementValue::VariableDeclaration { name, declared_type, is_mutable, initializer },
            span: Span::new(start.start, end.end),
        })
    }

    fn parse_precondition(&mut self, start: Span) -> Result<Statement, ParseError> {
        self.advance();
        self.expect(Token::OpenParen, "`(` opening a precondition's condition")?;
        let condition = self.parse_expression()?;
        self.expect(Token::CloseParen, "`)` closing a precondition's condition")?;
        let end = self.expect(Token::Semicolon, "`;` terminating a precondition")?;
        Ok(Statement { value: StatementValue::Precondition(condition), span: Span::new(start.start, end.end) })
    }

    fn parse_return(&mut self, start: Span) -> Result<Statement, ParseError> {
        self.advance();
        let value = self.parse_expression()?;
        let end = self.expect(Token::Semicolon, "`;` terminating a `return`")?;
        Ok(Statement { value: StatementValue::Return(value), span: Span::new(start.start, end.end) })
    }

    fn parse_if_statement(&mut self, start: Span) -> Result<Statement, ParseError> {
        self.advance();
        self.expect(Token::OpenParen, "`(` opening an `if`'s condition")?;
        let condition = self.parse_expression()?;
        self.expect(Token::CloseParen, "`)` closing an `if`'s condition")?;
        let then_case = Box::new(self.parse_statement()?);
        let (else_case, end) = if self.eat(&Token::Else) {
            let else_stmt = self.parse_statement()?;
            let span = else_stmt.span;
            (Some(Box::new(else_stmt)), span)
        } else {
            let span = then_case.span;
            (None, span)
        };
        Ok(Statement {
            value: StatementValue::If { condition, then_case, else_case },
            span: Span::new(start.start, end.end),
        })
    }

    fn parse_while(&mut self, start: Span) -> Result<Statement, ParseError> {
        self.advance();
        self.expect(Token::OpenParen, "`(` opening a `while`'s condition")?;
        let condition = self.parse_expression()?;
        self.expect(Token::CloseParen, "`)` closing a `while`'s condition")?;
        let body = Box::new(self.parse_statement()?);
        let end = body.span;
        Ok(Statement { value: StatementValue::While { condition, body }, span: Span::new(start.start, end.end) })
    }

    /// `for (init; condition; step) body` -- `init` and `step` share a statement shape with the
    /// rest of the grammar: `step` is `step;` syntactically, the trailing semicolon is just
    /// swallowed so the `Expression` handed to `StatementValue::For::step` matches the condition's
    /// shape.
    fn parse_for(&mut self, start: Span) -> Result<Statement, ParseError> {
        self.advance();
        self.expect(Token::OpenParen, "`(` opening a `for`'s clauses")?;
        let init = Box::new(self.parse_statement()?);
        let condition = self.parse_expression()?;
        self.expect(Token::Semicolon, "`;` separating a `for`'s condition from its step")?;
        let step = self.parse_expression()?;
        self.expect(Token::CloseParen, "`)` closing a `for`'s clauses")?;
        let body = Box::new(self.parse_statement()?);
        let end = body.span;
        Ok(Statement { value: StatementValue::For { init, condition, step, body }, span: Span::new(start.start, end.end) })
    }

    fn parse_block_statement(&mut self, start: Span) -> Result<Statement, ParseError> {
        self.advance();
        let mut statements = Vec::new();
        while !self.check(&Token::CloseBrace) {
            statements.push(self.parse_statement()?);
        }
        let end = self.expect(Token::CloseBrace, "`}` closing a block")?;
        Ok(Statement { value: StatementValue::Block(statements), span: Span::new(start.start, end.end) })
    }

    fn parse_expression_statement(&mut self, start: Span) -> Result<Statement, ParseError> {
        let expr = self.parse_expression()?;
        let end = self.expect(Token::Semicolon, "`;` terminating an expression statement")?;
        Ok(Statement { value: StatementValue::ExpressionStatement(expr), span: Span::new(start.start, end.end) })
    }
}
