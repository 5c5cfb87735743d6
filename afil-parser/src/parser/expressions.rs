//! Expression grammar (spec.md §4.5): a precedence-climbing binary parser over a postfix/unary
//! core, matching `Operator::precedence`'s table in `afil-core` exactly so parsed trees group the
//! same way the analyser's operator table expects.

use super::Parser;
use crate::error::ParseError;
use crate::lexer::Token;
use afil_core::incomplete::{DesignatedInitializerMember, Expression, ExpressionValue, FunctionLiteral, Literal, Parameter};
use afil_core::operator::Operator;
use afil_core::span::Span;

impl Parser {
    pub(super) fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_binary_expression(i32::MIN)
    }

    fn parse_binary_expression(&mut self, min_precedence: i32) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary_expression()?;
        while let Some(op) = self.peek_binary_operator() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.advance();
            // Every operator but `=` is left-associative: the next level must bind strictly
            // tighter so repeated same-precedence operators nest left-to-right.
            let next_min = if op == Operator::Assign { precedence } else { precedence + 1 };
            let right = self.parse_binary_expression(next_min)?;
            let span = Span::new(left.span.start, right.span.end);
            left = Expression { value: ExpressionValue::BinaryOperator { op, left: Box::new(left), right: Box::new(right) }, span };
        }
        Ok(left)
    }

    fn peek_binary_operator(&self) -> Option<Operator> {
        match self.peek() {
            Token::Plus => Some(Operator::Add),
            Token::Minus => Some(Operator::Subtract),
            Token::Star => Some(Operator::Multiply),
            Token::Slash => Some(Operator::Divide),
            Token::Percent => Some(Operator::Modulo),
            Token::EqualEqual => Some(Operator::Equal),
            Token::NotEqual => Some(Operator::NotEqual),
            Token::Less => Some(Operator::Less),
            Token::LessEqual => Some(Operator::LessEqual),
            Token::Greater => Some(Operator::Greater),
            Token::GreaterEqual => Some(Operator::GreaterEqual),
            Token::Spaceship => Some(Operator::ThreeWayCompare),
            Token::And => Some(Operator::And),
            Token::Or => Some(Operator::Or),
            Token::Xor => Some(Operator::Xor),
            Token::Amp => Some(Operator::BitwiseAnd),
            Token::Pipe => Some(Operator::BitwiseOr),
            Token::Caret => Some(Operator::BitwiseXor),
            Token::ShiftLeft => Some(Operator::BitShiftLeft),
            Token::ShiftRight => Some(Operator::BitShiftRight),
            Token::Equal => Some(Operator::Assign),
            _ => None,
        }
    }

    fn parse_unary_expression(&mut self) -> Result<Expression, ParseError> {
        let start = self.peek_span();
        match self.peek() {
            Token::Minus => {
                self.advance();
                let operand = self.parse_unary_expression()?;
                let span = Span::new(start.start, operand.span.end);
                Ok(Expression { value: ExpressionValue::UnaryOperator { op: Operator::Subtract, operand: Box::new(operand) }, span })
            }
            Token::Not => {
                self.advance();
                let operand = self.parse_unary_expression()?;
                let span = Span::new(start.start, operand.span.end);
                Ok(Expression { value: ExpressionValue::UnaryOperator { op: Operator::Not, operand: Box::new(operand) }, span })
            }
            Token::Tilde => {
                self.advance();
                let operand = self.parse_unary_expression()?;
                let span = Span::new(start.start, operand.span.end);
                Ok(Expression { value: ExpressionValue::UnaryOperator { op: Operator::BitwiseNot, operand: Box::new(operand) }, span })
            }
            Token::Amp => {
                self.advance();
                let operand = self.parse_unary_expression()?;
                let span = Span::new(start.start, operand.span.end);
                Ok(Expression { value: ExpressionValue::AddressOf(Box::new(operand)), span })
            }
            Token::Star => {
                self.advance();
                let operand = self.parse_unary_expression()?;
                let span = Span::new(start.start, operand.span.end);
                Ok(Expression { value: ExpressionValue::Dereference(Box::new(operand)), span })
            }
            _ => self.parse_postfix_expression(),
        }
    }

    fn parse_postfix_expression(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_primary_expression()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let (member, _) = self.expect_identifier("member name")?;
                    let span = Span::new(expr.span.start, self.prev_span().end);
                    expr = Expression { value: ExpressionValue::MemberAccess { object: Box::new(expr), member }, span };
                }
                Token::OpenBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(Token::CloseBracket, "`]` closing a subscript")?;
                    let span = Span::new(expr.span.start, self.prev_span().end);
                    expr = Expression { value: ExpressionValue::Subscript { array: Box::new(expr), index: Box::new(index) }, span };
                }
                Token::OpenParen => {
                    let arguments = self.parse_call_arguments()?;
                    let span = Span::new(expr.span.start, self.prev_span().end);
                    expr = Expression {
                        value: ExpressionValue::FunctionCall { callee: Box::new(expr), template_arguments: Vec::new(), arguments },
                        span,
                    };
                }
                Token::ColonColon if self.peek_at(1) == Some(&Token::Less) => {
                    self.advance();
                    let template_arguments = self.parse_template_type_arguments()?;
                    let arguments = self.parse_call_arguments()?;
                    let span = Span::new(expr.span.start, self.prev_span().end);
                    expr = Expression { value: ExpressionValue::FunctionCall { callee: Box::new(expr), template_arguments, arguments }, span };
                }
                Token::As => {
                    self.advance();
                    let target_type = self.parse_type()?;
                    let span = Span::new(expr.span.start, self.prev_span().end);
                    expr = Expression { value: ExpressionValue::Cast { operand: Box::new(expr), target_type }, span };
                }
                Token::OpenBrace if matches!(expr.value, ExpressionValue::Identifier { .. }) => {
                    expr = self.parse_designated_initializer(expr)?;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.expect(Token::OpenParen, "`(` opening a call's argument list")?;
        let mut arguments = Vec::new();
        if !self.check(&Token::CloseParen) {
            loop {
                arguments.push(self.parse_expression()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::CloseParen, "`)` closing a call's argument list")?;
        Ok(arguments)
    }

    /// `TypeName { .member = expr, ... }` (spec.md §4.5's designated initializer). Only reachable
    /// with a bare, unqualified identifier as the already-parsed `callee` -- a namespaced or
    /// template-instantiated struct name must use an explicit cast-free call form instead.
    fn parse_designated_initializer(&mut self, callee: Expression) -> Result<Expression, ParseError> {
        let (namespace_path, name) = match callee.value {
            ExpressionValue::Identifier { namespace_path, name } => (namespace_path, name),
            _ => unreachable!("caller already checked this is a bare identifier"),
        };
        let constructed_type = afil_core::incomplete::TypeExpr {
            value: afil_core::incomplete::TypeExprValue::Name { namespace_path, name },
            is_mutable: false,
            is_reference: false,
            span: callee.span,
        };
        self.expect(Token::OpenBrace, "`{` opening a designated initializer")?;
        let mut members = Vec::new();
        while !self.check(&Token::CloseBrace) {
            self.expect(Token::Dot, "`.` before a designated initializer member name")?;
            let (member_name, _) = self.expect_identifier("member name")?;
            self.expect(Token::Equal, "`=` after a designated initializer member name")?;
            let value = self.parse_expression()?;
            members.push(DesignatedInitializerMember { name: member_name, value });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        let end = self.expect(Token::CloseBrace, "`}` closing a designated initializer")?;
        Ok(Expression { value: ExpressionValue::DesignatedInitializer { constructed_type, members }, span: Span::new(callee.span.start, end.end) })
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, ParseError> {
        let start = self.peek_span();
        match self.peek().clone() {
            Token::IntLiteral(n) => {
                self.advance();
                Ok(Expression { value: ExpressionValue::Literal(Literal::Int(n)), span: start })
            }
            Token::FloatLiteral(n) => {
                self.advance();
                Ok(Expression { value: ExpressionValue::Literal(Literal::Float(n)), span: start })
            }
            Token::ByteLiteral(b) => {
                self.advance();
                Ok(Expression { value: ExpressionValue::Literal(Literal::Byte(b)), span: start })
            }
            Token::CharLiteral(c) => {
                self.advance();
                Ok(Expression { value: ExpressionValue::Literal(Literal::Char(c)), span: start })
            }
            Token::True => {
                self.advance();
                Ok(Expression { value: ExpressionValue::Literal(Literal::Bool(true)), span: start })
            }
            Token::False => {
                self.advance();
                Ok(Expression { value: ExpressionValue::Literal(Literal::Bool(false)), span: start })
            }
            Token::Null => {
                self.advance();
                Ok(Expression { value: ExpressionValue::Literal(Literal::Null), span: start })
            }
            Token::OpenParen => {
                self.advance();
                let inner = self.parse_expression()?;
                let end = self.expect(Token::CloseParen, "`)` closing a parenthesised expression")?;
                Ok(Expression { value: inner.value, span: Span::new(start.start, end.end) })
            }
            Token::OpenBrace => {
                self.advance();
                let mut statements = Vec::new();
                while !self.check(&Token::CloseBrace) {
                    statements.push(self.parse_statement()?);
                }
                let end = self.expect(Token::CloseBrace, "`}` closing a block expression")?;
                Ok(Expression { value: ExpressionValue::Block(statements), span: Span::new(start.start, end.end) })
            }
            Token::Fn => {
                let literal = self.parse_function_literal()?;
                let span = literal.span;
                Ok(Expression { value: ExpressionValue::FunctionLiteral(Box::new(literal)), span })
            }
            Token::Compiles => self.parse_compiles(),
            Token::TypeOf => {
                self.advance();
                self.expect(Token::OpenParen, "`(` opening a `typeof` operand")?;
                let operand = self.parse_expression()?;
                let end = self.expect(Token::CloseParen, "`)` closing a `typeof` operand")?;
                Ok(Expression { value: ExpressionValue::TypeOf(Box::new(operand)), span: Span::new(start.start, end.end) })
            }
            Token::If => {
                self.advance();
                self.expect(Token::OpenParen, "`(` opening an if-expression's condition")?;
                let condition = self.parse_expression()?;
                self.expect(Token::CloseParen, "`)` closing an if-expression's condition")?;
                let then_case = self.parse_expression()?;
                self.expect(Token::Else, "`else` (an if-expression must have a value on every path)")?;
                let else_case = self.parse_expression()?;
                let span = Span::new(start.start, else_case.span.end);
                Ok(Expression { value: ExpressionValue::If { condition: Box::new(condition), then_case: Box::new(then_case), else_case: Box::new(else_case) }, span })
            }
            Token::Identifier(first) => {
                self.advance();
                let mut namespace_path = Vec::new();
                let mut name = first;
                while self.check(&Token::ColonColon) && self.peek_at(1) != Some(&Token::Less) {
                    self.advance();
                    namespace_path.push(name);
                    let (next, _) = self.expect_identifier("identifier after `::`")?;
                    name = next;
                }
                Ok(Expression { value: ExpressionValue::Identifier { namespace_path, name }, span: Span::new(start.start, self.prev_span().end) })
            }
            other => Err(ParseError::UnexpectedToken { expected: "an expression".to_string(), found: format!("{other:?}"), span: start }),
        }
    }

    /// `compiles { let x: T; body... }` (spec.md §4.5) -- the fake-variable initializer syntax is
    /// never given a value in source (the probe only cares about the type binding itself), so only
    /// `let name: Type;` is accepted here, not the general variable-declaration grammar.
    fn parse_compiles(&mut self) -> Result<Expression, ParseError> {
        let start = self.expect(Token::Compiles, "`compiles`")?;
        self.expect(Token::OpenBrace, "`{` opening a `compiles` probe")?;
        let mut fake_variables = Vec::new();
        while self.check(&Token::Let) {
            self.advance();
            let (name, _) = self.expect_identifier("fake variable name")?;
            self.expect(Token::Colon, "`:` introducing a fake variable's type")?;
            let declared_type = self.parse_type()?;
            self.expect(Token::Semicolon, "`;` terminating a fake variable declaration")?;
            fake_variables.push((name, declared_type));
        }
        let mut body = Vec::new();
        while !self.check(&Token::CloseBrace) {
            body.push(self.parse_expression()?);
            self.eat(&Token::Semicolon);
        }
        let end = self.expect(Token::CloseBrace, "`}` closing a `compiles` probe")?;
        Ok(Expression { value: ExpressionValue::Compiles { fake_variables, body }, span: Span::new(start.start, end.end) })
    }

    pub(super) fn parse_function_literal(&mut self) -> Result<FunctionLiteral, ParseError> {
        let start = self.expect(Token::Fn, "`fn`")?;
        let template_parameters = self.parse_template_parameters()?;
        self.expect(Token::OpenParen, "`(` opening a function's parameter list")?;
        let mut parameters = Vec::new();
        if !self.check(&Token::CloseParen) {
            loop {
                let declared_type = self.parse_type()?;
                let (name, _) = self.expect_identifier("parameter name")?;
                parameters.push(Parameter { name, declared_type });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::CloseParen, "`)` closing a function's parameter list")?;
        let return_type = if self.eat(&Token::Arrow) { Some(self.parse_type()?) } else { None };
        let concepts = self.parse_where_clause()?;
        self.expect(Token::OpenBrace, "`{` opening a function body")?;
        let mut statements = Vec::new();
        while !self.check(&Token::CloseBrace) {
            statements.push(self.parse_statement()?);
        }
        let end = self.expect(Token::CloseBrace, "`}` closing a function body")?;
        Ok(FunctionLiteral { template_parameters, concepts, parameters, return_type, statements, span: Span::new(start.start, end.end) })
    }
}
