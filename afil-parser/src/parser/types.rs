//! Type-expression grammar (spec.md §4.2's `TypeExpr`/`TypeExprValue`).
//!
//! Reference/mutability are parsed only at the outermost position (`&T`, `&mut T`, bare `T`),
//! matching spec.md's rule that mutability is a property of the top-level binding, never a nested
//! position. Concrete spellings for pointers (`*T`), array pointers (`[]T`) and fixed arrays
//! (`T[n]`) are this parser's own design choice -- spec.md specifies the type grammar's shape, not
//! its surface syntax.

use super::Parser;
use crate::error::ParseError;
use crate::lexer::Token;
use afil_core::incomplete::{TypeExpr, TypeExprValue};
use afil_core::span::Span;

impl Parser {
    pub(super) fn parse_type(&mut self) -> Result<TypeExpr, ParseError> {
        let start = self.peek_span();
        let mut is_reference = false;
        let mut is_mutable = false;
        if self.eat(&Token::Amp) {
            is_reference = true;
            is_mutable = self.eat(&Token::Mut);
        }
        let value = self.parse_type_value()?;
        Ok(TypeExpr { value, is_mutable, is_reference, span: Span::new(start.start, self.prev_span().end) })
    }

    fn parse_type_value(&mut self) -> Result<TypeExprValue, ParseError> {
        if self.eat(&Token::Star) {
            let pointee = self.parse_type()?;
            return Ok(TypeExprValue::Pointer(Box::new(pointee)));
        }
        if self.check(&Token::OpenBracket) && self.peek_at(1) == Some(&Token::CloseBracket) {
            self.advance();
            self.advance();
            let value_type = self.parse_type()?;
            return Ok(TypeExprValue::ArrayPointer(Box::new(value_type)));
        }

        let name_start = self.peek_span();
        let mut namespace_path = Vec::new();
        let (mut name, _) = self.expect_identifier("type name")?;
        while self.eat(&Token::ColonColon) {
            namespace_path.push(name);
            let (next, _) = self.expect_identifier("type name")?;
            name = next;
        }

        let mut value = if self.check(&Token::Less) {
            let arguments = self.parse_template_type_arguments()?;
            TypeExprValue::TemplateInstantiation { namespace_path, name, arguments }
        } else {
            TypeExprValue::Name { namespace_path, name }
        };

        if self.eat(&Token::OpenBracket) {
            let size = self.parse_expression()?;
            self.expect(Token::CloseBracket, "`]` closing an array size")?;
            let value_type = TypeExpr { value, is_mutable: false, is_reference: false, span: Span::new(name_start.start, self.prev_span().end) };
            value = TypeExprValue::Array { value_type: Box::new(value_type), size: Box::new(size) };
        }

        Ok(value)
    }

    pub(super) fn parse_template_type_arguments(&mut self) -> Result<Vec<TypeExpr>, ParseError> {
        self.expect(Token::Less, "`<` opening a template argument list")?;
        let mut arguments = Vec::new();
        if !self.check(&Token::Greater) {
            loop {
                arguments.push(self.parse_type()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::Greater, "`>` closing a template argument list")?;
        Ok(arguments)
    }
}
