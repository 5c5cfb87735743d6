//! Recursive-descent parser driving top-level item parsing; expression, statement and type
//! grammars live in their own submodules, mirroring how the teacher's own parser crate splits
//! `parser/expressions/` from `parser/statements/`.

mod expressions;
mod statements;
mod types;

use crate::error::ParseError;
use crate::lexer::{Spanned, Token};
use afil_core::incomplete::{GlobalBinding, Module, Struct, StructField, TemplateParameterName};
use afil_core::span::Span;

pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

/// Parses one module's worth of source text. Module-dependency resolution and the topological
/// ordering across modules are out of scope (spec.md §1); each source string becomes exactly one
/// [`Module`] with no declared dependencies.
pub fn parse_module(name: &str, source: &str) -> Result<Module, ParseError> {
    let tokens = crate::lexer::tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let mut module = Module { name: name.to_string(), dependencies: Vec::new(), structs: Vec::new(), globals: Vec::new() };
    while !parser.at_end() {
        match parser.peek() {
            Token::Struct => module.structs.push(parser.parse_struct()?),
            Token::Let => module.globals.push(parser.parse_global_binding()?),
            other => {
                return Err(ParseError::UnexpectedToken {
                    expected: "`struct` or `let`".to_string(),
                    found: format!("{other:?}"),
                    span: parser.peek_span(),
                });
            }
        }
    }
    Ok(module)
}

/// Parses each `(name, source)` pair into its own module, in the order given. The caller is
/// responsible for topologically sorting the result before handing it to
/// [`afil_core::analysis::analyse`] (spec.md §9's "globalised ids" design note).
pub fn parse_modules(sources: &[(&str, &str)]) -> Result<Vec<Module>, ParseError> {
    sources.iter().map(|(name, source)| parse_module(name, source)).collect()
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).map(|s| &s.token).unwrap_or(&Token::Semicolon)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn peek_span(&self) -> Span {
        self.tokens.get(self.pos).map(|s| s.span).unwrap_or_else(|| self.tokens.last().map(|s| s.span).unwrap_or_default())
    }

    /// The span of the most recently consumed token; used to compute an end position after a
    /// production has finished without threading one through every recursive call.
    fn prev_span(&self) -> Span {
        if self.pos == 0 { Span::default() } else { self.tokens[self.pos - 1].span }
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone()).unwrap_or(Token::Semicolon);
        self.pos += 1;
        token
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<Span, ParseError> {
        let span = self.peek_span();
        if self.check(&token) {
            self.advance();
            Ok(span)
        } else {
            Err(ParseError::UnexpectedToken { expected: expected.to_string(), found: format!("{:?}", self.peek()), span })
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<(String, Span), ParseError> {
        let span = self.peek_span();
        match self.peek().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok((name, span))
            }
            other => Err(ParseError::UnexpectedToken { expected: expected.to_string(), found: format!("{other:?}"), span }),
        }
    }

    /// `<T, U, ...>` following a struct or function name; absent entirely for a non-template
    /// declaration.
    fn parse_template_parameters(&mut self) -> Result<Vec<TemplateParameterName>, ParseError> {
        if !self.eat(&Token::Less) {
            return Ok(Vec::new());
        }
        let mut params = Vec::new();
        loop {
            let (name, _) = self.expect_identifier("template parameter name")?;
            params.push(TemplateParameterName { name });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::Greater, "`>` closing template parameter list")?;
        Ok(params)
    }

    /// `where Concept(T), Other(T)` following a template's parameter/signature; each concept is
    /// parsed as an ordinary expression (spec.md ยง4.4 treats a concept as any boolean function
    /// called with the template's type arguments).
    fn parse_where_clause(&mut self) -> Result<Vec<afil_core::incomplete::Expression>, ParseError> {
        if !self.eat(&Token::Where) {
            return Ok(Vec::new());
        }
        let mut concepts = Vec::new();
        loop {
            concepts.push(self.parse_expression()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(concepts)
    }

    fn parse_struct(&mut self) -> Result<Struct, ParseError> {
        let start = self.expect(Token::Struct, "`struct`")?;
        let (name, _) = self.expect_identifier("struct name")?;
        let template_parameters = self.parse_template_parameters()?;
        let concepts = self.parse_where_clause()?;
        self.expect(Token::OpenBrace, "`{` opening struct body")?;
        let mut fields = Vec::new();
        while !self.check(&Token::CloseBrace) {
            let declared_type = self.parse_type()?;
            let (field_name, _) = self.expect_identifier("field name")?;
            let default_value = if self.eat(&Token::Equal) { Some(self.parse_expression()?) } else { None };
            self.expect(Token::Semicolon, "`;` terminating a struct field")?;
            fields.push(StructField { name: field_name, declared_type, default_value });
        }
        let end = self.expect(Token::CloseBrace, "`}` closing struct body")?;
        Ok(Struct { name, template_parameters, concepts, fields, span: Span::new(start.start, end.end) })
    }

    /// `let name[: Type] = expr;` -- a plain value binding, or a function (template) binding when
    /// `expr` is a function literal (spec.md §3's `GlobalBinding`).
    fn parse_global_binding(&mut self) -> Result<GlobalBinding, ParseError> {
        let start = self.expect(Token::Let, "`let`")?;
        let (name, _) = self.expect_identifier("binding name")?;
        let declared_type = if self.eat(&Token::Colon) { Some(self.parse_type()?) } else { None };
        self.expect(Token::Equal, "`=`")?;
        let initializer = self.parse_expression()?;
        let end = self.expect(Token::Semicolon, "`;` terminating a global binding")?;
        Ok(GlobalBinding { name, declared_type, initializer, span: Span::new(start.start, end.end) })
    }
}
