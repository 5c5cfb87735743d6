//! A pure-Rust lexer and recursive-descent parser producing [`afil_core::incomplete`] trees.
//!
//! Concrete surface syntax is this crate's own design: spec.md fixes the shape of the incomplete
//! representation (what a parser must produce) but not the text a programmer types to produce it.
//! See `DESIGN.md` for the syntax choices made here.

#![deny(clippy::print_stdout, clippy::print_stderr)]

mod error;
mod lexer;
mod parser;

pub use error::ParseError;
pub use parser::{parse_module, parse_modules};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_global_variable_binding() {
        let module = parse_module("main", "let pi = 3.14;").expect("parse should succeed");
        assert_eq!(module.globals.len(), 1);
        assert_eq!(module.globals[0].name, "pi");
    }

    #[test]
    fn parses_a_function_literal_binding() {
        let module = parse_module("main", "let square = fn (int x) -> int { return x * x; };")
            .expect("parse should succeed");
        assert_eq!(module.globals.len(), 1);
        assert_eq!(module.globals[0].name, "square");
    }

    #[test]
    fn parses_a_struct_with_a_template_parameter() {
        let module = parse_module("main", "struct Pair<T> { T a; T b; }").expect("parse should succeed");
        assert_eq!(module.structs.len(), 1);
        assert_eq!(module.structs[0].name, "Pair");
        assert_eq!(module.structs[0].template_parameters.len(), 1);
        assert_eq!(module.structs[0].fields.len(), 2);
    }

    #[test]
    fn parses_a_for_loop_with_mutation() {
        let source = "let sum = fn () -> int { \
            let mut total: int = 0; \
            for (let mut i: int = 0; i < 10; i = i + 1) { total = total + i; } \
            return total; \
        };";
        let module = parse_module("main", source).expect("parse should succeed");
        assert_eq!(module.globals.len(), 1);
    }

    #[test]
    fn parses_a_designated_initializer() {
        let source = "struct Pair { int a; int b; } let make = fn () -> Pair { return Pair{ .a = 3, .b = 4 }; };";
        let module = parse_module("main", source).expect("parse should succeed");
        assert_eq!(module.structs.len(), 1);
        assert_eq!(module.globals.len(), 1);
    }

    #[test]
    fn rejects_an_unexpected_top_level_token() {
        let err = parse_module("main", "42;").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }
}
