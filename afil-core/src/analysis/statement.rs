//! Statement analysis (spec.md ยง4.6): variable declarations, control flow, and function-literal
//! bodies. Grounded on the per-kind visitors in the original implementation's
//! `complete_statement.hh`/`program.hh`.

use crate::analysis::scope_stack::ScopeStack;
use crate::analysis::{ErrorKind, PartialSyntaxError, dependent_type, expression};
use crate::incomplete;
use crate::program::{Expression, Function, OverloadSet, Program, Scope, ScopeKind, Statement};

pub type Result<T> = std::result::Result<T, PartialSyntaxError>;

/// Analyses a function literal's parameter list and body into a complete [`Function`], in a fresh
/// scope pushed onto `stack`. `precondition(...)` statements at the top level of the body are
/// lifted out into `Function::preconditions` rather than appearing in `Function::statements`
/// (spec.md ยง4.6).
pub fn analyse_function_literal(program: &mut Program, stack: &mut ScopeStack, literal: &incomplete::FunctionLiteral) -> Result<Function> {
    let mut function_scope = Scope::new();
    for param in &literal.parameters {
        let param_type = dependent_type::resolve_type(program, stack, &param.declared_type)?;
        let size = program.type_size(param_type);
        let align = program.type_alignment(param_type);
        function_scope.add_variable(param.name.clone(), param_type, size, align);
    }
    let parameter_count = function_scope.variables.len() as i32;
    let parameter_size = function_scope.stack_frame_size;

    stack.push(function_scope, ScopeKind::Function);

    let return_type = match &literal.return_type {
        Some(expr) => dependent_type::resolve_type(program, stack, expr)?,
        None => crate::id::TypeId::deduce(),
    };

    let mut preconditions = Vec::new();
    let mut body_statements = Vec::new();
    for stmt in &literal.statements {
        if let incomplete::StatementValue::Precondition(expr) = &stmt.value {
            preconditions.push(expression::analyse(program, stack, expr)?);
        } else {
            body_statements.push(stmt.clone());
        }
    }

    let analysed_statements = analyse_statements(program, stack, &body_statements)?;

    let return_type = if return_type.is_deduce() {
        deduce_return_type(program, &analysed_statements)
    } else {
        return_type
    };

    let (function_scope, _) = stack.pop();
    Ok(Function {
        scope: function_scope,
        parameter_count,
        parameter_size,
        return_type,
        preconditions,
        statements: analysed_statements,
        abi_name: String::new(),
        is_callable_at_compile_time: true,
        is_callable_at_runtime: true,
    })
}

fn deduce_return_type(program: &Program, statements: &[Statement]) -> crate::id::TypeId {
    fn find_return(program: &Program, statements: &[Statement]) -> Option<crate::id::TypeId> {
        for s in statements {
            match s {
                Statement::Return(e) => return Some(e.type_id(program)),
                Statement::If { then_case, else_case, .. } => {
                    if let Some(t) = find_return(program, std::slice::from_ref(then_case)) {
                        return Some(t);
                    }
                    if let Some(else_case) = else_case {
                        if let Some(t) = find_return(program, std::slice::from_ref(else_case)) {
                            return Some(t);
                        }
                    }
                }
                Statement::Block { statements, .. } => {
                    if let Some(t) = find_return(program, statements) {
                        return Some(t);
                    }
                }
                _ => {}
            }
        }
        None
    }
    find_return(program, statements).unwrap_or(program.builtin_types.void)
}

/// Registers `literal` and produces the rvalue [`Expression`] naming it -- a one-element overload
/// set value, whether `literal` turned out generic (a function template) or concrete.
pub fn register_function_literal(program: &mut Program, stack: &ScopeStack, literal: &incomplete::FunctionLiteral) -> Result<Expression> {
    if literal.template_parameters.is_empty() {
        let mut local_stack = stack.clone();
        let function = analyse_function_literal(program, &mut local_stack, literal)?;
        let function_id = program.add_function(function);
        let overload_set_type =
            program.type_for_overload_set(OverloadSet { function_ids: vec![function_id], function_template_ids: vec![] });
        Ok(Expression::OverloadSetValue { overload_set_type })
    } else {
        let template_id = register_function_template(program, stack, literal, String::new())?;
        let overload_set_type =
            program.type_for_overload_set(OverloadSet { function_ids: vec![], function_template_ids: vec![template_id] });
        Ok(Expression::OverloadSetValue { overload_set_type })
    }
}

/// Snapshots `stack` and the literal's declared (still-unbound) parameter types as a
/// [`crate::program::FunctionTemplate`], deferring body analysis until instantiation actually
/// binds template arguments (spec.md ยง4.4).
pub fn register_function_template(
    program: &mut Program,
    stack: &ScopeStack,
    literal: &incomplete::FunctionLiteral,
    abi_name: String,
) -> Result<crate::id::FunctionTemplateId> {
    let parameter_types = declared_parameter_types(literal);
    let template = crate::program::FunctionTemplate {
        incomplete_function: literal.clone(),
        concepts: Vec::new(),
        parameter_types,
        scope_template_parameters: Vec::new(),
        scope_stack: stack.snapshot(),
        abi_name,
    };
    Ok(program.add_function_template(template))
}

/// Builds the template-parameter-aware signature the deduction pass in
/// [`crate::analysis::overload_resolution`] matches candidate arguments against, without resolving
/// any concrete types yet.
fn declared_parameter_types(literal: &incomplete::FunctionLiteral) -> Vec<crate::program::TemplateParamType> {
    literal
        .parameters
        .iter()
        .map(|param| {
            if let incomplete::TypeExprValue::Name { namespace_path, name } = &param.declared_type.value {
                if namespace_path.is_empty() {
                    if let Some(index) = literal.template_parameters.iter().position(|p| &p.name == name) {
                        return crate::program::TemplateParamType {
                            value: crate::program::TemplateParamTypeValue::TemplateParameter(index),
                            is_mutable: param.declared_type.is_mutable,
                            is_reference: param.declared_type.is_reference,
                        };
                    }
                }
            }
            // Anything else (a concrete named type) is resolved lazily at instantiation time
            // against the template's captured scope stack; record only that it isn't dependent,
            // using a placeholder the deducer treats as "skip, not a template parameter position".
            crate::program::TemplateParamType {
                value: crate::program::TemplateParamTypeValue::BaseCase(crate::id::TypeId::none()),
                is_mutable: param.declared_type.is_mutable,
                is_reference: param.declared_type.is_reference,
            }
        })
        .collect()
}

/// Analyses an ordinary statement list in the current top of `stack`.
pub fn analyse_statements(program: &mut Program, stack: &mut ScopeStack, statements: &[incomplete::Statement]) -> Result<Vec<Statement>> {
    statements.iter().map(|s| analyse_statement(program, stack, s)).collect()
}

fn analyse_statement(program: &mut Program, stack: &mut ScopeStack, stmt: &incomplete::Statement) -> Result<Statement> {
    use incomplete::StatementValue as V;
    match &stmt.value {
        V::VariableDeclaration { name, declared_type, is_mutable, initializer } => {
            let initializer_expr = expression::analyse(program, stack, initializer)?;
            let declared = match declared_type {
                Some(t) => dependent_type::resolve_type(program, stack, t)?,
                None => initializer_expr.type_id(program).decay(),
            };
            // `mut` on a plain `let` only controls whether later assignment to this name is
            // legal; it does not make the binding a reference the way a `mut&` parameter type
            // does (TypeId's mutable-implies-reference bit is reserved for that). A value-typed
            // local stores its value directly regardless of `is_mutable`.
            let _ = is_mutable;
            let variable_type = declared;
            let size = program.type_size(variable_type);
            let align = program.type_alignment(variable_type);
            // Absolute, like `LocalVariable.offset` (lookup.rs): a local offset plus the frame size
            // of every still-open enclosing scope up to the function boundary. Declaration and use
            // must agree on this or the evaluator reads/writes the wrong address.
            let local_offset = stack.current_mut().add_variable(name.clone(), variable_type, size, align);
            let offset = stack.current_scope_offset() + local_offset;
            let initializer_type = initializer_expr.type_id(program);
            let converted = crate::analysis::conversion::insert_conversion_node(initializer_expr, initializer_type, variable_type)
                .map_err(|_| PartialSyntaxError::new(ErrorKind::TypeMismatch { expected: program.abi_name(variable_type).to_string(), found: program.abi_name(initializer_type).to_string() }))?;
            Ok(Statement::VariableDeclaration { variable_offset: offset, assigned_expression: converted })
        }
        V::ExpressionStatement(expr) => Ok(Statement::ExpressionStatement(expression::analyse(program, stack, expr)?)),
        V::Precondition(_) => Err(PartialSyntaxError::new(ErrorKind::Other(
            "`precondition` is only valid directly inside a function body".to_string(),
        ))),
        V::Return(expr) => Ok(Statement::Return(expression::analyse(program, stack, expr)?)),
        V::If { condition, then_case, else_case } => {
            let condition = expression::analyse(program, stack, condition)?;
            let then_case = Box::new(analyse_statement(program, stack, then_case)?);
            let else_case = match else_case {
                Some(e) => Some(Box::new(analyse_statement(program, stack, e)?)),
                None => None,
            };
            Ok(Statement::If { condition, then_case, else_case })
        }
        V::Block(inner) => {
            stack.push(Scope::new(), ScopeKind::Block);
            let frame_base_offset = stack.current_scope_offset();
            let analysed = analyse_statements(program, stack, inner)?;
            let (mut scope, _) = stack.pop();
            scope.frame_base_offset = frame_base_offset;
            Ok(Statement::Block { scope, statements: analysed })
        }
        V::While { condition, body } => {
            let condition = expression::analyse(program, stack, condition)?;
            stack.enter_loop();
            let body = Box::new(analyse_statement(program, stack, body)?);
            stack.exit_loop();
            Ok(Statement::While { condition, body })
        }
        V::For { init, condition, step, body } => {
            stack.push(Scope::new(), ScopeKind::Block);
            let frame_base_offset = stack.current_scope_offset();
            let init_statement = Box::new(analyse_statement(program, stack, init)?);
            let condition = expression::analyse(program, stack, condition)?;
            let end_expression = expression::analyse(program, stack, step)?;
            stack.enter_loop();
            let body = Box::new(analyse_statement(program, stack, body)?);
            stack.exit_loop();
            let (mut scope, _) = stack.pop();
            scope.frame_base_offset = frame_base_offset;
            Ok(Statement::For { scope, init_statement, condition, end_expression, body })
        }
        V::Break => {
            if !stack.inside_loop() {
                return Err(PartialSyntaxError::new(ErrorKind::BreakOutsideLoop));
            }
            Ok(Statement::Break)
        }
        V::Continue => {
            if !stack.inside_loop() {
                return Err(PartialSyntaxError::new(ErrorKind::ContinueOutsideLoop));
            }
            Ok(Statement::Continue)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    fn simple_literal(statements: Vec<incomplete::Statement>) -> incomplete::FunctionLiteral {
        incomplete::FunctionLiteral {
            template_parameters: Vec::new(),
            concepts: Vec::new(),
            parameters: Vec::new(),
            return_type: None,
            statements,
            span: Span::empty(),
        }
    }

    #[test]
    fn empty_function_literal_deduces_void_return() {
        let mut program = Program::new();
        let mut stack = ScopeStack::new(program.global_scope.scope.clone());
        let literal = simple_literal(Vec::new());
        let function = analyse_function_literal(&mut program, &mut stack, &literal).unwrap();
        assert_eq!(function.return_type, program.builtin_types.void);
    }

    #[test]
    fn return_statement_drives_deduced_return_type() {
        let mut program = Program::new();
        let mut stack = ScopeStack::new(program.global_scope.scope.clone());
        let literal = simple_literal(vec![incomplete::Statement {
            value: incomplete::StatementValue::Return(incomplete::Expression {
                value: incomplete::ExpressionValue::Literal(incomplete::Literal::Int(1)),
                span: Span::empty(),
            }),
            span: Span::empty(),
        }]);
        let function = analyse_function_literal(&mut program, &mut stack, &literal).unwrap();
        assert_eq!(function.return_type, program.builtin_types.int);
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let mut program = Program::new();
        let mut stack = ScopeStack::new(program.global_scope.scope.clone());
        let stmt = incomplete::Statement { value: incomplete::StatementValue::Break, span: Span::empty() };
        assert!(analyse_statement(&mut program, &mut stack, &stmt).is_err());
    }
}
