//! Overload resolution: picks the best-matching callable out of an [`OverloadSet`] for a list of
//! argument types (spec.md ยง4.3). Grounded on `resolve_function_overload_set` in the original
//! implementation's `overload_resolution.cc`: score every viable candidate by its per-argument
//! conversion cost vector, then keep the one that Pareto-dominates every other candidate -- no
//! worse on any argument, strictly better on at least one. Two candidates whose cost vectors are
//! incomparable (each better on a different argument) are ambiguous, not resolved by whichever
//! happens to sort first.

use crate::analysis::conversion::{ConversionCost, conversion_cost};
use crate::analysis::instantiate;
use crate::analysis::{ErrorKind, PartialSyntaxError};
use crate::id::{FunctionId, TypeId};
use crate::program::{OverloadSet, Program};

pub type Result<T> = std::result::Result<T, PartialSyntaxError>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Score(Vec<ConversionCost>);

impl Score {
    /// True iff `self` is no worse than `other` on every argument and strictly better on at least
    /// one -- spec.md ยง4.3's Pareto rule, not a total order: two cost vectors that each win on a
    /// different argument dominate neither and must be reported ambiguous.
    fn dominates(&self, other: &Score) -> bool {
        let mut strictly_better = false;
        for (mine, theirs) in self.0.iter().zip(&other.0) {
            if mine > theirs {
                return false;
            }
            if mine < theirs {
                strictly_better = true;
            }
        }
        strictly_better
    }
}

/// Resolves `overload_set` against `argument_types`, instantiating any function template whose
/// parameters can be deduced from the arguments before scoring it alongside the plain functions.
/// `name` is used only for error messages.
pub fn resolve(
    program: &mut Program,
    overload_set: &OverloadSet,
    argument_types: &[TypeId],
    name: &str,
) -> Result<(FunctionId, TypeId)> {
    let mut candidates: Vec<(FunctionId, Score)> = Vec::new();

    for &function_id in &overload_set.function_ids {
        let params = program.parameter_types_of(function_id);
        if let Some(score) = score_candidate(&params, argument_types) {
            candidates.push((function_id, score));
        }
    }

    for &template_id in &overload_set.function_template_ids {
        if let Some(deduced) = deduce_template_arguments(program, template_id, argument_types) {
            if let Ok(function_id) = instantiate::instantiate_function_template(program, template_id, &deduced) {
                let params = program.parameter_types_of(function_id);
                if let Some(score) = score_candidate(&params, argument_types) {
                    candidates.push((function_id, score));
                }
            }
        }
    }

    if candidates.is_empty() {
        return Err(PartialSyntaxError::new(ErrorKind::NoViableOverload(name.to_string())));
    }

    let winner = candidates
        .iter()
        .position(|(_, score)| candidates.iter().all(|(_, other)| std::ptr::eq(score, other) || score.dominates(other)))
        .ok_or_else(|| PartialSyntaxError::new(ErrorKind::AmbiguousOverload(name.to_string())))?;

    let function_id = candidates[winner].0;
    let return_type = program.return_type(function_id);
    Ok((function_id, return_type))
}

fn score_candidate(parameter_types: &[TypeId], argument_types: &[TypeId]) -> Option<Score> {
    if parameter_types.len() != argument_types.len() {
        return None;
    }
    let mut costs = Vec::with_capacity(parameter_types.len());
    for (&param, &arg) in parameter_types.iter().zip(argument_types) {
        costs.push(conversion_cost(arg, param)?);
    }
    Some(Score(costs))
}

/// Deduction is only attempted for the simplest template-parameter shapes spec.md ยง4.4 actually
/// needs for the worked examples: a bare template parameter used directly as a parameter type, or
/// as the element type of a by-reference array parameter. Anything more structural (nested
/// template instantiations as parameter types) is out of scope here and reports no deduction.
fn deduce_template_arguments(
    program: &Program,
    template_id: crate::id::FunctionTemplateId,
    argument_types: &[TypeId],
) -> Option<Vec<TypeId>> {
    use crate::id::FunctionTemplateIdKind;

    let (parameter_types, count): (&[crate::program::TemplateParamType], usize) = match template_id.kind {
        FunctionTemplateIdKind::Program => {
            let template = &program.function_templates[template_id.index as usize];
            (&template.parameter_types, template.incomplete_function.template_parameters.len())
        }
        FunctionTemplateIdKind::Intrinsic => {
            let template = &program.intrinsic_function_templates[template_id.index as usize];
            (&template.parameter_types, template.template_parameter_count as usize)
        }
    };

    if parameter_types.len() != argument_types.len() {
        return None;
    }
    let mut deduced: Vec<Option<TypeId>> = vec![None; count];

    for (param, &arg) in parameter_types.iter().zip(argument_types) {
        deduce_one(param, arg, &mut deduced)?;
    }

    deduced.into_iter().collect()
}

fn deduce_one(param: &crate::program::TemplateParamType, arg: TypeId, deduced: &mut [Option<TypeId>]) -> Option<()> {
    use crate::program::TemplateParamTypeValue;
    match &param.value {
        TemplateParamTypeValue::TemplateParameter(index) => {
            let candidate = arg.decay();
            match &deduced[*index] {
                Some(existing) if *existing != candidate => None,
                _ => {
                    deduced[*index] = Some(candidate);
                    Some(())
                }
            }
        }
        TemplateParamTypeValue::BaseCase(expected) => {
            if expected.decay() == arg.decay() {
                Some(())
            } else {
                None
            }
        }
        // Pointer/array/array-pointer/template-instantiation parameter shapes would need the
        // argument's own type structure to recurse into; not needed by any worked example here.
        TemplateParamTypeValue::Pointer(_)
        | TemplateParamTypeValue::Array { .. }
        | TemplateParamTypeValue::ArrayPointer(_)
        | TemplateParamTypeValue::TemplateInstantiation { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_match_is_preferred_over_conversion() {
        let program = Program::new();
        let int = program.builtin_types.int;
        let overload_set = OverloadSet::default();
        // No functions registered directly under "+": exercise score_candidate in isolation.
        assert_eq!(score_candidate(&[int], &[int]), Some(Score(vec![ConversionCost::Identity])));
        assert!(overload_set.is_empty());
    }

    #[test]
    fn mismatched_arity_is_not_viable() {
        let program = Program::new();
        let int = program.builtin_types.int;
        assert_eq!(score_candidate(&[int, int], &[int]), None);
    }

    #[test]
    fn identical_cost_vectors_do_not_dominate_each_other() {
        let a = Score(vec![ConversionCost::Identity, ConversionCost::RefToValue]);
        let b = Score(vec![ConversionCost::Identity, ConversionCost::RefToValue]);
        assert!(!a.dominates(&b));
        assert!(!b.dominates(&a));
    }

    #[test]
    fn incomparable_cost_vectors_do_not_dominate_each_other() {
        // `a` wins on the first argument, `b` wins on the second: neither is uniformly better,
        // so overload resolution must treat this pair as ambiguous rather than pick one.
        let a = Score(vec![ConversionCost::Identity, ConversionCost::RefToValue]);
        let b = Score(vec![ConversionCost::RefToValue, ConversionCost::Identity]);
        assert!(!a.dominates(&b));
        assert!(!b.dominates(&a));
    }

    #[test]
    fn strictly_better_on_one_argument_and_no_worse_on_the_rest_dominates() {
        let a = Score(vec![ConversionCost::Identity, ConversionCost::RefToValue]);
        let b = Score(vec![ConversionCost::MutRefToConstRef, ConversionCost::RefToValue]);
        assert!(a.dominates(&b));
        assert!(!b.dominates(&a));
    }
}
