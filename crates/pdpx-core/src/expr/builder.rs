//! Pure helpers that build and splice rule tree fragments.
//!
//! None of these functions fail: malformed input yields `None` or an
//! unchanged tree, and callers decide whether that means "unconstrained".

use time::Time;
use time::macros::format_description;

use crate::expr::tree::{
    Apply, AttributeDesignator, AttributeValue, Condition, Conjunction, Disjunction, Expression,
    FunctionId, Target, TreeFragment, VariableReference,
};

/// Append a fragment to a disjunction.
///
/// - A clause is wrapped into a new single-clause conjunction first.
/// - A conjunction is appended as is.
/// - A disjunction contributes all of its conjunctions.
///
/// When `disjunction` is `None` a new one is created. An
/// [`TreeFragment::Unrecognized`] input returns `disjunction` unchanged,
/// which is `None` when none was supplied.
#[must_use]
pub fn append_conjunction_to_disjunction(
    disjunction: Option<Disjunction>,
    fragment: TreeFragment,
) -> Option<Disjunction> {
    match fragment {
        TreeFragment::Clause(clause) => {
            let mut disjunction = disjunction.unwrap_or_default();
            disjunction
                .conjunctions
                .push(Conjunction::new(vec![clause]));
            Some(disjunction)
        }
        TreeFragment::Conjunction(conjunction) => {
            let mut disjunction = disjunction.unwrap_or_default();
            disjunction.conjunctions.push(conjunction);
            Some(disjunction)
        }
        TreeFragment::Disjunction(other) => {
            let mut disjunction = disjunction.unwrap_or_default();
            disjunction.conjunctions.extend(other.conjunctions);
            Some(disjunction)
        }
        TreeFragment::Unrecognized => disjunction,
    }
}

/// Attach a fragment to a target's disjunction.
///
/// Clauses and conjunctions are promoted through
/// [`append_conjunction_to_disjunction`]. An unrecognized fragment leaves the
/// target as it was.
#[must_use]
pub fn attach_target_disjunction(mut target: Target, fragment: TreeFragment) -> Target {
    if matches!(fragment, TreeFragment::Unrecognized) {
        return target;
    }
    let current = std::mem::take(&mut target.disjunction);
    if let Some(disjunction) = append_conjunction_to_disjunction(Some(current), fragment) {
        target.disjunction = disjunction;
    }
    target
}

/// Parse a `HH:MM:SSZ` time of day.
#[must_use]
pub fn parse_time_of_day(text: &str) -> Option<Time> {
    let format = format_description!("[hour]:[minute]:[second]Z");
    Time::parse(text.trim(), &format).ok()
}

/// Build a "current time within `[start, end]`" test.
///
/// The result is always `time-in-range(current-time, start, end)`, three
/// operands. When `end < start` the window crosses midnight and the function
/// treats `end` as falling on the following day. `include_upper_bound`
/// selects `<=` over `<` at the upper bound.
///
/// Returns `None` when either bound is not a `HH:MM:SSZ` time.
#[must_use]
pub fn build_time_in_range(start: &str, end: &str, include_upper_bound: bool) -> Option<Apply> {
    let lower = parse_time_of_day(start)?;
    let upper = parse_time_of_day(end)?;

    let function = if include_upper_bound {
        FunctionId::TimeInRange
    } else {
        FunctionId::TimeInRangeHalfOpen
    };

    Some(Apply::new(
        function,
        vec![
            Expression::Designator(AttributeDesignator::current_time()),
            Expression::Value(AttributeValue::Time(lower)),
            Expression::Value(AttributeValue::Time(upper)),
        ],
    ))
}

/// Parse an integer, accepting decimal notation by truncating toward zero.
///
/// Returns `None` for text that is neither, and for values outside `i64`.
#[must_use]
pub fn parse_tolerant_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return Some(value);
    }
    let value = text.parse::<f64>().ok()?;
    if !value.is_finite() {
        return None;
    }
    let truncated = value.trunc();
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return None;
    }
    Some(truncated as i64)
}

/// Combine a condition with a variable: `function(existing.root, variable)`.
///
/// `existing` is left untouched; its root is copied into the new tree.
#[must_use]
pub fn extend_condition(
    existing: &Condition,
    variable: VariableReference,
    function: FunctionId,
) -> Condition {
    Condition::new(Apply::new(
        function,
        vec![existing.root.clone(), Expression::Variable(variable)],
    ))
}
