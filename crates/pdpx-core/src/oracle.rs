//! Evaluation of translated rule trees against one request.
//!
//! The [`EvaluationOracle`] trait is the seam applications evaluate through.
//! [`RuleTreeEvaluator`] is the in-process implementation for the shallow
//! trees the translators produce.
//!
//! # Example
//!
//! ```ignore
//! use pdpx_core::oracle::{EvaluationOracle, RuleTreeEvaluator};
//! use pdpx_core::decision::EvaluationContext;
//!
//! let oracle = RuleTreeEvaluator::new();
//! let ctx = EvaluationContext::new(&request)?;
//! if oracle.matches_target(&policy.target, &ctx)? {
//!     let decision = oracle.evaluate(&policy, &ctx)?;
//! }
//! ```

use dashmap::DashMap;
use regex::Regex;
use time::Time;

use crate::decision::{Decision, EvaluationContext};
use crate::error::EvaluationError;
use crate::expr::{
    Apply, AttributeDesignator, AttributeValue, Expression, FunctionId, MatchClause, Target,
};
use crate::policy::{Rule, TranslatedPolicy};

/// Maximum nesting of applications and variable references.
pub const MAX_EXPRESSION_DEPTH: usize = 32;

// =============================================================================
// Oracle Trait
// =============================================================================

/// Evaluates rule trees against a request's attributes.
///
/// Implementations are called concurrently from many requests and must not
/// carry per-request state between calls.
pub trait EvaluationOracle: Send + Sync {
    /// Returns `true` if the target matches the request.
    fn matches_target(
        &self,
        target: &Target,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool, EvaluationError>;

    /// Evaluate the rules of a policy whose target already matched.
    fn evaluate(
        &self,
        policy: &TranslatedPolicy,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Decision, EvaluationError>;
}

// =============================================================================
// Rule Tree Evaluator
// =============================================================================

/// In-process evaluation oracle.
///
/// Thread-safe; compiled regular expressions are cached across requests.
#[derive(Default)]
pub struct RuleTreeEvaluator {
    regex_cache: DashMap<String, Regex>,
}

impl RuleTreeEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn matches_clause(
        &self,
        clause: &MatchClause,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool, EvaluationError> {
        let bag = ctx.bag(&clause.designator);
        if bag.is_empty() && clause.designator.must_be_present {
            return Err(EvaluationError::MissingAttribute {
                attribute_id: clause.designator.attribute_id.clone(),
            });
        }
        for actual in &bag {
            if self.compare(clause.function, &clause.value, actual)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn evaluate_rule(
        &self,
        policy: &TranslatedPolicy,
        rule: &Rule,
        ctx: &EvaluationContext<'_>,
    ) -> Decision {
        match self.matches_target(&rule.target, ctx) {
            Ok(true) => {}
            Ok(false) => return Decision::NotApplicable,
            Err(e) => {
                tracing::debug!(rule_id = %rule.id, error = %e, "Rule target indeterminate");
                return Decision::Indeterminate;
            }
        }

        let Some(condition) = &rule.condition else {
            return rule.effect.decision();
        };

        match self.evaluate_boolean(policy, &condition.root, ctx, 0) {
            Ok(true) => rule.effect.decision(),
            Ok(false) => Decision::NotApplicable,
            Err(e) => {
                tracing::debug!(rule_id = %rule.id, error = %e, "Rule condition indeterminate");
                Decision::Indeterminate
            }
        }
    }

    fn evaluate_boolean(
        &self,
        policy: &TranslatedPolicy,
        expression: &Expression,
        ctx: &EvaluationContext<'_>,
        depth: usize,
    ) -> Result<bool, EvaluationError> {
        match self.evaluate_expression(policy, expression, ctx, depth)? {
            AttributeValue::Boolean(b) => Ok(b),
            other => Err(EvaluationError::TypeMismatch {
                function: "condition".to_string(),
                found: other.data_type().urn().to_string(),
            }),
        }
    }

    fn evaluate_expression(
        &self,
        policy: &TranslatedPolicy,
        expression: &Expression,
        ctx: &EvaluationContext<'_>,
        depth: usize,
    ) -> Result<AttributeValue, EvaluationError> {
        if depth > MAX_EXPRESSION_DEPTH {
            return Err(EvaluationError::DepthExceeded {
                limit: MAX_EXPRESSION_DEPTH,
            });
        }

        match expression {
            Expression::Value(value) => Ok(value.clone()),
            Expression::Designator(designator) => single_value(designator, ctx),
            Expression::Variable(reference) => {
                let definition = policy.variable(&reference.variable_id).ok_or_else(|| {
                    EvaluationError::UnknownVariable {
                        variable_id: reference.variable_id.clone(),
                    }
                })?;
                self.evaluate_expression(policy, &definition.expression, ctx, depth + 1)
            }
            Expression::Apply(apply) => self
                .evaluate_apply(policy, apply, ctx, depth + 1)
                .map(AttributeValue::Boolean),
        }
    }

    fn evaluate_apply(
        &self,
        policy: &TranslatedPolicy,
        apply: &Apply,
        ctx: &EvaluationContext<'_>,
        depth: usize,
    ) -> Result<bool, EvaluationError> {
        let args = &apply.arguments;
        match apply.function {
            FunctionId::And => {
                for arg in args {
                    if !self.evaluate_boolean(policy, arg, ctx, depth)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            FunctionId::Or => {
                for arg in args {
                    if self.evaluate_boolean(policy, arg, ctx, depth)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            FunctionId::Not => {
                expect_arity(apply, 1)?;
                Ok(!self.evaluate_boolean(policy, &args[0], ctx, depth)?)
            }
            FunctionId::TimeInRange | FunctionId::TimeInRangeHalfOpen => {
                expect_arity(apply, 3)?;
                let mut bounds = [Time::MIDNIGHT; 3];
                for (slot, arg) in bounds.iter_mut().zip(args) {
                    let value = self.evaluate_expression(policy, arg, ctx, depth)?;
                    *slot = expect_time(apply.function, value)?;
                }
                let [now, lower, upper] = bounds;
                Ok(time_in_range(
                    now,
                    lower,
                    upper,
                    apply.function == FunctionId::TimeInRange,
                ))
            }
            function => {
                expect_arity(apply, 2)?;
                let left = self.evaluate_expression(policy, &args[0], ctx, depth)?;
                let right = self.evaluate_expression(policy, &args[1], ctx, depth)?;
                self.compare(function, &left, &right)
            }
        }
    }

    /// Apply a two-argument comparison function.
    fn compare(
        &self,
        function: FunctionId,
        left: &AttributeValue,
        right: &AttributeValue,
    ) -> Result<bool, EvaluationError> {
        use AttributeValue as V;

        let result = match (function, left, right) {
            (FunctionId::StringEqual, V::String(a), V::String(b)) => a == b,
            (FunctionId::StringEqualIgnoreCase, V::String(a), V::String(b)) => {
                a.to_lowercase() == b.to_lowercase()
            }
            (FunctionId::StringRegexpMatch, V::String(pattern), V::String(text)) => {
                self.regex(pattern)?.is_match(text)
            }
            (FunctionId::IntegerEqual, V::Integer(a), V::Integer(b)) => a == b,
            (FunctionId::IntegerGreaterThan, V::Integer(a), V::Integer(b)) => a > b,
            (FunctionId::IntegerGreaterThanOrEqual, V::Integer(a), V::Integer(b)) => a >= b,
            (FunctionId::IntegerLessThan, V::Integer(a), V::Integer(b)) => a < b,
            (FunctionId::IntegerLessThanOrEqual, V::Integer(a), V::Integer(b)) => a <= b,
            (FunctionId::BooleanEqual, V::Boolean(a), V::Boolean(b)) => a == b,
            (function, _, other) => {
                return Err(EvaluationError::TypeMismatch {
                    function: function.urn().to_string(),
                    found: other.data_type().urn().to_string(),
                });
            }
        };
        Ok(result)
    }

    fn regex(&self, pattern: &str) -> Result<Regex, EvaluationError> {
        if let Some(re) = self.regex_cache.get(pattern) {
            return Ok(re.clone());
        }
        let re = Regex::new(pattern).map_err(|e| EvaluationError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        self.regex_cache.insert(pattern.to_string(), re.clone());
        Ok(re)
    }
}

impl EvaluationOracle for RuleTreeEvaluator {
    fn matches_target(
        &self,
        target: &Target,
        ctx: &EvaluationContext<'_>,
    ) -> Result<bool, EvaluationError> {
        if target.matches_everything() {
            return Ok(true);
        }
        for conjunction in &target.disjunction.conjunctions {
            let mut all = true;
            for clause in &conjunction.clauses {
                if !self.matches_clause(clause, ctx)? {
                    all = false;
                    break;
                }
            }
            if all {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn evaluate(
        &self,
        policy: &TranslatedPolicy,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Decision, EvaluationError> {
        let results: Vec<Decision> = policy
            .rules
            .iter()
            .map(|rule| self.evaluate_rule(policy, rule, ctx))
            .collect();
        let decision = policy.combining.combine(&results);

        tracing::trace!(
            policy_id = %policy.id,
            rules = results.len(),
            decision = %decision,
            "Policy evaluated"
        );
        Ok(decision)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn single_value(
    designator: &AttributeDesignator,
    ctx: &EvaluationContext<'_>,
) -> Result<AttributeValue, EvaluationError> {
    let mut bag = ctx.bag(designator);
    match bag.len() {
        0 => Err(EvaluationError::MissingAttribute {
            attribute_id: designator.attribute_id.clone(),
        }),
        1 => Ok(bag.remove(0)),
        count => Err(EvaluationError::NotSingleValued {
            attribute_id: designator.attribute_id.clone(),
            count,
        }),
    }
}

fn expect_arity(apply: &Apply, expected: usize) -> Result<(), EvaluationError> {
    if apply.arguments.len() == expected {
        Ok(())
    } else {
        Err(EvaluationError::ArgumentCount {
            function: apply.function.urn().to_string(),
            expected,
            actual: apply.arguments.len(),
        })
    }
}

fn expect_time(function: FunctionId, value: AttributeValue) -> Result<Time, EvaluationError> {
    match value {
        AttributeValue::Time(t) => Ok(t),
        other => Err(EvaluationError::TypeMismatch {
            function: function.urn().to_string(),
            found: other.data_type().urn().to_string(),
        }),
    }
}

/// Window test; `upper < lower` means the window crosses midnight.
fn time_in_range(now: Time, lower: Time, upper: Time, include_upper: bool) -> bool {
    let below_upper = if include_upper { now <= upper } else { now < upper };
    if lower <= upper {
        lower <= now && below_upper
    } else {
        lower <= now || below_upper
    }
}
