//! Control loop guard policies.
//!
//! Two policy types share this translator:
//!
//! - **FrequencyLimiter** permits an operation when the request matches the
//!   guarded actor/recipe (and control loop and targets, when listed), the
//!   current time is inside the optional guard window, and the reported
//!   operation count is under the optional limit. Anything else is denied.
//! - **Blacklist** denies operations on listed targets and permits the rest.

use serde_json::{Map, Value};

use crate::document::PolicyDocument;
use crate::error::TranslationError;
use crate::expr::{
    Apply, AttributeDesignator, AttributeValue, Condition, Conjunction, DataType, Disjunction,
    Expression, FunctionId, MatchClause, Target, VariableDefinition, VariableReference,
    append_conjunction_to_disjunction, attach_target_disjunction, build_time_in_range,
    extend_condition, parse_time_of_day, parse_tolerant_integer,
};
use crate::policy::{Advice, CombiningAlgorithm, Effect, Rule, TranslatedPolicy};

use super::{PolicyTranslator, optional_text, required_text, text_list};

pub const FREQUENCY_LIMITER_POLICY_TYPE: &str = "onap.policies.controlloop.guard.FrequencyLimiter";
pub const BLACKLIST_POLICY_TYPE: &str = "onap.policies.controlloop.guard.Blacklist";

/// Resource attribute carrying how many times the operation already ran in
/// the current window.
pub const OPERATION_COUNT_ATTRIBUTE: &str = "operationCount";

const LIMIT_VARIABLE: &str = "frequency-limit";

#[derive(Debug, Clone, Copy, Default)]
pub struct GuardTranslator;

impl GuardTranslator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn frequency_limiter(
        &self,
        document: &PolicyDocument,
    ) -> Result<TranslatedPolicy, TranslationError> {
        let target = guard_target(document, true)?;

        let window = guard_window(document)?;
        let limit = limit_variable(document)?;

        let condition = match (window, &limit) {
            (Some(window), Some(variable)) => Some(extend_condition(
                &Condition::new(window),
                VariableReference::new(&variable.variable_id),
                FunctionId::And,
            )),
            (Some(window), None) => Some(Condition::new(window)),
            (None, Some(variable)) => {
                Some(Condition::new(VariableReference::new(&variable.variable_id)))
            }
            (None, None) => None,
        };

        Ok(TranslatedPolicy {
            id: document.identifier(),
            policy_type: document.policy_type(),
            target,
            rules: vec![Rule {
                id: format!("{}:permit", document.name),
                effect: Effect::Permit,
                target: Target::any(),
                condition,
            }],
            variables: limit.into_iter().collect(),
            obligations: Vec::new(),
            advice: Vec::new(),
            combining: CombiningAlgorithm::DenyUnlessPermit,
        })
    }

    fn blacklist(&self, document: &PolicyDocument) -> Result<TranslatedPolicy, TranslationError> {
        let target = guard_target(document, false)?;
        let blacklist = text_list(document, "blacklist")?
            .ok_or_else(|| TranslationError::missing_field(&document.name, "blacklist"))?;

        let mut rules = Vec::with_capacity(2);
        let mut listed: Option<Disjunction> = None;
        for entry in &blacklist {
            listed = append_conjunction_to_disjunction(
                listed,
                MatchClause::resource_equals("target", entry).into(),
            );
        }
        if let Some(disjunction) = listed {
            rules.push(Rule {
                id: format!("{}:deny", document.name),
                effect: Effect::Deny,
                target: attach_target_disjunction(Target::any(), disjunction.into()),
                condition: None,
            });
        }
        rules.push(Rule::unconditional(format!("{}:permit", document.name), Effect::Permit));

        let mut attributes = Map::new();
        attributes.insert(
            "reason".into(),
            Value::String("target is blacklisted".to_string()),
        );

        Ok(TranslatedPolicy {
            id: document.identifier(),
            policy_type: document.policy_type(),
            target,
            rules,
            variables: Vec::new(),
            obligations: Vec::new(),
            advice: vec![Advice {
                id: document.name.clone(),
                applies_to: Effect::Deny,
                attributes,
            }],
            combining: CombiningAlgorithm::DenyOverrides,
        })
    }
}

impl PolicyTranslator for GuardTranslator {
    fn translate(
        &self,
        document: &PolicyDocument,
    ) -> Result<Vec<TranslatedPolicy>, TranslationError> {
        let policy = match document.type_name.as_str() {
            FREQUENCY_LIMITER_POLICY_TYPE => self.frequency_limiter(document)?,
            BLACKLIST_POLICY_TYPE => self.blacklist(document)?,
            _ => {
                return Err(TranslationError::UnsupportedPolicyType {
                    policy_type: document.policy_type(),
                });
            }
        };
        Ok(vec![policy])
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// actor AND recipe [AND clname], one conjunction per listed target.
fn guard_target(document: &PolicyDocument, with_targets: bool) -> Result<Target, TranslationError> {
    let mut base = vec![
        MatchClause::resource_equals("actor", required_text(document, "actor")?),
        MatchClause::resource_equals("recipe", required_text(document, "recipe")?),
    ];
    if let Some(clname) = optional_text(document, "clname")? {
        base.push(MatchClause::resource_equals("clname", clname));
    }

    let targets = if with_targets {
        text_list(document, "targets")?.unwrap_or_default()
    } else {
        Vec::new()
    };

    if targets.is_empty() {
        return Ok(attach_target_disjunction(
            Target::any(),
            Conjunction::new(base).into(),
        ));
    }

    let mut disjunction: Option<Disjunction> = None;
    for entry in targets {
        let mut clauses = base.clone();
        clauses.push(MatchClause::resource_equals("target", entry));
        disjunction = append_conjunction_to_disjunction(disjunction, Conjunction::new(clauses).into());
    }
    Ok(match disjunction {
        Some(disjunction) => attach_target_disjunction(Target::any(), disjunction.into()),
        None => Target::any(),
    })
}

/// Time window from `guardActiveStart` / `guardActiveEnd`.
fn guard_window(document: &PolicyDocument) -> Result<Option<Apply>, TranslationError> {
    let start = optional_text(document, "guardActiveStart")?;
    let end = optional_text(document, "guardActiveEnd")?;
    match (start, end) {
        (None, None) => Ok(None),
        (Some(_), None) => Err(TranslationError::missing_field(&document.name, "guardActiveEnd")),
        (None, Some(_)) => Err(TranslationError::missing_field(
            &document.name,
            "guardActiveStart",
        )),
        (Some(start), Some(end)) => {
            for (field, text) in [("guardActiveStart", &start), ("guardActiveEnd", &end)] {
                if parse_time_of_day(text).is_none() {
                    return Err(TranslationError::invalid_field(
                        &document.name,
                        field,
                        format!("{text} is not HH:MM:SSZ"),
                    ));
                }
            }
            Ok(build_time_in_range(&start, &end, true))
        }
    }
}

/// `operationCount < limit`, when `limit` parses.
fn limit_variable(
    document: &PolicyDocument,
) -> Result<Option<VariableDefinition>, TranslationError> {
    let Some(text) = optional_text(document, "limit")? else {
        return Ok(None);
    };
    let Some(limit) = parse_tolerant_integer(&text) else {
        tracing::debug!(policy = %document.name, limit = %text, "Ignoring unparseable limit");
        return Ok(None);
    };

    let comparison = Apply::new(
        FunctionId::IntegerLessThan,
        vec![
            Expression::Designator(
                AttributeDesignator::resource(OPERATION_COUNT_ATTRIBUTE, DataType::Integer)
                    .required(),
            ),
            Expression::Value(AttributeValue::Integer(limit)),
        ],
    );
    Ok(Some(VariableDefinition {
        variable_id: LIMIT_VARIABLE.to_string(),
        expression: comparison.into(),
    }))
}
