//! Policy translators: declarative documents in, evaluable rule trees out.
//!
//! Translators are stateless. Translating the same document twice yields
//! equal trees, so re-deployment replaces rather than duplicates.

mod combined;
mod guard;

pub use combined::{CombinedResultsTranslator, POLICY_ID_ATTRIBUTE, POLICY_TYPE_ATTRIBUTE};
pub use guard::{
    BLACKLIST_POLICY_TYPE, FREQUENCY_LIMITER_POLICY_TYPE, GuardTranslator,
    OPERATION_COUNT_ATTRIBUTE,
};

use serde_json::Value;

use crate::document::PolicyDocument;
use crate::error::TranslationError;
use crate::policy::TranslatedPolicy;

/// Converts one policy document into rule trees.
pub trait PolicyTranslator: Send + Sync {
    /// Translate a document into at least one policy.
    ///
    /// Errors name the offending property.
    fn translate(&self, document: &PolicyDocument)
    -> Result<Vec<TranslatedPolicy>, TranslationError>;
}

// =============================================================================
// Property Helpers
// =============================================================================

/// A property as text. Numbers and booleans are rendered; other kinds are
/// rejected.
pub(crate) fn optional_text(
    document: &PolicyDocument,
    field: &str,
) -> Result<Option<String>, TranslationError> {
    match document.properties.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(TranslationError::invalid_field(
            &document.name,
            field,
            "expected a scalar value",
        )),
    }
}

pub(crate) fn required_text(
    document: &PolicyDocument,
    field: &str,
) -> Result<String, TranslationError> {
    optional_text(document, field)?
        .ok_or_else(|| TranslationError::missing_field(&document.name, field))
}

/// A property holding one string or a list of strings.
pub(crate) fn text_list(
    document: &PolicyDocument,
    field: &str,
) -> Result<Option<Vec<String>>, TranslationError> {
    match document.properties.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(vec![s.clone()])),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(TranslationError::invalid_field(
                    &document.name,
                    field,
                    "list entries must be strings",
                )),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(TranslationError::invalid_field(
            &document.name,
            field,
            "expected a string or a list of strings",
        )),
    }
}
