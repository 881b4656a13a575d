//! Output field selection
//!
//! A post-processing filter applied to serialized result records after the
//! pipelines have run. The pipelines always compute complete records.

use crate::error::ScoringError;
use serde::Serialize;
use serde_json::{Map, Value};

/// Ordered list of output columns to keep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelection {
    fields: Vec<String>,
}

impl FieldSelection {
    /// Parse a comma-separated field list; blanks and repeats are ignored
    pub fn parse(spec: &str) -> Self {
        Self::from_fields(spec.split(','))
    }

    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selected: Vec<String> = Vec::new();
        for field in fields {
            let field = field.as_ref().trim();
            if !field.is_empty() && !selected.iter().any(|f| f == field) {
                selected.push(field.to_string());
            }
        }
        Self { fields: selected }
    }

    /// An empty selection keeps every field
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Keep only the selected keys of one record
    pub fn apply(&self, record: Value) -> Value {
        if self.is_empty() {
            return record;
        }
        match record {
            Value::Object(mut source) => {
                let mut projected = Map::with_capacity(self.fields.len());
                for field in &self.fields {
                    if let Some(value) = source.remove(field) {
                        projected.insert(field.clone(), value);
                    }
                }
                Value::Object(projected)
            }
            other => other,
        }
    }
}

/// Serialize records and apply the selection to each
pub fn project<T: Serialize>(
    records: &[T],
    selection: &FieldSelection,
) -> Result<Vec<Value>, ScoringError> {
    records
        .iter()
        .map(|record| {
            serde_json::to_value(record)
                .map(|value| selection.apply(value))
                .map_err(|e| ScoringError::Encoding(e.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IdentityScore;
    use serde_json::json;

    fn scores() -> Vec<IdentityScore> {
        vec![IdentityScore {
            hem_sha256: "abc".to_string(),
            personal_emails: Some("a@example.com".to_string()),
            final_score: 20.6,
            adjusted_total: 15.6,
            burst_bonus: 5.0,
            velocity_bonus: 0.0,
            event_count: 3,
        }]
    }

    #[test]
    fn test_parse_selection() {
        let selection = FieldSelection::parse(" final_score, ,hem_sha256,final_score ");
        assert_eq!(selection.fields(), ["final_score", "hem_sha256"]);
        assert!(FieldSelection::parse("").is_empty());
    }

    #[test]
    fn test_project_keeps_selected_fields() {
        let selection = FieldSelection::parse("final_score,hem_sha256,unknown");
        let projected = project(&scores(), &selection).unwrap();

        assert_eq!(projected, vec![json!({"final_score": 20.6, "hem_sha256": "abc"})]);
        let keys: Vec<&String> = projected[0].as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_empty_selection_is_identity() {
        let projected = project(&scores(), &FieldSelection::default()).unwrap();
        assert_eq!(projected[0]["burst_bonus"], 5.0);
        assert_eq!(projected[0].as_object().unwrap().len(), 7);
    }

    #[test]
    fn test_non_object_records_pass_through() {
        let selection = FieldSelection::parse("a");
        assert_eq!(selection.apply(json!(3)), json!(3));
    }
}
