//! Structured answer model for the router stage.
//!
//! The router asks the model to pick one or more candidate engines from a
//! 1-based numbered list. The call uses constrained decoding against
//! [`AnswerSet::schema`], so the router never has to recover from
//! malformed JSON; the only failure mode left to validate is an
//! out-of-range choice index.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::WorkflowError;

/// One selected candidate with the model's justification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// 1-based index into the candidate list.
    pub choice: usize,
    /// Short justification for the selection.
    pub reason: String,
}

/// Ordered set of router selections from one structured-predict call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerSet {
    /// Selections in the order the model returned them.
    pub answers: Vec<Answer>,
}

impl AnswerSet {
    /// Validates every choice against the candidate count.
    ///
    /// The router may return fewer choices than candidates, but never an
    /// index outside `[1, candidate_count]`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Routing`] for the first out-of-range
    /// choice, or [`WorkflowError::Configuration`] if the set is empty.
    pub fn validate(&self, candidate_count: usize) -> Result<(), WorkflowError> {
        if self.answers.is_empty() {
            return Err(WorkflowError::Configuration {
                message: "router selected no candidate engines".to_string(),
            });
        }
        for answer in &self.answers {
            if answer.choice == 0 || answer.choice > candidate_count {
                return Err(WorkflowError::Routing {
                    choice: answer.choice,
                    candidate_count,
                });
            }
        }
        Ok(())
    }

    /// JSON Schema used for constrained decoding of the router call.
    #[must_use]
    pub fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "answers": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "choice": {
                                "type": "integer",
                                "description": "1-based index of the selected choice."
                            },
                            "reason": {
                                "type": "string",
                                "description": "Short justification for the selection."
                            }
                        },
                        "required": ["choice", "reason"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["answers"],
            "additionalProperties": false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn set(choices: &[usize]) -> AnswerSet {
        AnswerSet {
            answers: choices
                .iter()
                .map(|&choice| Answer {
                    choice,
                    reason: "test".to_string(),
                })
                .collect(),
        }
    }

    #[test_case(&[1], 2, true; "single in range")]
    #[test_case(&[1, 2], 2, true; "all candidates selected")]
    #[test_case(&[2], 2, true; "subset selected")]
    #[test_case(&[0], 2, false; "zero is below the 1-based range")]
    #[test_case(&[3], 2, false; "above range")]
    #[test_case(&[1, 5], 2, false; "one bad choice poisons the set")]
    fn test_validate(choices: &[usize], candidate_count: usize, ok: bool) {
        assert_eq!(set(choices).validate(candidate_count).is_ok(), ok);
    }

    #[test]
    fn test_validate_out_of_range_error_detail() {
        let err = set(&[5]).validate(2).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Routing {
                choice: 5,
                candidate_count: 2
            }
        ));
    }

    #[test]
    fn test_validate_empty() {
        let err = set(&[]).validate(2).unwrap_err();
        assert!(matches!(err, WorkflowError::Configuration { .. }));
    }

    #[test]
    fn test_schema_shape() {
        let schema = AnswerSet::schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"][0], "answers");
    }

    #[test]
    fn test_deserialization() {
        let json = r#"{"answers":[{"choice":1,"reason":"summary question"}]}"#;
        let set: AnswerSet = serde_json::from_str(json).unwrap_or_else(|_| unreachable!());
        assert_eq!(set.answers.len(), 1);
        assert_eq!(set.answers[0].choice, 1);
    }
}
