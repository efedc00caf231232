use serde::{Deserialize, Serialize};

use crate::model::{ResourceDescriptor, TestResult};

pub const STATEMENT_TYPE: &str = "https://in-toto.io/Statement/v1";
pub const PREDICATE_TYPE: &str = "https://in-toto.io/attestation/test-result/v0.1";

/// An unsigned in-toto v1 statement carrying a test result predicate.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Statement {
    #[serde(rename = "_type")]
    pub statement_type: String,
    pub subject: Vec<ResourceDescriptor>,
    #[serde(rename = "predicateType")]
    pub predicate_type: String,
    pub predicate: TestResult,
}

impl Statement {
    /// Wraps `result` using its first configuration entry as the subject.
    /// Returns `None` when the result has no configuration.
    pub fn for_result(result: TestResult) -> Option<Self> {
        let subject = result.subject()?.clone();
        Some(Self {
            statement_type: STATEMENT_TYPE.to_string(),
            subject: vec![subject],
            predicate_type: PREDICATE_TYPE.to_string(),
            predicate: result,
        })
    }
}
