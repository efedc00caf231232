use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Digest algorithm names recorded for a repository resource.
pub const DIGEST_GIT_COMMIT: &str = "gitCommit";
pub const DIGEST_SHA1: &str = "sha1";

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    #[default]
    Pass,
    Fail,
}

/// An in-toto v1 resource descriptor.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceDescriptor {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub digest: BTreeMap<String, String>,
}

impl ResourceDescriptor {
    /// Describes a repository checked out at `commit`. Both the `gitCommit`
    /// and the `sha1` digests carry the same hash.
    pub fn for_commit(name: impl Into<String>, uri: impl Into<String>, commit: &str) -> Self {
        let mut digest = BTreeMap::new();
        digest.insert(DIGEST_SHA1.to_string(), commit.to_string());
        digest.insert(DIGEST_GIT_COMMIT.to_string(), commit.to_string());
        Self { name: name.into(), uri: uri.into(), digest }
    }
}

/// The test-result predicate.
///
/// `result` is `Fail` exactly when `failed_tests` is non-empty once a parser
/// has classified a run. Empty fields are left out of the JSON form.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub result: TestOutcome,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configuration: Vec<ResourceDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub passed_tests: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_tests: Vec<String>,
}

impl TestResult {
    pub fn with_configuration(configuration: Vec<ResourceDescriptor>) -> Self {
        Self { configuration, ..Self::default() }
    }

    /// Drops any previous classification, keeping configuration and url.
    pub fn reset_classification(&mut self) {
        self.result = TestOutcome::Pass;
        self.passed_tests.clear();
        self.failed_tests.clear();
    }

    pub fn record_pass(&mut self, test: impl Into<String>) {
        self.passed_tests.push(test.into());
    }

    pub fn record_fail(&mut self, test: impl Into<String>) {
        self.failed_tests.push(test.into());
    }

    /// Settles `result` from the failed set.
    pub fn finalize(&mut self) {
        self.result = if self.failed_tests.is_empty() { TestOutcome::Pass } else { TestOutcome::Fail };
    }

    /// The resource the run is about, if provenance was resolved.
    pub fn subject(&self) -> Option<&ResourceDescriptor> {
        self.configuration.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_are_omitted() {
        let res = TestResult::default();
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json, serde_json::json!({"result": "pass"}));
    }

    #[test]
    fn commit_descriptor_carries_both_digests() {
        let rd = ResourceDescriptor::for_commit("v1.0.0", "git+https://example.com/r@abc", "abc");
        assert_eq!(rd.digest.get("gitCommit").map(String::as_str), Some("abc"));
        assert_eq!(rd.digest.get("sha1").map(String::as_str), Some("abc"));
    }
}
