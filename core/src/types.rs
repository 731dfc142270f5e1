//! Domain values and wire DTOs for the commit-status API.
//!
//! # Design
//! These types mirror the hosting service's JSON schema but are defined
//! independently from the mock-server crate. Integration tests catch any
//! schema drift between the two.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

static PULL_REQUEST_REF_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^refs/pull/([0-9]+)/(merge|head)$").expect("pull request ref regex is valid")
});

/// Status values the service accepts for a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeState {
    Pending,
    Success,
    Error,
    Failure,
}

impl ChangeState {
    pub const ALL: [ChangeState; 4] = [
        ChangeState::Pending,
        ChangeState::Success,
        ChangeState::Error,
        ChangeState::Failure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeState::Pending => "pending",
            ChangeState::Success => "success",
            ChangeState::Error => "error",
            ChangeState::Failure => "failure",
        }
    }
}

impl fmt::Display for ChangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeState {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChangeState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ApiError::Malformed(format!("unknown change state '{s}'")))
    }
}

/// Which commit of a pull request a ref names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestRefKind {
    /// `refs/pull/<n>/merge`: the merge-preview commit.
    Merge,
    /// `refs/pull/<n>/head`: the pull request's head commit.
    Head,
}

/// A parsed `refs/pull/<number>/<kind>` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullRequestRef {
    pub number: u64,
    pub kind: PullRequestRefKind,
}

impl PullRequestRef {
    pub fn is_merge(&self) -> bool {
        self.kind == PullRequestRefKind::Merge
    }
}

/// Kind of a `refs/pull/<number>/<kind>` ref, judged on shape alone: the
/// number may exceed any integer type.
pub(crate) fn pull_request_ref_kind(s: &str) -> Option<PullRequestRefKind> {
    let captures = PULL_REQUEST_REF_REGEX.captures(s)?;
    match &captures[2] {
        "merge" => Some(PullRequestRefKind::Merge),
        _ => Some(PullRequestRefKind::Head),
    }
}

impl FromStr for PullRequestRef {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ApiError::Malformed(format!("'{s}' is not a refs/pull/<number>/(merge|head) ref"));
        let captures = PULL_REQUEST_REF_REGEX.captures(s).ok_or_else(malformed)?;
        let number = captures[1].parse::<u64>().map_err(|_| malformed())?;
        let kind = match &captures[2] {
            "merge" => PullRequestRefKind::Merge,
            _ => PullRequestRefKind::Head,
        };
        Ok(PullRequestRef { number, kind })
    }
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            PullRequestRefKind::Merge => "merge",
            PullRequestRefKind::Head => "head",
        };
        write!(f, "refs/pull/{}/{kind}", self.number)
    }
}

/// A status entry to post for a commit. Serializes to the request body of
/// `POST /repos/{owner}/{repo}/statuses/{sha}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub state: ChangeState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl StatusReport {
    pub fn new(state: ChangeState) -> Self {
        Self {
            state,
            target_url: None,
            description: None,
            context: None,
        }
    }

    pub fn with_target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = Some(url.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// One status entry as reported back by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub state: ChangeState,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

/// The combined status of a commit: the overall state plus the latest entry
/// per context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedStatus {
    pub state: ChangeState,
    pub sha: String,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub statuses: Vec<CommitStatus>,
}

impl fmt::Display for CombinedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({} statuses)", self.sha, self.state, self.total_count)?;
        for status in &self.statuses {
            write!(
                f,
                "\n  [{}] {}",
                status.state,
                status.context.as_deref().unwrap_or("default")
            )?;
            if let Some(description) = &status.description {
                write!(f, ": {description}")?;
            }
            if let Some(url) = &status.target_url {
                write!(f, " <{url}>")?;
            }
        }
        Ok(())
    }
}

/// Subset of the pull request resource the client reads.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PullRequestInfo {
    pub head: CommitRef,
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
}

/// Subset of the git commit resource the client reads.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GitCommitInfo {
    #[serde(default)]
    pub parents: Vec<CommitRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CommitRef {
    pub sha: String,
}

/// Error payload the service returns alongside 4xx/5xx statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ServiceMessage {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_state_uses_lowercase_wire_form() {
        for state in ChangeState::ALL {
            let json = serde_json::to_value(state).unwrap();
            assert_eq!(json, state.as_str());
        }
        let parsed: ChangeState = serde_json::from_str(r#""failure""#).unwrap();
        assert_eq!(parsed, ChangeState::Failure);
    }

    #[test]
    fn change_state_rejects_unknown_values() {
        assert!(serde_json::from_str::<ChangeState>(r#""cancelled""#).is_err());
        assert!(matches!("done".parse::<ChangeState>(), Err(ApiError::Malformed(_))));
        assert_eq!("Pending".parse::<ChangeState>().unwrap(), ChangeState::Pending);
    }

    #[test]
    fn pull_request_ref_parses_both_kinds() {
        let merge: PullRequestRef = "refs/pull/42/merge".parse().unwrap();
        assert_eq!(merge.number, 42);
        assert!(merge.is_merge());

        let head: PullRequestRef = "refs/pull/7/head".parse().unwrap();
        assert_eq!(head.number, 7);
        assert_eq!(head.kind, PullRequestRefKind::Head);
        assert_eq!(head.to_string(), "refs/pull/7/head");
    }

    #[test]
    fn pull_request_ref_rejects_malformed_input() {
        for input in [
            "",
            "refs/pull/merge",
            "pull/1/merge",
            "refs/pull/1/from",
            "refs/pull/x/merge",
            "refs/pull/1/merge/extra",
            " refs/pull/1/merge",
            "refs/heads/main",
        ] {
            let err = input.parse::<PullRequestRef>().unwrap_err();
            assert!(matches!(err, ApiError::Malformed(_)), "{input:?}");
        }
    }

    #[test]
    fn overflowing_pull_request_number_keeps_its_shape() {
        let input = "refs/pull/99999999999999999999999/merge";
        assert_eq!(pull_request_ref_kind(input), Some(PullRequestRefKind::Merge));
        assert!(matches!(input.parse::<PullRequestRef>(), Err(ApiError::Malformed(_))));
    }

    #[test]
    fn status_report_omits_unset_fields() {
        let report = StatusReport::new(ChangeState::Success).with_description("ok");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json, serde_json::json!({"state": "success", "description": "ok"}));
    }

    #[test]
    fn combined_status_renders_each_entry() {
        let combined = CombinedStatus {
            state: ChangeState::Pending,
            sha: "abc123".to_string(),
            total_count: 1,
            statuses: vec![CommitStatus {
                state: ChangeState::Pending,
                target_url: Some("http://ci.example/build/1".to_string()),
                description: Some("building".to_string()),
                context: Some("ci/build".to_string()),
            }],
        };
        let rendered = combined.to_string();
        assert!(rendered.starts_with("abc123 pending (1 statuses)"));
        assert!(rendered.contains("[pending] ci/build: building <http://ci.example/build/1>"));
    }
}
