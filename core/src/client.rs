//! Blocking commit-status client.
//!
//! # Design
//! `GitHubClient` pairs a `GitHubProtocol` with a `Transport`. Every
//! operation is one independent request/response cycle: build, execute,
//! parse. Nothing is cached and nothing is retried, so the client carries no
//! mutable state and can be shared across threads when its transport can.

use tracing::{debug, instrument, warn};

use crate::credentials::Credentials;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::protocol::{self, GitHubProtocol};
use crate::types::{ChangeState, CombinedStatus, PullRequestRef, StatusReport};

/// Commit-status and ref-resolution client. Build one with
/// `GitHubClientFactory::create`.
#[derive(Debug, Clone)]
pub struct GitHubClient<T> {
    protocol: GitHubProtocol,
    transport: T,
}

impl<T: Transport> GitHubClient<T> {
    pub(crate) fn new(protocol: GitHubProtocol, transport: T) -> Self {
        Self { protocol, transport }
    }

    pub fn credentials(&self) -> &Credentials {
        self.protocol.credentials()
    }

    /// The request builder/parser this client drives.
    pub fn protocol(&self) -> &GitHubProtocol {
        &self.protocol
    }

    /// Resolve `refs/pull/<n>/merge` or `refs/pull/<n>/head` to a commit SHA.
    #[instrument(skip(self), level = "debug")]
    pub fn find_pull_request_commit(&self, owner: &str, repo: &str, reference: &str) -> Result<String, ApiError> {
        let pr: PullRequestRef = reference.parse()?;
        let request = self.protocol.build_find_pull_request(owner, repo, &pr)?;
        let response = self.execute(request)?;
        self.protocol
            .parse_find_pull_request(&pr, response)
            .inspect_err(|e| warn!(%reference, error = %e, "pull request lookup failed"))
    }

    /// Latest combined status of `commit`.
    #[instrument(skip(self), level = "debug")]
    pub fn read_change_status(&self, owner: &str, repo: &str, commit: &str) -> Result<CombinedStatus, ApiError> {
        let request = self.protocol.build_read_change_status(owner, repo, commit)?;
        let response = self.execute(request)?;
        self.protocol
            .parse_read_change_status(response)
            .inspect_err(|e| warn!(%commit, error = %e, "reading commit status failed"))
    }

    /// Append a status entry to `commit`. The description is sent as given.
    #[instrument(skip(self, description), level = "debug")]
    pub fn set_change_status(
        &self,
        owner: &str,
        repo: &str,
        commit: &str,
        state: ChangeState,
        target_url: Option<&str>,
        description: &str,
    ) -> Result<(), ApiError> {
        let mut report = StatusReport::new(state).with_description(description);
        report.target_url = target_url.map(str::to_string);
        self.set_change_status_report(owner, repo, commit, &report)
    }

    /// Like `set_change_status`, with full control over the posted entry.
    #[instrument(skip(self, report), fields(state = %report.state), level = "debug")]
    pub fn set_change_status_report(
        &self,
        owner: &str,
        repo: &str,
        commit: &str,
        report: &StatusReport,
    ) -> Result<(), ApiError> {
        let request = self.protocol.build_set_change_status(owner, repo, commit, report)?;
        let response = self.execute(request)?;
        self.protocol
            .parse_set_change_status(response)
            .inspect_err(|e| warn!(%commit, error = %e, "setting commit status failed"))
    }

    /// Parent SHAs of `commit` in service-reported order.
    #[instrument(skip(self), level = "debug")]
    pub fn get_commit_parents(&self, owner: &str, repo: &str, commit: &str) -> Result<Vec<String>, ApiError> {
        let request = self.protocol.build_get_commit(owner, repo, commit)?;
        let response = self.execute(request)?;
        self.protocol
            .parse_commit_parents(response)
            .inspect_err(|e| warn!(%commit, error = %e, "reading commit parents failed"))
    }

    /// See [`protocol::is_pull_request_merge_branch`].
    pub fn is_pull_request_merge_branch(&self, reference: &str) -> bool {
        protocol::is_pull_request_merge_branch(reference)
    }

    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.path, "sending request");
        let response = self.transport.execute(request).map_err(|e| {
            warn!(error = %e, "transport failure");
            ApiError::from(e)
        })?;
        debug!(status = response.status, "received response");
        Ok(response)
    }
}
