//! Stateless request builder and response parser for the commit-status API.
//!
//! # Design
//! `GitHubProtocol` holds only the endpoint and the immutable credentials.
//! Each remote operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! `GitHubClient` glues the two halves together through a `Transport`; hosts
//! that run their own HTTP stack can call the halves directly.
//!
//! Endpoints (relative to the configured API root):
//!
//! | operation              | request                                         |
//! |------------------------|-------------------------------------------------|
//! | pull request commit    | `GET  /repos/{owner}/{repo}/pulls/{number}`      |
//! | combined status        | `GET  /repos/{owner}/{repo}/commits/{sha}/status`|
//! | create status          | `POST /repos/{owner}/{repo}/statuses/{sha}`      |
//! | commit parents         | `GET  /repos/{owner}/{repo}/git/commits/{sha}`   |

use url::Url;

use crate::credentials::Credentials;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    pull_request_ref_kind, CombinedStatus, GitCommitInfo, PullRequestInfo, PullRequestRef, PullRequestRefKind,
    ServiceMessage, StatusReport,
};

/// Media type requested from the service.
pub const ACCEPT: &str = "application/vnd.github.v3+json";

/// User-Agent sent with every request.
pub const USER_AGENT: &str = concat!("commit-status/", env!("CARGO_PKG_VERSION"));

/// Pure, I/O-free half of the client.
#[derive(Debug, Clone)]
pub struct GitHubProtocol {
    base_url: Url,
    credentials: Credentials,
}

impl GitHubProtocol {
    /// Fails with `ApiError::Configuration` unless the credentials endpoint
    /// is an absolute http(s) URL.
    pub fn new(credentials: Credentials) -> Result<Self, ApiError> {
        let base_url = Url::parse(credentials.endpoint().trim())
            .map_err(|e| ApiError::Configuration(format!("endpoint '{}': {e}", credentials.endpoint())))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ApiError::Configuration(format!(
                "endpoint '{}' must be an http(s) URL",
                credentials.endpoint()
            )));
        }
        Ok(Self {
            base_url,
            credentials,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn build_find_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr: &PullRequestRef,
    ) -> Result<HttpRequest, ApiError> {
        require("owner", owner)?;
        require("repository", repo)?;
        let number = pr.number.to_string();
        Ok(self.get(&["repos", owner, repo, "pulls", &number]))
    }

    pub fn build_read_change_status(&self, owner: &str, repo: &str, commit: &str) -> Result<HttpRequest, ApiError> {
        require("owner", owner)?;
        require("repository", repo)?;
        require("commit", commit)?;
        Ok(self.get(&["repos", owner, repo, "commits", commit, "status"]))
    }

    /// The description is sent verbatim, whatever its length.
    pub fn build_set_change_status(
        &self,
        owner: &str,
        repo: &str,
        commit: &str,
        report: &StatusReport,
    ) -> Result<HttpRequest, ApiError> {
        require("owner", owner)?;
        require("repository", repo)?;
        require("commit", commit)?;
        let body = serde_json::to_string(report).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        let mut request = self.request(HttpMethod::Post, &["repos", owner, repo, "statuses", commit]);
        request
            .headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        request.body = Some(body);
        Ok(request)
    }

    pub fn build_get_commit(&self, owner: &str, repo: &str, commit: &str) -> Result<HttpRequest, ApiError> {
        require("owner", owner)?;
        require("repository", repo)?;
        require("commit", commit)?;
        Ok(self.get(&["repos", owner, repo, "git", "commits", commit]))
    }

    /// Picks `head.sha` for head refs and `merge_commit_sha` for merge refs.
    pub fn parse_find_pull_request(&self, pr: &PullRequestRef, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response, 200, || format!("pull request #{}", pr.number))?;
        let info: PullRequestInfo = deserialize(&response)?;
        let sha = if pr.is_merge() {
            info.merge_commit_sha.unwrap_or_default()
        } else {
            info.head.sha
        };
        if sha.is_empty() {
            return Err(ApiError::NotFound(format!(
                "pull request #{} has no commit for {pr}",
                pr.number
            )));
        }
        Ok(sha)
    }

    pub fn parse_read_change_status(&self, response: HttpResponse) -> Result<CombinedStatus, ApiError> {
        check_status(&response, 200, || "commit".to_string())?;
        deserialize(&response)
    }

    pub fn parse_set_change_status(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, 201, || "commit".to_string())
    }

    /// Parents in the order the service reports them. A root commit yields
    /// an empty list.
    pub fn parse_commit_parents(&self, response: HttpResponse) -> Result<Vec<String>, ApiError> {
        check_status(&response, 200, || "commit".to_string())?;
        let commit: GitCommitInfo = deserialize(&response)?;
        Ok(commit.parents.into_iter().map(|parent| parent.sha).collect())
    }

    fn get(&self, segments: &[&str]) -> HttpRequest {
        self.request(HttpMethod::Get, segments)
    }

    fn request(&self, method: HttpMethod, segments: &[&str]) -> HttpRequest {
        HttpRequest {
            method,
            path: self.url(segments),
            headers: vec![
                ("Accept".to_string(), ACCEPT.to_string()),
                ("User-Agent".to_string(), USER_AGENT.to_string()),
                (
                    "Authorization".to_string(),
                    self.credentials.auth().authorization_header(),
                ),
            ],
            body: None,
        }
    }

    /// Appends percent-encoded segments to the endpoint path.
    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.to_string()
    }
}

/// True iff `reference` is `refs/pull/<number>/merge`. Never fails.
pub fn is_pull_request_merge_branch(reference: &str) -> bool {
    pull_request_ref_kind(reference) == Some(PullRequestRefKind::Merge)
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Malformed(format!("{field} must not be empty")));
    }
    // The url crate drops dot segments, which would address a different resource.
    if value == "." || value == ".." {
        return Err(ApiError::Malformed(format!("{field} must not be '{value}'")));
    }
    Ok(())
}

fn deserialize<T: serde::de::DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
///
/// The service answers 422 "No commit found for SHA" when a SHA does not
/// name a commit, so that 422 is treated like 404. Other 422s are validation
/// failures and stay `HttpError`.
fn check_status(response: &HttpResponse, expected: u16, subject: impl FnOnce() -> String) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    match response.status {
        401 | 403 => Err(ApiError::AuthenticationFailed {
            status: response.status,
            message: service_message(&response.body),
        }),
        404 => Err(ApiError::NotFound(format!(
            "{}: {}",
            subject(),
            service_message(&response.body)
        ))),
        422 if service_message(&response.body).starts_with(NO_COMMIT_FOUND) => Err(ApiError::NotFound(format!(
            "{}: {}",
            subject(),
            service_message(&response.body)
        ))),
        status => Err(ApiError::HttpError {
            status,
            body: response.body.clone(),
        }),
    }
}

const NO_COMMIT_FOUND: &str = "No commit found";

/// The `message` field of an error payload, or the raw body.
fn service_message(body: &str) -> String {
    serde_json::from_str::<ServiceMessage>(body)
        .map(|m| m.message)
        .unwrap_or_else(|_| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::AuthMethod;
    use crate::types::ChangeState;

    fn protocol() -> GitHubProtocol {
        let creds = Credentials::new(
            "http://localhost:3000",
            "octo",
            "hello",
            AuthMethod::token("test-token"),
        );
        GitHubProtocol::new(creds).unwrap()
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(status, body)
    }

    fn merge_ref() -> PullRequestRef {
        "refs/pull/1/merge".parse().unwrap()
    }

    #[test]
    fn build_find_pull_request_produces_correct_request() {
        let req = protocol()
            .build_find_pull_request("octo", "hello", &merge_ref())
            .unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:3000/repos/octo/hello/pulls/1");
        assert_eq!(req.header("accept"), Some(ACCEPT));
        assert_eq!(req.header("authorization"), Some("token test-token"));
        assert!(req.body.is_none());
    }

    #[test]
    fn build_requests_reject_empty_coordinates() {
        let p = protocol();
        assert!(matches!(
            p.build_find_pull_request("", "hello", &merge_ref()),
            Err(ApiError::Malformed(_))
        ));
        assert!(matches!(
            p.build_read_change_status("octo", " ", "abc"),
            Err(ApiError::Malformed(_))
        ));
        assert!(matches!(p.build_get_commit("octo", "hello", ""), Err(ApiError::Malformed(_))));
    }

    #[test]
    fn build_set_change_status_keeps_long_descriptions_intact() {
        let description = "test ".repeat(1000);
        let report = StatusReport::new(ChangeState::Pending)
            .with_target_url("http://example/ci")
            .with_description(description.clone());
        let req = protocol()
            .build_set_change_status("octo", "hello", "abc123", &report)
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/repos/octo/hello/statuses/abc123");
        assert_eq!(req.header("content-type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["state"], "pending");
        assert_eq!(body["target_url"], "http://example/ci");
        assert_eq!(body["description"].as_str().unwrap(), description);
        assert!(body.get("context").is_none());
    }

    #[test]
    fn build_requests_reject_dot_segments() {
        let p = protocol();
        let report = StatusReport::new(ChangeState::Pending);
        assert!(matches!(
            p.build_set_change_status("octo", "hello", "..", &report),
            Err(ApiError::Malformed(_))
        ));
        assert!(matches!(p.build_get_commit("octo", "hello", "."), Err(ApiError::Malformed(_))));
        assert!(matches!(
            p.build_read_change_status(".", "..", "abc"),
            Err(ApiError::Malformed(_))
        ));
        assert!(matches!(
            p.build_find_pull_request("octo", "..", &merge_ref()),
            Err(ApiError::Malformed(_))
        ));
        // Dots inside a segment are ordinary characters.
        let req = p.build_get_commit("octo", "hello", "...").unwrap();
        assert_eq!(req.path, "http://localhost:3000/repos/octo/hello/git/commits/...");
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        let req = protocol()
            .build_get_commit("octo", "hello", "bad/../sha")
            .unwrap();
        assert_eq!(
            req.path,
            "http://localhost:3000/repos/octo/hello/git/commits/bad%2F..%2Fsha"
        );
    }

    #[test]
    fn endpoint_with_api_prefix_is_preserved() {
        let creds = Credentials::new(
            "https://ghe.example.com/api/v3/",
            "octo",
            "hello",
            AuthMethod::token("t"),
        );
        let req = GitHubProtocol::new(creds)
            .unwrap()
            .build_read_change_status("octo", "hello", "abc")
            .unwrap();
        assert_eq!(
            req.path,
            "https://ghe.example.com/api/v3/repos/octo/hello/commits/abc/status"
        );
    }

    #[test]
    fn new_rejects_non_http_endpoints() {
        for endpoint in ["", "api.github.com", "mailto:octo@example.com", "ftp://example.com"] {
            let creds = Credentials::new(endpoint, "octo", "hello", AuthMethod::token("t"));
            assert!(
                matches!(GitHubProtocol::new(creds), Err(ApiError::Configuration(_))),
                "{endpoint:?}"
            );
        }
    }

    #[test]
    fn parse_find_pull_request_selects_field_by_kind() {
        let body = r#"{"number":1,"head":{"sha":"aaa"},"merge_commit_sha":"bbb"}"#;
        let p = protocol();
        let merge = p.parse_find_pull_request(&merge_ref(), response(200, body)).unwrap();
        assert_eq!(merge, "bbb");
        let head_ref: PullRequestRef = "refs/pull/1/head".parse().unwrap();
        let head = p.parse_find_pull_request(&head_ref, response(200, body)).unwrap();
        assert_eq!(head, "aaa");
    }

    #[test]
    fn parse_find_pull_request_without_merge_preview_is_not_found() {
        let body = r#"{"number":1,"head":{"sha":"aaa"},"merge_commit_sha":null}"#;
        let err = protocol()
            .parse_find_pull_request(&merge_ref(), response(200, body))
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn parse_classifies_error_statuses() {
        let p = protocol();
        let err = p
            .parse_set_change_status(response(401, r#"{"message":"Bad credentials"}"#))
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::AuthenticationFailed {
                status: 401,
                message: "Bad credentials".to_string()
            }
        );

        let err = p.parse_set_change_status(response(403, "forbidden")).unwrap_err();
        assert!(err.is_authentication_failure());

        let err = p
            .parse_set_change_status(response(422, r#"{"message":"No commit found for SHA: wrong_hash"}"#))
            .unwrap_err();
        assert!(matches!(&err, ApiError::NotFound(msg) if msg.contains("wrong_hash")));
        assert!(err.is_io());

        let err = p
            .parse_set_change_status(response(422, r#"{"message":"Validation Failed"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 422, .. }));
        assert_eq!(err.kind(), crate::ErrorKind::Transport);

        let err = p.parse_commit_parents(response(503, "unavailable")).unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 503, .. }));
        assert!(err.is_io());
    }

    #[test]
    fn parse_commit_parents_preserves_order() {
        let body = r#"{"sha":"m","parents":[{"sha":"p1","url":"x"},{"sha":"p2","url":"y"}]}"#;
        let parents = protocol().parse_commit_parents(response(200, body)).unwrap();
        assert_eq!(parents, vec!["p1".to_string(), "p2".to_string()]);

        let root = protocol()
            .parse_commit_parents(response(200, r#"{"sha":"r","parents":[]}"#))
            .unwrap();
        assert!(root.is_empty());
    }

    #[test]
    fn parse_read_change_status_bad_json() {
        let err = protocol()
            .parse_read_change_status(response(200, "not json"))
            .unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[test]
    fn merge_branch_detection_table() {
        let cases = [
            ("refs/pull/42/merge", true),
            ("refs/pull/1/merge", true),
            ("refs/pull/42/head", false),
            ("refs/pull/merge", false),
            ("", false),
            ("pull/1/merge", false),
            ("refs/heads/merge", false),
            ("refs/pull/-1/merge", false),
            ("refs/pull/99999999999999999999999/merge", true),
            ("refs/pull/99999999999999999999999/head", false),
        ];
        for (input, expected) in cases {
            assert_eq!(is_pull_request_merge_branch(input), expected, "{input:?}");
        }
    }
}
