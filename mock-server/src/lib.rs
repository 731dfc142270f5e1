//! In-process emulation of the hosting service's commit-status endpoints.
//!
//! Serves a seeded fixture repository so the client contract can be
//! exercised over real HTTP without network access or a live account.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

pub const OWNER: &str = "octocat";
pub const REPOSITORY: &str = "hello-world";
pub const TOKEN: &str = "test-token";
pub const USERNAME: &str = "octocat";
pub const PASSWORD: &str = "test-password";

/// First commit of the fixture repository; it has no parents.
pub const ROOT_COMMIT: &str = "c3d0be41ecbe669545ee3e94d31ed9a4bc91ee3c";
/// Tip of the default branch, child of `ROOT_COMMIT`.
pub const BASE_COMMIT: &str = "7fd1a60b01f91b314f59955a4e4d4e80d8edf11d";
/// Head of pull request #1. Its merge preview is recorded as the same commit.
pub const PR_COMMIT: &str = "4e86fc6dcef23c733f36bc8bbf35fb292edc9cdb";
/// Merge of `PR_COMMIT` into `BASE_COMMIT`.
pub const MERGE_COMMIT: &str = "553c2077f0edc3d5dc5d17262f6aa498e69d6f8e";
/// Head of closed pull request #2, which has no merge preview.
pub const CLOSED_PR_COMMIT: &str = "762941318ee16e59dabbacb1b4049eec22f0d303";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub state: String,
    pub head: CommitRef,
    pub merge_commit_sha: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GitCommit {
    pub sha: String,
    pub message: String,
    pub parents: Vec<CommitRef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Status {
    pub id: u64,
    pub state: String,
    pub target_url: Option<String>,
    pub description: Option<String>,
    pub context: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CombinedStatus {
    pub state: String,
    pub sha: String,
    pub total_count: usize,
    pub statuses: Vec<Status>,
}

#[derive(Deserialize)]
pub struct CreateStatus {
    pub state: String,
    pub target_url: Option<String>,
    pub description: Option<String>,
    pub context: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

#[derive(Clone, Debug, Default)]
pub struct Repository {
    pub pulls: HashMap<u64, PullRequest>,
    pub commits: HashMap<String, GitCommit>,
    /// Status history per commit, oldest first.
    pub statuses: HashMap<String, Vec<Status>>,
}

impl Repository {
    pub fn add_commit(&mut self, sha: &str, message: &str, parents: &[&str]) {
        self.commits.insert(
            sha.to_string(),
            GitCommit {
                sha: sha.to_string(),
                message: message.to_string(),
                parents: parents.iter().map(|p| CommitRef { sha: p.to_string() }).collect(),
            },
        );
    }

    pub fn add_pull(&mut self, number: u64, state: &str, head: &str, merge_commit_sha: Option<&str>) {
        self.pulls.insert(
            number,
            PullRequest {
                number,
                state: state.to_string(),
                head: CommitRef { sha: head.to_string() },
                merge_commit_sha: merge_commit_sha.map(str::to_string),
            },
        );
    }
}

/// Everything the mock serves: repositories keyed by `owner/repo`, plus the
/// `Authorization` header values it accepts.
#[derive(Clone, Debug, Default)]
pub struct Fixture {
    pub repos: HashMap<String, Repository>,
    pub authorization: Vec<String>,
    next_status_id: u64,
}

impl Fixture {
    /// One repository with a root commit, a default-branch commit, an open
    /// pull request (#1), its merge commit and a closed pull request (#2).
    /// Accepts `token TOKEN` and basic `USERNAME:PASSWORD`.
    pub fn seeded() -> Self {
        let mut repo = Repository::default();
        repo.add_commit(ROOT_COMMIT, "Initial commit", &[]);
        repo.add_commit(BASE_COMMIT, "Add README", &[ROOT_COMMIT]);
        repo.add_commit(PR_COMMIT, "Add feature", &[BASE_COMMIT]);
        repo.add_commit(MERGE_COMMIT, "Merge pull request #1", &[BASE_COMMIT, PR_COMMIT]);
        repo.add_commit(CLOSED_PR_COMMIT, "Abandoned change", &[BASE_COMMIT]);
        repo.add_pull(1, "open", PR_COMMIT, Some(PR_COMMIT));
        repo.add_pull(2, "closed", CLOSED_PR_COMMIT, None);

        let mut fixture = Fixture::default();
        fixture.repos.insert(format!("{OWNER}/{REPOSITORY}"), repo);
        fixture.authorization = vec![
            format!("token {TOKEN}"),
            format!("Basic {}", STANDARD.encode(format!("{USERNAME}:{PASSWORD}"))),
        ];
        fixture
    }

    fn repo(&self, owner: &str, repo: &str) -> Result<&Repository, Failure> {
        self.repos.get(&format!("{owner}/{repo}")).ok_or_else(not_found)
    }

    fn repo_mut(&mut self, owner: &str, repo: &str) -> Result<&mut Repository, Failure> {
        self.repos.get_mut(&format!("{owner}/{repo}")).ok_or_else(not_found)
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Failure> {
        let presented = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
        match presented {
            Some(value) if self.authorization.iter().any(|accepted| accepted == value) => Ok(()),
            Some(_) => Err(failure(StatusCode::UNAUTHORIZED, "Bad credentials")),
            None => Err(failure(StatusCode::UNAUTHORIZED, "Requires authentication")),
        }
    }
}

pub type Db = Arc<RwLock<Fixture>>;

type Failure = (StatusCode, Json<Message>);

fn failure(status: StatusCode, message: impl Into<String>) -> Failure {
    (status, Json(Message { message: message.into() }))
}

fn not_found() -> Failure {
    failure(StatusCode::NOT_FOUND, "Not Found")
}

fn no_commit(sha: &str) -> Failure {
    failure(StatusCode::UNPROCESSABLE_ENTITY, format!("No commit found for SHA: {sha}"))
}

pub fn app() -> Router {
    app_with(Fixture::seeded())
}

pub fn app_with(fixture: Fixture) -> Router {
    let db: Db = Arc::new(RwLock::new(fixture));
    Router::new()
        .route("/repos/{owner}/{repo}/pulls/{number}", get(get_pull))
        .route("/repos/{owner}/{repo}/git/commits/{sha}", get(get_commit))
        .route("/repos/{owner}/{repo}/commits/{sha}/status", get(combined_status))
        .route("/repos/{owner}/{repo}/statuses/{sha}", post(create_status))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn get_pull(
    State(db): State<Db>,
    Path((owner, repo, number)): Path<(String, String, u64)>,
    headers: HeaderMap,
) -> Result<Json<PullRequest>, Failure> {
    let fixture = db.read().await;
    fixture.authorize(&headers)?;
    let repo = fixture.repo(&owner, &repo)?;
    repo.pulls.get(&number).cloned().map(Json).ok_or_else(not_found)
}

async fn get_commit(
    State(db): State<Db>,
    Path((owner, repo, sha)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Json<GitCommit>, Failure> {
    let fixture = db.read().await;
    fixture.authorize(&headers)?;
    let repo = fixture.repo(&owner, &repo)?;
    repo.commits.get(&sha).cloned().map(Json).ok_or_else(not_found)
}

async fn combined_status(
    State(db): State<Db>,
    Path((owner, repo, sha)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Json<CombinedStatus>, Failure> {
    let fixture = db.read().await;
    fixture.authorize(&headers)?;
    let repo = fixture.repo(&owner, &repo)?;
    if !repo.commits.contains_key(&sha) {
        return Err(no_commit(&sha));
    }
    let history = repo.statuses.get(&sha).map(Vec::as_slice).unwrap_or_default();
    Ok(Json(combine(&sha, history)))
}

async fn create_status(
    State(db): State<Db>,
    Path((owner, repo, sha)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(input): Json<CreateStatus>,
) -> Result<(StatusCode, Json<Status>), Failure> {
    let mut fixture = db.write().await;
    fixture.authorize(&headers)?;
    if !matches!(input.state.as_str(), "pending" | "success" | "error" | "failure") {
        return Err(failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Validation Failed: invalid state '{}'", input.state),
        ));
    }
    if !fixture.repo(&owner, &repo)?.commits.contains_key(&sha) {
        return Err(no_commit(&sha));
    }
    fixture.next_status_id += 1;
    let id = fixture.next_status_id;
    let repo = fixture.repo_mut(&owner, &repo)?;
    let status = Status {
        id,
        state: input.state,
        target_url: input.target_url,
        description: input.description,
        context: input.context.unwrap_or_else(|| "default".to_string()),
    };
    debug!(%sha, state = %status.state, context = %status.context, "status created");
    repo.statuses.entry(sha).or_default().push(status.clone());
    Ok((StatusCode::CREATED, Json(status)))
}

/// Latest status per context, newest first, with the overall state:
/// failure if any entry is error/failure, pending if there are no entries
/// or any entry is pending, success otherwise.
pub fn combine(sha: &str, history: &[Status]) -> CombinedStatus {
    let mut latest: Vec<Status> = Vec::new();
    for status in history.iter().rev() {
        if !latest.iter().any(|seen| seen.context == status.context) {
            latest.push(status.clone());
        }
    }
    let state = if latest.iter().any(|s| s.state == "error" || s.state == "failure") {
        "failure"
    } else if latest.is_empty() || latest.iter().any(|s| s.state == "pending") {
        "pending"
    } else {
        "success"
    };
    CombinedStatus {
        state: state.to_string(),
        sha: sha.to_string(),
        total_count: latest.len(),
        statuses: latest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(id: u64, state: &str, context: &str) -> Status {
        Status {
            id,
            state: state.to_string(),
            target_url: None,
            description: None,
            context: context.to_string(),
        }
    }

    #[test]
    fn combine_without_statuses_is_pending() {
        let combined = combine("abc", &[]);
        assert_eq!(combined.state, "pending");
        assert_eq!(combined.total_count, 0);
    }

    #[test]
    fn combine_keeps_latest_per_context() {
        let history = [
            status(1, "pending", "ci/build"),
            status(2, "success", "ci/build"),
            status(3, "success", "ci/lint"),
        ];
        let combined = combine("abc", &history);
        assert_eq!(combined.state, "success");
        assert_eq!(combined.total_count, 2);
        assert_eq!(combined.statuses[0].id, 3);
        assert_eq!(combined.statuses[1].id, 2);
    }

    #[test]
    fn combine_failure_wins_over_pending() {
        let history = [status(1, "pending", "ci/build"), status(2, "error", "ci/lint")];
        assert_eq!(combine("abc", &history).state, "failure");
    }

    #[test]
    fn seeded_fixture_has_root_and_merge_commits() {
        let fixture = Fixture::seeded();
        let repo = &fixture.repos[&format!("{OWNER}/{REPOSITORY}")];
        assert!(repo.commits[ROOT_COMMIT].parents.is_empty());
        assert_eq!(repo.commits[MERGE_COMMIT].parents.len(), 2);
        assert_eq!(repo.pulls[&1].merge_commit_sha.as_deref(), Some(PR_COMMIT));
        assert!(repo.pulls[&2].merge_commit_sha.is_none());
    }

    #[test]
    fn create_status_rejects_missing_state() {
        let result: Result<CreateStatus, _> = serde_json::from_str(r#"{"description":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn authorize_accepts_configured_headers_only() {
        let fixture = Fixture::seeded();
        let mut headers = HeaderMap::new();
        assert!(fixture.authorize(&headers).is_err());

        headers.insert(AUTHORIZATION, "token nope".parse().unwrap());
        let (status, _) = fixture.authorize(&headers).unwrap_err();
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        headers.insert(AUTHORIZATION, format!("token {TOKEN}").parse().unwrap());
        assert!(fixture.authorize(&headers).is_ok());
    }
}
