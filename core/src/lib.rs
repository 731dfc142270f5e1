//! Blocking client for a hosting service's commit-status API.
//!
//! # Overview
//! Resolves `refs/pull/<n>/(merge|head)` to commit SHAs, reads and posts
//! commit statuses, and lists commit parents. Built for CI orchestrators that
//! report build results back to the hosting service.
//!
//! # Design
//! - `GitHubProtocol` builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network (host-does-IO split).
//! - `GitHubClient` drives the protocol through a `Transport`; `UreqTransport`
//!   is the default. The client is stateless and never retries.
//! - `GitHubClientFactory::create` validates `Credentials` up front.
//! - Failures are classified by `ApiError::kind`: malformed input,
//!   authentication failure, not found, transport, configuration.

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod factory;
pub mod http;
pub mod protocol;
pub mod types;
pub mod ureq_transport;

pub use client::GitHubClient;
pub use config::{ClientConfig, ConfigError};
pub use credentials::{AuthMethod, Credentials};
pub use error::{ApiError, ErrorKind};
pub use factory::GitHubClientFactory;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use protocol::{is_pull_request_merge_branch, GitHubProtocol};
pub use types::{ChangeState, CombinedStatus, CommitStatus, PullRequestRef, PullRequestRefKind, StatusReport};
pub use ureq_transport::UreqTransport;
