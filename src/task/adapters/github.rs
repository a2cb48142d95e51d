//! GitHub REST client for opening pull requests and deleting branches.

use crate::config::GitHubConfig;
use crate::task::{
    domain::{BranchName, Credentials, RepositoryRef},
    ports::{
        ChangeRequest, ChangeRequestClient, ChangeRequestError, ChangeRequestResult,
        OpenedChangeRequest,
    },
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use reqwest::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

/// Media type requested from the REST API.
pub const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while constructing a [`GitHubClient`].
#[derive(Debug, Error)]
pub enum GitHubClientError {
    /// The API base is not a URL.
    #[error("invalid GitHub API base: {0}")]
    InvalidApiBase(#[from] url::ParseError),

    /// The API base cannot carry a path.
    #[error("GitHub API base cannot carry a path: {0}")]
    OpaqueApiBase(String),

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct PullRequestPayload<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
}

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    html_url: String,
    number: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

/// [`ChangeRequestClient`] backed by the GitHub REST API.
///
/// Every call authenticates with the task's own credential.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: Url,
}

impl GitHubClient {
    /// Creates a client for the API described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubClientError`] when the API base is unusable or the
    /// HTTP client cannot be built.
    pub fn new(config: &GitHubConfig) -> Result<Self, GitHubClientError> {
        let api_base = Url::parse(&config.api_base)?;
        if api_base.cannot_be_a_base() {
            return Err(GitHubClientError::OpaqueApiBase(config.api_base.clone()));
        }
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, api_base })
    }

    /// Returns the API base URL.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> ChangeRequestResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ChangeRequestError::transport(GitHubClientError::OpaqueApiBase(
                    self.api_base.to_string(),
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorised(
        &self,
        method: Method,
        url: Url,
        credentials: &Credentials,
    ) -> ChangeRequestResult<reqwest::RequestBuilder> {
        let mut token = HeaderValue::from_str(&format!("token {}", credentials.expose()))
            .map_err(ChangeRequestError::transport)?;
        token.set_sensitive(true);
        Ok(self
            .http
            .request(method, url)
            .header(AUTHORIZATION, token)
            .header(ACCEPT, GITHUB_ACCEPT))
    }

    fn open_request(
        &self,
        request: &ChangeRequest,
        credentials: &Credentials,
    ) -> ChangeRequestResult<Request> {
        let repository = &request.repository;
        let url = self.endpoint(["repos", repository.owner(), repository.name(), "pulls"])?;
        let payload = PullRequestPayload {
            title: &request.title,
            body: &request.body,
            head: request.head.as_str(),
            base: &request.base,
        };
        self.authorised(Method::POST, url, credentials)?
            .json(&payload)
            .build()
            .map_err(ChangeRequestError::transport)
    }

    fn delete_request(
        &self,
        repository: &RepositoryRef,
        branch: &BranchName,
        credentials: &Credentials,
    ) -> ChangeRequestResult<Request> {
        let url = self.endpoint(
            ["repos", repository.owner(), repository.name(), "git", "refs", "heads"]
                .into_iter()
                .chain(branch.as_str().split('/')),
        )?;
        self.authorised(Method::DELETE, url, credentials)?
            .build()
            .map_err(ChangeRequestError::transport)
    }

    async fn execute(&self, request: Request) -> ChangeRequestResult<Response> {
        let response = self
            .http
            .execute(request)
            .await
            .map_err(ChangeRequestError::transport)?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Err(rejection(status, &text))
    }
}

/// Builds the error for a non-success response, preferring the API's
/// `message` field over the raw body.
fn rejection(status: StatusCode, body: &str) -> ChangeRequestError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|parsed| parsed.message)
        .ok()
        .or_else(|| Some(body.trim().to_owned()).filter(|text| !text.is_empty()))
        .or_else(|| status.canonical_reason().map(str::to_owned))
        .unwrap_or_default();
    ChangeRequestError::Rejected {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl ChangeRequestClient for GitHubClient {
    #[instrument(skip_all, fields(repository = %request.repository, head = %request.head))]
    async fn open_change_request(
        &self,
        request: &ChangeRequest,
        credentials: &Credentials,
    ) -> ChangeRequestResult<OpenedChangeRequest> {
        let http_request = self.open_request(request, credentials)?;
        let response = self.execute(http_request).await?;
        let created: PullRequestResponse = response
            .json()
            .await
            .map_err(|err| ChangeRequestError::InvalidResponse(err.to_string()))?;
        debug!(url = %created.html_url, "pull request created");
        Ok(OpenedChangeRequest {
            url: created.html_url,
            number: created.number,
        })
    }

    #[instrument(skip_all, fields(%repository, %branch))]
    async fn delete_branch(
        &self,
        repository: &RepositoryRef,
        branch: &BranchName,
        credentials: &Credentials,
    ) -> ChangeRequestResult<()> {
        let http_request = self.delete_request(repository, branch, credentials)?;
        self.execute(http_request).await?;
        debug!("branch deleted");
        Ok(())
    }
}
