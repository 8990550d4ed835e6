//! GitHub REST implementation of [`RemoteRepository`].

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures::TryStreamExt;
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio_util::io::StreamReader;
use tracing::debug;
use url::Url;

use crate::remote::{ByteStream, RemoteError, RemoteRepository, RemoteResult};
use crate::repo::RepoRef;

/// Public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Maximum number of redirects followed when downloading an archive.
const MAX_REDIRECTS: usize = 10;

const DEFAULT_USER_AGENT: &str = concat!("repotar/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";
const SHA_MEDIA_TYPE: &str = "application/vnd.github.sha";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

/// A GitHub API client.
///
/// Holds two `reqwest` clients: API calls never follow redirects so the
/// archive `Location` can be read, while downloads follow a bounded chain.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    api: reqwest::Client,
    download: reqwest::Client,
    api_url: Url,
    token: Option<String>,
}

/// Builder for [`GitHubClient`].
#[derive(Debug, Clone)]
pub struct GitHubClientBuilder {
    api_url: String,
    token: Option<String>,
    timeout: Duration,
    user_agent: String,
}

impl Default for GitHubClientBuilder {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            token: None,
            timeout: crate::fetcher::DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl GitHubClientBuilder {
    /// Override the API base URL (GitHub Enterprise, test servers).
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Authenticate with a bearer token.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Total request timeout, including the response body.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Client`] if the API URL is invalid or the
    /// HTTP clients cannot be built.
    pub fn build(self) -> RemoteResult<GitHubClient> {
        let api_url = Url::parse(&self.api_url).map_err(|e| RemoteError::Client {
            message: format!("invalid API URL '{}': {e}", self.api_url),
        })?;
        if api_url.cannot_be_a_base() {
            return Err(RemoteError::Client {
                message: format!("API URL '{api_url}' cannot be a base URL"),
            });
        }

        let api = self.http_client(reqwest::redirect::Policy::none())?;
        let download = self.http_client(reqwest::redirect::Policy::limited(MAX_REDIRECTS))?;

        Ok(GitHubClient {
            api,
            download,
            api_url,
            token: self.token,
        })
    }

    fn http_client(&self, redirect: reqwest::redirect::Policy) -> RemoteResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .redirect(redirect)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| RemoteError::Client {
                message: format!("failed to build HTTP client: {e}"),
            })
    }
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

impl GitHubClient {
    /// Client with default settings against [`DEFAULT_API_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Client`] if the HTTP clients cannot be built.
    pub fn new() -> RemoteResult<Self> {
        Self::builder().build()
    }

    /// Start configuring a client.
    #[must_use]
    pub fn builder() -> GitHubClientBuilder {
        GitHubClientBuilder::default()
    }

    /// The API base URL in use.
    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn repo_endpoint(&self, repo: &RepoRef, tail: &[&str]) -> RemoteResult<Url> {
        let mut segments = vec!["repos", repo.owner(), repo.name()];
        segments.extend(tail.iter().copied());
        endpoint(&self.api_url, &segments)
    }

    fn get(&self, url: Url) -> RequestBuilder {
        let request = self
            .api
            .get(url)
            .header("X-GitHub-Api-Version", API_VERSION);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl RemoteRepository for GitHubClient {
    async fn resolve_commit(&self, repo: &RepoRef) -> RemoteResult<String> {
        let mut tail = vec!["commits"];
        tail.extend(repo.git_ref().split('/'));
        let url = self.repo_endpoint(repo, &tail)?;
        debug!(url = %url, "resolving commit");

        let context = format!("resolve {repo}");
        let response = send(self.get(url).header(ACCEPT, SHA_MEDIA_TYPE), &context).await?;
        let status = response.status();
        if matches!(status, StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY) {
            return Err(RemoteError::NotFound {
                resource: format!("commit for {repo}"),
            });
        }
        let response = require_success(response, &context)?;

        let body = response.text().await.map_err(|e| RemoteError::Decode {
            message: format!("commit response body: {e}"),
        })?;
        let sha = body.trim();
        if sha.is_empty() || !sha.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(RemoteError::Decode {
                message: format!("'{sha}' is not a commit id"),
            });
        }
        Ok(sha.to_owned())
    }

    async fn file_content(&self, repo: &RepoRef, path: &str) -> RemoteResult<String> {
        let mut tail = vec!["contents"];
        tail.extend(path.split('/').filter(|s| !s.is_empty()));
        let mut url = self.repo_endpoint(repo, &tail)?;
        url.query_pairs_mut().append_pair("ref", repo.git_ref());
        debug!(url = %url, "fetching file content");

        let context = format!("read {path} from {repo}");
        let response = send(self.get(url).header(ACCEPT, JSON_MEDIA_TYPE), &context).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound {
                resource: format!("{path} in {repo}"),
            });
        }
        let response = require_success(response, &context)?;

        let body: ContentResponse = response.json().await.map_err(|e| RemoteError::Decode {
            message: format!("contents response for {path}: {e}"),
        })?;
        decode_contents(body, path)
    }

    async fn archive_link(&self, repo: &RepoRef) -> RemoteResult<Option<Url>> {
        let mut tail = vec!["tarball"];
        tail.extend(repo.git_ref().split('/'));
        let url = self.repo_endpoint(repo, &tail)?;
        debug!(url = %url, "requesting archive link");

        let context = format!("archive link for {repo}");
        let response = send(self.get(url), &context).await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                context,
            });
        }

        let Some(location) = response.headers().get(LOCATION) else {
            return Ok(None);
        };
        let location = location.to_str().map_err(|e| RemoteError::Decode {
            message: format!("archive Location header: {e}"),
        })?;
        let target = response
            .url()
            .join(location)
            .map_err(|e| RemoteError::Decode {
                message: format!("archive Location '{location}': {e}"),
            })?;
        Ok(Some(target))
    }

    async fn download(&self, url: &Url) -> RemoteResult<ByteStream> {
        debug!(host = url.host_str().unwrap_or(""), "downloading archive");
        let context = "download archive".to_owned();
        // The archive URL carries its own short-lived token; the API token
        // is never sent to the archive host.
        let response = send(self.download.get(url.clone()), &context).await?;
        let response = require_success(response, &context)?;

        let body = response.bytes_stream().map_err(io::Error::other);
        Ok(Box::new(StreamReader::new(Box::pin(body))))
    }
}

async fn send(request: RequestBuilder, context: &str) -> RemoteResult<Response> {
    request.send().await.map_err(|e| RemoteError::Transport {
        context: context.to_owned(),
        message: e.to_string(),
    })
}

fn require_success(response: Response, context: &str) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(RemoteError::Status {
            status: status.as_u16(),
            context: context.to_owned(),
        })
    }
}

/// Append path segments to `base`, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> RemoteResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| RemoteError::Client {
            message: format!("API URL '{base}' cannot be a base URL"),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn decode_contents(body: ContentResponse, path: &str) -> RemoteResult<String> {
    if body.kind != "file" {
        return Err(RemoteError::Decode {
            message: format!("{path} is a {}, not a file", body.kind),
        });
    }
    let content = body.content.unwrap_or_default();
    match body.encoding.as_deref() {
        Some("base64") => decode_base64(&content),
        None | Some("utf-8") => Ok(content),
        Some(other) => Err(RemoteError::Decode {
            message: format!("{path} has unsupported encoding '{other}'"),
        }),
    }
}

/// Decode the line-wrapped base64 the contents API returns.
fn decode_base64(encoded: &str) -> RemoteResult<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact).map_err(|e| RemoteError::Decode {
        message: format!("invalid base64 content: {e}"),
    })?;
    String::from_utf8(bytes).map_err(|e| RemoteError::Decode {
        message: format!("content is not UTF-8: {e}"),
    })
}
