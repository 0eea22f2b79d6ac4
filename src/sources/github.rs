use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract;
use crate::review::{Review, sort_newest_first};

use super::{ReviewSource, SourceKind};

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;
const ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Deserialize)]
struct GhLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhIssue {
    id: u64,
    number: u64,
    title: String,
    body: Option<String>,
    #[serde(default)]
    labels: Vec<GhLabel>,
    created_at: DateTime<Utc>,
    state: String,
    html_url: String,
    #[serde(default)]
    comments: u32,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

/// Abstraction over HTTP GET for testability.
pub trait HttpClient {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<String>;
}

/// Blocking `ureq` client with retry and exponential backoff on transient
/// failures.
pub struct DefaultHttpClient;

impl HttpClient for DefaultHttpClient {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<String> {
        let mut backoff_ms = INITIAL_BACKOFF_MS;
        for attempt in 1..=MAX_RETRIES {
            let mut request = ureq::get(url);
            for (name, value) in headers {
                request = request.set(name, value);
            }
            match request.call() {
                Ok(response) => {
                    return response
                        .into_string()
                        .map_err(|e| Error::Network(format!("failed to read response: {e}")));
                }
                Err(ref e) if attempt < MAX_RETRIES && is_retryable(e) => {
                    warn!(attempt, error = %e, backoff_ms, "retrying GitHub API after transient error");
                    thread::sleep(Duration::from_millis(backoff_ms));
                    backoff_ms *= 2;
                }
                Err(ureq::Error::Status(code, _)) => {
                    return Err(Error::Network(format!("GitHub API error: {code}")));
                }
                Err(e) => {
                    return Err(Error::Network(format!("GitHub API request failed: {e}")));
                }
            }
        }
        unreachable!()
    }
}

/// Only retry rate-limits (429), server errors (5xx), and transport errors.
fn is_retryable(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::Status(code, _) => *code == 429 || *code >= 500,
        ureq::Error::Transport(_) => true,
    }
}

/// Read the optional API token from the named environment variable.
pub fn resolve_token(token_env: &str) -> Option<String> {
    std::env::var(token_env).ok().filter(|t| !t.trim().is_empty())
}

/// Reviews scraped from labelled GitHub issues. Read-only and unauthenticated
/// unless a token is present.
pub struct GitHubSource {
    api_base: String,
    owner: String,
    repo: String,
    label: String,
    moderator_label: String,
    token: Option<String>,
    client: Box<dyn HttpClient>,
}

impl GitHubSource {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_client(config, Box::new(DefaultHttpClient))
    }

    pub fn with_client(config: &Config, client: Box<dyn HttpClient>) -> Result<Self> {
        let (owner, repo) = config.repository()?;
        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            label: config.label.clone(),
            moderator_label: config.moderator_label.clone(),
            token: resolve_token(&config.token_env),
            client,
        })
    }

    pub fn issues_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues?labels={}&state=all&per_page=100",
            self.api_base,
            self.owner,
            self.repo,
            urlencoding::encode(&self.label)
        )
    }

    fn parse_issue(&self, gh: GhIssue) -> Review {
        let labels: Vec<String> = gh.labels.into_iter().map(|l| l.name).collect();
        let body = gh.body.unwrap_or_default();
        let fields = extract::extract(&gh.title, &body, &labels);
        Review {
            id: gh.id.to_string(),
            issue_number: Some(gh.number),
            name: fields.name,
            email: fields.email,
            tour: fields.tour,
            content: fields.content,
            rating: fields.rating,
            created_at: gh.created_at,
            approved: labels.iter().any(|l| l == &self.moderator_label),
            verified: gh.state.eq_ignore_ascii_case("closed"),
            pending: false,
            source_url: Some(gh.html_url),
            comments: gh.comments,
            labels,
        }
    }
}

impl ReviewSource for GitHubSource {
    fn fetch_reviews(&self) -> Result<Vec<Review>> {
        let url = self.issues_url();
        let auth = self.token.as_ref().map(|t| format!("Bearer {t}"));
        let mut headers = vec![("Accept", ACCEPT)];
        if let Some(ref auth) = auth {
            headers.push(("Authorization", auth.as_str()));
        }

        debug!(%url, authenticated = auth.is_some(), "fetching review issues");
        let json = self.client.get(&url, &headers)?;
        let issues: Vec<GhIssue> = serde_json::from_str(&json)
            .map_err(|e| Error::Network(format!("unexpected GitHub response: {e}")))?;

        let mut reviews: Vec<Review> = issues
            .into_iter()
            .filter(|issue| issue.pull_request.is_none())
            .map(|issue| self.parse_issue(issue))
            .collect();
        sort_newest_first(&mut reviews);

        debug!(count = reviews.len(), "fetched remote reviews");
        Ok(reviews)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Remote
    }
}
