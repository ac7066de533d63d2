//! GitHub repository and user lookups.

use super::params::{self, Params};
use super::{endpoint, Tool, ToolDescriptor, ToolError, ToolOutput};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

static DESCRIPTOR: ToolDescriptor = ToolDescriptor {
    name: "github",
    description: "Search GitHub repositories and users, or get details of a specific repository or user",
    parameters: &[
        (
            "query",
            "string - Search terms, 'owner/name' for a repository, or a username (e.g., 'facebook/react', 'torvalds')",
        ),
        (
            "type",
            "string - 'search' to search repositories (default), 'repo' for one repository, 'users' to search users, 'user' for one user",
        ),
    ],
};

const SEARCH_PAGE_SIZE: &str = "5";
const MAX_TOPICS: usize = 5;

/// Which of the four lookups a call asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    SearchRepositories,
    Repository,
    SearchUsers,
    User,
}

impl LookupKind {
    /// Unknown or missing values fall back to repository search.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("repo") | Some("repository") => Self::Repository,
            Some("users") | Some("user_search") | Some("search_users") => Self::SearchUsers,
            Some("user") | Some("profile") => Self::User,
            _ => Self::SearchRepositories,
        }
    }

    fn entity(self) -> &'static str {
        match self {
            Self::SearchRepositories | Self::Repository => "Repository",
            Self::SearchUsers | Self::User => "User",
        }
    }
}

// -- Results -----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GitHubResult {
    RepositorySearch {
        #[serde(rename = "totalCount")]
        total_count: u64,
        repositories: Vec<RepositorySummary>,
    },
    Repository(RepositoryInfo),
    UserSearch {
        #[serde(rename = "totalCount")]
        total_count: u64,
        users: Vec<UserSummary>,
    },
    User(UserInfo),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySummary {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub stars: u64,
    pub language: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInfo {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub language: Option<String>,
    pub url: String,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub login: String,
    pub url: String,
    pub avatar_url: String,
    pub account_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub login: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub public_repos: u64,
    pub followers: u64,
    pub following: u64,
    pub url: String,
    pub avatar_url: String,
    pub created_at: Option<String>,
}

// -- Upstream payloads -------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct SearchPayload<T> {
    total_count: u64,
    #[serde(default)]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RepoPayload {
    name: String,
    full_name: String,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    language: Option<String>,
    html_url: String,
    #[serde(default)]
    topics: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    login: String,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    avatar_url: String,
    #[serde(default, rename = "type")]
    account_type: String,
    name: Option<String>,
    bio: Option<String>,
    company: Option<String>,
    location: Option<String>,
    #[serde(default)]
    public_repos: u64,
    #[serde(default)]
    followers: u64,
    #[serde(default)]
    following: u64,
    created_at: Option<String>,
}

impl From<RepoPayload> for RepositorySummary {
    fn from(r: RepoPayload) -> Self {
        Self {
            name: r.name,
            full_name: r.full_name,
            description: r.description,
            stars: r.stargazers_count,
            language: r.language,
            url: r.html_url,
        }
    }
}

impl From<RepoPayload> for RepositoryInfo {
    fn from(r: RepoPayload) -> Self {
        Self {
            name: r.name,
            full_name: r.full_name,
            description: r.description,
            stars: r.stargazers_count,
            forks: r.forks_count,
            language: r.language,
            url: r.html_url,
            topics: r.topics.into_iter().take(MAX_TOPICS).collect(),
        }
    }
}

impl From<UserPayload> for UserSummary {
    fn from(u: UserPayload) -> Self {
        Self {
            login: u.login,
            url: u.html_url,
            avatar_url: u.avatar_url,
            account_type: u.account_type,
        }
    }
}

impl From<UserPayload> for UserInfo {
    fn from(u: UserPayload) -> Self {
        Self {
            login: u.login,
            name: u.name,
            bio: u.bio,
            company: u.company,
            location: u.location,
            public_repos: u.public_repos,
            followers: u.followers,
            following: u.following,
            url: u.html_url,
            avatar_url: u.avatar_url,
            created_at: u.created_at,
        }
    }
}

/// GitHub REST API tool.
pub struct GitHubTool {
    http: reqwest::Client,
    base_url: String,
    token: String,
    user_agent: String,
}

impl GitHubTool {
    pub fn new(http: reqwest::Client, base_url: &str, token: &str, user_agent: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            token: token.trim().to_string(),
            user_agent: user_agent.to_string(),
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        url: Url,
        kind: LookupKind,
        query: &str,
    ) -> Result<T, ToolError> {
        let mut req = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
            .header(reqwest::header::USER_AGENT, &self.user_agent);
        if !self.token.is_empty() {
            req = req.bearer_auth(&self.token);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ToolError::NotFound(format!(
                "{} \"{}\" not found",
                kind.entity(),
                query
            )));
        }
        if !status.is_success() {
            return Err(ToolError::Upstream(format!(
                "GitHub API request failed ({})",
                status.as_u16()
            )));
        }

        resp.json()
            .await
            .map_err(|e| ToolError::Upstream(format!("Unreadable GitHub response: {}", e)))
    }
}

/// Split `owner/name`, tolerating a pasted github.com URL.
fn split_repository(query: &str) -> Option<(&str, &str)> {
    let trimmed = query
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("github.com/")
        .trim_end_matches('/');
    let (owner, name) = trimmed.split_once('/')?;
    let name = name.trim_end_matches(".git");
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((owner, name))
}

#[async_trait]
impl Tool for GitHubTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &DESCRIPTOR
    }

    async fn execute(&self, params: &Params) -> Result<ToolOutput, ToolError> {
        let query = params::required_string(params, "query")?;
        let kind = LookupKind::parse(params::string(params, "type").as_deref());
        info!("GitHub {:?} lookup for '{}'", kind, query);

        let result = match kind {
            LookupKind::SearchRepositories => {
                let mut url = endpoint(&self.base_url, &["search", "repositories"])?;
                url.query_pairs_mut()
                    .append_pair("q", &query)
                    .append_pair("sort", "stars")
                    .append_pair("order", "desc")
                    .append_pair("per_page", SEARCH_PAGE_SIZE);
                let page: SearchPayload<RepoPayload> = self.fetch(url, kind, &query).await?;
                GitHubResult::RepositorySearch {
                    total_count: page.total_count,
                    repositories: page.items.into_iter().map(Into::into).collect(),
                }
            }
            LookupKind::Repository => {
                let (owner, name) = split_repository(&query).ok_or_else(|| {
                    ToolError::InvalidParams(format!(
                        "Repository lookups need 'owner/name', got \"{}\"",
                        query
                    ))
                })?;
                let url = endpoint(&self.base_url, &["repos", owner, name])?;
                let repo: RepoPayload = self.fetch(url, kind, &query).await?;
                GitHubResult::Repository(repo.into())
            }
            LookupKind::SearchUsers => {
                let mut url = endpoint(&self.base_url, &["search", "users"])?;
                url.query_pairs_mut()
                    .append_pair("q", &query)
                    .append_pair("per_page", SEARCH_PAGE_SIZE);
                let page: SearchPayload<UserPayload> = self.fetch(url, kind, &query).await?;
                GitHubResult::UserSearch {
                    total_count: page.total_count,
                    users: page.items.into_iter().map(Into::into).collect(),
                }
            }
            LookupKind::User => {
                let login = query.trim_start_matches('@');
                let url = endpoint(&self.base_url, &["users", login])?;
                let user: UserPayload = self.fetch(url, kind, &query).await?;
                GitHubResult::User(user.into())
            }
        };

        Ok(ToolOutput::Github(result))
    }
}
