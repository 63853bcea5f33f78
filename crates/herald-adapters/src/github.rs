//! GitHub issue tracker adapter.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use herald_models::{Checkpoint, Item, SortKey};

use crate::error::SourceError;
use crate::http::get_json;
use crate::text::{truncate, DESCRIPTION_LIMIT};
use crate::traits::{timestamp_position, AdapterInfo, SourceAdapter};

/// Public GitHub API.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const PER_PAGE: usize = 100;
const MAX_PAGES: usize = 5;

/// How far behind the fetch time an idle checkpoint is placed. GitHub's
/// listing is eventually consistent, so an issue created just before the
/// fetch may not be visible yet.
const IDLE_LAG_SECS: i64 = 60;

/// An issue (or pull request) as returned by the issues API.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubIssue {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<GithubUser>,
    pub created_at: DateTime<Utc>,
    /// Present only on pull requests.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
    #[serde(default)]
    pub labels: Vec<GithubLabel>,
}

/// Issue author.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubUser {
    pub login: String,
}

/// Issue label.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubLabel {
    pub name: String,
}

/// Reports issues opened in a repository since the checkpoint.
pub struct GithubIssuesAdapter {
    info: AdapterInfo,
    client: Client,
    api_base: String,
    owner: String,
    repo: String,
    token: Option<String>,
    include_pull_requests: bool,
}

impl GithubIssuesAdapter {
    /// Creates an adapter for `owner/repo` against the public API.
    pub fn new(client: Client, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        let owner = owner.into();
        let repo = repo.into();
        Self {
            info: AdapterInfo {
                id: "github_issues".to_string(),
                description: format!("issues of {}/{}", owner, repo),
            },
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            owner,
            repo,
            token: None,
            include_pull_requests: false,
        }
    }

    /// Authenticates requests with a token (raises the rate limit, allows private repos).
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Points the adapter at another API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Also report pull requests.
    pub fn including_pull_requests(mut self, include: bool) -> Self {
        self.include_pull_requests = include;
        self
    }

    /// Issues listing endpoint.
    pub fn issues_url(&self) -> String {
        format!("{}/repos/{}/{}/issues", self.api_base, self.owner, self.repo)
    }

    /// Converts API issues into items created strictly after `after`.
    pub fn to_items(&self, issues: Vec<GithubIssue>, after: DateTime<Utc>) -> Vec<Item> {
        issues
            .into_iter()
            .filter(|issue| issue.created_at > after)
            .filter(|issue| self.include_pull_requests || issue.pull_request.is_none())
            .map(|issue| self.to_item(issue))
            .collect()
    }

    fn to_item(&self, issue: GithubIssue) -> Item {
        let kind = if issue.pull_request.is_some() {
            "pull request"
        } else {
            "issue"
        };
        let labels: Vec<&str> = issue.labels.iter().map(|l| l.name.as_str()).collect();
        let mut payload = json!({
            "title": format!("#{} {}", issue.number, issue.title),
            "url": issue.html_url,
            "timestamp": issue.created_at.to_rfc3339(),
            "footer": format!("{}/{} · new {}", self.owner, self.repo, kind),
        });
        if let Some(body) = issue.body.as_deref().filter(|b| !b.trim().is_empty()) {
            payload["description"] = json!(truncate(body, DESCRIPTION_LIMIT));
        }
        if let Some(user) = &issue.user {
            payload["author"] = json!(user.login);
        }
        if !labels.is_empty() {
            payload["labels"] = json!(labels);
        }

        Item::new(
            format!("{}/{}#{}", self.owner, self.repo, issue.number),
            SortKey::Timestamp(issue.created_at),
            payload,
        )
    }
}

#[async_trait]
impl SourceAdapter for GithubIssuesAdapter {
    fn info(&self) -> &AdapterInfo {
        &self.info
    }

    async fn fetch_since(&self, checkpoint: &Checkpoint) -> Result<Vec<Item>, SourceError> {
        let since = timestamp_position(checkpoint)?;
        let context = format!("github {}/{}", self.owner, self.repo);
        let mut issues = Vec::new();
        let mut truncated = false;

        // Oldest first: when the page limit cuts the listing short, what is
        // returned is a prefix and the rest follows on the next tick.
        for page in 1..=MAX_PAGES {
            let query = [
                ("state", "all".to_string()),
                ("sort", "created".to_string()),
                ("direction", "asc".to_string()),
                ("since", since.to_rfc3339()),
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ];
            let mut request = self
                .client
                .get(self.issues_url())
                .query(&query)
                .header(ACCEPT, "application/vnd.github+json");
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let batch: Vec<GithubIssue> = get_json(request, &context).await?;
            let full = batch.len() == PER_PAGE;
            issues.extend(batch);

            if !full {
                break;
            }
            truncated = page == MAX_PAGES;
        }

        let mut items = self.to_items(issues, since);
        if truncated {
            items = hold_back_newest(items).ok_or_else(|| {
                SourceError::transient(format!(
                    "{}: more than {} issues changed since {}, none of them new",
                    context,
                    PER_PAGE * MAX_PAGES,
                    since.to_rfc3339()
                ))
            })?;
        }
        debug!(
            repo = %format!("{}/{}", self.owner, self.repo),
            count = items.len(),
            truncated,
            "fetched github issues"
        );
        Ok(items)
    }

    fn idle_position(&self, fetched_at: DateTime<Utc>) -> Option<SortKey> {
        Some(SortKey::Timestamp(fetched_at - Duration::seconds(IDLE_LAG_SECS)))
    }
}

/// Drops the items sharing the newest sort key of a truncated listing,
/// since more issues created at that instant may sit on the next page.
/// Returns `None` when nothing is left to deliver.
fn hold_back_newest(mut items: Vec<Item>) -> Option<Vec<Item>> {
    let newest = items.iter().map(|item| item.sort_key.clone()).max()?;
    items.retain(|item| item.sort_key < newest);
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};
    use chrono::TimeZone;

    fn adapter() -> GithubIssuesAdapter {
        GithubIssuesAdapter::new(Client::new(), "acme", "bot")
    }

    fn issues() -> Vec<GithubIssue> {
        serde_json::from_str(
            r#"[
                {
                    "number": 12,
                    "title": "Bot crashes on /patch",
                    "html_url": "https://github.com/acme/bot/issues/12",
                    "body": "Steps to reproduce...",
                    "user": { "login": "alice" },
                    "created_at": "2024-03-10T12:00:00Z",
                    "labels": [{ "name": "bug" }]
                },
                {
                    "number": 11,
                    "title": "Add dota cog",
                    "html_url": "https://github.com/acme/bot/pull/11",
                    "body": null,
                    "user": { "login": "bob" },
                    "created_at": "2024-03-10T11:00:00Z",
                    "pull_request": { "url": "https://api.github.com/repos/acme/bot/pulls/11" }
                },
                {
                    "number": 3,
                    "title": "Old issue with fresh comment",
                    "html_url": "https://github.com/acme/bot/issues/3",
                    "created_at": "2023-01-01T00:00:00Z"
                }
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_to_items_filters_old_issues_and_pull_requests() {
        let after = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let items = adapter().to_items(issues(), after);

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.source_id.as_str(), "acme/bot#12");
        assert_eq!(
            item.sort_key,
            SortKey::Timestamp(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap())
        );
        assert_eq!(item.payload["title"], "#12 Bot crashes on /patch");
        assert_eq!(item.payload["author"], "alice");
        assert_eq!(item.payload["labels"][0], "bug");
        assert_eq!(item.payload["footer"], "acme/bot · new issue");
    }

    #[test]
    fn test_to_items_can_include_pull_requests() {
        let after = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let items = adapter().including_pull_requests(true).to_items(issues(), after);

        assert_eq!(items.len(), 2);
        let pr = items.iter().find(|i| i.source_id.as_str() == "acme/bot#11").unwrap();
        assert_eq!(pr.payload["footer"], "acme/bot · new pull request");
        assert!(pr.payload.get("description").is_none());
    }

    #[test]
    fn test_issue_exactly_at_checkpoint_is_excluded() {
        let after = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert!(adapter().to_items(issues(), after).is_empty());
    }

    #[test]
    fn test_issues_url_and_api_base() {
        let adapter = adapter().with_api_base("https://ghe.example.com/api/v3/");
        assert_eq!(
            adapter.issues_url(),
            "https://ghe.example.com/api/v3/repos/acme/bot/issues"
        );
        assert_eq!(adapter.info().id, "github_issues");
    }

    #[test]
    fn test_idle_position_lags_fetch_time() {
        let fetched = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(
            adapter().idle_position(fetched),
            Some(SortKey::Timestamp(
                Utc.with_ymd_and_hms(2024, 3, 10, 11, 59, 0).unwrap()
            ))
        );
    }

    /// Serves `count` issues created a minute apart after `start`, filtered
    /// and paged the way the issues API does.
    async fn serve_issues(start: DateTime<Utc>, count: i64) -> String {
        let app = Router::new().route(
            "/repos/acme/bot/issues",
            get(move |Query(query): Query<HashMap<String, String>>| async move {
                let since: DateTime<Utc> = query["since"].parse().unwrap();
                let per_page: usize = query["per_page"].parse().unwrap();
                let page: usize = query["page"].parse().unwrap();

                let mut issues: Vec<serde_json::Value> = (1..=count)
                    .map(|n| (n, start + Duration::minutes(n)))
                    .filter(|(_, created)| *created >= since)
                    .map(|(n, created)| {
                        json!({
                            "number": n,
                            "title": format!("Issue {}", n),
                            "html_url": format!("https://github.com/acme/bot/issues/{}", n),
                            "created_at": created.to_rfc3339(),
                        })
                    })
                    .collect();
                if query["direction"] == "desc" {
                    issues.reverse();
                }
                let page: Vec<serde_json::Value> = issues
                    .into_iter()
                    .skip((page - 1) * per_page)
                    .take(per_page)
                    .collect();
                Json(page)
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_long_backlog_is_fetched_oldest_first_across_ticks() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let adapter = adapter().with_api_base(serve_issues(start, 600).await);

        let checkpoint = Checkpoint::new(SortKey::Timestamp(start), start);
        let first = adapter.fetch_since(&checkpoint).await.unwrap();
        assert_eq!(first.len(), 499);
        assert_eq!(first[0].source_id.as_str(), "acme/bot#1");
        assert_eq!(first[498].source_id.as_str(), "acme/bot#499");

        let checkpoint = Checkpoint::new(first[498].sort_key.clone(), start);
        let second = adapter.fetch_since(&checkpoint).await.unwrap();
        assert_eq!(second.len(), 101);
        assert_eq!(second[0].source_id.as_str(), "acme/bot#500");
        assert_eq!(second[100].source_id.as_str(), "acme/bot#600");
    }

    #[test]
    fn test_hold_back_newest_leaves_ties_for_next_fetch() {
        let at = |minute| {
            SortKey::Timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 0, minute, 0).unwrap())
        };
        let item = |id: &str, key: SortKey| Item::new(id, key, json!({}));

        let kept = hold_back_newest(vec![item("a", at(1)), item("b", at(2)), item("c", at(2))])
            .unwrap();
        let ids: Vec<&str> = kept.iter().map(|i| i.source_id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);

        assert!(hold_back_newest(vec![item("c", at(2))]).is_none());
        assert!(hold_back_newest(Vec::new()).is_none());
    }

    #[tokio::test]
    async fn test_non_timestamp_checkpoint_is_fatal() {
        let cp = Checkpoint::new(SortKey::Sequence(1), Utc::now());
        let result = adapter().fetch_since(&cp).await;
        assert!(matches!(result, Err(SourceError::Fatal(_))));
    }
}
