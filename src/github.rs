//! GitHub push webhook adaptation.
//!
//! Translates the subset of a GitHub `push` payload the framework needs into its
//! `OnPush` event shape. Tag pushes are not branch pushes and are rejected.

use crate::error::InvokeError;
use crate::invocation::Target;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const BRANCH_PREFIX: &str = "refs/heads/";
const TAG_PREFIX: &str = "refs/tags/";
const PROVIDER_ID: &str = "github";
const API_URL: &str = "https://api.github.com/";

#[derive(Debug, Clone, Deserialize)]
pub struct PushPayload {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub before: String,
    pub after: String,
    pub repository: PushRepository,
    #[serde(default)]
    pub head_commit: Option<PushCommit>,
    #[serde(default)]
    pub commits: Vec<PushCommit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushRepository {
    pub name: String,
    pub owner: PushOwner,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// GitHub sends `login` for users and `name` for organisations in push payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct PushOwner {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushCommit {
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<CommitAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// The framework's push event, ready to post to `{base}/event`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushEvent(pub Value);

impl PushEvent {
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Translate a GitHub push into an `OnPush` event for `workspace`.
pub fn translate_push(
    payload: &PushPayload,
    workspace: &Target,
    correlation_id: &str,
) -> Result<PushEvent, InvokeError> {
    if payload.git_ref.starts_with(TAG_PREFIX) {
        return Err(InvokeError::Configuration(format!(
            "Push of tag {} is not a branch push",
            payload.git_ref
        )));
    }
    let branch = payload
        .git_ref
        .strip_prefix(BRANCH_PREFIX)
        .unwrap_or(&payload.git_ref);

    let owner = payload
        .repository
        .owner
        .login
        .clone()
        .or_else(|| payload.repository.owner.name.clone())
        .ok_or_else(|| {
            InvokeError::Configuration("Push payload has no repository owner".to_string())
        })?;

    let head = payload.head_commit.as_ref();
    let author_login = head
        .and_then(|c| c.author.as_ref())
        .map(|a| a.username.clone().unwrap_or_else(|| a.name.clone()))
        .unwrap_or_default();

    let commits: Vec<Value> = payload
        .commits
        .iter()
        .map(|commit| json!({ "sha": commit.id, "message": commit.message }))
        .collect();

    let push = json!({
        "branch": branch,
        "before": { "sha": payload.before },
        "after": {
            "sha": payload.after,
            "message": head.map(|c| c.message.clone()).unwrap_or_default(),
            "author": { "login": author_login },
        },
        "repo": {
            "owner": owner,
            "name": payload.repository.name,
            "org": {
                "owner": owner,
                "provider": { "providerId": PROVIDER_ID, "apiUrl": API_URL },
            },
        },
        "commits": commits,
    });

    Ok(PushEvent(json!({
        "data": { "Push": [push] },
        "extensions": {
            "operationName": "OnPush",
            "team_id": workspace.id,
            "team_name": workspace.name,
            "correlation_id": correlation_id,
        },
    })))
}
