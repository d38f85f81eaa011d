//! Linear adapter (GraphQL API)
//!
//! Actions:
//! - `linear/create_issue` - `team`, `title`, `description?`, `priority?`, `assignee?`
//! - `linear/update_issue` - `issue_id`, `state?`, `priority?`, `assignee?`
//! - `linear/add_comment` - `issue_id`, `comment`
//!
//! `team` matches a team key (`ENG`) or name (`Backend`). `state` and
//! `assignee` are Linear IDs. `priority` is `urgent`, `high`, `medium`, `low`,
//! `none` or the numeric value 0-4.
//!
//! Credentials: `linear/api_key`.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use super::http::ApiClient;
use super::options::{self, invalid};
use super::{Adapter, AdapterError, Prompt};
use crate::credentials::CredentialStore;
use crate::workflow::ActionOptions;

const NAME: &str = "linear";
const ACTIONS: &[&str] = &["create_issue", "update_issue", "add_comment"];
const API_URL: &str = "https://api.linear.app";

mod queries {
    pub const TEAMS: &str = "query Teams { teams(first: 250) { nodes { id key name } } }";

    pub const ISSUE_CREATE: &str = r#"mutation IssueCreate($input: IssueCreateInput!) {
        issueCreate(input: $input) { success issue { identifier url } }
    }"#;

    pub const ISSUE_UPDATE: &str = r#"mutation IssueUpdate($id: String!, $input: IssueUpdateInput!) {
        issueUpdate(id: $id, input: $input) { success }
    }"#;

    pub const COMMENT_CREATE: &str = r#"mutation CommentCreate($input: CommentCreateInput!) {
        commentCreate(input: $input) { success }
    }"#;
}

/// Linear priority number for a name or number
fn parse_priority(value: &str) -> Option<u64> {
    match value.trim().to_ascii_lowercase().as_str() {
        "none" | "no priority" => Some(0),
        "urgent" => Some(1),
        "high" => Some(2),
        "medium" | "normal" => Some(3),
        "low" => Some(4),
        other => other.parse().ok().filter(|p| *p <= 4),
    }
}

pub struct LinearAdapter {
    credentials: Arc<CredentialStore>,
    api: ApiClient,
}

impl LinearAdapter {
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self {
            credentials,
            api: ApiClient::new(API_URL),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api = ApiClient::new(base_url);
        self
    }

    fn api_key(&self) -> Result<String, AdapterError> {
        self.credentials
            .get(NAME, "api_key")
            .ok_or(AdapterError::NotAuthenticated {
                service: "Linear",
                adapter: NAME,
            })
    }

    /// Run a GraphQL operation and return its `data`
    async fn graphql(
        &self,
        api_key: &str,
        query: &str,
        variables: Value,
        context: &str,
    ) -> Result<Value, AdapterError> {
        let request = self
            .api
            .request(Method::POST, "graphql")
            .header("Authorization", api_key)
            .json(&json!({ "query": query, "variables": variables }));
        let response = self.api.send_checked(request, context).await?;

        if response.body.get("errors").is_some() {
            return Err(AdapterError::Api(format!(
                "{}: {}",
                context,
                response.error_message()
            )));
        }
        Ok(response.body.get("data").cloned().unwrap_or(Value::Null))
    }

    fn priority(options: &ActionOptions) -> Result<Option<u64>, AdapterError> {
        match options::string(options, "priority") {
            None => Ok(None),
            Some(p) => parse_priority(&p).map(Some).ok_or_else(|| {
                invalid(format!(
                    "Linear priority must be urgent, high, medium, low, none or 0-4 (got \"{}\")",
                    p
                ))
            }),
        }
    }

    async fn resolve_team(&self, api_key: &str, team: &str) -> Result<String, AdapterError> {
        let data = self
            .graphql(api_key, queries::TEAMS, json!({}), "Failed to look up Linear team")
            .await?;

        let teams = data
            .pointer("/teams/nodes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        debug!(count = teams.len(), "Fetched Linear teams");

        teams
            .iter()
            .find(|t| {
                ["key", "name"].iter().any(|field| {
                    t.get(*field)
                        .and_then(Value::as_str)
                        .is_some_and(|v| v.eq_ignore_ascii_case(team))
                })
            })
            .and_then(|t| t.get("id").and_then(Value::as_str))
            .map(str::to_string)
            .ok_or_else(|| AdapterError::Api(format!("Linear team \"{}\" not found", team)))
    }

    async fn create_issue(&self, options: &ActionOptions) -> Result<(), AdapterError> {
        let (Some(team), Some(title)) = (
            options::string(options, "team"),
            options::string(options, "title"),
        ) else {
            return Err(invalid(
                "Linear create_issue requires \"team\" and \"title\" options",
            ));
        };
        let priority = Self::priority(options)?;

        let api_key = self.api_key()?;
        let team_id = self.resolve_team(&api_key, &team).await?;

        let mut input = Map::new();
        input.insert("teamId".into(), Value::String(team_id));
        input.insert("title".into(), Value::String(title.clone()));
        if let Some(description) = options::string(options, "description") {
            input.insert("description".into(), Value::String(description));
        }
        if let Some(priority) = priority {
            input.insert("priority".into(), Value::from(priority));
        }
        if let Some(assignee) = options::string(options, "assignee") {
            input.insert("assigneeId".into(), Value::String(assignee));
        }

        let data = self
            .graphql(
                &api_key,
                queries::ISSUE_CREATE,
                json!({ "input": input }),
                "Failed to create Linear issue",
            )
            .await?;

        let identifier = data
            .pointer("/issueCreate/issue/identifier")
            .and_then(Value::as_str)
            .unwrap_or("issue");
        info!(team = %team, identifier, "Linear issue created");
        println!("  [Linear] Created {}: {}", identifier, title);
        Ok(())
    }

    async fn update_issue(&self, options: &ActionOptions) -> Result<(), AdapterError> {
        let Some(issue_id) = options::string(options, "issue_id") else {
            return Err(invalid("Linear update_issue requires \"issue_id\" option"));
        };
        let priority = Self::priority(options)?;

        let mut input = Map::new();
        if let Some(state) = options::string(options, "state") {
            input.insert("stateId".into(), Value::String(state));
        }
        if let Some(priority) = priority {
            input.insert("priority".into(), Value::from(priority));
        }
        if let Some(assignee) = options::string(options, "assignee") {
            input.insert("assigneeId".into(), Value::String(assignee));
        }
        if input.is_empty() {
            return Err(invalid(
                "Linear update_issue requires at least one of \"state\", \"priority\" or \"assignee\"",
            ));
        }

        let api_key = self.api_key()?;
        self.graphql(
            &api_key,
            queries::ISSUE_UPDATE,
            json!({ "id": issue_id, "input": input }),
            "Failed to update Linear issue",
        )
        .await?;

        println!("  [Linear] Updated issue {}", issue_id);
        Ok(())
    }

    async fn add_comment(&self, options: &ActionOptions) -> Result<(), AdapterError> {
        let (Some(issue_id), Some(comment)) = (
            options::string(options, "issue_id"),
            options::string(options, "comment"),
        ) else {
            return Err(invalid(
                "Linear add_comment requires \"issue_id\" and \"comment\" options",
            ));
        };

        let api_key = self.api_key()?;
        self.graphql(
            &api_key,
            queries::COMMENT_CREATE,
            json!({ "input": { "issueId": issue_id, "body": comment } }),
            "Failed to add Linear comment",
        )
        .await?;

        println!("  [Linear] Commented on issue {}", issue_id);
        Ok(())
    }
}

#[async_trait]
impl Adapter for LinearAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn actions(&self) -> &'static [&'static str] {
        ACTIONS
    }

    async fn execute(&self, action: &str, options: &ActionOptions) -> Result<(), AdapterError> {
        match action {
            "create_issue" => self.create_issue(options).await,
            "update_issue" => self.update_issue(options).await,
            "add_comment" => self.add_comment(options).await,
            _ => Err(AdapterError::UnknownAction {
                adapter: NAME,
                action: action.to_string(),
            }),
        }
    }

    fn supports_authentication(&self) -> bool {
        true
    }

    async fn authenticate(&self, prompt: &mut dyn Prompt) -> Result<(), AdapterError> {
        prompt.say("Linear Authentication");
        prompt.say("");
        prompt.say("To authenticate with Linear, you need an API key.");
        prompt.say("");
        prompt.say("1. Go to https://linear.app/settings/api");
        prompt.say("2. Create a new personal API key");
        prompt.say("3. Copy the generated key");
        prompt.say("");

        let api_key = prompt.ask("Enter your Linear API Key: ", true)?;
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(AdapterError::InvalidInput("API key cannot be empty".to_string()));
        }

        self.credentials.save(NAME, "api_key", api_key)?;
        Ok(())
    }
}
