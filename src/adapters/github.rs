//! GitHub adapter
//!
//! Actions:
//! - `github/create_issue` - Open an issue (`repo`, `title`, `body?`, `labels?`)
//! - `github/update_pr` - Change a pull request (`repo`, `pr_number`, `state?`, `body?`)
//! - `github/comment` - Comment on an issue or PR (`repo`, `issue_number`, `body`)
//!
//! Credentials: `github/token`, a personal access token.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

use super::http::ApiClient;
use super::options::{self, invalid, split_repo};
use super::{Adapter, AdapterError, Prompt};
use crate::credentials::CredentialStore;
use crate::workflow::ActionOptions;

const NAME: &str = "github";
const ACTIONS: &[&str] = &["create_issue", "update_pr", "comment"];
const API_URL: &str = "https://api.github.com";

pub struct GitHubAdapter {
    credentials: Arc<CredentialStore>,
    api: ApiClient,
}

impl GitHubAdapter {
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self {
            credentials,
            api: Self::client(API_URL),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api = Self::client(base_url);
        self
    }

    fn client(base_url: impl Into<String>) -> ApiClient {
        ApiClient::new(base_url).with_header("Accept", "application/vnd.github.v3+json")
    }

    fn token(&self) -> Result<String, AdapterError> {
        self.credentials
            .get(NAME, "token")
            .ok_or(AdapterError::NotAuthenticated {
                service: "GitHub",
                adapter: NAME,
            })
    }

    fn request(&self, method: Method, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.api
            .request(method, path)
            .header("Authorization", format!("token {}", token))
    }

    async fn create_issue(&self, options: &ActionOptions) -> Result<(), AdapterError> {
        let (Some(repo), Some(title)) = (
            options::string(options, "repo"),
            options::string(options, "title"),
        ) else {
            return Err(invalid(
                "GitHub create_issue requires \"repo\" and \"title\" options",
            ));
        };

        let token = self.token()?;
        let (owner, name) = split_repo(&repo)?;

        let body = json!({
            "title": title,
            "body": options::string(options, "body").unwrap_or_default(),
            "labels": options::string_list(options, "labels"),
        });
        let request = self
            .request(Method::POST, &format!("repos/{}/{}/issues", owner, name), &token)
            .json(&body);
        let response = self
            .api
            .send_checked(request, "Failed to create GitHub issue")
            .await?;

        let url = response
            .body
            .get("html_url")
            .and_then(Value::as_str)
            .unwrap_or("(no url)");
        info!(repo = %repo, url, "GitHub issue created");
        println!("  [GitHub] Issue created: {}", url);
        Ok(())
    }

    async fn update_pr(&self, options: &ActionOptions) -> Result<(), AdapterError> {
        let (Some(repo), Some(number)) = (
            options::string(options, "repo"),
            options::integer(options, "pr_number"),
        ) else {
            return Err(invalid(
                "GitHub update_pr requires \"repo\" and \"pr_number\" options",
            ));
        };

        let token = self.token()?;
        let (owner, name) = split_repo(&repo)?;

        let mut update = Map::new();
        if let Some(state) = options::string(options, "state") {
            if state != "open" && state != "closed" {
                return Err(invalid("GitHub update_pr \"state\" must be \"open\" or \"closed\""));
            }
            update.insert("state".to_string(), Value::String(state));
        }
        if let Some(body) = options::string(options, "body") {
            update.insert("body".to_string(), Value::String(body));
        }

        let request = self
            .request(
                Method::PATCH,
                &format!("repos/{}/{}/pulls/{}", owner, name, number),
                &token,
            )
            .json(&Value::Object(update));
        self.api
            .send_checked(request, "Failed to update GitHub PR")
            .await?;

        println!("  [GitHub] PR #{} updated", number);
        Ok(())
    }

    async fn comment(&self, options: &ActionOptions) -> Result<(), AdapterError> {
        let (Some(repo), Some(number), Some(body)) = (
            options::string(options, "repo"),
            options::integer(options, "issue_number"),
            options::string(options, "body"),
        ) else {
            return Err(invalid(
                "GitHub comment requires \"repo\", \"issue_number\", and \"body\" options",
            ));
        };

        let token = self.token()?;
        let (owner, name) = split_repo(&repo)?;

        let request = self
            .request(
                Method::POST,
                &format!("repos/{}/{}/issues/{}/comments", owner, name, number),
                &token,
            )
            .json(&json!({ "body": body }));
        self.api
            .send_checked(request, "Failed to add GitHub comment")
            .await?;

        println!("  [GitHub] Comment added to #{}", number);
        Ok(())
    }
}

#[async_trait]
impl Adapter for GitHubAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn actions(&self) -> &'static [&'static str] {
        ACTIONS
    }

    async fn execute(&self, action: &str, options: &ActionOptions) -> Result<(), AdapterError> {
        match action {
            "create_issue" => self.create_issue(options).await,
            "update_pr" => self.update_pr(options).await,
            "comment" => self.comment(options).await,
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
        prompt.say("GitHub Authentication");
        prompt.say("");
        prompt.say("To authenticate with GitHub, you need a Personal Access Token.");
        prompt.say("");
        prompt.say("1. Go to https://github.com/settings/tokens");
        prompt.say("2. Click \"Generate new token (classic)\"");
        prompt.say("3. Select the necessary scopes (repo, workflow, etc.)");
        prompt.say("4. Copy the generated token");
        prompt.say("");

        let token = prompt.ask("Enter your GitHub Personal Access Token: ", true)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(AdapterError::InvalidInput("Token cannot be empty".to_string()));
        }

        self.credentials.save(NAME, "token", token)?;
        Ok(())
    }
}
