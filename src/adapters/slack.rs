//! Slack adapter
//!
//! Actions:
//! - `slack/notify` - Post a message to a channel
//! - `slack/upload_file` - Upload a file to a channel
//!
//! Example:
//! ```yaml
//! - name: Notify team
//!   adapter: slack
//!   action: notify
//!   options:
//!     channel: "#deployments"
//!     message: "Deployment completed"
//! ```
//!
//! Credentials: `slack/token`, a Bot User OAuth Token (`xoxb-...`).

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::http::ApiClient;
use super::options::{self, invalid};
use super::{Adapter, AdapterError, Prompt};
use crate::credentials::CredentialStore;
use crate::workflow::ActionOptions;

const NAME: &str = "slack";
const ACTIONS: &[&str] = &["notify", "upload_file"];
const API_URL: &str = "https://slack.com/api";

pub struct SlackAdapter {
    credentials: Arc<CredentialStore>,
    api: ApiClient,
}

impl SlackAdapter {
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

    fn token(&self) -> Result<String, AdapterError> {
        self.credentials
            .get(NAME, "token")
            .ok_or(AdapterError::NotAuthenticated {
                service: "Slack",
                adapter: NAME,
            })
    }

    /// Slack answers HTTP 200 with `{"ok": false, "error": ...}` on failure
    async fn call(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<Value, AdapterError> {
        let response = self.api.send_checked(request, context).await?;
        if response.body.get("ok").and_then(Value::as_bool) == Some(true) {
            return Ok(response.body);
        }
        let reason = response
            .body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        Err(AdapterError::Api(format!("{}: {}", context, reason)))
    }

    /// `files.completeUploadExternal` only takes channel IDs, so `#name`
    /// is looked up among the channels the bot can see
    async fn channel_id(&self, token: &str, channel: &str) -> Result<String, AdapterError> {
        if is_channel_id(channel) {
            return Ok(channel.to_string());
        }
        let name = channel.trim_start_matches('#');

        let mut cursor = String::new();
        loop {
            let request = {
                let mut query = vec![
                    ("types", "public_channel,private_channel"),
                    ("exclude_archived", "true"),
                    ("limit", "200"),
                ];
                if !cursor.is_empty() {
                    query.push(("cursor", cursor.as_str()));
                }
                self.api
                    .request(Method::GET, "conversations.list")
                    .bearer_auth(token)
                    .query(&query)
            };
            let page = self
                .call(request, "Failed to look up Slack channel")
                .await?;

            let found = page
                .get("channels")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .find(|c| c.get("name").and_then(Value::as_str) == Some(name))
                .and_then(|c| c.get("id").and_then(Value::as_str));
            if let Some(id) = found {
                return Ok(id.to_string());
            }

            cursor = page
                .pointer("/response_metadata/next_cursor")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if cursor.is_empty() {
                return Err(AdapterError::Api(format!(
                    "Slack channel \"{}\" not found",
                    channel
                )));
            }
        }
    }

    async fn notify(&self, options: &ActionOptions) -> Result<(), AdapterError> {
        let (Some(channel), Some(message)) = (
            options::string(options, "channel"),
            options::string(options, "message"),
        ) else {
            return Err(invalid(
                "Slack notify requires \"channel\" and \"message\" options",
            ));
        };

        let token = self.token()?;

        let request = self
            .api
            .request(Method::POST, "chat.postMessage")
            .bearer_auth(&token)
            .json(&json!({ "channel": channel, "text": message }));
        self.call(request, "Failed to send Slack message").await?;

        info!(channel = %channel, "Slack message sent");
        println!("  [Slack] Sent to {}", channel);
        Ok(())
    }

    async fn upload_file(&self, options: &ActionOptions) -> Result<(), AdapterError> {
        let (Some(channel), Some(file)) = (
            options::string(options, "channel"),
            options::string(options, "file"),
        ) else {
            return Err(invalid(
                "Slack upload_file requires \"channel\" and \"file\" options",
            ));
        };
        let comment = options::string(options, "comment");

        let token = self.token()?;

        let contents = tokio::fs::read(&file).await?;
        let channel_id = self.channel_id(&token, &channel).await?;
        let file_name = Path::new(&file)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file.as_str())
            .to_string();

        // 1. reserve an upload URL
        let length = contents.len().to_string();
        let request = self
            .api
            .request(Method::POST, "files.getUploadURLExternal")
            .bearer_auth(&token)
            .form(&[("filename", file_name.as_str()), ("length", length.as_str())]);
        let reserved = self
            .call(request, "Failed to upload file to Slack")
            .await?;
        let (Some(upload_url), Some(file_id)) = (
            reserved.get("upload_url").and_then(Value::as_str),
            reserved.get("file_id").and_then(Value::as_str),
        ) else {
            return Err(AdapterError::Api(
                "Failed to upload file to Slack: malformed response".to_string(),
            ));
        };

        // 2. send the bytes
        let upload = self.api.request_url(Method::POST, upload_url).body(contents);
        let response = self.api.send(upload).await?;
        if !response.is_success() {
            return Err(AdapterError::Api(format!(
                "Failed to upload file to Slack: HTTP {}",
                response.status
            )));
        }

        // 3. share it in the channel
        let mut complete = json!({
            "files": [{ "id": file_id, "title": file_name }],
            "channel_id": channel_id,
        });
        if let Some(comment) = &comment {
            complete["initial_comment"] = Value::String(comment.clone());
        }
        let request = self
            .api
            .request(Method::POST, "files.completeUploadExternal")
            .bearer_auth(&token)
            .json(&complete);
        self.call(request, "Failed to upload file to Slack").await?;

        println!("  [Slack] Uploaded {} to {}", file, channel);
        Ok(())
    }
}

/// Conversation IDs look like `C024BE91L` (channels), `G...` (private) or `D...` (DMs)
fn is_channel_id(channel: &str) -> bool {
    channel.len() >= 9
        && channel.starts_with(['C', 'G', 'D'])
        && channel
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

#[async_trait]
impl Adapter for SlackAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn actions(&self) -> &'static [&'static str] {
        ACTIONS
    }

    async fn execute(&self, action: &str, options: &ActionOptions) -> Result<(), AdapterError> {
        match action {
            "notify" => self.notify(options).await,
            "upload_file" => self.upload_file(options).await,
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
        prompt.say("Slack Authentication");
        prompt.say("");
        prompt.say("To authenticate with Slack, you need a Bot User OAuth Token.");
        prompt.say("");
        prompt.say("1. Go to https://api.slack.com/apps");
        prompt.say("2. Create a new app or select an existing one");
        prompt.say("3. Go to \"OAuth & Permissions\"");
        prompt.say("4. Copy the \"Bot User OAuth Token\" (starts with xoxb-)");
        prompt.say("");

        let token = prompt.ask("Enter your Slack Bot Token: ", true)?;
        let token = token.trim();

        if !token.starts_with("xoxb-") {
            return Err(AdapterError::InvalidInput(
                "Invalid token format. Slack bot tokens should start with \"xoxb-\"".to_string(),
            ));
        }

        self.credentials.save(NAME, "token", token)?;
        Ok(())
    }
}
