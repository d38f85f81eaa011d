//! Notion adapter
//!
//! Actions:
//! - `notion/create_page` - `parent_id`, `title`, `content?`
//! - `notion/append_to_page` - `page_id`, and `content` or `content_file`
//! - `notion/update_database` - `database_id`, `properties` (adds a row)
//!
//! Content is split into one paragraph block per blank-line separated chunk.
//!
//! Credentials: `notion/token`, an internal integration token.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;

use super::http::ApiClient;
use super::options::{self, invalid};
use super::{Adapter, AdapterError, Prompt};
use crate::credentials::CredentialStore;
use crate::workflow::ActionOptions;

const NAME: &str = "notion";
const ACTIONS: &[&str] = &["create_page", "append_to_page", "update_database"];
const API_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

// Notion rejects rich text objects longer than this
const MAX_TEXT_LEN: usize = 2000;

fn paragraphs(content: &str) -> Vec<Value> {
    content
        .split("\n\n")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .flat_map(|chunk| {
            let chars: Vec<char> = chunk.chars().collect();
            chars
                .chunks(MAX_TEXT_LEN)
                .map(|piece| piece.iter().collect::<String>())
                .collect::<Vec<_>>()
        })
        .map(|text| {
            json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": { "rich_text": [{ "type": "text", "text": { "content": text } }] }
            })
        })
        .collect()
}

enum ContentSource {
    Inline(String),
    File(String),
}

pub struct NotionAdapter {
    credentials: Arc<CredentialStore>,
    api: ApiClient,
}

impl NotionAdapter {
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
        ApiClient::new(base_url).with_header("Notion-Version", NOTION_VERSION)
    }

    fn token(&self) -> Result<String, AdapterError> {
        self.credentials
            .get(NAME, "token")
            .ok_or(AdapterError::NotAuthenticated {
                service: "Notion",
                adapter: NAME,
            })
    }

    async fn create_page(&self, options: &ActionOptions) -> Result<(), AdapterError> {
        let (Some(parent_id), Some(title)) = (
            options::string(options, "parent_id"),
            options::string(options, "title"),
        ) else {
            return Err(invalid(
                "Notion create_page requires \"parent_id\" and \"title\" options",
            ));
        };

        let token = self.token()?;

        let children = options::string(options, "content")
            .map(|c| paragraphs(&c))
            .unwrap_or_default();
        let page = json!({
            "parent": { "page_id": parent_id },
            "properties": {
                "title": { "title": [{ "type": "text", "text": { "content": title } }] }
            },
            "children": children,
        });

        let request = self
            .api
            .request(Method::POST, "pages")
            .bearer_auth(&token)
            .json(&page);
        let response = self
            .api
            .send_checked(request, "Failed to create Notion page")
            .await?;

        let url = response
            .body
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or(parent_id.as_str());
        println!("  [Notion] Created page \"{}\": {}", title, url);
        Ok(())
    }

    async fn append_to_page(&self, options: &ActionOptions) -> Result<(), AdapterError> {
        let source = options::string(options, "content")
            .map(ContentSource::Inline)
            .or_else(|| options::string(options, "content_file").map(ContentSource::File));

        let (Some(page_id), Some(source)) = (options::string(options, "page_id"), source) else {
            return Err(invalid(
                "Notion append_to_page requires \"page_id\" and either \"content\" or \"content_file\"",
            ));
        };

        let token = self.token()?;

        let content = match source {
            ContentSource::Inline(content) => content,
            ContentSource::File(path) => tokio::fs::read_to_string(&path).await?,
        };

        let request = self
            .api
            .request(Method::PATCH, &format!("blocks/{}/children", page_id))
            .bearer_auth(&token)
            .json(&json!({ "children": paragraphs(&content) }));
        self.api
            .send_checked(request, "Failed to append to Notion page")
            .await?;

        println!("  [Notion] Appended to page {}", page_id);
        Ok(())
    }

    async fn update_database(&self, options: &ActionOptions) -> Result<(), AdapterError> {
        let database_id = options::string(options, "database_id");
        let properties = options::value(options, "properties").filter(|v| v.is_object());

        let (Some(database_id), Some(properties)) = (database_id, properties) else {
            return Err(invalid(
                "Notion update_database requires \"database_id\" and \"properties\" options",
            ));
        };

        let token = self.token()?;

        let request = self
            .api
            .request(Method::POST, "pages")
            .bearer_auth(&token)
            .json(&json!({
                "parent": { "database_id": database_id },
                "properties": properties,
            }));
        self.api
            .send_checked(request, "Failed to update Notion database")
            .await?;

        println!("  [Notion] Added row to database {}", database_id);
        Ok(())
    }
}

#[async_trait]
impl Adapter for NotionAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn actions(&self) -> &'static [&'static str] {
        ACTIONS
    }

    async fn execute(&self, action: &str, options: &ActionOptions) -> Result<(), AdapterError> {
        match action {
            "create_page" => self.create_page(options).await,
            "append_to_page" => self.append_to_page(options).await,
            "update_database" => self.update_database(options).await,
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
        prompt.say("Notion Authentication");
        prompt.say("");
        prompt.say("To authenticate with Notion, you need an Integration Token.");
        prompt.say("");
        prompt.say("1. Go to https://www.notion.so/my-integrations");
        prompt.say("2. Create a new integration");
        prompt.say("3. Copy the \"Internal Integration Token\"");
        prompt.say("4. Share the pages/databases with your integration");
        prompt.say("");

        let token = prompt.ask("Enter your Notion Integration Token: ", true)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(AdapterError::InvalidInput("Token cannot be empty".to_string()));
        }

        self.credentials.save(NAME, "token", token)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::{options, store, StubServer};

    async fn connected(dir: &tempfile::TempDir) -> (NotionAdapter, StubServer) {
        let server = StubServer::start().await;
        let credentials = store(dir);
        credentials.save("notion", "token", "secret_test").unwrap();
        let adapter = NotionAdapter::new(credentials).with_base_url(server.base_url());
        (adapter, server)
    }

    #[test]
    fn test_paragraphs() {
        let blocks = paragraphs("First paragraph.\n\n\n\nSecond one.\n");
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[1].pointer("/paragraph/rich_text/0/text/content"),
            Some(&json!("Second one."))
        );

        let long = "x".repeat(MAX_TEXT_LEN + 10);
        assert_eq!(paragraphs(&long).len(), 2);
        assert!(paragraphs("  \n\n ").is_empty());
    }

    #[tokio::test]
    async fn test_append_requires_content() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = NotionAdapter::new(store(&dir));

        let err = adapter
            .execute("append_to_page", &options(json!({ "page_id": "abc" })))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("either \"content\" or \"content_file\""));
    }

    #[tokio::test]
    async fn test_update_database_requires_object_properties() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = NotionAdapter::new(store(&dir));

        let err = adapter
            .execute(
                "update_database",
                &options(json!({ "database_id": "db", "properties": "Status=Done" })),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::InvalidOptions(_)));

        let err = adapter
            .execute(
                "update_database",
                &options(json!({ "database_id": "db", "properties": { "Status": {} } })),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Notion not authenticated. Run: glue auth notion"
        );
    }

    #[tokio::test]
    async fn test_create_page_under_parent() {
        let dir = tempfile::tempdir().unwrap();
        let (adapter, server) = connected(&dir).await;
        server.reply(
            200,
            json!({ "object": "page", "url": "https://www.notion.so/Release-notes-abc" }),
        );

        adapter
            .execute(
                "create_page",
                &options(json!({
                    "parent_id": "parent-123",
                    "title": "Release notes",
                    "content": "Shipped v2\n\nNo incidents"
                })),
            )
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/pages");
        assert_eq!(requests[0].header("notion-version"), Some(NOTION_VERSION));
        assert_eq!(requests[0].header("authorization"), Some("Bearer secret_test"));

        let page = requests[0].json();
        assert_eq!(page["parent"], json!({ "page_id": "parent-123" }));
        assert_eq!(
            page["properties"]["title"]["title"][0]["text"]["content"],
            "Release notes"
        );
        assert_eq!(page["children"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_api_error_message() {
        let dir = tempfile::tempdir().unwrap();
        let (adapter, server) = connected(&dir).await;
        server.reply(
            400,
            json!({
                "object": "error",
                "code": "validation_error",
                "message": "body failed validation"
            }),
        );

        let err = adapter
            .execute(
                "append_to_page",
                &options(json!({ "page_id": "page-9", "content": "hello" })),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to append to Notion page: body failed validation"
        );

        let requests = server.requests();
        assert_eq!(requests[0].method, "PATCH");
        assert_eq!(requests[0].path, "/blocks/page-9/children");
    }
}
