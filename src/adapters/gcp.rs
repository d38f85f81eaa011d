//! Google Cloud adapter
//!
//! Runs the Cloud SDK command line tools with `GOOGLE_APPLICATION_CREDENTIALS`
//! pointing at the stored service account key.
//!
//! Actions:
//! - `gcp/bq` - BigQuery query (`query` or `query_file`, `dataset?`)
//! - `gcp/gcs_upload` - Copy a file to Cloud Storage (`source`, `bucket`, `destination?`)
//! - `gcp/function_invoke` - Call a Cloud Function (`name`, `data?`, `region?`)
//!
//! Credentials: `gcp/keyfile` (path to the key JSON) and `gcp/project_id`.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{info, warn};

use super::options::{self, invalid};
use super::{Adapter, AdapterError, Prompt};
use crate::credentials::CredentialStore;
use crate::workflow::ActionOptions;

const NAME: &str = "gcp";
const ACTIONS: &[&str] = &["bq", "gcs_upload", "function_invoke"];
const TOOLS: &[&str] = &["bq", "gsutil", "gcloud"];
const DEFAULT_REGION: &str = "us-central1";

struct GcpCredentials {
    keyfile: String,
    project_id: String,
}

pub struct GcpAdapter {
    credentials: Arc<CredentialStore>,
}

impl GcpAdapter {
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self { credentials }
    }

    fn gcp_credentials(&self) -> Result<GcpCredentials, AdapterError> {
        match (
            self.credentials.get(NAME, "keyfile"),
            self.credentials.get(NAME, "project_id"),
        ) {
            (Some(keyfile), Some(project_id)) => Ok(GcpCredentials {
                keyfile,
                project_id,
            }),
            _ => Err(AdapterError::NotAuthenticated {
                service: "GCP",
                adapter: NAME,
            }),
        }
    }

    fn locate(tool: &str) -> Result<PathBuf, AdapterError> {
        which::which(tool).map_err(|_| {
            AdapterError::Api(format!(
                "`{}` not found on PATH. Install the Google Cloud SDK",
                tool
            ))
        })
    }

    /// Run a Cloud SDK tool, failing with `context` and its stderr on non-zero exit
    async fn run_tool(
        &self,
        tool: &str,
        args: &[String],
        credentials: &GcpCredentials,
        context: &str,
    ) -> Result<Output, AdapterError> {
        let program = Self::locate(tool)?;
        info!("Executing {} {}", tool, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .env("GOOGLE_APPLICATION_CREDENTIALS", &credentials.keyfile)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| AdapterError::Api(format!("{}: {}", context, e)))?;

        if output.status.success() {
            return Ok(output);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let reason = if stderr.is_empty() {
            format!(
                "{} exited with code {}",
                tool,
                output.status.code().unwrap_or(-1)
            )
        } else {
            stderr
        };
        Err(AdapterError::Api(format!("{}: {}", context, reason)))
    }

    fn report_warnings(label: &str, output: &Output) {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            warn!("{} stderr: {}", label, stderr);
            println!("  [{}] Warning: {}", label, stderr);
        }
    }

    async fn big_query(&self, options: &ActionOptions) -> Result<(), AdapterError> {
        let query = options::string(options, "query");
        let query_file = options::string(options, "query_file");
        if query.is_none() && query_file.is_none() {
            return Err(invalid(
                "GCP bq requires either \"query\" or \"query_file\" option",
            ));
        }

        let credentials = self.gcp_credentials()?;

        let query_text = match query_file {
            Some(path) => tokio::fs::read_to_string(&path).await.map_err(|e| {
                AdapterError::Api(format!("Failed to execute BigQuery: {}: {}", path, e))
            })?,
            None => query.unwrap_or_default(),
        };

        let mut args = vec![
            "query".to_string(),
            format!("--project_id={}", credentials.project_id),
            "--format=json".to_string(),
        ];
        if let Some(dataset) = options::string(options, "dataset") {
            args.push(format!("--dataset_id={}", dataset));
        }
        args.push(query_text);

        println!("  [GCP BigQuery] Running query...");
        let output = self
            .run_tool("bq", &args, &credentials, "Failed to execute BigQuery")
            .await?;
        Self::report_warnings("GCP BigQuery", &output);

        let stdout = String::from_utf8_lossy(&output.stdout);
        let rows = match serde_json::from_str::<Value>(stdout.trim()) {
            Ok(Value::Array(rows)) => rows.len(),
            Ok(_) => 0,
            Err(e) => {
                return Err(AdapterError::Api(format!(
                    "Failed to execute BigQuery: unexpected output: {}",
                    e
                )))
            }
        };
        println!("  [GCP BigQuery] Query completed: {} rows returned", rows);
        Ok(())
    }

    async fn storage_upload(&self, options: &ActionOptions) -> Result<(), AdapterError> {
        let (Some(source), Some(bucket)) = (
            options::string(options, "source"),
            options::string(options, "bucket"),
        ) else {
            return Err(invalid(
                "GCP gcs_upload requires \"source\" and \"bucket\" options",
            ));
        };

        let credentials = self.gcp_credentials()?;

        let destination = options::string(options, "destination").unwrap_or_else(|| {
            Path::new(&source)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(source.as_str())
                .to_string()
        });
        let target = format!("gs://{}/{}", bucket, destination);

        println!("  [GCP Storage] Uploading {}...", source);
        let args = vec![
            "-q".to_string(),
            "cp".to_string(),
            source.clone(),
            target.clone(),
        ];
        self.run_tool("gsutil", &args, &credentials, "Failed to upload to GCS")
            .await?;

        println!("  [GCP Storage] Uploaded to {}", target);
        Ok(())
    }

    async fn invoke_function(&self, options: &ActionOptions) -> Result<(), AdapterError> {
        let Some(name) = options::string(options, "name") else {
            return Err(invalid("GCP function_invoke requires \"name\" option"));
        };

        let credentials = self.gcp_credentials()?;

        let region = options::string(options, "region").unwrap_or_else(|| DEFAULT_REGION.into());
        let mut args = vec![
            "functions".to_string(),
            "call".to_string(),
            name.clone(),
            format!("--project={}", credentials.project_id),
            format!("--region={}", region),
        ];
        match options::value(options, "data") {
            Some(Value::String(data)) => args.push(format!("--data={}", data)),
            Some(data) => args.push(format!("--data={}", serde_json::to_string(data)?)),
            None => {}
        }

        println!("  [GCP Functions] Invoking {}...", name);
        let output = self
            .run_tool(
                "gcloud",
                &args,
                &credentials,
                "Failed to invoke Cloud Function",
            )
            .await?;
        Self::report_warnings("GCP Functions", &output);

        println!("  [GCP Functions] Function executed successfully");
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if !stdout.is_empty() {
            let preview: String = stdout.chars().take(100).collect();
            println!("  [GCP Functions] Response: {}", preview);
        }
        Ok(())
    }
}

#[async_trait]
impl Adapter for GcpAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn actions(&self) -> &'static [&'static str] {
        ACTIONS
    }

    async fn execute(&self, action: &str, options: &ActionOptions) -> Result<(), AdapterError> {
        match action {
            "bq" => self.big_query(options).await,
            "gcs_upload" => self.storage_upload(options).await,
            "function_invoke" => self.invoke_function(options).await,
            _ => Err(AdapterError::UnknownAction {
                adapter: NAME,
                action: action.to_string(),
            }),
        }
    }

    /// Warns about missing Cloud SDK tools; actions fail later if they are used
    async fn initialize(&self) -> Result<(), AdapterError> {
        for tool in TOOLS {
            if which::which(tool).is_err() {
                warn!(tool, "Cloud SDK tool not found on PATH");
            }
        }
        Ok(())
    }

    fn supports_authentication(&self) -> bool {
        true
    }

    async fn authenticate(&self, prompt: &mut dyn Prompt) -> Result<(), AdapterError> {
        prompt.say("GCP Authentication");
        prompt.say("");
        prompt.say("To authenticate with GCP, you need a Service Account key file.");
        prompt.say("");
        prompt.say("1. Go to https://console.cloud.google.com/iam-admin/serviceaccounts");
        prompt.say("2. Create a service account or select an existing one");
        prompt.say("3. Create a new key (JSON format)");
        prompt.say("4. Download the key file");
        prompt.say("");

        let keyfile = prompt.ask("Enter the path to your GCP service account key file: ", false)?;
        let keyfile = keyfile.trim();
        if keyfile.is_empty() {
            return Err(AdapterError::InvalidInput(
                "Key file path cannot be empty".to_string(),
            ));
        }
        if !Path::new(keyfile).is_file() {
            return Err(AdapterError::InvalidInput(format!(
                "Key file not found: {}",
                keyfile
            )));
        }
        self.credentials.save(NAME, "keyfile", keyfile)?;

        let project_id = prompt.ask("Enter your GCP project ID: ", false)?;
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(AdapterError::InvalidInput(
                "Project ID cannot be empty".to_string(),
            ));
        }
        self.credentials.save(NAME, "project_id", project_id)?;
        Ok(())
    }
}
