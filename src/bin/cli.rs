use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use glue::prelude::*;
use tracing_subscriber::EnvFilter;

const EXAMPLE_CONFIG: &str = r##"# Example Glue workflow configuration

# Workflow triggered on deployment
deploy:
  when: deploy
  steps:
    - name: "Run tests"
      run: "cargo test"

    - name: "Build release"
      run: "cargo build --release"

    # Example adapter usage (uncomment and configure, then run: glue auth slack)
    # - name: "Notify team"
    #   adapter: slack
    #   action: notify
    #   options:
    #     channel: "#deployments"
    #     message: "Deployment completed successfully"

# Workflow for CI failures
ci-fail:
  when: ci-fail
  steps:
    - name: "Get error logs"
      run: "tail -n 50 error.log"

    # - name: "Create bug ticket"
    #   adapter: linear
    #   action: create_issue
    #   options:
    #     team: "Backend"
    #     title: "CI Build Failure"
    #     priority: "Urgent"
"##;

#[derive(Parser)]
#[command(name = "glue")]
#[command(about = "Glue local commands and external services into workflows", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workflow file (default: ./glue.yaml, or $GLUE_CONFIG)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<std::path::PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow
    Run {
        /// Name of the workflow to run
        #[arg(value_name = "WORKFLOW")]
        workflow: String,
    },

    /// List all available workflows
    List,

    /// Show workflow execution history
    History {
        /// Number of entries to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Clear all history
        #[arg(long)]
        clear: bool,
    },

    /// Authenticate with an adapter
    Auth {
        /// Name of the adapter to authenticate
        #[arg(value_name = "ADAPTER")]
        adapter: String,
    },

    /// Create an example glue.yaml
    Init,
}

/// Reads answers from the terminal
struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&mut self, question: &str, _secret: bool) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", question)?;
        stdout.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn say(&mut self, line: &str) {
        println!("{}", line);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "glue=debug" } else { "glue=warn" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let settings = Settings::from_env()?.with_config_file(cli.config);

    match cli.command {
        Commands::Run { workflow } => run_workflow(&settings, &workflow).await,
        Commands::List => list_workflows(&settings),
        Commands::History { limit, clear } => history(&settings, limit, clear),
        Commands::Auth { adapter } => authenticate(&settings, &adapter).await,
        Commands::Init => init(&settings.config_file),
    }
}

async fn run_workflow(settings: &Settings, name: &str) -> anyhow::Result<bool> {
    let config = WorkflowLoader::load_file(&settings.config_file)?;
    let workflow = WorkflowLoader::select(&config, name)?;

    let credentials = Arc::new(settings.credential_store());
    let registry = builtin_registry(credentials);

    // Unknown adapters are left for the executor to report as a step failure
    for adapter in workflow.adapter_names() {
        if registry.get(adapter).is_some() {
            registry
                .initialize(adapter)
                .await
                .with_context(|| format!("Failed to initialize adapter \"{}\"", adapter))?;
        }
    }

    let executor = Executor::new(Arc::new(registry)).with_history(settings.history());
    let result = executor.execute(workflow).await;
    Ok(result.success)
}

fn list_workflows(settings: &Settings) -> anyhow::Result<bool> {
    let config = WorkflowLoader::load_file(&settings.config_file)?;

    if config.is_empty() {
        println!("No workflows found in {}", settings.config_file.display());
        return Ok(true);
    }

    println!("Available workflows:\n");
    for (name, workflow) in &config {
        println!("  {}", name);
        println!("    Steps: {}", workflow.steps.len());
        for step in &workflow.steps {
            println!("      - {} ({})", step.name(), step.kind());
        }
        println!();
    }
    Ok(true)
}

fn history(settings: &Settings, limit: usize, clear: bool) -> anyhow::Result<bool> {
    let recorder = settings.history();

    if clear {
        recorder.clear()?;
        println!("✓ History cleared");
        return Ok(true);
    }

    let logs = recorder.list(limit);
    if logs.is_empty() {
        println!("No workflow executions found");
        return Ok(true);
    }

    println!("Workflow Execution History:\n");
    for log in logs {
        let status = if log.success { "✓" } else { "✗" };
        let date = log.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
        println!("{} {} - {}", status, log.workflow, date);
        println!("  Duration: {:.2}s", log.duration.as_secs_f64());

        if let Some(failed) = log.steps.iter().find(|s| !s.success) {
            println!("  Failed at: {}", failed.step_name);
            if let Some(error) = &failed.error {
                println!("  Error: {}", error);
            }
        }
        println!();
    }
    Ok(true)
}

async fn authenticate(settings: &Settings, adapter: &str) -> anyhow::Result<bool> {
    let registry = builtin_registry(Arc::new(settings.credential_store()));

    println!("Authenticating with {}...", adapter);
    registry.authenticate(adapter, &mut TerminalPrompt).await?;
    println!("✓ Successfully authenticated with {}", adapter);
    Ok(true)
}

fn init(config_file: &Path) -> anyhow::Result<bool> {
    if config_file.exists() {
        println!("{} already exists", config_file.display());
        return Ok(false);
    }

    std::fs::write(config_file, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", config_file.display()))?;

    println!("✓ Created {}", config_file.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to define your workflows", config_file.display());
    println!("  2. Run a workflow with: glue run <workflow-name>");
    println!();
    println!("Example: glue run deploy");
    Ok(true)
}
