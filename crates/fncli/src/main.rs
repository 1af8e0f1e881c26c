// crates/fncli/src/main.rs

mod render;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use fnclient::{HttpBackend, HttpConfig};
use fncore::{
    ConsoleError, ConsoleEvent, ExecutionRequest, FunctionDraft, FunctionId, FunctionPatch, Language,
};
use fnruntime::{Console, ConsoleConfig, DeletionFlow};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fnctl")]
#[command(about = "Function console CLI", long_about = None)]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "FNCTL_BACKEND_URL", default_value = "http://localhost:8000", global = true)]
    backend_url: String,

    /// Request timeout in seconds
    #[arg(long, env = "FNCTL_TIMEOUT_SECS", default_value_t = 30, global = true)]
    timeout: u64,

    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List function definitions
    List,

    /// Show one function and its metrics
    Show {
        id: FunctionId,
    },

    /// Create a function from a JSON definition
    Create {
        /// Path to a JSON file with name, route, language, code, timeout
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Edit a function's definition
    Edit {
        id: FunctionId,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        route: Option<String>,

        #[arg(long)]
        language: Option<Language>,

        /// Replace the code with the contents of this file
        #[arg(long)]
        code_file: Option<PathBuf>,

        #[arg(long)]
        timeout: Option<u32>,

        /// Set an environment variable (KEY=VALUE), repeatable
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        /// Remove an environment variable, repeatable
        #[arg(long = "unset-env", value_name = "KEY")]
        unset_env: Vec<String>,

        /// Print the patch and discard it instead of saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete a function
    Delete {
        id: FunctionId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Execute a function
    Execute {
        id: FunctionId,

        /// Input data as JSON string
        #[arg(short, long)]
        input: String,
    },

    /// Print a function's metrics history
    Metrics {
        id: FunctionId,
    },

    /// Poll metrics for every function until interrupted
    Watch {
        /// Seconds between polls
        #[arg(long, env = "FNCTL_POLL_SECS", default_value_t = 5)]
        interval: u64,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let backend = HttpBackend::new(HttpConfig {
        base_url: cli.backend_url.clone(),
        request_timeout: Duration::from_secs(cli.timeout),
    })?;

    let poll_interval = match &cli.command {
        Commands::Watch { interval } => Duration::from_secs((*interval).max(1)),
        _ => ConsoleConfig::default().poll_interval,
    };
    let console = Console::with_config(
        Arc::new(backend),
        ConsoleConfig::default().with_poll_interval(poll_interval),
    );

    let outcome = match cli.command {
        Commands::List => list_functions(&console).await,
        Commands::Show { id } => show_function(&console, id).await,
        Commands::Create { file } => create_function(&console, file).await,
        Commands::Edit { id, name, route, language, code_file, timeout, env, unset_env, dry_run } => {
            let edits = Edits { name, route, language, code_file, timeout, env, unset_env };
            edit_function(&console, id, edits, dry_run).await
        }
        Commands::Delete { id, yes } => delete_function(&console, id, yes).await,
        Commands::Execute { id, input } => execute_function(&console, id, &input).await,
        Commands::Metrics { id } => print_metrics(&console, id).await,
        Commands::Watch { .. } => watch(&console).await,
    };

    outcome.map_err(|e| {
        if let Some(console_error) = e.downcast_ref::<ConsoleError>() {
            render::print_error(console_error, &cli.backend_url);
        }
        e
    })
}

async fn list_functions(console: &Console) -> Result<()> {
    let records = console.load().await?;

    println!("📦 Functions ({}):", records.len());
    println!();
    for record in &records {
        render::print_record_row(record);
    }
    Ok(())
}

async fn show_function(console: &Console, id: FunctionId) -> Result<()> {
    console.load().await?;
    let record = console.get(id).await?;
    render::print_record(&record);

    println!();
    println!("📊 Metrics:");
    match console.refresh_metrics(id).await {
        Ok(samples) => render::print_metrics(&samples),
        Err(e) => println!("   ⚠️  Metrics unavailable: {}", e),
    }
    Ok(())
}

async fn create_function(console: &Console, file: PathBuf) -> Result<()> {
    println!("🚀 Loading definition from: {}", file.display());

    let json = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let draft: FunctionDraft = serde_json::from_str(&json)
        .with_context(|| format!("{} is not a valid function definition", file.display()))?;

    let record = console.create(&draft).await?;

    println!("✨ Created function {} (id {})", record.name, record.id);
    Ok(())
}

/// Field changes requested on the command line
struct Edits {
    name: Option<String>,
    route: Option<String>,
    language: Option<Language>,
    code_file: Option<PathBuf>,
    timeout: Option<u32>,
    env: Vec<String>,
    unset_env: Vec<String>,
}

impl Edits {
    fn apply(self, draft: &mut FunctionDraft) -> Result<()> {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(route) = self.route {
            draft.route = route;
        }
        if let Some(language) = self.language {
            draft.language = language;
        }
        if let Some(path) = self.code_file {
            draft.code = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
        }
        if let Some(timeout) = self.timeout {
            draft.timeout = timeout;
        }
        for pair in self.env {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{}'", pair))?;
            draft.environment_variables.insert(key.to_string(), value.to_string());
        }
        for key in self.unset_env {
            draft.environment_variables.remove(&key);
        }
        Ok(())
    }
}

async fn edit_function(console: &Console, id: FunctionId, edits: Edits, dry_run: bool) -> Result<()> {
    console.load().await?;

    let mut session = console.open(id).await?;
    session.begin_edit()?;

    let Some(draft) = session.draft_mut() else {
        bail!("Function {} is not editable", id);
    };
    edits.apply(draft)?;

    let patch = session
        .draft()
        .map(|draft| FunctionPatch::between(session.record(), draft))
        .unwrap_or_default();

    if patch.is_empty() {
        session.discard()?;
        println!("Nothing to change");
        return Ok(());
    }

    println!("📝 Changes:");
    println!("{}", serde_json::to_string_pretty(&patch)?);

    if dry_run {
        session.discard()?;
        println!("Dry run, changes discarded");
        return Ok(());
    }

    let record = console.save(&mut session).await?;
    println!("✅ Saved {} (id {})", record.name, record.id);
    Ok(())
}

async fn delete_function(console: &Console, id: FunctionId, yes: bool) -> Result<()> {
    console.load().await?;
    let session = console.open(id).await?;

    let mut flow = DeletionFlow::new();
    flow.request(id)?;

    if !yes && !confirm(&format!(
        "Delete function '{}' (id {})? This action cannot be undone. [y/N] ",
        session.record().name,
        id
    ))? {
        flow.cancel()?;
        println!("Cancelled");
        return Ok(());
    }

    console.commit_deletion(&mut flow).await?;
    println!("🗑️  Deleted function {}", id);
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

async fn execute_function(console: &Console, id: FunctionId, input: &str) -> Result<()> {
    let request = ExecutionRequest::parse(id, input)?;
    console.load().await?;
    let result = console.orchestrator().submit(request).await?;
    render::print_execution(&result);
    Ok(())
}

async fn print_metrics(console: &Console, id: FunctionId) -> Result<()> {
    console.load().await?;
    let samples = console.refresh_metrics(id).await?;

    println!("📊 Metrics for function {} ({} samples):", id, samples.len());
    render::print_metrics(&samples);
    Ok(())
}

async fn watch(console: &Console) -> Result<()> {
    let mut events = console.subscribe_events();
    let handle = console.start_polling().await?;

    println!(
        "▶️  Polling metrics every {}s, Ctrl-C to stop",
        console.config().poll_interval.as_secs()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(ConsoleEvent::MetricsRefreshed { function_id, samples, .. }) => {
                    let name = console
                        .snapshot()
                        .await
                        .record(function_id)
                        .map(|r| r.name.clone())
                        .unwrap_or_default();
                    match samples.iter().max_by_key(|s| s.timestamp) {
                        Some(latest) => println!(
                            "  📊 [{}] {}: {} samples, last at {} ({:.4}s, {:.2}MB, {:.2}%)",
                            function_id,
                            name,
                            samples.len(),
                            latest.local_timestamp().format("%H:%M:%S"),
                            latest.execution_time,
                            latest.memory_usage,
                            latest.cpu_usage
                        ),
                        None => println!("  📊 [{}] {}: no executions yet", function_id, name),
                    }
                }
                Ok(ConsoleEvent::MetricsFetchFailed { function_id, error, .. }) => {
                    println!("  ⚠️  [{}] metrics unavailable: {}", function_id, error);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Display fell behind, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    handle.stop().await;
    println!("⏹️  Polling stopped");
    Ok(())
}
