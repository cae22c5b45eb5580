use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, bail};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cloudtask_core::app::callback_router;
use cloudtask_core::config::{ENV_LOCATION, ENV_PROJECT_ID, ENV_QUEUE};
use cloudtask_core::domain::{JsonMap, QueueInfo};
use cloudtask_core::impls::{CloudTasksClient, RecordingTaskService};
use cloudtask_core::ports::QueueAdmin;
use cloudtask_core::typed::{
    CallbackContext, CallbackError, CallbackHandler, CallbackRegistry, DeferredTask,
};
use cloudtask_core::{
    CloudTasksConfig, HttpMethod, Payload, ScheduleOffset, SubmitOptions, Submission,
    SubmitterBuilder, TaskName, TaskRequest,
};

/// cloudtask CLI.
#[derive(Parser)]
#[command(name = "cloudtask")]
#[command(about = "Provision Cloud Tasks queues and submit deferred HTTP tasks")]
#[command(version)]
struct Cli {
    /// Project id (overrides CLOUDTASK_PROJECT_ID)
    #[arg(long, global = true)]
    project: Option<String>,

    /// Queue location, e.g. us-central1 (overrides CLOUDTASK_LOCATION)
    #[arg(long, global = true)]
    location: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue provisioning
    Queues {
        #[command(subcommand)]
        action: QueueAction,
    },

    /// Submit one task
    Submit(SubmitArgs),

    /// Serve the callback endpoints
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: String,
    },
}

#[derive(Args)]
struct SubmitArgs {
    /// Relative URL the service will call, e.g. /secret_url/
    #[arg(long)]
    path: String,

    #[arg(long, default_value = "POST")]
    method: String,

    /// JSON object body
    #[arg(long, conflicts_with = "text")]
    json: Option<String>,

    /// Raw text body
    #[arg(long)]
    text: Option<String>,

    /// Delay in seconds before the first attempt
    #[arg(long)]
    delay: Option<f64>,

    /// Dedup name
    #[arg(long, conflicts_with = "unique")]
    name: Option<String>,

    /// Generate a unique dedup name
    #[arg(long)]
    unique: bool,

    /// Queue name (overrides CLOUDTASK_QUEUE)
    #[arg(long)]
    queue: Option<String>,

    /// Build and print the task without calling the service
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum QueueAction {
    /// Create a queue
    Create { queue_id: String },

    /// Show a queue's state, rate limits and retry settings
    Describe { queue_id: String },
}

/// Body of the demo `/secret_url/` endpoint; any JSON object or nothing.
#[derive(Debug, Serialize, Deserialize)]
struct SecretUrl(Option<JsonMap>);

impl DeferredTask for SecretUrl {
    const PATH: &'static str = "/secret_url/";
}

struct SecretUrlHandler;

#[async_trait]
impl CallbackHandler<SecretUrl> for SecretUrlHandler {
    async fn handle(&self, task: SecretUrl, ctx: CallbackContext) -> Result<(), CallbackError> {
        let fields = task.0.map(|m| m.len()).unwrap_or(0);
        info!(
            task = ctx.task_name.as_deref().unwrap_or("-"),
            fields, "secret url called"
        );
        Ok(())
    }
}

fn load_config(cli: &Cli, queue: Option<&str>) -> anyhow::Result<CloudTasksConfig> {
    let overrides: HashMap<&str, String> = [
        (ENV_PROJECT_ID, cli.project.clone()),
        (ENV_LOCATION, cli.location.clone()),
        (ENV_QUEUE, queue.map(str::to_string)),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|v| (key, v)))
    .collect();

    CloudTasksConfig::from_lookup(|key: &str| {
        overrides
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    })
    .context("loading Cloud Tasks configuration")
}

fn print_request(request: &TaskRequest) {
    println!("queue:    {}", request.queue);
    println!("target:   {} {}", request.http_method, request.target_path);
    if let Some(name) = request.resource_name() {
        println!("name:     {name}");
    }
    if let Some(at) = request.schedule_time {
        println!("schedule: {}.{:09}", at.seconds, at.nanos);
    }
    for (key, value) in &request.headers {
        println!("header:   {key}: {value}");
    }
    if !request.body.is_empty() {
        println!("body:     {}", String::from_utf8_lossy(&request.body));
    }
}

/// Queue 操作は managed service 専用。local 環境では外に出ない。
fn queue_admin(config: &CloudTasksConfig) -> anyhow::Result<CloudTasksClient> {
    if !config.is_managed() {
        bail!("queue provisioning needs the managed environment (CLOUDTASK_ENV=managed)");
    }
    Ok(CloudTasksClient::new(config)?)
}

async fn queue_command(config: &CloudTasksConfig, action: &QueueAction) -> anyhow::Result<QueueInfo> {
    let queue = config.queue_path()?;
    let admin = queue_admin(config)?;
    let info = match action {
        QueueAction::Create { .. } => admin.create_queue(&queue).await?,
        QueueAction::Describe { .. } => admin.get_queue(&queue).await?,
    };
    Ok(info)
}

async fn run_queues(cli: &Cli, action: &QueueAction) -> anyhow::Result<()> {
    let queue_id = match action {
        QueueAction::Create { queue_id } | QueueAction::Describe { queue_id } => queue_id,
    };
    let config = load_config(cli, Some(queue_id))?;
    let info = queue_command(&config, action).await?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn submit_options(args: &SubmitArgs) -> anyhow::Result<SubmitOptions> {
    let payload = match (&args.json, &args.text) {
        (Some(raw), _) => {
            let value: serde_json::Value =
                serde_json::from_str(raw).context("--json is not valid JSON")?;
            Payload::json(&value)?
        }
        (None, Some(raw)) => Payload::from(raw.as_str()),
        (None, None) => Payload::Empty,
    };

    let mut options = SubmitOptions::new(args.path.as_str())
        .method(args.method.parse::<HttpMethod>()?)
        .payload(payload);
    if let Some(secs) = args.delay {
        options = options.delay(ScheduleOffset::from_secs_f64(secs)?);
    }
    if let Some(name) = &args.name {
        options = options.name(TaskName::new(name.as_str())?);
    }
    if args.unique {
        options = options.unique_name();
    }
    Ok(options)
}

enum SubmitOutcome {
    /// --dry-run: 組み立てただけ
    Planned(TaskRequest),
    Submitted(Submission),
}

async fn submit(config: CloudTasksConfig, args: &SubmitArgs) -> anyhow::Result<SubmitOutcome> {
    let options = submit_options(args)?;

    let mut builder = SubmitterBuilder::new().config(config);
    if args.dry_run {
        builder = builder.service(Arc::new(RecordingTaskService::new()));
    }
    let submitter = builder.build()?;

    if args.dry_run {
        return Ok(SubmitOutcome::Planned(submitter.build_request(options)?));
    }
    Ok(SubmitOutcome::Submitted(submitter.submit(options).await?))
}

async fn run_submit(cli: &Cli, args: &SubmitArgs) -> anyhow::Result<()> {
    let config = load_config(cli, args.queue.as_deref())?;
    match submit(config, args).await? {
        SubmitOutcome::Planned(request) => print_request(&request),
        SubmitOutcome::Submitted(Submission::Enqueued(created)) => {
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
        SubmitOutcome::Submitted(Submission::Local(request)) => {
            println!("local environment: task not enqueued");
            print_request(&request);
        }
    }
    Ok(())
}

async fn run_serve(addr: &str) -> anyhow::Result<()> {
    let mut registry = CallbackRegistry::new();
    registry.register::<SecretUrl, _>(SecretUrlHandler)?;

    let app = callback_router(&registry);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(addr, paths = ?registry.registered_paths(), "serving task callbacks");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Queues { action } => run_queues(&cli, action).await,
        Commands::Submit(args) => run_submit(&cli, args).await,
        Commands::Serve { addr } => run_serve(addr).await,
    }
}
