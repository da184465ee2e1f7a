use std::path::{Path, PathBuf};
use std::sync::Arc;

use agentrun::logging::LoggingConfig;
use agentrun::{
    load_agent_from_path, load_cases_from_path, Annotation, BatchRunner, Dataset, DynLlmClient,
    EngineConfig, LocalEchoClient, MemoryStore, RunContext, RunExecutor, RunOutcome, RunStore,
};
use clap::{Parser, Subcommand};
use serde_json::json;

#[derive(Parser)]
#[command(name = "agentrun", version, about = "Run, replay and batch multi-step prompt agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an agent definition once
    Run {
        #[arg(long)]
        agent: PathBuf,
        #[arg(long = "input", value_parser = parse_key_value)]
        inputs: Vec<(String, String)>,
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Replay a stored run from a step index as a new run
    Replay {
        run_id: String,
        #[arg(long = "from")]
        from_step_index: Option<usize>,
        #[arg(long)]
        state: PathBuf,
    },
    /// Run an agent once per dataset case
    Batch {
        #[arg(long)]
        agent: PathBuf,
        #[arg(long)]
        cases: PathBuf,
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// List stored runs
    Runs {
        #[arg(long)]
        state: PathBuf,
        #[arg(long)]
        agent_id: Option<String>,
    },
    /// Rate, note or tag a stored run
    Annotate {
        run_id: String,
        #[arg(long)]
        state: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        rating: Option<i8>,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        tags: Option<String>,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    LoggingConfig::init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env()?;
    match cli.command {
        Command::Run {
            agent,
            inputs,
            state,
        } => handle_run(config, agent, inputs, state).await,
        Command::Replay {
            run_id,
            from_step_index,
            state,
        } => handle_replay(config, run_id, from_step_index, state).await,
        Command::Batch {
            agent,
            cases,
            concurrency,
            state,
        } => handle_batch(config, agent, cases, concurrency, state).await,
        Command::Runs { state, agent_id } => handle_runs(state, agent_id).await,
        Command::Annotate {
            run_id,
            state,
            rating,
            note,
            tags,
        } => handle_annotate(run_id, state, rating, note, tags).await,
    }
}

fn build_client(config: &EngineConfig) -> anyhow::Result<DynLlmClient> {
    #[cfg(feature = "openai-client")]
    {
        if let Some(key) = agentrun::EnvConfig::api_key()? {
            return Ok(Arc::new(agentrun::OpenAiClient::from_config(config, key)));
        }
    }
    let _ = config;
    tracing::info!("no model client configured, using local echo client");
    Ok(Arc::new(LocalEchoClient))
}

fn open_store(state: Option<&Path>) -> anyhow::Result<Arc<MemoryStore>> {
    let store = match state {
        Some(path) => MemoryStore::load_or_default(path)?,
        None => MemoryStore::new(),
    };
    Ok(Arc::new(store))
}

fn save_store(store: &MemoryStore, state: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = state {
        store.save_snapshot(path)?;
    }
    Ok(())
}

fn executor(config: EngineConfig, store: &Arc<MemoryStore>) -> anyhow::Result<RunExecutor> {
    let client = build_client(&config)?;
    Ok(RunExecutor::new(store.clone(), store.clone(), client).with_config(config))
}

fn print_outcome(outcome: &RunOutcome) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    if let Some(error) = &outcome.error {
        anyhow::bail!("run {} failed: {}", outcome.run.id, error);
    }
    Ok(())
}

async fn handle_run(
    config: EngineConfig,
    agent_path: PathBuf,
    inputs: Vec<(String, String)>,
    state: Option<PathBuf>,
) -> anyhow::Result<()> {
    let agent = load_agent_from_path(&agent_path)?;
    let agent_id = agent.id.clone();
    let store = open_store(state.as_deref())?;
    store.insert_agent(agent);

    let inputs: RunContext = inputs.into_iter().collect();
    let outcome = executor(config, &store)?.run_agent(&agent_id, inputs).await?;
    save_store(&store, state.as_deref())?;
    print_outcome(&outcome)
}

async fn handle_replay(
    config: EngineConfig,
    run_id: String,
    from_step_index: Option<usize>,
    state: PathBuf,
) -> anyhow::Result<()> {
    let store = open_store(Some(&state))?;
    let outcome = executor(config, &store)?
        .replay_run(&run_id, from_step_index)
        .await?;
    save_store(&store, Some(&state))?;
    print_outcome(&outcome)
}

async fn handle_batch(
    config: EngineConfig,
    agent_path: PathBuf,
    cases_path: PathBuf,
    concurrency: usize,
    state: Option<PathBuf>,
) -> anyhow::Result<()> {
    let agent = load_agent_from_path(&agent_path)?;
    let mut dataset = Dataset::new(&agent.id, cases_path.display().to_string());
    dataset.cases = load_cases_from_path(&cases_path)?;

    let store = open_store(state.as_deref())?;
    store.insert_agent(agent);
    let report = BatchRunner::new(executor(config, &store)?)
        .with_max_concurrency(concurrency)
        .run_dataset(&dataset)
        .await?;
    save_store(&store, state.as_deref())?;

    let summary = json!({
        "datasetId": report.dataset_id,
        "runIds": report.run_ids(),
        "completed": report.completed,
        "failed": report.failed,
        "errors": report
            .errors
            .iter()
            .map(|(case_index, message)| json!({ "caseIndex": case_index, "error": message }))
            .collect::<Vec<_>>(),
        "runs": report.runs,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn handle_runs(state: PathBuf, agent_id: Option<String>) -> anyhow::Result<()> {
    let store = open_store(Some(&state))?;
    let runs = store.list_runs(agent_id.as_deref()).await?;
    if runs.is_empty() {
        println!("No runs stored in `{}`", state.display());
        return Ok(());
    }
    println!(
        "{:<38} {:<38} {:<10} {:<14} {:>8} {:>10}",
        "Run", "Agent", "Status", "Stop reason", "Tokens", "Cost"
    );
    for run in runs {
        let stop_reason = run
            .stop_reason
            .map(|reason| format!("{reason:?}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<38} {:<38} {:<10} {:<14} {:>8} {:>10.6}",
            run.id,
            run.agent_id,
            format!("{:?}", run.status),
            stop_reason,
            run.total_tokens,
            run.total_cost
        );
    }
    Ok(())
}

async fn handle_annotate(
    run_id: String,
    state: PathBuf,
    rating: Option<i8>,
    note: Option<String>,
    tags: Option<String>,
) -> anyhow::Result<()> {
    let store = open_store(Some(&state))?;
    let patch = Annotation {
        rating: rating.map(Some),
        note: note.map(Some),
        tags: tags.map(Some),
    };
    let run = store.annotate_run(&run_id, &patch).await?;
    save_store(&store, Some(&state))?;
    println!("{}", serde_json::to_string_pretty(&run)?);
    Ok(())
}
