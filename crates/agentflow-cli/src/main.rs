mod render;

use std::convert::Infallible;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use agentflow_core::AgentflowConfig;
use agentflow_core::AppAction;
use agentflow_core::AppState;
use agentflow_core::ChatSubmission;
use agentflow_core::ExecutionEvent;
use agentflow_core::InputModality;
use agentflow_core::Language;
use agentflow_core::ModalityMode;
use agentflow_core::PendingCheckpoint;
use agentflow_core::PlanStatus;
use agentflow_core::RuntimeAction;
use agentflow_core::SessionStore;
use agentflow_core::SnapshotWriter;
use agentflow_core::Store;
use agentflow_core::ThemeMode;
use agentflow_core::TransparencyLevel;
use agentflow_core::UserAction;
use agentflow_exec::decode_stream;
use agentflow_exec::HttpOrchestrator;
use agentflow_exec::Session;
use anyhow::anyhow;
use anyhow::bail;
use anyhow::Context;
use base64::Engine;
use bytes::Bytes;
use clap::Parser;
use clap::Subcommand;
use futures::stream;
use futures::StreamExt;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "agentflow", version, about = "Plan, preview and track multi-agent task execution")]
struct Cli {
    /// Config file (default: <config dir>/agentflow/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask for a plan
    Chat {
        text: Option<String>,
        #[arg(long, value_name = "FILE")]
        image: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        voice: Option<PathBuf>,
        /// Approve checkpoints without asking
        #[arg(long)]
        yes: bool,
    },
    /// Run the proposed plan
    Execute {
        #[arg(long)]
        yes: bool,
    },
    /// Discard the proposed plan
    Reject,
    /// Print the live conversation
    Show,
    /// Feed a recorded event stream through the tracker, without a server
    Replay { file: Option<PathBuf> },
    /// Archive the live conversation and start over
    New,
    #[command(subcommand)]
    History(HistoryCommand),
    #[command(subcommand)]
    Settings(SettingsCommand),
    #[command(subcommand)]
    Agents(AgentsCommand),
}

#[derive(Subcommand, Debug)]
enum HistoryCommand {
    List,
    Show { id: String },
    Delete { id: String },
    Clear,
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Show,
    /// black_box | plan_preview | full_transparency
    Transparency { level: String },
    /// multimodal | text_image | voice_only
    Modality { mode: String },
    /// dark | light | auto
    Theme { mode: String },
    /// en | zh | bg | ar
    Language { code: String },
}

#[derive(Subcommand, Debug)]
enum AgentsCommand {
    List,
    Enable { id: String },
    Disable { id: String },
    /// Set free-text guidance; omit the text to clear it
    Guidance { id: String, text: Option<String> },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AgentflowConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging.level)?;

    let sessions = SessionStore::open(config.data_dir()?)?;
    let state = match sessions.restore() {
        Ok(state) => state,
        Err(err) => {
            warn!(target: "agentflow.cli", error = %err, "saved session unreadable; starting fresh");
            AppState::new()
        }
    };

    if let Command::Replay { file } = &cli.command {
        let path = file.clone().unwrap_or_else(|| sessions.last_run_path());
        return replay(&path, state).await;
    }

    let mut writer = SnapshotWriter::new(sessions.clone(), &state);
    let mut store = Store::new(state);
    store.subscribe(move |state| writer.observe(state));

    let orchestrator = HttpOrchestrator::from_config(&config.service)?;
    let auto_approve = matches!(
        cli.command,
        Command::Chat { yes: true, .. } | Command::Execute { yes: true }
    );
    let verbose = store.state().active_disclosure().show_graph;
    let mut recorder = RunRecorder::new(sessions.clone());
    let mut session = Session::new(store, orchestrator)
        .with_event_tap(move |event| {
            recorder.record(event);
            if verbose {
                println!("  · {}", event.kind());
            }
        })
        .with_checkpoint_handler(move |checkpoint| decide_checkpoint(checkpoint, auto_approve));

    match cli.command {
        Command::Chat {
            text,
            image,
            voice,
            yes: _,
        } => {
            let submission = submission(text, image.as_deref(), voice.as_deref())?;
            let before = session.store().state().messages.len();
            session.user(UserAction::SubmitChat(submission)).await;
            let state = session.store().state();
            if state.messages.len() == before {
                bail!(
                    "message not sent (a request is in flight or the modality is disabled in '{}' mode)",
                    state.preferences.modality.label()
                );
            }
            print_since(state, before);
        }
        Command::Execute { yes: _ } => {
            let state = session.store().state();
            let Some(plan) = state.current_plan.as_ref() else {
                bail!("no plan to execute; start with `agentflow chat`");
            };
            if !matches!(plan.status, PlanStatus::Proposed | PlanStatus::Approved) {
                bail!("plan {} is {}", plan.id, plan.status.label());
            }
            if state.graph_state.is_none() {
                bail!("plan {} has no execution graph", plan.id);
            }
            let before = state.messages.len();
            session.user(UserAction::ExecutePlan).await;
            let state = session.store().state();
            if let Some(graph) = state.visible_graph() {
                println!("{}", render::graph(graph));
            }
            print_since(state, before);
        }
        Command::Reject => {
            session.user(UserAction::RejectPlan).await;
            if session.store().state().current_plan.is_some() {
                bail!("only a proposed plan can be rejected");
            }
            println!("plan discarded");
        }
        Command::Show => {
            let state = session.store().state();
            print_since(state, 0);
            if let Some(plan) = state.visible_plan() {
                println!("{}", render::plan(&plan));
            }
            if let Some(graph) = state.visible_graph() {
                println!("{}", render::graph(graph));
            }
        }
        Command::New => {
            session.user(UserAction::StartNewConversation).await;
            println!("started a new conversation");
        }
        Command::History(command) => history(&mut session, command).await?,
        Command::Settings(command) => settings(&mut session, command).await?,
        Command::Agents(command) => agents(&mut session, command).await?,
        Command::Replay { .. } => {}
    }
    Ok(())
}

async fn history(session: &mut Session<HttpOrchestrator>, command: HistoryCommand) -> anyhow::Result<()> {
    match command {
        HistoryCommand::List => {
            println!("{}", render::history(session.store().state().history.entries()));
        }
        HistoryCommand::Show { id } => {
            session.user(UserAction::OpenConversation { id: id.clone() }).await;
            let Some(conversation) = session.store().state().viewed_conversation() else {
                bail!("no archived conversation '{id}'");
            };
            println!("{}", conversation.title);
            for message in &conversation.messages {
                println!("{}", render::message(message));
            }
            session.user(UserAction::CloseConversation).await;
        }
        HistoryCommand::Delete { id } => {
            let before = session.store().state().history.len();
            session.user(UserAction::DeleteConversation { id: id.clone() }).await;
            if session.store().state().history.len() == before {
                println!("no archived conversation '{id}'");
            } else {
                println!("deleted {id}");
            }
        }
        HistoryCommand::Clear => {
            session.user(UserAction::ClearAllHistory).await;
            println!("history cleared");
        }
    }
    Ok(())
}

async fn settings(session: &mut Session<HttpOrchestrator>, command: SettingsCommand) -> anyhow::Result<()> {
    let action = match command {
        SettingsCommand::Show => None,
        SettingsCommand::Transparency { level } => Some(UserAction::SetTransparency(
            TransparencyLevel::parse(&level).ok_or_else(|| anyhow!("unknown transparency level: {level}"))?,
        )),
        SettingsCommand::Modality { mode } => Some(UserAction::SetModalityMode(
            ModalityMode::parse(&mode).ok_or_else(|| anyhow!("unknown modality mode: {mode}"))?,
        )),
        SettingsCommand::Theme { mode } => Some(UserAction::SetThemeMode(
            ThemeMode::parse(&mode).ok_or_else(|| anyhow!("unknown theme: {mode}"))?,
        )),
        SettingsCommand::Language { code } => Some(UserAction::SetLanguage(
            Language::parse(&code).ok_or_else(|| anyhow!("unsupported language: {code}"))?,
        )),
    };
    if let Some(action) = action {
        session.user(action).await;
    }
    println!("{}", render::settings(&session.store().state().preferences));
    Ok(())
}

async fn agents(session: &mut Session<HttpOrchestrator>, command: AgentsCommand) -> anyhow::Result<()> {
    match command {
        AgentsCommand::List => session.refresh_agents().await?,
        AgentsCommand::Enable { id } => session.set_agent_enabled(&id, true).await?,
        AgentsCommand::Disable { id } => session.set_agent_enabled(&id, false).await?,
        AgentsCommand::Guidance { id, text } => {
            let guidance = text.filter(|text| !text.trim().is_empty());
            session.set_agent_guidance(&id, guidance).await?
        }
    }
    println!("{}", render::agents(&session.store().state().agents));
    Ok(())
}

/// Replays a recorded stream into a scratch copy of the session. Nothing is
/// persisted.
async fn replay(path: &Path, state: AppState) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    let mut state = state;
    state.messages.clear();
    let run_id = state.execution.start_run();
    let mut store = Store::new(state);

    let body = stream::iter([Ok::<_, Infallible>(Bytes::from(bytes))]);
    let mut events = std::pin::pin!(decode_stream(body));
    let mut applied = 0usize;
    while let Some(Ok(event)) = events.next().await {
        println!("  · {}", event.kind());
        store.dispatch(AppAction::Runtime(
            RuntimeAction::ExecutionEvent { run_id, event },
        ));
        applied += 1;
    }
    store.dispatch(AppAction::Runtime(
        RuntimeAction::ExecutionStreamClosed { run_id },
    ));

    let state = store.state();
    println!("replayed {applied} records from {}", path.display());
    if let Some(graph) = state.graph_state.as_ref() {
        println!("{}", render::graph(graph));
    }
    print_since(state, 0);
    Ok(())
}

fn submission(
    text: Option<String>,
    image: Option<&Path>,
    voice: Option<&Path>,
) -> anyhow::Result<ChatSubmission> {
    let encode = |path: &Path| -> anyhow::Result<String> {
        let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    };
    let modality = match (voice, image) {
        (Some(_), _) => InputModality::Voice,
        (None, Some(_)) => InputModality::Image,
        (None, None) => InputModality::Text,
    };
    Ok(ChatSubmission {
        text: text.unwrap_or_default(),
        image_base64: image.map(encode).transpose()?,
        audio_base64: voice.map(encode).transpose()?,
        modality,
    })
}

/// Writes the records of the run opened by this invocation to the last-run
/// file, replacing the previous recording on the first record.
struct RunRecorder {
    sessions: SessionStore,
    started: bool,
}

impl RunRecorder {
    fn new(sessions: SessionStore) -> Self {
        Self {
            sessions,
            started: false,
        }
    }

    fn record(&mut self, event: &ExecutionEvent) {
        if !self.started {
            if let Err(err) = self.sessions.begin_run_recording() {
                warn!(target: "agentflow.cli", error = %err, "run recording not started");
                return;
            }
            self.started = true;
        }
        if let Err(err) = self.sessions.record_event(event) {
            warn!(target: "agentflow.cli", error = %err, "run recording failed");
        }
    }
}

fn decide_checkpoint(checkpoint: &PendingCheckpoint, auto_approve: bool) -> Option<bool> {
    if auto_approve {
        println!("checkpoint {}: approved (--yes)", checkpoint.step_id);
        return Some(true);
    }
    match prompt_approval(&checkpoint.step_id) {
        Ok(approved) => Some(approved),
        Err(err) => {
            warn!(target: "agentflow.cli", error = %err, "cannot read checkpoint decision");
            None
        }
    }
}

fn prompt_approval(step_id: &str) -> io::Result<bool> {
    print!("approval required for {step_id} [y/N]: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes" | "YES"))
}

fn print_since(state: &AppState, from: usize) {
    for message in state.messages.iter().skip(from) {
        println!("{}", render::message(message));
    }
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(value) if !value.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(level).map_err(|err| anyhow!("invalid logging.level '{level}': {err}"))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow!("cannot install log subscriber: {err}"))
}
