use deepguard::{
    cli::{HostedCaptureFactory, TerminalPage},
    common::{Config, DevMode},
    core::{
        submit_feedback, AlertPresenter, AuthGate, DetectorAdapter, FileIdentityStore,
        FlowOutcome, HeadlessPage, IdentityProvider, Page, SimulatedWidgetFactory,
        VerificationOrchestrator, WidgetFactory,
    },
    protocol::{AlertCategory, Sentiment, TranscriptAnalysisRequest, TransactionBatchRequest, TransactionRecord},
    service::{ensure_backend_running, AlertStream, SessionApi, SessionClient},
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "deepguard")]
#[command(about = "Liveness verification client")]
struct Cli {
    /// Enable development mode (local dev backend, simulated capture, ./dev_data)
    #[arg(long, global = true)]
    dev: bool,

    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a liveness verification
    Verify {
        /// Record the page instead of drawing it, and print a JSON summary
        #[arg(long)]
        headless: bool,
    },
    /// Store the identity used by the auth gate
    SignIn {
        #[arg(short, long)]
        email: String,
    },
    /// Forget the stored identity
    SignOut,
    /// Show the signed-in identity
    Whoami,
    /// Report a suspicious interaction
    Feedback {
        #[arg(short, long)]
        user_id: String,
        #[arg(short, long)]
        description: String,
    },
    /// Listen to the real-time alert channel
    Alerts,
    /// Push an alert to every alert channel subscriber (dev backend)
    PublishAlert {
        /// DEEPFAKE, PHISHING or TRANSACTION
        category: AlertCategory,
    },
    /// Score a call transcript for phishing (dev backend)
    AnalyzeTranscript {
        /// Transcript text
        text: String,
        /// POSITIVE, NEGATIVE, NEUTRAL or MIXED
        #[arg(short, long, default_value = "NEUTRAL")]
        sentiment: Sentiment,
    },
    /// Score a JSON array of transactions for Jamtara-style patterns (dev backend)
    AnalyzeTransactions {
        /// File holding `[{user_id, amount, location, timestamp}, ...]`
        file: PathBuf,
    },
    /// Print the resolved configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on mode
    setup_logging(cli.dev);

    let config = Config::resolve(cli.config.as_deref())?;
    let dev_mode = DevMode::new(cli.dev)?;

    match cli.command {
        Commands::Verify { headless } => {
            let outcome = run_verification(&config, &dev_mode, cli.config.as_deref(), headless).await?;
            if !matches!(outcome, FlowOutcome::Resolved { .. }) {
                std::process::exit(1);
            }
        }
        Commands::SignIn { email } => {
            let store = FileIdentityStore::new(dev_mode.identity_file());
            let identity = store.sign_in(&email)?;
            println!("✅ Signed in as {}", identity.email);
        }
        Commands::SignOut => {
            let page = TerminalPage::new(Vec::<String>::new());
            let gate = AuthGate::new(
                Box::new(FileIdentityStore::new(dev_mode.identity_file())),
                config.auth.login_url.clone(),
            );
            gate.sign_out(&page).await?;
        }
        Commands::Whoami => {
            let store = FileIdentityStore::new(dev_mode.identity_file());
            match store.current_identity().await? {
                Some(identity) => println!("{}", identity.email),
                None => {
                    println!("Not signed in");
                    std::process::exit(1);
                }
            }
        }
        Commands::Feedback { user_id, description } => {
            let client = SessionClient::new(&config.backend)?;
            if dev_mode.is_enabled() {
                ensure_backend_running(&client, &dev_mode, cli.config.as_deref()).await?;
            }
            let page = TerminalPage::new(Vec::<String>::new());
            if !submit_feedback(&client, &page, &user_id, &description).await {
                std::process::exit(1);
            }
        }
        Commands::Alerts => {
            let client = SessionClient::new(&config.backend)?;
            if dev_mode.is_enabled() {
                ensure_backend_running(&client, &dev_mode, cli.config.as_deref()).await?;
            }
            let page: Arc<dyn Page> = Arc::new(TerminalPage::new(Vec::<String>::new()));
            let presenter = AlertPresenter::new(page, Duration::from_millis(config.alerts.dismiss_delay_ms));

            let url = config.backend.alert_ws_url();
            println!("🔔 Listening for alerts on {} (Ctrl+C to stop)", url);
            let stream = AlertStream::connect(&url).await?;
            tokio::select! {
                result = stream.run(&presenter) => {
                    let shown = result?;
                    println!("Alert channel closed ({} alert(s) received)", shown);
                }
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        Commands::PublishAlert { category } => {
            let client = SessionClient::new(&config.backend)?;
            let delivered = client.publish_alert(category).await?;
            println!("{} alert delivered to {} subscriber(s)", category, delivered);
        }
        Commands::AnalyzeTranscript { text, sentiment } => {
            let client = SessionClient::new(&config.backend)?;
            if dev_mode.is_enabled() {
                ensure_backend_running(&client, &dev_mode, cli.config.as_deref()).await?;
            }
            let report = client
                .analyze_transcript(&TranscriptAnalysisRequest { transcript: text, sentiment })
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::AnalyzeTransactions { file } => {
            let transactions: Vec<TransactionRecord> = serde_json::from_slice(&std::fs::read(&file)?)?;
            let client = SessionClient::new(&config.backend)?;
            if dev_mode.is_enabled() {
                ensure_backend_running(&client, &dev_mode, cli.config.as_deref()).await?;
            }
            let report = client
                .analyze_transactions(&TransactionBatchRequest { transactions })
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::CheckConfig => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn run_verification(
    config: &Config,
    dev_mode: &DevMode,
    config_path: Option<&std::path::Path>,
    headless: bool,
) -> Result<FlowOutcome> {
    let client = Arc::new(SessionClient::new(&config.backend)?);
    if dev_mode.is_enabled() {
        ensure_backend_running(&client, dev_mode, config_path).await?;
    }

    let container = config.detector.container_id.clone();
    let headless_page = headless.then(|| Arc::new(HeadlessPage::new([container.clone()])));
    let page: Arc<dyn Page> = match &headless_page {
        Some(page) => page.clone(),
        None => Arc::new(TerminalPage::new([container])),
    };

    let presenter = AlertPresenter::new(page.clone(), Duration::from_millis(config.alerts.dismiss_delay_ms));

    let factory: Box<dyn WidgetFactory> = if dev_mode.is_enabled() {
        Box::new(SimulatedWidgetFactory::new(Duration::from_millis(config.detector.simulated_delay_ms)))
    } else {
        Box::new(HostedCaptureFactory::new(config.detector.capture_url.clone()))
    };
    let detector = DetectorAdapter::new(
        factory,
        config.detector.region.clone(),
        Duration::from_secs(config.detector.completion_timeout_secs),
    );

    let api: Arc<dyn SessionApi> = client;
    let mut orchestrator = VerificationOrchestrator::new(config, api, detector, presenter.clone(), page);
    if config.auth.enabled {
        let gate = AuthGate::new(
            Box::new(FileIdentityStore::new(dev_mode.identity_file())),
            config.auth.login_url.clone(),
        );
        orchestrator = orchestrator.with_auth_gate(gate);
    }

    // The alert channel is optional; the flow runs without it
    let alert_task = match AlertStream::connect(&config.backend.alert_ws_url()).await {
        Ok(stream) => {
            let presenter = presenter.clone();
            Some(tokio::spawn(async move { stream.run(&presenter).await }))
        }
        Err(e) => {
            tracing::warn!("Alert channel unavailable: {}", e);
            None
        }
    };

    let outcome = orchestrator.run().await;

    if let Some(task) = alert_task {
        task.abort();
    }

    if let Some(page) = headless_page {
        let state = page.snapshot();
        let summary = serde_json::json!({
            "outcome": match &outcome {
                FlowOutcome::Resolved { .. } => "resolved",
                FlowOutcome::Redirected => "redirected",
                FlowOutcome::Failed(_) => "failed",
            },
            "error": match &outcome {
                FlowOutcome::Failed(reason) => Some(reason.clone()),
                _ => None,
            },
            "result_text": state.result_text,
            "alerts": state.alert_history.iter().map(|a| a.text.clone()).collect::<Vec<_>>(),
            "signed_in_as": state.sign_out_label,
            "redirected_to": state.redirected_to,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(outcome)
}

fn setup_logging(dev_mode: bool) {
    if dev_mode {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(tracing::Level::DEBUG)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .init();
    }
}
