use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::Parser;

use taskforge_core::coordinator::{resolve_provider_name, StdinPrompter};
use taskforge_core::{Coordinator, ModelClient};
use taskforge_policy::{PolicyEngine, PolicyStore};

mod repl;

pub const STATE_DIR: &str = ".taskforge";

const KNOWN_PROVIDERS: &[&str] = &["gemini", "chatgpt", "claude", "mistral"];

#[derive(Parser)]
#[command(name = "taskforge")]
#[command(about = "AI-mediated command execution assistant", long_about = None)]
struct Cli {
    /// LLM provider to use (gemini | chatgpt | claude | mistral)
    #[arg(long)]
    provider: Option<String>,

    /// Free-text request; the interactive shell starts when omitted
    #[arg(trailing_var_arg = true)]
    prompt: Vec<String>,
}

/// Appends the operator trace to `.taskforge/debug.log`.
#[derive(Clone)]
struct DebugLogWriter(Arc<Mutex<std::fs::File>>);

impl Write for DebugLogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut file) => file.write(buf),
            Err(_) => Err(std::io::Error::other("log writer poisoned")),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.0.lock() {
            Ok(mut file) => file.flush(),
            Err(_) => Err(std::io::Error::other("log writer poisoned")),
        }
    }
}

fn init_logging(state_dir: &PathBuf) -> anyhow::Result<()> {
    fs::create_dir_all(state_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(state_dir.join("debug.log"))?;
    let writer = DebugLogWriter(Arc::new(Mutex::new(file)));

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,taskforge_core=debug,taskforge_executor=debug,taskforge_policy=debug"
                    .into()
            }),
        )
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(provider) = &cli.provider {
        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            eprintln!("Error: Invalid provider '{}'", provider);
            eprintln!("Valid providers: {}", KNOWN_PROVIDERS.join(", "));
            return ExitCode::from(1);
        }
    }

    let workdir = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error: cannot determine working directory: {}", e);
            return ExitCode::from(1);
        }
    };
    let state_dir = workdir.join(STATE_DIR);

    if let Err(e) = init_logging(&state_dir) {
        eprintln!("Error: cannot open debug log: {}", e);
        return ExitCode::from(1);
    }

    // policy problems are configuration failures: exit status 2
    let policy = match PolicyStore::new(&state_dir).load_or_init() {
        Ok(document) => match PolicyEngine::new(document, workdir) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(2);
            }
        },
        Err(e) => {
            eprintln!("Error: failed to load {}/policy.json: {}", STATE_DIR, e);
            eprintln!("Fix the file or delete it to regenerate the defaults.");
            return ExitCode::from(2);
        }
    };

    let provider = cli
        .provider
        .as_deref()
        .map(resolve_provider_name);
    let model = match ModelClient::new(provider, &policy) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    let coordinator = Coordinator::new(Box::new(model), policy, Box::new(StdinPrompter));

    if cli.prompt.is_empty() {
        let mut shell = match repl::Repl::new(coordinator, state_dir) {
            Ok(shell) => shell,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(1);
            }
        };
        match shell.run().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::from(1)
            }
        }
    } else {
        let prompt = cli.prompt.join(" ");
        let mut coordinator = coordinator;
        match coordinator.run(&prompt).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::from(1)
            }
        }
    }
}
