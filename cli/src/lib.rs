mod args;
mod output;

use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use aurora_backend_client::BackendOrchestrator;
use aurora_backend_client::cancellable;
use aurora_core::AssistantService;
use aurora_core::Config;
use aurora_core::Started;
use aurora_core::TerminalService;
use aurora_exec::OutputChunk;
use aurora_exec::OutputStream;
use supports_color::Stream;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::error::TryRecvError;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

pub use args::AnalyzeArgs;
pub use args::ChatArgs;
pub use args::Cli;
pub use args::Command;
pub use args::ExecArgs;
pub use args::HealthArgs;
pub use args::ImproveArgs;
pub use args::IndexArgs;
pub use args::SearchArgs;

use crate::output::Printer;

const DEFAULT_LOG_LEVEL: &str = "error";

/// Runs one subcommand and returns the process exit code.
pub async fn run_main(cli: Cli) -> Result<i32> {
    init_tracing();

    let mut config = Config::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(url) = cli.backend_url {
        config.backend.base_url = url;
    }
    if let Some(url) = cli.direct_url {
        config.direct_api.base_url = Some(url);
    }
    let printer = Printer::new(supports_color::on(Stream::Stdout).is_some());

    match cli.command {
        Command::Exec(args) => run_exec(&config, args).await,
        Command::Health(args) => {
            let orchestrator = BackendOrchestrator::with_reqwest(config.orchestrator_config());
            orchestrator.check_health().await;
            let state = orchestrator.connection();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                printer.connection(&state);
            }
            Ok(if state.is_connected { 0 } else { 1 })
        }
        command => {
            let assistant = connect_assistant(&config).await;
            let token = interrupt_token();
            match command {
                Command::Chat(args) => {
                    let reply = cancellable(&token, async {
                        Ok(assistant.answer(&args.prompt, args.context.as_deref()).await)
                    })
                    .await??;
                    println!("{reply}");
                }
                Command::Analyze(args) => {
                    let content = read_input(args.file.as_deref())?;
                    let analysis = cancellable(&token, async {
                        Ok(assistant.analyze_page(&content, &args.url).await)
                    })
                    .await??;
                    printer.page_analysis(&analysis);
                }
                Command::Improve(args) => {
                    let code = read_input(args.file.as_deref())?;
                    let improvement = cancellable(&token, async {
                        Ok(assistant
                            .suggest_code_improvements(&code, &args.description)
                            .await)
                    })
                    .await??;
                    printer.code_improvement(&improvement);
                }
                Command::Search(args) => {
                    let response = cancellable(&token, async {
                        Ok(assistant
                            .search_content_with_limit(&args.query, args.limit)
                            .await)
                    })
                    .await??;
                    printer.search(&response);
                }
                Command::Index(args) => {
                    let content = read_input(args.file.as_deref())?;
                    let indexed = cancellable(&token, async {
                        Ok(assistant
                            .index_webpage(&args.title, &content, &args.url)
                            .await)
                    })
                    .await?;
                    if !indexed {
                        let reason = assistant
                            .last_error()
                            .unwrap_or_else(|| "indexing failed".to_string());
                        anyhow::bail!("{}: {reason}", args.url);
                    }
                    println!("indexed {}", args.url);
                }
                Command::Exec(_) | Command::Health(_) => {}
            }
            Ok(0)
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_LEVEL))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(supports_color::on(Stream::Stderr).is_some())
        .with_writer(std::io::stderr)
        .with_filter(env_filter);
    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}

/// Builds the assistant after one health check so the first request already
/// goes to the right transport.
async fn connect_assistant(config: &Config) -> AssistantService {
    let orchestrator = BackendOrchestrator::with_reqwest(config.orchestrator_config());
    if !orchestrator.check_health().await {
        debug!(url = %config.backend.base_url, "backend unreachable; using direct API");
    }
    AssistantService::new(Arc::new(orchestrator))
}

/// Fires on Ctrl-C.
fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

async fn run_exec(config: &Config, args: ExecArgs) -> Result<i32> {
    let mut terminal_config = config.terminal.clone();
    if let Some(level) = args.security_level {
        terminal_config.security_level = level;
    }
    let terminal = TerminalService::from_config(&terminal_config);
    let command = args.command_line();

    let handle = match terminal.start(&command)? {
        Started::Rejected(result) => {
            eprintln!("{}", result.output());
            return Ok(result.exit_code());
        }
        Started::Running(handle) => handle,
    };
    let mut chunks = handle.subscribe();
    let finished = terminal.finish(handle);
    tokio::pin!(finished);

    let mut streaming = true;
    let result = loop {
        tokio::select! {
            result = &mut finished => break result,
            chunk = chunks.recv(), if streaming => match chunk {
                Ok(chunk) => write_chunk(&chunk)?,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "output fell behind; chunks dropped");
                }
                Err(RecvError::Closed) => streaming = false,
            },
            _ = tokio::signal::ctrl_c() => {
                terminal.cancel_current();
            }
        }
    };
    loop {
        match chunks.try_recv() {
            Ok(chunk) => write_chunk(&chunk)?,
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "output fell behind; chunks dropped");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    Ok(result.exit_code())
}

fn write_chunk(chunk: &OutputChunk) -> Result<()> {
    match chunk.stream {
        OutputStream::Stdout => {
            let mut out = std::io::stdout().lock();
            out.write_all(&chunk.bytes)?;
            out.flush()?;
        }
        OutputStream::Stderr => {
            let mut err = std::io::stderr().lock();
            err.write_all(&chunk.bytes)?;
            err.flush()?;
        }
    }
    Ok(())
}
