use std::path::PathBuf;

use aurora_execpolicy::SecurityLevel;
use clap::Parser;
use clap::Subcommand;
use url::Url;

/// Terminal front end for the Aurora command executor and AI assistant.
#[derive(Debug, Parser)]
#[command(name = "aurora", version)]
pub struct Cli {
    /// Config file to load instead of `$AURORA_HOME/config.toml`.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override `[backend] base_url`.
    #[arg(long = "backend-url", global = true, value_name = "URL")]
    pub backend_url: Option<String>,

    /// Override `[direct_api] base_url`.
    #[arg(long = "direct-url", global = true, value_name = "URL")]
    pub direct_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a shell command through the security policy.
    Exec(ExecArgs),
    /// Ask the assistant a question.
    Chat(ChatArgs),
    /// Probe the local backend and show the connection state.
    Health(HealthArgs),
    /// Summarize a web page read from a file or stdin.
    Analyze(AnalyzeArgs),
    /// Ask for improvements to a piece of code read from a file or stdin.
    Improve(ImproveArgs),
    /// Search the backend's index.
    Search(SearchArgs),
    /// Add a page read from a file or stdin to the backend's index.
    Index(IndexArgs),
}

#[derive(Debug, Parser)]
pub struct ExecArgs {
    /// Override `[terminal] security_level` (low|medium|high|custom).
    #[arg(long = "security-level", value_name = "LEVEL")]
    pub security_level: Option<SecurityLevel>,

    /// Command line for `<shell> -c`. Quote it as one argument
    /// (`aurora exec "grep 'a b' notes.txt"`): separate words are joined
    /// with single spaces and lose their original quoting.
    #[arg(trailing_var_arg = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl ExecArgs {
    /// The string handed to the shell.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

#[derive(Debug, Parser)]
pub struct ChatArgs {
    pub prompt: String,

    /// Page text the answer should be grounded in.
    #[arg(long)]
    pub context: Option<String>,
}

#[derive(Debug, Parser)]
pub struct HealthArgs {
    /// Print the connection state as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct AnalyzeArgs {
    #[arg(long)]
    pub url: Url,

    /// Page content; stdin when omitted.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct ImproveArgs {
    #[arg(long)]
    pub description: String,

    /// Source code; stdin when omitted.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct SearchArgs {
    pub query: String,

    #[arg(long, default_value_t = aurora_backend_client::DEFAULT_SEARCH_LIMIT)]
    pub limit: usize,
}

#[derive(Debug, Parser)]
pub struct IndexArgs {
    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub url: Url,

    /// Page content; stdin when omitted.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}
