//! shelldiff CLI - run a command and report what it changed
//!
//! Tracked files (`--modifies`) are snapshotted before the command runs and
//! compared afterward; the result is printed as JSON on stdout.

mod logging;
mod render;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use shelldiff_core::application::constants::{
    DEFAULT_DIFF_CONTEXT_LINES, DEFAULT_ENV_ALLOWLIST, DEFAULT_MAX_DIFF_BYTES,
};
use shelldiff_core::application::{
    to_host_result, ModificationTracker, TrackedRunService, TrackerConfig,
};
use shelldiff_core::domain::{CommandRequest, ModuleArgs, TrackedPaths};
use shelldiff_core::port::time_provider::SystemTimeProvider;
use shelldiff_infra_system::{LocalFileProbe, SubprocessExecutor};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit status when the command failed or could not run
const EXIT_COMMAND_FAILED: u8 = 2;

#[derive(Parser)]
#[command(name = "shelldiff")]
#[command(about = "Run a command and report changes to tracked files", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log format: pretty or json
    #[arg(long, env = "SHELLDIFF_LOG_FORMAT", default_value = "pretty", global = true)]
    log_format: String,

    /// Debug logging for shelldiff crates
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Lines of context in unified diffs
    #[arg(long, env = "SHELLDIFF_DIFF_CONTEXT", default_value_t = DEFAULT_DIFF_CONTEXT_LINES, global = true)]
    diff_context: usize,

    /// Files larger than this are fingerprinted instead of diffed
    #[arg(long, env = "SHELLDIFF_MAX_DIFF_BYTES", default_value_t = DEFAULT_MAX_DIFF_BYTES, global = true)]
    max_diff_bytes: u64,

    /// Environment variables passed to the command (comma separated)
    #[arg(long, env = "SHELLDIFF_ENV_ALLOWLIST", value_delimiter = ',', global = true)]
    env_allowlist: Option<Vec<String>>,

    /// Also print colored diffs of changed files to stderr
    #[arg(long, global = true)]
    diff: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command given on the command line
    Run(RunArgs),

    /// Run a command described by a module-style JSON args document
    Module {
        /// Path to the JSON document, or "-" for stdin
        #[arg(default_value = "-")]
        args_file: String,
    },
}

#[derive(Args)]
struct RunArgs {
    /// File whose content the command may change (repeatable)
    #[arg(short, long = "modifies", value_name = "PATH")]
    modifies: Vec<String>,

    /// Change into this directory before running the command
    #[arg(long)]
    chdir: Option<String>,

    /// Run the command through /bin/sh -c
    #[arg(long)]
    shell: bool,

    /// Data to pass on the command's stdin
    #[arg(long)]
    stdin: Option<String>,

    /// Do not append a newline to --stdin data
    #[arg(long)]
    no_stdin_newline: bool,

    /// Pass $VAR and ~ through literally
    #[arg(long)]
    no_expand_vars: bool,

    /// Keep trailing empty lines in stdout/stderr
    #[arg(long)]
    keep_empty_ends: bool,

    /// Kill the command after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Command and arguments
    #[arg(last = true, required = true, value_name = "COMMAND")]
    argv: Vec<String>,
}

impl RunArgs {
    fn into_module_args(self) -> Result<ModuleArgs> {
        let mut command = if self.shell {
            CommandRequest::shell(self.argv.join(" "))
        } else {
            CommandRequest::new(self.argv)
        };
        command.chdir = self.chdir;
        command.stdin = self.stdin;
        command.stdin_add_newline = !self.no_stdin_newline;
        command.expand_argument_vars = !self.no_expand_vars;
        command.strip_empty_ends = !self.keep_empty_ends;
        command.timeout_ms = self.timeout_ms;

        let modifies = if self.modifies.is_empty() {
            None
        } else {
            Some(TrackedPaths::new(self.modifies).context("Invalid --modifies")?)
        };

        Ok(ModuleArgs { command, modifies })
    }
}

fn read_module_args(args_file: &str) -> Result<ModuleArgs> {
    let raw = if args_file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read args from stdin")?;
        buf
    } else {
        std::fs::read_to_string(args_file)
            .with_context(|| format!("Failed to read args file {}", args_file))?
    };

    let value: serde_json::Value = serde_json::from_str(&raw).context("Invalid JSON args")?;
    ModuleArgs::from_json(&value).context("Invalid module args")
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    logging::init(&cli.log_format, cli.verbose);
    info!("shelldiff v{} starting", VERSION);

    // Input errors surface here, before anything runs
    let module_args = match cli.command {
        Commands::Run(run) => run.into_module_args()?,
        Commands::Module { args_file } => read_module_args(&args_file)?,
    };

    // DI wiring
    let time_provider = Arc::new(SystemTimeProvider);
    let env_allowlist = cli.env_allowlist.unwrap_or_else(|| {
        DEFAULT_ENV_ALLOWLIST
            .iter()
            .map(|name| name.to_string())
            .collect()
    });
    let executor = Arc::new(SubprocessExecutor::new(time_provider.clone(), env_allowlist));
    let tracker = Arc::new(ModificationTracker::new(
        Arc::new(LocalFileProbe::new()),
        TrackerConfig {
            diff_context_lines: cli.diff_context,
            max_diff_bytes: cli.max_diff_bytes,
        },
    ));
    let service = TrackedRunService::new(tracker, executor, time_provider);

    let outcome = service.run(module_args).await?;

    if cli.diff {
        if let Some(tracking) = &outcome.tracking {
            eprint!("{}", render::render_tracking(tracking));
        }
    }

    let result = to_host_result(&outcome);
    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("Failed to serialize result")?
    );

    if result.failed {
        Ok(ExitCode::from(EXIT_COMMAND_FAILED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
