#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use smallsh::config::{CliAction, ShellConfig};
use smallsh::error::{self, ShellError};
use smallsh::executor::Executor;
use smallsh::jobs::{PollingReaper, Reaper, ReaperStrategy, SignalReaper};
use smallsh::runtime::Runtime;
use smallsh::signal::{self, ForegroundOnly};
use std::env;
use std::io::{self, Write};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    let mut config = match ShellConfig::from_env() {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };
    match config.apply_args(&args) {
        Ok(CliAction::Run) => {}
        Ok(CliAction::Help) => {
            print_help();
            return Ok(());
        }
        Ok(CliAction::Version) => {
            println!("smallsh {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Err(e) => exit_with(&e),
    }

    init_logging(&config.log_filter);
    init_environment_variables();

    signal::ignore_interrupts().context("failed to ignore SIGINT")?;
    let foreground_only = ForegroundOnly::new();
    foreground_only
        .install()
        .context("failed to install SIGTSTP action")?;

    let reaper: Box<dyn Reaper> = match config.reaper {
        ReaperStrategy::Poll => Box::new(PollingReaper::new(config.job_slots)),
        ReaperStrategy::Signal => {
            Box::new(SignalReaper::install().context("failed to install SIGCHLD action")?)
        }
    };
    info!(
        reaper = config.reaper.as_str(),
        job_slots = config.job_slots,
        "starting shell"
    );

    let mut executor = Executor::with_reaper(Runtime::new(foreground_only), reaper);
    let outcome = run_interactive(&mut executor, &config.prompt);
    executor.shutdown();
    outcome
}

/// Print a startup error and leave with its exit code.
fn exit_with(err: &ShellError) -> ! {
    eprintln!("{}", error::render(err));
    std::process::exit(err.exit_code())
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn init_environment_variables() {
    // `cd` with no argument needs $HOME
    if env::var_os("HOME").is_none() {
        if let Some(home) = dirs::home_dir() {
            env::set_var("HOME", home);
        }
    }
}

fn run_interactive(executor: &mut Executor, prompt: &str) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();

    loop {
        {
            let mut out = io::stdout().lock();
            for job in executor.reap_finished() {
                writeln!(out, "{}", job)?;
            }
            write!(out, "{}", prompt)?;
            out.flush()?;
        }

        line.clear();
        match smallsh::input::read_line(&mut input, &mut line) {
            Ok(0) => {
                debug!("end of input");
                return Ok(());
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                // SIGTSTP toggle: its message is out, prompt again
                debug!("read interrupted");
                continue;
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!(error = %e, "skipping unreadable input line");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "stdin failed, leaving");
                return Ok(());
            }
        }

        match executor.execute_line(line.trim_end()) {
            Ok(result) => {
                if !result.stdout.is_empty() {
                    let mut out = io::stdout().lock();
                    out.write_all(result.stdout.as_bytes())?;
                    out.flush()?;
                }
                if !result.stderr.is_empty() {
                    eprint!("{}", result.stderr);
                }
                if result.exit_shell {
                    return Ok(());
                }
            }
            Err(e) if e.is_fatal() => {
                tracing::error!(code = e.error_code(), "fatal: {}", e);
                eprintln!("{}", error::render(&e));
                executor.shutdown();
                std::process::exit(e.exit_code());
            }
            Err(e) => eprintln!("{}", error::render(&e)),
        }
    }
}

fn print_help() {
    println!("smallsh v{} - a small interactive shell", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage:");
    println!("  smallsh                      Start the interactive shell");
    println!("  smallsh --reaper <poll|signal>");
    println!("                               Choose how finished background jobs are collected");
    println!("  smallsh --job-slots <n>      Background table capacity (poll strategy)");
    println!("  smallsh --prompt <text>      Prompt printed before each line");
    println!("  smallsh -V, --version        Show the version");
    println!("  smallsh -h, --help           Show this help message");
    println!();
    println!("Built-ins:");
    println!("  exit          Wait for children and leave");
    println!("  status        Report how the last foreground command ended");
    println!("  cd [dir]      Change directory (default $HOME)");
    println!();
    println!("Environment:");
    println!("  SMALLSH_REAPER, SMALLSH_JOB_SLOTS, SMALLSH_PROMPT");
    println!("  SMALLSH_LOG            tracing filter, default \"warn\"");
    println!("  SMALLSH_ERROR_FORMAT   set to \"json\" for JSON error output");
}
