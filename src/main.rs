use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use solvrapad::config::PadConfig;
use solvrapad::session::PadSession;
use solvrapad::terminal::{report, PadTerminal};

#[derive(Debug, ClapParser)]
#[command(
    name = "solvrapad",
    about = "Notebook-style shell that turns cells into importable modules.",
    version
)]
struct Args {
    /// Replay a recorded session transcript (.svp) instead of starting the REPL.
    transcript: Option<PathBuf>,

    /// Disable ANSI colors in rendered output (also SOLVRAPAD_NO_COLOR=1).
    #[arg(long)]
    no_color: bool,

    /// Print registry mutations as [trace] lines (also SOLVRAPAD_TRACE=1).
    #[arg(long)]
    trace: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let no_color = args.no_color || flag_from_env("SOLVRAPAD_NO_COLOR");
    let trace = args.trace || flag_from_env("SOLVRAPAD_TRACE");

    match args.transcript {
        Some(path) => {
            let mut session = PadSession::new(!no_color);
            session.set_trace(trace);
            replay_transcript(&path, session)
        }
        None => {
            let (config, _config_path) = PadConfig::load()?;
            let mut session = PadSession::new(config.color && !no_color);
            session.set_trace(trace);
            let mut terminal = PadTerminal::new(config, session)?;
            terminal.run()
        }
    }
}

/// Feed a recorded transcript line by line, printing outcomes as the
/// interactive shell would. Errors in user cells are reported and the
/// replay continues with the next line, matching the REPL.
fn replay_transcript(path: &Path, mut session: PadSession) -> Result<()> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    for line in text.lines() {
        report(session.feed(line));
    }
    Ok(())
}

fn flag_from_env(name: &str) -> bool {
    env::var(name).map(|value| value != "0").unwrap_or(false)
}
