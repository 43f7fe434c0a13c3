//! Terminal and REPL implementation backed by rustyline.

use crate::config::PadConfig;
use crate::history::HistoryManager;
use crate::interpreter::ScriptError;
use crate::session::{CellOutcome, PadSession};
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// SolvraPad interactive terminal driving user interaction.
pub struct PadTerminal {
    session: PadSession,
    editor: DefaultEditor,
    history: HistoryManager,
    prompt: String,
    continuation: String,
}

impl PadTerminal {
    /// Create a terminal around an already-configured session.
    pub fn new(config: PadConfig, session: PadSession) -> Result<Self> {
        let history = HistoryManager::load(config.history_size)?;
        let mut editor = DefaultEditor::new()?;
        for entry in history.entries() {
            let _ = editor.add_history_entry(entry.clone());
        }
        Ok(Self {
            session,
            editor,
            history,
            prompt: config.prompt,
            continuation: config.continuation,
        })
    }

    /// Run the interactive loop until EOF.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let prompt = if self.session.in_cell() {
                &self.continuation
            } else {
                &self.prompt
            };
            match self.editor.readline(prompt) {
                Ok(line) => {
                    let _ = self.editor.add_history_entry(line.as_str());
                    self.history.add(&line);
                    report(self.session.feed(&line));
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("readline error: {err}");
                    break;
                }
            }
        }
        self.history.save()?;
        Ok(())
    }
}

/// Print a session outcome the way the interactive shell does.
///
/// Command diagnostics go to stdout and stay non-fatal; execution errors
/// from user source surface on stderr with their code, exactly as raised.
pub fn report(outcome: Result<CellOutcome, ScriptError>) {
    match outcome {
        Ok(CellOutcome::Pending) | Ok(CellOutcome::Quiet) => {}
        Ok(CellOutcome::Built { .. }) => {}
        Ok(CellOutcome::Value(value)) => println!("{value}"),
        Ok(CellOutcome::Listing(names)) => println!("{names:?}"),
        Ok(CellOutcome::Rendered(text)) => print!("{text}"),
        Ok(CellOutcome::Diagnostic(diag)) => println!("{diag}"),
        Err(error) => eprintln!("{error}"),
    }
}
