//! Interactive command interface
//!
//! A line-oriented loop reading operator commands and answering them from
//! the shared store. The blocking line read is the only suspension point;
//! the ingestion task keeps running on the runtime's worker threads.

mod session;

pub use session::{COMMANDS, Command, Input, LineSource, PROMPT, ReplError, ReplSession, ScriptedInput, SessionEnd};

use std::sync::Arc;

use eyre::Result;
use rustyline::DefaultEditor;

use crate::remote::LastItemClient;
use crate::store::Store;

/// Run the interactive REPL on stdin/stdout
pub async fn run_interactive(store: Arc<Store>, remote: Option<LastItemClient>, source: &str) -> Result<SessionEnd> {
    let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

    let mut session = ReplSession::new(store, remote, std::io::stdout());
    session.print_welcome(source)?;
    Ok(session.run(&mut rl).await?)
}
