//! Interactive client entry point.
//!
//! The REPL runs on a blocking task and only ever calls the bridge's
//! non-blocking operations; server events are printed by the bridge
//! callback as they arrive.

use std::sync::Arc;

use rustyline::error::ReadlineError;

use crate::bridge::{BridgeError, ChatBridge};

/// Connect to the broker and run the interactive prompt until `/quit`,
/// ctrl-c, or EOF.
pub async fn run_client(server_addr: &str, client_id: &str) -> Result<(), BridgeError> {
    let bridge = Arc::new(
        ChatBridge::connect(server_addr, client_id, |line: &str| println!("{line}")).await?,
    );

    println!("Connected to {server_addr} as '{client_id}'");
    println!("Commands: /create <room>, /join <room>, /quit. Anything else is chat.");

    let repl_bridge = bridge.clone();
    match tokio::task::spawn_blocking(move || repl_loop(&repl_bridge)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("REPL error: {e}"),
        Err(e) => tracing::warn!("REPL task failed: {e}"),
    }

    bridge.shutdown().await;
    Ok(())
}

fn repl_loop(bridge: &ChatBridge) -> Result<(), ReadlineError> {
    let mut editor = rustyline::DefaultEditor::new()?;

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e),
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(line);

        let result = if let Some(room) = line.strip_prefix("/join ") {
            bridge.request_join(room.trim())
        } else if let Some(room) = line.strip_prefix("/create ") {
            bridge.request_create_room(room.trim())
        } else if line == "/quit" {
            break;
        } else {
            bridge.submit_chat(line)
        };

        match result {
            Ok(()) => {}
            // Queue is gone, the worker stopped: nothing more to do here.
            Err(BridgeError::Disconnected) => break,
            Err(e) => println!("--- {e} ---"),
        }
    }

    Ok(())
}
