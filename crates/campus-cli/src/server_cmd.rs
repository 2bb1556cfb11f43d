//! Server subcommands: show or change the API server.

use std::io::{self, Write};

use campus_core::ServerTarget;

#[derive(clap::Subcommand, Debug)]
pub enum ServerAction {
    /// Print the current server and its status page.
    Show,
    /// Switch to another server.
    Set {
        /// Base URL, e.g. `https://api.campus.example`.
        url: String,
    },
}

/// Execute a server subcommand against an already loaded target.
pub fn run(action: ServerAction, target: &mut ServerTarget) -> anyhow::Result<()> {
    let mut out = io::stdout();
    match action {
        ServerAction::Show => match target.url() {
            Some(url) => {
                writeln!(out, "Server: {url}")?;
                if let Some(status) = target.status_page_url() {
                    writeln!(out, "Status: {status}")?;
                }
            }
            None => writeln!(out, "No server configured. Use `campus server set <url>`")?,
        },
        ServerAction::Set { url } => {
            if target.set(&url)? {
                writeln!(out, "Server set to {url}")?;
            } else {
                writeln!(out, "Server unchanged")?;
            }
        }
    }
    Ok(())
}
