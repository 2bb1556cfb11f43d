//! Auth subcommands: login, logout, status.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};
use std::path::Path;

use campus_core::{Config, ServerTarget};
use campus_session::{SessionCredential, check_token, sign_in};

use crate::client::CampusClient;

/// Auth subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum AuthAction {
    /// Sign in and store the token.
    Login {
        /// User ID.
        #[arg(short, long)]
        user: String,
        /// Password.
        #[arg(short, long, env = "CAMPUS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored token.
    Logout,
    /// Ask the server whether the stored token is still valid.
    Status,
}

/// Execute an auth subcommand.
pub async fn run(
    action: AuthAction,
    config: &Config,
    target: &ServerTarget,
    credential_path: &Path,
) -> anyhow::Result<()> {
    match action {
        AuthAction::Login { user, password } => {
            let client = CampusClient::connect_or_explain(config, target).await?;
            login(&client, credential_path, &user, &password).await
        }
        AuthAction::Logout => logout(credential_path),
        AuthAction::Status => status(config, target, credential_path).await,
    }
}

async fn login(
    client: &CampusClient,
    credential_path: &Path,
    user: &str,
    password: &str,
) -> anyhow::Result<()> {
    let credential = sign_in(&client.dispatcher, user, password).await?;
    credential.save(credential_path)?;

    let mut out = io::stdout();
    writeln!(out, "Logged in as {}", credential.user_id)?;
    Ok(())
}

fn logout(credential_path: &Path) -> anyhow::Result<()> {
    SessionCredential::clear(credential_path)?;
    let mut out = io::stdout();
    writeln!(out, "Logged out")?;
    Ok(())
}

async fn status(
    config: &Config,
    target: &ServerTarget,
    credential_path: &Path,
) -> anyhow::Result<()> {
    let mut out = io::stdout();
    let Some(credential) = SessionCredential::load(credential_path)? else {
        writeln!(out, "Not logged in")?;
        return Ok(());
    };

    let client = CampusClient::connect_or_explain(config, target).await?;
    if check_token(&client.dispatcher, &credential).await? {
        writeln!(out, "Logged in as: {}", credential.user_id)?;
    } else {
        writeln!(out, "Token for {} has expired; log in again", credential.user_id)?;
    }
    Ok(())
}
