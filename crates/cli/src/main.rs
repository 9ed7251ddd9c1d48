mod api_client;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};

use cinegate_vault::{CredentialStore, LockOptions, RefreshGate};

#[derive(Parser)]
#[command(name = "cinegatectl", version, about = "Control tool for cinegated")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage the stored credential pair
    Token {
        #[command(subcommand)]
        command: TokenCommand,
    },
    /// Inspect the server's task queue
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },
}

#[derive(Subcommand)]
enum TokenCommand {
    /// Merge the given values into the stored pair, keeping fields you omit
    Set {
        #[arg(long, default_value = "")]
        refresh_token: String,
        #[arg(long, default_value = "")]
        access_token: String,
        #[command(flatten)]
        vault: VaultArgs,
    },
    /// Replace the stored pair outright
    Write {
        #[arg(long)]
        refresh_token: String,
        #[arg(long)]
        access_token: String,
        #[command(flatten)]
        vault: VaultArgs,
    },
    /// Print the stored pair with the secrets masked
    Show {
        #[command(flatten)]
        vault: VaultArgs,
    },
}

#[derive(Args)]
struct VaultArgs {
    /// Directory holding the token file
    #[arg(long, env = "CINEGATE_VAULT__DATA_DIR", default_value = "./data")]
    data_dir: String,
    /// Seconds to wait for the token file lock
    #[arg(long, default_value_t = 5)]
    lock_timeout: u64,
    /// Fail immediately if another process holds the lock
    #[arg(long)]
    no_wait: bool,
}

impl VaultArgs {
    fn open_store(&self) -> CredentialStore {
        let lock = LockOptions {
            timeout: Duration::from_secs(self.lock_timeout),
            nonblocking: self.no_wait,
        };
        CredentialStore::new(&self.data_dir, lock, Arc::new(RefreshGate::new()))
    }
}

#[derive(Subcommand)]
enum QueueCommand {
    /// Show per-state task counts
    Status {
        /// Base URL of the running cinegated instance
        #[arg(long, env = "CINEGATE_SERVER_URL", default_value = "http://127.0.0.1:8095")]
        server: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Token { command } => token_command(command).await,
        Command::Queue {
            command: QueueCommand::Status { server },
        } => queue_status(&server).await,
    }
}

async fn token_command(command: TokenCommand) -> anyhow::Result<()> {
    match command {
        TokenCommand::Set {
            refresh_token,
            access_token,
            vault,
        } => {
            if refresh_token.is_empty() && access_token.is_empty() {
                bail!("nothing to set: pass --refresh-token and/or --access-token");
            }
            let store = vault.open_store();
            store
                .update(&refresh_token, &access_token)
                .await
                .context("failed to update the token file")?;
            println!("tokens updated ({})", store.token_path().display());
        }
        TokenCommand::Write {
            refresh_token,
            access_token,
            vault,
        } => {
            let store = vault.open_store();
            store
                .write(&refresh_token, &access_token)
                .await
                .context("failed to write the token file")?;
            println!("tokens written ({})", store.token_path().display());
        }
        TokenCommand::Show { vault } => {
            let store = vault.open_store();
            let pair = store
                .read()
                .await
                .context("failed to read the token file")?;
            if pair.is_empty() {
                println!("no tokens stored ({})", store.token_path().display());
                return Ok(());
            }
            println!("refresh_token: {}", mask(&pair.refresh_token));
            println!("access_token:  {}", mask(&pair.access_token));
            match pair.updated_at {
                Some(at) => println!("updated_at:    {at}"),
                None => println!("updated_at:    unknown"),
            }
        }
    }
    Ok(())
}

async fn queue_status(server: &str) -> anyhow::Result<()> {
    let status = api_client::queue_status(server).await?;
    println!("pending:    {}", status.pending);
    println!("processing: {}", status.processing);
    println!("completed:  {}", status.completed);
    println!("failed:     {}", status.failed);
    println!("executing:  {}", status.executing);
    Ok(())
}

/// Keeps just enough of a secret visible to tell two tokens apart.
fn mask(secret: &str) -> String {
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        let head: String = secret.chars().take(4).collect();
        let tail: String = secret
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{head}****{tail}")
    }
}
