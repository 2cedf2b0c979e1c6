//! `PopLedger` - fetch new mail from a POP3 mailbox and print it as JSON.
//!
//! Progress is logged to stderr; stdout carries only the JSON document.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use popledger_core::MailboxSession;

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "popledger=debug,popledger_core=debug,popledger_pop3=debug"
    } else {
        "popledger=info,popledger_core=info,popledger_pop3=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config.unwrap_or_else(popledger_core::default_config_path);
    let state_path = cli.state.unwrap_or_else(popledger_core::default_seen_path);

    let config = popledger_core::load_config(&config_path).await?;
    let mut seen = popledger_core::load_seen(&state_path)
        .await
        .with_context(|| format!("Failed to load {}", state_path.display()))?;

    info!(host = %config.host, user = %config.username, known = seen.len(), "Starting PopLedger");

    let fetch_all = cli.all;
    let known = seen.clone();
    let (result, retrieved) = MailboxSession::with_session(&config, |session| {
        Box::pin(async move {
            let stat = session.stat().await?;
            info!(messages = stat.count, octets = stat.size, "Maildrop");

            let result = if fetch_all {
                session.fetch_all().await?
            } else {
                session.fetch_new(&known).await?
            };
            Ok((result, session.retrieved().clone()))
        })
    })
    .await?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    let before = seen.len();
    seen.extend(retrieved.iter().cloned());
    if seen.len() != before {
        popledger_core::save_seen(&state_path, &seen)
            .await
            .with_context(|| format!("Failed to save {}", state_path.display()))?;
    }

    info!(fetched = result.len(), newly_seen = seen.len() - before, "Done");
    Ok(())
}
