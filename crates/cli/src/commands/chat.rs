//! `switchboard chat`: push one message through the router, as a transport would.

use switchboard_agent::Dispatch;
use switchboard_config::AppConfig;

use super::{CliResult, open_router};

pub async fn run(
    config: &AppConfig,
    sender: &str,
    sender_name: &str,
    message: &str,
    recipient: Option<&str>,
) -> CliResult {
    let provider = switchboard_providers::build_from_config(config)
        .map_err(|e| format!("Cannot reach a model: {e}"))?;
    let router = open_router(config, provider).await?;

    let addressed = recipient.is_none_or(|to| router.is_addressed_to(to));
    match router.dispatch(message, sender, sender_name, addressed).await? {
        Dispatch::Reply(text) => println!("{text}"),
        Dispatch::NoAgent => eprintln!("No agent is assigned to {sender}; nothing sent."),
        Dispatch::Ignored => eprintln!("Message is not addressed to this router; ignored."),
    }
    Ok(())
}
