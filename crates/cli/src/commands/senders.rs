//! `switchboard assign | unassign | clear-history | conversations`

use switchboard_config::AppConfig;
use switchboard_core::ConversationSummary;

use super::{CliResult, management_provider, open_router, preview};

pub async fn assign(config: &AppConfig, sender: &str, agent_id: &str) -> CliResult {
    let router = open_router(config, management_provider(config)).await?;
    router.assign(sender, agent_id).await?;
    println!("✓ Assigned {sender} to agent {agent_id}");
    Ok(())
}

pub async fn unassign(config: &AppConfig, sender: &str, agent_id: &str) -> CliResult {
    let router = open_router(config, management_provider(config)).await?;
    router.unassign(sender, agent_id).await?;
    println!("✓ Unassigned {sender} from agent {agent_id}");
    Ok(())
}

pub async fn clear_history(config: &AppConfig, sender: &str, agent_id: &str) -> CliResult {
    let router = open_router(config, management_provider(config)).await?;
    let removed = router.clear_history(sender, agent_id).await?;
    println!("✓ Cleared {removed} messages between {sender} and agent {agent_id}");
    Ok(())
}

pub async fn conversations(config: &AppConfig, agent_id: &str) -> CliResult {
    let router = open_router(config, management_provider(config)).await?;
    let agent = router
        .get_agent(agent_id)
        .await
        .ok_or_else(|| format!("Agent {agent_id} not found"))?;
    let conversations = router.conversations(agent_id).await?;

    println!("\n=== Conversations for {} ===\n", agent.profile().await.name);
    if conversations.is_empty() {
        println!("No conversations found.");
    }
    for conversation in &conversations {
        print!("{}", render_conversation(conversation));
    }
    Ok(())
}

fn render_conversation(c: &ConversationSummary) -> String {
    let name = if c.sender_name.is_empty() { "Unknown" } else { &c.sender_name };
    format!(
        "Sender: {name} ({})\nMessages: {}\nLast message: {}\nLast activity: {}\n\n",
        c.sender,
        c.message_count,
        preview(&c.last_message, 50),
        c.last_timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn conversation_rendering() {
        let summary = ConversationSummary {
            sender: "+1555".into(),
            sender_name: String::new(),
            last_message: "x".repeat(60),
            last_timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
            message_count: 7,
        };
        let text = render_conversation(&summary);
        assert!(text.starts_with("Sender: Unknown (+1555)\nMessages: 7\n"));
        assert!(text.contains(&format!("Last message: {}...", "x".repeat(50))));
        assert!(text.contains("Last activity: 2024-03-01 12:30:00 UTC"));
    }
}
