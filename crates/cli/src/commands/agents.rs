//! `switchboard list | create | knowledge-agent | update | delete`

use clap::Args;
use std::io::{self, BufRead, Write};
use switchboard_agent::personas;
use switchboard_config::AppConfig;
use switchboard_core::{AgentSummary, NewAgent, ProfileDefaults, ProfileUpdate};

use super::prompt::Prompter;
use super::{CliResult, management_provider, open_router};

#[derive(Args, Debug, Default)]
pub struct CreateArgs {
    /// Agent ID (e.g. sales-agent)
    pub id: Option<String>,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// System prompt (the agent's instructions)
    #[arg(long)]
    pub prompt: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    /// Sampling temperature, 0.0-1.0
    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Tool to enable; repeat or separate with commas
    #[arg(long = "tool", value_delimiter = ',')]
    pub tools: Vec<String>,

    /// Sender to assign right away; repeat or separate with commas
    #[arg(long = "sender", value_delimiter = ',')]
    pub senders: Vec<String>,

    /// Ask for each field instead of reading flags
    #[arg(short, long)]
    pub interactive: bool,
}

impl CreateArgs {
    pub fn into_new_agent(self) -> Result<NewAgent, String> {
        let id = self.id.ok_or("an agent ID is required (or use --interactive)")?;
        let name = self.name.ok_or("--name is required")?;
        let prompt = self.prompt.ok_or("--prompt is required")?;

        let mut agent = NewAgent::new(id, name, prompt);
        agent.description = self.description;
        agent.model = self.model;
        agent.temperature = self.temperature;
        agent.max_tokens = self.max_tokens;
        if !self.tools.is_empty() {
            agent = agent.with_tools(self.tools);
        }
        Ok(agent.with_senders(self.senders))
    }
}

#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub prompt: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Replace the enabled tool list
    #[arg(long = "tool", value_delimiter = ',')]
    pub tools: Option<Vec<String>>,

    #[arg(long, conflicts_with = "disable_tools")]
    pub enable_tools: bool,

    #[arg(long)]
    pub disable_tools: bool,
}

impl UpdateArgs {
    pub fn to_update(&self) -> ProfileUpdate {
        let tools_enabled = match (self.enable_tools, self.disable_tools) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        ProfileUpdate {
            name: self.name.clone(),
            description: self.description.clone(),
            system_prompt: self.prompt.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools_enabled,
            enabled_tools: self.tools.clone(),
        }
    }
}

pub async fn list(config: &AppConfig) -> CliResult {
    let router = open_router(config, management_provider(config)).await?;
    let agents = router.list_agents().await?;

    println!("\n=== Available Agents ===\n");
    if agents.is_empty() {
        println!("No agents yet. Create one with `switchboard create --interactive`.");
    }
    for agent in &agents {
        print!("{}", render_summary(agent));
    }
    Ok(())
}

fn render_summary(agent: &AgentSummary) -> String {
    let mut out = format!(
        "Agent ID: {}\nName: {}\nDescription: {}\n",
        agent.agent_id, agent.name, agent.description
    );
    if agent.tools_enabled && !agent.enabled_tools.is_empty() {
        out.push_str(&format!("Tools: {}\n", agent.enabled_tools.join(", ")));
    }
    out.push_str(&format!("Assigned Senders ({}):\n", agent.assigned_senders.len()));
    if agent.assigned_senders.is_empty() {
        out.push_str("  (none)\n");
    }
    for sender in &agent.assigned_senders {
        out.push_str(&format!("  - {sender}\n"));
    }
    out.push('\n');
    out
}

pub async fn create(config: &AppConfig, args: CreateArgs) -> CliResult {
    let request = if args.interactive {
        let tools = switchboard_tools::default_registry(&config.tools);
        let mut prompter = Prompter::stdio();
        match read_new_agent(&mut prompter, &config.agent_defaults.to_profile_defaults(), &tools.names())? {
            Some(request) => request,
            None => return Ok(()),
        }
    } else {
        args.into_new_agent()?
    };

    let router = open_router(config, management_provider(config)).await?;
    let agent = router.create_agent(request).await?;
    let profile = agent.profile().await;

    println!("✓ Created agent: {}", profile.agent_id);
    if profile.wants_tools() {
        println!("✓ Tools enabled: {}", profile.enabled_tools.join(", "));
    }
    println!("\nAssign senders with:");
    println!("  switchboard assign <sender> {}", profile.agent_id);
    Ok(())
}

/// Walk through every field of a new agent. Returns `None` when a required
/// answer is missing.
pub fn read_new_agent<R: BufRead, W: Write>(
    p: &mut Prompter<R, W>,
    defaults: &ProfileDefaults,
    available_tools: &[&str],
) -> io::Result<Option<NewAgent>> {
    p.say("\n=== Create New Agent ===\n")?;

    let id = p.ask("Agent ID (e.g., sales-agent): ")?;
    if id.is_empty() {
        p.say("Agent ID is required")?;
        return Ok(None);
    }
    let name = p.ask("Agent Name (e.g., Sales Assistant): ")?;
    if name.is_empty() {
        p.say("Agent name is required")?;
        return Ok(None);
    }
    let description = p.ask("Description: ")?;

    p.say("\nSystem Prompt (instructions for the agent):")?;
    p.say("Enter your prompt, then press Enter twice when done.\n")?;
    let prompt = p.ask_multiline()?;
    if prompt.is_empty() {
        p.say("System prompt is required")?;
        return Ok(None);
    }

    let model = p.ask_or(&format!("Model (default: {}): ", defaults.model), &defaults.model)?;
    let temperature = p.ask(&format!("Temperature 0.0-1.0 (default: {}): ", defaults.temperature))?;
    let max_tokens = p.ask(&format!("Max Tokens (default: {}): ", defaults.max_tokens))?;

    let mut agent = NewAgent::new(id, name, prompt)
        .with_description(description)
        .with_model(model);
    agent.temperature = parse_or_warn(p, &temperature, "temperature")?;
    agent.max_tokens = parse_or_warn(p, &max_tokens, "max tokens")?;

    if p.confirm("Enable tools? (yes/no, default: no): ")? {
        p.say("\nAvailable tools:")?;
        for tool in available_tools {
            p.say(&format!("  - {tool}"))?;
        }
        let chosen = p.ask("Enabled tools, comma separated (default: none): ")?;
        let tools: Vec<String> = chosen
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        agent = agent.with_tools(tools);
    }

    Ok(Some(agent))
}

fn parse_or_warn<T: std::str::FromStr, R: BufRead, W: Write>(
    p: &mut Prompter<R, W>,
    answer: &str,
    field: &str,
) -> io::Result<Option<T>> {
    if answer.is_empty() {
        return Ok(None);
    }
    match answer.parse() {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            p.say(&format!("Could not read {field} '{answer}', using the default"))?;
            Ok(None)
        }
    }
}

pub async fn knowledge_agent(config: &AppConfig, id: String, name: String) -> CliResult {
    let router = open_router(config, management_provider(config)).await?;
    let agent = router.create_agent(personas::knowledge_agent(id, name)).await?;
    let profile = agent.profile().await;

    println!("✓ Created knowledge agent: {}", profile.agent_id);
    println!("  Tools: {}", profile.enabled_tools.join(", "));
    if config.tools.knowledge_base_path.is_none() {
        println!("\n⚠️  tools.knowledge_base_path is not set; the agent will answer without it.");
    }
    println!("\nAssign senders with:");
    println!("  switchboard assign <sender> {}", profile.agent_id);
    Ok(())
}

pub async fn update(config: &AppConfig, args: UpdateArgs) -> CliResult {
    let update = args.to_update();
    if update.is_empty() {
        return Err("nothing to update; pass at least one field".into());
    }
    let router = open_router(config, management_provider(config)).await?;
    let profile = router.update_agent(&args.id, update).await?;
    println!("✓ Updated agent: {}", profile.agent_id);
    Ok(())
}

pub async fn delete(config: &AppConfig, agent_id: &str, yes: bool) -> CliResult {
    let router = open_router(config, management_provider(config)).await?;
    if router.is_protected(agent_id) {
        return Err(format!("{agent_id} is a built-in agent and cannot be deleted").into());
    }
    if !yes {
        let mut prompter = Prompter::stdio();
        if !prompter.confirm(&format!("Delete agent '{agent_id}'? (yes/no): "))? {
            println!("Deletion cancelled");
            return Ok(());
        }
    }
    router.delete_agent(agent_id).await?;
    println!("✓ Deleted agent: {agent_id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn flags_build_a_request() {
        let args = CreateArgs {
            id: Some("sales".into()),
            name: Some("Sales Bot".into()),
            prompt: Some("Sell politely.".into()),
            temperature: Some(0.3),
            tools: vec!["current_time".into()],
            senders: vec!["+1555".into()],
            ..Default::default()
        };
        let request = args.into_new_agent().unwrap();
        assert_eq!(request.agent_id, "sales");
        assert_eq!(request.temperature, Some(0.3));
        assert!(request.tools_enabled);
        assert_eq!(request.assigned_senders, vec!["+1555"]);
        assert!(request.model.is_none());
    }

    #[test]
    fn flags_require_id_name_and_prompt() {
        let args = CreateArgs {
            id: Some("sales".into()),
            name: Some("Sales Bot".into()),
            ..Default::default()
        };
        let err = args.into_new_agent().unwrap_err();
        assert!(err.contains("--prompt"));
    }

    #[test]
    fn interactive_walkthrough() {
        let input = "sales\nSales Bot\nSells things\nYou sell.\nKindly.\n\n\n\n0.4\nlots\nyes\ncurrent_time, query_knowledge_base\n";
        let mut p = prompter(input);
        let request = read_new_agent(&mut p, &ProfileDefaults::default(), &["current_time"])
            .unwrap()
            .unwrap();

        assert_eq!(request.agent_id, "sales");
        assert_eq!(request.description.as_deref(), Some("Sells things"));
        assert_eq!(request.system_prompt, "You sell.\nKindly.");
        assert_eq!(request.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(request.temperature, Some(0.4));
        assert_eq!(request.max_tokens, None);
        assert_eq!(request.enabled_tools, vec!["current_time", "query_knowledge_base"]);

        let transcript = String::from_utf8(p.into_output()).unwrap();
        assert!(transcript.contains("Could not read max tokens 'lots'"));
    }

    #[test]
    fn interactive_stops_without_a_name() {
        let mut p = prompter("sales\n\n");
        assert!(read_new_agent(&mut p, &ProfileDefaults::default(), &[]).unwrap().is_none());
    }

    #[test]
    fn update_flags_map_to_partial_update() {
        let args = UpdateArgs {
            id: "sales".into(),
            max_tokens: Some(300),
            disable_tools: true,
            ..Default::default()
        };
        let update = args.to_update();
        assert_eq!(update.max_tokens, Some(300));
        assert_eq!(update.tools_enabled, Some(false));
        assert!(update.name.is_none());

        let empty = UpdateArgs {
            id: "sales".into(),
            ..Default::default()
        };
        assert!(empty.to_update().is_empty());
    }

    #[test]
    fn summary_lists_senders_and_tools() {
        let summary = AgentSummary {
            agent_id: "kb".into(),
            name: "KB".into(),
            description: "docs".into(),
            assigned_senders: vec!["+1".into()],
            enabled_tools: vec!["query_knowledge_base".into()],
            tools_enabled: true,
        };
        let text = render_summary(&summary);
        assert!(text.contains("Tools: query_knowledge_base"));
        assert!(text.contains("Assigned Senders (1):\n  - +1"));
    }
}
