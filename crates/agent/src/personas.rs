//! Built-in personas.
//!
//! Personas are plain [`NewAgent`] values. Bootstrapping writes any that are
//! missing into the profile store; from then on they are ordinary profiles.

use switchboard_core::NewAgent;

const PERSONA_MODEL: &str = "gpt-4o-mini";

pub const FRIENDLY_AGENT: &str = "friendly-agent";
pub const PROFESSIONAL_AGENT: &str = "professional-agent";
pub const SUPPORT_AGENT: &str = "support-agent";
pub const DEFAULT_AGENT: &str = "default-agent";

/// Id used by the knowledge-base preset when none is given.
pub const KNOWLEDGE_AGENT: &str = "knowledge-agent";

/// The four built-in personas, in bootstrap order.
pub fn builtins() -> Vec<NewAgent> {
    vec![
        NewAgent::new(
            FRIENDLY_AGENT,
            "Friendly Assistant",
            "You are a warm, upbeat assistant chatting with a friend. Keep the tone \
             casual and natural, show genuine interest in what the person says, and \
             keep replies short enough to read comfortably on a phone.",
        )
        .with_description("A warm and friendly conversational agent for casual chats")
        .with_model(PERSONA_MODEL)
        .with_temperature(0.8)
        .with_max_tokens(500),
        NewAgent::new(
            PROFESSIONAL_AGENT,
            "Professional Assistant",
            "You are a professional assistant for work conversations. Be clear, \
             precise and courteous. Help with planning, scheduling, drafting and \
             other business tasks, and prefer structured answers when they help.",
        )
        .with_description("A professional business assistant for work-related conversations")
        .with_model(PERSONA_MODEL)
        .with_temperature(0.5)
        .with_max_tokens(700),
        NewAgent::new(
            SUPPORT_AGENT,
            "Customer Support Assistant",
            "You are a customer support agent. Listen carefully, acknowledge the \
             problem, and walk the customer toward a solution step by step. Stay \
             patient and kind. If you do not know an answer, say so and explain \
             how the customer can get further help.",
        )
        .with_description("A helpful customer support agent for handling inquiries and issues")
        .with_model(PERSONA_MODEL)
        .with_temperature(0.6)
        .with_max_tokens(800),
        NewAgent::new(
            DEFAULT_AGENT,
            "Default Assistant",
            "You are a helpful general-purpose assistant. Answer questions, help \
             with everyday tasks and adapt your tone to the person you are talking to.",
        )
        .with_description("A general-purpose assistant for handling all unassigned conversations")
        .with_model(PERSONA_MODEL)
        .with_temperature(0.7)
        .with_max_tokens(800),
    ]
}

pub fn builtin_ids() -> Vec<&'static str> {
    vec![FRIENDLY_AGENT, PROFESSIONAL_AGENT, SUPPORT_AGENT, DEFAULT_AGENT]
}

/// A knowledge-base agent wired to the `query_knowledge_base` tool.
pub fn knowledge_agent(agent_id: impl Into<String>, name: impl Into<String>) -> NewAgent {
    NewAgent::new(
        agent_id,
        name,
        "You are a knowledge assistant with access to the team's knowledge base.\n\n\
         When a question might be answered by the documentation:\n\
         1. Search the knowledge base with the query_knowledge_base tool\n\
         2. Summarize what you found in plain language\n\
         3. Include page URLs so the user can read more\n\
         4. If nothing relevant turns up, say so and suggest a different search\n\n\
         Cite your sources and never invent content that is not in the knowledge base.",
    )
    .with_description("Answers questions from the knowledge base")
    .with_model(PERSONA_MODEL)
    .with_temperature(0.5)
    .with_max_tokens(1500)
    .with_tools(["query_knowledge_base"])
}
