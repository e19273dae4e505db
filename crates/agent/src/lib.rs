//! Agents and routing for Switchboard.
//!
//! An [`Agent`] is one persona bound to a model, a tool registry and a
//! history store. It answers a message with at most one tool round trip:
//!
//! 1. **Record** the inbound turn
//! 2. **Build context** (persona + recent history)
//! 3. **Call the model**, offering the agent's enabled tools
//! 4. **If tool calls**: execute them, send the results, call the model once more
//! 5. **Record** the reply and return it
//!
//! The [`AgentRouter`] holds every live agent and maps senders to agents by
//! explicit assignment.

pub mod agent;
pub mod personas;
pub mod router;

#[cfg(test)]
mod test_helpers;

pub use agent::{Agent, AgentSettings};
pub use router::{AgentRouter, Dispatch, RouterSettings};
