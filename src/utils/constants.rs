//! Well-known paths and defaults.

/// Where agent cards are served (A2A v0.3+).
pub const AGENT_CARD_WELL_KNOWN_PATH: &str = "/.well-known/agent-card.json";

/// The pre-v0.3 agent card path, still served for older clients.
pub const PREV_AGENT_CARD_WELL_KNOWN_PATH: &str = "/.well-known/agent.json";

/// Default mount point for the JSON-RPC endpoint.
pub const DEFAULT_RPC_PATH: &str = "/a2a";
