//! Per-role model configuration and the tested-shape defaults table.

use crate::task::Role;

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub role: Role,
    pub system_prompt: String,
    pub model: ModelConfig,
    pub max_turns: usize,
    /// Keep only the system message, first user message, and the last N
    /// assistant-message-bounded suffix. `None` sends the full history.
    pub max_context_turns: Option<usize>,
}

/// temperature, maxTokens, maxTurns per role — the tested-shape defaults
/// from the external interface table. Implementers may override via
/// config; these are what `AgentConfig::defaults_for` returns unmodified.
pub fn role_defaults(role: Role) -> (f32, u32, usize) {
    match role {
        Role::Analyzer => (0.3, 4096, 5),
        Role::Planner => (0.5, 8192, 8),
        Role::Executor => (0.2, 16384, 20),
        Role::Reviewer => (0.1, 8192, 8),
        Role::Coordinator => (0.4, 8192, 10),
        Role::Steward => (0.2, 4096, 3),
        Role::Oracle => (0.1, 2048, 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executor_defaults_match_the_tested_shape() {
        let (temperature, max_tokens, max_turns) = role_defaults(Role::Executor);
        assert_eq!(temperature, 0.2);
        assert_eq!(max_tokens, 16384);
        assert_eq!(max_turns, 20);
    }

    #[test]
    fn steward_and_oracle_get_small_turn_budgets() {
        assert_eq!(role_defaults(Role::Steward).2, 3);
        assert_eq!(role_defaults(Role::Oracle).2, 2);
    }
}
