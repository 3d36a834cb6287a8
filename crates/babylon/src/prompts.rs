//! Concrete role system prompts. Text assets, loaded once at compile time
//! via `include_str!`; `coordination` only sees the [`PromptProvider`] seam.

use coordination::prompts::PromptProvider;
use coordination::task::Role;

const ANALYZER: &str = include_str!("prompts/analyzer.txt");
const PLANNER: &str = include_str!("prompts/planner.txt");
const EXECUTOR: &str = include_str!("prompts/executor.txt");
const REVIEWER: &str = include_str!("prompts/reviewer.txt");
const COORDINATOR: &str = include_str!("prompts/coordinator.txt");
const STEWARD: &str = include_str!("prompts/steward.txt");
const ORACLE: &str = include_str!("prompts/oracle.txt");

#[derive(Debug, Default, Clone, Copy)]
pub struct StaticPromptProvider;

impl PromptProvider for StaticPromptProvider {
    fn system_prompt(&self, role: Role) -> &str {
        match role {
            Role::Analyzer => ANALYZER,
            Role::Planner => PLANNER,
            Role::Executor => EXECUTOR,
            Role::Reviewer => REVIEWER,
            Role::Coordinator => COORDINATOR,
            Role::Steward => STEWARD,
            Role::Oracle => ORACLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_has_a_non_empty_prompt() {
        let provider = StaticPromptProvider;
        for role in [
            Role::Analyzer,
            Role::Planner,
            Role::Executor,
            Role::Reviewer,
            Role::Coordinator,
            Role::Steward,
            Role::Oracle,
        ] {
            assert!(!provider.system_prompt(role).trim().is_empty());
        }
    }
}
