//! The seam to the (opaque, out-of-scope) role system prompts. The babylon
//! binary crate supplies the concrete text assets; the engine only needs
//! to look one up by role.

use crate::task::Role;

pub trait PromptProvider: Send + Sync {
    fn system_prompt(&self, role: Role) -> &str;
}
