//! CLI surface: one `run <description>` subcommand.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Recursive multi-agent workflow engine", long_about = None)]
pub struct Args {
    /// The task description to run.
    pub description: String,

    /// LLM provider for roles that don't override it.
    #[arg(long)]
    pub provider: Option<String>,

    /// Model name for roles that don't override it.
    #[arg(long)]
    pub model: Option<String>,

    /// Event renderer: terminal, log, or none.
    #[arg(long)]
    pub renderer: Option<String>,

    /// Monetary budget ceiling in dollars; unlimited if omitted.
    #[arg(long)]
    pub budget: Option<f64>,

    /// Maximum decomposition recursion depth.
    #[arg(long = "max-depth")]
    pub max_depth: Option<u32>,

    /// Disable the invoke_cursor_cli tool for this run.
    #[arg(long = "no-cli", default_value_t = false)]
    pub no_cli: bool,

    /// Working directory for the run (defaults to the current directory).
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Raise log verbosity to debug.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,

    /// Force this model for the reviewer role.
    #[arg(long = "reviewer-model")]
    pub reviewer_model: Option<String>,

    /// Trim turn budgets and prefer the cheap path for small tasks.
    #[arg(long, default_value_t = false)]
    pub economy: bool,

    /// Complexity at or below which a task skips decomposition.
    #[arg(long = "complexity-threshold")]
    pub complexity_threshold: Option<f64>,

    /// Cap the number of recent turns kept in an agent's context window.
    #[arg(long = "max-context-turns")]
    pub max_context_turns: Option<usize>,

    /// Run name: working directory becomes generations/run-<name>/output.
    #[arg(long)]
    pub name: Option<String>,
}
