//! Layered configuration resolution: defaults → `.babylonrc.json` → `.env`
//! + process environment → CLI flags. Each layer only overrides fields it
//! actually sets.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::Args;

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub working_directory: PathBuf,
    pub persistence_path: PathBuf,
    pub default_provider: String,
    pub default_model: String,
    pub renderer: String,
    pub max_depth: u32,
    pub max_retries: usize,
    pub max_composite_cycles: u32,
    pub budget_dollars: Option<f64>,
    pub use_cli: bool,
    pub verbose: bool,
    pub run_log_path: Option<PathBuf>,
    pub reviewer_model: Option<String>,
    pub economy_mode: bool,
    pub complexity_direct_threshold: f64,
    pub max_context_turns: Option<usize>,
    pub oversight_probability: f64,
    pub max_oversight_per_composite: u32,
    pub oversight_repeated_tool_count: u32,
    pub oversight_long_step_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            persistence_path: cwd.join(".babylon"),
            working_directory: cwd,
            default_provider: "anthropic".to_string(),
            default_model: "claude-sonnet".to_string(),
            renderer: "terminal".to_string(),
            max_depth: 2,
            max_retries: 2,
            max_composite_cycles: 2,
            budget_dollars: None,
            use_cli: true,
            verbose: false,
            run_log_path: None,
            reviewer_model: None,
            economy_mode: false,
            complexity_direct_threshold: 0.35,
            max_context_turns: None,
            oversight_probability: 0.25,
            max_oversight_per_composite: 2,
            oversight_repeated_tool_count: 3,
            oversight_long_step_seconds: 90,
        }
    }
}

/// Raw shape of `.babylonrc.json`. Every field optional; absent fields fall
/// through to the next-lower-precedence layer.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RcFile {
    openai_api_key: Option<String>,
    anthropic_api_key: Option<String>,
    working_directory: Option<PathBuf>,
    persistence_path: Option<PathBuf>,
    default_provider: Option<String>,
    default_model: Option<String>,
    renderer: Option<String>,
    max_depth: Option<u32>,
    max_retries: Option<usize>,
    max_composite_cycles: Option<u32>,
    budget_dollars: Option<f64>,
    use_cli: Option<bool>,
    verbose: Option<bool>,
    run_log_path: Option<PathBuf>,
    reviewer_model: Option<String>,
    economy_mode: Option<bool>,
    complexity_direct_threshold: Option<f64>,
    max_context_turns: Option<usize>,
    oversight_probability: Option<f64>,
    max_oversight_per_composite: Option<u32>,
    oversight_thresholds: Option<OversightThresholds>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct OversightThresholds {
    repeated_tool_count: Option<u32>,
    long_step_seconds: Option<u64>,
}

impl Config {
    /// Merge defaults, `.babylonrc.json`, `.env` + environment, and CLI
    /// flags (in that increasing order of precedence) into one `Config`.
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut config = Config::default();

        let rc_dir = args.cwd.clone().unwrap_or_else(|| config.working_directory.clone());
        if let Some(rc) = read_rc_file(&rc_dir)? {
            config.apply_rc(rc);
        }

        let env_vars = parse_dot_env(&rc_dir.join(".env"));
        if let Some(key) = env_vars
            .get("OPENAI_API_KEY")
            .cloned()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        {
            config.openai_api_key = Some(key);
        }
        if let Some(key) = env_vars
            .get("ANTHROPIC_API_KEY")
            .cloned()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
        {
            config.anthropic_api_key = Some(key);
        }

        config.apply_cli(args);

        Ok(config)
    }

    fn apply_rc(&mut self, rc: RcFile) {
        if let Some(v) = rc.openai_api_key {
            self.openai_api_key = Some(v);
        }
        if let Some(v) = rc.anthropic_api_key {
            self.anthropic_api_key = Some(v);
        }
        if let Some(v) = rc.working_directory {
            self.working_directory = v;
        }
        if let Some(v) = rc.persistence_path {
            self.persistence_path = v;
        }
        if let Some(v) = rc.default_provider {
            self.default_provider = v;
        }
        if let Some(v) = rc.default_model {
            self.default_model = v;
        }
        if let Some(v) = rc.renderer {
            self.renderer = v;
        }
        if let Some(v) = rc.max_depth {
            self.max_depth = v;
        }
        if let Some(v) = rc.max_retries {
            self.max_retries = v;
        }
        if let Some(v) = rc.max_composite_cycles {
            self.max_composite_cycles = v;
        }
        if let Some(v) = rc.budget_dollars {
            self.budget_dollars = Some(v);
        }
        if let Some(v) = rc.use_cli {
            self.use_cli = v;
        }
        if let Some(v) = rc.verbose {
            self.verbose = v;
        }
        if let Some(v) = rc.run_log_path {
            self.run_log_path = Some(v);
        }
        if let Some(v) = rc.reviewer_model {
            self.reviewer_model = Some(v);
        }
        if let Some(v) = rc.economy_mode {
            self.economy_mode = v;
        }
        if let Some(v) = rc.complexity_direct_threshold {
            self.complexity_direct_threshold = v;
        }
        if let Some(v) = rc.max_context_turns {
            self.max_context_turns = Some(v);
        }
        if let Some(v) = rc.oversight_probability {
            self.oversight_probability = v;
        }
        if let Some(v) = rc.max_oversight_per_composite {
            self.max_oversight_per_composite = v;
        }
        if let Some(thresholds) = rc.oversight_thresholds {
            if let Some(v) = thresholds.repeated_tool_count {
                self.oversight_repeated_tool_count = v;
            }
            if let Some(v) = thresholds.long_step_seconds {
                self.oversight_long_step_seconds = v;
            }
        }
    }

    fn apply_cli(&mut self, args: &Args) {
        if let Some(v) = &args.provider {
            self.default_provider = v.clone();
        }
        if let Some(v) = &args.model {
            self.default_model = v.clone();
        }
        if let Some(v) = &args.renderer {
            self.renderer = v.clone();
        }
        if let Some(v) = args.budget {
            self.budget_dollars = Some(v);
        }
        if let Some(v) = args.max_depth {
            self.max_depth = v;
        }
        if args.no_cli {
            self.use_cli = false;
        }
        if let Some(v) = &args.cwd {
            self.working_directory = v.clone();
        }
        if args.verbose {
            self.verbose = true;
        }
        if let Some(v) = &args.reviewer_model {
            self.reviewer_model = Some(v.clone());
        }
        if args.economy {
            self.economy_mode = true;
        }
        if let Some(v) = args.complexity_threshold {
            self.complexity_direct_threshold = v;
        }
        if let Some(v) = args.max_context_turns {
            self.max_context_turns = Some(v);
        }
        if let Some(name) = &args.name {
            let generations_root = self.working_directory.join("generations");
            let next = next_generation_number(&generations_root);
            let generation_dir = generations_root.join(format!("{next:02}-{name}"));
            self.working_directory = generation_dir.join("output");
            self.run_log_path = Some(generation_dir.join("run.txt"));
        }
    }
}

/// One past the highest `<NN>-` prefix already present under `generations/`,
/// so repeated `--name` runs land in sibling directories instead of
/// colliding. Starts at 1 if the directory is missing or empty.
fn next_generation_number(generations_root: &Path) -> u32 {
    let Ok(entries) = std::fs::read_dir(generations_root) else {
        return 1;
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|name| name.split('-').next().map(str::to_string))
        .filter_map(|prefix| prefix.parse::<u32>().ok())
        .max()
        .map_or(1, |highest| highest + 1)
}

fn read_rc_file(dir: &Path) -> Result<Option<RcFile>> {
    let path = dir.join(".babylonrc.json");
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let rc: RcFile = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(rc))
}

/// Parses `KEY=VALUE` lines, stripping a leading `export ` and ignoring
/// `#`-comments and blank lines. Missing file yields an empty map.
fn parse_dot_env(path: &Path) -> HashMap<String, String> {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return HashMap::new();
    };
    raw.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            Some((key.trim().to_string(), value.trim().trim_matches('"').to_string()))
        })
        .collect()
}
