//! CLI subcommands: synth, validate, plan, snapshot, graph, schema, init.
//!
//! Every command that evaluates the descriptor resolves its configuration
//! the same way: defaults, then the YAML file, then the environment, then
//! flags.

use crate::core::config::{self, StackConfig};
use crate::core::descriptor::sample_asg_alb_stack;
use crate::core::keys::FileKeyProvider;
use crate::core::types::{ExecutionPlan, PlanAction, Stack, Template};
use crate::core::{planner, resolver, state, synth, validate};
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Flags shared by every command that evaluates the stack.
#[derive(Args, Debug, Clone, Default)]
pub struct StackArgs {
    /// Path to stackform.yaml (optional; defaults apply when missing)
    #[arg(short, long, default_value = "stackform.yaml")]
    pub config: PathBuf,

    /// Stack name
    #[arg(long)]
    pub stack_name: Option<String>,

    /// Target account (overrides AWS_ACCOUNT)
    #[arg(long)]
    pub account: Option<String>,

    /// Target region (overrides CDK_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Public key file embedded in the key pair
    #[arg(short, long)]
    pub key_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter stackform.yaml
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Synthesize the stack into a template
    Synth {
        #[command(flatten)]
        stack: StackArgs,

        /// Output directory (default: print to stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Check the declared topology without synthesizing
    Validate {
        #[command(flatten)]
        stack: StackArgs,
    },

    /// Show what changed since the last snapshot
    Plan {
        #[command(flatten)]
        stack: StackArgs,

        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,
    },

    /// Record the current synthesis as the plan baseline
    Snapshot {
        #[command(flatten)]
        stack: StackArgs,

        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,
    },

    /// Print constructs and resources in dependency order
    Graph {
        #[command(flatten)]
        stack: StackArgs,
    },

    /// Print the JSON Schema of stackform.yaml
    Schema,
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Synth { stack, out } => cmd_synth(&stack, out.as_deref()),
        Commands::Validate { stack } => cmd_validate(&stack),
        Commands::Plan { stack, state_dir } => cmd_plan(&stack, &state_dir),
        Commands::Snapshot { stack, state_dir } => cmd_snapshot(&stack, &state_dir),
        Commands::Graph { stack } => cmd_graph(&stack),
        Commands::Schema => cmd_schema(),
    }
}

/// Resolve the effective config: defaults < file < environment < flags.
pub fn resolve_config<F>(args: &StackArgs, lookup: F) -> Result<StackConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = config::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    cfg.apply_env(lookup);
    if let Some(name) = &args.stack_name {
        cfg.stack_name.clone_from(name);
    }
    if let Some(account) = &args.account {
        cfg.account = Some(account.clone());
    }
    if let Some(region) = &args.region {
        cfg.region.clone_from(region);
    }
    if let Some(key_file) = &args.key_file {
        cfg.key_path.clone_from(key_file);
    }
    Ok(cfg)
}

/// Evaluate the descriptor with the process environment and key file.
fn build_stack(args: &StackArgs) -> Result<Stack> {
    let cfg = resolve_config(args, |k| std::env::var(k).ok())?;
    let keys = FileKeyProvider::new(&cfg.key_path);
    let stack = sample_asg_alb_stack(&cfg, &keys)?;
    Ok(stack)
}

/// Log validation findings; synthesis never fails on them.
fn log_findings(stack: &Stack) {
    for finding in validate::validate_stack(stack) {
        warn!(stack = %stack.id, "{}", finding);
    }
}

fn build_template(args: &StackArgs) -> Result<(Stack, Template)> {
    let stack = build_stack(args)?;
    log_findings(&stack);
    let template = synth::synthesize(&stack)?;
    Ok((stack, template))
}

fn cmd_init(path: &Path) -> Result<()> {
    let config_path = path.join("stackform.yaml");
    if config_path.exists() {
        bail!("{} already exists", config_path.display());
    }
    std::fs::create_dir_all(path)
        .with_context(|| format!("cannot create {}", path.display()))?;

    let yaml = serde_yaml_ng::to_string(&StackConfig::default())
        .context("cannot serialize default config")?;
    let content = format!(
        "# stackform configuration. {} and {} override account and region.\n{}",
        config::ENV_ACCOUNT,
        config::ENV_REGION,
        yaml
    );
    std::fs::write(&config_path, content)
        .with_context(|| format!("cannot write {}", config_path.display()))?;

    println!("Initialized stackform project at {}", path.display());
    println!("  Created: {}", config_path.display());
    println!("  Set key_path to your public key before running synth.");
    Ok(())
}

fn cmd_synth(args: &StackArgs, out: Option<&Path>) -> Result<()> {
    let (stack, template) = build_template(args)?;
    let json = synth::to_json(&template)?;

    let Some(out) = out else {
        println!("{}", json);
        return Ok(());
    };

    std::fs::create_dir_all(out).with_context(|| format!("cannot create {}", out.display()))?;
    let path = out.join(format!("{}.template.json", stack.id));
    std::fs::write(&path, &json).with_context(|| format!("cannot write {}", path.display()))?;
    info!(path = %path.display(), "template written");

    println!(
        "Synthesized: {} ({} resources) -> {}",
        stack.id,
        template.resources.len(),
        path.display()
    );
    print_outputs(&stack);
    Ok(())
}

fn print_outputs(stack: &Stack) {
    if stack.outputs.is_empty() {
        return;
    }
    println!();
    println!("Outputs:");
    for (name, output) in &stack.outputs {
        println!("  {} = {}", name, output.token());
    }
}

fn cmd_validate(args: &StackArgs) -> Result<()> {
    let stack = build_stack(args)?;
    let findings = validate::validate_stack(&stack);

    for f in &findings {
        println!("  {}", f);
    }
    if validate::is_valid(&findings) {
        println!(
            "OK: {} ({} constructs, {} outputs)",
            stack.id,
            stack.constructs.len(),
            stack.outputs.len()
        );
        Ok(())
    } else {
        let count = findings.iter().filter(|f| f.is_error()).count();
        bail!("{} validation error(s)", count)
    }
}

fn cmd_plan(args: &StackArgs, state_dir: &Path) -> Result<()> {
    let (stack, template) = build_template(args)?;
    let lock = state::load_lock(state_dir, &stack.id)?;
    let plan = planner::plan(&template, lock.as_ref(), &stack.id)?;
    print_plan(&plan);
    Ok(())
}

/// Display a plan to stdout.
fn print_plan(plan: &ExecutionPlan) {
    println!("Planning: {} ({} resources)", plan.name, plan.changes.len());
    println!();

    for change in &plan.changes {
        let symbol = match change.action {
            PlanAction::Create => "+",
            PlanAction::Update => "~",
            PlanAction::Replace => "-/+",
            PlanAction::Destroy => "-",
            PlanAction::NoOp => " ",
        };
        println!("  {:>3} {}", symbol, change.description);
    }

    println!();
    println!(
        "Plan: {} to add, {} to change, {} to replace, {} to destroy, {} unchanged.",
        plan.to_create, plan.to_update, plan.to_replace, plan.to_destroy, plan.unchanged
    );
}

fn cmd_snapshot(args: &StackArgs, state_dir: &Path) -> Result<()> {
    let (stack, template) = build_template(args)?;
    let lock = state::snapshot(&template, &stack.id)?;
    let path = state::save_lock(state_dir, &lock)?;
    println!(
        "Snapshot: {} ({} resources) -> {}",
        stack.id,
        lock.resources.len(),
        path.display()
    );
    Ok(())
}

fn cmd_graph(args: &StackArgs) -> Result<()> {
    let stack = build_stack(args)?;
    let deps = resolver::construct_dependencies(&stack);
    let order = resolver::topo_sort(&deps)?;

    println!("{}:", stack.id);
    for (i, id) in order.iter().enumerate() {
        let kind = stack
            .get(id)
            .map(|c| c.kind().to_string())
            .unwrap_or_default();
        let mut after = deps.get(id).cloned().unwrap_or_default();
        after.sort();
        after.dedup();
        if after.is_empty() {
            println!("  {:>2}. {} ({})", i + 1, id, kind);
        } else {
            println!("  {:>2}. {} ({}) <- {}", i + 1, id, kind, after.join(", "));
        }
    }

    let template = synth::synthesize(&stack)?;
    println!();
    println!("Resources:");
    for (i, id) in resolver::resource_order(&template)?.iter().enumerate() {
        let ty = template
            .resources
            .get(id)
            .map(|r| r.resource_type.as_str())
            .unwrap_or_default();
        println!("  {:>2}. {} ({})", i + 1, id, ty);
    }
    Ok(())
}

fn cmd_schema() -> Result<()> {
    println!("{}", config::config_schema()?);
    Ok(())
}
