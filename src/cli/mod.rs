//! DS-018: CLI subcommands.

use crate::core::inputs::{self, DeploymentInputs, RawInputs};
use crate::core::{codegen, parser, planner, resolver, stack, state, types};
use crate::resources::{bootstrap, rendezvous};
use crate::tripwire::{drift, eventlog, hasher};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const PROGRAM_FILE: &str = "Pulumi.yaml";
pub const BOOTSTRAP_FILE: &str = "user-data.sh";

#[derive(Parser, Debug)]
#[command(
    name = "devstack",
    version,
    about = "Typed AWS dev-stack declarations rendered to a Pulumi YAML program"
)]
pub struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Key material. Flags beat environment, environment beats the stack file.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Name of an existing EC2 key pair
    #[arg(long, env = "DEVSTACK_KEY_NAME")]
    pub key_name: Option<String>,

    /// Public key for a key pair declared by the stack
    #[arg(long, env = "DEVSTACK_PUBLIC_KEY")]
    pub public_key: Option<String>,

    /// Private key, PEM or base64-encoded PEM
    #[arg(long, env = "DEVSTACK_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new devstack project
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate devstack.yaml
    Validate {
        /// Path to devstack.yaml
        #[arg(short, long, default_value = "devstack.yaml")]
        file: PathBuf,
    },

    /// List the declarations a render would produce, in order
    Plan {
        /// Path to devstack.yaml
        #[arg(short, long, default_value = "devstack.yaml")]
        file: PathBuf,

        /// Show only one group (network, access-control, identity, compute, rendezvous)
        #[arg(short, long)]
        group: Option<String>,

        #[command(flatten)]
        inputs: InputArgs,
    },

    /// Write Pulumi.yaml and user-data.sh, record the render lock
    Render {
        /// Path to devstack.yaml
        #[arg(short, long, default_value = "devstack.yaml")]
        file: PathBuf,

        /// Output directory for rendered artifacts
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,

        #[command(flatten)]
        inputs: InputArgs,
    },

    /// Print the instance bootstrap script
    Bootstrap {
        /// Path to devstack.yaml
        #[arg(short, long, default_value = "devstack.yaml")]
        file: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Detect hand edits to rendered artifacts (tripwire)
    Drift {
        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,

        /// Check one stack only
        #[arg(short, long)]
        stack: Option<String>,

        /// Exit non-zero on any drift (for CI)
        #[arg(long)]
        tripwire: bool,
    },

    /// Show render locks and the last render event
    Status {
        /// State directory
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,

        /// Show one stack only
        #[arg(short, long)]
        stack: Option<String>,
    },

    /// Print the JSON schema of devstack.yaml
    Schema,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Plan {
            file,
            group,
            inputs,
        } => cmd_plan(&file, group.as_deref(), &inputs),
        Commands::Render {
            file,
            out,
            state_dir,
            inputs,
        } => cmd_render(&file, &out, &state_dir, &inputs),
        Commands::Bootstrap { file, out } => cmd_bootstrap(&file, out.as_deref()),
        Commands::Drift {
            state_dir,
            stack,
            tripwire,
        } => cmd_drift(&state_dir, stack.as_deref(), tripwire),
        Commands::Status { state_dir, stack } => cmd_status(&state_dir, stack.as_deref()),
        Commands::Schema => cmd_schema(),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "devstack", &mut std::io::stdout());
            Ok(())
        }
    }
}

const INIT_TEMPLATE: &str = r#"version: "1.0"
name: dev
description: "Single-instance dev environment"
region: ap-south-1

# Key material is usually supplied through the environment:
#   DEVSTACK_KEY_NAME or DEVSTACK_PUBLIC_KEY, plus DEVSTACK_PRIVATE_KEY
inputs: {}

network:
  vpc_cidr: 10.0.0.0/16
  public_subnet:
    cidr: 10.0.1.0/24
    availability_zone: ap-south-1c
  private_subnet:
    cidr: 10.0.2.0/24
    availability_zone: ap-south-1b
  # internet_gateway | isolated
  private_route: internet_gateway

compute:
  instance_type: t3.micro

rendezvous:
  parameter_name: publicIP
"#;

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("devstack.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }

    let state_dir = path.join("state");
    std::fs::create_dir_all(&state_dir).map_err(|e| format!("cannot create state dir: {}", e))?;
    std::fs::write(&config_path, INIT_TEMPLATE)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Initialized devstack project at {}", path.display());
    println!("  Created: {}", config_path.display());
    println!("  Created: {}/", state_dir.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let config = parser::parse_config_file(file)?;
    let errors = parser::validate_config(&config);

    if errors.is_empty() {
        println!(
            "OK: {} ({}, {} containers, rendezvous '{}')",
            config.name,
            config.region,
            config.bootstrap.containers.len(),
            config.rendezvous.parameter_name
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

/// Parse and validate a stack file, returning errors if invalid.
fn parse_and_validate(file: &Path) -> Result<types::StackConfig, String> {
    let config = parser::parse_config_file(file)?;
    let errors = parser::validate_config(&config);
    if errors.is_empty() {
        return Ok(config);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err("validation failed".to_string())
}

/// Stack file inputs, overlaid by env/flags, resolved.
fn resolve_inputs(
    config: &types::StackConfig,
    args: &InputArgs,
) -> Result<DeploymentInputs, String> {
    let raw = RawInputs::from_config(&config.inputs).overlay(RawInputs {
        key_name: args.key_name.clone(),
        public_key: args.public_key.clone(),
        private_key: args.private_key.clone(),
    });
    inputs::resolve(&raw).map_err(|e| e.to_string())
}

/// Parse, validate, resolve inputs, declare, and order.
fn declare_stack(
    file: &Path,
    args: &InputArgs,
) -> Result<(types::Stack, Vec<String>, DeploymentInputs), String> {
    let config = parse_and_validate(file)?;
    let inputs = resolve_inputs(&config, args)?;
    let stack = stack::declare(&config, &inputs)?;
    let order = resolver::build_execution_order(&stack)?;
    Ok((stack, order, inputs))
}

fn cmd_plan(file: &Path, group_filter: Option<&str>, args: &InputArgs) -> Result<(), String> {
    let (stack, order, _) = declare_stack(file, args)?;
    let plan = planner::plan(&stack, &order);
    print_plan(&plan, group_filter);
    Ok(())
}

/// Display a plan to stdout.
fn print_plan(plan: &types::DeclarationPlan, group_filter: Option<&str>) {
    println!(
        "Planning: {} ({}, {} declarations)",
        plan.name,
        plan.region,
        plan.entries.len()
    );
    println!();

    let mut current_group = None;
    for entry in &plan.entries {
        let group = entry.group.to_string();
        if group_filter.is_some_and(|f| f != group) {
            continue;
        }
        if current_group != Some(entry.group) {
            current_group = Some(entry.group);
            println!("{}:", group);
        }
        let symbol = if entry.kind.is_lookup() { "<" } else { "+" };
        println!(
            "  {} {} [{}] {}",
            symbol, entry.id, entry.kind, entry.description
        );
        if !entry.depends_on.is_empty() {
            println!("      after: {}", entry.depends_on.join(", "));
        }
    }

    println!();
    let groups: Vec<String> = plan
        .group_counts
        .iter()
        .map(|(g, n)| format!("{} {}", n, g))
        .collect();
    println!(
        "Plan: {} resource(s), {} lookup(s) ({}).",
        plan.resources,
        plan.lookups,
        groups.join(", ")
    );
}

fn write_artifact(out: &Path, name: &str, content: &str) -> Result<types::ArtifactLock, String> {
    let path = out.join(name);
    std::fs::write(&path, content)
        .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
    Ok(types::ArtifactLock {
        path: path.to_string_lossy().to_string(),
        hash: hasher::hash_string(content),
    })
}

fn cmd_render(file: &Path, out: &Path, state_dir: &Path, args: &InputArgs) -> Result<(), String> {
    let started = Instant::now();
    let (stack, order, inputs) = declare_stack(file, args)?;
    let program = codegen::render_program(&stack, &order)?;

    let run_id = eventlog::generate_run_id();
    tracing::info!(stack = %stack.name, run_id = %run_id, "rendering");
    eventlog::append_event(
        state_dir,
        &stack.name,
        types::ProvenanceEvent::RenderStarted {
            stack: stack.name.clone(),
            run_id: run_id.clone(),
            devstack_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    )?;

    std::fs::create_dir_all(out)
        .map_err(|e| format!("cannot create {}: {}", out.display(), e))?;
    let program_artifact = write_artifact(out, PROGRAM_FILE, &program)?;
    let bootstrap_artifact = write_artifact(out, BOOTSTRAP_FILE, &stack.bootstrap_script)?;

    let mut lock = state::new_lock(
        &stack.name,
        &inputs.key_source().describe(),
        &inputs.private_key().fingerprint(),
    );
    lock.program_hash = program_artifact.hash.clone();
    lock.bootstrap_hash = bootstrap_artifact.hash.clone();
    lock.artifacts.insert("program".to_string(), program_artifact);
    lock.artifacts.insert("bootstrap".to_string(), bootstrap_artifact);

    for id in &order {
        let Some(decl) = stack.declarations.get(id) else {
            continue;
        };
        let hash = planner::hash_declaration(decl);
        eventlog::append_event(
            state_dir,
            &stack.name,
            types::ProvenanceEvent::DeclarationRendered {
                stack: stack.name.clone(),
                declaration: id.clone(),
                kind: decl.kind,
                hash: hash.clone(),
            },
        )?;
        lock.declarations.insert(
            id.clone(),
            types::DeclarationLock {
                kind: decl.kind,
                group: decl.group,
                hash,
            },
        );
    }

    let lock_path = state::save_lock(state_dir, &lock)?;
    eventlog::append_event(
        state_dir,
        &stack.name,
        types::ProvenanceEvent::RenderCompleted {
            stack: stack.name.clone(),
            run_id,
            declarations: order.len() as u32,
            program_hash: lock.program_hash.clone(),
            total_seconds: started.elapsed().as_secs_f64(),
        },
    )?;

    println!("Rendered {} ({} declarations)", stack.name, order.len());
    for artifact in lock.artifacts.values() {
        println!("  Wrote: {} ({})", artifact.path, hasher::short(&artifact.hash));
    }
    println!("  Lock:  {}", lock_path.display());
    Ok(())
}

fn cmd_bootstrap(file: &Path, out: Option<&Path>) -> Result<(), String> {
    let config = parse_and_validate(file)?;
    let contract = rendezvous::contract(&config.rendezvous, &config.region);
    let script = bootstrap::render(&config.bootstrap, &contract, &config.region)?;
    match out {
        Some(path) => {
            std::fs::write(path, &script)
                .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", script),
    }
    Ok(())
}

/// Stack names with a directory under the state dir, sorted.
fn state_stacks(state_dir: &Path, filter: Option<&str>) -> Result<Vec<String>, String> {
    let entries = std::fs::read_dir(state_dir)
        .map_err(|e| format!("cannot read state dir {}: {}", state_dir.display(), e))?;
    let mut names: Vec<String> = entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| filter.map_or(true, |f| f == name.as_str()))
        .collect();
    names.sort();
    Ok(names)
}

fn cmd_drift(state_dir: &Path, stack_filter: Option<&str>, tripwire_mode: bool) -> Result<(), String> {
    let mut total_drift = 0;

    for name in state_stacks(state_dir, stack_filter)? {
        let Some(lock) = state::load_lock(state_dir, &name)? else {
            continue;
        };
        println!("Checking {} ({} artifacts)...", name, lock.artifacts.len());
        let findings = drift::detect_drift(&lock);

        if findings.is_empty() {
            println!("  No drift detected.");
            continue;
        }
        for f in &findings {
            println!("  DRIFTED: {} ({})", f.artifact, f.detail);
            println!("    Expected: {}", f.expected_hash);
            println!("    Actual:   {}", f.actual_hash);
            eventlog::append_event(
                state_dir,
                &name,
                types::ProvenanceEvent::DriftDetected {
                    stack: name.clone(),
                    artifact: f.artifact.clone(),
                    expected_hash: f.expected_hash.clone(),
                    actual_hash: f.actual_hash.clone(),
                },
            )?;
        }
        total_drift += findings.len();
    }

    if total_drift > 0 {
        println!();
        println!("Drift detected: {} artifact(s)", total_drift);
        if tripwire_mode {
            return Err(format!("{} drift finding(s)", total_drift));
        }
    } else {
        println!("No drift detected.");
    }
    Ok(())
}

fn cmd_status(state_dir: &Path, stack_filter: Option<&str>) -> Result<(), String> {
    let mut found = false;

    for name in state_stacks(state_dir, stack_filter)? {
        let Some(lock) = state::load_lock(state_dir, &name)? else {
            continue;
        };
        found = true;
        println!("Stack: {}", lock.stack);
        println!("  Generated: {}", lock.generated_at);
        println!("  Generator: {}", lock.generator);
        println!("  Key:       {}", lock.key_source);
        println!("  Program:   {}", hasher::short(&lock.program_hash));
        println!("  Bootstrap: {}", hasher::short(&lock.bootstrap_hash));
        println!("  Declarations: {}", lock.declarations.len());
        for (id, dl) in &lock.declarations {
            println!("    {}: {} [{}]", id, dl.kind, dl.group);
        }
        let events = eventlog::read_events(state_dir, &name)?;
        if let Some(last) = events.last() {
            println!("  Last event: {} ({} total)", last.ts, events.len());
        }
        println!();
    }

    if !found {
        println!("No state found. Run `devstack render` first.");
    }
    Ok(())
}

fn cmd_schema() -> Result<(), String> {
    let schema = schemars::schema_for!(types::StackConfig);
    let json =
        serde_json::to_string_pretty(&schema).map_err(|e| format!("schema serialize error: {}", e))?;
    println!("{}", json);
    Ok(())
}
