//! capkit CLI - capability evaluation engine.
//!
//! Single binary that provides:
//! - `capkit evaluate` - score a payload and print the report (or tasks)
//! - `capkit tasks` - dispatch a previously saved report
//! - `capkit validate` - check every capability in a registry
//! - `capkit list` - show registered capabilities and their routing
//! - `capkit init` - write a sample registry

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use capkit_core::{
    CapabilityConfig, CapabilityManager, CapabilityRegistry, CapabilityToolkit, EvaluationReport,
    RecommendationRole, SystemClock,
};

#[derive(Parser)]
#[command(name = "capkit")]
#[command(about = "Capability evaluation engine", version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a payload and print the report
    Evaluate {
        #[command(flatten)]
        source: CapabilitySource,

        /// Payload JSON file ("-" for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Print task requests instead of the report
        #[arg(long)]
        tasks: bool,

        /// Agent id to send tasks from
        #[arg(long)]
        from: Option<String>,
    },

    /// Convert a saved report into task requests
    Tasks {
        #[command(flatten)]
        source: CapabilitySource,

        /// Report JSON file ("-" for stdin)
        #[arg(short, long)]
        report: PathBuf,

        /// Agent id to send tasks from
        #[arg(long)]
        from: Option<String>,
    },

    /// Validate every capability in a registry
    Validate {
        #[arg(short, long, default_value = "capabilities.yaml")]
        registry: PathBuf,
    },

    /// List registered capabilities
    List {
        #[arg(short, long, default_value = "capabilities.yaml")]
        registry: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a sample registry
    Init {
        #[arg(short, long, default_value = "capabilities.yaml")]
        path: PathBuf,
    },
}

/// Where to find the capability: a single config file, or a registry entry.
#[derive(Args)]
struct CapabilitySource {
    /// Single capability config file
    #[arg(short, long, conflicts_with_all = ["registry", "capability"])]
    config: Option<PathBuf>,

    /// Registry file
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Capability id within the registry
    #[arg(long, requires = "registry")]
    capability: Option<String>,
}

impl CapabilitySource {
    fn resolve(&self) -> Result<Arc<CapabilityToolkit>> {
        match (&self.config, &self.registry, &self.capability) {
            (Some(path), _, _) => {
                let config = CapabilityConfig::load(path)?;
                let toolkit = CapabilityToolkit::new(config)
                    .with_context(|| format!("Invalid capability in {}", path.display()))?;
                Ok(Arc::new(toolkit))
            }
            (None, Some(registry), Some(id)) => {
                let registry = CapabilityRegistry::load(registry)?;
                registry
                    .get(id)
                    .cloned()
                    .with_context(|| format!("Unknown capability: {}", id))
            }
            _ => bail!("Specify --config FILE or --registry FILE --capability ID"),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging (stderr keeps stdout clean for JSON)
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Evaluate {
            source,
            input,
            tasks,
            from,
        } => evaluate(&source, &input, tasks, from),
        Commands::Tasks {
            source,
            report,
            from,
        } => dispatch(&source, &report, from),
        Commands::Validate { registry } => validate(&registry),
        Commands::List { registry, json } => list(&registry, json),
        Commands::Init { path } => init_registry(&path),
    }
}

fn evaluate(
    source: &CapabilitySource,
    input: &Path,
    tasks: bool,
    from: Option<String>,
) -> Result<()> {
    let toolkit = source.resolve()?;
    let payload: serde_json::Value = serde_json::from_str(&read_input(input)?)
        .with_context(|| format!("Failed to parse payload from {}", input.display()))?;

    let manager = match from {
        Some(agent) => CapabilityManager::new(toolkit, agent, Arc::new(SystemClock)),
        None => CapabilityManager::with_default_agent(toolkit, Arc::new(SystemClock)),
    };

    let report = manager.evaluate(&payload)?;
    tracing::info!(
        capability = %report.capability_id,
        summary = %report.summary.line(),
        alerts = report.alerts.len(),
        "Evaluated payload"
    );

    if tasks {
        let tasks = manager.build_tasks(&report)?;
        println!("{}", serde_json::to_string_pretty(&tasks)?);
    } else {
        println!("{}", report.to_json_pretty()?);
    }

    Ok(())
}

fn dispatch(source: &CapabilitySource, report_path: &Path, from: Option<String>) -> Result<()> {
    let toolkit = source.resolve()?;
    let report = EvaluationReport::from_json(&read_input(report_path)?)
        .with_context(|| format!("Failed to parse report from {}", report_path.display()))?;

    if report.capability_id != toolkit.capability_id() {
        tracing::warn!(
            report = %report.capability_id,
            capability = %toolkit.capability_id(),
            "Report was produced by a different capability"
        );
    }

    let manager = match from {
        Some(agent) => CapabilityManager::new(toolkit, agent, Arc::new(SystemClock)),
        None => CapabilityManager::with_default_agent(toolkit, Arc::new(SystemClock)),
    };

    let tasks = manager.build_tasks(&report)?;
    tracing::info!(tasks = tasks.len(), "Built task requests");
    println!("{}", serde_json::to_string_pretty(&tasks)?);

    Ok(())
}

fn validate(registry_path: &Path) -> Result<()> {
    let registry = CapabilityRegistry::load(registry_path)?;

    println!("Capability Registry");
    println!("===================");
    println!();
    println!("File: {}", registry_path.display());
    println!("Capabilities: {}", registry.len());
    println!();
    for toolkit in registry.iter() {
        let config = toolkit.config();
        println!(
            "  ok  {} ({} / {}) -> {} routes",
            config.capability_id,
            config.collection_field,
            config.id_field,
            RecommendationRole::ALL.len()
        );
    }

    Ok(())
}

#[derive(Serialize)]
struct CapabilityRow<'a> {
    capability_id: &'a str,
    collection_field: &'a str,
    ready_posture: &'a str,
    default_agent_id: &'a str,
    routes: Vec<Route<'a>>,
}

#[derive(Serialize)]
struct Route<'a> {
    role: RecommendationRole,
    recommendation_type: &'a str,
    target_agent: &'a str,
}

fn list(registry_path: &Path, json: bool) -> Result<()> {
    let registry = CapabilityRegistry::load(registry_path)?;

    let rows: Vec<CapabilityRow<'_>> = registry
        .iter()
        .map(|toolkit| {
            let config = toolkit.config();
            let routes = RecommendationRole::ALL
                .into_iter()
                .map(|role| {
                    let recommendation_type = config.recommendation_types.get(role);
                    Route {
                        role,
                        recommendation_type,
                        target_agent: config.target_for(recommendation_type).unwrap_or("-"),
                    }
                })
                .collect();
            CapabilityRow {
                capability_id: &config.capability_id,
                collection_field: &config.collection_field,
                ready_posture: &config.ready_posture,
                default_agent_id: &config.default_agent_id,
                routes,
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for row in &rows {
        println!(
            "{} [{}] posture={} from={}",
            row.capability_id, row.collection_field, row.ready_posture, row.default_agent_id
        );
        for route in &row.routes {
            println!(
                "  {:<8} {} -> {}",
                route.role.as_str(),
                route.recommendation_type,
                route.target_agent
            );
        }
    }

    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }

    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn init_registry(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }

    let sample = r#"# capkit capability registry

version: "1"
capabilities:
  - capability_id: risk_scheduler
    collection_field: risks
    id_field: riskId
    default_name: Risk
    ready_posture: schedule_ready
    default_agent_id: agent:risk-scheduler
    recommendation_types:
      primary: reschedule_risky_work
      guard: add_risk_guardrails
      audit: audit_risk_signals
      publish: publish_risk_schedule
    recommendation_target_map:
      reschedule_risky_work: agent:planner
      add_risk_guardrails: agent:safety
      audit_risk_signals: agent:research
      publish_risk_schedule: agent:ops
"#;
    std::fs::write(path, sample).with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Initialized capability registry at {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Add capabilities to {}", path.display());
    println!(
        "  2. Run: capkit evaluate --registry {} --capability risk_scheduler --input payload.json",
        path.display()
    );

    Ok(())
}
