//! redqc CLI - clinical data-quality analysis.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use redqc_analyzers::ChecksConfig;
use redqc_core::{Event, FieldDefinition, LogEntry, Priority, QualityReport, Record};
use redqc_engine::{QueryGenerator, RuleProvider, StaticRuleProvider};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "redqc")]
#[command(about = "Clinical data-quality analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a project export and report the issues found
    Analyze {
        /// Data dictionary (JSON array of field definitions)
        #[arg(long)]
        metadata: PathBuf,
        /// Records export (JSON array)
        #[arg(long)]
        records: PathBuf,
        /// Event definitions, for longitudinal projects
        #[arg(long)]
        events: Option<PathBuf>,
        /// Audit-log export, enables the operational checks
        #[arg(long)]
        logs: Option<PathBuf>,
        /// Custom rules file (JSON array)
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Write the full JSON report here
        #[arg(long)]
        output: Option<PathBuf>,
        /// Only print issues of this priority (high, medium, low)
        #[arg(long)]
        priority: Option<String>,
        /// Print at most this many issues
        #[arg(long, default_value = "50")]
        limit: usize,
        /// Skip the temporal checks
        #[arg(long)]
        no_temporal: bool,
        /// Skip the clinical checks
        #[arg(long)]
        no_clinical: bool,
        /// Skip the operational checks
        #[arg(long)]
        no_operational: bool,
    },
    /// Validate a custom-rules file and list what it contains
    Rules {
        /// Custom rules file (JSON array)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            metadata,
            records,
            events,
            logs,
            rules,
            output,
            priority,
            limit,
            no_temporal,
            no_clinical,
            no_operational,
        } => {
            let metadata: Vec<FieldDefinition> = load_json(&metadata)?;
            let records: Vec<Record> = load_json(&records)?;
            let events: Vec<Event> = match events {
                Some(path) => load_json(&path)?,
                None => Vec::new(),
            };
            let logs: Vec<LogEntry> = match logs {
                Some(path) => load_json(&path)?,
                None => Vec::new(),
            };
            let provider = match rules {
                Some(path) => {
                    let json = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    StaticRuleProvider::from_json(&json)
                        .with_context(|| format!("parsing rules in {}", path.display()))?
                }
                None => StaticRuleProvider::default(),
            };

            let data = redqc_core::ProjectData {
                metadata,
                records,
                events,
                logs,
            };
            let config = ChecksConfig {
                skip_temporal: no_temporal,
                skip_clinical: no_clinical,
                skip_operational: no_operational,
                ..ChecksConfig::default()
            };

            info!(
                records = data.records.len(),
                fields = data.metadata.len(),
                events = data.events.len(),
                logs = data.logs.len(),
                "starting analysis"
            );
            let generator = QueryGenerator::new(data, config, provider);
            let report = generator.generate_report().await?;
            info!(issues = report.issues.len(), "analysis complete");

            let priority = priority.as_deref().map(parse_priority).transpose()?;
            print_report(&report, priority, limit);

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&report)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("\nFull report written to {}", path.display());
            }
        }
        Commands::Rules { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let provider = StaticRuleProvider::from_json(&json)
                .with_context(|| format!("parsing rules in {}", file.display()))?;
            let rules = provider.enabled_rules("default").await?;

            println!("Enabled rules ({})", rules.len());
            for rule in rules {
                println!(
                    "  {} | {:?} | {} - {}",
                    rule.id, rule.rule_type, rule.field, rule.name
                );
            }
        }
    }

    Ok(())
}

fn load_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let json =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
}

fn parse_priority(s: &str) -> Result<Priority> {
    match s.to_lowercase().as_str() {
        "high" => Ok(Priority::High),
        "medium" => Ok(Priority::Medium),
        "low" => Ok(Priority::Low),
        other => anyhow::bail!("unknown priority '{other}' (expected high, medium, or low)"),
    }
}

fn print_report(report: &QualityReport, priority: Option<Priority>, limit: usize) {
    let s = &report.summary;
    println!("Records analyzed: {}", s.total_records);
    println!("Issues found: {}", s.total_issues);
    for p in [Priority::High, Priority::Medium, Priority::Low] {
        let count = s.issues_by_priority.get(&p).copied().unwrap_or(0);
        println!("  {p}: {count}");
    }
    if !s.most_common_issue_types.is_empty() {
        println!("Most common issue types: {}", s.most_common_issue_types.join(", "));
    }
    if !s.fields_with_most_issues.is_empty() {
        println!("Fields with most issues: {}", s.fields_with_most_issues.join(", "));
    }

    let shown: Vec<_> = report
        .issues
        .iter()
        .filter(|i| priority.map_or(true, |p| i.priority == p))
        .take(limit)
        .collect();
    if shown.is_empty() {
        return;
    }

    println!();
    for issue in &shown {
        println!(
            "  [{}] {} | {} | {} | {} - {}",
            issue.priority,
            issue.record_id,
            issue.event,
            issue.instrument,
            issue.field,
            issue.explanation,
        );
    }
    let total = report
        .issues
        .iter()
        .filter(|i| priority.map_or(true, |p| i.priority == p))
        .count();
    if total > shown.len() {
        println!("  ... and {} more (raise --limit to see them)", total - shown.len());
    }
}
