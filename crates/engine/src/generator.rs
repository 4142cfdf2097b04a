//! The run orchestrator.

use crate::provider::{Result, RuleProvider};
use redqc_analyzers::{
    Analyzer, ChecksConfig, ClinicalAnalyzer, CustomRulesAnalyzer, OperationalAnalyzer,
    StructuralAnalyzer, TemporalAnalyzer,
};
use redqc_core::{Issue, ProjectData, QualityReport};

/// Everything one run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// Issues from every analyzer that completed, in execution order
    pub issues: Vec<Issue>,

    /// Analyzers that failed, as `(name, error)` pairs
    pub incomplete: Vec<(String, String)>,
}

/// Orchestrates a full quality run over one project dataset.
pub struct QueryGenerator<P> {
    data: ProjectData,
    config: ChecksConfig,
    provider: P,
    scope: String,
}

impl<P: RuleProvider> QueryGenerator<P> {
    /// Create a generator for one dataset.
    pub fn new(data: ProjectData, config: ChecksConfig, provider: P) -> Self {
        Self {
            data,
            config,
            provider,
            scope: "default".to_string(),
        }
    }

    /// Set the project scope passed to the rule provider.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// The dataset under analysis.
    pub fn data(&self) -> &ProjectData {
        &self.data
    }

    /// Run every active analyzer and collect the combined issue stream.
    ///
    /// Execution order is fixed: structural, temporal, clinical,
    /// operational, custom rules. The operational pass is skipped when
    /// the dataset carries no logs.
    pub async fn run_all(&self) -> Result<RunOutcome> {
        let mut analyzers: Vec<Box<dyn Analyzer>> = vec![Box::new(StructuralAnalyzer::new(
            self.config.structural.clone(),
        ))];
        if !self.config.skip_temporal {
            analyzers.push(Box::new(TemporalAnalyzer::new()));
        }
        if !self.config.skip_clinical {
            analyzers.push(Box::new(ClinicalAnalyzer::new(
                self.config.clinical_limits.clone(),
            )));
        }
        if !self.config.skip_operational && !self.data.logs.is_empty() {
            analyzers.push(Box::new(OperationalAnalyzer::new(
                self.config.operational.clone(),
            )));
        }

        match self.provider.enabled_rules(&self.scope).await {
            Ok(rules) if !rules.is_empty() => {
                analyzers.push(Box::new(CustomRulesAnalyzer::new(rules)));
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "custom rules unavailable, continuing without them");
            }
        }

        let mut issues = Vec::new();
        let mut incomplete = Vec::new();
        for analyzer in &analyzers {
            tracing::info!(analyzer = analyzer.name(), "running analyzer");
            match analyzer.analyze(&self.data) {
                Ok(found) => issues.extend(found),
                Err(err) => {
                    tracing::error!(analyzer = analyzer.name(), error = %err, "analyzer failed");
                    incomplete.push((analyzer.name().to_string(), err.to_string()));
                }
            }
        }

        self.backfill_instruments(&mut issues);
        tracing::info!(
            issues = issues.len(),
            incomplete = incomplete.len(),
            "run complete"
        );
        Ok(RunOutcome { issues, incomplete })
    }

    /// Run the analyzers and assemble the final report.
    pub async fn generate_report(&self) -> Result<QualityReport> {
        let outcome = self.run_all().await?;
        Ok(QualityReport::from_issues(
            outcome.issues,
            self.data.unique_record_count(),
        ))
    }

    /// Replace placeholder instrument names where the dictionary knows
    /// which form a field belongs to.
    fn backfill_instruments(&self, issues: &mut [Issue]) {
        let field_to_form = self.data.field_to_form();
        for issue in issues {
            if issue.instrument == "N/A" {
                if let Some(form) = field_to_form.get(issue.field.as_str()) {
                    issue.instrument = form.to_string();
                }
            }
        }
    }
}
