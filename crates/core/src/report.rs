//! Run summary and report assembly.

use crate::{Issue, Priority};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregate counts for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    /// Distinct participants in the dataset
    pub total_records: usize,

    /// Total issues emitted
    pub total_issues: usize,

    /// Issues per priority
    pub issues_by_priority: HashMap<Priority, usize>,

    /// Top issue-type codes by frequency, most common first
    pub most_common_issue_types: Vec<String>,

    /// Top fields by issue frequency, most affected first
    pub fields_with_most_issues: Vec<String>,
}

/// Full engine output: summary plus the issue list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// Aggregate summary
    pub summary: ProjectSummary,

    /// Every issue from the run, in emission order
    pub issues: Vec<Issue>,

    /// Report generation timestamp (ISO-8601)
    pub generated_at: String,
}

const TOP_N: usize = 5;

impl QualityReport {
    /// Build a report, computing the summary from the issue list.
    pub fn from_issues(issues: Vec<Issue>, total_records: usize) -> Self {
        let mut type_counts: HashMap<&str, usize> = HashMap::new();
        let mut field_counts: HashMap<&str, usize> = HashMap::new();
        let mut priority_counts: HashMap<Priority, usize> = HashMap::new();

        for issue in &issues {
            *type_counts.entry(issue.issue_type.code()).or_default() += 1;
            *field_counts.entry(issue.field.as_str()).or_default() += 1;
            *priority_counts.entry(issue.priority).or_default() += 1;
        }

        let summary = ProjectSummary {
            total_records,
            total_issues: issues.len(),
            issues_by_priority: priority_counts,
            most_common_issue_types: top_n(&type_counts),
            fields_with_most_issues: top_n(&field_counts),
        };

        QualityReport {
            summary,
            issues,
            generated_at: chrono::Local::now().naive_local().to_string(),
        }
    }
}

fn top_n(counts: &HashMap<&str, usize>) -> Vec<String> {
    let mut entries: Vec<(&str, usize)> = counts.iter().map(|(k, v)| (*k, *v)).collect();
    // Tie-break on name so the ordering is deterministic.
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    entries
        .into_iter()
        .take(TOP_N)
        .map(|(k, _)| k.to_string())
        .collect()
}
