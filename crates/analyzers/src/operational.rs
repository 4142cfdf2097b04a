//! Operational analyzer: audit-log anomaly detection.

use crate::base::{Analyzer, AnalyzerError, IssueBuilder};
use crate::config::OperationalConfig;
use chrono::{Datelike, TimeDelta, Timelike};
use redqc_core::{Issue, IssueType, LogEntry, Priority, ProjectData, Time};
use std::collections::{BTreeMap, BTreeSet};

/// Placeholder record id for project-wide findings.
const GLOBAL: &str = "GLOBAL";

/// Detects edit spikes, abnormally high per-user edit volume, off-hours
/// activity, and fields corrected far more often than their record
/// count warrants. Emits nothing when the dataset carries no logs.
pub struct OperationalAnalyzer {
    config: OperationalConfig,
}

impl OperationalAnalyzer {
    /// Create with the given thresholds.
    pub fn new(config: OperationalConfig) -> Self {
        Self { config }
    }

    fn check_edit_spikes(&self, issues: &mut Vec<Issue>, logs: &[LogEntry]) {
        let window = TimeDelta::hours(self.config.window_hours);
        for (record, entries) in by_record(logs) {
            if entries.len() < self.config.edit_threshold {
                continue;
            }
            let mut times: Vec<Time> =
                entries.iter().filter_map(|e| e.parsed_timestamp()).collect();
            times.sort_unstable();

            for (i, anchor) in times.iter().enumerate() {
                let in_window = times[i..]
                    .iter()
                    .take_while(|t| **t - *anchor <= window)
                    .count();
                if in_window >= self.config.edit_threshold {
                    let users: BTreeSet<&str> =
                        entries.iter().map(|e| e.username.as_str()).collect();
                    issues.push(
                        IssueBuilder::new(IssueType::SuspiciousEditPattern, record, "multiple_fields")
                            .instrument("Audit Log")
                            .explanation(format!(
                                "{in_window} edits within {}h starting {} (users: {}).",
                                self.config.window_hours,
                                anchor.format("%Y-%m-%d %H:%M"),
                                users.into_iter().collect::<Vec<_>>().join(", ")
                            ))
                            .suggested_action(
                                "Review the audit trail for this record with the site.",
                            )
                            .build(),
                    );
                    break; // one finding per record
                }
            }
        }
    }

    fn check_high_volume_users(&self, issues: &mut Vec<Issue>, logs: &[LogEntry]) {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut records: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for entry in logs {
            *counts.entry(entry.username.as_str()).or_default() += 1;
            if let Some(record) = entry.record.as_deref() {
                records.entry(entry.username.as_str()).or_default().insert(record);
            }
        }
        if counts.is_empty() {
            return;
        }
        let mean = logs.len() as f64 / counts.len() as f64;

        for (user, count) in counts {
            if count as f64 > 3.0 * mean && count > self.config.edit_threshold * 5 {
                let touched = records.get(user).map(BTreeSet::len).unwrap_or(0);
                issues.push(
                    IssueBuilder::new(IssueType::HighEditVolume, GLOBAL, "user_activity")
                        .instrument("Audit Log")
                        .value(user)
                        .priority(Priority::Low)
                        .explanation(format!(
                            "User '{user}' made {count} edits across {touched} records \
                             (project mean: {mean:.1} edits per user)."
                        ))
                        .suggested_action(
                            "Confirm the activity is expected for this user's role.",
                        )
                        .build(),
                );
            }
        }
    }

    fn check_off_hours(&self, issues: &mut Vec<Issue>, logs: &[LogEntry]) {
        let mut by_record: BTreeMap<&str, Vec<&LogEntry>> = BTreeMap::new();
        for entry in logs {
            let Some(t) = entry.parsed_timestamp() else { continue };
            if is_off_hours(t) {
                if let Some(record) = entry.record.as_deref() {
                    by_record.entry(record).or_default().push(entry);
                }
            }
        }

        for (record, entries) in by_record {
            if entries.len() < 3 {
                continue;
            }
            let users: BTreeSet<&str> = entries.iter().map(|e| e.username.as_str()).collect();
            issues.push(
                IssueBuilder::new(IssueType::SuspiciousEditPattern, record, "edit_timing")
                    .instrument("Audit Log")
                    .priority(Priority::Low)
                    .explanation(format!(
                        "{} edits outside working hours (nights or weekends) by: {}.",
                        entries.len(),
                        users.into_iter().collect::<Vec<_>>().join(", ")
                    ))
                    .suggested_action("Check whether out-of-hours entry is expected at the site.")
                    .build(),
            );
        }
    }

    fn check_field_corrections(&self, issues: &mut Vec<Issue>, logs: &[LogEntry]) {
        let mut edits: BTreeMap<&str, usize> = BTreeMap::new();
        let mut records: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for entry in logs {
            let Some(details) = entry.details.as_deref() else { continue };
            for line in details.lines() {
                let Some((field, _)) = line.split_once('=') else { continue };
                let field = field.trim();
                if field.is_empty() {
                    continue;
                }
                *edits.entry(field).or_default() += 1;
                if let Some(record) = entry.record.as_deref() {
                    records.entry(field).or_default().insert(record);
                }
            }
        }

        for (field, count) in edits {
            let distinct = records.get(field).map(BTreeSet::len).unwrap_or(0);
            if distinct > 0 && count > 2 * distinct {
                issues.push(
                    IssueBuilder::new(IssueType::SuspiciousEditPattern, GLOBAL, field)
                        .instrument("Audit Log")
                        .priority(Priority::Low)
                        .explanation(format!(
                            "Field '{field}' was edited {count} times across only \
                             {distinct} records."
                        ))
                        .suggested_action(
                            "A frequently corrected field may need clearer wording or validation.",
                        )
                        .build(),
                );
            }
        }
    }
}

fn by_record(logs: &[LogEntry]) -> BTreeMap<&str, Vec<&LogEntry>> {
    let mut grouped: BTreeMap<&str, Vec<&LogEntry>> = BTreeMap::new();
    for entry in logs {
        if let Some(record) = entry.record.as_deref() {
            grouped.entry(record).or_default().push(entry);
        }
    }
    grouped
}

fn is_off_hours(t: Time) -> bool {
    let weekend = matches!(t.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun);
    weekend || t.hour() < 6 || t.hour() > 22
}

impl Analyzer for OperationalAnalyzer {
    fn name(&self) -> &'static str {
        "operational"
    }

    fn analyze(&self, data: &ProjectData) -> Result<Vec<Issue>, AnalyzerError> {
        if data.logs.is_empty() {
            return Ok(Vec::new());
        }
        let mut issues = Vec::new();
        self.check_edit_spikes(&mut issues, &data.logs);
        self.check_high_volume_users(&mut issues, &data.logs);
        self.check_off_hours(&mut issues, &data.logs);
        self.check_field_corrections(&mut issues, &data.logs);

        tracing::debug!(count = issues.len(), "operational analysis complete");
        Ok(issues)
    }
}
