//! Temporal analyzer: cross-event chronology per participant.

use crate::base::{instrument_for, Analyzer, AnalyzerError, IssueBuilder};
use crate::config::{BASELINE_DATE_FIELDS, CRITICAL_DATE_FIELDS};
use redqc_core::{value, Issue, IssueType, Priority, ProjectData, Record, Time};
use std::collections::BTreeMap;

/// Checks event chronology, follow-up vs baseline ordering, post-death
/// activity, event-window adherence, and repeat-instance sequences.
#[derive(Default)]
pub struct TemporalAnalyzer;

impl TemporalAnalyzer {
    /// Create the analyzer.
    pub fn new() -> Self {
        Self
    }

    /// Baseline reference date for a participant: the first value in a
    /// conventional baseline field, else the earliest parseable date.
    /// Also returns the index of the record the baseline came from, so
    /// that record can be excluded from baseline-ordering checks.
    fn baseline_date(&self, records: &[&Record], date_fields: &[&str]) -> Option<(Time, usize)> {
        for field in BASELINE_DATE_FIELDS {
            for (i, record) in records.iter().enumerate() {
                if let Some(t) = record.get(field).and_then(value::parse_date) {
                    return Some((t, i));
                }
            }
        }
        let mut earliest: Option<(Time, usize)> = None;
        for (i, record) in records.iter().enumerate() {
            for field in date_fields {
                if let Some(t) = record.get(field).and_then(value::parse_date) {
                    earliest = Some(match earliest {
                        Some((e, j)) if e <= t => (e, j),
                        _ => (t, i),
                    });
                }
            }
        }
        earliest
    }

    fn check_event_order(
        &self,
        issues: &mut Vec<Issue>,
        data: &ProjectData,
        participant: &str,
        records: &[&Record],
        date_fields: &[&str],
    ) {
        // Maps declared event index to the dates observed there.
        // Undeclared events share one bucket after every declared one,
        // so they still take part in the ordering check.
        let undeclared = data.events.len();
        let mut by_event: BTreeMap<usize, Vec<(&str, &str, Time, &str)>> = BTreeMap::new();
        for record in records {
            let event_name = record.event_name();
            let idx = data
                .events
                .iter()
                .position(|e| e.unique_event_name == event_name)
                .unwrap_or(undeclared);
            for field in date_fields {
                let Some(raw) = record.get(field) else { continue };
                if let Some(t) = value::parse_date(raw) {
                    by_event.entry(idx).or_default().push((*field, raw, t, event_name));
                }
            }
        }

        let indices: Vec<usize> = by_event.keys().copied().collect();
        for pair in indices.windows(2) {
            let (prev_idx, next_idx) = (pair[0], pair[1]);
            let Some(prev_max) = by_event[&prev_idx].iter().map(|(_, _, t, _)| *t).max() else {
                continue;
            };
            let prev_label = data
                .events
                .get(prev_idx)
                .map(|e| e.display_name())
                .or_else(|| by_event[&prev_idx].first().map(|(_, _, _, e)| *e))
                .unwrap_or("")
                .to_string();
            for (field, raw, t, event_name) in &by_event[&next_idx] {
                if *t < prev_max {
                    let label = data
                        .events
                        .get(next_idx)
                        .map(|e| e.display_name())
                        .unwrap_or(*event_name);
                    issues.push(
                        IssueBuilder::new(IssueType::DateOutOfOrder, participant, *field)
                            .event(*event_name)
                            .instrument(instrument_for(data, field))
                            .value(*raw)
                            .priority(Priority::High)
                            .explanation(format!(
                                "Date '{raw}' in event '{label}' is earlier than dates already \
                                 recorded in the preceding event '{prev_label}'."
                            ))
                            .suggested_action(
                                "Check whether the date or the event assignment is wrong.",
                            )
                            .build(),
                    );
                }
            }
        }
    }

    fn check_followup_before_baseline(
        &self,
        issues: &mut Vec<Issue>,
        data: &ProjectData,
        participant: &str,
        records: &[&Record],
        date_fields: &[&str],
        baseline: Time,
        baseline_record: usize,
    ) {
        for (i, record) in records.iter().enumerate() {
            if i == baseline_record {
                continue;
            }
            for field in date_fields {
                if BASELINE_DATE_FIELDS.contains(field) {
                    continue;
                }
                let Some(raw) = record.get(field) else { continue };
                let Some(t) = value::parse_date(raw) else { continue };
                if t < baseline {
                    issues.push(
                        IssueBuilder::new(IssueType::FollowupBeforeBaseline, participant, *field)
                            .event(record.event_name())
                            .instrument(instrument_for(data, field))
                            .value(raw)
                            .explanation(format!(
                                "Date '{raw}' precedes the participant's baseline date ({}).",
                                baseline.format("%Y-%m-%d")
                            ))
                            .suggested_action("Verify the date against the source document.")
                            .build(),
                    );
                }
            }
        }
    }

    fn check_death_consistency(
        &self,
        issues: &mut Vec<Issue>,
        data: &ProjectData,
        participant: &str,
        records: &[&Record],
        date_fields: &[&str],
    ) {
        let death_field = CRITICAL_DATE_FIELDS
            .iter()
            .find(|f| f.contains("death"))
            .copied();
        let Some(death_field) = death_field else { return };

        let Some(death) = records
            .iter()
            .find_map(|r| r.get(death_field).and_then(value::parse_date))
        else {
            return;
        };

        for record in records {
            for field in date_fields {
                if *field == death_field {
                    continue;
                }
                let Some(raw) = record.get(field) else { continue };
                let Some(t) = value::parse_date(raw) else { continue };
                if t > death {
                    issues.push(
                        IssueBuilder::new(IssueType::DeathDateInconsistent, participant, *field)
                            .event(record.event_name())
                            .instrument(instrument_for(data, field))
                            .value(raw)
                            .explanation(format!(
                                "Date '{raw}' is after the recorded death date ({}).",
                                death.format("%Y-%m-%d")
                            ))
                            .suggested_action(
                                "Confirm the death date; data recorded afterwards needs review.",
                            )
                            .build(),
                    );
                }
            }
        }
    }

    fn check_event_windows(
        &self,
        issues: &mut Vec<Issue>,
        data: &ProjectData,
        participant: &str,
        records: &[&Record],
        date_fields: &[&str],
        baseline: Time,
    ) {
        for record in records {
            let Some(event) = data.event(record.event_name()) else { continue };
            let Some(offset) = event.days_offset else { continue };
            let expected_min =
                baseline.date() + signed_days(event.offset_min.unwrap_or(offset));
            let expected_max =
                baseline.date() + signed_days(event.offset_max.unwrap_or(offset));

            for field in date_fields {
                let Some(raw) = record.get(field) else { continue };
                let Some(t) = value::parse_date(raw) else { continue };
                let d = t.date();
                if d < expected_min || d > expected_max {
                    issues.push(
                        IssueBuilder::new(IssueType::EventOutOfTimeline, participant, *field)
                            .event(&event.unique_event_name)
                            .instrument(instrument_for(data, field))
                            .value(raw)
                            .explanation(format!(
                                "Date '{raw}' falls outside the expected window for event \
                                 '{}' ({expected_min} to {expected_max}).",
                                event.display_name()
                            ))
                            .suggested_action(
                                "Confirm the visit date or document the protocol deviation.",
                            )
                            .build(),
                    );
                }
            }
        }
    }

    fn check_repeat_sequences(
        &self,
        issues: &mut Vec<Issue>,
        participant: &str,
        records: &[&Record],
    ) {
        let mut by_instrument: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
        for record in records {
            if let (Some(instrument), Some(instance)) =
                (record.repeat_instrument(), record.repeat_instance())
            {
                by_instrument.entry(instrument).or_default().push(instance);
            }
        }

        for (instrument, mut instances) in by_instrument {
            instances.sort_unstable();
            let gap = instances
                .iter()
                .enumerate()
                .find(|(i, inst)| **inst != *i as u32 + 1);
            if gap.is_some() {
                issues.push(
                    IssueBuilder::new(
                        IssueType::RepeatingSequenceBroken,
                        participant,
                        redqc_core::REPEAT_INSTANCE_KEY,
                    )
                    .instrument(instrument)
                    .value(format!("Sequence found: {instances:?}"))
                    .explanation(format!(
                        "Repeat instances of '{instrument}' do not form a contiguous \
                         sequence starting at 1."
                    ))
                    .suggested_action(
                        "Check for deleted or misnumbered instances of the instrument.",
                    )
                    .build(),
                );
            }
        }
    }
}

fn signed_days(days: i64) -> chrono::TimeDelta {
    chrono::TimeDelta::days(days)
}

impl Analyzer for TemporalAnalyzer {
    fn name(&self) -> &'static str {
        "temporal"
    }

    fn analyze(&self, data: &ProjectData) -> Result<Vec<Issue>, AnalyzerError> {
        let mut issues = Vec::new();
        let date_fields = data.date_fields();

        for (participant, records) in data.records_by_participant() {
            let baseline = self.baseline_date(&records, &date_fields);

            if data.is_longitudinal() {
                self.check_event_order(&mut issues, data, &participant, &records, &date_fields);
            }
            if let Some((baseline, baseline_record)) = baseline {
                self.check_followup_before_baseline(
                    &mut issues,
                    data,
                    &participant,
                    &records,
                    &date_fields,
                    baseline,
                    baseline_record,
                );
                if data.is_longitudinal() {
                    self.check_event_windows(
                        &mut issues,
                        data,
                        &participant,
                        &records,
                        &date_fields,
                        baseline,
                    );
                }
            }
            self.check_death_consistency(&mut issues, data, &participant, &records, &date_fields);
            self.check_repeat_sequences(&mut issues, &participant, &records);
        }

        tracing::debug!(count = issues.len(), "temporal analysis complete");
        Ok(issues)
    }
}
