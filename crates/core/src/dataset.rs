//! The immutable project dataset handed to every analyzer.

use crate::{Event, FieldDefinition, LogEntry, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Container for all project inputs. Loaded once per run, read-only
/// during it; the fetch/transport mechanism is out of scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectData {
    /// Field definitions, in data-dictionary order
    pub metadata: Vec<FieldDefinition>,

    /// Captured data rows
    pub records: Vec<Record>,

    /// Declared events, in protocol order (empty = classic project)
    #[serde(default)]
    pub events: Vec<Event>,

    /// Audit-log entries
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl ProjectData {
    /// Field metadata by name.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.metadata.iter().find(|f| f.field_name == name)
    }

    /// Event metadata by unique name.
    pub fn event(&self, unique_name: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.unique_event_name == unique_name)
    }

    /// Name of the record-id field: first metadata field by convention.
    pub fn record_id_field(&self) -> &str {
        self.metadata
            .first()
            .map(|f| f.field_name.as_str())
            .unwrap_or("record_id")
    }

    /// Whether the project is longitudinal.
    pub fn is_longitudinal(&self) -> bool {
        !self.events.is_empty()
    }

    /// Field-name → form-name map, used to back-fill instrument names.
    pub fn field_to_form(&self) -> HashMap<&str, &str> {
        self.metadata
            .iter()
            .map(|f| (f.field_name.as_str(), f.form_name.as_str()))
            .collect()
    }

    /// Names of all date-typed fields, in dictionary order.
    pub fn date_fields(&self) -> Vec<&str> {
        self.metadata
            .iter()
            .filter(|f| f.is_date_field())
            .map(|f| f.field_name.as_str())
            .collect()
    }

    /// Records grouped by participant, preserving input order.
    pub fn records_by_participant(&self) -> Vec<(String, Vec<&Record>)> {
        let id_field = self.record_id_field();
        let mut order: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, Vec<&Record>> = HashMap::new();
        for record in &self.records {
            let id = record.get(id_field).unwrap_or("UNKNOWN").to_string();
            if !grouped.contains_key(&id) {
                order.push(id.clone());
            }
            grouped.entry(id).or_default().push(record);
        }
        order
            .into_iter()
            .map(|id| {
                let records = grouped.remove(&id).unwrap_or_default();
                (id, records)
            })
            .collect()
    }

    /// Count of distinct participants.
    pub fn unique_record_count(&self) -> usize {
        let id_field = self.record_id_field();
        let mut seen = std::collections::HashSet::new();
        for record in &self.records {
            seen.insert(record.get(id_field).unwrap_or("UNKNOWN"));
        }
        seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldType;

    fn field(name: &str, form: &str) -> FieldDefinition {
        FieldDefinition {
            field_name: name.into(),
            form_name: form.into(),
            field_type: FieldType::Text,
            field_label: name.into(),
            validation: None,
            min: None,
            max: None,
            required: false,
            branching_logic: None,
            choices: None,
        }
    }

    #[test]
    fn test_record_id_field_convention() {
        let mut data = ProjectData::default();
        assert_eq!(data.record_id_field(), "record_id");
        data.metadata.push(field("participant_id", "demographics"));
        data.metadata.push(field("age", "demographics"));
        assert_eq!(data.record_id_field(), "participant_id");
    }

    #[test]
    fn test_grouping_and_unique_count() {
        let mut data = ProjectData::default();
        data.metadata.push(field("record_id", "demographics"));
        data.records.push(Record::from([("record_id", "1")]));
        data.records.push(Record::from([("record_id", "2")]));
        data.records.push(Record::from([("record_id", "1")]));

        let grouped = data.records_by_participant();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0, "1");
        assert_eq!(grouped[0].1.len(), 2);
        assert_eq!(data.unique_record_count(), 2);
    }

    #[test]
    fn test_date_fields() {
        let mut data = ProjectData::default();
        let mut f = field("visit_date", "visits");
        f.validation = Some("date_ymd".into());
        data.metadata.push(field("record_id", "demographics"));
        data.metadata.push(f);
        assert_eq!(data.date_fields(), vec!["visit_date"]);
    }
}
