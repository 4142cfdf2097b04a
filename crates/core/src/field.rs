//! Field metadata as exported from the data dictionary.

use serde::{Deserialize, Serialize};

/// Field type from the data dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free-text input
    Text,
    /// Multi-line notes
    Notes,
    /// Calculated field
    Calc,
    /// Dropdown select
    Dropdown,
    /// Radio buttons
    Radio,
    /// Checkbox group (expands to `field___code` sub-fields)
    Checkbox,
    /// Yes/no toggle
    Yesno,
    /// True/false toggle
    Truefalse,
    /// Slider widget
    Slider,
    /// File upload
    File,
    /// Display-only text
    Descriptive,
    /// Any type this engine has no special handling for
    #[serde(other)]
    Unknown,
}

impl FieldType {
    /// Whether this type declares an enumerated choice list.
    pub fn has_choices(&self) -> bool {
        matches!(self, FieldType::Dropdown | FieldType::Radio | FieldType::Checkbox)
    }
}

/// Metadata for one field, loaded once per run and read-only after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Unique field name
    pub field_name: String,

    /// Owning form (instrument) name
    pub form_name: String,

    /// Field type
    pub field_type: FieldType,

    /// Human-readable label
    pub field_label: String,

    /// Validation type (`date_ymd`, `integer`, `number`, `email`, ...)
    #[serde(default)]
    pub validation: Option<String>,

    /// Declared minimum, as exported (string)
    #[serde(default)]
    pub min: Option<String>,

    /// Declared maximum, as exported (string)
    #[serde(default)]
    pub max: Option<String>,

    /// Required flag
    #[serde(default)]
    pub required: bool,

    /// Conditional-visibility expression, if any
    #[serde(default)]
    pub branching_logic: Option<String>,

    /// Raw choice list: `"code, Label | code, Label"`
    #[serde(default)]
    pub choices: Option<String>,
}

impl FieldDefinition {
    /// Whether this field is governed by a conditional expression.
    pub fn has_branching_logic(&self) -> bool {
        self.branching_logic
            .as_deref()
            .map(|l| !l.trim().is_empty())
            .unwrap_or(false)
    }

    /// Whether the validation type marks this as a date/datetime field.
    pub fn is_date_field(&self) -> bool {
        self.validation
            .as_deref()
            .map(|v| v.to_lowercase().contains("date"))
            .unwrap_or(false)
    }

    /// Parsed choice list in declared order, as `(code, label)` pairs.
    ///
    /// Only choice-bearing field types carry choices; anything else
    /// yields an empty list even when the raw string is present
    /// (calc fields reuse the same column for their formula).
    pub fn parsed_choices(&self) -> Vec<(String, String)> {
        if !self.field_type.has_choices() {
            return Vec::new();
        }
        let Some(raw) = self.choices.as_deref() else {
            return Vec::new();
        };
        raw.split('|')
            .filter_map(|item| {
                let item = item.trim();
                let (code, label) = item.split_once(',')?;
                Some((code.trim().to_string(), label.trim().to_string()))
            })
            .collect()
    }

    /// Whether `code` is a declared choice code.
    pub fn has_choice_code(&self, code: &str) -> bool {
        self.parsed_choices().iter().any(|(c, _)| c == code)
    }
}
