//! Flat export of study responses
//!
//! One row per response, joined with its participant and trial. The trial
//! payload's ground-truth and AI fields are flattened next to the answer.
//!
//! AI confidence resolves in this order:
//! 1. the value logged with the response
//! 2. the value embedded in the trial (payload, then trial-level field)
//! 3. [`DEFAULT_AI_CONFIDENCE`]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{Condition, ParticipantId, ParticipantRecord, ResponseRecord, TrialId, TrialRecord};
use crate::{Error, Result};

/// Confidence reported when neither the response nor the trial carries one.
pub const DEFAULT_AI_CONFIDENCE: f64 = 0.75;

/// Column order of the tabular export.
pub const EXPORT_HEADERS: [&str; 13] = [
    "response_id",
    "participant_id",
    "condition",
    "trial_id",
    "answer_value",
    "rt_ms",
    "revealed_ai",
    "gt_severity_score",
    "gt_justification",
    "ai_severity_score",
    "ai_justification",
    "ai_confidence",
    "dilemma_text",
];

/// Resolve the AI confidence for a response (or for a bare trial).
#[must_use]
pub fn resolve_ai_confidence(response: Option<&ResponseRecord>, trial: &TrialRecord) -> f64 {
    response
        .and_then(ResponseRecord::ai_confidence)
        .or_else(|| trial.embedded_ai_confidence())
        .unwrap_or(DEFAULT_AI_CONFIDENCE)
}

/// Export serialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Header row plus one comma-separated line per response.
    #[default]
    Csv,
    /// JSON array of records.
    Json,
}

impl ExportFormat {
    /// Format name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    /// MIME type of the rendered body.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }

    /// Parse an optional format parameter; absent means CSV.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for anything but `csv` or `json`.
    pub fn from_param(param: Option<&str>) -> Result<Self> {
        param.map_or(Ok(Self::Csv), str::parse)
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(Error::InvalidInput(format!(
                "unknown export format '{other}' (expected 'csv' or 'json')"
            ))),
        }
    }
}

/// One exported response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    /// Response ID.
    pub response_id: u64,
    /// Participant ID.
    pub participant_id: ParticipantId,
    /// Participant's condition.
    pub condition: Condition,
    /// Trial ID.
    pub trial_id: TrialId,
    /// `value` of the submitted answer.
    pub answer_value: Option<Value>,
    /// Reaction time in milliseconds.
    pub rt_ms: u64,
    /// Whether the AI suggestion was revealed.
    pub revealed_ai: bool,
    /// Ground-truth severity score.
    pub gt_severity_score: Option<Value>,
    /// Ground-truth justification.
    pub gt_justification: Option<Value>,
    /// AI severity score.
    pub ai_severity_score: Option<Value>,
    /// AI justification.
    pub ai_justification: Option<Value>,
    /// Resolved AI confidence.
    pub ai_confidence: f64,
    /// Dilemma text on a single line.
    pub dilemma_text: String,
}

impl ExportRow {
    /// Join one response with its participant and trial.
    #[must_use]
    pub fn from_records(response: &ResponseRecord, participant: &ParticipantRecord, trial: &TrialRecord) -> Self {
        Self {
            response_id: response.response_id(),
            participant_id: response.participant_id(),
            condition: participant.condition(),
            trial_id: response.trial_id(),
            answer_value: response.answer_value().cloned(),
            rt_ms: response.rt_ms(),
            revealed_ai: response.revealed_ai(),
            gt_severity_score: trial.field("gt_severity_score").cloned(),
            gt_justification: trial.field("gt_justification").cloned(),
            ai_severity_score: trial.field("ai_severity_score").cloned(),
            ai_justification: trial.field("ai_justification").cloned(),
            ai_confidence: resolve_ai_confidence(Some(response), trial),
            dilemma_text: trial.dilemma_text(),
        }
    }

    fn csv_cells(&self) -> [String; 13] {
        [
            self.response_id.to_string(),
            self.participant_id.to_string(),
            self.condition.to_string(),
            self.trial_id.to_string(),
            value_cell(self.answer_value.as_ref()),
            self.rt_ms.to_string(),
            self.revealed_ai.to_string(),
            value_cell(self.gt_severity_score.as_ref()),
            value_cell(self.gt_justification.as_ref()),
            value_cell(self.ai_severity_score.as_ref()),
            value_cell(self.ai_justification.as_ref()),
            self.ai_confidence.to_string(),
            self.dilemma_text.clone(),
        ]
    }
}

/// Rendered export.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportPayload {
    /// CSV text including the header row.
    Csv(String),
    /// Array of records.
    Json(Vec<ExportRow>),
}

impl ExportPayload {
    /// Render rows in the requested format.
    #[must_use]
    pub fn render(format: ExportFormat, rows: Vec<ExportRow>) -> Self {
        match format {
            ExportFormat::Csv => Self::Csv(to_csv(&rows)),
            ExportFormat::Json => Self::Json(rows),
        }
    }

    /// Format of this payload.
    #[must_use]
    pub const fn format(&self) -> ExportFormat {
        match self {
            Self::Csv(_) => ExportFormat::Csv,
            Self::Json(_) => ExportFormat::Json,
        }
    }

    /// Serialized body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if JSON encoding fails.
    pub fn to_body(&self) -> Result<String> {
        match self {
            Self::Csv(text) => Ok(text.clone()),
            Self::Json(rows) => Ok(serde_json::to_string(rows)?),
        }
    }
}

/// Render rows as CSV with a fixed header.
#[must_use]
pub fn to_csv(rows: &[ExportRow]) -> String {
    let mut out = EXPORT_HEADERS.join(",");
    out.push('\n');
    for row in rows {
        let cells: Vec<String> = row.csv_cells().iter().map(|cell| csv_escape(cell)).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

fn value_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
