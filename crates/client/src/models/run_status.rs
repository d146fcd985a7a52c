//! Canonical run outcome and the per-model run status record.
//!
//! The Discovery API reports outcomes as strings (`success`, `error`,
//! `skipped`, ...) while the REST API uses integer codes. Both map onto
//! [`RunOutcome`]; anything unrecognized is a validation error.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::error::{ClientError, Result};

/// Outcome of a model, test or job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunOutcome {
    Success,
    Error,
    Skipped,
    Cancelled,
    /// Queued, starting or running (REST only).
    Running,
}

impl RunOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Skipped => "skipped",
            Self::Cancelled => "cancelled",
            Self::Running => "running",
        }
    }

    /// Map a dbt Cloud REST run status code.
    pub fn from_rest_code(code: i64) -> Result<Self> {
        match code {
            1..=3 => Ok(Self::Running),
            10 => Ok(Self::Success),
            20 => Ok(Self::Error),
            30 => Ok(Self::Cancelled),
            other => Err(ClientError::validation(
                "RunOutcome",
                format!("unknown run status code {other}"),
            )),
        }
    }

    /// Whether the run has finished.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl FromStr for RunOutcome {
    type Err = ClientError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "error" | "failure" | "fail" => Ok(Self::Error),
            "skipped" | "skip" => Ok(Self::Skipped),
            "cancelled" | "canceled" | "cancel" => Ok(Self::Cancelled),
            "running" | "queued" | "starting" => Ok(Self::Running),
            _ => Err(ClientError::validation(
                "RunOutcome",
                format!("unknown run status '{raw}'"),
            )),
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RunOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RunOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Result of one run of one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatus {
    pub status: RunOutcome,
    pub run_id: Option<i64>,
    pub run_at: Option<DateTime<Utc>>,
    /// Seconds; never negative.
    pub execution_time: Option<f64>,
    /// Only populated when `status` is `Error`.
    pub error_message: Option<String>,
}

impl RunStatus {
    pub fn new(
        status: RunOutcome,
        run_id: Option<i64>,
        run_at: Option<DateTime<Utc>>,
        execution_time: Option<f64>,
        error_message: Option<String>,
    ) -> Result<Self> {
        if let Some(secs) = execution_time
            && (secs.is_nan() || secs < 0.0)
        {
            return Err(ClientError::validation(
                "RunStatus",
                format!("execution_time must be a non-negative number of seconds, got {secs}"),
            ));
        }
        let error_message = match status {
            RunOutcome::Error => error_message,
            _ => None,
        };
        Ok(Self {
            status,
            run_id,
            run_at,
            execution_time,
            error_message,
        })
    }

    /// Mapping view used where callers expect a plain record.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("status".into(), json!(self.status.as_str()));
        map.insert("run_id".into(), json!(self.run_id));
        map.insert(
            "run_at".into(),
            json!(self.run_at.map(|ts| ts.to_rfc3339())),
        );
        map.insert("execution_time".into(), json!(self.execution_time));
        map.insert("error_message".into(), json!(self.error_message));
        map
    }
}
