use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;

use crate::error::{JaavisError, Result};

/// Envelope for every robot-mode payload.
#[derive(Serialize)]
pub struct RobotResponse<T> {
    pub status: RobotStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Same fields as a bare error line, so callers can check `error` either way.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub error: Option<RobotError>,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Ok,
    Partial { completed: usize, failed: usize },
    /// The command stopped with an error; `data` holds what it got done.
    Error,
}

#[derive(Serialize)]
pub struct RobotError {
    pub error: bool,
    pub code: &'static str,
    pub message: String,
}

pub fn robot_ok<T: Serialize>(data: T) -> RobotResponse<T> {
    RobotResponse {
        status: RobotStatus::Ok,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data,
        warnings: Vec::new(),
        error: None,
    }
}

pub fn robot_error<T: Serialize>(data: T, err: &JaavisError) -> RobotResponse<T> {
    let mut response = robot_ok(data);
    response.status = RobotStatus::Error;
    response.error = Some(RobotError {
        error: true,
        code: err.code(),
        message: err.to_string(),
    });
    response
}

/// Print `data` under an error envelope and return `err` marked as reported,
/// so `main` exits non-zero without printing a second JSON document.
pub fn emit_robot_error<T: Serialize>(data: T, err: JaavisError) -> JaavisError {
    match emit_robot(&robot_error(data, &err)) {
        Ok(()) => JaavisError::Reported(Box::new(err)),
        Err(emit_err) => emit_err,
    }
}

/// `Partial` when anything failed, `Ok` otherwise.
pub fn robot_partial<T: Serialize>(data: T, completed: usize, failed: usize) -> RobotResponse<T> {
    let mut response = robot_ok(data);
    if failed > 0 {
        response.status = RobotStatus::Partial { completed, failed };
    }
    response
}

impl<T> RobotResponse<T> {
    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

pub fn emit_robot<T: Serialize>(response: &RobotResponse<T>) -> Result<()> {
    emit_json(response)
}

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| JaavisError::Serialization(format!("serialize output: {err}")))?;
    println!("{payload}");
    Ok(())
}

pub struct HumanLayout {
    lines: Vec<String>,
    key_width: usize,
}

impl Default for HumanLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanLayout {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            key_width: 18,
        }
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        self.lines.push(style(text).bold().cyan().to_string());
        self.lines.push(String::new());
        self
    }

    pub fn section(&mut self, text: &str) -> &mut Self {
        self.lines.push(style(text).bold().to_string());
        self.lines.push("-".repeat(text.len().max(3)));
        self
    }

    pub fn kv(&mut self, key: &str, value: &str) -> &mut Self {
        // Pad before styling; escape codes would eat the width.
        let padded = format!("{key:width$}", width = self.key_width);
        self.lines.push(format!("{} {value}", style(padded).dim()));
        self
    }

    pub fn bullet(&mut self, text: &str) -> &mut Self {
        self.lines.push(format!("- {text}"));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    #[must_use]
    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

pub fn emit_human(layout: HumanLayout) {
    println!("{}", layout.build());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_only_when_something_failed() {
        let ok = serde_json::to_value(robot_partial(1, 2, 0)).unwrap();
        assert_eq!(ok["status"], "ok");
        let partial = serde_json::to_value(robot_partial(1, 2, 1)).unwrap();
        assert_eq!(partial["status"]["partial"]["failed"], 1);
    }

    #[test]
    fn error_envelope_keeps_data_and_code() {
        let err = JaavisError::Execution {
            step: "Step 2".to_string(),
            exit_code: 1,
        };
        let value = serde_json::to_value(robot_error(serde_json::json!({"ran": 2}), &err)).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], true);
        assert_eq!(value["code"], "execution_failure");
        assert_eq!(value["data"]["ran"], 2);

        let ok = serde_json::to_value(robot_ok(1)).unwrap();
        assert!(ok.get("error").is_none());
    }

    #[test]
    fn layout_keeps_line_order() {
        let mut layout = HumanLayout::new();
        layout.bullet("one").blank().push_line("two");
        assert_eq!(layout.build(), "- one\n\ntwo");
    }
}
