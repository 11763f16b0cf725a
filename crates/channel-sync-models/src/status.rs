use serde::{Deserialize, Serialize};

/// Processing status of a task queue row, as stored in the `Status` column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    /// Empty cell: never processed, or reset by a merge
    Pending,
    Done,
    /// `Error: <step> - <message>`
    Error { step: String, message: String },
    /// Any other free-form value a human typed in
    Other(String),
}

impl TaskStatus {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return TaskStatus::Pending;
        }
        if trimmed.eq_ignore_ascii_case("done") {
            return TaskStatus::Done;
        }
        if let Some(rest) = trimmed.strip_prefix("Error: ") {
            let (step, message) = match rest.split_once(" - ") {
                Some((step, message)) => (step, message),
                None => (rest, ""),
            };
            return TaskStatus::Error {
                step: step.to_string(),
                message: message.to_string(),
            };
        }
        TaskStatus::Other(value.to_string())
    }

    pub fn unhandled(message: impl Into<String>) -> Self {
        TaskStatus::Error {
            step: "Unhandled exception".to_string(),
            message: message.into(),
        }
    }

    /// Status a managed row carries across a merge: `Done` survives, everything else resets.
    pub fn normalized_for_queue(&self) -> Self {
        match self {
            TaskStatus::Done => TaskStatus::Done,
            _ => TaskStatus::Pending,
        }
    }

    /// Rows still waiting for work, or whose last attempt failed.
    /// Any status text containing `Error` counts as a failed attempt.
    pub fn needs_processing(value: &str) -> bool {
        value.trim().is_empty() || value.contains("Error")
    }

    pub fn to_cell(&self) -> String {
        match self {
            TaskStatus::Pending => String::new(),
            TaskStatus::Done => "Done".to_string(),
            TaskStatus::Error { step, message } => format!("Error: {} - {}", step, message),
            TaskStatus::Other(value) => value.clone(),
        }
    }
}
