//! The persisted task queue: a CSV table keyed by `Video File`.
//!
//! Column order of an existing file is preserved and unknown columns are
//! carried through untouched, so users can keep their own notes next to the
//! required columns.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

pub const VIDEO_FILE: &str = "Video File";
pub const SOURCE_LANGUAGE: &str = "Source Language";
pub const TARGET_LANGUAGE: &str = "Target Language";
pub const DUBBING: &str = "Dubbing";
pub const STATUS: &str = "Status";

pub const REQUIRED_COLUMNS: [&str; 5] = [VIDEO_FILE, SOURCE_LANGUAGE, TARGET_LANGUAGE, DUBBING, STATUS];

/// One queue row. Cells are addressed by column name; absent and empty cells are the same.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskRow {
    cells: HashMap<String, String>,
}

impl TaskRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }

    /// Non-empty, trimmed value of a cell.
    pub fn value(&self, column: &str) -> Option<&str> {
        Some(self.get(column).trim()).filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.cells.remove(column);
        } else {
            self.cells.insert(column.to_string(), value);
        }
    }

    pub fn video_file(&self) -> &str {
        self.get(VIDEO_FILE)
    }

    pub fn status(&self) -> &str {
        self.get(STATUS)
    }

    fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQueue {
    columns: Vec<String>,
    rows: Vec<TaskRow>,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    /// Empty queue with the required columns.
    pub fn new() -> Self {
        Self::with_columns(Vec::new())
    }

    /// Empty queue with the given columns, required columns appended when missing.
    pub fn with_columns(columns: Vec<String>) -> Self {
        let mut queue = Self {
            columns,
            rows: Vec::new(),
        };
        queue.ensure_required_columns();
        queue
    }

    fn ensure_required_columns(&mut self) {
        for required in REQUIRED_COLUMNS {
            if !self.columns.iter().any(|c| c == required) {
                self.columns.push(required.to_string());
            }
        }
    }

    /// Load the queue at `path`, or a fresh queue when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No task queue yet, starting a new one");
            return Ok(Self::new());
        }
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open task queue {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("failed to parse task queue {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let columns: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut queue = Self::with_columns(columns.clone());
        for record in csv_reader.records() {
            let record = record?;
            let mut row = TaskRow::new();
            for (column, value) in columns.iter().zip(record.iter()) {
                if !column.is_empty() && !value.is_empty() {
                    row.set(column, value);
                }
            }
            if !row.is_blank() {
                queue.rows.push(row);
            }
        }
        Ok(queue)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.columns)?;
        for row in &self.rows {
            csv_writer.write_record(self.columns.iter().map(|c| row.get(c)))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Replace the file at `path` with this queue. Written to a sibling temp file, then renamed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("csv.tmp");
        {
            let file = std::fs::File::create(&temp_path)
                .with_context(|| format!("failed to create {}", temp_path.display()))?;
            self.to_writer(std::io::BufWriter::new(file))?;
        }
        std::fs::rename(&temp_path, path)
            .with_context(|| format!("failed to replace task queue {}", path.display()))?;
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TaskRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&TaskRow> {
        self.rows.get(index)
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut TaskRow> {
        self.rows.get_mut(index)
    }

    pub fn push(&mut self, row: TaskRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
