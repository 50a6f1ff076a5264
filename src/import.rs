//! Bulk import of jobs and downtime from comma-separated text.
//!
//! # Formats
//!
//! Jobs (header required, columns in any order):
//!
//! ```text
//! job_id,product_type,processing_time,due_time,priority,machine_options
//! J001,P_A,60,10:30,rush,M1;M2
//! ```
//!
//! `priority` is optional (default `normal`); `machine_options` is
//! `;`-separated.
//!
//! Downtime:
//!
//! ```text
//! machine_id,downtime_start,downtime_end,reason
//! M1,2024-03-01 10:00,2024-03-01 12:00,Maintenance
//! ```
//!
//! `reason` is optional. Fields may be double-quoted to carry commas.
//! A bad row is reported with its line number and
//! skipped; it never aborts the rest of the batch.

use chrono::{NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use tracing::warn;

use crate::models::{DowntimeWindow, Job, Machine, Priority};

const DEFAULT_DOWNTIME_REASON: &str = "Planned maintenance";

/// A row that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based line number in the input text.
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for RowError {}

/// Parsed records plus per-row failures.
#[derive(Debug, Clone, PartialEq)]
pub struct Imported<T> {
    pub records: Vec<T>,
    pub errors: Vec<RowError>,
}

impl<T> Imported<T> {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn fail(&mut self, line: usize, message: impl Into<String>) {
        let error = RowError {
            line,
            message: message.into(),
        };
        warn!(line, error = %error.message, "import row rejected");
        self.errors.push(error);
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A downtime row addressed to a machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DowntimeRecord {
    pub line: usize,
    pub machine_id: String,
    pub window: DowntimeWindow,
}

/// Header name to field index.
struct Columns(HashMap<String, usize>);

impl Columns {
    fn new(header: &StringRecord) -> Self {
        Self(
            header
                .iter()
                .enumerate()
                .map(|(i, name)| (name.to_ascii_lowercase(), i))
                .collect(),
        )
    }

    fn missing(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|c| !self.0.contains_key(**c))
            .map(|c| c.to_string())
            .collect()
    }

    fn get<'r>(&self, row: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.0
            .get(column)
            .and_then(|&i| row.get(i))
            .filter(|v| !v.is_empty())
    }

    fn require<'r>(&self, row: &'r StringRecord, column: &str) -> Result<&'r str, String> {
        self.get(row, column)
            .ok_or_else(|| format!("missing {column}"))
    }
}

fn line_of(record: &StringRecord) -> usize {
    record.position().map_or(0, |p| p.line() as usize)
}

fn error_line(e: &csv::Error) -> usize {
    e.position().map_or(0, |p| p.line() as usize)
}

/// Reads a headed table, handing each row to `build`.
fn import<T, F>(text: &str, required: &[&str], mut build: F) -> Imported<T>
where
    F: FnMut(&Columns, &StringRecord, usize) -> Result<T, String>,
{
    let mut out = Imported::new();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns = match reader.headers() {
        Ok(header) if header.iter().all(str::is_empty) => return out,
        Ok(header) => {
            let columns = Columns::new(header);
            let missing = columns.missing(required);
            if !missing.is_empty() {
                let line = line_of(header).max(1);
                out.fail(line, format!("missing column(s): {}", missing.join(", ")));
                return out;
            }
            columns
        }
        Err(e) => {
            out.fail(error_line(&e), e.to_string());
            return out;
        }
    };

    for row in reader.records() {
        match row {
            Ok(row) => {
                let line = line_of(&row);
                match build(&columns, &row, line) {
                    Ok(record) => out.records.push(record),
                    Err(message) => out.fail(line, message),
                }
            }
            Err(e) => out.fail(error_line(&e), e.to_string()),
        }
    }
    out
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    ["%H:%M", "%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(value, fmt).ok())
        .or_else(|| parse_timestamp(value).map(|ts| ts.time()))
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

const JOB_COLUMNS: [&str; 5] = [
    "job_id",
    "product_type",
    "processing_time",
    "due_time",
    "machine_options",
];

/// Parses job rows.
pub fn parse_jobs(text: &str) -> Imported<Job> {
    import(text, &JOB_COLUMNS, |columns, row, _| job_from_row(columns, row))
}

fn job_from_row(columns: &Columns, row: &StringRecord) -> Result<Job, String> {
    let job_id = columns.require(row, "job_id")?;
    let product = columns.require(row, "product_type")?;

    let raw = columns.require(row, "processing_time")?;
    let minutes: i64 = raw
        .parse()
        .map_err(|_| format!("invalid processing_time '{raw}' for {job_id}"))?;
    if minutes <= 0 {
        return Err(format!("processing_time must be positive for {job_id}"));
    }

    let raw = columns.require(row, "due_time")?;
    let due = parse_time(raw).ok_or_else(|| format!("invalid due_time '{raw}' for {job_id}"))?;

    let priority = match columns.get(row, "priority") {
        Some(raw) => Priority::parse(raw).ok_or_else(|| format!("invalid priority '{raw}' for {job_id}"))?,
        None => Priority::Normal,
    };

    let options = columns
        .require(row, "machine_options")?
        .split(';')
        .map(str::trim)
        .filter(|m| !m.is_empty());

    Ok(Job::new(job_id, product, minutes, due)
        .with_priority(priority)
        .with_machine_options(options))
}

const DOWNTIME_COLUMNS: [&str; 3] = ["machine_id", "downtime_start", "downtime_end"];

/// Parses downtime rows.
pub fn parse_downtime(text: &str) -> Imported<DowntimeRecord> {
    import(text, &DOWNTIME_COLUMNS, downtime_from_row)
}

fn downtime_from_row(columns: &Columns, row: &StringRecord, line: usize) -> Result<DowntimeRecord, String> {
    let machine_id = columns.require(row, "machine_id")?;
    let raw = columns.require(row, "downtime_start")?;
    let start = parse_timestamp(raw).ok_or_else(|| format!("invalid date format for {machine_id}: '{raw}'"))?;
    let raw = columns.require(row, "downtime_end")?;
    let end = parse_timestamp(raw).ok_or_else(|| format!("invalid date format for {machine_id}: '{raw}'"))?;
    let reason = columns.get(row, "reason").unwrap_or(DEFAULT_DOWNTIME_REASON);

    let window = DowntimeWindow::new(machine_id, start, end, reason).map_err(|e| e.to_string())?;
    Ok(DowntimeRecord {
        line,
        machine_id: machine_id.to_string(),
        window,
    })
}

/// Adds imported downtime to matching machines.
///
/// Records naming an unknown machine are returned as row errors.
pub fn apply_downtime(records: Vec<DowntimeRecord>, machines: &mut [Machine]) -> Vec<RowError> {
    let mut errors = Vec::new();
    for record in records {
        let Some(machine) = machines.iter_mut().find(|m| m.machine_id == record.machine_id) else {
            warn!(line = record.line, machine_id = %record.machine_id, "downtime for unknown machine");
            errors.push(RowError {
                line: record.line,
                message: format!("Machine {} not found", record.machine_id),
            });
            continue;
        };
        let DowntimeWindow { start, end, reason } = record.window;
        if let Err(e) = machine.add_downtime(start, end, reason) {
            errors.push(RowError {
                line: record.line,
                message: e.to_string(),
            });
        }
    }
    errors
}
