//! JSONL event store.
//!
//! Reads machine-state records exported by the plant gateway as JSON Lines
//! (one device record per line, device field names) and converts them into
//! validated [`MachineEvent`]s for the aggregation engine. Malformed lines
//! are logged and skipped; a bad record never fails a load.

use std::collections::{BTreeSet, HashSet};
use std::io::BufRead;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use report_core::error::{ReportError, Result};
use report_core::models::MachineEvent;
use report_core::time_utils::{parse_date, parse_time};

/// Device stored-log ids above this value mark a retransmission of
/// `id - RETRANSMIT_OFFSET`.
const RETRANSMIT_OFFSET: u32 = 1000;

// ── Wire record ───────────────────────────────────────────────────────────────

/// One raw line as the gateway writes it, device field names and all.
///
/// Dates and times stay strings here because the devices send more than one
/// format; `into_event` normalises them.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "MACHINE_ID")]
    pub machine_id: u32,
    #[serde(rename = "LINE_NUMB", default)]
    pub line_numb: Option<u32>,
    #[serde(rename = "OPERATOR_ID", default)]
    pub operator_id: Option<String>,
    #[serde(rename = "DATE")]
    pub date: String,
    #[serde(rename = "START_TIME")]
    pub start_time: String,
    #[serde(rename = "END_TIME")]
    pub end_time: String,
    #[serde(rename = "MODE")]
    pub mode: u8,
    #[serde(rename = "STITCH_COUNT", default)]
    pub stitch_count: u32,
    #[serde(rename = "NEEDLE_RUNTIME", default)]
    pub needle_runtime: f64,
    /// Speed sample; the devices write this field as either number or text.
    #[serde(rename = "RESERVE", default)]
    pub reserve: Option<Value>,
    #[serde(rename = "Str_LOGID", default)]
    pub str_logid: u32,
    #[serde(rename = "Tx_LOGID", default)]
    pub tx_logid: u32,
}

impl RawRecord {
    /// Validate and convert into a typed [`MachineEvent`].
    pub fn into_event(self) -> Result<MachineEvent> {
        let date = parse_date(&self.date)?;
        let start_time = parse_time(&self.start_time)?;
        let end_time = parse_time(&self.end_time)?;

        Ok(MachineEvent {
            machine_id: self.machine_id,
            line_number: self.line_numb,
            operator_id: self.operator_id.filter(|id| !id.is_empty()),
            date,
            start_time,
            end_time,
            mode_code: self.mode,
            stitch_count: self.stitch_count,
            needle_runtime: self.needle_runtime,
            speed: reserve_to_speed(self.reserve.as_ref()),
        })
    }
}

/// Coerce the reserve field to a numeric speed sample.
///
/// The column is free text on the device side; unparseable values count as
/// a zero sample rather than dropping the event.
fn reserve_to_speed(reserve: Option<&Value>) -> f64 {
    match reserve {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return 0.0;
            }
            trimmed.parse::<f64>().unwrap_or_else(|_| {
                warn!("unparseable RESERVE value \"{}\"; using 0", s);
                0.0
            })
        }
        Some(other) => {
            warn!("unexpected RESERVE value {}; using 0", other);
            0.0
        }
    }
}

// ── EventStore trait ──────────────────────────────────────────────────────────

/// The queryable event collection the report engine depends on.
///
/// Results carry no ordering guarantee; the engine does not depend on input
/// order.
pub trait EventStore {
    /// Every date with at least one event.
    fn dates(&self) -> Vec<NaiveDate>;
    /// All events for one date.
    fn events_for(&self, date: NaiveDate) -> Vec<MachineEvent>;
}

// ── JsonlEventStore ───────────────────────────────────────────────────────────

/// In-memory event store loaded from a directory of `.jsonl` files.
#[derive(Debug, Clone, Default)]
pub struct JsonlEventStore {
    events: Vec<MachineEvent>,
}

impl JsonlEventStore {
    /// Load every `.jsonl` file under `data_path` (recursively).
    ///
    /// Errors only when the directory itself is missing; unreadable files
    /// and malformed lines are logged and skipped. Retransmitted stored
    /// logs (`Str_LOGID > 1000` whose base id was already seen for the same
    /// machine and date) are dropped.
    pub fn load(data_path: &Path) -> Result<JsonlEventStore> {
        if !data_path.exists() {
            return Err(ReportError::DataPathNotFound(data_path.to_path_buf()));
        }

        let files = find_jsonl_files(data_path);
        let mut events = Vec::new();
        let mut seen_log_ids: HashSet<(u32, NaiveDate, u32)> = HashSet::new();
        let mut skipped = 0usize;
        let mut duplicates = 0usize;

        for file in &files {
            let handle = match std::fs::File::open(file) {
                Ok(h) => h,
                Err(e) => {
                    warn!("failed to open {}: {}", file.display(), e);
                    continue;
                }
            };

            for (line_no, line) in std::io::BufReader::new(handle).lines().enumerate() {
                let line = match line {
                    Ok(l) => l,
                    Err(e) => {
                        warn!("read error in {} line {}: {}", file.display(), line_no + 1, e);
                        skipped += 1;
                        continue;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                let record: RawRecord = match serde_json::from_str(&line) {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(
                            "malformed record in {} line {}: {}",
                            file.display(),
                            line_no + 1,
                            e
                        );
                        skipped += 1;
                        continue;
                    }
                };

                let str_logid = record.str_logid;
                let event = match record.into_event() {
                    Ok(e) => e,
                    Err(e) => {
                        warn!(
                            "invalid record in {} line {}: {}",
                            file.display(),
                            line_no + 1,
                            e
                        );
                        skipped += 1;
                        continue;
                    }
                };

                let base_id = if str_logid > RETRANSMIT_OFFSET {
                    str_logid - RETRANSMIT_OFFSET
                } else {
                    str_logid
                };
                let key = (event.machine_id, event.date, base_id);
                if str_logid > RETRANSMIT_OFFSET && seen_log_ids.contains(&key) {
                    debug!(
                        "retransmitted stored log skipped: machine={} date={} id={}",
                        event.machine_id, event.date, str_logid
                    );
                    duplicates += 1;
                    continue;
                }
                seen_log_ids.insert(key);
                events.push(event);
            }
        }

        debug!(
            "loaded {} events from {} files ({} skipped, {} retransmissions)",
            events.len(),
            files.len(),
            skipped,
            duplicates
        );

        Ok(JsonlEventStore { events })
    }

    /// Build a store from already-typed events (tests, fixtures).
    pub fn from_events(events: Vec<MachineEvent>) -> JsonlEventStore {
        JsonlEventStore { events }
    }

    /// Number of loaded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the store holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventStore for JsonlEventStore {
    fn dates(&self) -> Vec<NaiveDate> {
        let set: BTreeSet<NaiveDate> = self.events.iter().map(|e| e.date).collect();
        set.into_iter().collect()
    }

    fn events_for(&self, date: NaiveDate) -> Vec<MachineEvent> {
        self.events
            .iter()
            .filter(|e| e.date == date)
            .cloned()
            .collect()
    }
}

// ── File discovery ────────────────────────────────────────────────────────────

/// Find all `.jsonl` files recursively under `data_path`, sorted by path.
pub fn find_jsonl_files(data_path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "jsonl")
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

// ── Tests ─────────────────────────────────────────────────────────────────────
