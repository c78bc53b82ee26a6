//! Loading position reports from a CSV export into the log at startup.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::log::MemoryLog;
use crate::model::NewPosition;

#[derive(thiserror::Error, Debug)]
pub enum SeedError {
    #[error("could not open seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not read seed csv: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedReport {
    pub loaded: usize,
    pub skipped: usize,
}

#[derive(Deserialize, Debug)]
struct SeedRow {
    bus_id: Option<String>,
    route_id: Option<String>,
    trip_id: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    bearing: Option<f64>,
    speed: Option<f64>,
    timestamp: Option<DateTime<Utc>>,
    current_stop_sequence: Option<i32>,
    stop_id: Option<String>,
    current_status: Option<String>,
    collected_at: Option<DateTime<Utc>>,
}

impl SeedRow {
    /// `None` when the row lacks a bus id, coordinates or a timestamp.
    fn into_position(self) -> Option<NewPosition> {
        let bus_id = self.bus_id.filter(|id| !id.trim().is_empty())?;
        let timestamp = self.timestamp?;
        Some(NewPosition {
            bus_id,
            route_id: self.route_id,
            trip_id: self.trip_id,
            latitude: self.latitude?,
            longitude: self.longitude?,
            bearing: self.bearing,
            speed: self.speed,
            timestamp,
            current_stop_sequence: self.current_stop_sequence,
            stop_id: self.stop_id,
            current_status: self.current_status,
            collected_at: self.collected_at.unwrap_or(timestamp),
        })
    }
}

/// Parse reports from CSV, sorted by timestamp. Unusable rows are skipped.
pub fn read_positions(reader: impl Read) -> Result<(Vec<NewPosition>, SeedReport), SeedError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut report = SeedReport::default();
    let mut positions = Vec::new();
    for (line, result) in rdr.deserialize::<SeedRow>().enumerate() {
        match result.map(SeedRow::into_position) {
            Ok(Some(position)) => positions.push(position),
            Ok(None) => {
                warn!(row = line + 1, "skipping report without bus id, position or timestamp");
                report.skipped += 1;
            }
            Err(e) => {
                warn!(row = line + 1, error = %e, "skipping unreadable report");
                report.skipped += 1;
            }
        }
    }

    positions.sort_by_key(|p| p.timestamp);
    report.loaded = positions.len();
    Ok((positions, report))
}

pub async fn seed_log(log: &MemoryLog, path: &Path) -> Result<SeedReport, SeedError> {
    let file = std::fs::File::open(path)?;
    let (positions, report) = read_positions(file)?;
    log.extend(positions).await;
    info!(path = %path.display(), loaded = report.loaded, skipped = report.skipped, "seeded position log");
    Ok(report)
}
