//! Reduce a batch of reports to the latest one per vehicle.

use std::collections::HashMap;

use crate::model::PositionRecord;

/// Latest record per `bus_id`. Equal timestamps resolve to the highest id,
/// so the result does not depend on input order.
pub fn latest_per_bus(records: impl IntoIterator<Item = PositionRecord>) -> HashMap<String, PositionRecord> {
    records.into_iter().fold(HashMap::new(), |mut latest, record| {
        match latest.get(&record.bus_id) {
            Some(current) if (current.timestamp, current.id) >= (record.timestamp, record.id) => {}
            _ => {
                latest.insert(record.bus_id.clone(), record);
            }
        }
        latest
    })
}
