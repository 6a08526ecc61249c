//! Inter-arrival interval computation.
//!
//! [`normalized_view`] is the single source of truth for "time between
//! observations": it resolves every record's timestamp and stable-sorts
//! the result. Both the periodicity detector and the pattern classifier
//! consume this one view, so an endpoint can never receive a periodicity
//! verdict and a pattern label computed from different orderings.

use tracing::warn;

use crate::model::{NormalizedRecord, PacketRecord};
use crate::timestamp;

/// Resolves timestamps and sorts records by time ascending.
///
/// Records whose timestamp fails normalization are dropped with a
/// warning. The sort is stable: ties keep their capture order.
pub fn normalized_view(records: &[PacketRecord]) -> Vec<NormalizedRecord> {
    let mut view: Vec<NormalizedRecord> = records
        .iter()
        .filter_map(|record| match timestamp::normalize(&record.timestamp) {
            Ok(time) => Some(NormalizedRecord {
                time,
                packet_size: record.packet_size,
                direction: record.direction,
            }),
            Err(e) => {
                warn!("Dropping record: {}", e);
                None
            }
        })
        .collect();

    view.sort_by_key(|r| r.time);
    view
}

/// Computes successive inter-arrival gaps in seconds over a sorted view.
///
/// Non-positive gaps (duplicate timestamps, residual clock skew) are
/// dropped, not zero-filled. Fewer than 2 records yield an empty series.
pub fn intervals(view: &[NormalizedRecord]) -> Vec<f64> {
    if view.len() < 2 {
        return Vec::new();
    }

    view.windows(2)
        .filter_map(|pair| {
            let delta = pair[1]
                .time
                .signed_duration_since(pair[0].time)
                .num_microseconds()? as f64
                / 1_000_000.0;
            (delta > 0.0).then_some(delta)
        })
        .collect()
}
