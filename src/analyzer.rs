//! Per-endpoint analysis orchestration.
//!
//! For one endpoint this runs the interval calculator, the periodicity
//! detector, and the pattern classifier over a single normalized record
//! view and assembles the result. The analyzer holds no mutable state:
//! every call depends only on its arguments and fixed constants, so
//! endpoints can be analyzed in any order, repeatedly, or concurrently
//! with identical results.
//!
//! Threat-intel and geolocation results are resolved by the caller and
//! attached afterwards; nothing here blocks or performs I/O.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::geo::GeoReport;
use crate::intel::IocAttachment;
use crate::interval;
use crate::model::{AnalysisResult, EndpointTrafficStats, TimelinePoint};
use crate::pattern;
use crate::periodicity::{self, DEFAULT_TOLERANCE};

/// Endpoints with fewer records than this are skipped outright: too few
/// observations to say anything about their behavior.
pub const MIN_RECORDS: usize = 5;

/// Stateless per-endpoint analyzer.
#[derive(Debug, Clone, Copy)]
pub struct EndpointAnalyzer {
    tolerance: f64,
    min_records: usize,
}

impl Default for EndpointAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl EndpointAnalyzer {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            min_records: MIN_RECORDS,
        }
    }

    /// Analyzes one endpoint's traffic aggregate.
    ///
    /// Returns `None` when the endpoint has too few records or no usable
    /// inter-arrival gaps (all timestamps identical or unparseable).
    /// That is a defined no-verdict outcome, not an error.
    pub fn analyze(&self, ip: &str, stats: &EndpointTrafficStats) -> Option<AnalysisResult> {
        if stats.records.len() < self.min_records {
            debug!(
                "Skipping {}: {} records (minimum {})",
                ip,
                stats.records.len(),
                self.min_records
            );
            return None;
        }

        let view = interval::normalized_view(&stats.records);
        let intervals = interval::intervals(&view);
        if intervals.is_empty() {
            debug!("Skipping {}: no usable inter-arrival gaps", ip);
            return None;
        }

        let verdict = periodicity::detect(&intervals, self.tolerance);
        let traffic_pattern = pattern::classify(&view);

        let timeline: Vec<TimelinePoint> = view.iter().map(TimelinePoint::from_record).collect();

        Some(AnalysisResult {
            ip: ip.to_string(),
            is_suspicious: verdict.is_periodic,
            period: verdict.period_seconds,
            cv: verdict.coefficient_of_variation,
            packet_count: stats.records.len(),
            traffic_pattern,
            timeline,
            sni_names: sorted_keys(&stats.sni_names),
            dns_names: sorted_keys(&stats.dns_names),
            processes: sorted_keys(&stats.processes),
            total_bytes: stats.total_bytes,
            first_seen: stats.first_seen.clone(),
            last_seen: stats.last_seen.clone(),
            protocols: stats.protocols.clone(),
            remote_ports: stats.remote_ports.clone(),
            ioc: IocAttachment::default(),
            geo: GeoReport::unknown(),
        })
    }
}

/// Merges an externally resolved threat-intel attachment into a result.
pub fn attach_intel(result: &mut AnalysisResult, ioc: IocAttachment) {
    result.ioc = ioc;
}

/// Merges an externally resolved geolocation report into a result.
pub fn attach_geo(result: &mut AnalysisResult, geo: GeoReport) {
    result.geo = geo;
}

/// Key lists carried into the result are sorted so output ordering does
/// not depend on map iteration order.
fn sorted_keys(map: &HashMap<String, u64>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}

/// Tallies for one whole-file run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub endpoints: usize,
    pub analyzed: usize,
    pub skipped: usize,
    pub suspicious: usize,
}

/// Analyzes every endpoint in a stats map sequentially.
///
/// Results come back ordered by packet count descending (busiest
/// endpoints first), ties broken by IP for stable output.
pub fn analyze_all(
    analyzer: &EndpointAnalyzer,
    data: &HashMap<String, EndpointTrafficStats>,
) -> (Vec<AnalysisResult>, RunSummary) {
    let mut summary = RunSummary {
        endpoints: data.len(),
        ..RunSummary::default()
    };
    let mut results = Vec::new();

    for (ip, stats) in data {
        match analyzer.analyze(ip, stats) {
            Some(result) => {
                if result.is_suspicious {
                    summary.suspicious += 1;
                }
                summary.analyzed += 1;
                results.push(result);
            }
            None => summary.skipped += 1,
        }
    }

    results.sort_by(|a, b| {
        b.packet_count
            .cmp(&a.packet_count)
            .then_with(|| a.ip.cmp(&b.ip))
    });

    info!(
        "Analyzed {} of {} endpoints, {} periodic, {} skipped",
        summary.analyzed, summary.endpoints, summary.suspicious, summary.skipped
    );

    (results, summary)
}
