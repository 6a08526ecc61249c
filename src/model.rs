//! Core data model: wire-format input types and per-endpoint result types.
//!
//! The wire shapes mirror the JSON the upstream capture agent emits
//! (per-remote-IP aggregates with raw timestamp strings); the result
//! shapes are what the export layer serializes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoReport;
use crate::intel::IocAttachment;

/// Direction of a packet observation relative to the local host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Send,
    Recv,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Send => write!(f, "send"),
            Direction::Recv => write!(f, "recv"),
        }
    }
}

/// A single packet observation as recorded by the capture agent.
///
/// The timestamp is kept as the raw upstream string; normalization into a
/// canonical instant happens in the analysis path so that unparseable
/// records can be dropped per-record instead of failing the whole load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketRecord {
    pub timestamp: String,
    pub packet_size: u64,
    pub direction: Direction,
}

/// A packet observation with its timestamp resolved to a canonical
/// instant. Produced by [`crate::interval::normalized_view`]; this is the
/// only view the detector and classifier ever see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub time: DateTime<Utc>,
    pub packet_size: u64,
    pub direction: Direction,
}

/// Per-remote-IP traffic aggregate consumed from the upstream loader.
///
/// Everything besides `records` is pass-through metadata: the analysis
/// core never interprets it, it only carries it into the result. All
/// fields default so partially populated or older capture files load
/// without error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EndpointTrafficStats {
    pub records: Vec<PacketRecord>,
    pub sni_names: HashMap<String, u64>,
    pub dns_names: HashMap<String, u64>,
    pub processes: HashMap<String, u64>,
    pub total_bytes: u64,
    pub first_seen: String,
    pub last_seen: String,
    pub protocols: HashMap<String, u64>,
    pub remote_ports: HashMap<String, u64>,
}

/// Outcome of the periodicity test over an endpoint's interval series.
///
/// Recomputed fresh on every analysis call; `period_seconds` and
/// `coefficient_of_variation` are 0 when the series is too short or too
/// fast to judge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodicityVerdict {
    pub is_periodic: bool,
    pub period_seconds: f64,
    pub coefficient_of_variation: f64,
}

impl PeriodicityVerdict {
    /// Verdict for a series that cannot be judged (too few intervals, or
    /// sub-second mean).
    pub fn not_periodic() -> Self {
        Self {
            is_periodic: false,
            period_seconds: 0.0,
            coefficient_of_variation: 0.0,
        }
    }
}

/// The eighteen-way traffic-pattern taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Blocked,
    RecvOnly,
    Heartbeat,
    Download,
    Upload,
    Interactive,
    BulkTransfer,
    RequestResponse,
    ScanProbe,
    Beaconing,
    DataExfiltration,
    SlowDrip,
    BurstActivity,
    AsymmetricInteractive,
    ConnectionTest,
    LargeTransfer,
    KeepAlive,
    Mixed,
}

impl PatternKind {
    /// Patterns that on their own warrant escalation: the canonical C2
    /// check-in signature and sustained outbound exfiltration.
    pub fn is_high_risk(&self) -> bool {
        matches!(self, PatternKind::Beaconing | PatternKind::DataExfiltration)
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PatternKind::Blocked => "blocked",
            PatternKind::RecvOnly => "recv_only",
            PatternKind::Heartbeat => "heartbeat",
            PatternKind::Download => "download",
            PatternKind::Upload => "upload",
            PatternKind::Interactive => "interactive",
            PatternKind::BulkTransfer => "bulk_transfer",
            PatternKind::RequestResponse => "request_response",
            PatternKind::ScanProbe => "scan_probe",
            PatternKind::Beaconing => "beaconing",
            PatternKind::DataExfiltration => "data_exfiltration",
            PatternKind::SlowDrip => "slow_drip",
            PatternKind::BurstActivity => "burst_activity",
            PatternKind::AsymmetricInteractive => "asymmetric_interactive",
            PatternKind::ConnectionTest => "connection_test",
            PatternKind::LargeTransfer => "large_transfer",
            PatternKind::KeepAlive => "keep_alive",
            PatternKind::Mixed => "mixed",
        };
        write!(f, "{}", name)
    }
}

/// A classified traffic pattern: the tag, a human-readable description
/// populated with the computed counters, and a fixed confidence score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternLabel {
    pub pattern: PatternKind,
    pub description: String,
    pub confidence: f64,
}

/// One point of the time-sorted per-endpoint timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub timestamp: String,
    pub timestamp_unix: i64,
    pub packet_size: u64,
    pub direction: Direction,
}

impl TimelinePoint {
    pub fn from_record(record: &NormalizedRecord) -> Self {
        Self {
            timestamp: record.time.format("%Y-%m-%d %H:%M:%S").to_string(),
            timestamp_unix: record.time.timestamp(),
            packet_size: record.packet_size,
            direction: record.direction,
        }
    }
}

/// The per-endpoint analysis output.
///
/// Created once per endpoint per run. The only post-creation mutation is
/// attaching externally resolved threat-intel and geolocation results;
/// nothing derived is ever recomputed.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub ip: String,
    pub is_suspicious: bool,
    pub period: f64,
    pub cv: f64,
    pub packet_count: usize,
    pub traffic_pattern: PatternLabel,
    pub timeline: Vec<TimelinePoint>,
    pub sni_names: Vec<String>,
    pub dns_names: Vec<String>,
    pub processes: Vec<String>,
    pub total_bytes: u64,
    pub first_seen: String,
    pub last_seen: String,
    pub protocols: HashMap<String, u64>,
    pub remote_ports: HashMap<String, u64>,
    pub ioc: IocAttachment,
    pub geo: GeoReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_serde_roundtrip() {
        let json = r#"{"timestamp":"2024-05-01T10:00:00Z","packet_size":128,"direction":"recv"}"#;
        let record: PacketRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.direction, Direction::Recv);
        assert_eq!(record.packet_size, 128);

        let back = serde_json::to_string(&record).unwrap();
        assert!(back.contains("\"direction\":\"recv\""));
    }

    #[test]
    fn test_direction_rejects_unknown() {
        let json = r#"{"timestamp":"2024-05-01T10:00:00Z","packet_size":128,"direction":"sideways"}"#;
        assert!(serde_json::from_str::<PacketRecord>(json).is_err());
    }

    #[test]
    fn test_pattern_kind_snake_case() {
        assert_eq!(PatternKind::AsymmetricInteractive.to_string(), "asymmetric_interactive");
        assert_eq!(
            serde_json::to_string(&PatternKind::DataExfiltration).unwrap(),
            "\"data_exfiltration\""
        );
    }

    #[test]
    fn test_high_risk_patterns() {
        assert!(PatternKind::Beaconing.is_high_risk());
        assert!(PatternKind::DataExfiltration.is_high_risk());
        assert!(!PatternKind::Heartbeat.is_high_risk());
        assert!(!PatternKind::Mixed.is_high_risk());
    }

    #[test]
    fn test_stats_defaults_for_missing_fields() {
        let stats: EndpointTrafficStats = serde_json::from_str("{}").unwrap();
        assert!(stats.records.is_empty());
        assert!(stats.sni_names.is_empty());
        assert_eq!(stats.total_bytes, 0);
        assert_eq!(stats.first_seen, "");
    }
}
