//! Report export.
//!
//! Renders a run's analysis results as plain text, pretty JSON, or JSON
//! Lines for downstream tooling. Rendering is pure: everything in the
//! output comes from the results and the run summary.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analyzer::RunSummary;
use crate::model::AnalysisResult;
use crate::pattern::format_bytes;

/// Output format for exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonLines, // One JSON object per line (JSONL)
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "jsonl" | "jsonlines" => Ok(Self::JsonLines),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::JsonLines => write!(f, "jsonl"),
        }
    }
}

/// How many labels of each pattern the run produced, sorted by count
/// descending then name.
pub fn pattern_distribution(results: &[AnalysisResult]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for result in results {
        *counts
            .entry(result.traffic_pattern.pattern.to_string())
            .or_default() += 1;
    }
    let mut distribution: Vec<(String, usize)> = counts.into_iter().collect();
    distribution.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    distribution
}

/// Exports a run in the requested format.
pub fn export_report(
    results: &[AnalysisResult],
    summary: &RunSummary,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => export_text(results, summary),
        OutputFormat::Json => export_json(results, summary),
        OutputFormat::JsonLines => export_jsonl(results, summary),
    }
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    endpoints: usize,
    analyzed: usize,
    skipped: usize,
    suspicious: usize,
    pattern_distribution: Vec<(&'a str, usize)>,
}

impl<'a> JsonSummary<'a> {
    fn new(summary: &RunSummary, distribution: &'a [(String, usize)]) -> Self {
        Self {
            endpoints: summary.endpoints,
            analyzed: summary.analyzed,
            skipped: summary.skipped,
            suspicious: summary.suspicious,
            pattern_distribution: distribution
                .iter()
                .map(|(name, count)| (name.as_str(), *count))
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    summary: JsonSummary<'a>,
    results: &'a [AnalysisResult],
}

/// Exports the run as pretty-printed JSON.
pub fn export_json(results: &[AnalysisResult], summary: &RunSummary) -> String {
    let distribution = pattern_distribution(results);
    let report = JsonReport {
        version: "1.0",
        summary: JsonSummary::new(summary, &distribution),
        results,
    };
    serde_json::to_string_pretty(&report).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

/// Exports the run as JSON Lines: the summary first, then one endpoint
/// per line.
pub fn export_jsonl(results: &[AnalysisResult], summary: &RunSummary) -> String {
    let distribution = pattern_distribution(results);
    let mut lines = Vec::with_capacity(results.len() + 1);

    let header = serde_json::json!({
        "type": "summary",
        "endpoints": summary.endpoints,
        "analyzed": summary.analyzed,
        "skipped": summary.skipped,
        "suspicious": summary.suspicious,
        "pattern_distribution": distribution,
    });
    lines.push(serde_json::to_string(&header).unwrap_or_default());

    for result in results {
        if let Ok(line) = serde_json::to_string(result) {
            lines.push(line);
        }
    }

    lines.join("\n")
}

/// Exports the run as formatted text.
pub fn export_text(results: &[AnalysisResult], summary: &RunSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "--- Traffic Analysis Report ---\nEndpoints: {} ({} analyzed, {} skipped)\nPeriodic endpoints: {}\n",
        summary.endpoints, summary.analyzed, summary.skipped, summary.suspicious
    ));

    let distribution = pattern_distribution(results);
    if !distribution.is_empty() {
        let parts: Vec<String> = distribution
            .iter()
            .map(|(name, count)| format!("{}: {}", name, count))
            .collect();
        output.push_str(&format!("Patterns: {}\n", parts.join(" | ")));
    }

    if results.is_empty() {
        output.push_str("No endpoints with enough data to analyze\n");
        return output;
    }

    output.push('\n');
    output.push_str(&"-".repeat(110));
    output.push('\n');

    for result in results {
        let periodic = if result.is_suspicious {
            format!("PERIODIC ~{}", fmt_period(result.period))
        } else {
            "aperiodic".to_string()
        };

        let mut line = format!(
            "[{:22}] {:<18} | {:<14} | cv {:.3} | {:>4} pkts | {:>10} | {}",
            result.traffic_pattern.pattern.to_string(),
            result.ip,
            periodic,
            result.cv,
            result.packet_count,
            format_bytes(result.total_bytes),
            result.traffic_pattern.description,
        );

        let mut tags = Vec::new();
        if result.traffic_pattern.pattern.is_high_risk() {
            tags.push("HIGH RISK".to_string());
        }
        if result.ioc.ip_threat
            || !result.ioc.sni_threats.is_empty()
            || !result.ioc.dns_threats.is_empty()
        {
            tags.push("IOC".to_string());
        }
        if result.geo.success {
            tags.push(format!("{}/{}", result.geo.country_code, result.geo.location_type));
        }
        if !tags.is_empty() {
            line.push_str(&format!(" [{}]", tags.join(", ")));
        }

        output.push_str(&line);
        output.push('\n');

        if !result.sni_names.is_empty() {
            output.push_str(&format!("    sni: {}\n", result.sni_names.join(", ")));
        }
        if !result.dns_names.is_empty() {
            output.push_str(&format!("    dns: {}\n", result.dns_names.join(", ")));
        }
    }

    output
}

/// Formats a period in a human-readable way.
fn fmt_period(seconds: f64) -> String {
    if seconds >= 120.0 {
        format!("{:.1}min", seconds / 60.0)
    } else {
        format!("{:.1}s", seconds)
    }
}
