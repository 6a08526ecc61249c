//! Threat-intelligence lookup boundary.
//!
//! The analysis core only consumes the [`ThreatIntelLookup`] trait;
//! results are attached to an endpoint's record after analysis, never
//! computed inside it. The shipped implementation resolves indicators
//! from a local file, so the binary performs no network I/O; callers that
//! wire in a remote source own its retries and rate limits, and wrap it
//! in [`CachedIntel`] so repeated keys stay bounded in memory.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Mutex;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::LookupError;

/// Pulses reported per indicator are capped to keep attachments small.
const MAX_REPORTED_PULSES: usize = 3;

/// A single reported indicator-of-compromise record from an intelligence
/// source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pulse {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created: String,
}

/// Result of looking up one indicator key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IocReport {
    pub threat: bool,
    pub pulse_count: usize,
    pub pulses: Vec<Pulse>,
}

impl IocReport {
    /// A no-findings report.
    pub fn clean() -> Self {
        Self::default()
    }

    fn from_pulses(pulses: &[Pulse]) -> Self {
        Self {
            threat: !pulses.is_empty(),
            pulse_count: pulses.len(),
            pulses: pulses.iter().take(MAX_REPORTED_PULSES).cloned().collect(),
        }
    }
}

/// Threat-intel findings attached to one endpoint's analysis result.
///
/// Domain maps only carry entries that actually matched, mirroring how
/// the report surface renders them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IocAttachment {
    pub ip_threat: bool,
    pub ip_pulses: Vec<Pulse>,
    pub sni_threats: HashMap<String, IocReport>,
    pub dns_threats: HashMap<String, IocReport>,
}

/// Indicator lookup interface consumed by the orchestration layer.
///
/// Keys are already-validated strings; implementations never panic and
/// report "clean" on their own internal failures.
pub trait ThreatIntelLookup {
    fn check_ip(&self, ip: &str) -> IocReport;
    fn check_domain(&self, domain: &str) -> IocReport;

    /// Disabled sources are skipped entirely instead of queried per key.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Resolves an endpoint's IP and associated SNI/DNS names against a
/// lookup source into one attachment.
pub fn gather_attachment(
    intel: &dyn ThreatIntelLookup,
    ip: &str,
    sni_names: &[String],
    dns_names: &[String],
) -> IocAttachment {
    if !intel.is_enabled() {
        return IocAttachment::default();
    }

    let ip_report = intel.check_ip(ip);

    let mut sni_threats = HashMap::new();
    for name in sni_names {
        let report = intel.check_domain(name);
        if report.threat {
            sni_threats.insert(name.clone(), report);
        }
    }

    let mut dns_threats = HashMap::new();
    for name in dns_names {
        let report = intel.check_domain(name);
        if report.threat {
            dns_threats.insert(name.clone(), report);
        }
    }

    IocAttachment {
        ip_threat: ip_report.threat,
        ip_pulses: ip_report.pulses,
        sni_threats,
        dns_threats,
    }
}

/// Null source for runs without threat-intel data.
pub struct IntelDisabled;

impl ThreatIntelLookup for IntelDisabled {
    fn check_ip(&self, _ip: &str) -> IocReport {
        IocReport::clean()
    }

    fn check_domain(&self, _domain: &str) -> IocReport {
        IocReport::clean()
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// On-disk indicator set: IP and domain keys mapped to their pulses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndicatorSet {
    pub ips: HashMap<String, Vec<Pulse>>,
    pub domains: HashMap<String, Vec<Pulse>>,
}

/// Threat-intel source backed by a local indicator file.
pub struct LocalIntel {
    ips: HashMap<String, Vec<Pulse>>,
    domains: HashMap<String, Vec<Pulse>>,
}

impl LocalIntel {
    pub fn from_indicators(set: IndicatorSet) -> Self {
        // Domains match case-insensitively.
        let domains = set
            .domains
            .into_iter()
            .map(|(name, pulses)| (name.to_lowercase(), pulses))
            .collect();
        Self {
            ips: set.ips,
            domains,
        }
    }

    /// Loads an indicator file.
    pub fn load(path: &Path) -> Result<Self, LookupError> {
        let content = std::fs::read_to_string(path).map_err(|source| LookupError::IndicatorRead {
            path: path.display().to_string(),
            source,
        })?;
        let set: IndicatorSet =
            serde_json::from_str(&content).map_err(|source| LookupError::IndicatorParse {
                path: path.display().to_string(),
                source,
            })?;

        let intel = Self::from_indicators(set);
        info!(
            "Loaded {} IP and {} domain indicators from {}",
            intel.ips.len(),
            intel.domains.len(),
            path.display()
        );
        Ok(intel)
    }
}

impl ThreatIntelLookup for LocalIntel {
    fn check_ip(&self, ip: &str) -> IocReport {
        match self.ips.get(ip) {
            Some(pulses) => IocReport::from_pulses(pulses),
            None => IocReport::clean(),
        }
    }

    fn check_domain(&self, domain: &str) -> IocReport {
        match self.domains.get(&domain.to_lowercase()) {
            Some(pulses) => IocReport::from_pulses(pulses),
            None => IocReport::clean(),
        }
    }
}

/// Bounded memoization wrapper around any lookup source.
///
/// Capacity is fixed at construction; old keys are evicted LRU-fashion
/// instead of growing for the lifetime of the process.
pub struct CachedIntel<L> {
    inner: L,
    ip_cache: Mutex<LruCache<String, IocReport>>,
    domain_cache: Mutex<LruCache<String, IocReport>>,
}

impl<L: ThreatIntelLookup> CachedIntel<L> {
    pub fn new(inner: L, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner,
            ip_cache: Mutex::new(LruCache::new(capacity)),
            domain_cache: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl<L: ThreatIntelLookup> ThreatIntelLookup for CachedIntel<L> {
    fn check_ip(&self, ip: &str) -> IocReport {
        let mut cache = self.ip_cache.lock().unwrap();
        if let Some(report) = cache.get(ip) {
            debug!("intel cache hit for {}", ip);
            return report.clone();
        }
        let report = self.inner.check_ip(ip);
        cache.put(ip.to_string(), report.clone());
        report
    }

    fn check_domain(&self, domain: &str) -> IocReport {
        let mut cache = self.domain_cache.lock().unwrap();
        if let Some(report) = cache.get(domain) {
            debug!("intel cache hit for {}", domain);
            return report.clone();
        }
        let report = self.inner.check_domain(domain);
        cache.put(domain.to_string(), report.clone());
        report
    }

    fn is_enabled(&self) -> bool {
        self.inner.is_enabled()
    }
}
