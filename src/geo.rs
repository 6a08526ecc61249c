//! Geolocation lookup boundary.
//!
//! Mirrors the threat-intel boundary: the core consumes [`GeoLookup`]
//! and attaches results after analysis. The shipped implementation reads
//! MaxMind GeoLite2 databases offline; the batch entry point exists so a
//! remote implementation can amortize its round trips, and the default
//! just iterates.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Mutex;

use lru::LruCache;
use maxminddb::{geoip2, Reader};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Result of a geolocation lookup for one IP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoReport {
    pub success: bool,
    pub country: String,
    pub country_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn_org: Option<String>,
    pub is_china: bool,
    pub location_type: String,
}

impl GeoReport {
    /// Report for an address that could not be resolved.
    pub fn unknown() -> Self {
        Self {
            location_type: "unknown".to_string(),
            ..Self::default()
        }
    }
}

/// Geolocation lookup interface consumed by the orchestration layer.
///
/// Keys are already-validated IP strings. Implementations own caching
/// and (for remote sources) retries and rate limits.
pub trait GeoLookup {
    fn check_ip(&self, ip: &str) -> GeoReport;

    /// Batched variant; the default resolves each key individually.
    fn check_batch(&self, ips: &[String]) -> HashMap<String, GeoReport> {
        ips.iter()
            .map(|ip| (ip.clone(), self.check_ip(ip)))
            .collect()
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Null source for runs without geolocation databases.
pub struct GeoDisabled;

impl GeoLookup for GeoDisabled {
    fn check_ip(&self, _ip: &str) -> GeoReport {
        GeoReport::unknown()
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Configuration for the MaxMind-backed lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoSettings {
    /// Enable geolocation enrichment.
    pub enabled: bool,
    /// Path to a GeoLite2-Country.mmdb file.
    pub country_db: Option<String>,
    /// Path to a GeoLite2-ASN.mmdb file.
    pub asn_db: Option<String>,
    /// ISO country codes classified as domestic.
    pub domestic_regions: Vec<String>,
    /// Bounded lookup-cache capacity.
    pub cache_capacity: usize,
}

impl Default for GeoSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            country_db: None,
            asn_db: None,
            domestic_regions: vec![
                "CN".to_string(),
                "HK".to_string(),
                "MO".to_string(),
                "TW".to_string(),
            ],
            cache_capacity: 4096,
        }
    }
}

/// Geolocation source backed by MaxMind databases.
pub struct MaxmindGeo {
    country_reader: Option<Reader<Vec<u8>>>,
    asn_reader: Option<Reader<Vec<u8>>>,
    domestic_regions: HashSet<String>,
}

impl MaxmindGeo {
    /// Creates a lookup from settings. Missing or unreadable database
    /// files degrade to partial (or empty) results rather than failing
    /// the run.
    pub fn new(settings: &GeoSettings) -> Self {
        let country_reader = settings.country_db.as_ref().and_then(|path| {
            match Reader::open_readfile(Path::new(path)) {
                Ok(reader) => {
                    debug!("Loaded country database from {}", path);
                    Some(reader)
                }
                Err(e) => {
                    warn!("Failed to load country database {}: {}", path, e);
                    None
                }
            }
        });

        let asn_reader = settings.asn_db.as_ref().and_then(|path| {
            match Reader::open_readfile(Path::new(path)) {
                Ok(reader) => {
                    debug!("Loaded ASN database from {}", path);
                    Some(reader)
                }
                Err(e) => {
                    warn!("Failed to load ASN database {}: {}", path, e);
                    None
                }
            }
        });

        let domestic_regions = settings
            .domestic_regions
            .iter()
            .map(|code| code.to_uppercase())
            .collect();

        Self {
            country_reader,
            asn_reader,
            domestic_regions,
        }
    }

    /// Returns true if at least one database is loaded.
    pub fn is_available(&self) -> bool {
        self.country_reader.is_some() || self.asn_reader.is_some()
    }

    fn classify_region(&self, country_code: &str) -> (bool, &'static str) {
        if self.domestic_regions.contains(&country_code.to_uppercase()) {
            (true, "domestic")
        } else {
            (false, "foreign")
        }
    }
}

impl GeoLookup for MaxmindGeo {
    fn check_ip(&self, ip: &str) -> GeoReport {
        let addr: IpAddr = match ip.parse() {
            Ok(addr) => addr,
            Err(e) => {
                warn!("Geo lookup skipped, bad address {}: {}", ip, e);
                return GeoReport::unknown();
            }
        };

        // Private and local addresses have no geography.
        if is_private_ip(&addr) {
            return GeoReport::unknown();
        }

        let mut report = GeoReport::unknown();

        if let Some(ref reader) = self.country_reader {
            match reader.lookup::<geoip2::Country>(addr) {
                Ok(country) => {
                    if let Some(c) = country.country {
                        if let Some(code) = c.iso_code {
                            report.country_code = code.to_string();
                        }
                        if let Some(names) = c.names {
                            if let Some(name) = names.get("en") {
                                report.country = name.to_string();
                            }
                        }
                    }
                }
                Err(e) => {
                    trace!("Country lookup failed for {}: {}", ip, e);
                }
            }
        }

        if let Some(ref reader) = self.asn_reader {
            match reader.lookup::<geoip2::Asn>(addr) {
                Ok(asn) => {
                    report.asn = asn.autonomous_system_number;
                    report.asn_org = asn.autonomous_system_organization.map(|s| s.to_string());
                }
                Err(e) => {
                    trace!("ASN lookup failed for {}: {}", ip, e);
                }
            }
        }

        if !report.country_code.is_empty() {
            report.success = true;
            let (is_china, location_type) = self.classify_region(&report.country_code);
            report.is_china = is_china;
            report.location_type = location_type.to_string();
        }

        report
    }

    fn is_enabled(&self) -> bool {
        self.is_available()
    }
}

/// Checks if an IP address is private/local.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_private()
                || ipv4.is_loopback()
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => ipv6.is_loopback() || ipv6.is_unspecified(),
    }
}

/// Bounded memoization wrapper around any geolocation source.
pub struct CachedGeo<G> {
    inner: G,
    cache: Mutex<LruCache<String, GeoReport>>,
}

impl<G: GeoLookup> CachedGeo<G> {
    pub fn new(inner: G, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl<G: GeoLookup> GeoLookup for CachedGeo<G> {
    fn check_ip(&self, ip: &str) -> GeoReport {
        let mut cache = self.cache.lock().unwrap();
        if let Some(report) = cache.get(ip) {
            return report.clone();
        }
        let report = self.inner.check_ip(ip);
        cache.put(ip.to_string(), report.clone());
        report
    }

    fn check_batch(&self, ips: &[String]) -> HashMap<String, GeoReport> {
        // Serve cached keys locally, batch only the rest through.
        let mut results = HashMap::new();
        let mut missing = Vec::new();
        {
            let mut cache = self.cache.lock().unwrap();
            for ip in ips {
                match cache.get(ip) {
                    Some(report) => {
                        results.insert(ip.clone(), report.clone());
                    }
                    None => missing.push(ip.clone()),
                }
            }
        }

        if !missing.is_empty() {
            let fresh = self.inner.check_batch(&missing);
            let mut cache = self.cache.lock().unwrap();
            for (ip, report) in fresh {
                cache.put(ip.clone(), report.clone());
                results.insert(ip, report);
            }
        }

        results
    }

    fn is_enabled(&self) -> bool {
        self.inner.is_enabled()
    }
}
