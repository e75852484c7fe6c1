//! Geocoding of polling stations through an external lookup service.
//!
//! The service is a collaborator behind the `Geocoder` trait. Lookups are
//! memoised by normalised building name for the duration of one document and
//! gated by a token bucket shared by the whole run.

use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;

use std::cell::Cell;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::booths::extract_booth_key;
use crate::config::BoothKey;

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// The answer of a geocoding service. Not finding an address is an answer,
/// not an error.
#[derive(PartialEq, Debug, Clone)]
pub enum LookupOutcome {
    Found(Coordinates),
    NotFound,
    Failed(String),
}

pub trait Geocoder {
    fn lookup(&mut self, address: &str) -> LookupOutcome;
}

/// Time source of the rate limiter. Tests drive it by hand.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);
}

#[derive(Clone, Copy, Default, Debug)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d)
    }
}

/// A clock that only moves when asked to.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    pub fn new() -> ManualClock {
        ManualClock {
            now: Cell::new(Instant::now()),
        }
    }

    pub fn advance(&self, d: Duration) {
        self.now.set(self.now.get() + d);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        ManualClock::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d)
    }
}

impl<C: Clock> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, d: Duration) {
        (**self).sleep(d)
    }
}

/// Token bucket: `burst` tokens, refilled continuously at `rate_per_second`.
pub struct RateLimiter<C: Clock = SystemClock> {
    tokens: f64,
    burst: u32,
    rate_per_second: f64,
    last_refill: Instant,
    clock: C,
}

impl RateLimiter<SystemClock> {
    pub fn new(rate_per_second: f64, burst: u32) -> Self {
        Self::with_clock(rate_per_second, burst, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(rate_per_second: f64, burst: u32, clock: C) -> Self {
        let burst = burst.max(1);
        let now = clock.now();
        RateLimiter {
            tokens: burst as f64,
            burst,
            rate_per_second,
            last_refill: now,
            clock,
        }
    }

    fn refill(&mut self) {
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed.is_zero() {
            return;
        }
        self.tokens =
            (self.tokens + elapsed.as_secs_f64() * self.rate_per_second).min(self.burst as f64);
        self.last_refill = now;
    }

    /// Takes a token if one is available, otherwise tells how long to wait.
    pub fn try_acquire(&mut self) -> Result<(), Duration> {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return Ok(());
        }
        if self.rate_per_second <= 0.0 {
            return Err(Duration::MAX);
        }
        let missing = 1.0 - self.tokens;
        // A rate so low that the wait does not fit in a Duration never refills.
        Err(Duration::try_from_secs_f64(missing / self.rate_per_second).unwrap_or(Duration::MAX))
    }

    /// Blocks until a token is available. Returns false when none ever will be.
    pub fn acquire(&mut self) -> bool {
        loop {
            match self.try_acquire() {
                Ok(()) => return true,
                Err(wait) if wait == Duration::MAX => return false,
                Err(wait) => {
                    debug!("acquire: waiting {:?}", wait);
                    self.clock.sleep(wait);
                }
            }
        }
    }

    pub fn available_tokens(&mut self) -> u32 {
        self.refill();
        self.tokens.floor() as u32
    }
}

lazy_static! {
    static ref BUILDING_QUALIFIERS: Vec<Regex> = vec![
        Regex::new(r"(?i),?\s*\b(EAST|WEST|NORTH|SOUTH)\b\s*(FACING|BUILDING|SIDE|WING|PORTION)?\b")
            .unwrap(),
        Regex::new(r"(?i),?\s*\b(NEW|OLD)\b\s*(BUILDING|BLOCK)?\b").unwrap(),
        Regex::new(r"(?i),?\s*\bROOM\s*NO\.?\s*\d+").unwrap(),
        Regex::new(r"(?i),?\s*\bHALL\s*NO\.?\s*\d+").unwrap(),
        Regex::new(r"(?i),?\s*\bBLOCK\s*[A-Z0-9]+\b").unwrap(),
        Regex::new(r"(?i),?\s*\b(LEFT|RIGHT|CENTRE|CENTER)\b\s*(PORTION|SIDE|WING)?\b")
            .unwrap(),
        // Alone, "Middle" is a kind of school.
        Regex::new(r"(?i),?\s*\bMIDDLE\s*(PORTION|SIDE|WING)\b").unwrap(),
        Regex::new(r"(?i),?\s*\b(DOWN|UP)\s*STAIRS?\b").unwrap(),
        Regex::new(r"(?i),?\s*\b(GROUND|FIRST|SECOND)\s*FLOOR\b").unwrap(),
    ];
    static ref SPACES: Regex = Regex::new(r"\s+").unwrap();
}

/// The identity of a building, without the wing, floor or room that
/// distinguishes polling stations sharing it.
pub fn normalize_building(building: &str) -> String {
    let mut text = building.to_uppercase();
    for rx in BUILDING_QUALIFIERS.iter() {
        text = rx.replace_all(&text, " ").into_owned();
    }
    let text = SPACES.replace_all(&text, " ");
    text.trim()
        .trim_matches(|c: char| c == ',' || c.is_whitespace())
        .replace(" ,", ",")
}

/// One line of a polling station address list.
#[derive(PartialEq, Debug, Clone)]
pub struct StationAddress {
    pub station_no: String,
    pub building: String,
    pub village: String,
}

#[derive(PartialEq, Debug, Clone)]
pub struct GeocodedStation {
    pub station_no: String,
    pub booth_key: Option<BoothKey>,
    pub building: String,
    pub village: String,
    pub location: Coordinates,
    /// False when `location` is the fallback centre.
    pub found: bool,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct GeocodeStats {
    pub stations: u64,
    pub found: u64,
    pub fallback: u64,
    pub cache_hits: u64,
    pub lookups: u64,
    pub failures: u64,
    pub budget_exhausted: bool,
}

#[derive(PartialEq, Debug, Clone)]
pub struct GeocodeSettings {
    /// Appended to every search address, e.g. "Kanchipuram, Tamil Nadu, India".
    pub region_suffix: String,
    pub rate_per_second: f64,
    pub burst: u32,
    /// Outbound lookups allowed over the whole run.
    pub max_lookups: Option<u64>,
}

impl Default for GeocodeSettings {
    fn default() -> Self {
        GeocodeSettings {
            region_suffix: "Tamil Nadu, India".to_string(),
            rate_per_second: 10.0,
            burst: 5,
            max_lookups: Some(1000),
        }
    }
}

/// Geocodes station lists, one document at a time.
pub struct StationGeocoder<G: Geocoder, C: Clock = SystemClock> {
    geocoder: G,
    limiter: RateLimiter<C>,
    region_suffix: String,
    max_lookups: Option<u64>,
    lookups: u64,
}

impl<G: Geocoder> StationGeocoder<G, SystemClock> {
    pub fn new(geocoder: G, settings: &GeocodeSettings) -> Self {
        Self::with_clock(geocoder, settings, SystemClock)
    }
}

impl<G: Geocoder, C: Clock> StationGeocoder<G, C> {
    pub fn with_clock(geocoder: G, settings: &GeocodeSettings, clock: C) -> Self {
        StationGeocoder {
            geocoder,
            limiter: RateLimiter::with_clock(settings.rate_per_second, settings.burst, clock),
            region_suffix: settings.region_suffix.clone(),
            max_lookups: settings.max_lookups,
            lookups: 0,
        }
    }

    /// Outbound lookups made so far in the run.
    pub fn lookups(&self) -> u64 {
        self.lookups
    }

    fn budget_left(&self) -> bool {
        self.max_lookups.map(|m| self.lookups < m).unwrap_or(true)
    }

    fn address(&self, parts: &[&str]) -> String {
        parts
            .iter()
            .map(|s| s.trim())
            .chain(std::iter::once(self.region_suffix.trim()))
            .filter(|s| !s.is_empty())
            .collect::<Vec<&str>>()
            .join(", ")
    }

    // None when no lookup could be made at all.
    fn lookup_once(&mut self, address: &str, stats: &mut GeocodeStats) -> Option<LookupOutcome> {
        if !self.budget_left() {
            stats.budget_exhausted = true;
            return None;
        }
        if !self.limiter.acquire() {
            return None;
        }
        self.lookups += 1;
        stats.lookups += 1;
        let outcome = self.geocoder.lookup(address);
        if let LookupOutcome::Failed(msg) = &outcome {
            warn!("geocode: lookup of {:?} failed: {}", address, msg);
            stats.failures += 1;
        }
        Some(outcome)
    }

    fn resolve(
        &mut self,
        constituency: &str,
        station: &StationAddress,
        stats: &mut GeocodeStats,
    ) -> Option<Coordinates> {
        let full = self.address(&[
            station.building.as_str(),
            station.village.as_str(),
            constituency,
        ]);
        if let Some(LookupOutcome::Found(c)) = self.lookup_once(&full, stats) {
            return Some(c);
        }
        if station.village.trim().is_empty() {
            return None;
        }
        let village_only = self.address(&[station.village.as_str(), constituency]);
        match self.lookup_once(&village_only, stats) {
            Some(LookupOutcome::Found(c)) => Some(c),
            _ => None,
        }
    }

    /// Locates every station of a document. Stations that cannot be located
    /// get `fallback` with `found = false`.
    pub fn geocode_stations(
        &mut self,
        constituency: &str,
        stations: &[StationAddress],
        fallback: Coordinates,
    ) -> (Vec<GeocodedStation>, GeocodeStats) {
        let mut stats = GeocodeStats {
            stations: stations.len() as u64,
            ..GeocodeStats::default()
        };
        let mut cache: HashMap<String, Option<Coordinates>> = HashMap::new();
        let mut res: Vec<GeocodedStation> = Vec::new();
        for station in stations.iter() {
            let key = normalize_building(&station.building);
            let location = if let Some(cached) = cache.get(&key) {
                stats.cache_hits += 1;
                *cached
            } else {
                let exhausted_before = stats.budget_exhausted;
                let found = self.resolve(constituency, station, &mut stats);
                // A station skipped for lack of budget may still be found later.
                if found.is_some() || stats.budget_exhausted == exhausted_before {
                    cache.insert(key.clone(), found);
                }
                found
            };
            debug!(
                "geocode: station {} {:?} ({:?}) -> {:?}",
                station.station_no, station.building, key, location
            );
            let found = location.is_some();
            if found {
                stats.found += 1;
            } else {
                stats.fallback += 1;
            }
            res.push(GeocodedStation {
                station_no: station.station_no.clone(),
                booth_key: extract_booth_key(&station.station_no),
                building: station.building.clone(),
                village: station.village.clone(),
                location: location.unwrap_or(fallback),
                found,
            });
        }
        info!(
            "geocode: {}: {}/{} stations located, {} cache hits, {} lookups",
            constituency, stats.found, stats.stations, stats.cache_hits, stats.lookups
        );
        (res, stats)
    }
}

/// An offline gazetteer: exact (case-insensitive) address matches.
#[derive(Debug, Clone, Default)]
pub struct GazetteerGeocoder {
    entries: HashMap<String, Coordinates>,
}

impl GazetteerGeocoder {
    pub fn new(entries: &[(String, Coordinates)]) -> GazetteerGeocoder {
        GazetteerGeocoder {
            entries: entries
                .iter()
                .map(|(a, c)| (SPACES.replace_all(a.trim(), " ").to_uppercase(), *c))
                .collect(),
        }
    }
}

impl Geocoder for GazetteerGeocoder {
    fn lookup(&mut self, address: &str) -> LookupOutcome {
        let key = SPACES.replace_all(address.trim(), " ").to_uppercase();
        match self.entries.get(&key) {
            Some(c) => LookupOutcome::Found(*c),
            None => LookupOutcome::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: Coordinates = Coordinates {
        lat: 12.83,
        lng: 79.7,
    };

    struct Recording {
        known: HashMap<String, Coordinates>,
        failing: Vec<String>,
        calls: Vec<String>,
    }

    impl Recording {
        fn new(known: &[(&str, f64, f64)]) -> Recording {
            Recording {
                known: known
                    .iter()
                    .map(|(a, lat, lng)| (a.to_string(), Coordinates { lat: *lat, lng: *lng }))
                    .collect(),
                failing: Vec::new(),
                calls: Vec::new(),
            }
        }
    }

    impl Geocoder for &mut Recording {
        fn lookup(&mut self, address: &str) -> LookupOutcome {
            self.calls.push(address.to_string());
            if self.failing.iter().any(|f| f == address) {
                return LookupOutcome::Failed("timeout".to_string());
            }
            match self.known.get(address) {
                Some(c) => LookupOutcome::Found(*c),
                None => LookupOutcome::NotFound,
            }
        }
    }

    fn station(no: &str, building: &str, village: &str) -> StationAddress {
        StationAddress {
            station_no: no.to_string(),
            building: building.to_string(),
            village: village.to_string(),
        }
    }

    fn settings(max_lookups: Option<u64>) -> GeocodeSettings {
        GeocodeSettings {
            region_suffix: "Tamil Nadu".to_string(),
            rate_per_second: 2.0,
            burst: 2,
            max_lookups,
        }
    }

    #[test]
    fn building_qualifiers_are_removed() {
        assert_eq!(
            normalize_building("Panchayat Union School, East Wing"),
            "PANCHAYAT UNION SCHOOL"
        );
        assert_eq!(
            normalize_building("Panchayat Union School West Wing Room No. 2"),
            "PANCHAYAT UNION SCHOOL"
        );
        assert_eq!(
            normalize_building("GOVT HIGH SCHOOL,NORTH BUILDING"),
            "GOVT HIGH SCHOOL"
        );
        assert_eq!(
            normalize_building("  Govt  Hr Sec School  Ground Floor "),
            "GOVT HR SEC SCHOOL"
        );
        assert_eq!(
            normalize_building("Middle School Block B, Left Portion"),
            "MIDDLE SCHOOL"
        );
        assert_eq!(
            normalize_building("PU School, Middle Portion"),
            "PU SCHOOL"
        );
        assert_ne!(
            normalize_building("PU Middle School"),
            normalize_building("PU School")
        );
    }

    #[test]
    fn token_bucket_absorbs_a_burst() {
        let clock = ManualClock::new();
        let mut limiter = RateLimiter::with_clock(2.0, 3, &clock);
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_ok());
        let wait = limiter.try_acquire().unwrap_err();
        assert_eq!(wait, Duration::from_millis(500));
        clock.advance(Duration::from_millis(500));
        assert!(limiter.try_acquire().is_ok());
        clock.advance(Duration::from_secs(60));
        assert_eq!(limiter.available_tokens(), 3);
    }

    #[test]
    fn vanishing_rate_never_refills() {
        let clock = ManualClock::new();
        let mut limiter = RateLimiter::with_clock(1e-30, 1, &clock);
        assert!(limiter.try_acquire().is_ok());
        assert_eq!(limiter.try_acquire(), Err(Duration::MAX));
        assert!(!limiter.acquire());
    }

    #[test]
    fn acquire_waits_on_the_clock() {
        let clock = ManualClock::new();
        let start = clock.now();
        let mut limiter = RateLimiter::with_clock(4.0, 1, &clock);
        assert!(limiter.acquire());
        assert!(limiter.acquire());
        assert!(limiter.acquire());
        assert_eq!(clock.now().duration_since(start), Duration::from_millis(500));
    }

    #[test]
    fn cache_hits_do_not_call_the_service() {
        let clock = ManualClock::new();
        let mut service = Recording::new(&[(
            "PU School, Orikkai, Kancheepuram, Tamil Nadu",
            12.8,
            79.7,
        )]);
        let stations = vec![
            station("1", "PU School", "Orikkai"),
            station("2", "PU School, East Wing", "Orikkai"),
            station("3 (M)", "PU School Room No 4", "Orikkai"),
        ];
        let (res, stats) = {
            let mut g = StationGeocoder::with_clock(&mut service, &settings(None), &clock);
            g.geocode_stations("Kancheepuram", &stations, CENTER)
        };
        assert_eq!(service.calls.len(), 1);
        assert_eq!(stats.cache_hits, 2);
        assert_eq!(stats.found, 3);
        assert!(res.iter().all(|s| s.found && s.location.lat == 12.8));
        assert_eq!(res[2].booth_key, Some(BoothKey(3)));
    }

    #[test]
    fn village_then_fallback() {
        let clock = ManualClock::new();
        let mut service = Recording::new(&[("Walajabad, Kancheepuram, Tamil Nadu", 12.79, 79.82)]);
        service
            .failing
            .push("Unknown Hall, Ayyampettai, Kancheepuram, Tamil Nadu".to_string());
        let stations = vec![
            station("1", "Library", "Walajabad"),
            station("2", "Unknown Hall", "Ayyampettai"),
        ];
        let (res, stats) = {
            let mut g = StationGeocoder::with_clock(&mut service, &settings(None), &clock);
            g.geocode_stations("Kancheepuram", &stations, CENTER)
        };
        assert!(res[0].found);
        assert_eq!(res[0].location.lng, 79.82);
        assert!(!res[1].found);
        assert_eq!(res[1].location, CENTER);
        assert_eq!(stats.lookups, 4);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.fallback, 1);
    }

    #[test]
    fn budget_stops_outbound_calls() {
        let clock = ManualClock::new();
        let mut service = Recording::new(&[]);
        let stations = vec![
            station("1", "A School", ""),
            station("2", "B School", ""),
            station("3", "C School", ""),
        ];
        let (res, stats) = {
            let mut g = StationGeocoder::with_clock(&mut service, &settings(Some(2)), &clock);
            g.geocode_stations("Uthiramerur", &stations, CENTER)
        };
        assert_eq!(service.calls.len(), 2);
        assert!(stats.budget_exhausted);
        assert_eq!(stats.fallback, 3);
        assert!(res.iter().all(|s| s.location == CENTER));
    }

    #[test]
    fn gazetteer_ignores_case_and_spacing() {
        let mut g = GazetteerGeocoder::new(&[(
            "Orikkai,  Kancheepuram".to_string(),
            Coordinates { lat: 1.0, lng: 2.0 },
        )]);
        assert_eq!(
            g.lookup("ORIKKAI, KANCHEEPURAM"),
            LookupOutcome::Found(Coordinates { lat: 1.0, lng: 2.0 })
        );
        assert_eq!(g.lookup("Elsewhere"), LookupOutcome::NotFound);
    }
}
