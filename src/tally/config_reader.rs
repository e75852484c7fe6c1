use crate::tally::*;

use serde::{Deserialize, Serialize};

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "electionName")]
    pub election_name: Option<String>,
    #[serde(rename = "electionYear")]
    pub election_year: Option<JSValue>,
}

impl OutputSettings {
    /// The election year, whether it was written as a number or a string.
    pub fn election_year(&self) -> Option<String> {
        match &self.election_year {
            Some(JSValue::Number(n)) => Some(n.to_string()),
            Some(JSValue::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    pub fn output_path(&self, root: &Path) -> PathBuf {
        match &self.output_directory {
            Some(d) if !d.is_empty() => root.join(d),
            _ => root.to_path_buf(),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "constituencyNumber")]
    pub constituency_number: Option<JSValue>,
    #[serde(rename = "constituencyName")]
    pub constituency_name: Option<String>,
    #[serde(rename = "trackedParties")]
    pub tracked_parties: Option<Vec<String>>,
    #[serde(rename = "majorParties")]
    pub major_parties: Option<Vec<String>>,
    #[serde(rename = "stationsPath")]
    pub stations_path: Option<String>,
    #[serde(rename = "fallbackCenter")]
    pub fallback_center: Option<Vec<f64>>,
}

impl DocumentSource {
    /// Constituency numbers are written with 3 digits ("036").
    pub fn constituency_number(&self) -> TallyResult<Option<String>> {
        match &self.constituency_number {
            None => Ok(None),
            Some(JSValue::Number(n)) => match n.as_u64() {
                Some(x) => Ok(Some(format!("{:03}", x))),
                None => InvalidConfigSnafu {
                    field: "constituencyNumber",
                    value: n.to_string(),
                }
                .fail(),
            },
            Some(JSValue::String(s)) if s.trim().chars().all(|c| c.is_ascii_digit()) => {
                let s = s.trim();
                if s.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(format!("{:0>3}", s)))
                }
            }
            Some(x) => InvalidConfigSnafu {
                field: "constituencyNumber",
                value: x.to_string(),
            }
            .fail(),
        }
    }

    pub fn fallback_center(&self) -> TallyResult<Option<Coordinates>> {
        match self.fallback_center.as_deref() {
            None => Ok(None),
            Some([lat, lng]) => Ok(Some(Coordinates {
                lat: *lat,
                lng: *lng,
            })),
            Some(x) => InvalidConfigSnafu {
                field: "fallbackCenter",
                value: format!("{:?}", x),
            }
            .fail(),
        }
    }

    pub fn document_config(&self) -> DocumentConfig {
        let defaults = DocumentConfig::default();
        DocumentConfig {
            tracked_parties: self
                .tracked_parties
                .as_ref()
                .map(|l| parse_party_labels(l)),
            major_parties: self
                .major_parties
                .as_ref()
                .map(|l| parse_party_labels(l))
                .unwrap_or(defaults.major_parties),
            header_rows: defaults.header_rows,
        }
    }
}

pub fn parse_party_labels(names: &[String]) -> Vec<PartyLabel> {
    names
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| PartyLabel::from_name(s))
        .collect()
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AliasEntry {
    pub name: String,
    pub before: Vec<String>,
    pub after: Vec<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonSource {
    pub name: String,
    pub before: String,
    pub after: String,
    #[serde(rename = "beforeLabel")]
    pub before_label: Option<String>,
    #[serde(rename = "afterLabel")]
    pub after_label: Option<String>,
    pub parties: Option<Vec<AliasEntry>>,
}

impl ComparisonSource {
    pub fn before_label(&self) -> String {
        self.before_label
            .clone()
            .unwrap_or_else(|| "before".to_string())
    }

    pub fn after_label(&self) -> String {
        self.after_label.clone().unwrap_or_else(|| "after".to_string())
    }

    /// The declared aliases, or None when they should be derived from the data.
    pub fn aliases(&self) -> Option<Vec<PartyAlias>> {
        self.parties.as_ref().map(|entries| {
            entries
                .iter()
                .map(|e| PartyAlias {
                    name: e.name.clone(),
                    before: parse_party_labels(&e.before),
                    after: parse_party_labels(&e.after),
                })
                .collect()
        })
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingSource {
    #[serde(rename = "gazetteerPath")]
    pub gazetteer_path: String,
    #[serde(rename = "regionSuffix")]
    pub region_suffix: Option<String>,
    #[serde(rename = "ratePerSecond")]
    pub rate_per_second: Option<f64>,
    pub burst: Option<u32>,
    #[serde(rename = "maxLookups")]
    pub max_lookups: Option<u64>,
}

impl GeocodingSource {
    pub fn settings(&self) -> TallyResult<GeocodeSettings> {
        let defaults = GeocodeSettings::default();
        let rate_per_second = self.rate_per_second.unwrap_or(defaults.rate_per_second);
        if rate_per_second.is_nan() || rate_per_second <= 0.0 {
            return InvalidConfigSnafu {
                field: "ratePerSecond",
                value: rate_per_second.to_string(),
            }
            .fail();
        }
        Ok(GeocodeSettings {
            region_suffix: self
                .region_suffix
                .clone()
                .unwrap_or(defaults.region_suffix),
            rate_per_second,
            burst: self.burst.unwrap_or(defaults.burst),
            max_lookups: self.max_lookups.or(defaults.max_lookups),
        })
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(default)]
    pub documents: Vec<DocumentSource>,
    #[serde(default)]
    pub comparisons: Vec<ComparisonSource>,
    pub geocoding: Option<GeocodingSource>,
}

pub fn read_batch_config(path: &str) -> TallyResult<BatchConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: BatchConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_batch_config: {:?}", config);
    Ok(config)
}

/// Reads a JSON file used as a reference for the produced output.
pub fn read_summary(path: &str) -> TallyResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}
