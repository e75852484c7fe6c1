use serde::{Deserialize, Serialize};

use crate::tally::io_summary::{geocode_stats_js, location_js};
use crate::tally::*;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
struct StationLine {
    station_no: String,
    #[serde(default)]
    building: String,
    #[serde(default)]
    village: String,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
struct GazetteerLine {
    address: String,
    lat: f64,
    lng: f64,
}

impl From<StationLine> for StationAddress {
    fn from(l: StationLine) -> Self {
        StationAddress {
            station_no: l.station_no,
            building: l.building,
            village: l.village,
        }
    }
}

/// Reads the polling station addresses of a document: a CSV file with the
/// columns station_no, building, village, or a JSON list of such records.
pub fn read_stations(path: &str) -> TallyResult<Vec<StationAddress>> {
    let lines: Vec<StationLine> = if path.to_lowercase().ends_with(".json") {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
        serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?
    } else {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .context(CsvOpenSnafu { path })?;
        let mut res: Vec<StationLine> = Vec::new();
        for (idx, line_r) in rdr.deserialize().enumerate() {
            let line: StationLine = line_r.context(CsvLineParseSnafu {
                path,
                lineno: idx + 2,
            })?;
            res.push(line);
        }
        res
    };
    debug!("read_stations: {}: {} stations", path, lines.len());
    Ok(lines.into_iter().map(StationAddress::from).collect())
}

/// Reads the offline gazetteer: address, lat, lng.
pub fn read_gazetteer(path: &str) -> TallyResult<Vec<(String, Coordinates)>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut res: Vec<(String, Coordinates)> = Vec::new();
    for (idx, line_r) in rdr.deserialize().enumerate() {
        let line: GazetteerLine = line_r.context(CsvLineParseSnafu {
            path,
            lineno: idx + 2,
        })?;
        res.push((
            line.address,
            Coordinates {
                lat: line.lat,
                lng: line.lng,
            },
        ));
    }
    Ok(res)
}

pub fn geocoded_js(
    number: &str,
    name: &str,
    stations: &[GeocodedStation],
    stats: &GeocodeStats,
) -> JSValue {
    let stations_js: Vec<JSValue> = stations
        .iter()
        .map(|s| {
            let mut js = location_js(s);
            js["boothKey"] = json!(s.booth_key.map(|k| k.0));
            js
        })
        .collect();
    json!({
        "constituency": {"number": number, "name": name},
        "stats": geocode_stats_js(stats),
        "stations": stations_js,
    })
}
