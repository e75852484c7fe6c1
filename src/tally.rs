use log::{debug, info, warn};

use booth_tally::geocode::*;
use booth_tally::*;
use snafu::{prelude::*, Snafu};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::tally::config_reader::*;
use crate::tally::io_common::*;

pub mod config_reader;
pub mod io_common;
pub mod io_comparison;
pub mod io_csv;
pub mod io_excel;
pub mod io_extract;
pub mod io_geocode;
pub mod io_json;
pub mod io_summary;

#[derive(Debug, Snafu)]
pub enum TallyError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Worksheet {name} of {path} could not be read"))]
    ReadingWorksheet {
        source: calamine::XlsxError,
        path: String,
        name: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON content of {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing JSON output"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Line {lineno} of {path}: {message}"))]
    CsvContent {
        path: String,
        lineno: usize,
        message: String,
    },
    #[snafu(display("Error writing CSV file {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Unknown input type {provider:?}, expected json, csv or xlsx"))]
    UnknownProvider { provider: String },
    #[snafu(display("Invalid value for {field}: {value}"))]
    InvalidConfig { field: String, value: String },
    #[snafu(display("Outputs {stem} were already written by another document of this run"))]
    DuplicateOutput { stem: String },
    #[snafu(display("Extraction of {path} failed"))]
    Extraction { source: TallyErrors, path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TallyResult<T> = Result<T, TallyError>;

/// Where the artifacts of one document go.
#[derive(Debug, Clone)]
pub enum OutputTarget {
    Directory(PathBuf),
    /// Only the summary is printed.
    Stdout,
}

/// Everything the driver produced for one document.
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub constituency_number: String,
    pub constituency_name: String,
    pub booths: usize,
    pub winner: Option<String>,
    pub warnings: Vec<String>,
    pub summary_js: JSValue,
    pub files: Vec<String>,
}

fn read_pages(path: &str, provider: &str) -> TallyResult<Vec<PageExtract>> {
    info!("Attempting to read {} pages from {:?}", provider, path);
    match provider {
        "json" => io_json::read_json_pages(path),
        "csv" => io_csv::read_csv_pages(path),
        "xlsx" | "excel" => io_excel::read_excel_pages(path),
        x => UnknownProviderSnafu { provider: x }.fail(),
    }
}

/// Number and name of the constituency: configured values first, then the
/// title of the first page, then UNKNOWN.
fn identify_constituency(
    source: &DocumentSource,
    extract: &DocumentExtract,
) -> TallyResult<(String, String)> {
    let from_title = extract.title.as_deref().and_then(parse_constituency_title);
    let number = match source.constituency_number()? {
        Some(n) => n,
        None => from_title
            .as_ref()
            .map(|(n, _)| n.clone())
            .unwrap_or_else(|| UNKNOWN.to_string()),
    };
    let name = match source.constituency_name.as_deref().map(|s| s.trim()) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => from_title
            .map(|(_, n)| n)
            .unwrap_or_else(|| UNKNOWN.to_string()),
    };
    Ok((number, name))
}

type BatchGeocoder = StationGeocoder<GazetteerGeocoder>;

fn geocode_document(
    root: &Path,
    source: &DocumentSource,
    constituency_name: &str,
    geocoder: Option<&mut BatchGeocoder>,
) -> TallyResult<Option<(Vec<GeocodedStation>, GeocodeStats)>> {
    let stations_path = match &source.stations_path {
        Some(p) => resolve_path(root, p),
        None => return Ok(None),
    };
    let geocoder = match geocoder {
        Some(g) => g,
        None => {
            warn!(
                "{}: stations are listed but geocoding is not configured",
                constituency_name
            );
            return Ok(None);
        }
    };
    let fallback = match source.fallback_center()? {
        Some(c) => c,
        None => {
            warn!(
                "{}: no fallback centre configured, stations are not geocoded",
                constituency_name
            );
            return Ok(None);
        }
    };
    let stations = match io_geocode::read_stations(&path_string(&stations_path)) {
        Ok(s) => s,
        Err(e) => {
            warn!(
                "{}: station list unreadable, stations are not geocoded: {}",
                constituency_name,
                error_chain(&e)
            );
            return Ok(None);
        }
    };
    Ok(Some(geocoder.geocode_stations(
        constituency_name,
        &stations,
        fallback,
    )))
}

/// Runs one document end to end. Nothing computed here survives into the
/// next document apart from the run-wide geocoding limiter and the output
/// stems already taken.
pub fn process_document(
    root: &Path,
    source: &DocumentSource,
    target: &OutputTarget,
    geocoder: Option<&mut BatchGeocoder>,
    used_stems: &mut BTreeSet<String>,
) -> TallyResult<DocumentOutcome> {
    let input_path = path_string(&resolve_path(root, &source.file_path));
    let pages = read_pages(&input_path, source.provider.as_str())?;
    let doc_config = source.document_config();
    let extract = extract_document(&pages, &doc_config).context(ExtractionSnafu {
        path: input_path.clone(),
    })?;
    let (number, name) = identify_constituency(source, &extract)?;
    info!(
        "AC {} {}: {} booths extracted from {}",
        number,
        name,
        extract.booths.len(),
        simplify_file_name(&input_path)
    );

    let results = classify_document(&extract, &doc_config);
    let summary = summarize_constituency(&extract.booths, &results);
    let geocoded = geocode_document(root, source, &name, geocoder)?;

    let summary_js = io_summary::build_summary_js(
        &number,
        &name,
        &extract,
        &results,
        &summary,
        geocoded.as_ref(),
    );

    let mut files: Vec<String> = Vec::new();
    match target {
        OutputTarget::Stdout => {
            let pretty = serde_json::to_string_pretty(&summary_js).context(SerializingJsonSnafu {})?;
            println!("{}", pretty);
        }
        OutputTarget::Directory(dir) => {
            let stem = reserve_stem(used_stems, &number, &name, &input_path)?;
            let extract_p = dir.join(format!("{}_booths.csv", stem));
            io_extract::write_extract(&extract_p, &number, &name, &extract)?;
            files.push(path_string(&extract_p));

            let summary_p = dir.join(format!("{}_summary.json", stem));
            write_json(&summary_p, &summary_js)?;
            files.push(path_string(&summary_p));

            if let Some((stations, stats)) = geocoded.as_ref() {
                let geo_p = dir.join(format!("{}_geocoded.json", stem));
                write_json(&geo_p, &io_geocode::geocoded_js(&number, &name, stations, stats))?;
                files.push(path_string(&geo_p));
            }
        }
    }

    Ok(DocumentOutcome {
        constituency_number: number,
        constituency_name: name,
        booths: extract.booths.len(),
        winner: summary.winner.map(|(p, _)| p.to_string()),
        warnings: extract.warnings.iter().map(|w| w.to_string()).collect(),
        summary_js,
        files,
    })
}

fn build_geocoder(root: &Path, gs: &GeocodingSource) -> TallyResult<BatchGeocoder> {
    let settings = gs.settings()?;
    let gazetteer_path = path_string(&resolve_path(root, &gs.gazetteer_path));
    let entries = io_geocode::read_gazetteer(&gazetteer_path)?;
    info!(
        "Gazetteer {}: {} entries",
        simplify_file_name(&gazetteer_path),
        entries.len()
    );
    Ok(StationGeocoder::new(
        GazetteerGeocoder::new(&entries),
        &settings,
    ))
}

/// Checks a produced summary against a reference file. Differences are
/// printed and reported as an error.
pub fn check_reference(produced: &JSValue, reference_path: &str) -> TallyResult<()> {
    let reference = read_summary(reference_path)?;
    let pretty_produced = serde_json::to_string_pretty(produced).context(SerializingJsonSnafu {})?;
    let pretty_reference =
        serde_json::to_string_pretty(&reference).context(SerializingJsonSnafu {})?;
    if pretty_reference != pretty_produced {
        warn!("Found differences with the reference {}", reference_path);
        print_diff(pretty_reference.as_str(), pretty_produced.as_str(), "\n");
        whatever!("Difference detected between the produced summary and the reference summary")
    }
    Ok(())
}

/// Runs every document and comparison of a batch configuration.
///
/// Only an unreadable configuration is an error: a document or comparison
/// that fails is recorded in the batch summary and the run continues.
pub fn run_batch(config_path: &str, reference: Option<&str>) -> TallyResult<JSValue> {
    let config = read_batch_config(config_path)?;
    let root = Path::new(config_path)
        .parent()
        .context(MissingParentDirSnafu {})?;
    let out_dir = config.output_settings.output_path(root);
    fs::create_dir_all(&out_dir).context(WritingFileSnafu {
        path: path_string(&out_dir),
    })?;
    info!(
        "Batch {}: {} documents, {} comparisons, output in {:?}",
        simplify_file_name(config_path),
        config.documents.len(),
        config.comparisons.len(),
        out_dir
    );

    let mut geocoding_status = JSValue::Null;
    let mut geocoder: Option<BatchGeocoder> = match &config.geocoding {
        None => None,
        Some(gs) => match build_geocoder(root, gs) {
            Ok(g) => {
                geocoding_status = json!("enabled");
                Some(g)
            }
            Err(e) => {
                warn!("Geocoding disabled: {}", e);
                geocoding_status = json!(format!("disabled: {}", e));
                None
            }
        },
    };

    let target = OutputTarget::Directory(out_dir.clone());
    let mut documents_js: Vec<JSValue> = Vec::new();
    let mut used_stems: BTreeSet<String> = BTreeSet::new();
    for source in config.documents.iter() {
        match process_document(root, source, &target, geocoder.as_mut(), &mut used_stems) {
            Ok(outcome) => documents_js.push(json!({
                "filePath": source.file_path,
                "status": "ok",
                "constituencyNumber": outcome.constituency_number,
                "constituencyName": outcome.constituency_name,
                "booths": outcome.booths,
                "winner": outcome.winner,
                "warnings": outcome.warnings,
                "files": outcome.files,
            })),
            Err(e) => {
                warn!("Document {} failed: {}", source.file_path, e);
                documents_js.push(json!({
                    "filePath": source.file_path,
                    "status": "failed",
                    "error": error_chain(&e),
                }));
            }
        }
    }

    let mut comparisons_js: Vec<JSValue> = Vec::new();
    for cmp in config.comparisons.iter() {
        match io_comparison::run_comparison(root, &out_dir, cmp) {
            Ok(outcome) => comparisons_js.push(outcome),
            Err(e) => {
                warn!("Comparison {} failed: {}", cmp.name, e);
                comparisons_js.push(json!({
                    "name": cmp.name,
                    "status": "failed",
                    "error": error_chain(&e),
                }));
            }
        }
    }

    let batch_js = json!({
        "config": {
            "electionName": config.output_settings.election_name,
            "electionYear": config.output_settings.election_year(),
            "partyTableVersion": PARTY_TABLE_VERSION,
            "partyTableFingerprint": party_table_fingerprint(),
        },
        "geocoding": geocoding_status,
        "geocodingLookups": geocoder.as_ref().map(|g| g.lookups()),
        "documents": documents_js,
        "comparisons": comparisons_js,
    });
    let batch_p = out_dir.join("batch_summary.json");
    if let Err(e) = write_json(&batch_p, &batch_js) {
        warn!("Could not write the batch summary: {}", e);
    }
    debug!("batch summary: {}", batch_js);

    if let Some(reference_path) = reference {
        check_reference(&batch_js, reference_path)?;
    }
    Ok(batch_js)
}

/// Runs a single document given on the command line.
pub fn run_single(
    source: &DocumentSource,
    out: Option<&str>,
    reference: Option<&str>,
) -> TallyResult<JSValue> {
    let target = match out {
        None | Some("stdout") | Some("") => OutputTarget::Stdout,
        Some(d) => {
            let dir = PathBuf::from(d);
            fs::create_dir_all(&dir).context(WritingFileSnafu { path: d })?;
            OutputTarget::Directory(dir)
        }
    };
    let outcome = process_document(Path::new("."), source, &target, None, &mut BTreeSet::new())?;
    if let Some(reference_path) = reference {
        check_reference(&outcome.summary_js, reference_path)?;
    }
    Ok(outcome.summary_js)
}
