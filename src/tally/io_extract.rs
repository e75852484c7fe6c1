// The booth extract of one document as CSV, and reading it back.
//
// Columns: constituency_number, constituency_name, table_no,
// polling_station_no, candidate_<ordinal>_<label>..., total_valid, rejected,
// total, tendered. Merged station labels are joined with " / ".

use booth_tally::booths::BoothRecordBuilder;
use booth_tally::columns::FIXED_COLUMNS;

use crate::tally::*;

const STATION_SEPARATOR: &str = " / ";
// constituency_number and constituency_name precede the table columns.
const LEADING_COLUMNS: usize = 2;

/// A booth extract read back from its CSV file.
#[derive(PartialEq, Debug, Clone)]
pub struct ExtractTable {
    pub constituency_number: Option<String>,
    pub constituency_name: Option<String>,
    pub layout: ColumnLayout,
    pub booths: Vec<BoothRecord>,
}

pub fn candidate_header(ci: &ColumnIdentity) -> String {
    format!("candidate_{}_{}", ci.candidate_ordinal, ci.party)
}

fn parse_candidate_header(header: &str) -> Option<(u32, PartyLabel)> {
    let mut parts = header.splitn(3, '_');
    if parts.next()? != "candidate" {
        return None;
    }
    let ordinal = parts.next()?.parse::<u32>().ok()?;
    Some((ordinal, PartyLabel::from_name(parts.next().unwrap_or(""))))
}

pub fn extract_headers(layout: &ColumnLayout) -> Vec<String> {
    let mut res: Vec<String> = vec![
        "constituency_number".to_string(),
        "constituency_name".to_string(),
        "table_no".to_string(),
        "polling_station_no".to_string(),
    ];
    res.extend(layout.identities.iter().map(candidate_header));
    res.extend(SummaryRole::ALL.iter().map(|r| r.column_name().to_string()));
    res
}

fn booth_line(number: &str, name: &str, booth: &BoothRecord) -> Vec<String> {
    let mut res: Vec<String> = vec![
        number.to_string(),
        name.to_string(),
        booth.table_no.to_string(),
        booth.station_labels.join(STATION_SEPARATOR),
    ];
    res.extend(booth.candidate_votes.iter().map(|v| v.to_string()));
    for role in SummaryRole::ALL.iter() {
        let v = match role {
            SummaryRole::TotalValid => booth.total_valid_votes,
            SummaryRole::Rejected => booth.rejected_votes,
            SummaryRole::Total => booth.total_valid_votes + booth.rejected_votes,
            SummaryRole::Tendered => booth.tendered_votes,
        };
        res.push(v.to_string());
    }
    res
}

pub fn write_extract(
    path: &Path,
    number: &str,
    name: &str,
    extract: &DocumentExtract,
) -> TallyResult<()> {
    let p = path_string(path);
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(extract_headers(&extract.layout))
        .context(CsvWriteSnafu { path: p.clone() })?;
    for booth in extract.booths.iter() {
        wtr.write_record(booth_line(number, name, booth))
            .context(CsvWriteSnafu { path: p.clone() })?;
    }
    let bytes = match wtr.into_inner() {
        Ok(b) => b,
        Err(e) => whatever!("Could not flush the extract of {}: {}", p, e),
    };
    write_atomic(path, &bytes)?;
    info!(
        "write_extract: {} booths written to {}",
        extract.booths.len(),
        simplify_file_name(&p)
    );
    Ok(())
}

fn layout_from_headers(headers: &csv::StringRecord, path: &str) -> TallyResult<ColumnLayout> {
    let mut identities: Vec<ColumnIdentity> = Vec::new();
    let mut summary_columns: Vec<SummaryColumn> = Vec::new();
    for (idx, h) in headers.iter().enumerate().skip(LEADING_COLUMNS + FIXED_COLUMNS) {
        // Indexes are relative to the table row, without the leading columns.
        let column_index = idx - LEADING_COLUMNS;
        if let Some((candidate_ordinal, party)) = parse_candidate_header(h) {
            identities.push(ColumnIdentity {
                column_index,
                candidate_ordinal,
                raw_label_text: party.to_string(),
                party,
                candidate_name: String::new(),
            });
        } else if let Some(role) = SummaryRole::ALL.iter().find(|r| r.column_name() == h) {
            summary_columns.push(SummaryColumn {
                column_index,
                role: *role,
            });
        } else {
            return CsvContentSnafu {
                path,
                lineno: 1_usize,
                message: format!("unexpected column {:?}", h),
            }
            .fail();
        }
    }
    Ok(ColumnLayout {
        identities,
        summary_columns,
    })
}

/// Reads an extract written by `write_extract`. The booth records are rebuilt
/// with the same aggregation rules as the extraction itself.
pub fn read_extract(path: &str) -> TallyResult<ExtractTable> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();
    let headers = match records.next() {
        Some(r) => r.context(CsvLineParseSnafu { path, lineno: 1_usize })?,
        None => {
            return CsvContentSnafu {
                path,
                lineno: 1_usize,
                message: "empty file".to_string(),
            }
            .fail()
        }
    };
    let layout = layout_from_headers(&headers, path)?;
    let mut builder = BoothRecordBuilder::new(&layout);
    let mut constituency_number: Option<String> = None;
    let mut constituency_name: Option<String> = None;
    for (idx, line_r) in records.enumerate() {
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        if constituency_number.is_none() {
            constituency_number = line.get(0).map(|s| s.to_string());
            constituency_name = line.get(1).map(|s| s.to_string());
        }
        let cells: Vec<Option<String>> = line
            .iter()
            .skip(LEADING_COLUMNS)
            .map(|s| Some(s.to_string()))
            .collect();
        let row = RawTableRow::new(0, lineno, cells);
        if builder.add_row(&row).is_none() {
            warn!("read_extract: {}: line {} has no booth number", path, lineno);
        }
    }
    let (mut booths, mismatches) = builder.finish();
    if mismatches > 0 {
        warn!(
            "read_extract: {}: {} booths with a total that disagrees with their candidates",
            path, mismatches
        );
    }
    for b in booths.iter_mut() {
        b.station_labels = b
            .station_labels
            .iter()
            .flat_map(|s| s.split(STATION_SEPARATOR).map(|x| x.to_string()))
            .collect();
    }
    debug!("read_extract: {}: {} booths", path, booths.len());
    Ok(ExtractTable {
        constituency_number,
        constituency_name,
        layout,
        booths,
    })
}
