use log::{debug, warn};

use std::collections::BTreeMap;

use crate::classify::parse_serial;
use crate::config::*;

/// The first run of digits of a polling station cell: "5 (M)" -> 5, "12A" -> 12.
pub fn extract_booth_key(cell: &str) -> Option<BoothKey> {
    let digits: String = cell
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    // A run too long for a booth number is not a booth number.
    digits.parse::<u32>().ok().map(BoothKey)
}

/// Vote cells are blank for zero in many sheets: anything unreadable counts as 0.
///
/// A count that does not fit in a `u32` is a garbled cell, not a vote count.
pub fn parse_votes(cell: &str) -> u64 {
    parse_optional_votes(cell).unwrap_or(0)
}

fn parse_optional_votes(cell: &str) -> Option<u64> {
    cell.trim().parse::<u32>().ok().map(u64::from)
}

fn add_optional(acc: Option<u64>, x: Option<u64>) -> Option<u64> {
    match (acc, x) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
    }
}

// The state of a booth while pages are being consumed.
#[derive(Debug, Clone)]
struct PartialBooth {
    table_no: u32,
    station_labels: Vec<String>,
    candidate_votes: Vec<u64>,
    source_total_valid: Option<u64>,
    rejected: Option<u64>,
    tendered: Option<u64>,
    row_count: u32,
}

/// Folds DATA rows into booth records.
///
/// Rows sharing a booth key are summed, never overwritten: the digit key merges
/// annotated variants of a station ("5" and "5 (M)") and a booth may be split
/// over several pages.
pub struct BoothRecordBuilder {
    layout: ColumnLayout,
    booths: BTreeMap<BoothKey, PartialBooth>,
    keyless_rows: u64,
    merged_rows: u64,
}

impl BoothRecordBuilder {
    pub fn new(layout: &ColumnLayout) -> BoothRecordBuilder {
        BoothRecordBuilder {
            layout: layout.clone(),
            booths: BTreeMap::new(),
            keyless_rows: 0,
            merged_rows: 0,
        }
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    /// Adds one DATA row. Returns the key it was filed under, if any.
    pub fn add_row(&mut self, row: &RawTableRow) -> Option<BoothKey> {
        let station = row.cell(1).trim().to_string();
        let key = match extract_booth_key(&station) {
            Some(k) => k,
            None => {
                warn!(
                    "add_row: page {} row {}: no booth number in {:?}, row dropped",
                    row.page, row.index, station
                );
                self.keyless_rows += 1;
                return None;
            }
        };
        let candidate_votes: Vec<u64> = self
            .layout
            .identities
            .iter()
            .map(|ci| parse_votes(row.cell(ci.column_index)))
            .collect();
        let summary = |role: SummaryRole| -> Option<u64> {
            self.layout
                .summary_column(role)
                .and_then(|idx| parse_optional_votes(row.cell(idx)))
        };
        let source_total_valid = summary(SummaryRole::TotalValid);
        let rejected = summary(SummaryRole::Rejected);
        let tendered = summary(SummaryRole::Tendered);
        let table_no = parse_serial(row.cell(0)).unwrap_or(0);
        debug!(
            "add_row: page {} row {}: booth {} ({:?}) votes {:?}",
            row.page, row.index, key, station, candidate_votes
        );

        if let Some(existing) = self.booths.get_mut(&key) {
            self.merged_rows += 1;
            for (acc, v) in existing
                .candidate_votes
                .iter_mut()
                .zip(candidate_votes.iter())
            {
                *acc += *v;
            }
            existing.source_total_valid =
                add_optional(existing.source_total_valid, source_total_valid);
            existing.rejected = add_optional(existing.rejected, rejected);
            existing.tendered = add_optional(existing.tendered, tendered);
            if !existing.station_labels.contains(&station) {
                existing.station_labels.push(station);
            }
            existing.row_count += 1;
        } else {
            self.booths.insert(
                key,
                PartialBooth {
                    table_no,
                    station_labels: vec![station],
                    candidate_votes,
                    source_total_valid,
                    rejected,
                    tendered,
                    row_count: 1,
                },
            );
        }
        Some(key)
    }

    pub fn keyless_rows(&self) -> u64 {
        self.keyless_rows
    }

    pub fn merged_rows(&self) -> u64 {
        self.merged_rows
    }

    /// Closes the aggregation. Records come out by ascending booth key.
    ///
    /// Returns the records and the number of booths whose claimed total
    /// disagreed with the sum of their candidate columns.
    pub fn finish(self) -> (Vec<BoothRecord>, u64) {
        let mut mismatches: u64 = 0;
        let mut res: Vec<BoothRecord> = Vec::new();
        for (key, pb) in self.booths.into_iter() {
            let mut party_votes: BTreeMap<PartyLabel, u64> = BTreeMap::new();
            for (ci, v) in self.layout.identities.iter().zip(pb.candidate_votes.iter()) {
                *party_votes.entry(ci.party.clone()).or_insert(0) += *v;
            }
            let candidate_sum: u64 = pb.candidate_votes.iter().sum();
            // The candidate columns are authoritative: a disagreeing total is recomputed.
            if let Some(claimed) = pb.source_total_valid {
                if claimed != candidate_sum {
                    mismatches += 1;
                    debug!(
                        "finish: booth {}: claimed total {} but candidates sum to {}",
                        key, claimed, candidate_sum
                    );
                }
            }
            res.push(BoothRecord {
                booth_key: key,
                table_no: pb.table_no,
                station_labels: pb.station_labels,
                candidate_votes: pb.candidate_votes,
                party_votes,
                total_valid_votes: candidate_sum,
                source_total_valid: pb.source_total_valid,
                rejected_votes: pb.rejected.unwrap_or(0),
                tendered_votes: pb.tendered.unwrap_or(0),
                row_count: pb.row_count,
            });
        }
        (res, mismatches)
    }
}

/// Votes per party summed over booths, largest first. Ties keep label order.
pub fn party_totals(booths: &[BoothRecord]) -> Vec<(PartyLabel, u64)> {
    let mut totals: BTreeMap<PartyLabel, u64> = BTreeMap::new();
    for b in booths.iter() {
        for (p, v) in b.party_votes.iter() {
            *totals.entry(p.clone()).or_insert(0) += *v;
        }
    }
    let mut res: Vec<(PartyLabel, u64)> = totals.into_iter().collect();
    res.sort_by(|a, b| b.1.cmp(&a.1));
    res
}
