// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

/// One page as handed over by the table extractor.
///
/// The extractor is a black box: it either found a table on the page or it did
/// not. The title text of the page is optional and only used to recover the
/// constituency identifier of the document.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PageExtract {
    /// 1-based page number in the source document.
    pub number: u32,
    pub table: Option<Vec<Vec<Option<String>>>>,
    pub title: Option<String>,
}

impl PageExtract {
    pub fn table(number: u32, rows: Vec<Vec<Option<String>>>) -> PageExtract {
        PageExtract {
            number,
            table: Some(rows),
            title: None,
        }
    }

    pub fn empty(number: u32) -> PageExtract {
        PageExtract {
            number,
            table: None,
            title: None,
        }
    }
}

/// A row of an extracted table, with its position in the document.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawTableRow {
    pub page: u32,
    /// 0-based index of the row within the page table.
    pub index: usize,
    pub cells: Vec<Option<String>>,
}

impl RawTableRow {
    pub fn new(page: u32, index: usize, cells: Vec<Option<String>>) -> RawTableRow {
        RawTableRow { page, index, cells }
    }

    /// Convenience constructor where every cell is present. Empty strings stay empty.
    pub fn from_strs(page: u32, index: usize, cells: &[&str]) -> RawTableRow {
        RawTableRow {
            page,
            index,
            cells: cells.iter().map(|s| Some(s.to_string())).collect(),
        }
    }

    /// The content of a cell, or the empty string when the cell is null or
    /// beyond the end of the row.
    pub fn cell(&self, idx: usize) -> &str {
        self.cells
            .get(idx)
            .and_then(|c| c.as_deref())
            .unwrap_or("")
    }

    pub fn width(&self) -> usize {
        self.cells.len()
    }

    /// All the non-empty cells, trimmed and joined by a single space.
    pub fn joined_text(&self) -> String {
        self.cells
            .iter()
            .filter_map(|c| c.as_deref())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<&str>>()
            .join(" ")
    }
}

/// What a raw row turned out to be.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum RowKind {
    Header,
    Data,
    Total,
    Noise,
}

// ********* Column identities **********

/// The decoded party of a candidate column.
///
/// `Other` is a party name that is not in the dictionary, `Unknown` is a
/// column without any party text at all.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub enum PartyLabel {
    Party(String),
    Independent,
    Other,
    Unknown,
}

impl PartyLabel {
    pub fn party(code: &str) -> PartyLabel {
        PartyLabel::Party(code.to_string())
    }

    /// Parses the textual form produced by `Display`.
    pub fn from_name(name: &str) -> PartyLabel {
        match name.trim() {
            "Independent" | "IND" => PartyLabel::Independent,
            "Other" => PartyLabel::Other,
            "Unknown" | "" => PartyLabel::Unknown,
            s => PartyLabel::Party(s.to_string()),
        }
    }

    /// Aggregated buckets that do not stand for a single contestant.
    pub fn is_pseudo(&self) -> bool {
        matches!(self, PartyLabel::Other | PartyLabel::Unknown)
    }
}

impl Display for PartyLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartyLabel::Party(code) => write!(f, "{}", code),
            PartyLabel::Independent => write!(f, "Independent"),
            PartyLabel::Other => write!(f, "Other"),
            PartyLabel::Unknown => write!(f, "Unknown"),
        }
    }
}

/// The semantic identity of one candidate column of a document.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnIdentity {
    /// Index of the column in the raw rows.
    pub column_index: usize,
    /// 1-based order of the candidate on the ballot.
    pub candidate_ordinal: u32,
    pub party: PartyLabel,
    /// The party header text as it appeared in the document.
    pub raw_label_text: String,
    pub candidate_name: String,
}

/// The trailing per-booth summary columns of a Form 20 sheet.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum SummaryRole {
    TotalValid,
    Rejected,
    Total,
    Tendered,
}

impl SummaryRole {
    /// Canonical order of the summary columns in the output.
    pub const ALL: [SummaryRole; 4] = [
        SummaryRole::TotalValid,
        SummaryRole::Rejected,
        SummaryRole::Total,
        SummaryRole::Tendered,
    ];

    pub fn column_name(&self) -> &'static str {
        match self {
            SummaryRole::TotalValid => "total_valid",
            SummaryRole::Rejected => "rejected",
            SummaryRole::Total => "total",
            SummaryRole::Tendered => "tendered",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct SummaryColumn {
    pub column_index: usize,
    pub role: SummaryRole,
}

/// The resolved layout of a document. Built once from the header rows and
/// read-only afterwards.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ColumnLayout {
    pub identities: Vec<ColumnIdentity>,
    pub summary_columns: Vec<SummaryColumn>,
}

impl ColumnLayout {
    pub fn summary_column(&self, role: SummaryRole) -> Option<usize> {
        self.summary_columns
            .iter()
            .find(|sc| sc.role == role)
            .map(|sc| sc.column_index)
    }

    /// The distinct party labels of the layout, in column order.
    pub fn parties(&self) -> Vec<PartyLabel> {
        let mut res: Vec<PartyLabel> = Vec::new();
        for ci in self.identities.iter() {
            if !res.contains(&ci.party) {
                res.push(ci.party.clone());
            }
        }
        res
    }
}

// ********* Booth records **********

/// The digits extracted from a polling station number.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct BoothKey(pub u32);

impl Display for BoothKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The votes of one booth, aggregated over all the rows sharing its key.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BoothRecord {
    pub booth_key: BoothKey,
    /// Table number of the first row seen for this booth.
    pub table_no: u32,
    /// Every raw polling station label folded into this booth ("5", "5 (M)").
    pub station_labels: Vec<String>,
    /// Votes per candidate column, aligned with `ColumnLayout::identities`.
    pub candidate_votes: Vec<u64>,
    /// Votes per party. Candidates of the same party are summed.
    pub party_votes: BTreeMap<PartyLabel, u64>,
    pub total_valid_votes: u64,
    /// The total claimed by the source rows, if any was readable.
    pub source_total_valid: Option<u64>,
    pub rejected_votes: u64,
    pub tendered_votes: u64,
    /// Number of raw rows aggregated into this record.
    pub row_count: u32,
}

impl BoothRecord {
    pub fn votes_for(&self, party: &PartyLabel) -> u64 {
        self.party_votes.get(party).cloned().unwrap_or(0)
    }

    pub fn candidate_sum(&self) -> u64 {
        self.candidate_votes.iter().sum()
    }
}

// ******** Competitiveness *********

/// Below this two-party margin (in percent), a booth is a swing booth.
pub const SWING_THRESHOLD_PCT: f64 = 5.0;
/// Below this two-party margin (in percent), a booth is leaning.
pub const LEAN_THRESHOLD_PCT: f64 = 10.0;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Tier {
    Strong,
    Lean,
    Swing,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Strong => "STRONG",
            Tier::Lean => "LEAN",
            Tier::Swing => "SWING",
        }
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct CompetitivenessResult {
    pub booth_key: BoothKey,
    pub winner_party: PartyLabel,
    pub winner_votes: u64,
    pub runner_up_party: PartyLabel,
    pub runner_up_votes: u64,
    pub margin: u64,
    pub margin_pct: f64,
    pub tier: Tier,
}

/// The outcome of classifying one booth.
#[derive(PartialEq, Debug, Clone)]
pub enum Competitiveness {
    Classified(CompetitivenessResult),
    /// Fewer than two tracked parties received votes in this booth.
    InsufficientData {
        booth_key: BoothKey,
        parties_with_votes: usize,
    },
}

impl Competitiveness {
    pub fn result(&self) -> Option<&CompetitivenessResult> {
        match self {
            Competitiveness::Classified(r) => Some(r),
            Competitiveness::InsufficientData { .. } => None,
        }
    }
}

// ********* Configuration **********

/// Per-document settings. Two documents never share one of these implicitly:
/// the caller builds one per constituency.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DocumentConfig {
    /// The parties used for margins. `None` ranks every named party.
    pub tracked_parties: Option<Vec<PartyLabel>>,
    /// A warning is emitted when none of these is found among the candidate columns.
    pub major_parties: Vec<PartyLabel>,
    /// 0-based indexes of the candidate-name and party-name rows on the first page.
    pub header_rows: (usize, usize),
}

impl Default for DocumentConfig {
    fn default() -> Self {
        DocumentConfig {
            tracked_parties: None,
            major_parties: vec![PartyLabel::party("DMK"), PartyLabel::party("AIADMK")],
            header_rows: (1, 2),
        }
    }
}

// ******** Output data structures *********

/// Counters accumulated while a document is consumed.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ExtractionStats {
    pub pages: u32,
    pub empty_pages: u32,
    pub rows: u64,
    pub header_rows: u64,
    pub data_rows: u64,
    pub total_rows: u64,
    pub noise_rows: u64,
    /// DATA rows whose polling station cell carries no digit.
    pub keyless_rows: u64,
    /// DATA rows folded into a booth that already existed.
    pub merged_rows: u64,
    /// Booths whose claimed total disagreed with the sum of their candidates.
    pub total_mismatches: u64,
}

/// Non-fatal problems found in a document.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum DocumentWarning {
    /// No page of the document carried a table.
    NoTable,
    /// The header rows of the first table page could not be turned into any identity.
    HeaderUnparseable { page: u32 },
    /// None of the expected major parties was found among the candidate columns.
    MajorPartiesMissing { expected: Vec<PartyLabel> },
}

impl Display for DocumentWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentWarning::NoTable => write!(f, "no table found in the document"),
            DocumentWarning::HeaderUnparseable { page } => {
                write!(f, "header rows on page {} could not be parsed", page)
            }
            DocumentWarning::MajorPartiesMissing { expected } => {
                let names: Vec<String> = expected.iter().map(|p| p.to_string()).collect();
                write!(
                    f,
                    "none of the major parties ({}) was identified",
                    names.join(", ")
                )
            }
        }
    }
}

/// Everything extracted from one document.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DocumentExtract {
    pub layout: ColumnLayout,
    /// Ordered by ascending booth key.
    pub booths: Vec<BoothRecord>,
    pub stats: ExtractionStats,
    pub warnings: Vec<DocumentWarning>,
    /// Title text of the first page, when the extractor provided one.
    pub title: Option<String>,
}

// ******** Cross-year comparison *********

/// Declares which labels of each period are counted as the same contestant.
///
/// An alliance is expressed by listing several labels on one side.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PartyAlias {
    pub name: String,
    pub before: Vec<PartyLabel>,
    pub after: Vec<PartyLabel>,
}

impl PartyAlias {
    pub fn same(label: &PartyLabel) -> PartyAlias {
        PartyAlias {
            name: label.to_string(),
            before: vec![label.clone()],
            after: vec![label.clone()],
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct PartySwing {
    pub name: String,
    pub votes_before: u64,
    pub votes_after: u64,
    pub share_before: f64,
    pub share_after: f64,
    pub swing: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ReconciledBoothComparison {
    pub booth_key: BoothKey,
    pub total_before: u64,
    pub total_after: u64,
    /// One entry per declared alias, in declaration order.
    pub parties: Vec<PartySwing>,
    pub turnout_change_pct: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Reconciliation {
    pub booths: Vec<ReconciledBoothComparison>,
    /// Booth keys only present before.
    pub unmatched_before: usize,
    /// Booth keys only present after.
    pub unmatched_after: usize,
    /// Joined booths dropped because one of the periods has no votes.
    pub zero_total_excluded: usize,
    /// Mean swing per alias, over the retained booths. Empty when no booth is retained.
    pub mean_swing: Vec<(String, f64)>,
    pub mean_turnout_change: Option<f64>,
}

impl Reconciliation {
    pub fn excluded(&self) -> usize {
        self.unmatched_before + self.unmatched_after + self.zero_total_excluded
    }
}

/// Errors that break the contract of the library.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyErrors {
    /// Pages must be fed in increasing order.
    PageOutOfOrder { previous: u32, page: u32 },
}

impl Error for TallyErrors {}

impl Display for TallyErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyErrors::PageOutOfOrder { previous, page } => write!(
                f,
                "page {} was given after page {}: pages must be processed in order",
                page, previous
            ),
        }
    }
}
