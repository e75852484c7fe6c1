use log::{debug, info, warn};

use crate::config::*;
use crate::parties::{is_independent, lookup_party};

/// Table number and polling station number come first in every row.
pub const FIXED_COLUMNS: usize = 2;
/// At most this many trailing columns carry booth totals instead of candidates.
pub const MAX_SUMMARY_COLUMNS: usize = 4;

const SUMMARY_LABELS: [&str; 6] = [
    "valid votes",
    "rejected votes",
    "net votes",
    "tendered votes",
    "total votes",
    "total",
];

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnResolution {
    pub layout: ColumnLayout,
    pub warnings: Vec<DocumentWarning>,
}

/// Lower case, newlines folded into spaces, whitespace collapsed.
pub fn header_fragment(cell: &str) -> String {
    cell.split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

/// Decodes the party of a header fragment (already normalized).
pub fn decode_party(fragment: &str) -> PartyLabel {
    if fragment.is_empty() {
        return PartyLabel::Unknown;
    }
    if let Some(entry) = lookup_party(fragment) {
        return PartyLabel::party(entry.label);
    }
    if is_independent(fragment) {
        return PartyLabel::Independent;
    }
    PartyLabel::Other
}

/// Builds the column layout of a document from its two header rows.
///
/// Candidate columns start after the fixed columns. The trailing run of
/// columns with a blank (or summary-label) party header is taken as the booth
/// totals, capped at `MAX_SUMMARY_COLUMNS`. A blank party header anywhere else
/// is an anonymous candidate.
pub fn resolve_columns(
    candidate_row: &RawTableRow,
    party_row: &RawTableRow,
    config: &DocumentConfig,
) -> ColumnResolution {
    let width = candidate_row.width().max(party_row.width());
    let names: Vec<String> = (0..width)
        .map(|idx| {
            candidate_row
                .cell(idx)
                .split_whitespace()
                .collect::<Vec<&str>>()
                .join(" ")
        })
        .collect();
    let fragments: Vec<String> = (0..width)
        .map(|idx| header_fragment(party_row.cell(idx)))
        .collect();

    let nothing_readable = (FIXED_COLUMNS..width)
        .all(|idx| names[idx].is_empty() && fragments[idx].is_empty());
    if nothing_readable {
        warn!(
            "resolve_columns: page {}: no readable header beyond the fixed columns",
            party_row.page
        );
        return ColumnResolution {
            layout: unknown_layout(width),
            warnings: vec![DocumentWarning::HeaderUnparseable {
                page: party_row.page,
            }],
        };
    }

    let mut num_summary = 0;
    while num_summary < MAX_SUMMARY_COLUMNS && width > FIXED_COLUMNS + num_summary {
        let idx = width - 1 - num_summary;
        if !is_summary_fragment(&fragments[idx]) {
            break;
        }
        num_summary += 1;
    }
    let first_summary = width - num_summary;

    let identities: Vec<ColumnIdentity> = (FIXED_COLUMNS..first_summary)
        .map(|idx| ColumnIdentity {
            column_index: idx,
            candidate_ordinal: (idx - FIXED_COLUMNS + 1) as u32,
            party: decode_party(&fragments[idx]),
            raw_label_text: party_row.cell(idx).trim().to_string(),
            candidate_name: names[idx].clone(),
        })
        .collect();

    for ci in identities.iter() {
        debug!(
            "resolve_columns: column {} candidate {} {:?} -> {}",
            ci.column_index, ci.candidate_ordinal, ci.raw_label_text, ci.party
        );
    }

    let summary_headers: Vec<(usize, String)> = (first_summary..width)
        .map(|idx| (idx, format!("{} {}", names[idx], fragments[idx]).to_lowercase()))
        .collect();
    let summary_columns = assign_summary_roles(&summary_headers);

    let mut warnings: Vec<DocumentWarning> = Vec::new();
    let has_major = identities
        .iter()
        .any(|ci| config.major_parties.contains(&ci.party));
    if !identities.is_empty() && !config.major_parties.is_empty() && !has_major {
        warn!(
            "resolve_columns: none of {:?} among {} candidate columns",
            config.major_parties,
            identities.len()
        );
        warnings.push(DocumentWarning::MajorPartiesMissing {
            expected: config.major_parties.clone(),
        });
    }

    info!(
        "resolve_columns: {} candidate columns, {} summary columns",
        identities.len(),
        summary_columns.len()
    );
    ColumnResolution {
        layout: ColumnLayout {
            identities,
            summary_columns,
        },
        warnings,
    }
}

/// Every column past the fixed ones is an anonymous candidate. Used when the
/// header of a document cannot be read.
pub fn unknown_layout(width: usize) -> ColumnLayout {
    ColumnLayout {
        identities: (FIXED_COLUMNS..width)
            .map(|idx| ColumnIdentity {
                column_index: idx,
                candidate_ordinal: (idx - FIXED_COLUMNS + 1) as u32,
                party: PartyLabel::Unknown,
                raw_label_text: String::new(),
                candidate_name: String::new(),
            })
            .collect(),
        summary_columns: Vec::new(),
    }
}

fn is_summary_fragment(fragment: &str) -> bool {
    let f = fragment.trim_matches(|c: char| !c.is_alphanumeric());
    f.is_empty() || SUMMARY_LABELS.contains(&f)
}

fn keyword_role(header: &str) -> Option<SummaryRole> {
    if header.contains("tender") {
        Some(SummaryRole::Tendered)
    } else if header.contains("reject") {
        Some(SummaryRole::Rejected)
    } else if header.contains("valid") {
        Some(SummaryRole::TotalValid)
    } else if header.contains("total") || header.contains("net") {
        Some(SummaryRole::Total)
    } else {
        None
    }
}

// Labelled columns take their role first, the others fill the remaining roles
// in canonical order.
fn assign_summary_roles(headers: &[(usize, String)]) -> Vec<SummaryColumn> {
    let mut assigned: Vec<Option<SummaryRole>> = vec![None; headers.len()];
    for (pos, (_, header)) in headers.iter().enumerate() {
        if let Some(role) = keyword_role(header) {
            if !assigned.contains(&Some(role)) {
                assigned[pos] = Some(role);
            }
        }
    }
    let mut remaining = SummaryRole::ALL
        .iter()
        .filter(|r| !assigned.contains(&Some(**r)))
        .cloned()
        .collect::<Vec<SummaryRole>>()
        .into_iter();
    headers
        .iter()
        .zip(assigned.iter())
        .filter_map(|((idx, _), role)| {
            role.or_else(|| remaining.next()).map(|role| SummaryColumn {
                column_index: *idx,
                role,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cells: &[&str], page: u32, index: usize) -> RawTableRow {
        RawTableRow::from_strs(page, index, cells)
    }

    fn parties(layout: &ColumnLayout) -> Vec<PartyLabel> {
        layout.identities.iter().map(|ci| ci.party.clone()).collect()
    }

    #[test]
    fn decodes_forward_and_trailing_totals() {
        let names = header(
            &[
                "Table No",
                "PS No",
                "Anbu",
                "Bala",
                "Chitra",
                "NOTA",
                "Total valid votes",
                "Rejected",
                "Total",
                "Tendered",
            ],
            1,
            1,
        );
        let party = header(
            &[
                "",
                "",
                "Dravida Munnetra\nKazhagam",
                "All India Anna Dravida Munnetra Kazhagam",
                "Independent",
                "None of the Above",
                "",
                "",
                "",
                "",
            ],
            1,
            2,
        );
        let res = resolve_columns(&names, &party, &DocumentConfig::default());
        assert!(res.warnings.is_empty());
        assert_eq!(
            parties(&res.layout),
            vec![
                PartyLabel::party("DMK"),
                PartyLabel::party("AIADMK"),
                PartyLabel::Independent,
                PartyLabel::party("NOTA"),
            ]
        );
        assert_eq!(res.layout.identities[0].candidate_ordinal, 1);
        assert_eq!(res.layout.identities[0].candidate_name, "Anbu");
        assert_eq!(res.layout.summary_column(SummaryRole::TotalValid), Some(6));
        assert_eq!(res.layout.summary_column(SummaryRole::Rejected), Some(7));
        assert_eq!(res.layout.summary_column(SummaryRole::Total), Some(8));
        assert_eq!(res.layout.summary_column(SummaryRole::Tendered), Some(9));
    }

    #[test]
    fn orientation_does_not_change_the_label() {
        let names = header(&["", "", "A", "B", "C", ""], 1, 1);
        let forward = header(
            &[
                "",
                "",
                "Indian National Congress",
                "Pattali Makkal Katchi",
                "Independent",
                "",
            ],
            1,
            2,
        );
        let mirrored = header(
            &[
                "",
                "",
                "ssergnoC lanoitaN naidnI",
                "ihctaK lakkaM ilattaP",
                "TNEDNEPEDNI",
                "",
            ],
            1,
            2,
        );
        let config = DocumentConfig::default();
        let a = resolve_columns(&names, &forward, &config);
        let b = resolve_columns(&names, &mirrored, &config);
        assert_eq!(parties(&a.layout), parties(&b.layout));
        assert_eq!(
            parties(&a.layout),
            vec![
                PartyLabel::party("INC"),
                PartyLabel::party("PMK"),
                PartyLabel::Independent
            ]
        );
    }

    #[test]
    fn orientation_is_decided_per_column() {
        let names = header(&["", "", "A", "B", ""], 1, 1);
        let mixed = header(
            &[
                "",
                "",
                "ARTENNUM MAGAHZAK AD",
                "All India Anna Dravida Munnetra Kazhagam",
                "",
            ],
            1,
            2,
        );
        let res = resolve_columns(&names, &mixed, &DocumentConfig::default());
        assert_eq!(
            parties(&res.layout),
            vec![PartyLabel::party("DMK"), PartyLabel::party("AIADMK")]
        );
    }

    #[test]
    fn blank_inner_column_is_unknown_candidate() {
        let names = header(&["", "", "A", "B", "C", "", ""], 1, 1);
        let party = header(
            &["", "", "Dravida Munnetra Kazhagam", "", "Some Front", "", ""],
            1,
            2,
        );
        let res = resolve_columns(&names, &party, &DocumentConfig::default());
        assert_eq!(
            parties(&res.layout),
            vec![
                PartyLabel::party("DMK"),
                PartyLabel::Unknown,
                PartyLabel::Other
            ]
        );
        assert_eq!(res.layout.summary_columns.len(), 2);
        // Unlabelled trailing columns fill the roles in canonical order.
        assert_eq!(res.layout.summary_column(SummaryRole::TotalValid), Some(5));
        assert_eq!(res.layout.summary_column(SummaryRole::Rejected), Some(6));
    }

    #[test]
    fn trailing_run_is_capped() {
        let names = header(&["", "", "A", "B", "", "", "", "", ""], 1, 1);
        let party = header(
            &["", "", "Dravida Munnetra Kazhagam", "", "", "", "", "", ""],
            1,
            2,
        );
        let res = resolve_columns(&names, &party, &DocumentConfig::default());
        assert_eq!(res.layout.summary_columns.len(), MAX_SUMMARY_COLUMNS);
        assert_eq!(
            parties(&res.layout),
            vec![
                PartyLabel::party("DMK"),
                PartyLabel::Unknown,
                PartyLabel::Unknown
            ]
        );
    }

    #[test]
    fn summary_labels_count_as_blank() {
        let names = header(&["", "", "A", "", ""], 1, 1);
        let party = header(
            &["", "", "Naam Tamilar Katchi", "Rejected Votes", "Tendered Votes"],
            1,
            2,
        );
        let res = resolve_columns(&names, &party, &DocumentConfig::default());
        assert_eq!(res.layout.identities.len(), 1);
        assert_eq!(res.layout.summary_column(SummaryRole::Rejected), Some(3));
        assert_eq!(res.layout.summary_column(SummaryRole::Tendered), Some(4));
    }

    #[test]
    fn missing_major_party_is_a_warning() {
        let names = header(&["", "", "A", "B", ""], 1, 1);
        let party = header(&["", "", "Naam Tamilar Katchi", "Independent", ""], 1, 2);
        let res = resolve_columns(&names, &party, &DocumentConfig::default());
        assert_eq!(res.layout.identities.len(), 2);
        assert_eq!(
            res.warnings,
            vec![DocumentWarning::MajorPartiesMissing {
                expected: vec![PartyLabel::party("DMK"), PartyLabel::party("AIADMK")]
            }]
        );
    }

    #[test]
    fn unreadable_header_gives_unknown_columns() {
        let names = header(&["", "", "", "", ""], 1, 1);
        let party = header(&["x", "y", "", "", ""], 1, 2);
        let res = resolve_columns(&names, &party, &DocumentConfig::default());
        assert_eq!(
            res.warnings,
            vec![DocumentWarning::HeaderUnparseable { page: 1 }]
        );
        assert_eq!(res.layout.identities.len(), 3);
        assert!(res.layout.summary_columns.is_empty());
        assert!(parties(&res.layout)
            .iter()
            .all(|p| *p == PartyLabel::Unknown));
    }
}
