use log::debug;

use crate::config::*;

/// Where a row sits in the document, as far as the classifier cares.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct RowPosition {
    pub first_page: bool,
    pub row_index: usize,
}

/// Decides what a raw row is.
///
/// Precedence: header position, then the "Total" token, then the column
/// numbering artifact, then the numeric serial number. Anything else is noise.
pub fn classify_row(row: &RawTableRow, position: RowPosition, header_rows: (usize, usize)) -> RowKind {
    if position.first_page
        && (position.row_index == header_rows.0 || position.row_index == header_rows.1)
    {
        return RowKind::Header;
    }
    if has_total_token(row) {
        return RowKind::Total;
    }
    if is_column_numbering(row) {
        debug!(
            "classify_row: page {} row {}: column numbering artifact",
            row.page, row.index
        );
        return RowKind::Noise;
    }
    if parse_serial(row.cell(0)).is_some() {
        return RowKind::Data;
    }
    RowKind::Noise
}

/// The first cell of a data row: a non-negative integer once trimmed.
pub fn parse_serial(cell: &str) -> Option<u32> {
    let s = cell.trim();
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse::<u32>().ok()
}

fn has_total_token(row: &RawTableRow) -> bool {
    row.cells.iter().filter_map(|c| c.as_deref()).any(|s| {
        s.split(|c: char| !c.is_alphanumeric())
            .any(|tok| tok.eq_ignore_ascii_case("total"))
    })
}

// Some exports repeat the column numbers "1 2 3 4 ..." as a row of their own.
fn is_column_numbering(row: &RawTableRow) -> bool {
    let text = row.joined_text();
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 4 {
        return false;
    }
    tokens
        .iter()
        .enumerate()
        .all(|(idx, tok)| tok.parse::<usize>().ok() == Some(idx + 1))
}
