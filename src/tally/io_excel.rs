// Page tables stored in an Excel workbook, one worksheet per page in page order.

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::tally::*;

fn read_cell(cell: &DataType) -> Option<String> {
    match cell {
        DataType::Empty => None,
        DataType::String(s) if s.trim().is_empty() => None,
        DataType::String(s) => Some(s.clone()),
        DataType::Int(i) => Some(i.to_string()),
        DataType::Float(f) => Some(float_text(*f)),
        x => Some(x.to_string()),
    }
}

fn range_rows(range: &calamine::Range<DataType>) -> Vec<Vec<Option<String>>> {
    // The range starts at its first non-empty cell; the offset is restored so
    // that header row indexes keep their meaning.
    let (row_offset, col_offset) = match range.start() {
        Some((r, c)) => (r as usize, c as usize),
        None => return Vec::new(),
    };
    let mut res: Vec<Vec<Option<String>>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells: Vec<Option<String>> = vec![None; col_offset];
        cells.extend(row.iter().map(read_cell));
        res.push(cells);
    }
    res
}

pub fn read_excel_pages(path: &str) -> TallyResult<Vec<PageExtract>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let names: Vec<String> = workbook.sheet_names().to_owned();
    let mut pages: Vec<PageExtract> = Vec::new();
    for (idx, name) in names.iter().enumerate() {
        let number = (idx + 1) as u32;
        let range = match workbook.worksheet_range(name) {
            Some(r) => r.context(ReadingWorksheetSnafu {
                path,
                name: name.clone(),
            })?,
            None => {
                warn!("read_excel_pages: {}: worksheet {} vanished", path, name);
                pages.push(PageExtract::empty(number));
                continue;
            }
        };
        let rows = range_rows(&range);
        debug!(
            "read_excel_pages: {}: sheet {:?} -> page {} with {} rows",
            path,
            name,
            number,
            rows.len()
        );
        if rows.is_empty() {
            pages.push(PageExtract::empty(number));
        } else {
            pages.push(PageExtract::table(number, rows));
        }
    }
    Ok(pages)
}
