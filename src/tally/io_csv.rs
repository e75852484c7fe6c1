// Page tables flattened into a single CSV file.
//
// Every line starts with the page number; the other fields are the cells of
// one table row, empty fields being empty cells. A line holding only the page
// number stands for a page without table. A line starting with "title" carries
// the title text of a page: title,<page>,<text>.

use std::fs::File;

use crate::tally::*;

fn get_records(path: &str) -> TallyResult<csv::StringRecordsIntoIter<File>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    Ok(rdr.into_records())
}

fn page_mut(pages: &mut Vec<PageExtract>, number: u32) -> &mut PageExtract {
    let is_current = pages.last().map(|p| p.number == number).unwrap_or(false);
    if !is_current {
        pages.push(PageExtract::empty(number));
    }
    let last = pages.len() - 1;
    &mut pages[last]
}

pub fn read_csv_pages(path: &str) -> TallyResult<Vec<PageExtract>> {
    let mut pages: Vec<PageExtract> = Vec::new();
    for (idx, line_r) in get_records(path)?.enumerate() {
        let lineno = idx + 1;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        let first = line.get(0).unwrap_or("").trim();
        if first.is_empty() && line.len() <= 1 {
            continue;
        }
        if first.eq_ignore_ascii_case("title") {
            let number = parse_page_number(line.get(1).unwrap_or(""), path, lineno)?;
            let text: Vec<&str> = line.iter().skip(2).collect();
            page_mut(&mut pages, number).title = Some(text.join(","));
            continue;
        }
        let number = parse_page_number(first, path, lineno)?;
        let page = page_mut(&mut pages, number);
        if line.len() <= 1 {
            debug!("read_csv_pages: line {}: page {} has no table", lineno, number);
            continue;
        }
        let cells: Vec<Option<String>> = line
            .iter()
            .skip(1)
            .map(|s| {
                if s.trim().is_empty() {
                    None
                } else {
                    Some(s.to_string())
                }
            })
            .collect();
        page.table.get_or_insert_with(Vec::new).push(cells);
    }
    debug!("read_csv_pages: {}: {} pages", path, pages.len());
    Ok(pages)
}

fn parse_page_number(field: &str, path: &str, lineno: usize) -> TallyResult<u32> {
    match field.trim().parse::<u32>() {
        Ok(n) => Ok(n),
        Err(_) => CsvContentSnafu {
            path,
            lineno,
            message: format!("expected a page number, found {:?}", field),
        }
        .fail(),
    }
}
