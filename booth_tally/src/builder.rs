use log::{debug, info, warn};

use crate::booths::BoothRecordBuilder;
use crate::classify::{classify_row, RowPosition};
use crate::columns::{resolve_columns, unknown_layout};
pub use crate::config::*;

/// Consumes the pages of one document, in order.
///
/// The column layout is resolved from the header rows of the first page that
/// carries a table and stays fixed for the rest of the document.
///
/// ```
/// pub use booth_tally::builder::DocumentBuilder;
/// pub use booth_tally::{DocumentConfig, PageExtract, PartyLabel};
/// # use booth_tally::TallyErrors;
///
/// fn cells(v: &[&str]) -> Vec<Option<String>> {
///     v.iter().map(|s| Some(s.to_string())).collect()
/// }
///
/// let mut builder = DocumentBuilder::new(&DocumentConfig::default());
/// builder.add_page(&PageExtract::table(
///     1,
///     vec![
///         cells(&["Sl", "PS", "", "", ""]),
///         cells(&["", "", "Anbu", "Bala", ""]),
///         cells(&["", "", "Dravida Munnetra Kazhagam", "Naam Tamilar Katchi", ""]),
///         cells(&["1", "12", "100", "80", "180"]),
///         cells(&["2", "12 (M)", "10", "5", "15"]),
///     ],
/// ))?;
/// let extract = builder.finish();
/// assert_eq!(extract.booths.len(), 1);
/// assert_eq!(extract.booths[0].votes_for(&PartyLabel::party("DMK")), 110);
///
/// # Ok::<(), TallyErrors>(())
/// ```
pub struct DocumentBuilder {
    config: DocumentConfig,
    booths: Option<BoothRecordBuilder>,
    stats: ExtractionStats,
    warnings: Vec<DocumentWarning>,
    last_page: Option<u32>,
    title: Option<String>,
}

impl DocumentBuilder {
    pub fn new(config: &DocumentConfig) -> DocumentBuilder {
        DocumentBuilder {
            config: config.clone(),
            booths: None,
            stats: ExtractionStats::default(),
            warnings: Vec::new(),
            last_page: None,
            title: None,
        }
    }

    /// The resolved layout, once the first table page has been seen.
    pub fn layout(&self) -> Option<&ColumnLayout> {
        self.booths.as_ref().map(|b| b.layout())
    }

    pub fn add_page(&mut self, page: &PageExtract) -> Result<(), TallyErrors> {
        if let Some(previous) = self.last_page {
            if page.number <= previous {
                return Err(TallyErrors::PageOutOfOrder {
                    previous,
                    page: page.number,
                });
            }
        }
        self.last_page = Some(page.number);
        self.stats.pages += 1;

        let rows: Vec<RawTableRow> = match &page.table {
            Some(t) if !t.is_empty() => t
                .iter()
                .enumerate()
                .map(|(idx, cells)| RawTableRow::new(page.number, idx, cells.clone()))
                .collect(),
            _ => {
                debug!("add_page: page {}: no table", page.number);
                self.stats.empty_pages += 1;
                if self.booths.is_none() && self.title.is_none() {
                    self.title = page.title.clone();
                }
                return Ok(());
            }
        };

        let first_page = self.booths.is_none();
        if first_page {
            if self.title.is_none() {
                self.title = page.title.clone();
            }
            self.resolve_layout(page.number, &rows);
        }

        let mut booths = match self.booths.take() {
            Some(b) => b,
            None => return Ok(()),
        };
        for row in rows.iter() {
            self.stats.rows += 1;
            let position = RowPosition {
                first_page,
                row_index: row.index,
            };
            match classify_row(row, position, self.config.header_rows) {
                RowKind::Header => self.stats.header_rows += 1,
                RowKind::Total => self.stats.total_rows += 1,
                RowKind::Noise => self.stats.noise_rows += 1,
                RowKind::Data => {
                    self.stats.data_rows += 1;
                    booths.add_row(row);
                }
            }
        }
        self.booths = Some(booths);
        Ok(())
    }

    fn resolve_layout(&mut self, page: u32, rows: &[RawTableRow]) {
        let (cand_idx, party_idx) = self.config.header_rows;
        let res = match (rows.get(cand_idx), rows.get(party_idx)) {
            (Some(c), Some(p)) => resolve_columns(c, p, &self.config),
            _ => {
                let width = rows.iter().map(|r| r.width()).max().unwrap_or(0);
                warn!(
                    "add_page: page {}: only {} rows, the header rows are missing",
                    page,
                    rows.len()
                );
                crate::columns::ColumnResolution {
                    layout: unknown_layout(width),
                    warnings: vec![DocumentWarning::HeaderUnparseable { page }],
                }
            }
        };
        self.warnings.extend(res.warnings);
        self.booths = Some(BoothRecordBuilder::new(&res.layout));
    }

    /// Closes the document. Booth records are ordered by ascending key.
    pub fn finish(self) -> DocumentExtract {
        let mut stats = self.stats;
        let mut warnings = self.warnings;
        let (layout, booths) = match self.booths {
            Some(b) => {
                stats.keyless_rows = b.keyless_rows();
                stats.merged_rows = b.merged_rows();
                let layout = b.layout().clone();
                let (booths, mismatches) = b.finish();
                stats.total_mismatches = mismatches;
                (layout, booths)
            }
            None => {
                warn!("finish: none of the {} pages had a table", stats.pages);
                warnings.push(DocumentWarning::NoTable);
                (ColumnLayout::default(), Vec::new())
            }
        };
        info!(
            "finish: {} booths from {} data rows ({} merged, {} without booth number), {} noise rows dropped, {} total mismatches",
            booths.len(),
            stats.data_rows,
            stats.merged_rows,
            stats.keyless_rows,
            stats.noise_rows,
            stats.total_mismatches
        );
        DocumentExtract {
            layout,
            booths,
            stats,
            warnings,
            title: self.title,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn cells(v: &[&str]) -> Vec<Option<String>> {
        v.iter().map(|s| Some(s.to_string())).collect()
    }

    fn first_page() -> PageExtract {
        PageExtract {
            number: 1,
            table: Some(vec![
                cells(&["Table No", "Polling Station No", "", "", "", ""]),
                cells(&["", "", "Anbu", "Bala", "Chitra", "Total"]),
                cells(&[
                    "",
                    "",
                    "ARTENNUM MAGAHZAK AD",
                    "All India Anna Dravida Munnetra Kazhagam",
                    "Independent",
                    "",
                ]),
                cells(&["1", "2", "3", "4", "5", "6"]),
                cells(&["1", "12", "100", "80", "7", "187"]),
                cells(&["2", "13", "20", "30", "0", "50"]),
            ]),
            title: Some("FORM 20 036- Uthiramerur".to_string()),
        }
    }

    fn second_page() -> PageExtract {
        PageExtract::table(
            2,
            vec![
                cells(&["3", "12 (M)", "10", "5", "", "15"]),
                cells(&["", "Total", "130", "115", "7", "252"]),
                cells(&["", "", "", "", "", ""]),
                cells(&["4", "Auxiliary", "1", "1", "1", "3"]),
            ],
        )
    }

    #[test]
    fn split_booth_is_aggregated_across_pages() {
        init();
        let mut b = DocumentBuilder::new(&DocumentConfig::default());
        b.add_page(&first_page()).unwrap();
        assert_eq!(
            b.add_page(&first_page()),
            Err(TallyErrors::PageOutOfOrder {
                previous: 1,
                page: 1
            })
        );
        b.add_page(&second_page()).unwrap();
        b.add_page(&PageExtract::empty(3)).unwrap();
        let extract = b.finish();
        assert!(extract.warnings.is_empty());
        assert_eq!(extract.title.as_deref(), Some("FORM 20 036- Uthiramerur"));
        assert_eq!(extract.booths.len(), 2);
        let b12 = &extract.booths[0];
        assert_eq!(b12.votes_for(&PartyLabel::party("DMK")), 110);
        assert_eq!(b12.votes_for(&PartyLabel::party("AIADMK")), 85);
        assert_eq!(b12.total_valid_votes, 202);
        assert_eq!(extract.stats.pages, 3);
        assert_eq!(extract.stats.empty_pages, 1);
        assert_eq!(extract.stats.header_rows, 2);
        assert_eq!(extract.stats.data_rows, 4);
        assert_eq!(extract.stats.total_rows, 1);
        // Title row, column numbering and the blank spacer.
        assert_eq!(extract.stats.noise_rows, 3);
        assert_eq!(extract.stats.keyless_rows, 1);
        assert_eq!(extract.stats.merged_rows, 1);
        assert_eq!(extract.stats.total_mismatches, 0);
    }

    #[test]
    fn empty_pages_before_the_first_table() {
        let mut b = DocumentBuilder::new(&DocumentConfig::default());
        b.add_page(&PageExtract {
            number: 1,
            table: None,
            title: Some("035- Madurantakam (SC)".to_string()),
        })
        .unwrap();
        let mut page = first_page();
        page.number = 2;
        page.title = None;
        b.add_page(&page).unwrap();
        assert_eq!(b.layout().map(|l| l.identities.len()), Some(3));
        let extract = b.finish();
        assert_eq!(extract.booths.len(), 2);
        assert_eq!(extract.title.as_deref(), Some("035- Madurantakam (SC)"));
    }

    #[test]
    fn no_table_at_all() {
        let mut b = DocumentBuilder::new(&DocumentConfig::default());
        b.add_page(&PageExtract::empty(1)).unwrap();
        b.add_page(&PageExtract::table(2, Vec::new())).unwrap();
        let extract = b.finish();
        assert!(extract.booths.is_empty());
        assert_eq!(extract.warnings, vec![DocumentWarning::NoTable]);
        assert_eq!(extract.stats.empty_pages, 2);
    }

    #[test]
    fn missing_header_rows_still_extract() {
        let mut b = DocumentBuilder::new(&DocumentConfig::default());
        b.add_page(&PageExtract::table(1, vec![cells(&["1", "4", "10", "20"])]))
            .unwrap();
        b.add_page(&PageExtract::table(2, vec![cells(&["2", "5", "1", "2"])]))
            .unwrap();
        let extract = b.finish();
        assert_eq!(
            extract.warnings,
            vec![DocumentWarning::HeaderUnparseable { page: 1 }]
        );
        assert_eq!(extract.layout.identities.len(), 2);
        assert_eq!(extract.booths.len(), 2);
        assert_eq!(extract.booths[0].votes_for(&PartyLabel::Unknown), 30);
    }

    #[test]
    fn layouts_do_not_leak_between_documents() {
        let config = DocumentConfig::default();
        let mut a = DocumentBuilder::new(&config);
        a.add_page(&first_page()).unwrap();
        let mut b = DocumentBuilder::new(&config);
        b.add_page(&PageExtract::table(
            1,
            vec![
                cells(&["", "", "", ""]),
                cells(&["", "", "X", "Y"]),
                cells(&["", "", "Naam Tamilar Katchi", "Dravida Munnetra Kazhagam"]),
                cells(&["1", "7", "9", "11"]),
            ],
        ))
        .unwrap();
        let la = a.finish().layout;
        let lb = b.finish().layout;
        assert_eq!(la.identities.len(), 3);
        assert_eq!(lb.identities[0].party, PartyLabel::party("NTK"));
        assert_eq!(lb.identities[1].party, PartyLabel::party("DMK"));
    }
}
