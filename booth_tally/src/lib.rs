mod config;
use log::info;

pub mod booths;
pub mod builder;
pub mod classify;
pub mod columns;
pub mod competitiveness;
pub mod geocode;
pub mod manual;
pub mod parties;
pub mod reconcile;
pub mod summary;

pub use crate::booths::{extract_booth_key, party_totals};
pub use crate::competitiveness::{classify_booth, classify_booths, tier_for_margin};
pub use crate::config::*;
pub use crate::parties::{party_table_fingerprint, PARTY_TABLE_VERSION};
pub use crate::reconcile::{default_aliases, reconcile};
pub use crate::summary::{parse_constituency_title, summarize_constituency, ConstituencySummary};

/// Runs the extraction over all the pages of one document.
///
/// Arguments:
/// * `pages` the page extracts, in page order
/// * `config` the settings of this document. Nothing is shared with other documents.
pub fn extract_document(
    pages: &[PageExtract],
    config: &DocumentConfig,
) -> Result<DocumentExtract, TallyErrors> {
    info!(
        "Processing {:?} pages, tracked parties: {:?}, header rows: {:?}",
        pages.len(),
        config.tracked_parties,
        config.header_rows
    );
    let mut builder = builder::DocumentBuilder::new(config);
    for page in pages.iter() {
        builder.add_page(page)?;
    }
    let extract = builder.finish();
    for w in extract.warnings.iter() {
        info!("Document warning: {}", w);
    }
    Ok(extract)
}

/// Classifies every booth of a document with the tracked parties of its configuration.
pub fn classify_document(extract: &DocumentExtract, config: &DocumentConfig) -> Vec<Competitiveness> {
    classify_booths(&extract.booths, config.tracked_parties.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(v: &[&str]) -> Vec<Option<String>> {
        v.iter().map(|s| Some(s.to_string())).collect()
    }

    #[test]
    fn annotated_station_merges_into_one_strong_booth() {
        let pages = vec![PageExtract::table(
            1,
            vec![
                cells(&["", "", "", "", ""]),
                cells(&["", "", "Anbu", "Bala", ""]),
                cells(&[
                    "",
                    "",
                    "Dravida Munnetra Kazhagam",
                    "All India Anna Dravida Munnetra Kazhagam",
                    "",
                ]),
                cells(&["1", "12", "100", "80", "180"]),
                cells(&["2", "12 (M)", "10", "5", "15"]),
            ],
        )];
        let config = DocumentConfig {
            tracked_parties: Some(vec![PartyLabel::party("DMK"), PartyLabel::party("AIADMK")]),
            ..DocumentConfig::default()
        };
        let extract = extract_document(&pages, &config).unwrap();
        assert_eq!(extract.booths.len(), 1);
        let booth = &extract.booths[0];
        assert_eq!(booth.booth_key, BoothKey(12));
        assert_eq!(booth.votes_for(&PartyLabel::party("DMK")), 110);
        assert_eq!(booth.votes_for(&PartyLabel::party("AIADMK")), 85);

        let results = classify_document(&extract, &config);
        let r = results[0].result().cloned().unwrap();
        assert_eq!(r.margin, 25);
        assert!((r.margin_pct - 12.82).abs() < 0.01);
        assert_eq!(r.tier, Tier::Strong);
    }

    #[test]
    fn out_of_order_pages_are_rejected() {
        let pages = vec![PageExtract::empty(2), PageExtract::empty(1)];
        assert_eq!(
            extract_document(&pages, &DocumentConfig::default()),
            Err(TallyErrors::PageOutOfOrder {
                previous: 2,
                page: 1
            })
        );
    }
}
