use lazy_static::lazy_static;
use regex::Regex;

use std::collections::BTreeMap;

use crate::booths::party_totals;
use crate::competitiveness::{summarize_tiers, TierSummary};
use crate::config::*;

lazy_static! {
    // "036- Uthiramerur", "036 - Uthiramerur (SC)"
    static ref CONSTITUENCY_TITLE: Regex =
        Regex::new(r"(\d{3})\s*-\s*([A-Za-z][A-Za-z \t().]*)").unwrap();
}

/// The constituency number and name announced in a page title.
pub fn parse_constituency_title(title: &str) -> Option<(String, String)> {
    let caps = CONSTITUENCY_TITLE.captures(title)?;
    let number = caps.get(1)?.as_str().to_string();
    let name = caps
        .get(2)?
        .as_str()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ");
    if name.is_empty() {
        return None;
    }
    Some((number, name))
}

/// Whole-constituency figures derived from the booth records.
#[derive(PartialEq, Debug, Clone)]
pub struct ConstituencySummary {
    pub booths: usize,
    pub tiers: TierSummary,
    /// Largest first.
    pub party_totals: Vec<(PartyLabel, u64)>,
    pub total_valid_votes: u64,
    pub rejected_votes: u64,
    pub tendered_votes: u64,
    pub winner: Option<(PartyLabel, u64)>,
    pub runner_up: Option<(PartyLabel, u64)>,
    pub margin: Option<u64>,
}

impl ConstituencySummary {
    pub fn tier_count(&self, party: &PartyLabel, tier: Tier) -> u64 {
        self.tiers
            .tiers
            .get(party)
            .and_then(|t| t.get(&tier))
            .cloned()
            .unwrap_or(0)
    }
}

/// Builds the constituency summary. The winner and runner-up are taken over
/// the named parties only, like the booth classification without tracking.
pub fn summarize_constituency(
    booths: &[BoothRecord],
    results: &[Competitiveness],
) -> ConstituencySummary {
    let totals = party_totals(booths);
    let contenders: Vec<&(PartyLabel, u64)> = totals
        .iter()
        .filter(|(p, v)| !p.is_pseudo() && *v > 0)
        .collect();
    let winner = contenders.first().map(|x| (*x).clone());
    let runner_up = contenders.get(1).map(|x| (*x).clone());
    let margin = match (&winner, &runner_up) {
        (Some(w), Some(r)) => Some(w.1 - r.1),
        (Some(w), None) => Some(w.1),
        _ => None,
    };
    let sum = |f: fn(&BoothRecord) -> u64| booths.iter().map(f).sum::<u64>();
    ConstituencySummary {
        booths: booths.len(),
        tiers: summarize_tiers(results),
        party_totals: totals,
        total_valid_votes: sum(|b| b.total_valid_votes),
        rejected_votes: sum(|b| b.rejected_votes),
        tendered_votes: sum(|b| b.tendered_votes),
        winner,
        runner_up,
        margin,
    }
}

/// Share of each party in the constituency total, in percent.
pub fn vote_shares(summary: &ConstituencySummary) -> BTreeMap<PartyLabel, f64> {
    summary
        .party_totals
        .iter()
        .map(|(p, v)| {
            let share = if summary.total_valid_votes == 0 {
                0.0
            } else {
                crate::reconcile::round2(*v as f64 / summary.total_valid_votes as f64 * 100.0)
            };
            (p.clone(), share)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::competitiveness::classify_booths;

    fn booth(key: u32, votes: &[(&str, u64)]) -> BoothRecord {
        let party_votes: BTreeMap<PartyLabel, u64> = votes
            .iter()
            .map(|(p, v)| (PartyLabel::from_name(p), *v))
            .collect();
        BoothRecord {
            booth_key: BoothKey(key),
            table_no: key,
            station_labels: vec![key.to_string()],
            candidate_votes: votes.iter().map(|(_, v)| *v).collect(),
            total_valid_votes: party_votes.values().sum(),
            party_votes,
            source_total_valid: None,
            rejected_votes: 1,
            tendered_votes: 0,
            row_count: 1,
        }
    }

    #[test]
    fn title_parsing() {
        assert_eq!(
            parse_constituency_title("FORM 20 Assembly Constituency 036- Uthiramerur"),
            Some(("036".to_string(), "Uthiramerur".to_string()))
        );
        assert_eq!(
            parse_constituency_title("Name of AC: 029 - Sriperumbudur (SC)\nTotal"),
            Some(("029".to_string(), "Sriperumbudur (SC)".to_string()))
        );
        assert_eq!(parse_constituency_title("FINAL RESULT SHEET"), None);
    }

    #[test]
    fn constituency_winner() {
        let booths = vec![
            booth(1, &[("DMK", 100), ("AIADMK", 80), ("Unknown", 900)]),
            booth(2, &[("DMK", 40), ("AIADMK", 90)]),
            booth(3, &[("DMK", 60), ("AIADMK", 10)]),
        ];
        let results = classify_booths(&booths, None);
        let s = summarize_constituency(&booths, &results);
        assert_eq!(s.booths, 3);
        assert_eq!(s.winner, Some((PartyLabel::party("DMK"), 200)));
        assert_eq!(s.runner_up, Some((PartyLabel::party("AIADMK"), 180)));
        assert_eq!(s.margin, Some(20));
        assert_eq!(s.rejected_votes, 3);
        assert_eq!(s.tier_count(&PartyLabel::party("DMK"), Tier::Strong), 2);
        assert_eq!(s.tier_count(&PartyLabel::party("AIADMK"), Tier::Strong), 1);
        assert_eq!(s.tier_count(&PartyLabel::party("AIADMK"), Tier::Swing), 0);
        let shares = vote_shares(&s);
        assert_eq!(shares[&PartyLabel::Unknown], 70.31);
    }
}
