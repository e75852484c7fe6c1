use log::debug;

use std::collections::BTreeMap;

use crate::config::*;

/// Tier of a two-party margin. Boundaries go to the less extreme tier:
/// 5.0 is LEAN and 10.0 is STRONG.
pub fn tier_for_margin(margin_pct: f64) -> Tier {
    if margin_pct < SWING_THRESHOLD_PCT {
        Tier::Swing
    } else if margin_pct < LEAN_THRESHOLD_PCT {
        Tier::Lean
    } else {
        Tier::Strong
    }
}

/// The margin as a percentage of the two-party total, 0 when nobody voted.
pub fn two_party_margin_pct(winner_votes: u64, runner_up_votes: u64) -> f64 {
    let denom = winner_votes + runner_up_votes;
    if denom == 0 {
        return 0.0;
    }
    (winner_votes.saturating_sub(runner_up_votes)) as f64 / denom as f64 * 100.0
}

/// The parties competing in a booth, in tie-breaking order.
fn contenders(booth: &BoothRecord, tracked: Option<&[PartyLabel]>) -> Vec<PartyLabel> {
    match tracked {
        Some(parties) => {
            let mut res: Vec<PartyLabel> = Vec::new();
            for p in parties.iter() {
                if !res.contains(p) {
                    res.push(p.clone());
                }
            }
            res
        }
        None => booth
            .party_votes
            .keys()
            .filter(|p| !p.is_pseudo())
            .cloned()
            .collect(),
    }
}

/// Classifies one booth.
///
/// With `tracked` set, only those parties are ranked and ties go to the one
/// listed first. Without it, every party label except `Other` and `Unknown`
/// is ranked and ties go by label order.
pub fn classify_booth(booth: &BoothRecord, tracked: Option<&[PartyLabel]>) -> Competitiveness {
    let mut ranked: Vec<(PartyLabel, u64)> = contenders(booth, tracked)
        .into_iter()
        .map(|p| {
            let v = booth.votes_for(&p);
            (p, v)
        })
        .filter(|(_, v)| *v > 0)
        .collect();
    if ranked.len() < 2 {
        debug!(
            "classify_booth: booth {}: only {} tracked parties with votes",
            booth.booth_key,
            ranked.len()
        );
        return Competitiveness::InsufficientData {
            booth_key: booth.booth_key,
            parties_with_votes: ranked.len(),
        };
    }
    // Stable sort: equal counts keep the contender order.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let (winner_party, winner_votes) = ranked[0].clone();
    let (runner_up_party, runner_up_votes) = ranked[1].clone();
    let margin_pct = two_party_margin_pct(winner_votes, runner_up_votes);
    Competitiveness::Classified(CompetitivenessResult {
        booth_key: booth.booth_key,
        winner_party,
        winner_votes,
        runner_up_party,
        runner_up_votes,
        margin: winner_votes - runner_up_votes,
        margin_pct,
        tier: tier_for_margin(margin_pct),
    })
}

pub fn classify_booths(
    booths: &[BoothRecord],
    tracked: Option<&[PartyLabel]>,
) -> Vec<Competitiveness> {
    booths.iter().map(|b| classify_booth(b, tracked)).collect()
}

/// Booths won and tier counts, per winning party.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct TierSummary {
    pub booths_won: BTreeMap<PartyLabel, u64>,
    pub tiers: BTreeMap<PartyLabel, BTreeMap<Tier, u64>>,
    pub insufficient_data: u64,
}

pub fn summarize_tiers(results: &[Competitiveness]) -> TierSummary {
    let mut res = TierSummary::default();
    for c in results.iter() {
        match c {
            Competitiveness::Classified(r) => {
                *res.booths_won.entry(r.winner_party.clone()).or_insert(0) += 1;
                *res
                    .tiers
                    .entry(r.winner_party.clone())
                    .or_default()
                    .entry(r.tier)
                    .or_insert(0) += 1;
            }
            Competitiveness::InsufficientData { .. } => res.insufficient_data += 1,
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booth(key: u32, votes: &[(PartyLabel, u64)]) -> BoothRecord {
        let party_votes: BTreeMap<PartyLabel, u64> = votes.iter().cloned().collect();
        let total = party_votes.values().sum();
        BoothRecord {
            booth_key: BoothKey(key),
            table_no: key,
            station_labels: vec![key.to_string()],
            candidate_votes: votes.iter().map(|(_, v)| *v).collect(),
            party_votes,
            total_valid_votes: total,
            source_total_valid: None,
            rejected_votes: 0,
            tendered_votes: 0,
            row_count: 1,
        }
    }

    fn dmk() -> PartyLabel {
        PartyLabel::party("DMK")
    }

    fn aiadmk() -> PartyLabel {
        PartyLabel::party("AIADMK")
    }

    #[test]
    fn boundaries_go_to_the_lower_margin_tier() {
        assert_eq!(tier_for_margin(4.999), Tier::Swing);
        assert_eq!(tier_for_margin(5.0), Tier::Lean);
        assert_eq!(tier_for_margin(9.999), Tier::Lean);
        assert_eq!(tier_for_margin(10.0), Tier::Strong);
        assert_eq!(tier_for_margin(0.0), Tier::Swing);
        assert_eq!(tier_for_margin(100.0), Tier::Strong);
    }

    #[test]
    fn exact_boundaries_from_votes() {
        // 105 vs 95: 10 / 200 = 5%.
        let b = booth(1, &[(dmk(), 105), (aiadmk(), 95)]);
        let r = classify_booth(&b, None);
        assert_eq!(r.result().map(|r| r.tier), Some(Tier::Lean));
        // 110 vs 90: 20 / 200 = 10%.
        let b = booth(2, &[(dmk(), 90), (aiadmk(), 110)]);
        let r = classify_booth(&b, None);
        assert_eq!(r.result().map(|r| r.tier), Some(Tier::Strong));
        assert_eq!(r.result().map(|r| r.winner_party.clone()), Some(aiadmk()));
    }

    #[test]
    fn denominator_is_the_two_party_total() {
        let b = booth(
            12,
            &[(dmk(), 110), (aiadmk(), 85), (PartyLabel::party("NTK"), 400)],
        );
        let tracked = vec![dmk(), aiadmk()];
        let r = classify_booth(&b, Some(&tracked));
        let res = r.result().cloned().unwrap();
        assert_eq!(res.winner_party, dmk());
        assert_eq!(res.margin, 25);
        assert!((res.margin_pct - 12.820512820512821).abs() < 1e-9);
        assert_eq!(res.tier, Tier::Strong);
    }

    #[test]
    fn single_party_is_insufficient() {
        let b = booth(3, &[(dmk(), 50), (aiadmk(), 0), (PartyLabel::Other, 20)]);
        assert_eq!(
            classify_booth(&b, None),
            Competitiveness::InsufficientData {
                booth_key: BoothKey(3),
                parties_with_votes: 1
            }
        );
        let empty = booth(4, &[]);
        assert!(classify_booth(&empty, None).result().is_none());
    }

    #[test]
    fn pseudo_labels_are_not_ranked_by_default() {
        let b = booth(
            5,
            &[(dmk(), 30), (PartyLabel::Unknown, 500), (PartyLabel::Independent, 20)],
        );
        let res = classify_booth(&b, None).result().cloned().unwrap();
        assert_eq!(res.winner_party, dmk());
        assert_eq!(res.runner_up_party, PartyLabel::Independent);
    }

    #[test]
    fn ties_follow_tracked_order() {
        let b = booth(6, &[(dmk(), 40), (aiadmk(), 40)]);
        let tracked = vec![aiadmk(), dmk()];
        let res = classify_booth(&b, Some(&tracked)).result().cloned().unwrap();
        assert_eq!(res.winner_party, aiadmk());
        assert_eq!(res.margin_pct, 0.0);
        assert_eq!(res.tier, Tier::Swing);
    }

    #[test]
    fn tier_summary() {
        let booths = vec![
            booth(1, &[(dmk(), 100), (aiadmk(), 98)]),
            booth(2, &[(dmk(), 100), (aiadmk(), 50)]),
            booth(3, &[(aiadmk(), 70), (dmk(), 60)]),
            booth(4, &[(aiadmk(), 70)]),
        ];
        let s = summarize_tiers(&classify_booths(&booths, None));
        assert_eq!(s.booths_won.get(&dmk()), Some(&2));
        assert_eq!(s.booths_won.get(&aiadmk()), Some(&1));
        assert_eq!(s.tiers[&dmk()].get(&Tier::Swing), Some(&1));
        assert_eq!(s.tiers[&dmk()].get(&Tier::Strong), Some(&1));
        assert_eq!(s.tiers[&aiadmk()].get(&Tier::Lean), Some(&1));
        assert_eq!(s.insufficient_data, 1);
    }
}
