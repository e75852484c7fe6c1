use log::{debug, info, warn};

use std::collections::BTreeMap;

use crate::config::*;

/// Rounds to 2 decimals, half away from zero.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Share of `votes` in `total`, in percent, rounded. The caller guarantees total > 0.
fn share(votes: u64, total: u64) -> f64 {
    round2(votes as f64 / total as f64 * 100.0)
}

/// Identity aliases for every named party present in both datasets.
///
/// Nothing is inferred about alliances: a party that only appears on one side
/// gets no alias.
pub fn default_aliases(before: &[BoothRecord], after: &[BoothRecord]) -> Vec<PartyAlias> {
    let named = |booths: &[BoothRecord]| -> Vec<PartyLabel> {
        let mut res: Vec<PartyLabel> = Vec::new();
        for b in booths.iter() {
            for p in b.party_votes.keys() {
                if !p.is_pseudo() && !res.contains(p) {
                    res.push(p.clone());
                }
            }
        }
        res.sort();
        res
    };
    let after_parties = named(after);
    named(before)
        .iter()
        .filter(|p| after_parties.contains(p))
        .map(PartyAlias::same)
        .collect()
}

fn index_by_key(booths: &[BoothRecord], side: &str) -> BTreeMap<BoothKey, BoothRecord> {
    let mut res: BTreeMap<BoothKey, BoothRecord> = BTreeMap::new();
    for b in booths.iter() {
        if res.contains_key(&b.booth_key) {
            // Records should already be aggregated by key.
            warn!(
                "reconcile: {} dataset has booth {} twice, keeping the first",
                side, b.booth_key
            );
            continue;
        }
        res.insert(b.booth_key, b.clone());
    }
    res
}

fn alias_votes(booth: &BoothRecord, labels: &[PartyLabel]) -> u64 {
    labels.iter().map(|l| booth.votes_for(l)).sum()
}

/// Joins two booth datasets on their booth key and computes share, swing and
/// turnout change.
///
/// Both datasets must have been keyed with the same rule. Only booths present
/// on both sides are compared, and a joined booth with no valid votes on
/// either side is dropped. Every dropped booth is counted in the result.
pub fn reconcile(
    before: &[BoothRecord],
    after: &[BoothRecord],
    aliases: &[PartyAlias],
) -> Reconciliation {
    let before_idx = index_by_key(before, "before");
    let after_idx = index_by_key(after, "after");

    let unmatched_before = before_idx
        .keys()
        .filter(|k| !after_idx.contains_key(k))
        .count();
    let unmatched_after = after_idx
        .keys()
        .filter(|k| !before_idx.contains_key(k))
        .count();

    let mut zero_total_excluded: usize = 0;
    let mut booths: Vec<ReconciledBoothComparison> = Vec::new();
    for (key, b) in before_idx.iter() {
        let a = match after_idx.get(key) {
            Some(a) => a,
            None => continue,
        };
        let total_before = b.total_valid_votes;
        let total_after = a.total_valid_votes;
        if total_before == 0 || total_after == 0 {
            debug!(
                "reconcile: booth {}: zero total ({} -> {}), excluded",
                key, total_before, total_after
            );
            zero_total_excluded += 1;
            continue;
        }
        let parties: Vec<PartySwing> = aliases
            .iter()
            .map(|alias| {
                let votes_before = alias_votes(b, &alias.before);
                let votes_after = alias_votes(a, &alias.after);
                let share_before = share(votes_before, total_before);
                let share_after = share(votes_after, total_after);
                PartySwing {
                    name: alias.name.clone(),
                    votes_before,
                    votes_after,
                    share_before,
                    share_after,
                    swing: round2(share_after - share_before),
                }
            })
            .collect();
        let turnout_change_pct =
            round2((total_after as f64 - total_before as f64) / total_before as f64 * 100.0);
        booths.push(ReconciledBoothComparison {
            booth_key: *key,
            total_before,
            total_after,
            parties,
            turnout_change_pct,
        });
    }

    // Unweighted: every booth counts once whatever its size.
    let (mean_swing, mean_turnout_change) = if booths.is_empty() {
        (Vec::new(), None)
    } else {
        let n = booths.len() as f64;
        let mean_swing: Vec<(String, f64)> = aliases
            .iter()
            .enumerate()
            .map(|(idx, alias)| {
                let s: f64 = booths.iter().map(|c| c.parties[idx].swing).sum();
                (alias.name.clone(), round2(s / n))
            })
            .collect();
        let t: f64 = booths.iter().map(|c| c.turnout_change_pct).sum();
        (mean_swing, Some(round2(t / n)))
    };

    info!(
        "reconcile: {} booths joined, {} only before, {} only after, {} with zero total",
        booths.len(),
        unmatched_before,
        unmatched_after,
        zero_total_excluded
    );
    if booths.is_empty() {
        warn!("reconcile: no booth could be compared");
    }
    Reconciliation {
        booths,
        unmatched_before,
        unmatched_after,
        zero_total_excluded,
        mean_swing,
        mean_turnout_change,
    }
}
