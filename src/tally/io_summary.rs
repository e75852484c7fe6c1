use std::collections::BTreeMap;

use booth_tally::summary::vote_shares;
use serde_json::Map as JSMap;

use crate::tally::*;

fn columns_js(layout: &ColumnLayout) -> Vec<JSValue> {
    layout
        .identities
        .iter()
        .map(|ci| {
            json!({
                "columnIndex": ci.column_index,
                "candidateOrdinal": ci.candidate_ordinal,
                "candidateName": ci.candidate_name,
                "party": ci.party.to_string(),
                "rawLabel": ci.raw_label_text,
            })
        })
        .collect()
}

fn competitiveness_js(c: &Competitiveness) -> JSValue {
    match c {
        Competitiveness::Classified(r) => json!({
            "winner": r.winner_party.to_string(),
            "winnerVotes": r.winner_votes,
            "runnerUp": r.runner_up_party.to_string(),
            "runnerUpVotes": r.runner_up_votes,
            "margin": r.margin,
            "marginPct": booth_tally::reconcile::round2(r.margin_pct),
            "tier": r.tier.as_str(),
        }),
        Competitiveness::InsufficientData {
            parties_with_votes, ..
        } => json!({
            "insufficientData": true,
            "partiesWithVotes": parties_with_votes,
        }),
    }
}

pub fn location_js(station: &GeocodedStation) -> JSValue {
    json!({
        "stationNo": station.station_no,
        "building": station.building,
        "village": station.village,
        "lat": station.location.lat,
        "lng": station.location.lng,
        "found": station.found,
    })
}

fn booth_js(
    booth: &BoothRecord,
    result: Option<&Competitiveness>,
    location: Option<&GeocodedStation>,
) -> JSValue {
    let mut votes: JSMap<String, JSValue> = JSMap::new();
    for (party, v) in booth.party_votes.iter() {
        votes.insert(party.to_string(), json!(v));
    }
    json!({
        "boothKey": booth.booth_key.0,
        "tableNo": booth.table_no,
        "stationLabels": booth.station_labels,
        "rows": booth.row_count,
        "votes": votes,
        "candidateVotes": booth.candidate_votes,
        "totalValidVotes": booth.total_valid_votes,
        "sourceTotalValid": booth.source_total_valid,
        "rejectedVotes": booth.rejected_votes,
        "tenderedVotes": booth.tendered_votes,
        "competitiveness": result.map(competitiveness_js),
        "location": location.map(location_js),
    })
}

fn summary_js(summary: &ConstituencySummary) -> JSValue {
    let mut booths_won: JSMap<String, JSValue> = JSMap::new();
    for (party, n) in summary.tiers.booths_won.iter() {
        booths_won.insert(party.to_string(), json!(n));
    }
    let mut tiers: JSMap<String, JSValue> = JSMap::new();
    for (party, counts) in summary.tiers.tiers.iter() {
        let mut m: JSMap<String, JSValue> = JSMap::new();
        for (tier, n) in counts.iter() {
            m.insert(tier.as_str().to_string(), json!(n));
        }
        tiers.insert(party.to_string(), JSValue::Object(m));
    }
    let shares = vote_shares(summary);
    let totals: Vec<JSValue> = summary
        .party_totals
        .iter()
        .map(|(party, v)| {
            json!({
                "party": party.to_string(),
                "votes": v,
                "share": shares.get(party).cloned().unwrap_or(0.0),
            })
        })
        .collect();
    json!({
        "booths": summary.booths,
        "boothsWon": booths_won,
        "tiers": tiers,
        "insufficientData": summary.tiers.insufficient_data,
        "partyTotals": totals,
        "totalValidVotes": summary.total_valid_votes,
        "rejectedVotes": summary.rejected_votes,
        "tenderedVotes": summary.tendered_votes,
        "winner": summary.winner.as_ref().map(|(p, v)| json!({"party": p.to_string(), "votes": v})),
        "runnerUp": summary.runner_up.as_ref().map(|(p, v)| json!({"party": p.to_string(), "votes": v})),
        "margin": summary.margin,
    })
}

fn stats_js(stats: &ExtractionStats) -> JSValue {
    json!({
        "pages": stats.pages,
        "emptyPages": stats.empty_pages,
        "rows": stats.rows,
        "headerRows": stats.header_rows,
        "dataRows": stats.data_rows,
        "totalRows": stats.total_rows,
        "noiseRows": stats.noise_rows,
        "keylessRows": stats.keyless_rows,
        "mergedRows": stats.merged_rows,
        "totalMismatches": stats.total_mismatches,
    })
}

pub fn geocode_stats_js(stats: &GeocodeStats) -> JSValue {
    json!({
        "stations": stats.stations,
        "found": stats.found,
        "fallback": stats.fallback,
        "cacheHits": stats.cache_hits,
        "lookups": stats.lookups,
        "failures": stats.failures,
        "budgetExhausted": stats.budget_exhausted,
    })
}

/// The JSON summary of one document.
///
/// Booths carry their competitiveness and, when the stations were geocoded,
/// the location of the first station filed under their key.
pub fn build_summary_js(
    number: &str,
    name: &str,
    extract: &DocumentExtract,
    results: &[Competitiveness],
    summary: &ConstituencySummary,
    geocoded: Option<&(Vec<GeocodedStation>, GeocodeStats)>,
) -> JSValue {
    let mut locations: BTreeMap<BoothKey, &GeocodedStation> = BTreeMap::new();
    if let Some((stations, _)) = geocoded {
        for s in stations.iter() {
            if let Some(k) = s.booth_key {
                locations.entry(k).or_insert(s);
            }
        }
    }
    let booths: Vec<JSValue> = extract
        .booths
        .iter()
        .enumerate()
        .map(|(idx, b)| {
            booth_js(
                b,
                results.get(idx),
                locations.get(&b.booth_key).cloned(),
            )
        })
        .collect();
    let summary_columns: Vec<JSValue> = extract
        .layout
        .summary_columns
        .iter()
        .map(|sc| json!({"columnIndex": sc.column_index, "role": sc.role.column_name()}))
        .collect();
    json!({
        "constituency": {"number": number, "name": name},
        "partyTable": {
            "version": PARTY_TABLE_VERSION,
            "fingerprint": party_table_fingerprint(),
        },
        "columns": columns_js(&extract.layout),
        "summaryColumns": summary_columns,
        "booths": booths,
        "summary": summary_js(summary),
        "stats": stats_js(&extract.stats),
        "geocoding": geocoded.map(|(_, stats)| geocode_stats_js(stats)),
        "warnings": extract.warnings.iter().map(|w| w.to_string()).collect::<Vec<String>>(),
    })
}
