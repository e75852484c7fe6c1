// Cross-year comparison of two booth extracts.

use crate::tally::io_extract::read_extract;
use crate::tally::*;

fn labels_js(labels: &[PartyLabel]) -> Vec<String> {
    labels.iter().map(|l| l.to_string()).collect()
}

pub fn comparison_headers(aliases: &[PartyAlias], before: &str, after: &str) -> Vec<String> {
    let mut res: Vec<String> = vec![
        "booth_key".to_string(),
        format!("total_{}", before),
        format!("total_{}", after),
        "turnout_change_pct".to_string(),
    ];
    for a in aliases.iter() {
        res.push(format!("{}_votes_{}", a.name, before));
        res.push(format!("{}_votes_{}", a.name, after));
        res.push(format!("{}_share_{}", a.name, before));
        res.push(format!("{}_share_{}", a.name, after));
        res.push(format!("{}_swing", a.name));
    }
    res
}

fn comparison_line(booth: &ReconciledBoothComparison) -> Vec<String> {
    let mut res: Vec<String> = vec![
        booth.booth_key.to_string(),
        booth.total_before.to_string(),
        booth.total_after.to_string(),
        booth.turnout_change_pct.to_string(),
    ];
    for p in booth.parties.iter() {
        res.push(p.votes_before.to_string());
        res.push(p.votes_after.to_string());
        res.push(p.share_before.to_string());
        res.push(p.share_after.to_string());
        res.push(p.swing.to_string());
    }
    res
}

pub fn write_comparison_csv(
    path: &Path,
    rec: &Reconciliation,
    aliases: &[PartyAlias],
    before: &str,
    after: &str,
) -> TallyResult<()> {
    let p = path_string(path);
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(comparison_headers(aliases, before, after))
        .context(CsvWriteSnafu { path: p.clone() })?;
    for booth in rec.booths.iter() {
        wtr.write_record(comparison_line(booth))
            .context(CsvWriteSnafu { path: p.clone() })?;
    }
    let bytes = match wtr.into_inner() {
        Ok(b) => b,
        Err(e) => whatever!("Could not flush the comparison {}: {}", p, e),
    };
    write_atomic(path, &bytes)
}

pub fn comparison_js(
    cmp: &ComparisonSource,
    aliases: &[PartyAlias],
    rec: &Reconciliation,
) -> JSValue {
    let aliases_js: Vec<JSValue> = aliases
        .iter()
        .map(|a| {
            json!({
                "name": a.name,
                "before": labels_js(&a.before),
                "after": labels_js(&a.after),
            })
        })
        .collect();
    let mean_swing: Vec<JSValue> = rec
        .mean_swing
        .iter()
        .map(|(name, swing)| json!({"name": name, "swing": swing}))
        .collect();
    let booths: Vec<JSValue> = rec
        .booths
        .iter()
        .map(|b| {
            let parties: Vec<JSValue> = b
                .parties
                .iter()
                .map(|p| {
                    json!({
                        "name": p.name,
                        "votesBefore": p.votes_before,
                        "votesAfter": p.votes_after,
                        "shareBefore": p.share_before,
                        "shareAfter": p.share_after,
                        "swing": p.swing,
                    })
                })
                .collect();
            json!({
                "boothKey": b.booth_key.0,
                "totalBefore": b.total_before,
                "totalAfter": b.total_after,
                "turnoutChangePct": b.turnout_change_pct,
                "parties": parties,
            })
        })
        .collect();
    json!({
        "name": cmp.name,
        "beforeLabel": cmp.before_label(),
        "afterLabel": cmp.after_label(),
        "aliases": aliases_js,
        "boothsCompared": rec.booths.len(),
        "unmatchedBefore": rec.unmatched_before,
        "unmatchedAfter": rec.unmatched_after,
        "zeroTotalExcluded": rec.zero_total_excluded,
        "meanSwing": mean_swing,
        "meanTurnoutChange": rec.mean_turnout_change,
        "booths": booths,
    })
}

/// Reads the two extracts of a comparison, reconciles them and writes the
/// comparison CSV and JSON. Returns the entry of the batch summary.
pub fn run_comparison(root: &Path, out_dir: &Path, cmp: &ComparisonSource) -> TallyResult<JSValue> {
    let before = read_extract(&path_string(&resolve_path(root, &cmp.before)))?;
    let after = read_extract(&path_string(&resolve_path(root, &cmp.after)))?;
    let aliases = match cmp.aliases() {
        Some(a) => a,
        None => default_aliases(&before.booths, &after.booths),
    };
    if aliases.is_empty() {
        warn!("Comparison {}: no party to compare", cmp.name);
    }
    let rec = reconcile(&before.booths, &after.booths, &aliases);
    info!(
        "Comparison {}: {} booths compared, {} excluded",
        cmp.name,
        rec.booths.len(),
        rec.excluded()
    );

    let stem = file_safe_name(&cmp.name);
    let csv_p = out_dir.join(format!("{}_comparison.csv", stem));
    write_comparison_csv(
        &csv_p,
        &rec,
        &aliases,
        &file_safe_name(&cmp.before_label()),
        &file_safe_name(&cmp.after_label()),
    )?;
    let json_p = out_dir.join(format!("{}_comparison.json", stem));
    write_json(&json_p, &comparison_js(cmp, &aliases, &rec))?;

    Ok(json!({
        "name": cmp.name,
        "status": "ok",
        "boothsCompared": rec.booths.len(),
        "excluded": rec.excluded(),
        "meanTurnoutChange": rec.mean_turnout_change,
        "files": [path_string(&csv_p), path_string(&json_p)],
    }))
}
