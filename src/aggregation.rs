//! Cross-trial statistics, verdict determination, and failure ranking.
//! Grounded on `original_source/src/salvo/aggregation.py`.

use std::collections::HashMap;

use crate::trial::{AssertionFailureGroup, ScoreStats, TrialResult, TrialStatus, Verdict};

/// `statistics.quantiles(data, n=100, method='exclusive')[i - 1]`, i.e. the
/// i-th of 99 cut points over `n=100` buckets (i=50 is the median, i=95 the
/// 95th percentile). `sorted_data` must already be sorted ascending and
/// have at least 2 elements.
fn percentile_exclusive(sorted_data: &[f64], i: i64) -> f64 {
    let ld = sorted_data.len() as i64;
    let m = ld + 1;
    let n = 100i64;
    let ij = i * m;
    let j = (ij / n).clamp(1, ld - 1);
    let delta = ij - j * n;
    let a = sorted_data[(j - 1) as usize];
    let b = sorted_data[j as usize];
    (a * (n - delta) as f64 + b * delta as f64) / n as f64
}

fn stats_over(mut values: Vec<f64>) -> Option<ScoreStats> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    let min = values[0];
    let (p50, p95) = if values.len() == 1 {
        (values[0], values[0])
    } else {
        (percentile_exclusive(&values, 50), percentile_exclusive(&values, 95))
    };
    Some(ScoreStats { avg, min, p50, p95 })
}

/// The subset of [`crate::trial::SuiteResult`]'s fields that depend only on
/// statistics over the trial list, computed once by the Trial Runner after
/// the last trial (or an early stop) completes.
pub struct AggregateMetrics {
    pub trials_passed: u32,
    pub trials_failed: u32,
    pub trials_hard_fail: u32,
    pub trials_infra_error: u32,
    pub pass_rate: f64,
    pub score_stats: Option<ScoreStats>,
    pub latency_p50: Option<f64>,
    pub latency_p95: Option<f64>,
    pub cost_total: Option<f64>,
    pub cost_avg_per_trial: Option<f64>,
}

/// Computes every statistic in [`AggregateMetrics`] over `trials`. Trials
/// with status `InfraError` are excluded from score/latency/cost
/// statistics (the "scored trials" subset, §3) but still counted toward
/// the per-status tallies.
pub fn compute_aggregate_metrics(trials: &[TrialResult]) -> AggregateMetrics {
    let trials_passed = trials.iter().filter(|t| t.status == TrialStatus::Passed).count() as u32;
    let trials_failed = trials.iter().filter(|t| t.status == TrialStatus::Failed).count() as u32;
    let trials_hard_fail = trials.iter().filter(|t| t.status == TrialStatus::HardFail).count() as u32;
    let trials_infra_error = trials.iter().filter(|t| t.status == TrialStatus::InfraError).count() as u32;

    let scored: Vec<&TrialResult> = trials.iter().filter(|t| t.status != TrialStatus::InfraError).collect();

    // Over scored trials only (status != infra_error), per spec §4.8.
    let pass_rate = if scored.is_empty() {
        0.0
    } else {
        trials_passed as f64 / scored.len() as f64
    };

    let score_stats = stats_over(scored.iter().map(|t| t.score).collect());
    let latency_stats = stats_over(scored.iter().map(|t| t.latency_seconds).collect());

    let known_costs: Vec<f64> = scored.iter().filter_map(|t| t.cost_usd).collect();
    let (cost_total, cost_avg_per_trial) = if known_costs.is_empty() || scored.is_empty() {
        (None, None)
    } else {
        let total: f64 = known_costs.iter().sum();
        // Average is over every scored trial, not only those with a known
        // cost — an unpriced trial silently contributes 0 to the average
        // rather than shrinking the denominator.
        (Some(total), Some(total / scored.len() as f64))
    };

    AggregateMetrics {
        trials_passed,
        trials_failed,
        trials_hard_fail,
        trials_infra_error,
        pass_rate,
        score_stats,
        latency_p50: latency_stats.as_ref().map(|s| s.p50),
        latency_p95: latency_stats.as_ref().map(|s| s.p95),
        cost_total,
        cost_avg_per_trial,
    }
}

/// Priority-ordered verdict decision (§4.8). `allow_infra` lets a host
/// re-run verdict selection over scored trials only.
pub fn determine_verdict(metrics: &AggregateMetrics, threshold: f64, allow_infra: bool) -> Verdict {
    if metrics.trials_infra_error > 0 && !allow_infra {
        return Verdict::InfraError;
    }
    if metrics.trials_hard_fail > 0 {
        return Verdict::HardFail;
    }
    let score_avg = metrics.score_stats.map(|s| s.avg).unwrap_or(0.0);
    if score_avg < threshold {
        if metrics.pass_rate > 0.0 {
            Verdict::Partial
        } else {
            Verdict::Fail
        }
    } else {
        Verdict::Pass
    }
}

/// Groups every non-passing [`crate::result::EvalResult`] across all
/// trials by (kind, first 80 chars of details), ranks descending by
/// `fail_count * (total_weight_lost / fail_count)` (§4.8's literal
/// formula — this reduces to `total_weight_lost`, kept spelled out to
/// match the rollup it mirrors).
pub fn aggregate_failures(trials: &[TrialResult]) -> Vec<AssertionFailureGroup> {
    struct Group {
        kind: String,
        detail_prefix: String,
        fail_count: u32,
        total_weight_lost: f64,
        sample_details: Vec<String>,
    }

    let mut groups: HashMap<(String, String), Group> = HashMap::new();
    let trials_total = trials.len().max(1) as f64;

    for trial in trials {
        for result in &trial.eval_results {
            if result.passed {
                continue;
            }
            let prefix: String = result.details.chars().take(80).collect();
            let key = (result.assertion_kind.clone(), prefix.clone());
            let entry = groups.entry(key).or_insert_with(|| Group {
                kind: result.assertion_kind.clone(),
                detail_prefix: prefix.clone(),
                fail_count: 0,
                total_weight_lost: 0.0,
                sample_details: Vec::new(),
            });
            entry.fail_count += 1;
            entry.total_weight_lost += (1.0 - result.score) * result.weight;
            if entry.sample_details.len() < 3 {
                entry.sample_details.push(result.details.clone());
            }
        }
    }

    let mut ranked: Vec<AssertionFailureGroup> = groups
        .into_values()
        .map(|g| AssertionFailureGroup {
            kind: g.kind,
            detail_prefix: g.detail_prefix,
            fail_count: g.fail_count,
            fail_rate: g.fail_count as f64 / trials_total,
            total_weight_lost: g.total_weight_lost,
            sample_details: g.sample_details,
        })
        .collect();

    ranked.sort_by(|a, b| {
        let rank_a = a.fail_count as f64 * (a.total_weight_lost / a.fail_count as f64);
        let rank_b = b.fail_count as f64 * (b.total_weight_lost / b.fail_count as f64);
        rank_b.partial_cmp(&rank_a).unwrap()
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::EvalResult;

    fn trial(status: TrialStatus, score: f64, cost: Option<f64>) -> TrialResult {
        TrialResult {
            trial_number: 1,
            status,
            score,
            passed: status == TrialStatus::Passed,
            eval_results: vec![],
            latency_seconds: 1.0,
            cost_usd: cost,
            retries_used: 0,
            transient_errors_seen: vec![],
            error_message: None,
            trace_id: None,
        }
    }

    #[test]
    fn single_scored_trial_collapses_percentiles() {
        let trials = vec![trial(TrialStatus::Passed, 0.9, Some(0.01))];
        let metrics = compute_aggregate_metrics(&trials);
        let stats = metrics.score_stats.unwrap();
        assert_eq!(stats.p50, 0.9);
        assert_eq!(stats.p95, 0.9);
    }

    #[test]
    fn infra_error_trials_excluded_from_score_stats_but_counted() {
        let trials = vec![
            trial(TrialStatus::Passed, 1.0, None),
            trial(TrialStatus::InfraError, 0.0, None),
        ];
        let metrics = compute_aggregate_metrics(&trials);
        assert_eq!(metrics.trials_infra_error, 1);
        assert_eq!(metrics.score_stats.unwrap().avg, 1.0);
    }

    #[test]
    fn pass_rate_is_over_scored_trials_not_all_trials() {
        let trials = vec![
            trial(TrialStatus::Passed, 1.0, None),
            trial(TrialStatus::InfraError, 0.0, None),
        ];
        let metrics = compute_aggregate_metrics(&trials);
        assert_eq!(metrics.pass_rate, 1.0);
    }

    #[test]
    fn verdict_priority_favors_infra_error_then_hard_fail() {
        let trials = vec![trial(TrialStatus::InfraError, 0.0, None)];
        let metrics = compute_aggregate_metrics(&trials);
        assert_eq!(determine_verdict(&metrics, 0.8, false), Verdict::InfraError);
        assert_eq!(determine_verdict(&metrics, 0.8, true), Verdict::Fail);
    }

    #[test]
    fn verdict_is_partial_when_some_trials_pass_below_threshold_average() {
        let trials = vec![
            trial(TrialStatus::Passed, 1.0, None),
            trial(TrialStatus::Failed, 0.0, None),
        ];
        let metrics = compute_aggregate_metrics(&trials);
        assert_eq!(determine_verdict(&metrics, 0.9, false), Verdict::Partial);
    }

    #[test]
    fn failure_groups_rank_by_total_weight_lost() {
        let mut t1 = trial(TrialStatus::Failed, 0.0, None);
        t1.eval_results = vec![EvalResult::new("path_query", 0.0, false, 2.0, false, "expected 'x'")];
        let mut t2 = trial(TrialStatus::Failed, 0.0, None);
        t2.eval_results = vec![EvalResult::new("cost_limit", 0.0, false, 0.1, false, "over budget")];
        let groups = aggregate_failures(&[t1, t2]);
        assert_eq!(groups[0].kind, "path_query");
    }
}
