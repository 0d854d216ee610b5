//! Combines k independent judge votes into one score and pass/fail verdict.
//! Grounded on `original_source/src/salvo/evaluation/judge/aggregation.py`.

use std::collections::HashMap;

use crate::evaluation::judge::extraction::CriterionVote;
use crate::scenario::Criterion;

/// The outcome of aggregating k judge votes.
#[derive(Debug, Clone)]
pub struct JudgeAggregate {
    pub score: f64,
    pub passed: bool,
    pub per_criterion_median: HashMap<String, f64>,
    pub votes_parsed: usize,
    pub votes_total: usize,
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = values.len();
    if n == 0 {
        0.0
    } else if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

fn weighted_mean(scores: &HashMap<String, f64>, criteria: &[Criterion]) -> f64 {
    let total_weight: f64 = criteria.iter().map(|c| c.weight).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = criteria
        .iter()
        .map(|c| scores.get(&c.name).copied().unwrap_or(0.0) * c.weight)
        .sum();
    weighted / total_weight
}

/// Aggregates however many of the `k` requested votes actually parsed.
/// `votes` holds one entry per vote that successfully parsed (a vote that
/// failed extraction is simply absent, not a zero-filled entry). A run
/// where none parsed falls back to a maximally conservative verdict
/// (`judge_parse_failed`: score 0.0, not passed) rather than dividing by
/// zero.
pub fn aggregate_votes(
    votes: &[HashMap<String, CriterionVote>],
    criteria: &[Criterion],
    threshold: f64,
    votes_total: usize,
) -> JudgeAggregate {
    if votes.is_empty() {
        return JudgeAggregate {
            score: 0.0,
            passed: false,
            per_criterion_median: HashMap::new(),
            votes_parsed: 0,
            votes_total,
        };
    }

    let mut per_criterion_median = HashMap::new();
    for criterion in criteria {
        let scores: Vec<f64> = votes
            .iter()
            .filter_map(|vote| vote.get(&criterion.name).map(|v| v.score))
            .collect();
        per_criterion_median.insert(criterion.name.clone(), median(scores));
    }

    let score = weighted_mean(&per_criterion_median, criteria);

    // Each vote's own weighted mean decides that vote's pass/fail; the
    // aggregate passes only on a strict majority of passing votes, so one
    // or two outlier votes can't single-handedly flip a otherwise-failing
    // run (or vice versa).
    let vote_verdicts: Vec<bool> = votes
        .iter()
        .map(|vote| {
            let vote_scores: HashMap<String, f64> =
                vote.iter().map(|(k, v)| (k.clone(), v.score)).collect();
            weighted_mean(&vote_scores, criteria) >= threshold
        })
        .collect();
    let passing = vote_verdicts.iter().filter(|v| **v).count();
    let passed = passing * 2 > vote_verdicts.len();

    JudgeAggregate {
        score,
        passed,
        per_criterion_median,
        votes_parsed: votes.len(),
        votes_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(score: f64) -> HashMap<String, CriterionVote> {
        HashMap::from([(
            "accuracy".to_string(),
            CriterionVote { score, reasoning: "r".to_string() },
        )])
    }

    fn criteria() -> Vec<Criterion> {
        vec![Criterion {
            name: "accuracy".to_string(),
            description: "".to_string(),
            weight: 1.0,
        }]
    }

    #[test]
    fn median_of_three_votes_ignores_outlier() {
        let votes = vec![vote(0.2), vote(0.8), vote(0.85)];
        let agg = aggregate_votes(&votes, &criteria(), 0.8, 3);
        assert_eq!(agg.per_criterion_median["accuracy"], 0.8);
    }

    #[test]
    fn strict_majority_required_to_pass() {
        // Two votes below threshold, one above: majority fails even though
        // the aggregate median might be borderline.
        let votes = vec![vote(0.5), vote(0.5), vote(0.95)];
        let agg = aggregate_votes(&votes, &criteria(), 0.8, 3);
        assert!(!agg.passed);
    }

    #[test]
    fn zero_parsed_votes_is_a_conservative_failure() {
        let agg = aggregate_votes(&[], &criteria(), 0.8, 3);
        assert_eq!(agg.score, 0.0);
        assert!(!agg.passed);
        assert_eq!(agg.votes_parsed, 0);
        assert_eq!(agg.votes_total, 3);
    }
}
