//! Name-based linking of records to an external candidate pool.
//!
//! The market-value source shares no identifier with the statistics tables,
//! so each target name is scored against every candidate name with a
//! word-order insensitive metric. The best candidate wins (first in pool
//! order on ties) and is accepted when its score reaches the threshold.
//! Assignment is greedy and independent per target: one candidate may be
//! picked by several targets.

use clap::ValueEnum;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    data::Value,
    dataset::{Dataset, Record},
    error::{ReconcileError, Result, Stage},
    schema::{Field, Schema},
};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 80.0;
pub const DEFAULT_VALUE_FIELD: &str = "Transfer_Value";
pub const DEFAULT_SCORE_FIELD: &str = "Match_Score";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum Scorer {
    /// Indel similarity of the token-sorted strings
    #[default]
    TokenSort,
    /// Normalized Levenshtein similarity of the token-sorted strings
    TokenSortLevenshtein,
}

impl Scorer {
    pub fn score(self, left: &str, right: &str) -> f64 {
        self.score_sorted(&token_sort(left), &token_sort(right))
    }

    fn score_sorted(self, left: &str, right: &str) -> f64 {
        match self {
            Scorer::TokenSort => indel_ratio(left, right),
            Scorer::TokenSortLevenshtein => strsim::normalized_levenshtein(left, right) * 100.0,
        }
    }
}

/// Token-sort ratio in `[0, 100]`: both strings are split on whitespace,
/// tokens sorted and rejoined, then compared with the normalized Indel
/// similarity `2 * LCS / (len_a + len_b)`.
pub fn token_sort_ratio(left: &str, right: &str) -> f64 {
    Scorer::TokenSort.score(left, right)
}

fn token_sort(value: &str) -> String {
    let mut tokens: Vec<&str> = value.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn indel_ratio(left: &str, right: &str) -> f64 {
    let a: Vec<char> = left.chars().collect();
    let b: Vec<char> = right.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * longest_common_subsequence(&a, &b) as f64 / total as f64
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub value: Value,
}

/// Ordered (name, value) pairs scraped from the external source. Every
/// candidate in the pool carries a value, so an accepted match always
/// attaches one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
}

impl CandidatePool {
    /// Drops candidates whose value is missing.
    pub fn new(candidates: Vec<Candidate>) -> Self {
        let total = candidates.len();
        let candidates: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| !c.value.is_missing())
            .collect();
        if candidates.len() < total {
            debug!(
                "Dropped {} candidate(s) without a value",
                total - candidates.len()
            );
        }
        Self { candidates }
    }

    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, value)| {
                    let value: String = value.into();
                    Candidate {
                        name: name.into(),
                        value: Value::from_raw(&value, ""),
                    }
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Index of the target record.
    pub target: usize,
    /// Best candidate, set only when accepted.
    pub candidate: Option<usize>,
    /// Best score seen, accepted or not.
    pub score: f64,
    pub accepted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatcher {
    pub name_field: String,
    pub threshold: f64,
    pub scorer: Scorer,
    pub parallel: bool,
}

impl FuzzyMatcher {
    pub fn new(name_field: impl Into<String>, threshold: f64) -> Result<Self> {
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ReconcileError::InvalidThreshold {
                stage: Stage::Match,
                value: threshold,
            });
        }
        Ok(Self {
            name_field: name_field.into(),
            threshold,
            scorer: Scorer::default(),
            parallel: true,
        })
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Scores every target record against the pool; one result per target,
    /// in target order.
    pub fn match_records(&self, data: &Dataset, pool: &CandidatePool) -> Result<Vec<MatchResult>> {
        let name_idx = data
            .schema
            .require(&self.name_field, Stage::Match, "targets")?;
        let prepared: Vec<String> = pool.iter().map(|c| token_sort(&c.name)).collect();
        let evaluate = |(target, record): (usize, &Record)| self.evaluate(target, record.get(name_idx), &prepared);
        let results: Vec<MatchResult> = if self.parallel {
            data.records.par_iter().enumerate().map(evaluate).collect()
        } else {
            data.records.iter().enumerate().map(evaluate).collect()
        };
        let accepted = results.iter().filter(|r| r.accepted).count();
        info!(
            "Matched {} of {} target(s) against {} candidate(s) at threshold {}",
            accepted,
            results.len(),
            pool.len(),
            self.threshold
        );
        Ok(results)
    }

    fn evaluate(&self, target: usize, name: &Value, prepared: &[String]) -> MatchResult {
        let rejected = |score| MatchResult {
            target,
            candidate: None,
            score,
            accepted: false,
        };
        let query = match name {
            Value::Missing => return rejected(0.0),
            other => token_sort(&other.as_display("")),
        };
        let Some((best, score)) = best_candidate(self.scorer, &query, prepared) else {
            return rejected(0.0);
        };
        if score >= self.threshold {
            MatchResult {
                target,
                candidate: Some(best),
                score,
                accepted: true,
            }
        } else {
            debug!(
                "No match for '{}' (best score {:.1} below {})",
                query, score, self.threshold
            );
            rejected(score)
        }
    }

    /// Keeps accepted targets only and appends the candidate value and score
    /// as `value_field` and `score_field`.
    pub fn attach(
        &self,
        data: &Dataset,
        pool: &CandidatePool,
        results: &[MatchResult],
        value_field: &str,
        score_field: &str,
    ) -> Result<Dataset> {
        let mut fields = data.schema.fields().to_vec();
        for name in [value_field, score_field] {
            if data.schema.contains(name) || value_field == score_field {
                return Err(ReconcileError::DuplicateField {
                    stage: Stage::Match,
                    field: name.to_string(),
                });
            }
            fields.push(Field::new(name, "match"));
        }
        let schema = Schema::new(fields);

        let mut records = Vec::new();
        for result in results.iter().filter(|r| r.accepted) {
            let (Some(record), Some(candidate)) = (
                data.records.get(result.target),
                result.candidate.and_then(|idx| pool.get(idx)),
            ) else {
                continue;
            };
            let mut combined = record.clone();
            combined.extend([
                candidate.value.clone(),
                Value::Number(result.score),
            ]);
            records.push(combined);
        }
        info!(
            "{} of {} record(s) carry an external value",
            records.len(),
            data.len()
        );
        Ok(Dataset::new(schema, records))
    }

    /// [`match_records`](Self::match_records) followed by
    /// [`attach`](Self::attach) with the default output field names.
    pub fn link(&self, data: &Dataset, pool: &CandidatePool) -> Result<Dataset> {
        let results = self.match_records(data, pool)?;
        self.attach(data, pool, &results, DEFAULT_VALUE_FIELD, DEFAULT_SCORE_FIELD)
    }
}

/// Highest scoring candidate; the earliest one wins ties.
fn best_candidate(scorer: Scorer, query: &str, prepared: &[String]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, candidate) in prepared.iter().enumerate() {
        let score = scorer.score_sorted(query, candidate);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((idx, score));
        }
    }
    best
}
