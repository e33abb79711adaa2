//! Set ordering: greedy nearest-neighbour over transition scores with a
//! one-step sampled lookahead.
//!
//! Output is deterministic for a given input order. Every tie goes to the
//! earliest-scanned candidate.

use std::collections::HashMap;

use serde::Serialize;

use crate::library::Track;
use crate::scoring::{self, Mixable, ScoringParams, TransitionInsight};

/// Lookahead weight and label of each generated variant.
pub const VARIANTS: [(f64, &str); 3] = [
    (0.25, "Conservative Flow"),
    (0.35, "Balanced Flow"),
    (0.45, "Adventurous Flow"),
];

/// Seed candidates are compared against at most this many leading tracks.
const SEED_SAMPLE: usize = 50;

/// Lookahead looks at most this many remaining tracks.
const LOOKAHEAD_SAMPLE: usize = 20;

/// At or below this size the first track is the seed.
const SMALL_SET: usize = 3;

/// One ordered set. Built fresh per request, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetVariant {
    pub label: String,
    pub tracks: Vec<Track>,
    /// `transitions[i]` goes from `tracks[i]` to `tracks[i + 1]`.
    pub transitions: Vec<TransitionInsight>,
    /// Mean transition score; 0 when there are no transitions.
    pub total_score: f64,
}

/// Memoized pairwise scores keyed by `(from id, to id)`.
///
/// Entries are only valid for the params they were computed with: a lookup
/// with different params drops everything first. Owners must also call
/// [`ScoreCache::invalidate`] when the active track set changes.
#[derive(Debug, Default)]
pub struct ScoreCache {
    params: Option<ScoringParams>,
    pairs: HashMap<String, HashMap<String, TransitionInsight>>,
    len: usize,
}

impl ScoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        if self.len > 0 {
            log::debug!("Dropping {} cached transition scores", self.len);
        }
        self.pairs.clear();
        self.len = 0;
        self.params = None;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cached score for `from → to`, computing it on first use.
    pub fn score(
        &mut self,
        from: &Mixable<'_>,
        to: &Mixable<'_>,
        params: &ScoringParams,
    ) -> &TransitionInsight {
        if self.params.as_ref() != Some(params) {
            self.invalidate();
            self.params = Some(*params);
        }

        let from_id = &from.track.id;
        let to_id = &to.track.id;
        let cached = self
            .pairs
            .get(from_id)
            .is_some_and(|row| row.contains_key(to_id));
        if !cached {
            let insight = scoring::score_pair(from, to, params);
            self.pairs
                .entry(from_id.clone())
                .or_default()
                .insert(to_id.clone(), insight);
            self.len += 1;
        }
        &self.pairs[from_id][to_id]
    }
}

/// Generate the three flow variants with a cache local to this call.
/// Fewer than two complete tracks yields no variants.
pub fn generate_variants(tracks: &[Track], params: &ScoringParams) -> Vec<SetVariant> {
    let mut cache = ScoreCache::new();
    generate_variants_cached(tracks, params, &mut cache)
}

/// Generate the three flow variants, reusing and filling `cache`.
/// All variants share one seed and one cache.
pub fn generate_variants_cached(
    tracks: &[Track],
    params: &ScoringParams,
    cache: &mut ScoreCache,
) -> Vec<SetVariant> {
    let pool = scoring::mixable(tracks);
    if pool.len() < 2 {
        log::info!(
            "Not enough complete tracks to sequence ({} of {})",
            pool.len(),
            tracks.len()
        );
        return Vec::new();
    }

    let seed = best_seed(&pool, params, cache);
    log::debug!(
        "Sequencing {} tracks from seed {:?}",
        pool.len(),
        pool[seed].track.title
    );

    VARIANTS
        .iter()
        .map(|&(alpha, label)| greedy_order(&pool, seed, alpha, label, params, cache))
        .collect()
}

/// Index of the track with the best mean score against the leading sample.
fn best_seed(pool: &[Mixable<'_>], params: &ScoringParams, cache: &mut ScoreCache) -> usize {
    if pool.len() <= SMALL_SET {
        return 0;
    }

    let sample = &pool[..pool.len().min(SEED_SAMPLE)];
    let mut best_idx = 0;
    let mut best_mean = f64::NEG_INFINITY;

    for (i, candidate) in pool.iter().enumerate() {
        let mut sum = 0.0;
        let mut count = 0usize;
        for (j, other) in sample.iter().enumerate() {
            if j == i {
                continue;
            }
            sum += cache.score(candidate, other, params).total_score;
            count += 1;
        }
        let mean = sum / count.max(1) as f64;
        if mean > best_mean {
            best_mean = mean;
            best_idx = i;
        }
    }

    best_idx
}

fn greedy_order(
    pool: &[Mixable<'_>],
    seed: usize,
    alpha: f64,
    label: &str,
    params: &ScoringParams,
    cache: &mut ScoreCache,
) -> SetVariant {
    let mut remaining = pool.to_vec();
    let mut ordered = vec![remaining.remove(seed)];
    let mut transitions = Vec::with_capacity(pool.len().saturating_sub(1));

    while let Some(&current) = ordered.last() {
        if remaining.is_empty() {
            break;
        }

        let mut best_idx = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (i, candidate) in remaining.iter().enumerate() {
            let direct = cache.score(&current, candidate, params).total_score;
            let value = direct + alpha * lookahead(&remaining, i, params, cache);
            if value > best_value {
                best_value = value;
                best_idx = i;
            }
        }

        let next = remaining.remove(best_idx);
        transitions.push(cache.score(&current, &next, params).clone());
        ordered.push(next);
    }

    let total_score = if transitions.is_empty() {
        0.0
    } else {
        transitions.iter().map(|t| t.total_score).sum::<f64>() / transitions.len() as f64
    };

    SetVariant {
        label: label.to_string(),
        tracks: ordered.iter().map(|m| m.track.clone()).collect(),
        transitions,
        total_score,
    }
}

/// Best score from `remaining[index]` to any other track among the first
/// `LOOKAHEAD_SAMPLE` remaining. Zero when it is the last track.
fn lookahead(
    remaining: &[Mixable<'_>],
    index: usize,
    params: &ScoringParams,
    cache: &mut ScoreCache,
) -> f64 {
    let candidate = &remaining[index];
    let mut best = 0.0_f64;
    for (j, next) in remaining.iter().take(LOOKAHEAD_SAMPLE).enumerate() {
        if j == index {
            continue;
        }
        let s = cache.score(candidate, next, params).total_score;
        if s > best {
            best = s;
        }
    }
    best
}
