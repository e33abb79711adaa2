//! Mixing session: the active track set, the scoring params in force and the
//! caches derived from both.
//!
//! Every derived result is cached here and dropped as soon as either input
//! changes. A session is single-threaded; share it behind your own lock if
//! you need to.

use std::collections::HashMap;

use crate::groups::{self, MixableGroup};
use crate::library::Track;
use crate::scoring::{self, ScoringParams, Strictness, TransitionInsight};
use crate::sequencer::{self, ScoreCache, SetVariant};

/// Matches kept per track unless configured otherwise.
pub const DEFAULT_MATCHES_LIMIT: usize = 10;

/// Top-matches cache key. Tempo knobs are keyed by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MatchKey {
    track_id: String,
    key_weight: u64,
    bpm_tolerance: u64,
    half_double: bool,
    strictness: Strictness,
}

impl MatchKey {
    fn new(track_id: &str, params: &ScoringParams) -> Self {
        Self {
            track_id: track_id.to_string(),
            key_weight: params.key_weight.to_bits(),
            bpm_tolerance: params.bpm_tolerance.to_bits(),
            half_double: params.half_double,
            strictness: params.strictness,
        }
    }
}

#[derive(Debug)]
pub struct MixSession {
    tracks: Vec<Track>,
    params: ScoringParams,
    matches_limit: usize,
    pairs: ScoreCache,
    matches: HashMap<MatchKey, Vec<TransitionInsight>>,
}

impl MixSession {
    pub fn new(tracks: Vec<Track>, params: ScoringParams) -> Self {
        Self {
            tracks,
            params,
            matches_limit: DEFAULT_MATCHES_LIMIT,
            pairs: ScoreCache::new(),
            matches: HashMap::new(),
        }
    }

    pub fn with_matches_limit(mut self, limit: usize) -> Self {
        self.set_matches_limit(limit);
        self
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn params(&self) -> &ScoringParams {
        &self.params
    }

    pub fn find_track(&self, track_id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    /// Replace the scoring params. Always drops every cached result.
    pub fn set_params(&mut self, params: ScoringParams) {
        self.params = params;
        self.invalidate();
    }

    /// Replace the active track set, e.g. after picking another playlist.
    pub fn set_tracks(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
        self.invalidate();
    }

    pub fn set_matches_limit(&mut self, limit: usize) {
        if limit != self.matches_limit {
            self.matches_limit = limit;
            self.matches.clear();
        }
    }

    pub fn invalidate(&mut self) {
        self.pairs.invalidate();
        if !self.matches.is_empty() {
            log::debug!("Dropping {} cached match lists", self.matches.len());
        }
        self.matches.clear();
    }

    /// Best transitions out of `track_id`, highest score first.
    ///
    /// Unknown or incomplete tracks have no matches.
    pub fn top_matches(&mut self, track_id: &str) -> &[TransitionInsight] {
        let key = MatchKey::new(track_id, &self.params);
        if !self.matches.contains_key(&key) {
            let ranked = rank_matches(
                &self.tracks,
                track_id,
                &self.params,
                self.matches_limit,
                &mut self.pairs,
            );
            self.matches.insert(key.clone(), ranked);
        }
        &self.matches[&key]
    }

    /// The three flow variants for the active set.
    pub fn variants(&mut self) -> Vec<SetVariant> {
        sequencer::generate_variants_cached(&self.tracks, &self.params, &mut self.pairs)
    }

    pub fn groups(&self, band_width: f64) -> Vec<MixableGroup> {
        groups::mixable_groups(&self.tracks, self.params.strictness, band_width)
    }
}

fn rank_matches(
    tracks: &[Track],
    track_id: &str,
    params: &ScoringParams,
    limit: usize,
    cache: &mut ScoreCache,
) -> Vec<TransitionInsight> {
    let pool = scoring::mixable(tracks);
    let Some(from) = pool.iter().find(|m| m.track.id == track_id) else {
        log::debug!("No complete track with id {track_id}");
        return Vec::new();
    };

    let mut ranked: Vec<TransitionInsight> = pool
        .iter()
        .filter(|m| m.track.id != track_id)
        .map(|to| cache.score(from, to, params).clone())
        .collect();
    // sort_by is stable: equal scores keep collection order
    ranked.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
    ranked.truncate(limit);
    ranked
}
