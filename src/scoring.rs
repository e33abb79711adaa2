//! Pairwise transition scoring: harmonic relation on the Camelot wheel blended
//! with tempo proximity.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camelot::{self, CamelotKey};
use crate::library::Track;

/// How harshly non-harmonic key moves are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strictness {
    /// Non-harmonic moves score zero.
    #[serde(alias = "strict")]
    Strict,
    #[default]
    #[serde(alias = "normal")]
    Normal,
    /// Also rewards ±2 "energy" moves on the same ring.
    #[serde(alias = "creative")]
    Creative,
}

impl Strictness {
    pub fn as_str(self) -> &'static str {
        match self {
            Strictness::Strict => "Strict",
            Strictness::Normal => "Normal",
            Strictness::Creative => "Creative",
        }
    }
}

/// Scoring knobs. Replaced wholesale whenever the user changes a setting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringParams {
    /// Weight of the key sub-score vs the tempo sub-score, 0..=1.
    pub key_weight: f64,
    /// Tempo delta scale, 1..=12. 6 = default breakpoints.
    pub bpm_tolerance: f64,
    /// Also compare against half and double the second tempo.
    pub half_double: bool,
    pub strictness: Strictness,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            key_weight: 0.65,
            bpm_tolerance: 6.0,
            half_double: true,
            strictness: Strictness::Normal,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ParamsError {
    #[error("key weight must be between 0 and 1, got {0}")]
    KeyWeight(f64),
    #[error("BPM tolerance must be between 1 and 12, got {0}")]
    BpmTolerance(f64),
}

impl ScoringParams {
    /// Range check for values coming from config files or the command line.
    /// The scorer itself never validates.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !(0.0..=1.0).contains(&self.key_weight) {
            return Err(ParamsError::KeyWeight(self.key_weight));
        }
        if !(1.0..=12.0).contains(&self.bpm_tolerance) {
            return Err(ParamsError::BpmTolerance(self.bpm_tolerance));
        }
        Ok(())
    }
}

/// Harmonic relation between two keys, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum KeyRelation {
    #[serde(rename = "same")]
    Same,
    #[serde(rename = "adjacent")]
    Adjacent,
    #[serde(rename = "relative")]
    Relative,
    #[serde(rename = "energy+2")]
    EnergyBoost,
    #[serde(rename = "other")]
    Other,
}

impl KeyRelation {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyRelation::Same => "same",
            KeyRelation::Adjacent => "adjacent",
            KeyRelation::Relative => "relative",
            KeyRelation::EnergyBoost => "energy+2",
            KeyRelation::Other => "other",
        }
    }
}

impl fmt::Display for KeyRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which tempo comparison produced the smallest delta. `Double` means the
/// second track runs at twice the first track's tempo, `Half` at half of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BpmMode {
    Direct,
    Half,
    Double,
}

impl BpmMode {
    pub fn as_str(self) -> &'static str {
        match self {
            BpmMode::Direct => "direct",
            BpmMode::Half => "half",
            BpmMode::Double => "double",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyScore {
    pub score: f64,
    pub relation: KeyRelation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BpmScore {
    pub score: f64,
    pub delta: f64,
    pub mode: BpmMode,
}

/// Scored relationship from one track to another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionInsight {
    pub from_id: String,
    pub to_id: String,
    pub key_relation: KeyRelation,
    pub bpm_delta: f64,
    pub bpm_mode: BpmMode,
    pub key_score: f64,
    pub bpm_score: f64,
    pub total_score: f64,
    pub explanation: String,
}

/// Key sub-score. First matching rule wins.
pub fn key_score(from: CamelotKey, to: CamelotKey, strictness: Strictness) -> KeyScore {
    let d = camelot::distance(from, to);

    let (score, relation) = if d.numeric == 0 && d.same_letter {
        (1.0, KeyRelation::Same)
    } else if d.numeric == 1 && d.same_letter {
        (0.9, KeyRelation::Adjacent)
    } else if d.numeric == 0 {
        (0.85, KeyRelation::Relative)
    } else if d.numeric == 2 && d.same_letter && strictness == Strictness::Creative {
        (0.7, KeyRelation::EnergyBoost)
    } else if strictness == Strictness::Strict {
        (0.0, KeyRelation::Other)
    } else {
        (0.2, KeyRelation::Other)
    };

    KeyScore { score, relation }
}

/// Delta breakpoints at tolerance 6, with the score each one grants.
const BPM_BREAKPOINTS: [(f64, f64); 4] = [(1.0, 1.0), (3.0, 0.85), (6.0, 0.65), (10.0, 0.35)];

/// Score beyond the last breakpoint.
const BPM_FLOOR_SCORE: f64 = 0.1;

fn bpm_score_from_delta(delta: f64, tolerance: f64) -> f64 {
    let scale = tolerance / 6.0;
    BPM_BREAKPOINTS
        .iter()
        .find(|&&(limit, _)| delta <= limit * scale)
        .map(|&(_, score)| score)
        .unwrap_or(BPM_FLOOR_SCORE)
}

/// Tempo sub-score.
///
/// Only the second tempo is halved/doubled. Callers always pass the
/// currently playing track first, so the comparison is not symmetric.
/// Candidates are checked direct first; a later one only wins when its
/// delta is strictly smaller.
pub fn bpm_score(bpm1: f64, bpm2: f64, params: &ScoringParams) -> BpmScore {
    let mut best_delta = (bpm1 - bpm2).abs();
    let mut best_mode = BpmMode::Direct;

    if params.half_double {
        for (candidate, mode) in [(bpm2 / 2.0, BpmMode::Double), (bpm2 * 2.0, BpmMode::Half)] {
            let delta = (bpm1 - candidate).abs();
            if delta < best_delta {
                best_delta = delta;
                best_mode = mode;
            }
        }
    }

    BpmScore {
        score: bpm_score_from_delta(best_delta, params.bpm_tolerance),
        delta: best_delta,
        mode: best_mode,
    }
}

/// Score a transition between two resolved keys/tempos.
///
/// Callers filter out incomplete tracks first; this function assumes both
/// sides are known.
pub fn score_transition(
    from_id: &str,
    to_id: &str,
    from_key: CamelotKey,
    to_key: CamelotKey,
    from_bpm: f64,
    to_bpm: f64,
    params: &ScoringParams,
) -> TransitionInsight {
    let key = key_score(from_key, to_key, params.strictness);
    let bpm = bpm_score(from_bpm, to_bpm, params);
    let total_score = params.key_weight * key.score + (1.0 - params.key_weight) * bpm.score;

    let mode_label = match bpm.mode {
        BpmMode::Direct => String::new(),
        mode => format!(" {}-time", mode.as_str()),
    };
    let explanation = format!(
        "Key: {} ({}→{}), BPM{} Δ={:.1}",
        key.relation, from_key, to_key, mode_label, bpm.delta
    );

    TransitionInsight {
        from_id: from_id.to_string(),
        to_id: to_id.to_string(),
        key_relation: key.relation,
        bpm_delta: bpm.delta,
        bpm_mode: bpm.mode,
        key_score: key.score,
        bpm_score: bpm.score,
        total_score,
        explanation,
    }
}

/// A complete track together with its resolved key and tempo. Only these are
/// ever handed to the scorer.
#[derive(Debug, Clone, Copy)]
pub struct Mixable<'a> {
    pub track: &'a Track,
    pub key: CamelotKey,
    pub bpm: f64,
}

impl<'a> Mixable<'a> {
    pub fn new(track: &'a Track) -> Option<Self> {
        let (key, bpm) = track.mix_point()?;
        Some(Self { track, key, bpm })
    }
}

/// Complete tracks of `tracks`, in input order.
pub fn mixable(tracks: &[Track]) -> Vec<Mixable<'_>> {
    tracks.iter().filter_map(Mixable::new).collect()
}

/// Score a transition between two complete tracks.
pub fn score_pair(from: &Mixable<'_>, to: &Mixable<'_>, params: &ScoringParams) -> TransitionInsight {
    score_transition(
        &from.track.id,
        &to.track.id,
        from.key,
        to.key,
        from.bpm,
        to.bpm,
        params,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> CamelotKey {
        CamelotKey::parse(s).unwrap()
    }

    fn params() -> ScoringParams {
        ScoringParams::default()
    }

    #[test]
    fn test_same_key_for_every_position() {
        for k in camelot::all_keys() {
            for s in [Strictness::Strict, Strictness::Normal, Strictness::Creative] {
                let ks = key_score(k, k, s);
                assert_eq!(ks.score, 1.0);
                assert_eq!(ks.relation, KeyRelation::Same);
            }
        }
    }

    #[test]
    fn test_adjacent_and_relative() {
        let adj = key_score(key("8A"), key("9A"), Strictness::Normal);
        assert_eq!((adj.score, adj.relation), (0.9, KeyRelation::Adjacent));

        let wrap = key_score(key("12B"), key("1B"), Strictness::Strict);
        assert_eq!(wrap.relation, KeyRelation::Adjacent);

        let rel = key_score(key("8A"), key("8B"), Strictness::Normal);
        assert_eq!((rel.score, rel.relation), (0.85, KeyRelation::Relative));
    }

    #[test]
    fn test_energy_boost_only_when_creative() {
        let creative = key_score(key("8A"), key("10A"), Strictness::Creative);
        assert_eq!((creative.score, creative.relation), (0.7, KeyRelation::EnergyBoost));

        let normal = key_score(key("8A"), key("10A"), Strictness::Normal);
        assert_eq!((normal.score, normal.relation), (0.2, KeyRelation::Other));

        // Cross-ring two steps away is never an energy move
        let cross = key_score(key("8A"), key("10B"), Strictness::Creative);
        assert_eq!(cross.relation, KeyRelation::Other);
    }

    #[test]
    fn test_other_depends_on_strictness() {
        let strict = key_score(key("8A"), key("2A"), Strictness::Strict);
        assert_eq!((strict.score, strict.relation), (0.0, KeyRelation::Other));

        let normal = key_score(key("8A"), key("2A"), Strictness::Normal);
        assert_eq!((normal.score, normal.relation), (0.2, KeyRelation::Other));
    }

    #[test]
    fn test_bpm_small_delta() {
        let s = bpm_score(120.0, 121.0, &params());
        assert_eq!(s.score, 1.0);
        assert_eq!(s.mode, BpmMode::Direct);
        assert!((s.delta - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bpm_double_time() {
        let s = bpm_score(120.0, 240.0, &params());
        assert_eq!(s.mode, BpmMode::Double);
        assert_eq!(s.delta, 0.0);
        assert_eq!(s.score, 1.0);

        let s = bpm_score(120.0, 60.0, &params());
        assert_eq!(s.mode, BpmMode::Half);
        assert_eq!(s.delta, 0.0);
        assert_eq!(s.score, 1.0);
    }

    #[test]
    fn test_bpm_half_double_disabled() {
        let p = ScoringParams {
            half_double: false,
            ..params()
        };
        let s = bpm_score(120.0, 240.0, &p);
        assert_eq!(s.mode, BpmMode::Direct);
        assert_eq!(s.delta, 120.0);
        assert_eq!(s.score, BPM_FLOOR_SCORE);
    }

    #[test]
    fn test_bpm_ties_prefer_direct() {
        // Equal tempos: direct delta is 0 and nothing can beat it
        let s = bpm_score(100.0, 100.0, &params());
        assert_eq!(s.mode, BpmMode::Direct);
    }

    #[test]
    fn test_bpm_breakpoints() {
        let p = params();
        assert_eq!(bpm_score(120.0, 123.0, &p).score, 0.85);
        assert_eq!(bpm_score(120.0, 126.0, &p).score, 0.65);
        assert_eq!(bpm_score(120.0, 130.0, &p).score, 0.35);
        assert_eq!(bpm_score(120.0, 131.0, &p).score, 0.1);
    }

    #[test]
    fn test_bpm_tolerance_scales_breakpoints() {
        let tight = ScoringParams {
            bpm_tolerance: 3.0,
            ..params()
        };
        // scale 0.5: 2 BPM now lands past the 1.5 breakpoint
        assert_eq!(bpm_score(120.0, 122.0, &tight).score, 0.65);

        let loose = ScoringParams {
            bpm_tolerance: 12.0,
            ..params()
        };
        assert_eq!(bpm_score(120.0, 122.0, &loose).score, 1.0);
    }

    #[test]
    fn test_blended_total_and_explanation() {
        let t = score_transition("a", "b", key("8A"), key("9A"), 128.0, 126.0, &params());
        // 0.65 * 0.9 + 0.35 * 0.85
        assert!((t.total_score - 0.8825).abs() < 1e-9);
        assert_eq!(t.explanation, "Key: adjacent (8A→9A), BPM Δ=2.0");
        assert_eq!(t.from_id, "a");
        assert_eq!(t.to_id, "b");

        let t = score_transition("a", "b", key("8A"), key("8A"), 87.0, 174.0, &params());
        assert_eq!(t.explanation, "Key: same (8A→8A), BPM double-time Δ=0.0");
    }

    #[test]
    fn test_key_weight_extremes() {
        let keys_only = ScoringParams {
            key_weight: 1.0,
            ..params()
        };
        let t = score_transition("a", "b", key("8A"), key("8B"), 90.0, 140.0, &keys_only);
        assert!((t.total_score - 0.85).abs() < 1e-9);

        let tempo_only = ScoringParams {
            key_weight: 0.0,
            ..params()
        };
        let t = score_transition("a", "b", key("8A"), key("2A"), 128.0, 128.0, &tempo_only);
        assert!((t.total_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_mixable_skips_incomplete() {
        let tracks = vec![
            Track::new(Some("a"), None, Some("120"), Some("8A")),
            Track::new(Some("b"), None, None, Some("8A")),
            Track::new(Some("c"), None, Some("122"), Some("nonsense")),
            Track::new(Some("d"), None, Some("124"), Some("9A")),
        ];
        let m = mixable(&tracks);
        let titles: Vec<&str> = m.iter().map(|x| x.track.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "d"]);

        let t = score_pair(&m[0], &m[1], &params());
        assert_eq!(t.from_id, tracks[0].id);
        assert_eq!(t.to_id, tracks[3].id);
        assert_eq!(t.key_relation, KeyRelation::Adjacent);
    }

    #[test]
    fn test_validate() {
        assert!(params().validate().is_ok());
        let bad = ScoringParams {
            key_weight: 1.5,
            ..params()
        };
        assert_eq!(bad.validate(), Err(ParamsError::KeyWeight(1.5)));
        let bad = ScoringParams {
            bpm_tolerance: 0.5,
            ..params()
        };
        assert_eq!(bad.validate(), Err(ParamsError::BpmTolerance(0.5)));
    }
}
