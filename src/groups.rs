//! Mixable groups: tracks that share a narrow tempo band and sit within one
//! harmonic neighborhood of each other on the Camelot wheel.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::camelot::{self, CamelotKey};
use crate::library::Track;
use crate::scoring::{self, Strictness};

/// Default tempo band width in BPM.
pub const DEFAULT_BPM_BAND: f64 = 4.0;

/// Label keys shown before the tempo range.
const LABEL_KEYS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixableGroup {
    /// e.g. `"8A/7A/9A @ 120–123"`
    pub label: String,
    /// Neighborhood keys that occur in the track set, neighbor order.
    pub camelots: Vec<CamelotKey>,
    /// Lowest and highest tempo in the group.
    pub bpm_range: (f64, f64),
    pub tracks: Vec<Track>,
}

/// Group complete tracks by tempo band and key neighborhood.
///
/// Bands are `floor(bpm / band_width) * band_width`, visited ascending. Inside
/// a band, every distinct key of the whole set (first-seen order) pulls in the
/// band's tracks whose key is one of its neighbors. Groups need two tracks;
/// a track set already emitted under another key is skipped. Output is sorted
/// by size, largest first, ties in discovery order.
pub fn mixable_groups(tracks: &[Track], strictness: Strictness, band_width: f64) -> Vec<MixableGroup> {
    let pool = scoring::mixable(tracks);
    if pool.len() < 2 || !band_width.is_finite() || band_width <= 0.0 {
        return Vec::new();
    }

    let band_of = |bpm: f64| (bpm / band_width).floor() as i64;
    let bands: BTreeSet<i64> = pool.iter().map(|m| band_of(m.bpm)).collect();

    let mut keys: Vec<CamelotKey> = Vec::new();
    for m in &pool {
        if !keys.contains(&m.key) {
            keys.push(m.key);
        }
    }

    let mut groups = Vec::new();
    let mut seen: HashSet<Vec<String>> = HashSet::new();

    for band in bands {
        let band_tracks: Vec<_> = pool.iter().filter(|m| band_of(m.bpm) == band).collect();
        if band_tracks.len() < 2 {
            continue;
        }

        for &key in &keys {
            let hood = camelot::neighbors(key, strictness);
            let members: Vec<_> = band_tracks
                .iter()
                .filter(|m| hood.contains(&m.key))
                .copied()
                .collect();
            if members.len() < 2 {
                continue;
            }

            let mut ids: Vec<String> = members.iter().map(|m| m.track.id.clone()).collect();
            ids.sort_unstable();
            if !seen.insert(ids) {
                continue;
            }

            let lo = members.iter().map(|m| m.bpm).fold(f64::INFINITY, f64::min);
            let hi = members.iter().map(|m| m.bpm).fold(f64::NEG_INFINITY, f64::max);
            let present: Vec<CamelotKey> = hood.into_iter().filter(|k| keys.contains(k)).collect();
            let label = format!(
                "{} @ {}–{}",
                present
                    .iter()
                    .take(LABEL_KEYS)
                    .map(|k| k.to_string())
                    .collect::<Vec<_>>()
                    .join("/"),
                lo.round(),
                hi.round()
            );

            groups.push(MixableGroup {
                label,
                camelots: present,
                bpm_range: (lo, hi),
                tracks: members.iter().map(|m| m.track.clone()).collect(),
            });
        }
    }

    groups.sort_by(|a, b| b.tracks.len().cmp(&a.tracks.len()));
    log::debug!("Found {} mixable groups", groups.len());
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str, bpm: &str, key: &str) -> Track {
        Track::new(Some(title), Some("Artist"), Some(bpm), Some(key))
    }

    fn titles(g: &MixableGroup) -> Vec<&str> {
        g.tracks.iter().map(|t| t.title.as_str()).collect()
    }

    fn sample() -> Vec<Track> {
        vec![
            track("a", "120", "8A"),
            track("b", "121", "9A"),
            track("c", "122", "8B"),
            track("d", "121", "3A"),
            track("e", "130", "8A"),
        ]
    }

    #[test]
    fn test_groups_by_band_and_neighborhood() {
        let groups = mixable_groups(&sample(), Strictness::Normal, DEFAULT_BPM_BAND);
        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["8A/9A/8B @ 120–122", "9A/8A @ 120–121", "8B/8A @ 120–122"]);

        assert_eq!(titles(&groups[0]), vec!["a", "b", "c"]);
        assert_eq!(groups[0].bpm_range, (120.0, 122.0));
        assert_eq!(groups[0].camelots.len(), 3);
        assert_eq!(titles(&groups[1]), vec!["a", "b"]);
        assert_eq!(titles(&groups[2]), vec!["a", "c"]);
    }

    #[test]
    fn test_duplicate_track_sets_collapse() {
        let tracks = vec![track("a", "124", "5A"), track("b", "125", "5A")];
        let groups = mixable_groups(&tracks, Strictness::Normal, DEFAULT_BPM_BAND);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label, "5A @ 124–125");
    }

    #[test]
    fn test_creative_widens_neighborhood() {
        let tracks = vec![track("a", "124", "5A"), track("b", "125", "7A")];
        assert!(mixable_groups(&tracks, Strictness::Normal, DEFAULT_BPM_BAND).is_empty());
        let creative = mixable_groups(&tracks, Strictness::Creative, DEFAULT_BPM_BAND);
        assert_eq!(creative.len(), 1);
        assert_eq!(titles(&creative[0]), vec!["a", "b"]);
    }

    #[test]
    fn test_band_boundaries() {
        // 123.9 and 124.0 fall in different 4-BPM bands
        let tracks = vec![track("a", "123.9", "5A"), track("b", "124.0", "5A")];
        assert!(mixable_groups(&tracks, Strictness::Normal, DEFAULT_BPM_BAND).is_empty());
        assert_eq!(mixable_groups(&tracks, Strictness::Normal, 8.0).len(), 1);
    }

    #[test]
    fn test_incomplete_tracks_ignored() {
        let tracks = vec![
            track("a", "124", "5A"),
            Track::new(Some("b"), None, Some("124"), None),
            Track::new(Some("c"), None, None, Some("5A")),
        ];
        assert!(mixable_groups(&tracks, Strictness::Normal, DEFAULT_BPM_BAND).is_empty());
        assert!(mixable_groups(&[], Strictness::Normal, DEFAULT_BPM_BAND).is_empty());
    }
}
