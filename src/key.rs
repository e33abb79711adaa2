//! Free-text musical key → Camelot normalization.
//!
//! Accepts what DJ software and taggers actually write into key fields:
//! `"Am"`, `"C# minor"`, `"E♭ maj"`, `"Bbm"`, or an already-Camelot `"8A"`.

use regex::Regex;
use std::sync::LazyLock;

use crate::camelot::{self, CamelotKey, Mode};

/// Result of normalizing a raw key string.
///
/// An all-empty value means "unknown key" and is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedKey {
    /// Uppercase `"TONIC MODE"` (sharps only), or the Camelot string for Camelot input.
    pub canonical: Option<String>,
    pub camelot: Option<CamelotKey>,
    /// Display form such as `"C#m"`; empty when nothing could be parsed.
    pub pretty: String,
}

impl NormalizedKey {
    pub fn is_resolved(&self) -> bool {
        self.camelot.is_some()
    }
}

/// Values some exporters write into empty key fields.
const SENTINELS: &[&str] = &["NA", "None"];

static CAMELOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(1[0-2]|[1-9])[AB]$").unwrap());

static MINOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"MINOR|MIN\b").unwrap());

static MAJOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"MAJOR|MAJ\b").unwrap());

static MODE_WORDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*(major|maj|minor|min)\s*").unwrap());

// "Am", "C#m", "Ebm": tonic letter, optional accidental, bare m
static BARE_MINOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-G][#b]?[Mm]$").unwrap());

static TONIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<letter>[A-Ga-g])(?P<accidental>[#b]?)").unwrap());

/// Flat spellings → sharp equivalents used by the key table.
fn sharp_equivalent(tonic: &str) -> Option<&'static str> {
    match tonic {
        "Db" => Some("C#"),
        "Eb" => Some("D#"),
        "Gb" => Some("F#"),
        "Ab" => Some("G#"),
        "Bb" => Some("A#"),
        _ => None,
    }
}

/// Normalize a raw key string. Pure: the same input always yields the same output.
pub fn normalize(raw: Option<&str>) -> NormalizedKey {
    let Some(raw) = raw else {
        return NormalizedKey::default();
    };
    let s = raw.trim();
    if s.is_empty() || SENTINELS.contains(&s) {
        return NormalizedKey::default();
    }

    if CAMELOT_RE.is_match(s) {
        let upper = s.to_uppercase();
        return NormalizedKey {
            canonical: Some(upper.clone()),
            camelot: CamelotKey::parse(&upper),
            pretty: upper,
        };
    }

    let s = s.replace('♭', "b").replace('♯', "#");
    let mode = detect_mode(&s);

    let Some(caps) = TONIC_RE.captures(&s) else {
        return NormalizedKey::default();
    };
    let tonic = format!(
        "{}{}",
        caps["letter"].to_ascii_uppercase(),
        &caps["accidental"]
    );
    let tonic = sharp_equivalent(&tonic).map(str::to_string).unwrap_or(tonic);

    NormalizedKey {
        canonical: Some(format!("{} {}", tonic.to_uppercase(), mode.as_str())),
        camelot: camelot::lookup(&tonic, mode),
        pretty: camelot::pretty_key(&tonic, mode),
    }
}

/// Mode from an explicit keyword, else from a bare trailing `m`. Defaults to major.
fn detect_mode(s: &str) -> Mode {
    let upper = s.to_uppercase();
    if MINOR_RE.is_match(&upper) {
        return Mode::Minor;
    }
    if MAJOR_RE.is_match(&upper) {
        return Mode::Major;
    }

    let stripped = MODE_WORDS_RE.replace_all(s, "");
    let stripped = stripped.trim();
    if BARE_MINOR_RE.is_match(stripped) && !stripped.to_uppercase().ends_with("MA") {
        Mode::Minor
    } else {
        Mode::Major
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camelot_of(raw: &str) -> Option<String> {
        normalize(Some(raw)).camelot.map(|k| k.to_string())
    }

    #[test]
    fn test_absent_and_sentinels() {
        assert_eq!(normalize(None), NormalizedKey::default());
        for raw in ["", "   ", "NA", "None"] {
            assert_eq!(normalize(Some(raw)), NormalizedKey::default(), "{raw:?}");
        }
    }

    #[test]
    fn test_camelot_passthrough_is_idempotent() {
        for k in camelot::all_keys() {
            let s = k.to_string();
            let n = normalize(Some(&s));
            assert_eq!(n.camelot, Some(k));
            assert_eq!(n.canonical.as_deref(), Some(s.as_str()));
            assert_eq!(n.pretty, s);
        }
        assert_eq!(camelot_of("11b").as_deref(), Some("11B"));
    }

    #[test]
    fn test_pretty_round_trip() {
        for info in camelot::KEY_TABLE.iter() {
            let n = normalize(Some(&info.pretty()));
            assert_eq!(n.camelot, Some(info.camelot), "{}", info.pretty());
        }
    }

    #[test]
    fn test_flat_spellings_round_trip() {
        for info in camelot::KEY_TABLE.iter() {
            if let Some(flat) = info.flat_tonic {
                let raw = camelot::pretty_key(flat, info.mode);
                assert_eq!(normalize(Some(&raw)).camelot, Some(info.camelot), "{raw}");
            }
        }
    }

    #[test]
    fn test_bare_m_suffix() {
        assert_eq!(camelot_of("Am").as_deref(), Some("8A"));
        assert_eq!(camelot_of("F#m").as_deref(), Some("11A"));
        assert_eq!(camelot_of("Bbm").as_deref(), Some("3A"));
        assert_eq!(camelot_of("C").as_deref(), Some("8B"));
    }

    #[test]
    fn test_mode_keywords() {
        assert_eq!(camelot_of("A minor").as_deref(), Some("8A"));
        assert_eq!(camelot_of("A Major").as_deref(), Some("11B"));
        assert_eq!(camelot_of("c# min").as_deref(), Some("12A"));
        assert_eq!(camelot_of("Eb maj").as_deref(), Some("5B"));
        assert_eq!(camelot_of("G MINOR").as_deref(), Some("6A"));
    }

    #[test]
    fn test_unicode_accidentals() {
        assert_eq!(camelot_of("E♭m").as_deref(), Some("2A"));
        assert_eq!(camelot_of("F♯").as_deref(), Some("2B"));
    }

    #[test]
    fn test_canonical_and_pretty() {
        let n = normalize(Some("Dbm"));
        assert_eq!(n.canonical.as_deref(), Some("C# MINOR"));
        assert_eq!(n.pretty, "C#m");
        assert_eq!(n.camelot.map(|k| k.to_string()).as_deref(), Some("12A"));
    }

    #[test]
    fn test_tonic_without_table_entry() {
        // Cb is parsed but has no sharp-only table entry
        let n = normalize(Some("Cb"));
        assert!(n.camelot.is_none());
        assert_eq!(n.pretty, "Cb");
        assert_eq!(n.canonical.as_deref(), Some("CB MAJOR"));
    }

    #[test]
    fn test_no_tonic_is_fully_empty() {
        assert_eq!(normalize(Some("unknown")), NormalizedKey::default());
        assert_eq!(normalize(Some("13A")), NormalizedKey::default());
    }
}
