//! Camelot wheel model: 12 positions × 2 modes.
//!
//! `A` is the minor ring, `B` the major ring. Numbers wrap (12 sits next to 1)
//! and each number has exactly one relative partner on the other ring.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::scoring::Strictness;

/// Number of positions on each ring of the wheel.
pub const WHEEL_SIZE: u8 = 12;

/// Ring of the wheel. `A` = minor, `B` = major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Letter {
    A,
    B,
}

impl Letter {
    pub fn other(self) -> Self {
        match self {
            Letter::A => Letter::B,
            Letter::B => Letter::A,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }

    pub fn mode(self) -> Mode {
        match self {
            Letter::A => Mode::Minor,
            Letter::B => Mode::Major,
        }
    }
}

/// Scale mode of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Major => "MAJOR",
            Mode::Minor => "MINOR",
        }
    }

    pub fn letter(self) -> Letter {
        match self {
            Mode::Minor => Letter::A,
            Mode::Major => Letter::B,
        }
    }
}

/// One of the 24 wheel positions. Construction always validates the number,
/// so any value of this type is a legal key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CamelotKey {
    number: u8,
    letter: Letter,
}

impl CamelotKey {
    pub fn new(number: u8, letter: Letter) -> Option<Self> {
        if (1..=WHEEL_SIZE).contains(&number) {
            Some(Self { number, letter })
        } else {
            None
        }
    }

    /// Parse `"8A"`, `"12b"` etc. Surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let last = s.chars().last()?;
        let letter = match last.to_ascii_uppercase() {
            'A' => Letter::A,
            'B' => Letter::B,
            _ => return None,
        };
        let digits = &s[..s.len() - 1];
        // Reject signs, leading zeros and anything that isn't plain digits.
        if digits.is_empty()
            || digits.starts_with('0')
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }
        let number: u8 = digits.parse().ok()?;
        Self::new(number, letter)
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn letter(&self) -> Letter {
        self.letter
    }

    /// Same number, other ring.
    pub fn relative(&self) -> Self {
        Self {
            number: self.number,
            letter: self.letter.other(),
        }
    }

    /// Move `steps` positions around the ring, wrapping at 12↔1.
    pub fn shifted(&self, steps: i32) -> Self {
        let n = WHEEL_SIZE as i32;
        let zero_based = (self.number as i32 - 1 + steps).rem_euclid(n);
        Self {
            number: zero_based as u8 + 1,
            letter: self.letter,
        }
    }

    /// Tonic, mode and display name for this position.
    pub fn info(&self) -> &'static KeyInfo {
        let offset = match self.letter {
            Letter::A => 0,
            Letter::B => WHEEL_SIZE as usize,
        };
        &KEY_TABLE[offset + self.number as usize - 1]
    }
}

impl fmt::Display for CamelotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.letter.as_char())
    }
}

impl Serialize for CamelotKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Circular distance between two keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Distance {
    /// Minimum of forward/backward steps around the ring (0..=6).
    pub numeric: u8,
    pub same_letter: bool,
}

pub fn distance(a: CamelotKey, b: CamelotKey) -> Distance {
    let diff = a.number.abs_diff(b.number);
    Distance {
        numeric: diff.min(WHEEL_SIZE - diff),
        same_letter: a.letter == b.letter,
    }
}

/// Keys considered mixable from `key`: itself, ±1 on the same ring, the
/// relative key, and ±2 on the same ring under `Creative` strictness.
/// Order is stable and duplicates are removed.
pub fn neighbors(key: CamelotKey, strictness: Strictness) -> Vec<CamelotKey> {
    let mut candidates = vec![key, key.shifted(-1), key.shifted(1), key.relative()];
    if strictness == Strictness::Creative {
        candidates.push(key.shifted(-2));
        candidates.push(key.shifted(2));
    }

    let mut out = Vec::with_capacity(candidates.len());
    for k in candidates {
        if !out.contains(&k) {
            out.push(k);
        }
    }
    out
}

/// A row of the 24-entry key table.
#[derive(Debug)]
pub struct KeyInfo {
    pub camelot: CamelotKey,
    /// Tonic spelled with sharps only, as used in canonical key strings.
    pub tonic: &'static str,
    /// Flat spelling of the tonic, where one is in common use.
    pub flat_tonic: Option<&'static str>,
    pub mode: Mode,
}

impl KeyInfo {
    /// `"C# MINOR"`
    pub fn canonical(&self) -> String {
        format!("{} {}", self.tonic, self.mode.as_str())
    }

    /// `"C#m"` for minor, `"C#"` for major.
    pub fn pretty(&self) -> String {
        pretty_key(self.tonic, self.mode)
    }
}

pub(crate) fn pretty_key(tonic: &str, mode: Mode) -> String {
    match mode {
        Mode::Minor => format!("{tonic}m"),
        Mode::Major => tonic.to_string(),
    }
}

const fn entry(
    number: u8,
    letter: Letter,
    tonic: &'static str,
    flat_tonic: Option<&'static str>,
) -> KeyInfo {
    let mode = match letter {
        Letter::A => Mode::Minor,
        Letter::B => Mode::Major,
    };
    KeyInfo {
        camelot: CamelotKey { number, letter },
        tonic,
        flat_tonic,
        mode,
    }
}

/// Minor ring (1A..12A) followed by major ring (1B..12B).
pub static KEY_TABLE: [KeyInfo; 24] = [
    entry(1, Letter::A, "G#", Some("Ab")),
    entry(2, Letter::A, "D#", Some("Eb")),
    entry(3, Letter::A, "A#", Some("Bb")),
    entry(4, Letter::A, "F", None),
    entry(5, Letter::A, "C", None),
    entry(6, Letter::A, "G", None),
    entry(7, Letter::A, "D", None),
    entry(8, Letter::A, "A", None),
    entry(9, Letter::A, "E", None),
    entry(10, Letter::A, "B", None),
    entry(11, Letter::A, "F#", Some("Gb")),
    entry(12, Letter::A, "C#", Some("Db")),
    entry(1, Letter::B, "B", None),
    entry(2, Letter::B, "F#", Some("Gb")),
    entry(3, Letter::B, "C#", Some("Db")),
    entry(4, Letter::B, "G#", Some("Ab")),
    entry(5, Letter::B, "D#", Some("Eb")),
    entry(6, Letter::B, "A#", Some("Bb")),
    entry(7, Letter::B, "F", None),
    entry(8, Letter::B, "C", None),
    entry(9, Letter::B, "G", None),
    entry(10, Letter::B, "D", None),
    entry(11, Letter::B, "A", None),
    entry(12, Letter::B, "E", None),
];

/// Look up a sharp-spelled tonic (`"C#"`, `"A"`) and mode on the wheel.
pub fn lookup(tonic: &str, mode: Mode) -> Option<CamelotKey> {
    KEY_TABLE
        .iter()
        .find(|info| info.mode == mode && info.tonic == tonic)
        .map(|info| info.camelot)
}

/// Every wheel position, minor ring first.
pub fn all_keys() -> impl Iterator<Item = CamelotKey> {
    KEY_TABLE.iter().map(|info| info.camelot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> CamelotKey {
        CamelotKey::parse(s).unwrap()
    }

    #[test]
    fn test_parse_valid() {
        assert_eq!(key("8A").number(), 8);
        assert_eq!(key("8A").letter(), Letter::A);
        assert_eq!(key("12b").to_string(), "12B");
        assert_eq!(key(" 1B ").to_string(), "1B");
    }

    #[test]
    fn test_parse_invalid() {
        for s in ["", "A", "0A", "13A", "08A", "8C", "8", "-1A", "+1A", "1.5A"] {
            assert!(CamelotKey::parse(s).is_none(), "{s} should not parse");
        }
    }

    #[test]
    fn test_table_covers_every_position_once() {
        let mut seen: Vec<String> = all_keys().map(|k| k.to_string()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 24);
        for k in all_keys() {
            assert_eq!(k.info().camelot, k);
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("A", Mode::Minor), Some(key("8A")));
        assert_eq!(lookup("C", Mode::Major), Some(key("8B")));
        assert_eq!(lookup("C#", Mode::Minor), Some(key("12A")));
        assert_eq!(lookup("Db", Mode::Minor), None);
    }

    #[test]
    fn test_distance_wraps() {
        assert_eq!(distance(key("12A"), key("1A")).numeric, 1);
        assert_eq!(distance(key("1A"), key("11A")).numeric, 2);
        assert_eq!(distance(key("3B"), key("9B")).numeric, 6);
        assert_eq!(distance(key("8A"), key("8A")).numeric, 0);
        assert!(!distance(key("8A"), key("8B")).same_letter);
        assert!(distance(key("8A"), key("9A")).same_letter);
    }

    #[test]
    fn test_shifted_wraps() {
        assert_eq!(key("12A").shifted(1), key("1A"));
        assert_eq!(key("1B").shifted(-1), key("12B"));
        assert_eq!(key("2A").shifted(-14), key("12A"));
    }

    #[test]
    fn test_neighbors_normal() {
        let n = neighbors(key("1A"), Strictness::Normal);
        let names: Vec<String> = n.iter().map(|k| k.to_string()).collect();
        assert_eq!(names, vec!["1A", "12A", "2A", "1B"]);
        assert_eq!(neighbors(key("1A"), Strictness::Strict), n);
    }

    #[test]
    fn test_neighbors_creative_adds_energy_steps() {
        let n = neighbors(key("8B"), Strictness::Creative);
        let names: Vec<String> = n.iter().map(|k| k.to_string()).collect();
        assert_eq!(names, vec!["8B", "7B", "9B", "8A", "6B", "10B"]);
    }

    #[test]
    fn test_pretty_and_canonical() {
        let info = key("12A").info();
        assert_eq!(info.pretty(), "C#m");
        assert_eq!(info.canonical(), "C# MINOR");
        assert_eq!(key("8B").info().pretty(), "C");
    }
}
