pub mod playlist;
pub mod xml;

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::camelot::CamelotKey;
use crate::key;
pub use playlist::PlaylistNode;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error at byte {position}: {source}")]
    Xml {
        position: u64,
        source: quick_xml::Error,
    },
}

/// A track resolved from a library export. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    /// Stable id hashed from title, artist, raw tempo and raw key.
    pub id: String,
    pub title: String,
    pub artist: String,
    pub bpm: Option<f64>,
    pub raw_key: Option<String>,
    pub canonical_key: Option<String>,
    pub camelot: Option<CamelotKey>,
    /// Display key such as `"C#m"`; empty when the key is unknown.
    pub pretty_key: String,
}

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

impl Track {
    /// Build a track from already-extracted field values. Blank or sentinel
    /// values should have been dropped to `None` by the caller.
    pub fn new(
        title: Option<&str>,
        artist: Option<&str>,
        bpm_raw: Option<&str>,
        key_raw: Option<&str>,
    ) -> Self {
        let title = title.unwrap_or(UNKNOWN_TITLE).to_string();
        let artist = artist.unwrap_or(UNKNOWN_ARTIST).to_string();
        let bpm = bpm_raw.and_then(parse_bpm);
        let normalized = key::normalize(key_raw);
        let id = track_id(&title, &artist, bpm_raw.unwrap_or(""), key_raw.unwrap_or(""));

        Track {
            id,
            title,
            artist,
            bpm,
            raw_key: key_raw.map(str::to_string),
            canonical_key: normalized.canonical,
            camelot: normalized.camelot,
            pretty_key: normalized.pretty,
        }
    }

    /// Both tempo and Camelot key are known. Only complete tracks are scored.
    pub fn is_complete(&self) -> bool {
        self.bpm.is_some() && self.camelot.is_some()
    }

    /// Key and tempo of a complete track.
    pub fn mix_point(&self) -> Option<(CamelotKey, f64)> {
        Some((self.camelot?, self.bpm?))
    }
}

/// Tempo must be a finite, positive number.
fn parse_bpm(raw: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Some(v),
        _ => {
            log::debug!("Unparsable tempo {:?}", raw);
            None
        }
    }
}

/// 31-multiplier string hash over UTF-16 units, rendered in base 36.
/// Identical metadata always yields the same id.
pub fn track_id(title: &str, artist: &str, bpm_raw: &str, key_raw: &str) -> String {
    let source = format!("{title}|{artist}|{bpm_raw}|{key_raw}");
    let mut h: i32 = 0;
    for unit in source.encode_utf16() {
        h = h.wrapping_mul(31).wrapping_add(unit as i32);
    }
    to_base36((h as i64).unsigned_abs())
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Parsed library export: every collection track plus the playlist tree.
#[derive(Debug, Default)]
pub struct Collection {
    pub tracks: Vec<Track>,
    /// Source-provided track key (e.g. `TrackID`) → index into `tracks`.
    by_source: HashMap<String, usize>,
    pub playlists: Vec<PlaylistNode>,
}

impl Collection {
    pub fn track_by_source(&self, source_key: &str) -> Option<&Track> {
        self.by_source.get(source_key).map(|&i| &self.tracks[i])
    }

    /// At least one leaf playlist exists anywhere in the tree.
    pub fn has_playlists(&self) -> bool {
        playlist::count_playlists(&self.playlists) > 0
    }

    /// Find a leaf playlist by name or by `/`-joined path from the top of the tree.
    pub fn find_playlist(&self, name_or_path: &str) -> Option<&PlaylistNode> {
        let entries = playlist::flatten(&self.playlists);
        entries
            .iter()
            .find(|(path, _)| path == name_or_path)
            .or_else(|| entries.iter().find(|(_, node)| node.name() == name_or_path))
            .map(|(_, node)| *node)
    }

    /// Tracks referenced by a playlist, in playlist order. References with no
    /// matching collection track are dropped.
    pub fn resolve_playlist(&self, node: &PlaylistNode) -> Vec<Track> {
        let mut tracks = Vec::new();
        for source_key in node.track_refs() {
            match self.track_by_source(source_key) {
                Some(t) => tracks.push(t.clone()),
                None => log::debug!(
                    "Playlist {:?}: no track for key {:?}",
                    node.name(),
                    source_key
                ),
            }
        }
        tracks
    }

    pub fn stats(&self) -> LibraryStats {
        let mut stats = LibraryStats::from_tracks(&self.tracks);
        stats.playlists = playlist::count_playlists(&self.playlists);
        stats
    }
}

/// Counts shown before any scoring happens.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LibraryStats {
    pub total: usize,
    pub complete: usize,
    pub with_key: usize,
    pub with_bpm: usize,
    pub missing_key: usize,
    pub missing_bpm: usize,
    pub playlists: usize,
}

impl LibraryStats {
    pub fn from_tracks(tracks: &[Track]) -> Self {
        let with_key = tracks.iter().filter(|t| t.camelot.is_some()).count();
        let with_bpm = tracks.iter().filter(|t| t.bpm.is_some()).count();
        LibraryStats {
            total: tracks.len(),
            complete: tracks.iter().filter(|t| t.is_complete()).count(),
            with_key,
            with_bpm,
            missing_key: tracks.len() - with_key,
            missing_bpm: tracks.len() - with_bpm,
            playlists: 0,
        }
    }
}

/// Read and parse a library export from disk.
pub fn load(path: &Path) -> Result<Collection, LibraryError> {
    let contents = std::fs::read_to_string(path)?;
    let collection = xml::parse(&contents)?;
    log::info!(
        "Loaded {} tracks, {} playlists from {}",
        collection.tracks.len(),
        playlist::count_playlists(&collection.playlists),
        path.display()
    );
    Ok(collection)
}

/// Built-in 8-track library: assorted minor keys, tempos 92–174, one keyless track.
pub const SAMPLE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<DJ_PLAYLISTS Version="1.0.0">
  <COLLECTION Entries="8">
    <TRACK TrackID="1" Name="Windowlicker" Artist="Aphex Twin" AverageBpm="92.00" Tonality="F#m" />
    <TRACK TrackID="2" Name="Szamar Madar" Artist="Venetian Snares" AverageBpm="174.00" Tonality="Dm" />
    <TRACK TrackID="3" Name="Dead Cities" Artist="The Future Sound of London" AverageBpm="98.00" Tonality="Cm" />
    <TRACK TrackID="4" Name="Theme From Q" Artist="Actress" AverageBpm="124.00" Tonality="Gm" />
    <TRACK TrackID="5" Name="Untitled 7" Artist="Burial" AverageBpm="140.00" Tonality="Bbm" />
    <TRACK TrackID="6" Name="Infolepsy" Artist="Clark" AverageBpm="128.00" Tonality="Em" />
    <TRACK TrackID="7" Name="Cascades" Artist="Objekt" AverageBpm="132.00" Tonality="Am" />
    <TRACK TrackID="8" Name="No Key Track" Artist="Andy Stott" AverageBpm="118.00" Tonality="" />
  </COLLECTION>
  <PLAYLISTS>
    <NODE Type="0" Name="ROOT" Count="2">
      <NODE Type="0" Name="Sets" Count="2">
        <NODE Type="1" Name="Late Night Warehouse" KeyType="0" Entries="4">
          <TRACK Key="1" />
          <TRACK Key="6" />
          <TRACK Key="7" />
          <TRACK Key="4" />
        </NODE>
        <NODE Type="1" Name="Ambient Excursions" KeyType="0" Entries="3">
          <TRACK Key="3" />
          <TRACK Key="5" />
          <TRACK Key="8" />
        </NODE>
      </NODE>
      <NODE Type="1" Name="All Tracks" KeyType="0" Entries="8">
        <TRACK Key="1" /><TRACK Key="2" /><TRACK Key="3" /><TRACK Key="4" />
        <TRACK Key="5" /><TRACK Key="6" /><TRACK Key="7" /><TRACK Key="8" />
      </NODE>
    </NODE>
  </PLAYLISTS>
</DJ_PLAYLISTS>"#;
