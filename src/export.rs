//! Plain-text renderings of an ordered set: CSV for spreadsheets and extended
//! M3U for players.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::sequencer::SetVariant;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    M3u,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::M3u => "m3u",
        }
    }

    pub fn render(self, variant: &SetVariant) -> String {
        match self {
            ExportFormat::Csv => to_csv(variant),
            ExportFormat::M3u => to_m3u(variant),
        }
    }
}

pub const CSV_HEADER: &str = "Title,Artist,BPM,Camelot,OriginalKey";

/// One row per track in set order. Unknown values are empty cells.
pub fn to_csv(variant: &SetVariant) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for t in &variant.tracks {
        let bpm = t.bpm.map(|b| format!("{b:.1}")).unwrap_or_default();
        let camelot = t.camelot.map(|k| k.to_string()).unwrap_or_default();
        let _ = writeln!(
            out,
            "{},{},{},{},{}",
            quote(&t.title),
            quote(&t.artist),
            bpm,
            camelot,
            t.raw_key.as_deref().unwrap_or("")
        );
    }
    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Extended M3U. Library exports carry no file locations, so each entry is
/// named after the track title.
pub fn to_m3u(variant: &SetVariant) -> String {
    let mut out = String::from("#EXTM3U\n");
    for t in &variant.tracks {
        let _ = writeln!(out, "#EXTINF:-1,{} - {}", t.artist, t.title);
        let _ = writeln!(out, "{}.mp3", t.title);
    }
    out
}

/// `"Balanced Flow"` → `"Balanced_Flow.csv"`.
pub fn default_file_name(variant: &SetVariant, format: ExportFormat) -> String {
    format!("{}.{}", variant.label.replace(' ', "_"), format.extension())
}

/// Render `variant` and write it to `path`.
pub fn write(variant: &SetVariant, format: ExportFormat, path: &Path) -> Result<(), ExportError> {
    std::fs::write(path, format.render(variant)).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Wrote {} tracks to {}", variant.tracks.len(), path.display());
    Ok(())
}
