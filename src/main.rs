use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use setmix::config::{AppConfig, ScoringOverrides};
use setmix::export::{self, ExportFormat};
use setmix::groups::MixableGroup;
use setmix::library::{self, Collection, Track};
use setmix::scoring::{ScoringParams, Strictness, TransitionInsight};
use setmix::sequencer::SetVariant;
use setmix::session::MixSession;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "setmix", version, about = "Harmonic set builder for DJ library exports")]
struct Cli {
    /// Rekordbox-style XML library export
    #[arg(short, long, global = true)]
    library: Option<PathBuf>,

    /// Use the built-in 8-track sample library
    #[arg(long, global = true, conflicts_with = "library")]
    sample: bool,

    /// Restrict to one playlist (name or ROOT/Folder/Name path)
    #[arg(short, long, global = true)]
    playlist: Option<String>,

    /// Config file (defaults to the XDG config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Weight of key vs tempo, 0..1
    #[arg(long, global = true)]
    key_weight: Option<f64>,

    /// Tempo tolerance, 1..12 (6 = standard)
    #[arg(long, global = true)]
    bpm_tolerance: Option<f64>,

    /// Disable half/double-time tempo matching
    #[arg(long, global = true)]
    no_half_double: bool,

    /// Key strictness
    #[arg(long, value_enum, global = true)]
    strictness: Option<StrictnessArg>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrictnessArg {
    Strict,
    Normal,
    Creative,
}

impl From<StrictnessArg> for Strictness {
    fn from(arg: StrictnessArg) -> Self {
        match arg {
            StrictnessArg::Strict => Strictness::Strict,
            StrictnessArg::Normal => Strictness::Normal,
            StrictnessArg::Creative => Strictness::Creative,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    M3u,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::M3u => ExportFormat::M3u,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show library statistics
    Stats,

    /// List tracks with normalized keys
    Tracks {
        /// Only tracks missing a tempo or key
        #[arg(long)]
        incomplete: bool,
    },

    /// Show the playlist tree
    Playlists,

    /// Normalize key names (e.g. "F#m", "Db major", "8A")
    Key {
        /// Raw key strings
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Best next tracks for a given track
    Matches {
        /// Track id or title (substring match)
        track: String,

        /// Number of results (defaults to config matches_limit)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Build ordered sets (Conservative, Balanced and Adventurous flow)
    Order {
        /// Emit JSON instead of tables
        #[arg(long)]
        json: bool,

        /// Write every variant to a file in this format
        #[arg(long, value_enum)]
        export: Option<FormatArg>,

        /// Directory for exported files
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Find groups of tracks that mix with each other
    Groups {
        /// Tempo band width in BPM (defaults to config group_bpm_band)
        #[arg(long)]
        band: Option<f64>,

        /// Emit JSON instead of a list
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct OrderReport<'a> {
    generated_at: DateTime<Utc>,
    params: &'a ScoringParams,
    variants: &'a [SetVariant],
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    match &cli.command {
        Commands::Key { keys } => print_keys(keys),

        Commands::Stats => {
            let collection = load_collection(&cli, &config)?;
            let stats = collection.stats();
            println!("Library Statistics");
            println!("==================");
            println!("Total tracks:     {}", stats.total);
            println!("Complete:         {}", stats.complete);
            println!("With key:         {}", stats.with_key);
            println!("With BPM:         {}", stats.with_bpm);
            println!("Missing key:      {}", stats.missing_key);
            println!("Missing BPM:      {}", stats.missing_bpm);
            println!("Playlists:        {}", stats.playlists);
        }

        Commands::Playlists => {
            let collection = load_collection(&cli, &config)?;
            if !collection.has_playlists() {
                println!("No playlists in library.");
                return Ok(());
            }
            for line in library::playlist::render_tree(&collection.playlists) {
                println!("{}", line);
            }
        }

        Commands::Tracks { incomplete } => {
            let tracks = active_tracks(&cli, &config)?;
            let shown: Vec<&Track> = tracks
                .iter()
                .filter(|t| !*incomplete || !t.is_complete())
                .collect();
            print_track_table(&shown);
        }

        Commands::Matches { track, limit, json } => {
            let params = resolve_params(&cli, &config)?;
            let tracks = active_tracks(&cli, &config)?;
            let mut session = MixSession::new(tracks, params)
                .with_matches_limit(limit.unwrap_or(config.matches_limit));

            let Some(from) = find_track(session.tracks(), track).cloned() else {
                println!("No track matching \"{}\".", track);
                return Ok(());
            };
            if !from.is_complete() {
                println!("\"{}\" has no key or BPM; it cannot be matched.", from.title);
                return Ok(());
            }

            let matches = session.top_matches(&from.id).to_vec();
            if *json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
            } else {
                println!(
                    "Best transitions from \"{}\" ({}, {} BPM):",
                    from.title,
                    from.pretty_key,
                    fmt_bpm(from.bpm)
                );
                println!();
                print_match_table(&session, &matches);
            }
        }

        Commands::Order { json, export: format_arg, out_dir } => {
            let params = resolve_params(&cli, &config)?;
            let tracks = active_tracks(&cli, &config)?;
            let mut session = MixSession::new(tracks, params);
            let variants = session.variants();

            if variants.is_empty() {
                println!("Need at least two tracks with both key and BPM to build a set.");
                return Ok(());
            }

            if let Some(format) = *format_arg {
                let format = ExportFormat::from(format);
                for v in &variants {
                    let path = out_dir.join(export::default_file_name(v, format));
                    export::write(v, format, &path)
                        .with_context(|| format!("Failed to export {}", v.label))?;
                    if !*json {
                        println!("Wrote {}", path.display());
                    }
                }
            }

            if *json {
                let report = OrderReport {
                    generated_at: Utc::now(),
                    params: session.params(),
                    variants: &variants,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for v in &variants {
                    print_variant(v);
                }
            }
        }

        Commands::Groups { band, json } => {
            let params = resolve_params(&cli, &config)?;
            let tracks = active_tracks(&cli, &config)?;
            let session = MixSession::new(tracks, params);
            let groups = session.groups(band.unwrap_or(config.group_bpm_band));

            if *json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
            } else if groups.is_empty() {
                println!("No mixable groups found.");
            } else {
                print_groups(&groups);
            }
        }
    }

    Ok(())
}

/// Scoring params for the commands that score: CLI > config > default.
fn resolve_params(cli: &Cli, config: &AppConfig) -> Result<ScoringParams> {
    config
        .resolve_params(&ScoringOverrides {
            key_weight: cli.key_weight,
            bpm_tolerance: cli.bpm_tolerance,
            no_half_double: cli.no_half_double,
            strictness: cli.strictness.map(Strictness::from),
        })
        .context("Invalid scoring parameters")
}

/// Resolve the library source: --sample > --library > config file.
fn load_collection(cli: &Cli, config: &AppConfig) -> Result<Collection> {
    if cli.sample {
        return library::xml::parse(library::SAMPLE_XML).context("Failed to parse sample library");
    }
    let path = cli.library.clone().or_else(|| config.library.clone()).ok_or_else(|| {
        anyhow::anyhow!("No library given. Pass --library, --sample, or set library in config.")
    })?;
    log::info!("Library: {}", path.display());
    library::load(&path).with_context(|| format!("Failed to load library {}", path.display()))
}

/// The whole collection, or one playlist's tracks in playlist order.
fn active_tracks(cli: &Cli, config: &AppConfig) -> Result<Vec<Track>> {
    let collection = load_collection(cli, config)?;
    let Some(name) = cli.playlist.as_deref() else {
        return Ok(collection.tracks);
    };
    let node = collection
        .find_playlist(name)
        .with_context(|| format!("No playlist named \"{}\"", name))?;
    Ok(collection.resolve_playlist(node))
}

/// Exact id match first, then case-insensitive title substring.
fn find_track<'a>(tracks: &'a [Track], query: &str) -> Option<&'a Track> {
    let needle = query.to_lowercase();
    tracks
        .iter()
        .find(|t| t.id == query)
        .or_else(|| tracks.iter().find(|t| t.title.to_lowercase().contains(&needle)))
}

/// Shorten to `max` characters with a trailing "...".
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

fn fmt_bpm(bpm: Option<f64>) -> String {
    bpm.map(|b| format!("{:.1}", b)).unwrap_or_else(|| "-".to_string())
}

fn fmt_camelot(t: &Track) -> String {
    t.camelot.map(|k| k.to_string()).unwrap_or_else(|| "-".to_string())
}

fn print_keys(keys: &[String]) {
    println!("{:<16} {:<12} {:>7}  {}", "Input", "Key", "Camelot", "Canonical");
    println!("{}", "-".repeat(50));
    for raw in keys {
        let k = setmix::key::normalize(Some(raw));
        println!(
            "{:<16} {:<12} {:>7}  {}",
            truncate(raw, 16),
            if k.pretty.is_empty() { "-" } else { &k.pretty },
            k.camelot.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
            k.canonical.as_deref().unwrap_or("-"),
        );
    }
}

/// Print a table of tracks.
fn print_track_table(tracks: &[&Track]) {
    println!(
        "{:<8} {:<30} {:<22} {:>6} {:>5} {:>4}",
        "ID", "Title", "Artist", "BPM", "Key", "Cam"
    );
    println!("{}", "-".repeat(80));

    for t in tracks {
        println!(
            "{:<8} {:<30} {:<22} {:>6} {:>5} {:>4}",
            truncate(&t.id, 8),
            truncate(&t.title, 30),
            truncate(&t.artist, 22),
            fmt_bpm(t.bpm),
            if t.pretty_key.is_empty() { "-" } else { &t.pretty_key },
            fmt_camelot(t),
        );
    }

    println!();
    println!("{} tracks", tracks.len());
}

/// Print ranked transitions with their explanations.
fn print_match_table(session: &MixSession, matches: &[TransitionInsight]) {
    println!(
        "{:<30} {:<20} {:>6} {:>4} {:>5}  {}",
        "Title", "Artist", "BPM", "Cam", "Score", "Why"
    );
    println!("{}", "-".repeat(100));

    for m in matches {
        let Some(t) = session.find_track(&m.to_id) else {
            continue;
        };
        println!(
            "{:<30} {:<20} {:>6} {:>4} {:>5.3}  {}",
            truncate(&t.title, 30),
            truncate(&t.artist, 20),
            fmt_bpm(t.bpm),
            fmt_camelot(t),
            m.total_score,
            m.explanation,
        );
    }
}

/// Print one ordered set with the transition into each track.
fn print_variant(v: &SetVariant) {
    println!("{} (avg score {:.3})", v.label, v.total_score);
    println!("{}", "=".repeat(v.label.len()));

    for (i, t) in v.tracks.iter().enumerate() {
        println!(
            "{:>3}. {:<30} {:<20} {:>6} {:>4}",
            i + 1,
            truncate(&t.title, 30),
            truncate(&t.artist, 20),
            fmt_bpm(t.bpm),
            fmt_camelot(t),
        );
        if let Some(next) = v.transitions.get(i) {
            println!("       {:.3}  {}", next.total_score, next.explanation);
        }
    }
    println!();
}

fn print_groups(groups: &[MixableGroup]) {
    println!("{} groups found", groups.len());
    println!();
    for g in groups {
        println!("{} ({} tracks)", g.label, g.tracks.len());
        for t in &g.tracks {
            println!(
                "  {:<30} {:<20} {:>6} {:>4}",
                truncate(&t.title, 30),
                truncate(&t.artist, 20),
                fmt_bpm(t.bpm),
                fmt_camelot(t),
            );
        }
    }
}
