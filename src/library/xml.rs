//! Streaming reader for DJ library exports (`DJ_PLAYLISTS` documents).
//!
//! Attribute names are matched case-insensitively against a per-field alias
//! table, so older exports (`BPM`, `Key`, `Title`) load the same as current
//! ones (`AverageBpm`, `Tonality`, `Name`). Schema is not validated: unknown
//! elements and attributes are ignored.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::playlist::PlaylistNode;
use super::{Collection, LibraryError, Track};

/// Semantic track fields read from a `TRACK` attribute record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    SourceId,
    Title,
    Artist,
    Bpm,
    Key,
}

impl Field {
    /// Accepted attribute names, in priority order.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::SourceId => &["TrackID"],
            Field::Title => &["Name", "Title"],
            Field::Artist => &["Artist"],
            Field::Bpm => &["AverageBpm", "BPM"],
            Field::Key => &["Tonality", "Key"],
        }
    }
}

/// Values exporters write in place of "no value".
const ABSENT_VALUES: &[&str] = &["NA", "None"];

/// Attribute record of one element, in document order.
struct Attributes(Vec<(String, String)>);

impl Attributes {
    /// Best-effort read: a value with a bad escape is kept raw, a repeated
    /// name keeps its first value, and a malformed attribute ends the record
    /// with whatever was read before it.
    fn read(e: &BytesStart<'_>, position: u64) -> Self {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for attr in e.attributes().with_checks(false) {
            let attr = match attr {
                Ok(attr) => attr,
                Err(err) => {
                    log::debug!("Malformed attribute at byte {}: {}", position, err);
                    break;
                }
            };
            let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            if pairs.iter().any(|(seen, _)| seen.eq_ignore_ascii_case(&name)) {
                log::debug!("Duplicate attribute {:?} at byte {}", name, position);
                continue;
            }
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(err) => {
                    log::debug!("Keeping raw value of {:?} at byte {}: {}", name, position, err);
                    String::from_utf8_lossy(&attr.value).into_owned()
                }
            };
            pairs.push((name, value));
        }
        Attributes(pairs)
    }

    /// First non-blank value among the field's aliases.
    fn field(&self, field: Field) -> Option<&str> {
        self.any_of(field.aliases())
    }

    fn any_of(&self, names: &[&str]) -> Option<&str> {
        for wanted in names {
            for (name, value) in &self.0 {
                if !name.eq_ignore_ascii_case(wanted) {
                    continue;
                }
                let value = value.trim();
                if !value.is_empty() && !ABSENT_VALUES.contains(&value) {
                    return Some(value);
                }
            }
        }
        None
    }
}

/// A `NODE` element whose end tag hasn't been seen yet.
struct OpenNode {
    name: String,
    kind: OpenKind,
}

enum OpenKind {
    Folder(Vec<PlaylistNode>),
    Playlist(Vec<String>),
}

impl OpenNode {
    fn from_attributes(attrs: &Attributes) -> Self {
        let name = attrs.any_of(&["Name"]).unwrap_or("Untitled").to_string();
        // Type 0 (or missing) = folder, anything else = playlist
        let kind = match attrs.any_of(&["Type"]).unwrap_or("0") {
            "0" => OpenKind::Folder(Vec::new()),
            _ => OpenKind::Playlist(Vec::new()),
        };
        OpenNode { name, kind }
    }

    fn finish(self) -> PlaylistNode {
        match self.kind {
            OpenKind::Folder(children) => PlaylistNode::Folder {
                name: self.name,
                children,
            },
            OpenKind::Playlist(track_refs) => PlaylistNode::Playlist {
                name: self.name,
                track_refs,
            },
        }
    }
}

#[derive(Default)]
struct Builder {
    collection: Collection,
    in_collection: bool,
    nodes: Vec<OpenNode>,
}

impl Builder {
    fn open(&mut self, e: &BytesStart<'_>, position: u64, self_closing: bool) {
        let tag = e.name();
        let tag = tag.as_ref();

        if tag.eq_ignore_ascii_case(b"COLLECTION") {
            self.in_collection = !self_closing;
        } else if tag.eq_ignore_ascii_case(b"NODE") {
            let attrs = Attributes::read(e, position);
            self.nodes.push(OpenNode::from_attributes(&attrs));
            if self_closing {
                self.close_node();
            }
        } else if tag.eq_ignore_ascii_case(b"TRACK") {
            let attrs = Attributes::read(e, position);
            self.track(&attrs);
        }
    }

    fn close(&mut self, tag: &[u8]) {
        if tag.eq_ignore_ascii_case(b"COLLECTION") {
            self.in_collection = false;
        } else if tag.eq_ignore_ascii_case(b"NODE") {
            self.close_node();
        }
    }

    fn track(&mut self, attrs: &Attributes) {
        if let Some(open) = self.nodes.last_mut() {
            // Playlist entry: reference to a collection track
            if let OpenKind::Playlist(refs) = &mut open.kind {
                if let Some(key) = attrs.any_of(&["Key"]) {
                    refs.push(key.to_string());
                }
            }
            return;
        }
        if !self.in_collection {
            return;
        }

        let track = Track::new(
            attrs.field(Field::Title),
            attrs.field(Field::Artist),
            attrs.field(Field::Bpm),
            attrs.field(Field::Key),
        );
        let index = self.collection.tracks.len();
        if let Some(source_id) = attrs.field(Field::SourceId) {
            self.collection.by_source.insert(source_id.to_string(), index);
        }
        self.collection.tracks.push(track);
    }

    fn close_node(&mut self) {
        let Some(open) = self.nodes.pop() else {
            return;
        };
        let node = open.finish();
        match self.nodes.last_mut() {
            Some(OpenNode { kind: OpenKind::Folder(children), .. }) => children.push(node),
            Some(OpenNode { name, .. }) => {
                log::debug!("Ignoring node {:?} nested inside playlist {:?}", node.name(), name);
            }
            None => self.collection.playlists.push(node),
        }
    }
}

/// Parse a library export document.
pub fn parse(xml: &str) -> Result<Collection, LibraryError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut builder = Builder::default();

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event()
            .map_err(|source| LibraryError::Xml { position, source })?;
        match event {
            Event::Start(e) => builder.open(&e, position, false),
            Event::Empty(e) => builder.open(&e, position, true),
            Event::End(e) => builder.close(e.name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
    }

    // Unterminated nodes still count
    while !builder.nodes.is_empty() {
        builder.close_node();
    }

    let collection = builder.collection;
    log::debug!(
        "Parsed {} tracks ({} with source ids)",
        collection.tracks.len(),
        collection.by_source.len()
    );
    Ok(collection)
}
