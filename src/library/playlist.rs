use serde::Serialize;

/// Node of the playlist tree: folders hold children, playlists hold ordered
/// references to collection tracks by their source key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlaylistNode {
    Folder {
        name: String,
        children: Vec<PlaylistNode>,
    },
    Playlist {
        name: String,
        track_refs: Vec<String>,
    },
}

impl PlaylistNode {
    pub fn name(&self) -> &str {
        match self {
            PlaylistNode::Folder { name, .. } | PlaylistNode::Playlist { name, .. } => name,
        }
    }

    pub fn is_playlist(&self) -> bool {
        matches!(self, PlaylistNode::Playlist { .. })
    }

    /// Track references of a leaf playlist; empty for folders.
    pub fn track_refs(&self) -> &[String] {
        match self {
            PlaylistNode::Playlist { track_refs, .. } => track_refs,
            PlaylistNode::Folder { .. } => &[],
        }
    }

    pub fn children(&self) -> &[PlaylistNode] {
        match self {
            PlaylistNode::Folder { children, .. } => children,
            PlaylistNode::Playlist { .. } => &[],
        }
    }
}

/// Number of leaf playlists in the forest.
pub fn count_playlists(nodes: &[PlaylistNode]) -> usize {
    nodes
        .iter()
        .map(|n| match n {
            PlaylistNode::Playlist { .. } => 1,
            PlaylistNode::Folder { children, .. } => count_playlists(children),
        })
        .sum()
}

/// Every leaf playlist with its `/`-joined path, in document order.
pub fn flatten(nodes: &[PlaylistNode]) -> Vec<(String, &PlaylistNode)> {
    let mut out = Vec::new();
    // Explicit stack, pushed in reverse so children pop in document order
    let mut stack: Vec<(String, &PlaylistNode)> = nodes
        .iter()
        .rev()
        .map(|n| (n.name().to_string(), n))
        .collect();

    while let Some((path, node)) = stack.pop() {
        match node {
            PlaylistNode::Playlist { .. } => out.push((path, node)),
            PlaylistNode::Folder { children, .. } => {
                for child in children.iter().rev() {
                    stack.push((format!("{}/{}", path, child.name()), child));
                }
            }
        }
    }
    out
}

/// Indented tree lines for terminal output. Playlists show their entry count.
pub fn render_tree(nodes: &[PlaylistNode]) -> Vec<String> {
    let mut lines = Vec::new();
    render_level(nodes, 0, &mut lines);
    lines
}

fn render_level(nodes: &[PlaylistNode], depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            PlaylistNode::Folder { name, children } => {
                lines.push(format!("{indent}{name}/"));
                render_level(children, depth + 1, lines);
            }
            PlaylistNode::Playlist { name, track_refs } => {
                lines.push(format!("{indent}{name} ({})", track_refs.len()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist(name: &str, refs: &[&str]) -> PlaylistNode {
        PlaylistNode::Playlist {
            name: name.to_string(),
            track_refs: refs.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn folder(name: &str, children: Vec<PlaylistNode>) -> PlaylistNode {
        PlaylistNode::Folder {
            name: name.to_string(),
            children,
        }
    }

    fn tree() -> Vec<PlaylistNode> {
        vec![folder(
            "ROOT",
            vec![
                folder("Sets", vec![playlist("Warehouse", &["1", "2"]), folder("Empty", vec![])]),
                playlist("All", &["1", "2", "3"]),
            ],
        )]
    }

    #[test]
    fn test_count_playlists() {
        assert_eq!(count_playlists(&tree()), 2);
        assert_eq!(count_playlists(&[folder("Empty", vec![])]), 0);
    }

    #[test]
    fn test_flatten_paths_in_document_order() {
        let nodes = tree();
        let flat = flatten(&nodes);
        let paths: Vec<&str> = flat.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["ROOT/Sets/Warehouse", "ROOT/All"]);
    }

    #[test]
    fn test_accessors() {
        let p = playlist("All", &["1"]);
        assert!(p.is_playlist());
        assert_eq!(p.track_refs(), &["1".to_string()]);
        assert!(p.children().is_empty());

        let f = folder("F", vec![p.clone()]);
        assert!(!f.is_playlist());
        assert!(f.track_refs().is_empty());
        assert_eq!(f.children().len(), 1);
    }

    #[test]
    fn test_render_tree() {
        let lines = render_tree(&tree());
        assert_eq!(
            lines,
            vec!["ROOT/", "  Sets/", "    Warehouse (2)", "    Empty/", "  All (3)"]
        );
    }
}
