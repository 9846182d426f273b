use std::collections::HashMap;

#[derive(Default)]
struct PathTrieNode {
    /// How many considered paths shared the prefix ending at this segment.
    count: usize,
    children: HashMap<String, PathTrieNode>,
}

/// Incremental trie over path segments, scoped to one backtrace pass.
///
/// `consider_path` registers every path during the build pass; `chew_path`
/// then shortens a path to the suffix starting where it first diverges from
/// the rest of the population. Registration and querying are single-pass:
/// a path never registered chews to itself.
#[derive(Default)]
pub struct PathCompressor {
    root: PathTrieNode,
}

impl PathCompressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one path's segments, bumping each prefix's counter.
    /// Single-segment paths carry nothing worth compressing and are skipped.
    pub fn consider_path(&mut self, path: &str) {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() == 1 {
            return;
        }
        let mut node = &mut self.root;
        for part in parts {
            if part.is_empty() {
                continue;
            }
            let child = node.children.entry(part.to_string()).or_default();
            child.count += 1;
            node = child;
        }
    }

    /// Shortest trailing suffix of `path` starting at the first segment
    /// whose prefix count differs from the previous segment's count.
    ///
    /// A path with no divergence point comes back unchanged; so does a path
    /// never seen by `consider_path` (no compression, no backfilling).
    pub fn chew_path(&self, path: &str) -> String {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() == 1 {
            return path.to_string();
        }
        let mut node = &self.root;
        let mut last_count: Option<usize> = None;
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                continue;
            }
            let child = match node.children.get(*part) {
                Some(child) => child,
                None => return path.to_string(),
            };
            if let Some(last) = last_count {
                if last != child.count {
                    return parts[i..].join("/");
                }
            }
            last_count = Some(child.count);
            node = child;
        }
        path.to_string()
    }
}
