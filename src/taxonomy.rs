use crate::utils::{open_reader, trim_line_end};
use std::collections::HashMap;
use std::io::{BufRead, Result};
use std::path::Path;

pub const ROOT_TAXID: u64 = 1;

/// The taxonomy capability the rewrite pipeline depends on.
///
/// Implementations own the tree and the LCA walk; callers only hand over
/// taxon identifiers (numeric IDs or names) and get labels back.
pub trait ConsensusTaxonomy {
    /// Compute one consensus label for a list of taxon groups.
    ///
    /// An empty group stands for an unresolved hit.
    fn resolve_consensus(&self, groups: &[Vec<String>]) -> String;

    /// `;`-separated lineage from the root down to `taxon`, empty when the
    /// taxon is unknown.
    fn lookup_lineage(&self, taxon: &str) -> String;

    /// Numeric ID of the lowest common ancestor of `taxa`.
    fn lca_id(&self, taxa: &[&str]) -> u64;
}

/// Parse a MetaPathways taxonomy tree file (`name\ttaxid\tparent_taxid`).
///
/// # Returns
///
/// A tuple containing:
/// - HashMap of node ID to parent ID
/// - HashMap of node ID to name
pub fn parse_tree_file<P: AsRef<Path>>(
    tree_filename: P,
) -> Result<(HashMap<u64, u64>, HashMap<u64, String>)> {
    let reader = open_reader(tree_filename)?;
    parse_tree(reader)
}

pub fn parse_tree<R: BufRead>(reader: R) -> Result<(HashMap<u64, u64>, HashMap<u64, String>)> {
    let mut parent_map = HashMap::new();
    let mut name_map = HashMap::new();

    for line in reader.lines() {
        let line = line?;
        let line = trim_line_end(&line);
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<_> = line.split('\t').map(|f| f.trim()).collect();
        if fields.len() < 3 {
            continue;
        }

        let (node_id, parent_id) = match (fields[1].parse::<u64>(), fields[2].parse::<u64>()) {
            (Ok(node_id), Ok(parent_id)) => (node_id, parent_id),
            _ => {
                log::debug!("skipping tree line with non-numeric ids: {}", line);
                continue;
            }
        };

        parent_map.insert(node_id, parent_id);
        name_map.insert(node_id, fields[0].to_string());
    }

    Ok((parent_map, name_map))
}

/// NCBI taxonomy tree loaded from MetaPathways tree files.
#[derive(Debug, Default)]
pub struct NcbiTree {
    parent_map: HashMap<u64, u64>,
    name_map: HashMap<u64, String>,
    name_to_id: HashMap<String, u64>,
}

impl NcbiTree {
    /// Load and merge one or more tree files; later files override earlier
    /// entries for the same taxon.
    pub fn from_files<P: AsRef<Path>>(tree_files: &[P]) -> Result<Self> {
        let mut tree = NcbiTree::default();
        for tree_file in tree_files {
            let (parent_map, name_map) = parse_tree_file(tree_file)?;
            log::info!(
                "loaded {} taxa from {:?}",
                parent_map.len(),
                tree_file.as_ref()
            );
            tree.extend(parent_map, name_map);
        }
        Ok(tree)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let (parent_map, name_map) = parse_tree(reader)?;
        let mut tree = NcbiTree::default();
        tree.extend(parent_map, name_map);
        Ok(tree)
    }

    fn extend(&mut self, parent_map: HashMap<u64, u64>, name_map: HashMap<u64, String>) {
        self.parent_map.extend(parent_map);
        for (taxid, name) in name_map {
            self.name_to_id.insert(name.clone(), taxid);
            self.name_map.insert(taxid, name);
        }
    }

    pub fn node_count(&self) -> usize {
        self.parent_map.len()
    }

    /// Resolve a numeric taxon ID or an exact taxon name to a known node.
    pub fn get_taxid(&self, taxon: &str) -> Option<u64> {
        let taxon = taxon.trim();
        if taxon.is_empty() {
            return None;
        }
        if let Ok(taxid) = taxon.parse::<u64>() {
            if self.parent_map.contains_key(&taxid) {
                return Some(taxid);
            }
        }
        self.name_to_id.get(taxon).copied()
    }

    pub fn get_name(&self, taxid: u64) -> Option<&str> {
        self.name_map.get(&taxid).map(|s| s.as_str())
    }

    /// Render a node as `Name (taxid)`.
    pub fn label(&self, taxid: u64) -> String {
        match self.get_name(taxid) {
            Some(name) => format!("{} ({})", name, taxid),
            None if taxid == ROOT_TAXID => format!("root ({})", taxid),
            None => format!("{} ({})", taxid, taxid),
        }
    }

    /// Path from the root down to `taxid`, inclusive.
    ///
    /// Stops at a self-parented node or a parent missing from the tree, and
    /// refuses to loop on a malformed cycle.
    pub fn path_to_root(&self, taxid: u64) -> Vec<u64> {
        let mut path = vec![taxid];
        let mut current = taxid;
        while let Some(&parent) = self.parent_map.get(&current) {
            if parent == current || !self.parent_map.contains_key(&parent) {
                break;
            }
            if path.len() > self.parent_map.len() {
                log::warn!("cycle detected in taxonomy above taxon {}", taxid);
                break;
            }
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Lowest common ancestor of two known nodes.
    pub fn lca(&self, a: u64, b: u64) -> u64 {
        if a == b {
            return a;
        }
        let path_a = self.path_to_root(a);
        let path_b = self.path_to_root(b);

        let mut i = 0;
        while i < path_a.len() && i < path_b.len() && path_a[i] == path_b[i] {
            i += 1;
        }

        if i == 0 {
            return ROOT_TAXID;
        }
        path_a[i - 1]
    }

    /// LCA of every known taxon in `taxa`; `None` when nothing is known.
    pub fn lca_of<'a, I>(&self, taxa: I) -> Option<u64>
    where
        I: IntoIterator<Item = &'a str>,
    {
        taxa.into_iter()
            .filter_map(|taxon| self.get_taxid(taxon))
            .reduce(|acc, taxid| self.lca(acc, taxid))
    }
}

impl ConsensusTaxonomy for NcbiTree {
    fn resolve_consensus(&self, groups: &[Vec<String>]) -> String {
        let consensus = groups
            .iter()
            .filter_map(|group| self.lca_of(group.iter().map(|s| s.as_str())))
            .reduce(|acc, taxid| self.lca(acc, taxid))
            .unwrap_or(ROOT_TAXID);
        self.label(consensus)
    }

    fn lookup_lineage(&self, taxon: &str) -> String {
        match self.get_taxid(taxon) {
            Some(taxid) => self
                .path_to_root(taxid)
                .iter()
                .map(|id| self.get_name(*id).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(";"),
            None => String::new(),
        }
    }

    fn lca_id(&self, taxa: &[&str]) -> u64 {
        self.lca_of(taxa.iter().copied()).unwrap_or(ROOT_TAXID)
    }
}
