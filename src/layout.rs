//! Locating inputs inside a MetaPathways installation and a per-sample
//! results directory.

use crate::utils::find_files_matching;
use regex::Regex;
use std::io::{self, Result};
use std::path::{Path, PathBuf};

pub const NCBI_TREE_FILE: &str = "ncbi_taxonomy_tree.txt";
pub const ANNOTATION_TABLE_FILE: &str = "functional_and_taxonomic_table.txt";

const CATALOG_PATTERN: &str = r"\.catalog(\.gz)?$";
const REFSEQ_BLAST_PATTERN: &str = r"refseq.*\.BLASTout\.parsed\.txt$";

fn not_found(what: &str, root: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no {} found under {:?}", what, root),
    )
}

/// First file anywhere below `root` named exactly `file_name`.
fn find_named_file(root: &Path, file_name: &str) -> Option<PathBuf> {
    let re =
        Regex::new(&format!("^{}$", regex::escape(file_name))).expect("Invalid regex pattern");
    find_files_matching(root, &re).into_iter().next()
}

/// The NCBI taxonomy tree shipped with the pipeline databases.
///
/// Looks in `MetaPathways_DBs/ncbi_tree` first, then anywhere below `root`.
pub fn locate_tree_files(root: &Path) -> Result<Vec<PathBuf>> {
    let expected = root
        .join("MetaPathways_DBs")
        .join("ncbi_tree")
        .join(NCBI_TREE_FILE);
    if expected.is_file() {
        return Ok(vec![expected]);
    }

    find_named_file(root, NCBI_TREE_FILE)
        .map(|p| vec![p])
        .ok_or_else(|| not_found(NCBI_TREE_FILE, root))
}

/// The RefSeq catalog; with several releases present the last one in path
/// order is used.
pub fn locate_catalog(root: &Path) -> Result<PathBuf> {
    let re = Regex::new(CATALOG_PATTERN).expect("Invalid regex pattern");
    let mut catalogs = find_files_matching(root, &re);
    if catalogs.len() > 1 {
        log::warn!(
            "{} catalogs found under {:?}, using the last one",
            catalogs.len(),
            root
        );
    }
    catalogs
        .pop()
        .ok_or_else(|| not_found("RefSeq catalog (*.catalog, *.catalog.gz)", root))
}

pub fn locate_annotation_table(results_dir: &Path) -> Result<PathBuf> {
    let expected = results_dir
        .join("results")
        .join("annotation_table")
        .join(ANNOTATION_TABLE_FILE);
    if expected.is_file() {
        return Ok(expected);
    }

    find_named_file(results_dir, ANNOTATION_TABLE_FILE)
        .ok_or_else(|| not_found(ANNOTATION_TABLE_FILE, results_dir))
}

/// Parsed BLAST tables against RefSeq, sorted by path.
pub fn locate_blast_tables(results_dir: &Path) -> Result<Vec<PathBuf>> {
    let blast_dir = results_dir.join("blast_results");
    let re = Regex::new(REFSEQ_BLAST_PATTERN).expect("Invalid regex pattern");
    let tables = find_files_matching(&blast_dir, &re);
    if tables.is_empty() {
        return Err(not_found("parsed RefSeq BLAST table", &blast_dir));
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, File};

    fn touch(path: &Path) {
        create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap();
    }

    #[test]
    fn test_locate_pipeline_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let tree = root
            .join("MetaPathways_DBs")
            .join("ncbi_tree")
            .join(NCBI_TREE_FILE);
        touch(&tree);
        touch(&root.join("refseq/68/RefSeq-release68.catalog.gz"));
        touch(&root.join("refseq/69/RefSeq-release69.catalog.gz"));
        touch(&root.join("refseq/69/RefSeq-release69.catalog.md5"));

        assert_eq!(locate_tree_files(root).unwrap(), vec![tree]);
        assert_eq!(
            locate_catalog(root).unwrap(),
            root.join("refseq/69/RefSeq-release69.catalog.gz")
        );
    }

    #[test]
    fn test_locate_tree_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("dbs").join(NCBI_TREE_FILE);
        touch(&tree);
        touch(&dir.path().join("dbs").join("ncbi_taxonomy_tree_old.txt"));
        assert_eq!(locate_tree_files(dir.path()).unwrap(), vec![tree]);
    }

    #[test]
    fn test_locate_results_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path();
        let table = results
            .join("results")
            .join("annotation_table")
            .join(ANNOTATION_TABLE_FILE);
        touch(&table);
        let blast_dir = results.join("blast_results");
        touch(&blast_dir.join("scaffolds.refseq-protein-v69.faa.BLASTout.parsed.txt"));
        touch(&blast_dir.join("scaffolds.cog-2007.faa.BLASTout.parsed.txt"));
        touch(&blast_dir.join("scaffolds.refseq-protein-v69.faa.BLASTout"));

        assert_eq!(locate_annotation_table(results).unwrap(), table);
        assert_eq!(
            locate_blast_tables(results).unwrap(),
            vec![blast_dir.join("scaffolds.refseq-protein-v69.faa.BLASTout.parsed.txt")]
        );
    }

    #[test]
    fn test_missing_inputs() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            locate_catalog(dir.path()).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
        assert!(locate_annotation_table(dir.path()).is_err());
        assert!(locate_blast_tables(dir.path()).is_err());
        assert!(locate_tree_files(dir.path()).is_err());
    }
}
