//! Reading and rewriting the MetaPathways functional and taxonomic table.
//!
//! Column 0 holds the ORF ID and column 8 the taxonomy assignment. Rows whose
//! assignment equals one of the flagged sentinels are collected first and
//! rewritten in a second pass once their consensus taxonomy is known.
//!
//! Rows are handled as bytes. Product descriptions are free text and are
//! passed through untouched even when they are not valid UTF-8.

use crate::utils::{for_each_line, split_row};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;
use std::io::{BufRead, Result, Write};

pub const ORF_COLUMN: usize = 0;
pub const TAXONOMY_COLUMN: usize = 8;
pub const MIN_ANNOTATION_COLUMNS: usize = TAXONOMY_COLUMN + 1;

pub const INDETERMINATE_TAXONOMY: &str = "indeterminate-taxonomy";
pub const ROOT_TAXONOMY: &str = "root (1)";

/// Status values that mark an annotation row for recomputation.
#[derive(Debug, Clone)]
pub struct Sentinels {
    values: HashSet<String>,
}

impl Default for Sentinels {
    fn default() -> Self {
        Self::new([INDETERMINATE_TAXONOMY, ROOT_TAXONOMY])
    }
}

impl Sentinels {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Exact comparison, the status is never otherwise interpreted.
    pub fn matches(&self, status: &[u8]) -> bool {
        std::str::from_utf8(status).map_or(false, |status| self.values.contains(status))
    }
}

/// Flagged ORFs in file order, each with the GI numbers of its BLAST hits.
#[derive(Debug, Default)]
pub struct FlaggedOrfs {
    orfs: IndexMap<String, Vec<String>>,
}

impl FlaggedOrfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an ORF; a repeated ID starts over with an empty hit list.
    pub fn insert(&mut self, orf: &str) {
        self.orfs.insert(orf.to_string(), Vec::new());
    }

    pub fn contains(&self, orf: &str) -> bool {
        self.orfs.contains_key(orf)
    }

    /// Append a GI to a flagged ORF. Returns false when the ORF is not flagged.
    pub fn push_gi(&mut self, orf: &str, gi: &str) -> bool {
        match self.orfs.get_mut(orf) {
            Some(gis) => {
                gis.push(gi.to_string());
                true
            }
            None => false,
        }
    }

    pub fn gis(&self, orf: &str) -> Option<&[String]> {
        self.orfs.get(orf).map(|gis| gis.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.orfs.iter()
    }

    pub fn len(&self) -> usize {
        self.orfs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orfs.is_empty()
    }

    pub fn hit_count(&self) -> usize {
        self.orfs.values().map(|gis| gis.len()).sum()
    }
}

/// Collect the ORFs whose taxonomy column equals a sentinel.
pub fn select_flagged<R: BufRead>(
    reader: R,
    sentinels: &Sentinels,
    source: &str,
) -> Result<FlaggedOrfs> {
    let mut flagged = FlaggedOrfs::new();

    for_each_line(reader, |line_no, line| {
        let columns = split_row(line, MIN_ANNOTATION_COLUMNS, source, line_no)?;
        if sentinels.matches(columns[TAXONOMY_COLUMN]) {
            flagged.insert(&String::from_utf8_lossy(columns[ORF_COLUMN]));
        }
        Ok(())
    })?;

    Ok(flagged)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RewriteStats {
    pub rows: usize,
    pub flagged_rows: usize,
    pub rewritten_rows: usize,
}

/// Re-emit the annotation table, replacing the taxonomy of flagged rows.
///
/// `consensus` maps ORF IDs to their recomputed taxonomy. A flagged row whose
/// ORF has no entry is left as it is.
pub fn rewrite_annotations<R, W>(
    reader: R,
    writer: &mut W,
    sentinels: &Sentinels,
    consensus: &IndexMap<String, String>,
    source: &str,
) -> Result<RewriteStats>
where
    R: BufRead,
    W: Write,
{
    let mut stats = RewriteStats::default();

    for_each_line(reader, |line_no, line| {
        let mut columns = split_row(line, MIN_ANNOTATION_COLUMNS, source, line_no)?;
        stats.rows += 1;

        let mut rewritten = false;
        if sentinels.matches(columns[TAXONOMY_COLUMN]) {
            stats.flagged_rows += 1;
            let orf = String::from_utf8_lossy(columns[ORF_COLUMN]);
            if let Some(taxonomy) = consensus.get(&*orf) {
                if taxonomy.as_bytes() != columns[TAXONOMY_COLUMN] {
                    log::debug!(
                        "{}: {} -> {}",
                        orf,
                        String::from_utf8_lossy(columns[TAXONOMY_COLUMN]),
                        taxonomy
                    );
                    columns[TAXONOMY_COLUMN] = taxonomy.as_bytes();
                    stats.rewritten_rows += 1;
                    rewritten = true;
                }
            }
        }

        if rewritten {
            writer.write_all(&columns.join(&b'\t'))?;
        } else {
            writer.write_all(line)?;
        }
        writer.write_all(b"\n")
    })?;

    writer.flush()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, ErrorKind};

    fn row(orf: &str, taxonomy: &str) -> String {
        format!("{}\t120\t40\t0.5\tprodigal\t1\t+\tfunc\t{}\textra", orf, taxonomy)
    }

    #[test]
    fn test_select_flagged() {
        let table = format!(
            "{}\n{}\n{}\n\n{}\n",
            row("ORF1", "indeterminate-taxonomy"),
            row("ORF2", "Bacteria (2)"),
            row("ORF3", "root (1)"),
            row("ORF4", "indeterminate-taxonomy-ish"),
        );
        let flagged =
            select_flagged(Cursor::new(table), &Sentinels::default(), "table").unwrap();
        let orfs: Vec<_> = flagged.iter().map(|(orf, _)| orf.as_str()).collect();
        assert_eq!(orfs, vec!["ORF1", "ORF3"]);
    }

    #[test]
    fn test_select_flagged_custom_sentinels() {
        let table = format!("{}\n{}\n", row("ORF1", "root (1)"), row("ORF2", "unknown"));
        let flagged =
            select_flagged(Cursor::new(table), &Sentinels::new(["unknown"]), "table").unwrap();
        assert!(!flagged.contains("ORF1"));
        assert!(flagged.contains("ORF2"));
    }

    #[test]
    fn test_select_flagged_short_row() {
        let table = format!("{}\nORF2\tonly\tthree\n", row("ORF1", "root (1)"));
        let err = select_flagged(Cursor::new(table), &Sentinels::default(), "table.txt")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(err.to_string().contains("table.txt:2"));
    }

    #[test]
    fn test_duplicate_orf_resets_hits() {
        let mut flagged = FlaggedOrfs::new();
        flagged.insert("ORF1");
        assert!(flagged.push_gi("ORF1", "42"));
        flagged.insert("ORF1");
        assert_eq!(flagged.gis("ORF1"), Some(&[][..]));
        assert!(!flagged.push_gi("ORF9", "42"));
    }

    #[test]
    fn test_rewrite_annotations() {
        let table = format!(
            "{}\r\n{}\n{}\n{}",
            row("ORF1", "indeterminate-taxonomy"),
            row("ORF2", "Bacteria (2)"),
            row("ORF3", "root (1)"),
            row("ORF1", "indeterminate-taxonomy"),
        );
        let mut consensus = IndexMap::new();
        consensus.insert("ORF1".to_string(), "Hominidae (9604)".to_string());
        consensus.insert("ORF3".to_string(), "root (1)".to_string());

        let mut out = Vec::new();
        let stats = rewrite_annotations(
            Cursor::new(table),
            &mut out,
            &Sentinels::default(),
            &consensus,
            "table",
        )
        .unwrap();

        let expected = format!(
            "{}\n{}\n{}\n{}\n",
            row("ORF1", "Hominidae (9604)"),
            row("ORF2", "Bacteria (2)"),
            row("ORF3", "root (1)"),
            row("ORF1", "Hominidae (9604)"),
        );
        assert_eq!(String::from_utf8(out).unwrap(), expected);
        assert_eq!(
            stats,
            RewriteStats {
                rows: 4,
                flagged_rows: 3,
                rewritten_rows: 2,
            }
        );
    }

    #[test]
    fn test_non_utf8_rows_pass_through() {
        const CAFE: &[u8] = b"ORF1\t120\t40\t0.5\tprodigal\t1\t+\tcaf\xe9 protein\tBacteria (2)";
        const MICRO: &[u8] = b"ORF2\t90\t30\t0.4\tprodigal\t1\t-\t\xb5 subunit\t";
        let table = [CAFE, b"\n", MICRO, b"indeterminate-taxonomy\r\n"].concat();

        let flagged =
            select_flagged(Cursor::new(table.clone()), &Sentinels::default(), "table").unwrap();
        assert!(!flagged.contains("ORF1"));
        assert!(flagged.contains("ORF2"));

        let mut consensus = IndexMap::new();
        consensus.insert("ORF2".to_string(), "Bacteria (2)".to_string());
        let mut out = Vec::new();
        let stats = rewrite_annotations(
            Cursor::new(table),
            &mut out,
            &Sentinels::default(),
            &consensus,
            "table",
        )
        .unwrap();

        let expected = [CAFE, b"\n", MICRO, b"Bacteria (2)\n"].concat();
        assert_eq!(out, expected);
        assert_eq!(stats.rewritten_rows, 1);
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let table = format!(
            "{}\n{}\n",
            row("ORF1", "indeterminate-taxonomy"),
            row("ORF2", "Bacteria (2)")
        );
        let mut consensus = IndexMap::new();
        consensus.insert("ORF1".to_string(), "Hominidae (9604)".to_string());

        let mut first = Vec::new();
        rewrite_annotations(
            Cursor::new(table),
            &mut first,
            &Sentinels::default(),
            &consensus,
            "table",
        )
        .unwrap();

        let mut second = Vec::new();
        let stats = rewrite_annotations(
            Cursor::new(first.clone()),
            &mut second,
            &Sentinels::default(),
            &consensus,
            "table",
        )
        .unwrap();

        assert_eq!(first, second);
        assert_eq!(stats.rewritten_rows, 0);
    }
}
