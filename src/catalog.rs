//! RefSeq catalog lookups.
//!
//! The catalog is a multi-gigabyte table (`taxid, species, accession, gi, ...`)
//! that is only ever streamed once. Lines are handled as raw bytes so stray
//! non-UTF-8 species names cannot abort the scan.

use crate::utils::{for_each_line, malformed_row};
use indexmap::IndexSet;
use serde::Serialize;
use std::collections::HashMap;
use std::io::{BufRead, Result};

pub const TAXID_COLUMN: usize = 0;
pub const SPECIES_COLUMN: usize = 1;
pub const GI_COLUMN: usize = 3;
pub const MIN_CATALOG_COLUMNS: usize = GI_COLUMN + 1;

#[derive(Debug, Default)]
struct PendingGi {
    taxid: Option<String>,
    /// Flagged ORFs with a hit on this GI, in first-seen order.
    orfs: IndexSet<String>,
}

/// GI numbers referenced by flagged ORFs and the TaxonID each resolved to.
#[derive(Debug, Default)]
pub struct GiTable {
    entries: HashMap<String, PendingGi>,
}

impl GiTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `gi` as pending and remember that `orf` hit it.
    pub fn register(&mut self, gi: &str, orf: &str) {
        let entry = self.entries.entry(gi.to_string()).or_default();
        if !entry.orfs.contains(orf) {
            entry.orfs.insert(orf.to_string());
        }
    }

    pub fn contains(&self, gi: &str) -> bool {
        self.entries.contains_key(gi)
    }

    /// Record the TaxonID for a pending GI and return the ORFs that hit it.
    /// Unknown GIs are ignored.
    pub fn resolve(&mut self, gi: &str, taxid: &str) -> Option<&IndexSet<String>> {
        let entry = self.entries.get_mut(gi)?;
        if let Some(previous) = entry.taxid.as_deref() {
            if previous != taxid {
                log::debug!("GI {} listed under {} and {}", gi, previous, taxid);
            }
        }
        entry.taxid = Some(taxid.to_string());
        Some(&entry.orfs)
    }

    pub fn taxon(&self, gi: &str) -> Option<&str> {
        self.entries.get(gi).and_then(|entry| entry.taxid.as_deref())
    }

    /// Every flagged ORF with a hit on `gi`, in first-seen order.
    pub fn orfs(&self, gi: &str) -> impl Iterator<Item = &String> {
        self.entries.get(gi).into_iter().flat_map(|entry| entry.orfs.iter())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolved_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.taxid.is_some())
            .count()
    }
}

/// One catalog row whose GI was pending.
#[derive(Debug, Clone, Copy)]
pub struct CatalogMatch<'a> {
    pub gi: &'a str,
    pub species: &'a str,
    pub taxid: &'a str,
    /// Flagged ORFs that hit this GI.
    pub orfs: &'a IndexSet<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub rows: usize,
    pub matched_rows: usize,
}

/// Stream the catalog once and fill in the TaxonID of every pending GI.
///
/// `on_match` sees each matching row after it has been recorded. When a GI
/// occurs on several rows the last one wins.
pub fn resolve_catalog<R, F>(
    reader: R,
    gi_table: &mut GiTable,
    source: &str,
    mut on_match: F,
) -> Result<CatalogStats>
where
    R: BufRead,
    F: FnMut(&CatalogMatch) -> Result<()>,
{
    let mut stats = CatalogStats::default();

    for_each_line(reader, |line_no, line| {
        stats.rows += 1;

        let columns: Vec<&[u8]> = line
            .splitn(MIN_CATALOG_COLUMNS + 1, |&b| b == b'\t')
            .collect();
        if columns.len() < MIN_CATALOG_COLUMNS {
            return Err(malformed_row(
                source,
                line_no,
                MIN_CATALOG_COLUMNS,
                columns.len(),
            ));
        }

        let gi = match std::str::from_utf8(columns[GI_COLUMN]).map(str::trim) {
            Ok(gi) if gi_table.contains(gi) => gi,
            _ => return Ok(()),
        };
        let taxid = String::from_utf8_lossy(columns[TAXID_COLUMN]);
        let species = String::from_utf8_lossy(columns[SPECIES_COLUMN]);

        if let Some(orfs) = gi_table.resolve(gi, &taxid) {
            stats.matched_rows += 1;
            on_match(&CatalogMatch {
                gi,
                species: &species,
                taxid: &taxid,
                orfs,
            })?;
        }
        Ok(())
    })?;

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::buffered_reader;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};

    const CATALOG: &str = "9606\tHomo sapiens\tNP_000001.1\t100\tcomplete\n\
562\tEscherichia coli\tNP_000002.1\t300\tcomplete\n\
9605\tHomo\tNP_000003.1\t200\tcomplete\n";

    fn pending() -> GiTable {
        let mut gi_table = GiTable::new();
        gi_table.register("100", "ORF1");
        gi_table.register("200", "ORF1");
        gi_table.register("999", "ORF2");
        gi_table
    }

    #[test]
    fn test_resolve_catalog() {
        let mut gi_table = pending();
        let mut seen = Vec::new();
        let stats = resolve_catalog(Cursor::new(CATALOG), &mut gi_table, "catalog", |m| {
            let orfs: Vec<&str> = m.orfs.iter().map(String::as_str).collect();
            seen.push(format!(
                "{} {} {} {}",
                orfs.join(","),
                m.gi,
                m.species,
                m.taxid
            ));
            Ok(())
        })
        .unwrap();

        assert_eq!(stats, CatalogStats { rows: 3, matched_rows: 2 });
        assert_eq!(gi_table.taxon("100"), Some("9606"));
        assert_eq!(gi_table.taxon("200"), Some("9605"));
        assert_eq!(gi_table.taxon("999"), None);
        assert_eq!(gi_table.taxon("300"), None);
        assert_eq!(gi_table.resolved_count(), 2);
        assert_eq!(
            seen,
            vec!["ORF1 100 Homo sapiens 9606", "ORF1 200 Homo 9605"]
        );
    }

    #[test]
    fn test_gzip_and_plain_agree() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(CATALOG.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut plain = pending();
        let plain_reader = buffered_reader(Cursor::new(CATALOG.as_bytes().to_vec())).unwrap();
        resolve_catalog(plain_reader, &mut plain, "plain", |_| Ok(())).unwrap();

        let mut gz = pending();
        let gz_reader = buffered_reader(Cursor::new(compressed)).unwrap();
        resolve_catalog(gz_reader, &mut gz, "gz", |_| Ok(())).unwrap();

        for gi in ["100", "200", "999"] {
            assert_eq!(plain.taxon(gi), gz.taxon(gi));
        }
    }

    #[test]
    fn test_last_row_wins() {
        let mut gi_table = pending();
        let catalog = "9606\ta\tNP_1\t100\n9605\tb\tNP_2\t100\n";
        resolve_catalog(Cursor::new(catalog), &mut gi_table, "catalog", |_| Ok(())).unwrap();
        assert_eq!(gi_table.taxon("100"), Some("9605"));
    }

    #[test]
    fn test_short_catalog_row() {
        let mut gi_table = pending();
        let err = resolve_catalog(
            Cursor::new("9606\tHomo sapiens\tNP_1\n"),
            &mut gi_table,
            "refseq.catalog",
            |_| Ok(()),
        )
        .unwrap_err();
        assert!(err.to_string().contains("refseq.catalog:1"));
    }

    #[test]
    fn test_non_utf8_species_name() {
        let mut gi_table = pending();
        let mut catalog = b"9606\tHomo \xff sapiens\tNP_1\t100\n".to_vec();
        catalog.extend_from_slice(b"9605\t\xfe\tNP_2\t200\r\n");
        resolve_catalog(Cursor::new(catalog), &mut gi_table, "catalog", |_| Ok(())).unwrap();
        assert_eq!(gi_table.taxon("100"), Some("9606"));
        assert_eq!(gi_table.taxon("200"), Some("9605"));
    }

    #[test]
    fn test_register_keeps_every_orf() {
        let mut gi_table = GiTable::new();
        gi_table.register("100", "ORF1");
        gi_table.register("100", "ORF2");
        gi_table.register("100", "ORF1");
        let orfs: Vec<&str> = gi_table.orfs("100").map(String::as_str).collect();
        assert_eq!(orfs, vec!["ORF1", "ORF2"]);
        assert_eq!(gi_table.orfs("404").count(), 0);
        assert_eq!(gi_table.len(), 1);
    }

    #[test]
    fn test_gi_column_whitespace_is_ignored() {
        let mut gi_table = pending();
        let catalog = "9606\tHomo sapiens\tNP_1\t 100 \tcomplete\n9605\tHomo\tNP_2\t200\n";
        let stats =
            resolve_catalog(Cursor::new(catalog), &mut gi_table, "catalog", |_| Ok(())).unwrap();
        assert_eq!(stats.matched_rows, 2);
        assert_eq!(gi_table.taxon("100"), Some("9606"));
        assert_eq!(gi_table.taxon("200"), Some("9605"));
    }
}
