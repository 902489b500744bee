use crate::annotation::FlaggedOrfs;
use crate::catalog::GiTable;
use crate::utils::{for_each_line, malformed_row};
use serde::Serialize;
use std::io::{self, BufRead, Result};

pub const QUERY_COLUMN: usize = 0;
pub const TARGET_COLUMN: usize = 1;
/// Position of the GI number in a `gi|12345|ref|WP_000001.1|` defline.
pub const GI_FIELD: usize = 1;

/// Pull the GI number out of a `|`-delimited target defline. Surrounding
/// whitespace is dropped, as it is for the catalog's GI column.
pub fn extract_gi(defline: &str) -> Option<&str> {
    defline
        .split('|')
        .nth(GI_FIELD)
        .map(|gi| gi.trim())
        .filter(|gi| !gi.is_empty())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HitStats {
    pub rows: usize,
    pub flagged_hits: usize,
}

/// Attach the GI numbers of every BLAST hit to its flagged ORF.
///
/// Rows for ORFs that are not flagged are skipped without further parsing.
/// Every GI seen is registered as pending in `gi_table`.
pub fn collect_hits<R: BufRead>(
    reader: R,
    flagged: &mut FlaggedOrfs,
    gi_table: &mut GiTable,
    source: &str,
) -> Result<HitStats> {
    let mut stats = HitStats::default();

    for_each_line(reader, |line_no, line| {
        stats.rows += 1;

        let mut columns = line.split(|&b| b == b'\t');
        let orf = String::from_utf8_lossy(columns.next().unwrap_or_default());
        if !flagged.contains(&orf) {
            return Ok(());
        }

        let defline = columns
            .next()
            .map(String::from_utf8_lossy)
            .ok_or_else(|| malformed_row(source, line_no, TARGET_COLUMN + 1, 1))?;
        let gi = extract_gi(&defline).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{}:{}: no GI number in target defline {:?}",
                    source, line_no, defline
                ),
            )
        })?;

        flagged.push_gi(&orf, gi);
        gi_table.register(gi, &orf);
        stats.flagged_hits += 1;
        Ok(())
    })?;

    Ok(stats)
}
