//! The indeterminate-taxonomy repair pass.
//!
//! Four stages run back to back, each finishing before the next starts:
//! select flagged ORFs from the annotation table, attach BLAST GI numbers,
//! resolve GIs through the catalog, then aggregate and rewrite the table.

use crate::annotation::{rewrite_annotations, select_flagged, RewriteStats, Sentinels};
use crate::blast::{collect_hits, HitStats};
use crate::catalog::{resolve_catalog, CatalogStats, GiTable};
use crate::consensus::aggregate;
use crate::taxonomy::ConsensusTaxonomy;
use crate::utils::open_reader;
use serde::Serialize;
use std::io::{Result, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct Inputs {
    pub annotation: PathBuf,
    pub blast: Vec<PathBuf>,
    pub catalog: PathBuf,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    pub flagged_orfs: usize,
    pub blast: HitStats,
    pub gi_numbers: usize,
    pub resolved_gi_numbers: usize,
    pub catalog: CatalogStats,
    pub rewrite: RewriteStats,
}

/// Optional tab-separated trace of the catalog matches and per-ORF
/// evaluation.
pub struct Diagnostics<'a> {
    out: Option<&'a mut dyn Write>,
}

impl<'a> Diagnostics<'a> {
    pub fn new(out: Option<&'a mut dyn Write>) -> Self {
        Self { out }
    }

    pub fn disabled() -> Self {
        Self { out: None }
    }

    fn record(&mut self, fields: &[&str]) -> Result<()> {
        match self.out.as_mut() {
            Some(out) => writeln!(out, "{}", fields.join("\t")),
            None => Ok(()),
        }
    }

    fn is_enabled(&self) -> bool {
        self.out.is_some()
    }

    fn flush(&mut self) -> Result<()> {
        match self.out.as_mut() {
            Some(out) => out.flush(),
            None => Ok(()),
        }
    }
}

fn source_name(path: &Path) -> String {
    path.display().to_string()
}

/// Run the whole repair pass and write the corrected table to `output`.
pub fn run_indeterminate<T, W>(
    inputs: &Inputs,
    sentinels: &Sentinels,
    taxonomy: &T,
    output: &mut W,
    diagnostics: &mut Diagnostics,
) -> Result<RunSummary>
where
    T: ConsensusTaxonomy + ?Sized,
    W: Write,
{
    let mut summary = RunSummary::default();
    let annotation_source = source_name(&inputs.annotation);

    let start = Instant::now();
    let mut flagged = select_flagged(
        open_reader(&inputs.annotation)?,
        sentinels,
        &annotation_source,
    )?;
    summary.flagged_orfs = flagged.len();
    log::info!(
        "{} flagged ORFs in {} ({:?})",
        flagged.len(),
        annotation_source,
        start.elapsed()
    );

    let start = Instant::now();
    let mut gi_table = GiTable::new();
    for blast_file in &inputs.blast {
        let source = source_name(blast_file);
        let stats = collect_hits(
            open_reader(blast_file)?,
            &mut flagged,
            &mut gi_table,
            &source,
        )?;
        log::info!(
            "{}: {} rows, {} hits on flagged ORFs",
            source,
            stats.rows,
            stats.flagged_hits
        );
        summary.blast.rows += stats.rows;
        summary.blast.flagged_hits += stats.flagged_hits;
    }
    summary.gi_numbers = gi_table.len();
    log::info!(
        "{} distinct GI numbers to resolve ({:?})",
        gi_table.len(),
        start.elapsed()
    );

    let start = Instant::now();
    let catalog_source = source_name(&inputs.catalog);
    summary.catalog = if gi_table.is_empty() {
        log::info!("no GI numbers pending, skipping {}", catalog_source);
        CatalogStats::default()
    } else {
        resolve_catalog(
            open_reader(&inputs.catalog)?,
            &mut gi_table,
            &catalog_source,
            |m| {
                for orf in m.orfs {
                    let fields = ["catalog", orf.as_str(), m.gi, m.species, m.taxid];
                    diagnostics.record(&fields)?;
                }
                Ok(())
            },
        )?
    };
    summary.resolved_gi_numbers = gi_table.resolved_count();
    log::info!(
        "resolved {}/{} GI numbers from {} catalog rows ({:?})",
        summary.resolved_gi_numbers,
        summary.gi_numbers,
        summary.catalog.rows,
        start.elapsed()
    );
    if summary.resolved_gi_numbers < summary.gi_numbers {
        log::warn!(
            "{} GI numbers not found in the catalog",
            summary.gi_numbers - summary.resolved_gi_numbers
        );
    }

    let consensus = aggregate(&flagged, &gi_table, taxonomy);

    if diagnostics.is_enabled() {
        for (orf, gis) in flagged.iter() {
            for gi in gis {
                let taxid = gi_table.taxon(gi).unwrap_or_default();
                let lineage = taxonomy.lookup_lineage(taxid);
                let fields = ["hit", orf.as_str(), gi.as_str(), taxid, lineage.as_str()];
                diagnostics.record(&fields)?;
            }
            let hits = gis.len().to_string();
            let label = consensus.get(orf).map(|s| s.as_str()).unwrap_or_default();
            diagnostics.record(&["locus", orf.as_str(), hits.as_str(), label])?;
        }
        diagnostics.flush()?;
    }

    let start = Instant::now();
    summary.rewrite = rewrite_annotations(
        open_reader(&inputs.annotation)?,
        output,
        sentinels,
        &consensus,
        &annotation_source,
    )?;
    log::info!(
        "wrote {} rows, {} of {} flagged rows rewritten ({:?})",
        summary.rewrite.rows,
        summary.rewrite.rewritten_rows,
        summary.rewrite.flagged_rows,
        start.elapsed()
    );

    Ok(summary)
}
