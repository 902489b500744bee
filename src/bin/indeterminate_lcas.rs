use anyhow::{Context, Result};
use clap::Parser;
use mptaxa::annotation::{INDETERMINATE_TAXONOMY, ROOT_TAXONOMY};
use mptaxa::layout::{
    locate_annotation_table, locate_blast_tables, locate_catalog, locate_tree_files,
};
use mptaxa::pipeline::{run_indeterminate, Diagnostics, Inputs};
use mptaxa::{NcbiTree, Sentinels};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about = "Recompute the taxonomy of ORFs flagged as indeterminate",
    long_about = "Recompute the taxonomy of ORFs flagged as indeterminate.
Flagged ORFs are looked up in the parsed RefSeq BLAST results, their hits are resolved to TaxonIDs through the RefSeq catalog, and the consensus of those taxa replaces the flagged assignment.
The full annotation table is written with the corrected taxonomy column."
)]
pub struct Args {
    /// MetaPathways installation directory (holds MetaPathways_DBs)
    pub pipeline_root: PathBuf,

    /// Per-sample results directory (holds results/annotation_table and blast_results)
    pub results_dir: PathBuf,

    /// Taxonomy tree file(s), default = the ncbi_taxonomy_tree.txt under the pipeline root
    #[arg(long = "tree")]
    pub tree_files: Vec<PathBuf>,

    /// RefSeq GI to TaxonID catalog, plain or gzip-compressed
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Functional and taxonomic annotation table
    #[arg(long)]
    pub annotation: Option<PathBuf>,

    /// Parsed RefSeq BLAST result table(s)
    #[arg(long = "blast")]
    pub blast_files: Vec<PathBuf>,

    /// Taxonomy value that marks a row for recomputation
    #[arg(long = "sentinel", default_values = [INDETERMINATE_TAXONOMY, ROOT_TAXONOMY])]
    pub sentinels: Vec<String>,

    /// Output file, default = standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write a tab-separated trace of catalog matches and per-ORF results
    #[arg(long)]
    pub diagnostics: Option<PathBuf>,

    /// Write a JSON summary of the run
    #[arg(long)]
    pub summary: Option<PathBuf>,
}

fn create_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create output file {:?}", path))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

fn resolve_inputs(args: &Args) -> Result<(Vec<PathBuf>, Inputs)> {
    let tree_files = if args.tree_files.is_empty() {
        locate_tree_files(&args.pipeline_root)?
    } else {
        args.tree_files.clone()
    };
    let catalog = match &args.catalog {
        Some(catalog) => catalog.clone(),
        None => locate_catalog(&args.pipeline_root)?,
    };
    let annotation = match &args.annotation {
        Some(annotation) => annotation.clone(),
        None => locate_annotation_table(&args.results_dir)?,
    };
    let blast = if args.blast_files.is_empty() {
        locate_blast_tables(&args.results_dir)?
    } else {
        args.blast_files.clone()
    };

    Ok((
        tree_files,
        Inputs {
            annotation,
            blast,
            catalog,
        },
    ))
}

pub fn run(args: Args) -> Result<()> {
    let start = Instant::now();
    let (tree_files, inputs) = resolve_inputs(&args).context("locating input files")?;
    log::info!("annotation table: {:?}", inputs.annotation);
    log::info!("blast tables: {:?}", inputs.blast);
    log::info!("catalog: {:?}", inputs.catalog);

    let taxonomy = NcbiTree::from_files(&tree_files).context("loading taxonomy tree")?;
    let sentinels = Sentinels::new(args.sentinels.iter().cloned());

    let mut output = create_output(args.output.as_ref())?;
    let mut trace_file = match &args.diagnostics {
        Some(path) => Some(BufWriter::new(
            File::create(path)
                .with_context(|| format!("cannot create diagnostics file {:?}", path))?,
        )),
        None => None,
    };
    let mut diagnostics = Diagnostics::new(trace_file.as_mut().map(|w| w as &mut dyn Write));

    let summary = run_indeterminate(
        &inputs,
        &sentinels,
        &taxonomy,
        &mut output,
        &mut diagnostics,
    )
    .context("recomputing indeterminate taxonomy")?;
    output.flush()?;

    if let Some(path) = &args.summary {
        let file = File::create(path)
            .with_context(|| format!("cannot create summary file {:?}", path))?;
        serde_json::to_writer_pretty(file, &summary)?;
    }

    log::info!("indeterminate-lcas took: {:?}", start.elapsed());
    Ok(())
}

#[allow(dead_code)]
fn main() -> Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    run(args)
}
