use anyhow::{Context, Result};
use clap::Parser;
use mptaxa::contig::contig_lcas;
use mptaxa::layout::locate_tree_files;
use mptaxa::utils::open_reader;
use mptaxa::NcbiTree;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about = "Compute the LCA TaxonID of each contig from its annotated taxa"
)]
pub struct Args {
    /// contig_taxa file: contig id followed by tab-separated TaxonIDs
    pub input: PathBuf,

    /// MetaPathways installation directory (holds MetaPathways_DBs)
    pub pipeline_root: PathBuf,

    /// Taxonomy tree file(s), default = the ncbi_taxonomy_tree.txt under the pipeline root
    #[arg(long = "tree")]
    pub tree_files: Vec<PathBuf>,

    /// Output file, default = standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: Args) -> Result<()> {
    let tree_files = if args.tree_files.is_empty() {
        locate_tree_files(&args.pipeline_root).context("locating taxonomy tree")?
    } else {
        args.tree_files.clone()
    };
    let taxonomy = NcbiTree::from_files(&tree_files).context("loading taxonomy tree")?;

    let reader = open_reader(&args.input)
        .with_context(|| format!("cannot open contig taxa file {:?}", args.input))?;
    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create output file {:?}", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let count = contig_lcas(reader, &mut writer, &taxonomy)
        .with_context(|| format!("computing contig LCAs from {:?}", args.input))?;
    log::info!("wrote LCAs for {} contigs", count);
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
