use clap::{Parser, Subcommand};
mod contig_lca;
mod indeterminate_lcas;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Recompute the taxonomy of ORFs flagged as indeterminate
    IndeterminateLcas(indeterminate_lcas::Args),
    /// Compute the LCA TaxonID of each contig
    ContigLca(contig_lca::Args),
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();

    match args.cmd {
        Commands::IndeterminateLcas(cmd_args) => {
            indeterminate_lcas::run(cmd_args)?;
        }
        Commands::ContigLca(cmd_args) => {
            contig_lca::run(cmd_args)?;
        }
    }

    Ok(())
}
