pub mod annotation;
pub mod blast;
pub mod catalog;
pub mod consensus;
pub mod contig;
pub mod layout;
pub mod pipeline;
pub mod taxonomy;
pub mod utils;

pub use annotation::Sentinels;
pub use taxonomy::{ConsensusTaxonomy, NcbiTree};
