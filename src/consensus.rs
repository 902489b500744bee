use crate::annotation::FlaggedOrfs;
use crate::catalog::GiTable;
use crate::taxonomy::ConsensusTaxonomy;
use indexmap::IndexMap;

/// One single-taxon group per GI hit; an unresolved GI yields an empty group.
pub fn taxon_groups(gis: &[String], gi_table: &GiTable) -> Vec<Vec<String>> {
    gis.iter()
        .map(|gi| match gi_table.taxon(gi) {
            Some(taxid) => vec![taxid.to_string()],
            None => Vec::new(),
        })
        .collect()
}

/// Consensus taxonomy for every flagged ORF, in file order.
///
/// ORFs without any hit are still sent to the taxonomy with an empty group
/// list, and whatever it answers is kept.
pub fn aggregate<T: ConsensusTaxonomy + ?Sized>(
    flagged: &FlaggedOrfs,
    gi_table: &GiTable,
    taxonomy: &T,
) -> IndexMap<String, String> {
    let mut consensus = IndexMap::with_capacity(flagged.len());
    for (orf, gis) in flagged.iter() {
        let groups = taxon_groups(gis, gi_table);
        let taxonomy_label = taxonomy.resolve_consensus(&groups);
        log::debug!("{}: {} hits -> {}", orf, gis.len(), taxonomy_label);
        consensus.insert(orf.clone(), taxonomy_label);
    }
    consensus
}
