use crate::taxonomy::ConsensusTaxonomy;
use crate::utils::trim_line_end;
use std::io::{BufRead, Result, Write};

/// Collapse `contig\ttaxon\ttaxon...` rows into `contig\tlca_taxid`.
///
/// Empty taxon fields are ignored; a contig with no known taxon gets the
/// root. Returns the number of contigs written.
pub fn contig_lcas<R, W, T>(reader: R, writer: &mut W, taxonomy: &T) -> Result<usize>
where
    R: BufRead,
    W: Write,
    T: ConsensusTaxonomy + ?Sized,
{
    let mut count = 0;
    for line in reader.lines() {
        let line = line?;
        let line = trim_line_end(&line);
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let contig = fields.next().unwrap_or_default();
        let taxa: Vec<&str> = fields.map(|f| f.trim()).filter(|f| !f.is_empty()).collect();

        writeln!(writer, "{}\t{}", contig, taxonomy.lca_id(&taxa))?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}
