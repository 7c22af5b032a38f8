use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};
use crate::gene::{Gene, Pos, Region, Strand};

/// A BED reader yielding one gene per line.
///
/// BED12 lines contribute one coding region per block, clipped to the thick
/// (coding) interval. BED6 lines are a single region.
pub struct Reader<R: io::Read> {
    inner: csv::Reader<R>,
}

impl Reader<fs::File> {
    /// Read from a given file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        fs::File::open(path).map(Reader::new)
    }
}

impl<R: io::Read> Reader<R> {
    /// Read from a given reader.
    pub fn new(reader: R) -> Self {
        Reader {
            inner: csv::ReaderBuilder::new()
                .delimiter(b'\t')
                .comment(Some(b'#'))
                .has_headers(false)
                .flexible(true)
                .from_reader(reader),
        }
    }

    /// Read all genes.
    pub fn genes(&mut self) -> Result<Vec<Gene>> {
        let mut genes = Vec::new();
        for res in self.inner.records() {
            let record = res?;
            let first = record.get(0).unwrap_or("");
            if first.is_empty() || first.starts_with("track") || first.starts_with("browser") {
                continue;
            }
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            genes.push(parse_gene(&record, line)?);
        }
        Ok(genes)
    }
}

fn parse_pos(record: &csv::StringRecord, i: usize, line: u64) -> Result<Pos> {
    let x = record.get(i).ok_or_else(|| Error::Parse { line, msg: format!("missing column {}", i + 1) })?;
    x.trim().parse::<Pos>().map_err(|e| Error::Parse { line, msg: format!("column {}: {}", i + 1, e) })
}

fn parse_list(x: &str, line: u64) -> Result<Vec<Pos>> {
    x.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Pos>().map_err(|e| Error::Parse { line, msg: format!("block list {:?}: {}", x, e) }))
        .collect()
}

fn parse_gene(record: &csv::StringRecord, line: u64) -> Result<Gene> {
    if record.len() < 6 {
        return Err(Error::Parse { line, msg: format!("expected at least 6 columns, found {}", record.len()) });
    }

    let chrom = record[0].to_owned();
    let start = parse_pos(record, 1, line)?;
    let end = parse_pos(record, 2, line)?;
    let name = record[3].to_owned();
    let strand = match &record[5] {
        "+" => Strand::Forward,
        "-" => Strand::Reverse,
        _ => Strand::Unknown,
    };

    let mut regions = if record.len() >= 12 {
        let thick_start = parse_pos(record, 6, line)?;
        let thick_end = parse_pos(record, 7, line)?;
        let sizes = parse_list(&record[10], line)?;
        let starts = parse_list(&record[11], line)?;
        if sizes.len() != starts.len() {
            return Err(Error::Parse { line, msg: String::from("block sizes and starts differ in number") });
        }

        let blocks = starts.iter().zip(sizes.iter())
            .map(|(&s, &n)| Region { start: start + s, end: start + s + n });
        if thick_start < thick_end {
            blocks
                .map(|r| Region { start: r.start.max(thick_start), end: r.end.min(thick_end) })
                .filter(|r| r.start < r.end)
                .collect::<Vec<Region>>()
        } else {
            blocks.collect()
        }
    } else {
        vec![Region { start, end }]
    };

    // order regions 5' to 3' of the gene
    regions.sort_by_key(|r| r.start);
    if strand == Strand::Reverse {
        regions.reverse();
    }

    Ok(Gene { name, chrom, start, end, strand, coding_regions: regions })
}

/// Group genes by chromosome, excluding the named genes.
/// Chromosomes are ordered by name.
pub fn genes_by_chrom(genes: Vec<Gene>, exclude: &HashSet<String>) -> BTreeMap<String, Vec<Gene>> {
    let mut chroms: BTreeMap<String, Vec<Gene>> = BTreeMap::new();
    for gene in genes.into_iter().filter(|g| !exclude.contains(&g.name)) {
        chroms.entry(gene.chrom.clone()).or_insert_with(Vec::new).push(gene);
    }
    chroms
}

#[cfg(test)]
mod tests {
    use super::*;

    const BED_FILE: &'static [u8] = b"track name=genes
chr1\t100\t200\tG1\t0\t+\t102\t190\t0\t3\t10,20,15,\t0,40,85,
chr1\t300\t320\tG2\t0\t-\t300\t320\t0\t2\t6,3\t0,17
chr2\t10\t19\tG3\t0\t+
";

    #[test]
    fn test_genes() {
        let genes = Reader::new(BED_FILE).genes().expect("Error reading BED");
        assert_eq!(genes.len(), 3);

        let g1 = &genes[0];
        assert_eq!(g1.name, "G1");
        assert_eq!(g1.coding_regions, vec![
            Region { start: 102, end: 110 },
            Region { start: 140, end: 160 },
            Region { start: 185, end: 190 },
        ]);

        let g2 = &genes[1];
        assert_eq!(g2.strand, Strand::Reverse);
        assert_eq!(g2.coding_regions, vec![Region { start: 317, end: 320 }, Region { start: 300, end: 306 }]);
        assert_eq!(g2.cds_len(), 9);

        let g3 = &genes[2];
        assert_eq!(g3.coding_regions, vec![Region { start: 10, end: 19 }]);
    }

    #[test]
    fn test_bad_line() {
        let mut reader = Reader::new(&b"chr1\t100\tabc\tG1\t0\t+\n"[..]);
        assert!(reader.genes().is_err());
        let mut reader = Reader::new(&b"chr1\t100\t200\n"[..]);
        assert!(reader.genes().is_err());
    }

    #[test]
    fn test_genes_by_chrom() {
        let genes = Reader::new(BED_FILE).genes().unwrap();
        let mut exclude = HashSet::new();
        exclude.insert(String::from("G2"));
        let chroms = genes_by_chrom(genes, &exclude);
        assert_eq!(chroms.keys().cloned().collect::<Vec<String>>(), vec!["chr1", "chr2"]);
        assert_eq!(chroms["chr1"].len(), 1);
        assert_eq!(chroms["chr1"][0].name, "G1");
    }
}
