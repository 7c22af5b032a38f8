use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use log::debug;

use crate::constants::{LOF_CLASSES, SNV_CLASSES};
use crate::error::{Error, Result};
use crate::gene::Pos;
use crate::seq;

const GENE: &str = "Gene";
const CHROM: &str = "Chromosome";
const START: &str = "Start_Position";
const REF: &str = "Reference_Allele";
const ALT: &str = "Tumor_Allele";
const CLASS: &str = "Variant_Classification";

/// A mutation table reader.
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
                .has_headers(true)
                .flexible(true)
                .from_reader(reader),
        }
    }

    /// Iterate over records.
    /// Rows with an unusable position are skipped; a missing column or a
    /// malformed line stops reading.
    pub fn records(&mut self) -> Result<Records<'_, R>> {
        let headers = self.inner.headers()?.clone();
        let column = |name: &str| -> Result<usize> {
            headers.iter().position(|h| h == name).ok_or_else(|| Error::MissingField(name.to_owned()))
        };
        let columns = Columns {
            gene: column(GENE)?,
            chrom: column(CHROM)?,
            start: column(START)?,
            ref_allele: column(REF)?,
            tumor_allele: column(ALT)?,
            class: column(CLASS)?,
        };
        Ok(Records { inner: self.inner.records(), columns })
    }
}

struct Columns {
    gene: usize,
    chrom: usize,
    start: usize,
    ref_allele: usize,
    tumor_allele: usize,
    class: usize,
}

pub struct Records<'r, R: 'r + io::Read> {
    inner: csv::StringRecordsIter<'r, R>,
    columns: Columns,
}

impl<'r, R: io::Read> Records<'r, R> {
    /// Returns `None` for rows whose start position is not a positive integer.
    fn parse(&self, record: &csv::StringRecord) -> Result<Option<Record>> {
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let field = |i: usize, name: &str| -> Result<String> {
            record.get(i)
                .map(|x| x.trim().to_owned())
                .ok_or_else(|| Error::MissingField(format!("{} on line {}", name, line)))
        };

        let start = field(self.columns.start, START)?;
        let start: Pos = match start.parse::<Pos>() {
            Ok(x) if x > 0 => x - 1,
            _ => {
                debug!("line {}: skipping row with invalid {} {:?}", line, START, start);
                return Ok(None);
            },
        };

        Ok(Some(Record {
            gene: field(self.columns.gene, GENE)?,
            chrom: field(self.columns.chrom, CHROM)?,
            start,
            ref_allele: field(self.columns.ref_allele, REF)?,
            tumor_allele: field(self.columns.tumor_allele, ALT)?,
            class: field(self.columns.class, CLASS)?,
        }))
    }
}

impl<'r, R: io::Read> Iterator for Records<'r, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        loop {
            let record = match self.inner.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(Error::Csv(e))),
            };
            match self.parse(&record) {
                Ok(Some(r)) => return Some(Ok(r)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// A mutation record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Gene name
    pub gene: String,
    /// Chromosome or contig name
    pub chrom: String,
    /// Genomic start position (0-based)
    pub start: Pos,
    /// Reference allele on the positive/reference strand
    pub ref_allele: String,
    /// Tumour allele on the positive/reference strand
    pub tumor_allele: String,
    /// Variant classification
    pub class: String,
}

impl Record {
    /// Single nucleotide coding substitution with A, C, G or T alleles.
    pub fn is_valid_snv(&self) -> bool {
        SNV_CLASSES.contains(&self.class.as_str())
            && seq::is_valid_nuc(&self.ref_allele)
            && seq::is_valid_nuc(&self.tumor_allele)
    }

    #[inline]
    pub fn ref_nt(&self) -> seq::Nucleotide {
        self.ref_allele.as_bytes()[0]
    }

    #[inline]
    pub fn alt_nt(&self) -> seq::Nucleotide {
        self.tumor_allele.as_bytes()[0]
    }
}

/// Mutations grouped by gene.
#[derive(Debug, Default)]
pub struct MutationTable {
    genes: HashMap<String, Vec<Record>>,
}

impl MutationTable {
    /// Keep valid single nucleotide substitutions only.
    pub fn from_records(records: &[Record]) -> MutationTable {
        let mut genes: HashMap<String, Vec<Record>> = HashMap::new();
        for r in records.iter() {
            if r.is_valid_snv() {
                genes.entry(r.gene.clone()).or_insert_with(Vec::new).push(r.clone());
            } else {
                debug!("skipping {} {}:{} {}>{} ({})", r.gene, r.chrom, r.start + 1, r.ref_allele, r.tumor_allele, r.class);
            }
        }
        MutationTable { genes }
    }

    pub fn gene(&self, name: &str) -> &[Record] {
        self.genes.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.genes.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

/// Read all records of a mutation table.
pub fn read_records<R: io::Read>(reader: &mut Reader<R>) -> Result<Vec<Record>> {
    reader.records()?.collect()
}

/// Fraction of each gene's mutations that are loss-of-function.
pub fn tsg_scores(records: &[Record]) -> HashMap<String, f64> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for r in records.iter() {
        let c = counts.entry(r.gene.as_str()).or_insert((0, 0));
        c.0 += 1;
        if LOF_CLASSES.contains(&r.class.as_str()) {
            c.1 += 1;
        }
    }
    counts.into_iter()
        .map(|(gene, (n, lof))| (gene.to_owned(), lof as f64 / n as f64))
        .collect()
}

/// Genes whose TSG score reaches the threshold.
pub fn high_tsg_score_genes(records: &[Record], threshold: f64) -> HashSet<String> {
    tsg_scores(records).into_iter()
        .filter(|&(_, score)| score >= threshold)
        .map(|(gene, _)| gene)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MUTATION_FILE: &'static [u8] = b"# comment
Gene\tTumor_Sample\tChromosome\tStart_Position\tReference_Allele\tTumor_Allele\tVariant_Classification
KRAS\tS1\t12\t25398284\tC\tA\tMissense_Mutation
KRAS\tS2\t12\t25398284\tC\tT\tMissense_Mutation
TP53\tS1\t17\t7577120\tC\tT\tNonsense_Mutation
TP53\tS3\t17\t7577121\tCT\t-\tFrame_Shift_Del
TP53\tS4\t17\t7577130\tG\tN\tMissense_Mutation
TP53\tS5\t17\t7577140\tG\tA\tSilent
";

    #[test]
    fn test_reader() {
        let genes = ["KRAS", "KRAS", "TP53", "TP53", "TP53", "TP53"];
        let starts = [25398283, 25398283, 7577119, 7577120, 7577129, 7577139];
        let alts = ["A", "T", "T", "-", "N", "A"];

        let mut reader = Reader::new(MUTATION_FILE);
        let records = read_records(&mut reader).expect("Error reading records");
        assert_eq!(records.len(), 6);
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r.gene, genes[i]);
            assert_eq!(r.start, starts[i]);
            assert_eq!(r.tumor_allele, alts[i]);
        }
        assert_eq!(records[0].chrom, "12");
        assert_eq!(records[0].ref_nt(), b'C');
    }

    #[test]
    fn test_missing_column() {
        let mut reader = Reader::new(&b"Gene\tChromosome\nKRAS\t12\n"[..]);
        assert!(reader.records().is_err());
    }

    #[test]
    fn test_bad_position_skipped() {
        let data = b"Gene\tChromosome\tStart_Position\tReference_Allele\tTumor_Allele\tVariant_Classification
KRAS\t12\tNA\tC\tA\tMissense_Mutation
KRAS\t12\t0\tC\tA\tMissense_Mutation
KRAS\t12\t25398284\tC\tT\tMissense_Mutation
TP53\t17\t-5\tC\tT\tNonsense_Mutation
";
        let mut reader = Reader::new(&data[..]);
        let records = read_records(&mut reader).expect("rows with bad positions should be skipped");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].start, 25398283);
        assert_eq!(records[0].tumor_allele, "T");
    }

    #[test]
    fn test_mutation_table_filters() {
        let records = read_records(&mut Reader::new(MUTATION_FILE)).unwrap();
        let table = MutationTable::from_records(&records);
        assert_eq!(table.gene("KRAS").len(), 2);
        // frame shift and N allele are dropped
        assert_eq!(table.gene("TP53").len(), 2);
        assert_eq!(table.gene("EGFR").len(), 0);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_tsg_scores() {
        let records = read_records(&mut Reader::new(MUTATION_FILE)).unwrap();
        let scores = tsg_scores(&records);
        assert_eq!(scores["KRAS"], 0.0);
        assert!((scores["TP53"] - 0.5).abs() < 1.0e-12);

        let high = high_tsg_score_genes(&records, 0.10);
        assert!(high.contains("TP53"));
        assert!(!high.contains("KRAS"));
    }
}
