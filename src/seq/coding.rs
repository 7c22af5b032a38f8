use std::io;

use bio::io::fasta;
use log::debug;

use crate::error::{Error, Result};
use crate::gene::Gene;
use crate::seq::{self, Codon, DnaSeq, Nucleotide};

/// Coding sequence of one gene, 5' to 3' on the gene's strand.
/// Positions are 0-based offsets into the coding sequence.
#[derive(Debug, Clone, Default)]
pub struct GeneSequence {
    pub name: String,
    pub seq: DnaSeq,
}

impl GeneSequence {
    /// Construct from an already assembled coding sequence.
    pub fn from_seq(name: &str, seq: &[Nucleotide]) -> Result<GeneSequence> {
        let gs = GeneSequence { name: name.to_owned(), seq: seq.to_ascii_uppercase() };
        gs.check_frame()?;
        Ok(gs)
    }

    /// Load the coding sequence of `gene` from an indexed FASTA, replacing the current one.
    ///
    /// Coding regions are read in transcript order; regions on the reverse strand are
    /// reverse complemented before being joined.
    pub fn set_gene<R: io::Read + io::Seek>(&mut self, reader: &mut fasta::IndexedReader<R>, gene: &Gene) -> Result<()> {
        let mut cds: DnaSeq = Vec::with_capacity(gene.cds_len());
        let mut region_seq: DnaSeq = Vec::new();
        for region in gene.coding_regions.iter() {
            region_seq.clear();
            reader.fetch(&gene.chrom, region.start, region.end)
                .and_then(|_| reader.read(&mut region_seq))
                .map_err(|e| Error::Fasta {
                    region: format!("{}:{}-{}", gene.chrom, region.start + 1, region.end),
                    msg: e.to_string(),
                })?;
            if region_seq.len() as u64 != region.len() {
                return Err(Error::Fasta {
                    region: format!("{}:{}-{}", gene.chrom, region.start + 1, region.end),
                    msg: format!("expected {} bases, got {}", region.len(), region_seq.len()),
                });
            }
            region_seq.make_ascii_uppercase();
            if gene.is_reverse() {
                seq::reverse_complement(&mut region_seq);
            }
            cds.extend_from_slice(&region_seq);
        }

        self.name = gene.name.clone();
        self.seq = cds;
        self.check_frame()
    }

    fn check_frame(&self) -> Result<()> {
        if self.seq.len() % 3 != 0 {
            return Err(Error::InvalidSequence(format!(
                "coding sequence of {} has length {}, which is not a multiple of 3",
                self.name, self.seq.len()
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    #[inline]
    pub fn num_codons(&self) -> usize {
        self.seq.len() / 3
    }

    /// Overlay germline alleles onto the reference sequence.
    /// Positions outside of the coding sequence are ignored.
    pub fn add_germline_variants(&mut self, ref_bases: &[Nucleotide], positions: &[usize]) {
        for (&nt, &pos) in ref_bases.iter().zip(positions.iter()) {
            match self.seq.get_mut(pos) {
                Some(x) => *x = nt.to_ascii_uppercase(),
                None => debug!("{}: germline variant at {} lies outside the coding sequence", self.name, pos),
            }
        }
    }

    /// Codon containing `pos` and the offset of `pos` within it.
    pub fn get_codon(&self, pos: usize) -> Option<(Codon, usize)> {
        let start = pos - pos % 3;
        if start + 3 > self.seq.len() {
            return None;
        }
        let codon = [self.seq[start], self.seq[start + 1], self.seq[start + 2]];
        Some((codon, pos % 3))
    }
}
