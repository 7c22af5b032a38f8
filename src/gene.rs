pub use bio_types::strand::Strand;

pub type Pos = u64;

/// Gene.
/// All positions are 0-based.
#[derive(Debug, Clone)]
pub struct Gene {
    /// Gene name
    pub name: String,
    /// Chromosome or contig name
    pub chrom: String,
    /// Genomic start position
    pub start: Pos,
    /// Genomic end position (exclusive)
    pub end: Pos,
    /// Genomic strand
    pub strand: Strand,
    /// Disjoint coding regions in genomic coordinates but sorted 5' to 3' of the gene
    pub coding_regions: Vec<Region>,
}

/// Region.
/// All positions are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Genomic start position
    pub start: Pos,
    /// Genomic end position (exclusive)
    pub end: Pos,
}

impl Region {
    #[inline]
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    #[inline]
    pub fn contains(&self, pos: Pos) -> bool {
        pos >= self.start && pos < self.end
    }
}

/// Compare chromosome names, ignoring any `chr` prefix.
pub fn same_chrom(a: &str, b: &str) -> bool {
    a.trim_start_matches("chr") == b.trim_start_matches("chr")
}

impl Gene {
    /// Length of the coding sequence.
    pub fn cds_len(&self) -> usize {
        self.coding_regions.iter().map(|r| r.len() as usize).sum()
    }

    pub fn is_reverse(&self) -> bool {
        self.strand == Strand::Reverse
    }

    /// Map a genomic position to an offset into the coding sequence.
    /// Returns `None` if the position lies outside all coding regions.
    pub fn query_position(&self, chrom: &str, pos: Pos) -> Option<usize> {
        if !same_chrom(&self.chrom, chrom) {
            return None;
        }

        let mut offset = 0;
        for region in self.coding_regions.iter() {
            if region.contains(pos) {
                let local = if self.is_reverse() {
                    region.end - 1 - pos
                } else {
                    pos - region.start
                };
                return Some(offset + local as usize);
            }
            offset += region.len() as usize;
        }

        None
    }
}
