pub mod position;

use std::fmt;

use crate::constants::STOP;
use crate::seq::coding::GeneSequence;
use crate::seq::{self, Nucleotide, Residue};

/// Single nucleotide substitution placed on the coding sequence of a gene.
#[derive(Debug, Clone, PartialEq)]
pub struct CodingMutation {
    /// Position in coding DNA sequence
    pub c_pos: usize,
    /// Reference nucleotide on the coding strand
    pub nt_ref: Nucleotide,
    /// Tumour nucleotide on the coding strand
    pub nt_alt: Nucleotide,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MutImpact {
    Synonymous,
    Missense,
    Nonsense,
    StopLost,
    Unknown,
}

impl fmt::Display for MutImpact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let c = match *self {
            MutImpact::Synonymous => "syn",
            MutImpact::Missense => "mis",
            MutImpact::Nonsense => "non",
            MutImpact::StopLost => "sl",
            MutImpact::Unknown => "unk",
        };
        write!(f, "{}", c)
    }
}

/// Amino acid change caused by a substitution.
/// Positions are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AaMutInfo {
    /// Codon index, or `None` if the codon is incomplete
    pub codon_pos: Option<usize>,
    /// Reference amino acid residue
    pub reference_aa: Option<Residue>,
    /// Somatic amino acid residue
    pub somatic_aa: Option<Residue>,
}

impl AaMutInfo {
    /// Codon number starting at 1.
    #[inline]
    pub fn codon_number(&self) -> Option<usize> {
        self.codon_pos.map(|p| p + 1)
    }

    pub fn impact(&self) -> MutImpact {
        match (self.reference_aa, self.somatic_aa) {
            (Some(r), Some(s)) if r == s => MutImpact::Synonymous,
            (Some(r), Some(STOP)) if r != STOP => MutImpact::Nonsense,
            (Some(STOP), Some(_)) => MutImpact::StopLost,
            (Some(_), Some(_)) => MutImpact::Missense,
            _ => MutImpact::Unknown,
        }
    }

    #[inline]
    pub fn is_nonsense(&self) -> bool {
        self.impact() == MutImpact::Nonsense
    }

    #[inline]
    pub fn is_missense(&self) -> bool {
        self.impact() == MutImpact::Missense
    }

    /// HGVS-like protein change, e.g. `p.K2N`.
    pub fn protein_change(&self) -> String {
        let (aa_ref, aa_alt, pos) = match (self.reference_aa, self.somatic_aa, self.codon_number()) {
            (Some(r), Some(s), Some(p)) => (r as char, s as char, p),
            _ => return String::from("p.?"),
        };
        match self.impact() {
            MutImpact::Synonymous => format!("p.{}{}=", aa_ref, pos),
            MutImpact::StopLost => format!("p.*{}{}ext*?", pos, aa_alt),
            _ => format!("p.{}{}{}", aa_ref, pos, aa_alt),
        }
    }
}

/// Derive the amino acid change of each substitution.
///
/// The codon containing each position is translated before and after replacing
/// the base at the position with the somatic base.
pub fn get_aa_mut_info(positions: &[usize], somatic_bases: &[Nucleotide], gs: &GeneSequence) -> Vec<AaMutInfo> {
    positions.iter().zip(somatic_bases.iter())
        .map(|(&pos, &nt_alt)| {
            match gs.get_codon(pos) {
                Some((codon, offset)) => {
                    let mut mutant = codon;
                    mutant[offset] = nt_alt;
                    AaMutInfo {
                        codon_pos: Some(pos / 3),
                        reference_aa: seq::translate(&codon),
                        somatic_aa: seq::translate(&mutant),
                    }
                },
                None => AaMutInfo { codon_pos: None, reference_aa: None, somatic_aa: None },
            }
        })
        .collect()
}

/// Count nonsense mutations: a stop codon gained where there was none.
pub fn calc_deleterious_info(aa_info: &[AaMutInfo]) -> usize {
    aa_info.iter().filter(|x| x.is_nonsense()).count()
}
