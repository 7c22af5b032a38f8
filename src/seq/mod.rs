pub mod coding;
pub mod context;

use crate::constants::*;

pub type Nucleotide = u8;
pub type Residue = u8;

pub type Codon = [Nucleotide; 3];

pub type DnaSeq = Vec<Nucleotide>;

/// Standard genetic code.
/// Codons are ordered by A, C, G, T with the first base varying slowest,
/// e.g. AAA, AAC, AAG, AAT, ACA, ...
const GENETIC_CODE: &[u8; N_CODONS] =
    b"KNKNTTTTRSRSIIMIQHQHPPPPRRRRLLLLEDEDAAAAGGGGVVVV*Y*YSSSS*CWCLFLF";

pub fn complement(x: Nucleotide) -> Nucleotide {
    match x {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        b'N' => b'N',
        b'a' => b't',
        b'c' => b'g',
        b'g' => b'c',
        b't' => b'a',
        b'n' => b'n',
        _ => b'.',
    }
}

/// Reverse complement sequence in place.
pub fn reverse_complement(seq: &mut [Nucleotide]) {
    let n = seq.len();
    // iterate from 0 to floor(n / 2) - 1
    for i in 0 .. (n / 2) {
        let j = n - 1 - i;
        let x = complement(seq[i]);
        seq[i] = complement(seq[j]);
        seq[j] = x;
    }
    if n % 2 == 1 {
        // lone middle element has not been touched
        let j = n / 2;
        seq[j] = complement(seq[j]);
    }
}

/// Index of an upper-case nucleotide in A, C, G, T order.
#[inline]
pub fn nucleotide_index(x: Nucleotide) -> Option<usize> {
    match x {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' => Some(3),
        _ => None,
    }
}

/// Whether an allele string is a single A, C, G or T.
pub fn is_valid_nuc(x: &str) -> bool {
    x.len() == 1 && nucleotide_index(x.as_bytes()[0]).is_some()
}

/// Translate a codon with the standard genetic code.
/// Stop codons translate to `*`; codons containing other than A, C, G, T yield `None`.
pub fn translate(codon: &Codon) -> Option<Residue> {
    let i = nucleotide_index(codon[0])?;
    let j = nucleotide_index(codon[1])?;
    let k = nucleotide_index(codon[2])?;
    Some(GENETIC_CODE[(i * N_NUCLEOTIDES + j) * N_NUCLEOTIDES + k])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_complement() {
        let mut x = b"ACGTTA".to_vec();
        reverse_complement(&mut x);
        assert_eq!(x, b"TAACGT".to_vec());

        let mut y = b"AAC".to_vec();
        reverse_complement(&mut y);
        assert_eq!(y, b"GTT".to_vec());
    }

    #[test]
    fn test_translate() {
        assert_eq!(translate(b"ATG"), Some(b'M'));
        assert_eq!(translate(b"AAA"), Some(b'K'));
        assert_eq!(translate(b"AAC"), Some(b'N'));
        assert_eq!(translate(b"TGG"), Some(b'W'));
        assert_eq!(translate(b"GGA"), Some(b'G'));
        assert_eq!(translate(b"CTT"), Some(b'L'));
        assert_eq!(translate(b"AGA"), Some(b'R'));
        assert_eq!(translate(b"TTC"), Some(b'F'));
        assert_eq!(translate(b"ANA"), None);
    }

    #[test]
    fn test_translate_stops() {
        let stops: Vec<&Codon> = vec![b"TAA", b"TAG", b"TGA"];
        for codon in stops {
            assert_eq!(translate(codon), Some(STOP));
        }
        let n_stops = GENETIC_CODE.iter().filter(|&&aa| aa == STOP).count();
        assert_eq!(n_stops, 3);
    }

    #[test]
    fn test_genetic_code_residues() {
        let mut residues: Vec<u8> = GENETIC_CODE.iter().cloned().filter(|&aa| aa != STOP).collect();
        residues.sort();
        residues.dedup();
        assert_eq!(residues.len(), 20);
    }

    #[test]
    fn test_is_valid_nuc() {
        assert!(is_valid_nuc("A"));
        assert!(is_valid_nuc("T"));
        assert!(!is_valid_nuc("N"));
        assert!(!is_valid_nuc("AC"));
        assert!(!is_valid_nuc("-"));
        assert!(!is_valid_nuc(""));
    }
}
