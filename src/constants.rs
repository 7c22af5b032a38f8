pub const N_NUCLEOTIDES: usize = 4;

pub const N_CODONS: usize = N_NUCLEOTIDES * N_NUCLEOTIDES * N_NUCLEOTIDES;

/// Residue symbol for a stop codon
pub const STOP: u8 = b'*';

/// Label used for every position when context is ignored
pub const NO_CONTEXT: &str = "None";

pub const DEFAULT_NUM_PERMUTATIONS: usize = 10000;
pub const DEFAULT_MIN_RECURRENT: usize = 2;
pub const DEFAULT_MIN_DELETERIOUS: usize = 1;
pub const DEFAULT_TSG_SCORE: f64 = 0.10;

/// Variant classifications that describe single nucleotide coding substitutions
pub const SNV_CLASSES: [&str; 3] = ["Missense_Mutation", "Silent", "Nonsense_Mutation"];

/// Variant classifications counted towards the TSG score
pub const LOF_CLASSES: [&str; 6] = [
    "Nonsense_Mutation",
    "Frame_Shift_Del",
    "Frame_Shift_Ins",
    "Frame_Shift_Indel",
    "Splice_Site",
    "Nonstop_Mutation",
];

/// Number of candidate bandwidths searched by cross-validation
pub const N_BANDWIDTHS: usize = 30;
/// Smallest bandwidth considered, in codons
pub const MIN_BANDWIDTH: f64 = 0.5;
