use std::io;
use std::result;

use thiserror::Error;

/// Errors raised while reading inputs or testing a gene.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not read {region} from FASTA: {msg}")]
    Fasta { region: String, msg: String },

    #[error("line {line}: {msg}")]
    Parse { line: u64, msg: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("invalid coding sequence: {0}")]
    InvalidSequence(String),

    /// A context is required by the observed mutations but has no positions to sample from.
    #[error("context {context} has no positions but {required} mutations must be placed")]
    EmptyContext { context: String, required: usize },

    #[error("gene {gene} on {chrom}: {source}")]
    Gene {
        gene: String,
        chrom: String,
        #[source]
        source: Box<Error>,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("worker failed: {0}")]
    Worker(String),
}

impl Error {
    /// Attach the gene and chromosome to an error raised while testing a gene.
    pub fn in_gene(self, gene: &str, chrom: &str) -> Error {
        match self {
            Error::Cancelled => Error::Cancelled,
            e => Error::Gene {
                gene: gene.to_owned(),
                chrom: chrom.to_owned(),
                source: Box::new(e),
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

pub type Result<T> = result::Result<T, Error>;
