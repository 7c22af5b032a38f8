use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::*;
use crate::error::{Error, Result};
use crate::mutation::position::RecurrenceGrouping;
use crate::seq::context::ContextOrder;
use crate::stats::Bandwidth;

/// Kind of permutation test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    /// Position based test for oncogenes
    Oncogene,
    /// Deleterious mutation test for tumour suppressor genes
    Tsg,
}

impl FromStr for TestKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "oncogene" => Ok(TestKind::Oncogene),
            "tsg" => Ok(TestKind::Tsg),
            x => Err(format!("unsupported test kind: {} (expected oncogene or tsg)", x)),
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TestKind::Oncogene => write!(f, "oncogene"),
            TestKind::Tsg => write!(f, "tsg"),
        }
    }
}

/// Settings of the per-gene permutation test.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub kind: TestKind,
    pub num_permutations: usize,
    pub context: ContextOrder,
    /// Minimum number of recurrent mutations to perform the position test
    pub min_recurrent: usize,
    /// Minimum number of deleterious mutations to perform the deleterious test
    pub min_deleterious: usize,
    pub bandwidth: Bandwidth,
    pub grouping: RecurrenceGrouping,
    /// Base seed for the per-gene random number generators
    pub seed: Option<u64>,
}

impl Default for TestConfig {
    fn default() -> Self {
        TestConfig {
            kind: TestKind::Oncogene,
            num_permutations: DEFAULT_NUM_PERMUTATIONS,
            context: ContextOrder::Chasm,
            min_recurrent: DEFAULT_MIN_RECURRENT,
            min_deleterious: DEFAULT_MIN_DELETERIOUS,
            bandwidth: Bandwidth::CrossValidated,
            grouping: RecurrenceGrouping::Codon,
            seed: None,
        }
    }
}

/// Complete run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Indexed genome FASTA
    pub input: PathBuf,
    /// Mutation table
    pub mutations: PathBuf,
    /// BED gene annotation
    pub bed: PathBuf,
    pub output: PathBuf,
    /// Number of worker threads
    pub processes: usize,
    /// Maximum TSG score of genes tested by the oncogene test
    pub tsg_score: f64,
    pub test: TestConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.processes == 0 {
            return Err(Error::InvalidConfig(String::from("number of processes must be at least 1")));
        }
        if self.test.num_permutations == 0 {
            return Err(Error::InvalidConfig(String::from("number of permutations must be at least 1")));
        }
        if let Bandwidth::Fixed(h) = self.test.bandwidth {
            if !(h > 0.0 && h.is_finite()) {
                return Err(Error::InvalidConfig(format!("KDE bandwidth must be positive, got {}", h)));
            }
        }
        if !(0.0 ..= 1.0).contains(&self.tsg_score) {
            return Err(Error::InvalidConfig(format!("TSG score must lie in [0, 1], got {}", self.tsg_score)));
        }
        Ok(())
    }
}
