//! Positional clustering statistics of missense mutations.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::mutation::AaMutInfo;
use crate::seq::Residue;
use crate::stats::{self, Bandwidth};

/// How mutations are grouped when counting recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceGrouping {
    /// Mutations affecting the same codon
    Codon,
    /// Mutations affecting the same codon and producing the same residue
    CodonAndChange,
}

impl FromStr for RecurrenceGrouping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "codon" => Ok(RecurrenceGrouping::Codon),
            "codon-and-change" => Ok(RecurrenceGrouping::CodonAndChange),
            x => Err(format!("unsupported recurrence grouping: {}", x)),
        }
    }
}

impl fmt::Display for RecurrenceGrouping {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RecurrenceGrouping::Codon => write!(f, "codon"),
            RecurrenceGrouping::CodonAndChange => write!(f, "codon-and-change"),
        }
    }
}

/// Settings shared by every evaluation of the position statistic of a gene.
#[derive(Debug, Clone, Copy)]
pub struct PositionParams {
    /// Number of codons in the gene
    pub num_codons: usize,
    pub bandwidth: Bandwidth,
    pub grouping: RecurrenceGrouping,
}

/// Position statistic of one mutation set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionInfo {
    /// Size of the largest group of recurrent missense mutations; 0 if none recur
    pub num_recurrent: usize,
    /// Shannon entropy of missense mutation counts across codons
    pub entropy: f64,
    /// Shannon entropy of the kernel density estimate over codons
    pub kde_entropy: f64,
    /// Bandwidth of the kernel density estimate
    pub bandwidth: f64,
}

impl PositionInfo {
    pub fn zero() -> PositionInfo {
        PositionInfo { num_recurrent: 0, entropy: 0.0, kde_entropy: 0.0, bandwidth: 0.0 }
    }
}

/// Calculate recurrence and positional entropy statistics of missense mutations.
pub fn calc_pos_info(aa_info: &[AaMutInfo], params: &PositionParams) -> PositionInfo {
    // codon index and somatic residue of every missense mutation
    let missense: Vec<(usize, Residue)> = aa_info.iter()
        .filter(|x| x.is_missense())
        .filter_map(|x| match (x.codon_pos, x.somatic_aa) {
            (Some(p), Some(aa)) => Some((p, aa)),
            _ => None,
        })
        .collect();

    if missense.is_empty() {
        return PositionInfo::zero();
    }

    let mut codon_counts: BTreeMap<usize, usize> = BTreeMap::new();
    let mut change_counts: BTreeMap<(usize, Residue), usize> = BTreeMap::new();
    for &(pos, aa) in missense.iter() {
        *codon_counts.entry(pos).or_insert(0) += 1;
        *change_counts.entry((pos, aa)).or_insert(0) += 1;
    }

    let largest = match params.grouping {
        RecurrenceGrouping::Codon => codon_counts.values().cloned().max(),
        RecurrenceGrouping::CodonAndChange => change_counts.values().cloned().max(),
    }.unwrap_or(0);
    let num_recurrent = if largest > 1 { largest } else { 0 };

    let counts: Vec<usize> = codon_counts.values().cloned().collect();
    let entropy = stats::count_entropy(&counts);

    // sums below must not depend on mutation order, so that equal
    // mutation sets yield bit-identical statistics
    let mut points: Vec<f64> = missense.iter().map(|&(p, _)| (p + 1) as f64).collect();
    points.sort_by(|a, b| a.total_cmp(b));
    let bandwidth = stats::select_bandwidth(&points, params.num_codons, params.bandwidth);
    let kde_entropy = stats::kde_entropy(&points, params.num_codons, bandwidth);

    PositionInfo { num_recurrent, entropy, kde_entropy, bandwidth }
}
