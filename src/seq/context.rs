use std::fmt;
use std::str::FromStr;

use linked_hash_map::LinkedHashMap;
use rand::Rng;

use crate::constants::NO_CONTEXT;
use crate::error::{Error, Result};
use crate::sample;
use crate::seq::coding::GeneSequence;
use crate::seq::Nucleotide;

/// Number of flanking bases that define the sequence context of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextOrder {
    /// No context
    Zero,
    /// Mutated base only
    One,
    /// CHASM context: CpG and TpC/GpA dinucleotides are distinguished
    Chasm,
    /// Upstream base and mutated base
    Two,
    /// Upstream, mutated and downstream base
    Three,
}

impl FromStr for ContextOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(ContextOrder::Zero),
            "1" => Ok(ContextOrder::One),
            "1.5" => Ok(ContextOrder::Chasm),
            "2" => Ok(ContextOrder::Two),
            "3" => Ok(ContextOrder::Three),
            x => Err(format!("unsupported context order: {} (expected 0, 1, 1.5, 2 or 3)", x)),
        }
    }
}

impl fmt::Display for ContextOrder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let c = match *self {
            ContextOrder::Zero => "0",
            ContextOrder::One => "1",
            ContextOrder::Chasm => "1.5",
            ContextOrder::Two => "2",
            ContextOrder::Three => "3",
        };
        write!(f, "{}", c)
    }
}

/// Required number of mutations per context, in first-seen order.
pub type ContextCounts = LinkedHashMap<String, usize>;

/// One simulated mutation set: sampled coding positions for each context.
#[derive(Debug, Clone, PartialEq)]
pub struct NullSample {
    pub positions: Vec<(String, Vec<usize>)>,
}

impl NullSample {
    /// Sampled positions of all contexts, concatenated in context order.
    pub fn flat_positions(&self) -> Vec<usize> {
        self.positions.iter().flat_map(|(_, p)| p.iter().cloned()).collect()
    }
}

/// Sequence context of every position in a coding sequence.
#[derive(Debug)]
pub struct SequenceContext {
    pub order: ContextOrder,
    /// Context label of each coding position
    pos2context: Vec<String>,
    /// Coding positions of each context label, in ascending order
    context2pos: LinkedHashMap<String, Vec<usize>>,
}

impl SequenceContext {
    pub fn build(gs: &GeneSequence, order: ContextOrder) -> SequenceContext {
        let seq = &gs.seq;
        let mut pos2context = Vec::with_capacity(seq.len());
        let mut context2pos: LinkedHashMap<String, Vec<usize>> = LinkedHashMap::new();

        for i in 0 .. seq.len() {
            let label = context_label(seq, i, order);
            context2pos.entry(label.clone()).or_insert_with(Vec::new).push(i);
            pos2context.push(label);
        }

        SequenceContext { order, pos2context, context2pos }
    }

    /// Context label of a coding position.
    #[inline]
    pub fn context(&self, pos: usize) -> Option<&str> {
        self.pos2context.get(pos).map(|s| s.as_str())
    }

    /// Coding positions sharing a context label.
    pub fn positions(&self, context: &str) -> &[usize] {
        self.context2pos.get(context).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn contexts(&self) -> impl Iterator<Item = &str> {
        self.context2pos.keys().map(|k| k.as_str())
    }

    /// Check that every context with a required count has positions to draw from.
    pub fn check_counts(&self, counts: &ContextCounts) -> Result<()> {
        for (context, &required) in counts.iter() {
            if required > 0 && self.positions(context).is_empty() {
                return Err(Error::EmptyContext { context: context.clone(), required });
            }
        }
        Ok(())
    }

    /// Draw one null sample: for each context, `count` positions drawn uniformly
    /// with replacement from the positions of that context.
    pub fn sample_one<R: Rng>(&self, counts: &ContextCounts, rng: &mut R) -> Result<NullSample> {
        let mut positions = Vec::with_capacity(counts.len());
        for (context, &required) in counts.iter() {
            let pool = self.positions(context);
            if required > 0 && pool.is_empty() {
                return Err(Error::EmptyContext { context: context.clone(), required });
            }
            positions.push((context.clone(), sample::with_replacement(pool, required, rng)));
        }
        Ok(NullSample { positions })
    }

    /// Draw `num_permutations` independent null samples.
    pub fn sample<R: Rng>(&self, counts: &ContextCounts, num_permutations: usize, rng: &mut R) -> Result<Vec<NullSample>> {
        self.check_counts(counts)?;
        (0 .. num_permutations).map(|_| self.sample_one(counts, rng)).collect()
    }
}

fn context_label(seq: &[Nucleotide], i: usize, order: ContextOrder) -> String {
    let nt = seq[i];
    let prev = if i > 0 { Some(seq[i - 1]) } else { None };
    let next = seq.get(i + 1).cloned();

    match order {
        ContextOrder::Zero => String::from(NO_CONTEXT),
        ContextOrder::One => (nt as char).to_string(),
        ContextOrder::Chasm => {
            let label = match nt {
                b'C' if next == Some(b'G') => "C*pG",
                b'C' if prev == Some(b'T') => "TpC*",
                b'G' if prev == Some(b'C') => "CpG*",
                b'G' if next == Some(b'A') => "G*pA",
                _ => return (nt as char).to_string(),
            };
            String::from(label)
        },
        ContextOrder::Two => {
            let p = prev.unwrap_or(nt);
            [p as char, nt as char].iter().collect()
        },
        ContextOrder::Three => {
            let p = prev.unwrap_or(nt);
            let n = next.unwrap_or(nt);
            [p as char, nt as char, n as char].iter().collect()
        },
    }
}
