//! Per-gene permutation tests.
//!
//! Observed mutations of a gene are grouped by sequence context. Each permutation
//! places the same number of mutations of every context at random positions of
//! that context, keeping the observed somatic bases, and recomputes the test
//! statistic. Empirical p-values are the fraction of permutations at least as
//! extreme as the observed statistic.

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use bio::io::fasta;
use linked_hash_map::LinkedHashMap;
use log::{debug, error, info, warn};
use multimap::MultiMap;
use rand::Rng;

use crate::config::{TestConfig, TestKind};
use crate::error::{Error, Result};
use crate::gene::Gene;
use crate::io::maf::{MutationTable, Record};
use crate::mutation::position::{self, PositionInfo, PositionParams};
use crate::mutation::{self, AaMutInfo, CodingMutation};
use crate::sample;
use crate::seq::coding::GeneSequence;
use crate::seq::context::{ContextCounts, SequenceContext};
use crate::seq::{self, Nucleotide};
use crate::stats::{self, Tail};

/// Observed mutations of a gene, ordered by context.
#[derive(Debug, Clone, Default)]
pub struct ObservedMutations {
    /// Number of mutations per context
    pub counts: ContextCounts,
    /// Coding positions, grouped by context in the order of `counts`
    pub positions: Vec<usize>,
    /// Somatic bases matching `positions`
    pub somatic_bases: Vec<Nucleotide>,
}

impl ObservedMutations {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn aa_mut_info(&self, gs: &GeneSequence) -> Vec<AaMutInfo> {
        mutation::get_aa_mut_info(&self.positions, &self.somatic_bases, gs)
    }
}

/// Place mutation records onto the coding sequence of a gene.
///
/// Alleles of genes on the reverse strand are complemented. Records outside of
/// the coding regions are dropped.
pub fn map_mutations(gene: &Gene, records: &[Record]) -> Vec<CodingMutation> {
    let mut muts = Vec::with_capacity(records.len());
    for r in records.iter() {
        match gene.query_position(&r.chrom, r.start) {
            Some(c_pos) => {
                let (nt_ref, nt_alt) = if gene.is_reverse() {
                    (seq::complement(r.ref_nt()), seq::complement(r.alt_nt()))
                } else {
                    (r.ref_nt(), r.alt_nt())
                };
                muts.push(CodingMutation { c_pos, nt_ref, nt_alt });
            },
            None => debug!("{}: {}:{} is not within a coding region", gene.name, r.chrom, r.start + 1),
        }
    }
    muts
}

/// Group mutations by the sequence context of their positions.
pub fn group_by_context(muts: &[CodingMutation], sc: &SequenceContext) -> Result<ObservedMutations> {
    let mut counts: ContextCounts = LinkedHashMap::new();
    let mut by_context: MultiMap<String, (usize, Nucleotide)> = MultiMap::new();
    for m in muts.iter() {
        let context = sc.context(m.c_pos)
            .ok_or_else(|| Error::InvalidSequence(format!("coding position {} is out of range", m.c_pos)))?;
        *counts.entry(context.to_owned()).or_insert(0) += 1;
        by_context.insert(context.to_owned(), (m.c_pos, m.nt_alt));
    }

    let mut positions = Vec::with_capacity(muts.len());
    let mut somatic_bases = Vec::with_capacity(muts.len());
    for context in counts.keys() {
        if let Some(xs) = by_context.get_vec(context) {
            for &(pos, nt) in xs.iter() {
                positions.push(pos);
                somatic_bases.push(nt);
            }
        }
    }

    Ok(ObservedMutations { counts, positions, somatic_bases })
}

/// Statistic of every permuted mutation set.
fn null_distribution<T, R, F>(
    obs: &ObservedMutations,
    gs: &GeneSequence,
    sc: &SequenceContext,
    num_permutations: usize,
    rng: &mut R,
    cancel: &AtomicBool,
    mut stat: F,
) -> Result<Vec<T>>
where
    R: Rng,
    F: FnMut(&[AaMutInfo]) -> T,
{
    sc.check_counts(&obs.counts)?;
    let mut nulls = Vec::with_capacity(num_permutations);
    for _ in 0 .. num_permutations {
        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Cancelled);
        }
        let null = sc.sample_one(&obs.counts, rng)?;
        let aa_info = mutation::get_aa_mut_info(&null.flat_positions(), &obs.somatic_bases, gs);
        nulls.push(stat(&aa_info));
    }
    Ok(nulls)
}

/// Result of the deleterious mutation test of one gene.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteriousResult {
    pub gene: String,
    pub num_deleterious: usize,
    /// `None` if the test was not performed
    pub p_value: Option<f64>,
}

pub fn deleterious_test<R: Rng>(
    name: &str,
    obs: &ObservedMutations,
    gs: &GeneSequence,
    sc: &SequenceContext,
    config: &TestConfig,
    rng: &mut R,
    cancel: &AtomicBool,
) -> Result<DeleteriousResult> {
    let num_deleterious = mutation::calc_deleterious_info(&obs.aa_mut_info(gs));

    // too few deleterious mutations for a meaningful test
    if obs.is_empty() || num_deleterious < config.min_deleterious {
        return Ok(DeleteriousResult { gene: name.to_owned(), num_deleterious, p_value: None });
    }

    let nulls = null_distribution(obs, gs, sc, config.num_permutations, rng, cancel, mutation::calc_deleterious_info)?;
    let p_value = stats::empirical_p_value(&nulls, num_deleterious, Tail::Upper);

    Ok(DeleteriousResult { gene: name.to_owned(), num_deleterious, p_value })
}

/// Empirical p-values of the position test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionPValues {
    pub recurrent: f64,
    pub entropy: f64,
    pub kde_entropy: f64,
    pub bandwidth: f64,
}

/// Result of the position test of one gene.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionResult {
    pub gene: String,
    pub observed: PositionInfo,
    /// `None` if the test was not performed
    pub p_values: Option<PositionPValues>,
}

pub fn position_test<R: Rng>(
    name: &str,
    obs: &ObservedMutations,
    gs: &GeneSequence,
    sc: &SequenceContext,
    config: &TestConfig,
    rng: &mut R,
    cancel: &AtomicBool,
) -> Result<PositionResult> {
    // every permutation of an empty mutation set is empty as well
    if obs.is_empty() {
        let p = PositionPValues { recurrent: 1.0, entropy: 1.0, kde_entropy: 1.0, bandwidth: 1.0 };
        return Ok(PositionResult { gene: name.to_owned(), observed: PositionInfo::zero(), p_values: Some(p) });
    }

    let params = PositionParams {
        num_codons: gs.num_codons(),
        bandwidth: config.bandwidth,
        grouping: config.grouping,
    };
    let observed = position::calc_pos_info(&obs.aa_mut_info(gs), &params);
    if observed.num_recurrent < config.min_recurrent {
        return Ok(PositionResult { gene: name.to_owned(), observed, p_values: None });
    }

    let nulls = null_distribution(obs, gs, sc, config.num_permutations, rng, cancel,
                                  |aa_info| position::calc_pos_info(aa_info, &params))?;

    let recurrent: Vec<usize> = nulls.iter().map(|x| x.num_recurrent).collect();
    let entropy: Vec<f64> = nulls.iter().map(|x| x.entropy).collect();
    let kde_entropy: Vec<f64> = nulls.iter().map(|x| x.kde_entropy).collect();
    let bandwidth: Vec<f64> = nulls.iter().map(|x| x.bandwidth).collect();

    // nulls is non-empty since the number of permutations is positive
    let p = |x: Option<f64>| x.unwrap_or(1.0);
    let p_values = PositionPValues {
        recurrent: p(stats::empirical_p_value(&recurrent, observed.num_recurrent, Tail::Upper)),
        entropy: p(stats::empirical_p_value(&entropy, observed.entropy, Tail::Lower)),
        kde_entropy: p(stats::empirical_p_value(&kde_entropy, observed.kde_entropy, Tail::Lower)),
        bandwidth: p(stats::empirical_p_value(&bandwidth, observed.bandwidth, Tail::Lower)),
    };

    Ok(PositionResult { gene: name.to_owned(), observed, p_values: Some(p_values) })
}

/// Test result of one gene.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneResult {
    Oncogene(PositionResult),
    Tsg(DeleteriousResult),
}

/// Observed mutations of a gene, with the germline alleles of the mutation table
/// applied to the coding sequence.
pub fn prepare_gene(gene: &Gene, records: &[Record], gs: &mut GeneSequence, config: &TestConfig) -> Result<(SequenceContext, ObservedMutations)> {
    let muts = map_mutations(gene, records);
    let ref_bases: Vec<Nucleotide> = muts.iter().map(|m| m.nt_ref).collect();
    let positions: Vec<usize> = muts.iter().map(|m| m.c_pos).collect();
    gs.add_germline_variants(&ref_bases, &positions);

    let sc = SequenceContext::build(gs, config.context);
    let obs = group_by_context(&muts, &sc)?;
    Ok((sc, obs))
}

/// Run the configured test on a gene whose coding sequence is loaded in `gs`.
pub fn run<R: Rng>(
    gene: &Gene,
    records: &[Record],
    gs: &mut GeneSequence,
    config: &TestConfig,
    rng: &mut R,
    cancel: &AtomicBool,
) -> Result<GeneResult> {
    let (sc, obs) = prepare_gene(gene, records, gs, config)?;

    if log::log_enabled!(log::Level::Debug) {
        for aa in obs.aa_mut_info(gs).iter() {
            debug!("[{}] {} {} ({})", gene.chrom, gene.name, aa.protein_change(), aa.impact());
        }
    }

    match config.kind {
        TestKind::Oncogene => position_test(&gene.name, &obs, gs, &sc, config, rng, cancel).map(GeneResult::Oncogene),
        TestKind::Tsg => deleterious_test(&gene.name, &obs, gs, &sc, config, rng, cancel).map(GeneResult::Tsg),
    }
}

/// Load a gene from the FASTA and test it.
/// Returns `None` if the gene does not have a complete coding sequence.
pub fn test_gene<F: io::Read + io::Seek>(
    fasta: &mut fasta::IndexedReader<F>,
    gene: &Gene,
    table: &MutationTable,
    gs: &mut GeneSequence,
    config: &TestConfig,
    cancel: &AtomicBool,
) -> Result<Option<GeneResult>> {
    match gs.set_gene(fasta, gene) {
        Ok(()) => {},
        Err(Error::InvalidSequence(msg)) => {
            warn!("[{}] skipping {}: {}", gene.chrom, gene.name, msg);
            return Ok(None);
        },
        Err(e) => return Err(e),
    }

    let mut rng = sample::gene_rng(config.seed, &gene.name);
    run(gene, table.gene(&gene.name), gs, config, &mut rng, cancel).map(Some)
}

/// Test all genes of one chromosome, sequentially, with a dedicated FASTA handle.
///
/// An error in any gene is logged with the gene and chromosome and fails the
/// whole chromosome.
pub fn test_chromosome(
    fasta_path: &Path,
    genes: &[Gene],
    table: &MutationTable,
    config: &TestConfig,
    cancel: &AtomicBool,
) -> Result<Vec<GeneResult>> {
    if genes.is_empty() {
        return Ok(Vec::new());
    }
    let mut fasta = fasta::IndexedReader::from_file(&fasta_path).map_err(|e| Error::Fasta {
        region: fasta_path.display().to_string(),
        msg: e.to_string(),
    })?;
    test_genes(&mut fasta, genes, table, config, cancel)
}

/// Test genes of one chromosome in order, stopping at the first failing gene.
pub fn test_genes<F: io::Read + io::Seek>(
    fasta: &mut fasta::IndexedReader<F>,
    genes: &[Gene],
    table: &MutationTable,
    config: &TestConfig,
    cancel: &AtomicBool,
) -> Result<Vec<GeneResult>> {
    let chrom = match genes.first() {
        Some(g) => g.chrom.as_str(),
        None => return Ok(Vec::new()),
    };
    info!("[{}] working on {} genes", chrom, genes.len());

    let mut gs = GeneSequence::default();
    let mut results = Vec::with_capacity(genes.len());
    for gene in genes.iter() {
        match test_gene(fasta, gene, table, &mut gs, config, cancel) {
            Ok(Some(r)) => results.push(r),
            Ok(None) => {},
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                let e = e.in_gene(&gene.name, &gene.chrom);
                error!("[{}] {}", chrom, e);
                return Err(e);
            },
        }
    }

    info!("[{}] finished {} genes", chrom, results.len());
    Ok(results)
}
