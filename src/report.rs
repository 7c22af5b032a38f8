//! Gene level result tables with Benjamini-Hochberg q-values.

use std::cmp::Ordering;

use crate::mutation::position::PositionInfo;
use crate::permutation::{DeleteriousResult, GeneResult, PositionPValues, PositionResult};
use crate::stats;

/// A p-value and its q-value; both undefined if the test was not performed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PQ {
    pub p_value: Option<f64>,
    pub q_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OncogeneResult {
    pub gene: String,
    /// Observed statistics; `None` for genes that were excluded from testing
    pub stats: Option<PositionInfo>,
    pub recurrent: PQ,
    pub entropy: PQ,
    pub kde_entropy: PQ,
    pub bandwidth: PQ,
    /// Whether the position test was performed, i.e. the gene was permuted
    pub performed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TsgResult {
    pub gene: String,
    pub num_deleterious: usize,
    pub deleterious: PQ,
}

/// Split mixed gene results by test kind.
pub fn split_results(results: Vec<GeneResult>) -> (Vec<PositionResult>, Vec<DeleteriousResult>) {
    let mut position = Vec::new();
    let mut deleterious = Vec::new();
    for r in results.into_iter() {
        match r {
            GeneResult::Oncogene(x) => position.push(x),
            GeneResult::Tsg(x) => deleterious.push(x),
        }
    }
    (position, deleterious)
}

/// Ascending p-value, undefined last, then by gene name.
fn by_p_value(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn with_q_values(p_values: Vec<Option<f64>>) -> Vec<PQ> {
    let q_values = stats::bh_fdr(&p_values);
    p_values.into_iter().zip(q_values.into_iter())
        .map(|(p_value, q_value)| PQ { p_value, q_value })
        .collect()
}

/// Oncogene result table.
///
/// Genes excluded from testing are appended, in name order, with undefined
/// statistics.
pub fn oncogene_rows(results: Vec<PositionResult>, excluded: &[String]) -> Vec<OncogeneResult> {
    let series = |f: fn(&PositionPValues) -> f64| -> Vec<Option<f64>> {
        results.iter().map(|r| r.p_values.as_ref().map(f)).collect()
    };
    let mut recurrent = with_q_values(series(|p| p.recurrent)).into_iter();
    let mut entropy = with_q_values(series(|p| p.entropy)).into_iter();
    let mut kde_entropy = with_q_values(series(|p| p.kde_entropy)).into_iter();
    let mut bandwidth = with_q_values(series(|p| p.bandwidth)).into_iter();

    let mut rows: Vec<OncogeneResult> = results.into_iter()
        .map(|r| OncogeneResult {
            performed: r.p_values.is_some(),
            gene: r.gene,
            stats: Some(r.observed),
            recurrent: recurrent.next().unwrap_or_default(),
            entropy: entropy.next().unwrap_or_default(),
            kde_entropy: kde_entropy.next().unwrap_or_default(),
            bandwidth: bandwidth.next().unwrap_or_default(),
        })
        .collect();
    rows.sort_by(|a, b| by_p_value(a.recurrent.p_value, b.recurrent.p_value).then_with(|| a.gene.cmp(&b.gene)));

    let mut excluded = excluded.to_vec();
    excluded.sort();
    rows.extend(excluded.into_iter().map(|gene| OncogeneResult {
        gene,
        stats: None,
        recurrent: PQ::default(),
        entropy: PQ::default(),
        kde_entropy: PQ::default(),
        bandwidth: PQ::default(),
        performed: false,
    }));

    rows
}

/// TSG result table.
pub fn tsg_rows(results: Vec<DeleteriousResult>) -> Vec<TsgResult> {
    let p_values: Vec<Option<f64>> = results.iter().map(|r| r.p_value).collect();
    let mut rows: Vec<TsgResult> = results.into_iter()
        .zip(with_q_values(p_values).into_iter())
        .map(|(r, deleterious)| TsgResult { gene: r.gene, num_deleterious: r.num_deleterious, deleterious })
        .collect();
    rows.sort_by(|a, b| by_p_value(a.deleterious.p_value, b.deleterious.p_value).then_with(|| a.gene.cmp(&b.gene)));
    rows
}
