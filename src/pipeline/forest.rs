//! Isolation forest -- randomized-partitioning outlier ensemble.
//!
//! Fits and scores the same batch in one call. Anomalies sit in sparse
//! regions of the feature space and are isolated by fewer random splits,
//! so their average path length across the ensemble is short.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::features::FeatureMatrix;
use super::AnalyzeError;

const EULER_MASCHERONI: f64 = 0.577_215_664_9;

/// Sub-sample cap per tree; matches the standard isolation-forest default.
const MAX_SUBSAMPLE: usize = 256;

/// Per-row model output.
#[derive(Debug, Clone, Copy)]
pub struct Verdict {
    /// 0.5 minus the normalized score; more negative means more anomalous.
    pub score: f64,
    pub is_anomaly: bool,
}

enum Node {
    Split {
        column: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

/// Fit `tree_count` isolation trees over the matrix and score every row.
///
/// Deterministic for a fixed seed: each tree draws from its own RNG stream
/// derived from the call seed, so building trees in parallel could not
/// change the output. The top `contamination` fraction of rows by
/// normalized score are labeled anomalous.
pub fn fit_score(
    matrix: &FeatureMatrix,
    contamination: f64,
    tree_count: usize,
    seed: u64,
) -> Result<Vec<Verdict>, AnalyzeError> {
    let n = matrix.rows.len();
    if n < 2 {
        return Err(AnalyzeError::InsufficientData { have: n, need: 2 });
    }
    let contamination = contamination.clamp(0.0, 1.0);
    let tree_count = tree_count.max(1);

    let subsample = n.min(MAX_SUBSAMPLE);
    let max_depth = (subsample as f64).log2().ceil() as usize;

    let mut total_path = vec![0.0f64; n];
    for tree_index in 0..tree_count {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(tree_index as u64));
        let sample = rand::seq::index::sample(&mut rng, n, subsample).into_vec();
        let root = build_node(&matrix.rows, &sample, 0, max_depth, &mut rng);
        for (row, total) in matrix.rows.iter().zip(&mut total_path) {
            *total += path_length(&root, row, 0.0);
        }
    }

    let norm = expected_depth(subsample);
    let scores: Vec<f64> = total_path
        .iter()
        .map(|total| {
            let avg = total / tree_count as f64;
            2f64.powf(-avg / norm)
        })
        .collect();

    let cutoff = (contamination * n as f64).round() as usize;
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut flagged = vec![false; n];
    for &i in order.iter().take(cutoff) {
        flagged[i] = true;
    }

    Ok(scores
        .iter()
        .zip(flagged)
        .map(|(s, is_anomaly)| Verdict {
            score: 0.5 - s,
            is_anomaly,
        })
        .collect())
}

fn build_node(
    rows: &[Vec<f64>],
    indices: &[usize],
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if indices.len() <= 1 || depth >= max_depth {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    // Random column, then a uniform threshold within the subset's observed
    // range. Retry a bounded number of times in case the drawn column is
    // constant over this subset.
    let columns = rows[indices[0]].len();
    for _ in 0..columns.max(8) {
        let column = rng.gen_range(0..columns);
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &i in indices {
            let v = rows[i][column];
            lo = lo.min(v);
            hi = hi.max(v);
        }
        if hi <= lo {
            continue;
        }
        let threshold = rng.gen_range(lo..hi);
        let (left, right): (Vec<usize>, Vec<usize>) =
            indices.iter().copied().partition(|&i| rows[i][column] < threshold);
        return Node::Split {
            column,
            threshold,
            left: Box::new(build_node(rows, &left, depth + 1, max_depth, rng)),
            right: Box::new(build_node(rows, &right, depth + 1, max_depth, rng)),
        };
    }

    // Every sampled column was constant; the subset is not separable.
    Node::Leaf {
        size: indices.len(),
    }
}

fn path_length(node: &Node, row: &[f64], depth: f64) -> f64 {
    match node {
        Node::Leaf { size } => depth + expected_depth(*size),
        Node::Split {
            column,
            threshold,
            left,
            right,
        } => {
            if row[*column] < *threshold {
                path_length(left, row, depth + 1.0)
            } else {
                path_length(right, row, depth + 1.0)
            }
        }
    }
}

/// Expected path length of an unsuccessful binary-search-tree lookup over
/// n items: c(n) = 2H(n-1) - 2(n-1)/n, with H(i) ~ ln(i) + gamma.
fn expected_depth(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_MASCHERONI) - 2.0 * (n - 1.0) / n
        }
    }
}
