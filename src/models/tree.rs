//! Histogram-based regression trees for second-order boosting.
//!
//! Each feature is quantised once into at most `max_bin` bins. A node's best
//! split is found by accumulating gradient/hessian histograms per feature
//! (features scanned in parallel) and scoring every bin boundary with the
//! regularised gain
//!
//! ```text
//! gain = ½ · [ G_L²/(H_L+λ) + G_R²/(H_R+λ) − G²/(H+λ) ]
//! ```
//!
//! Leaves store `−G/(H+λ)` already scaled by the learning rate.

use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Feature values quantised into bin indices.
///
/// For feature `f`, bin `b` holds values `x` with `cuts[f][b-1] <= x < cuts[f][b]`,
/// so "bin <= k" is exactly "x < cuts[f][k]".
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    cuts: Vec<Vec<f64>>,
    bins: Vec<Vec<u16>>,
}

impl BinnedMatrix {
    pub fn from_matrix(x: &DMatrix<f64>, max_bin: usize) -> Self {
        let max_bin = max_bin.clamp(2, usize::from(u16::MAX));
        let (cuts, bins): (Vec<Vec<f64>>, Vec<Vec<u16>>) = x
            .column_iter()
            .map(|column| {
                let values: Vec<f64> = column.iter().copied().collect();
                let cuts = bin_cuts(&values, max_bin);
                let bins: Vec<u16> = values
                    .iter()
                    .map(|&v| cuts.partition_point(|&c| c <= v) as u16)
                    .collect();
                (cuts, bins)
            })
            .unzip();
        Self { cuts, bins }
    }

    pub fn cuts(&self, feature: usize) -> &[f64] {
        &self.cuts[feature]
    }
}

/// Cut points between distinct values; quantile-spaced when there are more
/// distinct values than bins.
fn bin_cuts(values: &[f64], max_bin: usize) -> Vec<f64> {
    let mut uniq: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    uniq.sort_by(f64::total_cmp);
    uniq.dedup();

    if uniq.len() < 2 {
        return Vec::new();
    }
    if uniq.len() <= max_bin {
        return uniq.windows(2).map(|w| midpoint(w[0], w[1])).collect();
    }

    let mut cuts: Vec<f64> = (1..max_bin)
        .map(|q| {
            let idx = (q * uniq.len() / max_bin).max(1);
            midpoint(uniq[idx - 1], uniq[idx])
        })
        .collect();
    cuts.dedup();
    cuts
}

fn midpoint(a: f64, b: f64) -> f64 {
    a + (b - a) / 2.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    Leaf {
        value: f64,
    },
    /// Rows with `x[feature] < threshold` (or missing) go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted tree stored as a flat node list; node `0` is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = row[*feature];
                    idx = if x.is_nan() || x < *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    /// Structural check for trees loaded from disk: every child index points
    /// forward inside the node list and every feature index is in range.
    pub fn is_well_formed(&self, n_features: usize) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(idx, node)| match node {
                Node::Leaf { value } => value.is_finite(),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    *feature < n_features
                        && !threshold.is_nan()
                        && *left > idx
                        && *right > idx
                        && *left < self.nodes.len()
                        && *right < self.nodes.len()
                }
            })
    }
}

/// Tree-growing knobs taken from the boosting parameters.
#[derive(Debug, Clone, Copy)]
pub struct TreeOptions {
    pub max_depth: usize,
    pub reg_lambda: f64,
    pub min_child_weight: f64,
    pub learning_rate: f64,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    bin: u16,
    threshold: f64,
    gain: f64,
}

/// Grows one tree on the given rows and candidate features.
pub struct TreeBuilder<'a> {
    binned: &'a BinnedMatrix,
    grad: &'a [f64],
    hess: &'a [f64],
    features: &'a [usize],
    opts: TreeOptions,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        binned: &'a BinnedMatrix,
        grad: &'a [f64],
        hess: &'a [f64],
        features: &'a [usize],
        opts: TreeOptions,
    ) -> Self {
        Self {
            binned,
            grad,
            hess,
            features,
            opts,
        }
    }

    pub fn grow(&self, rows: Vec<usize>) -> RegressionTree {
        let mut nodes = Vec::new();
        self.grow_node(&mut nodes, rows, 0);
        RegressionTree { nodes }
    }

    fn grow_node(&self, nodes: &mut Vec<Node>, rows: Vec<usize>, depth: usize) -> usize {
        let (g, h) = rows
            .iter()
            .fold((0.0, 0.0), |(g, h), &i| (g + self.grad[i], h + self.hess[i]));

        let idx = nodes.len();
        nodes.push(Node::Leaf {
            value: self.leaf_value(g, h),
        });

        if depth >= self.opts.max_depth || rows.len() < 2 {
            return idx;
        }
        let Some(split) = self.best_split(&rows, g, h) else {
            return idx;
        };

        let feature_bins = &self.binned.bins[split.feature];
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&i| feature_bins[i] <= split.bin);

        let left = self.grow_node(nodes, left_rows, depth + 1);
        let right = self.grow_node(nodes, right_rows, depth + 1);
        nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    fn leaf_value(&self, g: f64, h: f64) -> f64 {
        -g / (h + self.opts.reg_lambda) * self.opts.learning_rate
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        // Collect preserves feature order, so ties resolve to the lowest
        // feature (then lowest bin) independent of thread scheduling.
        let per_feature: Vec<SplitCandidate> = self
            .features
            .par_iter()
            .filter_map(|&f| self.best_split_for(f, rows, g, h))
            .collect();

        per_feature.into_iter().fold(None, |best, c| match best {
            Some(b) if b.gain >= c.gain => Some(b),
            _ => Some(c),
        })
    }

    fn best_split_for(&self, feature: usize, rows: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let cuts = &self.binned.cuts[feature];
        if cuts.is_empty() {
            return None;
        }
        let bins = &self.binned.bins[feature];
        let n_bins = cuts.len() + 1;

        let mut hist_g = vec![0.0; n_bins];
        let mut hist_h = vec![0.0; n_bins];
        for &i in rows {
            let b = usize::from(bins[i]);
            hist_g[b] += self.grad[i];
            hist_h[b] += self.hess[i];
        }

        let lambda = self.opts.reg_lambda;
        let parent = g * g / (h + lambda);
        let mut best: Option<SplitCandidate> = None;
        let (mut gl, mut hl) = (0.0, 0.0);

        for k in 0..n_bins - 1 {
            gl += hist_g[k];
            hl += hist_h[k];
            let (gr, hr) = (g - gl, h - hl);
            if hl < self.opts.min_child_weight || hr < self.opts.min_child_weight {
                continue;
            }
            let gain = 0.5 * (gl * gl / (hl + lambda) + gr * gr / (hr + lambda) - parent);
            if gain > best.map_or(0.0, |b| b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    bin: k as u16,
                    threshold: cuts[k],
                    gain,
                });
            }
        }
        best
    }
}
