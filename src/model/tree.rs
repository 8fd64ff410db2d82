//! CART regression tree
//!
//! Greedy binary splits minimizing squared error. Nodes live in a flat vector; children are
//! referenced by index so the tree serializes without recursion.

use serde::{Deserialize, Serialize};

/// Minimum gap between neighbouring feature values for a split to be placed between them
const FEATURE_THRESHOLD: f64 = 1e-7;

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            max_depth: 10,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    /// Rows with `row[feature] <= threshold` go left
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
    /// Total weighted impurity decrease attributed to each feature
    impurity_decrease: Vec<f64>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
}

impl RegressionTree {
    /// Fit a tree on the rows of `x` selected by `indices`.
    ///
    /// `indices` may repeat rows (bootstrap samples); a repeated row counts once per
    /// occurrence.
    pub fn fit(x: &[Vec<f64>], y: &[f64], indices: &[usize], params: &TreeParams) -> Self {
        let n_features = x.first().map(|r| r.len()).unwrap_or(0);
        let mut tree = RegressionTree {
            nodes: Vec::new(),
            n_features,
            impurity_decrease: vec![0.0; n_features],
        };
        if !indices.is_empty() {
            tree.build(x, y, indices.to_vec(), 0, params);
        }
        tree
    }

    fn build(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: Vec<usize>,
        depth: usize,
        params: &TreeParams,
    ) -> usize {
        let node_id = self.nodes.len();
        let value = mean(y, &indices);
        self.nodes.push(Node::Leaf { value });

        let node_impurity = impurity(y, &indices);
        if depth >= params.max_depth
            || indices.len() < params.min_samples_split.max(2)
            || node_impurity <= f64::EPSILON
        {
            return node_id;
        }

        let Some(split) = self.best_split(x, y, &indices) else {
            return node_id;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[i][split.feature] <= split.threshold);

        let n = indices.len() as f64;
        let decrease = n * node_impurity
            - left_idx.len() as f64 * impurity(y, &left_idx)
            - right_idx.len() as f64 * impurity(y, &right_idx);
        self.impurity_decrease[split.feature] += decrease;

        let left = self.build(x, y, left_idx, depth + 1, params);
        let right = self.build(x, y, right_idx, depth + 1, params);
        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };

        node_id
    }

    /// Exhaustive search over every feature and every boundary between distinct values.
    ///
    /// Maximizes `S_l^2 / n_l + S_r^2 / n_r`, which is equivalent to minimizing the summed
    /// squared error of the two children.
    fn best_split(&self, x: &[Vec<f64>], y: &[f64], indices: &[usize]) -> Option<SplitCandidate> {
        let total: f64 = indices.iter().map(|&i| y[i]).sum();
        let len = indices.len();

        let mut best: Option<SplitCandidate> = None;
        let mut best_proxy = f64::NEG_INFINITY;
        let mut sorted = indices.to_vec();

        for feature in 0..self.n_features {
            sorted.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

            let lowest = x[sorted[0]][feature];
            let highest = x[sorted[len - 1]][feature];
            if highest <= lowest + FEATURE_THRESHOLD {
                continue;
            }

            let mut left_sum = 0.0;
            for k in 0..len - 1 {
                left_sum += y[sorted[k]];

                let lo = x[sorted[k]][feature];
                let hi = x[sorted[k + 1]][feature];
                if hi <= lo + FEATURE_THRESHOLD {
                    continue;
                }

                let n_left = (k + 1) as f64;
                let n_right = (len - k - 1) as f64;
                let right_sum = total - left_sum;
                let proxy = left_sum * left_sum / n_left + right_sum * right_sum / n_right;

                if proxy > best_proxy {
                    best_proxy = proxy;
                    let mut threshold = lo / 2.0 + hi / 2.0;
                    if !threshold.is_finite() || threshold >= hi || threshold < lo {
                        threshold = lo;
                    }
                    best = Some(SplitCandidate { feature, threshold });
                }
            }
        }

        best
    }

    /// Predict a single row
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes.get(id) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                None => return 0.0,
            }
        }
    }

    /// Impurity-based importances normalized to sum to 1.0, or all zeros for a stump
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.impurity_decrease.iter().sum();
        if total > 0.0 {
            self.impurity_decrease.iter().map(|d| d / total).collect()
        } else {
            vec![0.0; self.n_features]
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Depth of the deepest leaf (a single leaf has depth 0)
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match nodes.get(id) {
                Some(Node::Split { left, right, .. }) => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

fn mean(y: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
}

/// Mean squared deviation from the node mean
fn impurity(y: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let m = mean(y, indices);
    indices.iter().map(|&i| (y[i] - m) * (y[i] - m)).sum::<f64>() / indices.len() as f64
}
