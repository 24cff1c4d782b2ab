//! Random forest classifier.
//!
//! Bagged CART trees split on Gini impurity, each split drawing a random
//! subset of `sqrt(n_features)` candidate features. Trees grow until their
//! leaves are pure or no feature can separate the remaining samples. Class
//! probabilities are the mean of the per-tree leaf distributions.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// One training row.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    pub features: Vec<f64>,
    pub label: usize,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        proba: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

/// A single fully grown classification tree.
#[derive(Debug, Clone)]
pub struct ClassificationTree {
    nodes: Vec<Node>,
    n_classes: usize,
    max_features: usize,
}

impl ClassificationTree {
    /// Grow a tree over `indices` into `samples`. Repeated indices count as
    /// repeated samples, which is how bootstrap weights enter the tree.
    pub fn fit<R: Rng + ?Sized>(
        samples: &[LabeledSample],
        indices: &[usize],
        n_classes: usize,
        max_features: usize,
        rng: &mut R,
    ) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            n_classes,
            max_features: max_features.max(1),
        };
        tree.build(samples, indices, rng);
        tree
    }

    fn class_counts(&self, samples: &[LabeledSample], indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[samples[i].label] += 1;
        }
        counts
    }

    fn leaf(&mut self, counts: &[usize], total: usize) -> usize {
        let proba = counts
            .iter()
            .map(|&c| if total == 0 { 0.0 } else { c as f64 / total as f64 })
            .collect();
        self.nodes.push(Node::Leaf { proba });
        self.nodes.len() - 1
    }

    fn build<R: Rng + ?Sized>(
        &mut self,
        samples: &[LabeledSample],
        indices: &[usize],
        rng: &mut R,
    ) -> usize {
        let counts = self.class_counts(samples, indices);
        let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        if is_pure || indices.len() < 2 {
            return self.leaf(&counts, indices.len());
        }

        let Some(split) = self.best_split(samples, indices, rng) else {
            return self.leaf(&counts, indices.len());
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| samples[i].features[split.feature] <= split.threshold);

        // Reserve this node's slot before the children are appended.
        let node = self.nodes.len();
        self.nodes.push(Node::Leaf { proba: Vec::new() });
        let left = self.build(samples, &left_idx, rng);
        let right = self.build(samples, &right_idx, rng);
        self.nodes[node] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node
    }

    /// Visits features in random order and keeps looking past constant ones
    /// until `max_features` informative features have been scored.
    fn best_split<R: Rng + ?Sized>(
        &self,
        samples: &[LabeledSample],
        indices: &[usize],
        rng: &mut R,
    ) -> Option<SplitCandidate> {
        let n_features = samples[indices[0]].features.len();
        let mut order: Vec<usize> = (0..n_features).collect();
        order.shuffle(rng);

        let mut best: Option<SplitCandidate> = None;
        let mut scored = 0;
        for feature in order {
            if scored >= self.max_features {
                break;
            }
            if let Some(candidate) = self.best_threshold(samples, indices, feature) {
                scored += 1;
                if best.map_or(true, |b| candidate.impurity < b.impurity) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    fn best_threshold(
        &self,
        samples: &[LabeledSample],
        indices: &[usize],
        feature: usize,
    ) -> Option<SplitCandidate> {
        let mut column: Vec<(f64, usize)> = indices
            .iter()
            .map(|&i| (samples[i].features[feature], samples[i].label))
            .collect();
        column.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total = column.len();
        let mut right = vec![0usize; self.n_classes];
        for &(_, label) in &column {
            right[label] += 1;
        }
        let mut left = vec![0usize; self.n_classes];

        let mut best: Option<SplitCandidate> = None;
        for pos in 1..total {
            let (value, label) = column[pos - 1];
            left[label] += 1;
            right[label] -= 1;
            let next = column[pos].0;
            if next <= value {
                continue;
            }
            let impurity = (pos as f64 * gini(&left, pos)
                + (total - pos) as f64 * gini(&right, total - pos))
                / total as f64;
            if best.map_or(true, |b| impurity < b.impurity) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: value + (next - value) / 2.0,
                    impurity,
                });
            }
        }
        best
    }

    pub fn predict_proba(&self, features: &[f64]) -> &[f64] {
        let mut current = 0;
        loop {
            match &self.nodes[current] {
                Node::Leaf { proba } => return proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    current = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Random forest ensemble
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<ClassificationTree>,
    n_trees: usize,
    n_classes: usize,
    seed: u64,
}

impl RandomForest {
    pub fn new(n_trees: usize, n_classes: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_trees: n_trees.max(1),
            n_classes,
            seed: 42,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fit the forest. Refitting replaces any previous trees; an empty
    /// sample set leaves the forest unfitted.
    pub fn fit(&mut self, samples: &[LabeledSample]) {
        self.trees.clear();
        if samples.is_empty() {
            return;
        }

        let n_features = samples[0].features.len();
        let max_features = ((n_features as f64).sqrt() as usize).max(1);
        let mut rng = StdRng::seed_from_u64(self.seed);

        for _ in 0..self.n_trees {
            let bootstrap: Vec<usize> = (0..samples.len())
                .map(|_| rng.random_range(0..samples.len()))
                .collect();
            let tree =
                ClassificationTree::fit(samples, &bootstrap, self.n_classes, max_features, &mut rng);
            self.trees.push(tree);
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean class distribution over all trees.
    pub fn predict_proba(&self, features: &[f64]) -> Option<Vec<f64>> {
        if !self.is_fitted() {
            return None;
        }
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.predict_proba(features)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        Some(proba)
    }

    /// Most probable class and its probability. Ties go to the lower class.
    pub fn predict(&self, features: &[f64]) -> Option<(usize, f64)> {
        let proba = self.predict_proba(features)?;
        let mut best = (0, proba[0]);
        for (class, &p) in proba.iter().enumerate().skip(1) {
            if p > best.1 {
                best = (class, p);
            }
        }
        Some(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(features: &[f64], label: usize) -> LabeledSample {
        LabeledSample {
            features: features.to_vec(),
            label,
        }
    }

    fn separable() -> Vec<LabeledSample> {
        let mut samples = Vec::new();
        for hour in 0..24 {
            let label = match hour {
                0..=5 => 0,
                6..=11 => 2,
                12..=17 => 1,
                _ => 3,
            };
            samples.push(sample(&[hour as f64, 1.0], label));
            samples.push(sample(&[hour as f64, 2.0], label));
        }
        samples
    }

    #[test]
    fn gini_bounds() {
        assert_eq!(gini(&[4, 0], 4), 0.0);
        assert!((gini(&[2, 2], 4) - 0.5).abs() < 1e-12);
        assert_eq!(gini(&[0, 0], 0), 0.0);
    }

    #[test]
    fn single_tree_fits_training_set() {
        let samples = separable();
        let indices: Vec<usize> = (0..samples.len()).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let tree = ClassificationTree::fit(&samples, &indices, 4, 2, &mut rng);
        for s in &samples {
            let proba = tree.predict_proba(&s.features);
            assert_eq!(proba[s.label], 1.0);
        }
        assert!(tree.node_count() > 1);
    }

    #[test]
    fn forest_learns_hour_bands() {
        let mut forest = RandomForest::new(50, 4).with_seed(42);
        forest.fit(&separable());
        assert_eq!(forest.n_trees(), 50);
        assert_eq!(forest.predict(&[2.0, 1.0]).unwrap().0, 0);
        assert_eq!(forest.predict(&[9.0, 2.0]).unwrap().0, 2);
        assert_eq!(forest.predict(&[14.0, 1.0]).unwrap().0, 1);
        assert_eq!(forest.predict(&[21.0, 1.0]).unwrap().0, 3);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let mut forest = RandomForest::new(20, 4);
        forest.fit(&separable());
        let proba = forest.predict_proba(&[11.5, 1.0]).unwrap();
        assert_eq!(proba.len(), 4);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn same_seed_same_model() {
        let samples = separable();
        let mut a = RandomForest::new(15, 4).with_seed(9);
        let mut b = RandomForest::new(15, 4).with_seed(9);
        a.fit(&samples);
        b.fit(&samples);
        for hour in 0..24 {
            let x = [hour as f64 + 0.5, 1.0];
            assert_eq!(a.predict_proba(&x), b.predict_proba(&x));
        }
    }

    #[test]
    fn single_class_is_certain() {
        let samples: Vec<_> = (0..12).map(|h| sample(&[h as f64, 3.0], 1)).collect();
        let mut forest = RandomForest::new(10, 4);
        forest.fit(&samples);
        assert_eq!(forest.predict(&[5.0, 3.0]), Some((1, 1.0)));
    }

    #[test]
    fn unfitted_forest_predicts_nothing() {
        let mut forest = RandomForest::new(10, 4);
        assert!(forest.predict(&[1.0]).is_none());
        forest.fit(&[]);
        assert!(!forest.is_fitted());
    }
}
