//! Random forest regressor
//!
//! Bagged CART regression trees split on squared error. Every tree is grown
//! from its own bootstrap sample drawn from a generator seeded with
//! `random_state`, so a fit is fully reproducible for a fixed seed and
//! fixed training data.

use crate::components::{ensure_parent, StepError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Hyperparameters of the forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Number of trees
    pub n_estimators: usize,

    /// Seed for bootstrap sampling
    pub random_state: u64,

    /// Maximum tree depth (`None` grows until leaves are pure)
    pub max_depth: Option<usize>,

    /// Minimum samples required to split a node
    pub min_samples_split: usize,

    /// Minimum samples in each leaf
    pub min_samples_leaf: usize,

    /// Draw a bootstrap sample per tree instead of using every row
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            random_state: 42,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
        }
    }
}

impl ForestParams {
    /// Every field as a `name=value` pair, the form accepted by
    /// [`ForestParams::with_overrides`]
    pub fn to_pairs(&self) -> Vec<String> {
        vec![
            format!("n_estimators={}", self.n_estimators),
            format!("random_state={}", self.random_state),
            match self.max_depth {
                Some(depth) => format!("max_depth={}", depth),
                None => "max_depth=none".to_string(),
            },
            format!("min_samples_split={}", self.min_samples_split),
            format!("min_samples_leaf={}", self.min_samples_leaf),
            format!("bootstrap={}", self.bootstrap),
        ]
    }

    /// Copy of these params with `name=value` pairs applied on top
    pub fn with_overrides(&self, pairs: &[(String, String)]) -> Result<Self, StepError> {
        let mut params = self.clone();
        for (name, value) in pairs {
            match name.as_str() {
                "n_estimators" => params.n_estimators = parse_param(name, value)?,
                "random_state" => params.random_state = parse_param(name, value)?,
                "max_depth" if value.eq_ignore_ascii_case("none") => params.max_depth = None,
                "max_depth" => params.max_depth = Some(parse_param(name, value)?),
                "min_samples_split" => params.min_samples_split = parse_param(name, value)?,
                "min_samples_leaf" => params.min_samples_leaf = parse_param(name, value)?,
                "bootstrap" => params.bootstrap = parse_param(name, value)?,
                _ => return Err(StepError::Model(format!("Unknown forest parameter '{}'", name))),
            }
        }
        Ok(params)
    }

    fn validate(&self) -> Result<(), StepError> {
        if self.n_estimators == 0 {
            return Err(StepError::Model("n_estimators must be at least 1".to_string()));
        }
        if self.min_samples_split < 2 {
            return Err(StepError::Model("min_samples_split must be at least 2".to_string()));
        }
        if self.min_samples_leaf == 0 {
            return Err(StepError::Model("min_samples_leaf must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse_param<T: FromStr>(name: &str, value: &str) -> Result<T, StepError> {
    value
        .parse()
        .map_err(|_| StepError::Model(format!("Invalid value '{}' for forest parameter '{}'", value, name)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single regression tree stored as a flat node array, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct Split {
    feature: usize,
    threshold: f64,
    // Sum of squared child sums over child sizes; larger means lower error
    score: f64,
}

impl RegressionTree {
    fn fit(x: &[Vec<f64>], y: &[f64], samples: Vec<usize>, params: &ForestParams) -> Self {
        let mut nodes = vec![Node::Leaf {
            value: mean(y, &samples),
        }];
        let mut pending = vec![(0usize, samples, 0usize)];

        while let Some((index, samples, depth)) = pending.pop() {
            let depth_left = params.max_depth.map_or(true, |max| depth < max);
            if samples.len() < params.min_samples_split || !depth_left || is_pure(y, &samples) {
                continue;
            }

            let Some(split) = best_split(x, y, &samples, params.min_samples_leaf) else {
                continue;
            };

            let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
                .into_iter()
                .partition(|&i| x[i][split.feature] <= split.threshold);

            let left = nodes.len();
            nodes.push(Node::Leaf {
                value: mean(y, &left_samples),
            });
            let right = nodes.len();
            nodes.push(Node::Leaf {
                value: mean(y, &right_samples),
            });
            nodes[index] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };

            pending.push((right, right_samples, depth + 1));
            pending.push((left, left_samples, depth + 1));
        }

        Self { nodes }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

fn mean(y: &[f64], samples: &[usize]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&i| y[i]).sum::<f64>() / samples.len() as f64
}

fn is_pure(y: &[f64], samples: &[usize]) -> bool {
    let first = y[samples[0]];
    samples.iter().all(|&i| y[i] == first)
}

fn best_split(x: &[Vec<f64>], y: &[f64], samples: &[usize], min_leaf: usize) -> Option<Split> {
    let n = samples.len();
    let total: f64 = samples.iter().map(|&i| y[i]).sum();
    let n_features = x[samples[0]].len();
    let mut best: Option<Split> = None;

    for feature in 0..n_features {
        let mut order = samples.to_vec();
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        for pos in 0..n - 1 {
            left_sum += y[order[pos]];

            let current = x[order[pos]][feature];
            let next = x[order[pos + 1]][feature];
            // Equal values cannot be separated; NaN never compares greater
            if !(next > current) {
                continue;
            }

            let left_n = pos + 1;
            let right_n = n - left_n;
            if left_n < min_leaf || right_n < min_leaf {
                continue;
            }

            let right_sum = total - left_sum;
            let score = left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64;

            if best.as_ref().map_or(true, |b| score > b.score) {
                let mut threshold = current / 2.0 + next / 2.0;
                if threshold >= next {
                    threshold = current;
                }
                best = Some(Split {
                    feature,
                    threshold,
                    score,
                });
            }
        }
    }

    best
}

/// Ensemble of regression trees averaged at prediction time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    pub params: ForestParams,
    pub feature_names: Vec<String>,
    trees: Vec<RegressionTree>,
}

impl RandomForestRegressor {
    /// Fit the forest on a row-major feature matrix
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        feature_names: Vec<String>,
        params: &ForestParams,
    ) -> Result<Self, StepError> {
        params.validate()?;

        if x.is_empty() {
            return Err(StepError::EmptyData("no training rows".to_string()));
        }
        if x.len() != y.len() {
            return Err(StepError::Model(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        check_width(x, feature_names.len())?;
        if let Some(row) = y.iter().position(|v| !v.is_finite()) {
            return Err(StepError::Model(format!("target at row {} is not a finite number", row)));
        }

        let n = x.len();
        let mut rng = StdRng::seed_from_u64(params.random_state);
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            let samples: Vec<usize> = if params.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };
            trees.push(RegressionTree::fit(x, y, samples, params));
        }

        debug!(
            "Fitted {} trees on {} rows ({} nodes total)",
            trees.len(),
            n,
            trees.iter().map(RegressionTree::node_count).sum::<usize>()
        );

        Ok(Self {
            params: params.clone(),
            feature_names,
            trees,
        })
    }

    /// Predict one value per row
    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, StepError> {
        check_width(x, self.feature_names.len())?;

        let n_trees = self.trees.len() as f64;
        Ok(x
            .iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect())
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Serialize the fitted model as JSON
    pub fn save(&self, path: &Path) -> Result<(), StepError> {
        ensure_parent(path)?;
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Load a model written by [`RandomForestRegressor::save`]
    pub fn load(path: &Path) -> Result<Self, StepError> {
        if !path.exists() {
            return Err(StepError::InputNotFound(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

fn check_width(x: &[Vec<f64>], expected: usize) -> Result<(), StepError> {
    match x.iter().find(|row| row.len() != expected) {
        Some(row) => Err(StepError::Model(format!(
            "expected {} features, got {}",
            expected,
            row.len()
        ))),
        None => Ok(()),
    }
}
