//! Stratified (repeated) k-fold splitting
//!
//! Allocation follows the usual stratified scheme: classes are ordered by
//! first appearance, the class-sorted label sequence is dealt round-robin
//! into `n_splits` test folds, and each class's fold assignment is shuffled
//! with a seeded [`StdRng`]. Per-class fold sizes therefore differ by at most
//! one, and a class's share of any test fold stays within `1/n_splits` of its
//! global share.
//!
//! All repeats draw from one RNG stream seeded once, so consecutive repeats
//! produce different partitions while the whole sequence stays reproducible.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Fold generation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldConfig {
    /// Number of folds per repeat (≥ 2)
    pub n_splits: usize,
    /// Number of repeats (≥ 1)
    pub n_repeats: usize,
    /// Shuffle each class's fold assignment
    pub shuffle: bool,
    /// Seed for the fold RNG
    pub seed: u64,
}

impl FoldConfig {
    /// Plain stratified k-fold
    pub fn stratified(n_splits: usize, shuffle: bool, seed: u64) -> Self {
        Self {
            n_splits,
            n_repeats: 1,
            shuffle,
            seed,
        }
    }

    /// Repeated stratified k-fold (always shuffled)
    pub fn repeated(n_splits: usize, n_repeats: usize, seed: u64) -> Self {
        Self {
            n_splits,
            n_repeats,
            shuffle: true,
            seed,
        }
    }

    /// Total number of splits produced
    pub fn total_splits(&self) -> usize {
        self.n_splits * self.n_repeats
    }

    fn check(&self) -> Result<()> {
        if self.n_splits < 2 {
            return Err(Error::Config(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }
        if self.n_repeats < 1 {
            return Err(Error::Config("n_repeats must be at least 1".into()));
        }
        if self.n_repeats > 1 && !self.shuffle {
            return Err(Error::Config(
                "repeated k-fold without shuffling would repeat identical splits".into(),
            ));
        }
        Ok(())
    }
}

/// One train/test partition.
///
/// Both index lists are sorted ascending, disjoint, and together cover every
/// sample exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldSplit {
    /// Repeat number (0-based)
    pub repeat: usize,
    /// Fold number within the repeat (0-based)
    pub fold: usize,
    /// Training indices
    pub train: Vec<usize>,
    /// Test indices
    pub test: Vec<usize>,
}

impl FoldSplit {
    /// Position in the overall split sequence
    pub fn index(&self, n_splits: usize) -> usize {
        self.repeat * n_splits + self.fold
    }
}

/// Validated fold generator over a fixed label vector.
#[derive(Debug, Clone)]
pub struct FoldGenerator {
    config: FoldConfig,
    /// Per-sample class index (classes numbered by first appearance)
    encoded: Vec<usize>,
    /// `allocation[fold][class]`: test-fold size per class
    allocation: Vec<Vec<usize>>,
}

impl FoldGenerator {
    /// Validate `config` against `labels` and precompute the per-class
    /// allocation.
    pub fn new(config: FoldConfig, labels: &[usize]) -> Result<Self> {
        config.check()?;

        let mut classes: Vec<usize> = Vec::new();
        let encoded: Vec<usize> = labels
            .iter()
            .map(|label| match classes.iter().position(|c| c == label) {
                Some(k) => k,
                None => {
                    classes.push(*label);
                    classes.len() - 1
                }
            })
            .collect();

        let mut counts = vec![0usize; classes.len()];
        for &k in &encoded {
            counts[k] += 1;
        }
        if let Some((k, &count)) = counts
            .iter()
            .enumerate()
            .find(|(_, &c)| c < config.n_splits)
        {
            return Err(Error::Stratification {
                class: classes[k],
                count,
                n_splits: config.n_splits,
            });
        }

        let mut sorted = encoded.clone();
        sorted.sort_unstable();
        let allocation = (0..config.n_splits)
            .map(|fold| {
                let mut per_class = vec![0usize; classes.len()];
                for &k in sorted.iter().skip(fold).step_by(config.n_splits) {
                    per_class[k] += 1;
                }
                per_class
            })
            .collect();

        Ok(Self {
            config,
            encoded,
            allocation,
        })
    }

    /// Generator configuration
    pub fn config(&self) -> &FoldConfig {
        &self.config
    }

    /// Number of samples being split
    pub fn n_samples(&self) -> usize {
        self.encoded.len()
    }

    /// Number of splits [`splits`](Self::splits) yields
    pub fn len(&self) -> usize {
        self.config.total_splits()
    }

    /// Always false for a validated generator
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lazy split sequence. Each call restarts from the seed.
    pub fn splits(&self) -> Splits<'_> {
        Splits {
            generator: self,
            rng: StdRng::seed_from_u64(self.config.seed),
            repeat: 0,
            fold: 0,
            test_folds: Vec::new(),
        }
    }

    /// Test-fold number per sample for one repeat
    fn assign(&self, rng: &mut StdRng) -> Vec<usize> {
        let n_classes = self.allocation.first().map_or(0, Vec::len);
        let mut test_folds = vec![0usize; self.encoded.len()];
        for class in 0..n_classes {
            let mut folds_for_class: Vec<usize> = self
                .allocation
                .iter()
                .enumerate()
                .flat_map(|(fold, per_class)| std::iter::repeat(fold).take(per_class[class]))
                .collect();
            if self.config.shuffle {
                folds_for_class.shuffle(rng);
            }
            let members = self
                .encoded
                .iter()
                .enumerate()
                .filter(|(_, &k)| k == class)
                .map(|(i, _)| i);
            for (sample, fold) in members.zip(folds_for_class) {
                test_folds[sample] = fold;
            }
        }
        test_folds
    }
}

/// Iterator over the splits of a [`FoldGenerator`].
#[derive(Debug)]
pub struct Splits<'a> {
    generator: &'a FoldGenerator,
    rng: StdRng,
    repeat: usize,
    fold: usize,
    test_folds: Vec<usize>,
}

impl Iterator for Splits<'_> {
    type Item = FoldSplit;

    fn next(&mut self) -> Option<FoldSplit> {
        let config = self.generator.config;
        if self.repeat >= config.n_repeats {
            return None;
        }
        if self.fold == 0 {
            self.test_folds = self.generator.assign(&mut self.rng);
        }

        let (test, train): (Vec<usize>, Vec<usize>) =
            (0..self.test_folds.len()).partition(|&i| self.test_folds[i] == self.fold);
        let split = FoldSplit {
            repeat: self.repeat,
            fold: self.fold,
            train,
            test,
        };

        self.fold += 1;
        if self.fold == config.n_splits {
            self.fold = 0;
            self.repeat += 1;
        }
        Some(split)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let config = self.generator.config;
        let done = (self.repeat * config.n_splits + self.fold).min(config.total_splits());
        let remaining = config.total_splits() - done;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Splits<'_> {}
