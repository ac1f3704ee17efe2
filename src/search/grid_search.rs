//! Exhaustive grid search with inner cross-validation

use log::debug;
use serde::Serialize;

use super::grid::{Combination, ParamGrid};
use crate::data::Samples;
use crate::error::Result;
use crate::eval::{FoldConfig, FoldGenerator, Metric};
use crate::pipeline::{Pipeline, PipelineTemplate};

/// Validation result of one grid point.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateScore {
    /// Hyperparameters evaluated
    pub params: Combination,
    /// Mean of the inner fold scores
    pub mean_score: f64,
    /// One score per inner fold
    pub fold_scores: Vec<f64>,
}

/// Result of a search: the refit winner and the full leaderboard.
#[derive(Debug)]
pub struct SearchOutcome<X> {
    /// Winning pipeline, refit on the whole search input
    pub best_pipeline: Pipeline<X>,
    /// Winning hyperparameters
    pub best_params: Combination,
    /// Winning mean validation score
    pub best_score: f64,
    /// Every candidate, in enumeration order
    pub candidates: Vec<CandidateScore>,
}

/// Grid search over a [`PipelineTemplate`].
///
/// Each combination is scored by the mean of its inner-fold scores; the
/// maximum wins and ties go to the combination enumerated first.
#[derive(Debug)]
pub struct GridSearchCv<'a, X> {
    template: &'a PipelineTemplate<X>,
    grid: &'a ParamGrid,
    inner: FoldConfig,
    metric: Metric,
    parallel: bool,
}

/// One inner split with its samples materialized
struct InnerFold<X> {
    x_train: X,
    y_train: Vec<usize>,
    x_val: X,
    y_val: Vec<usize>,
}

impl<'a, X: Samples> GridSearchCv<'a, X> {
    /// Search `grid` with inner folds from `inner`
    pub fn new(
        template: &'a PipelineTemplate<X>,
        grid: &'a ParamGrid,
        inner: FoldConfig,
    ) -> Self {
        Self {
            template,
            grid,
            inner,
            metric: Metric::default(),
            parallel: false,
        }
    }

    /// Scoring metric (default: balanced accuracy)
    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Evaluate (combination, fold) pairs on the rayon pool when the
    /// `parallel` feature is compiled in
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Inner fold configuration
    pub fn inner(&self) -> &FoldConfig {
        &self.inner
    }

    /// Run the search on `(x, y)` and refit the winner on all of it.
    ///
    /// `x` must already exclude any data held out for evaluation.
    pub fn fit(&self, x: &X, y: &[usize]) -> Result<SearchOutcome<X>> {
        let combinations = self.grid.combinations()?;
        let folds: Vec<InnerFold<X>> = FoldGenerator::new(self.inner, y)?
            .splits()
            .map(|split| InnerFold {
                x_train: x.select(&split.train),
                y_train: split.train.iter().map(|&i| y[i]).collect(),
                x_val: x.select(&split.test),
                y_val: split.test.iter().map(|&i| y[i]).collect(),
            })
            .collect();

        let scores = self.evaluate_all(&combinations, &folds)?;

        let mut candidates = Vec::with_capacity(combinations.len());
        for (params, fold_scores) in combinations.into_iter().zip(scores.chunks(folds.len())) {
            let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            debug!("candidate {params}: mean {} = {mean_score:.4}", self.metric);
            candidates.push(CandidateScore {
                params,
                mean_score,
                fold_scores: fold_scores.to_vec(),
            });
        }

        let mut best = 0;
        for (i, candidate) in candidates.iter().enumerate() {
            if candidate.mean_score > candidates[best].mean_score {
                best = i;
            }
        }
        let best_params = candidates[best].params.clone();
        let best_score = candidates[best].mean_score;

        let mut best_pipeline = self.template.build(&best_params)?;
        best_pipeline
            .fit(x, y)
            .map_err(|e| e.with_params(&best_params))?;

        Ok(SearchOutcome {
            best_pipeline,
            best_params,
            best_score,
            candidates,
        })
    }

    /// Score of one (combination, fold) pair on a fresh pipeline
    fn evaluate(&self, params: &Combination, fold: &InnerFold<X>) -> Result<f64> {
        let run = || -> Result<f64> {
            let mut pipeline = self.template.build(params)?;
            pipeline.fit(&fold.x_train, &fold.y_train)?;
            pipeline.score(&fold.x_val, &fold.y_val, self.metric)
        };
        run().map_err(|e| e.with_params(params))
    }

    /// Scores for every (combination, fold) pair, combination-major.
    fn evaluate_all(
        &self,
        combinations: &[Combination],
        folds: &[InnerFold<X>],
    ) -> Result<Vec<f64>> {
        let tasks: Vec<(&Combination, &InnerFold<X>)> = combinations
            .iter()
            .flat_map(|c| folds.iter().map(move |f| (c, f)))
            .collect();

        if self.parallel {
            #[cfg(feature = "parallel")]
            {
                use rayon::prelude::*;
                // Collected in task order, so the first error and the
                // selection are identical to the sequential path
                let results: Vec<Result<f64>> = tasks
                    .par_iter()
                    .map(|(params, fold)| self.evaluate(params, fold))
                    .collect();
                return results.into_iter().collect();
            }
            #[cfg(not(feature = "parallel"))]
            log::warn!(
                "search.parallel requested but nestcv was built without the `parallel` \
                 feature; evaluating sequentially"
            );
        }

        tasks
            .into_iter()
            .map(|(params, fold)| self.evaluate(params, fold))
            .collect()
    }
}
