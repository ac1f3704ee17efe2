//! Nested cross-validation

use crate::data::{Dataset, Samples};
use crate::error::Result;
use crate::eval::{FoldConfig, FoldGenerator, Metric, ReportWriter};
use crate::pipeline::PipelineTemplate;
use crate::search::{GridSearchCv, ParamGrid};

use super::{drive, FoldOutcome, RunMode, RunObserver, RunReport, RunStart};

/// Outer evaluation loop with an inner grid search per fold.
///
/// The search of outer fold *i* only ever sees that fold's training
/// partition; the test partition is materialized after the winner is refit.
#[derive(Debug)]
pub struct NestedCv<'a, X> {
    template: &'a PipelineTemplate<X>,
    grid: &'a ParamGrid,
    outer: FoldConfig,
    inner: FoldConfig,
    metric: Metric,
    parallel: bool,
    report: Option<ReportWriter>,
}

impl<'a, X: Samples> NestedCv<'a, X> {
    /// Search `grid` over `template` with `inner` folds inside each `outer` fold
    pub fn new(
        template: &'a PipelineTemplate<X>,
        grid: &'a ParamGrid,
        outer: FoldConfig,
        inner: FoldConfig,
    ) -> Self {
        Self {
            template,
            grid,
            outer,
            inner,
            metric: Metric::default(),
            parallel: false,
            report: None,
        }
    }

    /// Scoring metric for both loops
    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Parallel inner search (needs the `parallel` feature)
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Persist metrics, fold scores and per-fold best parameters
    #[must_use]
    pub fn with_report(mut self, writer: ReportWriter) -> Self {
        self.report = Some(writer);
        self
    }

    /// Evaluate `dataset`, notifying `observer`.
    pub fn run(&self, dataset: &Dataset<X>, observer: &mut dyn RunObserver) -> Result<RunReport> {
        // Malformed grids fail before any fold runs
        self.template.validate(self.grid)?;

        let generator = FoldGenerator::new(self.outer, dataset.y())?;
        let start = RunStart {
            mode: RunMode::Nested,
            outer: self.outer,
            inner: Some(self.inner),
            metric: self.metric,
            pipeline: format!(
                "{}+{}",
                self.template.extractor().name,
                self.template.classifier().name
            ),
            params: self.template.base_params()?,
            grid: Some(self.grid.clone()),
            n_samples: dataset.len(),
        };
        let search = GridSearchCv::new(self.template, self.grid, self.inner)
            .with_metric(self.metric)
            .with_parallel(self.parallel);

        drive(
            &start,
            generator.splits(),
            observer,
            self.report.as_ref(),
            |split| {
                let train = dataset.subset(&split.train);
                let outcome = search.fit(train.x(), train.y())?;

                let test = dataset.subset(&split.test);
                let score = outcome
                    .best_pipeline
                    .score(test.x(), test.y(), self.metric)
                    .map_err(|e| e.with_params(&outcome.best_params))?;
                Ok(FoldOutcome {
                    score,
                    best_params: Some(outcome.best_params),
                    validation_score: Some(outcome.best_score),
                })
            },
        )
    }
}
