//! Repeated stratified k-fold with fixed hyperparameters

use crate::data::{Dataset, Samples};
use crate::error::Result;
use crate::eval::{FoldConfig, FoldGenerator, Metric, ReportWriter};
use crate::pipeline::PipelineTemplate;
use crate::search::Combination;

use super::{drive, FoldOutcome, RunMode, RunObserver, RunReport, RunStart};

/// One fresh pipeline per split, built from the template's base parameters.
#[derive(Debug)]
pub struct RepeatedCv<'a, X> {
    template: &'a PipelineTemplate<X>,
    folds: FoldConfig,
    metric: Metric,
    report: Option<ReportWriter>,
}

impl<'a, X: Samples> RepeatedCv<'a, X> {
    /// Evaluate `template` over the splits of `folds`
    pub fn new(template: &'a PipelineTemplate<X>, folds: FoldConfig) -> Self {
        Self {
            template,
            folds,
            metric: Metric::default(),
            report: None,
        }
    }

    /// Scoring metric
    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Persist metrics and fold scores
    #[must_use]
    pub fn with_report(mut self, writer: ReportWriter) -> Self {
        self.report = Some(writer);
        self
    }

    /// Evaluate `dataset`, notifying `observer`.
    pub fn run(&self, dataset: &Dataset<X>, observer: &mut dyn RunObserver) -> Result<RunReport> {
        let generator = FoldGenerator::new(self.folds, dataset.y())?;
        let start = RunStart {
            mode: RunMode::Repeated,
            outer: self.folds,
            inner: None,
            metric: self.metric,
            pipeline: format!(
                "{}+{}",
                self.template.extractor().name,
                self.template.classifier().name
            ),
            params: self.template.base_params()?,
            grid: None,
            n_samples: dataset.len(),
        };
        let base = Combination::new();

        drive(
            &start,
            generator.splits(),
            observer,
            self.report.as_ref(),
            |split| {
                let train = dataset.subset(&split.train);
                let mut pipeline = self.template.build(&base)?;
                pipeline.fit(train.x(), train.y())?;

                let test = dataset.subset(&split.test);
                Ok(FoldOutcome {
                    score: pipeline.score(test.x(), test.y(), self.metric)?,
                    best_params: None,
                    validation_score: None,
                })
            },
        )
    }
}
