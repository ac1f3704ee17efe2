//! Integration tests for nested cross-validation
//!
//! A spy extractor records the sample IDs (column 0 of X) every fit sees,
//! so leakage between outer test partitions and the inner search can be
//! checked directly.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

use ndarray::{s, Array2};
use nestcv::data::Dataset;
use nestcv::eval::{FoldConfig, FoldGenerator};
use nestcv::orchestrate::{FoldRecord, NestedCv, NoopObserver, RunEnd, RunObserver};
use nestcv::pipeline::{
    Features, Fittable, PipelineTemplate, StageParams, StageRegistry, StageSpec, Transformer,
};
use nestcv::search::ParamGrid;
use nestcv::{Error, Result};

thread_local! {
    static FITS: RefCell<Vec<Vec<usize>>> = const { RefCell::new(Vec::new()) };
    static FAIL_AT: Cell<Option<usize>> = const { Cell::new(None) };
}

fn reset_spy(fail_at: Option<usize>) {
    FITS.with(|f| f.borrow_mut().clear());
    FAIL_AT.with(|f| f.set(fail_at));
}

fn fit_log() -> Vec<Vec<usize>> {
    FITS.with(|f| f.borrow().clone())
}

/// Drops the ID column after recording which samples it was fit on
struct Spy {
    fitted: bool,
}

impl Fittable<Features> for Spy {
    fn fit(&mut self, x: &Features, _y: &[usize]) -> Result<()> {
        let ids: Vec<usize> = x.column(0).iter().map(|&v| v as usize).collect();
        let n_fits = FITS.with(|f| {
            let mut fits = f.borrow_mut();
            fits.push(ids);
            fits.len()
        });
        if FAIL_AT.with(Cell::get) == Some(n_fits) {
            return Err(Error::fit("synthetic failure"));
        }
        self.fitted = true;
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn name(&self) -> &'static str {
        "spy"
    }
}

impl Transformer<Features> for Spy {
    fn transform(&self, x: &Features) -> Result<Features> {
        if !self.fitted {
            return Err(Error::NotFitted { stage: "spy" });
        }
        Ok(x.slice(s![.., 1..]).to_owned())
    }
}

fn spy(params: &StageParams) -> Result<Box<dyn Transformer<Features>>> {
    params.check_known("spy", &[])?;
    Ok(Box::new(Spy { fitted: false }))
}

fn template() -> PipelineTemplate<Features> {
    let mut registry = StageRegistry::features();
    registry.register_extractor("spy", spy);
    PipelineTemplate::new(registry, StageSpec::new("spy"), StageSpec::new("lda")).unwrap()
}

/// 30 samples, two classes; column 0 is the sample ID
fn dataset() -> Dataset<Array2<f64>> {
    let n = 30;
    let x = Array2::from_shape_fn((n, 4), |(i, j)| match j {
        0 => i as f64,
        _ => (i % 2) as f64 * 2.0 + ((i * 31 + j * 17) % 13) as f64 / 13.0,
    });
    let y = (0..n).map(|i| i % 2).collect();
    Dataset::new(x, y).unwrap()
}

fn single_point_grid() -> ParamGrid {
    ParamGrid::new().with_axis("lda", "solver", ["svd"]).unwrap()
}

/// Remembers how many fits had happened when each fold ended
#[derive(Default)]
struct FoldBoundaries {
    ends: Vec<usize>,
    records: Vec<FoldRecord>,
    finished: bool,
    failed: Option<String>,
}

impl RunObserver for FoldBoundaries {
    fn on_fold_end(&mut self, record: &FoldRecord) -> Result<()> {
        self.ends.push(FITS.with(|f| f.borrow().len()));
        self.records.push(record.clone());
        Ok(())
    }

    fn on_run_end(&mut self, _end: &RunEnd<'_>) -> Result<()> {
        self.finished = true;
        Ok(())
    }

    fn on_run_failed(&mut self, error: &Error) {
        self.failed = Some(error.to_string());
    }
}

#[test]
fn test_inner_search_never_sees_outer_test_samples() {
    reset_spy(None);
    let data = dataset();
    let template = template();
    let grid = single_point_grid();
    let outer = FoldConfig::repeated(3, 2, 7);
    let inner = FoldConfig::stratified(2, true, 7);

    let mut observer = FoldBoundaries::default();
    let report = NestedCv::new(&template, &grid, outer, inner)
        .run(&data, &mut observer)
        .unwrap();
    assert_eq!(report.records.len(), 6);

    let fits = fit_log();
    // Two inner fits plus the refit per outer fold
    assert_eq!(fits.len(), 6 * 3);

    let splits: Vec<_> = FoldGenerator::new(outer, data.y()).unwrap().splits().collect();
    let mut start = 0;
    for (split, &end) in splits.iter().zip(&observer.ends) {
        let train: BTreeSet<usize> = split.train.iter().copied().collect();
        let test: BTreeSet<usize> = split.test.iter().copied().collect();
        for ids in &fits[start..end] {
            assert!(ids.iter().all(|id| train.contains(id)));
            assert!(ids.iter().all(|id| !test.contains(id)));
        }
        // The refit sees exactly the outer training partition
        let refit: BTreeSet<usize> = fits[end - 1].iter().copied().collect();
        assert_eq!(refit, train);
        start = end;
    }
}

#[test]
fn test_fit_failure_aborts_run_at_third_fold() {
    // Fold 0 and 1 use fits 1..=6; the 7th is the first inner fit of fold 2
    reset_spy(Some(7));
    let data = dataset();
    let template = template();
    let grid = single_point_grid();

    let mut observer = FoldBoundaries::default();
    let err = NestedCv::new(
        &template,
        &grid,
        FoldConfig::repeated(5, 1, 1),
        FoldConfig::stratified(2, true, 1),
    )
    .run(&data, &mut observer)
    .unwrap_err();

    match err {
        Error::Fit {
            fold,
            params,
            message,
        } => {
            assert_eq!(fold, Some(2));
            assert_eq!(params.as_deref(), Some("lda.solver=svd"));
            assert_eq!(message, "synthetic failure");
        }
        other => panic!("expected a fit error, got {other:?}"),
    }
    assert_eq!(observer.records.len(), 2);
    assert!(!observer.finished);
    assert!(observer.failed.is_some());
    assert_eq!(fit_log().len(), 7);
}

#[test]
fn test_nested_run_is_deterministic() {
    reset_spy(None);
    let data = dataset();
    let template = template();
    let grid = ParamGrid::new()
        .with_axis("lda", "solver", ["svd", "lsqr"])
        .unwrap();
    let cv = NestedCv::new(
        &template,
        &grid,
        FoldConfig::repeated(3, 2, 99),
        FoldConfig::stratified(3, true, 99),
    );

    let first = cv.run(&data, &mut NoopObserver).unwrap();
    let second = cv.run(&data, &mut NoopObserver).unwrap();
    assert_eq!(first.records, second.records);
    assert_eq!(first.summary, second.summary);
}

#[test]
fn test_best_params_recorded_per_fold() {
    reset_spy(None);
    let data = dataset();
    let template = template();
    let grid = ParamGrid::new()
        .with_axis("lda", "solver", ["svd", "lsqr"])
        .unwrap();

    let report = NestedCv::new(
        &template,
        &grid,
        FoldConfig::repeated(3, 1, 5),
        FoldConfig::stratified(2, true, 5),
    )
    .run(&data, &mut NoopObserver)
    .unwrap();

    for record in &report.records {
        let best = record.best_params.as_ref().unwrap();
        assert!(best.get("lda", "solver").is_some());
        let validation = record.validation_score.unwrap();
        assert!((0.0..=1.0).contains(&validation));
        assert!((0.0..=1.0).contains(&record.score));
    }
}
