//! Grid search tests

use approx::assert_relative_eq;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{GridSearchCv, ParamGrid};
use crate::data::Samples;
use crate::error::Error;
use crate::eval::{FoldConfig, FoldGenerator, Metric};
use crate::pipeline::{PipelineTemplate, StageRegistry, StageSpec};

fn separable(n_per_class: usize, seed: u64) -> (Array2<f64>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = 2 * n_per_class;
    let mut x = Array2::<f64>::zeros((n, 3));
    let mut y = Vec::with_capacity(n);
    for i in 0..n {
        let class = i % 2;
        y.push(class);
        for j in 0..3 {
            x[[i, j]] = rng.random::<f64>() - 0.5;
        }
        x[[i, 1]] += if class == 0 { -3.0 } else { 3.0 };
    }
    (x, y)
}

fn template() -> PipelineTemplate<Array2<f64>> {
    PipelineTemplate::new(
        StageRegistry::features(),
        StageSpec::new("scaler"),
        StageSpec::new("lda"),
    )
    .unwrap()
}

#[test]
fn test_single_combination_matches_plain_cross_validation() {
    let (x, y) = separable(12, 3);
    let template = template();
    let grid = ParamGrid::new()
        .with_axis("lda", "solver", ["lsqr"])
        .unwrap();
    let inner = FoldConfig::stratified(3, true, 9);

    let outcome = GridSearchCv::new(&template, &grid, inner).fit(&x, &y).unwrap();

    let combination = &grid.combinations().unwrap()[0];
    let mut expected = Vec::new();
    for split in FoldGenerator::new(inner, &y).unwrap().splits() {
        let mut pipeline = template.build(combination).unwrap();
        let y_train: Vec<usize> = split.train.iter().map(|&i| y[i]).collect();
        let y_test: Vec<usize> = split.test.iter().map(|&i| y[i]).collect();
        pipeline.fit(&Samples::select(&x, &split.train), &y_train).unwrap();
        expected.push(
            pipeline
                .score(&Samples::select(&x, &split.test), &y_test, Metric::BalancedAccuracy)
                .unwrap(),
        );
    }
    let expected_mean = expected.iter().sum::<f64>() / expected.len() as f64;

    assert_eq!(&outcome.best_params, combination);
    assert_eq!(outcome.candidates.len(), 1);
    assert_eq!(outcome.candidates[0].fold_scores, expected);
    assert_relative_eq!(outcome.best_score, expected_mean);
    assert!(outcome.best_pipeline.is_fitted());
}

#[test]
fn test_ties_go_to_first_combination() {
    let (x, y) = separable(10, 5);
    let template = template();
    let grid = ParamGrid::new()
        .with_axis("lda", "tol", [1e-4, 1e-6, 1e-8])
        .unwrap();

    let outcome = GridSearchCv::new(&template, &grid, FoldConfig::stratified(2, true, 1))
        .fit(&x, &y)
        .unwrap();

    assert!(outcome.candidates.iter().all(|c| c.mean_score == 1.0));
    assert_eq!(outcome.best_params.get("lda", "tol").and_then(|v| v.as_float()), Some(1e-4));
}

#[test]
fn test_candidates_follow_enumeration_order() {
    let (x, y) = separable(10, 8);
    let template = template();
    let grid = ParamGrid::new()
        .with_axis("scaler", "with_std", [true, false])
        .unwrap()
        .with_axis("lda", "solver", ["svd", "lsqr"])
        .unwrap();

    let outcome = GridSearchCv::new(&template, &grid, FoldConfig::stratified(2, true, 4))
        .with_metric(Metric::Accuracy)
        .fit(&x, &y)
        .unwrap();

    let enumerated = grid.combinations().unwrap();
    assert_eq!(outcome.candidates.len(), 4);
    for (candidate, combination) in outcome.candidates.iter().zip(&enumerated) {
        assert_eq!(&candidate.params, combination);
        assert_eq!(candidate.fold_scores.len(), 2);
    }
}

#[test]
fn test_empty_grid_is_rejected() {
    let (x, y) = separable(6, 2);
    let template = template();
    let grid = ParamGrid::new();

    let result = GridSearchCv::new(&template, &grid, FoldConfig::stratified(2, true, 0)).fit(&x, &y);
    assert!(matches!(result, Err(Error::EmptyGrid)));
}

#[test]
fn test_grid_for_foreign_stage_is_config_error() {
    let (x, y) = separable(6, 2);
    let template = template();
    let grid = ParamGrid::new()
        .with_axis("csp", "n_components", [2_i64])
        .unwrap();

    let result = GridSearchCv::new(&template, &grid, FoldConfig::stratified(2, true, 0)).fit(&x, &y);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_search_fit_error_carries_combination() {
    // A constant column makes the unshrunk lsqr covariance singular
    let (mut x, y) = separable(8, 6);
    x.column_mut(2).fill(1.0);
    let template = PipelineTemplate::new(
        StageRegistry::features(),
        StageSpec::with_params(
            "scaler",
            crate::pipeline::StageParams::new().with("with_std", false),
        ),
        StageSpec::new("lda"),
    )
    .unwrap();
    let grid = ParamGrid::new()
        .with_axis("lda", "solver", ["lsqr"])
        .unwrap();

    let result = GridSearchCv::new(&template, &grid, FoldConfig::stratified(2, true, 0)).fit(&x, &y);
    match result {
        Err(Error::Fit { params, fold, .. }) => {
            assert_eq!(params.as_deref(), Some("lda.solver=lsqr"));
            assert_eq!(fold, None);
        }
        other => panic!("expected fit error, got {other:?}"),
    }
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_matches_sequential() {
    let (x, y) = separable(10, 12);
    let template = template();
    let grid = ParamGrid::new()
        .with_axis("lda", "solver", ["svd", "lsqr", "eigen"])
        .unwrap();
    let inner = FoldConfig::stratified(4, true, 21);

    let sequential = GridSearchCv::new(&template, &grid, inner).fit(&x, &y).unwrap();
    let parallel = GridSearchCv::new(&template, &grid, inner)
        .with_parallel(true)
        .fit(&x, &y)
        .unwrap();

    assert_eq!(sequential.best_params, parallel.best_params);
    for (a, b) in sequential.candidates.iter().zip(&parallel.candidates) {
        assert_eq!(a.fold_scores, b.fold_scores);
    }
}
