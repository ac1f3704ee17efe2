//! Pipeline composition and registry tests

use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::search::{Combination, ParamGrid, ParamKey};

fn blobs(n_per_class: usize, seed: u64) -> (Features, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = 2 * n_per_class;
    let mut x = Array2::<f64>::zeros((n, 2));
    let mut y = Vec::with_capacity(n);
    for i in 0..n {
        let class = i % 2;
        y.push(class * 5);
        x[[i, 0]] = rng.random::<f64>() + if class == 0 { 10.0 } else { 14.0 };
        x[[i, 1]] = 100.0 * rng.random::<f64>();
    }
    (x, y)
}

fn features_template() -> PipelineTemplate<Features> {
    PipelineTemplate::new(
        StageRegistry::features(),
        StageSpec::new(StandardScaler::NAME),
        StageSpec::new(Lda::NAME),
    )
    .unwrap()
}

#[test]
fn test_pipeline_fit_predict_score() {
    let (x, y) = blobs(15, 1);
    let mut pipeline = Pipeline::new(
        Box::new(StandardScaler::default()),
        Box::new(Lda::default()),
    );
    assert!(!pipeline.is_fitted());

    pipeline.fit(&x, &y).unwrap();
    assert!(pipeline.is_fitted());
    assert_eq!(pipeline.predict(&x).unwrap(), y);
    assert_eq!(pipeline.score(&x, &y, Metric::BalancedAccuracy).unwrap(), 1.0);
}

#[test]
fn test_pipeline_predict_before_fit() {
    let (x, _) = blobs(3, 2);
    let pipeline = Pipeline::new(
        Box::new(StandardScaler::default()),
        Box::new(Lda::default()),
    );
    assert!(matches!(
        pipeline.predict(&x),
        Err(Error::NotFitted { stage: "scaler" })
    ));
}

#[test]
fn test_pipeline_names_unfit_classifier() {
    let (x, y) = blobs(3, 2);
    let mut scaler = StandardScaler::default();
    scaler.fit(&x, &y).unwrap();
    let pipeline = Pipeline::new(Box::new(scaler), Box::new(Lda::default()));
    assert!(!pipeline.is_fitted());
    assert!(matches!(
        pipeline.predict(&x),
        Err(Error::NotFitted { stage: "lda" })
    ));
}

#[test]
fn test_pipeline_describe_and_params() {
    let pipeline = features_template().build(&Combination::new()).unwrap();
    assert_eq!(pipeline.describe(), "scaler+lda");

    let params = pipeline.params();
    let keys: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
    assert!(keys.contains(&"scaler.with_mean"));
    assert!(keys.contains(&"lda.solver"));
    let first_lda = keys.iter().position(|k| k.starts_with("lda."));
    assert!(keys.iter().position(|k| k.starts_with("scaler.")) < first_lda);
}

#[test]
fn test_registry_unknown_stage() {
    let err = PipelineTemplate::new(
        StageRegistry::<Features>::features(),
        StageSpec::new("pca"),
        StageSpec::new(Lda::NAME),
    )
    .unwrap_err();
    match err {
        Error::Config(msg) => {
            assert!(msg.contains("unknown extractor 'pca'"));
            assert!(msg.contains("scaler"));
        }
        other => panic!("expected config error, got {other:?}"),
    }

    let err = PipelineTemplate::new(
        StageRegistry::<Array3<f64>>::trials(),
        StageSpec::new(Csp::NAME),
        StageSpec::new("svm"),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_template_rejects_same_stage_twice() {
    let mut registry = StageRegistry::<Features>::features();
    fn lda_extractor(_: &StageParams) -> crate::error::Result<Box<dyn Transformer<Features>>> {
        Ok(Box::new(StandardScaler::default()))
    }
    registry.register_extractor(Lda::NAME, lda_extractor);
    let result = PipelineTemplate::new(registry, StageSpec::new("lda"), StageSpec::new("lda"));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_template_rejects_bad_base_params() {
    let result = PipelineTemplate::new(
        StageRegistry::features(),
        StageSpec::new(StandardScaler::NAME),
        StageSpec::with_params(Lda::NAME, StageParams::new().with("solver", "qr")),
    );
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_template_build_overlays_combination() {
    let template = PipelineTemplate::new(
        StageRegistry::features(),
        StageSpec::with_params(StandardScaler::NAME, StageParams::new().with("with_mean", false)),
        StageSpec::with_params(Lda::NAME, StageParams::new().with("solver", "lsqr")),
    )
    .unwrap();

    let combination = Combination::new()
        .with(ParamKey::new("lda", "shrinkage"), "auto")
        .with(ParamKey::new("scaler", "with_std"), false);
    let params = template.build(&combination).unwrap().params();
    let get = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };

    assert_eq!(get("scaler.with_mean"), Some(ParamValue::Bool(false)));
    assert_eq!(get("scaler.with_std"), Some(ParamValue::Bool(false)));
    assert_eq!(get("lda.solver"), Some(ParamValue::from("lsqr")));
    assert_eq!(get("lda.shrinkage"), Some(ParamValue::from("auto")));

    // Base parameters are untouched by a build
    let base = template.base_params().unwrap();
    assert!(base.contains(&("lda.shrinkage".to_string(), ParamValue::Null)));
}

#[test]
fn test_template_builds_independent_pipelines() {
    let (x, y) = blobs(6, 3);
    let template = features_template();
    let mut first = template.build(&Combination::new()).unwrap();
    let second = template.build(&Combination::new()).unwrap();

    first.fit(&x, &y).unwrap();
    assert!(first.is_fitted());
    assert!(!second.is_fitted());
}

#[test]
fn test_template_combination_for_foreign_stage() {
    let template = features_template();
    let combination = Combination::new().with(ParamKey::new("csp", "n_components"), 2_i64);
    match template.build(&combination) {
        Err(Error::Config(msg)) => assert!(msg.contains("csp.n_components")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_template_validate_catches_invalid_combination() {
    let template = features_template();
    let grid = ParamGrid::new()
        .with_axis("lda", "solver", ["lsqr", "svd"])
        .unwrap()
        .with_axis("lda", "shrinkage", ["auto"])
        .unwrap();

    match template.validate(&grid) {
        Err(Error::Config(msg)) => {
            assert!(msg.starts_with("param_grid combination lda.solver=svd, lda.shrinkage=auto"));
        }
        other => panic!("expected config error, got {other:?}"),
    }

    let valid = ParamGrid::new()
        .with_axis("lda", "solver", ["lsqr", "eigen"])
        .unwrap();
    assert!(template.validate(&valid).is_ok());
}

/// Extractor that keeps the first `n_columns` columns
struct ColumnSelect {
    n_columns: usize,
    fitted: bool,
}

impl Fittable<Features> for ColumnSelect {
    fn fit(&mut self, _x: &Features, _y: &[usize]) -> crate::error::Result<()> {
        self.fitted = true;
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn name(&self) -> &'static str {
        "select"
    }

    fn params(&self) -> StageParams {
        StageParams::new().with("n_columns", self.n_columns as i64)
    }
}

impl Transformer<Features> for ColumnSelect {
    fn transform(&self, x: &Features) -> crate::error::Result<Features> {
        if !self.fitted {
            return Err(Error::NotFitted { stage: "select" });
        }
        Ok(x.slice(ndarray::s![.., ..self.n_columns]).to_owned())
    }
}

fn column_select(params: &StageParams) -> crate::error::Result<Box<dyn Transformer<Features>>> {
    params.check_known("select", &["n_columns"])?;
    Ok(Box::new(ColumnSelect {
        n_columns: params.usize_or("select", "n_columns", 1)?,
        fitted: false,
    }))
}

#[test]
fn test_custom_stage_registration() {
    let mut registry = StageRegistry::features();
    registry.register_extractor("select", column_select);
    assert_eq!(
        registry.extractor_names().collect::<Vec<_>>(),
        vec!["scaler", "select"]
    );

    let template =
        PipelineTemplate::new(registry, StageSpec::new("select"), StageSpec::new(Lda::NAME))
            .unwrap();
    let (x, y) = blobs(10, 4);
    let mut pipeline = template.build(&Combination::new()).unwrap();
    pipeline.fit(&x, &y).unwrap();

    assert_eq!(pipeline.describe(), "select+lda");
    assert_eq!(pipeline.predict(&x).unwrap(), y);
    assert!(pipeline
        .params()
        .contains(&("select.n_columns".to_string(), ParamValue::Int(1))));
}

#[test]
fn test_unique_labels_sorted() {
    assert_eq!(unique_labels(&[3, 1, 3, 0, 1]), vec![0, 1, 3]);
    assert!(unique_labels(&[]).is_empty());
}
