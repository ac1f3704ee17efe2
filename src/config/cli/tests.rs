//! Tests for CLI argument parsing

use super::*;
use crate::config::parse_config;
use crate::orchestrate::RunMode;
use std::path::PathBuf;

const CONFIG: &str = "
experiment:
  name: mi
data:
  x_path: X.json
  y_path: y.json
";

#[test]
fn test_parse_run_command() {
    let cli = parse_args(["nestcv", "run", "config.yaml"]).unwrap();
    match cli.command {
        Command::Run(args) => {
            assert_eq!(args.config, PathBuf::from("config.yaml"));
            assert_eq!(args.mode, None);
            assert!(!args.parallel);
        }
        _ => panic!("Expected Run command"),
    }
    assert!(!cli.verbose);
    assert!(!cli.quiet);
}

#[test]
fn test_parse_run_with_overrides() {
    let cli = parse_args([
        "nestcv",
        "run",
        "config.yaml",
        "--mode",
        "repeated",
        "--seed",
        "7",
        "--output-dir",
        "/tmp/out",
        "--parallel",
    ])
    .unwrap();

    match cli.command {
        Command::Run(args) => {
            assert_eq!(args.mode, Some(RunMode::Repeated));
            assert_eq!(args.seed, Some(7));
            assert_eq!(args.output_dir, Some(PathBuf::from("/tmp/out")));
            assert!(args.parallel);
        }
        _ => panic!("Expected Run command"),
    }
}

#[test]
fn test_parse_invalid_mode() {
    assert!(parse_args(["nestcv", "run", "c.yaml", "--mode", "holdout"]).is_err());
}

#[test]
fn test_parse_validate_and_info() {
    let cli = parse_args(["nestcv", "validate", "c.yaml", "--detailed", "-v"]).unwrap();
    assert!(cli.verbose);
    assert!(matches!(cli.command, Command::Validate(ValidateArgs { detailed: true, .. })));

    let cli = parse_args(["nestcv", "-q", "info", "c.yaml", "--format", "json"]).unwrap();
    assert!(cli.quiet);
    match cli.command {
        Command::Info(args) => assert_eq!(args.format, OutputFormat::Json),
        _ => panic!("Expected Info command"),
    }
}

#[test]
fn test_parse_missing_config() {
    assert!(parse_args(["nestcv", "run"]).is_err());
}

#[test]
fn test_output_format_from_str() {
    assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
    assert_eq!("yaml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
    assert!("xml".parse::<OutputFormat>().is_err());
    assert_eq!(OutputFormat::default(), OutputFormat::Text);
}

#[test]
fn test_apply_overrides() {
    let mut config = parse_config(CONFIG, "/exp").unwrap();
    let args = RunArgs {
        config: PathBuf::from("c.yaml"),
        mode: Some(RunMode::Repeated),
        output_dir: Some(PathBuf::from("/results/override")),
        seed: Some(99),
        parallel: true,
    };
    apply_overrides(&mut config, &args);

    assert_eq!(config.spec.experiment.mode, RunMode::Repeated);
    assert_eq!(config.spec.experiment.seed, 99);
    assert!(config.spec.search.parallel);
    assert_eq!(
        config.paths().unwrap().output_dir,
        PathBuf::from("/results/override")
    );
}

#[test]
fn test_apply_no_overrides_keeps_config() {
    let mut config = parse_config(CONFIG, "/exp").unwrap();
    let before = config.clone();
    let args = RunArgs {
        config: PathBuf::from("c.yaml"),
        mode: None,
        output_dir: None,
        seed: None,
        parallel: false,
    };
    apply_overrides(&mut config, &args);
    assert_eq!(config, before);
}
