use clap::{CommandFactory, FromArgMatches, Parser};
use std::fs;
use tempfile::tempdir;
use xrrfit::config::FitConfig;
use xrrfit::fitness::NormKind;
use xrrfit::optimizer::{Algorithm, BaseVector, DeSettings};

#[derive(Parser, Debug)]
struct Harness {
    #[command(flatten)]
    config: FitConfig,
}

fn parse(args: &[&str]) -> (FitConfig, clap::ArgMatches) {
    let matches = Harness::command()
        .try_get_matches_from(std::iter::once("xrrfit").chain(args.iter().copied()))
        .unwrap();
    let harness = Harness::from_arg_matches(&matches).unwrap();
    (harness.config, matches)
}

#[test]
fn test_defaults() {
    let cfg = FitConfig::default();
    assert_eq!(cfg.fit.popsize, 40);
    assert_eq!(cfg.fit.iterations, 200);
    assert!(!cfg.fit.autostop);
    assert_eq!(cfg.fit.algorithm, Algorithm::De);
    assert_eq!(cfg.fit.base, BaseVector::Rand);
    assert_eq!(cfg.norm.norm, NormKind::RelChi2);
    assert_eq!(cfg.norm.threshold_db, -70.0);
    assert_eq!(cfg.advanced.kr(), 0.85);
    assert!(cfg.validate().is_ok());

    // CLI defaults agree with Default.
    let (cli, _) = parse(&[]);
    assert_eq!(cli.fit.popsize, cfg.fit.popsize);
    assert_eq!(cli.norm.norm, cfg.norm.norm);
    assert_eq!(cli.advanced.km, cfg.advanced.km);
}

#[test]
fn test_partial_json_uses_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fit.json");
    fs::write(
        &path,
        r#"{ "fit": { "popsize": 60, "algorithm": "covde" }, "norm": { "norm": "log" } }"#,
    )
    .unwrap();

    let cfg = FitConfig::load_from_file(&path).unwrap();
    assert_eq!(cfg.fit.popsize, 60);
    assert_eq!(cfg.fit.algorithm, Algorithm::CovDe);
    assert_eq!(cfg.fit.iterations, 200);
    assert_eq!(cfg.norm.norm, NormKind::Log);
    assert_eq!(cfg.norm.pnorm, 2.0);
    assert_eq!(cfg.advanced.cr, 0.5);
}

#[test]
fn test_invalid_json_config_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fit.json");
    fs::write(&path, r#"{ "fit": { "first_angle": 3.0, "last_angle": 1.0 } }"#).unwrap();
    assert!(FitConfig::load_from_file(&path).is_err());

    fs::write(&path, r#"{ "fit": { "algorithm": "lbfgs" } }"#).unwrap();
    assert!(FitConfig::load_from_file(&path).is_err());
}

#[test]
fn test_explicit_flags_override_file() {
    let mut file_cfg = FitConfig::default();
    file_cfg.fit.popsize = 80;
    file_cfg.fit.iterations = 500;
    file_cfg.norm.threshold_db = -50.0;

    let (cli, matches) = parse(&[
        "--iterations",
        "30",
        "--threshold-db",
        "-60",
        "--algorithm",
        "eitheror",
    ]);
    file_cfg.merge_from_cli(&cli, &matches);

    // Given on the command line.
    assert_eq!(file_cfg.fit.iterations, 30);
    assert_eq!(file_cfg.norm.threshold_db, -60.0);
    assert_eq!(file_cfg.fit.algorithm, Algorithm::EitherOr);
    // Defaulted on the command line, so the file wins.
    assert_eq!(file_cfg.fit.popsize, 80);
}

#[test]
fn test_settings_from_config() {
    let (cli, _) = parse(&["--km", "0.9", "--seed", "42", "--cov-period", "5"]);
    let s = DeSettings::from(&cli);
    assert_eq!(s.km, 0.9);
    assert!((s.kr - 0.95).abs() < 1e-12);
    assert_eq!(s.seed, Some(42));
    assert_eq!(s.cov_period, 5);
    assert!(s.validate().is_ok());
}
