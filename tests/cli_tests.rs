use regex::Regex;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;
use xrrfit::model::LayerStack;
use xrrfit::optics::BuiltinTable;

const MODEL: &str = r#"{
    "lambda": 1.54056e-10,
    "layers": [
        {
            "name": "Al2O3",
            "thickness": { "min": 40e-9, "expected": 50e-9, "max": 70e-9, "enabled": true },
            "density": { "min": 3.4e3, "expected": 3.4e3, "max": 3.4e3 },
            "roughness": { "min": 0.0, "expected": 0.3e-9, "max": 1e-9 },
            "composition": { "first": { "Al": 2, "O": 3 } }
        }
    ],
    "substrate": {
        "name": "Si",
        "thickness": { "min": 0.0, "expected": 0.0, "max": 0.0 },
        "density": { "min": 2.33e3, "expected": 2.33e3, "max": 2.33e3 },
        "roughness": { "min": 0.0, "expected": 0.2e-9, "max": 1e-9 },
        "composition": { "first": { "Si": 1 } }
    }
}"#;

struct TestContext {
    dir: TempDir,
    model_path: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let model_path = dir.path().join("model.json");
        fs::write(&model_path, MODEL).unwrap();
        Self { dir, model_path }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_str().unwrap().to_string()
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_xrrfit"))
            .arg("--model")
            .arg(&self.model_path)
            .args(args)
            .output()
            .expect("Failed to execute binary")
    }
}

fn data_rows(text: &str) -> Vec<Vec<f64>> {
    text.lines()
        .skip(1)
        .map(|l| l.split(',').map(|v| v.parse().unwrap()).collect())
        .collect()
}

#[test]
fn test_cli_simulate_to_file() {
    let ctx = TestContext::new();
    let out = ctx.path("curve.csv");
    let output = ctx.run(&["simulate", "--points", "500", "--out", &out]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("angle_deg,intensity\n"));
    let rows = data_rows(&text);
    assert_eq!(rows.len(), 500);
    assert_eq!(rows[0][0], 0.0);
    assert_eq!(rows[499][0], 5.0);
    assert!(rows.iter().all(|r| r[1] >= 0.0 && r[1] <= 1.0 + 1e-6));
}

#[test]
fn test_cli_simulate_noise_is_seeded() {
    let ctx = TestContext::new();
    let args = [
        "simulate", "--points", "200", "--photons", "1e-7", "--seed", "17", "--db",
    ];
    let a = ctx.run(&args);
    let b = ctx.run(&args);
    assert!(a.status.success());
    assert_eq!(a.stdout, b.stdout);

    let text = String::from_utf8_lossy(&a.stdout).to_string();
    assert!(text.starts_with("angle_deg,intensity_db\n"));
    for row in data_rows(&text) {
        assert!(row[1] <= 0.5 && row[1] >= -200.0, "{:?}", row);
    }
}

#[test]
fn test_cli_profile_to_stdout() {
    let ctx = TestContext::new();
    let output = ctx.run(&["profile", "--points", "50", "--property", "density"]);
    assert!(output.status.success());

    let text = String::from_utf8_lossy(&output.stdout).to_string();
    assert!(text.starts_with("depth_nm,density\n"));
    let rows = data_rows(&text);
    assert_eq!(rows.len(), 50);
    assert_eq!(rows[0][1], 0.0);
    assert!((rows[49][1] - 2.33e3).abs() < 1.0);
}

#[test]
fn test_cli_fit_writes_model_and_curves() {
    let ctx = TestContext::new();
    let measured = ctx.path("measured.csv");
    let fitted = ctx.path("fitted.json");
    let curves = ctx.path("curves.csv");

    let sim = ctx.run(&["simulate", "--points", "400", "--to", "3", "--out", &measured]);
    assert!(sim.status.success());

    let output = ctx.run(&[
        "fit",
        "--data",
        &measured,
        "--iterations",
        "15",
        "--popsize",
        "12",
        "--norm",
        "log",
        "--seed",
        "3",
        "--threads",
        "2",
        "--report-perf",
        "--out",
        &fitted,
        "--curve-out",
        &curves,
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("FIT RESULT: Iteration budget exhausted"));
    assert!(stdout.contains("Al2O3#0.thickness"));
    assert!(stdout.contains("Fitting took"));

    let re = Regex::new(r"Fitness: ([0-9.eE+-]+)").unwrap();
    let fitness: f64 = re.captures(&stdout).unwrap()[1].parse().unwrap();
    assert!(fitness.is_finite() && fitness >= 0.0);

    let stack = LayerStack::load_from_file(&fitted, &BuiltinTable).unwrap();
    let t = stack.layers[0].thickness.expected;
    assert!((40e-9..=70e-9).contains(&t));

    let text = fs::read_to_string(&curves).unwrap();
    assert!(text.starts_with("angle_deg,measured,fitted\n"));
    assert_eq!(data_rows(&text).len(), 400);
}

#[test]
fn test_cli_settings_file_with_override() {
    let ctx = TestContext::new();
    let measured = ctx.path("measured.csv");
    let settings = ctx.path("fit.json");
    fs::write(
        &settings,
        r#"{ "fit": { "iterations": 500, "popsize": 8, "seed": 5 }, "norm": { "norm": "sqrt" } }"#,
    )
    .unwrap();

    assert!(ctx
        .run(&["simulate", "--points", "200", "--to", "3", "--out", &measured])
        .status
        .success());

    let output = ctx.run(&[
        "fit",
        "--data",
        &measured,
        "--settings",
        &settings,
        "--iterations",
        "4",
        "--report-every",
        "1",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    // Only four generations ran despite the file asking for 500.
    assert!(stdout.contains("Gen     4"));
    assert!(!stdout.contains("Gen     5"));
    // Per-generation session logs stay below the default level.
    assert!(!String::from_utf8_lossy(&output.stderr).contains("bestfit"));
}

#[test]
fn test_cli_debug_logs_each_generation_once() {
    let ctx = TestContext::new();
    let measured = ctx.path("measured.csv");
    assert!(ctx
        .run(&["simulate", "--points", "200", "--to", "3", "--out", &measured])
        .status
        .success());

    let output = ctx.run(&[
        "--debug",
        "fit",
        "--data",
        &measured,
        "--iterations",
        "3",
        "--popsize",
        "8",
        "--report-every",
        "100",
    ]);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    assert_eq!(stderr.matches("bestfit").count(), 3, "{}", stderr);
    assert_eq!(stderr.matches("iteration = 3,").count(), 1);
}

#[test]
fn test_cli_fit_rejects_empty_range() {
    let ctx = TestContext::new();
    let measured = ctx.path("measured.csv");
    assert!(ctx
        .run(&["simulate", "--points", "100", "--to", "3", "--out", &measured])
        .status
        .success());

    let output = ctx.run(&[
        "fit",
        "--data",
        &measured,
        "--first-angle",
        "10",
        "--last-angle",
        "20",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("only 0 data point"), "{}", stderr);
}

#[test]
fn test_cli_missing_model_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_xrrfit"))
        .args(["--model", "/nonexistent/model.json", "simulate"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
