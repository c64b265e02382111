use rstest::rstest;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use xrrfit::error::{XrrError, XrrResult};
use xrrfit::model::Bound;
use xrrfit::optimizer::{accepts, Algorithm, BaseVector, DeOptimizer, DeSettings};

fn pool() -> Arc<rayon::ThreadPool> {
    Arc::new(
        rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .unwrap(),
    )
}

fn bounds() -> Vec<Bound> {
    vec![
        Bound {
            lo: -5.0,
            hi: 5.0,
            initial: 4.0,
        },
        Bound::fixed(1.5),
        Bound {
            lo: 0.0,
            hi: 10.0,
            initial: 9.0,
        },
        Bound {
            lo: -1.0,
            hi: 1.0,
            initial: 0.0,
        },
    ]
}

/// Rotated quadratic with its minimum at (1, *, 3, 0.5).
fn valley(x: &[f64]) -> XrrResult<f64> {
    let u = x[0] - 1.0;
    let v = x[2] - 3.0;
    let w = x[3] - 0.5;
    Ok((u + v).powi(2) + 10.0 * (u - v).powi(2) + w * w)
}

fn settings(algorithm: Algorithm, base: BaseVector, seed: u64) -> DeSettings {
    DeSettings {
        popsize: 20,
        algorithm,
        base,
        seed: Some(seed),
        ..Default::default()
    }
}

#[rstest]
#[case(Algorithm::De, BaseVector::Rand)]
#[case(Algorithm::De, BaseVector::Best)]
#[case(Algorithm::CovDe, BaseVector::Rand)]
#[case(Algorithm::CovDe, BaseVector::Best)]
#[case(Algorithm::EitherOr, BaseVector::Rand)]
#[case(Algorithm::EitherOr, BaseVector::Best)]
fn test_generation_invariants(#[case] algorithm: Algorithm, #[case] base: BaseVector) {
    let bounds = bounds();
    let mut de = DeOptimizer::new(
        bounds.clone(),
        valley,
        settings(algorithm, base, 11),
        pool(),
    )
    .unwrap();

    // The initial guess is always part of the first population.
    assert_eq!(de.population()[0].params(), &[4.0, 1.5, 9.0, 0.0]);

    let mut best = de.stats().best;
    for _ in 0..100 {
        let stats = de.advance().unwrap().clone();
        assert!(stats.best <= best, "best went from {} to {}", best, stats.best);
        assert!(stats.best <= stats.median && stats.median <= stats.worst);
        best = stats.best;

        assert_eq!(de.population().len(), 20);
        for ind in de.population() {
            for (v, b) in ind.params().iter().zip(&bounds) {
                assert!(*v >= b.lo && *v <= b.hi, "{} outside [{}, {}]", v, b.lo, b.hi);
            }
            assert_eq!(ind.params()[1], 1.5);
        }
    }
    assert_eq!(de.generation(), 100);
    assert!(best < 0.1, "{} / {} stalled at {}", algorithm, base, best);
}

#[rstest]
#[case(Algorithm::De)]
#[case(Algorithm::CovDe)]
#[case(Algorithm::EitherOr)]
fn test_seeded_runs_are_reproducible(#[case] algorithm: Algorithm) {
    let run = |threads: usize| {
        let pool = Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap(),
        );
        let mut de = DeOptimizer::new(
            bounds(),
            valley,
            settings(algorithm, BaseVector::Rand, 99),
            pool,
        )
        .unwrap();
        for _ in 0..25 {
            de.advance().unwrap();
        }
        de.population()
            .iter()
            .map(|i| i.params().to_vec())
            .collect::<Vec<_>>()
    };
    assert_eq!(run(1), run(4));
}

#[test]
fn test_evaluation_error_poisons_optimizer() {
    let calls = AtomicUsize::new(0);
    // Fails on the first trial evaluated after the initial population.
    let objective = |x: &[f64]| -> XrrResult<f64> {
        if calls.fetch_add(1, Ordering::SeqCst) >= 20 {
            return Err(XrrError::Evaluation("simulated failure".to_string()));
        }
        valley(x)
    };
    let mut de = DeOptimizer::new(
        bounds(),
        objective,
        settings(Algorithm::De, BaseVector::Rand, 5),
        pool(),
    )
    .unwrap();
    let before: Vec<Vec<f64>> = de.population().iter().map(|i| i.params().to_vec()).collect();

    let err = de.advance().unwrap_err();
    assert!(matches!(err, XrrError::Evaluation(_)));
    assert!(de.is_poisoned());
    assert_eq!(de.generation(), 0);

    // No partial selection happened.
    let after: Vec<Vec<f64>> = de.population().iter().map(|i| i.params().to_vec()).collect();
    assert_eq!(before, after);

    assert!(matches!(de.advance(), Err(XrrError::Poisoned)));
}

#[test]
fn test_initial_population_error_is_returned() {
    let objective = |_: &[f64]| -> XrrResult<f64> { Err(XrrError::Evaluation("bad".to_string())) };
    let result = DeOptimizer::new(
        bounds(),
        objective,
        settings(Algorithm::De, BaseVector::Rand, 1),
        pool(),
    );
    assert!(result.is_err());
}

#[test]
fn test_nan_fitness_never_replaces_parent() {
    // Anything away from the initial guess evaluates to NaN.
    let objective = |x: &[f64]| -> XrrResult<f64> {
        if x[0] == 4.0 && x[2] == 9.0 && x[3] == 0.0 {
            Ok(1.0)
        } else {
            Ok(f64::NAN)
        }
    };
    let mut de = DeOptimizer::new(
        bounds(),
        objective,
        settings(Algorithm::De, BaseVector::Best, 3),
        pool(),
    )
    .unwrap();
    assert_eq!(de.stats().best, 1.0);
    for _ in 0..10 {
        de.advance().unwrap();
    }
    assert_eq!(de.best().params(), &[4.0, 1.5, 9.0, 0.0]);
    assert_eq!(de.stats().best, 1.0);
}

#[test]
fn test_selection_rule() {
    assert!(accepts(1.0, 2.0));
    assert!(accepts(2.0, 2.0));
    assert!(!accepts(3.0, 2.0));
    assert!(!accepts(f64::NAN, 2.0));
    assert!(accepts(5.0, f64::NAN));
    assert!(!accepts(f64::NAN, f64::NAN));
}

#[rstest]
#[case(3, 0.5, 0.5)]
#[case(20, 1.5, 0.5)]
#[case(20, 0.5, 1.5)]
fn test_invalid_settings_are_rejected(#[case] popsize: usize, #[case] cr: f64, #[case] pm: f64) {
    let s = DeSettings {
        popsize,
        cr,
        pm,
        ..Default::default()
    };
    let result = DeOptimizer::new(bounds(), valley, s, pool());
    assert!(matches!(result, Err(XrrError::Config(_))));
}

#[test]
fn test_all_fixed_space_keeps_initial_guess() {
    let fixed = vec![Bound::fixed(1.0), Bound::fixed(2.0)];
    let mut de = DeOptimizer::new(
        fixed,
        |x: &[f64]| -> XrrResult<f64> { Ok(x[0] + x[1]) },
        settings(Algorithm::CovDe, BaseVector::Rand, 8),
        pool(),
    )
    .unwrap();
    for _ in 0..5 {
        de.advance().unwrap();
    }
    for ind in de.population() {
        assert_eq!(ind.params(), &[1.0, 2.0]);
        assert_eq!(ind.fitness(), 3.0);
    }
}
