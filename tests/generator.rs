
use diffevo::prelude::*;
use nalgebra::DMatrix;
use test_functions::{row_fitness, sphere};

fn shifted_sphere(x: &[f64]) -> f64 {
    x.iter().map(|v| (v - 1.0).powi(2)).sum()
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn mean_cost(x: &DMatrix<f64>, cost: fn(&[f64]) -> f64) -> f64 {
    let costs: Vec<f64> = x
        .row_iter()
        .map(|r| cost(&r.iter().copied().collect::<Vec<_>>()))
        .collect();
    mean(&costs)
}

/// Runs a full reverse chain and returns the final population.
fn run(
    seed: u64,
    n: usize,
    dims: usize,
    steps: usize,
    noise_scale: Option<f64>,
    cost: fn(&[f64]) -> f64,
) -> DMatrix<f64> {
    let mut rng = rng_util::seeded(Some(seed));
    let domain = BoxDomain::symmetric(dims, 5.0).unwrap();
    let schedule = DiffusionSchedule::new(ScheduleKind::Cosine, steps).unwrap();

    let mut x = rng_util::standard_normal_matrix(&mut rng, n, dims);
    for (alpha, alpha_past) in schedule.pairs() {
        let population = Population::new(x.clone(), row_fitness(&x, cost, 1.0)).unwrap();
        let generator = BayesianGenerator::new(population, alpha, alpha_past).unwrap();
        x = generator
            .generate(&x, noise_scale, 0.0, &domain, &mut rng)
            .unwrap()
            .x_next;
    }
    x
}

#[test]
fn population_concentrates_on_high_fitness() {
    let mut rng = rng_util::seeded(Some(11));
    let initial = rng_util::standard_normal_matrix(&mut rng, 256, 2);
    let before = mean_cost(&initial, shifted_sphere);

    let x = run(11, 256, 2, 50, Some(1.0), shifted_sphere);
    let after = mean_cost(&x, shifted_sphere);
    assert!(
        after < 0.5 * before,
        "mean cost should halve: before {before}, after {after}"
    );
}

#[test]
fn zero_noise_chain_is_reproducible() {
    // With zero noise only the initial population consumes randomness.
    let a = run(3, 64, 3, 20, Some(0.0), sphere);
    let b = run(3, 64, 3, 20, Some(0.0), sphere);
    assert_eq!(a, b);
}

#[test]
fn stochastic_chain_is_reproducible_with_same_seed() {
    let a = run(5, 32, 2, 10, None, sphere);
    let b = run(5, 32, 2, 10, None, sphere);
    let c = run(6, 32, 2, 10, None, sphere);
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn every_generation_stays_in_domain() {
    let mut rng = rng_util::seeded(Some(21));
    let domain = BoxDomain::new(vec![-1.0, 0.0], vec![1.0, 0.5]).unwrap();
    let schedule = DiffusionSchedule::new(ScheduleKind::Linear, 15).unwrap();

    let mut x = domain.sample(&mut rng, 40);
    for (alpha, alpha_past) in schedule.pairs() {
        let population = Population::new(x.clone(), row_fitness(&x, sphere, 0.5)).unwrap();
        let generator = BayesianGenerator::new(population, alpha, alpha_past).unwrap();
        let generation = generator.generate(&x, Some(2.0), 0.0, &domain, &mut rng).unwrap();
        assert!(domain.contains(&generation.x_next));
        x = generation.x_next;
    }
}

#[test]
fn recorder_tracks_best_origin_per_generation() {
    let mut rng = rng_util::seeded(Some(8));
    let domain = BoxDomain::symmetric(2, 3.0).unwrap();
    let schedule = DiffusionSchedule::new(ScheduleKind::Cosine, 12).unwrap();
    let mut recorder = RecorderMeter::new(["best_fitness", "mean_fitness"]);
    let mut fitness_meter = AverageMeter::new();

    let mut x = rng_util::standard_normal_matrix(&mut rng, 48, 2);
    for (alpha, alpha_past) in schedule.pairs() {
        let fitness = row_fitness(&x, sphere, 1.0);
        let population = Population::new(x.clone(), fitness.clone()).unwrap();
        let (_, best) = population.best();
        recorder.update([("best_fitness", best), ("mean_fitness", mean(&fitness))]);
        fitness_meter.update(mean(&fitness), 48);

        let generator = BayesianGenerator::builder(population)
            .alphas(alpha, alpha_past)
            .elite_strategy(true)
            .build()
            .unwrap();
        let generation = generator.generate(&x, None, 0.1, &domain, &mut rng).unwrap();
        assert_eq!(generation.elite_count, 4);
        assert_eq!(generation.x0_est.shape(), (48, 2));
        x = generation.x_next;
    }

    assert_eq!(recorder.series("best_fitness").unwrap().len(), 12);
    let best = recorder.max_metric("best_fitness").unwrap();
    assert!(best > 0.0 && best <= 1.0);
    assert_eq!(fitness_meter.count(), 12 * 48);
    assert!(fitness_meter.avg() > 0.0);
}

#[test]
fn pooled_history_feeds_the_next_generation() {
    let mut rng = rng_util::seeded(Some(13));
    let domain = Unbounded;
    let schedule = DiffusionSchedule::new(ScheduleKind::Cosine, 5).unwrap();

    let mut x = rng_util::standard_normal_matrix(&mut rng, 16, 2);
    let mut history: Option<BayesianEstimator> = None;
    for (alpha, alpha_past) in schedule.pairs() {
        let population = Population::new(x.clone(), row_fitness(&x, sphere, 1.0)).unwrap();
        let mut generator = BayesianGenerator::new(population, alpha, alpha_past).unwrap();
        let current = generator.estimator().clone();
        if let Some(previous) = &history {
            generator.estimator_mut().append(previous).unwrap();
        }
        x = generator
            .generate(&x, Some(0.5), 0.0, &domain, &mut rng)
            .unwrap()
            .x_next;
        match &mut history {
            Some(h) => h.append(&current).unwrap(),
            None => history = Some(current),
        }
    }

    assert_eq!(history.unwrap().len(), 5 * 16);
    assert!(x.iter().all(|v| v.is_finite()));
}

#[test]
fn mismatched_query_dimensions_are_rejected() {
    let population = Population::new(DMatrix::zeros(4, 2), vec![1.0; 4]).unwrap();
    let generator = BayesianGenerator::new(population, 0.3, 0.5).unwrap();
    let mut rng = rng_util::seeded(Some(0));
    let result = generator.generate(&DMatrix::zeros(3, 5), None, 0.0, &Unbounded, &mut rng);
    assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
}
