use tsp_solvers::exact::BruteForceSolver;
use tsp_solvers::heuristics::aco::{ACOConfig, AntColonyOptimization, DepositStrategy};
use tsp_solvers::heuristics::construction::{ConstructionHeuristic, MultiStartConstruction, NearestNeighborHeuristic};
use tsp_solvers::heuristics::genetic::{GAConfig, GeneticAlgorithm, SelectionType};
use tsp_solvers::solution::validate_tour;
use tsp_solvers::{City, Solution, TspInstance};

fn square() -> TspInstance {
    TspInstance::new(
        "square",
        vec![
            City::new(0.0, 0.0),
            City::new(0.0, 10.0),
            City::new(10.0, 10.0),
            City::new(10.0, 0.0),
        ],
    )
}

fn quick_ga(seed: u64) -> GAConfig {
    GAConfig {
        population_size: 30,
        max_generations: 60,
        seed,
        ..Default::default()
    }
}

fn quick_aco(seed: u64) -> ACOConfig {
    ACOConfig {
        num_ants: 10,
        max_iterations: 40,
        seed,
        ..Default::default()
    }
}

fn heuristic_solutions(instance: &TspInstance, seed: u64) -> Vec<Solution> {
    vec![
        NearestNeighborHeuristic::new().construct(instance).unwrap(),
        MultiStartConstruction::new().construct(instance).unwrap(),
        GeneticAlgorithm::new(instance.clone(), quick_ga(seed)).run().unwrap().solution,
        AntColonyOptimization::new(instance.clone(), quick_aco(seed)).run().unwrap().solution,
    ]
}

#[test]
fn square_is_solved_by_every_algorithm() {
    let instance = square();

    let exact = BruteForceSolver::new().solve(&instance).unwrap();
    assert!((exact.cost - 40.0).abs() < 1e-9);

    for solution in heuristic_solutions(&instance, 1) {
        assert!(
            (solution.cost - 40.0).abs() < 1e-9,
            "{} returned {}",
            solution.algorithm,
            solution.cost
        );
    }
}

#[test]
fn collinear_points() {
    let instance = TspInstance::new(
        "line",
        vec![City::new(0.0, 0.0), City::new(1.0, 0.0), City::new(2.0, 0.0)],
    );

    let exact = BruteForceSolver::new().solve(&instance).unwrap();
    assert!((exact.cost - 4.0).abs() < 1e-9);

    let greedy = NearestNeighborHeuristic::new().construct(&instance).unwrap();
    assert!((greedy.cost - 4.0).abs() < 1e-9);
}

#[test]
fn exact_is_never_beaten() {
    for (n, seed) in [(5, 1), (7, 2), (8, 3), (9, 4)] {
        let instance = TspInstance::random(n, 0.0, 100.0, seed).unwrap();
        let exact = BruteForceSolver::new().solve(&instance).unwrap();

        for solution in heuristic_solutions(&instance, seed) {
            assert!(validate_tour(&solution.tour, n).is_ok());
            assert!(
                exact.cost <= solution.cost + 1e-9,
                "{} beat the optimum on n={}",
                solution.algorithm,
                n
            );
        }
    }
}

#[test]
fn reported_cost_matches_reference_length() {
    let instance = TspInstance::random(15, -50.0, 50.0, 8).unwrap();

    for solution in heuristic_solutions(&instance, 8) {
        assert!(validate_tour(&solution.tour, 15).is_ok());
        let reference = instance.tour_length(&solution.tour);
        assert!((reference - solution.cost).abs() < 1e-6);
    }
}

#[test]
fn stochastic_solvers_are_reproducible() {
    let instance = TspInstance::random(12, 0.0, 100.0, 21).unwrap();

    let ga_config = GAConfig {
        selection_type: SelectionType::RouletteWheel,
        ..quick_ga(5)
    };
    let ga1 = GeneticAlgorithm::new(instance.clone(), ga_config.clone()).run().unwrap();
    let ga2 = GeneticAlgorithm::new(instance.clone(), ga_config).run().unwrap();
    assert_eq!(ga1.solution.tour, ga2.solution.tour);
    assert_eq!(ga1.telemetry.best_costs, ga2.telemetry.best_costs);

    let aco_config = ACOConfig {
        strategy: DepositStrategy::TourCost,
        ..quick_aco(5)
    };
    let aco1 = AntColonyOptimization::new(instance.clone(), aco_config.clone()).run().unwrap();
    let aco2 = AntColonyOptimization::new(instance, aco_config).run().unwrap();
    assert_eq!(aco1.solution.tour, aco2.solution.tour);
    assert_eq!(aco1.best_costs, aco2.best_costs);
}

#[test]
fn instance_file_round_trip_through_solvers() {
    let text = "NAME: tiny\nTYPE: TSP\nDIMENSION: 4\nEDGE_WEIGHT_TYPE: EUC_2D\nNODE_COORD_SECTION\n1 0 0\n2 0 10\n3 10 10\n4 10 0\nEOF\n";
    let instance = TspInstance::from_reader(text.as_bytes()).unwrap();
    assert_eq!(instance.name, "tiny");
    assert_eq!(instance.dimension(), 4);

    let exact = BruteForceSolver::new().solve(&instance).unwrap();
    assert!((exact.cost - 40.0).abs() < 1e-9);
}

#[test]
fn far_apart_cities_still_give_full_tours() {
    let far = TspInstance::new(
        "far",
        vec![
            City::new(0.0, 0.0),
            City::new(1e200, 0.0),
            City::new(0.0, 1e200),
            City::new(-1e200, 5.0),
        ],
    );
    for solution in heuristic_solutions(&far, 3) {
        assert!(validate_tour(&solution.tour, 4).is_ok(), "{}", solution.algorithm);
        assert!(solution.cost.is_finite());
    }

    // Every edge overflows to infinity, so no tour is strictly shorter than another.
    let overflowing = TspInstance::new(
        "overflow",
        vec![
            City::new(f64::MAX, 0.0),
            City::new(-f64::MAX, 0.0),
            City::new(0.0, f64::MAX),
            City::new(0.0, -f64::MAX),
        ],
    );
    let ga = GeneticAlgorithm::new(
        overflowing.clone(),
        GAConfig {
            population_size: 6,
            max_generations: 3,
            ..Default::default()
        },
    )
    .run()
    .unwrap();
    assert!(validate_tour(&ga.solution.tour, 4).is_ok());

    let aco = AntColonyOptimization::new(
        overflowing,
        ACOConfig {
            num_ants: 4,
            max_iterations: 3,
            ..Default::default()
        },
    )
    .run()
    .unwrap();
    assert!(validate_tour(&aco.solution.tour, 4).is_ok());
    assert_eq!(aco.solution.cost, f64::INFINITY);
}
