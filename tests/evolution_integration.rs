use gridmorph::config::AppConfig;
use gridmorph::data::{read_submission, TaskLoader};
use gridmorph::engines::evaluation::{BeamRefiner, Executor};
use gridmorph::engines::generation::{EvolutionEngine, ProgressCallback};
use gridmorph::functions::PrimitiveRegistry;
use gridmorph::runner::{Checkpoint, Orchestrator};
use gridmorph::types::Grid;
use gridmorph::utils::Deadline;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Simple progress callback for testing
struct TestProgressCallback {
    last_generation: usize,
}

impl ProgressCallback for TestProgressCallback {
    fn on_generation_start(&mut self, _generation: usize) {}

    fn on_generation_complete(&mut self, generation: usize, best_fitness: f64, commits: usize) {
        self.last_generation = generation;
        println!(
            "Generation {}: Best Fitness = {:.4}, Ledger Commits = {}",
            generation + 1,
            best_fitness,
            commits
        );
    }
}

/// A horizontal-flip puzzle: one worked example, one test input.
const FLIP_TASK_JSON: &str = r#"{
    "flip": {
        "train": [
            {"input": [[1, 0, 2], [0, 2, 1]], "output": [[2, 0, 1], [1, 2, 0]]}
        ],
        "test": [
            {"input": [[2, 1, 0], [1, 0, 2]]}
        ]
    }
}"#;

fn write_task_file(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("tasks.json");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(FLIP_TASK_JSON.as_bytes()).unwrap();
    path
}

/// Create a minimal configuration for fast testing
fn create_test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.evolution.population_size = 20;
    config.evolution.max_generations = 40;
    config.evolution.max_program_len = 4;
    config.evolution.sample_pairs = 1;
    config.search.beam_width = 4;
    config.search.beam_depth = 2;
    // Enough budget that the safety buffer leaves solving time.
    config.runtime.time_budget_hours = 0.1;
    config
}

fn flipped_test_output() -> Grid {
    Grid::from_rows(vec![vec![0, 1, 2], vec![2, 0, 1]]).unwrap()
}

#[test]
fn test_full_mode_solves_flip_task() {
    println!("\n=== Testing Full Mode on Flip Task ===");

    let dir = tempfile::tempdir().unwrap();
    let input = write_task_file(dir.path());
    let output_dir = dir.path().join("out");

    let mut orchestrator = Orchestrator::new(create_test_config(), 42);
    orchestrator
        .full(&input, &output_dir, None)
        .expect("full run should succeed");

    let submission = read_submission(output_dir.join("submission.json"))
        .expect("submission should be written");
    println!("✓ Submission covers {} tasks", submission.len());

    let attempts = submission.get("flip").expect("flip task should be present");
    assert_eq!(attempts.len(), 1, "one attempt pair per test input");
    assert!(
        attempts[0].matches(&flipped_test_output()),
        "an attempt should produce the flipped grid"
    );
    println!("✓ Flip task solved");

    let checkpoint = Checkpoint::read(output_dir.join("checkpoint.json"))
        .expect("checkpoint should be written");
    let result = checkpoint
        .results
        .get("flip")
        .expect("trained result should be recorded");
    assert!(result.solved, "training should solve the flip task");
    assert!(result.best.is_some());
    println!("✓ Checkpoint records the solved task");
}

#[test]
fn test_train_then_solve_via_checkpoint() {
    println!("\n=== Testing Train/Solve Handoff ===");

    let dir = tempfile::tempdir().unwrap();
    let input = write_task_file(dir.path());
    let output_dir = dir.path().join("out");
    let checkpoint_path = output_dir.join("checkpoint.json");

    let mut trainer = Orchestrator::new(create_test_config(), 42);
    trainer
        .train(&input, &output_dir, None)
        .expect("training should succeed");
    assert!(checkpoint_path.exists(), "training should leave a checkpoint");
    println!("✓ Training checkpoint written");

    // A fresh orchestrator solves purely from the checkpoint.
    let mut solver = Orchestrator::new(create_test_config(), 42);
    solver
        .solve(&input, &output_dir, &checkpoint_path)
        .expect("solving should succeed");

    let submission = read_submission(output_dir.join("submission.json")).unwrap();
    assert!(submission.get("flip").unwrap()[0].matches(&flipped_test_output()));
    println!("✓ Solve mode reproduced the flip");
}

#[test]
fn test_identical_seeds_produce_identical_submissions() {
    println!("\n=== Testing Submission Determinism ===");

    let dir = tempfile::tempdir().unwrap();
    let input = write_task_file(dir.path());

    let out_a = dir.path().join("a");
    let out_b = dir.path().join("b");
    let mut first = Orchestrator::new(create_test_config(), 7);
    let mut second = Orchestrator::new(create_test_config(), 7);
    first.full(&input, &out_a, None).unwrap();
    second.full(&input, &out_b, None).unwrap();

    let a = read_submission(out_a.join("submission.json")).unwrap();
    let b = read_submission(out_b.join("submission.json")).unwrap();
    assert_eq!(a, b, "same seed and tasks should give the same submission");
    println!("✓ Submissions identical across runs");
}

#[test]
fn test_exhausted_budget_falls_back_to_identity() {
    println!("\n=== Testing Identity Fallback ===");

    let dir = tempfile::tempdir().unwrap();
    let input = write_task_file(dir.path());
    let output_dir = dir.path().join("out");

    // The safety buffer swallows the whole budget, so no solving time
    // remains and every attempt is the unmodified test input.
    let mut config = create_test_config();
    config.runtime.time_budget_hours = 0.01;
    let mut orchestrator = Orchestrator::new(config, 42);
    orchestrator.full(&input, &output_dir, None).unwrap();

    let submission = read_submission(output_dir.join("submission.json")).unwrap();
    let attempts = submission.get("flip").unwrap();
    let identity = Grid::from_rows(vec![vec![2, 1, 0], vec![1, 0, 2]]).unwrap();
    assert_eq!(attempts[0].attempt_1, identity);
    assert_eq!(attempts[0].attempt_2, identity);
    println!("✓ Identity fallback engaged");
}

#[test]
fn test_engine_reports_progress_and_holds_population_size() {
    println!("\n=== Testing Engine Progress Reporting ===");

    let tasks = {
        let dir = tempfile::tempdir().unwrap();
        let input = write_task_file(dir.path());
        TaskLoader::load(&input).unwrap()
    };
    let task = tasks.get("flip").unwrap();

    let config = create_test_config();
    let executor = Executor::new(Arc::new(PrimitiveRegistry::new()), None, 20);
    let refiner = BeamRefiner::new(executor, 4, 2);
    let mut engine = EvolutionEngine::new(
        config.evolution.clone(),
        refiner,
        task.train.clone(),
        Vec::new(),
        42,
    );

    let mut callback = TestProgressCallback { last_generation: 0 };
    let summary = engine.run(Deadline::unbounded(), &mut callback);

    println!(
        "✓ Ran {} generations, best fitness {:.4}",
        summary.generations, summary.best_fitness
    );
    assert!(summary.generations >= 1);
    assert_eq!(callback.last_generation + 1, summary.generations);
    assert_eq!(
        engine.population().len(),
        config.evolution.population_size,
        "population size should stay fixed"
    );
    assert!(summary.solved, "a single flip should be found quickly");
}
