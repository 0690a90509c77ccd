use super::evolution_engine::ProgressCallback;

pub struct ConsoleProgressCallback;

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        log::debug!("Generation {} starting...", generation + 1);
    }

    fn on_generation_complete(&mut self, generation: usize, best_fitness: f64, ledger_commits: usize) {
        println!(
            "Generation {} complete. Best fitness: {:.4}, ledger commits: {}",
            generation + 1,
            best_fitness,
            ledger_commits
        );
    }
}

/// Callback for runs whose progress nobody watches, such as tests and
/// short solve-phase refinements.
pub struct NullProgressCallback;

impl ProgressCallback for NullProgressCallback {
    fn on_generation_start(&mut self, _generation: usize) {}

    fn on_generation_complete(&mut self, _generation: usize, _best_fitness: f64, _ledger_commits: usize) {
    }
}
