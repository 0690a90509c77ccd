pub mod evolution_engine;
pub mod genome;
pub mod ledger;
pub mod operators;
pub mod progress;
pub mod strategy_bank;

pub use genome::Genome;
pub use evolution_engine::{
    EngineSnapshot, EvolutionEngine, GenerationStats, ProgressCallback, RunSummary,
};
pub use ledger::{KnowledgeCommit, KnowledgeLedger, LedgerSnapshot, TraitReading, TraitTag};
pub use progress::{ConsoleProgressCallback, NullProgressCallback};
pub use strategy_bank::{BankSnapshot, StrategyBank, StrategyEntry};
