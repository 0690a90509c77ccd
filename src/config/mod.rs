pub mod traits;
pub mod evolution;
pub mod search;
pub mod memory;
pub mod runtime;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use evolution::EvolutionConfig;
pub use search::SearchConfig;
pub use memory::MemoryConfig;
pub use runtime::RuntimeConfig;
