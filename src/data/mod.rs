pub mod cache;
pub mod submission;
pub mod tasks;

pub use cache::{CacheStats, ProgramCache};
pub use submission::{read_submission, write_submission, AttemptPair, Submission};
pub use tasks::{task_palette, Task, TaskLoader, TestPair, TrainPair};
