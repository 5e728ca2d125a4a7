pub mod commit;
pub mod core;
pub mod history;
pub mod models;
pub mod parsers;
pub mod repository;
pub mod runner;
pub mod search;
pub mod state;
pub mod sync;
pub mod tree;

pub use commit::{MutationService, RemoteTarget, DEFAULT_EMPTY_COMMIT_MESSAGE};
pub use self::core::{Bootstrap, GitCore};
pub use history::HistoryService;
pub use models::*;
pub use repository::{DocumentStore, StoreOptions};
pub use runner::{CommandOutput, CommandRunner, GitCommandRunner, GitIdentity};
pub use search::SearchService;
pub use state::{classify_status, RepositoryStateDetector};
pub use sync::{SyncOutcome, SyncPolicy};
pub use tree::TreeService;
