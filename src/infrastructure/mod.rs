pub mod error;
pub mod logging;

pub use error::{GitError, GitResult};
pub use logging::{setup_logging, LogFormat, LogOutput, LoggingConfig};
