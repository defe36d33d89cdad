pub mod commit;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gitops;
pub mod secrets;
pub mod updater;
pub mod values;

pub use commit::{compose, CommitTemplate, DEFAULT_COMMIT_TEMPLATE};
pub use config::{load_config, RunConfig};
pub use credentials::{AuthMethod, Credentials, SshKeySource};
pub use error::{ConfigError, UpdateError};
pub use gitops::{GitCliConnector, GitClient, GitConnector};
pub use updater::{Phase, RepositoryLocks, UpdateRequest, Updater};
pub use values::{ChangeEntry, KeyChange, KeyEngine, YamlEngine, YqEngine};
