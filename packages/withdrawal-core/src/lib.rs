pub mod config;
pub mod types;
pub mod credential;
pub mod messenger;
pub mod finalizer;

pub use config::Config;
pub use types::{MessageRef, MessageStatus, TransactionOutcome};
pub use credential::{CredentialStore, SignerResolver};
pub use messenger::CrossChainMessenger;
pub use finalizer::{FinalizeOutcome, WithdrawalFinalizer};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Message error: {0}")]
    Message(String),

    #[error("Timed out after {0:?} waiting for message status")]
    Timeout(std::time::Duration),

    #[error("Operation cancelled")]
    Cancelled,
}
