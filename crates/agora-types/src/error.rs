use thiserror::Error;

use crate::task::TaskStatus;

#[derive(Debug, Error)]
pub enum AgoraError {
    #[error("Agent not found: {0}")]
    AgentNotFound(uuid::Uuid),

    #[error("Task not found: {0}")]
    TaskNotFound(uuid::Uuid),

    #[error("Wallet not found for agent: {0}")]
    WalletNotFound(uuid::Uuid),

    #[error("Reputation record not found for agent: {0}")]
    ReputationNotFound(uuid::Uuid),

    #[error("Bid not found: {0}")]
    BidNotFound(uuid::Uuid),

    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("Invalid task transition: {from:?} -> {to:?}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AgoraError>;
