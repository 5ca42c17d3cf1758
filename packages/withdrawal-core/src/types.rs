use alloy::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 标识一条跨链提款消息：L2 交易哈希 + 交易内的消息序号 + L1 扫描起始区块
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub transaction_hash: TxHash,
    pub message_index: usize,
    pub start_block: u64,
}

impl MessageRef {
    pub fn new(transaction_hash: TxHash, message_index: usize, start_block: u64) -> Self {
        Self {
            transaction_hash,
            message_index,
            start_block,
        }
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.transaction_hash, self.message_index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Unknown,
    StateRootNotPublished,
    ReadyToProve,
    InChallengePeriod,
    ReadyForRelay,
    Relayed,
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Unknown => "UNKNOWN",
            MessageStatus::StateRootNotPublished => "STATE_ROOT_NOT_PUBLISHED",
            MessageStatus::ReadyToProve => "READY_TO_PROVE",
            MessageStatus::InChallengePeriod => "IN_CHALLENGE_PERIOD",
            MessageStatus::ReadyForRelay => "READY_FOR_RELAY",
            MessageStatus::Relayed => "RELAYED",
            MessageStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已确认的 prove / finalize 交易摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutcome {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    pub from: Address,
    pub success: bool,
}

impl fmt::Display for TransactionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx {} from {}", self.transaction_hash, self.from)?;
        match self.block_number {
            Some(block) => write!(f, " in block {}", block)?,
            None => write!(f, " (pending block)")?,
        }
        write!(f, ", status: {}", if self.success { "success" } else { "reverted" })
    }
}
