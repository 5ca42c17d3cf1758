use async_trait::async_trait;
use crate::{
    types::{MessageRef, MessageStatus, TransactionOutcome},
    Error,
};

/// 跨链消息通道，封装状态查询与 prove / finalize 两阶段提交
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CrossChainMessenger: Send + Sync {
    /// 查询消息当前状态
    async fn get_message_status(&self, message: &MessageRef) -> Result<MessageStatus, Error>;

    /// 提交 prove 交易并等待上链确认
    async fn prove_message(&self, message: &MessageRef) -> Result<TransactionOutcome, Error>;

    /// 提交 finalize 交易并等待上链确认
    async fn finalize_message(&self, message: &MessageRef) -> Result<TransactionOutcome, Error>;
}

// OP-Stack (Bedrock) 实现
pub mod optimism;

pub use optimism::{L1Contracts, OptimismMessenger};
