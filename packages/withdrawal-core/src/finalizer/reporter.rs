use log::info;
use crate::types::{MessageRef, MessageStatus};

/// 等待 relay 期间的状态输出
pub trait StatusReporter: Send + Sync {
    fn started(&self, _message: &MessageRef) {}

    fn observed(&self, message: &MessageRef, status: MessageStatus);

    /// 每次等待结束恰好调用一次
    fn stopped(&self, _message: &MessageRef) {}
}

pub struct LogReporter;

impl StatusReporter for LogReporter {
    fn started(&self, message: &MessageRef) {
        info!("Waiting for {} to become READY_FOR_RELAY", message);
    }

    fn observed(&self, _message: &MessageRef, status: MessageStatus) {
        info!("Message status: {}", status);
    }

    fn stopped(&self, message: &MessageRef) {
        info!("Stopped watching {}", message);
    }
}
