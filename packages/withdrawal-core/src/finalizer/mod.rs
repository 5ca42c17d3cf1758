//! 提款终结流程：查询状态 → prove → 等待挑战期结束 → finalize

use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};

use crate::{
    config::FinalizerConfig,
    messenger::CrossChainMessenger,
    types::{MessageRef, MessageStatus, TransactionOutcome},
    Error,
};

mod reporter;

pub use reporter::{LogReporter, StatusReporter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizerSettings {
    pub poll_interval: Duration,
    /// None 表示无限等待
    pub max_wait: Option<Duration>,
    pub max_query_failures: u32,
}

impl Default for FinalizerSettings {
    fn default() -> Self {
        FinalizerConfig::default().into()
    }
}

impl From<FinalizerConfig> for FinalizerSettings {
    fn from(config: FinalizerConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            max_wait: config.max_wait(),
            max_query_failures: config.max_query_failures,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// `proved` 仅在本次执行了 prove 时存在
    Finalized {
        proved: Option<TransactionOutcome>,
        finalized: TransactionOutcome,
    },
    /// 状态不可操作，未提交任何交易
    NoAction(MessageStatus),
    /// 等待期间消息已被他人 relay
    AlreadyRelayed { proved: TransactionOutcome },
}

pub struct WithdrawalFinalizer {
    messenger: Arc<dyn CrossChainMessenger>,
    settings: FinalizerSettings,
    reporter: Arc<dyn StatusReporter>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl WithdrawalFinalizer {
    pub fn new(messenger: Arc<dyn CrossChainMessenger>, settings: FinalizerSettings) -> Self {
        Self {
            messenger,
            settings,
            reporter: Arc::new(LogReporter),
            shutdown: None,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// 收到 `true` 时中止当前流程（查询、prove、等待或 finalize）
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub async fn status(&self, message: &MessageRef) -> Result<MessageStatus, Error> {
        self.messenger.get_message_status(message).await
    }

    /// 执行终结流程。关闭信号在任何阶段都会中止流程并返回 `Error::Cancelled`，
    /// 已提交的交易不会被撤回。
    pub async fn finalize(&self, message: &MessageRef) -> Result<FinalizeOutcome, Error> {
        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            biased;
            _ = shutdown_requested(shutdown.as_mut()) => {
                warn!("Finalization of {} interrupted: shutdown requested", message);
                Err(Error::Cancelled)
            }
            outcome = self.run(message) => outcome,
        }
    }

    async fn run(&self, message: &MessageRef) -> Result<FinalizeOutcome, Error> {
        info!("Fetching message status for {}", message);
        let status = self.messenger.get_message_status(message).await?;
        info!("Status: {}", status);

        match status {
            MessageStatus::ReadyToProve => {
                let proved = self.messenger.prove_message(message).await?;
                info!("Prove receipt: {}", proved);

                match self.wait_for_relay(message).await? {
                    MessageStatus::Relayed => {
                        warn!("Message {} was relayed while waiting, nothing to finalize", message);
                        Ok(FinalizeOutcome::AlreadyRelayed { proved })
                    }
                    _ => {
                        let finalized = self.submit_finalize(message).await?;
                        Ok(FinalizeOutcome::Finalized {
                            proved: Some(proved),
                            finalized,
                        })
                    }
                }
            }
            MessageStatus::ReadyForRelay => {
                let finalized = self.submit_finalize(message).await?;
                Ok(FinalizeOutcome::Finalized {
                    proved: None,
                    finalized,
                })
            }
            other => {
                info!("Message {} is {}, no action taken", message, other);
                Ok(FinalizeOutcome::NoAction(other))
            }
        }
    }

    async fn submit_finalize(&self, message: &MessageRef) -> Result<TransactionOutcome, Error> {
        let finalized = self.messenger.finalize_message(message).await?;
        info!("Finalize receipt: {}", finalized);
        info!("Finalized withdrawal {}", message);
        Ok(finalized)
    }

    /// 轮询状态直到 READY_FOR_RELAY（或 RELAYED）。
    ///
    /// 每次观测都交给 reporter；无论以何种方式退出，reporter 的 `stopped`
    /// 恰好调用一次。
    pub async fn wait_for_relay(&self, message: &MessageRef) -> Result<MessageStatus, Error> {
        let _watch = WatchGuard::start(self.reporter.as_ref(), message);

        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = self.settings.max_wait.map(|wait| Instant::now() + wait);
        let mut shutdown = self.shutdown.clone();
        let mut consecutive_failures: u32 = 0;

        loop {
            let observed = tokio::select! {
                biased;
                _ = shutdown_requested(shutdown.as_mut()) => {
                    warn!("Stopped waiting for {}: shutdown requested", message);
                    return Err(Error::Cancelled);
                }
                _ = deadline_reached(deadline) => {
                    let waited = self.settings.max_wait.unwrap_or_default();
                    warn!("Stopped waiting for {} after {:?}", message, waited);
                    return Err(Error::Timeout(waited));
                }
                observed = async {
                    ticker.tick().await;
                    self.messenger.get_message_status(message).await
                } => observed,
            };

            match observed {
                Ok(status) => {
                    consecutive_failures = 0;
                    self.reporter.observed(message, status);
                    match status {
                        MessageStatus::ReadyForRelay | MessageStatus::Relayed => return Ok(status),
                        MessageStatus::Failed => {
                            return Err(Error::Message(format!("Message {} failed on L1", message)));
                        }
                        _ => {}
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    if consecutive_failures >= self.settings.max_query_failures {
                        return Err(e);
                    }
                    warn!(
                        "Status query failed ({}/{}): {}",
                        consecutive_failures, self.settings.max_query_failures, e
                    );
                }
            }
        }
    }
}

/// 等待期间持有；drop 时通知 reporter 停止
struct WatchGuard<'a> {
    reporter: &'a dyn StatusReporter,
    message: &'a MessageRef,
}

impl<'a> WatchGuard<'a> {
    fn start(reporter: &'a dyn StatusReporter, message: &'a MessageRef) -> Self {
        reporter.started(message);
        Self { reporter, message }
    }
}

impl Drop for WatchGuard<'_> {
    fn drop(&mut self) {
        self.reporter.stopped(self.message);
    }
}

async fn shutdown_requested(shutdown: Option<&mut watch::Receiver<bool>>) {
    let shutdown = match shutdown {
        Some(shutdown) => shutdown,
        None => return std::future::pending().await,
    };
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        // 发送端已释放，不会再有关闭信号
        if shutdown.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
