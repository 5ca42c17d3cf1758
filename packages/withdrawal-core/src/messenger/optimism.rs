use alloy::{
    eips::{BlockId, BlockNumberOrTag},
    primitives::{address, keccak256, Address, B256, U256},
    providers::Provider,
    rpc::types::{BlockTransactionsKind, Filter, Log, TransactionReceipt},
    sol,
    sol_types::{SolEvent, SolValue},
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use log::{debug, info};

use crate::config::L1ContractsConfig;
use crate::messenger::CrossChainMessenger;
use crate::types::{MessageRef, MessageStatus, TransactionOutcome};
use crate::Error;

/// L2 上记录提款的预部署合约
pub const L2_TO_L1_MESSAGE_PASSER: Address = address!("4200000000000000000000000000000000000016");

sol! {
    #[sol(rpc)]
    interface IOptimismPortal {
        struct WithdrawalTransaction {
            uint256 nonce;
            address sender;
            address target;
            uint256 value;
            uint256 gasLimit;
            bytes data;
        }

        struct OutputRootProof {
            bytes32 version;
            bytes32 stateRoot;
            bytes32 messagePasserStorageRoot;
            bytes32 latestBlockhash;
        }

        event WithdrawalFinalized(bytes32 indexed withdrawalHash, bool success);

        function provenWithdrawals(bytes32 withdrawalHash) external view returns (bytes32 outputRoot, uint128 timestamp, uint128 l2OutputIndex);
        function finalizedWithdrawals(bytes32 withdrawalHash) external view returns (bool finalized);
        function proveWithdrawalTransaction(WithdrawalTransaction memory _tx, uint256 _l2OutputIndex, OutputRootProof calldata _outputRootProof, bytes[] calldata _withdrawalProof) external;
        function finalizeWithdrawalTransaction(WithdrawalTransaction memory _tx) external;
    }

    #[sol(rpc)]
    interface IL2OutputOracle {
        struct OutputProposal {
            bytes32 outputRoot;
            uint128 timestamp;
            uint128 l2BlockNumber;
        }

        function latestBlockNumber() external view returns (uint256 blockNumber);
        function getL2OutputIndexAfter(uint256 _l2BlockNumber) external view returns (uint256 outputIndex);
        function getL2Output(uint256 _l2OutputIndex) external view returns (OutputProposal memory proposal);
        function FINALIZATION_PERIOD_SECONDS() external view returns (uint256 period);
    }

    interface IL2ToL1MessagePasser {
        event MessagePassed(
            uint256 indexed nonce,
            address indexed sender,
            address indexed target,
            uint256 value,
            uint256 gasLimit,
            bytes data,
            bytes32 withdrawalHash
        );
    }
}

use IL2ToL1MessagePasser::MessagePassed;

/// L1 上完成提款所需的合约
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L1Contracts {
    pub optimism_portal: Address,
    pub l2_output_oracle: Address,
}

impl L1Contracts {
    /// 按 L2 chain id 查询已知部署
    pub fn known(l2_chain_id: u64) -> Option<Self> {
        match l2_chain_id {
            // OP Mainnet
            10 => Some(Self {
                optimism_portal: address!("beb5fc579115071764c7423a4f12edde41f106ed"),
                l2_output_oracle: address!("dfe97868233d1aa22e815a266982f2cf17685a27"),
            }),
            // 本地 devnet
            901 => Some(Self {
                optimism_portal: address!("6900000000000000000000000000000000000001"),
                l2_output_oracle: address!("6900000000000000000000000000000000000000"),
            }),
            _ => None,
        }
    }

    /// 配置优先，其余字段回落到已知部署
    pub fn resolve(l2_chain_id: u64, overrides: &L1ContractsConfig) -> Result<Self, Error> {
        let known = Self::known(l2_chain_id);
        let optimism_portal = overrides
            .optimism_portal
            .or(known.map(|c| c.optimism_portal))
            .ok_or_else(|| Error::Config(format!(
                "No OptimismPortal address known for L2 chain {}, set contracts.optimism_portal",
                l2_chain_id
            )))?;
        let l2_output_oracle = overrides
            .l2_output_oracle
            .or(known.map(|c| c.l2_output_oracle))
            .ok_or_else(|| Error::Config(format!(
                "No L2OutputOracle address known for L2 chain {}, set contracts.l2_output_oracle",
                l2_chain_id
            )))?;
        Ok(Self { optimism_portal, l2_output_oracle })
    }
}

/// OP-Stack (Bedrock) 提款消息通道
pub struct OptimismMessenger<P> {
    l1: P,
    l2: P,
    l1_chain_id: u64,
    l2_chain_id: u64,
    contracts: L1Contracts,
    scan_window: u64,
}

impl<P> OptimismMessenger<P>
where
    P: Provider<Http<Client>> + 'static,
{
    pub fn new(
        l1: P,
        l2: P,
        l1_chain_id: u64,
        l2_chain_id: u64,
        contracts: L1Contracts,
        scan_window: u64,
    ) -> Self {
        Self {
            l1,
            l2,
            l1_chain_id,
            l2_chain_id,
            contracts,
            scan_window,
        }
    }

    /// 读取两条链的 chain id 并确定 L1 合约地址
    pub async fn connect(
        l1: P,
        l2: P,
        overrides: &L1ContractsConfig,
        scan_window: u64,
    ) -> Result<Self, Error> {
        let l1_chain_id = l1
            .get_chain_id()
            .await
            .map_err(|e| Error::Network(format!("Failed to get L1 chain id: {}", e)))?;
        let l2_chain_id = l2
            .get_chain_id()
            .await
            .map_err(|e| Error::Network(format!("Failed to get L2 chain id: {}", e)))?;
        let contracts = L1Contracts::resolve(l2_chain_id, overrides)?;

        info!(
            "Connected messenger: l1 chain {}, l2 chain {}, portal {}, oracle {}",
            l1_chain_id, l2_chain_id, contracts.optimism_portal, contracts.l2_output_oracle
        );
        Ok(Self::new(l1, l2, l1_chain_id, l2_chain_id, contracts, scan_window))
    }

    pub fn l1_chain_id(&self) -> u64 {
        self.l1_chain_id
    }

    pub fn l2_chain_id(&self) -> u64 {
        self.l2_chain_id
    }

    pub fn contracts(&self) -> &L1Contracts {
        &self.contracts
    }

    /// 非 0 的起始区块原样使用；0 表示从最新区块往前 scan_window 个区块
    pub async fn start_block_to_scan(&self, requested: u64) -> Result<u64, Error> {
        if requested != 0 {
            return Ok(requested);
        }
        let latest = self
            .l1
            .get_block_number()
            .await
            .map_err(|e| Error::Network(format!("Failed to get L1 block number: {}", e)))?;
        Ok(latest.saturating_sub(self.scan_window))
    }

    /// 返回 (L2 区块号, 提款事件)；L2 回执尚不存在时返回 None
    async fn withdrawal_of(&self, message: &MessageRef) -> Result<Option<(u64, MessagePassed)>, Error> {
        let receipt = self
            .l2
            .get_transaction_receipt(message.transaction_hash)
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let receipt = match receipt {
            Some(receipt) => receipt,
            None => return Ok(None),
        };
        let block = receipt.block_number.ok_or_else(|| {
            Error::Message(format!("Receipt of {} has no block number", message.transaction_hash))
        })?;
        let withdrawal = select_withdrawal(receipt.inner.logs(), message.message_index)?;
        Ok(Some((block, withdrawal)))
    }

    /// 覆盖该 L2 区块的 output 提议；尚未提交时返回 None
    async fn output_for_block(
        &self,
        l2_block: u64,
    ) -> Result<Option<(U256, IL2OutputOracle::OutputProposal)>, Error> {
        let oracle = IL2OutputOracle::new(self.contracts.l2_output_oracle, &self.l1);
        let latest = oracle
            .latestBlockNumber()
            .call()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .blockNumber;
        if latest < U256::from(l2_block) {
            return Ok(None);
        }

        let output_index = oracle
            .getL2OutputIndexAfter(U256::from(l2_block))
            .call()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .outputIndex;
        let proposal = oracle
            .getL2Output(output_index)
            .call()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .proposal;
        Ok(Some((output_index, proposal)))
    }

    async fn relay_result(&self, withdrawal_hash: B256, start_block: u64) -> Result<MessageStatus, Error> {
        let filter = Filter::new()
            .address(self.contracts.optimism_portal)
            .event_signature(IOptimismPortal::WithdrawalFinalized::SIGNATURE_HASH)
            .topic1(withdrawal_hash)
            .from_block(start_block);
        let logs = self
            .l1
            .get_logs(&filter)
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        for log in logs {
            if let Ok(event) = log.log_decode::<IOptimismPortal::WithdrawalFinalized>() {
                if !event.inner.data.success {
                    return Ok(MessageStatus::Failed);
                }
            }
        }
        Ok(MessageStatus::Relayed)
    }

    async fn latest_l1_timestamp(&self) -> Result<u64, Error> {
        let block = self
            .l1
            .get_block_by_number(BlockNumberOrTag::Latest, BlockTransactionsKind::Hashes)
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .ok_or_else(|| Error::Network("Latest L1 block not available".to_string()))?;
        Ok(block.header.timestamp)
    }

    async fn require_withdrawal(&self, message: &MessageRef) -> Result<(u64, MessagePassed), Error> {
        self.withdrawal_of(message).await?.ok_or_else(|| {
            Error::Message(format!("L2 transaction {} not found", message.transaction_hash))
        })
    }
}

#[async_trait]
impl<P> CrossChainMessenger for OptimismMessenger<P>
where
    P: Provider<Http<Client>> + 'static,
{
    async fn get_message_status(&self, message: &MessageRef) -> Result<MessageStatus, Error> {
        let (l2_block, withdrawal) = match self.withdrawal_of(message).await? {
            Some(found) => found,
            None => return Ok(MessageStatus::Unknown),
        };
        let withdrawal_hash = withdrawal.withdrawalHash;
        let portal = IOptimismPortal::new(self.contracts.optimism_portal, &self.l1);

        let finalized = portal
            .finalizedWithdrawals(withdrawal_hash)
            .call()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .finalized;
        if finalized {
            return self.relay_result(withdrawal_hash, message.start_block).await;
        }

        if self.output_for_block(l2_block).await?.is_none() {
            return Ok(MessageStatus::StateRootNotPublished);
        }

        let proven = portal
            .provenWithdrawals(withdrawal_hash)
            .call()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        let proven_at = u64::try_from(proven.timestamp).unwrap_or(u64::MAX);
        if proven_at == 0 {
            return Ok(MessageStatus::ReadyToProve);
        }

        let oracle = IL2OutputOracle::new(self.contracts.l2_output_oracle, &self.l1);
        let period = oracle
            .FINALIZATION_PERIOD_SECONDS()
            .call()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .period;
        let period = u64::try_from(period).unwrap_or(u64::MAX);
        let now = self.latest_l1_timestamp().await?;

        Ok(classify_proven(proven_at, period, now))
    }

    async fn prove_message(&self, message: &MessageRef) -> Result<TransactionOutcome, Error> {
        let (l2_block, withdrawal) = self.require_withdrawal(message).await?;
        let (output_index, proposal) = self.output_for_block(l2_block).await?.ok_or_else(|| {
            Error::Message(format!("State root for L2 block {} not yet published", l2_block))
        })?;
        let output_block = u64::try_from(proposal.l2BlockNumber)
            .map_err(|e| Error::Message(format!("Invalid output block number: {}", e)))?;

        let slot = withdrawal_storage_slot(withdrawal.withdrawalHash);
        let proof = self
            .l2
            .get_proof(L2_TO_L1_MESSAGE_PASSER, vec![slot])
            .block_id(BlockId::number(output_block))
            .await
            .map_err(|e| Error::Network(format!("Failed to get storage proof: {}", e)))?;
        let storage_root = proof.storage_hash;
        let withdrawal_proof = proof
            .storage_proof
            .into_iter()
            .next()
            .ok_or_else(|| Error::Message("Empty storage proof".to_string()))?
            .proof;

        let block = self
            .l2
            .get_block_by_number(BlockNumberOrTag::Number(output_block), BlockTransactionsKind::Hashes)
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .ok_or_else(|| Error::Network(format!("L2 block {} not found", output_block)))?;

        let output_root_proof = IOptimismPortal::OutputRootProof {
            version: B256::ZERO,
            stateRoot: block.header.state_root,
            messagePasserStorageRoot: storage_root,
            latestBlockhash: block.header.hash,
        };
        debug!(
            "Proving withdrawal {} against output {} (l2 block {})",
            withdrawal.withdrawalHash, output_index, output_block
        );

        let portal = IOptimismPortal::new(self.contracts.optimism_portal, &self.l1);
        let receipt = portal
            .proveWithdrawalTransaction(
                withdrawal_transaction(&withdrawal),
                output_index,
                output_root_proof,
                withdrawal_proof,
            )
            .send()
            .await
            .map_err(|e| Error::Transaction(format!("Failed to submit prove: {}", e)))?
            .get_receipt()
            .await
            .map_err(|e| Error::Transaction(format!("Failed to confirm prove: {}", e)))?;

        outcome_of(receipt)
    }

    async fn finalize_message(&self, message: &MessageRef) -> Result<TransactionOutcome, Error> {
        let (_, withdrawal) = self.require_withdrawal(message).await?;
        let portal = IOptimismPortal::new(self.contracts.optimism_portal, &self.l1);
        let receipt = portal
            .finalizeWithdrawalTransaction(withdrawal_transaction(&withdrawal))
            .send()
            .await
            .map_err(|e| Error::Transaction(format!("Failed to submit finalize: {}", e)))?
            .get_receipt()
            .await
            .map_err(|e| Error::Transaction(format!("Failed to confirm finalize: {}", e)))?;

        outcome_of(receipt)
    }
}

/// 取交易回执中由 message passer 发出的第 index 个 MessagePassed 事件
pub(crate) fn select_withdrawal(logs: &[Log], index: usize) -> Result<MessagePassed, Error> {
    let withdrawals: Vec<MessagePassed> = logs
        .iter()
        .filter(|log| log.address() == L2_TO_L1_MESSAGE_PASSER)
        .filter(|log| log.topic0() == Some(&MessagePassed::SIGNATURE_HASH))
        .filter_map(|log| log.log_decode::<MessagePassed>().ok())
        .map(|log| log.inner.data)
        .collect();

    let count = withdrawals.len();
    withdrawals.into_iter().nth(index).ok_or_else(|| {
        Error::Message(format!(
            "Withdrawal message index {} out of range, transaction has {} withdrawal(s)",
            index, count
        ))
    })
}

/// message passer 中 sentMessages[hash] 的存储槽
pub(crate) fn withdrawal_storage_slot(withdrawal_hash: B256) -> B256 {
    keccak256((withdrawal_hash, U256::ZERO).abi_encode())
}

pub(crate) fn classify_proven(proven_at: u64, finalization_period: u64, now: u64) -> MessageStatus {
    if proven_at == 0 {
        MessageStatus::ReadyToProve
    } else if proven_at.saturating_add(finalization_period) < now {
        MessageStatus::ReadyForRelay
    } else {
        MessageStatus::InChallengePeriod
    }
}

fn withdrawal_transaction(event: &MessagePassed) -> IOptimismPortal::WithdrawalTransaction {
    IOptimismPortal::WithdrawalTransaction {
        nonce: event.nonce,
        sender: event.sender,
        target: event.target,
        value: event.value,
        gasLimit: event.gasLimit,
        data: event.data.clone(),
    }
}

fn outcome_of(receipt: TransactionReceipt) -> Result<TransactionOutcome, Error> {
    let outcome = TransactionOutcome {
        transaction_hash: receipt.transaction_hash,
        block_number: receipt.block_number,
        from: receipt.from,
        success: receipt.status(),
    };
    if !outcome.success {
        return Err(Error::Transaction(format!("Transaction reverted: {}", outcome)));
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, TxHash};
    use alloy::providers::ProviderBuilder;
    use alloy::sol_types::SolCall;
    use mockito::{Matcher, Mock, ServerGuard};
    use serde_json::{json, Value};

    fn message_passed_log(emitter: Address, nonce: u64, hash: B256) -> Log {
        let event = MessagePassed {
            nonce: U256::from(nonce),
            sender: Address::repeat_byte(0x01),
            target: Address::repeat_byte(0x02),
            value: U256::from(1_000u64),
            gasLimit: U256::from(100_000u64),
            data: Bytes::from_static(b"\x12\x34"),
            withdrawalHash: hash,
        };
        Log {
            inner: alloy::primitives::Log {
                address: emitter,
                data: event.encode_log_data(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_select_withdrawal_by_index() {
        let first = B256::repeat_byte(0xaa);
        let second = B256::repeat_byte(0xbb);
        let logs = vec![
            message_passed_log(Address::repeat_byte(0x99), 7, B256::repeat_byte(0xcc)),
            message_passed_log(L2_TO_L1_MESSAGE_PASSER, 1, first),
            message_passed_log(L2_TO_L1_MESSAGE_PASSER, 2, second),
        ];

        let picked = select_withdrawal(&logs, 0).unwrap();
        assert_eq!(picked.withdrawalHash, first);
        assert_eq!(picked.nonce, U256::from(1u64));

        let picked = select_withdrawal(&logs, 1).unwrap();
        assert_eq!(picked.withdrawalHash, second);
        assert_eq!(picked.data, Bytes::from_static(b"\x12\x34"));
    }

    #[test]
    fn test_select_withdrawal_out_of_range() {
        let logs = vec![message_passed_log(Address::repeat_byte(0x99), 1, B256::ZERO)];
        match select_withdrawal(&logs, 0) {
            Err(err) => assert!(err.to_string().contains("has 0 withdrawal")),
            Ok(_) => panic!("log from a foreign emitter must be ignored"),
        }
    }

    #[test]
    fn test_withdrawal_transaction_copies_event_fields() {
        let hash = B256::repeat_byte(0x42);
        let log = message_passed_log(L2_TO_L1_MESSAGE_PASSER, 5, hash);
        let event = select_withdrawal(std::slice::from_ref(&log), 0).unwrap();
        let tx = withdrawal_transaction(&event);
        assert_eq!(tx.nonce, U256::from(5u64));
        assert_eq!(tx.sender, Address::repeat_byte(0x01));
        assert_eq!(tx.target, Address::repeat_byte(0x02));
        assert_eq!(tx.gasLimit, U256::from(100_000u64));
    }

    #[test]
    fn test_storage_slot_layout() {
        let hash = B256::repeat_byte(0x5a);
        let mut preimage = hash.to_vec();
        preimage.extend_from_slice(&[0u8; 32]);
        assert_eq!(withdrawal_storage_slot(hash), keccak256(&preimage));
        assert_ne!(withdrawal_storage_slot(hash), withdrawal_storage_slot(B256::ZERO));
    }

    #[test]
    fn test_classify_proven() {
        assert_eq!(classify_proven(0, 12, 1_000), MessageStatus::ReadyToProve);
        assert_eq!(classify_proven(100, 12, 110), MessageStatus::InChallengePeriod);
        assert_eq!(classify_proven(100, 12, 112), MessageStatus::InChallengePeriod);
        assert_eq!(classify_proven(100, 12, 113), MessageStatus::ReadyForRelay);
        assert_eq!(classify_proven(u64::MAX, u64::MAX, 5), MessageStatus::InChallengePeriod);
    }

    #[test]
    fn test_known_contracts() {
        assert!(L1Contracts::known(10).is_some());
        assert!(L1Contracts::known(901).is_some());
        assert!(L1Contracts::known(12345).is_none());
    }

    #[test]
    fn test_resolve_contracts_prefers_overrides() {
        let portal = Address::repeat_byte(0x77);
        let overrides = L1ContractsConfig {
            optimism_portal: Some(portal),
            l2_output_oracle: None,
        };
        let resolved = L1Contracts::resolve(901, &overrides).unwrap();
        assert_eq!(resolved.optimism_portal, portal);
        assert_eq!(resolved.l2_output_oracle, L1Contracts::known(901).unwrap().l2_output_oracle);

        assert!(matches!(
            L1Contracts::resolve(12345, &overrides),
            Err(Error::Config(_))
        ));
    }

    fn messenger_for(url: &str) -> OptimismMessenger<impl Provider<Http<Client>> + 'static> {
        let url: alloy::transports::http::reqwest::Url = url.parse().unwrap();
        let l1 = ProviderBuilder::new().on_http(url.clone());
        let l2 = ProviderBuilder::new().on_http(url);
        OptimismMessenger::new(l1, l2, 900, 901, L1Contracts::known(901).unwrap(), 5)
    }

    #[tokio::test]
    async fn test_unknown_when_l2_receipt_missing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": "eth_getTransactionReceipt" })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":0,"result":null}"#)
            .create_async()
            .await;

        let messenger = messenger_for(&server.url());
        let message = MessageRef::new(TxHash::repeat_byte(0xab), 0, 1);
        let status = messenger.get_message_status(&message).await;
        tokio_test::assert_ok!(&status);
        assert_eq!(status.unwrap(), MessageStatus::Unknown);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_start_block_to_scan() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "method": "eth_blockNumber" })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":0,"result":"0x10"}"#)
            .expect(1)
            .create_async()
            .await;

        let messenger = messenger_for(&server.url());
        assert_eq!(messenger.start_block_to_scan(42).await.unwrap(), 42);
        assert_eq!(messenger.start_block_to_scan(0).await.unwrap(), 11);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rpc_failure_is_network_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(500)
            .create_async()
            .await;

        let messenger = messenger_for(&server.url());
        let message = MessageRef::new(TxHash::repeat_byte(0x01), 0, 1);
        let err = messenger.get_message_status(&message).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    /// 按请求回填 id 的 JSON-RPC 应答
    async fn rpc_result(server: &mut ServerGuard, body: Matcher, result: Value) -> Mock {
        server
            .mock("POST", "/")
            .match_body(body)
            .with_header("content-type", "application/json")
            .with_body_from_request(move |request| {
                let id = request
                    .body()
                    .ok()
                    .and_then(|body| serde_json::from_slice::<Value>(body).ok())
                    .and_then(|req| req.get("id").cloned())
                    .unwrap_or(json!(0));
                json!({ "jsonrpc": "2.0", "id": id, "result": result })
                    .to_string()
                    .into_bytes()
            })
            .create_async()
            .await
    }

    fn rpc_method(method: &str) -> Matcher {
        Matcher::PartialJson(json!({ "method": method }))
    }

    fn eth_call(selector: [u8; 4]) -> Matcher {
        Matcher::AllOf(vec![
            rpc_method("eth_call"),
            Matcher::Regex(format!("\"0x{}", alloy::hex::encode(selector))),
        ])
    }

    fn encoded(bytes: Vec<u8>) -> Value {
        json!(alloy::hex::encode_prefixed(bytes))
    }

    /// 位于 L2 区块 100 的提款交易回执
    fn withdrawal_receipt(transaction_hash: TxHash, withdrawal_hash: B256) -> Value {
        json!({
            "type": "0x2",
            "status": "0x1",
            "cumulativeGasUsed": "0x5208",
            "logs": [message_passed_log(L2_TO_L1_MESSAGE_PASSER, 1, withdrawal_hash)],
            "logsBloom": format!("0x{}", "00".repeat(256)),
            "transactionHash": transaction_hash,
            "transactionIndex": "0x0",
            "blockHash": B256::repeat_byte(0x11),
            "blockNumber": "0x64",
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0x1",
            "from": Address::repeat_byte(0x01),
            "to": L2_TO_L1_MESSAGE_PASSER,
            "contractAddress": null
        })
    }

    fn withdrawal_finalized_log(withdrawal_hash: B256, success: bool) -> Log {
        let event = IOptimismPortal::WithdrawalFinalized {
            withdrawalHash: withdrawal_hash,
            success,
        };
        Log {
            inner: alloy::primitives::Log {
                address: L1Contracts::known(901).unwrap().optimism_portal,
                data: event.encode_log_data(),
            },
            ..Default::default()
        }
    }

    async fn stub_withdrawal(server: &mut ServerGuard, finalized: bool) -> (MessageRef, B256, Vec<Mock>) {
        let transaction_hash = TxHash::repeat_byte(0xab);
        let withdrawal_hash = B256::repeat_byte(0x5a);
        let mocks = vec![
            rpc_result(
                server,
                rpc_method("eth_getTransactionReceipt"),
                withdrawal_receipt(transaction_hash, withdrawal_hash),
            )
            .await,
            rpc_result(
                server,
                eth_call(IOptimismPortal::finalizedWithdrawalsCall::SELECTOR),
                encoded(finalized.abi_encode()),
            )
            .await,
        ];
        (MessageRef::new(transaction_hash, 0, 1), withdrawal_hash, mocks)
    }

    async fn status_after_l1_finalization(success: bool) -> MessageStatus {
        let mut server = mockito::Server::new_async().await;
        let (message, withdrawal_hash, _stubs) = stub_withdrawal(&mut server, true).await;
        let logs = rpc_result(
            &mut server,
            rpc_method("eth_getLogs"),
            json!([withdrawal_finalized_log(withdrawal_hash, success)]),
        )
        .await;

        let messenger = messenger_for(&server.url());
        let status = messenger.get_message_status(&message).await.unwrap();
        logs.assert_async().await;
        status
    }

    #[tokio::test]
    async fn test_failed_when_finalized_without_success() {
        assert_eq!(status_after_l1_finalization(false).await, MessageStatus::Failed);
    }

    #[tokio::test]
    async fn test_relayed_when_finalized_successfully() {
        assert_eq!(status_after_l1_finalization(true).await, MessageStatus::Relayed);
    }

    #[tokio::test]
    async fn test_state_root_not_published() {
        let mut server = mockito::Server::new_async().await;
        let (message, _, _stubs) = stub_withdrawal(&mut server, false).await;
        let latest = rpc_result(
            &mut server,
            eth_call(IL2OutputOracle::latestBlockNumberCall::SELECTOR),
            encoded(U256::from(50u64).abi_encode()),
        )
        .await;

        let messenger = messenger_for(&server.url());
        let status = messenger.get_message_status(&message).await;
        tokio_test::assert_ok!(&status);
        assert_eq!(status.unwrap(), MessageStatus::StateRootNotPublished);
        latest.assert_async().await;
    }

    #[tokio::test]
    async fn test_ready_to_prove_when_not_yet_proven() {
        let mut server = mockito::Server::new_async().await;
        let (message, _, mut stubs) = stub_withdrawal(&mut server, false).await;
        let proposal = IL2OutputOracle::OutputProposal {
            outputRoot: B256::repeat_byte(0x33),
            timestamp: 1_700_000_000u128,
            l2BlockNumber: 120u128,
        };
        stubs.push(
            rpc_result(
                &mut server,
                eth_call(IL2OutputOracle::latestBlockNumberCall::SELECTOR),
                encoded(U256::from(200u64).abi_encode()),
            )
            .await,
        );
        stubs.push(
            rpc_result(
                &mut server,
                eth_call(IL2OutputOracle::getL2OutputIndexAfterCall::SELECTOR),
                encoded(U256::from(3u64).abi_encode()),
            )
            .await,
        );
        stubs.push(
            rpc_result(
                &mut server,
                eth_call(IL2OutputOracle::getL2OutputCall::SELECTOR),
                encoded(proposal.abi_encode()),
            )
            .await,
        );
        let proven = rpc_result(
            &mut server,
            eth_call(IOptimismPortal::provenWithdrawalsCall::SELECTOR),
            encoded((B256::ZERO, 0u128, 0u128).abi_encode_params()),
        )
        .await;

        let messenger = messenger_for(&server.url());
        let status = messenger.get_message_status(&message).await;
        tokio_test::assert_ok!(&status);
        assert_eq!(status.unwrap(), MessageStatus::ReadyToProve);
        proven.assert_async().await;
        for stub in stubs {
            stub.assert_async().await;
        }
    }
}
