use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::Error;

pub const DEFAULT_L1_RPC_URL: &str = "http://localhost:8545";
pub const DEFAULT_L2_RPC_URL: &str = "http://localhost:9545";

/// 默认状态轮询间隔（秒）
pub const DEFAULT_POLL_INTERVAL: u64 = 3;
/// 默认最长等待：7 天挑战期再加 1 小时
pub const DEFAULT_MAX_WAIT: u64 = 7 * 24 * 3600 + 3600;
pub const DEFAULT_MAX_QUERY_FAILURES: u32 = 5;
/// start block 为 0 时，从最新区块向前扫描的区块数
pub const DEFAULT_SCAN_WINDOW: u64 = 50_000;

/// L1 上的桥接合约地址，未配置时按 L2 chain id 查已知部署
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct L1ContractsConfig {
    pub optimism_portal: Option<Address>,
    pub l2_output_oracle: Option<Address>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChainConfig {
    pub name: String,
    pub rpc_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CredentialConfig {
    /// 钱包目录，缺省为 ~/.iskra-contract/wallet
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FinalizerConfig {
    /// 状态轮询间隔（秒）
    pub poll_interval: u64,
    /// 等待 READY_FOR_RELAY 的上限（秒），0 表示不限
    pub max_wait: u64,
    /// 连续查询失败多少次后放弃
    pub max_query_failures: u32,
    pub scan_window: u64,
}

impl Default for FinalizerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
            max_query_failures: DEFAULT_MAX_QUERY_FAILURES,
            scan_window: DEFAULT_SCAN_WINDOW,
        }
    }
}

impl FinalizerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        match self.max_wait {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub l1: ChainConfig,
    pub l2: ChainConfig,
    #[serde(default)]
    pub contracts: L1ContractsConfig,
    #[serde(default)]
    pub credentials: CredentialConfig,
    #[serde(default)]
    pub finalizer: FinalizerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            l1: ChainConfig {
                name: "l1".to_string(),
                rpc_url: DEFAULT_L1_RPC_URL.to_string(),
            },
            l2: ChainConfig {
                name: "l2".to_string(),
                rpc_url: DEFAULT_L2_RPC_URL.to_string(),
            },
            contracts: L1ContractsConfig::default(),
            credentials: CredentialConfig::default(),
            finalizer: FinalizerConfig::default(),
        }
    }
}

impl Config {
    /// 按扩展名加载 JSON 或 TOML 配置文件
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self, Error> {
        let path = config_path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&config_str)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?,
            _ => serde_json::from_str(&config_str)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?,
        };

        // 验证配置
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        for chain in [&self.l1, &self.l2] {
            if chain.rpc_url.trim().is_empty() {
                return Err(Error::Config(format!("Empty rpc url for chain: {}", chain.name)));
            }
            if !chain.rpc_url.starts_with("http://") && !chain.rpc_url.starts_with("https://") {
                return Err(Error::Config(format!(
                    "Unsupported rpc url for chain {}: {}",
                    chain.name, chain.rpc_url
                )));
            }
        }
        if self.l1.rpc_url == self.l2.rpc_url {
            return Err(Error::Config("L1 and L2 rpc urls must differ".to_string()));
        }

        if self.finalizer.poll_interval == 0 {
            return Err(Error::Config("Finalizer poll interval must be greater than 0".to_string()));
        }
        if self.finalizer.max_query_failures == 0 {
            return Err(Error::Config("Finalizer max query failures must be greater than 0".to_string()));
        }

        Ok(())
    }

    pub fn credential_dir(&self) -> Result<PathBuf, Error> {
        match &self.credentials.dir {
            Some(dir) => Ok(dir.clone()),
            None => crate::credential::default_wallet_dir(),
        }
    }
}
