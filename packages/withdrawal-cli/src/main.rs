use alloy::network::EthereumWallet;
use alloy::primitives::TxHash;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::{reqwest::Url, Client, Http};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use withdrawal_core::{
    finalizer::FinalizerSettings,
    messenger::OptimismMessenger,
    Config, CredentialStore, Error, FinalizeOutcome, MessageRef, SignerResolver, WithdrawalFinalizer,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ChainArgs {
    /// 配置文件路径（JSON 或 TOML）
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// L1 HTTP URL，缺省 http://localhost:8545
    #[arg(long)]
    l1_url: Option<String>,

    /// L2 HTTP URL，缺省 http://localhost:9545
    #[arg(long)]
    l2_url: Option<String>,
}

#[derive(Args)]
struct MessageArgs {
    /// 要终结的 L2 交易哈希
    #[arg(long)]
    transaction_hash: TxHash,

    /// 扫描起始区块，0 表示自动选择
    #[arg(long, default_value_t = 0)]
    start_block: u64,

    /// 同一交易内有多条消息时的序号
    #[arg(long, default_value_t = 0)]
    message_index: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// 终结一笔提款
    FinalizeWithdrawal {
        #[command(flatten)]
        chains: ChainArgs,

        #[command(flatten)]
        message: MessageArgs,

        /// 用于 L1 签名的钱包名（先 wallet:add）
        #[arg(long)]
        wallet: String,

        /// 用于 L2 签名的钱包名（先 wallet:add）
        #[arg(long)]
        l2_wallet: String,

        /// 状态轮询间隔（秒）
        #[arg(long)]
        poll_interval: Option<u64>,

        /// 等待 READY_FOR_RELAY 的上限（秒），0 表示不限
        #[arg(long)]
        max_wait: Option<u64>,
    },
    /// 查询提款消息状态
    Status {
        #[command(flatten)]
        chains: ChainArgs,

        #[command(flatten)]
        message: MessageArgs,
    },
    /// 验证并解析配置文件
    ValidateConfig {
        /// 配置文件路径
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::FinalizeWithdrawal {
            chains,
            message,
            wallet,
            l2_wallet,
            poll_interval,
            max_wait,
        } => {
            let mut config = load_config(&chains)?;
            if let Some(poll_interval) = poll_interval {
                config.finalizer.poll_interval = poll_interval;
            }
            if let Some(max_wait) = max_wait {
                config.finalizer.max_wait = max_wait;
            }
            config.validate()?;

            finalize_withdrawal(config, message, &wallet, &l2_wallet).await
        }
        Commands::Status { chains, message } => {
            let config = load_config(&chains)?;
            config.validate()?;

            let l1 = ProviderBuilder::new().on_http(parse_url(&config.l1.rpc_url)?);
            let l2 = ProviderBuilder::new().on_http(parse_url(&config.l2.rpc_url)?);
            let messenger =
                OptimismMessenger::connect(l1, l2, &config.contracts, config.finalizer.scan_window).await?;
            let message = message_ref(&messenger, &message).await?;

            let finalizer = WithdrawalFinalizer::new(Arc::new(messenger), config.finalizer.clone().into());
            let status = finalizer.status(&message).await?;
            println!("Status: {}", status);
            Ok(())
        }
        Commands::ValidateConfig { config } => {
            info!("正在验证配置文件: {:?}", config);
            let config = Config::load(config)?;
            println!("配置文件验证成功!");
            println!("配置内容概要:");
            println!("- L1: {} ({})", config.l1.name, config.l1.rpc_url);
            println!("- L2: {} ({})", config.l2.name, config.l2.rpc_url);
            println!("- 钱包目录: {:?}", config.credential_dir()?);
            println!("- 合约:");
            println!("  - OptimismPortal: {}", display_or_known(config.contracts.optimism_portal));
            println!("  - L2OutputOracle: {}", display_or_known(config.contracts.l2_output_oracle));
            println!("- 终结器配置:");
            println!("{}", serde_json::to_string_pretty(&config.finalizer)?);
            Ok(())
        }
    }
}

async fn finalize_withdrawal(
    config: Config,
    message: MessageArgs,
    wallet: &str,
    l2_wallet: &str,
) -> Result<()> {
    let resolver = SignerResolver::interactive(CredentialStore::new(config.credential_dir()?));

    let l1_signer = require_signer(&resolver, wallet)?;
    println!("Using signer: {}", l1_signer.address());
    let l2_signer = require_signer(&resolver, l2_wallet)?;
    println!("Using L2 signer: {}", l2_signer.address());

    let l1 = signer_provider(&config.l1.rpc_url, l1_signer)?;
    let l2 = signer_provider(&config.l2.rpc_url, l2_signer)?;
    let messenger = OptimismMessenger::connect(l1, l2, &config.contracts, config.finalizer.scan_window)
        .await
        .context("无法连接 L1/L2 节点")?;

    println!("l1 chain id = {}", messenger.l1_chain_id());
    println!("l2 chain id = {}", messenger.l2_chain_id());
    println!("OptimismPortal={}", messenger.contracts().optimism_portal);
    println!("L2OutputOracle={}", messenger.contracts().l2_output_oracle);

    let message = message_ref(&messenger, &message).await?;

    // 第一次 Ctrl-C 中止当前流程，第二次直接退出
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupt received, stopping finalization");
        let _ = shutdown_tx.send(true);
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Second interrupt received, exiting");
            std::process::exit(130);
        }
    });

    let settings = FinalizerSettings::from(config.finalizer.clone());
    let finalizer = WithdrawalFinalizer::new(Arc::new(messenger), settings).with_shutdown(shutdown_rx);

    match finalizer.finalize(&message).await? {
        FinalizeOutcome::Finalized { proved, finalized } => {
            if let Some(proved) = proved {
                println!("Prove receipt: {}", proved);
            }
            println!("Finalize receipt: {}", finalized);
            println!("Finalized withdrawal");
        }
        FinalizeOutcome::AlreadyRelayed { proved } => {
            println!("Prove receipt: {}", proved);
            println!("Withdrawal was relayed by someone else");
        }
        FinalizeOutcome::NoAction(status) => {
            println!("Status: {}, nothing to do", status);
        }
    }
    Ok(())
}

fn load_config(chains: &ChainArgs) -> Result<Config> {
    let mut config = match &chains.config {
        Some(path) => {
            info!("使用配置文件: {:?}", path);
            Config::load(path)?
        }
        None => Config::default(),
    };
    if let Some(url) = &chains.l1_url {
        config.l1.rpc_url = url.clone();
    }
    if let Some(url) = &chains.l2_url {
        config.l2.rpc_url = url.clone();
    }
    Ok(config)
}

fn require_signer(resolver: &SignerResolver, name: &str) -> Result<PrivateKeySigner> {
    resolver.resolve(Some(name))?.ok_or_else(|| {
        Error::Config(format!(
            "wallet [{}] not found in {:?}",
            name,
            resolver.store().dir()
        ))
        .into()
    })
}

fn parse_url(url: &str) -> Result<Url> {
    url.parse().with_context(|| format!("无效的 RPC URL: {}", url))
}

fn signer_provider(url: &str, signer: PrivateKeySigner) -> Result<impl Provider<Http<Client>> + 'static> {
    Ok(ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(EthereumWallet::from(signer))
        .on_http(parse_url(url)?))
}

async fn message_ref<P>(messenger: &OptimismMessenger<P>, args: &MessageArgs) -> Result<MessageRef>
where
    P: Provider<Http<Client>> + 'static,
{
    let start_block = messenger.start_block_to_scan(args.start_block).await?;
    Ok(MessageRef::new(args.transaction_hash, args.message_index, start_block))
}

fn display_or_known(address: Option<alloy::primitives::Address>) -> String {
    address
        .map(|a| a.to_string())
        .unwrap_or_else(|| "(按 L2 chain id 使用已知部署)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_finalize_withdrawal() {
        let hash = format!("0x{}", "ab".repeat(32));
        let cli = Cli::try_parse_from([
            "withdrawal-cli",
            "finalize-withdrawal",
            "--transaction-hash",
            hash.as_str(),
            "--wallet",
            "deployer",
            "--l2-wallet",
            "deployer-l2",
            "--message-index",
            "1",
        ])
        .unwrap();

        match cli.command {
            Commands::FinalizeWithdrawal { chains, message, wallet, l2_wallet, max_wait, .. } => {
                assert_eq!(wallet, "deployer");
                assert_eq!(l2_wallet, "deployer-l2");
                assert_eq!(message.message_index, 1);
                assert_eq!(message.start_block, 0);
                assert_eq!(message.transaction_hash, TxHash::repeat_byte(0xab));
                assert!(max_wait.is_none());

                let config = load_config(&chains).unwrap();
                assert_eq!(config.l2.rpc_url, "http://localhost:9545");
            }
            _ => panic!("unexpected subcommand"),
        }
    }

    #[test]
    fn test_wallets_are_required() {
        let hash = format!("0x{}", "ab".repeat(32));
        let result = Cli::try_parse_from([
            "withdrawal-cli",
            "finalize-withdrawal",
            "--transaction-hash",
            hash.as_str(),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_url_overrides() {
        let chains = ChainArgs {
            config: None,
            l1_url: Some("http://l1:8545".to_string()),
            l2_url: Some("http://l2:9545".to_string()),
        };
        let config = load_config(&chains).unwrap();
        assert_eq!(config.l1.rpc_url, "http://l1:8545");
        assert_eq!(config.l2.rpc_url, "http://l2:9545");
    }
}
