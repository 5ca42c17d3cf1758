//! 本地加密钱包（Ethereum JSON keystore）的加载与解密

use alloy::signers::local::PrivateKeySigner;
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;
use crate::Error;

const HOME_DIR_NAME: &str = ".iskra-contract";
const WALLET_DIR_NAME: &str = "wallet";

/// 默认钱包目录：~/.iskra-contract/wallet
pub fn default_wallet_dir() -> Result<PathBuf, Error> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))?;
    Ok(home.join(HOME_DIR_NAME).join(WALLET_DIR_NAME))
}

/// 口令来源
pub trait PassphraseSource: Send + Sync {
    fn passphrase(&self, wallet: &str) -> Result<Zeroizing<String>, Error>;
}

/// 交互式输入口令，回显被屏蔽
pub struct PromptPassphrase;

impl PassphraseSource for PromptPassphrase {
    fn passphrase(&self, wallet: &str) -> Result<Zeroizing<String>, Error> {
        rpassword::prompt_password(format!("Keyfile Password for {}:", wallet))
            .map(Zeroizing::new)
            .map_err(|e| Error::Credential(format!("Failed to read password: {}", e)))
    }
}

/// 固定口令，用于非交互环境
pub struct StaticPassphrase(Zeroizing<String>);

impl StaticPassphrase {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self(Zeroizing::new(passphrase.into()))
    }
}

impl PassphraseSource for StaticPassphrase {
    fn passphrase(&self, _wallet: &str) -> Result<Zeroizing<String>, Error> {
        Ok(self.0.clone())
    }
}

/// 按名称存放的加密钱包目录
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

pub struct SignerResolver {
    store: CredentialStore,
    passphrase: Box<dyn PassphraseSource>,
}

impl SignerResolver {
    pub fn new(store: CredentialStore, passphrase: Box<dyn PassphraseSource>) -> Self {
        Self { store, passphrase }
    }

    pub fn interactive(store: CredentialStore) -> Self {
        Self::new(store, Box::new(PromptPassphrase))
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// 解析签名者。
    ///
    /// 未给出名称或钱包文件不存在时返回 `Ok(None)`；口令错误或文件损坏返回
    /// `Error::Credential`。每次调用都会重新读取并解密，不做缓存。
    pub fn resolve(&self, name: Option<&str>) -> Result<Option<PrivateKeySigner>, Error> {
        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => return Ok(None),
        };

        if name.contains(std::path::is_separator) || name == ".." {
            return Err(Error::Config(format!("Invalid wallet name: {}", name)));
        }

        let path = self.store.path_of(name);
        if !path.is_file() {
            error!("wallet [{}] is not exist", name);
            return Ok(None);
        }

        let password = self.passphrase.passphrase(name)?;
        debug!("Decrypting wallet [{}] from {:?}", name, path);
        let signer = PrivateKeySigner::decrypt_keystore(&path, password.as_bytes())
            .map_err(|e| Error::Credential(format!("Failed to decrypt wallet [{}]: {}", name, e)))?;

        info!("Loaded wallet [{}]: {}", name, signer.address());
        Ok(Some(signer))
    }
}
