//! Client configuration.
//!
//! The CLI loads `.env` and reads everything from the environment; library
//! users build the plain structs directly.

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use anyhow::{anyhow, Context, Result};

use crate::account::AccountKey;

pub const DEFAULT_GAS_LIMIT: u64 = 4_700_000;
pub const DEFAULT_GAS_PRICE_WEI: u128 = 5_000_000_000;
const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Gas parameters and the confirmation wait bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitterConfig {
    pub gas_limit: u64,
    pub gas_price: u128,
    pub confirmation_timeout: Duration,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        SubmitterConfig {
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_price: DEFAULT_GAS_PRICE_WEI,
            confirmation_timeout: Duration::from_secs(DEFAULT_CONFIRMATION_TIMEOUT_SECS),
        }
    }
}

/// Amount granted by the note-spend approval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoteApproval {
    /// Exactly the value drawn from the public balance
    #[default]
    TransferValue,
    /// A fixed amount, e.g. the whole token balance
    Fixed(U256),
}

impl FromStr for NoteApproval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "value" => Ok(NoteApproval::TransferValue),
            other => U256::from_str(other)
                .map(NoteApproval::Fixed)
                .map_err(|e| format!("expected `value` or an integer amount: {e}")),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllowanceConfig {
    /// Mint this much to the payer first (None: token is not mintable, skip)
    pub mint_amount: Option<U256>,
    /// ERC20 allowance for the note registry (None: the transfer value)
    pub token_allowance: Option<U256>,
    pub note_approval: NoteApproval,
}

/// Deployed contract addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contracts {
    /// ERC20 token backing the confidential asset
    pub token: Address,
    /// Confidential token accepting `confidentialTransfer`
    pub zk_asset: Address,
    /// Note registry: ERC20 spender and `publicApprove` target
    pub note_registry: Address,
    /// Join-split validator proofs are bound to
    pub join_split: Address,
}

pub struct ClientConfig {
    pub rpc_url: String,
    pub private_key: AccountKey,
    pub token: Address,
    pub zk_asset: Address,
    /// Resolved from the confidential token when unset
    pub note_registry: Option<Address>,
    pub join_split: Address,
    pub deploy_block: u64,
    pub poll_interval: Duration,
    pub submitter: SubmitterConfig,
    pub allowance: AllowanceConfig,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        let rpc_url = std::env::var("RPC_URL").context("RPC_URL not set")?;
        let private_key = AccountKey::from_hex(
            &std::env::var("PRIVATE_KEY").context("PRIVATE_KEY not set")?,
        )
        .context("PRIVATE_KEY is invalid")?;

        let submitter = SubmitterConfig {
            gas_limit: env_or("GAS_LIMIT", DEFAULT_GAS_LIMIT)?,
            gas_price: env_or("GAS_PRICE_WEI", DEFAULT_GAS_PRICE_WEI)?,
            confirmation_timeout: Duration::from_secs(env_or(
                "CONFIRMATION_TIMEOUT_SECS",
                DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            )?),
        };
        let allowance = AllowanceConfig {
            mint_amount: env_opt("MINT_AMOUNT")?,
            token_allowance: env_opt("TOKEN_ALLOWANCE")?,
            note_approval: env_or("NOTE_APPROVAL", NoteApproval::TransferValue)?,
        };

        Ok(ClientConfig {
            rpc_url,
            private_key,
            token: env_required("TOKEN_ADDRESS")?,
            zk_asset: env_required("ZK_ASSET_ADDRESS")?,
            note_registry: env_opt("NOTE_REGISTRY_ADDRESS")?,
            join_split: env_required("JOIN_SPLIT_ADDRESS")?,
            deploy_block: env_or("DEPLOY_BLOCK", 0)?,
            poll_interval: Duration::from_millis(env_or(
                "POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )?),
            submitter,
            allowance,
        })
    }
}

fn env_required<T>(name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(name)?.ok_or_else(|| anyhow!("{name} not set"))
}

fn env_opt<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => parse_value(name, &raw).map(Some),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(anyhow!("{name}: {e}")),
    }
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(env_opt(name)?.unwrap_or(default))
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("{name} has an invalid value {raw:?}: {e}"))
}
