//! Confidential transfer client.
//!
//! Subcommands:
//!   pubkey    - Print the account's address and note public key
//!   notes     - List spendable notes and the public token balance
//!   transfer  - Private note-to-note transfer
//!   mint-in   - Convert public token balance into notes
//!   redeem    - Release note value back to the public balance
//!
//! Configuration comes from the environment (or `.env`), see `ClientConfig`.

use alloy::providers::ProviderBuilder;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use confidential_transfer::contracts::{IERC20Mintable, IZkAsset};
use confidential_transfer::{
    Account, ClientConfig, Contracts, EventNoteView, LocalGateway, LocalNotes, NoteLedgerView,
    Orchestrator, Receipt, RpcLedger, Submitter, TransferError,
};
use confidential_transfer_lib::NotePublicKey;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "confidential-transfer")]
#[command(about = "Confidential token transfers: note selection, allowances and proof submission")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the account's address and note public key
    Pubkey,
    /// List spendable notes of the configured account
    Notes,
    /// Send `value` from the account's notes to a recipient note key
    Transfer {
        /// Recipient note public key (hex, 64 chars)
        #[arg(long)]
        to: String,
        #[arg(long)]
        value: u64,
    },
    /// Create one note per value from the public token balance
    MintIn {
        /// Comma-separated note values, e.g. 100,100,100,100
        #[arg(long, value_delimiter = ',', required = true)]
        values: Vec<u64>,
    },
    /// Release `value` from the account's notes to its public balance
    Redeem {
        #[arg(long)]
        value: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;
    let account =
        Account::from_key(config.private_key.clone()).context("PRIVATE_KEY is not usable")?;

    if let Commands::Pubkey = cli.command {
        println!("Address:         {}", account.address());
        println!("Note public key: 0x{}", hex::encode(account.public_key().as_bytes()));
        return Ok(());
    }

    let provider = ProviderBuilder::new()
        .connect_http(config.rpc_url.parse().context("RPC_URL is not a URL")?);
    let note_registry = match config.note_registry {
        Some(address) => address,
        None => IZkAsset::new(config.zk_asset, &provider)
            .noteRegistry()
            .call()
            .await
            .context("could not read the note registry from ZK_ASSET_ADDRESS")?,
    };
    let contracts = Contracts {
        token: config.token,
        zk_asset: config.zk_asset,
        note_registry,
        join_split: config.join_split,
    };

    println!("Account:         {}", account.address());
    println!("Token:           {}", contracts.token);
    println!("ZkAsset:         {}", contracts.zk_asset);
    println!("Note registry:   {}\n", contracts.note_registry);

    let orchestrator = Orchestrator::new(
        Submitter::new(RpcLedger::new(&provider, config.poll_interval), config.submitter.clone()),
        LocalGateway,
        EventNoteView::new(&provider, contracts.zk_asset, config.deploy_block, LocalNotes),
        LocalNotes,
        contracts,
        config.allowance.clone(),
    );

    match cli.command {
        Commands::Pubkey => {}
        Commands::Notes => {
            let notes = orchestrator.view().spendable_notes(&account).await?;
            let balance = IERC20Mintable::new(contracts.token, &provider)
                .balanceOf(account.address())
                .call()
                .await?;
            println!("Public balance:  {balance}");
            println!("Spendable notes: {}", notes.len());
            for note in &notes {
                println!("  0x{}  {}", hex::encode(note.note_hash), note.value);
            }
        }
        Commands::Transfer { to, value } => {
            let recipient = NotePublicKey(decode_hex_32(&to)?);
            println!("[1] Sending {value} to 0x{}", hex::encode(recipient.as_bytes()));
            let result = orchestrator.confidential_transfer(&account, &recipient, value).await;
            report(result)?;
        }
        Commands::MintIn { values } => {
            println!("[1] Minting notes {values:?}");
            report(orchestrator.mint_in(&account, &values).await)?;
        }
        Commands::Redeem { value } => {
            println!("[1] Redeeming {value}");
            report(orchestrator.redeem(&account, value).await)?;
        }
    }

    Ok(())
}

fn report(result: Result<Receipt, TransferError>) -> Result<()> {
    match result {
        Ok(receipt) => {
            println!("[2] Confirmed:   {}", receipt.tx_hash);
            if let Some(block) = receipt.block_number {
                println!("    Block:       {block}");
            }
            println!("    Gas used:    {}", receipt.gas_used);
            Ok(())
        }
        Err(err) => {
            if let Some(state) = err.failed_state() {
                println!("    Stopped at:  {state} (approvals already granted stay in place)");
            }
            bail!("{:?}: {err}", err.kind())
        }
    }
}

fn decode_hex_32(s: &str) -> Result<[u8; 32]> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).context("invalid hex")?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected 32 bytes, got {len}"))
}
