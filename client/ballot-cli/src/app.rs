use std::sync::Arc;

use anyhow::{bail, Context};
use ballot_evm_adapter::{EvmChainReader, EvmWallet};
use ballot_interface::services::chain::ChainReader;
use ballot_interface::services::wallet::Wallet;
use ballot_interface::Address;
use ballot_sync::presentation::{Intent, RegisterDialog, Screen, HELP};
use ballot_sync::{
    BallotController, BlockTicker, Connection, SyncConfig, SyncHandle, Synchronizer, TxPhase,
    WalletSession,
};
use ethers_signers::Signer;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::{signing_key, ClientConfig};
use crate::Command;

pub(crate) async fn run(config: ClientConfig, command: Command) -> anyhow::Result<()> {
    let reader = Arc::new(EvmChainReader::new(&config.chain)?);
    match command {
        Command::Status { address } => status(&config, reader, address).await,
        Command::Watch => watch_ballot(&config, reader).await,
        Command::Vote { candidate_id } => {
            submit_once(&config, reader, Intent::Vote(candidate_id)).await
        }
        Command::Register { address } => {
            submit_once(&config, reader, Intent::RegisterVoter(address)).await
        }
    }
}

/// A running synchronizer and the session feeding it.
struct Client {
    session: Arc<WalletSession>,
    sync: SyncHandle,
}

impl Client {
    /// Starts the synchronizer. Without `follow_blocks` the ballot is only re-read on demand.
    fn start<R: ChainReader>(reader: Arc<R>, config: &SyncConfig, follow_blocks: bool) -> Self {
        let (synchronizer, sync) = Synchronizer::new(reader.clone(), config);
        let session = Arc::new(WalletSession::new());

        let (ticker, blocks) = BlockTicker::new(reader, config.block_poll_interval());
        if follow_blocks {
            tokio::spawn(ticker.run());
        }
        tokio::spawn(synchronizer.run(session.subscribe(), blocks));

        Self { session, sync }
    }

    /// Waits for the first cycle after connecting and fails if it could not be applied.
    async fn first_snapshot(&self, contract: Address) -> anyhow::Result<()> {
        let stats = self
            .sync
            .wait_for_stats(|stats| stats.applied + stats.failed > 0)
            .await?;
        if stats.applied == 0 {
            bail!("Failed to read the voting contract at {contract:?}, rerun with RUST_LOG=debug");
        }
        Ok(())
    }
}

async fn connect_wallet(config: &ClientConfig) -> anyhow::Result<Arc<EvmWallet>> {
    let wallet = EvmWallet::connect(&config.chain, signing_key()?)
        .await
        .context("Failed to connect the wallet")?;
    Ok(Arc::new(wallet))
}

async fn status(
    config: &ClientConfig,
    reader: Arc<EvmChainReader>,
    address: Option<Address>,
) -> anyhow::Result<()> {
    let address = match address {
        Some(address) => address,
        None => signing_key()?.address(),
    };

    let client = Client::start(reader, &config.sync, false);
    client.session.connect(Connection {
        address,
        chain_id: config.chain.chain_id,
    });
    client.first_snapshot(config.chain.contract_address).await?;

    let screen = Screen::render(
        &client.sync.view(),
        &TxPhase::Idle,
        &TxPhase::Idle,
        &RegisterDialog::default(),
    );
    print!("{screen}");
    Ok(())
}

async fn submit_once(
    config: &ClientConfig,
    reader: Arc<EvmChainReader>,
    intent: Intent,
) -> anyhow::Result<()> {
    let wallet = connect_wallet(config).await?;
    let client = Client::start(reader, &config.sync, false);
    let mut controller =
        BallotController::new(wallet, client.session.clone(), client.sync.clone());

    controller.handle(Intent::Connect)?;
    client.first_snapshot(config.chain.contract_address).await?;

    let submitter = match intent {
        Intent::Vote(_) => controller.vote_submitter().clone(),
        _ => controller.registration_submitter().clone(),
    };
    let printer = tokio::spawn(print_phases(submitter.subscribe()));
    let applied = client.sync.stats().applied;

    let task = controller
        .handle(intent)?
        .context("No transaction was submitted")?;
    let phase = task.await?;
    printer.abort();

    match phase {
        TxPhase::Confirmed { receipt, .. } => {
            println!("Confirmed in block {:?}", receipt.block_number);
            // The confirmation requested a refresh, show its result.
            client
                .sync
                .wait_for_stats(|stats| stats.applied > applied || stats.failed > 0)
                .await?;
            print!("{}", controller.screen());
            Ok(())
        }
        TxPhase::Failed { failure, .. } => bail!("{failure}"),
        _ => {
            println!("Nothing was sent");
            Ok(())
        }
    }
}

async fn print_phases(mut phases: watch::Receiver<TxPhase>) {
    while phases.changed().await.is_ok() {
        let phase = phases.borrow_and_update().clone();
        match phase {
            TxPhase::Submitting { call } => println!("Submitting {call}"),
            TxPhase::Pending { tx_hash, .. } => println!("Pending {tx_hash:?}"),
            TxPhase::Idle | TxPhase::Confirmed { .. } | TxPhase::Failed { .. } => {}
        }
    }
}

async fn watch_ballot(config: &ClientConfig, reader: Arc<EvmChainReader>) -> anyhow::Result<()> {
    let wallet = connect_wallet(config).await?;
    let client = Client::start(reader, &config.sync, true);
    let mut controller =
        BallotController::new(wallet.clone(), client.session.clone(), client.sync.clone());
    controller.handle(Intent::Connect)?;
    info!(address = ?wallet.address(), "Watching the ballot");

    let (mut view, mut vote, mut registration) = controller.watchers();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_screen = None;
    println!("{HELP}");

    loop {
        let screen = controller.screen();
        if last_screen.as_ref() != Some(&screen) {
            println!("----");
            print!("{screen}");
            last_screen = Some(screen);
        }

        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    bail!("The synchronizer stopped");
                }
            }
            _ = vote.changed() => {}
            _ = registration.changed() => {}
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("Input closed");
                    break;
                };
                if !handle_line(&mut controller, &line) {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Applies one line of input. Returns false once the user wants to leave.
fn handle_line<W: Wallet>(controller: &mut BallotController<W>, line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return true;
    }
    if line == "help" {
        println!("{HELP}");
        return true;
    }

    match line.parse::<Intent>() {
        Ok(Intent::Quit) => return false,
        // Submissions report through the submitters, their tasks are not awaited here.
        Ok(intent) => {
            if let Err(e) = controller.handle(intent) {
                println!("{e}");
            }
        }
        Err(e) => println!("{e}"),
    }
    true
}
