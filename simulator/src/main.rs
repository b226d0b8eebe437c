//! Finalize blocks with a simulated committee of validators.
//!
//! Every validator runs its own consensus actor on the tokio runtime. Validators share an
//! in-memory chain and exchange messages over an in-memory hub.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin simulator -- --config simulator/config.yaml
//! ```

use clap::{value_parser, Arg, Command};
use serde::Deserialize;
use shardbft_consensus::{
    blsbft::{
        self,
        mocks::{chain::Chain, resolver::Committees, transport::Hub},
        MiningKeySet, SigningMode,
    },
    ChainAdapter, ChainId,
};
use shardbft_cryptography::hash;
use shardbft_runtime::{tokio, Clock, Metrics, Runner};
use std::{net::SocketAddr, num::NonZeroUsize, str::FromStr, time::Duration};
use tracing::{info, Level};

const NAMESPACE: &[u8] = b"_SHARDBFT_SIMULATOR";
const MAX_BLOCK_SIZE: usize = 1024 * 1024;

/// Configuration for the simulator.
#[derive(Deserialize)]
struct Config {
    validators: u64,

    /// Number of interleaved signing subsets (0 signs with the whole committee).
    #[serde(default)]
    subsets: usize,

    /// Shard to simulate (the beacon chain if unset).
    #[serde(default)]
    shard: Option<u16>,

    timeslot_ms: u64,
    duration_secs: u64,
    log_level: String,
    metrics: Option<SocketAddr>,
}

fn main() {
    // Parse arguments
    let matches = Command::new("simulator")
        .about("finalize blocks with a simulated committee")
        .arg(Arg::new("config").long("config").required(true))
        .arg(
            Arg::new("validators")
                .long("validators")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("duration")
                .long("duration")
                .value_parser(value_parser!(u64)),
        )
        .get_matches();

    // Load config
    let config_file = matches.get_one::<String>("config").unwrap();
    let config_file = std::fs::read_to_string(config_file).expect("Could not read config file");
    let mut config: Config =
        serde_yaml::from_str(&config_file).expect("Could not parse config file");
    if let Some(validators) = matches.get_one::<u64>("validators") {
        config.validators = *validators;
    }
    if let Some(duration) = matches.get_one::<u64>("duration") {
        config.duration_secs = *duration;
    }
    assert!(config.validators > 0, "at least one validator is required");
    let level = Level::from_str(&config.log_level).expect("Invalid log level");

    // Beacon committees always sign as a whole
    let chain_id = config.shard.map_or(ChainId::Beacon, ChainId::Shard);
    let mode = match (chain_id, NonZeroUsize::new(config.subsets)) {
        (ChainId::Shard(_), Some(count)) => SigningMode::Subset(count),
        _ => SigningMode::Whole,
    };
    let chain_key = match chain_id {
        ChainId::Beacon => "beacon".to_string(),
        ChainId::Shard(shard) => format!("shard-{shard}"),
    };
    let timeslot = Duration::from_millis(config.timeslot_ms);

    // Start runtime
    let executor = tokio::Runner::default();
    executor.start(|context| async move {
        tokio::telemetry::init(context.with_label("telemetry"), level, config.metrics);
        info!(
            validators = config.validators,
            ?mode,
            chain = %chain_key,
            timeslot = ?timeslot,
            "starting simulation"
        );

        // Construct the committee
        let keys: Vec<MiningKeySet> = (0..config.validators)
            .map(MiningKeySet::from_seed)
            .collect();
        let committee = keys.iter().map(MiningKeySet::identity).collect();
        let ledger = Chain::new(chain_id);
        let hub = Hub::new(MAX_BLOCK_SIZE);
        let resolver = Committees::new(hash(b"committee"), committee, mode);

        // Start validators
        for (index, key) in keys.into_iter().enumerate() {
            let peer = format!("validator-{index}");
            let (actor, mut mailbox) = blsbft::Actor::new(
                context.with_label(&format!("validator_{index}")),
                blsbft::Config {
                    chain: ledger.handle(),
                    transport: hub.transport(&peer),
                    resolver: resolver.clone(),
                    keys: vec![key],
                    chain_key: chain_key.clone(),
                    namespace: NAMESPACE.to_vec(),
                    mailbox_size: 1024,
                    timeslot,
                    tick: Duration::from_millis(200).min(timeslot),
                    gc_interval: Duration::from_secs(300),
                    idle_timeout: Duration::from_secs(60),
                    revalidate_interval: Duration::from_secs(1),
                    validation_timeout: Duration::from_secs(10),
                    propose_history: 1_000,
                    max_block_size: MAX_BLOCK_SIZE,
                },
            );
            hub.register(&peer, mailbox.clone());
            actor.start();
            mailbox.start().await.expect("Could not start validator");
        }

        // Report progress until the deadline
        let deadline = context.current() + Duration::from_secs(config.duration_secs);
        let mut height = 0;
        while context.current() < deadline {
            context.sleep(timeslot).await;
            let Some(best) = ledger.best_view() else {
                continue;
            };
            if best.height > height {
                height = best.height;
                info!(height, hash = ?best.hash, "finalized block");
            }
        }
        info!(height, messages = hub.sent(), "simulation complete");
    });
}
