use std::collections::HashMap;

use clap::{Parser, Subcommand};
use swap_core::constants::block_time_minutes;
use swap_core::currency::{Currency, CurrencyKind, NetworkDescriptor};
use swap_core::model::{pair_id, Limits, Pair};
use swap_engine::config::Config;
use swap_engine::service::Service;

#[derive(Parser)]
#[command(name = "swap-service")]
#[command(about = "Orchestration core for submarine and reverse atomic swaps")]
struct Cli {
    /// Path to the configuration file (without extension; see the `config` crate).
    #[arg(long, default_value = "config")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load configuration, initialize every component, and print a summary.
    Init,
    /// Print the currently configured pairs.
    GetPairs,
    /// Register a referral and print its generated API credentials.
    AddReferral {
        id: String,
        fee_share: u8,
        #[arg(long)]
        routing_node: Option<String>,
    },
}

fn build_currencies(config: &Config) -> (Vec<Currency>, HashMap<String, f64>, HashMap<String, u64>) {
    let mut currencies = Vec::new();
    let mut percentage_fees = HashMap::new();
    let mut zero_conf_ceilings = HashMap::new();

    for currency in &config.currencies {
        let kind = match currency.symbol.as_str() {
            "ETH" => CurrencyKind::Ether,
            symbol if symbol.ends_with("20") => CurrencyKind::Erc20,
            _ => CurrencyKind::BitcoinLike,
        };
        currencies.push(Currency {
            symbol: currency.symbol.clone(),
            kind,
            network: NetworkDescriptor {
                name: currency.network.clone(),
                chain_id: currency.chain_id,
            },
            native_chain_symbol: None,
        });
        if let Some(ceiling) = currency.zero_conf_ceiling {
            zero_conf_ceilings.insert(currency.symbol.clone(), ceiling);
        }
    }

    for pair in &config.pairs {
        percentage_fees.insert(pair_id(&pair.base, &pair.quote), pair.fee);
    }

    (currencies, percentage_fees, zero_conf_ceilings)
}

fn build_pairs(config: &Config) -> Vec<Pair> {
    config
        .pairs
        .iter()
        .map(|pair| {
            let block_time = block_time_minutes(&pair.base).unwrap_or(10.0);
            let timeout_block_delta = (f64::from(pair.timeout_delta) / block_time).ceil() as u32;
            Pair {
                base: pair.base.clone(),
                quote: pair.quote.clone(),
                rate: pair.rate.unwrap_or(1.0),
                limits: Limits {
                    minimal: pair.minimal.unwrap_or(10_000),
                    maximal: pair.maximal.unwrap_or(4_000_000),
                },
                hash: String::new(),
                percentage_fee: pair.fee,
                timeout_block_delta,
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let (currencies, percentage_fees, zero_conf_ceilings) = build_currencies(&config);
    let pairs = build_pairs(&config);

    let service = Service::new(percentage_fees, zero_conf_ceilings, env!("CARGO_PKG_VERSION").to_string());
    service.init(pairs, currencies).await?;
    service.set_prepay_miner_fee(config.prepayminerfee);
    service.set_allow_reverse_swaps(config.allow_reverse_swaps);

    match cli.command {
        Commands::Init => {
            tracing::info!("service initialized");
            let response = service.get_pairs().await;
            println!("{}", serde_json::to_string_pretty(&response.pairs)?);
        }
        Commands::GetPairs => {
            let response = service.get_pairs().await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::AddReferral { id, fee_share, routing_node } => {
            let referral = service.add_referral(id, fee_share, routing_node).await?;
            println!("{}", serde_json::to_string_pretty(&referral)?);
        }
    }

    Ok(())
}
