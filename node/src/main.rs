use anyhow::Result;
use argh::FromArgs;
use kinglib::params::Network;
use kinglib::registry;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(FromArgs, Debug)]
/// Select a network and verify its consensus parameters.
struct Args {
    #[argh(option, default = "String::from(\"main\")")]
    /// network to run on: main, test, regtest or unittest
    network: String,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args: Args = argh::from_env();
    let network: Network = args.network.parse()?;

    // Selecting constructs every parameter set, so a bad genesis
    // aborts right here.
    registry::select_network(network);
    let params = registry::active_params();

    info!("network: {}", params.network());
    info!("default port: {}", params.default_port());
    info!("magic: {}", hex::encode(params.magic()));
    info!("proof of work limit: {:08x}", params.pow_limit_bits());
    info!("genesis: {}", params.genesis().hash);
    for regime in params.regimes() {
        info!(
            "regime: timespan {}s, spacing {}s, interval {}",
            regime.target_timespan,
            regime.target_spacing,
            regime.interval()
        );
    }
    info!("dns seeds: {}", params.dns_seeds().len());
    info!("checkpoints: {}", params.checkpoints().len());

    Ok(())
}
