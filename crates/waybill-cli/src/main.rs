//! Waybill - freight allocation across consignee drops
//!
//! A CLI tool that splits a truck's rate across its drops by CBM, keeps
//! entity totals, and syncs with the waybill backend.

mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::Cli;

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let default_directive = format!(
        "waybill_app={0},waybill_infra={0},waybill_cli={0}",
        level
    );
    let filter_directive = std::env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter_directive))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = commands::execute(cli) {
        tracing::debug!(error = %e, "command failed");
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }
}
