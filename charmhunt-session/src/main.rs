use std::time::Duration;

use clap::Parser;
use miette::Result;
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};

use charmhunt_session::cli::Cli;
use charmhunt_session::runner::run_hunt;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .format_timestamp_millis()
        .init();

    log::debug!("{:?}", cli);

    Toplevel::new(move |s| async move {
        s.start(SubsystemBuilder::new("hunt", move |subsys| run_hunt(cli, subsys)));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_millis(1000))
    .await
    .map_err(Into::into)
}
