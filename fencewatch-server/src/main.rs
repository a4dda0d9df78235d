use clap::Parser;
use miette::IntoDiagnostic;
use std::time::Duration;
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};

use fencewatch_server::feed::FileFeed;
use fencewatch_server::notifier;
use fencewatch_server::poller::Poller;
use fencewatch_server::storage::Storage;
use fencewatch_server::Cli;

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .parse_default_env()
        .init();

    log::debug!("Starting with args {:?}", cli);

    let storage = Storage::new(cli.data_dir.as_deref(), cli.geofences.as_deref()).into_diagnostic()?;
    let events = storage
        .load_events(cli.event_capacity)
        .await
        .into_diagnostic()?;
    if !events.is_empty() {
        log::info!(
            "Restored {} events ({} unread) from {}",
            events.len(),
            events.unread_count(),
            storage.events_path().display()
        );
    }

    let (notifier, dispatcher) = notifier::channel(cli.notify_command.clone());
    let poller = Poller::new(
        FileFeed::new(&cli.feed),
        storage,
        notifier,
        events,
        cli.poll_interval(),
        cli.once,
    );

    Toplevel::new(move |s| async move {
        s.start(SubsystemBuilder::new("notifier", |h| dispatcher.run(h)));
        s.start(SubsystemBuilder::new("poller", |h| poller.run(h)));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_millis(1000))
    .await
    .map_err(Into::into)
}
