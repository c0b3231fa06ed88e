use std::future::Future;
use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::timeout;
use tokio_graceful_shutdown::SubsystemHandle;
use tokio_util::sync::CancellationToken;

use charmhunt_core::{ArConfig, Snapshot, Spawn};

use crate::cli::Cli;
use crate::feed::Feed;
use crate::session::HuntSession;

// How long the session may stay quiet after the feed ran out before we stop
const DRAIN_QUIET: Duration = Duration::from_millis(100);

/// Write one snapshot as a JSON line
pub fn print_snapshot<W: Write>(out: &mut W, snapshot: &Snapshot) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *out, snapshot)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// How a replay came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayEnd {
    FeedFinished,
    ShutdownRequested,
}

/// Replay the feed named on the command line into a hunt session and print
/// every published snapshot until the feed ends or shutdown is requested.
pub async fn run_hunt(cli: Cli, subsys: SubsystemHandle) -> anyhow::Result<()> {
    let config = cli.ar_config()?;
    let spawn = cli.spawn();
    let feed = Feed::load(&cli.feed)
        .await
        .with_context(|| format!("cannot load feed {}", cli.feed.display()))?;
    log::info!(
        "{}: replaying {} events ({:?}) from {}",
        spawn.id,
        feed.len(),
        feed.duration(),
        cli.feed.display()
    );

    let mut stdout = std::io::stdout();
    let end = replay(feed, spawn, config, &mut stdout, subsys.on_shutdown_requested()).await?;
    if end == ReplayEnd::FeedFinished {
        subsys.request_shutdown();
    }
    Ok(())
}

/// Play `feed` into a session hunting `spawn` and write each snapshot to
/// `out` as a JSON line, starting with the initial one.
pub async fn replay<W, F>(
    feed: Feed,
    spawn: Spawn,
    config: ArConfig,
    out: &mut W,
    shutdown: F,
) -> anyhow::Result<ReplayEnd>
where
    W: Write,
    F: Future<Output = ()>,
{
    let cancel = CancellationToken::new();
    let playback = feed.play(cancel.clone());
    let mut feed_task = playback.task;
    let session =
        HuntSession::new(spawn, config, playback.location, playback.orientation).start();
    let mut events = session.events();
    tokio::pin!(shutdown);

    print_snapshot(out, &session.snapshot())?;

    // The replay stands in for the user tapping "enable compass"
    if !session.request_orientation_permission().await {
        log::warn!("{}: compass not available, continuing without it", session.key());
    }

    let end = loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::debug!("{}: shutdown", session.key());
                break ReplayEnd::ShutdownRequested;
            }
            r = events.recv() => match r {
                Ok(snapshot) => print_snapshot(out, &snapshot)?,
                Err(RecvError::Lagged(n)) => {
                    log::warn!("{}: output fell behind, {} snapshots skipped", session.key(), n);
                }
                Err(RecvError::Closed) => break ReplayEnd::ShutdownRequested,
            },
            r = &mut feed_task => {
                if let Err(e) = r {
                    log::error!("{}: feed playback failed: {}", session.key(), e);
                }
                // Let the session work off whatever the feed queued last
                while let Ok(r) = timeout(DRAIN_QUIET, events.recv()).await {
                    match r {
                        Ok(snapshot) => print_snapshot(out, &snapshot)?,
                        Err(RecvError::Lagged(n)) => {
                            log::warn!("{}: {} snapshots skipped", session.key(), n);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                log::info!("{}: feed finished", session.key());
                break ReplayEnd::FeedFinished;
            }
        }
    };

    cancel.cancel();
    session.shutdown().await;
    Ok(end)
}
