use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use postbook_core::{Config, Fullname};
use postbook_feed::FeedSource;
use postbook_store::LedgerStore;
use postbook_sync::{pipeline, FlushStatus, SyncEngine, TickOutcome, TickReport};

use crate::error::{io_err, join_err, DaemonError};

/// Counters accumulated over the lifetime of a scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: usize,
    pub appended: usize,
    pub fetch_failures: usize,
    pub flush_failures: usize,
}

impl SchedulerStats {
    fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        match &report.outcome {
            TickOutcome::FetchFailed { .. } => self.fetch_failures += 1,
            TickOutcome::Synced {
                appended, flush, ..
            } => {
                self.appended += appended;
                if matches!(flush, FlushStatus::Failed { .. }) {
                    self.flush_failures += 1;
                }
            }
        }
    }
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(config: Config) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config))
}

/// Run the daemon: load the ledger, sync, then tick every
/// `config.interval` until ctrl-c.
pub async fn run(config: Config) -> Result<(), DaemonError> {
    let (shutdown_tx, _) = broadcast::channel::<()>(4);
    let scheduler_rx = shutdown_tx.subscribe();

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down after the current tick");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Signal(err)),
                    }
                }
            }
        })
    };

    let period = config.interval;
    let engine = tokio::task::spawn_blocking(move || {
        pipeline::open(&config, pipeline::options(&config, false))
    })
    .await
    .map_err(|err| join_err("initialize", err))?;

    let result = match engine {
        Ok(engine) => run_scheduler(engine, period, scheduler_rx)
            .await
            .map(|stats| {
                tracing::info!(
                    ticks = stats.ticks,
                    appended = stats.appended,
                    fetch_failures = stats.fetch_failures,
                    flush_failures = stats.flush_failures,
                    "daemon stopped",
                );
            }),
        Err(err) => Err(err.into()),
    };

    let _ = shutdown_tx.send(());
    let signal_result = signal_handle
        .await
        .map_err(|err| join_err("signal_handler", err))?;
    result?;
    signal_result
}

/// Drive `engine`: one tick immediately, then one per `period`, until a
/// message arrives on `shutdown_rx`.
///
/// The engine moves into the blocking pool for each tick and comes back when
/// the tick ends, so ticks never overlap. A tick that outlasts `period`
/// swallows the ticks it overran.
pub async fn run_scheduler<F, S>(
    engine: SyncEngine<F, S>,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<SchedulerStats, DaemonError>
where
    F: FeedSource + 'static,
    S: LedgerStore + 'static,
{
    tracing::info!(
        source = %engine.source(),
        records = engine.ledger().len(),
        marker = ?engine.marker().map(Fullname::as_str),
        interval_secs = period.as_secs(),
        "Ready!",
    );

    let mut stats = SchedulerStats::default();
    let mut engine = tick(engine, &mut stats).await?;

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await; // consume the first immediate tick

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                engine = tick(engine, &mut stats).await?;
            }
        }
    }

    Ok(stats)
}

async fn tick<F, S>(
    engine: SyncEngine<F, S>,
    stats: &mut SchedulerStats,
) -> Result<SyncEngine<F, S>, DaemonError>
where
    F: FeedSource + 'static,
    S: LedgerStore + 'static,
{
    let (engine, report) = tokio::task::spawn_blocking(move || {
        let mut engine = engine;
        let report = engine.sync_once();
        (engine, report)
    })
    .await
    .map_err(|err| join_err("sync", err))?;

    stats.record(&report);
    tracing::debug!(
        ledger = report.ledger_len,
        appended = report.appended(),
        duration_ms = report.duration.as_millis() as u64,
        "tick complete",
    );
    Ok(engine)
}

/// Install the global `tracing` subscriber (`RUST_LOG`, default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
