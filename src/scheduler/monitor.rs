use super::summary::SchedulerSummary;
use super::{Scheduler, SchedulerStatus};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    /// How often the idle check runs.
    pub check_interval: Duration,
    pub summary_interval: Duration,
    /// Consecutive idle readings required before the scheduler is stopped.
    pub idle_confirmations: u32,
    /// Log summaries in their detailed form.
    pub detail: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_millis(10),
            summary_interval: Duration::from_secs(1),
            idle_confirmations: 3,
            detail: false,
        }
    }
}

/// Watches a running scheduler: logs the errors it reports, publishes
/// summaries when they change and stops it once it stays idle.
pub struct Monitor {
    handles: Vec<JoinHandle<()>>,
    summaries: watch::Receiver<Option<SchedulerSummary>>,
}

impl Monitor {
    pub fn spawn(scheduler: Scheduler, config: MonitorConfig) -> Self {
        let (summary_tx, summaries) = watch::channel(None);
        let handles = vec![
            tokio::spawn(report_errors(scheduler.clone())),
            tokio::spawn(record_summary(scheduler.clone(), config, summary_tx)),
            tokio::spawn(check_status(scheduler, config)),
        ];
        Self { handles, summaries }
    }

    /// Receiver for the latest published summary.
    pub fn summaries(&self) -> watch::Receiver<Option<SchedulerSummary>> {
        self.summaries.clone()
    }

    /// Waits for all monitoring tasks to end, which happens once the
    /// scheduler is stopped.
    pub async fn wait(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                log::error!("Monitor task ended abnormally: {}", e);
            }
        }
    }
}

/// Returns false if the scheduler never reached the running state.
async fn wait_for_start(scheduler: &Scheduler) -> bool {
    loop {
        match scheduler.status() {
            SchedulerStatus::Running => return true,
            SchedulerStatus::Closed | SchedulerStatus::FatalError => return false,
            _ => tokio::time::sleep(Duration::from_millis(1)).await,
        }
    }
}

async fn check_status(scheduler: Scheduler, config: MonitorConfig) {
    if !wait_for_start(&scheduler).await {
        return;
    }
    let mut idle_count = 0;
    loop {
        if scheduler.idle() {
            idle_count += 1;
            if idle_count >= config.idle_confirmations {
                log::info!(
                    "The scheduler has been idle for {} checks. Stopping it...",
                    idle_count
                );
                match scheduler.stop() {
                    Ok(()) => log::info!("Scheduler has been stopped."),
                    Err(e) => log::warn!("Couldn't stop scheduler: {}", e),
                }
                break;
            }
        } else {
            idle_count = 0;
        }
        tokio::select! {
            _ = scheduler.stopped() => break,
            _ = tokio::time::sleep(config.check_interval) => {}
        }
    }
    log::debug!("Status checking finished.");
}

async fn report_errors(scheduler: Scheduler) {
    if !wait_for_start(&scheduler).await {
        return;
    }
    let Some(errors) = scheduler.error_chan() else {
        log::warn!("The error channel is unavailable.");
        return;
    };
    loop {
        tokio::select! {
            received = errors.recv() => match received {
                Ok(e) => log::error!("Received error from error channel: {}", e),
                Err(_) => break,
            },
            _ = scheduler.stopped() => break,
        }
    }
    log::debug!("Error reporting finished.");
}

async fn record_summary(
    scheduler: Scheduler,
    config: MonitorConfig,
    publish: watch::Sender<Option<SchedulerSummary>>,
) {
    if !wait_for_start(&scheduler).await {
        publish.send_replace(Some(scheduler.summary()));
        return;
    }
    let mut previous: Option<SchedulerSummary> = None;
    loop {
        let current = scheduler.summary();
        if previous.as_ref().is_none_or(|p| !p.same(&current)) {
            let text = if config.detail {
                current.detail()
            } else {
                current.to_string()
            };
            log::info!("Monitor summary:\n{}", text);
            publish.send_replace(Some(current.clone()));
            previous = Some(current);
        }
        tokio::select! {
            _ = scheduler.stopped() => break,
            _ = tokio::time::sleep(config.summary_interval) => {}
        }
    }
    publish.send_replace(Some(scheduler.summary()));
    log::debug!("Summary recording finished.");
}
