use crate::net::api::ApiClient;
use crate::net::Incoming;
use pipegraph_core::JobId;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub fn spawn_poller(
    api: ApiClient,
    job: JobId,
    interval: Duration,
    generation: u64,
    tx: UnboundedSender<Incoming>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(%job, generation, interval_ms = interval.as_millis() as u64, "polling job status");

        loop {
            ticker.tick().await;
            let (msg, terminal) = match api.job_status(&job).await {
                Ok(status) => {
                    let terminal = status.status.is_terminal();
                    (Incoming::status(generation, status), terminal)
                }
                Err(e) => {
                    tracing::warn!(%job, error = %e, "status pull failed");
                    (Incoming::poll_failed(generation, format!("{e:#}")), false)
                }
            };
            if tx.send(msg).is_err() || terminal {
                break;
            }
        }
    })
}

pub fn spawn_ticker(
    interval: Duration,
    generation: u64,
    tx: UnboundedSender<Incoming>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if tx.send(Incoming::tick(generation)).is_err() {
                break;
            }
        }
    })
}
