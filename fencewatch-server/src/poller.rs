use anyhow::Context;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_graceful_shutdown::SubsystemHandle;

use fencewatch_core::{DeviceRegistry, EventLog, GeofenceMonitor, Notifier};

use crate::feed::PositionFeed;
use crate::storage::Storage;

/// Periodic detection loop.
///
/// Owns the monitor (and with it the containment state) for the lifetime of
/// the process; every tick fetches positions, reloads the geofence list and
/// runs one detection cycle. Cycles never overlap.
pub struct Poller<F: PositionFeed, N: Notifier> {
    feed: F,
    storage: Storage,
    registry: DeviceRegistry,
    monitor: GeofenceMonitor<N>,
    interval: Duration,
    once: bool,
    roster_loaded: bool,
}

impl<F, N> Poller<F, N>
where
    F: PositionFeed + 'static,
    N: Notifier + Send + 'static,
{
    pub fn new(
        feed: F,
        storage: Storage,
        notifier: N,
        events: EventLog,
        interval: Duration,
        once: bool,
    ) -> Self {
        Poller {
            feed,
            storage,
            registry: DeviceRegistry::new(),
            monitor: GeofenceMonitor::with_event_log(notifier, events),
            interval,
            once,
            roster_loaded: false,
        }
    }

    pub fn monitor(&self) -> &GeofenceMonitor<N> {
        &self.monitor
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Run one poll: fetch, merge, detect, persist.
    ///
    /// Returns the number of events recorded. On a failed fetch the previous
    /// positions stay in place and no detection runs.
    pub async fn poll_once(&mut self, now: DateTime<Utc>) -> anyhow::Result<usize> {
        let samples = self
            .feed
            .fetch()
            .await
            .context("Cannot fetch device positions")?;

        // The first non-empty batch defines the roster, later batches move
        // known devices and append new ones
        if self.roster_loaded {
            self.registry.update_locations(&samples);
            for sample in samples {
                if !sample.id.is_empty() && self.registry.get(&sample.id).is_none() {
                    log::info!("New device {} ({})", sample.display_name(), sample.id);
                    self.registry.upsert(sample);
                }
            }
        } else if samples.is_empty() {
            log::debug!("Feed returned no devices yet");
        } else {
            log::info!("Tracking {} devices", samples.len());
            self.registry.set_devices(samples);
            self.roster_loaded = true;
        }

        let fences = self
            .storage
            .load_geofences()
            .await
            .context("Cannot load geofences")?;

        let count = self
            .monitor
            .process(self.registry.samples(), fences.list(), now);

        if count > 0 {
            for event in self.monitor.recent(count).into_iter().rev() {
                log::info!(
                    "{} ({}) {} '{}' at {:.5},{:.5}",
                    event.device_name,
                    event.device_id,
                    event.kind,
                    event.fence_name,
                    event.lat,
                    event.lng
                );
            }
            self.storage
                .save_events(self.monitor.events())
                .await
                .context("Cannot save event log")?;
        }

        log::debug!(
            "Poll done: {} devices, {} fences, {} events, {} unread",
            self.registry.len(),
            fences.len(),
            count,
            self.monitor.events().unread_count()
        );
        Ok(count)
    }

    pub async fn run(mut self, subsys: SubsystemHandle) -> anyhow::Result<()> {
        log::info!(
            "Polling every {}s, geofences from {}",
            self.interval.as_secs(),
            self.storage.geofences_path().display()
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = subsys.on_shutdown_requested() => {
                    log::debug!("Poller: shutdown");
                    return Ok(());
                },

                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once(Utc::now()).await {
                        log::warn!("{:#}", e);
                    }
                    if self.once {
                        subsys.request_shutdown();
                        return Ok(());
                    }
                }
            }
        }
    }
}
