//! Fire-and-forget notification dispatch.
//!
//! The poller hands notifications to a [`ChannelNotifier`], which only pushes
//! them onto an unbounded channel. The [`NotificationDispatcher`] subsystem
//! drains the channel, logs every notification and optionally runs an external
//! command for it. A slow or failing command never holds up detection.

use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_graceful_shutdown::SubsystemHandle;

use fencewatch_core::{Notification, Notifier};

use crate::ServerError;

/// Create a connected notifier/dispatcher pair
pub fn channel(command: Option<String>) -> (ChannelNotifier, NotificationDispatcher) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ChannelNotifier { tx },
        NotificationDispatcher { rx, command },
    )
}

#[derive(Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier for ChannelNotifier {
    fn notify(&self, title: &str, body: &str) {
        let notification = Notification {
            title: title.to_string(),
            body: body.to_string(),
        };
        if self.tx.send(notification).is_err() {
            log::debug!("Notification dropped, dispatcher is gone: {}", title);
        }
    }
}

pub struct NotificationDispatcher {
    rx: mpsc::UnboundedReceiver<Notification>,
    command: Option<String>,
}

impl NotificationDispatcher {
    /// Whether an external notification command is (still) in use
    pub fn has_command(&self) -> bool {
        self.command.is_some()
    }

    /// Deliver one notification.
    ///
    /// The command is spawned and not waited for in line. If it cannot be
    /// started at all it is dropped for the rest of the run and delivery
    /// falls back to logging only.
    pub fn dispatch(&mut self, notification: &Notification) {
        log::info!("{}: {}", notification.title, notification.body);

        let Some(program) = &self.command else {
            return;
        };

        let spawned = Command::new(program)
            .arg(&notification.title)
            .arg(&notification.body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(false)
            .spawn();

        match spawned {
            Ok(mut child) => {
                let program = program.clone();
                tokio::spawn(async move {
                    match child.wait().await {
                        Ok(status) if !status.success() => {
                            log::debug!("{}: exited with {}", program, status);
                        }
                        Err(e) => log::debug!("{}: {}", program, e),
                        _ => {}
                    }
                });
            }
            Err(e) => {
                log::warn!(
                    "Cannot run notification command '{}', notifications are logged only: {}",
                    program,
                    e
                );
                self.command = None;
            }
        }
    }

    pub async fn run(mut self, subsys: SubsystemHandle) -> Result<(), ServerError> {
        log::debug!(
            "Notification dispatcher started ({})",
            self.command.as_deref().unwrap_or("log only")
        );

        loop {
            tokio::select! {
                _ = subsys.on_shutdown_requested() => {
                    // Deliver whatever was queued before the shutdown
                    while let Ok(notification) = self.rx.try_recv() {
                        self.dispatch(&notification);
                    }
                    log::debug!("Notification dispatcher: shutdown");
                    return Ok(());
                },

                r = self.rx.recv() => {
                    match r {
                        Some(notification) => self.dispatch(&notification),
                        None => {
                            log::debug!("Notification channel closed");
                            subsys.on_shutdown_requested().await;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notifier_queues_without_blocking() {
        let (notifier, mut dispatcher) = channel(None);
        notifier.notify("Geofence Entered: Depot", "Truck entered the geofence zone.");
        notifier.notify("Geofence Exited: Depot", "Truck left the geofence zone.");

        let first = dispatcher.rx.recv().await.unwrap();
        assert_eq!(first.title, "Geofence Entered: Depot");
        let second = dispatcher.rx.recv().await.unwrap();
        assert_eq!(second.body, "Truck left the geofence zone.");
    }

    #[tokio::test]
    async fn test_notify_after_dispatcher_dropped_does_not_panic() {
        let (notifier, dispatcher) = channel(None);
        drop(dispatcher);
        notifier.notify("title", "body");
    }

    #[tokio::test]
    async fn test_missing_command_falls_back_to_log() {
        let (_notifier, mut dispatcher) = channel(Some(
            "/nonexistent/fencewatch-notify-command".to_string(),
        ));
        assert!(dispatcher.has_command());

        let notification = Notification {
            title: "Geofence Entered: Depot".to_string(),
            body: "Truck entered the geofence zone.".to_string(),
        };
        dispatcher.dispatch(&notification);
        assert!(!dispatcher.has_command());

        // Further notifications are still accepted
        dispatcher.dispatch(&notification);
    }
}
