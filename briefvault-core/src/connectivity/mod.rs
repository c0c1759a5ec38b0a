/*
    Connectivity monitor

    Single source of truth for the online/offline flag. The host runtime
    reports transitions through set_online(); the rest of the system only
    ever consumes the flag and the broadcast events. The subsystem never
    probes the network itself.
*/

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Connectivity transition, broadcast to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

/// Tracks online state and notifies subscribers on transitions
pub struct ConnectivityMonitor {
    online: AtomicBool,
    events: broadcast::Sender<ConnectivityEvent>,
}

impl ConnectivityMonitor {
    /// Create a monitor with the given initial state
    pub fn new(initially_online: bool) -> Self {
        let (events, _) = broadcast::channel(16);
        ConnectivityMonitor {
            online: AtomicBool::new(initially_online),
            events,
        }
    }

    /// Current online state
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Report a connectivity change from the host runtime.
    /// Redundant reports (same state) do not re-broadcast.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return;
        }

        let event = if online {
            ConnectivityEvent::Online
        } else {
            ConnectivityEvent::Offline
        };

        tracing::info!(online, "Connectivity changed");

        // Send fails only when nobody is subscribed, which is fine
        let _ = self.events.send(event);
    }

    /// Subscribe to connectivity transitions
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.events.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        ConnectivityMonitor::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_state() {
        let monitor = ConnectivityMonitor::new(true);
        assert!(monitor.is_online());

        let monitor = ConnectivityMonitor::new(false);
        assert!(!monitor.is_online());
    }

    #[tokio::test]
    async fn test_transition_broadcasts() {
        let monitor = ConnectivityMonitor::new(true);
        let mut rx = monitor.subscribe();

        monitor.set_online(false);
        assert_eq!(rx.recv().await.unwrap(), ConnectivityEvent::Offline);

        monitor.set_online(true);
        assert_eq!(rx.recv().await.unwrap(), ConnectivityEvent::Online);
    }

    #[tokio::test]
    async fn test_redundant_report_not_rebroadcast() {
        let monitor = ConnectivityMonitor::new(true);
        let mut rx = monitor.subscribe();

        monitor.set_online(true); // no transition
        monitor.set_online(false);

        // The only queued event is the real transition
        assert_eq!(rx.recv().await.unwrap(), ConnectivityEvent::Offline);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_no_subscribers_is_fine() {
        let monitor = ConnectivityMonitor::new(true);
        monitor.set_online(false);
        assert!(!monitor.is_online());
    }
}
