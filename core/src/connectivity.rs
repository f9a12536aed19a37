use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::interval;

use crate::config::TrackerConfig;
use crate::state::TelemetryState;
use stratotrack_shared::{LinkState, LinkStatusMsg, SerialStatus, SerialStatusMsg};

/// Watches the telemetry link and derives a coarse health signal.
///
/// `Disconnected` follows the transport's own lifecycle messages only.
/// `Connected` decays to `Stale` when no frame has arrived within the
/// threshold, and recovers on the first poll after data resumes; the
/// poll cadence bounds how late either transition can be noticed.
pub struct ConnectivityMonitor {
    state: LinkState,
    stale_threshold_ms: u64,
    link_tx: broadcast::Sender<LinkStatusMsg>,
}

impl ConnectivityMonitor {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            // Nothing heard yet and the transport has not confirmed itself.
            state: LinkState::Disconnected,
            stale_threshold_ms: config.stale_threshold_ms,
            link_tx: broadcast::channel(16).0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LinkStatusMsg> {
        self.link_tx.subscribe()
    }

    pub fn transport_connected(&mut self) {
        self.transition(LinkState::Connected);
    }

    pub fn transport_disconnected(&mut self) {
        self.transition(LinkState::Disconnected);
    }

    /// Map a receiver lifecycle message onto the link state. A reported
    /// serial error means the port is gone until the transport says
    /// otherwise.
    pub fn apply_serial_status(&mut self, msg: &SerialStatusMsg) {
        match msg.status {
            SerialStatus::Connected | SerialStatus::Receiving => self.transport_connected(),
            SerialStatus::Error | SerialStatus::Disconnected => self.transport_disconnected(),
        }
    }

    /// One staleness check. Runs on the poll timer, never on data events,
    /// and only ever moves between `Connected` and `Stale`.
    pub fn poll(&mut self, now_ms: u64, last_received_at_ms: Option<u64>) -> LinkState {
        match (self.state, last_received_at_ms) {
            (LinkState::Connected, Some(last))
                if now_ms.saturating_sub(last) > self.stale_threshold_ms =>
            {
                self.transition(LinkState::Stale);
            }
            (LinkState::Stale, Some(last))
                if now_ms.saturating_sub(last) <= self.stale_threshold_ms =>
            {
                self.transition(LinkState::Connected);
            }
            _ => {}
        }
        self.state
    }

    fn transition(&mut self, next: LinkState) {
        if next == self.state {
            return;
        }
        self.state = next;
        let _ = self.link_tx.send(LinkStatusMsg { state: next });
    }
}

/// Staleness poll loop. Reads the reducer's receive clock, nothing else,
/// and stops when the session shuts down.
pub async fn stale_watch(
    telemetry: Arc<Mutex<TelemetryState>>,
    monitor: Arc<Mutex<ConnectivityMonitor>>,
    poll_interval_ms: u64,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut tick = interval(Duration::from_millis(poll_interval_ms));

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let last = telemetry
                    .lock()
                    .expect("telemetry state mutex poisoned")
                    .last_received_at_ms();
                let now_ms = crate::ingest::current_timestamp_ms();
                let state = monitor
                    .lock()
                    .expect("link monitor mutex poisoned")
                    .poll(now_ms, last);
                tracing::trace!(%state, "link poll");
            }
            recv = shutdown_rx.recv() => {
                match recv {
                    Ok(_)
                    | Err(broadcast::error::RecvError::Lagged(_))
                    | Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> ConnectivityMonitor {
        ConnectivityMonitor::new(&TrackerConfig::default())
    }

    #[test]
    fn starts_disconnected() {
        assert_eq!(monitor().state(), LinkState::Disconnected);
    }

    #[test]
    fn quiet_link_goes_stale_past_the_threshold() {
        let mut m = monitor();
        m.transport_connected();

        // Inside the window: still fine.
        assert_eq!(m.poll(50_000, Some(0)), LinkState::Connected);
        // 61 s after the last frame with a 60 s threshold: stale.
        assert_eq!(m.poll(61_000, Some(0)), LinkState::Stale);
    }

    #[test]
    fn fresh_data_recovers_at_the_next_poll() {
        let mut m = monitor();
        m.transport_connected();
        m.poll(61_000, Some(0));
        assert_eq!(m.state(), LinkState::Stale);

        assert_eq!(m.poll(76_000, Some(75_000)), LinkState::Connected);
    }

    #[test]
    fn disconnected_ignores_the_staleness_timer() {
        let mut m = monitor();
        assert_eq!(m.poll(1_000_000, Some(0)), LinkState::Disconnected);
        assert_eq!(m.poll(1_000_000, None), LinkState::Disconnected);
    }

    #[test]
    fn connected_with_no_data_yet_does_not_go_stale() {
        let mut m = monitor();
        m.transport_connected();
        assert_eq!(m.poll(10_000_000, None), LinkState::Connected);
    }

    #[test]
    fn serial_status_drives_transport_transitions() {
        let mut m = monitor();
        let mut rx = m.subscribe();

        let msg = |status| SerialStatusMsg {
            status,
            port: Some("/dev/ttyUSB0".to_string()),
            message: None,
        };

        m.apply_serial_status(&msg(SerialStatus::Connected));
        assert_eq!(m.state(), LinkState::Connected);
        m.apply_serial_status(&msg(SerialStatus::Receiving));
        assert_eq!(m.state(), LinkState::Connected);
        m.apply_serial_status(&msg(SerialStatus::Error));
        assert_eq!(m.state(), LinkState::Disconnected);

        // Connected, then Disconnected: two transitions, no more.
        let mut seen = 0;
        while rx.try_recv().is_ok() {
            seen += 1;
        }
        assert_eq!(seen, 2);
    }
}
