use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::config::TrackerConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::normalize::normalize;
use crate::state::TelemetryState;
use stratotrack_shared::{
    FaultMsg, FaultSource, GeoPosition, InboundMsg, LinkStatusMsg, SerialStatus, StateSnapshot,
};

/// Everything a session owns: the reducer, the link monitor, and the
/// fault channel both of them report into. Constructed once at startup
/// and handed around by `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub telemetry: Arc<Mutex<TelemetryState>>,
    pub link: Arc<Mutex<ConnectivityMonitor>>,
    fault_tx: broadcast::Sender<FaultMsg>,
}

impl AppState {
    pub fn new(config: &TrackerConfig) -> Self {
        let telemetry = TelemetryState::new(config);
        let fault_tx = telemetry.fault_sender();
        Self {
            telemetry: Arc::new(Mutex::new(telemetry)),
            link: Arc::new(Mutex::new(ConnectivityMonitor::new(config))),
            fault_tx,
        }
    }

    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<StateSnapshot> {
        self.telemetry
            .lock()
            .expect("telemetry state mutex poisoned")
            .subscribe()
    }

    pub fn subscribe_faults(&self) -> broadcast::Receiver<FaultMsg> {
        self.fault_tx.subscribe()
    }

    pub fn subscribe_link(&self) -> broadcast::Receiver<LinkStatusMsg> {
        self.link
            .lock()
            .expect("link monitor mutex poisoned")
            .subscribe()
    }

    /// Operator geolocation update. Comes from the device-location
    /// source, not the telemetry transport, so it has its own entry point.
    pub fn set_user_position(&self, p: GeoPosition) {
        self.telemetry
            .lock()
            .expect("telemetry state mutex poisoned")
            .set_user_position(p);
    }
}

/// Route one transport message into the session.
///
/// Frames are normalized and folded into the reducer; a history batch is
/// applied under one lock so a queued live frame can never interleave
/// with it. Link lifecycle messages feed the monitor and, for reported
/// serial failures, the fault channel.
pub fn handle_inbound(state: &AppState, msg: InboundMsg, now_ms: u64) {
    match msg {
        InboundMsg::UpdateData(raw) => {
            let sample = normalize(&raw, now_ms);
            state
                .telemetry
                .lock()
                .expect("telemetry state mutex poisoned")
                .apply_sample(sample, now_ms);
        }
        InboundMsg::InitialHistory(rows) => {
            let points = rows.iter().map(|raw| normalize(raw, now_ms)).collect();
            state
                .telemetry
                .lock()
                .expect("telemetry state mutex poisoned")
                .apply_history(points, now_ms);
        }
        InboundMsg::SerialStatus(status) => {
            tracing::debug!(status = ?status.status, port = ?status.port, "serial status");
            if status.status == SerialStatus::Error {
                let message = status
                    .message
                    .clone()
                    .unwrap_or_else(|| "serial link error".to_string());
                let _ = state.fault_tx.send(FaultMsg {
                    timestamp_ms: now_ms,
                    source: FaultSource::Transport,
                    message,
                });
            }
            state
                .link
                .lock()
                .expect("link monitor mutex poisoned")
                .apply_serial_status(&status);
        }
    }
}

pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}
