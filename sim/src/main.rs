mod flight;

use std::time::Duration;

use stratotrack_core::config;
use stratotrack_core::connectivity::stale_watch;
use stratotrack_core::ingest::{current_timestamp_ms, handle_inbound, AppState};
use stratotrack_shared::{
    GeoPosition, InboundMsg, OutboundMsg, SerialStatus, SerialStatusMsg,
};
use tokio::sync::broadcast;
use tokio::time::interval;

const FRAME_PERIOD_S: f64 = 2.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = config::load_or_default();
    let state = AppState::new(&config);
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    tokio::spawn(stale_watch(
        state.telemetry.clone(),
        state.link.clone(),
        config.poll_interval_ms,
        shutdown_tx.subscribe(),
    ));
    spawn_observers(&state);

    // The operator stands near the launch pad; the distance read-out
    // tracks the balloon from there.
    state.set_user_position(GeoPosition::with_accuracy(14.492, -17.064, 8.0));

    // Pretend the receiver just opened its port.
    handle_inbound(
        &state,
        InboundMsg::SerialStatus(SerialStatusMsg {
            status: SerialStatus::Connected,
            port: Some("sim".to_string()),
            message: None,
        }),
        current_timestamp_ms(),
    );

    tracing::info!("synthetic flight started, ctrl-c to stop");

    let mut sim = flight::FlightSim::new(FRAME_PERIOD_S);
    let mut frame_tick = interval(Duration::from_secs_f64(FRAME_PERIOD_S));
    loop {
        tokio::select! {
            _ = frame_tick.tick() => {
                let frame = sim.next_frame();
                handle_inbound(&state, InboundMsg::UpdateData(frame), current_timestamp_ms());
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let _ = shutdown_tx.send(());
    tracing::info!("flight stopped");
    Ok(())
}

fn spawn_observers(state: &AppState) {
    let mut snapshots = state.subscribe_snapshots();
    tokio::spawn(async move {
        loop {
            match snapshots.recv().await {
                Ok(snap) => {
                    if let Some(latest) = &snap.latest {
                        tracing::info!(
                            fix = latest.has_fix,
                            altitude_m = ?latest.altitude_baro_m,
                            speed_kmh = ?latest.speed_kmh,
                            pressure_hpa = ?latest.pressure_hpa(),
                            air = latest.air_quality_text(),
                            track_points = snap.track.len(),
                            distance_m = ?snap.distance_to_user_m,
                            "state changed"
                        );
                    }
                    // What a push bridge would put on the wire.
                    if let Ok(encoded) = serde_json::to_string(&OutboundMsg::Snapshot(snap)) {
                        tracing::debug!(%encoded, "push frame");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "snapshot observer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut faults = state.subscribe_faults();
    tokio::spawn(async move {
        loop {
            match faults.recv().await {
                Ok(fault) => {
                    tracing::warn!(source = ?fault.source, "fault: {}", fault.message);
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut link_changes = state.subscribe_link();
    tokio::spawn(async move {
        loop {
            match link_changes.recv().await {
                Ok(msg) => tracing::info!(state = %msg.state, "link changed"),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
