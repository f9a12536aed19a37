use tokio::sync::broadcast;

use crate::config::TrackerConfig;
use crate::distance::great_circle_distance_m;
use crate::series::TimeSeriesBuffer;
use crate::track::PositionTrack;
use stratotrack_shared::{
    FaultMsg, FaultSource, GeoPosition, StateSnapshot, TelemetrySample,
};

/// Reference point for the derived ground-speed estimate.
#[derive(Debug, Clone, Copy)]
struct SpeedRef {
    position: GeoPosition,
    received_at_ms: u64,
    speed_kmh: f64,
}

/// The single mutable picture of the flight. All writes go through
/// [`apply_sample`](TelemetryState::apply_sample) and
/// [`apply_history`](TelemetryState::apply_history); renderers only ever
/// see owned [`StateSnapshot`]s from the broadcast channel.
///
/// Position state is sticky: a frame without a GPS lock never erases the
/// last good position, the first-seen position, or the recorded track.
pub struct TelemetryState {
    latest: Option<TelemetrySample>,
    last_known_position: Option<GeoPosition>,
    first_known_position: Option<GeoPosition>,
    track: PositionTrack,
    altitude_series: TimeSeriesBuffer,
    last_received_at_ms: Option<u64>,
    user_position: Option<GeoPosition>,
    prev_fix: Option<SpeedRef>,
    speed_min_interval_ms: u64,
    snapshot_tx: broadcast::Sender<StateSnapshot>,
    fault_tx: broadcast::Sender<FaultMsg>,
}

impl TelemetryState {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            latest: None,
            last_known_position: None,
            first_known_position: None,
            track: PositionTrack::new(config.track_max_points),
            altitude_series: TimeSeriesBuffer::new(config.chart_max_points),
            last_received_at_ms: None,
            user_position: None,
            prev_fix: None,
            speed_min_interval_ms: config.speed_min_interval_ms,
            snapshot_tx: broadcast::channel(512).0,
            fault_tx: broadcast::channel(256).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn subscribe_faults(&self) -> broadcast::Receiver<FaultMsg> {
        self.fault_tx.subscribe()
    }

    /// Sender handle for fault reports, shared with the transport-side
    /// event routing so device and link faults land on one channel.
    pub fn fault_sender(&self) -> broadcast::Sender<FaultMsg> {
        self.fault_tx.clone()
    }

    /// Fold one live frame into the state and publish a snapshot.
    ///
    /// A frame carrying a receiver fault updates `latest` and the receive
    /// clock but leaves every position/chart structure alone; observers
    /// hear about it on the fault channel instead.
    pub fn apply_sample(&mut self, mut sample: TelemetrySample, now_ms: u64) {
        self.check_clock(now_ms);

        if let Some(message) = sample.error.clone() {
            self.latest = Some(sample);
            self.last_received_at_ms = Some(now_ms);
            let _ = self.fault_tx.send(FaultMsg {
                timestamp_ms: now_ms,
                source: FaultSource::Device,
                message,
            });
            return;
        }

        self.derive_speed(&mut sample, now_ms);
        self.fold_position(&sample);
        self.fold_altitude(&sample);
        self.latest = Some(sample);
        self.last_received_at_ms = Some(now_ms);
        self.publish();
    }

    /// Bulk-load a chronological backlog, e.g. the seed the server sends
    /// on connect. Track and chart points go through the same per-frame
    /// folding as live data, but `latest` and the receive clock come from
    /// the final frame only, and exactly one snapshot is published.
    ///
    /// The supplied history also decides the track origin: its earliest
    /// fixed frame becomes `first_known_position`.
    pub fn apply_history(&mut self, points: Vec<TelemetrySample>, now_ms: u64) {
        self.check_clock(now_ms);
        if points.is_empty() {
            return;
        }

        let mut history_first_fix: Option<GeoPosition> = None;
        for sample in &points {
            if sample.error.is_some() {
                continue;
            }
            if sample.has_fix
                && let Some(pos) = sample.position
            {
                if history_first_fix.is_none() {
                    history_first_fix = Some(pos);
                }
                self.last_known_position = Some(pos);
                self.track.push(pos);
                // Seed the speed reference so the first live frame after a
                // reload does not measure a jump across the whole backlog.
                self.prev_fix = Some(SpeedRef {
                    position: pos,
                    received_at_ms: now_ms,
                    speed_kmh: sample.speed_kmh.unwrap_or(0.0),
                });
            }
            self.fold_altitude(sample);
        }

        if let Some(first) = history_first_fix {
            self.first_known_position = Some(first);
        }

        self.latest = points.into_iter().next_back();
        self.last_received_at_ms = Some(now_ms);
        self.publish();
    }

    /// Operator position from the device-location source. Publishes a
    /// snapshot so the distance read-out follows the operator around.
    pub fn set_user_position(&mut self, p: GeoPosition) {
        self.user_position = Some(p);
        self.publish();
    }

    pub fn user_position(&self) -> Option<GeoPosition> {
        self.user_position
    }

    /// Straight-line meters between the operator and the balloon's last
    /// known position; absent until both ends are known.
    pub fn distance_to_user_m(&self) -> Option<f64> {
        match (&self.user_position, &self.last_known_position) {
            (Some(user), Some(balloon)) => Some(great_circle_distance_m(user, balloon)),
            _ => None,
        }
    }

    pub fn latest(&self) -> Option<&TelemetrySample> {
        self.latest.as_ref()
    }

    pub fn last_known_position(&self) -> Option<GeoPosition> {
        self.last_known_position
    }

    pub fn first_known_position(&self) -> Option<GeoPosition> {
        self.first_known_position
    }

    pub fn last_received_at_ms(&self) -> Option<u64> {
        self.last_received_at_ms
    }

    pub fn track_positions(&self) -> Vec<GeoPosition> {
        self.track.positions()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            latest: self.latest.clone(),
            last_known_position: self.last_known_position,
            first_known_position: self.first_known_position,
            track: self.track.positions(),
            altitude_points: self.altitude_series.points(),
            distance_to_user_m: self.distance_to_user_m(),
        }
    }

    fn fold_position(&mut self, sample: &TelemetrySample) {
        if sample.has_fix
            && let Some(pos) = sample.position
        {
            self.last_known_position = Some(pos);
            if self.first_known_position.is_none() {
                self.first_known_position = Some(pos);
            }
            self.track.push(pos);
        }
    }

    fn fold_altitude(&mut self, sample: &TelemetrySample) {
        if let (Some(ts), Some(alt)) = (sample.device_timestamp, sample.altitude_baro_m) {
            self.altitude_series.push(ts, alt);
        }
    }

    /// Ground speed from consecutive fixes when the source did not send
    /// one. Pairs closer together than the configured interval keep the
    /// previous estimate, and two readings of the same spot count as
    /// stationary.
    fn derive_speed(&mut self, sample: &mut TelemetrySample, now_ms: u64) {
        if !sample.has_fix {
            return;
        }
        let Some(pos) = sample.position else {
            return;
        };

        if let Some(sent) = sample.speed_kmh {
            self.prev_fix = Some(SpeedRef {
                position: pos,
                received_at_ms: now_ms,
                speed_kmh: sent,
            });
            return;
        }

        match self.prev_fix {
            None => {
                sample.speed_kmh = Some(0.0);
                self.prev_fix = Some(SpeedRef {
                    position: pos,
                    received_at_ms: now_ms,
                    speed_kmh: 0.0,
                });
            }
            Some(prev) => {
                let dt_ms = now_ms.saturating_sub(prev.received_at_ms);
                if dt_ms < self.speed_min_interval_ms {
                    sample.speed_kmh = Some(prev.speed_kmh);
                    return;
                }
                let kmh = if prev.position.approx_eq(&pos) {
                    0.0
                } else {
                    let meters = great_circle_distance_m(&prev.position, &pos);
                    meters / (dt_ms as f64 / 1000.0) * 3.6
                };
                sample.speed_kmh = Some(kmh);
                self.prev_fix = Some(SpeedRef {
                    position: pos,
                    received_at_ms: now_ms,
                    speed_kmh: kmh,
                });
            }
        }
    }

    fn publish(&self) {
        let _ = self.snapshot_tx.send(self.snapshot());
    }

    // `now` is the embedding application's ingestion clock; feeding it
    // backwards is a caller bug, not a data problem.
    fn check_clock(&self, now_ms: u64) {
        if let Some(prev) = self.last_received_at_ms {
            assert!(
                now_ms >= prev,
                "ingestion clock went backwards: {now_ms} < {prev}"
            );
        }
    }
}
