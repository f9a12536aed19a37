use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate equality tolerance in degrees (~0.1 m at the equator).
pub const COORD_EPSILON: f64 = 1e-6;

/// A geographic position as reported by the balloon's GPS or the
/// operator's device. Latitude/longitude are degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: Option<f64>,
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m: None,
        }
    }

    pub fn with_accuracy(latitude: f64, longitude: f64, accuracy_m: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m: Some(accuracy_m),
        }
    }

    /// True when both coordinates match within [`COORD_EPSILON`].
    /// Accuracy is ignored; two readings of the same spot are "the same spot".
    pub fn approx_eq(&self, other: &GeoPosition) -> bool {
        (self.latitude - other.latitude).abs() <= COORD_EPSILON
            && (self.longitude - other.longitude).abs() <= COORD_EPSILON
    }
}

/// One decoded telemetry frame from the balloon. Every measurement is
/// optional: the sensor payload routinely arrives with whole sections
/// missing, and a `None` here means "not reported this frame".
///
/// A frame with `error` set is a fault report from the receiver; its
/// measurement fields must not be trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Ground-side ingestion time, milliseconds, monotonic per session.
    pub received_at_ms: u64,
    /// Device clock, seconds since epoch. Zero or negative means the
    /// device clock was never set.
    pub device_timestamp: Option<f64>,

    pub position: Option<GeoPosition>,
    pub has_fix: bool,
    pub altitude_gps_m: Option<f64>,
    pub satellites: Option<u32>,
    pub speed_kmh: Option<f64>,

    pub temperature_c: Option<f64>,
    pub pressure_pa: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub altitude_baro_m: Option<f64>,

    /// IAQ index, 1 (excellent) to 5 (very poor).
    pub air_quality: Option<u8>,
    pub tvoc_ppb: Option<i64>,
    pub eco2_ppm: Option<i64>,
    pub ozone_ppb: Option<i64>,
    pub uv_index: Option<f64>,

    pub pm1_std: Option<i64>,
    pub pm25_std: Option<i64>,
    pub pm10_std: Option<i64>,

    pub rssi: Option<i32>,
    pub raw_text: Option<String>,
    pub error: Option<String>,
}

impl TelemetrySample {
    /// A frame with nothing in it but the ingestion timestamp.
    pub fn empty(received_at_ms: u64) -> Self {
        Self {
            received_at_ms,
            device_timestamp: None,
            position: None,
            has_fix: false,
            altitude_gps_m: None,
            satellites: None,
            speed_kmh: None,
            temperature_c: None,
            pressure_pa: None,
            humidity_pct: None,
            altitude_baro_m: None,
            air_quality: None,
            tvoc_ppb: None,
            eco2_ppm: None,
            ozone_ppb: None,
            uv_index: None,
            pm1_std: None,
            pm25_std: None,
            pm10_std: None,
            rssi: None,
            raw_text: None,
            error: None,
        }
    }

    /// Display label for the IAQ index.
    pub fn air_quality_text(&self) -> &'static str {
        match self.air_quality {
            Some(1) => "Excellent",
            Some(2) => "Good",
            Some(3) => "Moderate",
            Some(4) => "Poor",
            Some(5) => "Very poor",
            _ => "Unknown",
        }
    }

    /// Barometric pressure in hPa, the unit the read-outs use.
    pub fn pressure_hpa(&self) -> Option<f64> {
        self.pressure_pa.map(|pa| pa / 100.0)
    }
}

/// Health of the telemetry link as seen from the ground station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum LinkState {
    /// Transport down or not yet established.
    Disconnected,
    /// Transport up and data seen recently.
    Connected,
    /// Transport up but no frame within the staleness window.
    Stale,
}

impl LinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Disconnected => "Disconnected",
            LinkState::Connected => "Connected",
            LinkState::Stale => "Stale",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver-side link lifecycle signal, as sent by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialStatus {
    Connected,
    Receiving,
    Error,
    Disconnected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialStatusMsg {
    pub status: SerialStatus,
    pub port: Option<String>,
    pub message: Option<String>,
}

/// Incoming push messages from the transport.
/// The frame payloads stay untyped here; the core normalizes them.
///   { "ty": "update_data",     "data": { ...raw frame... } }
///   { "ty": "initial_history", "data": [ ...raw frames... ] }
///   { "ty": "serial_status",   "data": { "status": "connected", ... } }
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "ty", content = "data", rename_all = "snake_case")]
pub enum InboundMsg {
    UpdateData(serde_json::Value),
    InitialHistory(Vec<serde_json::Value>),
    SerialStatus(SerialStatusMsg),
}

/// One altitude reading for the chart series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AltitudePoint {
    /// Device timestamp, seconds.
    pub timestamp: f64,
    pub altitude_m: f64,
}

/// Read-only view of the tracker state, published after every applied
/// event. Owned data throughout, so subscribers can hold on to it.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub latest: Option<TelemetrySample>,
    pub last_known_position: Option<GeoPosition>,
    pub first_known_position: Option<GeoPosition>,
    pub track: Vec<GeoPosition>,
    pub altitude_points: Vec<AltitudePoint>,
    pub distance_to_user_m: Option<f64>,
}

/// Where a fault report originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultSource {
    /// The balloon/receiver reported the fault inside a telemetry frame.
    Device,
    /// The transport reported a link-level failure.
    Transport,
}

#[derive(Debug, Clone, Serialize)]
pub struct FaultMsg {
    pub timestamp_ms: u64,
    pub source: FaultSource,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkStatusMsg {
    pub state: LinkState,
}

/// Outgoing messages toward rendering layers, mirroring the inbound
/// framing so a bridge can forward them over any push channel:
///   { "ty": "snapshot", "data": { ...StateSnapshot... } }
///   { "ty": "fault",    "data": { ...FaultMsg... } }
///   { "ty": "link",     "data": { ...LinkStatusMsg... } }
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "ty", content = "data", rename_all = "snake_case")]
pub enum OutboundMsg {
    Snapshot(StateSnapshot),
    Fault(FaultMsg),
    Link(LinkStatusMsg),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_update_data_parses() {
        let raw = r#"{"ty":"update_data","data":{"latitude":14.5,"longitude":-17.07}}"#;
        let msg: InboundMsg = serde_json::from_str(raw).expect("inbound should parse");
        match msg {
            InboundMsg::UpdateData(v) => assert_eq!(v["latitude"], 14.5),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn inbound_serial_status_parses() {
        let raw = r#"{"ty":"serial_status","data":{"status":"error","port":"COM5","message":"boom"}}"#;
        let msg: InboundMsg = serde_json::from_str(raw).expect("inbound should parse");
        match msg {
            InboundMsg::SerialStatus(s) => {
                assert_eq!(s.status, SerialStatus::Error);
                assert_eq!(s.port.as_deref(), Some("COM5"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn positions_compare_within_epsilon() {
        let a = GeoPosition::new(14.5, -17.07);
        let b = GeoPosition::new(14.5 + 5e-7, -17.07 - 5e-7);
        let c = GeoPosition::new(14.6, -17.07);
        assert!(a.approx_eq(&b));
        assert!(!a.approx_eq(&c));
    }

    #[test]
    fn air_quality_labels() {
        let mut s = TelemetrySample::empty(0);
        assert_eq!(s.air_quality_text(), "Unknown");
        s.air_quality = Some(1);
        assert_eq!(s.air_quality_text(), "Excellent");
        s.air_quality = Some(5);
        assert_eq!(s.air_quality_text(), "Very poor");
    }
}
