use serde_json::{Map, Value};
use stratotrack_shared::{GeoPosition, TelemetrySample};

/// Coerce one raw frame from the push channel into a [`TelemetrySample`].
///
/// The receiver firmware emits whatever sections it managed to read, with
/// "ERR" strings, nulls, or absent keys for the rest, and the historical
/// frontends disagreed on exactly which fields exist. Anything missing,
/// non-numeric, or non-finite simply becomes `None`; this never fails.
pub fn normalize(raw: &Value, received_at_ms: u64) -> TelemetrySample {
    let mut sample = TelemetrySample::empty(received_at_ms);

    let Some(obj) = raw.as_object() else {
        sample.error = Some("telemetry frame is not a JSON object".to_string());
        return sample;
    };

    sample.device_timestamp = f64_field(obj, "timestamp");

    // A fix exists only when both coordinates are usable. The receiver
    // reports (0, 0) while the GPS has no lock, so that pair is no fix
    // either, whatever the rest of the frame claims.
    if let (Some(lat), Some(lon)) = (f64_field(obj, "latitude"), f64_field(obj, "longitude"))
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
        && !(lat == 0.0 && lon == 0.0)
    {
        sample.has_fix = true;
        sample.position = Some(GeoPosition::new(lat, lon));
    }

    sample.altitude_gps_m = f64_field(obj, "altitude_gps");
    sample.satellites = u32_field(obj, "satellites");
    sample.speed_kmh = f64_field(obj, "speed_kmh");

    sample.temperature_c = f64_field(obj, "temperature");
    sample.pressure_pa = f64_field(obj, "pressure");
    sample.humidity_pct = f64_field(obj, "humidity");
    sample.altitude_baro_m = f64_field(obj, "altitude_bme");

    // An IAQ reading outside the 1..5 scale is unknown, not an error.
    sample.air_quality = i64_field(obj, "air_quality")
        .filter(|v| (1..=5).contains(v))
        .map(|v| v as u8);
    sample.tvoc_ppb = i64_field(obj, "tvoc");
    sample.eco2_ppm = i64_field(obj, "eco2");
    sample.ozone_ppb = i64_field(obj, "ozone");
    sample.uv_index = f64_field(obj, "uv_index");

    sample.pm1_std = i64_field(obj, "pm1_std");
    sample.pm25_std = i64_field(obj, "pm25_std");
    sample.pm10_std = i64_field(obj, "pm10_std");

    sample.rssi = i64_field(obj, "rssi").map(|v| v as i32);
    sample.raw_text = str_field(obj, "raw_text");
    sample.error = str_field(obj, "error");

    sample
}

/// Numbers may arrive as JSON numbers or as numeric strings; everything
/// else, including NaN and infinities, is treated as absent.
fn f64_field(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    let n = match obj.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn i64_field(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    f64_field(obj, key).map(|v| v as i64)
}

fn u32_field(obj: &Map<String, Value>, key: &str) -> Option<u32> {
    i64_field(obj, key)
        .filter(|v| (0..=i64::from(u32::MAX)).contains(v))
        .map(|v| v as u32)
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_frame() -> Value {
        json!({
            "timestamp": 1717171717.5,
            "latitude": 14.5,
            "longitude": -17.07,
            "altitude_gps": 1520.0,
            "satellites": 9,
            "speed_kmh": 12.4,
            "temperature": 21.5,
            "pressure": 101_325.0,
            "humidity": 48.0,
            "altitude_bme": 1498.2,
            "air_quality": 2,
            "tvoc": 120,
            "eco2": 450,
            "ozone": 31,
            "uv_index": 4.2,
            "pm1_std": 3,
            "pm25_std": 7,
            "pm10_std": 9,
            "rssi": -71,
            "raw_text": "GPS,14.5,-17.07|ENV,21.5"
        })
    }

    #[test]
    fn full_frame_has_no_absent_fields_except_error() {
        let s = normalize(&full_frame(), 1_000);
        assert!(s.has_fix);
        assert!(s.position.is_some());
        assert!(s.device_timestamp.is_some());
        assert!(s.altitude_gps_m.is_some());
        assert!(s.satellites.is_some());
        assert!(s.speed_kmh.is_some());
        assert!(s.temperature_c.is_some());
        assert!(s.pressure_pa.is_some());
        assert!(s.humidity_pct.is_some());
        assert!(s.altitude_baro_m.is_some());
        assert!(s.air_quality.is_some());
        assert!(s.tvoc_ppb.is_some());
        assert!(s.eco2_ppm.is_some());
        assert!(s.ozone_ppb.is_some());
        assert!(s.uv_index.is_some());
        assert!(s.pm1_std.is_some());
        assert!(s.pm25_std.is_some());
        assert!(s.pm10_std.is_some());
        assert!(s.rssi.is_some());
        assert!(s.raw_text.is_some());
        assert!(s.error.is_none());
    }

    #[test]
    fn non_object_input_degrades_to_an_error_sample() {
        let s = normalize(&json!([1, 2, 3]), 42);
        assert!(s.error.is_some());
        assert!(!s.has_fix);
        assert!(s.position.is_none());
        assert_eq!(s.received_at_ms, 42);
    }

    #[test]
    fn garbage_values_become_absent() {
        let s = normalize(
            &json!({
                "temperature": "ERR",
                "pressure": null,
                "humidity": {"nested": true},
                "satellites": -3,
                "uv_index": "NaN"
            }),
            0,
        );
        assert!(s.temperature_c.is_none());
        assert!(s.pressure_pa.is_none());
        assert!(s.humidity_pct.is_none());
        assert!(s.satellites.is_none());
        assert!(s.uv_index.is_none());
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let s = normalize(&json!({"temperature": "21.5", "tvoc": "120"}), 0);
        assert_eq!(s.temperature_c, Some(21.5));
        assert_eq!(s.tvoc_ppb, Some(120));
    }

    #[test]
    fn fix_requires_both_coordinates_in_range() {
        let s = normalize(&json!({"latitude": 14.5}), 0);
        assert!(!s.has_fix);

        let s = normalize(&json!({"latitude": 94.5, "longitude": -17.0}), 0);
        assert!(!s.has_fix);
        assert!(s.position.is_none());

        let s = normalize(&json!({"latitude": 14.5, "longitude": -200.0}), 0);
        assert!(!s.has_fix);
    }

    #[test]
    fn zero_zero_is_the_no_lock_placeholder() {
        let s = normalize(&json!({"latitude": 0.0, "longitude": 0.0}), 0);
        assert!(!s.has_fix);
        assert!(s.position.is_none());
    }

    #[test]
    fn air_quality_outside_scale_is_unknown() {
        let s = normalize(&json!({"air_quality": 0}), 0);
        assert!(s.air_quality.is_none());
        let s = normalize(&json!({"air_quality": 6}), 0);
        assert!(s.air_quality.is_none());
        let s = normalize(&json!({"air_quality": 5}), 0);
        assert_eq!(s.air_quality, Some(5));
    }
}
