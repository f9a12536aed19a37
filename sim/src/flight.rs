use rand::Rng;
use serde_json::{json, Value};

// Launch site outside Dakar, same spot the real campaigns fly from.
const BASE_LAT: f64 = 14.498;
const BASE_LON: f64 = -17.071;

const ASCENT_RATE_MS: f64 = 5.0;
const BURST_ALTITUDE_M: f64 = 30_000.0;
const DESCENT_RATE_MS: f64 = -8.0;
const SEA_LEVEL_PRESSURE_PA: f64 = 101_325.0;

/// Synthetic balloon flight producing raw frames shaped like the real
/// receiver output, including GPS dropout windows and the occasional
/// fault report, so the whole ingest path gets exercised.
pub struct FlightSim {
    device_clock_s: f64,
    step_s: f64,
    altitude_m: f64,
    burst: bool,
    lat: f64,
    lon: f64,
    dropout_left: u32,
}

impl FlightSim {
    pub fn new(step_s: f64) -> Self {
        Self {
            device_clock_s: 1.0,
            step_s,
            altitude_m: 10.0,
            burst: false,
            lat: BASE_LAT,
            lon: BASE_LON,
            dropout_left: 0,
        }
    }

    pub fn next_frame(&mut self) -> Value {
        let mut rng = rand::rng();

        self.device_clock_s += self.step_s;

        let rate = if self.burst {
            DESCENT_RATE_MS
        } else {
            ASCENT_RATE_MS
        };
        self.altitude_m =
            (self.altitude_m + rate * self.step_s + rng.random_range(-2.0..2.0)).max(0.0);
        if self.altitude_m >= BURST_ALTITUDE_M {
            self.burst = true;
        }

        // Prevailing easterly drift with some wander.
        self.lat += rng.random_range(-0.0004..0.0006);
        self.lon += rng.random_range(-0.0002..0.0010);

        if rng.random_bool(0.01) {
            return json!({ "error": "radio checksum mismatch" });
        }

        if self.dropout_left == 0 && rng.random_bool(0.05) {
            self.dropout_left = rng.random_range(2..6);
        }

        // Crude standard-atmosphere numbers, good enough for a dashboard.
        let temperature_c = 28.0 - self.altitude_m * 0.0065 + rng.random_range(-0.5..0.5);
        let pressure_pa = SEA_LEVEL_PRESSURE_PA * (1.0 - self.altitude_m / 44_330.0).powf(5.255);
        let humidity_pct = (55.0 - self.altitude_m * 0.002).clamp(2.0, 95.0);

        let mut frame = json!({
            "timestamp": self.device_clock_s,
            "temperature": temperature_c,
            "pressure": pressure_pa,
            "humidity": humidity_pct,
            "altitude_bme": self.altitude_m,
            "air_quality": rng.random_range(1..=5),
            "tvoc": rng.random_range(20..300),
            "eco2": rng.random_range(400..900),
            "ozone": rng.random_range(10..80),
            "uv_index": (self.altitude_m / 3_000.0).min(11.0),
            "pm1_std": rng.random_range(0..20),
            "pm25_std": rng.random_range(0..35),
            "pm10_std": rng.random_range(0..50),
            "rssi": rng.random_range(-110..-60),
        });

        if self.dropout_left > 0 {
            // The receiver keeps sending zeros while the GPS has no lock.
            self.dropout_left -= 1;
            frame["latitude"] = json!(0.0);
            frame["longitude"] = json!(0.0);
        } else {
            frame["latitude"] = json!(self.lat);
            frame["longitude"] = json!(self.lon);
            frame["altitude_gps"] = json!(self.altitude_m + rng.random_range(-15.0..15.0));
            frame["satellites"] = json!(rng.random_range(4..13));
        }

        frame
    }
}
