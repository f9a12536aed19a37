use std::collections::VecDeque;
use stratotrack_shared::AltitudePoint;

/// Bounded time series backing the altitude chart. Same FIFO eviction as
/// the position track.
///
/// Timestamps are the device's own clock; a device that never got a GPS
/// time reports zero, so non-positive timestamps are dropped. Out-of-order
/// timestamps are stored as received, the chart decides how to draw them.
pub struct TimeSeriesBuffer {
    max: usize,
    buf: VecDeque<AltitudePoint>,
}

impl TimeSeriesBuffer {
    pub fn new(max: usize) -> Self {
        Self {
            max,
            buf: VecDeque::with_capacity(max),
        }
    }

    /// Returns false when the point was rejected for a non-positive
    /// timestamp. NaN fails the comparison and is rejected too.
    pub fn push(&mut self, timestamp: f64, value: f64) -> bool {
        if !(timestamp > 0.0) {
            return false;
        }
        if self.buf.len() == self.max {
            self.buf.pop_front();
        }
        self.buf.push_back(AltitudePoint {
            timestamp,
            altitude_m: value,
        });
        true
    }

    /// Owned copy in arrival order, oldest first.
    pub fn points(&self) -> Vec<AltitudePoint> {
        self.buf.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unset_device_clock() {
        let mut series = TimeSeriesBuffer::new(3);
        assert!(series.push(1.0, 10.0));
        assert!(series.push(2.0, 20.0));
        assert!(!series.push(0.0, 30.0));
        assert!(series.push(3.0, 40.0));
        assert!(series.push(4.0, 50.0));

        let pts = series.points();
        assert_eq!(pts.len(), 3);
        assert_eq!(
            pts.iter()
                .map(|p| (p.timestamp, p.altitude_m))
                .collect::<Vec<_>>(),
            vec![(2.0, 20.0), (3.0, 40.0), (4.0, 50.0)]
        );
    }

    #[test]
    fn rejects_negative_and_nan_timestamps() {
        let mut series = TimeSeriesBuffer::new(3);
        assert!(!series.push(-5.0, 1.0));
        assert!(!series.push(f64::NAN, 1.0));
        assert!(series.is_empty());
    }

    #[test]
    fn out_of_order_timestamps_are_stored_as_received() {
        let mut series = TimeSeriesBuffer::new(5);
        series.push(10.0, 1.0);
        series.push(5.0, 2.0);
        let pts = series.points();
        assert_eq!(pts[0].timestamp, 10.0);
        assert_eq!(pts[1].timestamp, 5.0);
    }
}
