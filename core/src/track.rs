use std::collections::VecDeque;
use stratotrack_shared::GeoPosition;

/// Bounded, append-only balloon track. Once `max` points are held the
/// oldest are dropped, so the polyline always shows the most recent
/// stretch of flight.
///
/// Consecutive identical positions are kept as-is; whether a point is
/// worth recording is the caller's call.
pub struct PositionTrack {
    max: usize,
    buf: VecDeque<GeoPosition>,
}

impl PositionTrack {
    pub fn new(max: usize) -> Self {
        Self {
            max,
            buf: VecDeque::with_capacity(max),
        }
    }

    pub fn push(&mut self, p: GeoPosition) {
        if self.buf.len() == self.max {
            self.buf.pop_front();
        }
        self.buf.push_back(p);
    }

    /// Owned copy in arrival order, oldest first.
    pub fn positions(&self) -> Vec<GeoPosition> {
        self.buf.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
