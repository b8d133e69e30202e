//! Trackfiles: the running record of one sensed contact.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coalition::Coalition;
use crate::spatial::{self, Point};

/// Frames retained per trackfile. Enough history to derive speed over a
/// short window; anything older has no tactical value.
const FRAME_RETENTION: usize = 10;

/// Identity metadata for a contact. Set on first sighting, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Labels {
    pub id: u64,
    pub name: String,
    /// Airframe short name in ACMI export format, e.g. "F-15C".
    pub acmi_name: String,
    pub coalition: Coalition,
}

/// One timestamped telemetry sample. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub point: Point,
    pub altitude_m: f64,
    /// True heading in degrees.
    pub heading_deg: f64,
    pub time: DateTime<Utc>,
}

/// Time-ordered history of one contact's telemetry, newest first.
#[derive(Debug, Clone)]
pub struct Trackfile {
    labels: Labels,
    frames: VecDeque<Frame>,
}

impl Trackfile {
    pub fn new(labels: Labels) -> Self {
        Self {
            labels,
            frames: VecDeque::with_capacity(FRAME_RETENTION),
        }
    }

    pub fn with_frame(labels: Labels, frame: Frame) -> Self {
        let mut tf = Self::new(labels);
        tf.append(frame);
        tf
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn id(&self) -> u64 {
        self.labels.id
    }

    /// Record a new frame, discarding history beyond the retention window.
    pub fn append(&mut self, frame: Frame) {
        self.frames.push_front(frame);
        self.frames.truncate(FRAME_RETENTION);
    }

    /// The most recent frame, or `None` for a trackfile that has never been
    /// updated.
    pub fn last_known(&self) -> Option<&Frame> {
        self.frames.front()
    }

    /// Ground speed in knots from the two most recent frames with distinct
    /// positions. Zero when fewer than two usable frames exist.
    pub fn speed_kt(&self) -> f64 {
        let Some(newest) = self.frames.front() else {
            return 0.0;
        };
        let Some(prior) = self.frames.iter().skip(1).find(|f| f.point != newest.point) else {
            return 0.0;
        };

        let elapsed = (newest.time - prior.time).num_milliseconds() as f64 / 1_000.0;
        if elapsed <= 0.0 {
            return 0.0;
        }
        let meters = spatial::haversine_distance(prior.point, newest.point);
        (meters / elapsed * spatial::MPS_TO_KNOTS).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn labels() -> Labels {
        Labels {
            id: 1,
            name: "Eagle 1-1".into(),
            acmi_name: "F-15C".into(),
            coalition: Coalition::Blue,
        }
    }

    fn frame(lat: f64, lon: f64, secs: i64) -> Frame {
        Frame {
            point: Point::new(lat, lon),
            altitude_m: 8_000.0,
            heading_deg: 90.0,
            time: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs),
        }
    }

    #[test]
    fn speed_zero_without_two_distinct_frames() {
        let mut tf = Trackfile::new(labels());
        assert_eq!(tf.speed_kt(), 0.0);

        tf.append(frame(40.0, 30.0, 0));
        assert_eq!(tf.speed_kt(), 0.0);

        // Same position again: still no usable pair
        tf.append(frame(40.0, 30.0, 1));
        assert_eq!(tf.speed_kt(), 0.0);
    }

    #[test]
    fn speed_from_distinct_positions() {
        let mut tf = Trackfile::new(labels());
        tf.append(frame(40.0, 30.0, 0));
        // One degree of latitude in one hour is 60 nm/h
        tf.append(frame(41.0, 30.0, 3_600));
        let speed = tf.speed_kt();
        assert!((speed - 60.0).abs() < 1.0, "speed={speed}");
    }

    #[test]
    fn speed_skips_parked_duplicates() {
        let mut tf = Trackfile::new(labels());
        tf.append(frame(40.0, 30.0, 0));
        tf.append(frame(41.0, 30.0, 3_600));
        // Two stationary samples on top; speed still measured against the
        // most recent distinct position
        tf.append(frame(41.0, 30.0, 3_601));
        let speed = tf.speed_kt();
        assert!(speed > 0.0);
    }

    #[test]
    fn retention_discards_oldest() {
        let mut tf = Trackfile::new(labels());
        for i in 0..25 {
            tf.append(frame(40.0 + i as f64 * 0.01, 30.0, i));
        }
        assert_eq!(tf.last_known().unwrap().time, frame(0.0, 0.0, 24).time);
        // History bounded
        assert!(tf.frames.len() <= 10);
    }

    #[test]
    fn appends_preserve_arrival_order() {
        let mut tf = Trackfile::new(labels());
        tf.append(frame(40.0, 30.0, 0));
        tf.append(frame(40.1, 30.0, 1));
        tf.append(frame(40.2, 30.0, 2));
        let times: Vec<_> = tf.frames.iter().map(|f| f.time).collect();
        assert!(times.windows(2).all(|w| w[0] > w[1]));
    }
}
