//! Events streamed from the simulator telemetry source.

use chrono::{DateTime, Utc};

use crate::trackfile::{Frame, Labels};

/// The mission (re)started; all tracked state is stale.
#[derive(Debug, Clone, Copy)]
pub struct Started {
    pub mission_time: DateTime<Utc>,
}

/// A fresh telemetry sample for one unit.
#[derive(Debug, Clone)]
pub struct Updated {
    pub labels: Labels,
    pub frame: Frame,
}

/// The simulator explicitly dropped a unit from the export.
#[derive(Debug, Clone, Copy)]
pub struct Faded {
    pub unit_id: u64,
}
