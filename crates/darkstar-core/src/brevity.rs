//! Brevity vocabulary: the shapes tactical calls are made of.
//!
//! Groups are derived on demand by the radar queries and never persisted;
//! the dialogue layer turns them into spoken picture/BRAA/bullseye calls.

use serde::{Deserialize, Serialize};

use crate::spatial::{self, Point};

/// Category filter applied to radar queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactCategory {
    /// Wildcard: any airborne contact.
    Any,
    FixedWing,
    RotaryWing,
    SurfaceToAirMissile,
}

/// Target aspect relative to an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aspect {
    /// Nose on, 0-30 degrees off.
    Hot,
    /// 30-60 degrees off.
    Flank,
    /// 60-110 degrees off.
    Beam,
    /// Opening, more than 110 degrees off.
    Drag,
}

impl Aspect {
    /// Classify from the true bearing observer->contact and the contact's
    /// true heading.
    pub fn from_geometry(bearing_to_contact_deg: f64, contact_heading_deg: f64) -> Aspect {
        let nose_on = spatial::reciprocal_deg(bearing_to_contact_deg);
        let off = spatial::angular_delta_deg(contact_heading_deg, nose_on).abs();
        if off <= 30.0 {
            Aspect::Hot
        } else if off <= 60.0 {
            Aspect::Flank
        } else if off <= 110.0 {
            Aspect::Beam
        } else {
            Aspect::Drag
        }
    }
}

/// Bearing, range, altitude and aspect relative to a caller-supplied origin.
/// Bearing is magnetic, as read to the pilot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Braa {
    pub bearing_deg: f64,
    pub range_nm: f64,
    pub altitude_ft: f64,
    pub aspect: Aspect,
}

/// Bearing and range from the coalition bullseye. Bearing is magnetic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BullseyeCut {
    pub bearing_deg: f64,
    pub range_nm: f64,
}

/// Inclusive altitude block in feet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AltitudeBlock {
    pub min_ft: f64,
    pub max_ft: f64,
}

impl AltitudeBlock {
    pub fn new(min_ft: f64, max_ft: f64) -> Self {
        Self { min_ft, max_ft }
    }

    /// Unbounded block that admits every altitude.
    pub fn any() -> Self {
        Self {
            min_ft: f64::NEG_INFINITY,
            max_ft: f64::INFINITY,
        }
    }

    pub fn contains(&self, altitude_ft: f64) -> bool {
        self.min_ft <= altitude_ft && altitude_ft <= self.max_ft
    }
}

/// An ephemeral tactical cluster of contacts of the same airframe flying
/// together. Derived per query, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Member trackfile unit IDs.
    pub unit_ids: Vec<u64>,
    /// Centroid of member positions.
    pub point: Point,
    /// Mean altitude in feet.
    pub altitude_ft: f64,
    /// Mean true heading, resolved across the wrap boundary.
    pub heading_deg: f64,
    pub contacts: usize,
    /// ACMI short name shared by all members.
    pub platform: String,
    pub category: ContactCategory,
    pub braa: Option<Braa>,
    pub bullseye: Option<BullseyeCut>,
}

impl Group {
    pub fn contains(&self, unit_id: u64) -> bool {
        self.unit_ids.contains(&unit_id)
    }

    /// Lowest member unit ID, used as a stable tie-breaker.
    pub fn lowest_id(&self) -> u64 {
        self.unit_ids.iter().copied().min().unwrap_or(u64::MAX)
    }
}
