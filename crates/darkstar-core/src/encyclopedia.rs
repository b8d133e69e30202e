//! Static aircraft encyclopedia.
//!
//! Maps the ACMI short name exported by the simulator to airframe metadata.
//! The table is compiled in; a miss is a legal outcome and is distinct from
//! an entry with [`Category::Unknown`] - the radar treats unrecognized
//! airframes as matching any category filter.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::brevity::ContactCategory;

/// Broad airframe category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    FixedWing,
    RotaryWing,
    SurfaceToAirMissile,
    Unknown,
}

impl Category {
    /// Whether an airframe of this category passes the given query filter.
    pub fn matches(self, filter: ContactCategory) -> bool {
        match filter {
            ContactCategory::Any => true,
            ContactCategory::FixedWing => self == Category::FixedWing,
            ContactCategory::RotaryWing => self == Category::RotaryWing,
            ContactCategory::SurfaceToAirMissile => self == Category::SurfaceToAirMissile,
        }
    }
}

/// Airframe metadata keyed by ACMI short name.
#[derive(Debug, Clone, Copy)]
pub struct AircraftData {
    pub category: Category,
    /// Range inside which this airframe can credibly employ against a
    /// friendly, in nautical miles. Zero for non-combatants.
    pub threat_radius_nm: f64,
}

const fn entry(category: Category, threat_radius_nm: f64) -> AircraftData {
    AircraftData {
        category,
        threat_radius_nm,
    }
}

static AIRCRAFT: Lazy<HashMap<&'static str, AircraftData>> = Lazy::new(|| {
    use Category::*;
    HashMap::from([
        // Blue-side fighters
        ("F-14A-135-GR", entry(FixedWing, 35.0)),
        ("F-14B", entry(FixedWing, 35.0)),
        ("F-15C", entry(FixedWing, 30.0)),
        ("F-15E", entry(FixedWing, 30.0)),
        ("F-16C_50", entry(FixedWing, 25.0)),
        ("F-16CM", entry(FixedWing, 25.0)),
        ("FA-18C_hornet", entry(FixedWing, 25.0)),
        ("F-4E-45MC", entry(FixedWing, 20.0)),
        ("F-5E-3", entry(FixedWing, 10.0)),
        ("M-2000C", entry(FixedWing, 20.0)),
        ("Mirage-F1EE", entry(FixedWing, 15.0)),
        ("JF-17", entry(FixedWing, 25.0)),
        // Red-side fighters
        ("Su-27", entry(FixedWing, 30.0)),
        ("Su-30", entry(FixedWing, 30.0)),
        ("Su-33", entry(FixedWing, 30.0)),
        ("MiG-29A", entry(FixedWing, 25.0)),
        ("MiG-29S", entry(FixedWing, 25.0)),
        ("MiG-31", entry(FixedWing, 40.0)),
        ("MiG-23MLD", entry(FixedWing, 15.0)),
        ("MiG-21Bis", entry(FixedWing, 10.0)),
        ("MiG-19P", entry(FixedWing, 5.0)),
        // Attack and support
        ("A-10C", entry(FixedWing, 5.0)),
        ("A-10C_2", entry(FixedWing, 5.0)),
        ("AV8BNA", entry(FixedWing, 10.0)),
        ("Su-25", entry(FixedWing, 5.0)),
        ("Su-25T", entry(FixedWing, 5.0)),
        ("Su-34", entry(FixedWing, 15.0)),
        ("Tu-22M3", entry(FixedWing, 0.0)),
        ("KC-135", entry(FixedWing, 0.0)),
        ("E-3A", entry(FixedWing, 0.0)),
        ("A-50", entry(FixedWing, 0.0)),
        ("C-130", entry(FixedWing, 0.0)),
        ("IL-76MD", entry(FixedWing, 0.0)),
        // Rotary wing
        ("AH-64D", entry(RotaryWing, 5.0)),
        ("AH-64D_BLK_II", entry(RotaryWing, 5.0)),
        ("Ka-50", entry(RotaryWing, 5.0)),
        ("Mi-24P", entry(RotaryWing, 4.0)),
        ("Mi-28N", entry(RotaryWing, 5.0)),
        ("Mi-8MT", entry(RotaryWing, 0.0)),
        ("UH-1H", entry(RotaryWing, 0.0)),
        ("SA342M", entry(RotaryWing, 3.0)),
        ("OH-58D", entry(RotaryWing, 3.0)),
        // Surface-to-air missiles tracked as airborne contacts
        ("SA-2", entry(SurfaceToAirMissile, 0.0)),
        ("SA-6", entry(SurfaceToAirMissile, 0.0)),
        ("SA-10", entry(SurfaceToAirMissile, 0.0)),
        ("SA-11", entry(SurfaceToAirMissile, 0.0)),
        // Exported by some mission scripts without a usable type
        ("RQ-1A Predator", entry(Unknown, 0.0)),
        ("WingLoong-I", entry(Unknown, 0.0)),
    ])
});

/// Look up an airframe by its ACMI short name.
pub fn lookup(acmi_name: &str) -> Option<&'static AircraftData> {
    AIRCRAFT.get(acmi_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_fighter_is_fixed_wing() {
        let data = lookup("F-15C").expect("F-15C should be in the encyclopedia");
        assert_eq!(data.category, Category::FixedWing);
        assert!(data.threat_radius_nm > 0.0);
    }

    #[test]
    fn miss_is_none() {
        assert!(lookup("UNKNOWN-1").is_none());
    }

    #[test]
    fn unknown_category_is_distinct_from_miss() {
        let data = lookup("RQ-1A Predator").expect("drone should be present");
        assert_eq!(data.category, Category::Unknown);
        assert!(!data.category.matches(ContactCategory::FixedWing));
        assert!(data.category.matches(ContactCategory::Any));
    }

    #[test]
    fn category_filter_matching() {
        assert!(Category::RotaryWing.matches(ContactCategory::RotaryWing));
        assert!(!Category::RotaryWing.matches(ContactCategory::FixedWing));
        assert!(Category::SurfaceToAirMissile.matches(ContactCategory::Any));
    }
}
