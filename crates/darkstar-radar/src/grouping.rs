//! Clustering of trackfiles into tactical groups.

use darkstar_core::brevity::{ContactCategory, Group};
use darkstar_core::encyclopedia::{self, Category};
use darkstar_core::spatial::{self, Point};
use darkstar_core::trackfile::Trackfile;

use crate::scope::ScopeSettings;

/// Two contacts fly as one group when they share an airframe and are close
/// both laterally and vertically.
fn same_group(a: &Trackfile, b: &Trackfile, settings: &ScopeSettings) -> bool {
    if a.labels().acmi_name != b.labels().acmi_name {
        return false;
    }
    let (Some(fa), Some(fb)) = (a.last_known(), b.last_known()) else {
        return false;
    };
    if spatial::distance_nm(fa.point, fb.point) > settings.group_spread_nm {
        return false;
    }
    let alt_delta_ft = (fa.altitude_m - fb.altitude_m).abs() * spatial::FEET_PER_METER;
    alt_delta_ft <= settings.group_altitude_band_ft
}

/// Partition candidates into groups by transitive closure of [`same_group`].
pub(crate) fn cluster(candidates: Vec<Trackfile>, settings: &ScopeSettings) -> Vec<Vec<Trackfile>> {
    let mut clusters: Vec<Vec<Trackfile>> = Vec::new();
    let mut remaining = candidates;

    while let Some(seed) = remaining.pop() {
        let mut members = vec![seed];
        // Grow the cluster until no remaining candidate touches it
        loop {
            let mut grew = false;
            let mut i = 0;
            while i < remaining.len() {
                let touches = members
                    .iter()
                    .any(|m| same_group(m, &remaining[i], settings));
                if touches {
                    members.push(remaining.swap_remove(i));
                    grew = true;
                } else {
                    i += 1;
                }
            }
            if !grew {
                break;
            }
        }
        clusters.push(members);
    }

    clusters
}

/// Aggregate one cluster into a [`Group`]. BRAA and bullseye start unset;
/// the query layer fills whichever the caller asked for.
pub(crate) fn build_group(members: &[Trackfile]) -> Group {
    let frames: Vec<_> = members.iter().filter_map(|m| m.last_known()).collect();
    let points: Vec<Point> = frames.iter().map(|f| f.point).collect();
    let headings: Vec<f64> = frames.iter().map(|f| f.heading_deg).collect();
    let altitude_ft = if frames.is_empty() {
        0.0
    } else {
        frames.iter().map(|f| f.altitude_m).sum::<f64>() / frames.len() as f64
            * spatial::FEET_PER_METER
    };

    let platform = members
        .first()
        .map(|m| m.labels().acmi_name.clone())
        .unwrap_or_default();

    let mut unit_ids: Vec<u64> = members.iter().map(|m| m.id()).collect();
    unit_ids.sort_unstable();

    Group {
        contacts: members.len(),
        unit_ids,
        point: spatial::centroid(&points),
        altitude_ft,
        heading_deg: spatial::mean_heading_deg(&headings),
        category: platform_category(&platform),
        platform,
        braa: None,
        bullseye: None,
    }
}

fn platform_category(acmi_name: &str) -> ContactCategory {
    match encyclopedia::lookup(acmi_name).map(|d| d.category) {
        Some(Category::FixedWing) => ContactCategory::FixedWing,
        Some(Category::RotaryWing) => ContactCategory::RotaryWing,
        Some(Category::SurfaceToAirMissile) => ContactCategory::SurfaceToAirMissile,
        // Unclassified or unlisted airframes stay unfiltered
        Some(Category::Unknown) | None => ContactCategory::Any,
    }
}

/// Whether a group can credibly threaten friendlies. Unlisted airframes are
/// assumed dangerous until identified.
pub(crate) fn threat_capable(group: &Group) -> bool {
    match encyclopedia::lookup(&group.platform) {
        Some(data) => data.threat_radius_nm > 0.0,
        None => true,
    }
}

/// Threat ring for the group's airframe, floored by the mandatory radius.
pub(crate) fn threat_radius_nm(group: &Group, settings: &ScopeSettings) -> f64 {
    let airframe = encyclopedia::lookup(&group.platform)
        .map(|d| d.threat_radius_nm)
        .unwrap_or(0.0);
    airframe.max(settings.mandatory_threat_radius_nm)
}
