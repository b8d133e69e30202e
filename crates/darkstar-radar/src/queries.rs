//! Tactical query surface of the radar scope.
//!
//! Every query filters by coalition and contact category, drops invalid
//! tracks, clusters the survivors into groups and decorates the results
//! with BRAA or bullseye geometry. Bearings handed back are magnetic.

use std::cmp::Ordering;

use darkstar_core::brevity::{AltitudeBlock, Aspect, Braa, BullseyeCut, ContactCategory, Group};
use darkstar_core::encyclopedia;
use darkstar_core::spatial::{self, Point};
use darkstar_core::trackfile::Trackfile;
use darkstar_core::Coalition;

use crate::grouping;
use crate::scope::Scope;

impl Scope {
    /// The trackfile for the given unit ID, if any.
    pub fn find_unit(&self, unit_id: u64) -> Option<Trackfile> {
        self.contacts.get_by_id(unit_id)
    }

    /// The trackfile on the coalition whose display name most closely
    /// matches the given callsign. Returns the actual name alongside the
    /// trackfile; it may differ from the input.
    pub fn find_callsign(&self, callsign: &str, coalition: Coalition) -> Option<(String, Trackfile)> {
        let wanted = normalize_callsign(callsign);
        if wanted.is_empty() {
            return None;
        }

        let mut candidates: Vec<Trackfile> = self
            .contacts
            .values()
            .into_iter()
            .filter(|tf| tf.labels().coalition == coalition)
            .collect();
        candidates.sort_by(|a, b| a.labels().name.cmp(&b.labels().name));

        // Exact normalized match wins; otherwise accept a unique-enough
        // prefix ("Eagle 1" for "Eagle 1-1").
        for tf in &candidates {
            if normalize_callsign(&tf.labels().name) == wanted {
                return Some((tf.labels().name.clone(), tf.clone()));
            }
        }
        for tf in &candidates {
            if normalize_callsign(&tf.labels().name).starts_with(&wanted) {
                return Some((tf.labels().name.clone(), tf.clone()));
            }
        }
        None
    }

    /// A picture of the scope anchored at the cached center point. Returns
    /// the total group count and up to three priority groups, each with
    /// bullseye set for the calling coalition.
    pub fn picture(
        &self,
        radius_nm: f64,
        coalition: Coalition,
        category: ContactCategory,
    ) -> (usize, Vec<Group>) {
        let center = *self.center.read().expect("center lock poisoned");
        let mut groups = self.groups_near(
            center,
            radius_nm,
            AltitudeBlock::any(),
            coalition,
            category,
            &[],
        );
        let total = groups.len();

        let bullseye = self.bullseye(coalition);
        groups.sort_by(|a, b| {
            // Threat-capable groups outrank support assets; among those,
            // highest first, then closest to bullseye
            grouping::threat_capable(b)
                .cmp(&grouping::threat_capable(a))
                .then(
                    b.altitude_ft
                        .partial_cmp(&a.altitude_ft)
                        .unwrap_or(Ordering::Equal),
                )
                .then(
                    spatial::distance_nm(bullseye, a.point)
                        .partial_cmp(&spatial::distance_nm(bullseye, b.point))
                        .unwrap_or(Ordering::Equal),
                )
        });
        groups.truncate(3);
        for group in &mut groups {
            self.populate_bullseye(group, coalition);
        }

        (total, groups)
    }

    /// All matching groups within `radius_nm` of the point of interest,
    /// closest first, each with BRAA relative to `origin`.
    #[allow(clippy::too_many_arguments)]
    pub fn find_nearby_groups_with_braa(
        &self,
        origin: Point,
        point_of_interest: Point,
        altitude_block: AltitudeBlock,
        radius_nm: f64,
        coalition: Coalition,
        category: ContactCategory,
        excluded_ids: &[u64],
    ) -> Vec<Group> {
        let mut groups = self.groups_near(
            point_of_interest,
            radius_nm,
            altitude_block,
            coalition,
            category,
            excluded_ids,
        );
        for group in &mut groups {
            self.populate_braa(group, origin);
        }
        groups
    }

    /// All matching groups within `radius_nm` of the point of interest,
    /// closest first, each with bullseye set for the calling coalition.
    #[allow(clippy::too_many_arguments)]
    pub fn find_nearby_groups_with_bullseye(
        &self,
        point_of_interest: Point,
        altitude_block: AltitudeBlock,
        radius_nm: f64,
        coalition: Coalition,
        category: ContactCategory,
        excluded_ids: &[u64],
    ) -> Vec<Group> {
        let mut groups = self.groups_near(
            point_of_interest,
            radius_nm,
            altitude_block,
            coalition,
            category,
            excluded_ids,
        );
        for group in &mut groups {
            self.populate_bullseye(group, coalition);
        }
        groups
    }

    /// The nearest matching group to `origin`, with BRAA relative to
    /// `origin`. Ties break toward the lower unit ID.
    pub fn find_nearest_group_with_braa(
        &self,
        origin: Point,
        altitude_block: AltitudeBlock,
        radius_nm: f64,
        coalition: Coalition,
        category: ContactCategory,
    ) -> Option<Group> {
        let mut group = self
            .groups_near(origin, radius_nm, altitude_block, coalition, category, &[])
            .into_iter()
            .next()?;
        self.populate_braa(&mut group, origin);
        Some(group)
    }

    /// The nearest matching group to the point of interest, with bullseye
    /// set for the calling coalition.
    pub fn find_nearest_group_with_bullseye(
        &self,
        point_of_interest: Point,
        altitude_block: AltitudeBlock,
        radius_nm: f64,
        coalition: Coalition,
        category: ContactCategory,
    ) -> Option<Group> {
        let mut group = self
            .groups_near(
                point_of_interest,
                radius_nm,
                altitude_block,
                coalition,
                category,
                &[],
            )
            .into_iter()
            .next()?;
        self.populate_bullseye(&mut group, coalition);
        Some(group)
    }

    /// The nearest matching group inside a circular sector. The sector
    /// bearing comes from a human caller and is magnetic; the arc wraps
    /// through 360.
    #[allow(clippy::too_many_arguments)]
    pub fn find_nearest_group_in_sector(
        &self,
        origin: Point,
        altitude_block: AltitudeBlock,
        radius_nm: f64,
        bearing_magnetic_deg: f64,
        arc_deg: f64,
        coalition: Coalition,
        category: ContactCategory,
    ) -> Option<Group> {
        let sector_true = bearing_magnetic_deg + self.declination(origin);
        let mut groups =
            self.groups_near(origin, radius_nm, altitude_block, coalition, category, &[]);
        groups.retain(|g| {
            let bearing = spatial::bearing_deg(origin, g.point);
            spatial::angular_delta_deg(bearing, sector_true).abs() <= arc_deg / 2.0
        });
        let mut group = groups.into_iter().next()?;
        self.populate_braa(&mut group, origin);
        Some(group)
    }

    /// Hostile groups threatening friendlies of the coalition: every group
    /// of the opposing coalition paired with the friendly unit IDs inside
    /// its threat ring. Groups threatening nobody are omitted.
    pub fn threats(&self, coalition: Coalition) -> Vec<(Group, Vec<u64>)> {
        self.hostile_groups_against(coalition, |group| {
            grouping::threat_radius_nm(group, &self.settings)
        })
        .into_iter()
        .map(|(group, friendlies)| {
            let ids = friendlies.into_iter().map(|tf| tf.id()).collect();
            (group, ids)
        })
        .collect()
    }

    /// Hostile groups in a merge with friendlies of the coalition: every
    /// group of the opposing coalition paired with the friendly trackfiles
    /// within the merge radius. Groups merged with nobody are omitted.
    pub fn merges(&self, coalition: Coalition) -> Vec<(Group, Vec<Trackfile>)> {
        self.hostile_groups_against(coalition, |_| self.settings.merge_radius_nm)
    }

    fn hostile_groups_against(
        &self,
        coalition: Coalition,
        radius_nm: impl Fn(&Group) -> f64,
    ) -> Vec<(Group, Vec<Trackfile>)> {
        let friendlies =
            self.matching_trackfiles(coalition, ContactCategory::Any, &[]);
        let hostiles =
            self.matching_trackfiles(coalition.opposite(), ContactCategory::Any, &[]);

        let mut out = Vec::new();
        for members in grouping::cluster(hostiles, &self.settings) {
            let mut group = grouping::build_group(&members);
            let radius = radius_nm(&group);
            let inside: Vec<Trackfile> = friendlies
                .iter()
                .filter(|tf| {
                    tf.last_known()
                        .map(|f| spatial::distance_nm(group.point, f.point) <= radius)
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            if inside.is_empty() {
                continue;
            }
            self.populate_bullseye(&mut group, coalition);
            out.push((group, inside));
        }
        out.sort_by(|a, b| a.0.lowest_id().cmp(&b.0.lowest_id()));
        out
    }

    /// Candidates of the coalition passing validity and category filters.
    fn matching_trackfiles(
        &self,
        coalition: Coalition,
        category: ContactCategory,
        excluded_ids: &[u64],
    ) -> Vec<Trackfile> {
        self.contacts
            .values()
            .into_iter()
            .filter(|tf| tf.labels().coalition == coalition)
            .filter(|tf| !excluded_ids.contains(&tf.id()))
            .filter(|tf| self.is_valid_track(tf))
            .filter(|tf| {
                // Airframes missing from the encyclopedia match any filter
                encyclopedia::lookup(&tf.labels().acmi_name)
                    .map(|data| data.category.matches(category))
                    .unwrap_or(true)
            })
            .collect()
    }

    /// Matching groups whose centroid lies within `radius_nm` of `anchor`
    /// and inside the altitude block, closest first.
    fn groups_near(
        &self,
        anchor: Point,
        radius_nm: f64,
        altitude_block: AltitudeBlock,
        coalition: Coalition,
        category: ContactCategory,
        excluded_ids: &[u64],
    ) -> Vec<Group> {
        let candidates = self.matching_trackfiles(coalition, category, excluded_ids);
        let mut groups: Vec<Group> = grouping::cluster(candidates, &self.settings)
            .iter()
            .map(|members| grouping::build_group(members))
            .filter(|g| altitude_block.contains(g.altitude_ft))
            .filter(|g| spatial::distance_nm(anchor, g.point) <= radius_nm)
            .collect();
        groups.sort_by(|a, b| {
            spatial::distance_nm(anchor, a.point)
                .partial_cmp(&spatial::distance_nm(anchor, b.point))
                .unwrap_or(Ordering::Equal)
                .then(a.lowest_id().cmp(&b.lowest_id()))
        });
        groups
    }

    fn populate_braa(&self, group: &mut Group, origin: Point) {
        let bearing_true = spatial::bearing_deg(origin, group.point);
        let declination = self.declination(origin);
        group.braa = Some(Braa {
            bearing_deg: spatial::normalize_deg(bearing_true - declination),
            range_nm: spatial::distance_nm(origin, group.point),
            altitude_ft: group.altitude_ft,
            aspect: Aspect::from_geometry(bearing_true, group.heading_deg),
        });
    }

    fn populate_bullseye(&self, group: &mut Group, coalition: Coalition) {
        let bullseye = self.bullseye(coalition);
        let bearing_true = spatial::bearing_deg(bullseye, group.point);
        // Declination is taken at the group, where the fight is
        let declination = self.declination(group.point);
        group.bullseye = Some(BullseyeCut {
            bearing_deg: spatial::normalize_deg(bearing_true - declination),
            range_nm: spatial::distance_nm(bullseye, group.point),
        });
    }
}

fn normalize_callsign(callsign: &str) -> String {
    let mut out = String::with_capacity(callsign.len());
    let mut pending_space = false;
    for c in callsign.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_space = true;
        }
    }
    out
}
