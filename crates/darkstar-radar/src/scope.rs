//! The radar scope: ingestion event loop and shared tactical state.

use std::sync::{Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;

use darkstar_core::geomag;
use darkstar_core::sim::{Faded, Started, Updated};
use darkstar_core::spatial::{self, Point};
use darkstar_core::trackfile::Trackfile;
use darkstar_core::Coalition;

use crate::db::ContactDatabase;

pub type FadedCallback = Box<dyn Fn(&Trackfile) + Send + Sync>;
pub type RemovedCallback = Box<dyn Fn(&Trackfile) + Send + Sync>;

/// Tunable policy for the scope. Defaults match fielded GCI doctrine.
#[derive(Debug, Clone)]
pub struct ScopeSettings {
    /// Maximum lateral spread between members of one group.
    pub group_spread_nm: f64,
    /// Maximum altitude difference between members of one group.
    pub group_altitude_band_ft: f64,
    /// Contacts at or below this speed are assumed parked or destroyed.
    pub speed_filter_kt: f64,
    /// Threat ring applied to every hostile group regardless of airframe.
    pub mandatory_threat_radius_nm: f64,
    /// Lateral distance at which friendlies and hostiles are merged.
    pub merge_radius_nm: f64,
    /// Mission-time age beyond which a silent trackfile is dropped.
    pub age_out: Duration,
    pub gc_interval: Duration,
    pub recenter_interval: Duration,
}

impl Default for ScopeSettings {
    fn default() -> Self {
        Self {
            group_spread_nm: 3.0,
            group_altitude_band_ft: 5_000.0,
            speed_filter_kt: 50.0,
            mandatory_threat_radius_nm: 25.0,
            merge_radius_nm: 3.0,
            age_out: Duration::from_secs(60),
            gc_interval: Duration::from_secs(60),
            recenter_interval: Duration::from_secs(5),
        }
    }
}

/// Consumes updates from the simulation, keeps a trackfile per contact and
/// answers the tactical queries defined alongside in this crate.
pub struct Scope {
    pub(crate) settings: ScopeSettings,
    pub(crate) contacts: ContactDatabase,
    bullseyes: DashMap<Coalition, Point>,
    mission_time: RwLock<DateTime<Utc>>,
    pub(crate) center: RwLock<Point>,
    faded_callback: Mutex<Option<FadedCallback>>,
    removed_callback: Mutex<Option<RemovedCallback>>,
}

impl Scope {
    pub fn new(settings: ScopeSettings) -> Self {
        Self {
            settings,
            contacts: ContactDatabase::new(),
            bullseyes: DashMap::new(),
            mission_time: RwLock::new(DateTime::UNIX_EPOCH),
            center: RwLock::new(Point::default()),
            faded_callback: Mutex::new(None),
            removed_callback: Mutex::new(None),
        }
    }

    /// Update the reference point for bullseye calls on the given coalition.
    pub fn set_bullseye(&self, bullseye: Point, coalition: Coalition) {
        let current = self.bullseye(coalition);
        if current != bullseye {
            tracing::info!(
                "updating {:?} bullseye to {:.4}, {:.4}",
                coalition,
                bullseye.lat,
                bullseye.lon
            );
        }
        self.bullseyes.insert(coalition, bullseye);
    }

    /// The bullseye point for the coalition, or the zero point if never set.
    pub fn bullseye(&self, coalition: Coalition) -> Point {
        self.bullseyes
            .get(&coalition)
            .map(|r| *r.value())
            .unwrap_or_default()
    }

    /// Mission time drives trackfile age-out and the declination model. It
    /// may jump on mission restart; never conflate it with wall time.
    pub fn set_mission_time(&self, time: DateTime<Utc>) {
        *self.mission_time.write().expect("mission time lock poisoned") = time;
    }

    pub fn mission_time(&self) -> DateTime<Utc> {
        *self.mission_time.read().expect("mission time lock poisoned")
    }

    /// Magnetic declination at the point, at mission time. Model failures
    /// are logged and degrade to zero declination (bearings stay true).
    pub fn declination(&self, point: Point) -> f64 {
        match geomag::declination(point, self.mission_time()) {
            Ok(d) => d,
            Err(err) => {
                tracing::error!("failed to get declination: {err}");
                0.0
            }
        }
    }

    /// Register the handler invoked when the simulator fades a contact.
    /// At most one handler; a later call replaces the earlier one.
    pub fn set_faded_callback(&self, callback: FadedCallback) {
        *self.faded_callback.lock().expect("callback lock poisoned") = Some(callback);
    }

    /// Register the handler invoked when a trackfile ages out.
    pub fn set_removed_callback(&self, callback: RemovedCallback) {
        *self.removed_callback.lock().expect("callback lock poisoned") = Some(callback);
    }

    /// Consume simulation events until the shutdown signal fires or every
    /// input stream closes.
    pub async fn run(
        &self,
        mut starts: mpsc::Receiver<Started>,
        mut updates: mpsc::Receiver<Updated>,
        mut fades: mpsc::Receiver<Faded>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        self.update_center_point();

        let mut gc_ticker = interval(self.settings.gc_interval);
        let mut recenter_ticker = interval(self.settings.recenter_interval);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("radar scope shutting down");
                    break;
                }
                maybe_start = starts.recv() => {
                    match maybe_start {
                        Some(start) => {
                            tracing::info!(
                                "clearing all trackfiles due to mission (re)start at {}",
                                start.mission_time
                            );
                            self.set_mission_time(start.mission_time);
                            self.contacts.reset();
                        }
                        None => break,
                    }
                }
                maybe_update = updates.recv() => {
                    match maybe_update {
                        Some(update) => self.handle_update(update),
                        None => break,
                    }
                }
                maybe_fade = fades.recv() => {
                    match maybe_fade {
                        Some(fade) => self.handle_fade(fade),
                        None => break,
                    }
                }
                _ = gc_ticker.tick() => self.handle_garbage_collection(),
                _ = recenter_ticker.tick() => self.update_center_point(),
            }
        }
    }

    pub(crate) fn handle_update(&self, update: Updated) {
        let id = update.labels.id;
        if !self.contacts.update(id, update.frame) {
            tracing::info!(
                "created new trackfile for {} ({}, id {})",
                update.labels.name,
                update.labels.acmi_name,
                id
            );
            self.contacts
                .set(Trackfile::with_frame(update.labels, update.frame));
        }
    }

    fn handle_fade(&self, fade: Faded) {
        let Some(trackfile) = self.contacts.delete(fade.unit_id) else {
            return;
        };
        tracing::debug!("contact {} faded", fade.unit_id);
        if let Some(callback) = self
            .faded_callback
            .lock()
            .expect("callback lock poisoned")
            .as_ref()
        {
            callback(&trackfile);
        }
    }

    /// Remove trackfiles that have not been updated for longer than the
    /// age-out window, in mission time.
    pub(crate) fn handle_garbage_collection(&self) {
        let mission_time = self.mission_time();
        let Ok(age_out) = chrono::Duration::from_std(self.settings.age_out) else {
            return;
        };
        for trackfile in self.contacts.values() {
            let Some(last_seen) = trackfile.last_known().map(|f| f.time) else {
                continue;
            };
            if last_seen < mission_time - age_out {
                let id = trackfile.id();
                let Some(removed) = self.contacts.delete(id) else {
                    continue;
                };
                tracing::info!(
                    "removed aged out trackfile {} ({}), last seen {}",
                    id,
                    removed.labels().name,
                    last_seen
                );
                if let Some(callback) = self
                    .removed_callback
                    .lock()
                    .expect("callback lock poisoned")
                    .as_ref()
                {
                    callback(&removed);
                }
            }
        }
    }

    /// Cache the centroid of all valid trackfiles as the picture anchor.
    pub(crate) fn update_center_point(&self) {
        let points: Vec<Point> = self
            .contacts
            .values()
            .iter()
            .filter(|tf| self.is_valid_track(tf))
            .filter_map(|tf| tf.last_known().map(|f| f.point))
            .collect();
        if points.is_empty() {
            return;
        }
        *self.center.write().expect("center lock poisoned") = spatial::centroid(&points);
    }

    /// A track is usable for queries when it has a real position and is
    /// moving faster than the parked/destroyed filter.
    pub(crate) fn is_valid_track(&self, trackfile: &Trackfile) -> bool {
        let Some(last) = trackfile.last_known() else {
            return false;
        };
        !last.point.is_zero() && trackfile.speed_kt() > self.settings.speed_filter_kt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use darkstar_core::trackfile::{Frame, Labels};

    fn updated(id: u64, lat: f64, lon: f64, secs: i64) -> Updated {
        Updated {
            labels: Labels {
                id,
                name: format!("Contact {id}"),
                acmi_name: "F-15C".into(),
                coalition: Coalition::Blue,
            },
            frame: Frame {
                point: Point::new(lat, lon),
                altitude_m: 8_000.0,
                heading_deg: 90.0,
                time: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
                    + chrono::Duration::seconds(secs),
            },
        }
    }

    #[test]
    fn update_creates_then_appends() {
        let scope = Scope::new(ScopeSettings::default());
        scope.handle_update(updated(1, 40.0, 30.0, 0));
        assert_eq!(scope.contacts.len(), 1);

        scope.handle_update(updated(1, 40.1, 30.0, 1));
        assert_eq!(scope.contacts.len(), 1);
        let tf = scope.contacts.get_by_id(1).unwrap();
        assert_eq!(tf.last_known().unwrap().point, Point::new(40.1, 30.0));
    }

    #[test]
    fn validity_requires_position_and_speed() {
        let scope = Scope::new(ScopeSettings::default());

        // Zero position: invalid no matter the speed
        scope.handle_update(updated(1, 0.0, 0.0, 0));
        let tf = scope.contacts.get_by_id(1).unwrap();
        assert!(!scope.is_valid_track(&tf));

        // Real position but stationary: invalid
        scope.handle_update(updated(2, 40.0, 30.0, 0));
        let tf = scope.contacts.get_by_id(2).unwrap();
        assert!(!scope.is_valid_track(&tf));

        // Moving fast: valid
        scope.handle_update(updated(3, 40.0, 30.0, 0));
        scope.handle_update(updated(3, 40.1, 30.0, 30));
        let tf = scope.contacts.get_by_id(3).unwrap();
        assert!(scope.is_valid_track(&tf));
    }

    #[test]
    fn speed_filter_boundary_is_strict() {
        let mut settings = ScopeSettings::default();
        let scope = Scope::new(settings.clone());
        scope.handle_update(updated(1, 40.0, 30.0, 0));
        scope.handle_update(updated(1, 40.1, 30.0, 60));
        let tf = scope.contacts.get_by_id(1).unwrap();
        let speed = tf.speed_kt();
        assert!(speed > 50.0);

        // A contact moving at exactly the filter speed is invalid; strictly
        // above is valid.
        settings.speed_filter_kt = speed;
        let at_filter = Scope::new(settings.clone());
        at_filter.handle_update(updated(1, 40.0, 30.0, 0));
        at_filter.handle_update(updated(1, 40.1, 30.0, 60));
        let tf = at_filter.contacts.get_by_id(1).unwrap();
        assert!(!at_filter.is_valid_track(&tf));

        settings.speed_filter_kt = speed - 0.0001;
        let below_filter = Scope::new(settings);
        below_filter.handle_update(updated(1, 40.0, 30.0, 0));
        below_filter.handle_update(updated(1, 40.1, 30.0, 60));
        let tf = below_filter.contacts.get_by_id(1).unwrap();
        assert!(below_filter.is_valid_track(&tf));
    }

    #[test]
    fn gc_removes_only_aged_trackfiles() {
        let scope = Scope::new(ScopeSettings::default());
        scope.handle_update(updated(1, 40.0, 30.0, 0));
        scope.handle_update(updated(2, 41.0, 30.0, 90));

        scope.set_mission_time(Utc.with_ymd_and_hms(2024, 6, 1, 12, 2, 0).unwrap());
        scope.handle_garbage_collection();

        assert!(scope.contacts.get_by_id(1).is_none(), "aged out");
        assert!(scope.contacts.get_by_id(2).is_some(), "still fresh");
    }

    #[test]
    fn unset_bullseye_is_zero_point() {
        let scope = Scope::new(ScopeSettings::default());
        assert!(scope.bullseye(Coalition::Red).is_zero());
    }
}
