use serde::{Deserialize, Serialize};

use crate::database::CandidateStore;
use crate::geo::{normalize_degrees, project_markers, FovParams, ProjectedMarker, Viewpoint};

/// Hashable snapshot of a viewpoint.
///
/// Position is kept to 6 decimals (~0.1m) and angles to 0.1 degree, so
/// jitter from the viewer does not produce distinct keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewKey {
    lat_e6: i64,
    lng_e6: i64,
    heading_d10: i32,
    pitch_d10: i32,
}

impl ViewKey {
    pub fn of(viewpoint: &Viewpoint) -> Self {
        // Round the heading first so 359.96 and 0.0 share a key
        let heading_d10 = (normalize_degrees(viewpoint.heading) * 10.0).round() as i32 % 3600;
        Self {
            lat_e6: (viewpoint.position.latitude * 1e6).round() as i64,
            lng_e6: (viewpoint.position.longitude * 1e6).round() as i64,
            heading_d10,
            pitch_d10: (viewpoint.pitch * 10.0).round() as i32,
        }
    }

    /// Key of the panorama location only, ignoring look direction.
    pub fn location_key(&self) -> (i64, i64) {
        (self.lat_e6, self.lng_e6)
    }
}

/// The current panorama view, owned by whoever drives the viewer.
#[derive(Debug, Clone, Default)]
pub struct PanoramaSession {
    viewpoint: Option<Viewpoint>,
    revision: u64,
}

impl PanoramaSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewpoint(&self) -> Option<&Viewpoint> {
        self.viewpoint.as_ref()
    }

    pub fn current_key(&self) -> Option<ViewKey> {
        self.viewpoint.as_ref().map(ViewKey::of)
    }

    /// Number of viewpoint updates applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn update(&mut self, viewpoint: Viewpoint) -> ViewKey {
        self.viewpoint = Some(viewpoint);
        self.revision += 1;
        ViewKey::of(&viewpoint)
    }

    /// True if a location change happened between the two keys, i.e.
    /// the previous location's results should be discarded.
    pub fn moved_since(&self, key: &ViewKey) -> bool {
        self.current_key()
            .map(|current| current.location_key() != key.location_key())
            .unwrap_or(true)
    }

    pub fn is_current(&self, key: &ViewKey) -> bool {
        self.current_key().as_ref() == Some(key)
    }

    pub fn close(&mut self) {
        self.viewpoint = None;
    }

    /// Fresh markers for every tree within range of the current view.
    pub fn markers(&self, store: &CandidateStore, fov: FovParams) -> Vec<ProjectedMarker> {
        match self.viewpoint {
            Some(ref vp) => {
                let nearby = store.nearby(vp.position, fov.max_range_m);
                project_markers(vp, &nearby, fov)
            }
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;

    fn vp(lat: f64, lng: f64, heading: f64) -> Viewpoint {
        Viewpoint::new(GeoPoint::new_unchecked(lat, lng), heading, 0.0)
    }

    #[test]
    fn view_key_ignores_sub_threshold_jitter() {
        let a = ViewKey::of(&vp(49.2827001, -123.1207001, 10.01));
        let b = ViewKey::of(&vp(49.2827002, -123.1207, 10.04));
        assert_eq!(a, b);
        assert_ne!(a, ViewKey::of(&vp(49.2827, -123.1207, 10.2)));
    }

    #[test]
    fn view_key_wraps_heading() {
        assert_eq!(
            ViewKey::of(&vp(1.0, 1.0, 359.96)),
            ViewKey::of(&vp(1.0, 1.0, 0.0))
        );
    }

    #[test]
    fn empty_session_has_no_markers() {
        let session = PanoramaSession::new();
        let store = CandidateStore::new();
        store.insert(GeoPoint::new_unchecked(49.2830, -123.1207), "oak").unwrap();
        assert!(session.markers(&store, FovParams::default()).is_empty());
        assert_eq!(session.current_key(), None);
    }

    #[test]
    fn markers_follow_the_latest_viewpoint() {
        let store = CandidateStore::new();
        store.insert(GeoPoint::new_unchecked(49.2830, -123.1207), "oak").unwrap();

        let mut session = PanoramaSession::new();
        session.update(vp(49.2827, -123.1207, 0.0));
        let markers = session.markers(&store, FovParams::default());
        assert_eq!(markers.len(), 1);
        assert!(markers[0].in_view);

        session.update(vp(49.2827, -123.1207, 180.0));
        let markers = session.markers(&store, FovParams::default());
        assert!(!markers[0].in_view);

        // Moving away drops the tree entirely
        session.update(vp(49.2900, -123.1207, 0.0));
        assert!(session.markers(&store, FovParams::default()).is_empty());
        assert_eq!(session.revision(), 3);
    }

    #[test]
    fn markers_cross_the_antimeridian() {
        let store = CandidateStore::new();
        store.insert(GeoPoint::new_unchecked(0.0001, -179.9999), "oak").unwrap();

        let mut session = PanoramaSession::new();
        session.update(vp(0.0, 179.9999, 60.0));
        let markers = session.markers(&store, FovParams::default());
        assert_eq!(markers.len(), 1);
        assert!(markers[0].in_view);
    }

    #[test]
    fn stale_keys_are_detected() {
        let mut session = PanoramaSession::new();
        let first = session.update(vp(49.2827, -123.1207, 0.0));
        assert!(session.is_current(&first));

        let turned = session.update(vp(49.2827, -123.1207, 90.0));
        assert!(!session.is_current(&first));
        assert!(!session.moved_since(&first));

        session.update(vp(49.3, -123.1, 90.0));
        assert!(session.moved_since(&turned));

        session.close();
        assert!(session.moved_since(&turned));
    }
}
