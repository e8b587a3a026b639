//! Places tree markers over a panorama.
//!
//! The screen mapping here is a linear approximation calibrated against the
//! existing overlay; it does not reproduce the viewer's own perspective.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_FOV_HALF_WIDTH_DEG, DEFAULT_MAX_RANGE_M, FAR_MARKER_DROP_DEG, NEAR_MARKER_DISTANCE_M,
    NEAR_MARKER_LIFT_DEG,
};

use super::bearing::{bearing_degrees, distance_meters, relative_bearing};
use super::filter::{coarse_filter, covering_radius_deg};
use super::point::{Candidate, GeoPoint, Viewpoint};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FovParams {
    pub half_width_deg: f64,
    pub max_range_m: f64,
}

impl Default for FovParams {
    fn default() -> Self {
        Self {
            half_width_deg: DEFAULT_FOV_HALF_WIDTH_DEG,
            max_range_m: DEFAULT_MAX_RANGE_M,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldOfView {
    pub in_view: bool,
    /// Degrees from the heading, in `(-180, 180]`.
    pub relative_bearing: f64,
}

pub fn field_of_view(viewpoint: &Viewpoint, target: GeoPoint, fov: FovParams) -> FieldOfView {
    let bearing = bearing_degrees(viewpoint.position, target);
    let distance = distance_meters(viewpoint.position, target);
    let rel = relative_bearing(bearing, viewpoint.heading);

    FieldOfView {
        in_view: rel.abs() <= fov.half_width_deg && distance <= fov.max_range_m,
        relative_bearing: rel,
    }
}

/// Overlay position in percent of the panorama frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenAnchor {
    pub x_percent: f64,
    pub y_percent: f64,
}

/// Vertical offset in degrees: near trees float up, distant ones sink.
pub fn height_angle_estimate(distance_m: f64) -> f64 {
    if distance_m < NEAR_MARKER_DISTANCE_M {
        NEAR_MARKER_LIFT_DEG
    } else if distance_m < DEFAULT_MAX_RANGE_M {
        0.0
    } else {
        FAR_MARKER_DROP_DEG
    }
}

/// Maps absolute bearing and distance to a frame anchor.
///
/// Horizontal uses the absolute bearing, not the heading-relative one, so
/// anchors can fall outside 0..100 percent.
pub fn screen_anchor(bearing_deg: f64, distance_m: f64) -> ScreenAnchor {
    ScreenAnchor {
        x_percent: 50.0 + (bearing_deg / 180.0) * 50.0,
        y_percent: 50.0 - height_angle_estimate(distance_m),
    }
}

pub fn project_to_screen(candidate: &Candidate, viewpoint: &Viewpoint) -> ScreenAnchor {
    let bearing = bearing_degrees(viewpoint.position, candidate.position);
    let distance = distance_meters(viewpoint.position, candidate.position);
    screen_anchor(bearing, distance)
}

/// Where a tree lands horizontally in the captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FramePlacement {
    FarLeftEdge,
    LeftSide,
    Center,
    RightSide,
    FarRightEdge,
}

impl FramePlacement {
    pub fn from_relative_bearing(rel: f64) -> Self {
        if rel < -60.0 {
            FramePlacement::FarLeftEdge
        } else if rel < -20.0 {
            FramePlacement::LeftSide
        } else if rel < 20.0 {
            FramePlacement::Center
        } else if rel < 60.0 {
            FramePlacement::RightSide
        } else {
            FramePlacement::FarRightEdge
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            FramePlacement::FarLeftEdge => "far left edge",
            FramePlacement::LeftSide => "left side",
            FramePlacement::Center => "center",
            FramePlacement::RightSide => "right side",
            FramePlacement::FarRightEdge => "far right edge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceBand {
    VeryClose,
    Close,
    Distant,
}

impl DistanceBand {
    pub fn from_distance(distance_m: f64) -> Self {
        if distance_m < 10.0 {
            DistanceBand::VeryClose
        } else if distance_m < 25.0 {
            DistanceBand::Close
        } else {
            DistanceBand::Distant
        }
    }
}

/// Derived per-view marker. Recomputed on every viewpoint change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedMarker {
    pub candidate_id: u64,
    pub species: String,
    pub position: GeoPoint,
    pub bearing_degrees: f64,
    pub relative_bearing: f64,
    pub distance_meters: f64,
    pub in_view: bool,
    pub screen_anchor: ScreenAnchor,
    pub placement: FramePlacement,
    pub distance_band: DistanceBand,
}

pub fn project_marker(viewpoint: &Viewpoint, candidate: &Candidate, fov: FovParams) -> ProjectedMarker {
    let bearing = bearing_degrees(viewpoint.position, candidate.position);
    let distance = distance_meters(viewpoint.position, candidate.position);
    let rel = relative_bearing(bearing, viewpoint.heading);

    ProjectedMarker {
        candidate_id: candidate.id,
        species: candidate.species.clone(),
        position: candidate.position,
        bearing_degrees: bearing,
        relative_bearing: rel,
        distance_meters: distance,
        in_view: rel.abs() <= fov.half_width_deg && distance <= fov.max_range_m,
        screen_anchor: screen_anchor(bearing, distance),
        placement: FramePlacement::from_relative_bearing(rel),
        distance_band: DistanceBand::from_distance(distance),
    }
}

/// Markers for every candidate within range of the viewpoint, in input order.
/// Candidates outside the heading window are kept with `in_view == false`.
pub fn project_markers(
    viewpoint: &Viewpoint,
    candidates: &[Candidate],
    fov: FovParams,
) -> Vec<ProjectedMarker> {
    let radius_deg = covering_radius_deg(viewpoint.position, fov.max_range_m);
    coarse_filter(candidates, viewpoint.position, radius_deg)
        .into_iter()
        .map(|candidate| project_marker(viewpoint, candidate, fov))
        .filter(|marker| marker.distance_meters <= fov.max_range_m)
        .collect()
}

pub fn visible_markers(
    viewpoint: &Viewpoint,
    candidates: &[Candidate],
    fov: FovParams,
) -> Vec<ProjectedMarker> {
    project_markers(viewpoint, candidates, fov)
        .into_iter()
        .filter(|marker| marker.in_view)
        .collect()
}
