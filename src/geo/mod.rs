pub mod bearing;
pub mod filter;
pub mod point;
pub mod projection;

pub use bearing::{
    bearing_degrees, checked_bearing_degrees, distance_meters, normalize_degrees, relative_bearing,
};
pub use filter::{coarse_filter, covering_radius_deg, degree_distance, find_nearby, proximity_filter};
pub use point::{Candidate, GeoPoint, Located, Viewpoint};
pub use projection::{
    field_of_view, project_marker, project_markers, project_to_screen, visible_markers,
    DistanceBand, FieldOfView, FovParams, FramePlacement, ProjectedMarker, ScreenAnchor,
};
