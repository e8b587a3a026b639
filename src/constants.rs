// Port configuration
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

// Spherical Earth model used by every distance and bearing computation
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

// Field of view used to decide whether a tree is drawn over the panorama
pub const DEFAULT_FOV_HALF_WIDTH_DEG: f64 = 60.0;
pub const DEFAULT_MAX_RANGE_M: f64 = 50.0;

// Coarse pre-filter radii in raw degrees, not meters
pub const LAYER_POINT_RADIUS_DEG: f64 = 0.001; // ~100m
pub const VULNERABILITY_RADIUS_DEG: f64 = 0.003;

// Marker height bands. Closer trees sit higher on the overlay.
pub const NEAR_MARKER_DISTANCE_M: f64 = 20.0;
pub const NEAR_MARKER_LIFT_DEG: f64 = 5.0;
pub const FAR_MARKER_DROP_DEG: f64 = -5.0;

// Street View capture parameters sent to the transform service
pub const DEFAULT_STREET_VIEW_FOV: f64 = 90.0;
pub const DEFAULT_SPECIES: &str = "maple";

// Air quality sampling: GRID x GRID cells => (GRID+1)^2 lookups
pub const AIR_QUALITY_GRID_SIZE: usize = 4;
pub const AIR_QUALITY_URL: &str = "https://airquality.googleapis.com/v1/currentConditions:lookup";

pub const BACKEND_TIMEOUT_SECS: u64 = 30;
