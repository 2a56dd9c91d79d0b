//! Geographic helpers: great-circle distance, heading, easing and interpolation.
//!
//! Everything here is a pure function over plain `(lat, lng)` degrees. Movement
//! between stops is a straight blend of coordinates, not a road path.

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two coordinates given in degrees.
///
/// Symmetric in its arguments and exactly `0.0` for identical points.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1) = (lat1.to_radians(), lon1.to_radians());
    let (lat2, lon2) = (lat2.to_radians(), lon2.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Heading in degrees `[0, 360)` from one coordinate toward another.
///
/// Uses the planar `atan2(Δlng, Δlat)` approximation, so 0 is north and 90 is
/// east. Identical points yield `0.0`.
pub fn heading_degrees(from_lat: f64, from_lng: f64, to_lat: f64, to_lng: f64) -> f64 {
    let dlng = to_lng - from_lng;
    let dlat = to_lat - from_lat;
    let heading = (dlng.atan2(dlat).to_degrees() + 360.0) % 360.0;
    if heading >= 360.0 {
        0.0
    } else {
        heading
    }
}

/// Quadratic ease-in-out. Input is clamped to `[0, 1]`.
pub fn ease(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

/// Linear blend of two coordinates by `fraction`.
pub fn interpolate(
    from_lat: f64,
    from_lng: f64,
    to_lat: f64,
    to_lng: f64,
    fraction: f64,
) -> (f64, f64) {
    (
        from_lat + (to_lat - from_lat) * fraction,
        from_lng + (to_lng - from_lng) * fraction,
    )
}

/// Minutes needed to cover `distance_km` at `speed_kmh`.
///
/// Returns `None` for a non-positive speed (a stopped vehicle has no ETA).
pub fn eta_minutes(distance_km: f64, speed_kmh: f64) -> Option<f64> {
    if speed_kmh <= 0.0 {
        return None;
    }
    Some(distance_km.max(0.0) / speed_kmh * 60.0)
}
