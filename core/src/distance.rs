use stratotrack_shared::GeoPosition;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Straight-line (great-circle) distance between two positions in meters,
/// haversine on a spherical Earth. Plenty for "how far away is the
/// balloon" read-outs; nobody is surveying with this.
pub fn great_circle_distance_m(a: &GeoPosition, b: &GeoPosition) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let dphi = (b.latitude - a.latitude).to_radians();
    let dlambda = (b.longitude - a.longitude).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}
