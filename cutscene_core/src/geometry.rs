use glam::Vec3;

/// Unit vector on the ground plane for a heading in degrees.
pub fn heading_direction(heading_degrees: f32) -> Vec3 {
    let radians = heading_degrees.to_radians();
    Vec3::new(radians.cos(), radians.sin(), 0.0)
}

/// Heading in degrees from `from` towards `to`, normalised to `[0, 360)`.
pub fn heading_towards(from: Vec3, to: Vec3) -> Option<f32> {
    let delta = to - from;
    if delta.x.abs() + delta.y.abs() <= f32::EPSILON {
        return None;
    }
    Some(delta.y.atan2(delta.x).to_degrees().rem_euclid(360.0))
}

pub fn midpoint(a: Vec3, b: Vec3) -> Vec3 {
    (a + b) / 2.0
}
