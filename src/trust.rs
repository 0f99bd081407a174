//! Decides whether the barometer can be believed this cycle.
//!
//! Dynamic pressure and vibration corrupt the barometer while the payload is
//! being pushed around, so pressure is only trusted when the net acceleration
//! (gravity already removed, in g) is small.

/// Strictly below `threshold`. Compared on squares so the boundary is exact.
pub fn is_trustworthy(acceleration: [f32; 3], threshold: f32) -> bool {
    let [x, y, z] = acceleration;
    x * x + y * y + z * z < threshold * threshold
}
