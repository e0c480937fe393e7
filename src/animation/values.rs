use glam::{Quat, Vec3};

/// Values that can be interpolated between two keyframes.
pub trait Interpolatable: Copy + Sized {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self;
}

impl Interpolatable for Vec3 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.lerp(end, t)
    }
}

impl Interpolatable for Quat {
    /// Spherical interpolation along the shortest arc.
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.slerp(end, t)
    }
}

/// Interpolates between two samples, returning the endpoints exactly when
/// `t` is outside the open interval `(0, 1)`.
#[inline]
pub fn interpolate_clamped<T: Interpolatable>(start: T, end: T, t: f32) -> T {
    if t <= 0.0 {
        start
    } else if t >= 1.0 {
        end
    } else {
        T::interpolate_linear(start, end, t)
    }
}
