use glam::{Quat, Vec3};

/// Rigid bone transform: a unit rotation followed by an offset.
///
/// Bones carry no scale. A point `p` in the bone's frame maps to
/// `rotation * p + offset` in the parent's frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneTransform {
    pub rotation: Quat,
    pub offset: Vec3,
}

impl BoneTransform {
    pub const IDENTITY: Self = Self {
        rotation: Quat::IDENTITY,
        offset: Vec3::ZERO,
    };

    #[inline]
    #[must_use]
    pub fn new(rotation: Quat, offset: Vec3) -> Self {
        Self { rotation, offset }
    }

    #[inline]
    #[must_use]
    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            offset: Vec3::ZERO,
        }
    }

    #[inline]
    #[must_use]
    pub fn from_offset(offset: Vec3) -> Self {
        Self {
            rotation: Quat::IDENTITY,
            offset,
        }
    }

    /// Composes `self ∘ child`: the child transform expressed in this
    /// transform's parent frame.
    ///
    /// rotation = self.rotation * child.rotation
    /// offset   = self.offset + self.rotation * child.offset
    #[inline]
    #[must_use]
    pub fn compose(&self, child: &Self) -> Self {
        Self {
            rotation: self.rotation * child.rotation,
            offset: self.offset + self.rotation * child.offset,
        }
    }

    /// Inverse of a rigid transform. `rotation` must be unit length.
    #[inline]
    #[must_use]
    pub fn inverse(&self) -> Self {
        let inv_rotation = self.rotation.conjugate();
        Self {
            rotation: inv_rotation,
            offset: -(inv_rotation * self.offset),
        }
    }

    /// Solves `self ∘ x = target` for `x`, i.e. `self⁻¹ ∘ target`.
    ///
    /// Used to back out a local transform from a parent's absolute
    /// transform, and to express an animated pose relative to a rest pose.
    #[inline]
    #[must_use]
    pub fn relative(&self, target: &Self) -> Self {
        let inv_rotation = self.rotation.conjugate();
        Self {
            rotation: inv_rotation * target.rotation,
            offset: inv_rotation * (target.offset - self.offset),
        }
    }

    /// Transforms a point from this bone's frame into the parent frame.
    #[inline]
    #[must_use]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.offset
    }
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn vec3_approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    fn quat_approx(a: Quat, b: Quat) -> bool {
        1.0 - a.dot(b).abs() < 1e-5
    }

    #[test]
    fn test_compose_then_relative_recovers_child() {
        let parent = BoneTransform::new(Quat::from_rotation_z(FRAC_PI_2), Vec3::new(1.0, 2.0, 3.0));
        let child = BoneTransform::new(Quat::from_rotation_x(0.3), Vec3::new(0.5, 0.0, -1.0));

        let absolute = parent.compose(&child);
        let recovered = parent.relative(&absolute);

        assert!(quat_approx(recovered.rotation, child.rotation));
        assert!(vec3_approx(recovered.offset, child.offset));
    }

    #[test]
    fn test_inverse_cancels() {
        let t = BoneTransform::new(Quat::from_rotation_y(1.1), Vec3::new(-2.0, 0.5, 4.0));
        let identity = t.compose(&t.inverse());
        assert!(quat_approx(identity.rotation, Quat::IDENTITY));
        assert!(vec3_approx(identity.offset, Vec3::ZERO));
    }

    #[test]
    fn test_from_rotation_has_no_offset() {
        let t = BoneTransform::from_rotation(Quat::from_rotation_z(FRAC_PI_2));
        assert_eq!(t.offset, Vec3::ZERO);
        assert!(vec3_approx(t.transform_point(Vec3::X), Vec3::Y));
    }

    #[test]
    fn test_transform_point() {
        let t = BoneTransform::new(Quat::from_rotation_z(FRAC_PI_2), Vec3::new(0.0, 0.0, 1.0));
        assert!(vec3_approx(t.transform_point(Vec3::X), Vec3::new(0.0, 1.0, 1.0)));
    }
}
