use glam::{Affine3A, Mat3, Quat, Vec3};

use super::point::Point;

/// Represents a transformation as translation + scale + rot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub scale: Vec3,
    pub rot: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

pub trait Transformer<T> {
    fn apply(&self, v: T) -> T;
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        scale: Vec3::ONE,
        rot: Quat::IDENTITY,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rot: Quat) -> Self {
        Self {
            rot,
            ..Self::IDENTITY
        }
    }

    pub fn into_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rot, self.translation)
    }

    /// Interpolate the components independently, rotations follow the shortest arc
    pub fn lerp(&self, other: &Transform, t: f32) -> Transform {
        Transform {
            translation: self.translation.lerp(other.translation, t),
            scale: self.scale.lerp(other.scale, t),
            rot: self.rot.slerp(other.rot, t),
        }
    }

    /// A degenerate scale cannot be inverted
    pub fn is_invertible(&self) -> bool {
        self.scale.abs().min_element() > f32::EPSILON && self.rot.is_finite()
    }
}

impl Transformer<Vec3> for Transform {
    /// Apply scale then rotation but not translation !
    fn apply(&self, v: Vec3) -> Vec3 {
        self.rot.mul_vec3(self.scale * v)
    }
}

impl Transformer<Point> for Transform {
    /// Apply scale then rotation then translation, same order as [Transform::into_affine]
    fn apply(&self, v: Point) -> Point {
        let scaled_rotated = self.rot.mul_vec3(self.scale * v.vec());
        Point(scaled_rotated) + self.translation
    }
}

/// An affine map together with what is needed to move rays and normals both ways
#[derive(Debug, Clone, Copy)]
pub struct AffinePair {
    pub to_world: Affine3A,
    pub to_local: Affine3A,
    /// Inverse transpose of the linear part of `to_world`
    normal_to_world: Mat3,
}

impl AffinePair {
    pub fn new(to_world: Affine3A) -> Self {
        let to_local = to_world.inverse();
        Self {
            to_world,
            to_local,
            normal_to_world: Mat3::from(to_local.matrix3).transpose(),
        }
    }

    pub fn point_to_local(&self, p: Point) -> Point {
        Point(self.to_local.transform_point3(p.vec()))
    }

    pub fn point_to_world(&self, p: Point) -> Point {
        Point(self.to_world.transform_point3(p.vec()))
    }

    pub fn vector_to_local(&self, v: Vec3) -> Vec3 {
        self.to_local.transform_vector3(v)
    }

    pub fn vector_to_world(&self, v: Vec3) -> Vec3 {
        self.to_world.transform_vector3(v)
    }

    pub fn normal_to_world(&self, n: Vec3) -> Vec3 {
        (self.normal_to_world * n).normalize_or_zero()
    }
}

impl From<Transform> for AffinePair {
    fn from(value: Transform) -> Self {
        AffinePair::new(value.into_affine())
    }
}

/// Represent an orthonormal frame
pub struct Frame {
    frame: Mat3,
}

impl Frame {
    /// Construct a Frame from a single vector using the algorithm described in
    /// “Building an Orthonormal Basis, Revisited (JCGT).” https://jcgt.org/published/0006/01/01/.
    /// n is expected to be normalized and will be used as the +z axis
    pub fn new(n: Vec3) -> Self {
        let sign = 1.0f32.copysign(n.z);
        let a = -1.0 / (sign + n.z);
        let b = n.x * n.y * a;

        Self {
            frame: Mat3::from_cols(
                Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x),
                Vec3::new(b, sign + n.y * n.y * a, -n.y),
                n,
            ),
        }
    }

    pub fn to_local(&self, global: Vec3) -> Vec3 {
        self.frame.transpose() * global
    }

    pub fn from_local(&self, local: Vec3) -> Vec3 {
        self.frame * local
    }

    pub fn x(&self) -> Vec3 {
        self.frame.col(0)
    }
    pub fn y(&self) -> Vec3 {
        self.frame.col(1)
    }
    pub fn z(&self) -> Vec3 {
        self.frame.col(2)
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use crate::math::point::Point;

    use super::{AffinePair, Frame, Transform, Transformer};

    #[test]
    fn frame_is_orthonormal() {
        for n in [
            Vec3::X,
            Vec3::NEG_Z,
            Vec3::new(0.3, -0.5, 0.8).normalize(),
            Vec3::new(-0.7, 0.1, -0.2).normalize(),
        ] {
            let f = Frame::new(n);
            assert!((f.x().length() - 1.0).abs() < 1e-5);
            assert!((f.y().length() - 1.0).abs() < 1e-5);
            assert!(f.x().dot(f.y()).abs() < 1e-5);
            assert!(f.x().dot(n).abs() < 1e-5);
            assert!(f.y().dot(n).abs() < 1e-5);
            assert_eq!(f.z(), n);

            let v = Vec3::new(0.2, 0.4, -0.1);
            assert!((f.from_local(f.to_local(v)) - v).length() < 1e-5);
        }
    }

    #[test]
    fn affine_pair_round_trip_and_normals() {
        let t = Transform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            scale: Vec3::new(2.0, 1.0, 1.0),
            rot: Quat::from_rotation_y(0.7),
        };
        let pair = AffinePair::from(t);
        let p = Point::new(0.5, -0.25, 4.0);
        let back = pair.point_to_world(pair.point_to_local(p));
        assert!(back.distance_squared(p) < 1e-8);
        assert!(pair.point_to_world(p).distance_squared(t.apply(p)) < 1e-8);

        // A normal stays orthogonal to a transformed tangent
        let tangent = Vec3::new(1.0, 1.0, 0.0);
        let normal = Vec3::new(1.0, -1.0, 0.0).normalize();
        let n = pair.normal_to_world(normal);
        assert!(n.dot(pair.vector_to_world(tangent)).abs() < 1e-5);
    }

    #[test]
    fn lerp_end_points() {
        let a = Transform::IDENTITY;
        let b = Transform::from_translation(Vec3::new(0.0, 4.0, 0.0));
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 0.5).translation, Vec3::new(0.0, 2.0, 0.0));
    }
}
