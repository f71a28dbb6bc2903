//! Joints of the kinematic tree and their coordinate layout.

use rbc_math::{Mat3, Quat, SpatialTransform, SpatialVec, Vec3};

/// Kind of joint, which fixes how many coordinates it owns.
///
/// Quaternion joints (`Spherical`, `Free`) store one more position
/// coordinate than they have DOF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointType {
    Revolute,
    Prismatic,
    /// Ball joint, orientation stored as `[w, x, y, z]`.
    Spherical,
    /// Rotation about Z plus translation in the XY plane.
    Planar,
    /// Floating base: `[w, x, y, z, px, py, pz]`, velocity `[ω; v]`.
    Free,
    Fixed,
}

impl JointType {
    pub fn nq(&self) -> usize {
        match self {
            Self::Revolute | Self::Prismatic => 1,
            Self::Planar => 3,
            Self::Spherical => 4,
            Self::Free => 7,
            Self::Fixed => 0,
        }
    }

    pub fn nv(&self) -> usize {
        match self {
            Self::Revolute | Self::Prismatic => 1,
            Self::Spherical | Self::Planar => 3,
            Self::Free => 6,
            Self::Fixed => 0,
        }
    }
}

/// Link between a body and its parent, with an optional geared actuator.
#[derive(Debug, Clone)]
pub struct Joint {
    /// Shown in diagnostics; the builder fills it with the body name.
    pub name: String,
    pub joint_type: JointType,
    /// Constant placement of the joint frame in the parent body frame.
    pub parent_to_joint: SpatialTransform,
    /// Unit motion axis of revolute and prismatic joints, unused otherwise.
    pub axis: Vec3,
    pub rotor_inertia: f64,
    pub gear_ratio: f64,
}

impl Joint {
    fn of_type(joint_type: JointType, parent_to_joint: SpatialTransform, axis: Vec3) -> Self {
        Self {
            name: String::new(),
            joint_type,
            parent_to_joint,
            axis,
            rotor_inertia: 0.0,
            gear_ratio: 1.0,
        }
    }

    /// Hinge about the joint frame's Z axis.
    pub fn revolute(parent_to_joint: SpatialTransform) -> Self {
        Self::of_type(JointType::Revolute, parent_to_joint, Vec3::z())
    }

    /// Slider along `axis`, which must have unit length.
    pub fn prismatic(parent_to_joint: SpatialTransform, axis: Vec3) -> Self {
        Self::of_type(JointType::Prismatic, parent_to_joint, axis)
    }

    pub fn spherical(parent_to_joint: SpatialTransform) -> Self {
        Self::of_type(JointType::Spherical, parent_to_joint, Vec3::zeros())
    }

    pub fn planar(parent_to_joint: SpatialTransform) -> Self {
        Self::of_type(JointType::Planar, parent_to_joint, Vec3::zeros())
    }

    pub fn free(parent_to_joint: SpatialTransform) -> Self {
        Self::of_type(JointType::Free, parent_to_joint, Vec3::zeros())
    }

    pub fn fixed(parent_to_joint: SpatialTransform) -> Self {
        Self::of_type(JointType::Fixed, parent_to_joint, Vec3::zeros())
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Attach an actuator whose rotor inertia is seen through `gear_ratio`.
    pub fn with_rotor(mut self, rotor_inertia: f64, gear_ratio: f64) -> Self {
        self.rotor_inertia = rotor_inertia;
        self.gear_ratio = gear_ratio;
        self
    }

    pub fn nq(&self) -> usize {
        self.joint_type.nq()
    }

    pub fn ndof(&self) -> usize {
        self.joint_type.nv()
    }

    /// Reflected rotor inertia `gear_ratio² · rotor_inertia`.
    pub fn reflected_rotor_inertia(&self) -> f64 {
        self.gear_ratio * self.gear_ratio * self.rotor_inertia
    }

    /// Write the zero configuration (identity rotation) into `q`.
    pub fn zero_position(&self, q: &mut [f64]) {
        q.iter_mut().for_each(|x| *x = 0.0);
        if matches!(self.joint_type, JointType::Spherical | JointType::Free) {
            q[0] = 1.0;
        }
    }

    /// Transform from the joint frame to the body frame at position `q`.
    ///
    /// Panics if `q` is shorter than [`nq`](Self::nq).
    pub fn joint_transform(&self, q: &[f64]) -> SpatialTransform {
        match self.joint_type {
            JointType::Revolute => {
                // coordinate transform, hence the negated angle
                let (s, c) = (-q[0]).sin_cos();
                let ax = rbc_math::skew(&self.axis);
                let rot = Mat3::identity() + ax * s + ax * ax * (1.0 - c);
                SpatialTransform::new(rot, Vec3::zeros())
            }
            JointType::Prismatic => SpatialTransform::translation(self.axis * q[0]),
            JointType::Spherical => {
                let rot = Quat::from_slice(q).normalize().to_matrix();
                SpatialTransform::new(rot.transpose(), Vec3::zeros())
            }
            JointType::Planar => {
                let xf = SpatialTransform::rot_z(q[0]);
                SpatialTransform::new(xf.rot, Vec3::new(q[1], q[2], 0.0))
            }
            JointType::Free => {
                let rot = Quat::from_slice(&q[..4]).normalize().to_matrix();
                SpatialTransform::new(rot.transpose(), Vec3::new(q[4], q[5], q[6]))
            }
            JointType::Fixed => SpatialTransform::identity(),
        }
    }

    /// Column `k` of the motion subspace, in the successor frame.
    pub fn motion_subspace_column(&self, k: usize) -> SpatialVec {
        let e = |i: usize| {
            let mut v = SpatialVec::zero();
            v.data[i] = 1.0;
            v
        };
        match self.joint_type {
            JointType::Revolute => SpatialVec::new(self.axis, Vec3::zeros()),
            JointType::Prismatic => SpatialVec::new(Vec3::zeros(), self.axis),
            JointType::Spherical => e(k),
            JointType::Planar => e([2, 3, 4][k]),
            JointType::Free => e(k),
            JointType::Fixed => SpatialVec::zero(),
        }
    }

    /// Joint velocity `S · α` in the successor frame.
    pub fn joint_velocity(&self, alpha: &[f64]) -> SpatialVec {
        (0..self.ndof()).fold(SpatialVec::zero(), |acc, k| {
            acc + self.motion_subspace_column(k) * alpha[k]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dimensions_per_type() {
        let id = SpatialTransform::identity();
        let cases = [
            (Joint::revolute(id), 1, 1),
            (Joint::prismatic(id, Vec3::x()), 1, 1),
            (Joint::spherical(id), 4, 3),
            (Joint::planar(id), 3, 3),
            (Joint::free(id), 7, 6),
            (Joint::fixed(id), 0, 0),
        ];
        for (joint, nq, nv) in cases {
            assert_eq!(joint.nq(), nq, "{:?}", joint.joint_type);
            assert_eq!(joint.ndof(), nv, "{:?}", joint.joint_type);
            let alpha = vec![1.0; nv];
            let expected = (0..nv).map(|k| joint.motion_subspace_column(k).data.norm_squared());
            assert_eq!(joint.joint_velocity(&alpha).data.norm_squared(), expected.sum::<f64>());
        }
    }

    #[test]
    fn test_revolute_transform_is_passive() {
        let joint = Joint::revolute(SpatialTransform::identity());
        let xf = joint.joint_transform(&[0.3]);
        assert_relative_eq!(xf.rot, SpatialTransform::rot_z(0.3).rot, epsilon = 1e-12);
    }

    #[test]
    fn test_spherical_identity_quaternion() {
        let joint = Joint::spherical(SpatialTransform::identity());
        let mut q = [0.0; 4];
        joint.zero_position(&mut q);
        assert_eq!(q, [1.0, 0.0, 0.0, 0.0]);
        let xf = joint.joint_transform(&q);
        assert_relative_eq!(xf.rot, Mat3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_free_transform_translation() {
        let joint = Joint::free(SpatialTransform::identity());
        let xf = joint.joint_transform(&[1.0, 0.0, 0.0, 0.0, 0.5, -1.0, 2.0]);
        assert_relative_eq!(xf.pos, Vec3::new(0.5, -1.0, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_planar_subspace_columns() {
        let joint = Joint::planar(SpatialTransform::identity());
        let v = joint.joint_velocity(&[2.0, 3.0, 4.0]);
        assert_relative_eq!(v.angular(), Vec3::new(0.0, 0.0, 2.0));
        assert_relative_eq!(v.linear(), Vec3::new(3.0, 4.0, 0.0));
    }

    #[test]
    fn test_reflected_rotor_inertia() {
        let joint = Joint::revolute(SpatialTransform::identity()).with_rotor(0.01, 100.0);
        assert_relative_eq!(joint.reflected_rotor_inertia(), 100.0, epsilon = 1e-9);
    }
}
