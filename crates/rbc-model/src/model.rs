//! Kinematic tree of an articulated robot and the builder that validates it.

use crate::{Body, Joint, JointType, ModelError, Result, State};
use rbc_math::{GRAVITY, SpatialInertia, SpatialTransform, Vec3};

/// Topology and mass parameters of a robot. Bodies are stored parents first.
///
/// `q_offsets[j]` and `v_offsets[j]` locate joint `j` inside the position
/// vector (length `nq`) and inside every DOF-sized vector (length `nv`).
#[derive(Debug, Clone)]
pub struct Model {
    pub bodies: Vec<Body>,
    pub joints: Vec<Joint>,
    /// World-frame gravity copied into every new [`State`].
    pub gravity: Vec3,
    pub nq: usize,
    pub nv: usize,
    pub q_offsets: Vec<usize>,
    pub v_offsets: Vec<usize>,
}

impl Model {
    /// State at rest in the zero configuration. Quaternion joints start at identity.
    pub fn default_state(&self) -> State {
        let mut state = State::new(self.nq, self.nv, self.nbodies());
        state.gravity = self.gravity;
        let q = state.q.as_mut_slice();
        for (joint, &start) in self.joints.iter().zip(&self.q_offsets) {
            joint.zero_position(&mut q[start..start + joint.nq()]);
        }
        state
    }

    pub fn nbodies(&self) -> usize {
        self.bodies.len()
    }

    /// First DOF index of joint `joint_idx`.
    pub fn joint_pos_in_dof(&self, joint_idx: usize) -> usize {
        self.v_offsets[joint_idx]
    }

    pub fn body_index(&self, name: &str) -> Option<usize> {
        self.bodies.iter().position(|b| b.name == name)
    }

    /// Bodies between `i` and the world, nearest first, `i` itself excluded.
    pub fn ancestors(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.bodies[i].parent_index(), move |&j| {
            self.bodies[j].parent_index()
        })
    }
}

/// Incremental construction of a [`Model`].
///
/// Each `add_*_body` call appends one body and the joint linking it to
/// `parent` (a body index, or `-1` for the world). `parent_to_joint` places
/// the joint frame in the parent frame and `inertia` is given in the new
/// body's frame. Gravity defaults to `-9.81` along world Z.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    bodies: Vec<Body>,
    joints: Vec<Joint>,
    gravity: Vec3,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self {
            bodies: vec![],
            joints: vec![],
            gravity: -Vec3::z() * GRAVITY,
        }
    }

    pub fn gravity(self, gravity: Vec3) -> Self {
        Self { gravity, ..self }
    }

    /// One DOF about the joint frame's Z axis.
    pub fn add_revolute_body(
        self,
        name: &str,
        parent: i32,
        parent_to_joint: SpatialTransform,
        inertia: SpatialInertia,
    ) -> Self {
        self.add_body(name, parent, Joint::revolute(parent_to_joint), inertia)
    }

    /// One DOF along the unit vector `axis`; other lengths are rejected by [`build`](Self::build).
    pub fn add_prismatic_body(
        self,
        name: &str,
        parent: i32,
        parent_to_joint: SpatialTransform,
        axis: Vec3,
        inertia: SpatialInertia,
    ) -> Self {
        self.add_body(name, parent, Joint::prismatic(parent_to_joint, axis), inertia)
    }

    pub fn add_spherical_body(
        self,
        name: &str,
        parent: i32,
        parent_to_joint: SpatialTransform,
        inertia: SpatialInertia,
    ) -> Self {
        self.add_body(name, parent, Joint::spherical(parent_to_joint), inertia)
    }

    pub fn add_planar_body(
        self,
        name: &str,
        parent: i32,
        parent_to_joint: SpatialTransform,
        inertia: SpatialInertia,
    ) -> Self {
        self.add_body(name, parent, Joint::planar(parent_to_joint), inertia)
    }

    /// Floating base: quaternion plus translation, six DOF.
    pub fn add_free_body(
        self,
        name: &str,
        parent: i32,
        parent_to_joint: SpatialTransform,
        inertia: SpatialInertia,
    ) -> Self {
        self.add_body(name, parent, Joint::free(parent_to_joint), inertia)
    }

    pub fn add_fixed_body(
        self,
        name: &str,
        parent: i32,
        parent_to_joint: SpatialTransform,
        inertia: SpatialInertia,
    ) -> Self {
        self.add_body(name, parent, Joint::fixed(parent_to_joint), inertia)
    }

    /// Append a body behind an arbitrary, possibly geared, joint.
    pub fn add_body(
        mut self,
        name: &str,
        parent: i32,
        joint: Joint,
        inertia: SpatialInertia,
    ) -> Self {
        let joint = if joint.name.is_empty() { joint.named(name) } else { joint };
        self.bodies.push(Body {
            name: name.into(),
            inertia,
            parent,
            joint_idx: self.joints.len(),
        });
        self.joints.push(joint);
        self
    }

    /// Check parents precede children and rotor parameters are physical, then
    /// lay out the generalized coordinates.
    pub fn build(self) -> Result<Model> {
        let njoints = self.joints.len();
        for (i, body) in self.bodies.iter().enumerate() {
            if !(-1..i as i32).contains(&body.parent) {
                return Err(ModelError::InvalidParent {
                    body: i,
                    parent: body.parent,
                });
            }
            if body.joint_idx >= njoints {
                return Err(ModelError::InvalidJointIndex {
                    body: i,
                    joint: body.joint_idx,
                    njoints,
                });
            }
        }

        for (i, joint) in self.joints.iter().enumerate() {
            if !(joint.gear_ratio > 0.0) {
                return Err(ModelError::InvalidParameter(format!(
                    "joint {i} gear ratio must be positive, got {}",
                    joint.gear_ratio
                )));
            }
            if !(joint.rotor_inertia >= 0.0) {
                return Err(ModelError::InvalidParameter(format!(
                    "joint {i} rotor inertia must be non-negative, got {}",
                    joint.rotor_inertia
                )));
            }
            let axial = matches!(joint.joint_type, JointType::Revolute | JointType::Prismatic);
            if axial && !((joint.axis.norm() - 1.0).abs() <= 1e-9) {
                return Err(ModelError::InvalidParameter(format!(
                    "joint {i} axis must be a unit vector, got norm {}",
                    joint.axis.norm()
                )));
            }
        }

        let mut q_offsets = Vec::with_capacity(njoints);
        let mut v_offsets = Vec::with_capacity(njoints);
        let (nq, nv) = self.joints.iter().fold((0, 0), |(nq, nv), joint| {
            q_offsets.push(nq);
            v_offsets.push(nv);
            (nq + joint.nq(), nv + joint.ndof())
        });

        Ok(Model {
            bodies: self.bodies,
            joints: self.joints,
            gravity: self.gravity,
            nq,
            nv,
            q_offsets,
            v_offsets,
        })
    }
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
