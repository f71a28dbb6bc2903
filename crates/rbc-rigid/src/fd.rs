//! Forward dynamics engine: mass matrix, bias vector and joint accelerations.
//!
//! The mass matrix is built with the Composite Rigid Body Algorithm and the
//! reflected rotor inertia of each actuated joint. The bias vector (Coriolis,
//! centrifugal, gravity and external forces) is RNEA evaluated with zero joint
//! acceleration. `H α̈ = τ - C` is then solved with a dense LDLᵀ factorization.
//!
//! Every method reads the kinematic cache of the `State` (`parent_to_son`,
//! `body_pos_w`, `body_vel_b`); run `update_kinematics` first.

use crate::{DynamicsError, Ldlt, Result};
use rbc_math::{DMat, DVec, SpatialMat, SpatialVec, Vec3};
use rbc_model::{Model, State, check_state};

/// Dynamics quantities of one model, with buffers sized at construction.
#[derive(Debug, Clone)]
pub struct ForwardDynamics {
    h: DMat,
    c: DVec,
    hir: DMat,
    i_c: Vec<SpatialMat>,
    /// `I_c S` per body, one force vector per joint DOF.
    f: Vec<Vec<SpatialVec>>,
    acc: Vec<SpatialVec>,
    f_body: Vec<SpatialVec>,
    rhs: DVec,
    ldlt: Ldlt,
}

impl ForwardDynamics {
    /// Size every buffer for `model`.
    pub fn new(model: &Model) -> Self {
        let nb = model.nbodies();
        let nv = model.nv;
        let f = model
            .bodies
            .iter()
            .map(|b| vec![SpatialVec::zero(); model.joints[b.joint_idx].ndof()])
            .collect();

        let mut fd = Self {
            h: DMat::zeros(nv, nv),
            c: DVec::zeros(nv),
            hir: DMat::zeros(nv, nv),
            i_c: vec![SpatialMat::zero(); nb],
            f,
            acc: vec![SpatialVec::zero(); nb],
            f_body: vec![SpatialVec::zero(); nb],
            rhs: DVec::zeros(nv),
            ldlt: Ldlt::new(nv),
        };
        fd.compute_hir(model);
        fd
    }

    /// Generalized mass matrix `H` (n × n) from the last `compute_h`.
    pub fn h(&self) -> &DMat {
        &self.h
    }

    /// Bias vector `C` (n) from the last `compute_c`.
    pub fn c(&self) -> &DVec {
        &self.c
    }

    /// Composite inertia of the subtree rooted at each body, in that body's frame.
    pub fn inertia_sub_tree(&self) -> &[SpatialMat] {
        &self.i_c
    }

    /// Diagonal matrix of reflected rotor inertias.
    pub fn hir(&self) -> &DMat {
        &self.hir
    }

    /// Fill `HIr[k, k] = gear_ratio² · rotor_inertia` for every single-DOF joint.
    pub fn compute_hir(&mut self, model: &Model) {
        self.hir.fill(0.0);
        for (joint, &v_idx) in model.joints.iter().zip(&model.v_offsets) {
            if joint.ndof() == 1 {
                self.hir[(v_idx, v_idx)] = joint.reflected_rotor_inertia();
            }
        }
    }

    /// Compute the mass matrix `H(q)` with CRBA, plus rotor inertia.
    pub fn compute_h(&mut self, model: &Model, state: &State) {
        let nb = model.nbodies();

        for (ic, body) in self.i_c.iter_mut().zip(&model.bodies) {
            *ic = body.inertia.to_matrix();
        }

        // Backward pass: accumulate composite inertias
        for i in (0..nb).rev() {
            if let Some(pi) = model.bodies[i].parent_index() {
                let x_mot = state.parent_to_son[i].to_motion_matrix();
                let ic_in_parent = self.i_c[i].congruence(&x_mot);
                self.i_c[pi] += ic_in_parent;
            }
        }

        self.h.fill(0.0);
        for i in 0..nb {
            let joint_i = &model.joints[model.bodies[i].joint_idx];
            let v_i = model.v_offsets[model.bodies[i].joint_idx];

            for col in 0..joint_i.ndof() {
                let f_col = self.i_c[i].mul_vec(&joint_i.motion_subspace_column(col));
                self.f[i][col] = f_col;

                // Diagonal block: S_iᵀ I_c S_i
                for row in 0..joint_i.ndof() {
                    self.h[(v_i + row, v_i + col)] =
                        joint_i.motion_subspace_column(row).dot(&f_col);
                }

                // Off-diagonal: walk up the tree
                let mut f = f_col;
                let mut child = i;
                while let Some(j) = model.bodies[child].parent_index() {
                    f = state.parent_to_son[child].inv_apply_force(&f);
                    let joint_j = &model.joints[model.bodies[j].joint_idx];
                    let v_j = model.v_offsets[model.bodies[j].joint_idx];
                    for kj in 0..joint_j.ndof() {
                        let val = joint_j.motion_subspace_column(kj).dot(&f);
                        self.h[(v_i + col, v_j + kj)] = val;
                        self.h[(v_j + kj, v_i + col)] = val;
                    }
                    child = j;
                }
            }
        }

        self.h += &self.hir;
    }

    /// Compute the bias vector `C(q, α)` with RNEA at zero joint acceleration.
    ///
    /// Includes gravity (`state.gravity`) and the external forces `state.force`.
    pub fn compute_c(&mut self, model: &Model, state: &State) {
        let nb = model.nbodies();
        let a0 = SpatialVec::new(Vec3::zeros(), -state.gravity);

        // Forward pass: bias accelerations and body forces
        for i in 0..nb {
            let body = &model.bodies[i];
            let joint = &model.joints[body.joint_idx];
            let v_idx = model.v_offsets[body.joint_idx];
            let alpha = &state.alpha.as_slice()[v_idx..v_idx + joint.ndof()];
            let v_joint = joint.joint_velocity(alpha);
            let vel = state.body_vel_b[i];

            let a_parent = match body.parent_index() {
                None => a0,
                Some(pi) => self.acc[pi],
            };
            self.acc[i] =
                state.parent_to_son[i].apply_motion(&a_parent) + vel.cross_motion(&v_joint);

            let ia = body.inertia.to_matrix();
            let f_ext = state.body_pos_w[i].apply_force(&state.force[i]);
            self.f_body[i] = ia.mul_vec(&self.acc[i]) + vel.cross_force(&ia.mul_vec(&vel)) - f_ext;
        }

        // Backward pass: project onto joint axes and transfer to parents
        for i in (0..nb).rev() {
            let body = &model.bodies[i];
            let joint = &model.joints[body.joint_idx];
            let v_idx = model.v_offsets[body.joint_idx];

            for k in 0..joint.ndof() {
                self.c[v_idx + k] = joint.motion_subspace_column(k).dot(&self.f_body[i]);
            }

            if let Some(pi) = body.parent_index() {
                let f_parent = state.parent_to_son[i].inv_apply_force(&self.f_body[i]);
                self.f_body[pi] += f_parent;
            }
        }
    }

    /// Compute `H`, `C` and solve `H α̈ = τ - C`; the result is written to `state.alpha_d`.
    pub fn forward_dynamics(&mut self, model: &Model, state: &mut State) -> Result<()> {
        self.compute_h(model, state);
        self.compute_c(model, state);

        self.rhs.copy_from(&state.joint_torque);
        self.rhs -= &self.c;
        self.ldlt.factor(&self.h)?;
        self.ldlt.solve_mut(&mut self.rhs);
        state.alpha_d.copy_from(&self.rhs);
        Ok(())
    }

    /// `forward_dynamics` after checking model, state and engine dimensions.
    pub fn s_forward_dynamics(&mut self, model: &Model, state: &mut State) -> Result<()> {
        self.check(model, state)?;
        self.forward_dynamics(model, state)
    }

    /// `compute_h` after checking model, state and engine dimensions.
    pub fn s_compute_h(&mut self, model: &Model, state: &State) -> Result<()> {
        self.check(model, state)?;
        self.compute_h(model, state);
        Ok(())
    }

    /// `compute_c` after checking model, state and engine dimensions.
    pub fn s_compute_c(&mut self, model: &Model, state: &State) -> Result<()> {
        self.check(model, state)?;
        self.compute_c(model, state);
        Ok(())
    }

    fn check(&self, model: &Model, state: &State) -> Result<()> {
        if self.c.len() != model.nv {
            return Err(DynamicsError::EngineMismatch {
                what: "DOFs",
                expected: self.c.len(),
                got: model.nv,
            });
        }
        if self.i_c.len() != model.nbodies() {
            return Err(DynamicsError::EngineMismatch {
                what: "bodies",
                expected: self.i_c.len(),
                got: model.nbodies(),
            });
        }
        let joints_match = model
            .bodies
            .iter()
            .zip(&self.f)
            .all(|(b, f)| model.joints[b.joint_idx].ndof() == f.len());
        if !joints_match {
            return Err(DynamicsError::EngineMismatch {
                what: "joint layouts",
                expected: self.f.len(),
                got: model.nbodies(),
            });
        }
        check_state(model, state)?;
        Ok(())
    }
}
