//! Models and cycle helpers shared by the unit tests.

use rbc_math::{SpatialInertia, SpatialTransform, Vec3};
use rbc_model::{Model, ModelBuilder, State};
use rbc_rigid::{ForwardDynamics, update_kinematics};

/// Single revolute joint carrying a unit point mass at unit radius: `H = [1]`.
pub fn pendulum() -> Model {
    ModelBuilder::new()
        .gravity(Vec3::zeros())
        .add_revolute_body(
            "link",
            -1,
            SpatialTransform::identity(),
            SpatialInertia::point_mass(1.0, Vec3::new(1.0, 0.0, 0.0)),
        )
        .build()
        .unwrap()
}

/// Same layout as [`pendulum`] with a negative mass, so `H = [-1]` has no Cholesky factor.
pub fn negative_mass_pendulum() -> Model {
    ModelBuilder::new()
        .gravity(Vec3::zeros())
        .add_revolute_body(
            "link",
            -1,
            SpatialTransform::identity(),
            SpatialInertia::point_mass(-1.0, Vec3::new(1.0, 0.0, 0.0)),
        )
        .build()
        .unwrap()
}

/// Planar two-link arm under gravity.
pub fn two_link() -> Model {
    ModelBuilder::new()
        .add_revolute_body(
            "l1",
            -1,
            SpatialTransform::identity(),
            SpatialInertia::rod(1.0, 1.0).with_com(Vec3::new(0.5, 0.0, 0.0)),
        )
        .add_revolute_body(
            "l2",
            0,
            SpatialTransform::translation(Vec3::new(1.0, 0.0, 0.0)),
            SpatialInertia::rod(0.8, 0.7).with_com(Vec3::new(0.35, 0.0, 0.0)),
        )
        .build()
        .unwrap()
}

/// Floating base carrying a revolute link.
pub fn floating_arm() -> Model {
    ModelBuilder::new()
        .add_free_body(
            "base",
            -1,
            SpatialTransform::identity(),
            SpatialInertia::cuboid(5.0, Vec3::new(0.4, 0.3, 0.2)),
        )
        .add_revolute_body(
            "arm",
            0,
            SpatialTransform::translation(Vec3::new(0.2, 0.0, 0.0)),
            SpatialInertia::rod(1.0, 0.6).with_com(Vec3::new(0.3, 0.0, 0.0)),
        )
        .build()
        .unwrap()
}

/// Refresh the kinematic cache of `real` and return an engine holding `H` and `C` for it.
pub fn refresh(model: &Model, real: &mut State) -> ForwardDynamics {
    update_kinematics(model, real).unwrap();
    let mut fd = ForwardDynamics::new(model);
    fd.compute_h(model, real);
    fd.compute_c(model, real);
    fd
}
