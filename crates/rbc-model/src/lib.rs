//! Model and state types for the rbc dynamics stack.
//!
//! `Model` is the static description of an articulated mechanism (topology, masses, joint types).
//! `State` is the per-cycle configuration snapshot (positions, velocities, torques, forces)
//! together with the kinematic cache filled by `rbc-rigid`.

pub mod body;
pub mod check;
pub mod error;
pub mod joint;
pub mod model;
pub mod state;

pub use body::Body;
pub use check::{check_state, check_vector};
pub use error::{ModelError, Result};
pub use joint::{Joint, JointType};
pub use model::{Model, ModelBuilder};
pub use state::State;
