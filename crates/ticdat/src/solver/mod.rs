//! Solver pass-through: one model interface over several vendor backends.

mod backend;
mod model;
mod recording;

pub use backend::{
    Comparison, LinearConstraint, LinearExpr, ModelType, Sense, SolverBackend, VarId, VarType,
};
pub use model::Model;
pub use recording::{RecordedVariable, RecordingBackend};
