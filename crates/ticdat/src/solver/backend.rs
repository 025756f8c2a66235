//! The capability set a solver vendor binding provides.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TicDatError};

/// Supported solver vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Gurobi,
    Cplex,
    Xpress,
}

impl ModelType {
    pub fn label(&self) -> &'static str {
        match self {
            ModelType::Gurobi => "gurobi",
            ModelType::Cplex => "cplex",
            ModelType::Xpress => "xpress",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ModelType {
    type Err = TicDatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gurobi" => Ok(ModelType::Gurobi),
            "cplex" => Ok(ModelType::Cplex),
            "xpress" => Ok(ModelType::Xpress),
            other => Err(TicDatError::Solver(format!(
                "unknown model type '{}', expected gurobi, cplex or xpress",
                other
            ))),
        }
    }
}

/// Handle to a variable created by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    Continuous,
    Binary,
}

/// `sum(coefficient * variable) + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(mut self, var: VarId, coefficient: f64) -> Self {
        self.terms.push((var, coefficient));
        self
    }

    pub fn constant(mut self, constant: f64) -> Self {
        self.constant += constant;
        self
    }

    /// Sum of variables with unit coefficients.
    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (v, 1.0)).collect(),
            constant: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    LessEqual,
    GreaterEqual,
    Equal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub expr: LinearExpr,
    pub comparison: Comparison,
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    Minimize,
    Maximize,
}

/// One vendor's model, driven through [`Model`](super::Model).
///
/// Implementations receive arguments the model has already verified.
pub trait SolverBackend {
    fn model_type(&self) -> ModelType;

    fn add_variable(&mut self, lb: f64, ub: f64, var_type: VarType, name: &str) -> Result<VarId>;

    fn add_constraint(&mut self, constraint: LinearConstraint, name: &str) -> Result<()>;

    fn set_objective(&mut self, expr: LinearExpr, sense: Sense) -> Result<()>;

    /// Solve. Returns true if an optimal solution was found.
    fn optimize(&mut self) -> Result<bool>;

    /// Value of a variable in the last solution.
    fn get_value(&self, var: VarId) -> Result<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_from_str() {
        assert_eq!("Gurobi".parse::<ModelType>().unwrap(), ModelType::Gurobi);
        assert_eq!(" xpress ".parse::<ModelType>().unwrap(), ModelType::Xpress);
        assert!(matches!("glpk".parse::<ModelType>(), Err(TicDatError::Solver(_))));
    }
}
