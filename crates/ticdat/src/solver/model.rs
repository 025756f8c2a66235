//! Vendor-neutral model that verifies arguments before they reach a backend.

use tracing::debug;

use super::backend::{
    Comparison, LinearConstraint, LinearExpr, ModelType, Sense, SolverBackend, VarId, VarType,
};
use crate::error::{Result, TicDatError};

/// A mathematical program over one [`SolverBackend`].
pub struct Model {
    backend: Box<dyn SolverBackend>,
    variables: usize,
    constraints: usize,
}

impl Model {
    pub fn new(backend: Box<dyn SolverBackend>) -> Self {
        Self {
            backend,
            variables: 0,
            constraints: 0,
        }
    }

    pub fn model_type(&self) -> ModelType {
        self.backend.model_type()
    }

    /// Add a variable.
    ///
    /// Bounds must be ordered, the lower bound may not be +inf and the upper
    /// bound may not be -inf. Binary variables take bounds in {0, 1}; an upper
    /// bound of +inf is read as 1.
    pub fn add_var(&mut self, lb: f64, ub: f64, var_type: VarType, name: &str) -> Result<VarId> {
        if lb.is_nan() || ub.is_nan() {
            return Err(solver_error(name, "bounds must not be NaN"));
        }
        if lb == f64::INFINITY {
            return Err(solver_error(name, "lower bound may not be +inf"));
        }
        if ub == f64::NEG_INFINITY {
            return Err(solver_error(name, "upper bound may not be -inf"));
        }
        let ub = if var_type == VarType::Binary && ub == f64::INFINITY {
            1.0
        } else {
            ub
        };
        if lb > ub {
            return Err(solver_error(
                name,
                &format!("lower bound {} exceeds upper bound {}", lb, ub),
            ));
        }
        if var_type == VarType::Binary && !(is_binary_bound(lb) && is_binary_bound(ub)) {
            return Err(solver_error(name, "binary bounds must be 0 or 1"));
        }
        let var = self.backend.add_variable(lb, ub, var_type, name)?;
        self.variables += 1;
        Ok(var)
    }

    pub fn add_constraint(
        &mut self,
        expr: LinearExpr,
        comparison: Comparison,
        rhs: f64,
        name: &str,
    ) -> Result<()> {
        if rhs.is_nan() || expr.constant.is_nan() || expr.terms.iter().any(|(_, c)| !c.is_finite()) {
            return Err(solver_error(name, "constraint coefficients must be finite"));
        }
        self.backend.add_constraint(
            LinearConstraint {
                expr,
                comparison,
                rhs,
            },
            name,
        )?;
        self.constraints += 1;
        Ok(())
    }

    pub fn set_objective(&mut self, expr: LinearExpr, sense: Sense) -> Result<()> {
        self.backend.set_objective(expr, sense)
    }

    /// Solve. Returns true if an optimal solution was found.
    pub fn optimize(&mut self) -> Result<bool> {
        debug!(
            solver = %self.model_type(),
            variables = self.variables,
            constraints = self.constraints,
            "optimizing"
        );
        self.backend.optimize()
    }

    pub fn get_solution_value(&self, var: VarId) -> Result<f64> {
        self.backend.get_value(var)
    }

    /// Value of an expression in the last solution.
    pub fn evaluate(&self, expr: &LinearExpr) -> Result<f64> {
        expr.terms.iter().try_fold(expr.constant, |acc, (var, c)| {
            Ok(acc + c * self.backend.get_value(*var)?)
        })
    }
}

fn is_binary_bound(x: f64) -> bool {
    x == 0.0 || x == 1.0
}

fn solver_error(name: &str, message: &str) -> TicDatError {
    TicDatError::Solver(format!("variable '{}': {}", name, message))
}
