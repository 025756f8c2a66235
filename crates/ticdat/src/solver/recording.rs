//! Backend that records the model instead of solving it.

use std::cell::RefCell;
use std::rc::Rc;

use super::backend::{
    LinearConstraint, LinearExpr, ModelType, Sense, SolverBackend, VarId, VarType,
};
use crate::error::{Result, TicDatError};

/// A variable as the backend received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedVariable {
    pub name: String,
    pub lb: f64,
    pub ub: f64,
    pub var_type: VarType,
}

/// Records every call, for tests and dry runs.
///
/// `optimize` succeeds once a solution with one value per variable has been
/// supplied with [`RecordingBackend::with_solution`].
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    model_type: ModelType,
    variables: Rc<RefCell<Vec<RecordedVariable>>>,
    constraints: Vec<(String, LinearConstraint)>,
    objective: Option<(LinearExpr, Sense)>,
    solution: Option<Vec<f64>>,
    solved: bool,
}

impl RecordingBackend {
    pub fn new(model_type: ModelType) -> Self {
        Self {
            model_type,
            variables: Rc::new(RefCell::new(Vec::new())),
            constraints: Vec::new(),
            objective: None,
            solution: None,
            solved: false,
        }
    }

    pub fn with_solution(mut self, values: Vec<f64>) -> Self {
        self.solution = Some(values);
        self
    }

    /// Shared view of the recorded variables, usable after the backend is
    /// handed to a model.
    pub fn variables(&self) -> Rc<RefCell<Vec<RecordedVariable>>> {
        Rc::clone(&self.variables)
    }

    pub fn constraints(&self) -> &[(String, LinearConstraint)] {
        &self.constraints
    }

    pub fn objective(&self) -> Option<&(LinearExpr, Sense)> {
        self.objective.as_ref()
    }

    fn check_var(&self, var: VarId) -> Result<()> {
        if var.0 < self.variables.borrow().len() {
            Ok(())
        } else {
            Err(TicDatError::Solver(format!("unknown variable {}", var.0)))
        }
    }
}

impl SolverBackend for RecordingBackend {
    fn model_type(&self) -> ModelType {
        self.model_type
    }

    fn add_variable(&mut self, lb: f64, ub: f64, var_type: VarType, name: &str) -> Result<VarId> {
        let mut variables = self.variables.borrow_mut();
        variables.push(RecordedVariable {
            name: name.to_string(),
            lb,
            ub,
            var_type,
        });
        self.solved = false;
        Ok(VarId(variables.len() - 1))
    }

    fn add_constraint(&mut self, constraint: LinearConstraint, name: &str) -> Result<()> {
        for (var, _) in &constraint.expr.terms {
            self.check_var(*var)?;
        }
        self.constraints.push((name.to_string(), constraint));
        self.solved = false;
        Ok(())
    }

    fn set_objective(&mut self, expr: LinearExpr, sense: Sense) -> Result<()> {
        for (var, _) in &expr.terms {
            self.check_var(*var)?;
        }
        self.objective = Some((expr, sense));
        self.solved = false;
        Ok(())
    }

    fn optimize(&mut self) -> Result<bool> {
        let count = self.variables.borrow().len();
        self.solved = self.solution.as_ref().is_some_and(|s| s.len() == count);
        Ok(self.solved)
    }

    fn get_value(&self, var: VarId) -> Result<f64> {
        self.check_var(var)?;
        match (&self.solution, self.solved) {
            (Some(values), true) => Ok(values[var.0]),
            _ => Err(TicDatError::Solver("model has not been solved".to_string())),
        }
    }
}
