//! Composite task grouping several objectives at one priority level.

use nalgebra::{DMatrix, DVector};

use super::{Task, TaskReference};
use crate::error::{IkError, KinematicsError, TaskError};
use crate::kinematics::RobotKinematics;

/// Row-wise concatenation of sub-tasks.
///
/// The Jacobian and error stack the children in insertion order. The stack's
/// own gain multiplies the children's (already gain-scaled) errors. It takes
/// no reference of its own; use [`Task::find_mut`] to reach a child.
pub struct TaskStack {
    name: String,
    gain: f64,
    tasks: Vec<Box<dyn Task>>,
    error: DVector<f64>,
}

impl TaskStack {
    pub fn new(name: impl Into<String>, tasks: Vec<Box<dyn Task>>) -> Self {
        let dim = tasks.iter().map(|t| t.dim()).sum();
        Self {
            name: name.into(),
            gain: 1.0,
            tasks,
            error: DVector::zeros(dim),
        }
    }

    /// Append a sub-task at the bottom of the stack.
    pub fn push(&mut self, task: Box<dyn Task>) {
        self.tasks.push(task);
        self.error = DVector::zeros(self.dim());
    }

    pub fn tasks(&self) -> &[Box<dyn Task>] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl std::fmt::Debug for TaskStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.tasks.iter().map(|t| t.name()).collect();
        f.debug_struct("TaskStack")
            .field("name", &self.name)
            .field("gain", &self.gain)
            .field("tasks", &names)
            .finish_non_exhaustive()
    }
}

impl Task for TaskStack {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim(&self) -> usize {
        self.tasks.iter().map(|t| t.dim()).sum()
    }

    fn gain(&self) -> f64 {
        self.gain
    }

    fn set_gain(&mut self, gain: f64) {
        self.gain = gain;
    }

    fn jacobian(&self, kinematics: &dyn RobotKinematics) -> Result<DMatrix<f64>, KinematicsError> {
        let mut jac = DMatrix::zeros(self.dim(), kinematics.velocity_dim());
        let mut row = 0;
        for task in &self.tasks {
            let sub = task.jacobian(kinematics)?;
            jac.rows_mut(row, sub.nrows()).copy_from(&sub);
            row += sub.nrows();
        }
        Ok(jac)
    }

    fn set_reference(&mut self, _reference: TaskReference) -> Result<(), TaskError> {
        Err(TaskError::StackReference(self.name.clone()))
    }

    fn reference(&self) -> Option<TaskReference> {
        None
    }

    fn compute_error(&mut self, kinematics: &dyn RobotKinematics) -> Result<(), KinematicsError> {
        let mut error = DVector::zeros(self.dim());
        let mut row = 0;
        for task in &mut self.tasks {
            task.compute_error(kinematics)?;
            let sub = task.error();
            error.rows_mut(row, sub.len()).copy_from(sub);
            row += sub.len();
        }
        self.error = error * self.gain;
        Ok(())
    }

    fn error(&self) -> &DVector<f64> {
        &self.error
    }

    fn set_error(&mut self, error: DVector<f64>) -> Result<(), TaskError> {
        if error.len() != self.dim() {
            return Err(TaskError::ErrorDimension {
                task: self.name.clone(),
                expected: self.dim(),
                got: error.len(),
            });
        }
        self.error = error;
        Ok(())
    }

    fn validate(&self, kinematics: &dyn RobotKinematics) -> Result<(), IkError> {
        if self.tasks.is_empty() {
            return Err(TaskError::Empty(self.name.clone()).into());
        }
        self.tasks.iter().try_for_each(|t| t.validate(kinematics))
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut dyn Task> {
        if self.name == name {
            return Some(self);
        }
        self.tasks.iter_mut().find_map(|t| t.find_mut(name))
    }
}
