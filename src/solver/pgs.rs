use crate::collision::{BodyHandle, Contact};
use crate::constraints::ContactConstraint;

use super::{SolverBody, SolverData};

/// Projected Gauss-Seidel solver over the contact constraints of one island
#[derive(Debug, Default)]
pub struct ContactSolver {
    constraints: Vec<ContactConstraint>,
}

impl ContactSolver {
    /// Creates an empty solver
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds constraints for `contacts[i]` for every `i` in `indices`.
    ///
    /// `solver_body` maps a body handle to its solver state. Contacts that are
    /// sensors, disabled, pointless or between two immovable bodies are
    /// skipped.
    pub fn initialize<F>(
        &mut self,
        contacts: &[Contact],
        indices: &[usize],
        solver_body: F,
        data: &SolverData,
    ) where
        F: Fn(BodyHandle) -> Option<SolverBody>,
    {
        self.constraints.clear();

        for &index in indices {
            let Some(contact) = contacts.get(index) else {
                continue;
            };
            if contact.sensor || !contact.enabled || contact.points.is_empty() {
                continue;
            }

            let (handle_a, handle_b) = contact.bodies();
            let (Some(body_a), Some(body_b)) = (solver_body(handle_a), solver_body(handle_b)) else {
                continue;
            };
            if body_a.is_immovable() && body_b.is_immovable() {
                continue;
            }

            self.constraints
                .push(ContactConstraint::new(index, contact, body_a, body_b, data));
        }
    }

    /// Number of prepared constraints
    #[inline]
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn clear(&mut self) {
        self.constraints.clear();
    }

    /// Warm starts the solver using the impulses from the previous step
    pub fn warm_start(&self, data: &mut SolverData) {
        if !data.step.warm_starting {
            return;
        }
        for constraint in &self.constraints {
            constraint.warm_start(data);
        }
    }

    /// One velocity iteration over every constraint
    pub fn solve_velocity(&mut self, data: &mut SolverData) {
        for constraint in &mut self.constraints {
            constraint.solve_velocity(data);
        }
    }

    /// One position iteration over every constraint. Returns true once all
    /// contacts are within tolerance.
    pub fn solve_position(&self, data: &mut SolverData) -> bool {
        let mut solved = true;
        for constraint in &self.constraints {
            solved &= constraint.solve_position(data);
        }
        solved
    }

    /// Stores accumulated impulses back to the contacts they came from
    pub fn store_impulses(&self, contacts: &mut [Contact]) {
        for constraint in &self.constraints {
            if let Some(contact) = contacts.get_mut(constraint.contact_index) {
                constraint.store_impulses(contact);
            }
        }
    }

    /// Indices of the contacts with prepared constraints
    pub fn contact_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.constraints.iter().map(|c| c.contact_index)
    }
}
