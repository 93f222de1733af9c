//! The in-memory entity graph: administrators, students, classrooms and the
//! assignments linking them.
//!
//! Every cross reference is an id. Cascades that the file format depends on
//! (personal assignment copies, admin/classroom links) are maintained here so
//! the persisted files never need fixing up on load.

mod accounts;
mod assignments;
mod classrooms;

pub use accounts::ProfilePatch;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{EntityKind, GradebookError, Result};
use crate::ids::{AccountId, ClassroomId};
use crate::model::{Account, Classroom};
use crate::registry::Registry;

#[derive(Debug)]
pub struct Gradebook {
    admins: Registry<Account>,
    students: Registry<Account>,
    classrooms: Registry<Classroom>,
    rng: StdRng,
}

impl Default for Gradebook {
    fn default() -> Self {
        Self::new()
    }
}

impl Gradebook {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic identifiers, for tests and reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            admins: Registry::new(),
            students: Registry::new(),
            classrooms: Registry::new(),
            rng,
        }
    }

    pub fn admins(&self) -> &Registry<Account> {
        &self.admins
    }

    pub fn students(&self) -> &Registry<Account> {
        &self.students
    }

    pub fn classrooms(&self) -> &Registry<Classroom> {
        &self.classrooms
    }

    pub fn admin(&self, id: AccountId) -> Result<&Account> {
        self.admins
            .find(id)
            .ok_or_else(|| GradebookError::not_found(EntityKind::Administrator, id))
    }

    pub fn student(&self, id: AccountId) -> Result<&Account> {
        self.students
            .find(id)
            .ok_or_else(|| GradebookError::not_found(EntityKind::Student, id))
    }

    pub fn classroom(&self, id: ClassroomId) -> Result<&Classroom> {
        self.classrooms
            .find(id)
            .ok_or_else(|| GradebookError::not_found(EntityKind::Classroom, id))
    }

    fn admin_mut(&mut self, id: AccountId) -> Result<&mut Account> {
        self.admins
            .find_mut(id)
            .ok_or_else(|| GradebookError::not_found(EntityKind::Administrator, id))
    }

    fn student_mut(&mut self, id: AccountId) -> Result<&mut Account> {
        self.students
            .find_mut(id)
            .ok_or_else(|| GradebookError::not_found(EntityKind::Student, id))
    }

    fn classroom_mut(&mut self, id: ClassroomId) -> Result<&mut Classroom> {
        self.classrooms
            .find_mut(id)
            .ok_or_else(|| GradebookError::not_found(EntityKind::Classroom, id))
    }

    /// Loader entry points: records arrive with their stored ids.
    pub(crate) fn restore_admin(&mut self, account: Account) {
        self.admins.insert(account);
    }

    pub(crate) fn restore_student(&mut self, account: Account) {
        self.students.insert(account);
    }

    pub(crate) fn restore_classroom(&mut self, classroom: Classroom) {
        self.classrooms.insert(classroom);
    }

    pub(crate) fn students_mut(&mut self) -> &mut Registry<Account> {
        &mut self.students
    }
}

/// Every stored string occupies exactly one line of a data file.
pub(crate) fn check_single_line(field: &str, value: &str) -> Result<()> {
    if value.contains(['\n', '\r']) {
        return Err(GradebookError::invalid(format!(
            "{field} must not contain line breaks"
        )));
    }
    Ok(())
}
