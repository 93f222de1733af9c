use serde::Serialize;

use crate::ids::{AccountId, AssignmentId, ClassroomId};
use crate::registry::{Keyed, Registry};

/// Grade value meaning "not graded yet". Never averaged.
pub const UNGRADED: f64 = -1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub id: AssignmentId,
    pub name: String,
    pub grade: f64,
}

impl Assignment {
    pub fn new(id: AssignmentId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            grade: UNGRADED,
        }
    }

    pub fn is_graded(&self) -> bool {
        self.grade != UNGRADED
    }
}

impl Keyed for Assignment {
    type Key = AssignmentId;

    fn key(&self) -> AssignmentId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    /// Held in clear while loaded; obscured only in the files.
    pub password: String,
}

#[derive(Debug, Clone)]
pub enum Role {
    Administrator {
        /// Classrooms this administrator manages, in link order.
        classrooms: Vec<ClassroomId>,
    },
    Student {
        /// Personal graded copies of every assignment of every enrolled class.
        assignments: Registry<Assignment>,
    },
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub profile: Profile,
    pub role: Role,
}

impl Account {
    pub fn administrator(id: AccountId, profile: Profile) -> Self {
        Self {
            id,
            profile,
            role: Role::Administrator {
                classrooms: Vec::new(),
            },
        }
    }

    pub fn student(id: AccountId, profile: Profile) -> Self {
        Self {
            id,
            profile,
            role: Role::Student {
                assignments: Registry::new(),
            },
        }
    }

    pub fn is_administrator(&self) -> bool {
        matches!(self.role, Role::Administrator { .. })
    }

    pub fn classrooms(&self) -> &[ClassroomId] {
        match &self.role {
            Role::Administrator { classrooms } => classrooms,
            Role::Student { .. } => &[],
        }
    }

    pub fn link_classroom(&mut self, classroom: ClassroomId) {
        if let Role::Administrator { classrooms } = &mut self.role {
            if !classrooms.contains(&classroom) {
                classrooms.push(classroom);
            }
        }
    }

    pub fn unlink_classroom(&mut self, classroom: ClassroomId) {
        if let Role::Administrator { classrooms } = &mut self.role {
            classrooms.retain(|c| *c != classroom);
        }
    }

    pub fn assignments(&self) -> Option<&Registry<Assignment>> {
        match &self.role {
            Role::Student { assignments } => Some(assignments),
            Role::Administrator { .. } => None,
        }
    }

    pub fn assignments_mut(&mut self) -> Option<&mut Registry<Assignment>> {
        match &mut self.role {
            Role::Student { assignments } => Some(assignments),
            Role::Administrator { .. } => None,
        }
    }

    /// Adds a personal copy unless one with the same id already exists.
    pub fn adopt_assignment(&mut self, assignment: Assignment) {
        if let Some(reg) = self.assignments_mut() {
            if !reg.contains(assignment.id) {
                reg.insert(assignment);
            }
        }
    }

    pub fn drop_assignment(&mut self, id: AssignmentId) {
        if let Some(reg) = self.assignments_mut() {
            reg.remove(id);
        }
    }
}

impl Keyed for Account {
    type Key = AccountId;

    fn key(&self) -> AccountId {
        self.id
    }
}

/// Roster membership: the classroom only stores the student's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enrollment {
    pub student_id: AccountId,
}

impl Keyed for Enrollment {
    type Key = AccountId;

    fn key(&self) -> AccountId {
        self.student_id
    }
}

#[derive(Debug, Clone)]
pub struct Classroom {
    pub id: ClassroomId,
    pub name: String,
    pub roster: Registry<Enrollment>,
    /// Managing administrators, in link order.
    pub admins: Vec<AccountId>,
    /// Canonical assignment list; grades here stay `UNGRADED`.
    pub assignments: Registry<Assignment>,
}

impl Classroom {
    pub fn new(id: ClassroomId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            roster: Registry::new(),
            admins: Vec::new(),
            assignments: Registry::new(),
        }
    }

    pub fn student_ids(&self) -> Vec<AccountId> {
        self.roster.keys().collect()
    }

    pub fn assignment_ids(&self) -> Vec<AssignmentId> {
        self.assignments.keys().collect()
    }

    pub fn link_admin(&mut self, admin: AccountId) {
        if !self.admins.contains(&admin) {
            self.admins.push(admin);
        }
    }
}

impl Keyed for Classroom {
    type Key = ClassroomId;

    fn key(&self) -> ClassroomId {
        self.id
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: AccountId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub role: &'static str,
    pub classroom_count: usize,
}

impl From<&Account> for AccountSummary {
    fn from(a: &Account) -> Self {
        let classroom_count = match &a.role {
            Role::Administrator { classrooms } => classrooms.len(),
            Role::Student { .. } => 0,
        };
        Self {
            id: a.id,
            first_name: a.profile.first_name.clone(),
            last_name: a.profile.last_name.clone(),
            username: a.profile.username.clone(),
            role: if a.is_administrator() {
                "administrator"
            } else {
                "student"
            },
            classroom_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomSummary {
    pub id: ClassroomId,
    pub name: String,
    pub student_count: usize,
    pub assignment_count: usize,
    pub admin_ids: Vec<AccountId>,
}

impl From<&Classroom> for ClassroomSummary {
    fn from(c: &Classroom) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            student_count: c.roster.len(),
            assignment_count: c.assignments.len(),
            admin_ids: c.admins.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    pub id: AssignmentId,
    pub name: String,
    /// `None` for canonical records and ungraded copies.
    pub grade: Option<f64>,
}

impl From<&Assignment> for AssignmentView {
    fn from(a: &Assignment) -> Self {
        Self {
            id: a.id,
            name: a.name.clone(),
            grade: a.is_graded().then_some(a.grade),
        }
    }
}
