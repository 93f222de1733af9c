use log::info;

use super::{check_single_line, Gradebook};
use crate::error::{EntityKind, GradebookError, Result};
use crate::ids::{self, AccountId, ClassroomId};
use crate::model::{AccountSummary, Assignment, Classroom, Enrollment};

impl Gradebook {
    /// Creates a classroom managed by `admin`.
    pub fn create_classroom(&mut self, admin: AccountId, name: &str) -> Result<ClassroomId> {
        check_single_line("classroom name", name)?;
        self.admin(admin)?;

        let classrooms = &self.classrooms;
        let id = ids::allocate_classroom_id(&mut self.rng, classrooms.len(), |c| {
            classrooms.contains(c)
        })?;

        let mut classroom = Classroom::new(id, name);
        classroom.link_admin(admin);
        self.admin_mut(admin)?.link_classroom(id);
        self.classrooms.insert(classroom);
        info!("created classroom {id} ({name})");
        Ok(id)
    }

    pub fn rename_classroom(&mut self, id: ClassroomId, name: &str) -> Result<()> {
        check_single_line("classroom name", name)?;
        self.classroom_mut(id)?.name = name.to_string();
        Ok(())
    }

    /// Links both directions; linking twice is a no-op.
    pub fn link_admin(&mut self, classroom: ClassroomId, admin: AccountId) -> Result<()> {
        self.admin(admin)?;
        self.classroom_mut(classroom)?.link_admin(admin);
        self.admin_mut(admin)?.link_classroom(classroom);
        Ok(())
    }

    /// Puts the student on the roster and hands them a copy of every
    /// canonical assignment they do not hold yet. Safe to repeat.
    ///
    /// Refused when one of this classroom's assignment ids is already the id
    /// of an assignment in another classroom the student attends, since the
    /// two would have to share one personal copy.
    pub fn enroll_student(&mut self, classroom: ClassroomId, student: AccountId) -> Result<()> {
        self.student(student)?;
        let target = self.classroom(classroom)?;
        if !target.roster.contains(student) {
            let shared = target.assignments.keys().find(|id| {
                self.classrooms.iter().any(|other| {
                    other.id != classroom
                        && other.roster.contains(student)
                        && other.assignments.contains(*id)
                })
            });
            if let Some(id) = shared {
                return Err(GradebookError::invalid(format!(
                    "assignment {id} clashes with a copy student {student} already holds"
                )));
            }
        }
        let class = self
            .classrooms
            .find_mut(classroom)
            .ok_or_else(|| GradebookError::not_found(EntityKind::Classroom, classroom))?;
        let account = self
            .students
            .find_mut(student)
            .ok_or_else(|| GradebookError::not_found(EntityKind::Student, student))?;

        if !class.roster.contains(student) {
            class.roster.insert(Enrollment {
                student_id: student,
            });
        }
        for a in class.assignments.iter() {
            account.adopt_assignment(Assignment::new(a.id, a.name.clone()));
        }
        Ok(())
    }

    /// Drops the student from the roster along with their copies of this
    /// classroom's assignments. Copies from other classrooms stay.
    pub fn unenroll_student(&mut self, classroom: ClassroomId, student: AccountId) -> Result<()> {
        let class = self
            .classrooms
            .find_mut(classroom)
            .ok_or_else(|| GradebookError::not_found(EntityKind::Classroom, classroom))?;
        if class.roster.remove(student).is_none() {
            return Err(GradebookError::not_found(EntityKind::Student, student));
        }
        if let Some(account) = self.students.find_mut(student) {
            for id in class.assignments.keys() {
                account.drop_assignment(id);
            }
        }
        Ok(())
    }

    /// Removes the classroom, its admin links and every student copy of its
    /// assignments. The assignment file goes on the next save.
    pub fn delete_classroom(&mut self, id: ClassroomId) -> Result<Classroom> {
        let classroom = self
            .classrooms
            .remove(id)
            .ok_or_else(|| GradebookError::not_found(EntityKind::Classroom, id))?;

        for admin in &classroom.admins {
            if let Some(account) = self.admins.find_mut(*admin) {
                account.unlink_classroom(id);
            }
        }
        let assignments = classroom.assignment_ids();
        for student in classroom.roster.keys() {
            if let Some(account) = self.students.find_mut(student) {
                for assignment in &assignments {
                    account.drop_assignment(*assignment);
                }
            }
        }
        info!("deleted classroom {id}");
        Ok(classroom)
    }

    /// Wipes classrooms, students and every administrator but `keep`.
    pub fn purge_all(&mut self, keep: AccountId) -> Result<()> {
        let mut survivor = self
            .admins
            .remove(keep)
            .ok_or_else(|| GradebookError::not_found(EntityKind::Administrator, keep))?;
        for c in survivor.classrooms().to_vec() {
            survivor.unlink_classroom(c);
        }
        self.classrooms.clear();
        self.students.clear();
        self.admins.clear();
        self.admins.insert(survivor);
        info!("purged workspace, kept administrator {keep}");
        Ok(())
    }

    pub fn roster(&self, classroom: ClassroomId) -> Result<Vec<AccountSummary>> {
        let class = self.classroom(classroom)?;
        class
            .roster
            .keys()
            .map(|id| self.student(id).map(AccountSummary::from))
            .collect()
    }
}
