use log::info;

use super::{check_single_line, Gradebook};
use crate::calc::{self, GradeAverage};
use crate::error::{EntityKind, GradebookError, Result};
use crate::ids::{self, AccountId, AssignmentId, ClassroomId};
use crate::model::{Assignment, AssignmentView, Classroom};

fn require_assignment(classroom: &Classroom, id: AssignmentId) -> Result<()> {
    if classroom.assignments.contains(id) {
        Ok(())
    } else {
        Err(GradebookError::not_found(EntityKind::Assignment, id))
    }
}

impl Gradebook {
    /// Adds a canonical assignment and an ungraded copy for every enrolled
    /// student.
    pub fn create_assignment(&mut self, classroom: ClassroomId, name: &str) -> Result<AssignmentId> {
        check_single_line("assignment name", name)?;
        let class = self
            .classrooms
            .find(classroom)
            .ok_or_else(|| GradebookError::not_found(EntityKind::Classroom, classroom))?;

        // Unique in the canonical list, and clear of every enrolled student's
        // personal copies so a copy never shadows another classroom's record.
        let students = &self.students;
        let roster: Vec<AccountId> = class.student_ids();
        let id = ids::allocate_assignment_id(&mut self.rng, class.assignments.len(), |id| {
            class.assignments.contains(id)
                || roster.iter().any(|s| {
                    students
                        .find(*s)
                        .and_then(|a| a.assignments())
                        .is_some_and(|reg| reg.contains(id))
                })
        })?;

        for s in &roster {
            if let Some(account) = self.students.find_mut(*s) {
                account.adopt_assignment(Assignment::new(id, name));
            }
        }
        self.classroom_mut(classroom)?
            .assignments
            .insert(Assignment::new(id, name));
        info!("created assignment {id} in classroom {classroom}");
        Ok(id)
    }

    /// Renames the canonical record and every enrolled student's copy.
    pub fn rename_assignment(
        &mut self,
        classroom: ClassroomId,
        id: AssignmentId,
        name: &str,
    ) -> Result<()> {
        check_single_line("assignment name", name)?;
        let class = self.classroom_mut(classroom)?;
        let canonical = class
            .assignments
            .find_mut(id)
            .ok_or_else(|| GradebookError::not_found(EntityKind::Assignment, id))?;
        canonical.name = name.to_string();
        let roster = class.student_ids();

        for s in roster {
            if let Some(copy) = self
                .students
                .find_mut(s)
                .and_then(|a| a.assignments_mut())
                .and_then(|reg| reg.find_mut(id))
            {
                copy.name = name.to_string();
            }
        }
        Ok(())
    }

    pub fn delete_assignment(&mut self, classroom: ClassroomId, id: AssignmentId) -> Result<()> {
        let class = self.classroom_mut(classroom)?;
        if class.assignments.remove(id).is_none() {
            return Err(GradebookError::not_found(EntityKind::Assignment, id));
        }
        let roster = class.student_ids();
        for s in roster {
            if let Some(account) = self.students.find_mut(s) {
                account.drop_assignment(id);
            }
        }
        info!("deleted assignment {id} from classroom {classroom}");
        Ok(())
    }

    /// Sets the grade on the student's personal copy only. `-1` clears it;
    /// any other finite value is accepted as given.
    pub fn grade_assignment(
        &mut self,
        classroom: ClassroomId,
        student: AccountId,
        id: AssignmentId,
        grade: f64,
    ) -> Result<()> {
        if !grade.is_finite() {
            return Err(GradebookError::invalid("grade must be a finite number"));
        }
        let class = self.classroom(classroom)?;
        require_assignment(class, id)?;
        if !class.roster.contains(student) {
            return Err(GradebookError::not_found(EntityKind::Student, student));
        }
        let copy = self
            .student_mut(student)?
            .assignments_mut()
            .and_then(|reg| reg.find_mut(id))
            .ok_or_else(|| GradebookError::not_found(EntityKind::Assignment, id))?;
        copy.grade = grade;
        Ok(())
    }

    /// Mean over enrolled students' graded copies; `mean` is `UNGRADED`
    /// when none, so check `graded_count` before trusting a -1.
    pub fn average_grade(&self, classroom: ClassroomId, id: AssignmentId) -> Result<GradeAverage> {
        let class = self.classroom(classroom)?;
        require_assignment(class, id)?;
        let grades = class.roster.keys().filter_map(|s| {
            self.students
                .find(s)
                .and_then(|a| a.assignments())
                .and_then(|reg| reg.find(id))
                .map(|copy| copy.grade)
        });
        Ok(calc::grade_average(grades))
    }

    /// The student's own average over this classroom's assignments.
    pub fn student_average(&self, classroom: ClassroomId, student: AccountId) -> Result<GradeAverage> {
        let class = self.classroom(classroom)?;
        if !class.roster.contains(student) {
            return Err(GradebookError::not_found(EntityKind::Student, student));
        }
        Ok(self.student_average_in(class, student))
    }

    fn student_average_in(&self, class: &Classroom, student: AccountId) -> GradeAverage {
        let copies = self.students.find(student).and_then(|a| a.assignments());
        let grades = class.assignments.keys().filter_map(|id| {
            copies.and_then(|reg| reg.find(id)).map(|copy| copy.grade)
        });
        calc::grade_average(grades)
    }

    /// Mean of student averages over the roster; `UNGRADED` for an empty one.
    pub fn class_average(&self, classroom: ClassroomId) -> Result<f64> {
        let class = self.classroom(classroom)?;
        let per_student = class
            .roster
            .keys()
            .map(|s| self.student_average_in(class, s));
        Ok(calc::class_average(per_student))
    }

    pub fn canonical_assignments(&self, classroom: ClassroomId) -> Result<Vec<AssignmentView>> {
        let class = self.classroom(classroom)?;
        Ok(class
            .assignments
            .iter()
            .map(|a| AssignmentView {
                id: a.id,
                name: a.name.clone(),
                grade: None,
            })
            .collect())
    }

    /// A student's copies of one classroom's assignments.
    pub fn student_grades(
        &self,
        classroom: ClassroomId,
        student: AccountId,
    ) -> Result<Vec<AssignmentView>> {
        let class = self.classroom(classroom)?;
        if !class.roster.contains(student) {
            return Err(GradebookError::not_found(EntityKind::Student, student));
        }
        let copies = self
            .student(student)?
            .assignments()
            .ok_or_else(|| GradebookError::not_found(EntityKind::Student, student))?;
        Ok(class
            .assignments
            .keys()
            .filter_map(|id| copies.find(id).map(AssignmentView::from))
            .collect())
    }
}
