//! Line-oriented text layout of the data files.
//!
//! One value per line, no escaping, strictly positional. Counts precede
//! repeated blocks everywhere except the accounts file, which is a bare
//! sequence of 5-line records.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::cipher;
use crate::error::{GradebookError, Result};
use crate::ids::{AccountId, AssignmentId, ClassroomId};
use crate::model::{Account, Assignment, Classroom, Profile};

/// A parsed id together with the line it came from, for error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located<T> {
    pub line: usize,
    pub value: T,
}

#[derive(Debug, Clone)]
pub struct StudentBlock {
    pub student: Located<AccountId>,
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Clone)]
pub struct ClassroomRecord {
    pub name: String,
    pub id: Located<ClassroomId>,
    pub admins: Vec<Located<AccountId>>,
    pub students: Vec<StudentBlock>,
}

/// Decimal grade text with a fractional part always present (`85.0`,
/// `-1.0`, `92.5`).
pub fn format_grade(grade: f64) -> String {
    let s = grade.to_string();
    if !grade.is_finite() || s.contains(['.', 'e', 'E']) {
        s
    } else {
        format!("{s}.0")
    }
}

fn push_line(out: &mut String, value: impl std::fmt::Display) {
    let _ = writeln!(out, "{value}");
}

fn push_profile(out: &mut String, p: &Profile) {
    push_line(out, &p.first_name);
    push_line(out, &p.last_name);
    push_line(out, &p.username);
    push_line(out, cipher::obscure(&p.password));
}

pub fn encode_admins<'a>(admins: impl IntoIterator<Item = &'a Account>) -> String {
    let mut out = String::new();
    for a in admins {
        push_profile(&mut out, &a.profile);
        push_line(&mut out, a.id);
    }
    out
}

pub fn encode_students<'a, I>(students: I) -> String
where
    I: IntoIterator<Item = &'a Account>,
    I::IntoIter: ExactSizeIterator,
{
    let students = students.into_iter();
    let mut out = String::new();
    push_line(&mut out, students.len());
    for s in students {
        push_line(&mut out, s.id);
        push_profile(&mut out, &s.profile);
    }
    out
}

/// Canonical list of one classroom: id then name, no grade.
pub fn encode_assignments(classroom: &Classroom) -> String {
    let mut out = String::new();
    push_line(&mut out, classroom.assignments.len());
    for a in &classroom.assignments {
        push_line(&mut out, a.id);
        push_line(&mut out, &a.name);
    }
    out
}

/// `personal` resolves a student id to their whole personal registry; each
/// roster entry repeats it in full.
pub fn encode_classrooms<'a, I, F>(classrooms: I, personal: F) -> String
where
    I: IntoIterator<Item = &'a Classroom>,
    I::IntoIter: ExactSizeIterator,
    F: Fn(AccountId) -> Vec<&'a Assignment>,
{
    let classrooms = classrooms.into_iter();
    let mut out = String::new();
    push_line(&mut out, classrooms.len());
    for c in classrooms {
        push_line(&mut out, &c.name);
        push_line(&mut out, c.id);
        push_line(&mut out, c.admins.len());
        for a in &c.admins {
            push_line(&mut out, a);
        }
        push_line(&mut out, c.roster.len());
        for student in c.roster.keys() {
            push_line(&mut out, student);
            let copies = personal(student);
            push_line(&mut out, copies.len());
            for a in copies {
                push_line(&mut out, &a.name);
                push_line(&mut out, a.id);
                push_line(&mut out, format_grade(a.grade));
            }
        }
    }
    out
}

/// Cursor over the lines of one file that reports 1-based positions.
struct Lines<'a> {
    file: PathBuf,
    lines: std::str::Lines<'a>,
    line_no: usize,
}

impl<'a> Lines<'a> {
    fn new(file: &Path, text: &'a str) -> Self {
        Self {
            file: file.to_path_buf(),
            lines: text.lines(),
            line_no: 0,
        }
    }

    fn malformed(&self, line: usize, reason: impl Into<String>) -> GradebookError {
        GradebookError::MalformedRecord {
            file: self.file.clone(),
            line,
            reason: reason.into(),
        }
    }

    fn at_end(&self) -> bool {
        self.lines.clone().next().is_none()
    }

    fn next_raw(&mut self) -> Option<&'a str> {
        let line = self.lines.next()?;
        self.line_no += 1;
        Some(line)
    }

    fn text(&mut self, what: &str) -> Result<String> {
        match self.next_raw() {
            Some(v) => Ok(v.to_string()),
            None => Err(self.malformed(self.line_no + 1, format!("missing {what}"))),
        }
    }

    fn parse<T: FromStr>(&mut self, what: &str) -> Result<Located<T>> {
        let Some(raw) = self.next_raw() else {
            return Err(self.malformed(self.line_no + 1, format!("missing {what}")));
        };
        match raw.trim().parse::<T>() {
            Ok(value) => Ok(Located {
                line: self.line_no,
                value,
            }),
            Err(_) => Err(self.malformed(self.line_no, format!("invalid {what}: {raw:?}"))),
        }
    }

    /// Leading count of a count-prefixed file; an empty file counts as zero.
    fn leading_count(&mut self, what: &str) -> Result<usize> {
        if self.at_end() {
            return Ok(0);
        }
        Ok(self.parse::<usize>(what)?.value)
    }

    fn finish(mut self) -> Result<()> {
        match self.next_raw() {
            None => Ok(()),
            Some(extra) => Err(self.malformed(
                self.line_no,
                format!("unexpected trailing line {extra:?}"),
            )),
        }
    }
}

fn decode_profile(lines: &mut Lines<'_>) -> Result<Profile> {
    Ok(Profile {
        first_name: lines.text("first name")?,
        last_name: lines.text("last name")?,
        username: lines.text("username")?,
        password: cipher::reveal(&lines.text("password")?),
    })
}

pub fn decode_admins(file: &Path, text: &str) -> Result<Vec<Account>> {
    let mut lines = Lines::new(file, text);
    let mut out = Vec::new();
    while !lines.at_end() {
        let profile = decode_profile(&mut lines)?;
        let id = lines.parse::<AccountId>("administrator id")?;
        out.push(Account::administrator(id.value, profile));
    }
    Ok(out)
}

pub fn decode_students(file: &Path, text: &str) -> Result<Vec<Account>> {
    let mut lines = Lines::new(file, text);
    let count = lines.leading_count("student count")?;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let id = lines.parse::<AccountId>("student id")?;
        let profile = decode_profile(&mut lines)?;
        out.push(Account::student(id.value, profile));
    }
    lines.finish()?;
    Ok(out)
}

pub fn decode_assignments(file: &Path, text: &str) -> Result<Vec<Assignment>> {
    let mut lines = Lines::new(file, text);
    let count = lines.leading_count("assignment count")?;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let id = lines.parse::<AssignmentId>("assignment id")?;
        let name = lines.text("assignment name")?;
        out.push(Assignment::new(id.value, name));
    }
    lines.finish()?;
    Ok(out)
}

pub fn decode_classrooms(file: &Path, text: &str) -> Result<Vec<ClassroomRecord>> {
    let mut lines = Lines::new(file, text);
    let count = lines.leading_count("classroom count")?;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let name = lines.text("classroom name")?;
        let id = lines.parse::<ClassroomId>("classroom id")?;

        let admin_count = lines.parse::<usize>("administrator count")?.value;
        let mut admins = Vec::with_capacity(admin_count);
        for _ in 0..admin_count {
            admins.push(lines.parse::<AccountId>("administrator id")?);
        }

        let student_count = lines.parse::<usize>("student count")?.value;
        let mut students = Vec::with_capacity(student_count);
        for _ in 0..student_count {
            let student = lines.parse::<AccountId>("student id")?;
            let assignment_count = lines.parse::<usize>("assignment count")?.value;
            let mut assignments = Vec::with_capacity(assignment_count);
            for _ in 0..assignment_count {
                let name = lines.text("assignment name")?;
                let id = lines.parse::<AssignmentId>("assignment id")?.value;
                let grade = lines.parse::<f64>("grade")?;
                if !grade.value.is_finite() {
                    return Err(lines.malformed(grade.line, "grade must be finite"));
                }
                let mut a = Assignment::new(id, name);
                a.grade = grade.value;
                assignments.push(a);
            }
            students.push(StudentBlock {
                student,
                assignments,
            });
        }

        out.push(ClassroomRecord {
            name,
            id,
            admins,
            students,
        });
    }
    lines.finish()?;
    Ok(out)
}
