//! Flat-file persistence of a [`Gradebook`].
//!
//! Every save truncates and rewrites all files from memory. There is no
//! temp-file-and-rename step, so a crash mid-write can leave a file cut
//! short; the next load then fails with `MalformedRecord` for that file.

pub mod codec;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::error::{EntityKind, GradebookError, Result};
use crate::gradebook::Gradebook;
use crate::ids::{AccountId, ClassroomId};
use crate::model::{Assignment, Classroom};

pub const ADMINS_FILE: &str = "admins.txt";
pub const STUDENTS_FILE: &str = "students.txt";
pub const CLASSROOMS_FILE: &str = "classrooms.txt";
const ASSIGNMENTS_SUFFIX: &str = "Assignments.txt";

pub fn assignments_file_name(classroom: ClassroomId) -> String {
    format!("{classroom}{ASSIGNMENTS_SUFFIX}")
}

/// Classroom id encoded in a per-classroom file name, if it is one.
pub fn parse_assignments_file_name(name: &str) -> Option<ClassroomId> {
    let digits = name.strip_suffix(ASSIGNMENTS_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| GradebookError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Every data file currently present, fixed files first.
    pub fn data_files(&self) -> Result<Vec<PathBuf>> {
        let mut fixed = Vec::new();
        for name in [ADMINS_FILE, STUDENTS_FILE, CLASSROOMS_FILE] {
            let p = self.path(name);
            if p.is_file() {
                fixed.push(p);
            }
        }
        let mut per_class: Vec<PathBuf> = self
            .assignment_files()?
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        per_class.sort();
        fixed.extend(per_class);
        Ok(fixed)
    }

    fn assignment_files(&self) -> Result<Vec<(ClassroomId, PathBuf)>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| GradebookError::io(&self.dir, e))?;
        let mut out = Vec::new();
        for ent in entries {
            let ent = ent.map_err(|e| GradebookError::io(&self.dir, e))?;
            let p = ent.path();
            if !p.is_file() {
                continue;
            }
            let Some(name) = p.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(id) = parse_assignments_file_name(name) {
                out.push((id, p));
            }
        }
        Ok(out)
    }

    fn read(&self, name: &str) -> Result<(PathBuf, String)> {
        let p = self.path(name);
        match std::fs::read_to_string(&p) {
            Ok(text) => Ok((p, text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok((p, String::new())),
            Err(e) => Err(GradebookError::io(p, e)),
        }
    }

    fn write(&self, name: &str, text: &str) -> Result<()> {
        let p = self.path(name);
        std::fs::write(&p, text).map_err(|e| GradebookError::io(&p, e))?;
        debug!("wrote {} ({} bytes)", p.display(), text.len());
        Ok(())
    }

    /// Rewrites every file from `book` and removes assignment files of
    /// classrooms that no longer exist.
    pub fn save(&self, book: &Gradebook) -> Result<()> {
        self.write(ADMINS_FILE, &codec::encode_admins(book.admins()))?;
        self.write(
            CLASSROOMS_FILE,
            &codec::encode_classrooms(book.classrooms(), |id| personal_copies(book, id)),
        )?;
        self.write(STUDENTS_FILE, &codec::encode_students(book.students()))?;
        for c in book.classrooms() {
            self.write(&assignments_file_name(c.id), &codec::encode_assignments(c))?;
        }

        for (id, p) in self.assignment_files()? {
            if book.classrooms().contains(id) {
                continue;
            }
            std::fs::remove_file(&p).map_err(|e| GradebookError::io(&p, e))?;
            debug!("removed stale {}", p.display());
        }
        Ok(())
    }

    /// Fills `book`, which should be empty, from the files on disk.
    ///
    /// Students and administrators load first so classroom records can be
    /// checked against them.
    pub fn load_into(&self, mut book: Gradebook) -> Result<Gradebook> {
        let (path, text) = self.read(STUDENTS_FILE)?;
        for student in codec::decode_students(&path, &text)? {
            if book.students().contains(student.id) {
                return Err(duplicate(&path, EntityKind::Student, student.id.into()));
            }
            book.restore_student(student);
        }

        let (path, text) = self.read(ADMINS_FILE)?;
        for admin in codec::decode_admins(&path, &text)? {
            if book.admins().contains(admin.id) || book.students().contains(admin.id) {
                return Err(duplicate(&path, EntityKind::Administrator, admin.id.into()));
            }
            book.restore_admin(admin);
        }

        let (path, text) = self.read(CLASSROOMS_FILE)?;
        let mut copy_lines = BTreeMap::new();
        for rec in codec::decode_classrooms(&path, &text)? {
            let id = rec.id.value;
            if book.classrooms().contains(id) {
                return Err(duplicate(&path, EntityKind::Classroom, id.into()));
            }
            let mut classroom = Classroom::new(id, rec.name);
            let (apath, atext) = self.read(&assignments_file_name(id))?;
            for a in codec::decode_assignments(&apath, &atext)? {
                if classroom.assignments.contains(a.id) {
                    return Err(duplicate(&apath, EntityKind::Assignment, a.id.into()));
                }
                classroom.assignments.insert(a);
            }
            book.restore_classroom(classroom);

            for admin in rec.admins {
                if book.classroom(id)?.admins.contains(&admin.value) {
                    let id = admin.value.into();
                    return Err(repeated(&path, admin.line, EntityKind::Administrator, id));
                }
                book.link_admin(id, admin.value)
                    .map_err(|e| dangling(&path, admin.line, e))?;
            }
            for block in rec.students {
                let student = block.student;
                if book.classroom(id)?.roster.contains(student.value) {
                    let id = student.value.into();
                    return Err(repeated(&path, student.line, EntityKind::Student, id));
                }
                copy_lines.insert(student.value, student.line);
                let account = book
                    .students_mut()
                    .find_mut(student.value)
                    .ok_or_else(|| {
                        dangling(
                            &path,
                            student.line,
                            GradebookError::not_found(EntityKind::Student, student.value),
                        )
                    })?;
                for copy in block.assignments {
                    account.adopt_assignment(copy);
                }
                book.enroll_student(id, student.value)
                    .map_err(|e| dangling(&path, student.line, e))?;
            }
        }

        for (student, line) in copy_lines {
            check_copies_owned(&book, student).map_err(|reason| GradebookError::MalformedRecord {
                file: path.clone(),
                line,
                reason,
            })?;
        }

        info!(
            "loaded {} administrators, {} students, {} classrooms from {}",
            book.admins().len(),
            book.students().len(),
            book.classrooms().len(),
            self.dir.display()
        );
        Ok(book)
    }

    /// Saves, logging instead of failing hard; the caller still gets the error.
    pub fn save_logged(&self, book: &Gradebook) -> Result<()> {
        self.save(book).inspect_err(|e| {
            warn!("save to {} failed, memory is ahead of disk: {e}", self.dir.display())
        })
    }
}

fn personal_copies(book: &Gradebook, student: AccountId) -> Vec<&Assignment> {
    book.student(student)
        .ok()
        .and_then(|a| a.assignments())
        .map(|reg| reg.iter().collect())
        .unwrap_or_default()
}

fn duplicate(path: &Path, kind: EntityKind, id: i64) -> GradebookError {
    GradebookError::MalformedRecord {
        file: path.to_path_buf(),
        line: 0,
        reason: format!("duplicate {kind} id {id}"),
    }
}

/// Every personal copy must mirror an assignment of a classroom the student
/// is enrolled in, otherwise unenrolling could never remove it.
fn check_copies_owned(book: &Gradebook, student: AccountId) -> std::result::Result<(), String> {
    let enrolled: Vec<&Classroom> = book
        .classrooms()
        .iter()
        .filter(|c| c.roster.contains(student))
        .collect();
    for copy in personal_copies(book, student) {
        if !enrolled.iter().any(|c| c.assignments.contains(copy.id)) {
            return Err(format!(
                "student {student} holds assignment {} from no enrolled classroom",
                copy.id
            ));
        }
    }
    Ok(())
}

fn repeated(path: &Path, line: usize, kind: EntityKind, id: i64) -> GradebookError {
    GradebookError::MalformedRecord {
        file: path.to_path_buf(),
        line,
        reason: format!("{kind} id {id} listed twice in one classroom"),
    }
}

fn dangling(path: &Path, line: usize, cause: GradebookError) -> GradebookError {
    GradebookError::MalformedRecord {
        file: path.to_path_buf(),
        line,
        reason: format!("unresolved reference: {cause}"),
    }
}
