use serde_json::json;

use super::classes::average_json;
use crate::ids::{AccountId, AssignmentId, ClassroomId};
use crate::ipc::error::{respond, HandlerErr, HandlerResult};
use crate::ipc::helpers::{get_required_f64, get_required_id, get_required_name, mutate, workspace};
use crate::ipc::types::{AppState, Request};
use crate::model::UNGRADED;

fn ids(req: &Request) -> Result<(ClassroomId, AssignmentId), HandlerErr> {
    Ok((
        get_required_id(&req.params, "classId")?,
        get_required_id(&req.params, "assignmentId")?,
    ))
}

fn handle_assignments_list(state: &mut AppState, req: &Request) -> HandlerResult {
    let class: ClassroomId = get_required_id(&req.params, "classId")?;
    let assignments = workspace(state)?.book.canonical_assignments(class)?;
    Ok(json!({ "assignments": assignments }))
}

fn handle_assignments_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let class: ClassroomId = get_required_id(&req.params, "classId")?;
    let name = get_required_name(&req.params, "name")?;
    let id = mutate(state, |book| book.create_assignment(class, &name))?;
    Ok(json!({ "assignmentId": id, "name": name }))
}

fn handle_assignments_rename(state: &mut AppState, req: &Request) -> HandlerResult {
    let (class, id) = ids(req)?;
    let name = get_required_name(&req.params, "name")?;
    mutate(state, |book| book.rename_assignment(class, id, &name))?;
    Ok(json!({ "ok": true }))
}

fn handle_assignments_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let (class, id) = ids(req)?;
    mutate(state, |book| book.delete_assignment(class, id))?;
    Ok(json!({ "ok": true }))
}

/// `grade: null` clears a grade back to ungraded.
fn handle_assignments_grade(state: &mut AppState, req: &Request) -> HandlerResult {
    let (class, id) = ids(req)?;
    let student: AccountId = get_required_id(&req.params, "studentId")?;
    let grade = match req.params.get("grade") {
        Some(serde_json::Value::Null) => UNGRADED,
        _ => get_required_f64(&req.params, "grade")?,
    };
    mutate(state, |book| book.grade_assignment(class, student, id, grade))?;
    Ok(json!({ "ok": true }))
}

fn handle_assignments_average(state: &mut AppState, req: &Request) -> HandlerResult {
    let (class, id) = ids(req)?;
    let stats = workspace(state)?.book.average_grade(class, id)?;
    Ok(json!({
        "average": average_json(&stats),
        "gradedCount": stats.graded_count,
        "ungradedCount": stats.ungraded_count,
    }))
}

fn handle_grades_student(state: &mut AppState, req: &Request) -> HandlerResult {
    let class: ClassroomId = get_required_id(&req.params, "classId")?;
    let student: AccountId = get_required_id(&req.params, "studentId")?;
    let book = &workspace(state)?.book;
    let grades = book.student_grades(class, student)?;
    let avg = book.student_average(class, student)?;
    Ok(json!({
        "assignments": grades,
        "average": average_json(&avg),
        "gradedCount": avg.graded_count,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "assignments.list" => handle_assignments_list(state, req),
        "assignments.create" => handle_assignments_create(state, req),
        "assignments.rename" => handle_assignments_rename(state, req),
        "assignments.delete" => handle_assignments_delete(state, req),
        "assignments.grade" => handle_assignments_grade(state, req),
        "assignments.average" => handle_assignments_average(state, req),
        "grades.student" => handle_grades_student(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
