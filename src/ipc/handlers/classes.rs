use serde_json::json;

use crate::ids::{AccountId, ClassroomId};
use crate::ipc::error::{respond, HandlerErr, HandlerResult};
use crate::ipc::helpers::{
    get_optional_id, get_required_id, get_required_name, mutate, workspace,
};
use crate::ipc::types::{AppState, Request};
use crate::calc::GradeAverage;
use crate::model::ClassroomSummary;

fn class_id(req: &Request) -> Result<ClassroomId, HandlerErr> {
    get_required_id(&req.params, "classId")
}

fn student_id(req: &Request) -> Result<AccountId, HandlerErr> {
    get_required_id(&req.params, "studentId")
}

/// Averages with nothing graded go out as `null`. A real mean of -1 is
/// sent as a number.
pub(super) fn average_json(avg: &GradeAverage) -> serde_json::Value {
    if avg.has_grades() {
        json!(avg.mean)
    } else {
        serde_json::Value::Null
    }
}

fn handle_classes_list(state: &mut AppState, _req: &Request) -> HandlerResult {
    let Some(ws) = state.workspace.as_ref() else {
        return Ok(json!({ "classes": [] }));
    };
    let classes: Vec<ClassroomSummary> =
        ws.book.classrooms().iter().map(ClassroomSummary::from).collect();
    Ok(json!({ "classes": classes }))
}

/// The owning administrator defaults to the logged-in one.
fn handle_classes_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let name = get_required_name(&req.params, "name")?;
    let admin = get_optional_id::<AccountId>(&req.params, "adminId")?
        .or(state.session)
        .ok_or_else(|| HandlerErr::bad_params("missing adminId (or log in first)"))?;
    let id = mutate(state, |book| book.create_classroom(admin, &name))?;
    Ok(json!({ "classId": id, "name": name }))
}

fn handle_classes_rename(state: &mut AppState, req: &Request) -> HandlerResult {
    let id = class_id(req)?;
    let name = get_required_name(&req.params, "name")?;
    mutate(state, |book| book.rename_classroom(id, &name))?;
    Ok(json!({ "ok": true }))
}

fn handle_classes_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let id = class_id(req)?;
    let removed = mutate(state, |book| book.delete_classroom(id))?;
    Ok(json!({
        "ok": true,
        "unenrolledStudents": removed.roster.len(),
        "deletedAssignments": removed.assignments.len(),
    }))
}

fn handle_classes_link_admin(state: &mut AppState, req: &Request) -> HandlerResult {
    let id = class_id(req)?;
    let admin: AccountId = get_required_id(&req.params, "adminId")?;
    mutate(state, |book| book.link_admin(id, admin))?;
    Ok(json!({ "ok": true }))
}

fn handle_classes_roster(state: &mut AppState, req: &Request) -> HandlerResult {
    let id = class_id(req)?;
    let roster = workspace(state)?.book.roster(id)?;
    Ok(json!({ "students": roster }))
}

fn handle_classes_enroll(state: &mut AppState, req: &Request) -> HandlerResult {
    let id = class_id(req)?;
    let student = student_id(req)?;
    mutate(state, |book| book.enroll_student(id, student))?;
    Ok(json!({ "ok": true }))
}

fn handle_classes_unenroll(state: &mut AppState, req: &Request) -> HandlerResult {
    let id = class_id(req)?;
    let student = student_id(req)?;
    mutate(state, |book| book.unenroll_student(id, student))?;
    Ok(json!({ "ok": true }))
}

fn handle_classes_average(state: &mut AppState, req: &Request) -> HandlerResult {
    let id = class_id(req)?;
    let book = &workspace(state)?.book;
    let average = book.class_average(id)?;
    let students = book
        .classroom(id)?
        .student_ids()
        .into_iter()
        .map(|s| {
            let avg = book.student_average(id, s)?;
            Ok(json!({
                "studentId": s,
                "average": average_json(&avg),
                "gradedCount": avg.graded_count,
            }))
        })
        .collect::<crate::error::Result<Vec<_>>>()?;
    // Only an empty roster has no class average; any other value is real.
    let average = if students.is_empty() {
        serde_json::Value::Null
    } else {
        json!(average)
    };
    Ok(json!({
        "average": average,
        "rosterSize": students.len(),
        "students": students,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "classes.list" => handle_classes_list(state, req),
        "classes.create" => handle_classes_create(state, req),
        "classes.rename" => handle_classes_rename(state, req),
        "classes.delete" => handle_classes_delete(state, req),
        "classes.linkAdmin" => handle_classes_link_admin(state, req),
        "classes.roster" => handle_classes_roster(state, req),
        "classes.enroll" => handle_classes_enroll(state, req),
        "classes.unenroll" => handle_classes_unenroll(state, req),
        "classes.average" => handle_classes_average(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
