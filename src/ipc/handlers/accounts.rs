use serde_json::json;

use crate::gradebook::ProfilePatch;
use crate::ids::AccountId;
use crate::ipc::error::{respond, HandlerErr, HandlerResult};
use crate::ipc::helpers::{get_profile, get_required_id, mutate, workspace};
use crate::ipc::types::{AppState, Request};
use crate::model::AccountSummary;

fn patch_from(params: &serde_json::Value) -> Result<ProfilePatch, HandlerErr> {
    let patch = params.get("patch").cloned().unwrap_or_else(|| json!({}));
    serde_json::from_value(patch).map_err(|e| HandlerErr::bad_params(format!("invalid patch: {e}")))
}

fn handle_admins_list(state: &mut AppState, _req: &Request) -> HandlerResult {
    let ws = workspace(state)?;
    let admins: Vec<AccountSummary> = ws.book.admins().iter().map(AccountSummary::from).collect();
    Ok(json!({ "admins": admins }))
}

fn handle_admins_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let profile = get_profile(&req.params)?;
    let id = mutate(state, |book| book.register_admin(profile))?;
    Ok(json!({ "adminId": id }))
}

fn handle_admins_update(state: &mut AppState, req: &Request) -> HandlerResult {
    let id: AccountId = get_required_id(&req.params, "adminId")?;
    let patch = patch_from(&req.params)?;
    mutate(state, |book| book.update_admin(id, patch))?;
    Ok(json!({ "ok": true }))
}

fn handle_admins_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let id: AccountId = get_required_id(&req.params, "adminId")?;
    mutate(state, |book| book.delete_admin(id))?;
    if state.session == Some(id) {
        state.session = None;
    }
    let needs_bootstrap = workspace(state)?.book.needs_bootstrap();
    Ok(json!({ "ok": true, "needsBootstrap": needs_bootstrap }))
}

fn handle_students_list(state: &mut AppState, _req: &Request) -> HandlerResult {
    let ws = workspace(state)?;
    let students: Vec<AccountSummary> =
        ws.book.students().iter().map(AccountSummary::from).collect();
    Ok(json!({ "students": students }))
}

fn handle_students_create(state: &mut AppState, req: &Request) -> HandlerResult {
    let profile = get_profile(&req.params)?;
    let id = mutate(state, |book| book.register_student(profile))?;
    Ok(json!({ "studentId": id }))
}

fn handle_students_update(state: &mut AppState, req: &Request) -> HandlerResult {
    let id: AccountId = get_required_id(&req.params, "studentId")?;
    let patch = patch_from(&req.params)?;
    mutate(state, |book| book.update_student(id, patch))?;
    Ok(json!({ "ok": true }))
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> HandlerResult {
    let id: AccountId = get_required_id(&req.params, "studentId")?;
    mutate(state, |book| book.delete_student(id))?;
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "admins.list" => handle_admins_list(state, req),
        "admins.create" => handle_admins_create(state, req),
        "admins.update" => handle_admins_update(state, req),
        "admins.delete" => handle_admins_delete(state, req),
        "students.list" => handle_students_list(state, req),
        "students.create" => handle_students_create(state, req),
        "students.update" => handle_students_update(state, req),
        "students.delete" => handle_students_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
