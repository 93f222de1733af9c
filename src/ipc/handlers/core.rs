use std::path::PathBuf;

use log::info;
use serde_json::json;

use crate::ids::AccountId;
use crate::ipc::error::{respond, HandlerErr, HandlerResult};
use crate::ipc::helpers::{get_profile, get_required_str, mutate, workspace};
use crate::ipc::types::{AppState, Request};

fn handle_health(state: &mut AppState, _req: &Request) -> HandlerResult {
    let ws = state.workspace.as_ref();
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": ws.map(|w| w.store.dir().to_string_lossy().to_string()),
        "needsBootstrap": ws.map(|w| w.book.needs_bootstrap()),
        "sessionAdminId": state.session,
    }))
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> HandlerResult {
    let path = PathBuf::from(get_required_str(&req.params, "path")?);
    let ws = state.open_workspace(&path)?;
    Ok(json!({
        "workspacePath": path.to_string_lossy(),
        "needsBootstrap": ws.book.needs_bootstrap(),
        "adminCount": ws.book.admins().len(),
        "studentCount": ws.book.students().len(),
        "classCount": ws.book.classrooms().len(),
    }))
}

/// First run: the administrator registry is empty, so the credentials given
/// become the root account.
fn handle_auth_bootstrap(state: &mut AppState, req: &Request) -> HandlerResult {
    let profile = get_profile(&req.params)?;
    let id = mutate(state, |book| book.bootstrap_admin(profile))?;
    state.session = Some(id);
    Ok(json!({ "adminId": id }))
}

fn handle_auth_login(state: &mut AppState, req: &Request) -> HandlerResult {
    let username = get_required_str(&req.params, "username")?;
    let password = get_required_str(&req.params, "password")?;
    let ws = workspace(state)?;
    if ws.book.needs_bootstrap() {
        return Err(HandlerErr::new(
            "needs_bootstrap",
            "no administrator exists yet; call auth.bootstrap",
        ));
    }
    let id = ws.book.authenticate(&username, &password)?;
    state.session = Some(id);
    info!("administrator {id} logged in");
    Ok(json!({ "adminId": id }))
}

fn handle_workspace_purge(state: &mut AppState, _req: &Request) -> HandlerResult {
    let keep: AccountId = state
        .session
        .ok_or_else(|| HandlerErr::new("no_session", "log in before purging"))?;
    mutate(state, |book| book.purge_all(keep))?;
    Ok(json!({ "keptAdminId": keep }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "health" => handle_health(state, req),
        "workspace.select" => handle_workspace_select(state, req),
        "workspace.purge" => handle_workspace_purge(state, req),
        "auth.bootstrap" => handle_auth_bootstrap(state, req),
        "auth.login" => handle_auth_login(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
