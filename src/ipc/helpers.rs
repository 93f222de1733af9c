use std::str::FromStr;

use super::error::HandlerErr;
use super::types::{AppState, Workspace};
use crate::error::Result;
use crate::gradebook::Gradebook;
use crate::model::Profile;

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {key}")))
}

/// Same as [`get_required_str`] but rejects blank values.
pub fn get_required_name(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let v = get_required_str(params, key)?;
    let v = v.trim();
    if v.is_empty() {
        return Err(HandlerErr::bad_params(format!("{key} must not be empty")));
    }
    Ok(v.to_string())
}

/// Ids travel as JSON numbers; decimal strings are accepted too.
pub fn get_required_id<T: FromStr>(params: &serde_json::Value, key: &str) -> Result<T, HandlerErr> {
    let raw = match params.get(key) {
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        _ => return Err(HandlerErr::bad_params(format!("missing {key}"))),
    };
    raw.trim()
        .parse::<T>()
        .map_err(|_| HandlerErr::bad_params(format!("{key} is not a valid id: {raw}")))
}

pub fn get_optional_id<T: FromStr>(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<T>, HandlerErr> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(_) => get_required_id(params, key).map(Some),
    }
}

pub fn get_required_f64(params: &serde_json::Value, key: &str) -> Result<f64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing numeric {key}")))
}

pub fn get_profile(params: &serde_json::Value) -> Result<Profile, HandlerErr> {
    Ok(Profile {
        first_name: get_required_str(params, "firstName")?,
        last_name: get_required_str(params, "lastName")?,
        username: get_required_str(params, "username")?,
        password: get_required_str(params, "password")?,
    })
}

pub fn workspace(state: &AppState) -> Result<&Workspace, HandlerErr> {
    state
        .workspace
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn workspace_mut(state: &mut AppState) -> Result<&mut Workspace, HandlerErr> {
    state
        .workspace
        .as_mut()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

/// Applies one mutation and writes every file back. A failed write keeps the
/// mutation in memory and reports `persist_failed`.
pub fn mutate<T>(
    state: &mut AppState,
    f: impl FnOnce(&mut Gradebook) -> Result<T>,
) -> Result<T, HandlerErr> {
    let ws = workspace_mut(state)?;
    let out = f(&mut ws.book)?;
    ws.store.save_logged(&ws.book)?;
    Ok(out)
}
