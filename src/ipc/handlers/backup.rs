use serde_json::json;
use std::path::PathBuf;

use crate::backup;
use crate::error::GradebookError;
use crate::ipc::error::{respond, HandlerErr, HandlerResult};
use crate::ipc::helpers::{get_required_str, workspace};
use crate::ipc::types::{AppState, Request};

fn get_path(req: &Request, key: &str) -> Result<PathBuf, HandlerErr> {
    let v = get_required_str(&req.params, key)?;
    let v = v.trim();
    if v.is_empty() {
        return Err(HandlerErr::bad_params(format!("missing {key}")));
    }
    Ok(PathBuf::from(v))
}

fn handle_backup_export(state: &mut AppState, req: &Request) -> HandlerResult {
    let out = get_path(req, "outPath")?;
    let ws = workspace(state)?;
    // Disk must reflect memory even if an earlier save failed.
    ws.store.save_logged(&ws.book)?;
    let export = backup::export_workspace_bundle(&ws.store, &out).map_err(|e| {
        HandlerErr::new("io_failed", format!("{e:#}"))
            .with_details(json!({ "path": out.to_string_lossy() }))
    })?;
    Ok(json!({
        "path": out.to_string_lossy(),
        "bundleFormat": export.bundle_format,
        "fileCount": export.file_count,
    }))
}

/// Replaces the active workspace's files and reloads them. A bundle whose
/// files do not load leaves the workspace as it was.
fn handle_backup_import(state: &mut AppState, req: &Request) -> HandlerResult {
    let src = get_path(req, "inPath")?;
    if !src.is_file() {
        return Err(HandlerErr::new("not_found", "bundle file not found")
            .with_details(json!({ "path": src.to_string_lossy() })));
    }
    let dir = workspace(state)?.store.dir().to_path_buf();
    let import =
        backup::import_workspace_bundle(&src, &workspace(state)?.store).map_err(|e| {
            match e.downcast::<GradebookError>() {
                Ok(load) => HandlerErr::from(load),
                Err(e) => HandlerErr::new("io_failed", format!("{e:#}"))
                    .with_details(json!({ "path": src.to_string_lossy() })),
            }
        })?;
    let ws = state.open_workspace(&dir)?;
    Ok(json!({
        "workspacePath": dir.to_string_lossy(),
        "bundleFormatDetected": import.bundle_format_detected,
        "fileCount": import.file_count,
        "needsBootstrap": ws.book.needs_bootstrap(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "backup.export" => handle_backup_export(state, req),
        "backup.import" => handle_backup_import(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
