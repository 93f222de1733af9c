use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::gradebook::Gradebook;
use crate::store::{self, Store};

const MANIFEST_ENTRY: &str = "manifest.json";
const DATA_PREFIX: &str = "data/";
const STAGING_DIR: &str = ".import-staging";
pub const BUNDLE_FORMAT_V1: &str = "gradebook-workspace-v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestFile {
    name: String,
    sha256: String,
    bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    format: String,
    app_version: String,
    exported_at: String,
    files: Vec<ManifestFile>,
}

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub file_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub file_count: usize,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Only the data file roles may be restored, which also keeps entry names
/// from escaping the workspace.
fn is_data_file_name(name: &str) -> bool {
    matches!(
        name,
        store::ADMINS_FILE | store::STUDENTS_FILE | store::CLASSROOMS_FILE
    ) || store::parse_assignments_file_name(name).is_some()
}

/// Zips every data file of `store` with a manifest of sha256 checksums.
pub fn export_workspace_bundle(store: &Store, out_path: &Path) -> anyhow::Result<ExportSummary> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let mut files = Vec::new();
    let mut manifest_files = Vec::new();
    for path in store.data_files()? {
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("unexpected file name {}", path.to_string_lossy()))?
            .to_string();
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
        manifest_files.push(ManifestFile {
            name: name.clone(),
            sha256: sha256_hex(&bytes),
            bytes: bytes.len() as u64,
        });
        files.push((name, bytes));
    }

    let manifest = Manifest {
        format: BUNDLE_FORMAT_V1.to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        exported_at: chrono::Utc::now().to_rfc3339(),
        files: manifest_files,
    };

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    for (name, bytes) in &files {
        zip.start_file(format!("{DATA_PREFIX}{name}"), opts)
            .with_context(|| format!("failed to start entry {name}"))?;
        zip.write_all(bytes)
            .with_context(|| format!("failed to write entry {name}"))?;
    }
    zip.finish().context("failed to finalize zip bundle")?;

    log::info!(
        "exported {} data files to {}",
        files.len(),
        out_path.display()
    );
    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        file_count: files.len(),
    })
}

/// Verifies every checksum, then loads the bundle's files from a staging
/// directory. The workspace's data files are replaced only once that load
/// succeeds; on any earlier failure nothing in the workspace is touched.
pub fn import_workspace_bundle(in_path: &Path, store: &Store) -> anyhow::Result<ImportSummary> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: Manifest =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid")?;
    if manifest.format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", manifest.format));
    }

    let mut files = Vec::with_capacity(manifest.files.len());
    for entry in &manifest.files {
        if !is_data_file_name(&entry.name) {
            return Err(anyhow!("bundle lists unexpected file {}", entry.name));
        }
        let mut bytes = Vec::new();
        archive
            .by_name(&format!("{DATA_PREFIX}{}", entry.name))
            .with_context(|| format!("bundle missing {}", entry.name))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to extract {}", entry.name))?;
        let actual = sha256_hex(&bytes);
        if actual != entry.sha256 {
            return Err(anyhow!(
                "checksum mismatch for {}: expected {}, got {}",
                entry.name,
                entry.sha256,
                actual
            ));
        }
        files.push((entry.name.as_str(), bytes));
    }

    let staging = store.dir().join(STAGING_DIR);
    let staged = stage_and_load(&staging, &files);
    if let Err(e) = staged {
        remove_staging(&staging);
        return Err(e);
    }

    for old in store.data_files()? {
        std::fs::remove_file(&old)
            .with_context(|| format!("failed to remove {}", old.to_string_lossy()))?;
    }
    for (name, _) in &files {
        let dst = store.dir().join(name);
        std::fs::rename(staging.join(name), &dst)
            .with_context(|| format!("failed to move {} into place", dst.to_string_lossy()))?;
    }
    remove_staging(&staging);

    log::info!(
        "imported {} data files from {}",
        files.len(),
        in_path.display()
    );
    Ok(ImportSummary {
        bundle_format_detected: manifest.format.clone(),
        file_count: files.len(),
    })
}

/// Writes `files` under `staging` and loads them into a scratch gradebook.
/// Load failures are returned as the underlying [`GradebookError`] so
/// callers can report them with their own code.
fn stage_and_load(staging: &Path, files: &[(&str, Vec<u8>)]) -> anyhow::Result<()> {
    if staging.exists() {
        std::fs::remove_dir_all(staging)
            .with_context(|| format!("failed to clear {}", staging.to_string_lossy()))?;
    }
    let scratch = Store::open(staging)?;
    for (name, bytes) in files {
        let dst = staging.join(name);
        std::fs::write(&dst, bytes)
            .with_context(|| format!("failed to write {}", dst.to_string_lossy()))?;
    }
    scratch.load_into(Gradebook::new())?;
    Ok(())
}

fn remove_staging(staging: &Path) {
    if let Err(e) = std::fs::remove_dir_all(staging) {
        log::warn!("could not remove {}: {e}", staging.display());
    }
}
