//! Loading and committing the (configuration, roster) document pair.
//!
//! Documents are held as whole JSON objects so every top-level key the store
//! does not own survives a rewrite. A commit serializes both documents,
//! stages each in a temporary file beside its target, and only then renames
//! them into place, configuration first.

use log::debug;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use vpanel_core::{Credential, DocumentPaths, ProvisionError, ProvisionResult};

pub const INBOUNDS_KEY: &str = "inbounds";
pub const CLIENTS_KEY: &str = "clients";

const CONFIG_INDENT: &[u8] = b"  ";
const ROSTER_INDENT: &[u8] = b" ";

/// One JSON document read from disk.
#[derive(Debug, Clone)]
pub struct JsonDocument {
    path: PathBuf,
    root: Map<String, Value>,
}

impl JsonDocument {
    pub async fn load(path: &Path) -> ProvisionResult<Self> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| ProvisionError::persistence(&format!("reading {}", path.display()), e))?;
        let root: Map<String, Value> = serde_json::from_slice(&raw)
            .map_err(|e| ProvisionError::persistence(&format!("parsing {}", path.display()), e))?;
        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw entries of the `inbounds` array, which must exist.
    pub fn inbounds(&self) -> ProvisionResult<Vec<Value>> {
        match self.root.get(INBOUNDS_KEY) {
            Some(Value::Array(entries)) => Ok(entries.clone()),
            Some(_) => Err(ProvisionError::Persistence(format!(
                "'{}' in {} is not an array",
                INBOUNDS_KEY,
                self.path.display()
            ))),
            None => Err(ProvisionError::Persistence(format!(
                "{} has no '{}' key",
                self.path.display(),
                INBOUNDS_KEY
            ))),
        }
    }

    /// The `clients` roster; a missing key is an empty roster.
    pub fn clients(&self) -> ProvisionResult<Vec<Credential>> {
        match self.root.get(CLIENTS_KEY) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                let context = format!("decoding clients of {}", self.path.display());
                ProvisionError::persistence(&context, e)
            }),
        }
    }

    pub fn set_inbounds(&mut self, inbounds: Vec<Value>) {
        self.root.insert(INBOUNDS_KEY.to_string(), Value::Array(inbounds));
    }

    pub fn set_clients(&mut self, clients: &[Credential]) -> ProvisionResult<()> {
        let value = serde_json::to_value(clients)
            .map_err(|e| ProvisionError::persistence("encoding clients", e))?;
        self.root.insert(CLIENTS_KEY.to_string(), value);
        Ok(())
    }

    fn render(&self, indent: &[u8]) -> ProvisionResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(indent));
        self.root.serialize(&mut ser).map_err(|e| {
            ProvisionError::persistence(&format!("encoding {}", self.path.display()), e)
        })?;
        Ok(out)
    }
}

/// Both documents of one local protocol, loaded together.
#[derive(Debug, Clone)]
pub struct DocumentPair {
    pub config: JsonDocument,
    pub roster: JsonDocument,
}

impl DocumentPair {
    pub async fn load(paths: &DocumentPaths) -> ProvisionResult<Self> {
        let config = JsonDocument::load(&paths.config).await?;
        let roster = JsonDocument::load(&paths.roster).await?;
        Ok(Self { config, roster })
    }

    /// Write both documents back.
    ///
    /// Nothing on disk changes if encoding or staging fails. A failure
    /// between the two renames leaves the pair out of step, which the
    /// consistency check reports.
    pub async fn commit(self) -> ProvisionResult<()> {
        let config_bytes = self.config.render(CONFIG_INDENT)?;
        let roster_bytes = self.roster.render(ROSTER_INDENT)?;
        let config_path = self.config.path;
        let roster_path = self.roster.path;

        tokio::task::spawn_blocking(move || {
            let staged_config = stage(&config_path, &config_bytes)?;
            let staged_roster = stage(&roster_path, &roster_bytes)?;
            publish(staged_config, &config_path)?;
            publish(staged_roster, &roster_path)?;
            debug!(
                "committed {} and {}",
                config_path.display(),
                roster_path.display()
            );
            Ok(())
        })
        .await
        .map_err(|e| ProvisionError::persistence("document commit task", e))?
    }
}

fn stage(target: &Path, bytes: &[u8]) -> ProvisionResult<NamedTempFile> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let context = format!("staging {}", target.display());
    let mut staged =
        NamedTempFile::new_in(dir).map_err(|e| ProvisionError::persistence(&context, e))?;
    staged
        .write_all(bytes)
        .and_then(|_| staged.as_file().sync_all())
        .map_err(|e| ProvisionError::persistence(&context, e))?;
    if let Ok(meta) = std::fs::metadata(target) {
        staged
            .as_file()
            .set_permissions(meta.permissions())
            .map_err(|e| ProvisionError::persistence(&context, e))?;
    }
    Ok(staged)
}

fn publish(staged: NamedTempFile, target: &Path) -> ProvisionResult<()> {
    staged.persist(target).map(|_| ()).map_err(|e| {
        ProvisionError::persistence(&format!("replacing {}", target.display()), e.error)
    })
}
