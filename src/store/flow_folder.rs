// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowsplit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowsplit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::future::Future;
use std::io;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tokio::task::{JoinError, JoinSet};

use crate::model::{Coordinate, FlowDocument, InvalidDocument, MANIFEST_KEY};
use crate::rules::{offload_decision, OffloadDecision, OffloadRule, RuleTable};

/// Main documents are recognised by this file name suffix.
pub const FLOWS_SUFFIX: &str = "flows.json";
pub const COORDINATES_FILENAME: &str = "coord.json";
/// Upper bound on sidecar reads in flight during one decode.
pub const DECODE_BATCH_SIZE: usize = 10;

#[derive(Debug)]
pub enum StoreError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    InvalidDocument {
        path: PathBuf,
        source: InvalidDocument,
    },
    DuplicateNodeId {
        path: PathBuf,
        node_id: String,
    },
    InvalidManifest {
        node_id: Option<String>,
        reason: &'static str,
    },
    UnsafeManifestEntry {
        node_id: String,
        entry: String,
    },
    UnknownManifestEntry {
        node_id: String,
        node_type: String,
        entry: String,
    },
    SidecarRead {
        node_id: String,
        path: PathBuf,
        source: io::Error,
    },
    UnexpectedFlowPath {
        path: PathBuf,
    },
    PathOutsideFolder {
        folder: PathBuf,
        path: PathBuf,
    },
    SymlinkRefused {
        path: PathBuf,
    },
    Task {
        source: JoinError,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
            Self::Json { path, source } => write!(f, "json error at {path:?}: {source}"),
            Self::InvalidDocument { path, source } => {
                write!(f, "invalid flow document at {path:?}: {source}")
            }
            Self::DuplicateNodeId { path, node_id } => {
                write!(f, "duplicate node id {node_id:?} in {path:?}")
            }
            Self::InvalidManifest {
                node_id: Some(node_id),
                reason,
            } => write!(f, "invalid {MANIFEST_KEY} on node {node_id:?}: {reason}"),
            Self::InvalidManifest {
                node_id: None,
                reason,
            } => write!(f, "invalid {MANIFEST_KEY} on node without id: {reason}"),
            Self::UnsafeManifestEntry { node_id, entry } => write!(
                f,
                "refusing unsafe sidecar path {entry:?} in {MANIFEST_KEY} of node {node_id:?}"
            ),
            Self::UnknownManifestEntry {
                node_id,
                node_type,
                entry,
            } => write!(
                f,
                "{MANIFEST_KEY} entry {entry:?} of node {node_id:?} is not offloadable for type {node_type:?}"
            ),
            Self::SidecarRead {
                node_id,
                path,
                source,
            } => write!(
                f,
                "cannot read sidecar {path:?} listed by node {node_id:?}: {source}"
            ),
            Self::UnexpectedFlowPath { path } => write!(
                f,
                "flow read requested for {path:?}, which does not end with {FLOWS_SUFFIX:?}"
            ),
            Self::PathOutsideFolder { folder, path } => write!(
                f,
                "path is outside flow folder: folder={folder:?} path={path:?}"
            ),
            Self::SymlinkRefused { path } => {
                write!(f, "refusing to write through symlink at {path:?}")
            }
            Self::Task { source } => write!(f, "file task failed: {source}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::InvalidDocument { source, .. } => Some(source),
            Self::SidecarRead { source, .. } => Some(source),
            Self::Task { source } => Some(source),
            Self::DuplicateNodeId { .. }
            | Self::InvalidManifest { .. }
            | Self::UnsafeManifestEntry { .. }
            | Self::UnknownManifestEntry { .. }
            | Self::UnexpectedFlowPath { .. }
            | Self::PathOutsideFolder { .. }
            | Self::SymlinkRefused { .. } => None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WriteDurability {
    /// Fast, best-effort persistence.
    ///
    /// - Writes a temp file and renames atomically into place.
    /// - Does not perform per-file fsync/sync.
    #[default]
    BestEffort,

    /// Slower, best-effort durability.
    ///
    /// Attempts to flush written file contents and rename operations to stable storage where
    /// possible. Exact guarantees are platform/filesystem-dependent.
    Durable,
}

/// Result of one encode pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFlows {
    /// The slimmed main document.
    pub document: FlowDocument,
    /// Sidecars written or removed by the pass, in document order.
    pub touched: Vec<PathBuf>,
}

/// The directory a main flow document lives in, along with its sidecars.
#[derive(Debug, Clone)]
pub struct FlowFolder {
    root: PathBuf,
    durability: WriteDurability,
    rules: RuleTable,
}

/// One sidecar the decoder has to read back.
#[derive(Debug)]
struct SidecarRead {
    position: usize,
    node_id: String,
    property: &'static str,
    path: PathBuf,
}

impl FlowFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            durability: WriteDurability::default(),
            rules: RuleTable::default(),
        }
    }

    /// The folder holding the main document at `document_path`.
    pub fn for_document(document_path: &Path) -> Self {
        let root = document_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::new(root)
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn coordinates_path(&self) -> PathBuf {
        self.root.join(COORDINATES_FILENAME)
    }

    /// `<node id>.<property>.<extension>`, with the id escaped if it is not filename-safe.
    pub fn sidecar_path(&self, node_id: &str, rule: &OffloadRule) -> PathBuf {
        let file_stem = sidecar_file_stem(node_id);
        self.root
            .join(format!("{file_stem}.{}", rule.manifest_entry()))
    }

    /// Moves offloadable properties and coordinates out of `document` into sidecar files.
    ///
    /// Sidecars of properties that no longer qualify are deleted. The coordinate sidecar is
    /// rewritten in full on every pass. All file operations run concurrently; the pass only
    /// returns once each of them has settled, reporting the first failure.
    ///
    /// A repeated node id would make two nodes share sidecar files, so it fails the pass before
    /// anything is written.
    pub async fn encode(&self, mut document: FlowDocument) -> Result<EncodedFlows, StoreError> {
        index_node_ids(&self.root, &document)?;

        let mut tasks = JoinSet::new();
        let mut touched = Vec::new();
        let mut coordinates = Vec::new();

        for node in document.nodes_mut() {
            node.remove(MANIFEST_KEY);

            let Some(node_id) = node.id().map(str::to_owned) else {
                continue;
            };

            let node_type = node.node_type().unwrap_or_default().to_owned();
            let mut manifest = Vec::new();

            for rule in self.rules.rules_for(&node_type) {
                let path = self.sidecar_path(&node_id, rule);

                match offload_decision(node.get(rule.property)) {
                    OffloadDecision::Offload => {
                        if let Some(Value::String(text)) = node.remove(rule.property) {
                            let root = self.root.clone();
                            let target = path.clone();
                            let durability = self.durability;
                            tasks.spawn_blocking(move || {
                                write_atomic_in_folder(&root, &target, text.as_bytes(), durability)
                            });
                            manifest.push(Value::String(rule.manifest_entry()));
                        }
                    }
                    decision => {
                        if decision == OffloadDecision::Unsupported {
                            tracing::warn!(
                                node_id = %node_id,
                                property = rule.property,
                                "only string values can be offloaded; keeping inline"
                            );
                        }
                        tasks.spawn(remove_stale_sidecar(path.clone()));
                    }
                }

                touched.push(path);
            }

            if !manifest.is_empty() {
                node.insert(MANIFEST_KEY, Value::Array(manifest));
            }

            if node.contains("x") && node.contains("y") {
                if let (Some(x), Some(y)) = (node.remove("x"), node.remove("y")) {
                    coordinates.push(Coordinate { node_id, x, y });
                }
            }
        }

        let coordinates_path = self.coordinates_path();
        let coordinate_count = coordinates.len();
        let coordinates_json =
            serde_json::to_vec(&Coordinate::flatten(coordinates)).map_err(|source| {
                StoreError::Json {
                    path: coordinates_path.clone(),
                    source,
                }
            })?;
        let root = self.root.clone();
        let durability = self.durability;
        tasks.spawn_blocking(move || {
            write_atomic_in_folder(&root, &coordinates_path, &coordinates_json, durability)
        });

        settle(tasks).await?;

        tracing::debug!(
            folder = %self.root.display(),
            sidecars = touched.len(),
            coordinates = coordinate_count,
            "encoded flows"
        );

        Ok(EncodedFlows { document, touched })
    }

    /// Reinjects offloaded properties and coordinates into a document read from `document_path`.
    ///
    /// Node ids and manifests are validated before any sidecar is read. A missing or unreadable
    /// coordinate sidecar only drops coordinates; a missing property sidecar is fatal.
    pub async fn decode(
        &self,
        document_path: &Path,
        mut document: FlowDocument,
    ) -> Result<FlowDocument, StoreError> {
        let positions = index_node_ids(document_path, &document)?;
        let reads = self.plan_sidecar_reads(&document)?;
        let (sidecars, coordinates) =
            tokio::join!(read_sidecars(reads, read_sidecar), read_coordinates(self.coordinates_path()));
        let sidecars = sidecars?;

        let nodes = document.nodes_mut();
        for node in nodes.iter_mut() {
            node.remove(MANIFEST_KEY);
        }
        for (position, property, text) in sidecars {
            nodes[position].insert(property, Value::String(text));
        }
        for Coordinate { node_id, x, y } in coordinates {
            if let Some(&position) = positions.get(&node_id) {
                nodes[position].insert("x", x);
                nodes[position].insert("y", y);
            }
        }

        Ok(document)
    }

    fn plan_sidecar_reads(&self, document: &FlowDocument) -> Result<Vec<SidecarRead>, StoreError> {
        let mut reads = Vec::new();

        for (position, node) in document.nodes().iter().enumerate() {
            let Some(manifest) = node.manifest() else {
                continue;
            };
            let Some(node_id) = node.id() else {
                return Err(StoreError::InvalidManifest {
                    node_id: None,
                    reason: "node has no string id",
                });
            };
            let Value::Array(entries) = manifest else {
                return Err(StoreError::InvalidManifest {
                    node_id: Some(node_id.to_owned()),
                    reason: "expected an array of strings",
                });
            };
            let node_type = node.node_type().unwrap_or_default();

            for entry in entries {
                let Some(entry) = entry.as_str() else {
                    return Err(StoreError::InvalidManifest {
                        node_id: Some(node_id.to_owned()),
                        reason: "expected an array of strings",
                    });
                };
                if !is_safe_relative_path(Path::new(entry)) {
                    return Err(StoreError::UnsafeManifestEntry {
                        node_id: node_id.to_owned(),
                        entry: entry.to_owned(),
                    });
                }
                let Some(rule) = self.rules.rule_for_entry(node_type, entry) else {
                    return Err(StoreError::UnknownManifestEntry {
                        node_id: node_id.to_owned(),
                        node_type: node_type.to_owned(),
                        entry: entry.to_owned(),
                    });
                };

                reads.push(SidecarRead {
                    position,
                    node_id: node_id.to_owned(),
                    property: rule.property,
                    path: self.sidecar_path(node_id, rule),
                });
            }
        }

        Ok(reads)
    }
}

/// Maps each node id to its position, failing on the first repeated id.
fn index_node_ids(
    path: &Path,
    document: &FlowDocument,
) -> Result<HashMap<String, usize>, StoreError> {
    let mut positions = HashMap::with_capacity(document.len());
    for (position, node) in document.nodes().iter().enumerate() {
        let Some(node_id) = node.id() else {
            continue;
        };
        if positions.insert(node_id.to_owned(), position).is_some() {
            return Err(StoreError::DuplicateNodeId {
                path: path.to_path_buf(),
                node_id: node_id.to_owned(),
            });
        }
    }
    Ok(positions)
}

/// Position, property name and text of one sidecar read back.
type LoadedSidecar = (usize, &'static str, String);

/// Runs `read` for every planned sidecar, at most [`DECODE_BATCH_SIZE`] at a time, stopping at
/// the first failed batch.
async fn read_sidecars<F, Fut>(
    reads: Vec<SidecarRead>,
    read: F,
) -> Result<Vec<LoadedSidecar>, StoreError>
where
    F: Fn(SidecarRead) -> Fut,
    Fut: Future<Output = Result<LoadedSidecar, StoreError>> + Send + 'static,
{
    let mut loaded = Vec::with_capacity(reads.len());
    let mut reads = reads.into_iter().peekable();

    while reads.peek().is_some() {
        let mut batch = JoinSet::new();
        for planned in reads.by_ref().take(DECODE_BATCH_SIZE) {
            batch.spawn(read(planned));
        }
        loaded.extend(settle(batch).await?);
    }

    Ok(loaded)
}

async fn read_sidecar(read: SidecarRead) -> Result<LoadedSidecar, StoreError> {
    match tokio::fs::read_to_string(&read.path).await {
        Ok(text) => Ok((read.position, read.property, text)),
        Err(source) => Err(StoreError::SidecarRead {
            node_id: read.node_id,
            path: read.path,
            source,
        }),
    }
}

async fn read_coordinates(path: PathBuf) -> Vec<Coordinate> {
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "cannot read coordinates; skipping");
            return Vec::new();
        }
    };

    let parsed = serde_json::from_slice::<Value>(&bytes)
        .map_err(|err| err.to_string())
        .and_then(|value| Coordinate::unflatten(value).map_err(|err| err.to_string()));
    match parsed {
        Ok(coordinates) => coordinates,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "cannot parse coordinates; skipping");
            Vec::new()
        }
    }
}

async fn remove_stale_sidecar(path: PathBuf) -> Result<(), StoreError> {
    match tokio::fs::remove_file(&path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StoreError::Io { path, source }),
    }
}

/// Waits for every task, then reports the first failure.
async fn settle<T: 'static>(
    mut tasks: JoinSet<Result<T, StoreError>>,
) -> Result<Vec<T>, StoreError> {
    let mut outputs = Vec::with_capacity(tasks.len());
    let mut first_err = None;

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(output)) => outputs.push(output),
            Ok(Err(err)) => {
                first_err.get_or_insert(err);
            }
            Err(source) => {
                first_err.get_or_insert(StoreError::Task { source });
            }
        }
    }

    match first_err {
        Some(err) => Err(err),
        None => Ok(outputs),
    }
}

include!("flow_folder/helpers.rs");
