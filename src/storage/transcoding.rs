// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowsplit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowsplit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::ffi::OsStr;
use std::future::Future;
use std::path::Path;

use super::{NoStaging, RawStorage, Stager};
use crate::model::{FileKind, FlowContent, FlowDocument, StoredContent};
use crate::rules::RuleTable;
use crate::store::{
    FlowFolder, StagingReport, StoreError, WriteDurability, WriteQueue, FLOWS_SUFFIX,
};

/// Wraps the host's raw storage so flow documents are split on write and reassembled on read.
///
/// Everything that is not a flow document passes through untouched.
#[derive(Debug)]
pub struct TranscodingStorage<S, G = NoStaging> {
    raw: S,
    stager: G,
    queue: WriteQueue,
    durability: WriteDurability,
    rules: RuleTable,
}

impl<S: RawStorage> TranscodingStorage<S> {
    pub fn new(raw: S) -> Self {
        Self::with_stager(raw, NoStaging)
    }
}

impl<S: RawStorage, G: Stager> TranscodingStorage<S, G> {
    pub fn with_stager(raw: S, stager: G) -> Self {
        Self {
            raw,
            stager,
            queue: WriteQueue::new(),
            durability: WriteDurability::default(),
            rules: RuleTable::default(),
        }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn with_rules(mut self, rules: RuleTable) -> Self {
        self.rules = rules;
        self
    }

    pub fn raw(&self) -> &S {
        &self.raw
    }

    pub fn stager(&self) -> &G {
        &self.stager
    }

    pub fn queue(&self) -> &WriteQueue {
        &self.queue
    }

    fn folder_for(&self, document_path: &Path) -> FlowFolder {
        FlowFolder::for_document(document_path)
            .with_durability(self.durability)
            .with_rules(self.rules)
    }

    /// Intercepted write.
    ///
    /// Flow documents take their place in the per-path write queue when this is called, so
    /// writes to the same document apply in call order even if their futures are polled out of
    /// order.
    pub fn write_file<'a>(
        &'a self,
        path: &'a Path,
        content: FlowContent,
        backup_path: Option<&'a Path>,
    ) -> impl Future<Output = Result<(), StoreError>> + 'a {
        let permit = is_flows_path(path).then(|| self.queue.admit(path));

        async move {
            let Some(permit) = permit else {
                let text = match content {
                    FlowContent::Text(text) => text,
                    FlowContent::Json(value) => {
                        serde_json::to_string_pretty(&value).map_err(|source| StoreError::Json {
                            path: path.to_path_buf(),
                            source,
                        })?
                    }
                };
                return self
                    .raw
                    .write_file(path, text, backup_path)
                    .await
                    .map_err(|source| StoreError::Io {
                        path: path.to_path_buf(),
                        source,
                    });
            };

            let _permit = permit.ready().await;
            self.write_flows(path, content, backup_path).await
        }
    }

    async fn write_flows(
        &self,
        path: &Path,
        content: FlowContent,
        backup_path: Option<&Path>,
    ) -> Result<(), StoreError> {
        let value = content.into_value().map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let document =
            FlowDocument::from_value(value).map_err(|source| StoreError::InvalidDocument {
                path: path.to_path_buf(),
                source,
            })?;

        let encoded = self.folder_for(path).encode(document).await?;
        let text = encoded
            .document
            .to_pretty_json()
            .map_err(|source| StoreError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        self.raw
            .write_file(path, text, backup_path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let report = StagingReport::new(path, encoded.touched);
        if let Err(err) = self.stager.stage(&report).await {
            tracing::warn!(
                path = %path.display(),
                sidecars = report.sidecars().len(),
                error = %err,
                "staging flow files failed"
            );
        }

        Ok(())
    }

    /// Intercepted read.
    ///
    /// Absent files and non-flow kinds are returned as the raw storage produced them.
    pub async fn read_file(
        &self,
        path: &Path,
        backup_path: Option<&Path>,
        kind: FileKind,
    ) -> Result<StoredContent, StoreError> {
        let content = self
            .raw
            .read_file(path, backup_path, kind)
            .await
            .map_err(|source| StoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let value = match content {
            StoredContent::Json(value) if kind == FileKind::Flows => value,
            other => return Ok(other),
        };

        if !is_flows_path(path) {
            return Err(StoreError::UnexpectedFlowPath {
                path: path.to_path_buf(),
            });
        }

        let document =
            FlowDocument::from_value(value).map_err(|source| StoreError::InvalidDocument {
                path: path.to_path_buf(),
                source,
            })?;
        let document = self.folder_for(path).decode(path, document).await?;

        Ok(StoredContent::Json(document.into_value()))
    }
}

fn is_flows_path(path: &Path) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| name.ends_with(FLOWS_SUFFIX))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::is_flows_path;

    #[test]
    fn flows_path_matches_file_name_suffix() {
        assert!(is_flows_path(Path::new("/home/u/.node-red/flows.json")));
        assert!(is_flows_path(Path::new("my-flows.json")));
        assert!(!is_flows_path(Path::new("/data/flows_cred.json")));
        assert!(!is_flows_path(Path::new("/data/flows.json/settings.js")));
        assert!(!is_flows_path(Path::new("/")));
    }
}
