// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowsplit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowsplit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::io;
use std::path::Path;

use super::RawStorage;
use crate::model::{FileKind, StoredContent};

/// [`RawStorage`] straight on the local filesystem.
///
/// Writes copy the current file to the backup path first. Reads fall back to the backup when the
/// file is missing; a missing or blank file reads as [`StoredContent::Absent`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl RawStorage for FsStorage {
    async fn write_file(
        &self,
        path: &Path,
        content: String,
        backup_path: Option<&Path>,
    ) -> io::Result<()> {
        if let Some(backup_path) = backup_path {
            match tokio::fs::copy(path, backup_path).await {
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err),
            }
        }

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await
    }

    async fn read_file(
        &self,
        path: &Path,
        backup_path: Option<&Path>,
        _kind: FileKind,
    ) -> io::Result<StoredContent> {
        let text = match read_if_exists(path).await? {
            Some(text) => text,
            None => match backup_path {
                Some(backup_path) => match read_if_exists(backup_path).await? {
                    Some(text) => {
                        tracing::warn!(
                            path = %path.display(),
                            backup = %backup_path.display(),
                            "file missing; reading backup"
                        );
                        text
                    }
                    None => return Ok(StoredContent::Absent),
                },
                None => return Ok(StoredContent::Absent),
            },
        };

        if text.trim().is_empty() {
            return Ok(StoredContent::Absent);
        }

        serde_json::from_str(&text)
            .map(StoredContent::Json)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}

async fn read_if_exists(path: &Path) -> io::Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}
