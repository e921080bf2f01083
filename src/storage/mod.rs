// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowsplit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowsplit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The seam between the host and the flow folder format.
//!
//! A host implements [`RawStorage`] over its own file primitives (backup files, "empty"
//! handling) and optionally a [`Stager`] over its version control, then routes its document reads
//! and writes through a [`TranscodingStorage`] wrapping both.

use std::future::Future;
use std::io;
use std::path::Path;

use crate::model::{FileKind, StoredContent};
use crate::store::StagingReport;

pub mod fs;
pub mod transcoding;

pub use fs::FsStorage;
pub use transcoding::TranscodingStorage;

/// The host's underlying file primitives.
pub trait RawStorage: Send + Sync {
    /// Persists `content` at `path`, keeping the previous version at `backup_path` if given.
    fn write_file(
        &self,
        path: &Path,
        content: String,
        backup_path: Option<&Path>,
    ) -> impl Future<Output = io::Result<()>> + Send;

    /// Reads and parses `path`, returning [`StoredContent::Absent`] when there is nothing there.
    fn read_file(
        &self,
        path: &Path,
        backup_path: Option<&Path>,
        kind: FileKind,
    ) -> impl Future<Output = io::Result<StoredContent>> + Send;
}

/// Version control collaborator that stages the files changed by a save.
pub trait Stager: Send + Sync {
    fn stage(&self, report: &StagingReport) -> impl Future<Output = io::Result<()>> + Send;
}

/// For hosts without version control.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStaging;

impl Stager for NoStaging {
    async fn stage(&self, _report: &StagingReport) -> io::Result<()> {
        Ok(())
    }
}
