// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowsplit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowsplit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::{Path, PathBuf};

/// Files changed by one save, to be staged together.
///
/// Sidecar paths include files that were deleted because their property went back inline. The
/// coordinate sidecar is never listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingReport {
    document: PathBuf,
    sidecars: Vec<PathBuf>,
}

impl StagingReport {
    pub fn new(document: impl Into<PathBuf>, sidecars: Vec<PathBuf>) -> Self {
        Self {
            document: document.into(),
            sidecars,
        }
    }

    pub fn document(&self) -> &Path {
        &self.document
    }

    pub fn sidecars(&self) -> &[PathBuf] {
        &self.sidecars
    }

    /// The main document followed by every touched sidecar.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.document.as_path()).chain(self.sidecars.iter().map(PathBuf::as_path))
    }

    pub fn is_empty(&self) -> bool {
        self.sidecars.is_empty()
    }
}
