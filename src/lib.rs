// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowsplit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowsplit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Flowsplit: a diff-friendly on-disk layout for flow documents.
//!
//! A host that persists its whole flow graph as one JSON document routes reads and writes
//! through [`storage::TranscodingStorage`]. On write, long or multi-line string properties move
//! into one sidecar file each, node coordinates move into a single coordinate file, and the slim
//! main document is written through the host's own storage. On read, the full document is put
//! back together.

pub mod model;
pub mod rules;
pub mod storage;
pub mod store;
