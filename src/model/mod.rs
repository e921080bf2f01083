// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowsplit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowsplit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! A flow document is an ordered list of node records. Each node is an open property bag keyed
//! by name; only `id`, `type`, `x`/`y` and the offload manifest have meaning to this crate.

pub mod content;
pub mod coordinates;
pub mod document;

pub use content::{FileKind, FlowContent, StoredContent};
pub use coordinates::{Coordinate, CoordinateParseError};
pub use document::{FlowDocument, InvalidDocument, NodeRecord, MANIFEST_KEY};
