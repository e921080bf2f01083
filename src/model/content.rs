// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowsplit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowsplit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde_json::Value;

/// Payload handed to a storage write: either already parsed, or JSON text.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowContent {
    Json(Value),
    Text(String),
}

impl FlowContent {
    /// Parses text content; parsed content is returned as is.
    pub fn into_value(self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Json(value) => Ok(value),
            Self::Text(text) => serde_json::from_str(&text),
        }
    }
}

impl From<Value> for FlowContent {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for FlowContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Result of a raw storage read.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredContent {
    /// The file does not exist; the host's "empty" sentinel.
    Absent,
    Json(Value),
}

/// Which kind of host file a read is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Flows,
    Credentials,
    Settings,
    Sessions,
}
