// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowsplit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowsplit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Property holding the list of `"<property>.<extension>"` entries that currently live in
/// sidecar files.
pub const MANIFEST_KEY: &str = "_offload";

/// One node's property bag.
///
/// Key order is preserved so that a rewritten document diffs cleanly against the previous one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeRecord(Map<String, Value>);

impl NodeRecord {
    pub fn new(properties: Map<String, Value>) -> Self {
        Self(properties)
    }

    /// The node id, when present and a string.
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn node_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    pub fn get(&self, property: &str) -> Option<&Value> {
        self.0.get(property)
    }

    pub fn contains(&self, property: &str) -> bool {
        self.0.contains_key(property)
    }

    pub fn insert(&mut self, property: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(property.into(), value)
    }

    pub fn remove(&mut self, property: &str) -> Option<Value> {
        self.0.shift_remove(property)
    }

    /// Raw manifest value as persisted; validation happens when it is read back.
    pub fn manifest(&self) -> Option<&Value> {
        self.0.get(MANIFEST_KEY)
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_properties(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for NodeRecord {
    fn from(properties: Map<String, Value>) -> Self {
        Self(properties)
    }
}

/// Why a JSON value could not be treated as a flow document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidDocument {
    NotAnArray,
    NodeNotAnObject { index: usize },
}

impl fmt::Display for InvalidDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnArray => f.write_str("flow document must be a JSON array"),
            Self::NodeNotAnObject { index } => {
                write!(f, "flow document entry {index} is not a JSON object")
            }
        }
    }
}

impl std::error::Error for InvalidDocument {}

/// The full graph as persisted by the host, in authoring order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowDocument(Vec<NodeRecord>);

impl FlowDocument {
    pub fn new(nodes: Vec<NodeRecord>) -> Self {
        Self(nodes)
    }

    pub fn from_value(value: Value) -> Result<Self, InvalidDocument> {
        let Value::Array(entries) = value else {
            return Err(InvalidDocument::NotAnArray);
        };

        entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                Value::Object(properties) => Ok(NodeRecord(properties)),
                _ => Err(InvalidDocument::NodeNotAnObject { index }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn into_value(self) -> Value {
        Value::Array(self.0.into_iter().map(|node| Value::Object(node.0)).collect())
    }

    pub fn nodes(&self) -> &[NodeRecord] {
        &self.0
    }

    pub fn nodes_mut(&mut self) -> &mut [NodeRecord] {
        &mut self.0
    }

    pub fn into_nodes(self) -> Vec<NodeRecord> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl From<Vec<NodeRecord>> for FlowDocument {
    fn from(nodes: Vec<NodeRecord>) -> Self {
        Self(nodes)
    }
}
