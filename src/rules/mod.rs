// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowsplit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowsplit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Which node properties may be moved into sidecar files, and when.

use serde_json::Value;

/// Inline strings at least this many characters long are offloaded even without a line break.
pub const OFFLOAD_MIN_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffloadRule {
    pub property: &'static str,
    /// File extension of the sidecar, without the leading dot.
    pub extension: &'static str,
}

impl OffloadRule {
    pub const fn new(property: &'static str, extension: &'static str) -> Self {
        Self { property, extension }
    }

    /// The `"<property>.<extension>"` form used in manifests and sidecar filenames.
    pub fn manifest_entry(&self) -> String {
        format!("{}.{}", self.property, self.extension)
    }

    fn matches_entry(&self, entry: &str) -> bool {
        entry
            .strip_prefix(self.property)
            .and_then(|rest| rest.strip_prefix('.'))
            .is_some_and(|extension| extension == self.extension)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeTypeRules {
    pub node_type: &'static str,
    pub rules: &'static [OffloadRule],
}

const BUILTIN_RULES: &[NodeTypeRules] = &[
    NodeTypeRules {
        node_type: "function",
        rules: &[
            OffloadRule::new("func", "js"),
            OffloadRule::new("initialize", "js"),
            OffloadRule::new("finalize", "js"),
        ],
    },
    NodeTypeRules {
        node_type: "template",
        rules: &[OffloadRule::new("template", "htm")],
    },
    NodeTypeRules {
        node_type: "ui_template",
        rules: &[OffloadRule::new("format", "htm")],
    },
    NodeTypeRules {
        node_type: "comment",
        rules: &[OffloadRule::new("info", "md")],
    },
];

/// Static mapping from node type to its offloadable properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleTable {
    entries: &'static [NodeTypeRules],
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleTable {
    pub const fn new(entries: &'static [NodeTypeRules]) -> Self {
        Self { entries }
    }

    pub const fn builtin() -> Self {
        Self::new(BUILTIN_RULES)
    }

    /// Rules for `node_type`; empty for types with nothing to offload.
    pub fn rules_for(&self, node_type: &str) -> &'static [OffloadRule] {
        self.entries
            .iter()
            .find(|entry| entry.node_type == node_type)
            .map(|entry| entry.rules)
            .unwrap_or(&[])
    }

    /// Resolves a manifest entry back to the rule that produced it.
    pub fn rule_for_entry(&self, node_type: &str, entry: &str) -> Option<&'static OffloadRule> {
        self.rules_for(node_type)
            .iter()
            .find(|rule| rule.matches_entry(entry))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffloadDecision {
    Offload,
    Inline,
    /// Eligible by name, but the value is not a string. Kept inline.
    Unsupported,
}

/// Decides where a property value lives, purely from its current shape.
pub fn offload_decision(value: Option<&Value>) -> OffloadDecision {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => OffloadDecision::Inline,
        Some(Value::String(text)) => {
            if text.is_empty() {
                OffloadDecision::Inline
            } else if text.contains('\n') || text.chars().count() >= OFFLOAD_MIN_CHARS {
                OffloadDecision::Offload
            } else {
                OffloadDecision::Inline
            }
        }
        Some(Value::Number(number)) if number.as_f64() == Some(0.0) => OffloadDecision::Inline,
        Some(_) => OffloadDecision::Unsupported,
    }
}
