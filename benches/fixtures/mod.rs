// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowsplit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowsplit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use flowsplit::model::FlowDocument;
use serde_json::{json, Value};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let pid = std::process::id();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut path = std::env::temp_dir();
        path.push(format!("flowsplit_bench_{prefix}_{pid}_{nanos}_{counter}"));
        std::fs::create_dir_all(&path).expect("create temp dir");

        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Case {
    /// One tab, a handful of nodes.
    Small,
    /// Ten tabs of forty nodes each; half the nodes carry a multi-line body.
    Medium,
}

fn function_body(index: usize, lines: usize) -> String {
    (0..lines)
        .map(|line| format!("const v{line} = msg.payload[{index}] + {line};"))
        .chain(std::iter::once("return msg;".to_owned()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_tab(tab_index: usize, nodes_per_tab: usize, out: &mut Vec<Value>) {
    let tab_id = format!("tab{tab_index}");
    out.push(json!({"id": tab_id, "type": "tab", "label": format!("Flow {tab_index}")}));

    for i in 0..nodes_per_tab {
        let id = format!("{tab_id}.n{i}");
        let next = format!("{tab_id}.n{}", i + 1);
        let x = 120 + (i % 8) * 180;
        let y = 80 + (i / 8) * 60;
        let node = match i % 4 {
            0 => json!({"id": id, "type": "function", "z": tab_id, "name": format!("fn {i}"),
                        "func": function_body(i, 12), "outputs": 1, "x": x, "y": y,
                        "wires": [[next]]}),
            1 => json!({"id": id, "type": "template", "z": tab_id, "field": "payload",
                        "template": "<div>\n  {{payload}}\n</div>", "x": x, "y": y,
                        "wires": [[next]]}),
            2 => json!({"id": id, "type": "change", "z": tab_id, "rules": [
                            {"t": "set", "p": "topic", "to": format!("t{i}")}
                        ], "x": x, "y": y, "wires": [[next]]}),
            _ => json!({"id": id, "type": "debug", "z": tab_id, "active": true, "x": x, "y": y,
                        "wires": []}),
        };
        out.push(node);
    }
}

pub fn fixture(case: Case) -> FlowDocument {
    let (tabs, nodes_per_tab) = match case {
        Case::Small => (1, 6),
        Case::Medium => (10, 40),
    };

    let mut nodes = Vec::new();
    for tab_index in 0..tabs {
        push_tab(tab_index, nodes_per_tab, &mut nodes);
    }
    FlowDocument::from_value(Value::Array(nodes)).expect("fixture is a flow document")
}
