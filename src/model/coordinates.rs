// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowsplit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowsplit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde_json::Value;

/// Layout position of one node, as stored in the coordinate sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    pub node_id: String,
    pub x: Value,
    pub y: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinateParseError {
    NotAnArray,
    TruncatedTriple { len: usize },
    NodeIdNotString { index: usize },
}

impl fmt::Display for CoordinateParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnArray => f.write_str("coordinate list must be a JSON array"),
            Self::TruncatedTriple { len } => {
                write!(f, "coordinate list length {len} is not a multiple of 3")
            }
            Self::NodeIdNotString { index } => {
                write!(f, "coordinate entry at {index} does not start with a string node id")
            }
        }
    }
}

impl std::error::Error for CoordinateParseError {}

impl Coordinate {
    /// Flattens coordinates to `[id, x, y, id, x, y, ...]`.
    pub fn flatten(coordinates: Vec<Coordinate>) -> Value {
        let mut flat = Vec::with_capacity(coordinates.len() * 3);
        for coordinate in coordinates {
            flat.push(Value::String(coordinate.node_id));
            flat.push(coordinate.x);
            flat.push(coordinate.y);
        }
        Value::Array(flat)
    }

    pub fn unflatten(value: Value) -> Result<Vec<Coordinate>, CoordinateParseError> {
        let Value::Array(flat) = value else {
            return Err(CoordinateParseError::NotAnArray);
        };
        if flat.len() % 3 != 0 {
            return Err(CoordinateParseError::TruncatedTriple { len: flat.len() });
        }

        let mut coordinates = Vec::with_capacity(flat.len() / 3);
        let mut values = flat.into_iter().enumerate();
        while let Some((index, id)) = values.next() {
            let Value::String(node_id) = id else {
                return Err(CoordinateParseError::NodeIdNotString { index });
            };
            let (Some((_, x)), Some((_, y))) = (values.next(), values.next()) else {
                return Err(CoordinateParseError::TruncatedTriple { len: index });
            };
            coordinates.push(Coordinate { node_id, x, y });
        }

        Ok(coordinates)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Coordinate, CoordinateParseError};

    #[test]
    fn flatten_writes_triples_in_order() {
        let flat = Coordinate::flatten(vec![
            Coordinate { node_id: "n1".to_owned(), x: json!(100), y: json!(200) },
            Coordinate { node_id: "n2".to_owned(), x: json!(1.5), y: json!(-3) },
        ]);

        assert_eq!(flat, json!(["n1", 100, 200, "n2", 1.5, -3]));
    }

    #[test]
    fn unflatten_rejects_malformed_lists() {
        assert_eq!(
            Coordinate::unflatten(json!({"n1": [1, 2]})),
            Err(CoordinateParseError::NotAnArray)
        );
        assert_eq!(
            Coordinate::unflatten(json!(["n1", 1])),
            Err(CoordinateParseError::TruncatedTriple { len: 2 })
        );
        assert_eq!(
            Coordinate::unflatten(json!(["n1", 1, 2, 7, 1, 2])),
            Err(CoordinateParseError::NodeIdNotString { index: 3 })
        );
    }

    #[test]
    fn unflatten_empty_list() {
        assert_eq!(Coordinate::unflatten(json!([])), Ok(Vec::new()));
    }
}
