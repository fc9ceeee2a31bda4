//! Node canvas collaborator.
//!
//! The canvas receives operation display names dropped at a point and keeps
//! them as nodes. Geometry beyond storing the drop position is up to the
//! front end.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One placed operation node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanvasNode {
    pub id: u64,
    pub name: String,
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanvasError {
    #[error("dropped item carries no node name")]
    EmptyName,
}

/// Anything that accepts dropped operation names.
pub trait Canvas {
    fn drop_node(&mut self, name: &str, at: Point) -> Result<&CanvasNode, CanvasError>;
    fn nodes(&self) -> &[CanvasNode];
}

/// In-memory canvas that records every drop in order.
#[derive(Debug, Default)]
pub struct NodeBoard {
    nodes: Vec<CanvasNode>,
    next_id: u64,
}

impl NodeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

impl Canvas for NodeBoard {
    fn drop_node(&mut self, name: &str, at: Point) -> Result<&CanvasNode, CanvasError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CanvasError::EmptyName);
        }
        self.next_id += 1;
        debug!(node = %name, position = %at, "node placed");
        self.nodes.push(CanvasNode {
            id: self.next_id,
            name: name.to_string(),
            position: at,
        });
        Ok(&self.nodes[self.nodes.len() - 1])
    }

    fn nodes(&self) -> &[CanvasNode] {
        &self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_are_recorded_with_increasing_ids() {
        let mut board = NodeBoard::new();
        let first = board.drop_node("Call Get Data", Point::new(0.0, 0.0)).unwrap().id;
        let second = board.drop_node("Call Get Data", Point::new(10.0, -5.0)).unwrap().id;
        assert!(second > first);
        assert_eq!(board.nodes().len(), 2);
        assert_eq!(board.nodes()[1].position.to_string(), "(10, -5)");
    }

    #[test]
    fn empty_names_are_ignored() {
        let mut board = NodeBoard::new();
        assert_eq!(board.drop_node("  ", Point::default()).unwrap_err(), CanvasError::EmptyName);
        assert!(board.nodes().is_empty());
    }
}
