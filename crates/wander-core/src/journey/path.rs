use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// Positions observed during a journey, in arrival order.
///
/// Append-only: entries are never removed, reordered or deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathTrace {
    points: Vec<Coordinate>,
}

impl PathTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, coordinate: Coordinate) {
        self.points.push(coordinate);
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn last(&self) -> Option<Coordinate> {
        self.points.last().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum of the great-circle distances between consecutive points, in metres.
    pub fn distance_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| pair[0].distance_m(&pair[1]))
            .sum()
    }
}
