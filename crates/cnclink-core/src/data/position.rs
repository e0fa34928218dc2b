//! Position telemetry reported by the controller
//!
//! Status reports carry up to two coordinate vectors: machine position
//! (`MPos`) and work position (`WPos`). A [`PositionVector`] stores the
//! coordinates exactly as parsed, in axis order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered axis coordinates (X, Y, Z, ...) from one status field
///
/// Usually three components, but the vector is stored as parsed: a field
/// with an unparseable coordinate yields a shorter vector, and controllers
/// with rotary axes report more than three.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionVector(Vec<f64>);

impl PositionVector {
    /// The (0, 0, 0) vector reported before any status frame arrives
    pub fn zero() -> Self {
        Self(vec![0.0; 3])
    }

    /// Build a vector from parsed coordinates
    pub fn from_coords(coords: Vec<f64>) -> Self {
        Self(coords)
    }

    /// Coordinates in axis order
    pub fn coords(&self) -> &[f64] {
        &self.0
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the vector carries no components
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First component
    pub fn x(&self) -> Option<f64> {
        self.0.first().copied()
    }

    /// Second component
    pub fn y(&self) -> Option<f64> {
        self.0.get(1).copied()
    }

    /// Third component
    pub fn z(&self) -> Option<f64> {
        self.0.get(2).copied()
    }
}

impl Default for PositionVector {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<Vec<f64>> for PositionVector {
    fn from(coords: Vec<f64>) -> Self {
        Self(coords)
    }
}

impl fmt::Display for PositionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| format!("{:.3}", c)).collect();
        write!(f, "({})", parts.join(", "))
    }
}

/// Snapshot of both position vectors of one device
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Telemetry {
    /// Machine-space position
    pub machine: PositionVector,
    /// Work-space position
    pub work: PositionVector,
}

impl Telemetry {
    /// Create telemetry from both vectors
    pub fn new(machine: PositionVector, work: PositionVector) -> Self {
        Self { machine, work }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zero() {
        let pos = PositionVector::default();
        assert_eq!(pos.coords(), &[0.0, 0.0, 0.0]);
        assert_eq!(pos.x(), Some(0.0));
        assert_eq!(pos.z(), Some(0.0));
    }

    #[test]
    fn test_short_vector_accessors() {
        let pos = PositionVector::from_coords(vec![1.0, 3.0]);
        assert_eq!(pos.len(), 2);
        assert_eq!(pos.y(), Some(3.0));
        assert_eq!(pos.z(), None);
    }

    #[test]
    fn test_display() {
        let pos = PositionVector::from(vec![1.0, -2.5, 0.125]);
        assert_eq!(pos.to_string(), "(1.000, -2.500, 0.125)");
    }

    #[test]
    fn test_telemetry_serializes() {
        let telemetry = Telemetry::new(
            PositionVector::from_coords(vec![1.0, 2.0, 3.0]),
            PositionVector::zero(),
        );
        let json = serde_json::to_string(&telemetry).unwrap();
        assert_eq!(json, r#"{"machine":[1.0,2.0,3.0],"work":[0.0,0.0,0.0]}"#);
    }
}
