//! GRBL/FluidNC Status Report Parsing
//!
//! Status reports look like `<Idle|MPos:0.000,0.000,0.000|WPos:0.000,0.000,0.000|F:0>`.
//! This module recognizes the bracketed envelope and extracts the machine
//! (`MPos`) and work (`WPos`) position vectors. Anything it cannot use is
//! ignored; parsing never fails.

use cnclink_core::{PositionVector, Telemetry};
use serde::{Deserialize, Serialize};

/// Position fields extracted from one status report
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusFrame {
    /// Leading machine state word (`Idle`, `Run`, `Alarm:1`, ...)
    pub machine_state: Option<String>,
    /// Machine position, if an `MPos` field yielded at least one coordinate
    pub mpos: Option<PositionVector>,
    /// Work position, if a `WPos` field yielded at least one coordinate
    pub wpos: Option<PositionVector>,
}

impl StatusFrame {
    /// True if the frame updates either position vector
    pub fn has_position(&self) -> bool {
        self.mpos.is_some() || self.wpos.is_some()
    }

    /// Apply this frame to stored telemetry
    ///
    /// Each present vector replaces the stored one wholesale. Returns true
    /// if anything changed.
    pub fn apply_to(&self, telemetry: &mut Telemetry) -> bool {
        if let Some(mpos) = &self.mpos {
            telemetry.machine = mpos.clone();
        }
        if let Some(wpos) = &self.wpos {
            telemetry.work = wpos.clone();
        }
        self.has_position()
    }
}

/// Status report parser
pub struct StatusParser;

impl StatusParser {
    /// True if `line` has the `<...>` status envelope
    pub fn is_status_report(line: &str) -> bool {
        line.len() >= 2 && line.starts_with('<') && line.ends_with('>')
    }

    /// Parse a status report
    ///
    /// Returns `None` when the line is not a status envelope. A valid
    /// envelope without usable position fields yields a frame whose
    /// [`StatusFrame::has_position`] is false.
    ///
    /// A coordinate token that does not parse as a float is skipped, so
    /// `<MPos:1,x,3>` produces the two-element machine vector `(1, 3)`.
    /// When a tag repeats, the last occurrence decides.
    pub fn parse(line: &str) -> Option<StatusFrame> {
        if !Self::is_status_report(line) {
            return None;
        }

        let content = &line[1..line.len() - 1];
        let mut frame = StatusFrame::default();

        for (index, field) in content.split('|').enumerate() {
            if let Some(coords) = field.strip_prefix("MPos:") {
                frame.mpos = Self::parse_coords(coords);
            } else if let Some(coords) = field.strip_prefix("WPos:") {
                frame.wpos = Self::parse_coords(coords);
            } else if index == 0 && !field.is_empty() && !field.contains(',') {
                frame.machine_state = Some(field.to_string());
            }
        }

        Some(frame)
    }

    /// Parse a comma-separated coordinate list, skipping bad tokens
    fn parse_coords(coords: &str) -> Option<PositionVector> {
        let values: Vec<f64> = coords
            .split(',')
            .filter_map(|token| token.trim().parse::<f64>().ok())
            .collect();

        if values.is_empty() {
            None
        } else {
            Some(PositionVector::from_coords(values))
        }
    }
}
