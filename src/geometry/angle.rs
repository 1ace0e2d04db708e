use thiserror::Error;

use crate::vision::Polygon;

/// Word rotation rounded to a right angle. `Deg0` and `Deg360` both describe
/// upright text but select different corners in the box lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SnappedAngle {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
    Deg360,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("angle is undetectable")]
pub struct AngleUndetectable;

impl SnappedAngle {
    pub fn degrees(self) -> u16 {
        match self {
            SnappedAngle::Deg0 => 0,
            SnappedAngle::Deg90 => 90,
            SnappedAngle::Deg180 => 180,
            SnappedAngle::Deg270 => 270,
            SnappedAngle::Deg360 => 360,
        }
    }

    /// Snaps an angle in `[0, 360)` to the nearest multiple of 90, ties to even.
    fn snap(degrees: f64) -> Self {
        match (degrees / 90.0).round_ties_even() as i64 {
            0 => SnappedAngle::Deg0,
            1 => SnappedAngle::Deg90,
            2 => SnappedAngle::Deg180,
            3 => SnappedAngle::Deg270,
            _ => SnappedAngle::Deg360,
        }
    }

    /// Text rotated by 90 or 270 degrees runs along the vertical axis.
    pub fn is_sideways(self) -> bool {
        matches!(self, SnappedAngle::Deg90 | SnappedAngle::Deg270)
    }

    /// Indices of the polygon corners supplying left, upper, right and lower.
    pub(crate) fn corner_order(self) -> [usize; 4] {
        //  A----B        B---C        C---D        D----A
        //  |    | 0      |   | 90     |   | 180    |    | 270
        //  D----C        A---D        B---A        C----B
        match self {
            SnappedAngle::Deg0 | SnappedAngle::Deg90 => [0, 1, 2, 3],
            SnappedAngle::Deg180 => [1, 2, 3, 0],
            SnappedAngle::Deg270 => [2, 3, 0, 1],
            SnappedAngle::Deg360 => [3, 0, 1, 2],
        }
    }
}

/// Detects the rotation of a word from its polygon.
///
/// Walks the corners A→B→C→D→A and measures the first edge whose two ends
/// are fully known. Starting `i` edges late rotates the measured edge by
/// `90 * i` degrees, which is added back before snapping.
pub fn detect_angle(polygon: &Polygon) -> Result<SnappedAngle, AngleUndetectable> {
    for i in 0..polygon.len() {
        let (Some((x, y)), Some((next_x, next_y))) = (
            polygon[i].coords(),
            polygon[(i + 1) % polygon.len()].coords(),
        ) else {
            continue;
        };

        let delta_y = f64::from(y - next_y);
        let delta_x = f64::from(next_x - x);
        let mut degrees = delta_y.atan2(delta_x).to_degrees();
        if degrees < 0.0 {
            degrees += 360.0;
        }
        degrees = (degrees + 90.0 * i as f64).rem_euclid(360.0);

        return Ok(SnappedAngle::snap(degrees));
    }

    Err(AngleUndetectable)
}
