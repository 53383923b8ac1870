//! Pure validation helpers for detection areas.
//!
//! Coordinates live on the canonical 640x360 capture surface. Nothing here
//! clamps to that surface: the pointer-capture layer translates clicks before
//! they arrive, and loaded data is only checked for shape and degeneracy.

use serde_json::Value;
use thiserror::Error;

use crate::models::{Area, Point, AREA_VERTICES};

pub const CAPTURE_WIDTH: u32 = 640;
pub const CAPTURE_HEIGHT: u32 = 360;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid geometry: coordinate ({x}, {y}) is not a finite pixel position")]
pub struct InvalidGeometry {
    pub x: f64,
    pub y: f64,
}

/// Rounds a pointer coordinate to the nearest pixel, halves rounding up.
///
/// Coordinates must round into the `i32` range; anything else (including
/// NaN and infinities) is rejected rather than clamped.
pub fn quantize((x, y): (f64, f64)) -> Result<Point, InvalidGeometry> {
    match (round_half_up(x), round_half_up(y)) {
        (Some(qx), Some(qy)) => Ok(Point::new(qx, qy)),
        _ => Err(InvalidGeometry { x, y }),
    }
}

fn round_half_up(value: f64) -> Option<i64> {
    let rounded = (value + 0.5).floor();
    let in_range = rounded >= f64::from(i32::MIN) && rounded <= f64::from(i32::MAX);
    // NaN fails both comparisons.
    in_range.then_some(rounded as i64)
}

/// Shape check for untrusted data: exactly four items, each a pair of numbers.
pub fn is_well_formed_area(candidate: &Value) -> bool {
    match candidate.as_array() {
        Some(points) if points.len() == AREA_VERTICES => points.iter().all(is_numeric_pair),
        _ => false,
    }
}

pub(crate) fn is_numeric_pair(candidate: &Value) -> bool {
    matches!(candidate.as_array(), Some(pair) if pair.len() == 2 && pair.iter().all(Value::is_number))
}

/// Twice the signed area of the closed polygon (shoelace form), or `None`
/// when it does not fit in an `i128`.
pub fn shoelace_sum(area: &Area) -> Option<i128> {
    area.edges().try_fold(0i128, |acc, (a, b)| {
        let dx = i128::from(b.x).checked_sub(i128::from(a.x))?;
        let sy = i128::from(b.y).checked_add(i128::from(a.y))?;
        acc.checked_add(dx.checked_mul(sy)?)
    })
}

/// True when the quadrilateral encloses a non-zero signed area.
///
/// Collinear and coincident configurations are rejected, as are areas too
/// large to measure. Self-intersecting ("bowtie") quadrilaterals usually
/// still have a non-zero signed area and are accepted; whether detection
/// should allow them is unresolved.
pub fn is_non_degenerate(area: &Area) -> bool {
    matches!(shoelace_sum(area), Some(sum) if sum != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn area(points: [(i64, i64); 4]) -> Area {
        Area::new(points.map(Point::from))
    }

    #[test]
    fn quantize_rounds_to_nearest_pixel() {
        assert_eq!(quantize((10.4, 20.6)).unwrap(), Point::new(10, 21));
        assert_eq!(quantize((0.5, -0.5)).unwrap(), Point::new(1, 0));
        assert_eq!(quantize((639.0, 359.0)).unwrap(), Point::new(639, 359));
    }

    #[test]
    fn quantize_rejects_non_finite() {
        assert!(quantize((f64::NAN, 1.0)).is_err());
        assert!(quantize((1.0, f64::INFINITY)).is_err());
        assert!(quantize((f64::NEG_INFINITY, 0.0)).is_err());
    }

    #[test]
    fn quantize_rejects_out_of_range_instead_of_clamping() {
        assert_eq!(
            quantize((1e30, 0.0)),
            Err(InvalidGeometry { x: 1e30, y: 0.0 })
        );
        assert!(quantize((0.0, -1e300)).is_err());
        assert!(quantize((2_147_483_647.6, 0.0)).is_err());
        assert_eq!(
            quantize((2_147_483_647.0, -2_147_483_648.0)).unwrap(),
            Point::new(2_147_483_647, -2_147_483_648)
        );
    }

    #[test]
    fn well_formed_requires_four_numeric_pairs() {
        assert!(is_well_formed_area(&json!([[0, 0], [1, 0], [1, 1], [0, 1]])));
        assert!(is_well_formed_area(&json!([[0.5, 0], [1, 0], [1, 1], [0, 1]])));
        assert!(!is_well_formed_area(&json!([[0, 0], [1, 0], [1, 1]])));
        assert!(!is_well_formed_area(&json!([[0, 0], [1, 0], [1, 1], [0, 1], [2, 2]])));
        assert!(!is_well_formed_area(&json!([[0, 0], [1, 0], [1, 1], [0]])));
        assert!(!is_well_formed_area(&json!([[0, 0], [1, 0], [1, "1"], [0, 1]])));
        assert!(!is_well_formed_area(&json!({"points": []})));
        assert!(!is_well_formed_area(&Value::Null));
    }

    #[test]
    fn collinear_points_are_degenerate() {
        assert!(!is_non_degenerate(&area([(0, 0), (10, 0), (20, 0), (30, 0)])));
        assert!(!is_non_degenerate(&area([(5, 5), (5, 5), (5, 5), (5, 5)])));
    }

    #[test]
    fn square_is_non_degenerate() {
        assert!(is_non_degenerate(&area([(0, 0), (10, 0), (10, 10), (0, 10)])));
    }

    #[test]
    fn orientation_only_flips_the_sign() {
        let clockwise = area([(0, 0), (10, 0), (10, 10), (0, 10)]);
        let counter = area([(0, 10), (10, 10), (10, 0), (0, 0)]);
        let (cw, ccw) = (shoelace_sum(&clockwise).unwrap(), shoelace_sum(&counter).unwrap());
        assert_eq!(cw, -ccw);
        assert_eq!(cw.abs(), 200);
    }

    #[test]
    fn bowtie_is_accepted() {
        // Crossing diagonals with unequal lobes keep a non-zero signed area.
        assert!(is_non_degenerate(&area([(0, 0), (20, 10), (20, 0), (0, 20)])));
    }

    #[test]
    fn large_coordinates_do_not_overflow() {
        let big = i64::MAX / 2;
        assert!(is_non_degenerate(&area([(0, 0), (big, 0), (big, big), (0, big)])));

        let (lo, hi) = (i64::MIN, i64::MAX);
        let extreme = area([(lo, lo), (hi, lo), (hi, hi), (lo, hi)]);
        assert_eq!(shoelace_sum(&extreme), None);
        assert!(!is_non_degenerate(&extreme));
    }
}
