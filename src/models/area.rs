use serde::{Deserialize, Serialize};

use super::SignalId;

/// Number of vertices in every detection area.
pub const AREA_VERTICES: usize = 4;

/// Integer pixel coordinate on the canonical capture surface. Serialized as a
/// bare `[x, y]` pair, which is the layout the backend stores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "(i64, i64)", into = "(i64, i64)")]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl From<(i64, i64)> for Point {
    fn from((x, y): (i64, i64)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (i64, i64) {
    fn from(point: Point) -> Self {
        (point.x, point.y)
    }
}

/// A closed quadrilateral: consecutive points are joined and the last point
/// joins the first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Area([Point; AREA_VERTICES]);

impl Area {
    pub const fn new(points: [Point; AREA_VERTICES]) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Point; AREA_VERTICES] {
        &self.0
    }

    /// Edges in drawing order, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        (0..AREA_VERTICES).map(move |i| (self.0[i], self.0[(i + 1) % AREA_VERTICES]))
    }
}

/// One area per signal, always complete. Partial sets only exist inside a
/// capture session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AreaSet([Area; SignalId::COUNT]);

impl AreaSet {
    pub const fn new(areas: [Area; SignalId::COUNT]) -> Self {
        Self(areas)
    }

    pub fn get(&self, signal: SignalId) -> &Area {
        &self.0[signal.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SignalId, &Area)> {
        SignalId::ALL.into_iter().zip(self.0.iter())
    }

    pub fn areas(&self) -> &[Area; SignalId::COUNT] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(offset: i64) -> Area {
        Area::new([
            Point::new(offset, offset),
            Point::new(offset + 10, offset),
            Point::new(offset + 10, offset + 10),
            Point::new(offset, offset + 10),
        ])
    }

    #[test]
    fn point_serializes_as_pair() {
        let json = serde_json::to_string(&Point::new(12, 340)).unwrap();
        assert_eq!(json, "[12,340]");
    }

    #[test]
    fn area_set_serializes_in_signal_order() {
        let set = AreaSet::new([square(0), square(1), square(2), square(3)]);
        let value = serde_json::to_value(set).unwrap();
        let areas = value.as_array().unwrap();
        assert_eq!(areas.len(), 4);
        assert_eq!(areas[2][0], serde_json::json!([2, 2]));
    }

    #[test]
    fn edges_close_the_polygon() {
        let area = square(0);
        let last = area.edges().last().unwrap();
        assert_eq!(last, (Point::new(0, 10), Point::new(0, 0)));
    }

    #[test]
    fn iter_pairs_areas_with_signals() {
        let set = AreaSet::new([square(0), square(1), square(2), square(3)]);
        let (signal, area) = set.iter().nth(3).unwrap();
        assert_eq!(signal, SignalId::D);
        assert_eq!(area, set.get(SignalId::D));
    }
}
