// points.rs — Point types shared by detection, tracking and motion.
//
// `PointSet` is the only point collection that crosses module
// boundaries: the detector produces one, the tracker consumes one, and
// the motion estimator returns the surviving subset as a new one.

/// A sub-pixel image position. x is the column, y is the row.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Point2 { x, y }
    }
}

impl From<(f32, f32)> for Point2 {
    fn from((x, y): (f32, f32)) -> Self {
        Point2 { x, y }
    }
}

/// An ordered set of feature positions. May be empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointSet(Vec<Point2>);

impl PointSet {
    pub fn new() -> Self {
        PointSet(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point2> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Point2] {
        &self.0
    }

    pub fn push(&mut self, p: Point2) {
        self.0.push(p);
    }

    pub fn into_vec(self) -> Vec<Point2> {
        self.0
    }
}

impl From<Vec<Point2>> for PointSet {
    fn from(points: Vec<Point2>) -> Self {
        PointSet(points)
    }
}

impl FromIterator<Point2> for PointSet {
    fn from_iter<I: IntoIterator<Item = Point2>>(iter: I) -> Self {
        PointSet(iter.into_iter().collect())
    }
}

impl IntoIterator for PointSet {
    type Item = Point2;
    type IntoIter = std::vec::IntoIter<Point2>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a Point2;
    type IntoIter = std::slice::Iter<'a, Point2>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
