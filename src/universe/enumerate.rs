//! Base shape enumeration
//!
//! Walks every strictly increasing offset sequence that starts at 0, one
//! cardinality at a time, keeping the partial sequence on an explicit stack.
//! Output order: cardinality ascending, then lexicographic.

use crate::shape::Shape;

/// Bounds for the untransposed shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumerationBounds {
    pub cardinality_min: usize,
    pub cardinality_max: usize,
    pub span_min: i32,
    pub span_max: i32,
}

impl EnumerationBounds {
    fn accepts(&self, offsets: &[i32]) -> bool {
        match offsets.len() {
            0 => false,
            // a single note has no span to check
            1 => true,
            _ => {
                let span = offsets[offsets.len() - 1];
                span >= self.span_min && span <= self.span_max
            }
        }
    }
}

/// Lazy, restartable iterator over base shapes
#[derive(Debug, Clone)]
pub struct ShapeEnumerator {
    bounds: EnumerationBounds,
    cardinality: usize,
    stack: Vec<i32>,
    exhausted: bool,
}

impl ShapeEnumerator {
    pub fn new(bounds: EnumerationBounds) -> Self {
        Self {
            cardinality: bounds.cardinality_min.max(1),
            bounds,
            stack: Vec::new(),
            exhausted: false,
        }
    }

    /// Rewind to the first shape
    pub fn restart(&mut self) {
        self.cardinality = self.bounds.cardinality_min.max(1);
        self.stack.clear();
        self.exhausted = false;
    }

    /// Seed the stack with the smallest sequence of the current cardinality
    fn seed(&mut self) -> bool {
        let top = self.cardinality as i64 - 1;
        if self.cardinality > 1 && top > self.bounds.span_max as i64 {
            return false;
        }
        self.stack.clear();
        self.stack.extend(0..self.cardinality as i32);
        true
    }

    /// Step to the next sequence of the same length, keeping offset 0 fixed
    fn advance(&mut self) -> bool {
        let len = self.stack.len();
        for i in (1..len).rev() {
            let ceiling = self.bounds.span_max - (len - 1 - i) as i32;
            if self.stack[i] < ceiling {
                self.stack[i] += 1;
                for j in (i + 1)..len {
                    self.stack[j] = self.stack[j - 1] + 1;
                }
                return true;
            }
        }
        false
    }
}

impl Iterator for ShapeEnumerator {
    type Item = Shape;

    fn next(&mut self) -> Option<Shape> {
        loop {
            if self.exhausted {
                return None;
            }

            let produced = if self.stack.is_empty() {
                if self.cardinality > self.bounds.cardinality_max {
                    self.exhausted = true;
                    return None;
                }
                if !self.seed() {
                    // longer sequences cannot fit either
                    self.exhausted = true;
                    return None;
                }
                true
            } else {
                self.advance()
            };

            if !produced {
                self.stack.clear();
                self.cardinality += 1;
                continue;
            }

            if self.bounds.accepts(&self.stack) {
                return Some(Shape::new(self.stack.clone()));
            }
        }
    }
}
