//! Shapes and their canonical keys
//!
//! A shape is a strictly increasing list of semitone offsets. Atonal shapes
//! start at 0; tonal shapes are stored relative to the key pitch class and so
//! start at the transposition offset.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::PITCH_CLASSES;

/// Ordered semitone offsets of a pitch set
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(Vec<i32>);

impl Shape {
    pub fn new(offsets: Vec<i32>) -> Self {
        Self(offsets)
    }

    pub fn offsets(&self) -> &[i32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowest offset (0 for an empty shape)
    pub fn low(&self) -> i32 {
        self.0.first().copied().unwrap_or(0)
    }

    /// Highest offset (0 for an empty shape)
    pub fn high(&self) -> i32 {
        self.0.last().copied().unwrap_or(0)
    }

    /// Distance from lowest to highest member
    pub fn span(&self) -> i32 {
        self.high() - self.low()
    }

    /// Element-wise shift by `by` semitones
    pub fn transposed(&self, by: i32) -> Shape {
        Shape(self.0.iter().map(|v| v + by).collect())
    }

    /// Pitch classes of every member
    pub fn pitch_classes(&self) -> impl Iterator<Item = i32> + '_ {
        self.0.iter().map(|v| v.rem_euclid(PITCH_CLASSES))
    }

    pub fn is_strictly_increasing(&self) -> bool {
        self.0.windows(2).all(|w| w[0] < w[1])
    }

    /// Canonical lookup key
    pub fn key(&self) -> ShapeKey {
        ShapeKey::encode(&self.0)
    }
}

impl From<Vec<i32>> for Shape {
    fn from(offsets: Vec<i32>) -> Self {
        Self(offsets)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")")
    }
}

/// Canonical, collision-free encoding of a shape
///
/// Offsets are written in order as decimal integers joined by commas, so two
/// keys are equal exactly when the shapes are equal element-wise.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeKey(String);

impl ShapeKey {
    pub fn encode(offsets: &[i32]) -> Self {
        let mut key = String::with_capacity(offsets.len() * 3);
        for (i, v) in offsets.iter().enumerate() {
            if i > 0 {
                key.push(',');
            }
            key.push_str(&v.to_string());
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_equal_for_equal_shapes() {
        let a = Shape::from(vec![0, 4, 7]);
        let b = Shape::from(vec![0, 4, 7]);
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().as_str(), "0,4,7");
    }

    #[test]
    fn test_key_distinguishes_digit_boundaries() {
        // "1,12" vs "11,2" must not collide
        let keys: HashSet<ShapeKey> = [
            vec![1, 12],
            vec![11, 2],
            vec![1, 1, 2],
            vec![112],
            vec![0],
            vec![],
            vec![-1, 2],
        ]
        .into_iter()
        .map(|v| Shape::from(v).key())
        .collect();
        assert_eq!(keys.len(), 7);
    }

    #[test]
    fn test_span_and_transpose() {
        let s = Shape::from(vec![0, 4, 7]);
        assert_eq!(s.span(), 7);
        let t = s.transposed(5);
        assert_eq!(t.offsets(), &[5, 9, 12]);
        assert_eq!(t.span(), 7);
        assert_eq!(t.pitch_classes().collect::<Vec<_>>(), vec![5, 9, 0]);
    }

    #[test]
    fn test_display() {
        assert_eq!(Shape::from(vec![0, 3, 7]).to_string(), "(0, 3, 7)");
    }
}
