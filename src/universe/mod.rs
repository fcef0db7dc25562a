//! Shape universe generation
//!
//! Builds the ordered set of shapes valid under a `Constraints` value:
//! base shapes from [`ShapeEnumerator`], then (for tonal modes) every
//! transposition 0..11 filtered by the scale's pitch classes and, for a
//! fixed key, by whether some octave placement fits the MIDI range.

pub mod enumerate;

use std::collections::HashMap;

use crate::config::{Constraints, TonalityMode};
use crate::shape::{Shape, ShapeKey};
use crate::types::PITCH_CLASSES;

pub use enumerate::{EnumerationBounds, ShapeEnumerator};

/// Ordered set of drillable shapes with O(1) key lookup
#[derive(Debug, Clone, Default)]
pub struct Universe {
    shapes: Vec<Shape>,
    index: HashMap<ShapeKey, usize>,
}

impl Universe {
    /// Enumerate every shape allowed by `constraints`
    pub fn generate(constraints: &Constraints) -> Self {
        let base = ShapeEnumerator::new(EnumerationBounds {
            cardinality_min: constraints.cardinality.0,
            cardinality_max: constraints.cardinality.1,
            span_min: constraints.span.0,
            span_max: constraints.span.1,
        });

        let universe = match constraints.tonality {
            TonalityMode::Atonal => Self::from_shapes(base),
            TonalityMode::RandomKey => Self::from_shapes(transpositions(base, constraints)),
            TonalityMode::FixedKey(key_pc) => Self::from_shapes(
                transpositions(base, constraints).filter(|shape| {
                    octave_range(shape, key_pc, constraints.midi_low, constraints.midi_high)
                        .is_some()
                }),
            ),
        };

        tracing::debug!(
            size = universe.len(),
            tonality = ?constraints.tonality,
            scale = ?constraints.effective_scale(),
            "universe generated"
        );

        universe
    }

    /// Build from shapes in order; later duplicates are dropped
    pub fn from_shapes<I: IntoIterator<Item = Shape>>(shapes: I) -> Self {
        let mut universe = Self::default();
        for shape in shapes {
            let key = shape.key();
            if universe.index.contains_key(&key) {
                continue;
            }
            universe.index.insert(key, universe.shapes.len());
            universe.shapes.push(shape);
        }
        universe
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn get(&self, idx: usize) -> Option<&Shape> {
        self.shapes.get(idx)
    }

    pub fn index_of(&self, key: &ShapeKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn contains(&self, shape: &Shape) -> bool {
        self.index.contains_key(&shape.key())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Shape> {
        self.shapes.iter()
    }
}

/// Every transposition 0..11 of each base shape, filtered by the scale
fn transpositions<I>(base: I, constraints: &Constraints) -> impl Iterator<Item = Shape>
where
    I: Iterator<Item = Shape>,
{
    let scale = constraints.effective_scale();
    let allowed = scale.allowed_pitch_classes();
    let restrict = scale.restricts_pitch_classes();

    base.flat_map(move |shape| {
        (0..PITCH_CLASSES)
            .map(move |r| shape.transposed(r))
            .filter(move |t| !restrict || t.pitch_classes().all(|pc| allowed.contains(&pc)))
    })
}

/// Feasible octave indices `z` such that `key_pc + 12z + offset` keeps the
/// whole shape inside `[midi_low, midi_high]`
pub fn octave_range(shape: &Shape, key_pc: i32, midi_low: i32, midi_high: i32) -> Option<(i32, i32)> {
    let low = key_pc + shape.low();
    let high = key_pc + shape.high();
    let z_min = ceil_div(midi_low - low, PITCH_CLASSES);
    let z_max = (midi_high - high).div_euclid(PITCH_CLASSES);
    (z_min <= z_max).then_some((z_min, z_max))
}

fn ceil_div(a: i32, b: i32) -> i32 {
    -((-a).div_euclid(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScaleMode;

    fn triads(tonality: TonalityMode, scale: ScaleMode) -> Constraints {
        Constraints {
            cardinality: (3, 3),
            span: (0, 12),
            midi_low: 48,
            midi_high: 72,
            tonality,
            scale,
        }
    }

    #[test]
    fn test_ceil_div_negative() {
        assert_eq!(ceil_div(7, 12), 1);
        assert_eq!(ceil_div(-7, 12), 0);
        assert_eq!(ceil_div(-12, 12), -1);
        assert_eq!(ceil_div(24, 12), 2);
    }

    #[test]
    fn test_atonal_not_transposed() {
        let universe = Universe::generate(&triads(TonalityMode::Atonal, ScaleMode::MajorDiatonic));
        assert_eq!(universe.len(), 66);
        assert!(universe.iter().all(|s| s.low() == 0));
        assert_eq!(
            universe.iter().filter(|s| s.offsets() == [0, 4, 7]).count(),
            1
        );
    }

    #[test]
    fn test_random_key_keeps_all_transpositions() {
        let universe = Universe::generate(&triads(TonalityMode::RandomKey, ScaleMode::Root));
        assert_eq!(universe.len(), 66 * 12);
        assert_eq!(universe.get(0).unwrap().offsets(), &[0, 1, 2]);
        assert_eq!(universe.get(1).unwrap().offsets(), &[1, 2, 3]);
        assert_eq!(universe.get(12).unwrap().offsets(), &[0, 1, 3]);
    }

    #[test]
    fn test_major_diatonic_filter() {
        let universe =
            Universe::generate(&triads(TonalityMode::RandomKey, ScaleMode::MajorDiatonic));
        let allowed = ScaleMode::MajorDiatonic.allowed_pitch_classes();
        assert!(!universe.is_empty());
        assert!(universe
            .iter()
            .all(|s| s.pitch_classes().all(|pc| allowed.contains(&pc))));
        assert!(universe.contains(&Shape::from(vec![0, 4, 7])));
        assert!(universe.contains(&Shape::from(vec![7, 11, 14])));
        assert!(!universe.contains(&Shape::from(vec![1, 5, 8])));
    }

    #[test]
    fn test_fixed_key_range_filter() {
        // key G, six-semitone window
        let constraints = Constraints {
            cardinality: (2, 2),
            span: (0, 12),
            midi_low: 60,
            midi_high: 66,
            tonality: TonalityMode::FixedKey(7),
            scale: ScaleMode::Root,
        };
        let universe = Universe::generate(&constraints);
        for shape in universe.iter() {
            let (z_min, _) = octave_range(shape, 7, 60, 66).unwrap();
            let root = 7 + 12 * z_min;
            assert!(root + shape.low() >= 60);
            assert!(root + shape.high() <= 66);
        }
        assert!(universe.iter().all(|s| s.span() <= 6));
        assert!(!universe.is_empty());
    }

    #[test]
    fn test_fixed_key_formula() {
        let shape = Shape::from(vec![2, 5, 9]);
        // key D: lowest note D+2 = E
        assert_eq!(octave_range(&shape, 2, 48, 72), Some((4, 5)));
        assert_eq!(octave_range(&shape, 2, 60, 64), None);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let c = triads(TonalityMode::FixedKey(3), ScaleMode::MinorDiatonic);
        let a = Universe::generate(&c);
        let b = Universe::generate(&c);
        assert_eq!(a.shapes(), b.shapes());
    }

    #[test]
    fn test_empty_universe_for_inverted_ranges() {
        let c = Constraints {
            cardinality: (4, 2),
            ..Default::default()
        };
        let universe = Universe::generate(&c);
        assert!(universe.is_empty());
        assert_eq!(universe.index_of(&Shape::from(vec![0, 4, 7]).key()), None);
    }

    #[test]
    fn test_index_matches_position() {
        let universe = Universe::generate(&Constraints::default());
        for (i, shape) in universe.iter().enumerate() {
            assert_eq!(universe.index_of(&shape.key()), Some(i));
        }
    }
}
