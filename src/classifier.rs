//! Face-type classifier for catalog frames.
//!
//! Maps frame measurements (millimeters) onto the face-shape label the frame
//! suits best. Pure and deterministic: the same measurements always produce
//! the same label.

use serde::{Deserialize, Serialize};

/// The five face-shape labels used across the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaceShape {
    Cuadrado,
    Oblongo,
    Redondo,
    Diamante,
    Ovalado,
}

impl FaceShape {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cuadrado => "Cuadrado",
            Self::Oblongo => "Oblongo",
            Self::Redondo => "Redondo",
            Self::Diamante => "Diamante",
            Self::Ovalado => "Ovalado",
        }
    }
}

/// Closed measurement intervals for one face shape.
///
/// Rules are evaluated in declaration order; the first rule whose three
/// intervals all contain the input wins.
struct ShapeRule {
    shape: FaceShape,
    width: (f64, f64),
    bridge: (f64, f64),
    temple: (f64, f64),
}

const RULES: [ShapeRule; 5] = [
    ShapeRule {
        shape: FaceShape::Cuadrado,
        width: (52.0, 55.0),
        bridge: (16.0, 18.0),
        temple: (135.0, 140.0),
    },
    ShapeRule {
        shape: FaceShape::Oblongo,
        width: (54.0, 57.0),
        bridge: (18.0, 20.0),
        temple: (140.0, 145.0),
    },
    ShapeRule {
        shape: FaceShape::Redondo,
        width: (55.0, 58.0),
        bridge: (16.0, 18.0),
        temple: (135.0, 140.0),
    },
    ShapeRule {
        shape: FaceShape::Diamante,
        width: (53.0, 56.0),
        bridge: (17.0, 19.0),
        temple: (138.0, 142.0),
    },
    ShapeRule {
        shape: FaceShape::Ovalado,
        width: (50.0, 54.0),
        bridge: (14.0, 17.0),
        temple: (130.0, 138.0),
    },
];

fn in_range(value: f64, (lo, hi): (f64, f64)) -> bool {
    value >= lo && value <= hi
}

/// Classify a frame by its width, bridge, and temple measurements (mm).
///
/// Exact rule matches are tried first, in fixed order. When no rule matches
/// all three intervals, each shape is scored (width in range: 3, bridge: 2,
/// temple: 1) and the highest total wins, ties broken by rule order. An
/// all-zero score defaults to `Ovalado`.
#[must_use]
pub fn classify(width_mm: f64, bridge_mm: f64, temple_mm: f64) -> FaceShape {
    for rule in &RULES {
        if in_range(width_mm, rule.width)
            && in_range(bridge_mm, rule.bridge)
            && in_range(temple_mm, rule.temple)
        {
            return rule.shape;
        }
    }

    let mut best = FaceShape::Ovalado;
    let mut best_score = 0u32;
    for rule in &RULES {
        let mut score = 0u32;
        if in_range(width_mm, rule.width) {
            score += 3;
        }
        if in_range(bridge_mm, rule.bridge) {
            score += 2;
        }
        if in_range(temple_mm, rule.temple) {
            score += 1;
        }
        // Strict comparison keeps the first rule in order on ties.
        if score > best_score {
            best_score = score;
            best = rule.shape;
        }
    }
    best
}

/// Classify from optional stored measurements.
///
/// Returns `None` unless width, bridge, and temple are all present; callers
/// surface an "incomplete measurements" state instead of a guessed label.
/// Height is accepted for signature symmetry but carries no weight in the
/// current rule set.
#[must_use]
pub fn classify_optional(
    width_mm: Option<f64>,
    _height_mm: Option<f64>,
    bridge_mm: Option<f64>,
    temple_mm: Option<f64>,
) -> Option<FaceShape> {
    match (width_mm, bridge_mm, temple_mm) {
        (Some(w), Some(b), Some(t)) => Some(classify(w, b, t)),
        _ => None,
    }
}
