//! Positional element finding: "the input right of the label".
//!
//! A [`Finder`] ranks every candidate match by its distance from a
//! reference element, keeping only candidates on the requested side.
//!
//! # Example
//!
//! ```ignore
//! driver.right_of("{}Username").find("input").await?.input("bob").await?;
//! driver.below("{h2}Billing").within(80.0).click("{button}Edit").await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::locator::{DOCUMENT, Locator, js};

use super::element::Element;

// ============================================================================
// Constants
// ============================================================================

/// Pixels a candidate may overlap the reference and still count.
pub const DEFAULT_TOLERANCE: f64 = 50.0;

// ============================================================================
// Rect
// ============================================================================

/// An element's bounding box in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Rect {
    /// Creates a rectangle.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    #[inline]
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    #[inline]
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Centre point.
    #[inline]
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    fn overlaps_vertically(&self, other: &Rect) -> bool {
        self.y < other.bottom() && self.bottom() > other.y
    }

    fn overlaps_horizontally(&self, other: &Rect) -> bool {
        self.x < other.right() && self.right() > other.x
    }
}

// ============================================================================
// Position
// ============================================================================

/// Side of the reference element to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// To the right, sharing some vertical extent.
    RightOf,
    /// To the left, sharing some vertical extent.
    LeftOf,
    /// Above, sharing some horizontal extent.
    Above,
    /// Below, sharing some horizontal extent.
    Below,
    /// Centre within the tolerance of the reference centre.
    Near,
}

impl Position {
    /// Distance of `candidate` from `reference`, or `None` if it is not on
    /// this side.
    #[must_use]
    pub fn distance(self, reference: &Rect, candidate: &Rect, tolerance: f64) -> Option<f64> {
        if candidate == reference {
            return None;
        }

        match self {
            Self::RightOf => (candidate.x >= reference.right() - tolerance
                && candidate.overlaps_vertically(reference))
            .then(|| candidate.x - reference.right()),
            Self::LeftOf => (candidate.right() <= reference.x + tolerance
                && candidate.overlaps_vertically(reference))
            .then(|| reference.x - candidate.right()),
            Self::Above => (candidate.bottom() <= reference.y + tolerance
                && candidate.overlaps_horizontally(reference))
            .then(|| reference.y - candidate.bottom()),
            Self::Below => (candidate.y >= reference.bottom() - tolerance
                && candidate.overlaps_horizontally(reference))
            .then(|| candidate.y - reference.bottom()),
            Self::Near => {
                let (rx, ry) = reference.center();
                let (cx, cy) = candidate.center();
                let d = (cx - rx).hypot(cy - ry);
                (d <= tolerance).then_some(d)
            }
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::RightOf => "right of",
            Self::LeftOf => "left of",
            Self::Above => "above",
            Self::Below => "below",
            Self::Near => "near",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indices of qualifying candidates, nearest first.
///
/// `None` entries are candidates that went stale while being measured.
#[must_use]
pub fn rank(position: Position, reference: &Rect, candidates: &[Option<Rect>], tolerance: f64) -> Vec<usize> {
    let mut ranked: Vec<(usize, f64)> = candidates
        .iter()
        .enumerate()
        .filter_map(|(i, rect)| {
            rect.as_ref()
                .and_then(|r| position.distance(reference, r, tolerance))
                .map(|d| (i, d))
        })
        .collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.into_iter().map(|(i, _)| i).collect()
}

// ============================================================================
// Finder
// ============================================================================

/// Finds elements relative to a reference element.
///
/// Created by [`Driver::right_of`] and its siblings.
#[derive(Debug, Clone)]
pub struct Finder<'d> {
    driver: &'d Driver,
    reference: String,
    position: Position,
    tolerance: f64,
}

impl<'d> Finder<'d> {
    pub(crate) fn new(driver: &'d Driver, reference: &str, position: Position) -> Self {
        Self {
            driver,
            reference: reference.to_string(),
            position,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Sets the tolerance in pixels.
    #[must_use]
    pub fn within(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.max(0.0);
        self
    }

    /// Nearest match of `locator`.
    ///
    /// # Errors
    ///
    /// [`Error::ElementNotFound`] if no candidate lies on the requested side.
    pub async fn find(&self, locator: &str) -> Result<Element<'d>> {
        self.find_all(locator).await?.into_iter().next().ok_or_else(|| {
            Error::element_not_found(format!("{locator} {} {}", self.position, self.reference))
        })
    }

    /// Every qualifying match, nearest first.
    pub async fn find_all(&self, locator: &str) -> Result<Vec<Element<'d>>> {
        let reference = self.driver.position_relative(&self.reference).await?;
        let all = Locator::parse(locator)?.selector_all(DOCUMENT);

        let rects: Vec<Option<Rect>> = match self.driver.script(&js::positions(&all)).await? {
            Value::Array(items) => items
                .into_iter()
                .map(|v| serde_json::from_value(v).ok())
                .collect(),
            _ => Vec::new(),
        };

        let order = rank(self.position, &reference, &rects, self.tolerance);
        trace!(locator, position = %self.position, candidates = rects.len(), found = order.len(), "Ranked candidates");

        Ok(order
            .into_iter()
            .map(|i| Element::new(self.driver, &format!("({all})[{i}]"), true))
            .collect())
    }

    /// Clicks the nearest match.
    pub async fn click(&self, locator: &str) -> Result<()> {
        self.find(locator).await?.click().await
    }

    /// Returns `true` if any candidate qualifies.
    pub async fn exists(&self, locator: &str) -> Result<bool> {
        Ok(!self.find_all(locator).await?.is_empty())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const LABEL: Rect = Rect::new(100.0, 100.0, 80.0, 20.0);

    #[test]
    fn test_right_of_requires_vertical_overlap() {
        let input = Rect::new(200.0, 98.0, 150.0, 24.0);
        let lower = Rect::new(200.0, 300.0, 150.0, 24.0);
        assert_eq!(Position::RightOf.distance(&LABEL, &input, DEFAULT_TOLERANCE), Some(20.0));
        assert_eq!(Position::RightOf.distance(&LABEL, &lower, DEFAULT_TOLERANCE), None);
    }

    #[test]
    fn test_left_of_and_above() {
        let left = Rect::new(10.0, 105.0, 60.0, 10.0);
        let above = Rect::new(120.0, 40.0, 40.0, 30.0);
        assert_eq!(Position::LeftOf.distance(&LABEL, &left, 0.0), Some(30.0));
        assert_eq!(Position::Above.distance(&LABEL, &above, 0.0), Some(30.0));
        assert_eq!(Position::Below.distance(&LABEL, &above, 0.0), None);
    }

    #[test]
    fn test_tolerance_admits_overlap() {
        let overlapping = Rect::new(170.0, 100.0, 50.0, 20.0);
        assert!(Position::RightOf.distance(&LABEL, &overlapping, 0.0).is_none());
        assert_eq!(Position::RightOf.distance(&LABEL, &overlapping, 20.0), Some(-10.0));
    }

    #[test]
    fn test_near_uses_centres() {
        let close = Rect::new(130.0, 110.0, 80.0, 20.0);
        let far = Rect::new(400.0, 400.0, 10.0, 10.0);
        let d = Position::Near.distance(&LABEL, &close, DEFAULT_TOLERANCE).expect("near");
        assert!((d - 31.622_776).abs() < 1e-3);
        assert!(Position::Near.distance(&LABEL, &far, DEFAULT_TOLERANCE).is_none());
    }

    #[test]
    fn test_reference_itself_excluded() {
        assert!(Position::Near.distance(&LABEL, &LABEL, DEFAULT_TOLERANCE).is_none());
    }

    #[test]
    fn test_rank_sorts_by_distance_and_skips_stale() {
        let candidates = [
            Some(Rect::new(400.0, 100.0, 10.0, 10.0)),
            None,
            Some(Rect::new(200.0, 100.0, 10.0, 10.0)),
            Some(Rect::new(200.0, 500.0, 10.0, 10.0)),
        ];
        assert_eq!(rank(Position::RightOf, &LABEL, &candidates, DEFAULT_TOLERANCE), [2, 0]);
    }

    #[test]
    fn test_rect_deserializes_from_snippet_output() {
        let rect: Rect =
            serde_json::from_value(serde_json::json!({"x": 1, "y": 2.5, "width": 3, "height": 4}))
                .expect("rect");
        assert_eq!(rect, Rect::new(1.0, 2.5, 3.0, 4.0));
        assert_eq!(rect.center(), (2.5, 4.5));
    }
}
