//! North and south envelopes of a staff system

use std::collections::BTreeMap;
use std::fmt::Write;

use tracing::trace;

use super::shape::{Shape, ShapeElement};

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

/// Vertical extent of the staff lines from some x onwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StaffLineEdge {
    pub top: f64,
    pub bottom: f64,
}

/// One boundary of a [`Skyline`].
///
/// Once staff lines have been recorded, elements that stay inside the staff band
/// on this line's side are left out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct SkylineLine {
    is_north: bool,
    shape: Shape,
    staff_line_edges: BTreeMap<i64, StaffLineEdge>,
}

impl SkylineLine {
    pub fn new(is_north: bool) -> Self {
        Self {
            is_north,
            shape: Shape::new(),
            staff_line_edges: BTreeMap::new(),
        }
    }

    pub fn is_north(&self) -> bool {
        self.is_north
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn elements(&self) -> &[ShapeElement] {
        self.shape.elements()
    }

    pub fn add(&mut self, element: &ShapeElement) {
        let rect = element.rect;
        let edge = self.staff_line_edge_at(rect.x);

        if element.is_staff_lines() {
            if !(approx_eq(rect.top(), edge.top) && approx_eq(rect.bottom(), edge.bottom)) {
                self.staff_line_edges
                    .entry(rect.x.round() as i64)
                    .or_insert(StaffLineEdge {
                        top: rect.top(),
                        bottom: rect.bottom(),
                    });
            }
        } else if self.has_valid_staff_line_edges() {
            if self.is_north && rect.top() > edge.top - EPSILON {
                return;
            }
            if !self.is_north && rect.bottom() < edge.bottom + EPSILON {
                return;
            }
        }

        self.shape.add(element.clone());
    }

    pub fn add_shape(&mut self, shape: &Shape) {
        for element in shape.elements() {
            self.add(element);
        }
    }

    pub fn has_valid_staff_line_edges(&self) -> bool {
        !self.staff_line_edges.is_empty()
    }

    /// The last edge at or before `round(x)`; the first edge when `x` precedes them all.
    fn staff_line_edge_at(&self, x: f64) -> StaffLineEdge {
        let key = x.round() as i64;
        self.staff_line_edges
            .range(..=key)
            .next_back()
            .or_else(|| self.staff_line_edges.iter().next())
            .map(|(_, edge)| *edge)
            .unwrap_or_default()
    }

    pub fn staff_lines_top_at(&self, x: f64) -> f64 {
        self.staff_line_edge_at(x).top
    }

    pub fn staff_lines_bottom_at(&self, x: f64) -> f64 {
        self.staff_line_edge_at(x).bottom
    }

    /// Smallest top among elements overlapping `(start_x, end_x)`, 0 when none do.
    pub fn top(&self, start_x: f64, end_x: f64) -> f64 {
        self.overlapping(start_x, end_x)
            .map(|e| e.rect.top())
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    /// Largest bottom among elements overlapping `(start_x, end_x)`, 0 when none do.
    pub fn bottom(&self, start_x: f64, end_x: f64) -> f64 {
        self.overlapping(start_x, end_x)
            .map(|e| e.rect.bottom())
            .reduce(f64::max)
            .unwrap_or(0.0)
    }

    fn overlapping(&self, start_x: f64, end_x: f64) -> impl Iterator<Item = &ShapeElement> {
        self.shape
            .elements()
            .iter()
            .filter(move |e| e.rect.right() > start_x && e.rect.left() < end_x)
    }

    /// The outermost extent on this line's side.
    pub fn max(&self) -> f64 {
        if self.is_north {
            self.shape.top()
        } else {
            self.shape.bottom()
        }
    }

    pub fn min_distance(&self, other: &SkylineLine) -> f64 {
        self.shape.min_vertical_distance(&other.shape)
    }

    pub fn is_valid(&self) -> bool {
        !self.shape.is_empty()
    }

    pub fn clear(&mut self) {
        self.shape.clear();
        self.staff_line_edges.clear();
    }

    fn dump_into(&self, out: &mut String) {
        let _ = writeln!(out, "North: {}", self.is_north);
        for element in self.elements() {
            let rect = element.rect;
            let item = element
                .item
                .as_ref()
                .map(|item| format!("{} {:?}", item.id, item.kind))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "  {} x {} y {} w {} h {}",
                item, rect.x, rect.y, rect.width, rect.height
            );
        }
    }
}

/// Upper (north) and lower (south) boundary of a staff system.
#[derive(Debug, Clone, PartialEq)]
pub struct Skyline {
    north: SkylineLine,
    south: SkylineLine,
}

impl Default for Skyline {
    fn default() -> Self {
        Self::new()
    }
}

impl Skyline {
    pub fn new() -> Self {
        Self {
            north: SkylineLine::new(true),
            south: SkylineLine::new(false),
        }
    }

    pub fn north(&self) -> &SkylineLine {
        &self.north
    }

    pub fn south(&self) -> &SkylineLine {
        &self.south
    }

    /// Add an element to the lines it belongs to.
    ///
    /// Cross-staff stems and arpeggios are drawn towards another staff; they are
    /// kept out of the boundary on the side their group reaches to.
    pub fn add(&mut self, element: &ShapeElement) {
        if element.ignore_for_layout {
            return;
        }

        let reach = element
            .item
            .as_ref()
            .map(|item| item.cross_staff_reach())
            .unwrap_or_default();

        if reach.up || reach.down {
            trace!(?reach, "cross-staff element kept out of the skyline");
        }

        if !reach.down {
            self.north.add(element);
        }
        if !reach.up {
            self.south.add(element);
        }
    }

    pub fn add_shape(&mut self, shape: &Shape) {
        for element in shape.elements() {
            self.add(element);
        }
    }

    pub fn clear(&mut self) {
        self.north.clear();
        self.south.clear();
    }

    /// Space needed between this skyline and `other`, placed below it.
    pub fn min_distance(&self, other: &Skyline) -> f64 {
        self.south.min_distance(&other.north)
    }

    pub fn dump(&self) -> String {
        let mut out = String::from("Skyline dump.\n");
        self.north.dump_into(&mut out);
        self.south.dump_into(&mut out);
        out
    }
}
