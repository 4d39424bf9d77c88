//! Rectangular footprints of laid-out notation items
//!
//! Coordinates follow the page: `y` grows downwards, so an element's top is its
//! smallest `y` and its bottom the largest.

/// Upper bound for vertical positions.
pub const MAXIMUM_Y: f64 = 1_000_000.0;
/// Lower bound for vertical positions.
pub const MINIMUM_Y: f64 = -1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// A beam or two-chord tremolo a stem belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum CrossGroup {
    Beam {
        /// The beam joins chords on different staves.
        cross: bool,
        /// Staff moves of every chord under the beam.
        member_staff_moves: Vec<i32>,
    },
    Tremolo {
        chord1_move: i32,
        chord2_move: i32,
    },
}

impl CrossGroup {
    pub fn is_cross(&self) -> bool {
        match self {
            CrossGroup::Beam { cross, .. } => *cross,
            CrossGroup::Tremolo {
                chord1_move,
                chord2_move,
            } => chord1_move != chord2_move,
        }
    }

    fn member_staff_moves(&self) -> Vec<i32> {
        match self {
            CrossGroup::Beam {
                member_staff_moves, ..
            } => member_staff_moves.clone(),
            CrossGroup::Tremolo {
                chord1_move,
                chord2_move,
            } => vec![*chord1_move, *chord2_move],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    StaffLines,
    Stem {
        /// Staves the stem's chord is moved by; negative is upwards.
        staff_move: i32,
        group: Option<CrossGroup>,
    },
    Arpeggio {
        cross_staff: bool,
    },
    Other,
}

/// The notation item a shape element was produced by.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeItem {
    pub id: u64,
    pub kind: ItemKind,
}

/// Directions a cross-staff item extends to from its own staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrossStaffReach {
    pub up: bool,
    pub down: bool,
}

impl ShapeItem {
    pub fn new(id: u64, kind: ItemKind) -> Self {
        Self { id, kind }
    }

    pub fn is_staff_lines(&self) -> bool {
        self.kind == ItemKind::StaffLines
    }

    pub fn cross_staff_reach(&self) -> CrossStaffReach {
        match &self.kind {
            ItemKind::Stem {
                staff_move,
                group: Some(group),
            } if group.is_cross() => {
                let own = *staff_move;
                let members = group.member_staff_moves();
                CrossStaffReach {
                    up: own < 0 || members.iter().any(|&m| m < own),
                    down: own > 0 || members.iter().any(|&m| m > own),
                }
            }
            ItemKind::Arpeggio { cross_staff: true } => CrossStaffReach { up: false, down: true },
            _ => CrossStaffReach::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapeElement {
    pub rect: Rect,
    pub item: Option<ShapeItem>,
    pub ignore_for_layout: bool,
}

impl ShapeElement {
    pub fn new(rect: Rect, item: Option<ShapeItem>) -> Self {
        Self {
            rect,
            item,
            ignore_for_layout: false,
        }
    }

    pub fn is_staff_lines(&self) -> bool {
        self.item.as_ref().is_some_and(ShapeItem::is_staff_lines)
    }
}

/// An unordered collection of shape elements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shape {
    elements: Vec<ShapeElement>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, element: ShapeElement) {
        self.elements.push(element);
    }

    pub fn elements(&self) -> &[ShapeElement] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Smallest top of all elements, [`MAXIMUM_Y`] when empty.
    pub fn top(&self) -> f64 {
        self.elements
            .iter()
            .map(|e| e.rect.top())
            .fold(MAXIMUM_Y, f64::min)
    }

    /// Largest bottom of all elements, [`MINIMUM_Y`] when empty.
    pub fn bottom(&self) -> f64 {
        self.elements
            .iter()
            .map(|e| e.rect.bottom())
            .fold(MINIMUM_Y, f64::max)
    }

    /// How far `other` must move down to clear this shape, with `other` placed below it.
    ///
    /// Only pairs that overlap horizontally count; elements without height are ignored.
    ///
    /// Zero when no pair overlaps, which is also the result for shapes that exactly touch.
    /// Zero alone does not say whether the shapes share any horizontal range; callers
    /// that need to know must compare the horizontal extents.
    pub fn min_vertical_distance(&self, other: &Shape) -> f64 {
        let mut distance: Option<f64> = None;

        for below in other.elements.iter().filter(|e| e.rect.height > 0.0) {
            for above in self.elements.iter().filter(|e| e.rect.height > 0.0) {
                let overlaps = above.rect.right() > below.rect.left() && above.rect.left() < below.rect.right();
                if overlaps {
                    let gap = above.rect.bottom() - below.rect.top();
                    distance = Some(distance.map_or(gap, |d| d.max(gap)));
                }
            }
        }

        distance.unwrap_or(0.0)
    }
}

impl FromIterator<ShapeElement> for Shape {
    fn from_iter<I: IntoIterator<Item = ShapeElement>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}
