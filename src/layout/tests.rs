use super::*;

fn staff_lines(x: f64, y: f64, width: f64, height: f64) -> ShapeElement {
    ShapeElement::new(Rect::new(x, y, width, height), Some(ShapeItem::new(0, ItemKind::StaffLines)))
}

fn plain(x: f64, y: f64, width: f64, height: f64) -> ShapeElement {
    ShapeElement::new(Rect::new(x, y, width, height), Some(ShapeItem::new(1, ItemKind::Other)))
}

fn stem(staff_move: i32, group: Option<CrossGroup>) -> ShapeElement {
    ShapeElement::new(
        Rect::new(20.0, 10.0, 1.0, 30.0),
        Some(ShapeItem::new(2, ItemKind::Stem { staff_move, group })),
    )
}

fn beam(cross: bool, member_staff_moves: Vec<i32>) -> Option<CrossGroup> {
    Some(CrossGroup::Beam {
        cross,
        member_staff_moves,
    })
}

#[test]
fn test_staff_line_suppression() {
    let mut skyline = Skyline::new();
    skyline.add(&staff_lines(0.0, 0.0, 100.0, 40.0));

    let top_before = skyline.north().top(0.0, 100.0);
    let bottom_before = skyline.south().bottom(0.0, 100.0);
    assert_eq!(top_before, 0.0);
    assert_eq!(bottom_before, 40.0);

    // Inside the staff band: no effect on either line
    skyline.add(&plain(10.0, 5.0, 10.0, 10.0));
    assert_eq!(skyline.north().top(0.0, 100.0), top_before);
    assert_eq!(skyline.south().bottom(0.0, 100.0), bottom_before);
    assert_eq!(skyline.north().elements().len(), 1);

    // One unit above the band
    skyline.add(&plain(30.0, -1.0, 10.0, 10.0));
    assert_eq!(skyline.north().top(0.0, 100.0), top_before - 1.0);
    assert_eq!(skyline.south().bottom(0.0, 100.0), bottom_before);

    // One unit below the band
    skyline.add(&plain(50.0, 31.0, 10.0, 10.0));
    assert_eq!(skyline.south().bottom(0.0, 100.0), bottom_before + 1.0);
}

#[test]
fn test_without_staff_lines_everything_counts() {
    let mut line = SkylineLine::new(true);
    line.add(&plain(0.0, 5.0, 10.0, 10.0));
    assert_eq!(line.top(0.0, 10.0), 5.0);
    assert!(!line.has_valid_staff_line_edges());
}

#[test]
fn test_staff_line_edge_lookup() {
    let mut line = SkylineLine::new(true);
    assert_eq!(line.staff_lines_top_at(50.0), 0.0);

    line.add(&staff_lines(10.0, 0.0, 190.0, 40.0));
    line.add(&staff_lines(200.0, 10.0, 100.0, 40.0));

    // Before the first edge, the first one applies
    assert_eq!(line.staff_lines_top_at(-5.0), 0.0);
    assert_eq!(line.staff_lines_top_at(150.0), 0.0);
    assert_eq!(line.staff_lines_top_at(199.6), 10.0);
    assert_eq!(line.staff_lines_bottom_at(250.0), 50.0);
}

#[test]
fn test_repeated_staff_lines_keep_one_edge() {
    let mut line = SkylineLine::new(false);
    line.add(&staff_lines(0.0, 0.0, 100.0, 40.0));
    line.add(&staff_lines(100.0, 0.0, 100.0, 40.0));

    assert_eq!(line.staff_lines_bottom_at(150.0), 40.0);
    // Staff lines always go into the shape
    assert_eq!(line.elements().len(), 2);
}

#[test]
fn test_cross_staff_beam_reaching_down() {
    let mut skyline = Skyline::new();
    skyline.add(&stem(0, beam(true, vec![0, 1])));

    assert!(skyline.north().elements().is_empty());
    assert_eq!(skyline.south().elements().len(), 1);
}

#[test]
fn test_cross_staff_beam_reaching_up() {
    let mut skyline = Skyline::new();
    skyline.add(&stem(0, beam(true, vec![-1, 0])));

    assert_eq!(skyline.north().elements().len(), 1);
    assert!(skyline.south().elements().is_empty());
}

#[test]
fn test_moved_stem_reaches_its_own_direction() {
    let reach = stem(1, beam(true, vec![1, 1])).item.unwrap().cross_staff_reach();
    assert_eq!(reach, CrossStaffReach { up: false, down: true });

    let reach = stem(-1, beam(true, vec![-1, 0])).item.unwrap().cross_staff_reach();
    assert_eq!(reach, CrossStaffReach { up: true, down: true });
}

#[test]
fn test_non_cross_groups_go_to_both_lines() {
    let mut skyline = Skyline::new();
    skyline.add(&stem(0, beam(false, vec![0, 1])));
    skyline.add(&stem(
        0,
        Some(CrossGroup::Tremolo {
            chord1_move: 1,
            chord2_move: 1,
        }),
    ));
    skyline.add(&stem(1, None));

    assert_eq!(skyline.north().elements().len(), 3);
    assert_eq!(skyline.south().elements().len(), 3);
}

#[test]
fn test_cross_staff_tremolo_and_arpeggio() {
    let mut skyline = Skyline::new();
    skyline.add(&stem(
        0,
        Some(CrossGroup::Tremolo {
            chord1_move: 0,
            chord2_move: 1,
        }),
    ));
    skyline.add(&ShapeElement::new(
        Rect::new(0.0, 0.0, 5.0, 80.0),
        Some(ShapeItem::new(3, ItemKind::Arpeggio { cross_staff: true })),
    ));

    assert!(skyline.north().elements().is_empty());
    assert_eq!(skyline.south().elements().len(), 2);
}

#[test]
fn test_ignored_elements() {
    let mut skyline = Skyline::new();
    let mut element = plain(0.0, 0.0, 10.0, 10.0);
    element.ignore_for_layout = true;
    skyline.add(&element);

    assert!(!skyline.north().is_valid());
    assert!(!skyline.south().is_valid());
}

#[test]
fn test_top_and_bottom_ranges() {
    let mut line = SkylineLine::new(true);
    line.add(&plain(0.0, -10.0, 10.0, 20.0));
    line.add(&plain(20.0, -30.0, 10.0, 50.0));

    assert_eq!(line.top(0.0, 15.0), -10.0);
    assert_eq!(line.top(0.0, 25.0), -30.0);
    // Touching edges do not overlap
    assert_eq!(line.top(10.0, 20.0), 0.0);
    assert_eq!(line.bottom(15.0, 40.0), 20.0);
    assert_eq!(line.bottom(100.0, 200.0), 0.0);
}

#[test]
fn test_max_follows_the_line_side() {
    let shape: Shape = [plain(0.0, -10.0, 10.0, 20.0), plain(20.0, 5.0, 10.0, 30.0)]
        .into_iter()
        .collect();

    let mut skyline = Skyline::new();
    skyline.add_shape(&shape);

    assert_eq!(skyline.north().max(), -10.0);
    assert_eq!(skyline.south().max(), 35.0);
    assert_eq!(SkylineLine::new(true).max(), MAXIMUM_Y);
    assert_eq!(SkylineLine::new(false).max(), MINIMUM_Y);
}

#[test]
fn test_min_distance() {
    let mut upper = Skyline::new();
    upper.add(&plain(0.0, 0.0, 10.0, 20.0));

    let mut lower = Skyline::new();
    lower.add(&plain(5.0, 15.0, 10.0, 10.0));
    assert_eq!(upper.min_distance(&lower), 5.0);

    let mut apart = Skyline::new();
    apart.add(&plain(50.0, 15.0, 10.0, 10.0));
    assert_eq!(upper.min_distance(&apart), 0.0);

    assert_eq!(upper.min_distance(&Skyline::new()), 0.0);
}

#[test]
fn test_min_vertical_distance_ignores_flat_elements() {
    let above: Shape = [plain(0.0, 0.0, 10.0, 20.0), plain(0.0, 100.0, 10.0, 0.0)]
        .into_iter()
        .collect();
    let below: Shape = [plain(0.0, 10.0, 10.0, 5.0)].into_iter().collect();

    assert_eq!(above.min_vertical_distance(&below), 10.0);
    assert_eq!(above.min_vertical_distance(&Shape::new()), 0.0);
}

#[test]
fn test_min_vertical_distance_without_overlap_matches_touching() {
    let above: Shape = [plain(0.0, 0.0, 10.0, 20.0)].into_iter().collect();
    let beside: Shape = [plain(30.0, 0.0, 10.0, 50.0)].into_iter().collect();
    let touching: Shape = [plain(0.0, 20.0, 10.0, 5.0)].into_iter().collect();

    assert_eq!(above.min_vertical_distance(&beside), 0.0);
    assert_eq!(above.min_vertical_distance(&touching), 0.0);
}

#[test]
fn test_clear_and_dump() {
    let mut skyline = Skyline::new();
    skyline.add(&staff_lines(0.0, 0.0, 100.0, 40.0));
    skyline.add(&plain(0.0, -5.0, 10.0, 10.0));

    let dump = skyline.dump();
    assert!(dump.starts_with("Skyline dump.\n"));
    assert!(dump.contains("North: true"));
    assert!(dump.contains("North: false"));

    skyline.clear();
    assert!(!skyline.north().is_valid());
    assert!(!skyline.north().has_valid_staff_line_edges());
    assert_eq!(skyline.south().bottom(0.0, 100.0), 0.0);
}
