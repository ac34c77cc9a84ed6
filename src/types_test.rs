use super::*;

#[test]
fn test_bounding_box_union_takes_componentwise_extremes() {
    let a = BoundingBox { min: Point::new(0.0, 5.0, 10), max: Point::new(2.0, 6.0, 20) };
    let b = BoundingBox { min: Point::new(-1.0, 4.0, 15), max: Point::new(1.0, 9.0, 25) };
    let u = BoundingBox::union(a, b);
    assert_eq!(u.min, Point::new(-1.0, 4.0, 10));
    assert_eq!(u.max, Point::new(2.0, 9.0, 25));
}

#[test]
fn test_extend_point_grows_box_to_include_point() {
    let b = BoundingBox::of_point(Point::new(0.0, 0.0, 0));
    let grown = b.extend_point(Point::new(3.0, -2.0, 7));
    assert_eq!(grown.min, Point::new(0.0, -2.0, 0));
    assert_eq!(grown.max, Point::new(3.0, 0.0, 7));
}

#[test]
fn test_overlaps_is_symmetric_and_detects_disjoint_boxes() {
    let a = BoundingBox { min: Point::new(0.0, 0.0, 0), max: Point::new(1.0, 1.0, 1) };
    let b = BoundingBox { min: Point::new(0.5, 0.5, 0), max: Point::new(2.0, 2.0, 2) };
    let c = BoundingBox { min: Point::new(5.0, 5.0, 5), max: Point::new(6.0, 6.0, 6) };
    assert!(a.overlaps(&b));
    assert!(b.overlaps(&a));
    assert!(!a.overlaps(&c));
    assert!(!c.overlaps(&a));
}

#[test]
fn test_volume_uses_epsilon_floor_for_degenerate_boxes() {
    let point_box = BoundingBox::of_point(Point::new(1.0, 1.0, 1));
    assert!(point_box.volume() > 0.0);
}

#[test]
fn test_trajectory_unit_mbb_and_centre() {
    let unit = TrajectoryUnit {
        start: Point::new(0.0, 0.0, 0),
        end: Point::new(4.0, 2.0, 10),
        label: 7,
    };
    let mbb = unit.mbb();
    assert_eq!(mbb.min, Point::new(0.0, 0.0, 0));
    assert_eq!(mbb.max, Point::new(4.0, 2.0, 10));
    let (cx, cy, ct) = unit.centre();
    assert_eq!((cx, cy, ct), (2.0, 1.0, 5.0));
}

#[test]
fn test_leaf_entry_delegates_to_unit() {
    let entry = LeafEntry {
        trajectory_id: 9,
        unit_index: 2,
        unit: TrajectoryUnit {
            start: Point::new(0.0, 0.0, 0),
            end: Point::new(1.0, 1.0, 1),
            label: 3,
        },
    };
    assert_eq!(entry.label(), 3);
    assert_eq!(entry.mbb(), entry.unit.mbb());
}
