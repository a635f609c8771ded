//! Centre-distance proximity between detections

use challan_types::{Detection, Point};

pub fn distance(a: Point, b: Point) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

/// Detections whose box centre is within `threshold` px of the reference's
pub fn find_nearby<'a>(
    reference: &Detection,
    objects: &'a [Detection],
    threshold: f64,
) -> Vec<&'a Detection> {
    let center = reference.bbox.center();
    objects
        .iter()
        .filter(|obj| distance(center, obj.bbox.center()) <= threshold)
        .collect()
}

pub fn motorcycles(vehicles: &[Detection]) -> impl Iterator<Item = &Detection> {
    vehicles.iter().filter(|v| v.is_class("motorcycle"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use challan_types::BoundingBox;

    fn det(class: &str, x1: f64, y1: f64, x2: f64, y2: f64) -> Detection {
        Detection::new(class, 0.9, BoundingBox::new(x1, y1, x2, y2).unwrap()).unwrap()
    }

    #[test]
    fn test_distance() {
        assert_eq!(distance((0.0, 0.0), (3.0, 4.0)), 5.0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let bike = det("motorcycle", 0.0, 0.0, 100.0, 100.0);
        let persons = vec![
            det("person", 70.0, 40.0, 90.0, 60.0),
            det("person", 71.0, 40.0, 91.0, 60.0),
        ];
        let nearby = find_nearby(&bike, &persons, 30.0);
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].bbox.x1(), 70.0);
    }

    #[test]
    fn test_motorcycles_filter() {
        let vehicles = vec![
            det("car", 0.0, 0.0, 10.0, 10.0),
            det("Motorcycle", 0.0, 0.0, 10.0, 10.0),
        ];
        assert_eq!(motorcycles(&vehicles).count(), 1);
    }
}
