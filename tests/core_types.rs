use framematch::{Frame, FrameMatchError, ImagePyramid, ImageView, Region};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_region(rng: &mut StdRng) -> Region {
    Region::new(
        rng.random_range(-50..200),
        rng.random_range(-50..200),
        rng.random_range(1..150),
        rng.random_range(1..150),
    )
    .unwrap()
}

#[test]
fn intersect_is_commutative() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let a = random_region(&mut rng);
        let b = random_region(&mut rng);
        assert_eq!(a.intersect(&b), b.intersect(&a), "{a} vs {b}");
    }
}

#[test]
fn all_is_the_identity_for_intersect() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..500 {
        let a = random_region(&mut rng);
        assert_eq!(Region::ALL.intersect(&a), Some(a));
        assert_eq!(a.intersect(&Region::ALL), Some(a));

        // Whatever an edit of `a` produces is a region too.
        let dx = rng.random_range(-200..200);
        if let Some(e) = a.extend(0, 0, dx, 0) {
            assert_eq!(Region::ALL.intersect(&e), Some(e));
        } else {
            assert!(a.width() + dx <= 0);
        }
    }
}

#[test]
fn zero_sized_regions_cannot_be_built() {
    assert_eq!(Region::new(5, 5, 0, 10), None);
    assert_eq!(Region::new(5, 5, 10, 0), None);
    assert_eq!(Region::from_extents(5, 5, 5, 15), None);
    assert_eq!(Region::new(0, 0, 8, 8).unwrap().extend(0, 0, -20, 0), None);
}

#[test]
fn extend_right_grows_width() {
    let mut rng = StdRng::seed_from_u64(13);
    for _ in 0..200 {
        let a = random_region(&mut rng);
        assert_eq!(a.extend(0, 0, 10, 0).map(|r| r.width()), Some(a.width() + 10));
        assert_eq!(a.extend(0, 0, 0, 10).map(|r| r.height()), Some(a.height() + 10));
    }
}

#[test]
fn intersection_is_contained_in_both() {
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..500 {
        let a = random_region(&mut rng);
        let b = random_region(&mut rng);
        if let Some(i) = a.intersect(&b) {
            assert!(a.contains(&i) && b.contains(&i));
        }
        let bbox = Region::bounding_box([&a, &b]).unwrap();
        assert!(bbox.contains(&a) && bbox.contains(&b));
    }
}

#[test]
fn image_view_rejects_invalid_dimensions() {
    let data = [0u8; 4];

    let err = ImageView::from_slice(&data, 0, 1).err().unwrap();
    assert_eq!(
        err,
        FrameMatchError::InvalidDimensions {
            width: 0,
            height: 1,
        }
    );

    let err = ImageView::new(&data, 4, 1, 3).err().unwrap();
    assert_eq!(
        err,
        FrameMatchError::InvalidStride {
            width: 4,
            stride: 3,
        }
    );

    let err = ImageView::new(&data[..3], 2, 2, 2).err().unwrap();
    assert_eq!(err, FrameMatchError::BufferTooSmall { needed: 4, got: 3 });
}

#[test]
fn image_view_roi_matches_expected_values() {
    let data: Vec<u8> = (0u8..16).collect();
    let view = ImageView::from_slice(&data, 4, 4).unwrap();
    let roi = view.roi(1, 1, 2, 2).unwrap();
    assert_eq!(roi.width(), 2);
    assert_eq!(roi.stride(), 4);
    assert_eq!(roi.get(0, 0), Some(&5));
    assert_eq!(roi.get(1, 1), Some(&10));
    assert!(view.roi(3, 3, 2, 2).is_err());
}

#[test]
fn pyramid_halves_each_level() {
    let data: Vec<u8> = (0..64 * 48).map(|i| (i % 251) as u8).collect();
    let view = ImageView::from_slice(&data, 64, 48).unwrap();
    let pyramid = ImagePyramid::build(view, 3).unwrap();
    let sizes: Vec<_> = pyramid
        .levels()
        .iter()
        .map(|l| (l.width(), l.height()))
        .collect();
    assert_eq!(sizes, vec![(64, 48), (32, 24), (16, 12)]);
}

#[test]
fn frames_are_cheap_to_clone_and_immutable() {
    let frame = Frame::filled(8, 4, [1, 2, 3], 10.0).unwrap();
    let later = frame.with_timestamp(11.0);
    assert_eq!(later.timestamp(), 11.0);
    assert_eq!(frame.timestamp(), 10.0);
    assert_eq!(later.pixel(7, 3), Some([1, 2, 3]));
    assert_eq!(frame.bounds(), Region::new(0, 0, 8, 4).unwrap());
}

#[test]
fn cropped_frame_reports_full_frame_bounds() {
    let frame = Frame::from_fn(20, 10, 0.0, |x, y| [x as u8, y as u8, 0]).unwrap();
    let crop = frame.crop(&Region::new(5, 2, 100, 3).unwrap()).unwrap();
    assert_eq!(crop.bounds(), Region::new(5, 2, 15, 3).unwrap());
    assert_eq!(crop.pixel(0, 0), Some([5, 2, 0]));

    let err = frame.crop(&Region::new(30, 30, 5, 5).unwrap()).unwrap_err();
    assert!(matches!(err, FrameMatchError::RegionOutsideFrame { .. }));
    assert!(err.is_configuration());
}
