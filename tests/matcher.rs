use framematch::lowlevel::{CcoeffNormedScalar, Kernel, SqdiffNormedScalar, TemplatePlan};
use framematch::{
    locate, match_frame, CompiledTemplate, ConfirmMethod, Frame, FrameMatchError, MatchMethod,
    MatchParameters, Matcher, Region, Template,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn noise_frame(width: usize, height: usize, seed: u64) -> Frame {
    let mut rng = StdRng::seed_from_u64(seed);
    Frame::from_fn(width, height, 0.0, |_, _| {
        [rng.random(), rng.random(), rng.random()]
    })
    .unwrap()
}

fn argmax<K: Kernel>(frame: &Frame, tpl: &Template) -> (usize, usize, f32) {
    let plan = TemplatePlan::from_view(tpl.view()).unwrap();
    let map = K::score_map(frame.view(), &plan).unwrap();
    let mut best = (0, 0, f32::NEG_INFINITY);
    for y in 0..map.height() {
        for x in 0..map.width() {
            let s = map.get(x, y).unwrap();
            if s > best.2 {
                best = (x, y, s);
            }
        }
    }
    best
}

#[test]
fn pyramid_agrees_with_exhaustive_search() {
    let frame = noise_frame(160, 120, 1);
    for &(x0, y0) in &[(37usize, 21usize), (100, 80), (0, 0), (128, 96)] {
        let patch = frame
            .crop(&Region::new(x0 as i64, y0 as i64, 32, 24).unwrap())
            .unwrap();
        let tpl = Template::from_frame("patch", &patch);
        for (method, (ex, ey, ec)) in [
            (MatchMethod::SqdiffNormed, argmax::<SqdiffNormedScalar>(&frame, &tpl)),
            (MatchMethod::CcoeffNormed, argmax::<CcoeffNormedScalar>(&frame, &tpl)),
        ] {
            assert_eq!((ex, ey), (x0, y0));
            for levels in [2, 3] {
                let params = MatchParameters {
                    match_method: method,
                    pyramid_levels: levels,
                    ..MatchParameters::default()
                };
                let compiled = CompiledTemplate::compile(&tpl, levels).unwrap();
                let (region, certainty) = locate(&frame, &compiled, &params).unwrap();
                let tolerance = levels as i64;
                let label = format!("{method} with {levels} levels");
                assert!((region.x() - ex as i64).abs() < tolerance, "{label}: {region}");
                assert!((region.y() - ey as i64).abs() < tolerance, "{label}: {region}");
                assert!((certainty - ec).abs() < 0.01, "{label}: {certainty} vs {ec}");
            }
        }
    }
}

#[test]
fn matching_is_idempotent() {
    let frame = noise_frame(96, 80, 2);
    let patch = frame.crop(&Region::new(41, 17, 20, 20).unwrap()).unwrap();
    let tpl = Template::from_frame("patch", &patch);
    let params = MatchParameters::default();
    let a = match_frame(&tpl, &frame, &params).unwrap();
    let b = match_frame(&tpl, &frame, &params).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.first_pass_certainty.to_bits(), b.first_pass_certainty.to_bits());
    assert!(a.matched);
    assert_eq!(a.region, Region::new(41, 17, 20, 20).unwrap());
}

#[test]
fn weak_match_is_not_an_error() {
    let frame = noise_frame(96, 80, 3);
    let other = noise_frame(20, 20, 4);
    let tpl = Template::from_frame("other", &other);
    let params = MatchParameters {
        match_method: MatchMethod::CcoeffNormed,
        ..MatchParameters::default()
    };
    let result = match_frame(&tpl, &frame, &params).unwrap();
    assert!(!result.matched);
    assert!(result.first_pass_certainty < params.match_threshold);
    assert_eq!(result.region.width(), 20);
}

#[test]
fn solid_colours_of_equal_luma_do_not_match() {
    // Pure blue and a dark gray have the same luma but different channels.
    let blue = Template::from_frame("blue", &Frame::filled(16, 8, [255, 0, 0], 0.0).unwrap());
    let frame = Frame::filled(64, 48, [29, 29, 29], 0.0).unwrap();
    for method in MatchMethod::ALL {
        let params = MatchParameters {
            match_method: method,
            confirm_method: ConfirmMethod::None,
            ..MatchParameters::default()
        };
        let result = match_frame(&blue, &frame, &params).unwrap();
        assert!(!result.matched, "{method}");
    }
}

#[test]
fn frame_sized_template_uses_single_placement() {
    let frame = noise_frame(40, 30, 5);
    let tpl = Template::from_frame("whole", &frame);
    let result = match_frame(&tpl, &frame, &MatchParameters::default()).unwrap();
    assert!(result.matched);
    assert_eq!(result.region, frame.bounds());
    assert!((result.first_pass_certainty - 1.0).abs() < 1e-6);
}

#[test]
fn match_all_finds_every_copy_best_first() {
    let mut rng = StdRng::seed_from_u64(6);
    let patch: Vec<[u8; 3]> = (0..24 * 16)
        .map(|_| [rng.random(), rng.random(), rng.random()])
        .collect();
    let tpl = Template::new("icon", patch.clone(), 24, 16).unwrap();
    let spots = [(10usize, 10usize), (70, 12), (30, 60)];
    let frame = Frame::from_fn(120, 90, 0.0, |x, y| {
        for &(sx, sy) in &spots {
            if (sx..sx + 24).contains(&x) && (sy..sy + 16).contains(&y) {
                return patch[(y - sy) * 24 + (x - sx)];
            }
        }
        [128, 128, 128]
    })
    .unwrap();

    let matcher = Matcher::new(&tpl, MatchParameters::default()).unwrap();
    let found = matcher.match_all(&frame, &Region::ALL).unwrap();
    let mut regions: Vec<Region> = found.iter().map(|m| m.region).collect();
    assert!(found.iter().all(|m| m.matched));
    assert!(found
        .windows(2)
        .all(|w| w[0].first_pass_certainty >= w[1].first_pass_certainty));
    regions.sort_by_key(|r| (r.y(), r.x()));
    assert_eq!(
        regions,
        vec![
            Region::new(10, 10, 24, 16).unwrap(),
            Region::new(70, 12, 24, 16).unwrap(),
            Region::new(30, 60, 24, 16).unwrap(),
        ]
    );

    let left = matcher.match_all(&frame, &Region::new(0, 0, 60, 90).unwrap()).unwrap();
    assert_eq!(left.len(), 2);
}

#[test]
fn configuration_errors_are_raised_immediately() {
    let frame = noise_frame(32, 24, 7);
    let big = Template::from_frame("big", &noise_frame(40, 10, 8));
    let err = match_frame(&big, &frame, &MatchParameters::default()).unwrap_err();
    assert!(matches!(err, FrameMatchError::TemplateTooLarge { .. }));
    assert!(err.is_configuration());

    let patch = frame.crop(&Region::new(0, 0, 8, 8).unwrap()).unwrap();
    let tpl = Template::from_frame("tpl", &patch);
    let bad = MatchParameters {
        confirm_threshold: -0.5,
        ..MatchParameters::default()
    };
    assert!(matches!(
        Matcher::new(&tpl, bad),
        Err(FrameMatchError::InvalidParameter {
            name: "confirm_threshold",
            ..
        })
    ));

    let matcher = Matcher::new(&tpl, MatchParameters::default()).unwrap();
    let err = matcher
        .match_frame(&frame, &Region::new(100, 100, 10, 10).unwrap())
        .unwrap_err();
    assert!(matches!(err, FrameMatchError::RegionOutsideFrame { .. }));
    let err = matcher
        .match_frame(&frame, &Region::new(0, 0, 6, 24).unwrap())
        .unwrap_err();
    assert!(matches!(err, FrameMatchError::TemplateTooLarge { .. }));
}

#[test]
fn pyramid_depth_is_clamped_for_small_templates() {
    let frame = noise_frame(64, 64, 9);
    let patch = frame.crop(&Region::new(20, 30, 5, 4).unwrap()).unwrap();
    let tpl = Template::from_frame("tiny", &patch);
    let params = MatchParameters {
        pyramid_levels: 6,
        ..MatchParameters::default()
    };
    let matcher = Matcher::new(&tpl, params).unwrap();
    assert_eq!(matcher.template().num_levels(), 2);
    let result = matcher.match_frame(&frame, &Region::ALL).unwrap();
    assert_eq!(result.region, Region::new(20, 30, 5, 4).unwrap());
}
