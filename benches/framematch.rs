use criterion::{criterion_group, criterion_main, Criterion};
use framematch::{
    confirm, detect, ConfirmMethod, Frame, MatchMethod, MatchParameters, Matcher, Region, Template,
};
use framematch::lowlevel::{Kernel, SqdiffNormedScalar, TemplatePlan};
#[cfg(feature = "simd")]
use framematch::lowlevel::SqdiffNormedSimd;
use std::hint::black_box;

fn make_frame(width: usize, height: usize) -> Frame {
    Frame::from_fn(width, height, 0.0, |x, y| {
        let v = ((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF;
        [v as u8, (x / 5) as u8, (y / 3) as u8]
    })
    .unwrap()
}

fn bench_matcher(c: &mut Criterion) {
    let frame = make_frame(1280, 720);
    let patch = frame.crop(&Region::new(400, 300, 96, 48).unwrap()).unwrap();
    let template = Template::from_frame("button", &patch);

    for (name, method, levels) in [
        ("sqdiff_720p_levels2", MatchMethod::SqdiffNormed, 2),
        ("sqdiff_720p_levels3", MatchMethod::SqdiffNormed, 3),
        ("ccoeff_720p_levels2", MatchMethod::CcoeffNormed, 2),
    ] {
        let matcher = Matcher::new(
            &template,
            MatchParameters {
                match_method: method,
                pyramid_levels: levels,
                ..MatchParameters::default()
            },
        )
        .unwrap();
        c.bench_function(name, |b| {
            b.iter(|| black_box(matcher.match_frame(&frame, &Region::ALL).unwrap()));
        });
    }

    // A 64x32 button on a full-HD capture; one frame per call.
    let hd = make_frame(1920, 1080);
    let button = Template::from_frame(
        "ok",
        &hd.crop(&Region::new(100, 200, 64, 32).unwrap()).unwrap(),
    );
    for (name, method) in [
        ("sqdiff_1080p_button", MatchMethod::SqdiffNormed),
        ("ccoeff_1080p_button", MatchMethod::CcoeffNormed),
    ] {
        let matcher = Matcher::new(
            &button,
            MatchParameters {
                match_method: method,
                ..MatchParameters::default()
            },
        )
        .unwrap();
        c.bench_function(name, |b| {
            b.iter(|| black_box(matcher.match_frame(&hd, &Region::ALL).unwrap()));
        });
    }

    let roi = frame.crop(&Region::new(0, 0, 320, 180).unwrap()).unwrap();
    c.bench_function("sqdiff_region_320x180", |b| {
        let matcher = Matcher::new(&template, MatchParameters::default()).unwrap();
        b.iter(|| black_box(matcher.match_frame(&roi, &Region::ALL).unwrap()));
    });
}

fn bench_coarse_kernels(c: &mut Criterion) {
    // The coarse level of a 1080p frame with the default two-level pyramid.
    let level = make_frame(960, 540);
    let patch = level.crop(&Region::new(50, 100, 32, 16).unwrap()).unwrap();
    let plan = TemplatePlan::from_view(patch.view()).unwrap();

    c.bench_function("score_map_scalar_960x540", |b| {
        b.iter(|| black_box(SqdiffNormedScalar::score_map(level.view(), &plan).unwrap()));
    });
    #[cfg(feature = "simd")]
    c.bench_function("score_map_simd_960x540", |b| {
        b.iter(|| black_box(SqdiffNormedSimd::score_map(level.view(), &plan).unwrap()));
    });
}

fn bench_confirm_and_motion(c: &mut Criterion) {
    let frame = make_frame(1280, 720);
    let patch = frame.crop(&Region::new(400, 300, 96, 48).unwrap()).unwrap();
    let gray = patch.to_gray();
    for method in [ConfirmMethod::Absdiff, ConfirmMethod::NormedAbsdiff] {
        let params = MatchParameters {
            confirm_method: method,
            ..MatchParameters::default()
        };
        c.bench_function(&format!("confirm_{method}"), |b| {
            b.iter(|| black_box(confirm(patch.view(), gray.view(), &params).unwrap()));
        });
    }

    let next = make_frame(1280, 720).with_timestamp(1.0);
    c.bench_function("motion_detect_720p", |b| {
        b.iter(|| black_box(detect(&frame, &next, None, 0.16).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_matcher,
    bench_coarse_kernels,
    bench_confirm_and_motion
);
criterion_main!(benches);
