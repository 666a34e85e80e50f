use std::thread;
use std::time::{Duration, Instant};

use framematch::{
    latest_frame, CancelToken, Frame, FrameMatchError, Harness, IterSource, MatchParameters,
    Paced, Region, Step, Template,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const W: usize = 64;
const H: usize = 48;

fn icon() -> Template {
    let mut rng = StdRng::seed_from_u64(42);
    let data = (0..16 * 12)
        .map(|_| [rng.random(), rng.random(), rng.random()])
        .collect();
    Template::new("icon", data, 16, 12).unwrap()
}

fn blank(ts: f64) -> Frame {
    Frame::filled(W, H, [90, 90, 90], ts).unwrap()
}

fn with_icon(icon: &Template, at: (usize, usize), ts: f64) -> Frame {
    let view = icon.view();
    Frame::from_fn(W, H, ts, |x, y| {
        if (at.0..at.0 + 16).contains(&x) && (at.1..at.1 + 12).contains(&y) {
            *view.get(x - at.0, y - at.1).unwrap()
        } else {
            [90, 90, 90]
        }
    })
    .unwrap()
}

#[test]
fn timeout_is_honoured_on_live_video() {
    let interval = Duration::from_millis(20);
    let timeout = 0.2;
    let source = Paced::new(IterSource::new(std::iter::repeat(blank(0.0))), interval);
    let mut harness = Harness::new(source);

    let start = Instant::now();
    let err = harness
        .wait_for_match(&icon(), timeout, &MatchParameters::default())
        .unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, FrameMatchError::MatchTimeout(_)));
    assert!(elapsed >= Duration::from_secs_f64(timeout), "{elapsed:?}");
    // The last frame pulled before the deadline may still be evaluated;
    // anything past one more interval is the scheduler overrunning. Two
    // intervals of slack absorb sleep jitter.
    let bound = Duration::from_secs_f64(timeout) + interval * 3;
    assert!(elapsed < bound, "{elapsed:?} >= {bound:?}");
}

#[test]
fn slow_predicates_do_not_extend_the_deadline() {
    let interval = Duration::from_millis(10);
    let work = Duration::from_millis(30);
    let timeout = 0.2;
    let source = Paced::new(IterSource::new(std::iter::repeat(blank(0.0))), interval);
    let mut harness = Harness::new(source);

    let start = Instant::now();
    let err = harness
        .wait_until(timeout, |_| {
            thread::sleep(work);
            Ok(Step::<()>::Pending)
        })
        .unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, FrameMatchError::WaitTimeout(_)));
    assert!(elapsed >= Duration::from_secs_f64(timeout), "{elapsed:?}");
    // At most one evaluation may straddle the deadline.
    let bound = Duration::from_secs_f64(timeout) + work + interval * 2;
    assert!(elapsed < bound, "{elapsed:?} >= {bound:?}");
}

#[test]
fn match_timeout_carries_the_last_frame() {
    let frames = (0..3).map(|i| blank(i as f64));
    let mut harness = Harness::new(IterSource::new(frames));
    let region = Region::new(0, 0, 40, 40).unwrap();
    let err = harness
        .wait_for_match_in(&icon(), 5.0, &MatchParameters::default(), &region, 1)
        .unwrap_err();
    assert!(err.is_test_failure());
    match err {
        FrameMatchError::MatchTimeout(t) => {
            assert_eq!(t.screenshot.timestamp(), 2.0);
            assert_eq!(t.expected, "icon");
            assert_eq!(t.region, region);
            assert_eq!(t.timeout_secs, 5.0);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn silent_source_is_no_video() {
    let (publisher, latest) = latest_frame();
    let mut harness = Harness::new(latest);
    let err = harness
        .wait_for_match(&icon(), 0.05, &MatchParameters::default())
        .unwrap_err();
    assert_eq!(err, FrameMatchError::NoVideo { timeout_secs: 0.05 });
    assert!(!err.is_test_failure());

    // A closed stream is no better.
    drop(publisher);
    let err = harness.get_frame(1.0).unwrap_err();
    assert!(matches!(err, FrameMatchError::NoVideo { .. }));
}

#[test]
fn cancel_token_aborts_a_long_wait() {
    let source = Paced::new(
        IterSource::new(std::iter::repeat(blank(0.0))),
        Duration::from_millis(5),
    );
    let cancel = CancelToken::new();
    let mut harness = Harness::new(source).with_cancel_token(cancel.clone());

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        cancel.cancel();
    });
    let start = Instant::now();
    let err = harness
        .wait_for_match(&icon(), 30.0, &MatchParameters::default())
        .unwrap_err();
    canceller.join().unwrap();

    assert_eq!(err, FrameMatchError::Cancelled);
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn capture_thread_feeds_the_latest_frame() {
    let tpl = icon();
    let (publisher, latest) = latest_frame();
    let target = with_icon(&tpl, (30, 20), 0.0);
    let capture = thread::spawn(move || {
        for i in 0..400 {
            let frame = if i >= 20 {
                target.with_timestamp(i as f64)
            } else {
                blank(i as f64)
            };
            publisher.publish(frame);
            thread::sleep(Duration::from_millis(5));
        }
    });

    let mut harness = Harness::new(latest);
    let result = harness
        .wait_for_match(&tpl, 10.0, &MatchParameters::default())
        .unwrap();
    assert!(result.matched);
    assert!(result.timestamp >= 20.0);
    assert_eq!(result.region, Region::new(30, 20, 16, 12).unwrap());
    capture.join().unwrap();
}

#[test]
fn consecutive_matches_must_agree_on_position() {
    let tpl = icon();
    let params = MatchParameters::default();

    let frames = vec![
        with_icon(&tpl, (4, 4), 0.0),
        with_icon(&tpl, (40, 30), 1.0),
        with_icon(&tpl, (40, 30), 2.0),
    ];
    let mut harness = Harness::new(IterSource::new(frames));
    let result = harness
        .wait_for_match_in(&tpl, 5.0, &params, &Region::ALL, 2)
        .unwrap();
    assert_eq!(result.timestamp, 2.0);
    assert_eq!(result.region, Region::new(40, 30, 16, 12).unwrap());

    let frames = vec![
        with_icon(&tpl, (4, 4), 0.0),
        blank(1.0),
        with_icon(&tpl, (4, 4), 2.0),
    ];
    let mut harness = Harness::new(IterSource::new(frames));
    let err = harness
        .wait_for_match_in(&tpl, 5.0, &params, &Region::ALL, 2)
        .unwrap_err();
    assert!(matches!(err, FrameMatchError::MatchTimeout(_)));

    let err = harness
        .wait_for_match_in(&tpl, 5.0, &params, &Region::ALL, 0)
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn wait_until_runs_arbitrary_predicates() {
    let frames = (0..10).map(|i| Frame::filled(4, 4, [i * 20, 0, 0], f64::from(i)).unwrap());
    let mut harness = Harness::new(IterSource::new(frames));
    let ts = harness
        .wait_until(5.0, |frame| {
            let bright = frame.pixel(0, 0).is_some_and(|px| px[0] >= 100);
            Ok(Step::from(bright.then(|| frame.timestamp())))
        })
        .unwrap();
    assert_eq!(ts, 5.0);

    let err = harness
        .wait_until(5.0, |_| Ok(Step::<()>::Pending))
        .unwrap_err();
    match err {
        FrameMatchError::WaitTimeout(t) => assert_eq!(t.screenshot.timestamp(), 9.0),
        other => panic!("unexpected {other:?}"),
    }
}
