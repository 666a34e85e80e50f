use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use framematch::debug::Artefact;
use framematch::{
    Frame, FrameMatchError, FrameMatchResult, FrameSource, Harness, IterSource, MatchParameters,
    MemorySink, PressParameters, Pull, RecordingRemote, Region, RemoteControl, Template,
};

const BLUE: [u8; 3] = [255, 0, 0];

/// A 1080p "home screen" with a 64x32 blue OK button at (100, 200).
fn home_screen(ts: f64) -> Frame {
    Frame::from_fn(1920, 1080, ts, |x, y| {
        if (100..164).contains(&x) && (200..232).contains(&y) {
            BLUE
        } else {
            [(x % 200) as u8 / 2 + 20, (y % 150) as u8 + 50, 120]
        }
    })
    .unwrap()
}

fn ok_button() -> Template {
    Template::new("ok.png", vec![BLUE; 64 * 32], 64, 32).unwrap()
}

#[test]
fn finds_the_ok_button_on_a_full_hd_screen() {
    let screen = home_screen(0.0);
    let frames: Vec<Frame> = (0..5).map(|i| screen.with_timestamp(f64::from(i))).collect();
    let mut harness = Harness::new(IterSource::new(frames));
    let result = harness
        .wait_for_match(&ok_button(), 10.0, &MatchParameters::default())
        .unwrap();
    assert!(result.matched);
    assert_eq!(result.region, Region::new(100, 200, 64, 32).unwrap());
    assert_eq!(result.template, "ok.png");
    assert_eq!(result.timestamp, 0.0);
    assert!(result.first_pass_certainty > 0.99);
}

#[test]
fn debug_sink_sees_each_evaluated_frame() {
    let sink = Arc::new(MemorySink::new());
    let frames = vec![home_screen(0.0)];
    let mut harness = Harness::new(IterSource::new(frames)).with_debug_sink(sink.clone());
    harness
        .wait_for_match(&ok_button(), 10.0, &MatchParameters::default())
        .unwrap();

    let names = sink.names();
    for step in ["candidate", "gray-roi", "absdiff", "thresholded", "eroded"] {
        let name = format!("frame00000/{step}");
        assert!(names.contains(&name), "missing {name} in {names:?}");
    }
    match sink.get("frame00000/eroded") {
        Some(Artefact::Gray(img)) => assert_eq!((img.width(), img.height()), (64, 32)),
        other => panic!("unexpected {other:?}"),
    }
}

#[cfg(feature = "image-io")]
#[test]
fn reference_image_round_trips_through_png() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ok.png");
    let tpl = ok_button();
    framematch::image::io::save_bgr(&path, tpl.view()).unwrap();

    let loaded = Template::load(&path).unwrap();
    assert_eq!(loaded.view().to_owned_image(), tpl.view().to_owned_image());
    assert!(loaded.name().ends_with("ok.png"));

    let mut harness = Harness::new(IterSource::new(vec![home_screen(3.0)]));
    let result = harness
        .wait_for_match(&loaded, 1.0, &MatchParameters::default())
        .unwrap();
    assert_eq!(result.region, Region::new(100, 200, 64, 32).unwrap());
}

/// A menu that shows the OK button once "KEY_DOWN" has been pressed
/// `needed` times.
struct Menu {
    presses: Arc<AtomicUsize>,
    needed: usize,
    shown: usize,
}

impl FrameSource for Menu {
    fn next_frame(&mut self, _deadline: Instant) -> FrameMatchResult<Pull> {
        self.shown += 1;
        let ts = self.shown as f64;
        let frame = if self.presses.load(Ordering::SeqCst) >= self.needed {
            Frame::from_fn(320, 240, ts, |x, y| {
                if (100..164).contains(&x) && (40..72).contains(&y) {
                    BLUE
                } else {
                    [40, 40, 40]
                }
            })?
        } else {
            Frame::filled(320, 240, [40, 40, 40], ts)?
        };
        Ok(Pull::Frame(frame))
    }
}

struct Remote {
    presses: Arc<AtomicUsize>,
    log: RecordingRemote,
}

impl RemoteControl for Remote {
    fn press(&mut self, key: &str) -> FrameMatchResult<()> {
        self.presses.fetch_add(1, Ordering::SeqCst);
        self.log.press(key)
    }
}

fn menu_harness(needed: usize) -> Harness<Menu, Remote> {
    let presses = Arc::new(AtomicUsize::new(0));
    Harness::new(Menu {
        presses: presses.clone(),
        needed,
        shown: 0,
    })
    .with_remote(Remote {
        presses,
        log: RecordingRemote::new(),
    })
}

#[test]
fn press_until_match_presses_until_the_button_shows() {
    let press = PressParameters {
        interval_secs: 0.0,
        max_presses: 5,
    };
    let mut harness = menu_harness(3);
    let result = harness
        .press_until_match("KEY_DOWN", &ok_button(), &MatchParameters::default(), &press)
        .unwrap();
    assert_eq!(result.region, Region::new(100, 40, 64, 32).unwrap());
    assert_eq!(harness.remote().log.keys(), vec!["KEY_DOWN"; 3]);
}

#[test]
fn press_until_match_gives_up_after_max_presses() {
    let press = PressParameters {
        interval_secs: 0.0,
        max_presses: 2,
    };
    let mut harness = menu_harness(3);
    let err = harness
        .press_until_match("KEY_DOWN", &ok_button(), &MatchParameters::default(), &press)
        .unwrap_err();
    assert!(matches!(err, FrameMatchError::MatchTimeout(_)));
    assert_eq!(harness.remote().log.len(), 2);
}
