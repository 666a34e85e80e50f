//! Framematch locates reference images and motion in captured video frames.
//!
//! It is the matching core of a hardware-in-the-loop UI test rig: a coarse
//! to fine pyramid matcher with a pixel-accurate confirmation step, a
//! frame-to-frame motion detector with M-of-N voting, and a deadline-bounded
//! scheduler that evaluates predicates against a live frame source.
//! The template dot product is vectorized through the default `simd`
//! feature; parallel scanning is available through the `rayon` feature.

mod candidate;
pub mod confirm;
pub mod control;
pub mod debug;
pub mod frame;
pub mod harness;
pub mod image;
mod kernel;
pub mod lowlevel;
pub mod matcher;
pub mod motion;
pub mod params;
pub mod region;
mod search;
pub mod template;
mod trace;
pub mod util;
pub mod wait;

pub use confirm::confirm;
pub use control::{NullRemote, RecordingRemote, RemoteControl};
pub use debug::{DebugSink, MemorySink};
#[cfg(feature = "image-io")]
pub use debug::DiskSink;
pub use frame::Frame;
pub use harness::Harness;
pub use image::pyramid::ImagePyramid;
pub use image::{Bgr, ImageView, OwnedImage};
#[cfg(feature = "image-io")]
pub use image::io::{load_frame, load_frame_from_memory, load_mask};
pub use matcher::{match_frame, MatchResult, Matcher};
pub use motion::{detect, Mask, MotionDetector, MotionResult, VoteWindow};
pub use params::{
    ConfirmMethod, ConsecutiveFrames, MatchMethod, MatchParameters, MotionParameters,
    PressParameters,
};
pub use region::Region;
pub use search::{locate, Located, LEVEL_RELAXATION};
pub use template::{CompiledTemplate, Template};
pub use util::{FrameMatchError, FrameMatchResult, MatchTimeout, MotionTimeout, WaitTimeout};
pub use wait::{
    latest_frame, wait_until, CancelToken, FramePublisher, FrameSource, IterSource, LatestFrame,
    Paced, Pull, Step, TryIterSource,
};
