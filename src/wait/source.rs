//! Frame sources: where the scheduler pulls frames from.
//!
//! Pulling is the only blocking operation in the crate. A source either
//! delivers a frame, reports that the stream has ended, or reports that the
//! deadline passed while it was waiting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::frame::Frame;
use crate::util::{FrameMatchError, FrameMatchResult};

/// Outcome of one pull.
#[derive(Clone, Debug, PartialEq)]
pub enum Pull {
    Frame(Frame),
    /// The source will never deliver another frame.
    EndOfStream,
    /// The deadline passed before a frame arrived.
    Idle,
}

/// A stream of decoded frames.
pub trait FrameSource {
    /// Blocks until a frame is available, the stream ends or `deadline` passes.
    fn next_frame(&mut self, deadline: Instant) -> FrameMatchResult<Pull>;
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn next_frame(&mut self, deadline: Instant) -> FrameMatchResult<Pull> {
        (**self).next_frame(deadline)
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self, deadline: Instant) -> FrameMatchResult<Pull> {
        (**self).next_frame(deadline)
    }
}

/// Replays an iterator of frames, never blocking.
#[derive(Clone, Debug)]
pub struct IterSource<I> {
    frames: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = Frame>,
{
    pub fn new<T>(frames: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            frames: frames.into_iter(),
        }
    }
}

impl<I> FrameSource for IterSource<I>
where
    I: Iterator<Item = Frame>,
{
    fn next_frame(&mut self, _deadline: Instant) -> FrameMatchResult<Pull> {
        Ok(self.frames.next().map_or(Pull::EndOfStream, Pull::Frame))
    }
}

/// Replays an iterator of fallible frames; the first error is propagated.
#[derive(Clone, Debug)]
pub struct TryIterSource<I> {
    frames: I,
}

impl<I> TryIterSource<I>
where
    I: Iterator<Item = FrameMatchResult<Frame>>,
{
    pub fn new<T>(frames: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            frames: frames.into_iter(),
        }
    }
}

impl<I> FrameSource for TryIterSource<I>
where
    I: Iterator<Item = FrameMatchResult<Frame>>,
{
    fn next_frame(&mut self, _deadline: Instant) -> FrameMatchResult<Pull> {
        match self.frames.next() {
            Some(frame) => frame.map(Pull::Frame),
            None => Ok(Pull::EndOfStream),
        }
    }
}

/// Delivers the frames of another source at a fixed rate, like live video.
#[derive(Clone, Debug)]
pub struct Paced<S> {
    inner: S,
    interval: Duration,
    next_at: Option<Instant>,
}

impl<S: FrameSource> Paced<S> {
    pub fn new(inner: S, interval: Duration) -> Self {
        Self {
            inner,
            interval,
            next_at: None,
        }
    }

    /// Paces at `fps` frames per second.
    pub fn with_fps(inner: S, fps: f64) -> FrameMatchResult<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(FrameMatchError::invalid_parameter(
                "fps",
                format!("{fps} is not a positive frame rate"),
            ));
        }
        Ok(Self::new(inner, Duration::from_secs_f64(1.0 / fps)))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl<S: FrameSource> FrameSource for Paced<S> {
    fn next_frame(&mut self, deadline: Instant) -> FrameMatchResult<Pull> {
        let now = Instant::now();
        let due = self.next_at.unwrap_or(now);
        if due > deadline {
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
            return Ok(Pull::Idle);
        }
        if due > now {
            std::thread::sleep(due - now);
        }
        self.next_at = Some(due.max(now) + self.interval);
        self.inner.next_frame(deadline)
    }
}

#[derive(Default)]
struct Slot {
    frame: Option<Frame>,
    closed: bool,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    ready: Condvar,
}

/// Creates a single-slot handoff between a capture thread and a consumer.
///
/// Publishing overwrites any frame the consumer has not taken yet, so the
/// consumer always evaluates the freshest frame.
pub fn latest_frame() -> (FramePublisher, LatestFrame) {
    let shared = Arc::new(Shared::default());
    (
        FramePublisher {
            shared: Arc::clone(&shared),
        },
        LatestFrame { shared },
    )
}

/// Producer half of [`latest_frame`]. Dropping it ends the stream.
pub struct FramePublisher {
    shared: Arc<Shared>,
}

impl FramePublisher {
    /// Replaces the pending frame; returns true if an untaken frame was dropped.
    pub fn publish(&self, frame: Frame) -> bool {
        let dropped = self.shared.slot.lock().frame.replace(frame).is_some();
        self.shared.ready.notify_one();
        dropped
    }

    /// Ends the stream once the pending frame (if any) is taken.
    pub fn close(&self) {
        self.shared.slot.lock().closed = true;
        self.shared.ready.notify_all();
    }
}

impl Drop for FramePublisher {
    fn drop(&mut self) {
        self.close();
    }
}

/// Consumer half of [`latest_frame`].
pub struct LatestFrame {
    shared: Arc<Shared>,
}

impl FrameSource for LatestFrame {
    fn next_frame(&mut self, deadline: Instant) -> FrameMatchResult<Pull> {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(frame) = slot.frame.take() {
                return Ok(Pull::Frame(frame));
            }
            if slot.closed {
                return Ok(Pull::EndOfStream);
            }
            if self.shared.ready.wait_until(&mut slot, deadline).timed_out() {
                return Ok(slot.frame.take().map_or(Pull::Idle, Pull::Frame));
            }
        }
    }
}

/// Shared flag that aborts waits between frame pulls.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(ts: f64) -> Frame {
        Frame::filled(2, 2, [0, 0, 0], ts).unwrap()
    }

    fn soon() -> Instant {
        Instant::now() + Duration::from_millis(50)
    }

    #[test]
    fn iter_source_ends() {
        let mut src = IterSource::new(vec![frame(1.0)]);
        assert_eq!(src.next_frame(soon()).unwrap(), Pull::Frame(frame(1.0)));
        assert_eq!(src.next_frame(soon()).unwrap(), Pull::EndOfStream);
    }

    #[test]
    fn try_iter_source_propagates_errors() {
        let failure = FrameMatchError::FrameSource {
            reason: "pipeline restarted".into(),
        };
        let mut src = TryIterSource::new(vec![Ok(frame(1.0)), Err(failure.clone())]);
        assert!(matches!(src.next_frame(soon()), Ok(Pull::Frame(_))));
        assert_eq!(src.next_frame(soon()), Err(failure));
    }

    #[test]
    fn latest_frame_keeps_only_the_newest() {
        let (publisher, mut consumer) = latest_frame();
        assert!(!publisher.publish(frame(1.0)));
        assert!(publisher.publish(frame(2.0)));
        assert_eq!(consumer.next_frame(soon()).unwrap(), Pull::Frame(frame(2.0)));
        assert_eq!(consumer.next_frame(soon()).unwrap(), Pull::Idle);
        drop(publisher);
        assert_eq!(consumer.next_frame(soon()).unwrap(), Pull::EndOfStream);
    }

    #[test]
    fn latest_frame_wakes_consumer() {
        let (publisher, mut consumer) = latest_frame();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            publisher.publish(frame(3.0));
        });
        let deadline = Instant::now() + Duration::from_secs(5);
        assert_eq!(consumer.next_frame(deadline).unwrap(), Pull::Frame(frame(3.0)));
        handle.join().unwrap();
    }

    #[test]
    fn paced_source_goes_idle_at_deadline() {
        let frames = IterSource::new(std::iter::repeat(frame(0.0)));
        let mut src = Paced::new(frames, Duration::from_millis(40));
        let start = Instant::now();
        let deadline = start + Duration::from_millis(60);
        assert!(matches!(src.next_frame(deadline).unwrap(), Pull::Frame(_)));
        assert!(matches!(src.next_frame(deadline).unwrap(), Pull::Frame(_)));
        assert_eq!(src.next_frame(deadline).unwrap(), Pull::Idle);
        assert!(start.elapsed() >= Duration::from_millis(60));
    }
}
