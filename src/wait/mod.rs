//! Deadline-bounded polling of a frame source.
//!
//! Every wait in the crate is built on [`poll_frames`]: compute the deadline
//! once, pull frames until the predicate succeeds, and report a timeout that
//! carries the last frame evaluated. The deadline is never extended, not by
//! slow predicates and not by a source that stalls or restarts.

mod source;

pub use source::{
    latest_frame, CancelToken, FramePublisher, FrameSource, IterSource, LatestFrame, Paced, Pull,
    TryIterSource,
};

use std::time::{Duration, Instant};

use crate::frame::Frame;
use crate::trace::{trace_event, trace_span};
use crate::util::math::timeout_from_secs;
use crate::util::{FrameMatchError, FrameMatchResult, WaitTimeout};

/// Predicate verdict for one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Step<T> {
    /// Stop waiting and return the value.
    Done(T),
    /// Keep pulling frames.
    Pending,
}

impl<T> From<Option<T>> for Step<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Step::Pending, Step::Done)
    }
}

/// How a poll ended without error.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Polled<T> {
    Done(T),
    /// The deadline passed (or the stream ended) after at least one frame.
    Expired { last: Frame },
}

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    // Effectively "never" for absurd timeouts.
    now.checked_add(timeout)
        .unwrap_or_else(|| now + Duration::from_secs(60 * 60 * 24 * 365))
}

/// Pulls frames from `source` until `eval` is done or `timeout_secs` elapses.
///
/// A frame pulled before the deadline is always evaluated, even if the
/// deadline passes while it is being evaluated. Ends with `NoVideo` if no
/// frame at all was evaluated.
pub(crate) fn poll_frames<S, T, F>(
    source: &mut S,
    timeout_secs: f64,
    cancel: &CancelToken,
    mut eval: F,
) -> FrameMatchResult<Polled<T>>
where
    S: FrameSource + ?Sized,
    F: FnMut(&Frame) -> FrameMatchResult<Step<T>>,
{
    let deadline = deadline_after(timeout_from_secs(timeout_secs)?);
    let mut last: Option<Frame> = None;
    let mut frames = 0usize;

    loop {
        if cancel.is_cancelled() {
            trace_event!("wait_verdict", verdict = "cancelled", frames = frames);
            return Err(FrameMatchError::Cancelled);
        }
        match source.next_frame(deadline)? {
            Pull::Frame(frame) => {
                frames += 1;
                if let Step::Done(value) = eval(&frame)? {
                    trace_event!("wait_verdict", verdict = "done", frames = frames);
                    return Ok(Polled::Done(value));
                }
                last = Some(frame);
            }
            Pull::EndOfStream => break,
            Pull::Idle => {}
        }
        if Instant::now() >= deadline {
            break;
        }
    }

    match last {
        Some(last) => {
            trace_event!("wait_verdict", verdict = "timeout", frames = frames);
            Ok(Polled::Expired { last })
        }
        None => {
            trace_event!("wait_verdict", verdict = "no_video", frames = frames);
            Err(FrameMatchError::NoVideo { timeout_secs })
        }
    }
}

/// Evaluates `predicate` on each frame from `source` until it is done.
///
/// Fails with `WaitTimeout` carrying the last frame if the predicate is
/// still pending after `timeout_secs`, and with `NoVideo` if the source
/// delivered nothing.
pub fn wait_until<S, T, F>(
    source: &mut S,
    timeout_secs: f64,
    cancel: &CancelToken,
    predicate: F,
) -> FrameMatchResult<T>
where
    S: FrameSource + ?Sized,
    F: FnMut(&Frame) -> FrameMatchResult<Step<T>>,
{
    let _span = trace_span!("wait_until", timeout_secs = timeout_secs).entered();
    match poll_frames(source, timeout_secs, cancel, predicate)? {
        Polled::Done(value) => Ok(value),
        Polled::Expired { last } => Err(WaitTimeout {
            screenshot: last,
            timeout_secs,
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::filled(2, 2, [i as u8, 0, 0], i as f64).unwrap())
            .collect()
    }

    #[test]
    fn stops_at_first_success() {
        let mut src = IterSource::new(frames(5));
        let mut seen = 0;
        let ts = wait_until(&mut src, 10.0, &CancelToken::new(), |f| {
            seen += 1;
            Ok(Step::from((f.timestamp() >= 2.0).then(|| f.timestamp())))
        })
        .unwrap();
        assert_eq!(ts, 2.0);
        assert_eq!(seen, 3);
        assert!(matches!(src.next_frame(Instant::now()), Ok(Pull::Frame(_))));
    }

    #[test]
    fn end_of_stream_times_out_with_last_frame() {
        let mut src = IterSource::new(frames(3));
        let err = wait_until(&mut src, 10.0, &CancelToken::new(), |_| Ok(Step::<()>::Pending))
            .unwrap_err();
        match err {
            FrameMatchError::WaitTimeout(t) => assert_eq!(t.screenshot.timestamp(), 2.0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_stream_is_no_video() {
        let mut src = IterSource::new(Vec::new());
        let err = wait_until(&mut src, 1.0, &CancelToken::new(), |_| Ok(Step::<()>::Pending))
            .unwrap_err();
        assert_eq!(err, FrameMatchError::NoVideo { timeout_secs: 1.0 });
    }

    #[test]
    fn cancel_and_predicate_errors_propagate() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut src = IterSource::new(frames(3));
        let err = wait_until(&mut src, 1.0, &cancel, |_| Ok(Step::<()>::Pending)).unwrap_err();
        assert_eq!(err, FrameMatchError::Cancelled);

        let mut src = IterSource::new(frames(3));
        let err = wait_until(&mut src, 1.0, &CancelToken::new(), |_| {
            Err::<Step<()>, _>(FrameMatchError::Cancelled)
        })
        .unwrap_err();
        assert_eq!(err, FrameMatchError::Cancelled);
    }

    #[test]
    fn negative_timeout_is_rejected() {
        let mut src = IterSource::new(frames(1));
        let err = wait_until(&mut src, -1.0, &CancelToken::new(), |_| Ok(Step::<()>::Pending))
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
