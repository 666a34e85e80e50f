//! Test-script facing operations on a live frame source.
//!
//! A `Harness` bundles the collaborators a test needs: the frame source,
//! the remote control, a cancel token and an optional debug sink. Each wait
//! owns its matcher or motion detector for the duration of the call only.

use std::sync::Arc;

use crate::control::{NullRemote, RemoteControl};
use crate::debug::{DebugSink, Scoped};
use crate::frame::Frame;
use crate::matcher::{MatchResult, Matcher};
use crate::motion::{Mask, MotionDetector, MotionResult, VoteWindow};
use crate::params::{MatchParameters, MotionParameters, PressParameters};
use crate::region::Region;
use crate::template::Template;
use crate::trace::{trace_event, trace_span};
use crate::util::{FrameMatchError, FrameMatchResult, MatchTimeout, MotionTimeout};
use crate::wait::{poll_frames, wait_until, CancelToken, FrameSource, Polled, Step};

/// Frame source, remote control and debug output for one test run.
pub struct Harness<S, R = NullRemote> {
    source: S,
    remote: R,
    cancel: CancelToken,
    debug: Option<Arc<dyn DebugSink>>,
}

impl<S: FrameSource> Harness<S> {
    /// A harness whose key presses go nowhere.
    pub fn new(source: S) -> Self {
        Self {
            source,
            remote: NullRemote,
            cancel: CancelToken::new(),
            debug: None,
        }
    }
}

impl<S: FrameSource, R: RemoteControl> Harness<S, R> {
    pub fn with_remote<R2: RemoteControl>(self, remote: R2) -> Harness<S, R2> {
        Harness {
            source: self.source,
            remote,
            cancel: self.cancel,
            debug: self.debug,
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_debug_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.debug = Some(sink);
        self
    }

    /// A handle that aborts the current and all future waits.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn remote_mut(&mut self) -> &mut R {
        &mut self.remote
    }

    pub fn into_parts(self) -> (S, R) {
        (self.source, self.remote)
    }

    /// Pulls the next frame, waiting at most `timeout_secs`.
    pub fn get_frame(&mut self, timeout_secs: f64) -> FrameMatchResult<Frame> {
        wait_until(&mut self.source, timeout_secs, &self.cancel, |frame| {
            Ok(Step::Done(frame.clone()))
        })
    }

    /// Matches `template` against a single frame, without polling.
    pub fn match_frame(
        &self,
        template: &Template,
        frame: &Frame,
        params: &MatchParameters,
    ) -> FrameMatchResult<MatchResult> {
        Matcher::new(template, params.clone())?.match_frame_with(
            frame,
            &Region::ALL,
            self.debug.as_deref(),
        )
    }

    /// Every confirmed occurrence of `template` inside `region` of `frame`.
    pub fn match_all(
        &self,
        template: &Template,
        frame: &Frame,
        params: &MatchParameters,
        region: &Region,
    ) -> FrameMatchResult<Vec<MatchResult>> {
        Matcher::new(template, params.clone())?.match_all_with(frame, region, self.debug.as_deref())
    }

    /// Waits until `template` is found anywhere in the video.
    pub fn wait_for_match(
        &mut self,
        template: &Template,
        timeout_secs: f64,
        params: &MatchParameters,
    ) -> FrameMatchResult<MatchResult> {
        self.wait_for_match_in(template, timeout_secs, params, &Region::ALL, 1)
    }

    /// Waits until `template` is found inside `region` at the same position
    /// in `consecutive_matches` consecutive frames.
    pub fn wait_for_match_in(
        &mut self,
        template: &Template,
        timeout_secs: f64,
        params: &MatchParameters,
        region: &Region,
        consecutive_matches: usize,
    ) -> FrameMatchResult<MatchResult> {
        let matcher = Matcher::new(template, params.clone())?;
        let _span = trace_span!(
            "wait_for_match",
            template = template.name(),
            timeout_secs = timeout_secs
        )
        .entered();
        self.poll_matcher(&matcher, timeout_secs, region, consecutive_matches)
    }

    fn poll_matcher(
        &mut self,
        matcher: &Matcher,
        timeout_secs: f64,
        region: &Region,
        consecutive_matches: usize,
    ) -> FrameMatchResult<MatchResult> {
        if consecutive_matches == 0 {
            return Err(FrameMatchError::invalid_parameter(
                "consecutive_matches",
                "must be at least 1",
            ));
        }
        let sink = self.debug.as_deref();
        let mut streak: Option<(Region, usize)> = None;
        let mut evaluated = 0usize;
        let polled = poll_frames(&mut self.source, timeout_secs, &self.cancel, |frame| {
            let scoped = sink.map(|s| Scoped::new(s, format!("frame{evaluated:05}")));
            evaluated += 1;
            let result = matcher.match_frame_with(
                frame,
                region,
                scoped.as_ref().map(|s| s as &dyn DebugSink),
            )?;
            if !result.matched {
                streak = None;
                return Ok(Step::Pending);
            }
            let count = match streak {
                Some((at, n)) if at == result.region => n + 1,
                _ => 1,
            };
            streak = Some((result.region, count));
            trace_event!("match_streak", count = count, certainty = result.first_pass_certainty);
            Ok(Step::from((count >= consecutive_matches).then_some(result)))
        })?;
        match polled {
            Polled::Done(result) => Ok(result),
            Polled::Expired { last } => Err(MatchTimeout {
                screenshot: last,
                expected: matcher.template().name().to_owned(),
                region: *region,
                timeout_secs,
            }
            .into()),
        }
    }

    /// Waits until motion is seen in `consecutive_frames` of the video.
    pub fn wait_for_motion(
        &mut self,
        mask: Option<&Mask>,
        timeout_secs: f64,
        params: &MotionParameters,
    ) -> FrameMatchResult<MotionResult> {
        self.wait_for_motion_in(mask, timeout_secs, params, &Region::ALL)
    }

    /// As [`Harness::wait_for_motion`], analysing only `region`.
    ///
    /// Returns the earliest positive result in the voting window, i.e. the
    /// frame where the motion started.
    pub fn wait_for_motion_in(
        &mut self,
        mask: Option<&Mask>,
        timeout_secs: f64,
        params: &MotionParameters,
        region: &Region,
    ) -> FrameMatchResult<MotionResult> {
        let mut detector = MotionDetector::from_params(params, mask.cloned(), *region)?;
        let mut votes = VoteWindow::new(params.consecutive_frames)?;
        let _span = trace_span!("wait_for_motion", timeout_secs = timeout_secs).entered();

        let sink = self.debug.as_deref();
        let mut evaluated = 0usize;
        let polled = poll_frames(&mut self.source, timeout_secs, &self.cancel, |frame| {
            let scoped = sink.map(|s| Scoped::new(s, format!("frame{evaluated:05}")));
            evaluated += 1;
            let Some(result) = detector.feed(frame, scoped.as_ref().map(|s| s as &dyn DebugSink))?
            else {
                return Ok(Step::Pending);
            };
            let voted = votes.push(result.motion.then_some(result));
            Ok(Step::from(voted))
        })?;
        match polled {
            Polled::Done(result) => Ok(result),
            Polled::Expired { last } => Err(MotionTimeout {
                screenshot: last,
                mask: mask.map(|m| m.name().to_owned()),
                region: *region,
                timeout_secs,
            }
            .into()),
        }
    }

    /// Evaluates `predicate` on each frame until it is done.
    pub fn wait_until<T, F>(&mut self, timeout_secs: f64, predicate: F) -> FrameMatchResult<T>
    where
        F: FnMut(&Frame) -> FrameMatchResult<Step<T>>,
    {
        wait_until(&mut self.source, timeout_secs, &self.cancel, predicate)
    }

    /// Presses `key` until `template` appears.
    ///
    /// Looks for the match for `interval_secs` before the first press and
    /// after each press; gives up with the last `MatchTimeout` once
    /// `max_presses` presses did not help.
    pub fn press_until_match(
        &mut self,
        key: &str,
        template: &Template,
        params: &MatchParameters,
        press: &PressParameters,
    ) -> FrameMatchResult<MatchResult> {
        press.validate()?;
        let matcher = Matcher::new(template, params.clone())?;
        let _span = trace_span!(
            "press_until_match",
            key = key,
            template = template.name(),
            max_presses = press.max_presses
        )
        .entered();

        let mut presses = 0u32;
        loop {
            match self.poll_matcher(&matcher, press.interval_secs, &Region::ALL, 1) {
                Err(FrameMatchError::MatchTimeout(_)) if presses < press.max_presses => {
                    self.remote.press(key)?;
                    presses += 1;
                    trace_event!("press", key = key, presses = presses);
                }
                other => return other,
            }
        }
    }
}
