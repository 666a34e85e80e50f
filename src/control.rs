//! Remote-control seam used by `press_until_match`.
//!
//! Transports (infrared, network, emulated) live outside this crate; they
//! implement `RemoteControl` and report failures as `RemoteControl` errors.

use std::time::Instant;

use crate::util::FrameMatchResult;

/// Sends key presses to the device under test.
pub trait RemoteControl {
    fn press(&mut self, key: &str) -> FrameMatchResult<()>;
}

impl<R: RemoteControl + ?Sized> RemoteControl for &mut R {
    fn press(&mut self, key: &str) -> FrameMatchResult<()> {
        (**self).press(key)
    }
}

impl<R: RemoteControl + ?Sized> RemoteControl for Box<R> {
    fn press(&mut self, key: &str) -> FrameMatchResult<()> {
        (**self).press(key)
    }
}

/// Ignores every key press.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRemote;

impl RemoteControl for NullRemote {
    fn press(&mut self, _key: &str) -> FrameMatchResult<()> {
        Ok(())
    }
}

/// Records key presses and when they happened.
#[derive(Clone, Debug, Default)]
pub struct RecordingRemote {
    presses: Vec<(String, Instant)>,
}

impl RecordingRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys pressed so far, oldest first.
    pub fn keys(&self) -> Vec<&str> {
        self.presses.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn presses(&self) -> &[(String, Instant)] {
        &self.presses
    }

    pub fn len(&self) -> usize {
        self.presses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presses.is_empty()
    }
}

impl RemoteControl for RecordingRemote {
    fn press(&mut self, key: &str) -> FrameMatchResult<()> {
        self.presses.push((key.to_owned(), Instant::now()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{RecordingRemote, RemoteControl};

    #[test]
    fn records_in_order() {
        let mut remote = RecordingRemote::new();
        remote.press("KEY_UP").unwrap();
        remote.press("KEY_OK").unwrap();
        assert_eq!(remote.keys(), ["KEY_UP", "KEY_OK"]);
        assert!(remote.presses()[0].1 <= remote.presses()[1].1);
    }
}
