//! Mock session and surface for testing without hardware.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::traits::{
    CaptureError, CaptureSession, DisplaySurface, Frame, FrameMetadata, Result, SessionState,
    BGR_CHANNELS,
};
use crate::validation::SMPTE_COLOR_BARS;
use crate::viewer::StopFlag;

/// Test pattern types for mock frame generation.
#[derive(Debug, Clone, Copy)]
pub enum TestPattern {
    /// SMPTE color bars pattern.
    ColorBars,
    /// Horizontal gray ramp from dark (left) to light (right).
    Gradient,
    /// Solid color with the given R, G, B values.
    Solid(u8, u8, u8),
}

/// Mock capture session with scripted outcomes.
pub struct MockSession {
    width: u32,
    height: u32,
    pattern: TestPattern,
    successes: Option<u32>,
    open_succeeds: bool,
    state: SessionState,
    frame_count: u32,
    opens: Rc<Cell<u32>>,
    releases: Rc<Cell<u32>>,
    reads: Rc<RefCell<Vec<Instant>>>,
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSession {
    /// Create an unopened 640x480 color-bar session that never runs dry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            width: 640,
            height: 480,
            pattern: TestPattern::ColorBars,
            successes: None,
            open_succeeds: true,
            state: SessionState::Unopened,
            frame_count: 0,
            opens: Rc::new(Cell::new(0)),
            releases: Rc::new(Cell::new(0)),
            reads: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Set the frame size.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the test pattern for frame generation.
    #[must_use]
    pub fn with_pattern(mut self, pattern: TestPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Deliver `count` frames, then report end of stream.
    #[must_use]
    pub fn failing_after(mut self, count: u32) -> Self {
        self.successes = Some(count);
        self
    }

    /// Make `open` end in the `Failed` state.
    #[must_use]
    pub fn failing_open(mut self) -> Self {
        self.open_succeeds = false;
        self
    }

    /// Counter of `release` calls, readable after the session is moved.
    #[must_use]
    pub fn release_counter(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.releases)
    }

    /// Counter of `open` calls, readable after the session is moved.
    #[must_use]
    pub fn open_counter(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.opens)
    }

    /// When each `read_frame` call arrived, including failed ones.
    #[must_use]
    pub fn read_times(&self) -> Rc<RefCell<Vec<Instant>>> {
        Rc::clone(&self.reads)
    }
}

impl CaptureSession for MockSession {
    fn open(&mut self) {
        if self.state != SessionState::Unopened {
            return;
        }
        self.opens.set(self.opens.get() + 1);
        self.state = if self.open_succeeds {
            SessionState::Ready
        } else {
            SessionState::Failed
        };
    }

    fn state(&self) -> SessionState {
        self.state
    }

    fn read_frame(&mut self) -> Result<Frame> {
        self.reads.borrow_mut().push(Instant::now());
        if !self.state.is_ready() {
            return Err(CaptureError::NotReady(self.state));
        }
        if self.successes.is_some_and(|limit| self.frame_count >= limit) {
            return Err(CaptureError::EndOfStream);
        }

        let seq = self.frame_count;
        self.frame_count += 1;

        Frame::new(
            self.width,
            self.height,
            generate_test_frame(self.width, self.height, self.pattern),
            FrameMetadata {
                sequence: seq,
                timestamp: Duration::from_millis(u64::from(seq) * 48), // ~21fps
            },
        )
    }

    fn release(&mut self) {
        self.releases.set(self.releases.get() + 1);
        self.state = SessionState::Released;
    }
}

/// What a [`MockSurface`] observed.
#[derive(Debug, Default)]
pub struct SurfaceLog {
    /// Frames passed to `show`, in order.
    pub shown: Vec<Frame>,
    /// Number of `poll_key` calls.
    pub polls: u32,
    /// Timeout passed to each `poll_key` call.
    pub timeouts: Vec<Duration>,
    /// Number of `close` calls.
    pub closes: u32,
}

/// Mock display surface that records frames and replays scripted keys.
pub struct MockSurface {
    keys: VecDeque<Option<char>>,
    fail_show: bool,
    raise: Option<(u32, StopFlag)>,
    log: Rc<RefCell<SurfaceLog>>,
}

impl Default for MockSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSurface {
    /// Create a surface that never reports a key.
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: VecDeque::new(),
            fail_show: false,
            raise: None,
            log: Rc::new(RefCell::new(SurfaceLog::default())),
        }
    }

    /// Keys returned by successive polls; `None` once exhausted.
    #[must_use]
    pub fn with_keys<I: IntoIterator<Item = Option<char>>>(mut self, keys: I) -> Self {
        self.keys = keys.into_iter().collect();
        self
    }

    /// Make every `show` fail.
    #[must_use]
    pub fn failing_show(mut self) -> Self {
        self.fail_show = true;
        self
    }

    /// Raise `stop` during the given poll (1-based).
    #[must_use]
    pub fn raising_after(mut self, polls: u32, stop: StopFlag) -> Self {
        self.raise = Some((polls, stop));
        self
    }

    /// Shared handle to the observation log.
    #[must_use]
    pub fn log(&self) -> Rc<RefCell<SurfaceLog>> {
        Rc::clone(&self.log)
    }
}

impl DisplaySurface for MockSurface {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        if self.fail_show {
            return Err(CaptureError::Display("mock show failure".to_owned()));
        }
        self.log.borrow_mut().shown.push(frame.clone());
        Ok(())
    }

    fn poll_key(&mut self, timeout: Duration) -> Result<Option<char>> {
        let polls = {
            let mut log = self.log.borrow_mut();
            log.polls += 1;
            log.timeouts.push(timeout);
            log.polls
        };
        if let Some((at, stop)) = &self.raise {
            if *at == polls {
                stop.raise();
            }
        }
        Ok(self.keys.pop_front().flatten())
    }

    fn close(&mut self) {
        self.log.borrow_mut().closes += 1;
    }
}

/// Generate BGR frame data based on pattern.
pub fn generate_test_frame(width: u32, height: u32, pattern: TestPattern) -> Vec<u8> {
    let size = width as usize * height as usize * BGR_CHANNELS;
    let mut data = vec![0u8; size];

    match pattern {
        TestPattern::ColorBars => generate_color_bars(&mut data, width),
        TestPattern::Gradient => generate_gradient(&mut data, width),
        TestPattern::Solid(r, g, b) => fill_pixels(&mut data, |_| (r, g, b)),
    }

    data
}

/// Generate eight vertical color bars.
fn generate_color_bars(data: &mut [u8], width: u32) {
    let bar_width = (width / 8).max(1);
    fill_pixels_by_column(data, width, |x| {
        let bar_idx = (x / bar_width).min(7) as usize;
        SMPTE_COLOR_BARS.get(bar_idx).copied().unwrap_or_default()
    });
}

/// Generate a horizontal gray ramp.
fn generate_gradient(data: &mut [u8], width: u32) {
    fill_pixels_by_column(data, width, |x| {
        #[allow(clippy::cast_possible_truncation)]
        let level = ((u64::from(x) * 255) / u64::from(width.max(1))) as u8;
        (level, level, level)
    });
}

fn fill_pixels_by_column<F: Fn(u32) -> (u8, u8, u8)>(data: &mut [u8], width: u32, color: F) {
    let width = width.max(1);
    fill_pixels(data, |idx| {
        #[allow(clippy::cast_possible_truncation)]
        let x = (idx % width as usize) as u32;
        color(x)
    });
}

fn fill_pixels<F: Fn(usize) -> (u8, u8, u8)>(data: &mut [u8], color: F) {
    for (idx, pixel) in data.chunks_exact_mut(BGR_CHANNELS).enumerate() {
        let (r, g, b) = color(idx);
        pixel.copy_from_slice(&[b, g, r]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_session_lifecycle() {
        let mut session = MockSession::new();
        assert_eq!(session.state(), SessionState::Unopened);
        assert!(matches!(
            session.read_frame(),
            Err(CaptureError::NotReady(SessionState::Unopened))
        ));

        session.open();
        assert_eq!(session.state(), SessionState::Ready);

        session.release();
        assert_eq!(session.state(), SessionState::Released);
        assert!(session.read_frame().is_err());
    }

    #[test]
    fn test_mock_session_capture() {
        let mut session = MockSession::new();
        session.open();

        let frame1 = session.read_frame().expect("read_frame should succeed");
        assert_eq!(frame1.metadata.sequence, 0);
        assert_eq!(frame1.data.len(), 640 * 480 * 3);

        let frame2 = session.read_frame().expect("read_frame should succeed");
        assert_eq!(frame2.metadata.sequence, 1);
    }

    #[test]
    fn test_mock_session_runs_dry() {
        let mut session = MockSession::new().with_size(4, 4).failing_after(2);
        session.open();
        assert!(session.read_frame().is_ok());
        assert!(session.read_frame().is_ok());
        assert!(matches!(session.read_frame(), Err(CaptureError::EndOfStream)));
    }

    #[test]
    fn test_color_bars_pattern() {
        let data = generate_test_frame(640, 480, TestPattern::ColorBars);
        assert_eq!(data.len(), 640 * 480 * 3);

        // First bar is white, last is black (BGR order)
        assert_eq!(data[..3], [235, 235, 235]);
        let last = data.len() - 3;
        assert_eq!(data[last..], [16, 16, 16]);
    }

    #[test]
    fn test_gradient_pattern() {
        let data = generate_test_frame(640, 480, TestPattern::Gradient);

        // Left edge dark, right edge bright
        assert!(data[0] < 10);
        let last_pixel = (479 * 640 + 639) * 3;
        assert!(data[last_pixel] > 200);
    }

    #[test]
    fn test_solid_pattern_is_bgr() {
        let data = generate_test_frame(8, 8, TestPattern::Solid(200, 100, 50));
        assert_eq!(data[..3], [50, 100, 200]);
        assert!(data.chunks_exact(3).all(|px| px == [50, 100, 200]));
    }

    #[test]
    fn test_mock_surface_keys_then_none() {
        let mut surface = MockSurface::new().with_keys([Some('a')]);
        let timeout = Duration::from_millis(10);
        assert_eq!(surface.poll_key(timeout).expect("poll"), Some('a'));
        assert_eq!(surface.poll_key(timeout).expect("poll"), None);
        assert_eq!(surface.log().borrow().polls, 2);
        assert_eq!(surface.log().borrow().timeouts, vec![timeout; 2]);
    }

    #[test]
    fn test_mock_session_records_reads() {
        let mut session = MockSession::new().with_size(4, 4).failing_after(1);
        let reads = session.read_times();
        assert!(session.read_frame().is_err());
        session.open();
        assert!(session.read_frame().is_ok());
        assert!(session.read_frame().is_err());
        assert_eq!(reads.borrow().len(), 3);
    }
}
