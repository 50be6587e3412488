//! The read, mirror, show, poll loop.
//!
//! The loop has two states. It enters `Running` after the warm-up delay and
//! moves to `Stopped` when a read fails, the quit key is seen, or the stop
//! flag is raised. On every exit path the surface is closed and the session
//! released, each exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, trace, warn};

use crate::config::ViewerConfig;
use crate::traits::{CaptureSession, DisplaySurface, Result, SessionState};

/// Why the viewer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The quit key was pressed.
    QuitKey,
    /// The session could not deliver a frame.
    ReadFailed,
    /// The stop flag was raised (Ctrl+C).
    Interrupted,
}

/// Flag shared with a signal handler to stop the loop from outside.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Create a lowered flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop before its next read.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Running,
    Stopped(StopReason),
}

struct SessionGuard<S: CaptureSession>(S);

impl<S: CaptureSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.0.release();
        debug!("capture session released");
    }
}

struct SurfaceGuard<D: DisplaySurface>(D);

impl<D: DisplaySurface> Drop for SurfaceGuard<D> {
    fn drop(&mut self) {
        self.0.close();
        debug!("display surface closed");
    }
}

/// Run the viewer until it stops.
///
/// Takes ownership of the session and the surface so that teardown happens
/// here regardless of how the loop ends. Display errors are returned after
/// teardown; capture failures end the loop with [`StopReason::ReadFailed`].
pub fn run<S, D>(
    session: S,
    surface: D,
    config: &ViewerConfig,
    stop: &StopFlag,
) -> Result<StopReason>
where
    S: CaptureSession,
    D: DisplaySurface,
{
    // Declared first, dropped last: the window closes before the camera is released.
    let mut session = SessionGuard(session);
    let mut surface = SurfaceGuard(surface);

    if session.0.state() == SessionState::Unopened {
        session.0.open();
    }
    match session.0.state() {
        SessionState::Ready => info!("capture session ready"),
        state => warn!(?state, "capture session not ready, first read will fail"),
    }

    if !config.warmup.is_zero() {
        info!(warmup = ?config.warmup, "waiting for sensor pipeline to settle");
        thread::sleep(config.warmup);
    }

    let mut shown: u64 = 0;
    let reason = loop {
        match step(&mut session.0, &mut surface.0, config, stop)? {
            LoopState::Running => shown += 1,
            LoopState::Stopped(StopReason::QuitKey) => {
                shown += 1;
                break StopReason::QuitKey;
            }
            LoopState::Stopped(reason) => break reason,
        }
    };

    info!(?reason, frames = shown, "viewer stopped");
    Ok(reason)
}

fn step<S, D>(
    session: &mut S,
    surface: &mut D,
    config: &ViewerConfig,
    stop: &StopFlag,
) -> Result<LoopState>
where
    S: CaptureSession,
    D: DisplaySurface,
{
    if stop.is_raised() {
        return Ok(LoopState::Stopped(StopReason::Interrupted));
    }

    let mut frame = match session.read_frame() {
        Ok(frame) => frame,
        Err(err) => {
            warn!(%err, "frame read failed");
            return Ok(LoopState::Stopped(StopReason::ReadFailed));
        }
    };

    frame.mirror();
    surface.show(&frame)?;
    trace!(sequence = frame.metadata.sequence, "frame shown");

    match surface.poll_key(config.key_poll)? {
        Some(key) if key == config.quit_key => Ok(LoopState::Stopped(StopReason::QuitKey)),
        _ => Ok(LoopState::Running),
    }
}
