//! GStreamer capture session for Argus (`nvarguscamerasrc`) pipelines.
//!
//! ```text
//! descriptor ──► gst::parse::launch ──► Pipeline (Playing)
//!                                           │
//!                                    appsink "sink" ──► pull_sample() ──► Frame (BGR)
//! ```
//!
//! Reads block on `pull_sample` with no timeout. The appsink keeps a single
//! buffer and drops stale ones, so frames are never queued behind the viewer.

use std::time::Duration;

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::{VideoFormat, VideoInfo};
use tracing::{debug, info, trace, warn};

use crate::pipeline::{PipelineDescriptor, APPSINK_NAME};
use crate::traits::{CaptureError, CaptureSession, Frame, FrameMetadata, Result, SessionState};

/// Capture session driving a GStreamer pipeline that ends in an appsink.
pub struct ArgusSession {
    descriptor: PipelineDescriptor,
    state: SessionState,
    pipeline: Option<gst::Pipeline>,
    sink: Option<AppSink>,
    sequence: u32,
}

impl ArgusSession {
    /// Create an unopened session for `descriptor`.
    #[must_use]
    pub const fn new(descriptor: PipelineDescriptor) -> Self {
        Self {
            descriptor,
            state: SessionState::Unopened,
            pipeline: None,
            sink: None,
            sequence: 0,
        }
    }

    fn launch(&self) -> Result<(gst::Pipeline, AppSink)> {
        gst::init()
            .map_err(|err| CaptureError::DeviceOpenFailed(format!("GStreamer init: {err}")))?;

        debug!(descriptor = %self.descriptor, "launching capture pipeline");

        let pipeline = gst::parse::launch(self.descriptor.as_str())
            .map_err(|err| CaptureError::DeviceOpenFailed(format!("Parsing pipeline: {err}")))?
            .downcast::<gst::Pipeline>()
            .map_err(|_| CaptureError::DeviceOpenFailed("Expected Pipeline element".to_owned()))?;

        let sink = pipeline
            .by_name(APPSINK_NAME)
            .ok_or_else(|| {
                CaptureError::DeviceOpenFailed(format!("No appsink named '{APPSINK_NAME}'"))
            })?
            .downcast::<AppSink>()
            .map_err(|_| CaptureError::DeviceOpenFailed("Expected AppSink".to_owned()))?;

        sink.set_max_buffers(1);
        sink.set_drop(true);

        if let Err(err) = pipeline.set_state(gst::State::Playing) {
            let detail = pipeline_error(&pipeline).unwrap_or_else(|| err.to_string());
            if let Err(err) = pipeline.set_state(gst::State::Null) {
                warn!(%err, "failed to tear down capture pipeline after start failure");
            }
            return Err(CaptureError::DeviceOpenFailed(format!("Starting pipeline: {detail}")));
        }

        Ok((pipeline, sink))
    }

    fn read_error(&self, sink: &AppSink) -> CaptureError {
        if sink.is_eos() {
            return CaptureError::EndOfStream;
        }
        let detail = self
            .pipeline
            .as_ref()
            .and_then(pipeline_error)
            .unwrap_or_else(|| "pipeline stopped producing samples".to_owned());
        CaptureError::StreamError(detail)
    }
}

impl CaptureSession for ArgusSession {
    fn open(&mut self) {
        if self.state != SessionState::Unopened {
            return;
        }

        self.state = match self.launch() {
            Ok((pipeline, sink)) => {
                info!("capture pipeline playing");
                self.pipeline = Some(pipeline);
                self.sink = Some(sink);
                SessionState::Ready
            }
            Err(err) => {
                warn!(%err, "failed to open capture pipeline");
                SessionState::Failed
            }
        };
    }

    fn state(&self) -> SessionState {
        self.state
    }

    fn read_frame(&mut self) -> Result<Frame> {
        if !self.state.is_ready() {
            return Err(CaptureError::NotReady(self.state));
        }
        let Some(sink) = self.sink.as_ref() else {
            return Err(CaptureError::NotReady(self.state));
        };

        let sample = match sink.pull_sample() {
            Ok(sample) => sample,
            Err(_) => return Err(self.read_error(sink)),
        };

        let metadata = FrameMetadata {
            sequence: self.sequence,
            timestamp: Duration::ZERO,
        };
        let frame = frame_from_sample(&sample, metadata)?;
        self.sequence = self.sequence.wrapping_add(1);

        trace!(sequence = frame.metadata.sequence, "argus frame");
        Ok(frame)
    }

    fn release(&mut self) {
        if self.state == SessionState::Released {
            return;
        }
        self.sink = None;
        if let Some(pipeline) = self.pipeline.take() {
            if let Err(err) = pipeline.set_state(gst::State::Null) {
                warn!(%err, "failed to stop capture pipeline");
            }
        }
        self.state = SessionState::Released;
        debug!("capture pipeline released");
    }
}

impl Drop for ArgusSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Copy a BGR sample into a tightly packed [`Frame`].
fn frame_from_sample(sample: &gst::Sample, mut metadata: FrameMetadata) -> Result<Frame> {
    let caps = sample
        .caps()
        .ok_or_else(|| CaptureError::StreamError("Sample without caps".to_owned()))?;
    let info = VideoInfo::from_caps(caps)
        .map_err(|err| CaptureError::StreamError(format!("Reading caps: {err}")))?;

    if info.format() != VideoFormat::Bgr {
        return Err(CaptureError::FormatNotSupported(format!(
            "{:?} (expected BGR)",
            info.format()
        )));
    }

    let buffer = sample
        .buffer()
        .ok_or_else(|| CaptureError::StreamError("Sample without buffer".to_owned()))?;
    let map = buffer
        .map_readable()
        .map_err(|err| CaptureError::StreamError(format!("Mapping buffer: {err}")))?;

    let stride = info
        .stride()
        .first()
        .and_then(|&stride| usize::try_from(stride).ok())
        .ok_or_else(|| CaptureError::StreamError("Invalid row stride".to_owned()))?;

    if let Some(pts) = buffer.pts() {
        metadata.timestamp = Duration::from_nanos(pts.nseconds());
    }

    Frame::from_strided(info.width(), info.height(), stride, map.as_slice(), metadata)
}

/// Pop the first error message off the pipeline bus, if any.
fn pipeline_error(pipeline: &gst::Pipeline) -> Option<String> {
    let bus = pipeline.bus()?;
    let msg = bus.pop_filtered(&[gst::MessageType::Error])?;
    match msg.view() {
        gst::MessageView::Error(err) => Some(format!(
            "{} ({})",
            err.error(),
            err.debug().map(|debug| debug.to_string()).unwrap_or_default()
        )),
        _ => None,
    }
}
