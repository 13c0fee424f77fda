//! Fixed-rate render loop.
//!
//! Every tick clears the surface, then draws each registered source in
//! registry order. A source that is not ready, or that fails to draw, is
//! skipped for that tick only; the loop never gives up on it.
//!
//! Each run of the loop owns its own active flag. Stopping clears the flag
//! and the task ends itself on its next tick, so a restart never has to
//! wait for (or race with) a run that is winding down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use framemix_common::clock::OutputClock;
use framemix_common::error::{FramemixError, FramemixResult};
use framemix_media_model::source::{SourceRecord, SourceType};

use crate::registry::SourceRegistry;
use crate::surface::RenderSurface;

/// Counters accumulated across ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RenderStats {
    /// Ticks that drew sources.
    pub ticks: u64,

    /// Successful per-source draws.
    pub sources_drawn: u64,

    /// Sources skipped because they had no frame to offer.
    pub sources_skipped: u64,

    /// Per-source draw failures.
    pub draw_errors: u64,
}

impl RenderStats {
    /// Draw failures as a percentage of attempted draws.
    pub fn error_rate(&self) -> f64 {
        let total = self.sources_drawn + self.draw_errors;
        if total == 0 {
            return 0.0;
        }
        self.draw_errors as f64 / total as f64 * 100.0
    }
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    /// The run was stopped; the driving task should end.
    Stopped,
}

/// Why a source was or was not drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrawOutcome {
    Drawn,
    NoSource,
    NotReady,
    NoFrame,
}

/// State shared between the compositor and the render task.
///
/// Lock order is surface, then registry. The registry lock is only held to
/// mutate or snapshot, never across a draw.
pub(crate) struct RenderTarget {
    pub(crate) registry: Mutex<SourceRegistry>,
    pub(crate) surface: Mutex<Box<dyn RenderSurface>>,
    stats: Mutex<RenderStats>,
    clock: OutputClock,
    debug: bool,
}

impl RenderTarget {
    pub(crate) fn new(registry: SourceRegistry, surface: Box<dyn RenderSurface>, debug: bool) -> Self {
        Self {
            registry: Mutex::new(registry),
            surface: Mutex::new(surface),
            stats: Mutex::new(RenderStats::default()),
            clock: OutputClock::start(),
            debug,
        }
    }

    pub(crate) fn stats(&self) -> RenderStats {
        *self.stats.lock()
    }

    /// Run one tick of the loop.
    pub(crate) fn tick(&self, active: &AtomicBool) -> TickOutcome {
        let mut surface = self.surface.lock();

        // A stopped run only blanks an idle output; with sources present a
        // newer run owns the surface.
        if !active.load(Ordering::Acquire) {
            if self.registry.lock().is_empty() {
                surface.clear();
                surface.present(self.clock.elapsed_ns());
            }
            return TickOutcome::Stopped;
        }

        surface.clear();

        let records = self.registry.lock().list();
        let mut tally = RenderStats {
            ticks: 1,
            ..RenderStats::default()
        };

        for record in records
            .iter()
            .filter(|record| record.source_type() == SourceType::Visual)
        {
            match draw_source(&mut **surface, record) {
                Ok(DrawOutcome::Drawn) => tally.sources_drawn += 1,
                Ok(reason) => {
                    tally.sources_skipped += 1;
                    if self.debug {
                        tracing::debug!(source_id = record.id(), ?reason, "Source skipped");
                    }
                }
                Err(e) => {
                    tally.draw_errors += 1;
                    tracing::warn!(source_id = record.id(), error = %e, "Failed to draw source");
                }
            }
        }

        surface.present(self.clock.elapsed_ns());
        drop(surface);

        if self.debug {
            tracing::debug!(
                drawn = tally.sources_drawn,
                skipped = tally.sources_skipped,
                errors = tally.draw_errors,
                "Tick rendered"
            );
        }

        let mut stats = self.stats.lock();
        stats.ticks += tally.ticks;
        stats.sources_drawn += tally.sources_drawn;
        stats.sources_skipped += tally.sources_skipped;
        stats.draw_errors += tally.draw_errors;

        TickOutcome::Rendered
    }

    /// Clear and publish the surface unconditionally.
    pub(crate) fn clear_surface(&self) {
        let mut surface = self.surface.lock();
        surface.clear();
        surface.present(self.clock.elapsed_ns());
    }

    /// Clear the surface only if no visual source has been added since.
    pub(crate) fn clear_if_idle(&self) {
        let mut surface = self.surface.lock();
        if self.registry.lock().is_empty() {
            surface.clear();
            surface.present(self.clock.elapsed_ns());
        }
    }
}

/// Draw one source. The vertex buffer lives only for this call.
fn draw_source(surface: &mut dyn RenderSurface, record: &SourceRecord) -> FramemixResult<DrawOutcome> {
    let Some(source) = record.source() else {
        return Ok(DrawOutcome::NoSource);
    };
    if !source.is_ready() {
        return Ok(DrawOutcome::NotReady);
    }
    let Some(frame) = source.current_frame() else {
        return Ok(DrawOutcome::NoFrame);
    };

    let buffer = surface
        .create_vertex_buffer(record.vertices())
        .map_err(|e| FramemixError::draw(record.id(), e.to_string()))?;
    let drawn = surface
        .upload_texture(&frame)
        .and_then(|()| surface.draw_strip(buffer));
    surface.delete_buffer(buffer);

    drawn
        .map(|()| DrawOutcome::Drawn)
        .map_err(|e| FramemixError::draw(record.id(), e.to_string()))
}

struct LoopRun {
    active: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Handle to the periodic task driving [`RenderTarget::tick`].
#[derive(Default)]
pub struct RenderLoop {
    run: Option<LoopRun>,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run is active and its task is still alive.
    pub fn is_running(&self) -> bool {
        self.run
            .as_ref()
            .is_some_and(|run| run.active.load(Ordering::Acquire) && !run.handle.is_finished())
    }

    /// Spawn a new run ticking every `period`, unless one is running.
    pub(crate) fn start(&mut self, runtime: &Handle, target: Arc<RenderTarget>, period: Duration) {
        if self.is_running() {
            return;
        }
        self.stop();

        let active = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&active);
        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if target.tick(&flag) == TickOutcome::Stopped {
                    break;
                }
            }
            tracing::debug!("Render loop stopped");
        });

        tracing::info!(period_ms = period.as_millis() as u64, "Render loop started");
        self.run = Some(LoopRun { active, handle });
    }

    /// Ask the current run to end on its next tick.
    pub fn stop(&mut self) {
        if let Some(run) = self.run.take() {
            run.active.store(false, Ordering::Release);
        }
    }

    /// End the current run immediately.
    pub fn abort(&mut self) {
        if let Some(run) = self.run.take() {
            run.active.store(false, Ordering::Release);
            run.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::software::SoftwareSurface;
    use framemix_media_model::geometry::{Rect, Size};
    use framemix_media_model::media::{MediaTrack, ReadyState, VideoFrame};
    use framemix_media_model::source::{
        ImageElement, MediaSource, SourceDescriptor, SourceKind, VideoElement,
    };

    const CANVAS: Size = Size::new(4, 4);

    fn target() -> (RenderTarget, MediaTrack) {
        let mut surface = SoftwareSurface::initialized(CANVAS);
        let output = surface.capture_stream(40).unwrap();
        let target = RenderTarget::new(SourceRegistry::new(CANVAS), Box::new(surface), true);
        (target, output)
    }

    fn add(target: &RenderTarget, id: &str, index: i64, rect: Rect, source: MediaSource) {
        let descriptor = SourceDescriptor::visual(SourceKind::FileImage, source)
            .with_position(rect)
            .with_index(index);
        target
            .registry
            .lock()
            .add(SourceRecord::new(id.into(), index, descriptor, CANVAS));
    }

    fn image(rgb: [u8; 3]) -> MediaSource {
        MediaSource::FileImage(ImageElement::new(VideoFrame::solid_rgb(2, 2, rgb)))
    }

    fn output_pixel(output: &MediaTrack, x: u32, y: u32) -> [u8; 4] {
        output.latest_frame().unwrap().pixel(x, y).unwrap()
    }

    #[test]
    fn later_indices_draw_on_top() {
        let (target, output) = target();
        add(&target, "red", 0, Rect::full(CANVAS), image([255, 0, 0]));
        add(&target, "blue", 1, Rect::new(0, 0, 2, 2), image([0, 0, 255]));

        let active = AtomicBool::new(true);
        assert_eq!(target.tick(&active), TickOutcome::Rendered);
        assert_eq!(output_pixel(&output, 0, 0), [0, 0, 255, 255]);
        assert_eq!(output_pixel(&output, 3, 3), [255, 0, 0, 255]);

        target.registry.lock().update_index("blue", -1);
        target.tick(&active);
        assert_eq!(output_pixel(&output, 0, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn draw_errors_skip_only_the_failing_source() {
        let (target, output) = target();
        // An empty frame is rejected by the texture upload.
        add(
            &target,
            "broken",
            0,
            Rect::new(0, 0, 2, 2),
            MediaSource::FileImage(ImageElement::new(VideoFrame::solid_rgb(0, 0, [0, 0, 0]))),
        );
        add(&target, "good", 1, Rect::new(2, 2, 2, 2), image([0, 255, 0]));

        let active = AtomicBool::new(true);
        assert_eq!(target.tick(&active), TickOutcome::Rendered);
        assert_eq!(output_pixel(&output, 3, 3), [0, 255, 0, 255]);
        assert_eq!(output_pixel(&output, 0, 0), [0, 0, 0, 0]);

        let stats = target.stats();
        assert_eq!(stats.draw_errors, 1);
        assert_eq!(stats.sources_drawn, 1);
        assert!((stats.error_rate() - 50.0).abs() < 1e-9);
        assert_eq!(target.surface.lock().live_buffers(), 0);
    }

    #[test]
    fn unready_video_is_retried_every_tick() {
        let (target, output) = target();
        let element = VideoElement::default();
        element.frames().push(VideoFrame::solid_rgb(1, 1, [7, 7, 7]));
        add(
            &target,
            "video",
            0,
            Rect::full(CANVAS),
            MediaSource::FileVideo(element.clone()),
        );

        let active = AtomicBool::new(true);
        target.tick(&active);
        target.tick(&active);
        assert_eq!(target.stats().sources_skipped, 2);
        assert_eq!(output_pixel(&output, 1, 1), [0, 0, 0, 0]);

        element.ready_state().set(ReadyState::HaveEnoughData);
        target.tick(&active);
        assert_eq!(output_pixel(&output, 1, 1), [7, 7, 7, 255]);
    }

    #[test]
    fn inactive_run_clears_idle_output_and_stops() {
        let (target, output) = target();
        add(&target, "red", 0, Rect::full(CANVAS), image([255, 0, 0]));
        let active = AtomicBool::new(true);
        target.tick(&active);

        target.registry.lock().remove("red");
        active.store(false, Ordering::Release);
        assert_eq!(target.tick(&active), TickOutcome::Stopped);
        assert_eq!(output_pixel(&output, 0, 0), [0, 0, 0, 0]);
        assert_eq!(target.stats().ticks, 1);
    }

    #[test]
    fn inactive_run_leaves_populated_output_alone() {
        let (target, output) = target();
        add(&target, "red", 0, Rect::full(CANVAS), image([255, 0, 0]));
        target.tick(&AtomicBool::new(true));

        assert_eq!(target.tick(&AtomicBool::new(false)), TickOutcome::Stopped);
        assert_eq!(output_pixel(&output, 0, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn clear_if_idle_respects_new_sources() {
        let (target, output) = target();
        add(&target, "red", 0, Rect::full(CANVAS), image([255, 0, 0]));
        target.tick(&AtomicBool::new(true));

        target.clear_if_idle();
        assert_eq!(output_pixel(&output, 0, 0), [255, 0, 0, 255]);

        target.registry.lock().remove("red");
        target.clear_if_idle();
        assert_eq!(output_pixel(&output, 0, 0), [0, 0, 0, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_ends_itself_after_stop() {
        let (target, output) = target();
        add(&target, "red", 0, Rect::full(CANVAS), image([255, 0, 0]));
        let target = Arc::new(target);

        let mut render_loop = RenderLoop::new();
        render_loop.start(&Handle::current(), Arc::clone(&target), Duration::from_millis(25));
        assert!(render_loop.is_running());

        tokio::time::sleep(Duration::from_millis(110)).await;
        assert!(target.stats().ticks >= 4);
        assert_eq!(output_pixel(&output, 0, 0), [255, 0, 0, 255]);

        target.registry.lock().remove("red");
        render_loop.stop();
        assert!(!render_loop.is_running());
        tokio::time::sleep(Duration::from_millis(50)).await;
        let ticks = target.stats().ticks;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(target.stats().ticks, ticks);
        assert_eq!(output_pixel(&output, 0, 0), [0, 0, 0, 0]);
    }
}
