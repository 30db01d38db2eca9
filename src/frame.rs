// =============================================================================
// FRAME LOOP - one triangle per frame, with swapchain rebuilds
// =============================================================================
//
// FRAME TIMELINE:
// ┌──────────────────────────────────────────────────────────────────────┐
// │  wait_fence ─> reset_fence ─> acquire ─> record ─> submit ─> present │
// │                                                                      │
// │  (CPU blocks   (only after    (signals   (draw 3   (waits on        │
// │   here)         a successful   image_     verts)    render_          │
// │                 acquire)       available)           finished)        │
// └──────────────────────────────────────────────────────────────────────┘
//
// RENDER STATES:
//   Running ──(resize / out-of-date / suboptimal)──> Rebuilding ──> Running
//   Rebuilding ──(zero drawable size)──> Paused ──(non-zero size)──> Rebuilding
//
// A rebuild drains the device and recreates swapchain, image views and
// framebuffers. Instance, device, render pass and pipeline are kept.

use ash::vk;

use crate::backend::{Driver, DrawPass, FrameSubmit};
use crate::context::GpuContext;
use crate::error::{Error, PresentationState, Result};

/// Where the current frame is in its submission sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStage {
    Idle,
    WaitingOnFence,
    ImageAcquired,
    Submitted,
    Presented,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Running,
    /// Swapchain-dependent resources must be recreated before the next frame
    Rebuilding,
    /// The window has no drawable area; nothing is rendered
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented { image_index: u32 },
    /// The swapchain was rebuilt instead of presenting
    Rebuilt,
    /// Nothing to draw into (minimised window)
    Skipped,
}

impl<D: Driver> GpuContext<D> {
    /// Mark the swapchain stale, e.g. after a window resize
    pub fn request_rebuild(&mut self) {
        if self.state == RenderState::Running {
            log::debug!("Swapchain marked for rebuild");
        }
        self.state = RenderState::Rebuilding;
    }

    /// Render and present one frame, rebuilding the swapchain when needed.
    ///
    /// Recoverable presentation states never surface as errors here.
    pub fn draw_frame(&mut self) -> Result<FrameOutcome> {
        if self.state == RenderState::Paused {
            if is_zero(self.driver.drawable_size()) {
                return Ok(FrameOutcome::Skipped);
            }
            self.state = RenderState::Rebuilding;
        }

        if self.state == RenderState::Rebuilding {
            self.rebuild_swapchain()?;
            if self.state == RenderState::Paused {
                return Ok(FrameOutcome::Skipped);
            }
        }

        match self.render_frame() {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_recoverable() => {
                log::info!("{}, rebuilding", e);
                self.stage = FrameStage::Idle;
                self.state = RenderState::Rebuilding;
                self.rebuild_swapchain()?;
                Ok(FrameOutcome::Rebuilt)
            }
            Err(e) => Err(e),
        }
    }

    /// Steps 1-5 of a frame. Out-of-date surfaces come back as
    /// `TransientPresentation`; a suboptimal one still presents and schedules
    /// a rebuild for the next frame.
    fn render_frame(&mut self) -> Result<FrameOutcome> {
        let sync = self.sync.ok_or(Error::NotInitialized("sync objects"))?;
        let queues = self.queues.ok_or(Error::NotInitialized("queues"))?;
        let command_buffer = self
            .command_buffer
            .ok_or(Error::NotInitialized("command buffer"))?;
        let render_pass = self.render_pass.ok_or(Error::NotInitialized("render pass"))?;
        let pipeline = self.pipeline.ok_or(Error::NotInitialized("pipeline"))?;
        let (swapchain, extent) = match &self.swapchain {
            Some(sc) => (sc.swapchain, sc.extent),
            None => return Err(Error::NotInitialized("swapchain")),
        };

        // ─────────────────────────────────────────────────────────────────────
        // STEP 1: Wait for the previous frame
        // ─────────────────────────────────────────────────────────────────────
        self.stage = FrameStage::WaitingOnFence;
        let timeout = self.settings.fence_timeout;
        let timeout_ns = timeout.map_or(u64::MAX, |t| {
            u64::try_from(t.as_nanos()).unwrap_or(u64::MAX)
        });
        self.driver
            .wait_for_fence(sync.in_flight, timeout_ns)
            .map_err(|result| match (result, timeout) {
                (vk::Result::TIMEOUT, Some(t)) => Error::FenceTimeout(t),
                (result, _) => Error::driver("wait for in-flight fence")(result),
            })?;

        // ─────────────────────────────────────────────────────────────────────
        // STEP 2: Acquire the next swapchain image
        // ─────────────────────────────────────────────────────────────────────
        // The fence stays signalled if this fails, so the next wait returns
        let (image_index, acquire_suboptimal) = self
            .driver
            .acquire_next_image(swapchain, u64::MAX, sync.image_available)
            .map_err(Error::driver("acquire next image"))?;

        self.driver
            .reset_fence(sync.in_flight)
            .map_err(Error::driver("reset in-flight fence"))?;
        self.stage = FrameStage::ImageAcquired;

        let framebuffer = *self
            .framebuffers
            .get(image_index as usize)
            .ok_or(Error::Driver {
                what: "acquire next image",
                result: vk::Result::ERROR_UNKNOWN,
            })?;

        // ─────────────────────────────────────────────────────────────────────
        // STEP 3: Re-record the command buffer
        // ─────────────────────────────────────────────────────────────────────
        let pass = DrawPass {
            render_pass,
            framebuffer,
            pipeline,
            extent,
            clear_color: self.settings.clear_color,
        };
        self.driver
            .record_draw(command_buffer, &pass)
            .map_err(Error::driver("record command buffer"))?;

        // ─────────────────────────────────────────────────────────────────────
        // STEP 4: Submit
        // ─────────────────────────────────────────────────────────────────────
        let submit = FrameSubmit {
            command_buffer,
            wait: sync.image_available,
            signal: sync.render_finished,
            fence: sync.in_flight,
        };
        self.driver
            .submit(queues.graphics, &submit)
            .map_err(Error::driver("queue submit"))?;
        self.stage = FrameStage::Submitted;

        // ─────────────────────────────────────────────────────────────────────
        // STEP 5: Present
        // ─────────────────────────────────────────────────────────────────────
        let present_suboptimal = self
            .driver
            .present(queues.present, swapchain, image_index, sync.render_finished)
            .map_err(Error::driver("queue present"))?;
        self.stage = FrameStage::Presented;

        if acquire_suboptimal || present_suboptimal {
            log::debug!("{}", Error::TransientPresentation(PresentationState::Suboptimal));
            self.state = RenderState::Rebuilding;
        }

        Ok(FrameOutcome::Presented { image_index })
    }

    /// Drain the device and recreate swapchain, image views and framebuffers.
    ///
    /// A zero drawable size pauses rendering and leaves the old resources alone.
    pub fn rebuild_swapchain(&mut self) -> Result<()> {
        if is_zero(self.driver.drawable_size()) {
            log::debug!("Window has no drawable area, pausing");
            self.state = RenderState::Paused;
            return Ok(());
        }

        log::info!("Rebuilding swapchain");
        self.driver
            .wait_idle()
            .map_err(Error::driver("device wait idle"))?;

        self.destroy_swapchain_resources();
        self.create_swapchain()?;
        self.create_framebuffers()?;

        self.state = RenderState::Running;
        self.stage = FrameStage::Idle;
        Ok(())
    }
}

fn is_zero(extent: vk::Extent2D) -> bool {
    extent.width == 0 || extent.height == 0
}
