use std::sync::Arc;
use winit::window::Window as WinitWindow;

use crate::traits::{FrameHandle, FrameScheduler, Viewport};

/// Wrapper around winit Window exposing the drawing surface's size
pub struct Window {
    inner: Arc<WinitWindow>,
}

impl Window {
    pub fn new(window: Arc<WinitWindow>) -> Self {
        Self { inner: window }
    }

    pub fn inner(&self) -> &Arc<WinitWindow> {
        &self.inner
    }

    /// Current viewport in logical pixels
    pub fn viewport(&self) -> Viewport {
        let size = self.inner.inner_size();
        Viewport::from_physical(size.width, size.height, self.inner.scale_factor())
    }

    /// Frame scheduler backed by this window's redraw requests
    pub fn scheduler(&self) -> WindowFrameScheduler {
        WindowFrameScheduler::new(self.inner.clone())
    }
}

/// Schedules frames through `request_redraw`.
///
/// winit cannot withdraw a redraw request, so cancellation forgets the
/// pending handle and the next `RedrawRequested` finds nothing due.
pub struct WindowFrameScheduler {
    window: Arc<WinitWindow>,
    next_handle: u64,
    pending: Option<FrameHandle>,
}

impl WindowFrameScheduler {
    pub fn new(window: Arc<WinitWindow>) -> Self {
        Self {
            window,
            next_handle: 0,
            pending: None,
        }
    }
}

impl FrameScheduler for WindowFrameScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        self.next_handle += 1;
        let handle = FrameHandle(self.next_handle);
        self.pending = Some(handle);
        self.window.request_redraw();
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }

    fn take_due(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }
}
