/// Opaque token for one scheduled frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Host-side frame scheduling, one pending request at a time
pub trait FrameScheduler {
    /// Ask the host to deliver one more frame
    fn request_frame(&mut self) -> FrameHandle;

    /// Withdraw a request; a frame that already fired is unaffected
    fn cancel_frame(&mut self, handle: FrameHandle);

    /// Consume the pending request when the host delivers a frame.
    /// `None` means the frame was cancelled or never requested.
    fn take_due(&mut self) -> Option<FrameHandle>;
}
