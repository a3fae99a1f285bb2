/// Drawing-surface size in logical pixels plus the device pixel ratio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: u32, height: u32, pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    /// Builds a viewport from a physical size, as reported by the windowing system
    pub fn from_physical(width: u32, height: u32, pixel_ratio: f64) -> Self {
        let ratio = if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 };
        Self {
            width: (width as f64 / ratio).round() as u32,
            height: (height as f64 / ratio).round() as u32,
            pixel_ratio: ratio,
        }
    }

    /// Backing-store size in device pixels, never zero
    pub fn physical_size(&self) -> (u32, u32) {
        let scale = |v: u32| ((v as f64 * self.pixel_ratio).round() as u32).max(1);
        (scale(self.width), scale(self.height))
    }

    pub fn aspect(&self) -> Option<f32> {
        (self.height > 0).then(|| self.width as f32 / self.height as f32)
    }
}
