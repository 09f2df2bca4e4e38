// SPDX-License-Identifier: CEPL-1.0
use std::time::Duration;

/// Present-mode preference while vsync is on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VsyncMode {
    Fifo,
    #[default]
    Mailbox,
}

/// The static mesh drawn every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MeshKind {
    #[default]
    Triangle,
    Quad,
}

/// Everything the top-level assembly passes down to a renderer.
#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Enable the Khronos validation layer and route its messages into tracing.
    pub validation: bool,
    pub vsync: bool,
    pub vsync_mode: VsyncMode,
    pub frames_in_flight: usize,
    /// `None` waits forever on a slot's fence.
    pub fence_timeout: Option<Duration>,
    pub clear_color: [f32; 4],
    pub mesh: MeshKind,
}

pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 2;
pub const MAX_FRAMES_IN_FLIGHT: usize = 4;

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            validation: cfg!(debug_assertions),
            vsync: true,
            vsync_mode: VsyncMode::Mailbox,
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            fence_timeout: None,
            clear_color: [0.02, 0.02, 0.04, 1.0],
            mesh: MeshKind::Triangle,
        }
    }
}

impl RendererConfig {
    /// Slot count clamped into `1..=MAX_FRAMES_IN_FLIGHT`.
    pub fn slot_count(&self) -> usize {
        self.frames_in_flight.clamp(1, MAX_FRAMES_IN_FLIGHT)
    }

    /// Fence timeout in nanoseconds, `u64::MAX` meaning "wait forever".
    pub fn fence_timeout_ns(&self) -> u64 {
        match self.fence_timeout {
            Some(d) => u64::try_from(d.as_nanos()).unwrap_or(u64::MAX),
            None => u64::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_count_is_clamped() {
        let mut cfg = RendererConfig::default();
        assert_eq!(cfg.slot_count(), 2);
        cfg.frames_in_flight = 0;
        assert_eq!(cfg.slot_count(), 1);
        cfg.frames_in_flight = 16;
        assert_eq!(cfg.slot_count(), MAX_FRAMES_IN_FLIGHT);
    }

    #[test]
    fn missing_timeout_waits_forever() {
        let mut cfg = RendererConfig::default();
        assert_eq!(cfg.fence_timeout_ns(), u64::MAX);
        cfg.fence_timeout = Some(Duration::from_millis(5));
        assert_eq!(cfg.fence_timeout_ns(), 5_000_000);
    }
}
