//! Per-frame input snapshot.
//!
//! winit delivers input as a stream of events. Demos and cameras want the
//! aggregated state of one frame instead: how far the mouse travelled, whether
//! the left button is held and how much the wheel zoomed.
//! [`InputState`] accumulates the events and is reset by [`InputState::end_frame`].

use cgmath::{Vector2, Zero};
use winit::{
    event::{DeviceEvent, MouseButton, MouseScrollDelta, WindowEvent},
};

/// World units of zoom per scroll line.
pub const SCROLL_LINE_ZOOM: f32 = 0.5;
/// Pixel deltas are divided by this before being applied as zoom.
pub const SCROLL_PIXEL_SCALE: f32 = 100.0;

#[derive(Debug, Clone)]
pub struct InputState {
    pub cursor: Vector2<f32>,
    pub mouse_delta: Vector2<f32>,
    pub left_mouse_down: bool,
    /// Set when the left button went down this frame.
    pub clicked: bool,
    /// Scroll accumulated this frame, positive zooms out.
    pub scroll: f32,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            cursor: Vector2::zero(),
            mouse_delta: Vector2::zero(),
            left_mouse_down: false,
            clicked: false,
            scroll: 0.0,
        }
    }
}

impl InputState {
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vector2::new(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let down = state.is_pressed();
                if down && !self.left_mouse_down {
                    self.clicked = true;
                }
                self.left_mouse_down = down;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.scroll -= match delta {
                    MouseScrollDelta::LineDelta(_, y) => y * SCROLL_LINE_ZOOM,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / SCROLL_PIXEL_SCALE,
                };
            }
            WindowEvent::Focused(false) => {
                self.left_mouse_down = false;
            }
            _ => {}
        }
    }

    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.mouse_delta += Vector2::new(*dx as f32, *dy as f32);
        }
    }

    pub fn end_frame(&mut self) {
        self.mouse_delta = Vector2::zero();
        self.scroll = 0.0;
        self.clicked = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_mouse_motion_until_end_of_frame() {
        let mut input = InputState::default();
        input.handle_device_event(&DeviceEvent::MouseMotion { delta: (3.0, -1.0) });
        input.handle_device_event(&DeviceEvent::MouseMotion { delta: (2.0, 4.0) });
        assert_eq!(input.mouse_delta, Vector2::new(5.0, 3.0));

        input.end_frame();
        assert_eq!(input.mouse_delta, Vector2::zero());
    }
}
