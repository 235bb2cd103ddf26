use std::time::Duration;

use glam::Vec3;
use lumen_renderer::{EXPOSURE_VALUES, RenderToggles, Renderer, next_exposure_index};
use lumen_window::{Flow, HostError, MainWindow, WindowHost};
use winit::keyboard::KeyCode;

use crate::{config::ViewerConfig, scene::Scene};

/// Pixels of drag per radian of orbit.
const DRAG_SCALE: f32 = 100.0;

/// Renderer switches flipped directly by a key, empty for other keys.
pub fn toggles_for_key(key: KeyCode) -> RenderToggles {
    match key {
        KeyCode::KeyA => RenderToggles::MSAA | RenderToggles::FXAA,
        KeyCode::KeyS => RenderToggles::BLINN_PHONG,
        KeyCode::KeyH => RenderToggles::HDR,
        KeyCode::KeyG => RenderToggles::GAMMA,
        KeyCode::KeyB => RenderToggles::BLOOM,
        KeyCode::KeyO => RenderToggles::SSAO,
        KeyCode::KeyP => RenderToggles::PBR,
        KeyCode::KeyZ => RenderToggles::IBL,
        _ => RenderToggles::empty(),
    }
}

/// Orbit delta `(pitch, yaw)` for a drag of `(dx, dy)` pixels.
pub fn orbit_delta(dx: f64, dy: f64) -> Vec3 {
    Vec3::new(-dy as f32 / DRAG_SCALE, -dx as f32 / DRAG_SCALE, 0.0)
}

pub struct Viewer {
    config: ViewerConfig,
    toggles: RenderToggles,
    exposure_index: usize,
    // Both exist once the window does
    renderer: Option<Renderer>,
    scene: Option<Scene>,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            exposure_index: config.exposure_index,
            config,
            toggles: RenderToggles::default(),
            renderer: None,
            scene: None,
        }
    }
}

impl WindowHost for Viewer {
    fn init(&mut self, window: &MainWindow) -> Result<(), HostError> {
        let mut renderer = Renderer::new(window, self.config.renderer_settings())?;
        let scene = Scene::build(&mut renderer, &self.config);

        // Without an environment the IBL textures stay black
        if let Err(err) = renderer.set_environment_map(&self.config.environment_map) {
            log::error!("environment map unavailable: {}", err);
        }

        self.renderer = Some(renderer);
        self.scene = Some(scene);
        Ok(())
    }

    fn key_released(&mut self, key: KeyCode) -> Flow {
        if key == KeyCode::Escape {
            return Flow::Exit;
        }

        let flipped = toggles_for_key(key);
        if !flipped.is_empty() {
            self.toggles.toggle(flipped);
            log::info!("toggles: {:?}", self.toggles);
            return Flow::Continue;
        }

        if key == KeyCode::KeyE {
            self.exposure_index = next_exposure_index(self.exposure_index);
            log::info!("exposure: {}", EXPOSURE_VALUES[self.exposure_index]);
            return Flow::Continue;
        }

        let (Some(renderer), Some(scene)) = (self.renderer.as_mut(), self.scene.as_mut()) else {
            return Flow::Continue;
        };
        match key {
            KeyCode::Digit1 => scene.toggle_lamp(renderer, 0),
            KeyCode::Digit2 => scene.toggle_lamp(renderer, 1),
            KeyCode::Digit3 => scene.toggle_lamp(renderer, 2),
            KeyCode::Digit4 => scene.toggle_lamp(renderer, 3),
            KeyCode::KeyL => scene.toggle_suns(renderer),
            KeyCode::KeyI => scene.cycle_first_lamp_intensity(renderer),
            KeyCode::KeyM => scene.next_pbr_preset(renderer),
            _ => (),
        }
        Flow::Continue
    }

    fn mouse_dragged(&mut self, dx: f64, dy: f64) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.camera_mut().add_rotation(orbit_delta(dx, dy));
        }
    }

    fn resized(&mut self, width: u32, height: u32) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(width, height);
        }
    }

    fn redraw(&mut self, frame_delta: Duration) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.render(&self.toggles, EXPOSURE_VALUES[self.exposure_index]);
            log::trace!("frame {:.2} ms", frame_delta.as_secs_f32() * 1000.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn antialiasing_key_flips_both_modes() {
        let mut toggles = RenderToggles::default();
        toggles.toggle(toggles_for_key(KeyCode::KeyA));
        assert!(!toggles.contains(RenderToggles::MSAA));
        assert!(!toggles.contains(RenderToggles::FXAA));
        assert!(toggles.contains(RenderToggles::BLOOM));
    }

    #[test]
    fn scene_keys_leave_toggles_alone() {
        for key in [KeyCode::Digit1, KeyCode::KeyL, KeyCode::KeyI, KeyCode::KeyE, KeyCode::KeyM] {
            assert!(toggles_for_key(key).is_empty());
        }
    }

    #[test]
    fn dragging_right_yaws_negative() {
        let delta = orbit_delta(100.0, 0.0);
        assert_eq!(delta, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(orbit_delta(0.0, 50.0).x, -0.5);
    }
}
