/*!
Interactive front-end (feature `display`): a winit window presenting the
machine's framebuffer through a pixels surface, one machine frame per
redraw, with keyboard edges forwarded as button events.

Key map: W/A/S/D for the directional pad, O = A, P = B, Space = Select,
Left Shift = Start.
*/

use std::sync::Arc;

use pixels::{Pixels, SurfaceTexture};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::joypad::Button;
use crate::machine::Machine;
use crate::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};

const SCALE: u32 = 4;

/// Run the machine under an interactive window until it is closed.
pub fn run(machine: Machine) -> Result<(), Box<dyn std::error::Error>> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = App {
        machine,
        window: None,
        pixels: None,
    };
    event_loop.run_app(&mut app)?;
    Ok(())
}

struct App {
    machine: Machine,
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let size = LogicalSize::new(
            f64::from(SCREEN_WIDTH as u32 * SCALE),
            f64::from(SCREEN_HEIGHT as u32 * SCALE),
        );
        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title("dotmatrix")
                        .with_inner_size(size),
                )
                .expect("failed to create window"),
        );
        let surface = SurfaceTexture::new(
            SCREEN_WIDTH as u32 * SCALE,
            SCREEN_HEIGHT as u32 * SCALE,
            window.clone(),
        );
        let pixels = Pixels::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, surface)
            .expect("failed to create render surface");
        self.window = Some(window);
        self.pixels = Some(pixels);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(pixels) = self.pixels.as_mut() {
                    let _ = pixels.resize_surface(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.repeat {
                    return;
                }
                if let PhysicalKey::Code(code) = event.physical_key
                    && let Some(button) = map_key(code)
                {
                    self.machine
                        .button_event(button, event.state == ElementState::Pressed);
                }
            }
            WindowEvent::RedrawRequested => {
                self.machine.step_frame();
                if let Some(pixels) = self.pixels.as_mut() {
                    let frame = pixels.frame_mut();
                    for (dst, &src) in frame.chunks_exact_mut(4).zip(self.machine.framebuffer()) {
                        dst[0] = (src >> 16) as u8;
                        dst[1] = (src >> 8) as u8;
                        dst[2] = src as u8;
                        dst[3] = (src >> 24) as u8;
                    }
                    if pixels.render().is_err() {
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn map_key(code: KeyCode) -> Option<Button> {
    match code {
        KeyCode::KeyW => Some(Button::Up),
        KeyCode::KeyS => Some(Button::Down),
        KeyCode::KeyA => Some(Button::Left),
        KeyCode::KeyD => Some(Button::Right),
        KeyCode::KeyO => Some(Button::A),
        KeyCode::KeyP => Some(Button::B),
        KeyCode::Space => Some(Button::Select),
        KeyCode::ShiftLeft => Some(Button::Start),
        _ => None,
    }
}
