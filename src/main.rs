use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use log::info;
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, KeyEvent, MouseButton as WinitMouseButton,
    MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode as WinitKey, PhysicalKey};
use winit::platform::run_on_demand::EventLoopExtRunOnDemand;
use winit::window::WindowBuilder;

use scene_runtime::{
    build_demo_scene, AssetStore, FrameEncoder, FrameOrchestrator, InputState, KeyCode, NamedKey,
    OfflineAssets, Renderer, StageRecorder,
};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;

    if options.summary_only {
        run_headless(&options)
    } else {
        match run_interactive(&options) {
            Ok(()) => Ok(()),
            Err(err) => {
                if err.downcast_ref::<WindowInitError>().is_some() {
                    eprintln!(
                        "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                    );
                    run_headless(&options)
                } else {
                    Err(err)
                }
            }
        }
    }
}

fn run_headless(options: &CliOptions) -> Result<()> {
    let mut assets = OfflineAssets::new();
    let spinner_texture = options
        .texture
        .as_deref()
        .map(|path| assets.load_texture(Path::new(path)))
        .transpose()?;
    let scene = build_demo_scene(&mut assets, spinner_texture)?;
    println!(
        "Loaded scene with {} nodes ({} lights)",
        scene.node_count(),
        scene.lights.len()
    );

    let input = InputState::new();
    let mut app = FrameOrchestrator::new(scene);
    for _ in 0..options.frames {
        let snapshot = input.snapshot();
        let mut stage = StageRecorder::new();
        app.advance(&snapshot, &mut stage)?;
    }
    println!("Rendered {} frames headless", options.frames);

    for line in app.summary_lines() {
        println!("{line}");
    }
    Ok(())
}

fn run_interactive(options: &CliOptions) -> Result<()> {
    // Window system initialization can panic on machines without a display
    // server; turn that into a typed error so run() can fall back.
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let mut event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;

    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Scene Runtime")
            .with_inner_size(LogicalSize::new(1200.0, 1000.0))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let mut renderer = block_on(Renderer::new(Arc::clone(&window)))?;
    let spinner_texture = options
        .texture
        .as_deref()
        .map(|path| renderer.load_texture(Path::new(path)))
        .transpose()?;
    let scene = build_demo_scene(&mut renderer, spinner_texture)?;
    println!(
        "Loaded scene with {} nodes ({} lights)",
        scene.node_count(),
        scene.lights.len()
    );

    let input = InputState::new();
    let mut app = FrameOrchestrator::new(scene);
    let size = renderer.size();
    app.resize(size.width, size.height);

    let mut fatal: Option<anyhow::Error> = None;
    event_loop.run_on_demand(|event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);
        match event {
            Event::WindowEvent { window_id, event } if window_id == renderer.window_id() => {
                match event {
                    WindowEvent::CloseRequested => elwt.exit(),
                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                        app.resize(new_size.width, new_size.height);
                    }
                    WindowEvent::KeyboardInput { event: key, .. } => {
                        handle_keyboard(&input, &key);
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        handle_mouse_button(&input, state, button);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        input.set_mouse_position(Vec2::new(position.x as f32, position.y as f32));
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        input.add_scroll(scroll_amount(delta));
                    }
                    WindowEvent::Focused(false) => input.clear_keys(),
                    WindowEvent::RedrawRequested => {
                        let snapshot = input.snapshot();
                        let mut frame = FrameEncoder::new();
                        if let Err(err) = app.advance(&snapshot, &mut frame) {
                            fatal = Some(err);
                            elwt.exit();
                            return;
                        }
                        match renderer.submit(&frame) {
                            Ok(()) => {}
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                let size = renderer.window().inner_size();
                                renderer.resize(size);
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                fatal = Some(anyhow!("GPU is out of memory"));
                                elwt.exit();
                            }
                            Err(wgpu::SurfaceError::Timeout) => {
                                info!("surface timeout; retrying next frame");
                            }
                        }
                        if app.should_exit() {
                            elwt.exit();
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => renderer.window().request_redraw(),
            _ => {}
        }
    })?;

    if let Some(err) = fatal {
        return Err(err);
    }
    for line in app.summary_lines() {
        println!("{line}");
    }
    Ok(())
}

fn handle_keyboard(input: &InputState, key: &KeyEvent) {
    let PhysicalKey::Code(code) = key.physical_key else {
        return;
    };
    let Some(keycode) = map_keycode(code) else {
        return;
    };
    match key.state {
        ElementState::Pressed => input.set_key_down(keycode),
        ElementState::Released => input.set_key_up(keycode),
    }
}

fn handle_mouse_button(input: &InputState, state: ElementState, button: WinitMouseButton) {
    let index = match button {
        WinitMouseButton::Left => 0,
        WinitMouseButton::Right => 1,
        WinitMouseButton::Middle => 2,
        WinitMouseButton::Back => 3,
        WinitMouseButton::Forward => 4,
        WinitMouseButton::Other(value) => value.min(u8::MAX as u16) as u8,
    };
    let button = scene_runtime::MouseButton::new(index as u8);
    match state {
        ElementState::Pressed => input.set_mouse_button_down(button),
        ElementState::Released => input.set_mouse_button_up(button),
    }
}

fn scroll_amount(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => position.y as f32 / 40.0,
    }
}

fn map_keycode(code: WinitKey) -> Option<KeyCode> {
    Some(match code {
        WinitKey::Space => KeyCode::Named(NamedKey::Space),
        WinitKey::Enter => KeyCode::Named(NamedKey::Enter),
        WinitKey::Tab => KeyCode::Named(NamedKey::Tab),
        WinitKey::Escape => KeyCode::Named(NamedKey::Escape),
        WinitKey::ShiftLeft => KeyCode::Named(NamedKey::LeftShift),
        WinitKey::ShiftRight => KeyCode::Named(NamedKey::RightShift),
        WinitKey::ControlLeft => KeyCode::Named(NamedKey::LeftCtrl),
        WinitKey::ControlRight => KeyCode::Named(NamedKey::RightCtrl),
        WinitKey::Digit0 => KeyCode::Digit(0),
        WinitKey::Digit1 => KeyCode::Digit(1),
        WinitKey::Digit2 => KeyCode::Digit(2),
        WinitKey::Digit3 => KeyCode::Digit(3),
        WinitKey::Digit4 => KeyCode::Digit(4),
        WinitKey::Digit5 => KeyCode::Digit(5),
        WinitKey::Digit6 => KeyCode::Digit(6),
        WinitKey::Digit7 => KeyCode::Digit(7),
        WinitKey::Digit8 => KeyCode::Digit(8),
        WinitKey::Digit9 => KeyCode::Digit(9),
        WinitKey::KeyA => KeyCode::Character('A'),
        WinitKey::KeyB => KeyCode::Character('B'),
        WinitKey::KeyC => KeyCode::Character('C'),
        WinitKey::KeyD => KeyCode::Character('D'),
        WinitKey::KeyE => KeyCode::Character('E'),
        WinitKey::KeyF => KeyCode::Character('F'),
        WinitKey::KeyG => KeyCode::Character('G'),
        WinitKey::KeyH => KeyCode::Character('H'),
        WinitKey::KeyI => KeyCode::Character('I'),
        WinitKey::KeyJ => KeyCode::Character('J'),
        WinitKey::KeyK => KeyCode::Character('K'),
        WinitKey::KeyL => KeyCode::Character('L'),
        WinitKey::KeyM => KeyCode::Character('M'),
        WinitKey::KeyN => KeyCode::Character('N'),
        WinitKey::KeyO => KeyCode::Character('O'),
        WinitKey::KeyP => KeyCode::Character('P'),
        WinitKey::KeyQ => KeyCode::Character('Q'),
        WinitKey::KeyR => KeyCode::Character('R'),
        WinitKey::KeyS => KeyCode::Character('S'),
        WinitKey::KeyT => KeyCode::Character('T'),
        WinitKey::KeyU => KeyCode::Character('U'),
        WinitKey::KeyV => KeyCode::Character('V'),
        WinitKey::KeyW => KeyCode::Character('W'),
        WinitKey::KeyX => KeyCode::Character('X'),
        WinitKey::KeyY => KeyCode::Character('Y'),
        WinitKey::KeyZ => KeyCode::Character('Z'),
        _ => return None,
    })
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

struct CliOptions {
    summary_only: bool,
    frames: u32,
    texture: Option<String>,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let mut summary_only = false;
        let mut frames = 120;
        let mut texture = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                "--frames" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--frames requires a value"))?;
                    frames = value
                        .parse()
                        .with_context(|| format!("invalid frame count: {value}"))?;
                }
                "--texture" => {
                    texture = Some(
                        args.next()
                            .ok_or_else(|| anyhow!("--texture requires a path"))?,
                    );
                }
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --summary-only, --frames <n> or --texture <path>"
                    ));
                }
            }
        }
        Ok(Self {
            summary_only,
            frames,
            texture,
        })
    }
}
