mod analysis;
mod config;
mod controls;
mod dispatcher;
mod draw;
mod engine;
mod envelope;
mod input;
mod keyboard;
mod reverb;
mod state;
mod theory;
mod visualizer;
mod voice;

use anyhow::{Context, Result};
use macroquad::prelude::*;

use config::SynthConfig;
use controls::{hit_button, layout_buttons, ControlButton, PlaybackControls};
use dispatcher::{InputDispatcher, InputEvent, NOTE_KEYS};
use draw::{
    draw_button, draw_centered_text, draw_section, draw_text_line, BACKGROUND, LABEL_FONT_SIZE,
};
use engine::ToneEngine;
use input::{KeyEvent, KeyEventQueue};
use keyboard::{KeyWidgets, HIGHEST_OCTAVE, LOWEST_OCTAVE};
use state::PlaybackState;
use visualizer::Visualizer;

const SCREEN_WIDTH: f32 = 1280.0;
const SCREEN_HEIGHT: f32 = 720.0;
const MARGIN: f32 = 36.0;
const CONTROL_BAR_HEIGHT: f32 = 34.0;
const KEYBOARD_SHARE: f32 = 0.32;

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();
    if let Err(err) = run().await {
        log::error!("{err:#}");
    }
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Scale Keys".into(),
        fullscreen: false,
        sample_count: 1,
        window_width: SCREEN_WIDTH as i32,
        window_height: SCREEN_HEIGHT as i32,
        window_resizable: true,
        high_dpi: false,
        ..Default::default()
    }
}

async fn run() -> Result<()> {
    let config = match config::config_path(std::env::args().nth(1)) {
        Some(path) => SynthConfig::load(&path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => SynthConfig::default(),
    };
    log::info!(
        "voices {:?}, release {:?}, waveform {:?}",
        config.voice_mode,
        config.release,
        config.waveform
    );

    let mut state = PlaybackState::new();
    let mut controls = PlaybackControls::new(&state);
    let control_updates = state.subscribe();
    let widgets = KeyWidgets::new(LOWEST_OCTAVE, HIGHEST_OCTAVE);
    let mut dispatcher = InputDispatcher::new(&mut state, widgets);

    // Without sound the keyboard and scope are disabled; the controls still work.
    let mut engine = match ToneEngine::start(&config) {
        Ok(engine) => Some(engine),
        Err(err) => {
            log::error!("audio unavailable, keyboard disabled: {err}");
            None
        }
    };

    let mut key_events = KeyEventQueue::new();
    let mut layout = compute_layout(screen_width(), screen_height());
    let mut visualizer = Visualizer::new(layout.scope, config.show_amplitude_circle);
    prevent_quit();

    loop {
        if is_quit_requested() || is_key_pressed(KeyCode::Escape) {
            break;
        }

        layout = compute_layout(screen_width(), screen_height());
        visualizer.resize(layout.scope);
        dispatcher.widgets_mut().layout(layout.keyboard);
        let buttons = layout_buttons(layout.controls);
        let mouse = mouse_position_vec();

        if is_mouse_button_pressed(MouseButton::Left) {
            if let Some(action) = hit_button(&buttons, mouse) {
                controls.apply(action, &mut state);
            }
        }

        for event in key_events.poll() {
            let input = match event {
                KeyEvent::Down { key, repeat } => {
                    if let Some(action) = controls.action_for(key) {
                        controls.apply(action, &mut state);
                        continue;
                    }
                    InputEvent::KeyDown { key, repeat }
                }
                KeyEvent::Up { key } => InputEvent::KeyUp { key },
            };
            if let Some(engine) = engine.as_mut() {
                dispatcher.dispatch(input, engine);
            }
        }

        if let Some(engine) = engine.as_mut() {
            let hovered = dispatcher.widgets().hit_test(mouse);
            let pointer = dispatcher.pointer_events(
                hovered,
                is_mouse_button_pressed(MouseButton::Left),
                is_mouse_button_down(MouseButton::Left),
                is_mouse_button_released(MouseButton::Left),
            );
            for event in pointer {
                dispatcher.dispatch(event, engine);
            }
        }

        if !control_updates.drain().is_empty() {
            controls.render(&state);
        }
        dispatcher.sync();

        clear_background(BACKGROUND);
        draw_controls(&controls, &buttons, &dispatcher, &layout, mouse);
        draw_section(layout.scope, "SCOPE");
        draw_section(layout.keyboard, "KEYBOARD");
        match engine.as_mut() {
            Some(engine) => {
                visualizer.draw(engine.read_waveform());
                dispatcher.widgets().draw();
                draw_text_line(
                    &format!("Voices: {}", engine.held_count()),
                    layout.scope.x + 8.0,
                    layout.scope.y + 22.0,
                    16,
                );
            }
            None => {
                draw_centered_text("AUDIO UNAVAILABLE", layout.scope, LABEL_FONT_SIZE);
                draw_centered_text("KEYBOARD DISABLED", layout.keyboard, LABEL_FONT_SIZE);
            }
        }

        next_frame().await;
    }

    dispatcher.teardown(&mut state);
    state.unsubscribe(control_updates.id);
    if let Some(engine) = engine.as_mut() {
        engine.shutdown().context("stopping audio output")?;
    }
    Ok(())
}

struct ScreenLayout {
    controls: Rect,
    status: Vec2,
    scope: Rect,
    keyboard: Rect,
}

fn compute_layout(width: f32, height: f32) -> ScreenLayout {
    let usable_w = (width - MARGIN * 2.0).max(1.0);
    let controls = Rect::new(MARGIN, MARGIN * 0.5, usable_w, CONTROL_BAR_HEIGHT);
    let status = vec2(MARGIN, controls.y + controls.h + 28.0);
    let keyboard_h = ((height - MARGIN * 2.0) * KEYBOARD_SHARE).max(60.0);
    let keyboard = Rect::new(MARGIN, height - MARGIN - keyboard_h, usable_w, keyboard_h);
    let scope_top = status.y + 40.0;
    let scope_h = (keyboard.y - MARGIN - scope_top).max(40.0);
    let scope = Rect::new(MARGIN, scope_top, usable_w, scope_h);
    ScreenLayout {
        controls,
        status,
        scope,
        keyboard,
    }
}

fn mouse_position_vec() -> Vec2 {
    let (x, y) = mouse_position();
    vec2(x, y)
}

fn draw_controls(
    controls: &PlaybackControls,
    buttons: &[ControlButton],
    dispatcher: &InputDispatcher,
    layout: &ScreenLayout,
    mouse: Vec2,
) {
    for button in buttons {
        let hint = controls
            .binding_for(button.action)
            .map(|key| format!("{} [{key:?}]", button.action.label()))
            .unwrap_or_else(|| button.action.label().to_string());
        draw_button(button.rect, &hint, button.rect.contains(mouse));
    }
    draw_text_line(
        controls.display(),
        layout.status.x,
        layout.status.y,
        LABEL_FONT_SIZE,
    );
    let bindings = NOTE_KEYS
        .iter()
        .zip(dispatcher.notes())
        .map(|(key, pitch)| format!("{key:?}:{pitch}"))
        .collect::<Vec<_>>()
        .join("  ");
    draw_text_line(&bindings, layout.status.x, layout.status.y + 24.0, 16);
}
