use macroquad::{prelude::*, text::measure_text};

pub const KEY_FONT_SIZE: u16 = 14;
pub const LABEL_FONT_SIZE: u16 = 20;

pub const AMBER: Color = Color {
    r: 0.98,
    g: 0.66,
    b: 0.12,
    a: 1.0,
};
pub const AMBER_DIM: Color = Color {
    r: 0.78,
    g: 0.52,
    b: 0.08,
    a: 0.4,
};
pub const BACKGROUND: Color = Color {
    r: 0.02,
    g: 0.02,
    b: 0.02,
    a: 1.0,
};

/// Outlined panel with its label sitting just above the top edge.
pub fn draw_section(rect: Rect, label: &str) {
    draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 1.0, AMBER_DIM);
    draw_text_ex(
        label,
        rect.x + 8.0,
        rect.y - 6.0,
        TextParams {
            font_size: 16,
            color: AMBER,
            ..Default::default()
        },
    );
}

/// Piano key; `label` is drawn along the bottom edge when not empty.
pub fn draw_key(rect: Rect, active: bool, sharp: bool, label: &str, font_size: u16) {
    let fill_color = if active {
        Color::new(0.3, 0.2, 0.07, 0.95)
    } else if sharp {
        Color::new(0.08, 0.05, 0.03, 1.0)
    } else {
        Color::new(0.02, 0.02, 0.02, 1.0)
    };
    let radius = (rect.w * 0.15).min(6.0);
    draw_rounded_rect(rect, radius, fill_color);
    draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 1.0, AMBER);
    if !label.is_empty() {
        let bottom = Rect::new(rect.x, rect.y + rect.h - 24.0, rect.w, 24.0);
        draw_centered_text(label, bottom, font_size);
    }
}

pub fn draw_button(rect: Rect, label: &str, hovered: bool) {
    let fill = if hovered {
        Color::new(0.12, 0.08, 0.03, 1.0)
    } else {
        BACKGROUND
    };
    draw_rounded_rect(rect, 6.0, fill);
    draw_rectangle_lines(rect.x, rect.y, rect.w, rect.h, 1.0, AMBER);
    draw_centered_text(label, rect, 16);
}

pub fn draw_rounded_rect(rect: Rect, radius: f32, color: Color) {
    let radius = radius.min(rect.w * 0.5).min(rect.h * 0.5).max(0.0);
    draw_rectangle(
        rect.x + radius,
        rect.y,
        rect.w - 2.0 * radius,
        rect.h,
        color,
    );
    draw_rectangle(
        rect.x,
        rect.y + radius,
        rect.w,
        rect.h - 2.0 * radius,
        color,
    );
    draw_circle(rect.x + radius, rect.y + radius, radius, color);
    draw_circle(rect.x + rect.w - radius, rect.y + radius, radius, color);
    draw_circle(rect.x + radius, rect.y + rect.h - radius, radius, color);
    draw_circle(rect.x + rect.w - radius, rect.y + rect.h - radius, radius, color);
}

/// Centers `text` in `rect` using the measured glyph height.
pub fn draw_centered_text(text: &str, rect: Rect, size: u16) {
    let measure = measure_text(text, None, size, 1.0);
    let x = rect.x + rect.w * 0.5 - measure.width * 0.5;
    let y = rect.y + rect.h * 0.5 + measure.height * 0.5;
    draw_text_ex(
        text,
        x,
        y,
        TextParams {
            font_size: size,
            color: AMBER,
            ..Default::default()
        },
    );
}

pub fn draw_text_line(text: &str, x: f32, y: f32, size: u16) {
    draw_text_ex(
        text,
        x,
        y,
        TextParams {
            font_size: size,
            color: AMBER,
            ..Default::default()
        },
    );
}
