use egui::{Color32, FontFamily, FontId, Rounding, Stroke, TextStyle, Visuals};

pub const BG_PANEL: Color32 = Color32::from_rgb(28, 30, 34);
pub const BG_WIDGET: Color32 = Color32::from_rgb(40, 43, 49);
pub const BG_WIDGET_HOVER: Color32 = Color32::from_rgb(52, 56, 64);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(200, 202, 206);
pub const TEXT_MUTED: Color32 = Color32::from_rgb(128, 132, 140);

pub const ACCENT_GREEN: Color32 = Color32::from_rgb(92, 178, 92);
pub const ACCENT_ORANGE: Color32 = Color32::from_rgb(214, 150, 62);
pub const ACCENT_BLUE: Color32 = Color32::from_rgb(96, 148, 214);
pub const ACCENT_PURPLE: Color32 = Color32::from_rgb(150, 110, 210);

pub const BORDER_SUBTLE: Color32 = Color32::from_rgb(60, 64, 72);

pub fn apply_theme(ctx: &egui::Context) {
    let mut visuals = Visuals::dark();
    visuals.override_text_color = Some(TEXT_PRIMARY);
    visuals.panel_fill = BG_PANEL;
    visuals.window_fill = BG_PANEL;
    visuals.window_rounding = Rounding::same(6.0);
    visuals.selection.bg_fill = ACCENT_BLUE.gamma_multiply(0.5);
    visuals.selection.stroke = Stroke::new(1.0, ACCENT_BLUE);

    for widget in [
        &mut visuals.widgets.inactive,
        &mut visuals.widgets.hovered,
        &mut visuals.widgets.active,
        &mut visuals.widgets.open,
    ] {
        widget.rounding = Rounding::same(4.0);
        widget.bg_stroke = Stroke::new(1.0, BORDER_SUBTLE);
    }
    visuals.widgets.inactive.bg_fill = BG_WIDGET;
    visuals.widgets.inactive.weak_bg_fill = BG_WIDGET;
    visuals.widgets.hovered.bg_fill = BG_WIDGET_HOVER;
    visuals.widgets.hovered.weak_bg_fill = BG_WIDGET_HOVER;
    visuals.widgets.active.bg_stroke = Stroke::new(1.5, ACCENT_BLUE);

    let mut style = (*ctx.style()).clone();
    style.visuals = visuals;
    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.button_padding = egui::vec2(8.0, 4.0);
    style.text_styles = [
        (TextStyle::Small, FontId::new(11.0, FontFamily::Proportional)),
        (TextStyle::Body, FontId::new(14.0, FontFamily::Proportional)),
        (TextStyle::Button, FontId::new(14.0, FontFamily::Proportional)),
        (TextStyle::Heading, FontId::new(18.0, FontFamily::Proportional)),
        (TextStyle::Monospace, FontId::new(13.0, FontFamily::Monospace)),
    ]
    .into();

    ctx.set_style(style);
}
