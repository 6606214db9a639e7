use egui::{Color32, Context, RichText, ScrollArea, Ui};

use crate::ui::state::{UiState, ViewStats};
use crate::ui::theme::*;
use crate::viewer::params::{ParameterChanged, ParameterRecord, ShadingMode, TessellationLevel};

#[derive(Default)]
pub struct UiActions {
    /// In field order, one per edited control.
    pub changes: Vec<ParameterChanged>,
    pub set_vsync: Option<bool>,
}

pub fn draw_control_panel(
    ctx: &Context,
    params: &ParameterRecord,
    state: &mut UiState,
    stats: &ViewStats,
) -> UiActions {
    let mut actions = UiActions::default();
    let mut edited = *params;

    egui::SidePanel::right("control_panel")
        .min_width(260.0)
        .max_width(360.0)
        .default_width(280.0)
        .frame(egui::Frame::default().fill(BG_PANEL).inner_margin(16.0))
        .show(ctx, |ui| {
            ScrollArea::vertical().show(ui, |ui| {
                ui.heading(RichText::new("Teapot").strong());
                ui.add_space(4.0);
                ui.label(RichText::new("Bezier patch tessellation").color(TEXT_MUTED).size(11.0));
                ui.add_space(16.0);

                section_header(ui, "GEOMETRY");
                tessellation_combo(ui, &mut edited.tessellation);
                ui.add_space(4.0);
                ui.checkbox(&mut edited.lid, "display lid");
                ui.checkbox(&mut edited.body, "display body");
                ui.checkbox(&mut edited.bottom, "display bottom");
                ui.checkbox(&mut edited.fit_lid, "snug lid");
                ui.checkbox(&mut edited.original_basis, "original scale");
                ui.add_space(16.0);

                section_header(ui, "MATERIAL");
                shading_combo(ui, &mut edited.shading);
                ui.add_space(16.0);

                ui.separator();
                ui.add_space(12.0);

                section_header(ui, "DISPLAY");
                ui.horizontal(|ui| {
                    if ui.checkbox(&mut state.vsync_enabled, "VSync").changed() {
                        actions.set_vsync = Some(state.vsync_enabled);
                    }
                    ui.checkbox(&mut state.show_stats, "Stats");
                    ui.checkbox(&mut state.show_help, "Help");
                });
                ui.add_space(12.0);

                if state.show_stats {
                    stats_panel(ui, stats);
                }
            });
        });

    actions.changes = diff_params(params, &edited);
    actions
}

/// One message per field that differs, in declaration order.
pub fn diff_params(before: &ParameterRecord, after: &ParameterRecord) -> Vec<ParameterChanged> {
    let mut changes = Vec::new();
    if before.tessellation != after.tessellation {
        changes.push(ParameterChanged::Tessellation(after.tessellation));
    }
    if before.bottom != after.bottom {
        changes.push(ParameterChanged::Bottom(after.bottom));
    }
    if before.lid != after.lid {
        changes.push(ParameterChanged::Lid(after.lid));
    }
    if before.body != after.body {
        changes.push(ParameterChanged::Body(after.body));
    }
    if before.fit_lid != after.fit_lid {
        changes.push(ParameterChanged::FitLid(after.fit_lid));
    }
    if before.original_basis != after.original_basis {
        changes.push(ParameterChanged::OriginalBasis(after.original_basis));
    }
    if before.shading != after.shading {
        changes.push(ParameterChanged::Shading(after.shading));
    }
    changes
}

fn section_header(ui: &mut Ui, text: &str) {
    ui.label(RichText::new(text).color(TEXT_MUTED).size(11.0).strong());
    ui.add_space(4.0);
}

fn tessellation_combo(ui: &mut Ui, level: &mut TessellationLevel) {
    ui.horizontal(|ui| {
        ui.label("Tessellation Level");
        egui::ComboBox::from_id_salt("tessellation")
            .selected_text(level.to_string())
            .show_ui(ui, |ui| {
                for option in TessellationLevel::all() {
                    ui.selectable_value(level, option, option.to_string());
                }
            });
    });
}

fn shading_combo(ui: &mut Ui, shading: &mut ShadingMode) {
    ui.horizontal(|ui| {
        ui.label("Shading");
        egui::ComboBox::from_id_salt("shading")
            .selected_text(shading.name())
            .show_ui(ui, |ui| {
                for mode in ShadingMode::ALL {
                    ui.selectable_value(shading, mode, mode.name());
                }
            });
    });
}

fn stats_panel(ui: &mut Ui, stats: &ViewStats) {
    section_header(ui, "STATISTICS");
    egui::Frame::default()
        .fill(BG_WIDGET)
        .stroke(egui::Stroke::new(1.0, BORDER_SUBTLE))
        .rounding(6.0)
        .inner_margin(12.0)
        .show(ui, |ui| {
            ui.style_mut().override_font_id = Some(egui::FontId::new(11.0, egui::FontFamily::Monospace));

            let fps_color = if stats.fps >= 60.0 {
                ACCENT_GREEN
            } else if stats.fps >= 30.0 {
                ACCENT_ORANGE
            } else {
                TEXT_PRIMARY
            };

            egui::Grid::new("stats").num_columns(2).spacing([20.0, 4.0]).show(ui, |ui| {
                ui.label(RichText::new("FPS").color(TEXT_MUTED));
                ui.label(RichText::new(format!("{:.0}", stats.fps)).color(fps_color));
                ui.end_row();

                ui.label(RichText::new("Vertices").color(TEXT_MUTED));
                ui.label(RichText::new(fmt_num(stats.vertices)).color(ACCENT_BLUE));
                ui.end_row();

                ui.label(RichText::new("Triangles").color(TEXT_MUTED));
                ui.label(RichText::new(fmt_num(stats.triangles)).color(ACCENT_PURPLE));
                ui.end_row();

                ui.label(RichText::new("Rebuilds").color(TEXT_MUTED));
                ui.label(RichText::new(stats.rebuilds.to_string()).color(TEXT_PRIMARY));
                ui.end_row();
            });
        });
}

pub fn draw_help_overlay(ctx: &Context, distance: f32) {
    egui::Area::new(egui::Id::new("help_overlay"))
        .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(12.0, -12.0))
        .show(ctx, |ui| {
            egui::Frame::default()
                .fill(Color32::from_black_alpha(180))
                .rounding(6.0)
                .inner_margin(10.0)
                .show(ui, |ui| {
                    ui.style_mut().override_font_id = Some(egui::FontId::new(11.0, egui::FontFamily::Monospace));
                    ui.label(RichText::new("LMB+Drag - Orbit | RMB+Drag - Pan | Scroll - Zoom").color(TEXT_MUTED));
                    ui.label(RichText::new(format!("Distance: {:.0}", distance)).color(TEXT_MUTED));
                });
        });
}

fn fmt_num(n: usize) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        format!("{}", n)
    }
}
