// src/ui/main_view.rs

use crate::app::{format_time, FxRackApp};
use crate::ui::{fx_chain_view, options_view};
use egui::{
    vec2, Button, CentralPanel, ComboBox, Frame, Margin, Pos2, RichText, ScrollArea, Sense, Stroke,
    TopBottomPanel, Ui,
};
use fxrack::meter::db_to_fraction;
use fxrack::settings::ThemeChoice;

const WAVEFORM_HEIGHT: f32 = 120.0;
const METER_HEIGHT: f32 = 14.0;

pub fn draw_main_view(app: &mut FxRackApp, ctx: &egui::Context) {
    if app.options_window_open {
        options_view::draw_options_window(app, ctx);
    }

    TopBottomPanel::top("top_bar")
        .frame(Frame::NONE.fill(app.theme.top_bar_background).inner_margin(Margin::same(6)))
        .show(ctx, |ui| {
            ui.horizontal(|ui| draw_top_bar(app, ui, ctx));
        });

    CentralPanel::default().show(ctx, |ui| {
        draw_waveform(app, ui);
        ui.add_space(6.0);
        draw_meter(app, ui);
        ui.add_space(10.0);
        ScrollArea::horizontal()
            .id_salt("fx_chain_scroll")
            .show(ui, |ui| fx_chain_view::draw_fx_chain(app, ui));
    });
}

fn draw_top_bar(app: &mut FxRackApp, ui: &mut Ui, ctx: &egui::Context) {
    let button_bg = app.theme.button_bg;

    if ui.add(Button::new("Load").fill(button_bg)).clicked() {
        app.pick_and_load_file();
    }
    let file_label = app
        .file
        .as_ref()
        .map(|f| f.name.clone())
        .unwrap_or_else(|| "No file loaded".to_string());
    ui.label(RichText::new(file_label).color(app.theme.dim_text));

    ui.separator();

    let can_play = app.file.is_some() && app.live.is_some();
    let play_text = if app.is_playing() { "Pause" } else { "Play" };
    if ui
        .add_enabled(can_play, Button::new(play_text).fill(button_bg))
        .clicked()
    {
        app.toggle_playback();
    }
    let time = format!("{} / {}", format_time(app.position()), format_time(app.duration()));
    ui.label(RichText::new(time).monospace());

    ui.separator();

    let export_text = if app.is_exporting() { "Rendering..." } else { "Export WAV" };
    let can_export = app.file.is_some() && !app.is_exporting();
    if ui
        .add_enabled(can_export, Button::new(export_text).fill(button_bg))
        .clicked()
    {
        app.start_export();
    }
    if app.is_exporting() {
        ui.spinner();
    }

    if ui.add(Button::new("Reset FX").fill(button_bg)).clicked() {
        app.confirm_and_reset_all();
    }

    ui.separator();

    let mut choice = app.settings.theme;
    ComboBox::from_id_salt("theme_selector")
        .selected_text(theme_label(choice))
        .show_ui(ui, |ui| {
            ui.selectable_value(&mut choice, ThemeChoice::Dark, theme_label(ThemeChoice::Dark));
            ui.selectable_value(&mut choice, ThemeChoice::Light, theme_label(ThemeChoice::Light));
        });
    if choice != app.settings.theme {
        app.set_theme(choice, ctx);
    }

    if ui.add(Button::new("Options").fill(button_bg)).clicked() {
        app.open_options();
    }
}

fn theme_label(choice: ThemeChoice) -> &'static str {
    match choice {
        ThemeChoice::Dark => "Dark",
        ThemeChoice::Light => "Light",
    }
}

/// Waveform with playhead. Clicking seeks.
fn draw_waveform(app: &mut FxRackApp, ui: &mut Ui) {
    let size = vec2(ui.available_width(), WAVEFORM_HEIGHT);
    let (rect, response) = ui.allocate_exact_size(size, Sense::click());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 4.0, app.theme.waveform_background);

    let Some(file) = &app.file else {
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "Load an audio file to begin",
            egui::FontId::proportional(14.0),
            app.theme.dim_text,
        );
        return;
    };

    let progress = app.progress();
    let columns = file.peaks.len().max(1) as f32;
    let half_height = rect.height() * 0.5;
    let center_y = rect.center().y;
    for (i, (min, max)) in file.peaks.iter().enumerate() {
        let fraction = i as f32 / columns;
        let x = rect.left() + fraction * rect.width();
        let color = if fraction < progress {
            app.theme.waveform_played
        } else {
            app.theme.waveform_fill
        };
        painter.line_segment(
            [
                Pos2::new(x, center_y - max * half_height),
                Pos2::new(x, center_y - min * half_height),
            ],
            Stroke::new(1.0, color),
        );
    }

    let playhead_x = rect.left() + progress * rect.width();
    painter.line_segment(
        [Pos2::new(playhead_x, rect.top()), Pos2::new(playhead_x, rect.bottom())],
        Stroke::new(2.0, app.theme.playhead),
    );

    if response.clicked() {
        if let Some(pos) = response.interact_pointer_pos() {
            let fraction = (pos.x - rect.left()) / rect.width();
            app.seek_fraction(fraction);
        }
    }
}

fn draw_meter(app: &mut FxRackApp, ui: &mut Ui) {
    let reading = app.meter_reading;
    ui.horizontal(|ui| {
        ui.label(RichText::new("Master").color(app.theme.dim_text));
        let width = (ui.available_width() - 80.0).max(50.0);
        let (rect, _) = ui.allocate_exact_size(vec2(width, METER_HEIGHT), Sense::hover());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 2.0, app.theme.meter_background);

        let mut level_rect = rect;
        level_rect.set_width(rect.width() * reading.level);
        painter.rect_filled(level_rect, 2.0, app.theme.meter_color(reading.level));

        let peak_x = rect.left() + rect.width() * reading.peak;
        painter.line_segment(
            [Pos2::new(peak_x, rect.top()), Pos2::new(peak_x, rect.bottom())],
            Stroke::new(2.0, app.theme.meter_color(reading.peak)),
        );

        let zero_db_x = rect.left() + rect.width() * db_to_fraction(0.0);
        painter.line_segment(
            [Pos2::new(zero_db_x, rect.top()), Pos2::new(zero_db_x, rect.bottom())],
            Stroke::new(1.0, app.theme.dim_text),
        );

        ui.label(RichText::new(format!("{:.1} dB", reading.db)).monospace());
    });
}
