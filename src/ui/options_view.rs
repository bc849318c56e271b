// src/ui/options_view.rs

use crate::app::FxRackApp;
use egui::{Button, ComboBox, RichText, Window};
use std::sync::atomic::Ordering;

const DEFAULT_DEVICE_LABEL: &str = "System default";

pub fn draw_options_window(app: &mut FxRackApp, ctx: &egui::Context) {
    let mut open = app.options_window_open;
    let mut selected = app.settings.output_device.clone();
    let mut apply_clicked = false;

    Window::new("Options")
        .open(&mut open)
        .resizable(false)
        .default_width(360.0)
        .show(ctx, |ui| {
            ui.heading("Audio Output");
            ui.add_space(6.0);

            let selected_text = selected.clone().unwrap_or_else(|| DEFAULT_DEVICE_LABEL.to_string());
            ComboBox::from_id_salt("output_device")
                .selected_text(selected_text)
                .width(300.0)
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut selected, None, DEFAULT_DEVICE_LABEL);
                    for name in &app.output_devices {
                        ui.selectable_value(&mut selected, Some(name.clone()), name.as_str());
                    }
                });

            ui.add_space(6.0);
            match &app.live {
                Some(live) => {
                    ui.label(format!("Running on {} at {} Hz", live.device_name, live.sample_rate));
                    let xruns = live.xrun_count.load(Ordering::Relaxed);
                    if xruns > 0 {
                        ui.label(RichText::new(format!("Underruns: {}", xruns)).color(app.theme.toast_error));
                    }
                }
                None => {
                    ui.label(RichText::new("No output stream").color(app.theme.toast_error));
                }
            }

            ui.add_space(8.0);
            if ui.add(Button::new("Apply")).clicked() {
                apply_clicked = true;
            }
        });

    if apply_clicked {
        app.apply_output_device(selected);
        open = false;
    }
    app.options_window_open = open;
}
