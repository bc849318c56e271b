// src/ui/toasts.rs

use crate::app::{FxRackApp, ToastKind};
use egui::{Align2, Area, Color32, Frame, Margin, Order, RichText};

pub fn draw_toasts(app: &FxRackApp, ctx: &egui::Context) {
    if app.toasts.is_empty() {
        return;
    }
    Area::new(egui::Id::new("toasts"))
        .anchor(Align2::RIGHT_BOTTOM, [-12.0, -12.0])
        .order(Order::Foreground)
        .interactable(false)
        .show(ctx, |ui| {
            for toast in &app.toasts {
                let (icon, fill) = match toast.kind {
                    ToastKind::Info => ("ℹ", app.theme.toast_info),
                    ToastKind::Success => ("✔", app.theme.toast_success),
                    ToastKind::Error => ("⚠", app.theme.toast_error),
                };
                Frame::NONE
                    .fill(fill)
                    .corner_radius(4.0)
                    .inner_margin(Margin::symmetric(10, 6))
                    .show(ui, |ui| {
                        ui.label(
                            RichText::new(format!("{} {}", icon, toast.message)).color(Color32::WHITE),
                        );
                    });
                ui.add_space(4.0);
            }
        });
}
