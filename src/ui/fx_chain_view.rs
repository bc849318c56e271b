// src/ui/fx_chain_view.rs

//! One card per effect, laid out left to right in chain order.

use crate::app::FxRackApp;
use egui::{Button, Checkbox, Frame, Margin, RichText, Slider, Stroke, Ui};
use fxrack::catalog::{ControlShape, EffectKind, ParamDescriptor};
use fxrack::chain::Move;

const CARD_WIDTH: f32 = 210.0;
const VERTICAL_SLIDER_HEIGHT: f32 = 110.0;

pub fn draw_fx_chain(app: &mut FxRackApp, ui: &mut Ui) {
    let order = app.chain.order().to_vec();
    ui.horizontal_top(|ui| {
        for (index, kind) in order.iter().enumerate() {
            draw_effect_card(app, ui, *kind, index, order.len());
            if index + 1 < order.len() {
                ui.label(RichText::new("→").color(app.theme.dim_text));
            }
        }
    });
}

fn draw_effect_card(app: &mut FxRackApp, ui: &mut Ui, kind: EffectKind, index: usize, count: usize) {
    let descriptor = kind.descriptor();
    let bypassed = app.chain.is_bypassed(kind);
    let fill = if bypassed {
        app.theme.card_bypassed_background
    } else {
        app.theme.card_background
    };
    let title_color = if bypassed { app.theme.dim_text } else { app.theme.accent };

    Frame::group(ui.style())
        .fill(fill)
        .stroke(Stroke::new(1.0, app.theme.card_stroke))
        .inner_margin(Margin::same(8))
        .show(ui, |ui| {
            ui.set_width(CARD_WIDTH);
            ui.vertical(|ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new(format!("{} {}", descriptor.icon, descriptor.name))
                            .strong()
                            .color(title_color),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let mut enabled = !bypassed;
                        if ui.add(Checkbox::new(&mut enabled, "")).on_hover_text("Bypass").changed() {
                            app.set_bypass(kind, !enabled);
                        }
                    });
                });

                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(index > 0, Button::new("◀").small())
                        .on_hover_text("Move earlier")
                        .clicked()
                    {
                        app.move_effect(kind, Move::Earlier);
                    }
                    if ui
                        .add_enabled(index + 1 < count, Button::new("▶").small())
                        .on_hover_text("Move later")
                        .clicked()
                    {
                        app.move_effect(kind, Move::Later);
                    }
                });

                ui.separator();

                let (vertical, horizontal): (Vec<&ParamDescriptor>, Vec<&ParamDescriptor>) = descriptor
                    .params
                    .iter()
                    .partition(|p| p.shape == ControlShape::VerticalSlider);

                if !vertical.is_empty() {
                    ui.horizontal(|ui| {
                        for param in vertical {
                            ui.vertical(|ui| draw_param(app, ui, kind, param));
                        }
                    });
                }
                for param in horizontal {
                    draw_param(app, ui, kind, param);
                }
            });
        });
}

/// Slider plus value readout. Double-click puts the default back.
fn draw_param(app: &mut FxRackApp, ui: &mut Ui, kind: EffectKind, param: &ParamDescriptor) {
    let mut value = app.chain.get(kind, param.key).unwrap_or(param.default);
    ui.label(RichText::new(param.name).small().color(app.theme.dim_text));

    let slider = Slider::new(&mut value, param.min..=param.max)
        .step_by(param.step as f64)
        .show_value(false);
    let response = match param.shape {
        ControlShape::VerticalSlider => {
            ui.spacing_mut().slider_width = VERTICAL_SLIDER_HEIGHT;
            ui.add(slider.vertical())
        }
        ControlShape::HorizontalSlider => ui.add(slider),
    }
    .on_hover_text("Double-click to reset");

    if response.double_clicked() {
        app.reset_parameter(kind, param.key);
    } else if response.changed() {
        app.set_parameter(kind, param.key, value);
    }

    let shown = app.chain.get(kind, param.key).unwrap_or(param.default);
    ui.label(RichText::new(param.format_value(shown)).monospace().small());
}
