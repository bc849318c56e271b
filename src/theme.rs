// src/theme.rs

//! Colour palettes for the two themes.

use fxrack::settings::ThemeChoice;
use egui::{epaint, Color32, Stroke, Visuals};

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub dark_mode: bool,
    pub text: Color32,
    pub dim_text: Color32,
    pub top_bar_background: Color32,
    pub button_bg: Color32,
    pub accent: Color32,
    pub panel_background: Color32,
    pub card_background: Color32,
    pub card_bypassed_background: Color32,
    pub card_stroke: Color32,
    pub waveform_background: Color32,
    pub waveform_fill: Color32,
    pub waveform_played: Color32,
    pub playhead: Color32,
    pub meter_background: Color32,
    pub meter_low: Color32,
    pub meter_mid: Color32,
    pub meter_high: Color32,
    pub toast_info: Color32,
    pub toast_success: Color32,
    pub toast_error: Color32,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            dark_mode: true,
            text: Color32::from_gray(220),
            dim_text: Color32::from_gray(140),
            top_bar_background: Color32::from_gray(35),
            button_bg: Color32::from_gray(55),
            accent: Color32::from_rgb(0, 200, 170),
            panel_background: Color32::from_gray(20),
            card_background: Color32::from_gray(40),
            card_bypassed_background: Color32::from_gray(28),
            card_stroke: Color32::from_gray(70),
            waveform_background: Color32::from_gray(12),
            waveform_fill: Color32::from_gray(110),
            waveform_played: Color32::from_rgb(0, 200, 170),
            playhead: Color32::WHITE,
            meter_background: Color32::from_gray(15),
            meter_low: Color32::from_rgb(60, 180, 75),
            meter_mid: Color32::from_rgb(255, 225, 25),
            meter_high: Color32::from_rgb(230, 25, 75),
            toast_info: Color32::from_rgb(0, 130, 200),
            toast_success: Color32::from_rgb(40, 150, 60),
            toast_error: Color32::from_rgb(180, 40, 40),
        }
    }

    pub fn light() -> Self {
        Self {
            dark_mode: false,
            text: Color32::from_gray(30),
            dim_text: Color32::from_gray(110),
            top_bar_background: Color32::from_gray(225),
            button_bg: Color32::from_gray(205),
            accent: Color32::from_rgb(0, 120, 200),
            panel_background: Color32::from_gray(242),
            card_background: Color32::WHITE,
            card_bypassed_background: Color32::from_gray(220),
            card_stroke: Color32::from_gray(180),
            waveform_background: Color32::from_gray(230),
            waveform_fill: Color32::from_gray(150),
            waveform_played: Color32::from_rgb(0, 120, 200),
            playhead: Color32::BLACK,
            meter_background: Color32::from_gray(210),
            meter_low: Color32::from_rgb(40, 150, 60),
            meter_mid: Color32::from_rgb(220, 170, 0),
            meter_high: Color32::from_rgb(200, 30, 60),
            toast_info: Color32::from_rgb(0, 110, 180),
            toast_success: Color32::from_rgb(30, 130, 50),
            toast_error: Color32::from_rgb(170, 30, 30),
        }
    }

    pub fn for_choice(choice: ThemeChoice) -> Self {
        match choice {
            ThemeChoice::Dark => Self::dark(),
            ThemeChoice::Light => Self::light(),
        }
    }

    /// Meter colour for a level on the 0..=1 meter scale.
    pub fn meter_color(&self, level: f32) -> Color32 {
        if level > 0.9 {
            self.meter_high
        } else if level > 0.7 {
            self.meter_mid
        } else {
            self.meter_low
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl From<&Theme> for Visuals {
    fn from(theme: &Theme) -> Self {
        let mut visuals = if theme.dark_mode {
            Visuals::dark()
        } else {
            Visuals::light()
        };

        visuals.override_text_color = Some(theme.text);
        visuals.panel_fill = theme.panel_background;
        visuals.selection.bg_fill = theme.accent;
        visuals.selection.stroke = Stroke::new(1.0, theme.text);
        visuals.slider_trailing_fill = true;

        visuals.popup_shadow = epaint::Shadow::NONE;
        visuals.window_shadow = epaint::Shadow::NONE;

        visuals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_selects_palette() {
        assert!(Theme::for_choice(ThemeChoice::Dark).dark_mode);
        assert!(!Theme::for_choice(ThemeChoice::Light).dark_mode);
    }

    #[test]
    fn meter_turns_red_near_full_scale() {
        let theme = Theme::dark();
        assert_eq!(theme.meter_color(0.2), theme.meter_low);
        assert_eq!(theme.meter_color(0.8), theme.meter_mid);
        assert_eq!(theme.meter_color(0.95), theme.meter_high);
    }
}
