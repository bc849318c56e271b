// src/app.rs

use crate::theme::Theme;
use crate::ui;
use anyhow::Result;
use fxrack::audio_device;
use fxrack::audio_io::{self, LiveOutput};
use fxrack::catalog::EffectKind;
use fxrack::chain::{ChainState, Move};
use fxrack::decode;
use fxrack::export::{self, ExportJob, ExportStatus};
use fxrack::host::AudioBuffer;
use fxrack::meter::{MasterMeter, MeterReading};
use fxrack::settings::{self, AppSettings, ThemeChoice};
use ringbuf::HeapRb;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

const METER_RING_CAPACITY: usize = 8192;
const TOAST_LIFETIME: Duration = Duration::from_secs(3);
pub const WAVEFORM_COLUMNS: usize = 1024;
const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg", "m4a", "aac"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub created: Instant,
}

/// The loaded file as the UI sees it.
pub struct LoadedFile {
    pub name: String,
    pub buffer: Arc<AudioBuffer>,
    /// Min/max pairs of the first channel, one per waveform column.
    pub peaks: Vec<(f32, f32)>,
}

pub struct FxRackApp {
    pub settings: AppSettings,
    pub theme: Theme,
    pub chain: ChainState,
    pub live: Option<LiveOutput>,
    pub meter: MasterMeter,
    pub meter_reading: MeterReading,
    pub file: Option<LoadedFile>,
    pub export_job: Option<ExportJob>,
    pub toasts: Vec<Toast>,
    pub options_window_open: bool,
    pub output_devices: Vec<String>,
}

impl FxRackApp {
    pub fn new(cc: &eframe::CreationContext) -> Result<Self> {
        let settings = settings::load_settings();
        let chain = ChainState::from_ids(&settings.fx_chain_order);
        let theme = Theme::for_choice(settings.theme);
        cc.egui_ctx.set_visuals((&theme).into());

        let (output, meter) = open_output(settings.output_device.as_deref(), &chain);
        let mut app = Self {
            settings,
            theme,
            chain,
            live: None,
            meter,
            meter_reading: MeterReading::default(),
            file: None,
            export_job: None,
            toasts: Vec::new(),
            options_window_open: false,
            output_devices: Vec::new(),
        };
        app.attach_output(output);
        Ok(app)
    }

    /// Reopens the output stream on the configured device.
    fn restart_audio(&mut self) {
        self.live = None;
        let (output, meter) = open_output(self.settings.output_device.as_deref(), &self.chain);
        self.meter = meter;
        self.meter_reading = MeterReading::default();
        self.attach_output(output);
    }

    /// Without a device the app still loads and exports, it just cannot play.
    fn attach_output(&mut self, output: Result<LiveOutput>) {
        match output {
            Ok(mut live) => {
                if let Some(file) = &self.file {
                    if let Err(e) = live.engine.load(file.buffer.clone()) {
                        tracing::warn!("could not prepare recording for playback: {:#}", e);
                    }
                }
                self.live = Some(live);
            }
            Err(e) => {
                tracing::warn!("Audio output unavailable: {:#}", e);
                self.notify(format!("Audio output unavailable: {}", e), ToastKind::Error);
            }
        }
    }

    pub fn open_options(&mut self) {
        self.output_devices = match audio_device::get_output_devices() {
            Ok(devices) => devices.into_iter().map(|(name, _)| name).collect(),
            Err(e) => {
                tracing::warn!("Failed to list output devices: {:#}", e);
                Vec::new()
            }
        };
        self.options_window_open = true;
    }

    /// Switches output device, persists the choice and restarts the stream.
    pub fn apply_output_device(&mut self, device: Option<String>) {
        self.settings.output_device = device;
        self.persist_settings();
        self.restart_audio();
        if let Some(name) = self.live.as_ref().map(|live| live.device_name.clone()) {
            self.notify(format!("Output: {}", name), ToastKind::Info);
        }
    }

    pub fn notify(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.toasts.push(Toast {
            message: message.into(),
            kind,
            created: Instant::now(),
        });
    }

    fn persist_settings(&mut self) {
        self.settings.fx_chain_order = self.chain.order_ids();
        settings::save_settings(&self.settings);
    }

    pub fn is_playing(&self) -> bool {
        self.live.as_ref().is_some_and(|live| live.engine.is_playing())
    }

    pub fn position(&self) -> f64 {
        self.live.as_ref().map(|live| live.engine.position()).unwrap_or(0.0)
    }

    pub fn progress(&self) -> f32 {
        self.live.as_ref().map(|live| live.engine.progress()).unwrap_or(0.0)
    }

    pub fn duration(&self) -> f64 {
        self.file.as_ref().map(|f| f.buffer.duration()).unwrap_or(0.0)
    }

    pub fn is_exporting(&self) -> bool {
        self.export_job.is_some()
    }

    // --- Actions ---

    pub fn pick_and_load_file(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Audio", AUDIO_EXTENSIONS)
            .pick_file();
        if let Some(path) = picked {
            self.load_file(&path);
        }
    }

    /// Decodes `path` and hands it to the engine. A failure leaves the
    /// previously loaded file in place.
    pub fn load_file(&mut self, path: &Path) {
        let buffer = match decode::decode_file(path) {
            Ok(buffer) => Arc::new(buffer),
            Err(e) => {
                tracing::warn!(path = %path.display(), "decode failed: {}", e);
                self.notify("Failed to load audio file (unsupported format?)", ToastKind::Error);
                return;
            }
        };

        if let Some(live) = &mut self.live {
            if let Err(e) = live.engine.load(buffer.clone()) {
                tracing::warn!("could not prepare recording for playback: {:#}", e);
                self.notify(format!("Failed to prepare playback: {}", e), ToastKind::Error);
                return;
            }
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        tracing::info!(
            file = %name,
            frames = buffer.frames(),
            channels = buffer.channel_count(),
            sample_rate = buffer.sample_rate(),
            "file loaded"
        );
        self.file = Some(LoadedFile {
            name,
            peaks: waveform_peaks(&buffer, WAVEFORM_COLUMNS),
            buffer,
        });
        self.notify("File loaded successfully", ToastKind::Success);
    }

    pub fn toggle_playback(&mut self) {
        if let Some(live) = &mut self.live {
            live.engine.toggle(&self.chain);
        }
    }

    /// Seeks to a fraction of the recording.
    pub fn seek_fraction(&mut self, fraction: f32) {
        let target = fraction.clamp(0.0, 1.0) as f64 * self.duration();
        if let Some(live) = &mut self.live {
            live.engine.seek(target, &self.chain);
        }
    }

    pub fn set_parameter(&mut self, effect: EffectKind, key: &str, value: f32) {
        if let Some(applied) = self.chain.set_parameter(effect, key, value) {
            if let Some(live) = &mut self.live {
                live.engine.set_parameter(effect, key, applied);
            }
        }
    }

    pub fn reset_parameter(&mut self, effect: EffectKind, key: &str) {
        if let Some(applied) = self.chain.reset_parameter(effect, key) {
            if let Some(live) = &mut self.live {
                live.engine.set_parameter(effect, key, applied);
            }
        }
    }

    pub fn set_bypass(&mut self, effect: EffectKind, bypass: bool) {
        if self.chain.is_bypassed(effect) == bypass {
            return;
        }
        self.chain.set_bypass(effect, bypass);
        if let Some(live) = &mut self.live {
            live.engine.rewire(&self.chain);
        }
    }

    pub fn move_effect(&mut self, effect: EffectKind, direction: Move) {
        if !self.chain.move_effect(effect, direction) {
            return;
        }
        if let Some(live) = &mut self.live {
            live.engine.rewire(&self.chain);
        }
        self.persist_settings();
    }

    /// Asks for confirmation, then puts every effect back to its defaults.
    pub fn confirm_and_reset_all(&mut self) {
        let answer = rfd::MessageDialog::new()
            .set_title("Reset effects")
            .set_description("Reset every effect to its default settings?")
            .set_buttons(rfd::MessageButtons::YesNo)
            .show();
        if matches!(answer, rfd::MessageDialogResult::Yes) {
            self.reset_all();
        }
    }

    pub fn reset_all(&mut self) {
        self.chain.reset();
        if let Some(live) = &mut self.live {
            live.engine.apply_all(&self.chain);
            live.engine.rewire(&self.chain);
        }
        self.notify("All effects reset", ToastKind::Info);
    }

    pub fn set_theme(&mut self, choice: ThemeChoice, ctx: &egui::Context) {
        if self.settings.theme == choice {
            return;
        }
        self.settings.theme = choice;
        self.theme = Theme::for_choice(choice);
        ctx.set_visuals((&self.theme).into());
        self.persist_settings();
    }

    pub fn start_export(&mut self) {
        if self.export_job.is_some() {
            return;
        }
        let Some(file) = &self.file else {
            return;
        };
        let dir = export::default_export_dir();
        tracing::info!(dir = %dir.display(), "export started");
        self.export_job = Some(ExportJob::spawn(self.chain.clone(), file.buffer.clone(), dir));
    }

    // --- Per-frame housekeeping ---

    fn poll_export(&mut self) {
        let Some(job) = &mut self.export_job else {
            return;
        };
        match job.poll() {
            ExportStatus::Running => {}
            ExportStatus::Finished(path) => {
                self.export_job = None;
                self.notify(format!("Exported to {}", path.display()), ToastKind::Success);
            }
            ExportStatus::Failed(message) => {
                self.export_job = None;
                self.notify(format!("Export failed: {}", message), ToastKind::Error);
            }
        }
    }

    fn expire_toasts(&mut self) {
        self.toasts.retain(|toast| toast.created.elapsed() < TOAST_LIFETIME);
    }
}

fn open_output(device: Option<&str>, chain: &ChainState) -> (Result<LiveOutput>, MasterMeter) {
    let (meter_producer, meter_consumer) = HeapRb::<f32>::new(METER_RING_CAPACITY).split();
    let output = audio_io::init_and_run_stream(device, chain, meter_producer);
    (output, MasterMeter::new(meter_consumer))
}

impl eframe::App for FxRackApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(live) = &mut self.live {
            live.engine.poll();
        }
        self.meter_reading = self.meter.update();
        self.poll_export();
        self.expire_toasts();

        ui::main_view::draw_main_view(self, ctx);
        ui::toasts::draw_toasts(self, ctx);

        ctx.request_repaint_after(Duration::from_millis(16));
    }
}

/// Min/max envelope of the first channel, `columns` buckets wide.
pub fn waveform_peaks(buffer: &AudioBuffer, columns: usize) -> Vec<(f32, f32)> {
    let Some(data) = buffer.channels().first() else {
        return Vec::new();
    };
    if data.is_empty() || columns == 0 {
        return Vec::new();
    }
    let step = data.len().div_ceil(columns);
    data.chunks(step)
        .map(|chunk| {
            chunk.iter().fold((1.0f32, -1.0f32), |(min, max), s| (min.min(*s), max.max(*s)))
        })
        .collect()
}

/// `m:ss`, as shown next to the transport.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
