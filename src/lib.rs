//! Audio effect-chain engine: a fixed catalog of four effects (EQ,
//! compressor, delay, reverb) wired in a user-defined order, played live
//! through the output device or rendered offline to a 16-bit WAV.

pub mod audio_device;
pub mod audio_engine;
pub mod audio_io;
pub mod catalog;
pub mod chain;
pub mod decode;
pub mod export;
pub mod factory;
pub mod host;
pub mod impulse;
pub mod meter;
pub mod offline;
pub mod router;
pub mod settings;
pub mod wav;
