// src/catalog.rs

//! Static descriptions of every effect the rack knows about.
//! Nothing here changes at runtime; the chain state and the UI read their
//! parameter sets, ranges and defaults from these tables.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The closed set of effects a chain can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EffectKind {
    Equalizer,
    Compressor,
    Delay,
    Reverb,
}

impl EffectKind {
    /// Catalog order, which is also the default chain order.
    pub const ALL: [EffectKind; 4] = [
        EffectKind::Equalizer,
        EffectKind::Compressor,
        EffectKind::Delay,
        EffectKind::Reverb,
    ];

    /// Stable key used for persistence.
    pub fn id(self) -> &'static str {
        match self {
            EffectKind::Equalizer => "eq",
            EffectKind::Compressor => "compressor",
            EffectKind::Delay => "delay",
            EffectKind::Reverb => "reverb",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    pub fn descriptor(self) -> &'static EffectDescriptor {
        match self {
            EffectKind::Equalizer => &CATALOG[0],
            EffectKind::Compressor => &CATALOG[1],
            EffectKind::Delay => &CATALOG[2],
            EffectKind::Reverb => &CATALOG[3],
        }
    }
}

// Serialized as the persistence key so stored chain orders stay readable.
impl Serialize for EffectKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.id())
    }
}

impl<'de> Deserialize<'de> for EffectKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EffectKind::from_id(&s).ok_or_else(|| de::Error::custom(format!("Unknown effect: {}", s)))
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptor().name)
    }
}

/// How a parameter is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlShape {
    VerticalSlider,
    HorizontalSlider,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    pub key: &'static str,
    pub name: &'static str,
    pub shape: ControlShape,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub step: f32,
    pub unit: &'static str,
}

impl ParamDescriptor {
    /// Brings any input into range. Non-finite input becomes the default.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            self.default
        }
    }

    /// Text shown next to a control.
    pub fn format_value(&self, value: f32) -> String {
        match self.unit {
            "%" => format!("{}%", (value * 100.0).round()),
            "dB" => {
                let rounded = value.round();
                let sign = if rounded > 0.0 { "+" } else { "" };
                // Avoid printing "-0dB".
                format!("{}{}dB", sign, rounded + 0.0)
            }
            ":1" => format!("{}:1", (value * 10.0).round() / 10.0),
            unit => {
                let decimals = if self.step < 0.1 { 2 } else { 1 };
                format!("{:.*}{}", decimals, value, unit)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectDescriptor {
    pub kind: EffectKind,
    pub name: &'static str,
    pub icon: &'static str,
    pub params: &'static [ParamDescriptor],
}

impl EffectDescriptor {
    pub fn id(&self) -> &'static str {
        self.kind.id()
    }

    pub fn param(&self, key: &str) -> Option<&'static ParamDescriptor> {
        self.params.iter().find(|p| p.key == key)
    }
}

pub static CATALOG: [EffectDescriptor; 4] = [
    EffectDescriptor {
        kind: EffectKind::Equalizer,
        name: "Parametric EQ",
        icon: "☰",
        params: &[
            ParamDescriptor {
                key: "high_gain",
                name: "High",
                shape: ControlShape::VerticalSlider,
                min: -24.0,
                max: 24.0,
                default: 0.0,
                step: 0.1,
                unit: "dB",
            },
            ParamDescriptor {
                key: "mid_gain",
                name: "Mid",
                shape: ControlShape::VerticalSlider,
                min: -24.0,
                max: 24.0,
                default: 0.0,
                step: 0.1,
                unit: "dB",
            },
            ParamDescriptor {
                key: "low_gain",
                name: "Low",
                shape: ControlShape::VerticalSlider,
                min: -24.0,
                max: 24.0,
                default: 0.0,
                step: 0.1,
                unit: "dB",
            },
        ],
    },
    EffectDescriptor {
        kind: EffectKind::Compressor,
        name: "Compressor",
        icon: "⊟",
        params: &[
            ParamDescriptor {
                key: "threshold",
                name: "Thresh",
                shape: ControlShape::VerticalSlider,
                min: -60.0,
                max: 0.0,
                default: -24.0,
                step: 1.0,
                unit: "dB",
            },
            ParamDescriptor {
                key: "ratio",
                name: "Ratio",
                shape: ControlShape::VerticalSlider,
                min: 1.0,
                max: 20.0,
                default: 4.0,
                step: 0.1,
                unit: ":1",
            },
            ParamDescriptor {
                key: "attack",
                name: "Atk",
                shape: ControlShape::HorizontalSlider,
                min: 0.0,
                max: 1.0,
                default: 0.003,
                step: 0.001,
                unit: "s",
            },
            ParamDescriptor {
                key: "release",
                name: "Rel",
                shape: ControlShape::HorizontalSlider,
                min: 0.01,
                max: 1.0,
                default: 0.25,
                step: 0.001,
                unit: "s",
            },
        ],
    },
    EffectDescriptor {
        kind: EffectKind::Delay,
        name: "Stereo Delay",
        icon: "⏱",
        params: &[
            ParamDescriptor {
                key: "time",
                name: "Time",
                shape: ControlShape::HorizontalSlider,
                min: 0.01,
                max: 1.0,
                default: 0.3,
                step: 0.01,
                unit: "s",
            },
            ParamDescriptor {
                key: "feedback",
                name: "F.Back",
                shape: ControlShape::HorizontalSlider,
                min: 0.0,
                max: 0.9,
                default: 0.4,
                step: 0.01,
                unit: "%",
            },
            ParamDescriptor {
                key: "mix",
                name: "Mix",
                shape: ControlShape::HorizontalSlider,
                min: 0.0,
                max: 1.0,
                default: 0.4,
                step: 0.01,
                unit: "%",
            },
        ],
    },
    EffectDescriptor {
        kind: EffectKind::Reverb,
        name: "Reverb",
        icon: "〰",
        params: &[
            ParamDescriptor {
                key: "decay",
                name: "Decay",
                shape: ControlShape::HorizontalSlider,
                min: 0.5,
                max: 5.0,
                default: 2.0,
                step: 0.1,
                unit: "s",
            },
            ParamDescriptor {
                key: "mix",
                name: "Mix",
                shape: ControlShape::HorizontalSlider,
                min: 0.0,
                max: 1.0,
                default: 0.3,
                step: 0.01,
                unit: "%",
            },
        ],
    },
];

/// Every effect descriptor, in catalog order.
pub fn catalog() -> &'static [EffectDescriptor] {
    &CATALOG
}
