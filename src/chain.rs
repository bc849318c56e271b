// src/chain.rs

//! The user's effect chain: which effects run, in which order, with which
//! parameter values, and whether each is bypassed.
//!
//! Everything entering through this type is sanitised on the way in. Unknown
//! ids are dropped, duplicates are ignored and parameter values are clamped,
//! so the engines that read a `ChainState` never have to re-check it.

use crate::catalog::{EffectKind, ParamDescriptor};
use std::collections::BTreeMap;

/// Current values for one effect plus its bypass flag. Holds exactly one
/// entry per parameter the effect's descriptor declares.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectSettings {
    values: BTreeMap<&'static str, f32>,
    pub bypass: bool,
}

impl EffectSettings {
    pub fn defaults(kind: EffectKind) -> Self {
        Self {
            values: kind
                .descriptor()
                .params
                .iter()
                .map(|p| (p.key, p.default))
                .collect(),
            bypass: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<f32> {
        self.values.get(key).copied()
    }

    /// `(key, value)` pairs in key order.
    pub fn values(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }
}

/// Direction for the one-step reorder control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Earlier,
    Later,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainState {
    order: Vec<EffectKind>,
    settings: BTreeMap<EffectKind, EffectSettings>,
}

impl Default for ChainState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainState {
    /// The fixed four-effect chain with catalog defaults.
    pub fn new() -> Self {
        Self::with_order(EffectKind::ALL.to_vec())
    }

    /// Builds a chain from persisted ids. Unknown ids and repeats are
    /// dropped; if nothing usable remains the default chain is returned.
    pub fn from_ids<S: AsRef<str>>(ids: &[S]) -> Self {
        let mut order = Vec::new();
        for id in ids {
            match EffectKind::from_id(id.as_ref()) {
                Some(kind) if !order.contains(&kind) => order.push(kind),
                Some(_) => {}
                None => tracing::warn!(id = id.as_ref(), "ignoring unknown effect id"),
            }
        }
        if order.is_empty() {
            return Self::new();
        }
        Self::with_order(order)
    }

    fn with_order(order: Vec<EffectKind>) -> Self {
        let settings = order
            .iter()
            .map(|kind| (*kind, EffectSettings::defaults(*kind)))
            .collect();
        Self { order, settings }
    }

    pub fn order(&self) -> &[EffectKind] {
        &self.order
    }

    /// Ids in chain order, as persisted.
    pub fn order_ids(&self) -> Vec<String> {
        self.order.iter().map(|kind| kind.id().to_string()).collect()
    }

    /// Replaces the order. Repeats are dropped. Effects that stay keep their
    /// settings, new ones start at defaults, removed ones are forgotten.
    pub fn set_order(&mut self, order: &[EffectKind]) {
        let mut deduped = Vec::with_capacity(order.len());
        for kind in order {
            if !deduped.contains(kind) {
                deduped.push(*kind);
            }
        }
        self.settings.retain(|kind, _| deduped.contains(kind));
        for kind in &deduped {
            self.settings
                .entry(*kind)
                .or_insert_with(|| EffectSettings::defaults(*kind));
        }
        self.order = deduped;
    }

    /// Swaps `kind` with its neighbour. Returns whether the order changed.
    pub fn move_effect(&mut self, kind: EffectKind, direction: Move) -> bool {
        let Some(index) = self.order.iter().position(|k| *k == kind) else {
            return false;
        };
        let target = match direction {
            Move::Earlier if index > 0 => index - 1,
            Move::Later if index + 1 < self.order.len() => index + 1,
            _ => return false,
        };
        let mut order = self.order.clone();
        order.swap(index, target);
        self.set_order(&order);
        true
    }

    pub fn settings(&self, kind: EffectKind) -> Option<&EffectSettings> {
        self.settings.get(&kind)
    }

    pub fn get(&self, kind: EffectKind, key: &str) -> Option<f32> {
        self.settings.get(&kind)?.get(key)
    }

    pub fn is_bypassed(&self, kind: EffectKind) -> bool {
        self.settings.get(&kind).map(|s| s.bypass).unwrap_or(false)
    }

    /// Stores a clamped value and returns it. `None` when the effect is not
    /// in the chain or has no such parameter.
    pub fn set_parameter(&mut self, kind: EffectKind, key: &str, value: f32) -> Option<f32> {
        let descriptor = kind.descriptor().param(key)?;
        let settings = self.settings.get_mut(&kind)?;
        let clamped = descriptor.clamp(value);
        settings.values.insert(descriptor.key, clamped);
        Some(clamped)
    }

    /// Restores one parameter to its default and returns it.
    pub fn reset_parameter(&mut self, kind: EffectKind, key: &str) -> Option<f32> {
        let descriptor: &ParamDescriptor = kind.descriptor().param(key)?;
        self.set_parameter(kind, key, descriptor.default)
    }

    pub fn set_bypass(&mut self, kind: EffectKind, bypass: bool) {
        if let Some(settings) = self.settings.get_mut(&kind) {
            settings.bypass = bypass;
        }
    }

    /// Every value back to its default and every bypass cleared. The order
    /// is kept.
    pub fn reset(&mut self) {
        for (kind, settings) in self.settings.iter_mut() {
            *settings = EffectSettings::defaults(*kind);
        }
    }

    /// Non-bypassed effects in chain order.
    pub fn enabled(&self) -> impl Iterator<Item = EffectKind> + '_ {
        self.order.iter().copied().filter(|kind| !self.is_bypassed(*kind))
    }
}
