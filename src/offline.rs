// src/offline.rs

//! Export-time rendering: rebuilds the whole chain in a fresh offline graph,
//! copies the chain's current values onto it and renders the full source.
//!
//! Nothing here touches the live engine. The only thing the two share is the
//! `ChainState` both read from.

use crate::catalog::{catalog, EffectKind};
use crate::chain::ChainState;
use crate::factory::{self, Ramp};
use crate::host::{AudioBuffer, BufferSource, OfflineContext, RenderError};
use crate::impulse;
use crate::router;
use rand::Rng;
use std::sync::Arc;

/// Renders `source` through `chain` at the source's own rate and channel
/// count. The reverb gets a newly generated impulse every call.
pub fn render(chain: &ChainState, source: Arc<AudioBuffer>) -> Result<AudioBuffer, RenderError> {
    render_with(&mut rand::thread_rng(), chain, source)
}

/// [`render`] with a caller-supplied random source for the reverb impulse.
pub fn render_with<R: Rng>(
    rng: &mut R,
    chain: &ChainState,
    source: Arc<AudioBuffer>,
) -> Result<AudioBuffer, RenderError> {
    if source.frames() == 0 || source.channel_count() == 0 {
        return Err(RenderError::EmptySource);
    }
    let channel_count = source.channel_count();
    let sample_rate = source.sample_rate();
    let mut context = OfflineContext::new(channel_count, source.frames(), sample_rate)?;
    let graph = context.graph_mut();

    let groups = factory::instantiate(graph, catalog())?;
    for kind in chain.order() {
        let (Some(group), Some(settings)) = (groups.get(*kind), chain.settings(*kind)) else {
            continue;
        };
        if *kind == EffectKind::Reverb {
            let decay = settings.get("decay").unwrap_or(impulse::DEFAULT_DECAY);
            let ir = impulse::generate_with(rng, sample_rate, decay, decay);
            group.set_impulse_buffer(graph, &ir);
        }
        group.apply_settings(graph, settings, Ramp::Immediate);
    }

    let mut player = BufferSource::new(source, channel_count);
    player.start(0);
    let player = graph.add(player);
    let destination = graph.destination();
    let route = router::connect(graph, player, destination, chain, &groups)?;

    tracing::info!(
        frames = context.length(),
        channels = channel_count,
        sample_rate,
        stages = route.len(),
        "rendering offline"
    );
    Ok(context.start_rendering())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_is_an_error() {
        let empty = Arc::new(AudioBuffer::new(44100, vec![Vec::new(), Vec::new()]));
        assert!(matches!(render(&ChainState::new(), empty), Err(RenderError::EmptySource)));
        let no_channels = Arc::new(AudioBuffer::new(44100, Vec::new()));
        assert!(matches!(render(&ChainState::new(), no_channels), Err(RenderError::EmptySource)));
    }

    #[test]
    fn unsupported_rate_is_reported() {
        let source = Arc::new(AudioBuffer::new(1000, vec![vec![0.0; 100]]));
        assert!(matches!(render(&ChainState::new(), source), Err(RenderError::InvalidSpec(_))));
    }

    #[test]
    fn render_does_not_modify_the_chain() {
        let mut chain = ChainState::new();
        chain.set_parameter(EffectKind::Reverb, "decay", 0.5);
        let before = chain.clone();
        let source = Arc::new(AudioBuffer::new(8000, vec![vec![0.1; 512]]));
        let out = render(&chain, source).unwrap();
        assert_eq!(out.frames(), 512);
        assert_eq!(chain, before);
    }
}
