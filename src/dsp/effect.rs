//! Effect contract and the ordered effect chain.

use super::buffer::AudioBuffer;
use super::meter::LevelMeter;

/// An in-place processor over a multi-channel buffer.
///
/// Implementations must not allocate or block in `apply`; any state they
/// need is sized when they are constructed.
pub trait Effect: Send {
    fn name(&self) -> &'static str;

    /// Process `buffer` in place.
    fn apply(&mut self, buffer: &mut AudioBuffer);

    /// Clear internal state without changing capacity.
    fn reset(&mut self);

    /// Metering effects expose themselves here so readings survive boxing.
    fn as_meter(&self) -> Option<&LevelMeter> {
        None
    }

    /// Nested chains expose themselves so lookups can descend into them.
    fn as_chain(&self) -> Option<&EffectChain> {
        None
    }
}

/// Effects applied one after another, in insertion order.
#[derive(Default)]
pub struct EffectChain {
    effects: Vec<Box<dyn Effect>>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, effect: Box<dyn Effect>) {
        self.effects.push(effect);
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.effects.iter().map(|e| e.name()).collect()
    }

    /// Every meter in this chain and any nested chain, in processing order.
    pub fn meters(&self) -> Vec<&LevelMeter> {
        let mut out = Vec::new();
        self.collect_meters(&mut out);
        out
    }

    fn collect_meters<'a>(&'a self, out: &mut Vec<&'a LevelMeter>) {
        for effect in &self.effects {
            if let Some(meter) = effect.as_meter() {
                out.push(meter);
            } else if let Some(chain) = effect.as_chain() {
                chain.collect_meters(out);
            }
        }
    }
}

impl std::fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectChain")
            .field("effects", &self.names())
            .finish()
    }
}

impl Effect for EffectChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    fn apply(&mut self, buffer: &mut AudioBuffer) {
        for effect in self.effects.iter_mut() {
            effect.apply(buffer);
        }
    }

    fn reset(&mut self) {
        for effect in self.effects.iter_mut() {
            effect.reset();
        }
    }

    fn as_chain(&self) -> Option<&EffectChain> {
        Some(self)
    }
}
