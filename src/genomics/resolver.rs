//! Cross-window deduplication of variant calls.
//!
//! Overlapping windows rediscover the same edit with different local
//! geometry. The resolver keeps one representative per genomic key in a
//! position-ordered buffer, preferring the detection farthest from its
//! window's boundaries, and releases keys once no later window can reach
//! them.

use std::collections::BTreeMap;

use tracing::trace;

use crate::CallerError;

use super::{Variant, VariantKey, WindowRecord};

/// Position-ordered buffer of unresolved variants.
#[derive(Debug, Default)]
pub struct ConflictResolver {
    pending: BTreeMap<VariantKey, Variant>,
}

impl ConflictResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered variants.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Buffered variants in position order.
    pub fn pending(&self) -> impl Iterator<Item = &Variant> {
        self.pending.values()
    }

    /// Release leading variants that `window` and any later window cannot
    /// rediscover: other contigs and spans ending at or before its start.
    pub fn flush_before(&mut self, window: &WindowRecord) -> Vec<Variant> {
        let mut flushed = Vec::new();
        while let Some((_, head)) = self.pending.first_key_value() {
            if head.chrom != window.chrom || head.end <= window.start {
                if let Some((_, variant)) = self.pending.pop_first() {
                    flushed.push(variant);
                }
            } else {
                break;
            }
        }
        flushed
    }

    /// Merge the variants produced by `window` into the buffer.
    ///
    /// Every variant must carry `window_id`. Keys present in the buffer keep
    /// the detection with the larger end-distance and sum their support;
    /// ties keep the earlier detection. Buffered keys that `window` failed to
    /// rediscover although it would have seen them farther from its
    /// boundaries are flagged as conflicts.
    pub fn absorb(
        &mut self,
        window: &WindowRecord,
        window_id: usize,
        variants: Vec<Variant>,
    ) -> Result<(), CallerError> {
        for variant in variants {
            let key = variant.key();
            match self.pending.get_mut(&key) {
                Some(existing) if existing.window_id == window_id => {
                    return Err(CallerError::DuplicateWindowVariant { key, window_id });
                }
                Some(existing) => {
                    let support = existing.support + variant.support;
                    if variant.end_distance > existing.end_distance {
                        trace!(%key, from = existing.window_id, to = window_id, "representative moved");
                        *existing = variant;
                    }
                    existing.support = support;
                }
                None => {
                    self.pending.insert(key, variant);
                }
            }
        }

        for variant in self.pending.values_mut() {
            if variant.window_id == window_id || variant.chrom != window.chrom {
                continue;
            }
            let hypothetical = window.end_distance(variant.position, variant.end);
            if hypothetical > variant.end_distance {
                variant.conflict = true;
            }
        }
        Ok(())
    }

    /// Flush then merge one window; returns the flushed variants.
    pub fn process(
        &mut self,
        window: &WindowRecord,
        window_id: usize,
        variants: Vec<Variant>,
    ) -> Result<Vec<Variant>, CallerError> {
        let flushed = self.flush_before(window);
        self.absorb(window, window_id, variants)?;
        Ok(flushed)
    }

    /// Drain everything left, in position order.
    pub fn finish(&mut self) -> Vec<Variant> {
        std::mem::take(&mut self.pending).into_values().collect()
    }
}
