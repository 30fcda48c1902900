//! The typed layout model: every name resolved and every tag normalized.

use indexmap::IndexMap;

use crate::description::Description;
use crate::errors::LayoutError;
use crate::log::{debug, info};

use super::arms::Arm;
use super::bridges::Bridge;
use super::cells::{Segment, build_segments};
use super::context::LayoutContext;
use super::guard_ring::GuardRing;

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutModel {
    pub bridges: IndexMap<String, Bridge>,
    pub arms: IndexMap<String, Arm>,
    pub segments: Vec<Segment>,
    /// `None` when the description has no guard ring or disables it
    pub guard_ring: Option<GuardRing>,
}

impl LayoutModel {
    /// Normalize the whole description up front.
    ///
    /// Bridges and arms are checked even when no cell references them, so a
    /// broken definition fails the build before any geometry is produced.
    pub fn new(ctx: &LayoutContext, description: &Description) -> Result<Self, LayoutError> {
        let bridges = description
            .bridges
            .iter()
            .map(|(name, def)| -> Result<_, LayoutError> {
                Ok((name.clone(), Bridge::from_def(ctx, name, def)?))
            })
            .collect::<Result<IndexMap<_, _>, LayoutError>>()?;

        let arms = description
            .arms
            .iter()
            .map(|(name, def)| -> Result<_, LayoutError> {
                let arm = Arm::from_def(ctx, &description.ports.data, name, def)?;
                Ok((name.clone(), arm))
            })
            .collect::<Result<IndexMap<_, _>, LayoutError>>()?;

        let segments = build_segments(ctx, &description.segments, &bridges, &arms)?;

        let guard_ring = match &description.guard_ring {
            Some(def) if def.config.use_guard_ring => Some(GuardRing::from_def(ctx, def)?),
            Some(_) => {
                info!("guard ring is disabled");
                None
            }
            None => None,
        };

        debug!(
            bridges = bridges.len(),
            arms = arms.len(),
            segments = segments.len(),
            guard_ring = guard_ring.is_some(),
            "layout model normalized"
        );
        Ok(Self {
            bridges,
            arms,
            segments,
            guard_ring,
        })
    }
}
