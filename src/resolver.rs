//! Choosing the consensus model closest to a partial selection.
//!
//! Candidates must share the flow cell and basecaller variant of the query.
//! The device is the first thing given up: models for the requested device
//! are preferred, then models without a device tag, then any device. Within
//! a tier the version is matched by [`nearest_version`].

use std::fmt;

use crate::model::{Device, Model, ModelCatalog, ModelQuery, VersionTag};

/// Which device filter produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    /// Same device as requested
    Device,
    /// Requested device unavailable, model carries no device tag
    Untagged,
    /// Any device (always the tier when the query names none)
    AnyDevice,
}

impl MatchTier {
    fn admits(self, wanted: Option<Device>, have: Option<Device>) -> bool {
        match self {
            MatchTier::Device => have == wanted,
            MatchTier::Untagged => have.is_none(),
            MatchTier::AnyDevice => true,
        }
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchTier::Device => "device match",
            MatchTier::Untagged => "device relaxed to untagged models",
            MatchTier::AnyDevice => "any device",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub model: &'a Model,
    pub tier: MatchTier,
}

/// Greatest version `<= query`, or the smallest version when every
/// candidate is newer than `query`. `None` only for an empty slice.
pub fn nearest_version(query: VersionTag, versions: &[VersionTag]) -> Option<VersionTag> {
    let mut sorted = versions.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let insertion = sorted.partition_point(|v| *v <= query);
    sorted.get(insertion.saturating_sub(1)).copied()
}

/// Resolves `query` against `catalog`, or `None` when no model shares its
/// flow cell and variant.
pub fn resolve<'a>(query: &ModelQuery, catalog: &'a [Model]) -> Option<Resolution<'a>> {
    let tiers: &[MatchTier] = match query.device {
        Some(_) => &[MatchTier::Device, MatchTier::Untagged, MatchTier::AnyDevice],
        None => &[MatchTier::AnyDevice],
    };

    for &tier in tiers {
        let candidates: Vec<&Model> = catalog
            .iter()
            .filter(|m| m.cell == query.cell && m.variant == query.variant)
            .filter(|m| tier.admits(query.device, m.device))
            .collect();
        if let Some(model) = pick_version(query.version, &candidates) {
            tracing::debug!("Resolved {query} to {model} ({tier})");
            return Some(Resolution { model, tier });
        }
    }
    None
}

/// Chooses among candidates that differ only in version. Ties go to the
/// first candidate in catalog order.
fn pick_version<'a>(query: Option<VersionTag>, candidates: &[&'a Model]) -> Option<&'a Model> {
    if let [only] = candidates {
        return Some(*only);
    }
    let versions: Vec<VersionTag> = candidates.iter().map(|m| m.version).collect();
    let chosen = match query {
        Some(query) => nearest_version(query, &versions)?,
        None => versions.iter().copied().max()?,
    };
    candidates.iter().copied().find(|m| m.version == chosen)
}

/// Resolves `query` or falls back to `default` with a warning.
pub fn resolve_or_default(query: &ModelQuery, catalog: &ModelCatalog, default: &str) -> String {
    match resolve(query, catalog.models()) {
        Some(resolution) => resolution.model.full_name.clone(),
        None => {
            tracing::warn!(
                "No medaka model matches {query}; using the default model {default}. \
                 Polishing quality may suffer with an unsuitable model."
            );
            default.to_string()
        }
    }
}

impl ModelCatalog {
    /// Shorthand for [`resolve`] over this catalog.
    pub fn resolve(&self, query: &ModelQuery) -> Option<Resolution<'_>> {
        resolve(query, self.models())
    }
}
