// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Feature manifest lookup. Manifests are an external, read-only
//! declaration; this crate only needs to look them up by feature id.

use bastion_core::FeatureManifest;
use std::collections::HashMap;

pub trait ManifestRegistry: Send + Sync {
    fn get(&self, feature_id: &str) -> Option<FeatureManifest>;
}

/// Fixed in-memory registry, built once at startup from the deployed
/// manifest files.
#[derive(Debug, Default)]
pub struct StaticManifestRegistry(HashMap<String, FeatureManifest>);

impl StaticManifestRegistry {
    pub fn new(manifests: impl IntoIterator<Item = FeatureManifest>) -> Self {
        Self(manifests.into_iter().map(|m| (m.feature_id.clone(), m)).collect())
    }
}

impl ManifestRegistry for StaticManifestRegistry {
    fn get(&self, feature_id: &str) -> Option<FeatureManifest> {
        self.0.get(feature_id).cloned()
    }
}

#[cfg(test)]
#[path = "manifests_tests.rs"]
mod tests;
