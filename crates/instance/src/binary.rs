// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Binary provisioning: the asynchronous download step scheduled by
//! instance-create. An external concern (artifact registry, CDN) abstracted
//! behind a trait; a fake backs the test suite.

use async_trait::async_trait;
use bastion_core::{CoreError, InstanceId};

#[derive(Debug, Clone)]
pub struct BinaryArtifact {
    pub path: String,
    pub checksum: String,
    pub version: String,
}

#[async_trait]
pub trait BinaryProvisioner: Send + Sync {
    async fn download(&self, feature_id: &str, instance_id: InstanceId) -> Result<BinaryArtifact, CoreError>;
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct FakeBinaryProvisioner {
    pub fail: parking_lot::Mutex<bool>,
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl BinaryProvisioner for FakeBinaryProvisioner {
    async fn download(&self, feature_id: &str, instance_id: InstanceId) -> Result<BinaryArtifact, CoreError> {
        if *self.fail.lock() {
            return Err(CoreError::ExternalFailure("download failed".into()));
        }
        Ok(BinaryArtifact {
            path: format!("/opt/bastion/bin/{feature_id}/{instance_id}"),
            checksum: "0".repeat(64),
            version: "0.0.0-fake".into(),
        })
    }
}

#[cfg(test)]
#[path = "binary_tests.rs"]
mod tests;
