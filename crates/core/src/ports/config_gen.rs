// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config-file generation: a pure function `(serviceType, config, bindIP) ->
//! bytes`, one implementation per service type.

use crate::error::CoreError;
use crate::model::InstanceId;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Text,
    Json,
    Yaml,
}

pub trait ConfigGenerator: Send + Sync {
    fn service_type(&self) -> &str;
    fn config_file_name(&self) -> &str;
    fn format(&self) -> ConfigFormat;

    fn validate(&self, config: &HashMap<String, Value>, bind_ip: &str) -> Result<(), CoreError>;

    fn generate(
        &self,
        instance_id: InstanceId,
        config: &HashMap<String, Value>,
        bind_ip: &str,
    ) -> Result<Vec<u8>, CoreError>;
}
