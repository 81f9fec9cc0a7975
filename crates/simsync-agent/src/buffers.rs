// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Output and input buffers
//!
//! Both buffers are string-keyed maps of JSON values. The output buffer is written by
//! simulation code and shipped on every exchange; the input buffer holds the last
//! decoded response and is only ever replaced as a whole.

use crate::simsync_agent_error::Result;
use serde_json::{Map, Value};

/// Name → value map carried by one side of an exchange
pub type DataMap = Map<String, Value>;

/// Key set by `request_reset()` so the agent side can tell the simulation restarted
pub const RESET_KEY: &str = "reset";

/// Values written by the simulation, sent on the next exchange
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputBuffer {
    data: DataMap,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a value, replacing any earlier value under the same name
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Remove one value, returning it if it was present
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.data.remove(name)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn as_map(&self) -> &DataMap {
        &self.data
    }

    /// Serialize the buffer as a JSON object string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.data)?)
    }
}

/// Values decoded from the last successful exchange
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputBuffer {
    data: DataMap,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value; unknown names yield `None`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    /// Replace the whole buffer with a decoded response
    pub fn replace(&mut self, data: DataMap) {
        self.data = data;
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn as_map(&self) -> &DataMap {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }
}
