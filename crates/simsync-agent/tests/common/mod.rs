// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared test transports and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use simsync_agent::{DataMap, ExchangeTransport, Result, SyncAgentError, SyncSession, TickReport};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Scripted behavior for one exchange
pub enum Reply {
    Ok(DataMap),
    /// Fail with an HTTP status error
    Status(u16),
    /// Never answer
    Hang,
    /// Answer once the notify fires
    After(Arc<Notify>, DataMap),
}

/// Transport that replays scripted replies and records every payload it saw.
/// An empty script answers with an empty object.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    payloads: Mutex<Vec<DataMap>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        })
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn payloads(&self) -> Vec<DataMap> {
        self.payloads.lock().unwrap().clone()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExchangeTransport for ScriptedTransport {
    async fn exchange(&self, payload: String) -> Result<DataMap> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);

        let parsed: DataMap = serde_json::from_str(&payload)?;
        self.payloads.lock().unwrap().push(parsed);

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            None => Ok(DataMap::new()),
            Some(Reply::Ok(map)) => Ok(map),
            Some(Reply::Status(status)) => Err(SyncAgentError::HttpStatus {
                status,
                body: "scripted failure".to_string(),
            }),
            Some(Reply::Hang) => std::future::pending().await,
            Some(Reply::After(notify, map)) => {
                notify.notified().await;
                Ok(map)
            }
        }
    }
}

/// Build a map from a `json!` object literal
pub fn map(value: serde_json::Value) -> DataMap {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

/// Tick until an exchange result is applied, yielding so the exchange task can run
pub async fn tick_until_completed(session: &mut SyncSession, dt: f64) -> TickReport {
    for _ in 0..200 {
        let report = session.tick(dt).expect("tick failed");
        if report.completed.is_some() {
            return report;
        }
        tokio::task::yield_now().await;
    }
    panic!("exchange did not complete");
}
