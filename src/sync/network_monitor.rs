//! # Network Monitor
//!
//! Polls `GET /api/health` and keeps a single online/offline flag.
//!
//! ## Features
//!
//! - **Probe**: one health request under a hard deadline; any non-2xx,
//!   transport error or timeout counts as offline
//! - **Transitions**: every probe reports whether the flag flipped
//! - **Subscription**: a `watch` channel carries every state update
//! - **Reachability hook**: [`ConnectivityMonitor::set_online`] lets a
//!   platform callback stand in for polling
//!
//! State lives in memory only. A fresh monitor assumes it is online until
//! the first probe says otherwise.

use crate::api_client::ApiClient;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Current connectivity as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityState {
    pub is_online: bool,
    /// `None` until the first probe completes
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self {
            is_online: true,
            last_checked_at: None,
        }
    }
}

/// Change of the online flag caused by one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    CameOnline,
    WentOffline,
}

#[derive(Debug)]
pub struct ConnectivityMonitor {
    api: ApiClient,
    interval: Duration,
    state: watch::Sender<ConnectivityState>,
}

impl ConnectivityMonitor {
    pub fn new(api: ApiClient, interval: Duration) -> Self {
        let (state, _) = watch::channel(ConnectivityState::default());
        Self {
            api,
            interval,
            state,
        }
    }

    pub fn is_online(&self) -> bool {
        self.state.borrow().is_online
    }

    pub fn state(&self) -> ConnectivityState {
        *self.state.borrow()
    }

    /// Receiver notified on every state update
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }

    /// Probe the server once and record the result
    pub async fn probe(&self) -> Transition {
        let online = match self.api.health().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Health probe failed: {}", e);
                false
            }
        };
        self.set_online(online)
    }

    /// Record an externally observed connectivity state
    pub fn set_online(&self, online: bool) -> Transition {
        let mut transition = Transition::None;
        self.state.send_modify(|state| {
            transition = match (state.is_online, online) {
                (false, true) => Transition::CameOnline,
                (true, false) => Transition::WentOffline,
                _ => Transition::None,
            };
            state.is_online = online;
            state.last_checked_at = Some(Utc::now());
        });

        match transition {
            Transition::CameOnline => tracing::info!("Connectivity restored"),
            Transition::WentOffline => tracing::info!("Connectivity lost"),
            Transition::None => {}
        }
        transition
    }

    /// Probe now and then every interval, forever
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.probe().await;
        }
    }
}
