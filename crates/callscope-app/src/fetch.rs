// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;

use crate::{CallsPage, CallsQuery, InternalEvent};

/// Identifies one initiated fetch. Later fetches always get larger epochs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchEpoch(u64);

impl FetchEpoch {
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for FetchEpoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("request superseded")]
    Cancelled,
    #[error("unauthorized{}", status_suffix(.status))]
    Unauthorized { status: Option<u16> },
    #[error("request failed ({status}): {message}")]
    ClientError { status: u16, message: String },
    #[error("server error ({status})")]
    ServerError { status: u16, detail: Option<String> },
    #[error("network error: {message}")]
    Network { message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" ({code})")).unwrap_or_default()
}

impl FetchFailure {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Banner text shown to the user.
    pub fn message(&self) -> String {
        match self {
            Self::Cancelled => "request canceled".to_owned(),
            Self::Unauthorized { .. } => {
                "session expired or not authorized; redirecting to sign in".to_owned()
            }
            Self::ClientError { message, .. } => message.clone(),
            Self::ServerError {
                detail: Some(detail),
                ..
            } => detail.clone(),
            Self::ServerError { status, .. } => {
                format!("server error ({status}); try again later")
            }
            Self::Network { message } => {
                format!("cannot reach the server; check your connection ({message})")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub epoch: FetchEpoch,
    pub query: CallsQuery,
    pub token: String,
    pub cancel: CancelToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchEvent {
    pub epoch: FetchEpoch,
    pub outcome: Result<CallsPage, FetchFailure>,
}

/// Transport seam for the view controller. Implementations either answer
/// inline through `fetch_calls` or override `spawn_fetch` to run the request
/// elsewhere and report back over `tx`.
pub trait FetchRuntime {
    fn fetch_calls(&mut self, query: &CallsQuery, token: &str) -> Result<CallsPage, FetchFailure>;

    fn spawn_fetch(
        &mut self,
        request: FetchRequest,
        tx: Sender<InternalEvent>,
    ) -> anyhow::Result<()> {
        if request.cancel.is_cancelled() {
            return Ok(());
        }
        let outcome = self.fetch_calls(&request.query, &request.token);
        tx.send(InternalEvent::Fetch(FetchEvent {
            epoch: request.epoch,
            outcome,
        }))
        .map_err(|_| anyhow::anyhow!("fetch event channel closed"))?;
        Ok(())
    }

    fn cancel_fetch(&mut self, _epoch: FetchEpoch) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Idle,
    Fetching(FetchEpoch),
    Accepted(FetchEpoch),
    Aborted(FetchEpoch),
    Failed(FetchEpoch),
}

#[derive(Debug, Clone)]
struct InFlight {
    epoch: FetchEpoch,
    cancel: CancelToken,
}

#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub epoch: FetchEpoch,
    pub cancel: CancelToken,
    pub superseded: Option<FetchEpoch>,
}

/// Single-in-flight fetch tracker: beginning a fetch cancels the previous
/// one, and only the result for the newest epoch is ever handed back.
#[derive(Debug, Clone)]
pub struct FetchController {
    last_epoch: u64,
    in_flight: Option<InFlight>,
    phase: FetchPhase,
}

impl Default for FetchController {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchController {
    pub fn new() -> Self {
        Self {
            last_epoch: 0,
            in_flight: None,
            phase: FetchPhase::Idle,
        }
    }

    pub fn phase(&self) -> FetchPhase {
        self.phase
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn begin(&mut self) -> FetchTicket {
        let superseded = self.abort();
        self.last_epoch = self.last_epoch.saturating_add(1);
        let epoch = FetchEpoch(self.last_epoch);
        let cancel = CancelToken::new();
        self.in_flight = Some(InFlight {
            epoch,
            cancel: cancel.clone(),
        });
        self.phase = FetchPhase::Fetching(epoch);
        FetchTicket {
            epoch,
            cancel,
            superseded,
        }
    }

    pub fn abort(&mut self) -> Option<FetchEpoch> {
        let in_flight = self.in_flight.take()?;
        in_flight.cancel.cancel();
        log::debug!("aborted fetch {}", in_flight.epoch);
        self.phase = FetchPhase::Aborted(in_flight.epoch);
        Some(in_flight.epoch)
    }

    /// Hands back the outcome only when it belongs to the live request.
    pub fn settle(&mut self, event: FetchEvent) -> Option<Result<CallsPage, FetchFailure>> {
        let live = self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| {
                in_flight.epoch == event.epoch && !in_flight.cancel.is_cancelled()
            });
        if !live {
            log::debug!("dropping stale result for fetch {}", event.epoch);
            return None;
        }
        self.in_flight = None;

        match event.outcome {
            Ok(page) => {
                self.phase = FetchPhase::Accepted(event.epoch);
                Some(Ok(page))
            }
            Err(FetchFailure::Cancelled) => {
                self.phase = FetchPhase::Aborted(event.epoch);
                None
            }
            Err(failure) => {
                log::warn!("fetch {} failed: {failure}", event.epoch);
                self.phase = FetchPhase::Failed(event.epoch);
                Some(Err(failure))
            }
        }
    }
}
