// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use callscope_api::Client;
use callscope_app::{
    CallsPage, CallsQuery, FetchEpoch, FetchEvent, FetchFailure, FetchRequest, FetchRuntime,
    InternalEvent,
};
use std::sync::mpsc::Sender;
use std::thread;

/// Runs each fetch on its own worker thread. A worker whose request was
/// cancelled while in flight drops its result instead of delivering it.
pub struct ApiRuntime {
    client: Client,
}

impl ApiRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl FetchRuntime for ApiRuntime {
    fn fetch_calls(&mut self, query: &CallsQuery, token: &str) -> Result<CallsPage, FetchFailure> {
        self.client.fetch_calls(query, token)
    }

    fn spawn_fetch(&mut self, request: FetchRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let client = self.client.clone();
        let epoch = request.epoch;
        thread::Builder::new()
            .name(format!("fetch-{}", epoch.get()))
            .spawn(move || {
                if request.cancel.is_cancelled() {
                    return;
                }
                let outcome = client.fetch_calls(&request.query, &request.token);
                if request.cancel.is_cancelled() {
                    log::debug!("discarding result of cancelled fetch {}", request.epoch);
                    return;
                }
                let _ = tx.send(InternalEvent::Fetch(FetchEvent {
                    epoch: request.epoch,
                    outcome,
                }));
            })
            .with_context(|| format!("spawn worker for fetch {epoch}"))?;
        Ok(())
    }

    fn cancel_fetch(&mut self, epoch: FetchEpoch) -> Result<()> {
        log::debug!("fetch {epoch} cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ApiRuntime;
    use anyhow::{Result, anyhow};
    use callscope_api::Client;
    use callscope_app::{
        FilterSet, MemorySession, ViewCommand, ViewController, ViewEvent, ViewOptions,
    };
    use callscope_testkit::{fixture_date, sample_page, sample_page_json};
    use std::thread;
    use std::time::Duration;
    use tiny_http::{Header, Response, Server};

    #[test]
    fn worker_delivers_page_to_controller() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}/api", server.server_addr());
        let body = sample_page_json(2)?;
        let handle = thread::spawn(move || {
            let request = server.recv().expect("request expected");
            let response = Response::from_string(body).with_header(
                Header::from_bytes("Content-Type", "application/json")
                    .expect("valid content type header"),
            );
            request.respond(response).expect("response should succeed");
        });

        let mut runtime = ApiRuntime::new(Client::new(&addr, Duration::from_secs(2))?);
        let mut view = ViewController::new(
            MemorySession::new("token", None),
            fixture_date(),
            ViewOptions::default(),
        );
        view.mount(&mut runtime);
        let events = view.wait_until_idle(&mut runtime, Duration::from_secs(5));

        assert!(
            events
                .iter()
                .any(|event| matches!(event, ViewEvent::DataReplaced { records: 2, .. }))
        );
        assert_eq!(view.state().data, Some(&sample_page(2)));
        assert_eq!(view.applied_filters(), &FilterSet::defaults(fixture_date()));
        handle.join().expect("server thread should join");
        Ok(())
    }

    #[test]
    fn unmount_before_delivery_discards_worker_result() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}/api", server.server_addr());
        let body = sample_page_json(2)?;
        let handle = thread::spawn(move || {
            // The worker may observe cancellation before it connects.
            if let Ok(Some(request)) = server.recv_timeout(Duration::from_secs(2)) {
                thread::sleep(Duration::from_millis(100));
                let _ = request.respond(Response::from_string(body));
            }
        });

        let mut runtime = ApiRuntime::new(Client::new(&addr, Duration::from_secs(2))?);
        let mut view = ViewController::new(
            MemorySession::new("token", None),
            fixture_date(),
            ViewOptions::default(),
        );
        view.mount(&mut runtime);
        view.dispatch(ViewCommand::Unmount, &mut runtime);

        let late = view.wait(&mut runtime, Duration::from_millis(500));
        assert!(late.is_empty());
        assert!(view.state().data.is_none());
        handle.join().expect("server thread should join");
        Ok(())
    }
}
