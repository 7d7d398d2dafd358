// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use time::Date;

use crate::{
    Call, CallSortKey, CallsPage, CallsQuery, CategoryShare, DEFAULT_PAGE_SIZE, FetchController,
    FetchEpoch, FetchEvent, FetchFailure, FetchPhase, FetchRequest, FetchRuntime, FilterEdit,
    FilterSet, PaginationState, SessionContext, SortDirection, SortState, StageNumber, aggregate,
    infer_columns, sort,
};

pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    pub page_size: u32,
    pub redirect_delay: Duration,
    pub sort_order: SortDirection,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            sort_order: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    Edit(FilterEdit),
    ApplyFilters,
    ResetFilters,
    GoToPage(u32),
    NextPage,
    PrevPage,
    ToggleSortOrder,
    SortBy(CallSortKey),
    ClearSort,
    Refresh,
    Unmount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    FiltersEdited,
    FiltersApplied,
    FiltersReset,
    PageChanged(u32),
    SortOrderChanged(SortDirection),
    ColumnSortChanged(SortState<CallSortKey>),
    FetchStarted(FetchEpoch),
    FetchAborted(FetchEpoch),
    DataReplaced { epoch: FetchEpoch, records: usize },
    ColumnsChanged(Vec<StageNumber>),
    FetchFailed(FetchFailure),
    SessionExpired,
    RedirectScheduled(Duration),
    RedirectDue,
    Unmounted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    Fetch(FetchEvent),
    Redirect { token: u64 },
}

/// What the presentation layer renders: never a raw transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState<'a> {
    pub loading: bool,
    pub error: Option<&'a str>,
    pub data: Option<&'a CallsPage>,
}

impl ViewState<'_> {
    pub fn is_error_only(&self) -> bool {
        self.data.is_none() && self.error.is_some()
    }
}

pub struct ViewController<S> {
    session: S,
    options: ViewOptions,
    defaults: FilterSet,
    pending: FilterSet,
    applied: FilterSet,
    pagination: PaginationState,
    sort_order: SortDirection,
    column_sort: SortState<CallSortKey>,
    fetch: FetchController,
    data: Option<CallsPage>,
    columns: Vec<StageNumber>,
    error: Option<String>,
    mounted: bool,
    session_expired: bool,
    redirect_token: u64,
    redirect_due: bool,
    tx: Sender<InternalEvent>,
    rx: Receiver<InternalEvent>,
}

impl<S: SessionContext> ViewController<S> {
    pub fn new(session: S, today: Date, options: ViewOptions) -> Self {
        let defaults = FilterSet::defaults(today);
        let (tx, rx) = mpsc::channel();
        Self {
            session,
            options,
            pending: defaults.clone(),
            applied: defaults.clone(),
            defaults,
            pagination: PaginationState::new(options.page_size),
            sort_order: options.sort_order,
            column_sort: SortState::default(),
            fetch: FetchController::new(),
            data: None,
            columns: Vec::new(),
            error: None,
            mounted: false,
            session_expired: false,
            redirect_token: 0,
            redirect_due: false,
            tx,
            rx,
        }
    }

    pub fn mount<R: FetchRuntime>(&mut self, runtime: &mut R) -> Vec<ViewEvent> {
        self.mounted = true;
        self.start_fetch(runtime)
    }

    pub fn dispatch<R: FetchRuntime>(
        &mut self,
        command: ViewCommand,
        runtime: &mut R,
    ) -> Vec<ViewEvent> {
        match command {
            ViewCommand::Edit(edit) => {
                self.pending = self.pending.apply(edit);
                vec![ViewEvent::FiltersEdited]
            }
            ViewCommand::ApplyFilters => {
                self.applied = self.pending.clone();
                self.pagination.reset();
                let mut events = vec![
                    ViewEvent::FiltersApplied,
                    ViewEvent::PageChanged(self.pagination.page()),
                ];
                events.extend(self.start_fetch(runtime));
                events
            }
            ViewCommand::ResetFilters => {
                self.pending = self.defaults.clone();
                self.applied = self.defaults.clone();
                self.pagination.reset();
                self.sort_order = self.options.sort_order;
                self.column_sort.clear();
                let mut events = vec![
                    ViewEvent::FiltersReset,
                    ViewEvent::PageChanged(self.pagination.page()),
                ];
                events.extend(self.start_fetch(runtime));
                events
            }
            ViewCommand::GoToPage(page) => {
                let changed = self.pagination.go_to(page);
                self.after_page_move(changed, runtime)
            }
            ViewCommand::NextPage => {
                let changed = self.pagination.next();
                self.after_page_move(changed, runtime)
            }
            ViewCommand::PrevPage => {
                let changed = self.pagination.prev();
                self.after_page_move(changed, runtime)
            }
            ViewCommand::ToggleSortOrder => {
                self.sort_order = self.sort_order.flipped();
                let mut events = vec![ViewEvent::SortOrderChanged(self.sort_order)];
                events.extend(self.start_fetch(runtime));
                events
            }
            ViewCommand::SortBy(key) => {
                self.column_sort.toggle(key);
                vec![ViewEvent::ColumnSortChanged(self.column_sort)]
            }
            ViewCommand::ClearSort => {
                self.column_sort.clear();
                vec![ViewEvent::ColumnSortChanged(self.column_sort)]
            }
            ViewCommand::Refresh => self.start_fetch(runtime),
            ViewCommand::Unmount => self.unmount(runtime),
        }
    }

    /// Drains events delivered by fetch workers and timers without blocking.
    pub fn pump<R: FetchRuntime>(&mut self, runtime: &mut R) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.extend(self.handle_internal(event, runtime));
        }
        events
    }

    /// Blocks up to `timeout` for the next delivery, then drains the rest.
    pub fn wait<R: FetchRuntime>(&mut self, runtime: &mut R, timeout: Duration) -> Vec<ViewEvent> {
        let Ok(event) = self.rx.recv_timeout(timeout) else {
            return Vec::new();
        };
        let mut events = self.handle_internal(event, runtime);
        events.extend(self.pump(runtime));
        events
    }

    pub fn wait_until_idle<R: FetchRuntime>(
        &mut self,
        runtime: &mut R,
        timeout: Duration,
    ) -> Vec<ViewEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = self.pump(runtime);
        while self.fetch.is_fetching() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            events.extend(self.wait(runtime, remaining));
        }
        events
    }

    pub fn state(&self) -> ViewState<'_> {
        ViewState {
            loading: self.fetch.is_fetching(),
            error: self.error.as_deref(),
            data: self.data.as_ref(),
        }
    }

    pub fn pending_filters(&self) -> &FilterSet {
        &self.pending
    }

    pub fn applied_filters(&self) -> &FilterSet {
        &self.applied
    }

    pub fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    pub fn sort_order(&self) -> SortDirection {
        self.sort_order
    }

    pub fn column_sort(&self) -> SortState<CallSortKey> {
        self.column_sort
    }

    pub fn fetch_phase(&self) -> FetchPhase {
        self.fetch.phase()
    }

    pub fn columns(&self) -> &[StageNumber] {
        &self.columns
    }

    pub fn rows(&self) -> Vec<&Call> {
        self.data
            .as_ref()
            .map(|page| sort(&page.calls, &self.column_sort))
            .unwrap_or_default()
    }

    pub fn stage_shares(&self, stage: StageNumber) -> Vec<CategoryShare> {
        self.data
            .as_ref()
            .map(|page| aggregate(&page.all_categories, stage))
            .unwrap_or_default()
    }

    pub fn all_stage_shares(&self) -> Vec<(StageNumber, Vec<CategoryShare>)> {
        self.columns
            .iter()
            .map(|stage| (*stage, self.stage_shares(*stage)))
            .collect()
    }

    pub fn window_label(&self) -> String {
        self.pagination.window_label()
    }

    pub fn role(&self) -> Option<String> {
        self.session.role()
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn is_session_expired(&self) -> bool {
        self.session_expired
    }

    pub fn redirect_due(&self) -> bool {
        self.redirect_due
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn after_page_move<R: FetchRuntime>(
        &mut self,
        changed: bool,
        runtime: &mut R,
    ) -> Vec<ViewEvent> {
        if !changed {
            return Vec::new();
        }
        let mut events = vec![ViewEvent::PageChanged(self.pagination.page())];
        events.extend(self.start_fetch(runtime));
        events
    }

    fn start_fetch<R: FetchRuntime>(&mut self, runtime: &mut R) -> Vec<ViewEvent> {
        if !self.mounted || self.session_expired {
            return Vec::new();
        }

        let ticket = self.fetch.begin();
        let mut events = Vec::new();
        if let Some(superseded) = ticket.superseded {
            if let Err(error) = runtime.cancel_fetch(superseded) {
                log::warn!("cancel fetch {superseded}: {error:#}");
            }
            events.push(ViewEvent::FetchAborted(superseded));
        }

        let Some(token) = self.session.token() else {
            events.extend(self.handle_fetch(
                FetchEvent {
                    epoch: ticket.epoch,
                    outcome: Err(FetchFailure::Unauthorized { status: None }),
                },
                runtime,
            ));
            return events;
        };

        let query = CallsQuery::build(
            &self.applied,
            self.pagination.page(),
            self.pagination.page_size(),
            self.sort_order,
        );
        log::debug!("starting fetch {} for page {}", ticket.epoch, query.page);
        events.push(ViewEvent::FetchStarted(ticket.epoch));

        let request = FetchRequest {
            epoch: ticket.epoch,
            query,
            token,
            cancel: ticket.cancel,
        };
        if let Err(error) = runtime.spawn_fetch(request, self.tx.clone()) {
            events.extend(self.handle_fetch(
                FetchEvent {
                    epoch: ticket.epoch,
                    outcome: Err(FetchFailure::Network {
                        message: format!("{error:#}"),
                    }),
                },
                runtime,
            ));
        }
        events
    }

    fn handle_internal<R: FetchRuntime>(
        &mut self,
        event: InternalEvent,
        runtime: &mut R,
    ) -> Vec<ViewEvent> {
        match event {
            InternalEvent::Fetch(event) => self.handle_fetch(event, runtime),
            InternalEvent::Redirect { token }
                if token == self.redirect_token && self.mounted && self.session_expired =>
            {
                self.redirect_due = true;
                vec![ViewEvent::RedirectDue]
            }
            InternalEvent::Redirect { .. } => Vec::new(),
        }
    }

    fn handle_fetch<R: FetchRuntime>(
        &mut self,
        event: FetchEvent,
        runtime: &mut R,
    ) -> Vec<ViewEvent> {
        if !self.mounted {
            return Vec::new();
        }
        let epoch = event.epoch;
        let Some(outcome) = self.fetch.settle(event) else {
            return Vec::new();
        };

        match outcome {
            Ok(page) => {
                self.error = None;
                let clamped = self
                    .pagination
                    .set_total_records(page.pagination.total_records);
                self.columns = infer_columns(&page.calls, self.applied.referenced_stages());
                let records = page.calls.len();
                self.data = Some(page);

                let mut events = vec![
                    ViewEvent::DataReplaced { epoch, records },
                    ViewEvent::ColumnsChanged(self.columns.clone()),
                ];
                if clamped {
                    events.push(ViewEvent::PageChanged(self.pagination.page()));
                    events.extend(self.start_fetch(runtime));
                }
                events
            }
            Err(failure) if failure.is_unauthorized() => self.expire_session(failure),
            Err(failure) => {
                self.error = Some(failure.message());
                vec![ViewEvent::FetchFailed(failure)]
            }
        }
    }

    fn expire_session(&mut self, failure: FetchFailure) -> Vec<ViewEvent> {
        if let Err(error) = self.session.clear() {
            log::warn!("clear session: {error:#}");
        }
        self.session_expired = true;
        self.data = None;
        self.columns.clear();
        self.error = Some(failure.message());

        self.redirect_token = self.redirect_token.saturating_add(1);
        schedule_redirect(&self.tx, self.redirect_token, self.options.redirect_delay);
        vec![
            ViewEvent::FetchFailed(failure),
            ViewEvent::SessionExpired,
            ViewEvent::RedirectScheduled(self.options.redirect_delay),
        ]
    }

    fn unmount<R: FetchRuntime>(&mut self, runtime: &mut R) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        if let Some(epoch) = self.fetch.abort() {
            if let Err(error) = runtime.cancel_fetch(epoch) {
                log::warn!("cancel fetch {epoch}: {error:#}");
            }
            events.push(ViewEvent::FetchAborted(epoch));
        }
        self.mounted = false;
        self.redirect_token = self.redirect_token.saturating_add(1);
        events.push(ViewEvent::Unmounted);
        events
    }
}

fn schedule_redirect(tx: &Sender<InternalEvent>, token: u64, delay: Duration) {
    let sender = tx.clone();
    thread::spawn(move || {
        thread::sleep(delay);
        let _ = sender.send(InternalEvent::Redirect { token });
    });
}

#[cfg(test)]
mod tests {
    use super::{InternalEvent, ViewCommand, ViewController, ViewEvent, ViewOptions};
    use crate::{
        Call, CallId, CallSortKey, CallsPage, CallsQuery, CampaignInfo, Category, FetchEpoch,
        FetchEvent, FetchFailure, FetchPhase, FetchRequest, FetchRuntime, FilterEdit,
        MemorySession, PageTotals, SessionContext, SortDirection, StageCount, StageEntry,
    };
    use std::collections::VecDeque;
    use std::sync::mpsc::Sender;
    use std::time::Duration;
    use time::{Date, Month};

    #[derive(Default)]
    struct TestRuntime {
        pending: Vec<(FetchRequest, Sender<InternalEvent>)>,
        queries: Vec<CallsQuery>,
        cancelled: Vec<FetchEpoch>,
    }

    impl TestRuntime {
        fn respond(&mut self, epoch: FetchEpoch, outcome: Result<CallsPage, FetchFailure>) {
            let index = self
                .pending
                .iter()
                .position(|(request, _)| request.epoch == epoch)
                .expect("pending request for epoch");
            let (request, tx) = self.pending.remove(index);
            tx.send(InternalEvent::Fetch(FetchEvent {
                epoch: request.epoch,
                outcome,
            }))
            .expect("controller channel open");
        }

        fn latest_epoch(&self) -> FetchEpoch {
            self.pending
                .last()
                .map(|(request, _)| request.epoch)
                .expect("a pending request")
        }

        fn last_query(&self) -> &CallsQuery {
            self.queries.last().expect("a query was issued")
        }
    }

    impl FetchRuntime for TestRuntime {
        fn fetch_calls(
            &mut self,
            _query: &CallsQuery,
            _token: &str,
        ) -> Result<CallsPage, FetchFailure> {
            Err(FetchFailure::Network {
                message: "inline fetch unused".to_owned(),
            })
        }

        fn spawn_fetch(
            &mut self,
            request: FetchRequest,
            tx: Sender<InternalEvent>,
        ) -> anyhow::Result<()> {
            self.queries.push(request.query.clone());
            self.pending.push((request, tx));
            Ok(())
        }

        fn cancel_fetch(&mut self, epoch: FetchEpoch) -> anyhow::Result<()> {
            self.cancelled.push(epoch);
            Ok(())
        }
    }

    #[derive(Default)]
    struct InlineRuntime {
        outcomes: VecDeque<Result<CallsPage, FetchFailure>>,
        queries: Vec<CallsQuery>,
    }

    impl FetchRuntime for InlineRuntime {
        fn fetch_calls(
            &mut self,
            query: &CallsQuery,
            _token: &str,
        ) -> Result<CallsPage, FetchFailure> {
            self.queries.push(query.clone());
            self.outcomes.pop_front().unwrap_or(Err(FetchFailure::Network {
                message: "no scripted outcome".to_owned(),
            }))
        }
    }

    fn today() -> Date {
        Date::from_calendar_date(2026, Month::April, 1).expect("valid date")
    }

    fn controller() -> ViewController<MemorySession> {
        controller_with_delay(Duration::from_millis(50))
    }

    fn controller_with_delay(redirect_delay: Duration) -> ViewController<MemorySession> {
        ViewController::new(
            MemorySession::new("token-1", Some("admin")),
            today(),
            ViewOptions {
                redirect_delay,
                ..ViewOptions::default()
            },
        )
    }

    fn call(id: i64, number: &str, stages: &[(u32, &str)]) -> Call {
        Call {
            id: CallId::new(id),
            number: number.to_owned(),
            stages: stages
                .iter()
                .map(|(stage, category)| StageEntry {
                    stage: *stage,
                    category: (*category).to_owned(),
                    category_color: None,
                    transcription: None,
                    voice: None,
                })
                .collect(),
            first_timestamp: None,
        }
    }

    fn page(client: &str, calls: Vec<Call>, total_records: u64) -> CallsPage {
        CallsPage {
            client_name: client.to_owned(),
            campaign: CampaignInfo {
                name: "Spring".to_owned(),
                model: "v2".to_owned(),
            },
            total_calls: total_records,
            calls,
            all_categories: vec![
                Category {
                    name: "B".to_owned(),
                    color: "#0000ff".to_owned(),
                    stage_counts: vec![StageCount {
                        stage: 1,
                        count: 10,
                        transferred_count: 0,
                    }],
                },
                Category {
                    name: "A".to_owned(),
                    color: "#ff0000".to_owned(),
                    stage_counts: vec![StageCount {
                        stage: 1,
                        count: 30,
                        transferred_count: 4,
                    }],
                },
            ],
            pagination: PageTotals {
                total_records,
                total_pages: total_records.div_ceil(20),
            },
        }
    }

    fn simple_page(client: &str, total_records: u64) -> CallsPage {
        page(client, vec![call(1, "555-0001", &[(1, "A")])], total_records)
    }

    fn client_name(view: &ViewController<MemorySession>) -> Option<&str> {
        view.state().data.map(|data| data.client_name.as_str())
    }

    fn mounted_with(total_records: u64) -> (ViewController<MemorySession>, TestRuntime) {
        let mut view = controller();
        let mut runtime = TestRuntime::default();
        view.mount(&mut runtime);
        let epoch = runtime.latest_epoch();
        runtime.respond(epoch, Ok(simple_page("initial", total_records)));
        view.pump(&mut runtime);
        (view, runtime)
    }

    #[test]
    fn mount_fetches_first_page_with_default_filters() {
        let mut view = controller();
        let mut runtime = TestRuntime::default();

        let events = view.mount(&mut runtime);
        assert!(matches!(events.as_slice(), [ViewEvent::FetchStarted(_)]));
        assert!(view.state().loading);

        let query = runtime.last_query();
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 20);
        assert_eq!(query.start_date, Some(today()));
        assert_eq!(query.sort_order, SortDirection::Desc);
        assert!(query.stage_filters.is_empty());

        let epoch = runtime.latest_epoch();
        runtime.respond(epoch, Ok(simple_page("acme", 1)));
        let events = view.pump(&mut runtime);
        assert_eq!(
            events,
            vec![
                ViewEvent::DataReplaced { epoch, records: 1 },
                ViewEvent::ColumnsChanged(vec![1]),
            ]
        );
        assert!(!view.state().loading);
        assert_eq!(client_name(&view), Some("acme"));
        assert_eq!(view.fetch_phase(), FetchPhase::Accepted(epoch));
    }

    #[test]
    fn late_response_for_superseded_page_never_wins() {
        let (mut view, mut runtime) = mounted_with(100);

        view.dispatch(ViewCommand::Refresh, &mut runtime);
        let page_one = runtime.latest_epoch();
        let events = view.dispatch(ViewCommand::NextPage, &mut runtime);
        let page_two = runtime.latest_epoch();
        assert!(events.contains(&ViewEvent::FetchAborted(page_one)));
        assert!(events.contains(&ViewEvent::PageChanged(2)));
        assert_eq!(runtime.cancelled, vec![page_one]);
        assert_eq!(runtime.last_query().page, 2);

        runtime.respond(page_two, Ok(simple_page("page-two", 100)));
        view.pump(&mut runtime);
        runtime.respond(page_one, Ok(simple_page("page-one", 100)));
        let late = view.pump(&mut runtime);

        assert!(late.is_empty());
        assert_eq!(client_name(&view), Some("page-two"));
        assert_eq!(view.pagination().page(), 2);
        assert!(!view.state().loading);
    }

    #[test]
    fn stale_failure_does_not_touch_error_or_loading() {
        let (mut view, mut runtime) = mounted_with(10);

        view.dispatch(ViewCommand::Refresh, &mut runtime);
        let first = runtime.latest_epoch();
        view.dispatch(ViewCommand::ToggleSortOrder, &mut runtime);
        let second = runtime.latest_epoch();

        runtime.respond(
            first,
            Err(FetchFailure::ServerError {
                status: 500,
                detail: None,
            }),
        );
        assert!(view.pump(&mut runtime).is_empty());
        assert!(view.state().error.is_none());
        assert!(view.state().loading);

        runtime.respond(second, Ok(simple_page("sorted", 10)));
        view.pump(&mut runtime);
        assert_eq!(client_name(&view), Some("sorted"));
    }

    #[test]
    fn filter_edits_wait_for_apply() {
        let (mut view, mut runtime) = mounted_with(100);
        let issued = runtime.queries.len();

        let events = view.dispatch(
            ViewCommand::Edit(FilterEdit::ToggleCategory {
                stage: 2,
                category: "Interested".to_owned(),
            }),
            &mut runtime,
        );
        assert_eq!(events, vec![ViewEvent::FiltersEdited]);
        assert_eq!(runtime.queries.len(), issued);
        assert!(view.pending_filters().is_selected(2, "Interested"));
        assert!(!view.applied_filters().is_selected(2, "Interested"));

        view.dispatch(ViewCommand::NextPage, &mut runtime);
        assert!(runtime.last_query().stage_filters.is_empty());
        assert_eq!(runtime.last_query().page, 2);

        view.dispatch(ViewCommand::ApplyFilters, &mut runtime);
        let query = runtime.last_query();
        assert_eq!(query.page, 1);
        assert_eq!(query.stage_filters.len(), 1);
        assert_eq!(query.stage_filters[0].stage, 2);
        assert_eq!(view.pagination().page(), 1);
    }

    #[test]
    fn filtered_stage_column_stays_visible() {
        let mut view = controller();
        let mut runtime = TestRuntime::default();
        view.mount(&mut runtime);
        view.dispatch(
            ViewCommand::Edit(FilterEdit::ToggleCategory {
                stage: 2,
                category: "Interested".to_owned(),
            }),
            &mut runtime,
        );
        view.dispatch(ViewCommand::ApplyFilters, &mut runtime);

        let epoch = runtime.latest_epoch();
        runtime.respond(
            epoch,
            Ok(page(
                "acme",
                vec![call(1, "555-0001", &[(1, "A")]), call(2, "555-0002", &[(1, "B")])],
                2,
            )),
        );
        view.pump(&mut runtime);
        assert_eq!(view.columns(), &[1, 2]);

        let shares = view.all_stage_shares();
        assert_eq!(shares.len(), 2);
        let stage_one: Vec<(&str, u32)> = shares[0]
            .1
            .iter()
            .map(|share| (share.name.as_str(), share.percentage))
            .collect();
        assert_eq!(stage_one, vec![("A", 75), ("B", 25)]);
        assert!(shares[1].1.is_empty());
    }

    #[test]
    fn failure_keeps_prior_dataset() {
        let (mut view, mut runtime) = mounted_with(5);

        view.dispatch(ViewCommand::Refresh, &mut runtime);
        let epoch = runtime.latest_epoch();
        runtime.respond(
            epoch,
            Err(FetchFailure::ServerError {
                status: 500,
                detail: None,
            }),
        );
        let events = view.pump(&mut runtime);
        assert!(matches!(events.as_slice(), [ViewEvent::FetchFailed(_)]));

        let state = view.state();
        assert_eq!(state.error, Some("server error (500); try again later"));
        assert_eq!(client_name(&view), Some("initial"));
        assert!(!state.is_error_only());
    }

    #[test]
    fn failure_without_data_is_error_only() {
        let mut view = controller();
        let mut runtime = TestRuntime::default();
        view.mount(&mut runtime);
        let epoch = runtime.latest_epoch();
        runtime.respond(
            epoch,
            Err(FetchFailure::ClientError {
                status: 404,
                message: "campaign not found".to_owned(),
            }),
        );
        view.pump(&mut runtime);

        let state = view.state();
        assert!(state.is_error_only());
        assert_eq!(state.error, Some("campaign not found"));
    }

    #[test]
    fn success_clears_error_banner() {
        let mut view = controller();
        let mut runtime = InlineRuntime::default();
        runtime.outcomes.push_back(Err(FetchFailure::Network {
            message: "refused".to_owned(),
        }));
        runtime.outcomes.push_back(Ok(simple_page("recovered", 1)));

        view.mount(&mut runtime);
        view.pump(&mut runtime);
        assert!(view.state().error.is_some());

        view.dispatch(ViewCommand::Refresh, &mut runtime);
        view.pump(&mut runtime);
        assert!(view.state().error.is_none());
        assert_eq!(client_name(&view), Some("recovered"));
        assert_eq!(runtime.queries.len(), 2);
    }

    #[test]
    fn unauthorized_clears_session_and_schedules_redirect() {
        let (mut view, mut runtime) = mounted_with(5);

        view.dispatch(ViewCommand::Refresh, &mut runtime);
        let epoch = runtime.latest_epoch();
        runtime.respond(epoch, Err(FetchFailure::Unauthorized { status: Some(401) }));
        let events = view.pump(&mut runtime);
        assert_eq!(
            events,
            vec![
                ViewEvent::FetchFailed(FetchFailure::Unauthorized { status: Some(401) }),
                ViewEvent::SessionExpired,
                ViewEvent::RedirectScheduled(Duration::from_millis(50)),
            ]
        );
        assert!(view.session().token().is_none());
        assert!(view.is_session_expired());
        assert!(view.state().is_error_only());

        let due = view.wait(&mut runtime, Duration::from_secs(5));
        assert_eq!(due, vec![ViewEvent::RedirectDue]);
        assert!(view.redirect_due());

        let issued = runtime.queries.len();
        assert!(view.dispatch(ViewCommand::Refresh, &mut runtime).is_empty());
        assert_eq!(runtime.queries.len(), issued);
    }

    #[test]
    fn missing_token_fails_without_issuing_request() {
        let mut view = ViewController::new(
            MemorySession::signed_out(),
            today(),
            ViewOptions {
                redirect_delay: Duration::from_secs(60),
                ..ViewOptions::default()
            },
        );
        let mut runtime = TestRuntime::default();
        let events = view.mount(&mut runtime);

        assert!(runtime.queries.is_empty());
        assert!(events.contains(&ViewEvent::SessionExpired));
        assert!(!view.state().loading);
        assert!(!view.redirect_due());
    }

    #[test]
    fn unmount_cancels_in_flight_and_ignores_late_delivery() {
        let (mut view, mut runtime) = mounted_with(5);
        view.dispatch(ViewCommand::Refresh, &mut runtime);
        let epoch = runtime.latest_epoch();

        let events = view.dispatch(ViewCommand::Unmount, &mut runtime);
        assert_eq!(events, vec![ViewEvent::FetchAborted(epoch), ViewEvent::Unmounted]);
        assert_eq!(runtime.cancelled, vec![epoch]);

        runtime.respond(epoch, Ok(simple_page("late", 5)));
        assert!(view.pump(&mut runtime).is_empty());
        assert_eq!(client_name(&view), Some("initial"));
        assert!(!view.is_mounted());
        assert!(view.dispatch(ViewCommand::Refresh, &mut runtime).is_empty());
    }

    #[test]
    fn unmount_drops_scheduled_redirect() {
        let (mut view, mut runtime) = mounted_with(5);
        view.dispatch(ViewCommand::Refresh, &mut runtime);
        let epoch = runtime.latest_epoch();
        runtime.respond(epoch, Err(FetchFailure::Unauthorized { status: Some(403) }));
        let events = view.pump(&mut runtime);
        assert!(events.contains(&ViewEvent::RedirectScheduled(Duration::from_millis(50))));

        let events = view.dispatch(ViewCommand::Unmount, &mut runtime);
        assert_eq!(events, vec![ViewEvent::Unmounted]);

        let late = view.wait(&mut runtime, Duration::from_millis(300));
        assert!(late.is_empty());
        assert!(!view.redirect_due());
    }

    #[test]
    fn sort_order_toggle_keeps_page_and_refetches() {
        let (mut view, mut runtime) = mounted_with(100);
        view.dispatch(ViewCommand::GoToPage(3), &mut runtime);
        let epoch = runtime.latest_epoch();
        runtime.respond(epoch, Ok(simple_page("third", 100)));
        view.pump(&mut runtime);

        let events = view.dispatch(ViewCommand::ToggleSortOrder, &mut runtime);
        assert_eq!(events[0], ViewEvent::SortOrderChanged(SortDirection::Asc));
        assert_eq!(view.pagination().page(), 3);
        assert_eq!(runtime.last_query().page, 3);
        assert_eq!(runtime.last_query().sort_order, SortDirection::Asc);
    }

    #[test]
    fn column_sort_reorders_rows_without_fetching() {
        let mut view = controller();
        let mut runtime = TestRuntime::default();
        view.mount(&mut runtime);
        let epoch = runtime.latest_epoch();
        runtime.respond(
            epoch,
            Ok(page(
                "acme",
                vec![
                    call(1, "555-0300", &[]),
                    call(2, "555-0100", &[]),
                    call(3, "555-0200", &[]),
                ],
                3,
            )),
        );
        view.pump(&mut runtime);
        let issued = runtime.queries.len();

        view.dispatch(ViewCommand::SortBy(CallSortKey::Number), &mut runtime);
        let order: Vec<i64> = view.rows().iter().map(|row| row.id.get()).collect();
        assert_eq!(order, vec![2, 3, 1]);

        view.dispatch(ViewCommand::SortBy(CallSortKey::Number), &mut runtime);
        let order: Vec<i64> = view.rows().iter().map(|row| row.id.get()).collect();
        assert_eq!(order, vec![1, 3, 2]);

        view.dispatch(ViewCommand::ClearSort, &mut runtime);
        let order: Vec<i64> = view.rows().iter().map(|row| row.id.get()).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(runtime.queries.len(), issued);
    }

    #[test]
    fn reset_restores_defaults() {
        let (mut view, mut runtime) = mounted_with(100);
        view.dispatch(
            ViewCommand::Edit(FilterEdit::SetFreeText("bob".to_owned())),
            &mut runtime,
        );
        view.dispatch(ViewCommand::ApplyFilters, &mut runtime);
        view.dispatch(ViewCommand::GoToPage(4), &mut runtime);
        view.dispatch(ViewCommand::ToggleSortOrder, &mut runtime);

        let events = view.dispatch(ViewCommand::ResetFilters, &mut runtime);
        assert!(events.contains(&ViewEvent::FiltersReset));
        assert_eq!(view.pagination().page(), 1);
        assert_eq!(view.applied_filters(), view.pending_filters());
        assert_eq!(view.applied_filters().free_text(), "");
        assert_eq!(view.sort_order(), SortDirection::Desc);
        let query = runtime.last_query();
        assert_eq!(query.search, None);
        assert_eq!(query.start_date, Some(today()));
    }

    #[test]
    fn reset_supersedes_in_flight_fetch() {
        let (mut view, mut runtime) = mounted_with(5);
        view.dispatch(ViewCommand::Refresh, &mut runtime);
        let superseded = runtime.latest_epoch();

        let events = view.dispatch(ViewCommand::ResetFilters, &mut runtime);
        let current = runtime.latest_epoch();
        assert!(events.contains(&ViewEvent::FetchAborted(superseded)));
        assert!(events.contains(&ViewEvent::FetchStarted(current)));
        assert_eq!(runtime.cancelled, vec![superseded]);

        runtime.respond(superseded, Ok(simple_page("stale", 5)));
        assert!(view.pump(&mut runtime).is_empty());
        assert_eq!(client_name(&view), Some("initial"));
        assert!(view.state().loading);

        runtime.respond(current, Ok(simple_page("reset", 5)));
        view.pump(&mut runtime);
        assert_eq!(client_name(&view), Some("reset"));
        assert!(!view.state().loading);
    }

    #[test]
    fn shrinking_totals_clamp_page_and_refetch() {
        let (mut view, mut runtime) = mounted_with(60);
        view.dispatch(ViewCommand::GoToPage(3), &mut runtime);
        let epoch = runtime.latest_epoch();
        runtime.respond(epoch, Ok(simple_page("shrunk", 25)));
        let events = view.pump(&mut runtime);

        assert!(events.contains(&ViewEvent::PageChanged(2)));
        assert_eq!(view.pagination().page(), 2);
        assert!(view.state().loading);
        assert_eq!(runtime.last_query().page, 2);
    }

    #[test]
    fn unchanged_page_issues_no_fetch() {
        let (mut view, mut runtime) = mounted_with(5);
        let issued = runtime.queries.len();
        assert!(view.dispatch(ViewCommand::PrevPage, &mut runtime).is_empty());
        assert!(view.dispatch(ViewCommand::GoToPage(1), &mut runtime).is_empty());
        assert_eq!(runtime.queries.len(), issued);
    }
}
