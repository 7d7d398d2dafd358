// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use callscope_app::{
    Call, CallId, CallsPage, CallsQuery, CampaignId, CampaignInfo, CampaignSummary, Category,
    FetchEpoch, FetchEvent, FetchFailure, FetchRequest, FetchRuntime, InternalEvent, PageTotals,
    StageCount, StageEntry, StageNumber,
};
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use time::{Date, Month};

const CATEGORIES: [(&str, &str); 6] = [
    ("Interested", "#2e7d32"),
    ("Not Interested", "#c62828"),
    ("Voicemail", "#6a1b9a"),
    ("Busy", "#f9a825"),
    ("Callback", "#1565c0"),
    ("Wrong Number", "#6d4c41"),
];

const CAMPAIGN_NAMES: [&str; 8] = [
    "Spring Renewals",
    "Winback",
    "Solar Leads",
    "Insurance Q3",
    "Member Survey",
    "Debt Relief",
    "Medicare Outreach",
    "Home Warranty",
];

const MODELS: [&str; 4] = ["v1", "v2", "v2-fast", "v3-beta"];

const CLIENTS: [&str; 5] = ["Acme", "Northwind", "Globex", "Initech", "Umbrella"];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator for call records whose catalog counts agree with the
/// generated calls.
#[derive(Debug, Clone)]
pub struct CallFaker {
    rng: DeterministicRng,
    next_id: i64,
}

impl CallFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_id: 1,
        }
    }

    pub fn call(&mut self) -> Call {
        let id = self.next_id;
        self.next_id += 1;

        let depth = 1 + self.rng.int_n(3);
        let stages = (1..=depth)
            .map(|stage| {
                let (category, _) = CATEGORIES[self.rng.int_n(CATEGORIES.len())];
                StageEntry {
                    stage: u32::try_from(stage).unwrap_or(1),
                    category: category.to_owned(),
                    category_color: None,
                    transcription: self
                        .rng
                        .bool()
                        .then(|| format!("stage {stage} transcript")),
                    voice: self.rng.bool().then(|| format!("voice-{id}-{stage}.wav")),
                }
            })
            .collect();

        Call {
            id: CallId::new(id),
            number: format!("555-{:04}", self.rng.int_n(10_000)),
            stages,
            first_timestamp: Some(format!(
                "2026-04-01 {:02}:{:02}:00",
                8 + self.rng.int_n(10),
                self.rng.int_n(60)
            )),
        }
    }

    pub fn calls(&mut self, count: usize) -> Vec<Call> {
        (0..count).map(|_| self.call()).collect()
    }

    pub fn campaign(&mut self, id: i64) -> CampaignSummary {
        let is_active = self.rng.bool();
        let total_calls = 50 + self.rng.int_n(5_000) as u64;
        CampaignSummary {
            id: CampaignId::new(id),
            name: CAMPAIGN_NAMES[self.rng.int_n(CAMPAIGN_NAMES.len())].to_owned(),
            model: MODELS[self.rng.int_n(MODELS.len())].to_owned(),
            is_active,
            live_calls: self.rng.int_n(40) as u64,
            total_calls,
        }
    }

    /// One page cut from `calls`, with a catalog counted over all of them.
    pub fn page(&mut self, calls: &[Call], page: u32, page_size: u32) -> CallsPage {
        let size = page_size.max(1) as usize;
        let start = (page.max(1) as usize - 1) * size;
        let total_records = calls.len() as u64;
        CallsPage {
            client_name: CLIENTS[self.rng.int_n(CLIENTS.len())].to_owned(),
            campaign: CampaignInfo {
                name: CAMPAIGN_NAMES[self.rng.int_n(CAMPAIGN_NAMES.len())].to_owned(),
                model: MODELS[self.rng.int_n(MODELS.len())].to_owned(),
            },
            total_calls: total_records,
            calls: calls.iter().skip(start).take(size).cloned().collect(),
            all_categories: catalog_for(calls),
            pagination: PageTotals {
                total_records,
                total_pages: total_records.div_ceil(size as u64),
            },
        }
    }
}

/// Catalog whose per-stage counts tally `calls`.
pub fn catalog_for(calls: &[Call]) -> Vec<Category> {
    let mut counts: BTreeMap<&str, BTreeMap<StageNumber, u64>> = BTreeMap::new();
    for entry in calls.iter().flat_map(|call| call.stages.iter()) {
        *counts
            .entry(entry.category.as_str())
            .or_default()
            .entry(entry.stage)
            .or_default() += 1;
    }

    CATEGORIES
        .iter()
        .map(|(name, color)| Category {
            name: (*name).to_owned(),
            color: (*color).to_owned(),
            stage_counts: counts
                .get(name)
                .map(|stages| {
                    stages
                        .iter()
                        .map(|(stage, count)| StageCount {
                            stage: *stage,
                            count: *count,
                            transferred_count: 0,
                        })
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect()
}

pub fn fixture_date() -> Date {
    Date::from_calendar_date(2026, Month::April, 1).expect("valid calendar date")
}

pub fn sample_call(id: i64, number: &str, stages: &[(StageNumber, &str)]) -> Call {
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

/// Two categories on stage 1 splitting 30/10, one on stage 2.
pub fn sample_catalog() -> Vec<Category> {
    vec![
        Category {
            name: "Voicemail".to_owned(),
            color: "#6a1b9a".to_owned(),
            stage_counts: vec![StageCount {
                stage: 1,
                count: 10,
                transferred_count: 0,
            }],
        },
        Category {
            name: "Interested".to_owned(),
            color: "#2e7d32".to_owned(),
            stage_counts: vec![
                StageCount {
                    stage: 1,
                    count: 30,
                    transferred_count: 6,
                },
                StageCount {
                    stage: 2,
                    count: 12,
                    transferred_count: 2,
                },
            ],
        },
        Category {
            name: "Busy".to_owned(),
            color: "#f9a825".to_owned(),
            stage_counts: Vec::new(),
        },
    ]
}

pub fn sample_page(total_records: u64) -> CallsPage {
    CallsPage {
        client_name: "Acme".to_owned(),
        campaign: CampaignInfo {
            name: "Spring Renewals".to_owned(),
            model: "v2".to_owned(),
        },
        total_calls: total_records,
        calls: vec![
            sample_call(1, "555-0100", &[(1, "Interested"), (2, "Interested")]),
            sample_call(2, "555-0101", &[(1, "Voicemail")]),
        ],
        all_categories: sample_catalog(),
        pagination: PageTotals {
            total_records,
            total_pages: total_records.div_ceil(20),
        },
    }
}

pub fn sample_page_json(total_records: u64) -> Result<String> {
    serde_json::to_string(&sample_page(total_records)).context("encode sample page")
}

pub fn sample_campaigns() -> Vec<CampaignSummary> {
    vec![
        CampaignSummary {
            id: CampaignId::new(1),
            name: "Spring Renewals".to_owned(),
            model: "v2".to_owned(),
            is_active: true,
            live_calls: 4,
            total_calls: 1_200,
        },
        CampaignSummary {
            id: CampaignId::new(2),
            name: "Winback".to_owned(),
            model: "v1".to_owned(),
            is_active: false,
            live_calls: 9,
            total_calls: 300,
        },
    ]
}

pub fn sample_campaigns_json() -> Result<String> {
    serde_json::to_string(&sample_campaigns()).context("encode sample campaigns")
}

pub fn temp_file_path(name: &str) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join(name);
    Ok((dir, path))
}

/// Holds every spawned request until the test answers it, in any order.
#[derive(Default)]
pub struct ScriptedRuntime {
    pending: Vec<(FetchRequest, Sender<InternalEvent>)>,
    queries: Vec<CallsQuery>,
    cancelled: Vec<FetchEpoch>,
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queries(&self) -> &[CallsQuery] {
        &self.queries
    }

    pub fn last_query(&self) -> Option<&CallsQuery> {
        self.queries.last()
    }

    pub fn cancelled(&self) -> &[FetchEpoch] {
        &self.cancelled
    }

    pub fn pending_epochs(&self) -> Vec<FetchEpoch> {
        self.pending.iter().map(|(request, _)| request.epoch).collect()
    }

    pub fn latest_epoch(&self) -> Option<FetchEpoch> {
        self.pending.last().map(|(request, _)| request.epoch)
    }

    pub fn respond(
        &mut self,
        epoch: FetchEpoch,
        outcome: Result<CallsPage, FetchFailure>,
    ) -> Result<()> {
        let index = self
            .pending
            .iter()
            .position(|(request, _)| request.epoch == epoch)
            .ok_or_else(|| anyhow!("no pending request for fetch {epoch}"))?;
        let (request, tx) = self.pending.remove(index);
        tx.send(InternalEvent::Fetch(FetchEvent {
            epoch: request.epoch,
            outcome,
        }))
        .map_err(|_| anyhow!("controller channel closed"))
    }
}

impl FetchRuntime for ScriptedRuntime {
    fn fetch_calls(
        &mut self,
        _query: &CallsQuery,
        _token: &str,
    ) -> Result<CallsPage, FetchFailure> {
        Err(FetchFailure::Network {
            message: "scripted runtime answers through respond".to_owned(),
        })
    }

    fn spawn_fetch(&mut self, request: FetchRequest, tx: Sender<InternalEvent>) -> Result<()> {
        self.queries.push(request.query.clone());
        self.pending.push((request, tx));
        Ok(())
    }

    fn cancel_fetch(&mut self, epoch: FetchEpoch) -> Result<()> {
        self.cancelled.push(epoch);
        Ok(())
    }
}

/// Answers inline from a queue of outcomes, in request order.
#[derive(Debug, Default)]
pub struct QueueRuntime {
    outcomes: VecDeque<Result<CallsPage, FetchFailure>>,
    queries: Vec<CallsQuery>,
    tokens: Vec<String>,
}

impl QueueRuntime {
    pub fn new(outcomes: impl IntoIterator<Item = Result<CallsPage, FetchFailure>>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn queries(&self) -> &[CallsQuery] {
        &self.queries
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl FetchRuntime for QueueRuntime {
    fn fetch_calls(&mut self, query: &CallsQuery, token: &str) -> Result<CallsPage, FetchFailure> {
        self.queries.push(query.clone());
        self.tokens.push(token.to_owned());
        self.outcomes.pop_front().unwrap_or(Err(FetchFailure::Network {
            message: "no scripted outcome left".to_owned(),
        }))
    }
}
