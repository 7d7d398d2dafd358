// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::*;

pub type StageNumber = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEntry {
    pub stage: StageNumber,
    pub category: String,
    #[serde(default)]
    pub category_color: Option<String>,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub id: CallId,
    pub number: String,
    #[serde(default)]
    pub stages: Vec<StageEntry>,
    #[serde(default)]
    pub first_timestamp: Option<String>,
}

impl Call {
    pub fn stage(&self, stage: StageNumber) -> Option<&StageEntry> {
        self.stages.iter().find(|entry| entry.stage == stage)
    }

    pub fn has_transcription(&self) -> bool {
        self.stages.iter().any(|entry| {
            entry
                .transcription
                .as_deref()
                .is_some_and(|text| !text.trim().is_empty())
        })
    }

    pub fn has_voice(&self) -> bool {
        self.stages.iter().any(|entry| {
            entry
                .voice
                .as_deref()
                .is_some_and(|voice| !voice.trim().is_empty())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCount {
    pub stage: StageNumber,
    pub count: u64,
    #[serde(default)]
    pub transferred_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub stage_counts: Vec<StageCount>,
}

impl Category {
    pub fn count_for(&self, stage: StageNumber) -> u64 {
        self.stage_counts
            .iter()
            .find(|entry| entry.stage == stage)
            .map_or(0, |entry| entry.count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CampaignInfo {
    pub name: String,
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PageTotals {
    pub total_records: u64,
    #[serde(default)]
    pub total_pages: u64,
}

/// One accepted response of the calls endpoint. Replaced wholesale on every
/// accepted fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallsPage {
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub campaign: CampaignInfo,
    #[serde(default)]
    pub total_calls: u64,
    #[serde(default)]
    pub calls: Vec<Call>,
    #[serde(default)]
    pub all_categories: Vec<Category>,
    #[serde(default)]
    pub pagination: PageTotals,
}

impl CallsPage {
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.all_categories
            .iter()
            .find(|category| category.name == name)
    }

    /// Entry color when the record carries one, otherwise the catalog color.
    pub fn entry_color<'a>(&'a self, entry: &'a StageEntry) -> Option<&'a str> {
        if let Some(color) = entry.category_color.as_deref()
            && !color.is_empty()
        {
            return Some(color);
        }
        self.category(&entry.category)
            .map(|category| category.color.as_str())
            .filter(|color| !color.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub id: CampaignId,
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub live_calls: u64,
    #[serde(default)]
    pub total_calls: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSortKey {
    Id,
    Number,
    FirstTimestamp,
    Stage(StageNumber),
}

impl CallSortKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "id" => Some(Self::Id),
            "number" => Some(Self::Number),
            "time" | "first_timestamp" => Some(Self::FirstTimestamp),
            other => other
                .strip_prefix("stage")
                .and_then(|stage| stage.trim_start_matches([':', '-']).parse().ok())
                .map(Self::Stage),
        }
    }

    pub fn label(self) -> String {
        match self {
            Self::Id => "id".to_owned(),
            Self::Number => "number".to_owned(),
            Self::FirstTimestamp => "time".to_owned(),
            Self::Stage(stage) => format!("stage {stage}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignSortKey {
    Name,
    Model,
    Status,
    LiveCalls,
    TotalCalls,
}

impl CampaignSortKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "name" => Some(Self::Name),
            "model" => Some(Self::Model),
            "status" => Some(Self::Status),
            "live" | "live_calls" => Some(Self::LiveCalls),
            "total" | "total_calls" => Some(Self::TotalCalls),
            _ => None,
        }
    }
}
