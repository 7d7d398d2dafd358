// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use time::macros::format_description;
use time::{Date, Time};

use crate::{SortDirection, StageNumber};

pub const DATE_LAYOUT: &str = "YYYY-MM-DD";
pub const TIME_LAYOUT: &str = "HH:MM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BooleanFilter {
    WithTranscription,
    WithVoice,
}

impl BooleanFilter {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WithTranscription => "with_transcription",
            Self::WithVoice => "with_voice",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "with_transcription" | "transcribed" => Some(Self::WithTranscription),
            "with_voice" | "voiced" => Some(Self::WithVoice),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: Option<Date>,
    pub start_time: Option<Time>,
    pub end_date: Option<Date>,
    pub end_time: Option<Time>,
}

/// The union of active filter criteria.
///
/// A categorical key is present only while it holds at least one value, so
/// two sets that select the same categories always compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    free_text: String,
    date_range: DateRange,
    categorical: BTreeMap<StageNumber, BTreeSet<String>>,
    flags: BTreeSet<BooleanFilter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEdit {
    SetFreeText(String),
    SetStartDate(Option<Date>),
    SetStartTime(Option<Time>),
    SetEndDate(Option<Date>),
    SetEndTime(Option<Time>),
    ToggleCategory {
        stage: StageNumber,
        category: String,
    },
    ClearStage(StageNumber),
    ToggleFlag(BooleanFilter),
}

impl FilterEdit {
    pub fn start_date(raw: &str) -> Result<Self> {
        Ok(Self::SetStartDate(parse_date_input(raw)?))
    }

    pub fn start_time(raw: &str) -> Result<Self> {
        Ok(Self::SetStartTime(parse_time_input(raw)?))
    }

    pub fn end_date(raw: &str) -> Result<Self> {
        Ok(Self::SetEndDate(parse_date_input(raw)?))
    }

    pub fn end_time(raw: &str) -> Result<Self> {
        Ok(Self::SetEndTime(parse_time_input(raw)?))
    }
}

impl FilterSet {
    /// Filters a freshly mounted view starts with: today as the start date.
    pub fn defaults(today: Date) -> Self {
        Self {
            date_range: DateRange {
                start_date: Some(today),
                ..DateRange::default()
            },
            ..Self::default()
        }
    }

    pub fn free_text(&self) -> &str {
        &self.free_text
    }

    pub fn date_range(&self) -> &DateRange {
        &self.date_range
    }

    pub fn categorical(&self) -> &BTreeMap<StageNumber, BTreeSet<String>> {
        &self.categorical
    }

    pub fn flags(&self) -> &BTreeSet<BooleanFilter> {
        &self.flags
    }

    pub fn is_selected(&self, stage: StageNumber, category: &str) -> bool {
        self.categorical
            .get(&stage)
            .is_some_and(|values| values.contains(category))
    }

    pub fn referenced_stages(&self) -> impl Iterator<Item = StageNumber> + '_ {
        self.categorical.keys().copied()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.free_text.trim().is_empty()
            && self.date_range == DateRange::default()
            && self.categorical.is_empty()
            && self.flags.is_empty()
    }

    pub fn apply(&self, edit: FilterEdit) -> Self {
        let mut next = self.clone();
        match edit {
            FilterEdit::SetFreeText(text) => next.free_text = text,
            FilterEdit::SetStartDate(date) => next.date_range.start_date = date,
            FilterEdit::SetStartTime(time) => next.date_range.start_time = time,
            FilterEdit::SetEndDate(date) => next.date_range.end_date = date,
            FilterEdit::SetEndTime(time) => next.date_range.end_time = time,
            FilterEdit::ToggleCategory { stage, category } => {
                let values = next.categorical.entry(stage).or_default();
                if !values.remove(&category) {
                    values.insert(category);
                }
                if values.is_empty() {
                    next.categorical.remove(&stage);
                }
            }
            FilterEdit::ClearStage(stage) => {
                next.categorical.remove(&stage);
            }
            FilterEdit::ToggleFlag(flag) => {
                if !next.flags.remove(&flag) {
                    next.flags.insert(flag);
                }
            }
        }
        next
    }
}

pub fn apply(current: &FilterSet, edit: FilterEdit) -> FilterSet {
    current.apply(edit)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFilter {
    pub stage: StageNumber,
    pub categories: Vec<String>,
}

/// Transport parameters for one calls request. Empty filter fields are
/// `None` or empty and never reach the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallsQuery {
    pub search: Option<String>,
    pub start_date: Option<Date>,
    pub start_time: Option<Time>,
    pub end_date: Option<Date>,
    pub end_time: Option<Time>,
    pub page: u32,
    pub page_size: u32,
    pub sort_order: SortDirection,
    pub stage_filters: Vec<StageFilter>,
    pub flags: Vec<BooleanFilter>,
}

impl CallsQuery {
    pub fn build(
        filters: &FilterSet,
        page: u32,
        page_size: u32,
        sort_order: SortDirection,
    ) -> Self {
        let search = filters.free_text.trim();
        Self {
            search: (!search.is_empty()).then(|| search.to_owned()),
            start_date: filters.date_range.start_date,
            start_time: filters.date_range.start_time,
            end_date: filters.date_range.end_date,
            end_time: filters.date_range.end_time,
            page,
            page_size,
            sort_order,
            stage_filters: filters
                .categorical
                .iter()
                .map(|(stage, values)| StageFilter {
                    stage: *stage,
                    categories: values.iter().cloned().collect(),
                })
                .collect(),
            flags: filters.flags.iter().copied().collect(),
        }
    }

    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(date) = self.start_date {
            pairs.push(("start_date", format_date(date)));
        }
        if let Some(time) = self.start_time {
            pairs.push(("start_time", format_time(time)));
        }
        if let Some(date) = self.end_date {
            pairs.push(("end_date", format_date(date)));
        }
        if let Some(time) = self.end_time {
            pairs.push(("end_time", format_time(time)));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("page_size", self.page_size.to_string()));
        pairs.push(("sort_order", self.sort_order.as_str().to_owned()));
        if !self.stage_filters.is_empty() {
            let encoded = serde_json::Value::Array(
                self.stage_filters
                    .iter()
                    .map(|filter| {
                        serde_json::json!({
                            "stage": filter.stage,
                            "categories": filter.categories,
                        })
                    })
                    .collect(),
            );
            pairs.push(("stage_filters", encoded.to_string()));
        }
        if !self.flags.is_empty() {
            let flags = self
                .flags
                .iter()
                .map(|flag| flag.as_str())
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("flags", flags));
        }
        pairs
    }
}

pub fn parse_date_input(raw: &str) -> Result<Option<Date>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .map(Some)
        .with_context(|| format!("invalid date {trimmed:?}; use {DATE_LAYOUT}"))
}

pub fn parse_time_input(raw: &str) -> Result<Option<Time>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Time::parse(trimmed, format_description!("[hour]:[minute]"))
        .map(Some)
        .with_context(|| format!("invalid time {trimmed:?}; use {TIME_LAYOUT}"))
}

pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

pub fn format_time(time: Time) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}
