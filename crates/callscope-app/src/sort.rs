// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::borrow::Cow;
use std::cmp::Ordering;

use crate::{Call, CallSortKey, CampaignSortKey, CampaignSummary, SortDirection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortValue {
    Missing,
    Text(String),
    Number(i64),
}

impl SortValue {
    fn from_count(count: u64) -> Self {
        Self::Number(i64::try_from(count).unwrap_or(i64::MAX))
    }

    fn from_optional_text(value: Option<&str>) -> Self {
        value.map_or(Self::Missing, |text| Self::Text(text.to_owned()))
    }

    fn normalized_text(&self) -> Cow<'_, str> {
        match self {
            Self::Missing => Cow::Borrowed(""),
            Self::Text(value) => Cow::Owned(value.to_lowercase()),
            Self::Number(value) => Cow::Owned(value.to_string()),
        }
    }

    pub fn cmp_value(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(left), Self::Number(right)) => left.cmp(right),
            _ => self.normalized_text().cmp(&other.normalized_text()),
        }
    }
}

pub trait Sortable {
    type Key: Copy + Eq;

    fn sort_value(&self, key: Self::Key) -> SortValue;
}

impl Sortable for Call {
    type Key = CallSortKey;

    fn sort_value(&self, key: CallSortKey) -> SortValue {
        match key {
            CallSortKey::Id => SortValue::Number(self.id.get()),
            CallSortKey::Number => SortValue::Text(self.number.clone()),
            CallSortKey::FirstTimestamp => {
                SortValue::from_optional_text(self.first_timestamp.as_deref())
            }
            CallSortKey::Stage(stage) => SortValue::from_optional_text(
                self.stage(stage).map(|entry| entry.category.as_str()),
            ),
        }
    }
}

impl Sortable for CampaignSummary {
    type Key = CampaignSortKey;

    fn sort_value(&self, key: CampaignSortKey) -> SortValue {
        match key {
            CampaignSortKey::Name => SortValue::Text(self.name.clone()),
            CampaignSortKey::Model => SortValue::Text(self.model.clone()),
            CampaignSortKey::Status => {
                SortValue::Text(if self.is_active { "active" } else { "inactive" }.to_owned())
            }
            // Inactive campaigns rank as having no live calls.
            CampaignSortKey::LiveCalls => {
                SortValue::from_count(if self.is_active { self.live_calls } else { 0 })
            }
            CampaignSortKey::TotalCalls => SortValue::from_count(self.total_calls),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<K> {
    key: Option<K>,
    direction: SortDirection,
}

impl<K> Default for SortState<K> {
    fn default() -> Self {
        Self {
            key: None,
            direction: SortDirection::Asc,
        }
    }
}

impl<K: Copy + Eq> SortState<K> {
    pub fn by(key: K, direction: SortDirection) -> Self {
        Self {
            key: Some(key),
            direction,
        }
    }

    pub fn key(&self) -> Option<K> {
        self.key
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Same key flips direction; a new key starts ascending.
    pub fn toggle(&mut self, key: K) {
        if self.key == Some(key) {
            self.direction = self.direction.flipped();
        } else {
            self.key = Some(key);
            self.direction = SortDirection::Asc;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

pub fn sort<'a, T: Sortable>(records: &'a [T], state: &SortState<T::Key>) -> Vec<&'a T> {
    let mut ordered: Vec<&T> = records.iter().collect();
    let Some(key) = state.key else {
        return ordered;
    };

    ordered.sort_by(|left, right| {
        let order = left.sort_value(key).cmp_value(&right.sort_value(key));
        match state.direction {
            SortDirection::Asc => order,
            SortDirection::Desc => order.reverse(),
        }
    });
    ordered
}
