// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Call, StageEntry, StageNumber};

/// Stage columns to render for a page of calls.
///
/// The range always runs contiguously from 0 (when stage 0 is referenced by
/// a record or a filter) or 1 up to the highest referenced stage. A stage
/// with an active filter stays visible even when no record on the page
/// reached it.
pub fn infer_columns<I>(calls: &[Call], filtered_stages: I) -> Vec<StageNumber>
where
    I: IntoIterator<Item = StageNumber>,
{
    let record_stages = calls
        .iter()
        .flat_map(|call| call.stages.iter().map(|entry| entry.stage));

    let mut max_stage: Option<StageNumber> = None;
    let mut saw_zero = false;
    for stage in record_stages.chain(filtered_stages) {
        saw_zero |= stage == 0;
        max_stage = Some(max_stage.map_or(stage, |max| max.max(stage)));
    }

    let Some(max_stage) = max_stage else {
        return Vec::new();
    };
    let start = if saw_zero { 0 } else { 1 };
    (start..=max_stage).collect()
}

pub fn stage_cells<'a>(call: &'a Call, columns: &[StageNumber]) -> Vec<Option<&'a StageEntry>> {
    columns.iter().map(|stage| call.stage(*stage)).collect()
}

pub fn stage_label(stage: StageNumber) -> String {
    format!("Stage {stage}")
}
