// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::Serialize;

use crate::{Category, StageNumber};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryShare {
    pub name: String,
    pub color: String,
    pub count: u64,
    pub percentage: u32,
}

pub fn stage_total(catalog: &[Category], stage: StageNumber) -> u64 {
    catalog
        .iter()
        .map(|category| category.count_for(stage))
        .sum()
}

/// Distribution of catalog categories for one stage, by descending share.
///
/// Counts come from the server catalog, so shares cover the whole filtered
/// dataset rather than the visible page. Ties keep catalog order.
pub fn aggregate(catalog: &[Category], stage: StageNumber) -> Vec<CategoryShare> {
    let total = stage_total(catalog, stage);
    let mut shares: Vec<CategoryShare> = catalog
        .iter()
        .filter_map(|category| {
            let count = category.count_for(stage);
            (count > 0).then(|| CategoryShare {
                name: category.name.clone(),
                color: category.color.clone(),
                count,
                percentage: rounded_percentage(count, total),
            })
        })
        .collect();
    shares.sort_by(|left, right| right.percentage.cmp(&left.percentage));
    shares
}

// Half-up rounding of count / total * 100.
fn rounded_percentage(count: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let scaled = (u128::from(count) * 200 + u128::from(total)) / (u128::from(total) * 2);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}
