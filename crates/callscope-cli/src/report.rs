// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use callscope_app::{
    CallId, CampaignSummary, SessionContext, SortDirection, ViewController, stage_cells,
    stage_label,
};
use std::fmt::Write as _;

pub fn render_view<S: SessionContext>(view: &ViewController<S>) -> String {
    let state = view.state();
    let mut out = String::new();

    if let Some(error) = state.error {
        let _ = writeln!(out, "! {error}");
    }
    let Some(page) = state.data else {
        if state.loading {
            out.push_str("loading...\n");
        } else if state.error.is_none() {
            out.push_str("no data\n");
        }
        return out;
    };

    let mut title = format!("{} - {}", page.client_name, page.campaign.name);
    if !page.campaign.model.is_empty() {
        let _ = write!(title, " ({})", page.campaign.model);
    }
    if let Some(role) = view.role() {
        let _ = write!(title, "  [{role}]");
    }
    let _ = writeln!(out, "{title}");

    let pagination = view.pagination();
    let mut status = format!(
        "{}  page {}/{}  order {}",
        view.window_label(),
        pagination.page(),
        pagination.last_page(),
        view.sort_order().as_str()
    );
    let column_sort = view.column_sort();
    if let Some(key) = column_sort.key() {
        let arrow = match column_sort.direction() {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        let _ = write!(status, "  sort {} {arrow}", key.label());
    }
    if state.loading {
        status.push_str("  (refreshing)");
    }
    let _ = writeln!(out, "{status}");
    out.push('\n');

    let columns = view.columns();
    let mut headers = vec!["ID".to_owned(), "NUMBER".to_owned(), "TIME".to_owned()];
    headers.extend(columns.iter().map(|stage| stage_label(*stage)));

    let rows: Vec<Vec<String>> = view
        .rows()
        .into_iter()
        .map(|call| {
            let mut row = vec![
                call.id.to_string(),
                call.number.clone(),
                call.first_timestamp.clone().unwrap_or_default(),
            ];
            row.extend(
                stage_cells(call, columns)
                    .into_iter()
                    .map(|cell| cell.map(|entry| entry.category.clone()).unwrap_or_default()),
            );
            row
        })
        .collect();

    if rows.is_empty() {
        out.push_str("no calls match the current filters\n");
    } else {
        out.push_str(&render_table(&headers, &rows));
    }

    let shares = view.all_stage_shares();
    if !shares.is_empty() {
        out.push('\n');
    }
    for (stage, stage_shares) in shares {
        let summary = if stage_shares.is_empty() {
            "-".to_owned()
        } else {
            stage_shares
                .iter()
                .map(|share| format!("{} {}% ({})", share.name, share.percentage, share.count))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let _ = writeln!(out, "{}: {summary}", stage_label(stage));
    }
    out
}

/// Stage detail for one call on the loaded page, or `None` when it is not there.
pub fn render_call<S: SessionContext>(view: &ViewController<S>, id: CallId) -> Option<String> {
    let page = view.state().data?;
    let call = page.calls.iter().find(|call| call.id == id)?;

    let mut out = format!("call {} {}", call.id, call.number);
    let mut media = Vec::new();
    if call.has_transcription() {
        media.push("transcribed");
    }
    if call.has_voice() {
        media.push("voice");
    }
    if !media.is_empty() {
        let _ = write!(out, "  [{}]", media.join(", "));
    }
    out.push('\n');

    if call.stages.is_empty() {
        out.push_str("  no stages reached\n");
    }
    for entry in &call.stages {
        let color = page.entry_color(entry).unwrap_or("-");
        let _ = writeln!(out, "  {}: {} {color}", stage_label(entry.stage), entry.category);
    }
    Some(out)
}

pub fn render_campaigns(campaigns: &[&CampaignSummary]) -> String {
    if campaigns.is_empty() {
        return "no campaigns\n".to_owned();
    }
    let headers = ["NAME", "MODEL", "STATUS", "LIVE", "TOTAL"].map(str::to_owned);
    let rows: Vec<Vec<String>> = campaigns
        .iter()
        .map(|campaign| {
            vec![
                campaign.name.clone(),
                campaign.model.clone(),
                if campaign.is_active { "active" } else { "inactive" }.to_owned(),
                if campaign.is_active {
                    campaign.live_calls.to_string()
                } else {
                    "-".to_owned()
                },
                campaign.total_calls.to_string(),
            ]
        })
        .collect();
    render_table(&headers, &rows)
}

fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|header| header.chars().count()).collect();
    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(index) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    push_row(&mut out, headers, &widths);
    for row in rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}
