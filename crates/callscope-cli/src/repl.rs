// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use callscope_app::{
    BooleanFilter, CallId, CallSortKey, FetchRuntime, FilterEdit, SessionContext, ViewCommand,
    ViewController, format_date, format_time, parse_date_input, parse_time_input,
};
use std::io::{BufRead, Write};
use std::time::Duration;

use crate::report::{render_call, render_view};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Edits(Vec<FilterEdit>),
    View(ViewCommand),
    Show,
    Call(CallId),
    Pending,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Option<ReplCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));

    let command = match verb {
        "search" => ReplCommand::Edits(vec![FilterEdit::SetFreeText(rest.to_owned())]),
        "from" => {
            let (date, time) = parse_date_time(rest)?;
            ReplCommand::Edits(vec![
                FilterEdit::SetStartDate(date),
                FilterEdit::SetStartTime(time),
            ])
        }
        "to" => {
            let (date, time) = parse_date_time(rest)?;
            ReplCommand::Edits(vec![
                FilterEdit::SetEndDate(date),
                FilterEdit::SetEndTime(time),
            ])
        }
        "toggle" => {
            let (stage, category) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| anyhow!("usage: toggle <stage> <category>"))?;
            let stage = stage
                .parse()
                .with_context(|| format!("invalid stage {stage:?}"))?;
            ReplCommand::Edits(vec![FilterEdit::ToggleCategory {
                stage,
                category: category.trim().to_owned(),
            }])
        }
        "clear" => {
            let stage = rest
                .parse()
                .with_context(|| format!("usage: clear <stage>; got {rest:?}"))?;
            ReplCommand::Edits(vec![FilterEdit::ClearStage(stage)])
        }
        "flag" => {
            let flag = BooleanFilter::parse(rest).ok_or_else(|| {
                anyhow!("unknown flag {rest:?}; use with_transcription or with_voice")
            })?;
            ReplCommand::Edits(vec![FilterEdit::ToggleFlag(flag)])
        }
        "apply" => ReplCommand::View(ViewCommand::ApplyFilters),
        "reset" => ReplCommand::View(ViewCommand::ResetFilters),
        "page" => {
            let page = rest
                .parse()
                .with_context(|| format!("usage: page <n>; got {rest:?}"))?;
            ReplCommand::View(ViewCommand::GoToPage(page))
        }
        "next" => ReplCommand::View(ViewCommand::NextPage),
        "prev" => ReplCommand::View(ViewCommand::PrevPage),
        "order" => ReplCommand::View(ViewCommand::ToggleSortOrder),
        "sort" if rest.is_empty() => ReplCommand::View(ViewCommand::ClearSort),
        "sort" => {
            let key = CallSortKey::parse(rest).ok_or_else(|| {
                anyhow!("unknown sort key {rest:?}; use id, number, time or stageN")
            })?;
            ReplCommand::View(ViewCommand::SortBy(key))
        }
        "refresh" => ReplCommand::View(ViewCommand::Refresh),
        "show" => ReplCommand::Show,
        "call" => {
            let id = rest
                .parse()
                .with_context(|| format!("usage: call <id>; got {rest:?}"))?;
            ReplCommand::Call(id)
        }
        "pending" => ReplCommand::Pending,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        unknown => bail!("unknown command {unknown:?}; type help for the command list"),
    };
    Ok(Some(command))
}

fn parse_date_time(rest: &str) -> Result<(Option<time::Date>, Option<time::Time>)> {
    let mut parts = rest.split_whitespace();
    let date = parse_date_input(parts.next().unwrap_or(""))?;
    let time = parse_time_input(parts.next().unwrap_or(""))?;
    if parts.next().is_some() {
        bail!("expected <date> [time], got {rest:?}");
    }
    if date.is_none() && time.is_some() {
        bail!("a time needs a date");
    }
    Ok((date, time))
}

pub struct Repl<'a, S, R> {
    view: &'a mut ViewController<S>,
    runtime: &'a mut R,
    fetch_timeout: Duration,
    redirect_wait: Duration,
}

impl<'a, S: SessionContext, R: FetchRuntime> Repl<'a, S, R> {
    pub fn new(
        view: &'a mut ViewController<S>,
        runtime: &'a mut R,
        fetch_timeout: Duration,
        redirect_wait: Duration,
    ) -> Self {
        Self {
            view,
            runtime,
            fetch_timeout,
            redirect_wait,
        }
    }

    pub fn run(&mut self, input: impl BufRead, mut output: impl Write) -> Result<()> {
        self.settle();
        write!(output, "{}", render_view(self.view))?;
        if self.finish_if_expired(&mut output)? {
            return Ok(());
        }

        for line in input.lines() {
            let line = line.context("read command")?;
            let command = match parse_command(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(error) => {
                    writeln!(output, "error: {error:#}")?;
                    continue;
                }
            };

            match command {
                ReplCommand::Quit => break,
                ReplCommand::Help => print_commands(&mut output)?,
                ReplCommand::Show => write!(output, "{}", render_view(self.view))?,
                ReplCommand::Call(id) => match render_call(self.view, id) {
                    Some(detail) => write!(output, "{detail}")?,
                    None => writeln!(output, "call {id} is not on this page")?,
                },
                ReplCommand::Pending => describe_pending(self.view, &mut output)?,
                ReplCommand::Edits(edits) => {
                    for edit in edits {
                        self.view.dispatch(ViewCommand::Edit(edit), self.runtime);
                    }
                    describe_pending(self.view, &mut output)?;
                }
                ReplCommand::View(command) => {
                    let events = self.view.dispatch(command, self.runtime);
                    self.settle();
                    if events.is_empty() {
                        writeln!(output, "nothing changed")?;
                    } else {
                        write!(output, "{}", render_view(self.view))?;
                    }
                }
            }

            if self.finish_if_expired(&mut output)? {
                return Ok(());
            }
        }

        self.view.dispatch(ViewCommand::Unmount, self.runtime);
        Ok(())
    }

    fn settle(&mut self) {
        self.view.wait_until_idle(self.runtime, self.fetch_timeout);
    }

    fn finish_if_expired(&mut self, output: &mut impl Write) -> Result<bool> {
        if !self.view.is_session_expired() {
            return Ok(false);
        }
        if !self.view.redirect_due() {
            self.view.wait(self.runtime, self.redirect_wait);
        }
        writeln!(output, "redirecting to sign in")?;
        self.view.dispatch(ViewCommand::Unmount, self.runtime);
        Ok(true)
    }
}

fn describe_pending<S: SessionContext>(
    view: &ViewController<S>,
    output: &mut impl Write,
) -> Result<()> {
    let pending = view.pending_filters();
    let mut parts = Vec::new();
    if !pending.free_text().is_empty() {
        parts.push(format!("search {:?}", pending.free_text()));
    }
    let range = pending.date_range();
    if let Some(date) = range.start_date {
        let time = range.start_time.map(format_time).unwrap_or_default();
        parts.push(format!("from {} {time}", format_date(date)).trim_end().to_owned());
    }
    if let Some(date) = range.end_date {
        let time = range.end_time.map(format_time).unwrap_or_default();
        parts.push(format!("to {} {time}", format_date(date)).trim_end().to_owned());
    }
    for (stage, categories) in pending.categorical() {
        let values = categories.iter().cloned().collect::<Vec<_>>().join("|");
        parts.push(format!("stage {stage} in {values}"));
    }
    for flag in pending.flags() {
        parts.push(flag.as_str().to_owned());
    }

    let applied = if pending == view.applied_filters() {
        "applied"
    } else {
        "not applied; type apply"
    };
    if parts.is_empty() {
        writeln!(output, "pending filters: none ({applied})")?;
    } else {
        writeln!(output, "pending filters: {} ({applied})", parts.join(", "))?;
    }
    Ok(())
}

fn print_commands(output: &mut impl Write) -> Result<()> {
    writeln!(output, "  search <text>             Set the free-text search (empty clears)")?;
    writeln!(output, "  from <YYYY-MM-DD> [HH:MM] Set the range start (empty clears)")?;
    writeln!(output, "  to <YYYY-MM-DD> [HH:MM]   Set the range end (empty clears)")?;
    writeln!(output, "  toggle <stage> <category> Toggle a stage category filter")?;
    writeln!(output, "  clear <stage>             Drop every category filter on a stage")?;
    writeln!(output, "  flag <tag>                Toggle with_transcription or with_voice")?;
    writeln!(output, "  apply | reset             Apply pending filters or restore defaults")?;
    writeln!(output, "  page <n> | next | prev    Move between pages")?;
    writeln!(output, "  order                     Flip the server sort order")?;
    writeln!(output, "  sort [key]                Sort this page by id, number, time or stageN")?;
    writeln!(output, "  refresh | show | pending  Refetch, redraw, or list pending filters")?;
    writeln!(output, "  call <id>                 Show stage detail for a call on this page")?;
    writeln!(output, "  quit                      Leave")?;
    Ok(())
}
