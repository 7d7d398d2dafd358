// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod repl;
mod report;
mod runtime;
mod session;

use anyhow::{Context, Result, anyhow};
use callscope_api::Client;
use callscope_app::{
    BooleanFilter, CampaignSortKey, FilterEdit, SessionContext, SortDirection, SortState,
    ViewCommand, ViewController, sort,
};
use config::Config;
use repl::Repl;
use runtime::ApiRuntime;
use session::FileSession;
use std::env;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use time::OffsetDateTime;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `callscope --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    init_logging(config.log_level());
    log::info!("using config {}", options.config_path.display());

    let timeout = config.api_timeout()?;
    let client = Client::new(config.api_base_url(), timeout)
        .and_then(|client| client.with_paths(config.calls_path(), config.campaigns_path()))
        .with_context(|| {
            format!(
                "invalid [api] config in {}; fix base_url/calls_path/campaigns_path/timeout values",
                options.config_path.display()
            )
        })?;

    let token_path = config.token_path()?;
    let session = FileSession::load(&token_path).with_context(|| {
        format!(
            "load session {} -- sign in again or set CALLSCOPE_TOKEN",
            token_path.display()
        )
    })?;
    let view_options = config.view_options()?;
    if options.check_only {
        println!("{}", check_summary(&client, &session));
        return Ok(());
    }

    if options.campaigns {
        return print_campaigns(&client, &session, &options);
    }

    log::info!("fetching calls from {}", client.base_url());
    let mut runtime = ApiRuntime::new(client);
    let mut view = ViewController::new(session, today(), view_options);
    for edit in options.edits.iter().cloned() {
        view.dispatch(ViewCommand::Edit(edit), &mut runtime);
    }
    if !options.edits.is_empty() {
        view.dispatch(ViewCommand::ApplyFilters, &mut runtime);
    }
    if options.order == Some(SortDirection::Asc) {
        view.dispatch(ViewCommand::ToggleSortOrder, &mut runtime);
    }
    view.mount(&mut runtime);
    if options.page > 1 {
        view.wait_until_idle(&mut runtime, fetch_wait(timeout));
        view.dispatch(ViewCommand::GoToPage(options.page), &mut runtime);
    }

    let redirect_wait = view_options.redirect_delay + Duration::from_secs(1);
    if options.interactive {
        let stdin = io::stdin();
        return Repl::new(&mut view, &mut runtime, fetch_wait(timeout), redirect_wait)
            .run(stdin.lock(), io::stdout());
    }

    view.wait_until_idle(&mut runtime, fetch_wait(timeout));
    print!("{}", report::render_view(&view));
    if view.is_session_expired() {
        view.wait(&mut runtime, redirect_wait);
        view.dispatch(ViewCommand::Unmount, &mut runtime);
        return Err(anyhow!("session expired; sign in again"));
    }
    if view.state().is_error_only() {
        return Err(anyhow!("no data loaded"));
    }
    view.dispatch(ViewCommand::Unmount, &mut runtime);
    Ok(())
}

fn check_summary(client: &Client, session: &FileSession) -> String {
    let signed_in = if session.token().is_some() {
        "signed in"
    } else {
        "signed out"
    };
    format!(
        "config ok; api {}; session {} ({signed_in})",
        client.base_url(),
        session.path().display()
    )
}

fn print_campaigns(client: &Client, session: &FileSession, options: &CliOptions) -> Result<()> {
    let token = session
        .token()
        .ok_or_else(|| anyhow!("not signed in; set CALLSCOPE_TOKEN or sign in again"))?;
    let campaigns = client
        .list_campaigns(&token)
        .map_err(|failure| anyhow!("{}", failure.message()))?;
    let order = match options.campaign_sort {
        Some(key) => SortState::by(key, options.order.unwrap_or(SortDirection::Asc)),
        None => SortState::default(),
    };
    print!("{}", report::render_campaigns(&sort(&campaigns, &order)));
    Ok(())
}

fn init_logging(default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn fetch_wait(timeout: Duration) -> Duration {
    timeout + Duration::from_secs(1)
}

fn today() -> time::Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    interactive: bool,
    campaigns: bool,
    campaign_sort: Option<CampaignSortKey>,
    page: u32,
    order: Option<SortDirection>,
    edits: Vec<FilterEdit>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
        interactive: false,
        campaigns: false,
        campaign_sort: None,
        page: 1,
        order: None,
        edits: Vec::new(),
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let mut value_for = |flag: &str, what: &str| next_value(&mut iter, flag, what);
        match arg.as_ref() {
            "--config" => {
                options.config_path = PathBuf::from(value_for("--config", "a file path")?);
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--interactive" | "-i" => {
                options.interactive = true;
            }
            "--campaigns" => {
                options.campaigns = true;
            }
            "--campaign-sort" => {
                let raw = value_for("--campaign-sort", "a key")?;
                let key = CampaignSortKey::parse(&raw).ok_or_else(|| {
                    anyhow!(
                        "unknown campaign sort key {raw:?}; use name, model, status, live or total"
                    )
                })?;
                options.campaign_sort = Some(key);
            }
            "--search" => {
                let text = value_for("--search", "text")?;
                options.edits.push(FilterEdit::SetFreeText(text));
            }
            "--from" => {
                let raw = value_for("--from", "a date")?;
                options.edits.push(FilterEdit::start_date(&raw)?);
            }
            "--from-time" => {
                let raw = value_for("--from-time", "a time")?;
                options.edits.push(FilterEdit::start_time(&raw)?);
            }
            "--to" => {
                let raw = value_for("--to", "a date")?;
                options.edits.push(FilterEdit::end_date(&raw)?);
            }
            "--to-time" => {
                let raw = value_for("--to-time", "a time")?;
                options.edits.push(FilterEdit::end_time(&raw)?);
            }
            "--stage" => {
                let raw = value_for("--stage", "<stage>=<category>")?;
                let (stage, category) = raw
                    .split_once('=')
                    .ok_or_else(|| anyhow!("--stage expects <stage>=<category>, got {raw:?}"))?;
                let stage = stage
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid stage number in {raw:?}"))?;
                options.edits.push(FilterEdit::ToggleCategory {
                    stage,
                    category: category.trim().to_owned(),
                });
            }
            "--with-transcription" => {
                options
                    .edits
                    .push(FilterEdit::ToggleFlag(BooleanFilter::WithTranscription));
            }
            "--with-voice" => {
                options
                    .edits
                    .push(FilterEdit::ToggleFlag(BooleanFilter::WithVoice));
            }
            "--page" => {
                let raw = value_for("--page", "a page number")?;
                options.page = raw
                    .parse()
                    .with_context(|| format!("invalid page number {raw:?}"))?;
            }
            "--order" => {
                let raw = value_for("--order", "asc or desc")?;
                options.order = Some(
                    SortDirection::parse(&raw)
                        .ok_or_else(|| anyhow!("--order expects asc or desc, got {raw:?}"))?,
                );
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn next_value<I, S>(iter: &mut I, flag: &str, what: &str) -> Result<String>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    iter.next()
        .map(|value| value.as_ref().to_owned())
        .ok_or_else(|| anyhow!("{flag} requires {what}"))
}

fn print_help() {
    println!("callscope");
    println!("  --config <path>             Use a specific config path");
    println!("  --print-config-path         Print resolved config path");
    println!("  --print-example-config      Print a v1 config template");
    println!("  --check                     Validate config + session and exit");
    println!("  --search <text>             Free-text search");
    println!("  --from <YYYY-MM-DD>         Range start date (default today)");
    println!("  --from-time <HH:MM>         Range start time");
    println!("  --to <YYYY-MM-DD>           Range end date");
    println!("  --to-time <HH:MM>           Range end time");
    println!("  --stage <n>=<category>      Filter a stage by category (repeatable)");
    println!("  --with-transcription        Only calls with a transcribed stage");
    println!("  --with-voice                Only calls with a voice recording");
    println!("  --page <n>                  Page to show");
    println!("  --order <asc|desc>          Sort order (default desc)");
    println!("  --interactive, -i           Start the interactive command loop");
    println!("  --campaigns                 List campaigns instead of calls");
    println!("  --campaign-sort <key>       Sort campaigns by name, model, status, live or total");
    println!("  --help                      Show this help");
}
