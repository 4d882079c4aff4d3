use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, ConnectionState, Dashboard, DashboardEvent, SnapshotOrigin, StreamInfoView,
    ViewSection, ViewState,
};
use shared::domain::BannerKind;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Settings file, defaults to `dashboard.toml` when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    hub_url: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the snapshot and follow live updates until interrupted.
    Watch,
    /// Print one page of stream diagnostics.
    Streams {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(api_url) = args.api_url {
        settings.api_base_url = api_url;
    }
    if let Some(hub_url) = args.hub_url {
        settings.hub_url = hub_url;
    }

    match args.command.unwrap_or(Command::Watch) {
        Command::Watch => {
            settings.validate()?;
            watch(Dashboard::new(settings)).await
        }
        Command::Streams { page, url } => {
            if url.is_some() {
                settings.stream_info_url = url;
            }
            settings.validate()?;
            streams(Dashboard::new(settings), page).await
        }
    }
}

async fn watch(mut dashboard: Dashboard) -> Result<()> {
    match dashboard.load_snapshot().await? {
        SnapshotOrigin::Fetched { attempts } => info!(attempts, "snapshot ready"),
        SnapshotOrigin::Exhausted { attempts } => {
            warn!(attempts, "backend unreachable, starting from an empty view")
        }
    }
    print_view(&dashboard.view().await, dashboard.settings().hot_threshold_celsius);

    let mut events = dashboard.subscribe();
    if let Err(err) = dashboard.connect_live().await {
        warn!(error = %err, "live updates unavailable, showing snapshot only");
    }
    let mut connection = dashboard.watch_connection();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    let view = dashboard.view().await;
                    print_event(&event, &view, dashboard.settings().hot_threshold_celsius);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "dashboard fell behind, redrawing");
                    print_view(&dashboard.view().await, dashboard.settings().hot_threshold_celsius);
                }
                Err(RecvError::Closed) => break,
            },
            changed = async {
                match connection.as_mut() {
                    Some(state) => state.changed().await.map(|_| state.borrow().clone()).ok(),
                    None => std::future::pending().await,
                }
            } => match changed {
                Some(state) => print_connection(&state),
                None => connection = None,
            },
        }
    }

    dashboard.shutdown().await;
    Ok(())
}

async fn streams(dashboard: Dashboard, page: usize) -> Result<()> {
    let client = dashboard
        .stream_info_client()
        .context("set stream_info_url or pass --url")?;
    let mut view = StreamInfoView::load(&client, dashboard.settings().stream_page_size()?).await;
    if let Some(error) = view.error() {
        println!("{error}");
        return Ok(());
    }

    let pager = view.pager_mut();
    pager.go_to(page);
    println!(
        "page {}/{} ({} streams)",
        pager.current_page(),
        pager.total_pages(),
        pager.items().len()
    );
    for stream in pager.current() {
        println!(
            "{}  {:.2} Mbps  {} programs",
            stream.endpoint_key(),
            stream.bitrate_mbps,
            stream.programs.len()
        );
        for program in stream.problematic_programs() {
            let issues = program.issues.as_deref().unwrap_or_default().join(", ");
            println!(
                "  program {} pmt {}: {} missing streams {}",
                program.program_id,
                program.pmt_pid,
                program.missing_streams().len(),
                issues
            );
        }
    }
    Ok(())
}

fn print_connection(state: &ConnectionState) {
    match state {
        ConnectionState::Reconnecting { attempt } => {
            println!("[hub] reconnecting (attempt {attempt})")
        }
        ConnectionState::Closed => println!("[hub] closed, live updates stopped"),
        other => println!("[hub] {other:?}"),
    }
}

fn print_event(event: &DashboardEvent, view: &ViewState, hot_threshold: f64) {
    match event {
        DashboardEvent::Seeded => print_view(view, hot_threshold),
        DashboardEvent::Updated { section, applied } => {
            println!("[{section:?}] {applied:?}");
            print_section(*section, view, hot_threshold);
        }
        DashboardEvent::BannerExpired(kind) => println!("[{kind:?}] cleared"),
        DashboardEvent::PayloadRejected { target, reason } => {
            println!("[{target}] rejected: {reason}")
        }
    }
}

fn print_view(view: &ViewState, hot_threshold: f64) {
    for section in [
        ViewSection::Channels,
        ViewSection::Satellites,
        ViewSection::Temperature,
    ] {
        print_section(section, view, hot_threshold);
    }
}

fn print_section(section: ViewSection, view: &ViewState, hot_threshold: f64) {
    match section {
        ViewSection::Channels => {
            let failing = view.channels.iter().filter(|channel| channel.has_error).count();
            println!("  channels: {} ({failing} with errors)", view.channels.len());
            for channel in view.channels.iter().filter(|channel| channel.has_error) {
                println!("    #{} {} {}", channel.order.0, channel.name, channel.status);
            }
        }
        ViewSection::ChannelStatus => {
            for entry in &view.channel_status {
                println!("    channel {}: {}", entry.id.0, entry.status);
            }
        }
        ViewSection::Satellites => {
            for satellite in &view.satellites {
                let alarms = satellite
                    .details
                    .iter()
                    .filter(|detail| detail.has_error || detail.has_warning)
                    .count();
                println!(
                    "  satellite {}: {} transponders, {alarms} alarms",
                    satellite.degree,
                    satellite.details.len()
                );
            }
        }
        ViewSection::RegionRelays => {
            for region in &view.region_relays {
                let problems = region
                    .relay_infos
                    .iter()
                    .filter(|relay| relay.has_problem)
                    .count();
                println!("  region {}: {problems} relay problems", region.region_name);
            }
        }
        ViewSection::Temperature => match &view.temperature {
            Some(reading) => {
                let flag = if reading.is_hot(hot_threshold) { " HOT" } else { "" };
                println!("  temperature: {}{flag}", reading.temperature);
            }
            None => println!("  temperature: n/a"),
        },
        ViewSection::EmrTemperature => {
            if let Some(reading) = &view.emr_temperature {
                println!("  emr temperature: {}", reading.temperature);
            }
        }
        ViewSection::OpticProblems => {
            println!("  optic channels with problems: {}", view.optic_problems.len());
        }
        ViewSection::Cards => {
            println!("  cards awaiting activation: {}", view.cards.len());
            for card in &view.cards {
                println!("    {}", serde_json::Value::Object(card.fields.clone()));
            }
        }
        ViewSection::Banner(BannerKind::Disco) => {
            if let (Some(message), Some(animation)) = (view.disco.message(), view.disco_animation()) {
                println!("  disco: {message} ({})", animation.asset_path());
            }
        }
        ViewSection::Banner(BannerKind::RobotSpeech) => {
            if let Some(message) = view.robot_speech.message() {
                println!("  robot: {message}");
            }
        }
    }
}
