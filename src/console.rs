//! Line-oriented operator console standing in for the dashboard UI.

use std::fmt::Write as _;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    capture::{
        commands::{
            add_area_point, cancel_area_selection, get_capture_state, load_areas,
            reset_area_points, save_area, start_area_selection,
        },
        AddPointOutcome, CommitOutcome,
    },
    models::SignalId,
    settings::SignalTiming,
    system::{
        commands::{
            configure_video_sources, get_system_log, get_system_state, get_timing_settings,
            get_video_sources, record_detection, start_system, stop_system,
            update_timing_settings,
        },
        DetectionReport,
    },
    AppState,
};

const ENABLE_LOGS: bool = true;

use crate::log_info;

const HELP: &str = "\
commands:
  sources [A=<src> B=<src> C=<src> D=<src>]  show or set video sources (A= clears)
  new-areas                                  start area selection
  click <x> <y>                              place a point on the current signal
  reset                                      clear points for the current signal
  save-area                                  commit the current signal's area
  cancel                                     abandon area selection
  load                                       load saved areas
  start | stop                               start or stop the system
  status                                     capture and system status
  detect <signal> <vehicles> <weight>        report detections for a signal
  timing [<signal> <min> <max>]              show or set green times
  log                                        print the system log
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Help,
    ShowSources,
    SetSources(Vec<(SignalId, String)>),
    NewAreas,
    Click { x: f64, y: f64 },
    Reset,
    SaveArea,
    Cancel,
    Load,
    Start,
    Stop,
    Status,
    Detect {
        signal: SignalId,
        report: DetectionReport,
    },
    ShowTiming,
    SetTiming {
        signal: SignalId,
        timing: SignalTiming,
    },
    Log,
    Quit,
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".into());
    };
    let args: Vec<&str> = words.collect();

    let command = match (head, args.as_slice()) {
        ("help", []) => ConsoleCommand::Help,
        ("sources", []) => ConsoleCommand::ShowSources,
        ("sources", pairs) => {
            let mut updates = Vec::with_capacity(pairs.len());
            for pair in pairs {
                let (signal, descriptor) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("expected <signal>=<source>, got '{pair}'"))?;
                updates.push((parse_signal(signal)?, descriptor.to_string()));
            }
            ConsoleCommand::SetSources(updates)
        }
        ("new-areas", []) => ConsoleCommand::NewAreas,
        ("click", [x, y]) => ConsoleCommand::Click {
            x: parse_number(x)?,
            y: parse_number(y)?,
        },
        ("reset", []) => ConsoleCommand::Reset,
        ("save-area", []) => ConsoleCommand::SaveArea,
        ("cancel", []) => ConsoleCommand::Cancel,
        ("load", []) => ConsoleCommand::Load,
        ("start", []) => ConsoleCommand::Start,
        ("stop", []) => ConsoleCommand::Stop,
        ("status", []) => ConsoleCommand::Status,
        ("detect", [signal, vehicles, weight]) => ConsoleCommand::Detect {
            signal: parse_signal(signal)?,
            report: DetectionReport {
                vehicles: vehicles
                    .parse()
                    .map_err(|_| format!("'{vehicles}' is not a vehicle count"))?,
                weight: parse_number(weight)?,
            },
        },
        ("timing", []) => ConsoleCommand::ShowTiming,
        ("timing", [signal, min, max]) => ConsoleCommand::SetTiming {
            signal: parse_signal(signal)?,
            timing: SignalTiming {
                min_green_secs: min.parse().map_err(|_| format!("'{min}' is not seconds"))?,
                max_green_secs: max.parse().map_err(|_| format!("'{max}' is not seconds"))?,
            },
        },
        ("log", []) => ConsoleCommand::Log,
        ("quit" | "exit", []) => ConsoleCommand::Quit,
        _ => return Err(format!("unknown command '{}', try 'help'", line.trim())),
    };

    Ok(command)
}

fn parse_signal(value: &str) -> Result<SignalId, String> {
    SignalId::parse(value).ok_or_else(|| format!("'{value}' is not a signal (A-D)"))
}

fn parse_number(value: &str) -> Result<f64, String> {
    value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))
}

/// Runs one command and renders its result for the operator.
pub async fn execute(state: &AppState, command: ConsoleCommand) -> Result<String, String> {
    match command {
        ConsoleCommand::Help => Ok(HELP.to_string()),
        ConsoleCommand::ShowSources => {
            let sources = get_video_sources(state).await?;
            Ok(render_sources(&sources))
        }
        ConsoleCommand::SetSources(updates) => {
            let mut sources = get_video_sources(state).await?;
            for (signal, descriptor) in updates {
                sources.set(signal, descriptor);
            }
            let sources = configure_video_sources(state, sources).await?;
            Ok(render_sources(&sources))
        }
        ConsoleCommand::NewAreas => {
            let snapshot = start_area_selection(state).await?;
            Ok(format!(
                "Drawing area for Signal {} {}",
                snapshot.signal.unwrap_or(SignalId::A),
                snapshot.progress
            ))
        }
        ConsoleCommand::Click { x, y } => match add_area_point(state, x, y).await? {
            AddPointOutcome::Added { placed } => Ok(format!("({placed}/4 points)")),
            AddPointOutcome::Ignored => Ok("Area already has 4 points".to_string()),
        },
        ConsoleCommand::Reset => {
            let snapshot = reset_area_points(state).await?;
            Ok(snapshot.progress)
        }
        ConsoleCommand::SaveArea => match save_area(state).await? {
            CommitOutcome::Advanced { captured, next } => Ok(format!(
                "Area saved for Signal {captured}; now drawing Signal {next}"
            )),
            CommitOutcome::Complete { .. } => {
                Ok("All areas collected; saving in the background".to_string())
            }
        },
        ConsoleCommand::Cancel => {
            cancel_area_selection(state).await?;
            Ok("Area selection cancelled".to_string())
        }
        ConsoleCommand::Load => {
            load_areas(state).await?;
            Ok("Loaded saved areas".to_string())
        }
        ConsoleCommand::Start => {
            let runtime = start_system(state).await?;
            Ok(format!("System running, Signal {} green", runtime.active_signal))
        }
        ConsoleCommand::Stop => {
            stop_system(state).await?;
            Ok("System stopped".to_string())
        }
        ConsoleCommand::Status => {
            let capture = get_capture_state(state).await?;
            let runtime = get_system_state(state).await?;
            let mut out = format!(
                "capture: {:?} {} | areas defined: {}\nsystem: {:?}, active Signal {}, cycle {}s, vehicles {}",
                capture.status,
                capture.progress,
                if capture.has_active_areas { "yes" } else { "no" },
                runtime.status,
                runtime.active_signal,
                runtime.cycle_time_secs,
                runtime.total_vehicles,
            );
            for signal in &runtime.signals {
                let _ = write!(
                    out,
                    "\n  {}: {:?} {}s, {} vehicles",
                    signal.signal, signal.light, signal.green_elapsed_secs, signal.vehicles
                );
            }
            Ok(out)
        }
        ConsoleCommand::Detect { signal, report } => {
            record_detection(state, signal, report).await?;
            Ok(format!("Signal {signal}: {} vehicles", report.vehicles))
        }
        ConsoleCommand::ShowTiming => {
            let timings = get_timing_settings(state).await?;
            Ok(SignalId::ALL
                .iter()
                .map(|signal| {
                    let timing = timings.get(*signal);
                    format!(
                        "{signal}: min {}s, max {}s",
                        timing.min_green_secs, timing.max_green_secs
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"))
        }
        ConsoleCommand::SetTiming { signal, timing } => {
            let timings = get_timing_settings(state).await?.with(signal, timing);
            update_timing_settings(state, timings).await?;
            Ok(format!("Timing updated for Signal {signal}"))
        }
        ConsoleCommand::Log => {
            let entries = get_system_log(state).await?;
            Ok(entries
                .iter()
                .map(|entry| format!("{} {entry}", entry.at.format("%H:%M:%S")))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        ConsoleCommand::Quit => Ok(String::new()),
    }
}

fn render_sources(sources: &crate::models::VideoSourceSet) -> String {
    SignalId::ALL
        .iter()
        .map(|signal| match sources.get(*signal) {
            Some(source) => format!("{signal}: {} ({:?})", source.descriptor(), source.kind()),
            None => format!("{signal}: <not set>"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reads commands from stdin until `quit` or end of input.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let mut events = state.events.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("[{}] {}", event.level(), event.message()),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    println!("Junction: {} (type 'help')", state.junction);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(ConsoleCommand::Quit) => break,
            Ok(command) => match execute(&state, command).await {
                Ok(output) if output.is_empty() => {}
                Ok(output) => println!("{output}"),
                Err(err) => println!("error: {err}"),
            },
            Err(err) => println!("error: {err}"),
        }
    }

    state.system.stop().await;
    state.areas.abandon().await;
    if let Some(Err(err)) = state.areas.wait_for_pending_save().await {
        log_info!("Last area save did not complete: {err}");
    }
    printer.abort();
    Ok(())
}
