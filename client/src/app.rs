use std::{fmt::Write as _, sync::Arc};

use chrono_tz::Tz;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{broadcast, watch},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use homedash_common::{
    display::{
        connection_label, device_line, humidity_label, is_bright, last_update_label, light_label,
        motion_label, temperature_label, wifi_label,
    },
    DeviceAction, DeviceName, EngineView, Notification, ParseError, RuntimeConfig,
};

use crate::{
    api::HttpStatusApi,
    engine::DashboardEngine,
    store::{apply_env_overrides, ConfigStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Command(DeviceName, DeviceAction),
    Refresh,
    Quit,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store = ConfigStore::from_env();
    let mut config = store.load().await.unwrap_or_else(|err| {
        warn!(
            "failed to load config from {}: {err:#}",
            store.path().display()
        );
        RuntimeConfig::default()
    });
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.sanitize();

    let api = HttpStatusApi::new(&config.api)?;
    info!("status endpoint at {}", api.base_url());

    let mut engine = DashboardEngine::new(config.sync.clone(), Arc::new(api));
    let renderer = tokio::spawn(render_loop(
        engine.subscribe(),
        engine.notifications(),
        config.display.tz(),
    ));
    engine.start();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_input(&line) {
                    Ok(Some(Input::Command(device, action))) => engine.submit_command(device, action),
                    Ok(Some(Input::Refresh)) => engine.poll_now(),
                    Ok(Some(Input::Quit)) => break,
                    Ok(None) => {}
                    Err(err) => eprintln!("{err} (usage: <fan|ac|light> <on|off|auto>, refresh, quit)"),
                },
                Ok(None) => stdin_open = false,
                Err(err) => {
                    warn!("stdin read failed: {err}");
                    stdin_open = false;
                }
            },
        }
    }

    engine.stop().await;
    drop(engine);
    let _ = renderer.await;
    Ok(())
}

pub fn parse_input(line: &str) -> Result<Option<Input>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(None);
    };

    match first.to_ascii_lowercase().as_str() {
        "refresh" => return Ok(Some(Input::Refresh)),
        "quit" | "exit" => return Ok(Some(Input::Quit)),
        _ => {}
    }

    let device = first.parse::<DeviceName>()?;
    let action = words.next().unwrap_or_default().parse::<DeviceAction>()?;
    Ok(Some(Input::Command(device, action)))
}

async fn render_loop(
    mut views: watch::Receiver<EngineView>,
    mut notifications: broadcast::Receiver<Notification>,
    timezone: Tz,
) {
    println!("{}", render_view(&views.borrow_and_update(), timezone));
    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                println!("{}", render_view(&view, timezone));
            }
            notification = notifications.recv() => match notification {
                Ok(notification) => eprintln!("!! {}", notification.message()),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

pub fn render_view(view: &EngineView, timezone: Tz) -> String {
    let snapshot = &view.snapshot;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "[{}] Smart Home Dashboard | wifi: {} | last update: {}{}",
        connection_label(view.online),
        wifi_label(snapshot.wifi),
        last_update_label(snapshot.last_update, timezone),
        if view.busy { " | sending..." } else { "" }
    );
    for (label, reading) in [("Indoor", snapshot.indoor), ("Outdoor", snapshot.outdoor)] {
        let _ = writeln!(
            out,
            "{label:<8} {:>8} {:>7}",
            temperature_label(reading.temperature),
            humidity_label(reading.humidity)
        );
    }
    let _ = writeln!(
        out,
        "Light    {}{} | Motion: {}",
        light_label(snapshot.light_level),
        if is_bright(snapshot.light_level) { " (bright)" } else { "" },
        motion_label(snapshot.motion)
    );
    for name in DeviceName::ALL {
        let _ = writeln!(out, "{}", device_line(snapshot, name));
    }

    out.trim_end().to_string()
}
