// Alarm monitor - reminder alarms for the finance backend
// Entry point and console front end

use alarm_monitor::api::{NotificationPreferences, ReminderId};
use alarm_monitor::app::{self, AppState};
use alarm_monitor::config::MAX_VOLUME_PERCENT;
use alarm_monitor::services::AlarmEvent;
use alarm_monitor::sound::SoundId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "Commands: d(ismiss), s(nooze), r(efresh), p(review) <sound> [volume], \
m(ute), v(olume) <percent>, a(dd) <minutes> <message>, x <id> (delete), q(uit)";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alarm_monitor=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting alarm monitor");

    let data_dir = app::resolve_data_dir()?;
    let state = AppState::initialize(data_dir).await?;
    let running = state.start_monitor().await?;

    // Print alarms as they happen
    let mut events = running.monitor.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                AlarmEvent::Raised { reminder, .. } => {
                    println!("\n*** REMINDER: {} ({})", reminder.message, reminder.reminder_time);
                    println!("{}", HELP);
                }
                AlarmEvent::Dismissed(reminder) => println!("Dismissed: {}", reminder.message),
                AlarmEvent::Snoozed { reminder, until } => {
                    println!("Snoozed '{}' until {}", reminder.message, until.format("%H:%M:%S"))
                }
            }
        }
    });

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let mut words = line.split_whitespace();

                match words.next() {
                    Some("d" | "dismiss") => {
                        if running.monitor.dismiss().await.is_none() {
                            println!("No active alarm");
                        }
                    }
                    Some("s" | "snooze") => {
                        if running.monitor.snooze().await.is_none() {
                            println!("No active alarm");
                        }
                    }
                    Some("r" | "refresh") => {
                        running.monitor.refresh_now().await;
                        running.monitor.check_now().await;
                        println!("{} reminders loaded", running.monitor.reminders().await.len());
                    }
                    Some("p" | "preview") => {
                        let sound = words.next().map(str::parse::<SoundId>);
                        let volume = words.next().and_then(|v| v.parse::<u8>().ok());
                        match sound {
                            Some(Ok(sound)) => {
                                let volume = match volume {
                                    Some(v) => v,
                                    None => running.monitor.preferences().await.volume,
                                };
                                state.sound.preview(sound, volume);
                            }
                            Some(Err(e)) => println!("{}", e),
                            None => println!("Usage: preview <sound> [volume]"),
                        }
                    }
                    Some("m" | "mute") => {
                        let mut prefs = running.monitor.preferences().await;
                        prefs.sound_enabled = !prefs.sound_enabled;
                        let enabled = prefs.sound_enabled;
                        match state.update_preferences(&running.monitor, prefs).await {
                            Ok(()) => println!("Sound {}", if enabled { "on" } else { "off" }),
                            Err(e) => println!("Failed to save preferences: {}", e),
                        }
                    }
                    Some("v" | "volume") => match words.next().and_then(|v| v.parse::<u8>().ok()) {
                        Some(volume) if volume <= MAX_VOLUME_PERCENT => {
                            let prefs = NotificationPreferences {
                                volume,
                                ..running.monitor.preferences().await
                            };
                            if let Err(e) = state.update_preferences(&running.monitor, prefs).await {
                                println!("Failed to save preferences: {}", e);
                            }
                        }
                        _ => println!("Usage: volume <0-{}>", MAX_VOLUME_PERCENT),
                    },
                    Some("a" | "add") => {
                        let minutes = words.next().and_then(|m| m.parse::<i64>().ok());
                        let message = words.collect::<Vec<_>>().join(" ");
                        match minutes {
                            Some(minutes) if !message.is_empty() => {
                                match state.add_reminder(&running.monitor, minutes, &message).await {
                                    Ok(reminder) => println!(
                                        "Reminder {} set for {}",
                                        reminder.id, reminder.reminder_time
                                    ),
                                    Err(e) => println!("Failed to create reminder: {}", e),
                                }
                            }
                            _ => println!("Usage: add <minutes> <message>"),
                        }
                    }
                    Some("x" | "delete") => match words.next() {
                        Some(id) => {
                            let id = ReminderId::from(id);
                            match state.delete_reminder(&running.monitor, &id).await {
                                Ok(()) => println!("Deleted reminder {}", id),
                                Err(e) => println!("Failed to delete reminder: {}", e),
                            }
                        }
                        None => println!("Usage: delete <id>"),
                    },
                    Some("q" | "quit") => break,
                    Some(_) => println!("{}", HELP),
                    None => {}
                }
            }
        }
    }

    running.monitor.shutdown();
    running.presenter.abort();
    printer.abort();
    tracing::info!("Alarm monitor stopped");

    Ok(())
}
