//! Audio output contexts
//!
//! An `AudioContext` receives a finished oscillator graph and makes it
//! audible. Contexts start suspended; the engine resumes them before the
//! first playback.

use crate::config::{PLAYER_TIMEOUT, SAMPLE_RATE_HZ};
use crate::error::{AppError, Result};
use crate::sound::presets::Voice;
use crate::sound::synth;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
}

/// Sink for synthesized tones
pub trait AudioContext: Send + Sync {
    fn state(&self) -> ContextState;

    fn resume(&self) -> Result<()>;

    /// Play voices whose gains already include the master volume
    fn play(&self, voices: &[Voice]) -> Result<()>;
}

/// Renders to WAV and pipes it into an external player (`aplay`, `paplay`, `afplay`).
///
/// At most one player runs at a time: starting a playback kills the one
/// still in flight, and a player that outlives `timeout` is killed.
pub struct CommandContext {
    program: String,
    args: Vec<String>,
    sample_rate: u32,
    timeout: Duration,
    running: AtomicBool,
    current: Mutex<Option<JoinHandle<()>>>,
    live: Arc<AtomicUsize>,
}

impl CommandContext {
    /// Build from a command line such as `"aplay -q"`; the WAV arrives on stdin
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| AppError::Config("Audio player command is empty".to_string()))?;

        Ok(Self {
            program,
            args: parts.collect(),
            sample_rate: SAMPLE_RATE_HZ,
            timeout: PLAYER_TIMEOUT,
            running: AtomicBool::new(false),
            current: Mutex::new(None),
            live: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Player processes currently running
    pub fn live_players(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}

/// Resolve `program` the way the shell would, without running it
fn find_program(program: &str) -> Option<PathBuf> {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }

    std::env::var_os("PATH").and_then(|dirs| {
        std::env::split_paths(&dirs)
            .map(|dir| dir.join(program))
            .find(|candidate| candidate.is_file())
    })
}

/// Decrements the live player count when the feeding task ends or is aborted
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn new(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(live))
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

async fn feed_player(
    program: String,
    mut child: Child,
    mut stdin: ChildStdin,
    wav: Vec<u8>,
    timeout: Duration,
    _guard: LiveGuard,
) {
    let playback = async {
        if let Err(e) = stdin.write_all(&wav).await {
            tracing::warn!("Failed to stream audio to '{}': {}", program, e);
        }
        drop(stdin);
        child.wait().await
    };

    let outcome = tokio::time::timeout(timeout, playback).await;
    match outcome {
        Ok(Ok(status)) if !status.success() => {
            tracing::warn!("Audio player '{}' exited with {}", program, status);
        }
        Ok(Ok(_)) => {}
        Ok(Err(e)) => tracing::warn!("Audio player '{}' did not exit cleanly: {}", program, e),
        Err(_) => {
            tracing::warn!("Audio player '{}' timed out after {:?}", program, timeout);
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill audio player '{}': {}", program, e);
            }
        }
    }
}

impl AudioContext for CommandContext {
    fn state(&self) -> ContextState {
        if self.running.load(Ordering::Acquire) {
            ContextState::Running
        } else {
            ContextState::Suspended
        }
    }

    fn resume(&self) -> Result<()> {
        // A missing player fails here instead of on every alarm
        if find_program(&self.program).is_none() {
            return Err(AppError::Audio(format!(
                "Audio player '{}' not found",
                self.program
            )));
        }

        self.running.store(true, Ordering::Release);
        tracing::debug!("Audio context resumed using '{}'", self.program);
        Ok(())
    }

    fn play(&self, voices: &[Voice]) -> Result<()> {
        if self.state() != ContextState::Running {
            return Err(AppError::Audio("Audio context is suspended".to_string()));
        }
        let runtime = Handle::try_current()
            .map_err(|e| AppError::Audio(format!("No async runtime for audio playback: {}", e)))?;
        let _enter = runtime.enter();

        // Gains already carry the volume, so render at unity
        let samples = synth::render(voices, 1.0, self.sample_rate);
        let wav = synth::encode_wav(&samples, self.sample_rate);

        let mut slot = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.take() {
            // Dropping the aborted task kills its child
            previous.abort();
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::Audio(format!("Failed to start '{}': {}", self.program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::Audio("Player stdin unavailable".to_string()))?;

        let guard = LiveGuard::new(&self.live);
        *slot = Some(runtime.spawn(feed_player(
            self.program.clone(),
            child,
            stdin,
            wav,
            self.timeout,
            guard,
        )));

        Ok(())
    }
}

impl Drop for CommandContext {
    fn drop(&mut self) {
        if let Some(task) = self.current.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
        }
    }
}

/// Discards everything. Used when no player is configured.
#[derive(Debug, Default)]
pub struct NullContext {
    running: AtomicBool,
}

impl AudioContext for NullContext {
    fn state(&self) -> ContextState {
        if self.running.load(Ordering::Acquire) {
            ContextState::Running
        } else {
            ContextState::Suspended
        }
    }

    fn resume(&self) -> Result<()> {
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    fn play(&self, voices: &[Voice]) -> Result<()> {
        tracing::debug!("Discarding {} voices (no audio player configured)", voices.len());
        Ok(())
    }
}
