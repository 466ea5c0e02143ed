// src/display/terminal.rs
//! Terminal live view of a recording session

use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, DisableLineWrap, EnableLineWrap},
};
use log::{debug, error};
use tokio::sync::mpsc;

use crate::{
    error::{LocationError, Result},
    gps::Fix,
    metrics::{format_distance, format_duration, format_pace, format_speed},
    models::SportType,
    recording::{Recorder, RecordingState},
};

/// What a key press asks the session to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    TogglePause,
    StopAndSave,
    StopAndDiscard,
    ClearError,
}

/// How the live view ended. The recorder is stopped in both cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Save,
    Discard,
}

pub fn key_command(key: &KeyEvent) -> Option<SessionCommand> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(SessionCommand::StopAndSave),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char('p') | KeyCode::Char(' ') => Some(SessionCommand::TogglePause),
        KeyCode::Char('s') => Some(SessionCommand::StopAndSave),
        KeyCode::Char('x') => Some(SessionCommand::StopAndDiscard),
        KeyCode::Char('e') => Some(SessionCommand::ClearError),
        _ => None,
    }
}

/// Everything the live view shows, captured at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct LiveStatus {
    pub sport: SportType,
    pub source: String,
    pub state: RecordingState,
    pub elapsed_seconds: u64,
    pub distance_meters: f64,
    pub sample_count: usize,
    pub position: Option<Fix>,
    pub error: Option<LocationError>,
}

impl LiveStatus {
    pub fn capture(recorder: &Recorder, sport: SportType) -> Self {
        Self {
            sport,
            source: recorder.source_name().to_string(),
            state: recorder.state(),
            elapsed_seconds: recorder.elapsed_seconds(),
            distance_meters: recorder.distance_meters(),
            sample_count: recorder.sample_count(),
            position: recorder.current_position(),
            error: recorder.location_error(),
        }
    }

    /// Body lines of the view, without colours
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("  State:     {}", self.state.to_string().to_uppercase()),
            format!("  Elapsed:   {}", format_duration(self.elapsed_seconds)),
            format!("  Distance:  {}", format_distance(self.distance_meters)),
            format!(
                "  Pace:      {}",
                format_pace(self.distance_meters, self.elapsed_seconds)
            ),
            format!("  Samples:   {}", self.sample_count),
        ];

        match &self.position {
            Some(fix) => {
                lines.push(format!(
                    "  Position:  {:.6}, {:.6}",
                    fix.latitude, fix.longitude
                ));
                if let Some(altitude) = fix.altitude {
                    lines.push(format!("  Altitude:  {:.1} m", altitude));
                }
                if let Some(speed) = fix.speed {
                    lines.push(format!("  Speed:     {}", format_speed(speed)));
                }
                if let Some(accuracy) = fix.accuracy {
                    lines.push(format!("  Accuracy:  {:.1} m", accuracy));
                }
                if let Some(satellites) = fix.satellites {
                    lines.push(format!("  Satellites: {}", satellites));
                }
            }
            None => lines.push("  Position:  waiting for fix...".to_string()),
        }

        lines
    }
}

/// Restores the terminal however the view exits
struct RawModeGuard;

impl RawModeGuard {
    fn enter(stdout: &mut impl Write) -> Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(stdout, Hide, DisableLineWrap)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, Show, EnableLineWrap) {
            error!("Failed to restore cursor: {}", e);
        }
        if let Err(e) = terminal::disable_raw_mode() {
            error!("Failed to leave raw mode: {}", e);
        }
    }
}

/// Forward key presses from a blocking reader thread
fn spawn_key_reader(running: Arc<AtomicBool>) -> mpsc::UnboundedReceiver<KeyEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            match event::poll(Duration::from_millis(200)) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => {
                        if tx.send(key).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("Failed to read terminal event: {}", e);
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to poll terminal events: {}", e);
                    break;
                }
            }
        }
        debug!("Key reader stopped");
    });
    rx
}

/// Run flag of the key reader thread, lowered when dropped
struct ReaderFlag(Arc<AtomicBool>);

impl ReaderFlag {
    fn raised() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    fn shared(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

impl Drop for ReaderFlag {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Apply a key command; `Some` ends the session
fn apply_command(recorder: &mut Recorder, command: SessionCommand) -> Result<Option<SessionEnd>> {
    match command {
        SessionCommand::TogglePause => {
            if recorder.state() == RecordingState::Paused {
                recorder.resume()?;
            } else {
                recorder.pause()?;
            }
            Ok(None)
        }
        SessionCommand::StopAndSave => Ok(Some(SessionEnd::Save)),
        SessionCommand::StopAndDiscard => Ok(Some(SessionEnd::Discard)),
        SessionCommand::ClearError => {
            recorder.clear_location_error();
            Ok(None)
        }
    }
}

/// Leave the recorder stopped whatever state the session ended in
fn stop_if_active(recorder: &mut Recorder) -> Result<()> {
    match recorder.state() {
        RecordingState::Recording | RecordingState::Paused => {
            recorder.stop()?;
            Ok(())
        }
        RecordingState::Idle | RecordingState::Saving => Ok(()),
    }
}

pub struct TerminalDisplay {
    refresh: Duration,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self {
            refresh: Duration::from_secs(1),
        }
    }

    /// Drive `recorder` from the keyboard until the user stops it.
    ///
    /// The recorder must already be recording. On return it is stopped and
    /// waiting for save or discard.
    pub async fn run(&self, recorder: &mut Recorder, sport: SportType) -> Result<SessionEnd> {
        let mut stdout = io::stdout();
        let _guard = RawModeGuard::enter(&mut stdout)?;

        let reader = ReaderFlag::raised();
        let mut keys = spawn_key_reader(reader.shared());

        let outcome = self.drive(&mut stdout, recorder, sport, &mut keys).await;
        drop(reader);

        let stopped = stop_if_active(recorder);
        execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
        let end = outcome?;
        stopped?;
        Ok(end)
    }

    async fn drive(
        &self,
        stdout: &mut io::Stdout,
        recorder: &mut Recorder,
        sport: SportType,
        keys: &mut mpsc::UnboundedReceiver<KeyEvent>,
    ) -> Result<SessionEnd> {
        let mut ticker = tokio::time::interval(self.refresh);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.render(stdout, &LiveStatus::capture(recorder, sport))?;
                }
                key = keys.recv() => {
                    let Some(key) = key else {
                        return Ok(SessionEnd::Save);
                    };
                    let Some(command) = key_command(&key) else {
                        continue;
                    };
                    if let Some(end) = apply_command(recorder, command)? {
                        return Ok(end);
                    }
                    self.render(stdout, &LiveStatus::capture(recorder, sport))?;
                }
            }
        }
    }

    fn render<W: Write>(&self, stdout: &mut W, status: &LiveStatus) -> Result<()> {
        let mut screen = Screen { out: stdout, row: 0 };

        queue!(screen.out, Clear(ClearType::All))?;
        screen.line(&"=".repeat(60), Some(Color::Green))?;
        screen.line(
            &format!("Recording {} via {}", status.sport.label(), status.source),
            Some(Color::Green),
        )?;
        screen.line(&"=".repeat(60), Some(Color::Green))?;

        let state_color = match status.state {
            RecordingState::Recording => Color::Cyan,
            RecordingState::Paused => Color::Yellow,
            _ => Color::White,
        };
        for (index, text) in status.lines().iter().enumerate() {
            let color = if index == 0 { Some(state_color) } else { None };
            screen.line(text, color)?;
        }

        if let Some(error) = status.error {
            screen.line("", None)?;
            screen.line(&format!("  ! {}", error), Some(Color::Red))?;
            screen.line("    (press e to dismiss)", Some(Color::DarkGrey))?;
        }

        screen.line("", None)?;
        screen.line(&"=".repeat(60), Some(Color::Green))?;
        screen.line(
            "p pause/resume   s stop & save   x stop & discard   Ctrl+C save",
            Some(Color::Green),
        )?;

        screen.out.flush()?;
        Ok(())
    }
}

/// Queues one full-width row after another
struct Screen<'a, W: Write> {
    out: &'a mut W,
    row: u16,
}

impl<W: Write> Screen<'_, W> {
    fn line(&mut self, text: &str, color: Option<Color>) -> io::Result<()> {
        queue!(self.out, MoveTo(0, self.row))?;
        if let Some(color) = color {
            queue!(self.out, SetForegroundColor(color))?;
        }
        queue!(self.out, Print(text), ResetColor)?;
        self.row += 1;
        Ok(())
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}
