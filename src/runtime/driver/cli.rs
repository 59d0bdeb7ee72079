use std::io::{self, Write};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use thiserror::Error;

use crate::error::EngineError;
use crate::render::AnsiSink;
use crate::runtime::RoomHost;
use crate::runtime::commands::CommandBatch;

pub type DriverResult<T> = std::result::Result<T, CliDriverError>;

#[derive(Debug, Error)]
pub enum CliDriverError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("terminal error: {0}")]
    Terminal(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Owns a [`RoomHost`] and the terminal: raw mode, alternate screen, and a
/// fixed-rate commit loop. Command batches come in over a channel; the loop
/// exits after the producer hangs up and the last frame is flushed.
pub struct CliDriver {
    host: RoomHost,
    commands: Receiver<CommandBatch>,
    events: Option<Sender<Event>>,
}

impl CliDriver {
    pub fn new(host: RoomHost, commands: Receiver<CommandBatch>) -> Self {
        Self {
            host,
            commands,
            events: None,
        }
    }

    /// Forward key, mouse and paste events to the component layer.
    pub fn with_event_forwarding(mut self, events: Sender<Event>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn host(&self) -> &RoomHost {
        &self.host
    }

    pub fn run(mut self) -> DriverResult<RoomHost> {
        let mut stdout = io::stdout();
        self.enter(&mut stdout)?;
        let result = self.run_inner(&mut stdout);
        self.exit(&mut stdout);
        result.map(|()| self.host)
    }

    fn run_inner(&mut self, stdout: &mut impl Write) -> DriverResult<()> {
        let (width, height) = terminal::size()?;
        self.host.resize(width, height);
        let frame = self.host.config().frame_budget();
        let mut sink = AnsiSink::new(stdout);

        loop {
            let deadline = Instant::now() + frame;
            self.pump_events(deadline)?;
            let disconnected = self.drain_commands();
            match self.host.commit(&mut sink) {
                Ok(_) => {}
                // The damage is retained; the next tick retries it.
                Err(EngineError::Sink(_)) => {}
                Err(err) => return Err(err.into()),
            }
            if disconnected {
                break;
            }
        }
        self.host.log_metrics_snapshot();
        Ok(())
    }

    /// Handle terminal events until `deadline`.
    fn pump_events(&mut self, deadline: Instant) -> DriverResult<()> {
        loop {
            let timeout = deadline.saturating_duration_since(Instant::now());
            if timeout == Duration::ZERO || !event::poll(timeout)? {
                return Ok(());
            }
            match event::read()? {
                Event::Resize(width, height) => self.host.resize(width, height),
                other => {
                    if let Some(events) = self.events.as_ref() {
                        if events.send(other).is_err() {
                            self.events = None;
                        }
                    }
                }
            }
        }
    }

    /// Move every waiting batch into the host. Returns true once the
    /// producer side is gone.
    fn drain_commands(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(batch) => self.host.submit(batch),
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => return true,
            }
        }
    }

    fn enter(&self, stdout: &mut impl Write) -> DriverResult<()> {
        terminal::enable_raw_mode().map_err(|err| CliDriverError::Terminal(err.to_string()))?;
        execute!(stdout, EnterAlternateScreen, Hide, Clear(ClearType::All))?;
        Ok(())
    }

    fn exit(&self, stdout: &mut impl Write) {
        execute!(stdout, Show, LeaveAlternateScreen).ok();
        terminal::disable_raw_mode().ok();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::runtime::CanvasInfo;
    use crate::runtime::commands::{MutationCommand, NodeKey};

    #[test]
    fn drain_commands_queues_batches_and_reports_hangup() {
        let (tx, rx) = mpsc::channel();
        let mut driver = CliDriver::new(RoomHost::new(CanvasInfo::new(10, 2)), rx);

        tx.send(
            vec![MutationCommand::CreateText {
                key: NodeKey(1),
                content: "hi".into(),
                props: Default::default(),
            }]
            .into(),
        )
        .expect("send");
        tx.send(
            vec![MutationCommand::AppendChild {
                parent: NodeKey::ROOT,
                child: NodeKey(1),
            }]
            .into(),
        )
        .expect("send");

        assert!(!driver.drain_commands());
        drop(tx);
        assert!(driver.drain_commands());
        assert_eq!(driver.host.begin_commit(), 2);
    }
}
