//! Single-slot channels between the referee and one agent.
//!
//! Each agent gets one inbound and one outbound channel of capacity 1. The referee side
//! ([`Mailbox`]) never blocks longer than the deadline it is given; the agent side
//! ([`AgentLink`]) blocks until the referee sends something or hangs up.

use std::{
    sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError},
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailboxError {
    /// The previous message is still waiting in the agent's inbox.
    #[error("timed out on write")]
    WriteTimeout,
    /// Nothing arrived in time.
    #[error("timed out on read")]
    ReadTimeout,
    /// The agent side is gone (agent returned or panicked).
    #[error("agent hung up")]
    Disconnected,
    #[error("could not encode message: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Creates the two ends of an agent connection.
pub fn channel() -> (Mailbox, AgentLink) {
    let (to_agent, inbox) = mpsc::sync_channel(1);
    let (outbox, from_agent) = mpsc::sync_channel(1);
    (
        Mailbox {
            to_agent,
            from_agent,
        },
        AgentLink {
            inbox: Inbox(inbox),
            outbox: Outbox(outbox),
        },
    )
}

/// Referee side of an agent connection.
#[derive(Debug)]
pub struct Mailbox {
    to_agent: SyncSender<Value>,
    from_agent: Receiver<Value>,
}

impl Mailbox {
    const POLL_INTERVAL: Duration = Duration::from_millis(1);

    /// Puts a message in the agent's inbox, waiting at most `timeout` for the slot to free up.
    pub fn send(&self, message: &impl Serialize, timeout: Duration) -> Result<(), MailboxError> {
        let mut value = serde_json::to_value(message)?;
        let deadline = Instant::now() + timeout;
        loop {
            match self.to_agent.try_send(value) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Disconnected(_)) => return Err(MailboxError::Disconnected),
                Err(TrySendError::Full(returned)) => {
                    if Instant::now() >= deadline {
                        return Err(MailboxError::WriteTimeout);
                    }
                    value = returned;
                    // at least 10 tries
                    thread::sleep(Self::POLL_INTERVAL.min(timeout / 10));
                }
            }
        }
    }

    /// Waits at most `timeout` for the agent's next message.
    pub fn receive(&self, timeout: Duration) -> Result<Value, MailboxError> {
        self.from_agent
            .recv_timeout(timeout)
            .map_err(|e| match e {
                RecvTimeoutError::Timeout => MailboxError::ReadTimeout,
                RecvTimeoutError::Disconnected => MailboxError::Disconnected,
            })
    }
}

/// Agent side of a connection: messages from the referee.
#[derive(Debug)]
pub struct Inbox(Receiver<Value>);

impl Inbox {
    /// Blocks until the referee sends a message.
    pub fn receive_value(&self) -> anyhow::Result<Value> {
        self.0.recv().context("referee hung up")
    }

    pub fn receive<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let value = self.receive_value()?;
        serde_json::from_value(value).context("unexpected message from referee")
    }
}

/// Agent side of a connection: messages to the referee.
#[derive(Debug, Clone)]
pub struct Outbox(SyncSender<Value>);

impl Outbox {
    /// Blocks while the previous reply has not been read.
    pub fn send_value(&self, value: Value) -> anyhow::Result<()> {
        self.0.send(value).ok().context("referee hung up")
    }

    pub fn send<T: Serialize>(&self, message: &T) -> anyhow::Result<()> {
        self.send_value(serde_json::to_value(message)?)
    }
}

/// Everything an agent gets to talk to the referee.
#[derive(Debug)]
pub struct AgentLink {
    inbox: Inbox,
    outbox: Outbox,
}

impl AgentLink {
    pub fn receive<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        self.inbox.receive()
    }

    pub fn receive_value(&self) -> anyhow::Result<Value> {
        self.inbox.receive_value()
    }

    pub fn send<T: Serialize>(&self, message: &T) -> anyhow::Result<()> {
        self.outbox.send(message)
    }

    pub fn send_value(&self, value: Value) -> anyhow::Result<()> {
        self.outbox.send_value(value)
    }

    /// Separates both directions, e.g. to pump them from different threads.
    pub fn split(self) -> (Inbox, Outbox) {
        (self.inbox, self.outbox)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(20);

    #[test]
    fn echo() {
        let (mailbox, link) = channel();
        let agent = thread::spawn(move || {
            let value = link.receive_value().unwrap();
            link.send_value(value).unwrap();
        });
        mailbox.send(&json!({"x": 1}), TIMEOUT).unwrap();
        assert_eq!(mailbox.receive(TIMEOUT).unwrap(), json!({"x": 1}));
        agent.join().unwrap();
    }

    #[test]
    fn slot_holds_one_message() {
        let (mailbox, _link) = channel();
        mailbox.send(&1, TIMEOUT).unwrap();
        assert!(matches!(
            mailbox.send(&2, TIMEOUT),
            Err(MailboxError::WriteTimeout)
        ));
    }

    #[test]
    fn silent_agent() {
        let (mailbox, _link) = channel();
        let start = Instant::now();
        assert!(matches!(
            mailbox.receive(TIMEOUT),
            Err(MailboxError::ReadTimeout)
        ));
        assert!(start.elapsed() >= TIMEOUT);
    }

    #[test]
    fn gone_agent() {
        let (mailbox, link) = channel();
        drop(link);
        assert!(matches!(
            mailbox.send(&1, TIMEOUT),
            Err(MailboxError::Disconnected)
        ));
        assert!(matches!(
            mailbox.receive(TIMEOUT),
            Err(MailboxError::Disconnected)
        ));
    }

    #[test]
    fn gone_referee() {
        let (mailbox, link) = channel();
        drop(mailbox);
        assert!(link.receive_value().is_err());
        assert!(link.send(&1).is_err());
    }
}
