//! Where tournament results end up.
//!
//! A [`ResultSink`] receives one [`PairingResult`] per match as soon as it is played, and one
//! [`TournamentResult`] when the bracket is done.

use std::{
    fmt::Display,
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::variant::Generation;

/// How a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Win,
    Draw,
    MutualLoss,
    Foul,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Outcome::Win => "win",
            Outcome::Draw => "draw",
            Outcome::MutualLoss => "mutual-loss",
            Outcome::Foul => "foul",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingResult {
    pub tournament_id: String,
    pub generation: Generation,
    pub players: [String; 2],
    pub scores: [i32; 2],
    pub outcome: Outcome,
}

/// Players eliminated in one round of a bracket.
///
/// Round `0` holds the survivor (empty when the final ended in a mutual loss), `-1` the
/// players eliminated in the final, `-2` those eliminated in the semi-finals, and so on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Elimination {
    pub round: i32,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentResult {
    pub tournament_id: String,
    pub generation: Generation,
    /// From the first round to the survivor.
    pub eliminations: Vec<Elimination>,
}

impl TournamentResult {
    pub fn survivor(&self) -> Option<&str> {
        self.eliminated_in(0).first().map(String::as_str)
    }

    pub fn eliminated_in(&self, round: i32) -> &[String] {
        self.eliminations
            .iter()
            .find(|e| e.round == round)
            .map(|e| e.names.as_slice())
            .unwrap_or_default()
    }

    /// Round `name` was eliminated in, `0` for the survivor.
    pub fn round_of(&self, name: &str) -> Option<i32> {
        self.eliminations
            .iter()
            .find(|e| e.names.iter().any(|n| n == name))
            .map(|e| e.round)
    }
}

pub trait ResultSink: Send {
    fn record_pairing_result(&mut self, result: &PairingResult) -> anyhow::Result<()>;
    fn record_tournament_result(&mut self, result: &TournamentResult) -> anyhow::Result<()>;
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub pairings: Vec<PairingResult>,
    pub tournaments: Vec<TournamentResult>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for MemorySink {
    fn record_pairing_result(&mut self, result: &PairingResult) -> anyhow::Result<()> {
        self.pairings.push(result.clone());
        Ok(())
    }

    fn record_tournament_result(&mut self, result: &TournamentResult) -> anyhow::Result<()> {
        self.tournaments.push(result.clone());
        Ok(())
    }
}

/// One line of a [`JsonLinesSink`] file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "lowercase")]
pub enum Record {
    Pairing(PairingResult),
    Tournament(TournamentResult),
}

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("could not open '{}'", path.display()))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    fn append(&mut self, record: &Record) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer
            .flush()
            .with_context(|| format!("could not write to '{}'", self.path.display()))
    }
}

impl ResultSink for JsonLinesSink {
    fn record_pairing_result(&mut self, result: &PairingResult) -> anyhow::Result<()> {
        self.append(&Record::Pairing(result.clone()))
    }

    fn record_tournament_result(&mut self, result: &TournamentResult) -> anyhow::Result<()> {
        self.append(&Record::Tournament(result.clone()))
    }
}

/// Reads back every record of a [`JsonLinesSink`] file.
pub fn read_records(path: impl AsRef<Path>) -> anyhow::Result<Vec<Record>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("could not read '{}'", path.display()))?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).context("malformed record"))
        .collect()
}
