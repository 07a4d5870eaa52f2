//! Shared test doubles for joke pipeline and front door tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::domain::PipelineSleeper;
use crate::domain::ports::{JokeSource, JokeSourceError, NameRecord, NameSource, NameSourceError};

#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateSleeper;

#[async_trait]
impl PipelineSleeper for ImmediateSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

#[derive(Default)]
pub struct RecordingSleeper(pub Mutex<Vec<Duration>>);

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.0.lock().expect("sleeper mutex").clone()
    }
}

#[async_trait]
impl PipelineSleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.0.lock().expect("sleeper mutex").push(duration);
    }
}

/// Name source that plays back a script, then either repeats a fallback
/// error or never answers.
pub struct ScriptedNameSource {
    script: Mutex<VecDeque<Result<NameRecord, NameSourceError>>>,
    fallback: Option<NameSourceError>,
    calls: AtomicUsize,
    called_at: Mutex<Vec<Instant>>,
}

impl ScriptedNameSource {
    pub fn new(script: Vec<Result<NameRecord, NameSourceError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
            called_at: Mutex::new(Vec::new()),
        }
    }

    pub fn names(names: &[(&str, &str)]) -> Self {
        Self::new(
            names
                .iter()
                .map(|(first, last)| Ok(NameRecord::new(*first, *last)))
                .collect(),
        )
    }

    pub fn failing(error: NameSourceError) -> Self {
        Self {
            fallback: Some(error),
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn called_at(&self) -> Vec<Instant> {
        self.called_at.lock().expect("called_at mutex").clone()
    }
}

#[async_trait]
impl NameSource for ScriptedNameSource {
    async fn fetch_name(&self) -> Result<NameRecord, NameSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.called_at
            .lock()
            .expect("called_at mutex")
            .push(Instant::now());
        let next = self.script.lock().expect("script mutex").pop_front();
        match (next, &self.fallback) {
            (Some(outcome), _) => outcome,
            (None, Some(error)) => Err(error.clone()),
            (None, None) => std::future::pending().await,
        }
    }
}

/// How a [`ScriptedJokeSource`] answers.
#[derive(Debug, Clone)]
pub enum JokeBehaviour {
    /// `"<first> <last> made joke <n>"`, numbering calls from 1.
    Echo,
    /// Fail every call with the given error.
    Fail(JokeSourceError),
    /// Never answer.
    Hang,
}

pub struct ScriptedJokeSource {
    behaviour: JokeBehaviour,
    calls: AtomicUsize,
    seen: Mutex<Vec<NameRecord>>,
}

impl ScriptedJokeSource {
    pub fn new(behaviour: JokeBehaviour) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<NameRecord> {
        self.seen.lock().expect("seen mutex").clone()
    }
}

#[async_trait]
impl JokeSource for ScriptedJokeSource {
    async fn fetch_joke(&self, name: &NameRecord) -> Result<String, JokeSourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen.lock().expect("seen mutex").push(name.clone());
        match &self.behaviour {
            JokeBehaviour::Echo => Ok(format!("{name} made joke {call}")),
            JokeBehaviour::Fail(error) => Err(error.clone()),
            JokeBehaviour::Hang => std::future::pending().await,
        }
    }
}
