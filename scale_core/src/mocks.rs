//! Test and helper mocks for scale_core

use std::collections::VecDeque;

use crate::decoder::{BitOrdering, RawSample, to_magnitude};
use crate::error::{Result, ScaleError};
use crate::sampler::RawSource;

/// Replays a fixed sequence of read outcomes, then times out forever.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: VecDeque<Result<RawSample>>,
    reads: usize,
}

impl ScriptedSource {
    pub fn new(outcomes: impl IntoIterator<Item = Result<i32>>) -> Self {
        Self {
            script: outcomes
                .into_iter()
                .map(|r| r.map(|v| RawSample::from_wire(to_magnitude(v), BitOrdering::REFERENCE)))
                .collect(),
            reads: 0,
        }
    }

    /// Successful reads only.
    pub fn values(values: impl IntoIterator<Item = i32>) -> Self {
        Self::new(values.into_iter().map(Ok))
    }

    /// Raw wire words, to be reassembled by the caller under any ordering.
    pub fn wires(words: impl IntoIterator<Item = u32>) -> Self {
        Self {
            script: words
                .into_iter()
                .map(|w| Ok(RawSample::from_wire(w, BitOrdering::REFERENCE)))
                .collect(),
            reads: 0,
        }
    }

    /// Number of `acquire` calls so far.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl RawSource for ScriptedSource {
    fn acquire(&mut self) -> Result<RawSample> {
        self.reads += 1;
        self.script.pop_front().unwrap_or(Err(ScaleError::Timeout))
    }
}
