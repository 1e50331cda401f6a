// Copyright (c) 2024 Mudit Bhargava
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.
//

// config.rs
//
// Builder-style configuration for the cycle engine, generalizing
// `timing_simulator::config::{SimulatorConfig, TomasuloConfig, CacheConfig}`.
// Unlike the teacher's `CacheConfig::new`, which validates with `assert!`
// and panics on a bad configuration, `build()` here returns a `Result`: a
// misconfigured engine must be refused at construction time rather than
// panicking mid-run.

use std::collections::HashMap;

use crate::core::cycle_engine::{CycleEngine, EngineParams};
use crate::core::reservation_station::StationKind;
use crate::errors::SimulatorError;
use crate::instruction::{Instruction, OpCode, RegName};

#[derive(Debug, Clone, Copy)]
pub struct CacheParams {
    pub size: usize,
    pub block_size: usize,
    pub hit_latency: usize,
    pub miss_penalty: usize,
}

pub struct SimulatorConfig {
    program: Option<Vec<Instruction>>,
    memory_size: Option<usize>,
    cache: Option<CacheParams>,
    lsb_capacity: Option<usize>,
    station_counts: HashMap<StationKind, usize>,
    latencies: HashMap<OpCode, usize>,
    register_presets: Vec<(RegName, f64)>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatorConfig {
    pub fn new() -> Self {
        Self {
            program: None,
            memory_size: None,
            cache: None,
            lsb_capacity: None,
            station_counts: HashMap::new(),
            latencies: HashMap::new(),
            register_presets: Vec::new(),
        }
    }

    pub fn with_program(mut self, program: Vec<Instruction>) -> Self {
        self.program = Some(program);
        self
    }

    pub fn with_memory_size(mut self, size: usize) -> Self {
        self.memory_size = Some(size);
        self
    }

    pub fn with_cache(mut self, size: usize, block_size: usize, hit_latency: usize, miss_penalty: usize) -> Self {
        self.cache = Some(CacheParams { size, block_size, hit_latency, miss_penalty });
        self
    }

    pub fn with_lsb_capacity(mut self, capacity: usize) -> Self {
        self.lsb_capacity = Some(capacity);
        self
    }

    pub fn with_station_count(mut self, kind: StationKind, count: usize) -> Self {
        self.station_counts.insert(kind, count);
        self
    }

    pub fn with_latency(mut self, op: OpCode, cycles: usize) -> Self {
        self.latencies.insert(op, cycles);
        self
    }

    pub fn with_register_preset(mut self, reg: RegName, value: f64) -> Self {
        self.register_presets.push((reg, value));
        self
    }

    /// Validate and construct the engine. Every field that has no sensible
    /// default (the program to run, the memory/cache/LSB sizing) must have
    /// been set explicitly; station counts and per-op latencies default to
    /// zero/unconfigured and surface as structural hazards or
    /// `UnconfiguredLatency` at the cycle where they would actually matter,
    /// matching the error-handling design's "warn and proceed" philosophy
    /// for stalls versus "fail fast" for missing setup.
    pub fn build(self) -> Result<CycleEngine, SimulatorError> {
        let program = self
            .program
            .ok_or_else(|| SimulatorError::InvalidConfiguration("no instruction program was set".into()))?;
        let memory_size = self
            .memory_size
            .ok_or_else(|| SimulatorError::InvalidConfiguration("memory size was not set".into()))?;
        let cache = self
            .cache
            .ok_or_else(|| SimulatorError::InvalidConfiguration("cache parameters were not set".into()))?;
        let lsb_capacity = self
            .lsb_capacity
            .ok_or_else(|| SimulatorError::InvalidConfiguration("load/store buffer capacity was not set".into()))?;

        CycleEngine::new(EngineParams {
            program,
            station_counts: self.station_counts,
            latencies: self.latencies,
            memory_size,
            cache_size: cache.size,
            block_size: cache.block_size,
            hit_latency: cache.hit_latency,
            miss_penalty: cache.miss_penalty,
            lsb_capacity,
            register_presets: self.register_presets,
        })
    }
}

/// A ready-made station/latency layout matching the classic Tomasulo
/// textbook example used throughout this crate's integration tests: 3 FP
/// adders, 2 FP multipliers sharing a divider, 2 integer-add stations, 3
/// load and 3 store buffers, 1 branch station.
pub fn classic_station_counts() -> HashMap<StationKind, usize> {
    let mut counts = HashMap::new();
    counts.insert(StationKind::FpAdd, 3);
    counts.insert(StationKind::FpMul, 2);
    counts.insert(StationKind::FpDiv, 1);
    counts.insert(StationKind::IntAdd, 2);
    counts.insert(StationKind::Load, 3);
    counts.insert(StationKind::Store, 3);
    counts.insert(StationKind::Branch, 1);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_fails_without_required_fields() {
        let result = SimulatorConfig::new().build();
        assert!(matches!(result, Err(SimulatorError::InvalidConfiguration(_))));
    }

    #[test]
    fn fully_specified_config_builds() {
        let engine = SimulatorConfig::new()
            .with_program(vec![])
            .with_memory_size(4096)
            .with_cache(256, 16, 1, 10)
            .with_lsb_capacity(4)
            .build();
        assert!(engine.is_ok());
    }
}
