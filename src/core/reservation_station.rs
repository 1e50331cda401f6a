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

// reservation_station.rs
//
// Reservation station record (§3/§4.2), generalizing the teacher's
// `timing_simulator::tomasulo::ReservationStation`: the `dest` field here
// names an architectural register directly (there is no ROB to indirect
// through), and `exec_started`/`remaining_cycles` double as the station's
// own functional-unit countdown (see `core::execution_unit`).

use std::fmt;

use crate::instruction::{Instruction, OpCode, RegName};

pub type StationId = usize;

/// Coarse category determining which bank of the station pool a station
/// belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationKind {
    FpAdd,
    FpMul,
    FpDiv,
    IntAdd,
    Load,
    Store,
    Branch,
}

impl StationKind {
    pub fn name_prefix(&self) -> &'static str {
        match self {
            StationKind::FpAdd => "Add",
            StationKind::FpMul => "Mult",
            StationKind::FpDiv => "Div",
            StationKind::IntAdd => "IntAdd",
            StationKind::Load => "Load",
            StationKind::Store => "Store",
            StationKind::Branch => "Branch",
        }
    }

    pub fn all() -> [StationKind; 7] {
        [
            StationKind::FpAdd,
            StationKind::FpMul,
            StationKind::FpDiv,
            StationKind::IntAdd,
            StationKind::Load,
            StationKind::Store,
            StationKind::Branch,
        ]
    }
}

impl fmt::Display for StationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name_prefix())
    }
}

#[derive(Debug, Clone)]
pub struct ReservationStation {
    /// Stable textual label, e.g. "Add2", "Load1". Set once at pool
    /// construction/reconfiguration and never changed.
    pub name: String,
    pub kind: StationKind,
    pub busy: bool,
    pub op: Option<OpCode>,
    pub vj: Option<f64>,
    pub vk: Option<f64>,
    pub qj: Option<StationId>,
    pub qk: Option<StationId>,
    pub a: Option<i32>,
    pub dest: Option<RegName>,
    pub instruction: Option<Instruction>,
    pub issue_cycle: i64,
    pub exec_started: bool,
    pub remaining_cycles: i64,
    /// Set once the memory system has actually enqueued this station's
    /// load/store into the LSB; only meaningful for `Load`/`Store` stations.
    /// A memory op can sit busy-but-not-dispatched for several cycles while
    /// its base/data operands are still pending or the LSB is full.
    pub mem_dispatched: bool,
    /// The LSB sequence number assigned when `mem_dispatched` went true.
    pub lsb_seq: Option<u32>,
}

impl ReservationStation {
    pub fn new(name: String, kind: StationKind) -> Self {
        Self {
            name,
            kind,
            busy: false,
            op: None,
            vj: None,
            vk: None,
            qj: None,
            qk: None,
            a: None,
            dest: None,
            instruction: None,
            issue_cycle: -1,
            exec_started: false,
            remaining_cycles: 0,
            mem_dispatched: false,
            lsb_seq: None,
        }
    }

    /// A station is ready to start execution once its required operands
    /// have arrived: loads only need the base (`qj`); stores and compute
    /// ops need both.
    pub fn is_ready(&self) -> bool {
        self.busy
            && !self.exec_started
            && self.qj.is_none()
            && (self.kind == StationKind::Load || self.qk.is_none())
    }

    pub fn reset(&mut self) {
        self.busy = false;
        self.op = None;
        self.vj = None;
        self.vk = None;
        self.qj = None;
        self.qk = None;
        self.a = None;
        self.dest = None;
        self.instruction = None;
        self.issue_cycle = -1;
        self.exec_started = false;
        self.remaining_cycles = 0;
        self.mem_dispatched = false;
        self.lsb_seq = None;
    }
}
