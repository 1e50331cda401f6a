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

// errors.rs
//
// Error kinds surfaced by the core engine. Structural hazards and CDB
// deferrals are *not* represented here: per the error-handling design they
// are ordinary stall conditions, not failures, and show up as `log::warn!`
// output instead.

use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum SimulatorError {
    /// A register name did not parse as `^[FR]\d+$` with index 0-31.
    UnknownRegister(String),
    /// A read was attempted on a register whose `qi` is still pending.
    RegisterBusy(String),
    /// A `ByteMemory` access fell outside the fixed memory size.
    BadAddress(usize),
    /// Reset-time configuration was missing or self-contradictory.
    InvalidConfiguration(String),
    /// A station became ready for an op with no configured latency.
    UnconfiguredLatency(String),
    IoError(String),
}

impl fmt::Display for SimulatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulatorError::UnknownRegister(name) => {
                write!(f, "unknown register name: {name}")
            },
            SimulatorError::RegisterBusy(name) => {
                write!(f, "register {name} has a pending producer (qi set)")
            },
            SimulatorError::BadAddress(addr) => {
                write!(f, "address out of range: 0x{addr:08X}")
            },
            SimulatorError::InvalidConfiguration(msg) => {
                write!(f, "invalid configuration: {msg}")
            },
            SimulatorError::UnconfiguredLatency(op) => {
                write!(f, "no latency configured for op {op}; engine cannot start execution")
            },
            SimulatorError::IoError(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl Error for SimulatorError {}

impl From<std::io::Error> for SimulatorError {
    fn from(error: std::io::Error) -> Self {
        SimulatorError::IoError(error.to_string())
    }
}
