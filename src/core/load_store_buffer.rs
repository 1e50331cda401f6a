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

// load_store_buffer.rs
//
// In-order load/store buffer with address-overlap stalling (§4.4). There is
// no direct teacher analogue (the teacher's pipeline has no LSB at all —
// its in-order `Pipeline` charges a flat memory-stage latency and its
// Tomasulo processor has no memory ordering discipline beyond the ROB);
// this module is grounded on the teacher's `VecDeque`-based FIFO style
// (`TomasuloProcessor::reorder_buffer`) generalized to carry address ranges
// and tick with earlier-wins overlap stalling instead of plain commit order.

use std::collections::VecDeque;

use crate::errors::SimulatorError;
use crate::instruction::{OpCode, RegName};

#[derive(Debug, Clone)]
pub struct LsbEntry {
    pub seq: u32,
    pub op: OpCode,
    pub address: usize,
    pub size: usize,
    pub is_load: bool,
    /// Store data (loads ignore this; it is filled in at enqueue time).
    pub store_value: Option<f64>,
    pub dest_reg: Option<RegName>,
    pub owning_station: usize,
    pub remaining_cycles: i64,
}

impl LsbEntry {
    fn range(&self) -> (usize, usize) {
        (self.address, self.address + self.size - 1)
    }

    fn overlaps(&self, other: &LsbEntry) -> bool {
        let (a0, a1) = self.range();
        let (b0, b1) = other.range();
        a0 <= b1 && b0 <= a1
    }
}

/// What a committed entry produces for the engine to act on.
pub enum CommittedOp {
    Load { owning_station: usize, dest_reg: Option<RegName>, value_bits: Vec<u8>, op: OpCode },
    Store { owning_station: usize, op: OpCode },
}

pub struct LoadStoreBuffer {
    max_size: usize,
    entries: VecDeque<LsbEntry>,
    next_seq: u32,
}

impl LoadStoreBuffer {
    pub fn new(max_size: usize) -> Self {
        Self { max_size, entries: VecDeque::new(), next_seq: 0 }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_size
    }

    /// Returns `None` (a structural hazard, not an error) when the buffer is
    /// full; the caller retries the same op next cycle.
    #[allow(clippy::too_many_arguments)]
    pub fn enqueue(
        &mut self,
        op: OpCode,
        address: usize,
        size: usize,
        is_load: bool,
        store_value: Option<f64>,
        dest_reg: Option<RegName>,
        owning_station: usize,
        latency: usize,
    ) -> Option<u32> {
        if self.is_full() {
            return None;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(LsbEntry {
            seq,
            op,
            address,
            size,
            is_load,
            store_value,
            dest_reg,
            owning_station,
            remaining_cycles: latency as i64,
        });
        Some(seq)
    }

    /// Decrement every busy entry whose address range does not overlap an
    /// earlier still-busy entry; entries reaching zero commit via `commit`
    /// and are removed. `commit` is the caller-supplied closure that
    /// performs the actual cache read/write and returns the value read (for
    /// loads).
    pub fn tick<F>(&mut self, mut commit: F) -> Result<Vec<CommittedOp>, SimulatorError>
    where
        F: FnMut(&LsbEntry) -> Result<Vec<u8>, SimulatorError>,
    {
        let mut completed = Vec::new();
        let mut to_remove = Vec::new();

        // Evaluate stall/tick decisions against a fixed earlier-wins
        // snapshot, then mutate.
        let snapshot: Vec<LsbEntry> = self.entries.iter().cloned().collect();
        for (idx, entry) in self.entries.iter_mut().enumerate() {
            let stalled = snapshot[..idx].iter().any(|earlier| earlier.overlaps(entry));
            if stalled {
                continue;
            }
            entry.remaining_cycles -= 1;
            if entry.remaining_cycles <= 0 {
                to_remove.push(idx);
            }
        }

        // Commit in program order (the order they appear, which is seq
        // order) so overlapping same-cycle completions still serialize.
        for &idx in &to_remove {
            let entry = &self.entries[idx];
            let value_bits = commit(entry)?;
            if entry.is_load {
                completed.push(CommittedOp::Load {
                    owning_station: entry.owning_station,
                    dest_reg: entry.dest_reg,
                    value_bits,
                    op: entry.op,
                });
            } else {
                completed.push(CommittedOp::Store { owning_station: entry.owning_station, op: entry.op });
            }
        }
        // Remove highest index first to keep earlier indices valid.
        for &idx in to_remove.iter().rev() {
            self.entries.remove(idx);
        }
        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_buffer_reports_structural_hazard() {
        let mut lsb = LoadStoreBuffer::new(1);
        assert!(lsb.enqueue(OpCode::Lw, 0, 4, true, None, None, 0, 2).is_some());
        assert!(lsb.enqueue(OpCode::Lw, 4, 4, true, None, None, 1, 2).is_none());
    }

    #[test]
    fn overlapping_load_stalls_behind_earlier_store() {
        let mut lsb = LoadStoreBuffer::new(8);
        lsb.enqueue(OpCode::Sdw, 100, 8, false, Some(42.0), None, 0, 2).unwrap();
        lsb.enqueue(OpCode::Ldw, 100, 8, true, None, Some(RegName::R(3)), 1, 1).unwrap();

        // Cycle 1: store ticks to 1 remaining; load is stalled behind it
        // (never decremented) even though its own latency is 1.
        let committed = lsb.tick(|_| Ok(vec![0, 0, 0, 0])).unwrap();
        assert!(committed.is_empty());

        // Cycle 2: store commits and is removed; load is now unstalled but
        // has not ticked yet this cycle boundary since store occupied idx 0.
        let committed = lsb.tick(|_| Ok(vec![0, 0, 0, 0])).unwrap();
        assert_eq!(committed.len(), 1);
        assert!(matches!(committed[0], CommittedOp::Store { .. }));

        // Cycle 3: load, no longer stalled, ticks down and commits.
        let committed = lsb.tick(|_| Ok(vec![0, 0, 0, 42])).unwrap();
        assert_eq!(committed.len(), 1);
        assert!(matches!(committed[0], CommittedOp::Load { .. }));
    }
}
