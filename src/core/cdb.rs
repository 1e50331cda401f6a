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

// cdb.rs
//
// Common Data Bus arbiter (§4.8): at most one broadcast selected per cycle,
// first-come-first-served among stations whose result became ready this
// cycle or earlier. Generalizes the teacher's `CommonDataBus`, which has a
// single `Option<(usize, u32)>` slot and no queueing — this spec allows
// several stations to finish in the same cycle, so pending requests that
// lose the arbitration must persist instead of being dropped.

use std::collections::VecDeque;

use crate::instruction::{OpCode, RegName};

#[derive(Debug, Clone)]
pub struct BroadcastRequest {
    pub producing_station: usize,
    pub result_value: f64,
    pub dest_reg: Option<RegName>,
    pub op: OpCode,
    /// The cycle the result became available; requests are served oldest
    /// first, ties broken by station id.
    pub ready_cycle: i64,
}

#[derive(Default)]
pub struct CommonDataBus {
    pending: VecDeque<BroadcastRequest>,
}

impl CommonDataBus {
    pub fn new() -> Self {
        Self { pending: VecDeque::new() }
    }

    pub fn request(&mut self, req: BroadcastRequest) {
        self.pending.push_back(req);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Select at most one request to broadcast this cycle: the oldest by
    /// `ready_cycle`, ties broken by lowest `producing_station`. Any request
    /// not selected remains queued for the next cycle.
    pub fn select(&mut self) -> Option<BroadcastRequest> {
        if self.pending.is_empty() {
            return None;
        }
        let winner_idx = self
            .pending
            .iter()
            .enumerate()
            .min_by_key(|(_, r)| (r.ready_cycle, r.producing_station))
            .map(|(i, _)| i)?;
        self.pending.remove(winner_idx)
    }
}
