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

// station_pool.rs
//
// Typed banks of reservation stations (§4.2). Flattened into a single
// `Vec<ReservationStation>` the way the teacher's
// `TomasuloProcessor::reservation_stations` is one flat vec — station ids
// are just indices into it, kept deterministic (lowest index first) so
// the naming scheme (`Add1..AddN`, `Load1..`, ...) is stable.

use std::collections::HashMap;

use crate::core::reservation_station::{ReservationStation, StationId, StationKind};

pub struct StationPool {
    stations: Vec<ReservationStation>,
    counts: HashMap<StationKind, usize>,
}

impl StationPool {
    pub fn new(counts: HashMap<StationKind, usize>) -> Self {
        let mut pool = Self { stations: Vec::new(), counts: HashMap::new() };
        pool.reconfigure(counts);
        pool
    }

    /// Re-create the banks. Only valid when no station is busy (user
    /// reconfiguration or engine reset).
    pub fn reconfigure(&mut self, counts: HashMap<StationKind, usize>) {
        assert!(
            self.stations.iter().all(|s| !s.busy),
            "cannot reconfigure the station pool while stations are busy"
        );
        self.stations.clear();
        for kind in StationKind::all() {
            let n = *counts.get(&kind).unwrap_or(&0);
            for i in 1..=n {
                let name = format!("{}{}", kind.name_prefix(), i);
                self.stations.push(ReservationStation::new(name, kind));
            }
        }
        self.counts = counts;
    }

    pub fn count_of(&self, kind: StationKind) -> usize {
        *self.counts.get(&kind).unwrap_or(&0)
    }

    /// First non-busy station of `kind` (lowest index first, i.e.
    /// deterministic naming order).
    pub fn allocate(&mut self, kind: StationKind) -> Option<StationId> {
        self.stations.iter().position(|s| s.kind == kind && !s.busy)
    }

    pub fn release(&mut self, id: StationId) {
        self.stations[id].reset();
    }

    pub fn get(&self, id: StationId) -> &ReservationStation {
        &self.stations[id]
    }

    pub fn get_mut(&mut self, id: StationId) -> &mut ReservationStation {
        &mut self.stations[id]
    }

    pub fn iter(&self) -> impl Iterator<Item = (StationId, &ReservationStation)> {
        self.stations.iter().enumerate()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ReservationStation> {
        self.stations.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn all_idle(&self) -> bool {
        self.stations.iter().all(|s| !s.busy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts() -> HashMap<StationKind, usize> {
        let mut c = HashMap::new();
        c.insert(StationKind::Load, 2);
        c.insert(StationKind::FpAdd, 1);
        c
    }

    #[test]
    fn allocation_is_lowest_index_first_and_deterministic() {
        let mut pool = StationPool::new(counts());
        let l1 = pool.allocate(StationKind::Load).unwrap();
        assert_eq!(pool.get(l1).name, "Load1");
        pool.get_mut(l1).busy = true;
        let l2 = pool.allocate(StationKind::Load).unwrap();
        assert_eq!(pool.get(l2).name, "Load2");
        pool.get_mut(l2).busy = true;
        assert!(pool.allocate(StationKind::Load).is_none());
    }

    #[test]
    fn released_station_is_immediately_reusable() {
        let mut pool = StationPool::new(counts());
        let a = pool.allocate(StationKind::FpAdd).unwrap();
        pool.get_mut(a).busy = true;
        assert!(pool.allocate(StationKind::FpAdd).is_none());
        pool.release(a);
        let a2 = pool.allocate(StationKind::FpAdd).unwrap();
        assert_eq!(a, a2);
    }
}
