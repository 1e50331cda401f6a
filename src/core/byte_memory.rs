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

// byte_memory.rs
//
// Fixed-size byte array backing the simulated address space, with
// big-endian word/doubleword accessors (§3, §4.3). Grounded in the
// teacher's `functional_simulator::memory::Memory`, stripped of its memory
// regions/mapped-devices/translation machinery (out of this spec's scope)
// and switched from little-endian to big-endian encoding as required.

use crate::errors::SimulatorError;

pub struct ByteMemory {
    data: Vec<u8>,
}

impl ByteMemory {
    pub fn new(size: usize) -> Self {
        Self { data: vec![0; size] }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    fn check_range(&self, addr: usize, len: usize) -> Result<(), SimulatorError> {
        if addr.checked_add(len).map(|end| end > self.data.len()).unwrap_or(true) {
            return Err(SimulatorError::BadAddress(addr));
        }
        Ok(())
    }

    pub fn read_bytes(&self, addr: usize, len: usize) -> Result<&[u8], SimulatorError> {
        self.check_range(addr, len)?;
        Ok(&self.data[addr..addr + len])
    }

    pub fn write_bytes(&mut self, addr: usize, bytes: &[u8]) -> Result<(), SimulatorError> {
        self.check_range(addr, bytes.len())?;
        self.data[addr..addr + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn read_word(&self, addr: usize) -> Result<u32, SimulatorError> {
        let bytes = self.read_bytes(addr, 4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn write_word(&mut self, addr: usize, value: u32) -> Result<(), SimulatorError> {
        self.write_bytes(addr, &value.to_be_bytes())
    }

    pub fn read_doubleword(&self, addr: usize) -> Result<u64, SimulatorError> {
        let bytes = self.read_bytes(addr, 8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(arr))
    }

    pub fn write_doubleword(&mut self, addr: usize, value: u64) -> Result<(), SimulatorError> {
        self.write_bytes(addr, &value.to_be_bytes())
    }

    /// Read a big-endian `f64` at `addr`.
    pub fn read_f64(&self, addr: usize) -> Result<f64, SimulatorError> {
        Ok(f64::from_bits(self.read_doubleword(addr)?))
    }

    pub fn write_f64(&mut self, addr: usize, value: f64) -> Result<(), SimulatorError> {
        self.write_doubleword(addr, value.to_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_round_trip_is_big_endian() {
        let mut mem = ByteMemory::new(16);
        mem.write_word(0, 0x01020304).unwrap();
        assert_eq!(mem.read_bytes(0, 4).unwrap(), &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(mem.read_word(0).unwrap(), 0x01020304);
    }

    #[test]
    fn doubleword_round_trip() {
        let mut mem = ByteMemory::new(16);
        mem.write_f64(0, 3.14).unwrap();
        assert_eq!(mem.read_f64(0).unwrap(), 3.14);
    }

    #[test]
    fn out_of_range_is_bad_address() {
        let mem = ByteMemory::new(8);
        assert!(matches!(mem.read_word(6), Err(SimulatorError::BadAddress(6))));
    }
}
