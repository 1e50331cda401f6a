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

// instruction.rs
//
// Normalized instruction record handed to the engine by the (out of scope)
// parser, and the opcode set of the simulated ISA subset: integer immediate
// ops, integer/FP loads and stores in two precisions, FP arithmetic in two
// precisions, and the two comparison branches.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::reservation_station::StationKind;
use crate::errors::SimulatorError;

/// An architectural register name: `F0..F31` (FP) or `R0..R31` (integer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegName {
    F(u8),
    R(u8),
}

impl RegName {
    pub fn is_fp(&self) -> bool {
        matches!(self, RegName::F(_))
    }

    pub fn index(&self) -> u8 {
        match self {
            RegName::F(i) | RegName::R(i) => *i,
        }
    }
}

impl fmt::Display for RegName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegName::F(i) => write!(f, "F{i}"),
            RegName::R(i) => write!(f, "R{i}"),
        }
    }
}

impl FromStr for RegName {
    type Err = SimulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let kind = chars.next().ok_or_else(|| SimulatorError::UnknownRegister(s.to_string()))?;
        let rest: &str = chars.as_str();
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SimulatorError::UnknownRegister(s.to_string()));
        }
        let index: u32 = rest.parse().map_err(|_| SimulatorError::UnknownRegister(s.to_string()))?;
        if index > 31 {
            return Err(SimulatorError::UnknownRegister(s.to_string()));
        }
        match kind {
            'F' => Ok(RegName::F(index as u8)),
            'R' => Ok(RegName::R(index as u8)),
            _ => Err(SimulatorError::UnknownRegister(s.to_string())),
        }
    }
}

impl Serialize for OpCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.mnemonic())
    }
}

impl<'de> Deserialize<'de> for OpCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OpCode::from_mnemonic(&s).ok_or_else(|| serde::de::Error::custom(format!("unknown opcode: {s}")))
    }
}

/// The simulated ISA subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    Daddi,
    Dsubi,
    Lw,
    Ldw,
    Ls,
    LdFp,
    Sw,
    Sdw,
    Ss,
    SdFp,
    AddS,
    SubS,
    MulS,
    DivS,
    AddD,
    SubD,
    MulD,
    DivD,
    Beq,
    Bne,
}

impl OpCode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::Daddi => "DADDI",
            OpCode::Dsubi => "DSUBI",
            OpCode::Lw => "LW",
            OpCode::Ldw => "LD",
            OpCode::Ls => "L.S",
            OpCode::LdFp => "L.D",
            OpCode::Sw => "SW",
            OpCode::Sdw => "SD",
            OpCode::Ss => "S.S",
            OpCode::SdFp => "S.D",
            OpCode::AddS => "ADD.S",
            OpCode::SubS => "SUB.S",
            OpCode::MulS => "MUL.S",
            OpCode::DivS => "DIV.S",
            OpCode::AddD => "ADD.D",
            OpCode::SubD => "SUB.D",
            OpCode::MulD => "MUL.D",
            OpCode::DivD => "DIV.D",
            OpCode::Beq => "BEQ",
            OpCode::Bne => "BNE",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Some(match s {
            "DADDI" => OpCode::Daddi,
            "DSUBI" => OpCode::Dsubi,
            "LW" => OpCode::Lw,
            "LD" => OpCode::Ldw,
            "L.S" => OpCode::Ls,
            "L.D" => OpCode::LdFp,
            "SW" => OpCode::Sw,
            "SD" => OpCode::Sdw,
            "S.S" => OpCode::Ss,
            "S.D" => OpCode::SdFp,
            "ADD.S" => OpCode::AddS,
            "SUB.S" => OpCode::SubS,
            "MUL.S" => OpCode::MulS,
            "DIV.S" => OpCode::DivS,
            "ADD.D" => OpCode::AddD,
            "SUB.D" => OpCode::SubD,
            "MUL.D" => OpCode::MulD,
            "DIV.D" => OpCode::DivD,
            "BEQ" => OpCode::Beq,
            "BNE" => OpCode::Bne,
            _ => return None,
        })
    }

    pub fn is_load(&self) -> bool {
        matches!(self, OpCode::Lw | OpCode::Ldw | OpCode::Ls | OpCode::LdFp)
    }

    pub fn is_store(&self) -> bool {
        matches!(self, OpCode::Sw | OpCode::Sdw | OpCode::Ss | OpCode::SdFp)
    }

    pub fn is_memory(&self) -> bool {
        self.is_load() || self.is_store()
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, OpCode::Beq | OpCode::Bne)
    }

    pub fn is_immediate(&self) -> bool {
        matches!(self, OpCode::Daddi | OpCode::Dsubi)
    }

    /// Size in bytes of the memory operand this op addresses (word vs
    /// doubleword); meaningless for non-memory ops.
    pub fn operand_bytes(&self) -> usize {
        match self {
            OpCode::Lw | OpCode::Sw | OpCode::Ls | OpCode::Ss => 4,
            OpCode::Ldw | OpCode::Sdw | OpCode::LdFp | OpCode::SdFp => 8,
            _ => 0,
        }
    }

    /// Which bank of the station pool this op draws its reservation station
    /// from.
    pub fn station_kind(&self) -> StationKind {
        match self {
            OpCode::Daddi | OpCode::Dsubi => StationKind::IntAdd,
            OpCode::AddS | OpCode::SubS | OpCode::AddD | OpCode::SubD => StationKind::FpAdd,
            OpCode::MulS | OpCode::MulD => StationKind::FpMul,
            OpCode::DivS | OpCode::DivD => StationKind::FpDiv,
            OpCode::Lw | OpCode::Ldw | OpCode::Ls | OpCode::LdFp => StationKind::Load,
            OpCode::Sw | OpCode::Sdw | OpCode::Ss | OpCode::SdFp => StationKind::Store,
            OpCode::Beq | OpCode::Bne => StationKind::Branch,
        }
    }

    /// Whether the destination (for loads/arithmetic) is an FP register.
    pub fn dest_is_fp(&self) -> bool {
        matches!(
            self,
            OpCode::Ls
                | OpCode::LdFp
                | OpCode::AddS
                | OpCode::SubS
                | OpCode::MulS
                | OpCode::DivS
                | OpCode::AddD
                | OpCode::SubD
                | OpCode::MulD
                | OpCode::DivD
        )
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// A normalized instruction record: the parser's (out of scope) output and
/// the engine's sole input, plus engine-written pipeline timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instruction {
    pub id: u32,
    pub op: OpCode,
    pub dest: Option<RegName>,
    pub src1: Option<RegName>,
    pub src2: Option<RegName>,
    pub base_reg: Option<RegName>,
    #[serde(default)]
    pub offset: i32,
    #[serde(default)]
    pub immediate: i32,

    #[serde(skip, default)]
    pub issue_cycle: Option<i64>,
    #[serde(skip, default)]
    pub exec_start: Option<i64>,
    #[serde(skip, default)]
    pub exec_end: Option<i64>,
    #[serde(skip, default)]
    pub write_cycle: Option<i64>,
}

impl Instruction {
    pub fn new(id: u32, op: OpCode) -> Self {
        Self {
            id,
            op,
            dest: None,
            src1: None,
            src2: None,
            base_reg: None,
            offset: 0,
            immediate: 0,
            issue_cycle: None,
            exec_start: None,
            exec_end: None,
            write_cycle: None,
        }
    }

    pub fn with_dest(mut self, reg: RegName) -> Self {
        self.dest = Some(reg);
        self
    }

    pub fn with_src1(mut self, reg: RegName) -> Self {
        self.src1 = Some(reg);
        self
    }

    pub fn with_src2(mut self, reg: RegName) -> Self {
        self.src2 = Some(reg);
        self
    }

    pub fn with_base(mut self, reg: RegName, offset: i32) -> Self {
        self.base_reg = Some(reg);
        self.offset = offset;
        self
    }

    pub fn with_immediate(mut self, imm: i32) -> Self {
        self.immediate = imm;
        self
    }
}
