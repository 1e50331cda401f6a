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

// main.rs
//
// Command-line front end: loads a normalized instruction stream (JSON) and
// steps the cycle engine to completion, printing per-cycle trace output or a
// final register dump.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use vmips_tomasulo::config::{classic_station_counts, SimulatorConfig};
use vmips_tomasulo::instruction::{Instruction, OpCode};
use vmips_tomasulo::utils::logger::{LogLevel, Logger};
use vmips_tomasulo::CycleEngine;

#[derive(Parser)]
#[command(name = "tomasulo-sim")]
#[command(about = "A cycle-accurate Tomasulo dynamic-scheduling core for a MIPS instruction subset")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a normalized instruction stream to completion
    Run {
        /// JSON file containing a normalized instruction-stream array
        #[arg(short, long)]
        input: PathBuf,

        /// Memory size in bytes
        #[arg(short, long, default_value = "65536")]
        memory_size: usize,

        /// Cache size in bytes
        #[arg(long, default_value = "256")]
        cache_size: usize,

        /// Cache block size in bytes
        #[arg(long, default_value = "16")]
        block_size: usize,

        /// Cache hit latency in cycles
        #[arg(long, default_value = "1")]
        hit_latency: usize,

        /// Cache miss penalty in cycles
        #[arg(long, default_value = "10")]
        miss_penalty: usize,

        /// Load/store buffer capacity
        #[arg(long, default_value = "6")]
        lsb_capacity: usize,

        /// Maximum cycles to simulate before giving up
        #[arg(long, default_value = "10000")]
        max_cycles: i64,

        /// Log level (error, warn, info, debug)
        #[arg(short, long, default_value = "info")]
        log_level: String,

        /// Print the register file after every cycle
        #[arg(long)]
        trace: bool,

        /// Final-state output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Session transcript output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(serde::Serialize)]
struct RunSummary {
    cycles: i64,
    finished: bool,
    registers: Vec<(vmips_tomasulo::instruction::RegName, vmips_tomasulo::core::registers::Register)>,
    cache_hits: usize,
    cache_misses: usize,
}

fn default_latencies() -> Vec<(OpCode, usize)> {
    vec![
        (OpCode::Daddi, 1),
        (OpCode::Dsubi, 1),
        (OpCode::AddS, 2),
        (OpCode::SubS, 2),
        (OpCode::AddD, 2),
        (OpCode::SubD, 2),
        (OpCode::MulS, 6),
        (OpCode::MulD, 8),
        (OpCode::DivS, 10),
        (OpCode::DivD, 20),
        (OpCode::Beq, 1),
        (OpCode::Bne, 1),
    ]
}

fn load_program(path: &PathBuf) -> Result<Vec<Instruction>, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)?;
    let program: Vec<Instruction> = serde_json::from_str(&contents)?;
    Ok(program)
}

#[allow(clippy::too_many_arguments)]
fn run(
    input: &PathBuf,
    memory_size: usize,
    cache_size: usize,
    block_size: usize,
    hit_latency: usize,
    miss_penalty: usize,
    lsb_capacity: usize,
    max_cycles: i64,
    trace: bool,
    format: OutputFormat,
    logger: &mut Logger,
) -> Result<(), Box<dyn std::error::Error>> {
    let program = load_program(input)?;
    logger.info(&format!("loaded {} instructions from {}", program.len(), input.display()));

    let mut config = SimulatorConfig::new()
        .with_program(program)
        .with_memory_size(memory_size)
        .with_cache(cache_size, block_size, hit_latency, miss_penalty)
        .with_lsb_capacity(lsb_capacity);
    for (kind, count) in classic_station_counts() {
        config = config.with_station_count(kind, count);
    }
    for (op, cycles) in default_latencies() {
        config = config.with_latency(op, cycles);
    }

    let mut engine = config.build()?;
    while !engine.is_finished() && engine.cycle() < max_cycles {
        engine.tick()?;
        if trace {
            println!("{}", format!("--- cycle {} ---", engine.cycle()).bold());
            print_registers(&engine);
        }
    }

    let finished = engine.is_finished();
    if !finished {
        logger.warning(&format!("stopped at cycle limit {max_cycles} before the program finished"));
    } else {
        logger.info(&format!("finished after {} cycles", engine.cycle()));
    }

    match format {
        OutputFormat::Text => {
            print_registers(&engine);
            let stats = engine.memory().cache().stats();
            println!(
                "{}",
                format!(
                    "cache: {} hits, {} misses ({:.1}% miss rate)",
                    stats.hits,
                    stats.misses,
                    stats.miss_rate() * 100.0
                )
                .dimmed()
            );
        },
        OutputFormat::Json => {
            let stats = engine.memory().cache().stats();
            let summary = RunSummary {
                cycles: engine.cycle(),
                finished,
                registers: engine.registers().dump(),
                cache_hits: stats.hits,
                cache_misses: stats.misses,
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        },
    }
    Ok(())
}

fn print_registers(engine: &CycleEngine) {
    for (reg, value) in engine.registers().dump() {
        if value.qi.is_none() && value.value != 0.0 {
            println!("  {} = {}", reg.to_string().cyan(), value.value);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            input,
            memory_size,
            cache_size,
            block_size,
            hit_latency,
            miss_penalty,
            lsb_capacity,
            max_cycles,
            log_level,
            trace,
            format,
            output,
        } => {
            env_logger::Builder::new().parse_filters(&log_level).init();
            let level = match log_level.to_lowercase().as_str() {
                "error" => LogLevel::Error,
                "warn" | "warning" => LogLevel::Warning,
                "debug" => LogLevel::Debug,
                _ => LogLevel::Info,
            };
            let mut logger = Logger::new(output.as_deref().and_then(|p| p.to_str()), level);

            if let Err(err) = run(
                &input,
                memory_size,
                cache_size,
                block_size,
                hit_latency,
                miss_penalty,
                lsb_capacity,
                max_cycles,
                trace,
                format,
                &mut logger,
            ) {
                eprintln!("{}", format!("error: {err}").red());
                std::process::exit(1);
            }
        },
    }
}
