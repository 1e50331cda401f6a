// engine_benchmarks.rs
//
// Throughput benchmarks for the cycle engine, grounded in the teacher's
// `benches/simulator_benchmarks.rs` (`criterion_group!`/`criterion_main!`,
// one `bench_function` per workload, `black_box` on the observed result).

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vmips_tomasulo::config::classic_station_counts;
use vmips_tomasulo::instruction::{Instruction, OpCode, RegName};
use vmips_tomasulo::SimulatorConfig;

fn daddi_chain(len: u32) -> Vec<Instruction> {
    (0..len)
        .map(|id| {
            Instruction::new(id, OpCode::Daddi)
                .with_dest(RegName::R(1))
                .with_src1(RegName::R(1))
                .with_immediate(1)
        })
        .collect()
}

fn fp_raw_chain() -> Vec<Instruction> {
    vec![
        Instruction::new(0, OpCode::LdFp).with_dest(RegName::F(6)).with_base(RegName::R(2), 0),
        Instruction::new(1, OpCode::LdFp).with_dest(RegName::F(2)).with_base(RegName::R(2), 8),
        Instruction::new(2, OpCode::MulD).with_dest(RegName::F(0)).with_src1(RegName::F(2)).with_src2(RegName::F(4)),
        Instruction::new(3, OpCode::SubD).with_dest(RegName::F(8)).with_src1(RegName::F(2)).with_src2(RegName::F(6)),
        Instruction::new(4, OpCode::DivD).with_dest(RegName::F(10)).with_src1(RegName::F(0)).with_src2(RegName::F(6)),
        Instruction::new(5, OpCode::AddD).with_dest(RegName::F(6)).with_src1(RegName::F(8)).with_src2(RegName::F(2)),
        Instruction::new(6, OpCode::SdFp).with_src1(RegName::F(6)).with_base(RegName::R(2), 8),
    ]
}

fn engine_for(program: Vec<Instruction>) -> vmips_tomasulo::CycleEngine {
    let mut config = SimulatorConfig::new()
        .with_program(program)
        .with_memory_size(1 << 16)
        .with_cache(256, 16, 1, 10)
        .with_lsb_capacity(8)
        .with_register_preset(RegName::R(2), 1000.0)
        .with_register_preset(RegName::F(4), 1.5);
    for (kind, count) in classic_station_counts() {
        config = config.with_station_count(kind, count);
    }
    for (op, cycles) in [
        (OpCode::AddD, 2),
        (OpCode::SubD, 2),
        (OpCode::MulD, 10),
        (OpCode::DivD, 40),
        (OpCode::Daddi, 1),
        (OpCode::Dsubi, 1),
    ] {
        config = config.with_latency(op, cycles);
    }
    config.build().expect("benchmark configuration is complete")
}

fn integer_chain_benchmark(c: &mut Criterion) {
    c.bench_function("daddi_chain_256", |b| {
        b.iter(|| {
            let mut engine = engine_for(daddi_chain(256));
            engine.memory_mut().memory_mut().write_f64(1000, 3.14).ok();
            engine.run(i64::MAX).unwrap();
            black_box(engine.registers().read_value(RegName::R(1)).unwrap());
        });
    });
}

fn fp_raw_chain_benchmark(c: &mut Criterion) {
    c.bench_function("fp_raw_chain", |b| {
        b.iter(|| {
            let mut engine = engine_for(fp_raw_chain());
            engine.memory_mut().memory_mut().write_f64(1000, 3.14).unwrap();
            engine.memory_mut().memory_mut().write_f64(1008, 2.71).unwrap();
            engine.run(i64::MAX).unwrap();
            black_box(engine.registers().read_value(RegName::F(6)).unwrap());
        });
    });
}

criterion_group!(benches, integer_chain_benchmark, fp_raw_chain_benchmark);
criterion_main!(benches);
