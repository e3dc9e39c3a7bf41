use criterion::{criterion_group, criterion_main, Criterion};
use dcpu16::assembler::assemble;
use dcpu16::report::Report;
use dcpu16::vm::{Emulator, LogLevel};

const COUNT_LOOP: &str = ":loop\n\
                          ADD A, 1\n\
                          IFN A, 0x8000\n\
                          SET PC, loop";

fn assemble_clean(source: &str) -> Vec<u32> {
    let mut report = Report::new();
    let code = assemble(source, &mut report);
    assert!(report.is_empty());
    code
}

fn bench_assemble(c: &mut Criterion) {
    c.bench_function("assemble count loop", |b| {
        b.iter(|| assemble_clean(COUNT_LOOP))
    });
}

fn bench_step(c: &mut Criterion) {
    let code = assemble_clean(COUNT_LOOP);

    c.bench_function("step count loop 10k", |b| {
        b.iter(|| {
            let mut vm = Emulator::new(LogLevel::default());
            vm.load(&code);
            for _ in 0..10_000 {
                vm.step();
            }
            vm
        })
    });
}

criterion_group!(benches, bench_assemble, bench_step);
criterion_main!(benches);
