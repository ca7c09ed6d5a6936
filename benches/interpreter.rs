use std::fs;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use loxparse::interpreter::Interpreter;
use loxparse::{lexer, parser, resolver};

const WORKLOADS: [(&str, &str); 2] = [
    ("fib", "tests/programs/fib/program.lox"),
    ("counter", "tests/programs/counter_closure/program.lox"),
];

fn bench_interpreter(c: &mut Criterion) {
    for (label, path) in WORKLOADS {
        let source = fs::read_to_string(path).unwrap_or_else(|err| panic!("read {path}: {err}"));

        c.bench_function(&format!("frontend_{label}"), |b| {
            b.iter(|| {
                let (tokens, diagnostics) = lexer::tokenize(black_box(&source));
                assert!(diagnostics.is_empty());
                let (statements, diagnostics) = parser::parse_tokens(tokens);
                assert!(diagnostics.is_empty());
                black_box(statements);
            })
        });

        c.bench_function(&format!("full_pipeline_{label}"), |b| {
            b.iter(|| {
                let (tokens, _) = lexer::tokenize(black_box(&source));
                let (statements, _) = parser::parse_tokens(tokens);
                let (locals, diagnostics) = resolver::resolve(&statements);
                assert!(diagnostics.is_empty());
                let mut interpreter = Interpreter::new(false);
                interpreter.resolve(locals);
                interpreter.interpret(&statements).expect("run");
                black_box(interpreter.output().len());
            })
        });
    }
}

criterion_group!(benches, bench_interpreter);
criterion_main!(benches);
