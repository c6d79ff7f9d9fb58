use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use ubjson::UbjReader;
use ubjson_error::{ErrorExt, ResultExt, StackError, UbjError};

fn make_unexpected() -> UbjError {
    UbjError::UnexpectedMarker {
        found: b'D',
        expected: vec![b'T', b'F'],
        position: 4096,
    }
}

fn make_truncated() -> UbjError {
    UbjError::UnexpectedEof {
        context: "reading int64 body".to_string(),
        position: 17,
        expected_bytes: 8,
        got_bytes: 3,
    }
}

pub fn bench_create(c: &mut Criterion) {
    c.bench_function("create_unexpected_marker", |b| {
        b.iter(|| black_box(make_unexpected()))
    });

    c.bench_function("create_stack_error", |b| {
        b.iter(|| black_box(StackError::new(make_truncated())))
    });
}

pub fn bench_inspect(c: &mut Criterion) {
    let stack = StackError::new(make_unexpected()).context("reading array element");

    c.bench_function("status_code_and_kind", |b| {
        b.iter(|| {
            black_box(stack.status_code());
            black_box(stack.kind());
        })
    });

    c.bench_function("position_downcast", |b| {
        b.iter(|| black_box(stack.position()))
    });

    let err = make_unexpected();
    c.bench_function("display_unexpected_marker", |b| {
        b.iter(|| black_box(err.to_string()))
    });
    c.bench_function("root_status_code", |b| b.iter(|| black_box(err.status_code())));
}

pub fn bench_context(c: &mut Criterion) {
    c.bench_function("result_context", |b| {
        b.iter(|| {
            let res: Result<(), UbjError> = Err(make_truncated());
            black_box(res.context("loading document"))
        })
    });

    c.bench_function("result_with_context_ok_path", |b| {
        b.iter(|| {
            let res: Result<u32, UbjError> = Ok(black_box(7));
            black_box(res.with_context(|| format!("element {}", 7)))
        })
    });
}

/// Цена ошибки на реальном читателе: неверный маркер и обрыв потока.
pub fn bench_reader_failures(c: &mut Criterion) {
    let mismatch = [b'D', 0, 0, 0, 0, 0, 0, 0, 0];
    c.bench_function("reader_mismatched_marker", |b| {
        b.iter(|| {
            let mut r = UbjReader::new(&mismatch[..]);
            black_box(r.read_boolean().unwrap_err())
        })
    });

    let truncated = [b'L', 0, 0, 0];
    c.bench_function("reader_truncated_body", |b| {
        b.iter(|| {
            let mut r = UbjReader::new(&truncated[..]);
            black_box(r.read_int64().unwrap_err())
        })
    });
}

criterion_group!(
    benches,
    bench_create,
    bench_inspect,
    bench_context,
    bench_reader_failures
);
criterion_main!(benches);
