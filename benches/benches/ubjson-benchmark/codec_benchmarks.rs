use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use ubjson::{CodecConfig, ContainerLength, TypeMarker, UbjReader, UbjWriter};

// ============================================================================
// Helper functions для создания тестовых данных
// ============================================================================

fn create_text(size: usize) -> String {
    // смесь ASCII и многобайтовых символов
    "abcdéfgh€🦀".chars().cycle().take(size).collect()
}

fn encode_ints(count: usize) -> Vec<u8> {
    let mut rng = SmallRng::seed_from_u64(42);
    let mut w = UbjWriter::new(Vec::new());
    w.write_array_header(count).unwrap();
    for _ in 0..count {
        w.write_int64(rng.gen()).unwrap();
    }
    w.into_inner()
}

fn encode_document(entries: usize) -> Vec<u8> {
    let mut w = UbjWriter::new(Vec::new());
    w.write_object_header(ContainerLength::Unbounded).unwrap();
    for i in 0..entries {
        w.write_string(&format!("key_{i}")).unwrap();
        w.write_array_header(3usize).unwrap();
        w.write_double(i as f64).unwrap();
        w.write_string(&format!("value_{i}")).unwrap();
        w.write_boolean(i % 2 == 0).unwrap();
    }
    w.write_end().unwrap();
    w.into_inner()
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_scalars(c: &mut Criterion) {
    let mut group = c.benchmark_group("scalars");

    for count in [100usize, 10_000].iter() {
        let encoded = encode_ints(*count);
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("int64/encode", count), count, |b, &n| {
            b.iter(|| {
                let mut w = UbjWriter::new(Vec::with_capacity(n * 9 + 5));
                w.write_array_header(n).unwrap();
                for i in 0..n {
                    w.write_int64(black_box(i as i64)).unwrap();
                }
                black_box(w.into_inner())
            })
        });

        group.bench_with_input(
            BenchmarkId::new("int64/decode", count),
            &encoded,
            |b, data| {
                b.iter(|| {
                    let mut r = UbjReader::new(data.as_slice());
                    let n = r.read_array_length().unwrap().count().unwrap();
                    let mut sum = 0i64;
                    for _ in 0..n {
                        sum = sum.wrapping_add(r.read_int64().unwrap());
                    }
                    black_box(sum)
                })
            },
        );
    }

    group.finish();
}

fn bench_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("text");

    for size in [16usize, 1024, 64 * 1024].iter() {
        let text = create_text(*size);
        let mut w = UbjWriter::new(Vec::new());
        w.write_string(&text).unwrap();
        let encoded = w.into_inner();
        group.throughput(Throughput::Bytes(text.len() as u64));

        group.bench_with_input(BenchmarkId::new("string/encode", size), &text, |b, t| {
            let mut w = UbjWriter::new(Vec::with_capacity(t.len() + 5));
            b.iter(|| {
                w.get_mut().clear();
                w.write_string(black_box(t)).unwrap();
            })
        });

        group.bench_with_input(
            BenchmarkId::new("string/decode", size),
            &encoded,
            |b, data| {
                let mut out = String::new();
                b.iter(|| {
                    out.clear();
                    let mut r = UbjReader::new(data.as_slice());
                    r.read_string_into(&mut out).unwrap();
                    black_box(out.len())
                })
            },
        );

        // маленький буфер: много порций и разрезанных символов
        let cfg = CodecConfig::new().with_buffer_size(64);
        group.bench_with_input(
            BenchmarkId::new("string/decode_small_buffer", size),
            &encoded,
            |b, data| {
                b.iter(|| {
                    let mut r = UbjReader::with_config(data.as_slice(), &cfg).unwrap();
                    black_box(r.read_string().unwrap())
                })
            },
        );
    }

    group.finish();
}

fn bench_documents(c: &mut Criterion) {
    let mut group = c.benchmark_group("documents");
    group.sample_size(50);

    for entries in [10usize, 1000].iter() {
        let encoded = encode_document(*entries);
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_with_input(BenchmarkId::new("walk", entries), &encoded, |b, data| {
            b.iter(|| {
                let mut r = UbjReader::new(data.as_slice());
                r.read_object_length().unwrap();
                let mut seen = 0usize;
                while r.next_type().unwrap() != Some(TypeMarker::End) {
                    r.read_string().unwrap();
                    r.read_array_length().unwrap();
                    r.read_double().unwrap();
                    r.read_string().unwrap();
                    r.read_boolean().unwrap();
                    seen += 1;
                }
                black_box(seen)
            })
        });

        group.bench_with_input(BenchmarkId::new("skip", entries), &encoded, |b, data| {
            b.iter(|| {
                let mut r = UbjReader::new(data.as_slice());
                black_box(r.skip_value().unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_scalars, bench_text, bench_documents);
criterion_main!(benches);
