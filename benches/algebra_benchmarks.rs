use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tempo::{
    Interp, Period, SeqSetBuffer, SeqSetView, TInstant, TSequence, TSequenceSet, TValue, Temporal,
    Timestamp, decode, encode,
};

fn ts(s: i64) -> Timestamp {
    Timestamp::from_secs(s)
}

/// A linear float set with `n` sequences of 10 instants each, with gaps.
fn make_set(n: usize) -> TSequenceSet {
    let mut sequences = Vec::with_capacity(n);
    for i in 0..n {
        let base = i as i64 * 200;
        let instants = (0..10)
            .map(|k| TInstant::new(TValue::Float((i * 10 + k) as f64), ts(base + k as i64 * 10)))
            .collect();
        sequences.push(TSequence::new(instants, Interp::Linear, true, true).unwrap());
    }
    TSequenceSet::new(sequences, false).unwrap()
}

fn benchmark_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");

    for n in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("make", n), &n, |b, &n| {
            let sequences: Vec<TSequence> = make_set(n).sequences().to_vec();
            b.iter(|| TSequenceSet::new(black_box(sequences.clone()), true).unwrap())
        });
    }

    group.bench_function("buffer_ingest_1000", |b| {
        b.iter(|| {
            let mut buf = SeqSetBuffer::with_capacity(Interp::Stepwise, 4).unwrap();
            for i in 0..1000i64 {
                buf.push_instant(TInstant::new(TValue::Int(i / 100), ts(i * 10)))
                    .unwrap();
            }
            buf.freeze().unwrap()
        })
    });

    group.finish();
}

fn benchmark_restriction(c: &mut Criterion) {
    let mut group = c.benchmark_group("restriction");

    let set = make_set(1000);
    let mid = set.period();
    let window = Period::closed(
        Timestamp::from_micros(
            (mid.lower.as_micros() + mid.upper.as_micros()) / 2 - 50_000_000,
        ),
        Timestamp::from_micros(
            (mid.lower.as_micros() + mid.upper.as_micros()) / 2 + 50_000_000,
        ),
    )
    .unwrap();

    group.bench_function("value_at", |b| {
        b.iter(|| set.value_at(black_box(ts(50_000)), true))
    });

    group.bench_function("find_timestamp", |b| {
        b.iter(|| set.find_timestamp(black_box(ts(50_000))))
    });

    group.bench_function("at_period", |b| {
        b.iter(|| set.at_period(black_box(&window)))
    });

    group.bench_function("minus_period", |b| {
        b.iter(|| set.minus_period(black_box(&window)))
    });

    group.bench_function("at_value", |b| {
        b.iter(|| set.at_value(black_box(&TValue::Float(500.0))).unwrap())
    });

    group.finish();
}

fn benchmark_combination(c: &mut Criterion) {
    let mut group = c.benchmark_group("combination");

    let a = make_set(100);
    let b_shifted = a.shift(tempo::TimeDelta::from_secs(45));

    group.bench_function("synchronize_100", |bench| {
        bench.iter(|| a.synchronize(black_box(&b_shifted), false))
    });

    group.bench_function("merge_100", |bench| {
        let far = a.shift(tempo::TimeDelta::from_secs(1_000_000));
        bench.iter(|| a.merge(black_box(&far)).unwrap())
    });

    group.finish();
}

fn benchmark_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    let set = make_set(1000);
    let value = Temporal::SequenceSet(set);
    let encoded = encode(&value);

    group.bench_function("encode_1000", |b| b.iter(|| encode(black_box(&value))));

    group.bench_function("decode_1000", |b| {
        b.iter(|| decode(black_box(&encoded)).unwrap())
    });

    group.bench_function("view_nth", |b| {
        let view = SeqSetView::parse(&encoded).unwrap();
        b.iter(|| view.sequence(black_box(500)).unwrap())
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_construction,
    benchmark_restriction,
    benchmark_combination,
    benchmark_codec
);
criterion_main!(benches);
