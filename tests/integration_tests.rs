use tempo::{
    Appended, Interp, Period, SeqSetBuffer, SeqSetView, TAvgState, TInstant, TSequence,
    TSequenceSet, TValue, Temporal, TimeDelta, Timestamp, decode, encode,
};

fn ts(s: i64) -> Timestamp {
    Timestamp::from_secs(s)
}

fn int_inst(v: i64, t: i64) -> TInstant {
    TInstant::new(TValue::Int(v), ts(t))
}

fn float_inst(v: f64, t: i64) -> TInstant {
    TInstant::new(TValue::Float(v), ts(t))
}

/// The stepwise set {[1@0, 1@10], [2@20, 2@30]} used throughout.
fn step_set() -> TSequenceSet {
    TSequenceSet::new(
        vec![
            TSequence::new(
                vec![int_inst(1, 0), int_inst(1, 10)],
                Interp::Stepwise,
                true,
                true,
            )
            .unwrap(),
            TSequence::new(
                vec![int_inst(2, 20), int_inst(2, 30)],
                Interp::Stepwise,
                true,
                true,
            )
            .unwrap(),
        ],
        false,
    )
    .unwrap()
}

#[test]
fn test_lookup_and_evaluation() {
    let set = step_set();

    assert_eq!(set.find_timestamp(ts(5)), (true, 0));
    assert_eq!(set.find_timestamp(ts(15)), (false, 1));
    assert_eq!(set.find_timestamp(ts(20)), (true, 1));

    assert_eq!(set.value_at(ts(5), true), Some(TValue::Int(1)));
    assert_eq!(set.value_at(ts(15), true), None);
    assert_eq!(set.value_at(ts(30), false), Some(TValue::Int(2)));
}

#[test]
fn test_restriction_pipeline() {
    let set = step_set();
    let window = Period::closed(ts(5), ts(25)).unwrap();

    let inside = set.at_period(&window).unwrap();
    assert_eq!(inside.num_sequences(), 2);
    assert_eq!(inside.start_timestamp(), ts(5));
    assert_eq!(inside.end_timestamp(), ts(25));

    let outside = set.minus_period(&window).unwrap();
    assert_eq!(outside.num_sequences(), 2);
    // the cut bounds are exclusive on the remainder
    assert!(!outside.sequences()[0].upper_inc());
    assert!(!outside.sequences()[1].lower_inc());

    // at + minus partition the time domain
    let total = inside.duration() + outside.duration();
    assert_eq!(total, set.duration());
}

#[test]
fn test_value_restriction() {
    let seq = TSequence::new(
        vec![float_inst(0.0, 0), float_inst(10.0, 10), float_inst(0.0, 20)],
        Interp::Linear,
        true,
        true,
    )
    .unwrap();
    let set = TSequenceSet::from_sequence(seq).unwrap();

    let at = set.at_value(&TValue::Float(5.0)).unwrap().unwrap();
    // one hit on the way up, one on the way down
    assert_eq!(at.num_instants(), 2);
    assert_eq!(at.timestamps(), vec![ts(5), ts(15)]);

    let minus = set.minus_value(&TValue::Float(5.0)).unwrap().unwrap();
    assert_eq!(minus.num_sequences(), 3);
}

#[test]
fn test_append_policy() {
    let seq = TSequence::new(
        vec![int_inst(1, 0), int_inst(1, 10)],
        Interp::Stepwise,
        true,
        true,
    )
    .unwrap();

    // same value extends in place
    match seq.append(int_inst(1, 20), None, None).unwrap() {
        Appended::Extended(ext) => {
            assert_eq!(ext.num_instants(), 2);
            assert_eq!(ext.end_timestamp(), ts(20));
        }
        Appended::Split(..) => panic!("same-value append must extend"),
    }

    // a value change splits
    match seq.append(int_inst(2, 20), None, None).unwrap() {
        Appended::Split(head, tail) => {
            assert_eq!(head.end_timestamp(), ts(10));
            assert_eq!(tail.num_instants(), 1);
            assert_eq!(*tail.start_value(), TValue::Int(2));
        }
        Appended::Extended(_) => panic!("value change must split"),
    }

    // exceeding the gap bound splits even with an equal value
    match seq
        .append(int_inst(1, 100), None, Some(TimeDelta::from_secs(30)))
        .unwrap()
    {
        Appended::Split(..) => {}
        Appended::Extended(_) => panic!("gap overflow must split"),
    }
}

#[test]
fn test_merge_and_insert() {
    let set = step_set();
    let filler = TSequenceSet::from_sequence(
        TSequence::new(
            vec![int_inst(5, 12), int_inst(5, 18)],
            Interp::Stepwise,
            true,
            true,
        )
        .unwrap(),
    )
    .unwrap();

    let merged = set.merge(&filler).unwrap();
    assert_eq!(merged.num_sequences(), 3);

    // insert additionally bridges the gaps toward the new piece
    let inserted = set.insert(&filler).unwrap();
    assert_eq!(
        inserted.period(),
        Period::closed(ts(0), ts(30)).unwrap()
    );
    assert_eq!(inserted.duration(), TimeDelta::from_secs(30));
    assert_eq!(inserted.value_at(ts(11), true), Some(TValue::Int(1)));
    assert_eq!(inserted.value_at(ts(15), true), Some(TValue::Int(5)));
    assert_eq!(inserted.value_at(ts(19), true), Some(TValue::Int(5)));
}

#[test]
fn test_update_and_delete() {
    let set = step_set();
    let patch = TSequenceSet::from_sequence(
        TSequence::new(
            vec![int_inst(9, 5), int_inst(9, 8)],
            Interp::Stepwise,
            true,
            true,
        )
        .unwrap(),
    )
    .unwrap();

    let updated = set.update(&patch).unwrap();
    assert_eq!(updated.value_at(ts(6), true), Some(TValue::Int(9)));
    assert_eq!(updated.value_at(ts(9), true), Some(TValue::Int(1)));

    let erased = set
        .delete_period(&Period::closed(ts(2), ts(4)).unwrap())
        .unwrap();
    // deletion stitches the survivors back together
    assert_eq!(erased.num_sequences(), 2);
    assert_eq!(erased.value_at(ts(3), true), Some(TValue::Int(1)));
}

#[test]
fn test_synchronize_is_symmetric() {
    let a = TSequenceSet::from_sequence(
        TSequence::new(
            vec![float_inst(0.0, 0), float_inst(10.0, 10)],
            Interp::Linear,
            true,
            true,
        )
        .unwrap(),
    )
    .unwrap();
    let b = TSequenceSet::from_sequence(
        TSequence::new(
            vec![float_inst(7.0, 5), float_inst(7.0, 15)],
            Interp::Linear,
            true,
            true,
        )
        .unwrap(),
    )
    .unwrap();

    let (a1, b1) = a.synchronize(&b, false).unwrap();
    let (b2, a2) = b.synchronize(&a, false).unwrap();
    assert_eq!(a1, a2);
    assert_eq!(b1, b2);
    assert_eq!(a1.timestamps(), b1.timestamps());

    // cross mode inserts the instant where a overtakes b into both sides
    let (a3, b3) = a.synchronize(&b, true).unwrap();
    assert_eq!(a3.timestamps(), b3.timestamps());
    assert!(a3.num_instants() > a1.num_instants());
    assert!(a3.timestamps().contains(&ts(7)));
    assert_eq!(a3.value_at(ts(7), true), Some(TValue::Float(7.0)));
    assert_eq!(b3.value_at(ts(7), true), Some(TValue::Float(7.0)));
}

#[test]
fn test_synchronize_with_discrete_shapes() {
    let set = Temporal::SequenceSet(step_set());

    // an instant inside the set pairs with the held value there
    let point = Temporal::Instant(int_inst(9, 5));
    let (l, r) = point.synchronize(&set, false).unwrap();
    assert_eq!(l, Temporal::Instant(int_inst(9, 5)));
    assert_eq!(r, Temporal::Instant(int_inst(1, 5)));

    // an instant in the gap between sequences pairs with nothing
    let gap = Temporal::Instant(int_inst(9, 15));
    assert!(gap.synchronize(&set, false).is_none());

    // discrete samples keep only the timestamps the set covers
    let samples = Temporal::Sequence(
        TSequence::new(
            vec![int_inst(7, 5), int_inst(8, 15), int_inst(9, 25)],
            Interp::Discrete,
            true,
            true,
        )
        .unwrap(),
    );
    let (ds, rs) = samples.synchronize(&set, false).unwrap();
    assert_eq!(ds.num_instants(), 2);
    assert_eq!(rs.value_at(ts(5), true), Some(TValue::Int(1)));
    assert_eq!(rs.value_at(ts(25), true), Some(TValue::Int(2)));
}

#[test]
fn test_merge_lifts_lesser_shape() {
    let set = Temporal::SequenceSet(step_set());

    // an instant in the gap becomes part of the merged timeline
    let merged = set.merge(&Temporal::Instant(int_inst(3, 15))).unwrap();
    assert_eq!(merged.value_at(ts(15), true), Some(TValue::Int(3)));
    assert_eq!(merged.value_at(ts(5), true), Some(TValue::Int(1)));

    // two discrete sequences sharing a consistent sample fuse
    let a = Temporal::Sequence(
        TSequence::new(
            vec![int_inst(1, 0), int_inst(2, 10)],
            Interp::Discrete,
            true,
            true,
        )
        .unwrap(),
    );
    let b = Temporal::Sequence(
        TSequence::new(
            vec![int_inst(2, 10), int_inst(3, 20)],
            Interp::Discrete,
            true,
            true,
        )
        .unwrap(),
    );
    let m = a.merge(&b).unwrap();
    assert_eq!(m.num_instants(), 3);
    assert_eq!(m.value_at(ts(20), true), Some(TValue::Int(3)));

    // a conflicting sample at a shared timestamp is rejected
    assert!(a.merge(&Temporal::Instant(int_inst(9, 10))).is_err());
}

#[test]
fn test_streaming_to_storage() {
    let mut buf = SeqSetBuffer::with_capacity(Interp::Stepwise, 2).unwrap();
    for (v, t) in [(1, 0), (1, 10), (2, 20), (2, 30)] {
        buf.push_instant(int_inst(v, t)).unwrap();
    }
    let set = buf.freeze().unwrap();
    assert_eq!(set, step_set());

    let encoded = encode(&Temporal::SequenceSet(set.clone()));
    let decoded = decode(&encoded).unwrap();
    assert_eq!(decoded, Temporal::SequenceSet(set.clone()));

    // and the view sees individual sequences without a full decode
    let view = SeqSetView::parse(&encoded).unwrap();
    assert_eq!(view.num_sequences(), 2);
    assert_eq!(view.sequence(0).unwrap(), set.sequences()[0]);
    assert_eq!(view.period(), set.period());
}

#[test]
fn test_codec_round_trip_all_shapes() {
    let shapes = vec![
        Temporal::Instant(float_inst(1.5, 3)),
        Temporal::Sequence(
            TSequence::new(
                vec![float_inst(1.0, 0), float_inst(2.0, 10)],
                Interp::Linear,
                true,
                false,
            )
            .unwrap(),
        ),
        Temporal::SequenceSet(step_set()),
    ];
    for shape in shapes {
        let buf = encode(&shape);
        assert_eq!(decode(&buf).unwrap(), shape);
    }
}

#[test]
fn test_aggregation_pipeline() {
    let speed_a = Temporal::Sequence(
        TSequence::new(
            vec![float_inst(10.0, 0), float_inst(10.0, 20)],
            Interp::Linear,
            true,
            true,
        )
        .unwrap(),
    );
    let speed_b = Temporal::Sequence(
        TSequence::new(
            vec![float_inst(20.0, 10), float_inst(20.0, 30)],
            Interp::Linear,
            true,
            true,
        )
        .unwrap(),
    );

    let mut state = TAvgState::new();
    state.accumulate(&speed_a).unwrap();
    state.accumulate(&speed_b).unwrap();
    let avg = state.finalize().unwrap().unwrap();

    assert_eq!(avg.value_at(ts(5), true), Some(TValue::Float(10.0)));
    assert_eq!(avg.value_at(ts(15), true), Some(TValue::Float(15.0)));
    assert_eq!(avg.value_at(ts(25), true), Some(TValue::Float(20.0)));

    // twavg over one value stays on the value itself
    let twavg = speed_a.time_weighted_average().unwrap();
    assert!((twavg - 10.0).abs() < 1e-9);
}

#[test]
fn test_interp_conversions() {
    let set = TSequenceSet::from_sequence(
        TSequence::new(
            vec![float_inst(1.0, 0), float_inst(2.0, 10), float_inst(2.0, 20)],
            Interp::Stepwise,
            true,
            true,
        )
        .unwrap(),
    )
    .unwrap();

    let linear = set.with_interp(Interp::Linear).unwrap();
    assert_eq!(linear.interp(), Interp::Linear);
    assert_eq!(linear.value_at(ts(5), true), Some(TValue::Float(1.0)));
    assert_eq!(linear.value_at(ts(15), true), Some(TValue::Float(2.0)));

    // an integer set cannot take linear interpolation
    assert!(step_set().with_interp(Interp::Linear).is_err());

    let gaps = TSequenceSet::from_instants_with_gaps(
        vec![float_inst(1.0, 0), float_inst(2.0, 10), float_inst(3.0, 100)],
        Interp::Linear,
        None,
        Some(TimeDelta::from_secs(30)),
    )
    .unwrap();
    assert_eq!(gaps.num_sequences(), 2);
}
