use tempo::{
    Appended, Interp, Period, SeqSetBuffer, TInstant, TSequence, TSequenceSet, TValue, Temporal,
    TimeDelta, Timestamp, decode, encode,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug to see detailed logs)
    env_logger::init();

    println!("=== Tempo - Getting Started ===\n");

    // === BUILDING A TEMPORAL VALUE ===
    println!("1. Building a Temporal Value");
    println!("----------------------------");

    // A vehicle speed sampled once a minute, linearly interpolated
    let speed = TSequence::new(
        vec![
            TInstant::new(TValue::Float(0.0), Timestamp::from_secs(0)),
            TInstant::new(TValue::Float(50.0), Timestamp::from_secs(60)),
            TInstant::new(TValue::Float(30.0), Timestamp::from_secs(120)),
        ],
        Interp::Linear,
        true,
        true,
    )?;
    println!("   Speed profile: {}", speed.format(3));
    println!(
        "   Speed 30s in: {:?}",
        speed.value_at(Timestamp::from_secs(30), true)
    );
    println!("   Time-weighted average: {:.1}\n", speed.time_weighted_average()?);

    // === RESTRICTION ===
    println!("2. Restriction");
    println!("--------------");

    let window = Period::closed(Timestamp::from_secs(30), Timestamp::from_secs(90))?;
    let clipped = speed.at_period(&window).unwrap();
    println!("   Restricted to [30s, 90s]: {}", clipped.format(3));

    let fast = speed.at_value_span(&tempo::Span::closed(40.0, 50.0)?)?;
    println!("   Moments at 40-50 speed: {} piece(s)\n", fast.len());

    // === STREAMING INGESTION ===
    println!("3. Streaming Ingestion");
    println!("----------------------");

    let mut buf = SeqSetBuffer::with_capacity(Interp::Stepwise, 4)?
        .with_gap_policy(None, Some(TimeDelta::from_secs(300)));
    for (gear, t) in [(1i64, 0i64), (2, 60), (2, 120), (3, 1800)] {
        buf.push_instant(TInstant::new(TValue::Int(gear), Timestamp::from_secs(t)))?;
    }
    println!("   Ingested 4 samples into {} sequence(s)", buf.num_sequences());
    let gears = buf.freeze()?;
    println!("   Frozen: {}\n", gears.format(3));

    // === APPEND SEMANTICS ===
    println!("4. Append Semantics");
    println!("-------------------");

    let seq = gears.sequences().last().unwrap().clone();
    match seq.append(
        TInstant::new(TValue::Int(3), Timestamp::from_secs(1860)),
        None,
        None,
    )? {
        Appended::Extended(ext) => println!("   Same gear extends: {}", ext.format(3)),
        Appended::Split(..) => println!("   Unexpected split"),
    }

    // === PACKED ENCODING ===
    println!("\n5. Packed Encoding");
    println!("------------------");

    let value = Temporal::SequenceSet(TSequenceSet::from_sequence(speed)?);
    let encoded = encode(&value);
    println!("   Encoded to {} bytes", encoded.len());
    let round_tripped = decode(&encoded)?;
    println!("   Round-trips equal: {}", round_tripped == value);

    println!("\n=== Done ===");
    Ok(())
}
