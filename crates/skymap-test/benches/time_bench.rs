//! Benchmarks for the per-frame clock queries

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use skymap_core::Timestamp;
use skymap_time::{
    interpolate, Clock, ManualClock, RealClock, TimeTravelClock, TransitioningCompositeClock,
};

const START: Timestamp = Timestamp(1_704_067_200_000);

fn bench_real_clock_now(c: &mut Criterion) {
    let clock = RealClock::new();

    c.bench_function("real_clock_now", |b| b.iter(|| black_box(clock.now())));
}

fn bench_time_travel_now(c: &mut Criterion) {
    let wall = Arc::new(ManualClock::new(START));
    let travel = TimeTravelClock::new(wall.clone());
    travel.set_time_travel_date(Timestamp::J2000);
    for _ in 0..4 {
        travel.accelerate();
    }

    c.bench_function("time_travel_now", |b| {
        b.iter(|| {
            wall.advance_millis(16);
            black_box(travel.now())
        })
    });
}

fn bench_composite_now_in_transition(c: &mut Criterion) {
    let wall = Arc::new(ManualClock::new(START));
    let travel = Arc::new(TimeTravelClock::new(wall.clone()));
    let clock = TransitioningCompositeClock::new(travel, wall.clone());
    clock.go_time_travel(Timestamp::J2000);

    // The wall clock stays put so every query interpolates
    c.bench_function("composite_now_in_transition", |b| {
        b.iter(|| black_box(clock.now()))
    });
}

fn bench_composite_now_real_time(c: &mut Criterion) {
    let wall = Arc::new(ManualClock::new(START));
    let travel = Arc::new(TimeTravelClock::new(wall.clone()));
    let clock = TransitioningCompositeClock::new(travel, wall);

    c.bench_function("composite_now_real_time", |b| {
        b.iter(|| black_box(clock.now()))
    });
}

fn bench_interpolate(c: &mut Criterion) {
    c.bench_function("smoothstep_interpolate", |b| {
        b.iter(|| interpolate(black_box(2000.0), black_box(5000.0), black_box(0.37)))
    });
}

criterion_group!(
    benches,
    bench_real_clock_now,
    bench_time_travel_now,
    bench_composite_now_in_transition,
    bench_composite_now_real_time,
    bench_interpolate,
);
criterion_main!(benches);
