//! Benchmarks for the pointing model and sensor smoothing

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use skymap_control::{
    AstronomerModel, ExponentiallyWeightedSmoother, PlainSmootherModelAdaptor,
    RealMagneticDeclinationCalculator, SensorDampingSettings, SensorEvent, SensorKind, SensorSink,
};
use skymap_core::{LatLong, SensorDamping, Timestamp, Vector3};
use skymap_test::{SensorNoiseModel, SimulatedDevice};
use skymap_time::ManualClock;

fn model() -> Arc<AstronomerModel> {
    let model = Arc::new(AstronomerModel::new(Arc::new(
        RealMagneticDeclinationCalculator::default(),
    )));
    model.set_clock(Arc::new(ManualClock::new(Timestamp(1_704_067_200_000))));
    model.set_location(LatLong::new(37.77, -122.42));
    model
}

fn bench_pointing_classic(c: &mut Criterion) {
    let model = model();
    model
        .set_phone_sensor_values(Vector3::new(0.0, -9.8, 0.0), Vector3::new(0.0, -0.5, 1.0))
        .expect("valid readings");

    c.bench_function("pointing_classic", |b| {
        b.iter(|| black_box(model.pointing()))
    });
}

fn bench_pointing_rotation_vector(c: &mut Criterion) {
    let model = model();
    model.set_rotation_vector(&[0.1, 0.2, 0.3]);

    c.bench_function("pointing_rotation_vector", |b| {
        b.iter(|| black_box(model.pointing()))
    });
}

fn bench_smoothed_compass_reading(c: &mut Criterion) {
    let model = model();
    let adaptor = Arc::new(PlainSmootherModelAdaptor::new(model, false));
    let smoother = ExponentiallyWeightedSmoother::new(
        adaptor,
        SensorDampingSettings::magnetic_field(SensorDamping::Standard),
    );
    let mut device = SimulatedDevice::new(20.0, SensorNoiseModel::typical(), 3);

    c.bench_function("smoothed_compass_reading", |b| {
        b.iter(|| {
            if let SensorEvent::MagneticField(values) = device.magnetic_field() {
                smoother.on_sensor_values(SensorKind::MagneticField, black_box(values));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_pointing_classic,
    bench_pointing_rotation_vector,
    bench_smoothed_compass_reading,
);
criterion_main!(benches);
