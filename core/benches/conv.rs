#[macro_use]
extern crate criterion;
extern crate umbra_core;

use criterion::Criterion;

use umbra_core::internal::*;

fn setup(
    c: usize,
    h: usize,
    w: usize,
    co: usize,
    group: usize,
    kernel: usize,
) -> (Workspace, Box<dyn Operator>) {
    let mut ws = Workspace::default();
    let len = c * h * w;
    let image: Vec<f32> = (0..len).map(|i| (i % 17) as f32 / 17.).collect();
    ws.create::<f32>("image", &[1, c, h, w]).unwrap().set_data(&image).unwrap();
    ws.create::<f32>("kernel", &[co, c / group, kernel, kernel]).unwrap().fill(0.1f32).unwrap();
    ws.create::<f32>("bias", &[co]).unwrap();
    ws.create::<f32>("output", &[]).unwrap();
    let param = OpParam::new(
        "conv",
        "Conv",
        &["image", "kernel", "bias"],
        &["output"],
        vec![
            Argument::int("num_output", co as i32),
            Argument::int("kernel_size", kernel as i32),
            Argument::int("pad", kernel as i32 / 2),
            Argument::int("group", group as i32),
        ],
    );
    let op = Registry::native().build(&param, &ws).unwrap();
    (ws, op)
}

fn b(c: &mut Criterion, name: &str, ci: usize, hw: usize, co: usize, group: usize, kernel: usize) {
    let (ws, mut op) = setup(ci, hw, hw, co, group, kernel);
    c.bench_function(name, move |b| b.iter(|| op.forward(&ws).unwrap()));
}

fn depthwise(c: &mut Criterion) {
    b(c, "depthwise_32x56x56_3x3", 32, 56, 32, 32, 3);
}

fn grouped_im2col(c: &mut Criterion) {
    b(c, "grouped_32x56x56_3x3_g16", 32, 56, 32, 16, 3);
}

fn dense_im2col(c: &mut Criterion) {
    b(c, "dense_32x56x56_3x3", 32, 56, 32, 1, 3);
}

fn pointwise(c: &mut Criterion) {
    b(c, "pointwise_64x28x28_1x1", 64, 28, 128, 1, 1);
}

criterion_group!(benches, depthwise, grouped_im2col, dense_im2col, pointwise);
criterion_main!(benches);
