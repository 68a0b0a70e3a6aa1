use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image_transcode::{Format, Image, Quality};

fn criterion_benchmark(c: &mut Criterion) {
    let image = Image::new_2d(512, 512, 1, Format::Rgba8).unwrap();
    c.bench_function("convert_format_dxt5", |b| {
        b.iter(|| {
            black_box(&image).convert_format(
                black_box(Format::Dxt5),
                black_box(true),
                black_box(Quality::Fast),
            )
        })
    });
    c.bench_function("convert_format_etc2_rgba", |b| {
        b.iter(|| {
            black_box(&image).convert_format(
                black_box(Format::Etc2Rgba),
                black_box(false),
                black_box(Quality::Fast),
            )
        })
    });
    c.bench_function("convert_format_rgba32f", |b| {
        b.iter(|| {
            black_box(&image).convert_format(
                black_box(Format::Rgba32F),
                black_box(false),
                black_box(Quality::Fast),
            )
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
