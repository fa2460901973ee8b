use criterion::{black_box, criterion_group, criterion_main, Criterion};

use certgen::export::{encode_png, BlockRasterizer, RasterRequest};
use certgen::template::{render, Category, CertificateRequest};
use certgen::Branding;

fn bench_render_markup(c: &mut Criterion) {
    let request = CertificateRequest::new(Category::Completion, "Jane Doe")
        .with_subject("Systems Programming")
        .with_grade("A");
    let branding = Branding::default();

    c.bench_function("render_markup", |b| {
        b.iter(|| render(black_box(&request), &branding).markup())
    });
}

fn bench_rasterize_page(c: &mut Criterion) {
    let doc = render(&CertificateRequest::new(Category::Achievement, "Jane Doe"), &Branding::default());
    let request = RasterRequest {
        width: 1123,
        height: 794,
        scale: 1,
        background: [255, 255, 255, 255],
        allow_mixed_origin: true,
    };

    c.bench_function("rasterize_and_encode", |b| {
        b.iter(|| {
            let buffer = BlockRasterizer.rasterize_now(black_box(&doc), &request).unwrap();
            encode_png(&buffer).unwrap()
        })
    });
}

criterion_group!(benches, bench_render_markup, bench_rasterize_page);
criterion_main!(benches);
