use criterion::{criterion_group, criterion_main, Criterion};
use gosp_runtime::protocol::{MetadataEntry, StreamRenderer};
use gosp_runtime::{PageContext, RenderedResponse, Request, Supervisor};
use std::hint::black_box;
use std::io::Write;
use std::sync::Arc;

fn sample_entries() -> Vec<MetadataEntry> {
    vec![
        MetadataEntry::MimeType("text/html".into()),
        MetadataEntry::HeaderField {
            replace: false,
            name: "Set-Cookie".into(),
            value: "session=abc123; Path=/; HttpOnly".into(),
        },
        MetadataEntry::KeepAlive,
        MetadataEntry::HttpStatus(200),
    ]
}

fn bench_stream_rendering(c: &mut Criterion) {
    let entries = sample_entries();
    let body = vec![b'x'; 16 * 1024];
    c.bench_function("render_stream", |b| {
        let mut out = Vec::with_capacity(body.len() + 256);
        b.iter(|| {
            out.clear();
            let mut renderer = StreamRenderer::new(&mut out);
            for entry in &entries {
                renderer.entry(entry);
            }
            black_box(renderer.finish(&body).ok());
        })
    });
}

fn bench_response_parsing(c: &mut Criterion) {
    let mut raw = Vec::new();
    let mut renderer = StreamRenderer::new(&mut raw);
    for entry in &sample_entries() {
        renderer.entry(entry);
    }
    let _ = renderer.finish(&[b'y'; 4096]);
    c.bench_function("parse_response", |b| {
        b.iter(|| black_box(RenderedResponse::parse(&raw).ok()))
    });
}

fn bench_request_decode(c: &mut Criterion) {
    let mut request = Request {
        uri: "/catalog/item.gosp".into(),
        method: "GET".into(),
        filename: String::new(),
        ..Request::default()
    };
    for i in 0..20 {
        request
            .header_data
            .insert(format!("X-Header-{i}"), format!("value-{i}"));
    }
    let wire = request.to_json();
    c.bench_function("decode_request", |b| {
        b.iter(|| black_box(Request::decode(wire.as_bytes()).ok()))
    });
}

fn bench_supervised_render(c: &mut Criterion) {
    may::config().set_stack_size(0x8000);
    let supervisor = Supervisor::new(|ctx: &mut PageContext| -> anyhow::Result<()> {
        ctx.set_mime_type("text/plain");
        ctx.write_all(b"hello")?;
        Ok(())
    });
    let request = Arc::new(Request::default());
    c.bench_function("supervised_render", |b| {
        let mut out = Vec::new();
        b.iter(|| {
            out.clear();
            black_box(supervisor.render(Some(Arc::clone(&request)), &mut out).ok());
        })
    });
}

criterion_group!(
    benches,
    bench_stream_rendering,
    bench_response_parsing,
    bench_request_decode,
    bench_supervised_render
);
criterion_main!(benches);
