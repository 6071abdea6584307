//! Criterion benchmarks for hot paths in the gremlin client core.
//!
//! Run with:
//!   cargo bench
//!
//! Covers:
//!   - JsonCodec encode/decode (serde_json, one-byte content-type framing)
//!   - Per-request output-channel allocation and delivery cost
//!     (`RequestPool` itself is `pub(crate)` and not reachable from this
//!     bench binary; this measures the `mpsc::unbounded_channel` pair every
//!     pool entry owns, at a concurrency representative of a busy
//!     connection, not `RequestPool::try_insert`/`remove` directly)

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gremlin_client::{Codec, GremlinRequest, JsonCodec};
use uuid::Uuid;

fn bench_encode_decode(c: &mut Criterion) {
    let codec = JsonCodec;
    let request = GremlinRequest::eval("g.V().has('name', 'marko').out('knows').values('name')");
    let id = Uuid::new_v4();
    let encoded = codec.encode_binary(id, &request).unwrap();

    c.bench_function("json_codec_encode_binary", |b| {
        b.iter(|| {
            let out = codec.encode_binary(black_box(id), black_box(&request)).unwrap();
            black_box(out);
        });
    });

    let response_bytes = serde_json::json!({
        "requestId": id,
        "status": { "code": 200, "message": "", "attributes": {} },
        "result": { "data": ["marko", "vadas", "josh"] },
    })
    .to_string();

    c.bench_function("json_codec_decode", |b| {
        b.iter(|| {
            let resp = codec.decode(black_box(response_bytes.as_bytes())).unwrap();
            black_box(resp);
        });
    });

    black_box(&encoded);
}

fn bench_output_channel_allocation(c: &mut Criterion) {
    use gremlin_client::GremlinResponse;
    use tokio::sync::mpsc;

    let rt = tokio::runtime::Runtime::new().unwrap();

    // Each pending request owns one unbounded output channel; this is the
    // per-request allocation and delivery cost the pool pays on every
    // insert/deliver cycle, at a concurrency representative of a busy
    // connection.
    c.bench_function("output_channel_send_recv_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut receivers = Vec::with_capacity(1000);
                for _ in 0..1000 {
                    let (tx, rx) =
                        mpsc::unbounded_channel::<Result<GremlinResponse, gremlin_client::GremlinError>>();
                    let _ = tx.send(Err(gremlin_client::GremlinError::Closed));
                    receivers.push(rx);
                }
                for mut rx in receivers {
                    black_box(rx.recv().await);
                }
            });
        });
    });
}

criterion_group!(benches, bench_encode_decode, bench_output_channel_allocation);
criterion_main!(benches);
