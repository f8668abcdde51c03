use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::path::PathBuf;
use tokencache::accessor::{build, AccessorKind};
use tokencache::{Context, TokenCache};

fn unique_path(label: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    p.push(format!("tokencache_bench_{}_{}", label, nanos));
    p
}

async fn fresh_cache(label: &str) -> (TokenCache, PathBuf) {
    let ts = unique_path(label);
    let mut data_path = ts.clone();
    data_path.set_extension("data");
    let accessor = build(AccessorKind::Plaintext { path: data_path }).await.unwrap();
    (TokenCache::new(&ts, accessor).await.unwrap(), ts)
}

fn format_sz(sz: usize) -> String {
    if sz < 1024 {
        format!("{}B", sz)
    } else {
        format!("{:.1}KiB", sz as f64 / 1024.0)
    }
}

fn bench_export(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    for &sz in &[64usize, 4096, 64 * 1024] {
        let (cache, ts) = rt.block_on(fresh_cache(&format!("export_{}", sz)));
        let payload = Bytes::from(vec![0x5Au8; sz]);
        let label = format!("export_{}", format_sz(sz));

        c.bench_function(&label, |b| {
            b.iter_batched(
                || payload.clone(),
                |bytes| {
                    let ctx = Context::new();
                    let result = rt.block_on(cache.export(&ctx, &mut move || Ok(bytes.clone())));
                    black_box(result).expect("export ok");
                },
                BatchSize::SmallInput,
            )
        });

        let _ = std::fs::remove_file(&ts);
    }
}

fn bench_replace_with_cached_bytes(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (cache, ts) = rt.block_on(fresh_cache("replace_cached"));
    let payload = Bytes::from(vec![0x5Au8; 4096]);
    rt.block_on(cache.export(&Context::new(), &mut {
        let payload = payload.clone();
        move || Ok(payload.clone())
    }))
    .expect("export ok");

    c.bench_function("replace_mtime_unchanged_4KiB", |b| {
        b.iter(|| {
            let ctx = Context::new();
            let result = rt.block_on(cache.replace(&ctx, &mut |_data: &[u8]| Ok(())));
            black_box(result).expect("replace ok");
        })
    });

    let _ = std::fs::remove_file(&ts);
}

criterion_group!(benches, bench_export, bench_replace_with_cached_bytes);
criterion_main!(benches);
