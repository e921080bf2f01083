// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowsplit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowsplit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use flowsplit::store::FlowFolder;
use pprof::criterion::{Output, PProfProfiler};

mod fixtures;

use fixtures::{Case, TempDir};

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name).ok().and_then(|raw| raw.trim().parse::<usize>().ok()).unwrap_or(default)
}

fn criterion() -> Criterion {
    let frequency = env_usize("PROFILE_FREQ", 100).clamp(1, 1000) as i32;
    let sample_size = env_usize("BENCH_SAMPLE_SIZE", 30).clamp(10, 200);

    Criterion::default()
        .sample_size(sample_size)
        .measurement_time(Duration::from_secs(5))
        .with_profiler(PProfProfiler::new(frequency, Output::Flamegraph(None)))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().expect("tokio runtime")
}

// Benchmark identity (keep stable):
// - Group names: `transcode.encode`, `transcode.decode`.
// - Case IDs (`small`, `medium`) must stay stable so results remain comparable over time.
fn benches_transcode(c: &mut Criterion) {
    let rt = runtime();

    let mut encode = c.benchmark_group("transcode.encode");
    for (name, case) in [("small", Case::Small), ("medium", Case::Medium)] {
        let document = fixtures::fixture(case);
        encode.bench_function(name, |b| {
            b.iter_batched_ref(
                || TempDir::new("transcode_encode"),
                |tmp| {
                    let folder = FlowFolder::new(tmp.path());
                    let encoded = rt.block_on(folder.encode(document.clone())).expect("encode");
                    black_box(encoded.touched.len())
                },
                BatchSize::SmallInput,
            )
        });
    }
    encode.finish();

    let mut decode = c.benchmark_group("transcode.decode");
    for (name, case) in [("small", Case::Small), ("medium", Case::Medium)] {
        let tmp = TempDir::new("transcode_decode");
        let folder = FlowFolder::new(tmp.path());
        let document_path = tmp.path().join("flows.json");
        let encoded = rt.block_on(folder.encode(fixtures::fixture(case))).expect("encode");

        decode.bench_function(name, |b| {
            b.iter(|| {
                let decoded = rt
                    .block_on(folder.decode(&document_path, encoded.document.clone()))
                    .expect("decode");
                black_box(decoded.len())
            })
        });
    }
    decode.finish();
}

criterion_group! {
    name = benches;
    config = criterion();
    targets = benches_transcode
}
criterion_main!(benches);
