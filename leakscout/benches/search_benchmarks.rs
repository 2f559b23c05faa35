use criterion::{black_box, criterion_group, criterion_main, Criterion};
use leakscout::{
    enumerate, run_search, CancellationToken, MimeClassifier, NoProgress, RunContext, SearchConfig,
    SearchJob,
};
use std::{fs::File, io::Write, num::NonZeroUsize};
use tempfile::tempdir;

fn create_test_files(
    dir: &tempfile::TempDir,
    file_count: usize,
    lines_per_file: usize,
) -> std::io::Result<()> {
    for i in 0..file_count {
        let file_path = dir.path().join(format!("dump_{}.txt", i));
        let mut file = File::create(file_path)?;
        for j in 0..lines_per_file {
            writeln!(file, "user{}.name{}@mail{}.com:password{}", j, i, j % 7, j)?;
            if j % 50 == 0 {
                writeln!(file, "john.smith{}@example.com:hunter{}", j, i)?;
            }
        }
    }
    Ok(())
}

fn config(threads: usize) -> SearchConfig {
    SearchConfig {
        thread_count: NonZeroUsize::new(threads).unwrap(),
        ..SearchConfig::default()
    }
}

fn bench_scan_and_merge(c: &mut Criterion) {
    let dump = tempdir().unwrap();
    create_test_files(&dump, 20, 5_000).unwrap();
    let walk = enumerate(
        dump.path(),
        &config(1),
        &MimeClassifier::new(),
        &CancellationToken::new(),
    )
    .unwrap();

    let mut group = c.benchmark_group("scan_and_merge");
    for (label, job) in [
        ("literal", SearchJob::new("example")),
        ("regex", SearchJob::new(r"mail[0-3]\.com:password\d+")),
        ("names", SearchJob::new("").with_names("john", "smith")),
    ] {
        for threads in [1, 4] {
            let config = config(threads);
            group.bench_function(format!("{}_{}_threads", label, threads), |b| {
                b.iter(|| {
                    let out = tempdir().unwrap();
                    let job = job.clone().with_output(out.path().join("bench.txt"));
                    let report = run_search(
                        black_box(&walk.files),
                        &job,
                        &config,
                        &RunContext::default(),
                        &NoProgress,
                    )
                    .unwrap();
                    black_box(report.total_matches)
                })
            });
        }
    }
    group.finish();
}

fn bench_walk(c: &mut Criterion) {
    let dump = tempdir().unwrap();
    create_test_files(&dump, 200, 10).unwrap();

    c.bench_function("walk_and_classify", |b| {
        b.iter(|| {
            let walk = enumerate(
                black_box(dump.path()),
                &config(4),
                &MimeClassifier::new(),
                &CancellationToken::new(),
            )
            .unwrap();
            black_box(walk.files.len())
        })
    });
}

criterion_group!(benches, bench_scan_and_merge, bench_walk);
criterion_main!(benches);
