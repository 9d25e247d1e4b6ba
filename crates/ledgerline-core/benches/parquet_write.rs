use ledgerline_core::{ParquetSink, Sink, TransferRecord};

fn synthetic_batch(n: usize) -> Vec<TransferRecord> {
    (0..n)
        .map(|i| TransferRecord {
            extrinsic_index: format!("{}-{}", 1_000_000 + i / 4, i % 4),
            block_num: 1_000_000 + (i / 4) as u64,
            block_timestamp: 1_640_000_000 + (i / 4) as i64 * 12,
            from: format!("4jbtsgNhpGAzdEGrKRb7g8Mq{i:08}"),
            to: format!("4kFQf1vN7U8pS5iCjkTPvB2y{:08}", i * 7),
            amount: format!("{}.{:012}", i % 1000, i),
            success: i % 17 != 0,
        })
        .collect()
}

#[divan::bench(args = [1, 3, 6])]
fn parquet_flush_zstd(bencher: divan::Bencher, zstd_level: i32) {
    let batch = synthetic_batch(10_000);
    let dir = tempfile::tempdir().unwrap();
    let mut sink = ParquetSink::new("bench", dir.path(), zstd_level).unwrap();
    bencher.bench_local(|| {
        sink.flush(&batch).unwrap();
    });
}

fn main() {
    divan::main();
}
