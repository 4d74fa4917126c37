//! Write-then-read round trips through memory and filesystem stores

use proptest::prelude::*;
use rowstream_io::{BufferedWriter, ChunkedReader, FsStore, MemoryStore, ObjectStore};
use test_data_gen::{generate_trips, write_records, Trip, BUCKET};

fn read_all(store: &dyn ObjectStore, key: &str, batch_size: usize, parallelism: usize) -> Vec<Trip> {
    let mut reader = ChunkedReader::<Trip>::open(store, BUCKET, key, batch_size, parallelism)
        .expect("Failed to open reader");
    let mut out = Vec::new();
    for _ in 0..reader.num_chunks() {
        let chunk = reader.next_chunk().expect("Failed to read chunk");
        assert!(chunk.len() <= batch_size);
        out.extend(chunk);
    }
    assert!(reader.next_chunk().expect("Failed to read").is_empty());
    reader.close().expect("Failed to close reader");
    out
}

#[test]
fn test_round_trip_250_rows() {
    let store = MemoryStore::new();
    let trips = generate_trips(250);
    let row_groups = write_records(&store, "rt.parquet", &trips, 100);
    assert_eq!(row_groups, 3);

    let mut reader = ChunkedReader::<Trip>::open(&store, BUCKET, "rt.parquet", 64, 1).unwrap();
    assert_eq!(reader.num_chunks(), 4);
    let chunks: Vec<Vec<Trip>> = (0..4).map(|_| reader.next_chunk().unwrap()).collect();
    assert_eq!(chunks[3].len(), 58);
    assert_eq!(chunks.concat(), trips);
    reader.close().unwrap();
}

#[test]
fn test_round_trip_every_batch_size() {
    let store = MemoryStore::new();
    let trips = generate_trips(57);
    write_records(&store, "rt.parquet", &trips, 10);

    for batch_size in 1..=trips.len() + 5 {
        assert_eq!(read_all(&store, "rt.parquet", batch_size, 1), trips, "batch {}", batch_size);
    }
}

#[test]
fn test_empty_file_is_readable() {
    let store = MemoryStore::new();
    let row_groups = write_records::<Trip>(&store, "empty.parquet", &[], 10);
    assert_eq!(row_groups, 0);

    let mut reader = ChunkedReader::<Trip>::open(&store, BUCKET, "empty.parquet", 8, 1)
        .expect("Empty file should open");
    assert_eq!(reader.num_rows(), 0);
    assert_eq!(reader.num_row_groups(), 0);
    assert_eq!(reader.num_chunks(), 1);
    assert!(reader.next_chunk().unwrap().is_empty());
    reader.close().unwrap();
}

#[test]
fn test_fs_store_round_trip() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = FsStore::new(dir.path());
    let trips = generate_trips(1234);

    let mut writer = BufferedWriter::<Trip>::create(&store, BUCKET, "year=2024/part-0.parquet", 2)
        .expect("Failed to create writer");
    writer.set_row_group_size(500).unwrap();
    writer.write_chunk(&trips).unwrap();
    assert_eq!(writer.parallelism(), 2);
    writer.close().expect("Failed to close writer");

    let path = dir.path().join(BUCKET).join("year=2024/part-0.parquet");
    assert!(path.exists());

    assert_eq!(read_all(&store, "year=2024/part-0.parquet", 100, 1), trips);
    assert_eq!(read_all(&store, "year=2024/part-0.parquet", 999, 3), trips);
}

#[test]
fn test_dropped_writer_commits_buffered_rows() {
    let store = MemoryStore::new();
    let trips = generate_trips(15);
    {
        let mut writer = BufferedWriter::<Trip>::create(&store, BUCKET, "drop.parquet", 1).unwrap();
        writer.set_row_group_size(10).unwrap();
        writer.write_chunk(&trips).unwrap();
    }
    assert_eq!(read_all(&store, "drop.parquet", 4, 1), trips);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_chunk_count_and_order(
        n in 0usize..300,
        row_group_size in 1usize..120,
        batch_seed in 0usize..1000,
        parallelism in 0usize..4,
    ) {
        let store = MemoryStore::new();
        let trips = generate_trips(n);
        write_records(&store, "p.parquet", &trips, row_group_size);

        let batch_size = 1 + batch_seed % (n + 5);
        let reader = ChunkedReader::<Trip>::open(&store, BUCKET, "p.parquet", batch_size, parallelism).unwrap();
        prop_assert_eq!(reader.num_chunks(), n / batch_size + 1);
        prop_assert_eq!(reader.num_row_groups(), (n + row_group_size - 1) / row_group_size);
        drop(reader);

        prop_assert_eq!(read_all(&store, "p.parquet", batch_size, parallelism), trips);
    }
}
