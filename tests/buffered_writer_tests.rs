//! Tests for the buffered writer: row-group segmentation, partial batch writes, configuration

use rowstream_core::config::{Compression, StreamConfig};
use rowstream_io::readers::describe;
use rowstream_io::{BufferedWriter, ChunkedReader, Error, MemoryStore, ObjectLocation, WriteOptions};
use test_data_gen::{events, generate_trips, Event, Trip, BUCKET};

#[test]
fn test_row_groups_flush_at_threshold() {
    let store = MemoryStore::new();
    let location = ObjectLocation::new(BUCKET, "rg.parquet");
    let mut writer = BufferedWriter::<Trip>::create(&store, BUCKET, "rg.parquet", 1)
        .expect("Failed to create writer");
    writer.set_row_group_size(100).unwrap();

    for (i, trip) in generate_trips(250).iter().enumerate() {
        writer.write(trip).expect("Failed to write");
        assert_eq!(writer.row_groups_flushed(), (i + 1) / 100);
    }
    assert_eq!(writer.rows_written(), 250);
    assert_eq!(writer.buffered_rows(), 50);
    // Nothing is committed before close.
    assert!(!store.contains(&location));

    writer.close().expect("Failed to close writer");
    assert_eq!(writer.row_groups_flushed(), 3);
    assert_eq!(writer.buffered_rows(), 0);

    let summary = describe(&store, &location).expect("Failed to describe");
    assert_eq!(summary.num_rows, 250);
    assert_eq!(summary.row_group_rows, vec![100, 100, 50]);
}

#[test]
fn test_write_chunk_stops_at_first_failure() {
    let store = MemoryStore::new();
    let mut records = events(10);
    records[6].label = None;

    let mut writer = BufferedWriter::<Event>::create(&store, BUCKET, "events.parquet", 1)
        .expect("Failed to create writer");
    writer.set_row_group_size(4).unwrap();

    let err = writer.write_chunk(&records).expect_err("Expected encode error");
    match &err {
        Error::Encode { index, message } => {
            assert_eq!(*index, Some(6));
            assert!(message.contains("label"), "{}", message);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(writer.rows_written(), 6);
    assert_eq!(writer.row_groups_flushed(), 1);
    assert_eq!(writer.buffered_rows(), 2);

    // The writer is still usable after a per-record failure.
    writer.write(&records[7]).expect("Failed to write after error");
    writer.close().expect("Failed to close writer");

    let mut reader = ChunkedReader::<Event>::open(&store, BUCKET, "events.parquet", 100, 1)
        .expect("Failed to open reader");
    let read = reader.next_chunk().unwrap();
    let ids: Vec<i64> = read.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4, 5, 7]);
    reader.close().unwrap();
}

#[test]
fn test_zero_row_group_size_rejected() {
    let store = MemoryStore::new();
    let mut writer = BufferedWriter::<Trip>::create(&store, BUCKET, "z.parquet", 1).unwrap();
    assert!(matches!(writer.set_row_group_size(0), Err(Error::Config(_))));
    writer.close().unwrap();
}

#[test]
fn test_compression_codecs_round_trip() {
    let store = MemoryStore::new();
    let trips = generate_trips(300);
    for codec in [
        Compression::Uncompressed,
        Compression::Snappy,
        Compression::Gzip,
        Compression::Zstd,
        Compression::Lz4,
    ] {
        let key = format!("codec-{:?}.parquet", codec);
        let mut writer = BufferedWriter::<Trip>::create(&store, BUCKET, &key, 1).unwrap();
        writer.set_compression(codec).unwrap();
        writer.set_row_group_size(128).unwrap();
        writer.write_chunk(&trips).unwrap();
        writer.close().unwrap();

        let reader = ChunkedReader::<Trip>::open(&store, BUCKET, &key, 1000, 1).unwrap();
        let read: Vec<Trip> = reader
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
            .concat();
        assert_eq!(read, trips, "{:?}", codec);
    }
}

#[test]
fn test_compression_locked_after_first_row_group() {
    let store = MemoryStore::new();
    let mut writer = BufferedWriter::<Trip>::create(&store, BUCKET, "c.parquet", 1).unwrap();
    writer.set_row_group_size(2).unwrap();
    writer.write_chunk(&generate_trips(2)).unwrap();
    assert!(matches!(
        writer.set_compression(Compression::Zstd),
        Err(Error::Config(_))
    ));
    writer.close().unwrap();
}

#[test]
fn test_row_group_size_change_applies_to_later_rows() {
    let store = MemoryStore::new();
    let location = ObjectLocation::new(BUCKET, "resize.parquet");
    let trips = generate_trips(25);
    let mut writer = BufferedWriter::<Trip>::create(&store, BUCKET, "resize.parquet", 1).unwrap();
    writer.set_row_group_size(10).unwrap();
    writer.write_chunk(&trips[..10]).unwrap();
    writer.set_row_group_size(5).unwrap();
    writer.write_chunk(&trips[10..]).unwrap();
    writer.close().unwrap();

    let summary = describe(&store, &location).unwrap();
    assert_eq!(summary.row_group_rows, vec![10, 5, 5, 5]);
}

#[test]
fn test_create_with_config() {
    let store = MemoryStore::new();
    let mut cfg = StreamConfig::new(BUCKET, "cfg.parquet");
    cfg.row_group_size = 7;
    cfg.compression = Compression::Gzip;

    let mut writer = BufferedWriter::<Trip>::create_with_config(&store, &cfg).unwrap();
    writer.write_chunk(&generate_trips(20)).unwrap();
    assert_eq!(writer.row_groups_flushed(), 2);
    writer.close().unwrap();

    cfg.batch_size = 6;
    let reader = ChunkedReader::<Trip>::open_with_config(&store, &cfg).unwrap();
    assert_eq!(reader.num_chunks(), 4);
    assert_eq!(reader.num_row_groups(), 3);
}

#[test]
fn test_invalid_config_rejected_before_io() {
    let store = MemoryStore::new();
    let mut cfg = StreamConfig::new(BUCKET, "cfg.parquet");
    cfg.row_group_size = 0;
    assert!(BufferedWriter::<Trip>::create_with_config(&store, &cfg).is_err());
    assert!(store.locations().is_empty());
}

#[test]
fn test_if_absent_refuses_existing_object() {
    let store = MemoryStore::new();
    let mut writer = BufferedWriter::<Trip>::create(&store, BUCKET, "once.parquet", 1).unwrap();
    writer.close().unwrap();

    let opts = WriteOptions { if_absent: true };
    let err = BufferedWriter::<Trip>::create_with_options(&store, BUCKET, "once.parquet", 1, &opts)
        .err()
        .expect("Expected error");
    assert!(matches!(err, Error::Open { .. }));
}
