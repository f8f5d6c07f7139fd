mod common;

use common::*;
use image_meta_batch::codec::decode;
use image_meta_batch::config::Config;
use image_meta_batch::events::{BatchEvent, RecordingObserver};
use image_meta_batch::export::{export_csv, match_edits, read_edits};
use image_meta_batch::pipeline::{BatchProcessor, collect_images};
use std::fs;
use tempfile::TempDir;

#[test]
fn export_includes_corrupt_rows() {
    let dir = TempDir::new().unwrap();
    let corrupt = dir.path().join("corrupt.jpg");
    fs::write(&corrupt, b"not a jpeg at all").unwrap();
    let png = write_png(dir.path(), "ok.png", &[("Title", "Harbor"), ("Keywords", "boats, sea")]);

    let records = BatchProcessor::default().extract(&[corrupt, png]);
    assert!(records[0].decode_failed);
    assert!(!records[1].decode_failed);

    let path = export_csv(&records, &dir.path().join("exports")).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Filename,Title,Description,Keywords",
            "corrupt.jpg,,,",
            "ok.png,Harbor,,\"boats, sea\"",
        ]
    );
}

#[test]
fn directory_batch_end_to_end() {
    let dir = TempDir::new().unwrap();
    let photos = dir.path().join("photos");
    fs::create_dir(&photos).unwrap();
    write_jpeg(
        &photos,
        "a.jpg",
        Some(tiff_block(false, vec![Entry::ascii(TAG_MAKE, "Canon"), Entry::xp(TAG_XP_TITLE, "Vacation")])),
    );
    write_png(&photos, "b.png", &[]);
    fs::write(photos.join("c.txt"), "skip me").unwrap();

    let images = collect_images(&[photos.clone()]);
    assert_eq!(images.len(), 2);

    let observer = RecordingObserver::new();
    let config = Config::default();
    let processor = BatchProcessor::from_config(&config).with_observer(&observer);
    let records = processor.extract(&images);
    assert_eq!(records[0].filename, "a.jpg");
    assert_eq!(records[0].fields.title, "Vacation");
    assert_eq!(records[1].filename, "b.png");

    let mut edits: Vec<_> = records.iter().map(|r| r.fields.clone()).collect();
    edits[0].title = "Summer Trip".into();
    edits[1].keywords = "grass, sky".into();

    let out = dir.path().join("edited_images");
    let summary = processor.apply_edits_and_write(&records, &edits, &out);
    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.failure_count, 0);

    assert_eq!(decode(&out.join("a.jpg")).fields.title, "Summer Trip");
    assert_eq!(decode(&out.join("b.png")).fields.keywords, "grass, sky");
    assert_eq!(exif_ascii(&out.join("a.jpg"), TAG_MAKE).as_deref(), Some(&b"Canon"[..]));
    // Sources keep their original values.
    assert_eq!(decode(&photos.join("a.jpg")).fields.title, "Vacation");

    let written = observer
        .events()
        .into_iter()
        .filter(|e| matches!(e, BatchEvent::Written { .. }))
        .count();
    assert_eq!(written, 2);
}

#[test]
fn csv_edits_drive_write_back() {
    let dir = TempDir::new().unwrap();
    let a = write_png(dir.path(), "a.png", &[("Title", "A")]);
    let b = write_jpeg(dir.path(), "b.jpg", None);

    let processor = BatchProcessor::default();
    let records = processor.extract(&[a, b]);

    let table = dir.path().join("edits.csv");
    fs::write(
        &table,
        "Filename,Title,Description,Keywords\nb.jpg,Bee,Buzzing,\"insect, garden\"\nmissing.png,X,,\n",
    )
    .unwrap();

    let rows = read_edits(&table).unwrap();
    let edits = match_edits(&records, &rows);
    let out = dir.path().join("out");
    let summary = processor.apply_edits_and_write(&records, &edits, &out);

    assert_eq!(summary.success_count, 2);
    assert_eq!(decode(&out.join("a.png")).fields.title, "A");
    let bee = decode(&out.join("b.jpg")).fields;
    assert_eq!(bee.title, "Bee");
    assert_eq!(bee.description, "Buzzing");
    assert_eq!(bee.keywords, "insect, garden");
}

#[test]
fn batch_limit_from_config() {
    let dir = TempDir::new().unwrap();
    let paths: Vec<_> = (0..4)
        .map(|i| write_png(dir.path(), &format!("{i}.png"), &[]))
        .collect();

    let mut config = Config::default();
    config.batch.max_batch_size = 2;
    let records = BatchProcessor::from_config(&config).extract(&paths);

    let names: Vec<_> = records.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, vec!["0.png", "1.png"]);
}
