//! FFmpeg-backed tests; fixtures come from the `ffmpeg` CLI and the tests
//! skip when it is not installed

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use remuxer_cli::adapters::libav::LibavBackend;
use remuxer_cli::app::{InspectInteractor, RemuxInteractor};
use remuxer_cli::error::ErrorKind;
use remuxer_cli::ports::{InputSession, MediaBackend, OutputSession};
use remuxer_cli::*;

// Test utilities

/// One second of mpeg4 video plus aac audio in an mp4 container
fn create_test_media(dir: &TempDir) -> Option<PathBuf> {
    let path = dir.path().join("source.mp4");
    let output = Command::new("ffmpeg")
        .args([
            "-loglevel",
            "error",
            "-f",
            "lavfi",
            "-i",
            "testsrc=duration=1:size=160x120:rate=25",
            "-f",
            "lavfi",
            "-i",
            "sine=frequency=440:duration=1",
            "-c:v",
            "mpeg4",
            "-c:a",
            "aac",
            "-shortest",
            "-y",
        ])
        .arg(&path)
        .output();

    match output {
        Ok(output) if output.status.success() => Some(path),
        Ok(output) => {
            eprintln!(
                "skipping: ffmpeg failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
            None
        }
        Err(e) => {
            eprintln!("skipping: ffmpeg not available: {}", e);
            None
        }
    }
}

fn locator(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn probe(path: &Path) -> Vec<(MediaKind, String)> {
    let backend = LibavBackend::new().unwrap();
    let mut input = backend.open_input(&locator(path)).unwrap();
    input.probe().unwrap();
    let streams = input
        .streams()
        .iter()
        .map(|s| (s.kind, s.codec_name.clone()))
        .collect();
    input.close();
    streams
}

#[test]
fn test_init_is_idempotent() {
    assert!(init().is_ok());
    assert!(init().is_ok());
}

#[test]
fn test_extract_audio_to_matroska() {
    let dir = TempDir::new().unwrap();
    let Some(source) = create_test_media(&dir) else {
        return;
    };
    let output = dir.path().join("audio.mka");

    let request = RelayRequest::new(locator(&source), locator(&output), MediaKind::Audio);
    let report = RemuxInteractor::new(LibavBackend::new().unwrap(), false)
        .execute(&request)
        .unwrap();

    assert_eq!(report.state, RelayState::Closed);
    assert_eq!(report.source_stream, Some(1));
    assert!(report.packets_relayed > 0);
    assert!(report.packets_discarded > 0);
    assert_eq!(report.destination_time_base, Some(Timebase::new(1, 1000).unwrap()));

    let streams = probe(&output);
    assert_eq!(streams, vec![(MediaKind::Audio, "aac".to_string())]);
}

#[test]
fn test_extract_video_with_explicit_format() {
    let dir = TempDir::new().unwrap();
    let Some(source) = create_test_media(&dir) else {
        return;
    };
    let output = dir.path().join("video.bin");

    let request = RelayRequest::new(locator(&source), locator(&output), MediaKind::Video)
        .with_format("matroska");
    let report = RemuxInteractor::new(LibavBackend::new().unwrap(), false)
        .execute(&request)
        .unwrap();

    assert_eq!(report.source_stream, Some(0));
    assert!(report.packets_relayed > 0);
    assert_eq!(report.packets_discarded + report.packets_relayed, report.packets_read);

    let streams = probe(&output);
    assert_eq!(streams, vec![(MediaKind::Video, "mpeg4".to_string())]);
}

#[test]
fn test_declare_stream_copies_source_parameters() {
    let dir = TempDir::new().unwrap();
    let Some(source) = create_test_media(&dir) else {
        return;
    };
    let backend = LibavBackend::new().unwrap();
    let mut input = backend.open_input(&locator(&source)).unwrap();
    input.probe().unwrap();
    let audio = &input.streams()[1];
    assert!(audio.is_usable);

    let destination = dir.path().join("declared.mka");
    let mut output = backend.create_output(&locator(&destination), None).unwrap();
    assert_eq!(output.declare_stream(audio).unwrap(), 0);
    assert_eq!(output.stream_time_base(0), Some(audio.time_base));
    assert!(output.stream_time_base(1).is_none());

    output.close();
    input.close();
    assert!(!destination.exists());
}

#[test]
fn test_missing_subtitle_creates_no_file() {
    let dir = TempDir::new().unwrap();
    let Some(source) = create_test_media(&dir) else {
        return;
    };
    let output = dir.path().join("subs.mkv");

    let request = RelayRequest::new(locator(&source), locator(&output), MediaKind::Subtitle);
    let error = RemuxInteractor::new(LibavBackend::new().unwrap(), false)
        .execute(&request)
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::StreamNotFound);
    assert!(!output.exists());
}

#[test]
fn test_open_missing_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.mp4");

    let error = LibavBackend::new()
        .unwrap()
        .open_input(&locator(&missing))
        .err()
        .unwrap();

    assert_eq!(error.kind(), ErrorKind::Open);
    assert!(error.fault().and_then(|f| f.code).is_some());
}

#[test]
fn test_inspect_and_timestamps() {
    let dir = TempDir::new().unwrap();
    let Some(source) = create_test_media(&dir) else {
        return;
    };
    let interactor = InspectInteractor::new(LibavBackend::new().unwrap());

    let report = interactor.inspect(&locator(&source)).unwrap();
    assert!(report.format.as_deref().unwrap_or_default().contains("mp4"));
    assert_eq!(report.streams.len(), 2);
    assert_eq!(report.streams[0].codec, "mpeg4");
    assert_eq!(report.streams[1].codec, "aac");
    assert!(report.streams.iter().all(|s| s.usable));

    let listing = interactor
        .timestamps(&locator(&source), MediaKind::Video, Some(10))
        .unwrap();
    assert_eq!(listing.stream, 0);
    assert_eq!(listing.packets.len(), 10);
    assert!(listing.truncated);

    let dts: Vec<i64> = listing.packets.iter().filter_map(|p| p.dts).collect();
    assert!(dts.windows(2).all(|pair| pair[0] <= pair[1]));
}
