//! End-to-end relay tests over the in-memory backend

use remuxer_cli::adapters::memory::{
    FaultPlan, JournalEvent, MemoryBackend, MemoryCodecParameters, MemoryPacket, MemorySource,
};
use remuxer_cli::domain::model::StreamDescriptor;
use remuxer_cli::error::ErrorKind;
use remuxer_cli::*;

// Test utilities

fn tb(num: i32, den: i32) -> Timebase {
    Timebase::new(num, den).unwrap()
}

fn params(codec: &str, tag: u32) -> MemoryCodecParameters {
    MemoryCodecParameters::new(codec, tag, vec![0x11, 0x90])
}

/// Video on 0, two audio tracks on 1 and 2; audio #2 is flagged default
fn movie() -> MemorySource {
    MemorySource::new("mov,mp4,m4a,3gp,3g2,mj2")
        .with_stream(MediaKind::Video, tb(1, 90000), params("h264", 0x31637661))
        .with_stream(MediaKind::Audio, tb(1, 1000), params("aac", 0x6134706d))
        .with_descriptor(
            StreamDescriptor::new(2, MediaKind::Audio, tb(1, 1000), params("aac", 0x6134706d))
                .with_codec("aac")
                .with_default(true),
        )
        .with_packet(MemoryPacket::new(0, 0, vec![0; 100]))
        .with_packet(MemoryPacket::new(2, 0, vec![0; 10]).with_position(48))
        .with_packet(MemoryPacket::new(1, 0, vec![0; 10]))
        .with_packet(MemoryPacket::new(2, 40, vec![0; 12]).with_duration(20).with_position(58))
        .with_packet(MemoryPacket::new(0, 3000, vec![0; 80]))
        .with_packet(MemoryPacket::new(2, 80, vec![0; 14]).with_dts(None))
}

fn backend() -> MemoryBackend {
    MemoryBackend::new()
        .with_source("movie.mp4", movie())
        .with_output_time_base(tb(1, 48000))
}

fn closes(backend: &MemoryBackend) -> (usize, usize, usize) {
    (
        backend.count(|e| matches!(e, JournalEvent::InputClosed { .. })),
        backend.count(|e| matches!(e, JournalEvent::SinkClosed { .. })),
        backend.count(|e| matches!(e, JournalEvent::OutputClosed { .. })),
    )
}

fn audio_request() -> RelayRequest {
    RelayRequest::new("movie.mp4", "audio.mka", MediaKind::Audio)
}

// Successful runs

#[test]
fn test_relays_only_selected_stream() {
    let journal = backend();
    let mut engine = RelayEngine::new(journal.clone());

    let report = engine.run(&audio_request()).unwrap();

    assert_eq!(engine.state(), RelayState::Closed);
    assert_eq!(report.state, RelayState::Closed);
    assert_eq!(report.source_stream, Some(2));
    assert_eq!(report.packets_read, 6);
    assert_eq!(report.packets_relayed, 3);
    assert_eq!(report.packets_discarded, 3);
    assert_eq!(report.bytes_relayed, 36);

    let written = journal.written_packets();
    assert_eq!(written.len(), 3);
    assert!(written.iter().all(|p| p.stream_index == 0));
    assert_eq!(
        written.iter().map(|p| p.pts).collect::<Vec<_>>(),
        vec![Some(0), Some(1920), Some(3840)]
    );
    assert_eq!(written[1].duration, 960);
}

#[test]
fn test_two_audio_one_video_picks_first_audio() {
    let source = MemorySource::new("mov,mp4,m4a,3gp,3g2,mj2")
        .with_stream(MediaKind::Audio, tb(1, 1000), params("aac", 0))
        .with_stream(MediaKind::Audio, tb(1, 1000), params("mp3", 0))
        .with_stream(MediaKind::Video, tb(1, 25), params("h264", 0))
        .with_packet(MemoryPacket::new(2, 0, vec![0; 50]))
        .with_packet(MemoryPacket::new(0, 0, vec![0; 5]))
        .with_packet(MemoryPacket::new(1, 0, vec![0; 5]))
        .with_packet(MemoryPacket::new(0, 40, vec![0; 5]))
        .with_packet(MemoryPacket::new(2, 1, vec![0; 50]));
    let journal = MemoryBackend::new()
        .with_source("av.mp4", source)
        .with_output_time_base(tb(1, 48000));

    let report = RelayEngine::new(journal.clone())
        .run(&RelayRequest::new("av.mp4", "out.m4a", MediaKind::Audio))
        .unwrap();

    assert_eq!(report.source_stream, Some(0));
    assert_eq!(journal.declared_streams().len(), 1);
    assert_eq!(journal.declared_streams()[0].codec_name, "aac");

    let written = journal.written_packets();
    assert_eq!(written.len(), 2);
    assert!(written.iter().all(|p| p.stream_index == 0));
    assert_eq!(written[0].pts, Some(0));
    assert_eq!(written[1].pts, Some(1920));
}

#[test]
fn test_output_declares_one_stream_without_codec_tag() {
    let journal = backend();
    RelayEngine::new(journal.clone()).run(&audio_request()).unwrap();

    let declared = journal.declared_streams();
    assert_eq!(declared.len(), 1);
    assert_eq!(declared[0].codec_name, "aac");
    assert_eq!(declared[0].codec_tag, 0);
    assert_eq!(declared[0].extradata, vec![0x11, 0x90]);
}

#[test]
fn test_unknown_timestamps_and_position_reset() {
    let journal = backend();
    RelayEngine::new(journal.clone()).run(&audio_request()).unwrap();

    let written = journal.written_packets();
    assert!(written.iter().all(|p| p.position.is_none()));
    assert_eq!(written[2].pts, Some(3840));
    assert_eq!(written[2].dts, None);
}

#[test]
fn test_lifecycle_order() {
    let journal = backend();
    RelayEngine::new(journal.clone()).run(&audio_request()).unwrap();

    let events = journal.events();
    let position = |wanted: &dyn Fn(&JournalEvent) -> bool| {
        events.iter().position(|e| wanted(e)).unwrap()
    };

    let opened = position(&|e| matches!(e, JournalEvent::InputOpened { .. }));
    let probed = position(&|e| matches!(e, JournalEvent::InputProbed { .. }));
    let created = position(&|e| matches!(e, JournalEvent::OutputCreated { .. }));
    let sink = position(&|e| matches!(e, JournalEvent::SinkOpened { .. }));
    let header = position(&|e| matches!(e, JournalEvent::HeaderWritten));
    let first_packet = position(&|e| matches!(e, JournalEvent::PacketWritten(_)));
    let trailer = position(&|e| matches!(e, JournalEvent::TrailerWritten));
    let output_closed = position(&|e| matches!(e, JournalEvent::OutputClosed { .. }));
    let input_closed = position(&|e| matches!(e, JournalEvent::InputClosed { .. }));

    assert!(opened < probed);
    assert!(probed < created);
    assert!(created < sink);
    assert!(sink < header);
    assert!(header < first_packet);
    assert!(first_packet < trailer);
    assert!(trailer < output_closed);
    assert!(output_closed < input_closed);
    assert_eq!(closes(&journal), (1, 1, 1));
}

#[test]
fn test_format_without_sink() {
    let journal = backend();
    let request = audio_request().with_format("null");
    RelayEngine::new(journal.clone()).run(&request).unwrap();

    assert_eq!(journal.count(|e| matches!(e, JournalEvent::SinkOpened { .. })), 0);
    assert_eq!(closes(&journal), (1, 0, 1));
    assert_eq!(journal.written_packets().len(), 3);
}

#[test]
fn test_same_time_base_keeps_timestamps() {
    let journal = MemoryBackend::new().with_source("movie.mp4", movie());
    RelayEngine::new(journal.clone()).run(&audio_request()).unwrap();

    let written = journal.written_packets();
    assert_eq!(
        written.iter().map(|p| p.pts).collect::<Vec<_>>(),
        vec![Some(0), Some(40), Some(80)]
    );
}

#[test]
fn test_empty_source_still_writes_header_and_trailer() {
    let source = MemorySource::new("matroska,webm").with_stream(
        MediaKind::Audio,
        tb(1, 1000),
        params("opus", 0),
    );
    let journal = MemoryBackend::new().with_source("empty.mkv", source);

    let report = RelayEngine::new(journal.clone())
        .run(&RelayRequest::new("empty.mkv", "empty.ogg", MediaKind::Audio))
        .unwrap();

    assert_eq!(report.packets_relayed, 0);
    assert_eq!(journal.count(|e| matches!(e, JournalEvent::HeaderWritten)), 1);
    assert_eq!(journal.count(|e| matches!(e, JournalEvent::TrailerWritten)), 1);
}

#[test]
fn test_empty_packets_are_relayed() {
    let source = MemorySource::new("matroska,webm")
        .with_stream(MediaKind::Video, tb(1, 1000), params("vp9", 0))
        .with_stream(MediaKind::Subtitle, tb(1, 1000), params("ass", 0))
        .with_packet(MemoryPacket::new(1, 0, b"Dialogue".to_vec()).with_duration(1500))
        .with_packet(MemoryPacket::new(0, 0, vec![0; 64]))
        .with_packet(MemoryPacket::new(1, 1500, Vec::new()));
    let journal = MemoryBackend::new().with_source("talk.mkv", source);

    let request =
        RelayRequest::new("talk.mkv", "talk.sub", MediaKind::Subtitle).with_format("matroska");
    let report = RelayEngine::new(journal.clone()).run(&request).unwrap();

    assert_eq!(report.packets_relayed, 2);
    assert_eq!(report.bytes_relayed, 8);
    let written = journal.written_packets();
    assert!(written[1].data.is_empty());
    assert_eq!(written[1].pts, Some(1500));
}

#[test]
fn test_plain_track_wins_over_default_impaired_track() {
    let source = MemorySource::new("matroska,webm")
        .with_descriptor(
            StreamDescriptor::new(0, MediaKind::Audio, tb(1, 1000), params("aac", 0))
                .with_codec("aac")
                .with_default(true)
                .with_impaired(true)
                .with_bit_rate(64_000),
        )
        .with_descriptor(
            StreamDescriptor::new(1, MediaKind::Audio, tb(1, 1000), params("ac3", 0))
                .with_codec("ac3")
                .with_bit_rate(384_000),
        )
        .with_packet(MemoryPacket::new(0, 0, vec![0; 8]))
        .with_packet(MemoryPacket::new(1, 0, vec![0; 32]));
    let journal = MemoryBackend::new().with_source("tracks.mkv", source);

    let report = RelayEngine::new(journal.clone())
        .run(&RelayRequest::new("tracks.mkv", "main.mka", MediaKind::Audio))
        .unwrap();

    assert_eq!(report.source_stream, Some(1));
    assert_eq!(journal.declared_streams()[0].codec_name, "ac3");
    assert_eq!(report.bytes_relayed, 32);
}

#[test]
fn test_unusable_stream_is_passed_over() {
    let source = MemorySource::new("mpegts")
        .with_descriptor(
            StreamDescriptor::new(0, MediaKind::Audio, Timebase::av_time_base(), params("mp2", 0))
                .with_codec("mp2")
                .with_default(true)
                .with_usable(false),
        )
        .with_stream(MediaKind::Audio, tb(1, 90000), params("aac", 0))
        .with_packet(MemoryPacket::new(0, 0, vec![0; 8]))
        .with_packet(MemoryPacket::new(1, 90000, vec![0; 16]));
    let journal = MemoryBackend::new().with_source("broadcast.ts", source);

    let report = RelayEngine::new(journal.clone())
        .run(&RelayRequest::new("broadcast.ts", "broadcast.mka", MediaKind::Audio))
        .unwrap();

    assert_eq!(report.source_stream, Some(1));
    assert_eq!(report.packets_discarded, 1);
    assert_eq!(journal.written_packets()[0].pts, Some(90000));
}

// Failures

#[test]
fn test_missing_kind_creates_no_output() {
    let journal = backend();
    let mut engine = RelayEngine::new(journal.clone());

    let error = engine
        .run(&RelayRequest::new("movie.mp4", "subs.srt", MediaKind::Subtitle))
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::StreamNotFound);
    assert_eq!(engine.state(), RelayState::Failed);
    assert_eq!(journal.count(|e| matches!(e, JournalEvent::OutputCreated { .. })), 0);
    assert_eq!(closes(&journal), (1, 0, 0));
}

#[test]
fn test_missing_source_is_open_error() {
    let journal = backend();
    let error = RelayEngine::new(journal.clone())
        .run(&RelayRequest::new("nope.mp4", "out.mka", MediaKind::Audio))
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Open);
    assert_eq!(error.fault().and_then(|f| f.code), Some(-2));
    assert!(journal.events().is_empty());
}

#[test]
fn test_unknown_output_format_is_create_error() {
    let journal = backend();
    let error = RelayEngine::new(journal.clone())
        .run(&RelayRequest::new("movie.mp4", "audio.unknownext", MediaKind::Audio))
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Create);
    assert_eq!(closes(&journal), (1, 0, 0));
}

#[test]
fn test_write_failure_releases_everything_once() {
    let journal = backend().with_faults(FaultPlan {
        write_at: Some(1),
        ..FaultPlan::default()
    });
    let mut engine = RelayEngine::new(journal.clone());

    let error = engine.run(&audio_request()).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Write);
    assert_eq!(engine.state(), RelayState::Failed);
    assert_eq!(journal.written_packets().len(), 1);
    assert_eq!(journal.count(|e| matches!(e, JournalEvent::TrailerWritten)), 0);
    assert_eq!(closes(&journal), (1, 1, 1));

    drop(engine);
    assert_eq!(closes(&journal), (1, 1, 1));
}

#[test]
fn test_each_fault_maps_to_its_kind() {
    let cases: Vec<(FaultPlan, ErrorKind, (usize, usize, usize))> = vec![
        (FaultPlan { open: true, ..Default::default() }, ErrorKind::Open, (0, 0, 0)),
        (FaultPlan { probe: true, ..Default::default() }, ErrorKind::Probe, (1, 0, 0)),
        (FaultPlan { create: true, ..Default::default() }, ErrorKind::Create, (1, 0, 0)),
        (FaultPlan { declare: true, ..Default::default() }, ErrorKind::Declare, (1, 0, 1)),
        (FaultPlan { open_sink: true, ..Default::default() }, ErrorKind::Io, (1, 0, 1)),
        (FaultPlan { header: true, ..Default::default() }, ErrorKind::Header, (1, 1, 1)),
        (FaultPlan { read_at: Some(2), ..Default::default() }, ErrorKind::Read, (1, 1, 1)),
        (FaultPlan { trailer: true, ..Default::default() }, ErrorKind::Trailer, (1, 1, 1)),
    ];

    for (faults, expected, expected_closes) in cases {
        let journal = backend().with_faults(faults.clone());
        let mut engine = RelayEngine::new(journal.clone());

        let error = engine.run(&audio_request()).unwrap_err();

        assert_eq!(error.kind(), expected, "faults: {:?}", faults);
        assert_eq!(engine.state(), RelayState::Failed);
        assert_eq!(closes(&journal), expected_closes, "faults: {:?}", faults);
    }
}

#[test]
fn test_engine_runs_only_once() {
    let journal = backend();
    let mut engine = RelayEngine::new(journal.clone());
    engine.run(&audio_request()).unwrap();

    let second = engine.run(&audio_request()).unwrap_err();
    assert_eq!(second.kind(), ErrorKind::Usage);
    assert_eq!(engine.state(), RelayState::Closed);
    assert_eq!(journal.count(|e| matches!(e, JournalEvent::InputOpened { .. })), 1);
}

#[test]
fn test_report_serializes() {
    let report = RelayEngine::new(backend()).run(&audio_request()).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["kind"], "audio");
    assert_eq!(json["state"], "Closed");
    assert_eq!(json["packets_relayed"], 3);
    assert_eq!(json["destination_time_base"]["den"], 48000);
}
