mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;

use common::{tinted, Harness, MIXER_ID};
use tessera_frame::{
    FrameConsumer, FrameProducer, PatternColor, SourceId, TestPatternSource, VideoFrame,
};
use tessera_mixer::{grid_zoom, DecodingEvent, GridLayout, SinkState, SlotRect};

const BLACK: u8 = 16;

#[test]
fn zoom_is_smallest_square_grid() {
    let expected = [(1, 1), (2, 2), (3, 2), (4, 2), (5, 3), (9, 3), (10, 4), (16, 4)];
    for (n, zoom) in expected {
        assert_eq!(grid_zoom(n), zoom, "n = {n}");
    }
}

#[test]
fn slot_offsets_on_vga_canvas() {
    let layout = GridLayout::compute(4, 640, 480).expect("four sources have a layout");
    assert_eq!((layout.cell_width, layout.cell_height), (320, 240));

    let offsets: Vec<(u32, u32)> = (0..4)
        .map(|i| {
            let SlotRect { x, y, .. } = layout.slot(i);
            (x, y)
        })
        .collect();
    assert_eq!(offsets, vec![(0, 0), (320, 0), (0, 240), (320, 240)]);
}

#[test]
fn single_source_fills_the_canvas() {
    let h = Harness::new(90);
    h.mixer.set_dimensions(64, 48).unwrap();
    h.preview.emit().unwrap();

    let composite = h.mixer.last_frame().expect("composite published");
    assert_eq!((composite.width(), composite.height()), (64, 48));
    assert_eq!(composite.luma_at(0, 0), Some(90));
    assert_eq!(composite.luma_at(63, 47), Some(90));
}

#[test]
fn four_sources_land_in_their_quadrants() {
    let h = Harness::new(40);
    let remotes = [h.remote(80), h.remote(160), h.remote(220)];
    h.mixer.set_dimensions(64, 48).unwrap();

    h.preview.emit().unwrap();
    for remote in &remotes {
        remote.emit().unwrap();
    }

    let composite = h.mixer.last_frame().unwrap();
    assert_eq!(composite.luma_at(0, 0), Some(40));
    assert_eq!(composite.luma_at(32, 0), Some(80));
    assert_eq!(composite.luma_at(0, 24), Some(160));
    assert_eq!(composite.luma_at(32, 24), Some(220));
}

#[test]
fn earlier_slots_are_carried_forward() {
    let h = Harness::new(60);
    let b = h.remote(200);
    h.mixer.set_dimensions(64, 64).unwrap();

    h.preview.emit().unwrap();
    b.emit().unwrap();

    let composite = h.mixer.last_frame().unwrap();
    assert_eq!(composite.luma_at(0, 0), Some(60), "slot 0 keeps A");
    assert_eq!(composite.luma_at(31, 31), Some(60));
    assert_eq!(composite.luma_at(32, 0), Some(200), "slot 1 shows B");
    assert_eq!(h.sink.frame_count(), 2);
}

#[test]
fn odd_cell_width_keeps_left_slot_chroma() {
    let h = Harness::new(60);
    h.preview.set_color(PatternColor::Yuv([60, 50, 50]));
    let b = Arc::new(tinted(200, 200));
    assert!(h.mixer.attach_source(&*b));
    h.mixer.set_dimensions(30, 30).unwrap();

    h.preview.emit().unwrap();
    b.emit().unwrap();

    let composite = h.mixer.last_frame().unwrap();
    assert_eq!(composite.chroma_at(14, 0), Some((50, 50)), "slot 0 edge keeps A");
    assert_eq!(composite.chroma_at(14, 14), Some((50, 50)));
    assert_eq!(composite.chroma_at(16, 0), Some((200, 200)));
    assert_eq!(composite.luma_at(14, 0), Some(60));
    assert_eq!(composite.luma_at(15, 0), Some(200));
}

#[test]
fn odd_cell_height_keeps_upper_slot_chroma() {
    let h = Harness::new(60);
    h.preview.set_color(PatternColor::Yuv([60, 50, 50]));
    let remotes = [tinted(90, 90), tinted(200, 200), tinted(120, 120)].map(Arc::new);
    for remote in &remotes {
        assert!(h.mixer.attach_source(&**remote));
    }
    h.mixer.set_dimensions(30, 30).unwrap();

    h.preview.emit().unwrap();
    for remote in &remotes {
        remote.emit().unwrap();
    }

    let composite = h.mixer.last_frame().unwrap();
    assert_eq!(composite.chroma_at(0, 14), Some((50, 50)), "slot 0 bottom keeps A");
    assert_eq!(composite.chroma_at(0, 16), Some((200, 200)));
    assert_eq!(composite.chroma_at(16, 16), Some((120, 120)));
}

#[test]
fn externally_detached_sink_is_restarted_on_resize() {
    let h = Harness::new(60);
    h.mixer.set_dimensions(32, 32).unwrap();
    assert!(h.mixer.detach(&*h.sink));

    h.mixer.set_dimensions(64, 64).unwrap();
    h.preview.emit().unwrap();

    assert_eq!(h.mixer.sink_state(), SinkState::Started);
    assert_eq!(h.sink.frame_count(), 1);
    assert_eq!(h.sink.starts.load(Ordering::SeqCst), 2);
    assert_eq!(h.sink.stops.load(Ordering::SeqCst), 1);
    assert!(matches!(
        h.controls.events().last(),
        Some(DecodingEvent::Started {
            width: 64,
            height: 64,
            ..
        })
    ));
}

#[test]
fn frames_with_no_sources_are_dropped_silently() {
    let h = Harness::new(60);
    h.mixer.set_dimensions(64, 64).unwrap();
    assert!(h.mixer.detach_source(&*h.preview));
    assert_eq!(h.mixer.source_count(), 0);

    let lingering = Arc::new(VideoFrame::solid_yuv(16, 16, [200, 128, 128]).unwrap());
    h.mixer.on_frame(SourceId::next(), &lingering);
    h.preview.emit().unwrap();

    assert!(h.mixer.last_frame().is_none());
    assert_eq!(h.sink.frame_count(), 0);
    assert_eq!(h.mixer.stats().frames_skipped, 1);
    assert_eq!(h.mixer.stats().frames_published, 0);
}

#[test]
fn frames_before_geometry_are_dropped() {
    let h = Harness::new(60);
    h.preview.emit().unwrap();

    assert!(h.mixer.last_frame().is_none());
    assert_eq!(h.mixer.sink_state(), SinkState::Stopped);
    assert_eq!(h.mixer.stats().frames_skipped, 1);
}

#[test]
fn unregistered_source_renders_into_slot_zero() {
    let h = Harness::new(60);
    let b = h.remote(200);
    h.mixer.set_dimensions(64, 64).unwrap();
    b.emit().unwrap();

    let stray = Arc::new(VideoFrame::solid_yuv(16, 16, [120, 128, 128]).unwrap());
    h.mixer.on_frame(SourceId::next(), &stray);

    let composite = h.mixer.last_frame().unwrap();
    assert_eq!(composite.luma_at(0, 0), Some(120));
    assert_eq!(composite.luma_at(32, 0), Some(200));
}

#[test]
fn set_dimensions_blanks_baseline_and_restarts_sink() {
    let h = Harness::new(60);
    let b = h.remote(200);
    h.mixer.set_dimensions(64, 64).unwrap();
    h.preview.emit().unwrap();
    b.emit().unwrap();

    h.mixer.set_dimensions(64, 64).unwrap();
    assert_eq!(h.mixer.last_frame().unwrap().luma_at(0, 0), Some(BLACK));

    b.emit().unwrap();
    let composite = h.mixer.last_frame().unwrap();
    assert_eq!(composite.luma_at(0, 0), Some(BLACK), "slot 0 not carried over");
    assert_eq!(composite.luma_at(32, 0), Some(200));

    h.mixer.set_dimensions(32, 16).unwrap();
    let events = h.controls.events();
    let tail = &events[events.len() - 2..];
    assert_eq!(
        tail,
        &[
            DecodingEvent::Stopped {
                id: MIXER_ID.into(),
                sink_name: "call-1_MX".into(),
            },
            DecodingEvent::Started {
                id: MIXER_ID.into(),
                sink_name: "call-1_MX".into(),
                width: 32,
                height: 16,
            },
        ]
    );
    assert_eq!(h.sink.starts.load(Ordering::SeqCst), 3);
    assert_eq!(h.sink.stops.load(Ordering::SeqCst), 2);
    assert_eq!(h.mixer.stats().sink_restarts, 3);
}

#[test]
fn resize_produces_frames_at_new_geometry() {
    let h = Harness::new(60);
    h.mixer.set_dimensions(64, 64).unwrap();
    h.preview.emit().unwrap();
    h.mixer.set_dimensions(32, 16).unwrap();
    h.preview.emit().unwrap();

    let frames = h.sink.frames();
    assert_eq!(frames.len(), 2);
    assert_eq!((frames[0].width(), frames[0].height()), (64, 64));
    assert_eq!((frames[1].width(), frames[1].height()), (32, 16));
    assert_eq!(frames[1].luma_at(31, 15), Some(60));
}

#[test]
fn allocation_failure_keeps_previous_composite() {
    let h = Harness::new(60);
    h.mixer.set_dimensions(64, 64).unwrap();
    h.preview.emit().unwrap();
    let before = h.mixer.last_frame().unwrap();

    h.allocator.fail.store(true, Ordering::SeqCst);
    h.preview.set_color(PatternColor::Yuv([220, 128, 128]));
    h.preview.emit().unwrap();

    let after = h.mixer.last_frame().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after.luma_at(0, 0), Some(60));
    assert_eq!(h.sink.frame_count(), 1);
    assert_eq!(h.mixer.stats().frames_failed, 1);

    h.allocator.fail.store(false, Ordering::SeqCst);
    h.preview.emit().unwrap();
    assert_eq!(h.mixer.last_frame().unwrap().luma_at(0, 0), Some(220));
}

#[test]
fn failed_sink_start_stays_stopped_until_next_resize() {
    let h = Harness::new(60);
    h.sink.refuse_start.store(true, Ordering::SeqCst);
    h.mixer.set_dimensions(64, 64).unwrap();

    assert_eq!(h.mixer.sink_state(), SinkState::Stopped);
    assert!(h.controls.events().is_empty());
    h.preview.emit().unwrap();
    assert_eq!(h.sink.frame_count(), 0);
    assert_eq!(h.mixer.stats().sink_start_failures, 1);

    h.sink.refuse_start.store(false, Ordering::SeqCst);
    h.mixer.set_dimensions(64, 64).unwrap();
    assert_eq!(h.mixer.sink_state(), SinkState::Started);
    h.preview.emit().unwrap();
    assert_eq!(h.sink.frame_count(), 1);
}

#[test]
fn detaching_a_source_shifts_later_slots() {
    let h = Harness::new(60);
    let b = h.remote(150);
    let c = h.remote(230);
    h.mixer.set_dimensions(64, 64).unwrap();

    assert!(h.mixer.detach_source(&*h.preview));
    assert_eq!(h.mixer.sources(), vec![b.source_id(), c.source_id()]);

    b.emit().unwrap();
    c.emit().unwrap();
    let composite = h.mixer.last_frame().unwrap();
    assert_eq!(composite.luma_at(0, 0), Some(150));
    assert_eq!(composite.luma_at(32, 0), Some(230));
}

#[test]
fn rgb_sources_are_converted() {
    let h = Harness::new(60);
    let red = Arc::new(TestPatternSource::new(16, 16, PatternColor::Rgb([255, 0, 0])));
    assert!(h.mixer.attach_source(&*red));
    h.mixer.set_dimensions(64, 64).unwrap();
    red.emit().unwrap();

    let composite = h.mixer.last_frame().unwrap();
    assert_eq!(composite.luma_at(32, 0), Some(82));
    assert_eq!(composite.chroma_at(32, 0), Some((90, 240)));
}

#[test]
fn other_consumers_can_subscribe_to_the_composite() {
    #[derive(Default)]
    struct Tap(Mutex<Vec<SourceId>>);
    impl FrameConsumer for Tap {
        fn on_frame(&self, source: SourceId, _frame: &Arc<VideoFrame>) {
            self.0.lock().unwrap().push(source);
        }
    }

    let h = Harness::new(60);
    h.mixer.set_dimensions(32, 32).unwrap();
    let tap = Arc::new(Tap::default());
    let consumer: Arc<dyn FrameConsumer> = tap.clone();
    assert!(h.mixer.attach(&consumer));

    h.preview.emit().unwrap();
    assert_eq!(*tap.0.lock().unwrap(), vec![h.mixer.source_id()]);
    assert_eq!(h.sink.frame_count(), 1);
}

#[test]
fn dropping_the_mixer_stops_sink_and_leaves_preview() {
    let h = Harness::new(60);
    h.mixer.set_dimensions(32, 32).unwrap();
    let Harness {
        preview,
        controls,
        sink,
        mixer,
        ..
    } = h;

    drop(mixer);

    assert_eq!(sink.stops.load(Ordering::SeqCst), 1);
    assert!(matches!(
        controls.events().last(),
        Some(DecodingEvent::Stopped { .. })
    ));
    preview.emit().unwrap();
    assert_eq!(sink.frame_count(), 0);
}

#[test]
fn concurrent_producers_are_serialized() {
    const FRAMES: u64 = 40;

    let h = Harness::new(60);
    let remotes: Vec<_> = [80, 120, 160, 200].into_iter().map(|l| h.remote(l)).collect();
    h.mixer.set_dimensions(96, 96).unwrap();

    let mut handles = Vec::new();
    for remote in &remotes {
        let remote = Arc::clone(remote);
        handles.push(thread::spawn(move || {
            for _ in 0..FRAMES {
                remote.emit().unwrap();
            }
        }));
    }
    let mixer = Arc::clone(&h.mixer);
    handles.push(thread::spawn(move || {
        for side in [64, 96, 48, 96] {
            mixer.set_dimensions(side, side).unwrap();
        }
    }));
    for handle in handles {
        handle.join().expect("producer thread panicked");
    }

    let stats = h.mixer.stats();
    assert_eq!(stats.frames_received, FRAMES * remotes.len() as u64);
    assert_eq!(
        stats.frames_published + stats.frames_skipped + stats.frames_failed,
        stats.frames_received
    );
    assert_eq!(stats.frames_failed, 0);
    for frame in h.sink.frames() {
        assert_eq!(frame.width(), frame.height());
    }
    assert_eq!(h.mixer.width(), 96);
}
