use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use browser_backend_core::{
    AudioIoCallback, BackendConfiguration, BackendError, BufferQueueAudioDevice, BufferQueueDeviceType, ChannelMask,
    FrameLoop, PlanarBuffer, SessionRegistry, SimulatedQueueControl, SimulatedQueueDriver, StreamLayout,
    ThreadingMode,
};

#[derive(Clone, Default)]
struct Counts {
    started: Arc<AtomicUsize>,
    blocks: Arc<AtomicUsize>,
    stopped: Arc<AtomicUsize>,
}

impl Counts {
    fn get(&self) -> (usize, usize, usize) {
        (
            self.started.load(Ordering::SeqCst),
            self.blocks.load(Ordering::SeqCst),
            self.stopped.load(Ordering::SeqCst),
        )
    }
}

struct CountingCallback(Counts);

impl AudioIoCallback for CountingCallback {
    fn about_to_start(&mut self, _layout: &StreamLayout) {
        self.0.started.fetch_add(1, Ordering::SeqCst);
    }

    fn process_block(&mut self, _input: &PlanarBuffer, output: &mut PlanarBuffer) {
        output.fill(0.25);
        self.0.blocks.fetch_add(1, Ordering::SeqCst);
    }

    fn stopped(&mut self) {
        self.0.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    frame_loop: FrameLoop,
    device: BufferQueueAudioDevice<SimulatedQueueDriver>,
    control: SimulatedQueueControl,
}

fn harness() -> Harness {
    harness_with(BackendConfiguration::default())
}

fn dedicated_harness(stop_timeout_ms: u64) -> Harness {
    harness_with(BackendConfiguration {
        threading: ThreadingMode::DedicatedThread,
        stop_timeout_ms,
        ..BackendConfiguration::default()
    })
}

fn harness_with(config: BackendConfiguration) -> Harness {
    let frame_loop = FrameLoop::new();
    let device_type = BufferQueueDeviceType::new(config, Arc::new(SessionRegistry::new()), &frame_loop);
    let driver = SimulatedQueueDriver::new();
    let control = driver.control();
    let device = device_type.create_device("OpenAL", "", driver).expect("single device");
    Harness {
        frame_loop,
        device,
        control,
    }
}

#[test]
fn open_close_for_every_supported_mask() {
    let h = harness();
    for inputs in 0..=2 {
        for outputs in 1..=2 {
            h.device
                .open(ChannelMask::with_count(inputs), ChannelMask::with_count(outputs), 44100.0, 512)
                .unwrap();
            assert!(h.device.is_open());
            assert!(h.control.has_voice());
            assert_eq!(h.control.is_capture_open(), inputs > 0);

            h.device.close();
            assert!(!h.device.is_open());
            assert!(!h.control.is_output_open());
            assert!(!h.control.is_capture_open());
            assert!(!h.control.has_voice());
        }
    }
}

#[test]
fn unsupported_masks_leave_device_closed() {
    let h = harness();
    assert!(h
        .device
        .open(ChannelMask::NONE, ChannelMask::with_count(3), 48000.0, 512)
        .is_err());
    assert!(!h.device.is_open());
    assert!(h.device.last_error().is_some());
}

#[test]
fn callbacks_pair_up_across_start_stop_sequences() {
    let h = harness();
    let counts = Counts::default();
    h.device
        .open(ChannelMask::NONE, ChannelMask::with_count(2), 48000.0, 256)
        .unwrap();

    h.device.start(Box::new(CountingCallback(counts.clone()))).unwrap();
    h.frame_loop.on_animation_frame();
    h.device.stop();
    assert_eq!(counts.get(), (1, 0, 1));

    // Stopped before any frame ran: neither notification fires.
    h.device.start(Box::new(CountingCallback(counts.clone()))).unwrap();
    h.device.stop();
    assert_eq!(counts.get(), (1, 0, 1));

    h.device.start(Box::new(CountingCallback(counts.clone()))).unwrap();
    h.frame_loop.on_animation_frame();
    h.control.consume(1);
    h.frame_loop.on_animation_frame();
    h.device.close();

    let (started, blocks, stopped) = counts.get();
    assert_eq!((started, stopped), (2, 2));
    assert_eq!(blocks, 1);
}

#[test]
fn frames_after_stop_do_nothing() {
    let h = harness();
    let counts = Counts::default();
    h.device
        .open(ChannelMask::NONE, ChannelMask::with_count(1), 48000.0, 256)
        .unwrap();
    h.device.start(Box::new(CountingCallback(counts.clone()))).unwrap();
    h.frame_loop.on_animation_frame();
    h.device.stop();

    h.control.consume_all();
    for _ in 0..5 {
        h.frame_loop.on_animation_frame();
    }
    assert_eq!(counts.get(), (1, 0, 1));
    assert!(!h.device.is_playing());
}

#[test]
fn draining_every_slot_counts_an_under_run() {
    let h = harness();
    h.device
        .open(ChannelMask::NONE, ChannelMask::with_count(2), 48000.0, 256)
        .unwrap();
    h.device.start(Box::new(CountingCallback(Counts::default()))).unwrap();
    h.frame_loop.on_animation_frame();
    assert_eq!(h.device.xrun_count(), 0);

    h.control.consume_all();
    h.frame_loop.on_animation_frame();
    assert_eq!(h.device.xrun_count(), 1);

    h.control.consume(1);
    h.frame_loop.on_animation_frame();
    assert_eq!(h.device.xrun_count(), 1);

    // Counters reset on the next start.
    h.device.stop();
    h.device.start(Box::new(CountingCallback(Counts::default()))).unwrap();
    assert_eq!(h.device.xrun_count(), 0);
}

#[test]
fn rendered_blocks_reach_the_driver_as_fixed_point() {
    let h = harness();
    h.device
        .open(ChannelMask::NONE, ChannelMask::with_count(1), 48000.0, 256)
        .unwrap();
    h.device.start(Box::new(CountingCallback(Counts::default()))).unwrap();
    h.frame_loop.on_animation_frame();
    h.control.consume(1);
    h.frame_loop.on_animation_frame();
    h.control.consume(1);

    let played = h.control.played_blocks();
    let refilled = played.last().expect("a refilled block was played");
    assert_eq!(refilled.len(), 256);
    assert!(refilled.iter().all(|&s| s == (0.25 * 32767.0) as i16));
}

/// Poll `condition` for up to two seconds.
fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn dedicated_thread_pairs_callbacks_across_restarts() {
    let h = dedicated_harness(1000);
    let counts = Counts::default();
    h.device
        .open(ChannelMask::NONE, ChannelMask::with_count(2), 48000.0, 256)
        .unwrap();

    for round in 1..=3 {
        h.device.start(Box::new(CountingCallback(counts.clone()))).unwrap();
        assert!(wait_until(|| counts.get().0 == round));

        h.device.stop();
        assert_eq!(counts.get().2, round);
        assert!(!h.device.is_playing());
    }
    assert!(h.device.last_error().is_none());
}

#[test]
fn dedicated_thread_renders_without_frame_ticks() {
    let h = dedicated_harness(1000);
    let counts = Counts::default();
    h.device
        .open(ChannelMask::NONE, ChannelMask::with_count(1), 48000.0, 256)
        .unwrap();
    h.device.start(Box::new(CountingCallback(counts.clone()))).unwrap();
    assert!(wait_until(|| h.control.is_playing()));

    h.control.consume(1);
    assert!(wait_until(|| counts.get().1 >= 1));
    h.device.stop();
    assert_eq!(counts.get().2, 1);
}

#[test]
fn close_stops_a_running_dedicated_thread() {
    let h = dedicated_harness(1000);
    let counts = Counts::default();
    h.device
        .open(ChannelMask::with_count(1), ChannelMask::with_count(2), 44100.0, 512)
        .unwrap();
    h.device.start(Box::new(CountingCallback(counts.clone()))).unwrap();
    assert!(wait_until(|| counts.get().0 == 1));
    assert!(h.control.is_capturing());

    h.device.close();

    assert_eq!(counts.get().2, 1);
    assert!(!h.device.is_open());
    assert!(!h.device.is_playing());
    assert!(!h.control.is_output_open());
    assert!(!h.control.is_capture_open());
    assert!(!h.control.has_voice());
}

#[test]
fn stop_timeout_detaches_the_thread_and_records_it() {
    let h = dedicated_harness(10);
    let counts = Counts::default();
    h.device
        .open(ChannelMask::NONE, ChannelMask::with_count(2), 48000.0, 256)
        .unwrap();
    h.device.start(Box::new(CountingCallback(counts.clone()))).unwrap();
    assert!(wait_until(|| counts.get().0 == 1));

    // Every processed-slot query now blocks well past the stop timeout.
    h.control.set_advance_delay(Some(Duration::from_millis(300)));
    thread::sleep(Duration::from_millis(20));

    h.device.stop();
    assert!(!h.device.is_playing());
    assert_eq!(h.device.last_error(), Some(BackendError::Timeout.to_string()));
    assert_eq!(counts.get().2, 0);

    // The detached thread sees the stop flag after its slow call returns.
    h.control.set_advance_delay(None);
    assert!(wait_until(|| counts.get().2 == 1));
}
