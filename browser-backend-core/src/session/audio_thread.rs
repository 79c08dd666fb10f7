use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::models::error::BackendError;
use crate::models::state::{FeedState, FeedStatus};
use crate::session::feed::AudioFeedStateMachine;
use crate::traits::buffer_queue_driver::BufferQueueDriver;

#[derive(Default)]
struct Finished {
    done: Mutex<bool>,
    signal: Condvar,
}

/// Signals `Finished` when the thread body exits, including by panic.
struct FinishOnExit(Arc<Finished>);

impl Drop for FinishOnExit {
    fn drop(&mut self) {
        *self.0.done.lock() = true;
        self.0.signal.notify_all();
    }
}

/// Dedicated thread advancing one feed until it reaches `Stopped`.
pub struct AudioThread {
    stop: Arc<AtomicBool>,
    finished: Arc<Finished>,
    handle: Option<thread::JoinHandle<()>>,
}

impl AudioThread {
    pub fn spawn<D: BufferQueueDriver + 'static>(
        machine: AudioFeedStateMachine<D>,
        starvation_sleep: Duration,
    ) -> Result<Self, BackendError> {
        let stop = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(Finished::default());

        let thread_stop = Arc::clone(&stop);
        let thread_finished = Arc::clone(&finished);

        let handle = thread::Builder::new()
            .name("buffer-queue-audio".into())
            .spawn(move || {
                let _finish = FinishOnExit(thread_finished);
                let mut machine = machine;
                while machine.state() != FeedState::Stopped {
                    let status = machine.advance(thread_stop.load(Ordering::SeqCst));
                    if matches!(status, FeedStatus::NeedToWait | FeedStatus::Error) {
                        thread::sleep(starvation_sleep);
                    }
                }
            })
            .map_err(|e| BackendError::Resource(format!("failed to spawn audio thread: {}", e)))?;

        Ok(Self {
            stop,
            finished,
            handle: Some(handle),
        })
    }

    /// Raise the stop flag and wait up to `timeout` for the thread to exit.
    ///
    /// On `Timeout` the thread is detached and exits on its next iteration.
    /// A thread that panicked reports `Unknown`.
    pub fn stop(mut self, timeout: Duration) -> Result<(), BackendError> {
        self.stop.store(true, Ordering::SeqCst);

        let mut done = self.finished.done.lock();
        if !*done {
            self.finished.signal.wait_for(&mut done, timeout);
        }
        let exited = *done;
        drop(done);

        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        if !exited {
            log::warn!("Audio thread did not stop within {:?}, detaching", timeout);
            return Err(BackendError::Timeout);
        }
        handle.join().map_err(|panic| {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            log::error!("Audio thread panicked: {}", reason);
            BackendError::Unknown(format!("audio thread panicked: {}", reason))
        })
    }

    pub fn is_finished(&self) -> bool {
        *self.finished.done.lock()
    }
}

impl Drop for AudioThread {
    fn drop(&mut self) {
        // Never block in drop; a thread still running sees the flag and exits.
        self.stop.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulated::SimulatedQueueDriver;
    use crate::models::audio_models::{ChannelMask, StreamLayout};
    use crate::processing::planar_buffer::PlanarBuffer;
    use crate::session::feed::DeviceShared;
    use crate::traits::audio_callback::AudioIoCallback;
    use std::sync::atomic::AtomicUsize;

    struct Counter(Arc<AtomicUsize>, Arc<AtomicUsize>);

    impl AudioIoCallback for Counter {
        fn about_to_start(&mut self, _layout: &StreamLayout) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn process_block(&mut self, _input: &PlanarBuffer, _output: &mut PlanarBuffer) {}
        fn stopped(&mut self) {
            self.1.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn runs_until_stopped_and_fires_stopped() {
        let mut driver = SimulatedQueueDriver::new();
        let control = driver.control();
        driver.open_output().unwrap();
        let slots = driver.create_voice(2).unwrap();
        let layout = StreamLayout::from_masks(ChannelMask::NONE, ChannelMask(0b11), 48000.0, 256).unwrap();
        let shared = Arc::new(DeviceShared::new(driver));

        let started = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicUsize::new(0));
        let machine = AudioFeedStateMachine::new(
            shared,
            layout,
            slots,
            Box::new(Counter(Arc::clone(&started), Arc::clone(&stopped))),
        );

        let audio = AudioThread::spawn(machine, Duration::from_millis(1)).unwrap();
        for _ in 0..200 {
            if control.is_playing() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        control.consume_all();

        assert_eq!(audio.stop(Duration::from_millis(500)), Ok(()));
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(stopped.load(Ordering::SeqCst), 1);
    }

    struct PanicsOnStart;

    impl AudioIoCallback for PanicsOnStart {
        fn about_to_start(&mut self, _layout: &StreamLayout) {
            panic!("callback failed to start");
        }
        fn process_block(&mut self, _input: &PlanarBuffer, _output: &mut PlanarBuffer) {}
        fn stopped(&mut self) {}
    }

    #[test]
    fn panicking_thread_is_reported_on_stop() {
        let mut driver = SimulatedQueueDriver::new();
        driver.open_output().unwrap();
        let slots = driver.create_voice(2).unwrap();
        let layout = StreamLayout::from_masks(ChannelMask::NONE, ChannelMask(0b1), 48000.0, 256).unwrap();
        let machine = AudioFeedStateMachine::new(Arc::new(DeviceShared::new(driver)), layout, slots, Box::new(PanicsOnStart));

        let audio = AudioThread::spawn(machine, Duration::from_millis(1)).unwrap();
        for _ in 0..400 {
            if audio.is_finished() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(audio.is_finished());

        match audio.stop(Duration::from_secs(2)) {
            Err(BackendError::Unknown(reason)) => assert!(reason.contains("callback failed to start")),
            other => panic!("unexpected stop result {:?}", other),
        }
    }
}
