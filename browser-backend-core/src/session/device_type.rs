use std::sync::Arc;

use crate::messaging::frame_loop::FrameLoop;
use crate::models::audio_models::DEVICE_TYPE_NAME;
use crate::models::config::BackendConfiguration;
use crate::session::device::BufferQueueAudioDevice;
use crate::session::registry::SessionRegistry;
use crate::traits::buffer_queue_driver::BufferQueueDriver;

/// Device-type surface handed to the host's device registry.
///
/// There is exactly one device, named after the type. Creating the type hooks
/// the session registry into the frame loop so cooperative feeds get ticked.
pub struct BufferQueueDeviceType {
    config: BackendConfiguration,
    registry: Arc<SessionRegistry>,
}

impl BufferQueueDeviceType {
    pub fn new(config: BackendConfiguration, registry: Arc<SessionRegistry>, frame_loop: &FrameLoop) -> Self {
        registry.attach(frame_loop);
        Self { config, registry }
    }

    pub fn type_name(&self) -> &'static str {
        DEVICE_TYPE_NAME
    }

    pub fn device_names(&self) -> Vec<String> {
        vec![DEVICE_TYPE_NAME.to_string()]
    }

    pub fn scan_for_devices(&self) {}

    pub fn default_device_index(&self) -> usize {
        0
    }

    pub fn has_separate_inputs_and_outputs(&self) -> bool {
        false
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Returns a device when either name matches the single device.
    pub fn create_device<D: BufferQueueDriver + 'static>(
        &self,
        output_name: &str,
        input_name: &str,
        driver: D,
    ) -> Option<BufferQueueAudioDevice<D>> {
        if output_name != DEVICE_TYPE_NAME && input_name != DEVICE_TYPE_NAME {
            log::warn!("Unknown audio device requested: {} / {}", output_name, input_name);
            return None;
        }
        Some(BufferQueueAudioDevice::new(driver, self.config.clone(), Arc::clone(&self.registry)))
    }
}
