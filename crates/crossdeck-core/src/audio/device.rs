//! Audio device lookup
//!
//! Enumerates output devices from every available cpal host so a configured
//! device name can be resolved regardless of which backend exposes it.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::HostId;

use super::error::{AudioError, AudioResult};

/// Get a human-readable name for a host ID
fn host_name(host_id: HostId) -> String {
    let name = format!("{:?}", host_id);
    match name.as_str() {
        "Alsa" => "ALSA".to_string(),
        "Wasapi" => "WASAPI".to_string(),
        _ => name,
    }
}

/// Information about an audio output device
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Human-readable device name
    pub name: String,
    /// Host backend name (e.g., "ALSA", "CoreAudio")
    pub host: String,
    /// Whether this is the system default device for its host
    pub is_default: bool,
    /// Maximum output channels
    pub max_channels: u16,
}

impl std::fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.host, self.name)
    }
}

/// Get all available audio output devices from all hosts
pub fn get_output_devices() -> AudioResult<Vec<AudioDevice>> {
    let mut all_devices = Vec::new();

    for host_id in cpal::available_hosts() {
        let host = match cpal::host_from_id(host_id) {
            Ok(h) => h,
            Err(e) => {
                log::debug!("Could not initialize host {:?}: {}", host_id, e);
                continue;
            }
        };
        let host_label = host_name(host_id);
        let default_name = host
            .default_output_device()
            .and_then(|d: cpal::Device| d.name().ok());

        let devices = match host.output_devices() {
            Ok(d) => d,
            Err(e) => {
                log::debug!("Could not enumerate devices for {:?}: {}", host_id, e);
                continue;
            }
        };

        for device in devices {
            let Ok(name) = device.name() else { continue };
            let max_channels = match device.supported_output_configs() {
                Ok(configs) => configs.map(|c| c.channels()).max().unwrap_or(0),
                Err(_) => continue,
            };
            all_devices.push(AudioDevice {
                is_default: default_name.as_ref() == Some(&name),
                name,
                host: host_label.clone(),
                max_channels,
            });
        }
    }

    if all_devices.is_empty() {
        return Err(AudioError::NoDevices);
    }

    all_devices.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| a.host.cmp(&b.host))
            .then_with(|| a.name.cmp(&b.name))
    });
    log::info!("Enumerated {} audio output devices", all_devices.len());
    Ok(all_devices)
}

/// Find an output device by name across all hosts
pub fn find_device_by_name(name: &str) -> AudioResult<cpal::Device> {
    for host_id in cpal::available_hosts() {
        let Ok(host) = cpal::host_from_id(host_id) else { continue };
        let Ok(mut devices) = host.output_devices() else { continue };
        let found = devices.find(|d: &cpal::Device| d.name().ok().as_deref() == Some(name));
        if let Some(device) = found {
            return Ok(device);
        }
    }
    Err(AudioError::DeviceNotFound(name.to_string()))
}

/// Resolve the configured output device, or the default when `name` is
/// `None`
///
/// An unknown name logs every device that could have been used instead.
pub fn resolve_output_device(name: Option<&str>) -> AudioResult<cpal::Device> {
    let Some(name) = name else {
        return get_default_device();
    };
    find_device_by_name(name).map_err(|e| {
        match get_output_devices() {
            Ok(devices) => {
                log::warn!("Output device {:?} not found; available devices:", name);
                for device in &devices {
                    log::warn!("  {} ({} channels)", device, device.max_channels);
                }
            }
            Err(err) => log::warn!("Output device {:?} not found: {}", name, err),
        }
        e
    })
}

/// Get the default output device from the default host
pub fn get_default_device() -> AudioResult<cpal::Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| AudioError::NoDefaultDevice("No default output device".to_string()))
}
