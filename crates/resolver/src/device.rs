//! Accelerator selection for local models.

use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, sync::OnceLock};

/// Compute device a local model loads onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// NVIDIA CUDA.
    Cuda,
    /// Apple Metal Performance Shaders.
    Mps,
    /// Plain CPU.
    Cpu,
}

impl Device {
    /// Lowercase device name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cuda => "cuda",
            Self::Mps => "mps",
            Self::Cpu => "cpu",
        }
    }

    /// Parse an explicit device request. `gpu` is an alias for `cuda`;
    /// anything unrecognized yields `None`.
    pub fn parse(requested: &str) -> Option<Self> {
        match requested.trim().to_ascii_lowercase().as_str() {
            "cuda" | "gpu" => Some(Self::Cuda),
            "mps" => Some(Self::Mps),
            "cpu" => Some(Self::Cpu),
            _ => None,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reports which accelerators this host offers.
pub trait DeviceProbe: Send + Sync {
    /// Whether a CUDA device is usable.
    fn cuda_available(&self) -> bool;

    /// Whether Metal (MPS) is usable.
    fn mps_available(&self) -> bool;

    /// Best available device: CUDA, then MPS, then CPU.
    fn detect(&self) -> Device {
        if self.cuda_available() {
            Device::Cuda
        } else if self.mps_available() {
            Device::Mps
        } else {
            Device::Cpu
        }
    }
}

impl<P: DeviceProbe + ?Sized> DeviceProbe for &P {
    fn cuda_available(&self) -> bool {
        (**self).cuda_available()
    }

    fn mps_available(&self) -> bool {
        (**self).mps_available()
    }
}

/// Probe of the running host. The CUDA check runs once per process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

static CUDA: OnceLock<bool> = OnceLock::new();

impl DeviceProbe for SystemProbe {
    fn cuda_available(&self) -> bool {
        *CUDA.get_or_init(probe_cuda)
    }

    fn mps_available(&self) -> bool {
        cfg!(all(target_os = "macos", target_arch = "aarch64"))
    }
}

fn probe_cuda() -> bool {
    // CUDA_VISIBLE_DEVICES="" or "-1" hides every device.
    if let Ok(visible) = std::env::var("CUDA_VISIBLE_DEVICES") {
        let visible = visible.trim();
        if visible.is_empty() || visible == "-1" {
            return false;
        }
    }
    let found = Path::new("/proc/driver/nvidia/version").exists() || on_path("nvidia-smi");
    tracing::debug!("cuda available: {found}");
    found
}

fn on_path(program: &str) -> bool {
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| {
        dir.join(program).is_file() || dir.join(format!("{program}.exe")).is_file()
    })
}

/// A probe that always reports the same device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedProbe(pub Device);

impl DeviceProbe for FixedProbe {
    fn cuda_available(&self) -> bool {
        self.0 == Device::Cuda
    }

    fn mps_available(&self) -> bool {
        self.0 == Device::Mps
    }

    fn detect(&self) -> Device {
        self.0
    }
}

/// Resolve a configured device, auto-detecting when it is absent or not
/// one of `cuda`, `gpu`, `mps` or `cpu`.
pub fn normalize(requested: Option<&str>, probe: &impl DeviceProbe) -> Device {
    match requested.and_then(Device::parse) {
        Some(device) => device,
        None => {
            let device = probe.detect();
            tracing::debug!("device {requested:?} not recognized, detected {device}");
            device
        }
    }
}
