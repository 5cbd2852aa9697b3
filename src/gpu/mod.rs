pub mod amd;
pub mod intel;
pub mod nvidia;

use thiserror::Error;

/// Sentinel reading substituted when a vendor probe fails. Downstream
/// parsing treats it as "no number this tick", never as a fatal error.
pub const UNAVAILABLE: &str = "unavailable";

/// Sentinel handed to callers when no descriptor matches a known vendor.
pub const NO_GPU: &str = "no discrete GPU found";

#[derive(Debug, Error)]
pub enum VendorError {
    #[error("no discrete GPU found")]
    Unresolved,
}

/// The vendor set is closed; selection is by substring match on the GPU
/// descriptor, not plugin discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
}

impl GpuVendor {
    /// Scans descriptors in order: the first discrete match (NVIDIA or AMD)
    /// wins; integrated Intel is only a fallback when no discrete GPU is
    /// present. Resolved fresh on every call so a hot-swapped GPU is picked
    /// up on the next tick.
    pub fn resolve(descriptors: &[String]) -> Result<(GpuVendor, &str), VendorError> {
        for descriptor in descriptors {
            let lower = descriptor.to_lowercase();
            if lower.contains("nvidia") {
                return Ok((GpuVendor::Nvidia, descriptor));
            }
            if lower.contains("amd") {
                return Ok((GpuVendor::Amd, descriptor));
            }
        }
        for descriptor in descriptors {
            if descriptor.to_lowercase().contains("intel") {
                return Ok((GpuVendor::Intel, descriptor));
            }
        }
        Err(VendorError::Unresolved)
    }

    /// Raw temperature text from the vendor tool. Integrated Intel graphics
    /// has no discrete sensor and reports the shared CPU reading instead.
    pub fn temperature(self, cpu_temperature: &str) -> String {
        match self {
            GpuVendor::Nvidia => nvidia::temperature(),
            GpuVendor::Amd => amd::temperature(),
            GpuVendor::Intel => cpu_temperature.to_string(),
        }
    }

    /// Raw utilization text from the vendor tool.
    pub fn utilization(self) -> String {
        match self {
            GpuVendor::Nvidia => nvidia::utilization(),
            GpuVendor::Amd => amd::utilization(),
            GpuVendor::Intel => intel::utilization(),
        }
    }
}
