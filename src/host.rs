use crate::gpu::{GpuVendor, NO_GPU, UNAVAILABLE};
use crate::probe;
#[cfg(target_os = "linux")]
use std::fs;
use std::time::Duration;
use sysinfo::{ComponentExt, CpuExt, DiskExt, System, SystemExt};
use tracing::debug;

const CPU_TEMP_MARKERS: [&str; 6] = ["cpu", "package", "tctl", "tdie", "coretemp", "k10temp"];
const GPU_TEMP_MARKERS: [&str; 4] = ["gpu", "nvidia", "amdgpu", "radeon"];

/// Aggregates CPU-level readings from sysinfo with GPU readings from the
/// vendor adapter selected for the detected GPU. The vendor is re-resolved
/// on every query, never cached.
pub struct HostMetrics {
    system: System,
}

impl HostMetrics {
    pub fn new() -> Self {
        Self {
            system: System::new_all(),
        }
    }

    pub fn refresh(&mut self) {
        self.system.refresh_cpu();
        self.system.refresh_memory();
        self.system.refresh_components_list();
        self.system.refresh_components();
    }

    pub fn cpu_name(&self) -> String {
        self.system
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Mean load across all cores, 0..100.
    pub fn cpu_usage_percent(&self) -> f64 {
        let cpus = self.system.cpus();
        if cpus.is_empty() {
            return 0.0;
        }
        let sum: f32 = cpus.iter().map(|cpu| cpu.cpu_usage()).sum();
        (sum / cpus.len() as f32) as f64
    }

    pub fn cpu_temperature(&self) -> Option<f64> {
        select_cpu_temperature(
            self.system
                .components()
                .iter()
                .map(|c| (c.label(), c.temperature() as f64)),
        )
    }

    pub fn memory_total(&self) -> String {
        format_gb(self.system.total_memory())
    }

    pub fn memory_used(&self) -> String {
        format_gb(self.system.used_memory())
    }

    pub fn disk_total(&self) -> String {
        let total: u64 = self.system.disks().iter().map(|d| d.total_space()).sum();
        format_gb(total)
    }

    /// Space-joined RPM readings, or "not found" when no fan is exposed.
    pub fn fan_speeds(&self) -> String {
        format_fans(&read_fan_rpms())
    }

    /// Raw GPU descriptor strings, one per controller the platform reports.
    pub fn gpu_descriptors(&self) -> Vec<String> {
        probe_gpu_descriptors()
    }

    /// Short canonical GPU name for display.
    pub fn gpu_name(&self) -> String {
        match GpuVendor::resolve(&self.gpu_descriptors()) {
            Ok((_, descriptor)) => short_gpu_name(descriptor),
            Err(err) => {
                debug!(error = %err, "gpu name unavailable");
                NO_GPU.to_string()
            }
        }
    }

    pub fn gpu_temperature(&self) -> String {
        match GpuVendor::resolve(&self.gpu_descriptors()) {
            Ok((vendor, _)) => {
                let cpu = self
                    .cpu_temperature()
                    .map(|t| format!("{t:.1}"))
                    .unwrap_or_else(|| UNAVAILABLE.to_string());
                vendor.temperature(&cpu)
            }
            Err(err) => {
                debug!(error = %err, "gpu temperature unavailable");
                NO_GPU.to_string()
            }
        }
    }

    pub fn gpu_utilization(&self) -> String {
        match GpuVendor::resolve(&self.gpu_descriptors()) {
            Ok((vendor, _)) => vendor.utilization(),
            Err(err) => {
                debug!(error = %err, "gpu utilization unavailable");
                NO_GPU.to_string()
            }
        }
    }

    pub fn host_name(&self) -> String {
        self.system
            .host_name()
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn os_description(&self) -> String {
        let name = self.system.name().unwrap_or_else(|| "unknown".to_string());
        match self.system.os_version() {
            Some(version) => format!("{name} {version}"),
            None => name,
        }
    }

    pub fn uptime(&self) -> Duration {
        Duration::from_secs(self.system.uptime())
    }
}

/// Picks the hottest plausible CPU sensor. Primary pass wants an explicit
/// CPU marker; the fallback accepts any non-GPU sensor in range so exotic
/// board labels still produce a reading.
fn select_cpu_temperature<'a>(
    readings: impl IntoIterator<Item = (&'a str, f64)> + Clone,
) -> Option<f64> {
    let in_range = |t: &f64| (0.0..=130.0).contains(t) && *t > 0.0;

    let primary = readings
        .clone()
        .into_iter()
        .filter(|(_, t)| in_range(t))
        .filter(|(label, _)| {
            let label = label.to_lowercase();
            CPU_TEMP_MARKERS.iter().any(|m| label.contains(m))
                && !GPU_TEMP_MARKERS.iter().any(|m| label.contains(m))
        })
        .map(|(_, t)| t)
        .max_by(|a, b| a.total_cmp(b));
    if primary.is_some() {
        return primary;
    }

    readings
        .into_iter()
        .filter(|(_, t)| in_range(t))
        .filter(|(label, _)| {
            let label = label.to_lowercase();
            !GPU_TEMP_MARKERS.iter().any(|m| label.contains(m))
        })
        .map(|(_, t)| t)
        .max_by(|a, b| a.total_cmp(b))
}

/// Bytes to gigabytes, two decimals.
pub fn format_gb(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / 1024.0 / 1024.0 / 1024.0)
}

fn format_fans(rpms: &[u64]) -> String {
    if rpms.is_empty() {
        return "not found".to_string();
    }
    rpms.iter()
        .map(|rpm| rpm.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(target_os = "linux")]
fn read_fan_rpms() -> Vec<u64> {
    let Ok(entries) = fs::read_dir("/sys/class/hwmon") else {
        return Vec::new();
    };

    let mut rpms = Vec::new();
    for entry in entries.flatten() {
        let Ok(files) = fs::read_dir(entry.path()) else {
            continue;
        };
        for file in files.flatten() {
            let name = file.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with("fan") || !name.ends_with("_input") {
                continue;
            }
            if let Ok(raw) = fs::read_to_string(file.path()) {
                if let Ok(rpm) = raw.trim().parse::<u64>() {
                    rpms.push(rpm);
                }
            }
        }
    }
    rpms.sort_unstable();
    rpms
}

#[cfg(target_os = "windows")]
fn read_fan_rpms() -> Vec<u64> {
    match probe::run("wmic", &["path", "Win32_Fan", "get", "DesiredSpeed"]) {
        Ok(text) => text
            .split_whitespace()
            .filter_map(probe::parse_f64_loose)
            .map(|v| v.max(0.0) as u64)
            .collect(),
        Err(err) => {
            debug!(error = %err, "fan probe failed");
            Vec::new()
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn read_fan_rpms() -> Vec<u64> {
    Vec::new()
}

#[cfg(target_os = "windows")]
fn probe_gpu_descriptors() -> Vec<String> {
    match probe::run("wmic", &["path", "win32_VideoController", "get", "name"]) {
        Ok(text) => parse_video_controller_names(&text),
        Err(err) => {
            debug!(error = %err, "video controller probe failed");
            Vec::new()
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn probe_gpu_descriptors() -> Vec<String> {
    match probe::run("lspci", &[]) {
        Ok(text) => parse_lspci_gpus(&text),
        Err(err) => {
            debug!(error = %err, "lspci probe failed");
            Vec::new()
        }
    }
}

fn parse_lspci_gpus(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| {
            line.contains("VGA") || line.contains("3D") || line.contains("Display controller")
        })
        .filter_map(|line| line.splitn(2, ": ").nth(1))
        .map(|device| device.trim().to_string())
        .collect()
}

#[allow(dead_code)] // exercised on Windows targets and in tests
fn parse_video_controller_names(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.eq_ignore_ascii_case("name"))
        .map(str::to_string)
        .collect()
}

/// Rewrites a raw descriptor into the short display form: the bracketed
/// model token for AMD/NVIDIA cards, one fixed label for every Intel
/// variant.
pub fn short_gpu_name(descriptor: &str) -> String {
    if descriptor.to_lowercase().contains("intel") {
        return "Intel Graphics".to_string();
    }
    // lspci descriptors may carry two bracket groups ("[AMD/ATI] ... [Radeon
    // RX 6700 XT]"); the model token is the last one.
    if let (Some(open), Some(close)) = (descriptor.rfind('['), descriptor.rfind(']')) {
        if open < close {
            return descriptor[open + 1..close].to_string();
        }
    }
    descriptor.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gb_formatting_has_two_decimals() {
        assert_eq!(format_gb(0), "0.00 GB");
        assert_eq!(format_gb(17_091_788_800), "15.92 GB");
    }

    #[test]
    fn fans_join_or_fall_back() {
        assert_eq!(format_fans(&[]), "not found");
        assert_eq!(format_fans(&[900, 1200]), "900 1200");
    }

    #[test]
    fn short_name_extracts_bracketed_model_token() {
        assert_eq!(
            short_gpu_name("NVIDIA Corporation GA106 [GeForce RTX 3060] (rev a1)"),
            "GeForce RTX 3060"
        );
        assert_eq!(
            short_gpu_name("Advanced Micro Devices, Inc. [AMD/ATI] Navi 22 [Radeon RX 6700 XT]"),
            "Radeon RX 6700 XT"
        );
    }

    #[test]
    fn short_name_collapses_intel_variants() {
        assert_eq!(short_gpu_name("Intel UHD Graphics 630"), "Intel Graphics");
        assert_eq!(
            short_gpu_name("Intel Corporation Iris Xe Graphics (rev 01)"),
            "Intel Graphics"
        );
    }

    #[test]
    fn short_name_passes_through_unbracketed_descriptors() {
        assert_eq!(short_gpu_name(" NVIDIA GeForce GTX 1080 "), "NVIDIA GeForce GTX 1080");
    }

    #[test]
    fn cpu_sensor_selection_prefers_cpu_markers() {
        let readings = vec![
            ("amdgpu edge", 67.0),
            ("k10temp Tctl", 54.5),
            ("nvme Composite", 38.0),
        ];
        assert_eq!(select_cpu_temperature(readings), Some(54.5));
    }

    #[test]
    fn cpu_sensor_selection_falls_back_to_any_non_gpu_sensor() {
        let readings = vec![("acpitz", 49.0), ("amdgpu edge", 70.0)];
        assert_eq!(select_cpu_temperature(readings), Some(49.0));
    }

    #[test]
    fn cpu_sensor_selection_rejects_implausible_values() {
        let readings = vec![("coretemp Package id 0", 0.0), ("cpu thermal", 300.0)];
        assert_eq!(select_cpu_temperature(readings), None);
    }

    #[test]
    fn lspci_gpu_lines_yield_device_descriptors() {
        let text = "00:02.0 VGA compatible controller: Intel Corporation UHD Graphics 620\n\
                    00:14.0 USB controller: Intel Corporation Sunrise Point-LP USB 3.0\n\
                    01:00.0 3D controller: NVIDIA Corporation GP108M [GeForce MX150] (rev a1)\n";
        let gpus = parse_lspci_gpus(text);
        assert_eq!(
            gpus,
            vec![
                "Intel Corporation UHD Graphics 620".to_string(),
                "NVIDIA Corporation GP108M [GeForce MX150] (rev a1)".to_string(),
            ]
        );
    }

    #[test]
    fn video_controller_names_skip_header_and_blanks() {
        let text = "Name\r\n\r\nNVIDIA GeForce RTX 3060\r\nIntel(R) UHD Graphics 630\r\n\r\n";
        let gpus = parse_video_controller_names(text);
        assert_eq!(gpus.len(), 2);
        assert_eq!(gpus[0], "NVIDIA GeForce RTX 3060");
    }
}
