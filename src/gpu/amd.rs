use super::UNAVAILABLE;
use crate::probe;
use tracing::debug;

#[cfg(target_os = "windows")]
pub fn temperature() -> String {
    // The ACPI thermal zone is the only instrumentation reachable without a
    // vendor driver stack; readings arrive in tenths of Kelvin.
    let output = probe::run(
        "wmic",
        &[
            "/namespace:\\\\root\\wmi",
            "PATH",
            "MSAcpi_ThermalZoneTemperature",
            "get",
            "CurrentTemperature",
        ],
    );
    match output {
        Ok(text) => {
            let celsius = text
                .split_whitespace()
                .filter_map(probe::parse_f64_loose)
                .find_map(normalize_thermal_zone);
            match celsius {
                Some(value) => format!("{value:.1}"),
                None => UNAVAILABLE.to_string(),
            }
        }
        Err(err) => {
            debug!(error = %err, "amd thermal zone probe failed");
            UNAVAILABLE.to_string()
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub fn temperature() -> String {
    match probe::run_shell("sensors | grep -i edge") {
        Ok(text) => text.trim().to_string(),
        Err(err) => {
            debug!(error = %err, "amd sensor-table probe failed");
            UNAVAILABLE.to_string()
        }
    }
}

#[cfg(target_os = "windows")]
pub fn utilization() -> String {
    let output = probe::run(
        "wmic",
        &[
            "path",
            "Win32_PerfFormattedData_GPUPerformanceCounters_GPUEngine",
            "get",
            "UtilizationPercentage",
        ],
    );
    match output {
        Ok(text) => text.trim().to_string(),
        Err(err) => {
            debug!(error = %err, "amd gpu engine probe failed");
            UNAVAILABLE.to_string()
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub fn utilization() -> String {
    // radeontop is only consulted when the sensor table shows nothing.
    if let Ok(text) = probe::run_shell("sensors | grep -i gpu") {
        let lines = keep_load_lines(&text);
        if !lines.is_empty() {
            return lines.join("\n");
        }
    }

    match probe::run("radeontop", &["-d", "-", "-l", "1"]) {
        Ok(text) => {
            let lines = keep_load_lines(&text);
            if lines.is_empty() {
                UNAVAILABLE.to_string()
            } else {
                lines.join("\n")
            }
        }
        Err(err) => {
            debug!(error = %err, "radeontop probe failed");
            UNAVAILABLE.to_string()
        }
    }
}

/// Utilization scrape filter: only lines carrying a percentage or an
/// explicit load reading are meaningful, the rest is banner noise.
#[cfg(not(target_os = "windows"))]
fn keep_load_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| line.contains('%') || line.contains("Load"))
        .map(|line| line.trim().to_string())
        .collect()
}

/// Thermal zone counters expose tenths of Kelvin; some firmwares already
/// report Kelvin or Celsius. Out-of-range results are rejected.
#[cfg(target_os = "windows")]
fn normalize_thermal_zone(raw: f64) -> Option<f64> {
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    let mut value = raw;
    if value > 1000.0 {
        value /= 10.0;
    }
    if value > 200.0 {
        value -= 273.15;
    }
    (0.0..=130.0).contains(&value).then_some(value)
}
