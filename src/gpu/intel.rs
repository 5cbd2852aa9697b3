#[cfg(not(target_os = "windows"))]
use super::UNAVAILABLE;
#[cfg(not(target_os = "windows"))]
use crate::probe;
#[cfg(not(target_os = "windows"))]
use tracing::debug;

// Temperature has no adapter here: integrated graphics shares the CPU
// package sensor, so GpuVendor::temperature answers with the CPU reading.

#[cfg(target_os = "windows")]
pub fn utilization() -> String {
    "Not supported".to_string()
}

#[cfg(not(target_os = "windows"))]
pub fn utilization() -> String {
    // intel_gpu_top streams forever in list mode; head closes the pipe
    // after the first report so the tool exits on SIGPIPE.
    match probe::run_shell("intel_gpu_top -l | head -n 4") {
        Ok(text) => {
            let lines = keep_engine_lines(&text);
            if lines.is_empty() {
                UNAVAILABLE.to_string()
            } else {
                lines.join("\n")
            }
        }
        Err(err) => {
            debug!(error = %err, "intel_gpu_top probe failed");
            UNAVAILABLE.to_string()
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn keep_engine_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| {
            line.contains("Gpu") || line.contains("Render") || line.contains("Active")
        })
        .map(|line| line.trim().to_string())
        .collect()
}
