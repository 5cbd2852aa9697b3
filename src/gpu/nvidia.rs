use super::UNAVAILABLE;
use crate::probe;
use tracing::debug;

pub fn temperature() -> String {
    query("temperature.gpu")
}

pub fn utilization() -> String {
    query("utilization.gpu")
}

// nvidia-smi answers a single-field query with one numeric line per GPU.
fn query(field: &str) -> String {
    let query_arg = format!("--query-gpu={field}");
    match probe::run("nvidia-smi", &[&query_arg, "--format=csv,noheader,nounits"]) {
        Ok(text) => text.trim().to_string(),
        Err(err) => {
            debug!(field, error = %err, "nvidia-smi probe failed");
            UNAVAILABLE.to_string()
        }
    }
}
