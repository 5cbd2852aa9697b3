use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to launch `{command}`: {source}")]
    Unavailable {
        command: String,
        source: std::io::Error,
    },
    #[error("`{command}` produced no usable output")]
    Empty { command: String },
    #[error("expected {expected} numeric values in probe output, found {found}")]
    Malformed { expected: usize, found: usize },
}

/// Runs one diagnostic command and captures its stdout as text.
///
/// Both a missing binary and a non-zero exit map to `Unavailable`; callers
/// treat every variant as a soft failure and substitute a sentinel reading.
pub fn run(program: &str, args: &[&str]) -> Result<String, ProbeError> {
    let command = display_command(program, args);
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| ProbeError::Unavailable {
            command: command.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(ProbeError::Unavailable {
            command,
            source: std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("exit status {}", output.status),
            ),
        });
    }

    let text = decode_stdout(&output.stdout);
    if text.trim().is_empty() {
        return Err(ProbeError::Empty { command });
    }
    Ok(text)
}

/// Runs a full shell line, for probes that need a pipeline.
pub fn run_shell(line: &str) -> Result<String, ProbeError> {
    #[cfg(target_os = "windows")]
    {
        run("cmd", &["/C", line])
    }
    #[cfg(not(target_os = "windows"))]
    {
        run("sh", &["-c", line])
    }
}

fn display_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

fn decode_stdout(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    // Windows console tools may emit UTF-16LE depending on the codepage.
    if !bytes.is_empty() && bytes.len() % 2 == 0 {
        let wide: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        if let Ok(text) = String::from_utf16(&wide) {
            return text;
        }
    }

    String::from_utf8_lossy(bytes).to_string()
}

/// Tolerant single-token parse: strip everything that is not an ASCII digit
/// or a decimal point, then parse what survives. A token has to begin with
/// a sign, digit, or point; identifiers with embedded digits ("Render/3D",
/// "fan1:") are labels, not readings.
pub fn parse_f64_loose(token: &str) -> Option<f64> {
    if !token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
    {
        return None;
    }
    let filtered: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if filtered.is_empty() {
        return None;
    }
    filtered.parse::<f64>().ok()
}

/// Pulls every parsable number out of scraped text, token by token.
///
/// Finding fewer numbers than the caller expects is a hard parse failure,
/// never a silent zero-fill.
pub fn extract_numbers(text: &str, expected: usize) -> Result<Vec<f64>, ProbeError> {
    let found: Vec<f64> = text.split_whitespace().filter_map(parse_f64_loose).collect();
    if found.len() < expected {
        return Err(ProbeError::Malformed {
            expected,
            found: found.len(),
        });
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_unavailable_not_fatal() {
        let err = run("hwmond-no-such-binary-3f9a", &[]).unwrap_err();
        assert!(matches!(err, ProbeError::Unavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn shell_pipeline_captures_stdout() {
        let text = run_shell("echo 42").expect("echo must run");
        assert_eq!(text.trim(), "42");
    }

    #[cfg(unix)]
    #[test]
    fn silent_success_is_empty() {
        let err = run("true", &[]).unwrap_err();
        assert!(matches!(err, ProbeError::Empty { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_unavailable() {
        let err = run("false", &[]).unwrap_err();
        assert!(matches!(err, ProbeError::Unavailable { .. }));
    }

    #[test]
    fn loose_parse_strips_units_and_signs() {
        assert_eq!(parse_f64_loose("+45.0°C"), Some(45.0));
        assert_eq!(parse_f64_loose("97%"), Some(97.0));
        assert_eq!(parse_f64_loose("1200"), Some(1200.0));
        assert_eq!(parse_f64_loose("edge:"), None);
        assert_eq!(parse_f64_loose(""), None);
    }

    #[test]
    fn loose_parse_rejects_labels_with_embedded_digits() {
        assert_eq!(parse_f64_loose("Render/3D"), None);
        assert_eq!(parse_f64_loose("fan1:"), None);
        assert_eq!(parse_f64_loose("temp1:"), None);
    }

    #[test]
    fn extract_numbers_scrapes_sensor_lines() {
        let nums = extract_numbers("edge: +45.0°C  (crit = +100.0°C)", 2).unwrap();
        assert_eq!(nums[0], 45.0);
        assert_eq!(nums[1], 100.0);
    }

    #[test]
    fn extract_numbers_short_result_is_malformed() {
        let err = extract_numbers("edge: +45.0°C", 2).unwrap_err();
        assert!(matches!(
            err,
            ProbeError::Malformed {
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn extract_numbers_no_digits_is_malformed() {
        assert!(extract_numbers("unavailable", 1).is_err());
        assert!(extract_numbers("Not supported", 1).is_err());
    }

    #[test]
    fn utf16le_stdout_is_decoded() {
        // The degree sign makes the byte stream invalid UTF-8, forcing the
        // UTF-16 fallback.
        let wide: Vec<u8> = "42 °C\r\n"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        assert_eq!(decode_stdout(&wide), "42 °C\r\n");
    }
}
