//! Plain-text sample I/O: one or more numbers per line, separated by
//! whitespace or commas. Lines starting with `#` are comments.

use anyhow::{Context, Result};
use std::f64::consts::PI;
use std::io::{BufRead, Write};

pub fn read_samples<R: BufRead>(reader: R) -> Result<Vec<f64>> {
    let mut samples = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", line_no + 1))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        for token in line.split(|c: char| c == ',' || c.is_whitespace()) {
            if token.is_empty() {
                continue;
            }
            let sample: f64 = token
                .parse()
                .with_context(|| format!("line {}: '{}' is not a number", line_no + 1, token))?;
            samples.push(sample);
        }
    }
    Ok(samples)
}

pub fn write_samples<W: Write>(mut writer: W, samples: &[f64]) -> Result<()> {
    for sample in samples {
        writeln!(writer, "{sample}")?;
    }
    writer.flush()?;
    Ok(())
}

/// A sine at `frequency` plus its second harmonic at `harmonic_ratio`
/// times the fundamental's amplitude.
pub fn synthesize_tone(
    frequency: f64,
    harmonic_ratio: f64,
    amplitude: f64,
    sample_rate: u32,
    len: usize,
) -> Vec<f64> {
    let step = 2.0 * PI * frequency / sample_rate as f64;
    (0..len)
        .map(|i| {
            let phase = step * i as f64;
            amplitude * (phase.sin() + harmonic_ratio * (2.0 * phase).sin())
        })
        .collect()
}
