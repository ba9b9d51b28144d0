//! Inspect command implementation.

use anyhow::{Context, Result};
use flashdump::format::decode::detect_format;
use flashdump::{Decoded, DumpFormat, decode_intel_hex, decode_srecord};
use std::fs;
use std::path::Path;

/// Read and verify a record file.
fn load(file: &Path) -> Result<(DumpFormat, Decoded)> {
    let bytes =
        fs::read(file).with_context(|| format!("Failed to read file: {}", file.display()))?;
    let text = String::from_utf8(bytes).map_err(|_| {
        flashdump::Error::InvalidInput(format!(
            "{} is binary, not an Intel HEX or S-record file",
            file.display()
        ))
    })?;

    let decoded = match detect_format(&text) {
        Some(DumpFormat::IntelHex) => (DumpFormat::IntelHex, decode_intel_hex(&text)?),
        Some(DumpFormat::SRecord) => (DumpFormat::SRecord, decode_srecord(&text)?),
        _ => {
            return Err(flashdump::Error::InvalidInput(format!(
                "{} is not an Intel HEX or S-record file",
                file.display()
            ))
            .into());
        },
    };
    Ok(decoded)
}

fn format_label(format: DumpFormat) -> &'static str {
    match format {
        DumpFormat::IntelHex => "Intel HEX",
        DumpFormat::SRecord => "Motorola S-record",
        DumpFormat::Binary => "Binary",
        DumpFormat::HexText => "Hex text",
    }
}

fn json_report(format: DumpFormat, decoded: &Decoded) -> serde_json::Value {
    let segments: Vec<_> = decoded
        .segments
        .iter()
        .map(|segment| {
            serde_json::json!({
                "address": segment.address,
                "end": segment.end(),
                "length": segment.data.len(),
            })
        })
        .collect();

    serde_json::json!({
        "format": format.to_string(),
        "data_records": decoded.data_records,
        "total_bytes": decoded.total_len(),
        "start_address": decoded.start_address,
        "segments": segments,
    })
}

/// Inspect command implementation.
pub(crate) fn cmd_inspect(file: &Path, json: bool) -> Result<()> {
    let (format, decoded) = load(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&json_report(format, &decoded))?);
        return Ok(());
    }

    println!("File:     {}", file.display());
    println!("Format:   {} ({format})", format_label(format));
    println!("Records:  {}", decoded.data_records);
    println!("Bytes:    {}", decoded.total_len());
    if let Some(start) = decoded.start_address {
        println!("Start:    0x{start:08X}");
    }
    println!("Segments: {}", decoded.segments.len());
    for segment in &decoded.segments {
        println!(
            "  0x{:08X}..0x{:08X}  {} bytes",
            segment.address,
            segment.end(),
            segment.data.len()
        );
    }
    Ok(())
}
