//! List-ports command implementation.

use anyhow::{Context, Result};
use console::style;
use flashdump::device::select_port;
use flashdump::{DetectedPort, auto_detect_port, detect_ports, format_port_list};

fn ports_json(ports: &[DetectedPort]) -> serde_json::Value {
    ports
        .iter()
        .map(|p| {
            serde_json::json!({
                "name": p.name,
                "device": p.device.name(),
                "known": p.device.is_known(),
                "vid": p.vid,
                "pid": p.pid,
                "manufacturer": p.manufacturer,
                "product": p.product,
                "serial": p.serial,
            })
        })
        .collect()
}

/// List-ports command implementation.
///
/// JSON goes to stdout; the human-readable list goes to stderr. With `auto`
/// only the best candidate's name is printed to stdout, and the command fails
/// with `DeviceNotFound` when there is none.
pub(crate) fn cmd_list_ports(json: bool, auto: bool) -> Result<()> {
    if auto {
        let port = auto_detect_port()?;
        println!("{}", port.name);
        return Ok(());
    }

    let detected = detect_ports().context("Failed to enumerate serial ports")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ports_json(&detected))?);
        return Ok(());
    }

    eprintln!("{}", style("Available serial ports:").bold().underlined());
    if detected.is_empty() {
        eprintln!("  {}", style("No serial ports found").dim());
        return Ok(());
    }

    for line in format_port_list(&detected) {
        eprintln!("  {} {}", style("•").green(), line);
    }

    if let Ok(best) = select_port(detected) {
        eprintln!(
            "\n{} Best candidate: {}",
            style("→").green().bold(),
            style(&best.name).cyan().bold()
        );
    }
    Ok(())
}
