//! Serial port device manipulation.

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use serialport::{available_ports, SerialPort, SerialPortType};

use std::{thread, time::Duration};

use crate::Settings;

//==============================================================================
// Public Interface
//==============================================================================

/// Let the user pick one of the connected serial devices. Waits, with a
/// spinner, until at least one device shows up.
///
/// Returns `None` if the user cancels the selection with `Esc`.
pub(crate) fn select_port() -> Option<String> {
    let mut found_ports;
    let mut attempt: usize = 1;
    let waiting_period: usize = 1;

    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(120);
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"])
            .template("[LC] {spinner:.blue} {msg}"),
    );

    let _ = Term::stdout().hide_cursor();
    loop {
        found_ports = enumerate_serial_ports();
        if !found_ports.is_empty() {
            pb.finish_with_message("Select the port the device is connected to:");
            break;
        }
        pb.set_message(format!(
            "[{:03}s] ⌛ Waiting for a serial device to be connected...",
            style(attempt * waiting_period).dim(),
        ));
        attempt += 1;
        thread::sleep(Duration::from_secs(waiting_period as u64));
    }
    let _ = Term::stdout().show_cursor();

    let selection = select_port_interactive(&found_ports);
    if let Some(path) = &selection {
        println!("[LC] 👍 Serial port {} selected", style(path).green());
    }
    selection
}

/// Open the port named in `settings` with the configured line settings.
///
/// The port must have been chosen already (`settings.path` set).
pub(crate) fn open_and_setup_port(
    settings: &Settings,
) -> Result<Box<dyn SerialPort>, serialport::Error> {
    let path = settings.path.as_deref().ok_or_else(|| {
        serialport::Error::new(serialport::ErrorKind::InvalidInput, "no port selected")
    })?;

    let port = serialport::new(path, settings.baud_rate)
        .data_bits(settings.data_bits)
        .stop_bits(settings.stop_bits)
        .parity(settings.parity)
        .flow_control(settings.flow_control)
        .timeout(settings.timeout)
        .open()?;

    info!(
        "Connected to {} at {} baud",
        port.name().unwrap_or_else(|| path.to_owned()),
        port.baud_rate()?
    );
    debug!("data_bits    : {:#?}", port.data_bits()?);
    debug!("stop_bits    : {:#?}", port.stop_bits()?);
    debug!("parity       : {:#?}", port.parity()?);
    debug!("flow control : {:#?}", port.flow_control()?);

    Ok(port)
}

//==============================================================================
// Private stuff
//==============================================================================

/// Enumerates serial devices on the system, with the USB details when there
/// are some.
fn enumerate_serial_ports() -> Vec<String> {
    let mut ports = vec![];
    match available_ports() {
        Ok(found) => {
            for p in found {
                match p.port_type {
                    SerialPortType::UsbPort(info) => {
                        ports.push(format!(
                            "{}: ({} / {})",
                            p.port_name,
                            info.manufacturer.as_ref().map_or("", String::as_str),
                            info.product.as_ref().map_or("", String::as_str)
                        ));
                    }
                    _ => ports.push(p.port_name),
                }
            }
        }
        Err(ref e) => {
            info!("error: {}", e.to_string());
        }
    }
    ports
}

fn select_port_interactive(ports: &[String]) -> Option<String> {
    use dialoguer::{theme::ColorfulTheme, Select};

    let term = Term::buffered_stderr();
    let theme = ColorfulTheme::default();

    let mut select = Select::with_theme(&theme);
    for item in ports {
        select.item(item);
    }

    match select.default(0).interact_on_opt(&term) {
        Ok(selection) => selection.and_then(|x| port_path(&ports[x])),
        Err(ref e) => {
            info!("error: {}", e.to_string());
            None
        }
    }
}

/// Strip the USB description appended by [`enumerate_serial_ports`].
fn port_path(entry: &str) -> Option<String> {
    entry.split(": (").next().map(String::from)
}

#[test]
fn port_path_strips_usb_details() {
    assert_eq!(
        port_path("/dev/ttyUSB1: (FTDI / FT232R)").as_deref(),
        Some("/dev/ttyUSB1")
    );
    assert_eq!(port_path("COM4").as_deref(), Some("COM4"));
}
