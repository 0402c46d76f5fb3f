use log::{info, trace};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

use crate::error::DeviceError;
use crate::handoff::EventSender;
use crate::note::NoteEvent;
use crate::playback::OutputSink;

const CLIENT_NAME: &str = "tap-arp";

/// Picks a port by name substring, or the only/first one when no name is given.
fn pick_port<P>(
    direction: &'static str,
    ports: Vec<(P, String)>,
    wanted: Option<&str>,
) -> Result<(P, String), DeviceError> {
    if ports.is_empty() {
        return Err(DeviceError::NoPorts(direction));
    }

    match wanted {
        Some(wanted) => ports
            .into_iter()
            .find(|(_, name)| name.contains(wanted))
            .ok_or_else(|| DeviceError::PortNotFound {
                direction,
                wanted: wanted.to_owned(),
            }),
        None => {
            if ports.len() > 1 {
                let names: Vec<&str> = ports.iter().map(|(_, name)| name.as_str()).collect();
                info!(
                    "{} {direction} ports available, using the first: {}",
                    names.len(),
                    names.join(", ")
                );
            }
            ports.into_iter().next().ok_or(DeviceError::NoPorts(direction))
        }
    }
}

/// Connects to an input port and forwards every decoded note event.
///
/// The callback runs on midir's thread and blocks in [`EventSender::deliver`]
/// while the detector is busy.
pub fn connect_input(
    wanted: Option<&str>,
    events: EventSender,
) -> Result<MidiInputConnection<()>, DeviceError> {
    let mut midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| DeviceError::Open {
        direction: "input",
        reason: e.to_string(),
    })?;
    midi_in.ignore(Ignore::All);

    let ports = midi_in
        .ports()
        .into_iter()
        .map(|p| {
            let name = midi_in
                .port_name(&p)
                .unwrap_or_else(|_| "<unknown>".to_string());
            (p, name)
        })
        .collect();
    let (port, port_name) = pick_port("input", ports, wanted)?;

    let conn = midi_in
        .connect(
            &port,
            "tap-arp-in",
            move |_, message, _| {
                let Some(event) = NoteEvent::decode(message) else {
                    trace!("undecodable message {message:02X?}");
                    return;
                };
                if events.deliver(event).is_err() {
                    trace!("detector gone, dropping {event:?}");
                }
            },
            (),
        )
        .map_err(|e| DeviceError::Connect {
            port: port_name.clone(),
            reason: e.to_string(),
        })?;

    info!("Listening for MIDI input from {port_name}");
    Ok(conn)
}

pub fn connect_output(wanted: Option<&str>) -> Result<MidiOutputConnection, DeviceError> {
    let midi_out = MidiOutput::new(CLIENT_NAME).map_err(|e| DeviceError::Open {
        direction: "output",
        reason: e.to_string(),
    })?;

    let ports = midi_out
        .ports()
        .into_iter()
        .map(|p| {
            let name = midi_out
                .port_name(&p)
                .unwrap_or_else(|_| "<unknown>".to_string());
            (p, name)
        })
        .collect();
    let (port, port_name) = pick_port("output", ports, wanted)?;

    let conn = midi_out
        .connect(&port, "tap-arp-out")
        .map_err(|e| DeviceError::Connect {
            port: port_name.clone(),
            reason: e.to_string(),
        })?;

    info!("Sending MIDI output to {port_name}");
    Ok(conn)
}

impl OutputSink for MidiOutputConnection {
    fn send(&mut self, message: &[u8; 3]) -> Result<(), DeviceError> {
        MidiOutputConnection::send(self, message).map_err(|e| DeviceError::Send {
            message: *message,
            reason: e.to_string(),
        })
    }
}
