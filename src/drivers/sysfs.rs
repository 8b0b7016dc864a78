//! sysfs / evdev device files.
//!
//! Every descriptor the daemon uses is opened here, once, at startup.
//! Two owners come out of [`open_all`]:
//!
//! - [`SysfsDevices`]: relay, backlight and sensor value files, handed to
//!   the service as its [`DevicePort`];
//! - [`InputSources`]: button value files and evdev streams, handed to the
//!   reactor, which polls them.
//!
//! Relay and backlight files are required; sensors and the ambient light
//! streams are optional and simply read as "no value" when absent.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use log::{debug, info, warn};

use crate::app::ports::{DevicePort, bad_relay};
use crate::error::{Error, Result};
use crate::events::{INPUT_EVENT_SIZE, InputEvent};
use crate::pins::DevicePaths;

/// Largest integer file we expect (`-40000\n` and the like).
const INT_READ_LEN: usize = 32;

// ───────────────────────────────────────────────────────────────
// Primitive file I/O
// ───────────────────────────────────────────────────────────────

/// First byte of a value file.
pub fn read_byte(file: &mut File) -> io::Result<u8> {
    file.seek(SeekFrom::Start(0))?;
    let mut buf = [0u8; 2];
    match file.read(&mut buf)? {
        0 => Err(io::ErrorKind::UnexpectedEof.into()),
        _ => Ok(buf[0]),
    }
}

/// Overwrite a value file with a single byte.
pub fn write_byte(file: &mut File, byte: u8) -> io::Result<()> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&[byte])
}

/// Signed decimal content of a sensor file; `None` on any failure.
pub fn read_int(file: &mut File) -> Option<i32> {
    file.seek(SeekFrom::Start(0)).ok()?;
    let mut buf = [0u8; INT_READ_LEN];
    let n = file.read(&mut buf).ok()?;
    core::str::from_utf8(&buf[..n]).ok()?.trim().parse().ok()
}

/// Read whole `input_event` records until the descriptor runs dry.
/// Returns the number of records visited.
pub fn drain_input_events(file: &mut File, mut visit: impl FnMut(InputEvent)) -> usize {
    let mut raw = [0u8; INPUT_EVENT_SIZE];
    let mut count = 0;
    loop {
        match file.read(&mut raw) {
            Ok(INPUT_EVENT_SIZE) => {
                visit(InputEvent::from_bytes(&raw));
                count += 1;
            }
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => {
                debug!("input read stopped: {}", e);
                break;
            }
        }
    }
    count
}

/// Write `both` into each button's `edge` file.
pub fn configure_button_edges(paths: &DevicePaths) -> Result<()> {
    for button in 0..paths.buttons.len() {
        let path = paths.button_edge(button);
        let mut file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|e| Error::open(&path, e))?;
        file.write_all(b"both")?;
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Opening
// ───────────────────────────────────────────────────────────────

fn open_rw(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| Error::open(path, e))
}

fn open_ro(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| Error::open(path, e))
}

fn open_input(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .map_err(|e| Error::open(path, e))
}

fn open_optional(path: &Path, open: fn(&Path) -> Result<File>) -> Option<File> {
    match open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            warn!("{}; continuing without it", e);
            None
        }
    }
}

/// Open every device file.  Relays, backlight, buttons and the screen and
/// proximity inputs are required.  `ambient_light` enables the two
/// ambient light streams.
pub fn open_all(paths: &DevicePaths, ambient_light: bool) -> Result<(SysfsDevices, InputSources)> {
    let devices = SysfsDevices {
        relays: [open_rw(&paths.relays[0])?, open_rw(&paths.relays[1])?],
        screen: open_rw(&paths.screen)?,
        temperature: open_optional(&paths.temperature, open_ro),
        humidity: open_optional(&paths.humidity, open_ro),
    };

    let ambient = if ambient_light {
        [
            open_optional(&paths.ambient_light_input, open_input),
            open_optional(&paths.ambient_light_ir_input, open_input),
        ]
    } else {
        [None, None]
    };
    let inputs = InputSources {
        buttons: [open_ro(&paths.button_value(0))?, open_ro(&paths.button_value(1))?],
        screen: open_input(&paths.screen_input)?,
        proximity: open_input(&paths.proximity_input)?,
        ambient,
    };

    info!(
        "devices open (temperature: {}, humidity: {}, ambient channels: {})",
        devices.temperature.is_some(),
        devices.humidity.is_some(),
        inputs.ambient.iter().flatten().count()
    );
    Ok((devices, inputs))
}

// ───────────────────────────────────────────────────────────────
// Value files (DevicePort)
// ───────────────────────────────────────────────────────────────

pub struct SysfsDevices {
    relays: [File; 2],
    screen: File,
    temperature: Option<File>,
    humidity: Option<File>,
}

impl DevicePort for SysfsDevices {
    fn read_relay(&mut self, relay: usize) -> Option<u8> {
        read_byte(self.relays.get_mut(relay)?).ok()
    }

    fn write_relay(&mut self, relay: usize, on: bool) -> core::result::Result<(), Error> {
        let file = self.relays.get_mut(relay).ok_or_else(|| bad_relay(relay))?;
        write_byte(file, if on { b'1' } else { b'0' })?;
        Ok(())
    }

    fn write_screen(&mut self, on: bool) -> core::result::Result<(), Error> {
        write_byte(&mut self.screen, if on { b'1' } else { b'0' })?;
        Ok(())
    }

    fn read_temperature(&mut self) -> Option<i32> {
        read_int(self.temperature.as_mut()?)
    }

    fn read_humidity(&mut self) -> Option<i32> {
        read_int(self.humidity.as_mut()?)
    }
}

// ───────────────────────────────────────────────────────────────
// Poll sources
// ───────────────────────────────────────────────────────────────

/// Descriptors the reactor polls.
pub struct InputSources {
    pub buttons: [File; 2],
    pub screen: File,
    pub proximity: File,
    /// `[ambient, ambient IR]`, each present only if enabled and opened.
    pub ambient: [Option<File>; 2],
}

impl InputSources {
    /// Consume the value present at startup so the first edge starts fresh.
    pub fn discard_initial_button_values(&mut self) {
        for (button, file) in self.buttons.iter_mut().enumerate() {
            match read_byte(file) {
                Ok(value) => debug!("button {} initial value {:?}", button, value as char),
                Err(e) => warn!("button {} initial read failed: {}", button, e),
            }
        }
    }
}
