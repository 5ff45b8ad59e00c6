//! In-process stand-in for a sensor, used by `--simulate`.
//!
//! A feeder thread writes one burst of telemetry packets per period into a
//! [`MemoryLink`]; the link's responder keeps a small register file that
//! answers read commands and absorbs writes.

use std::thread;
use std::time::Duration;

use tracing::debug;
use witlink_frame::command::{reg, HEADER};
use witlink_frame::{kind, Packet, PAYLOAD_SIZE};
use witlink_transport::{Link, MemoryLink};

/// Time between telemetry bursts.
pub const PERIOD: Duration = Duration::from_millis(20);

const REGISTER_COUNT: usize = 0x100;

/// Start a simulated sensor and return the link to talk to it.
///
/// The feeder stops once the link is closed.
pub fn start() -> std::io::Result<MemoryLink> {
    let link = MemoryLink::with_responder(RegisterFile::new().into_responder());

    let feeder = link.clone();
    thread::Builder::new()
        .name("witlink-sim".to_string())
        .spawn(move || {
            let mut tick = 0u32;
            while feeder.is_open() {
                for packet in telemetry(tick) {
                    feeder.inject(packet.as_bytes());
                }
                tick = tick.wrapping_add(1);
                thread::sleep(PERIOD);
            }
            debug!(ticks = tick, "simulated sensor stopped");
        })?;

    Ok(link)
}

struct RegisterFile {
    values: Vec<u16>,
}

impl RegisterFile {
    fn new() -> Self {
        let mut values = vec![0u16; REGISTER_COUNT];
        values[usize::from(reg::RSW)] = 0x001E;
        values[usize::from(reg::RRATE)] = 0x0006;
        values[usize::from(reg::BAUD)] = 0x0006;
        Self { values }
    }

    fn get(&self, addr: u16) -> u16 {
        self.values.get(usize::from(addr)).copied().unwrap_or(0)
    }

    fn handle(&mut self, cmd: &[u8]) -> Vec<u8> {
        if cmd.len() != 5 || cmd[..2] != HEADER {
            return Vec::new();
        }
        let register = u16::from(cmd[2]);
        let value = u16::from_le_bytes([cmd[3], cmd[4]]);

        if register == reg::READ_ADDR {
            let mut payload = [0u8; PAYLOAD_SIZE];
            for (i, chunk) in payload.chunks_exact_mut(2).enumerate() {
                let addr = value.wrapping_add(i as u16);
                chunk.copy_from_slice(&self.get(addr).to_le_bytes());
            }
            return Packet::new(kind::REGISTER_VALUES, payload).as_bytes().to_vec();
        }

        if register != reg::KEY {
            self.values[usize::from(register)] = value;
        }
        Vec::new()
    }

    fn into_responder(mut self) -> impl FnMut(&[u8]) -> Vec<u8> + Send + 'static {
        move |cmd: &[u8]| self.handle(cmd)
    }
}

/// One burst of telemetry for `tick`: the sensor slowly yaws in place.
pub fn telemetry(tick: u32) -> Vec<Packet> {
    let yaw = f64::from(tick % 360) - 180.0;
    let half = yaw.to_radians() / 2.0;
    let ms = (tick % 50) * 20;
    let second = (tick / 50) % 60;

    vec![
        Packet::new(
            kind::CHIP_TIME,
            [24, 6, 1, 12, 30, second as u8, ms as u8, (ms >> 8) as u8],
        ),
        Packet::new(kind::ACCELERATION, words([0, 0, scaled(1.0, 16.0), 2531])),
        Packet::new(kind::GYRO, words([0, 0, scaled(50.0, 2000.0), 0])),
        Packet::new(kind::ANGLE, words([0, 0, scaled(yaw, 180.0), 0])),
        Packet::new(
            kind::MAGNETIC,
            words([
                (300.0 * half.cos()) as i16 as u16,
                (300.0 * half.sin()) as i16 as u16,
                (-120i16) as u16,
                0,
            ]),
        ),
        Packet::new(kind::LON_LAT, dwords([1_133_012_345, 223_654_321])),
        Packet::new(kind::GPS, gps(12.3, yaw, 1.5)),
        Packet::new(
            kind::QUATERNION,
            words([unit(half.cos()), 0, 0, unit(half.sin())]),
        ),
    ]
}

/// Inverse of the folded scaling applied by the decoder.
fn scaled(value: f64, range: f64) -> u16 {
    let raw = (value / range * 32768.0).round();
    (raw.clamp(-32768.0, 32767.0) as i16) as u16
}

fn unit(value: f64) -> u16 {
    scaled(value, 1.0)
}

/// Height in metres, heading in degrees, speed in km/h.
fn gps(height: f64, yaw: f64, speed: f64) -> [u8; PAYLOAD_SIZE] {
    let mut payload = words([
        (height * 10.0).round() as i16 as u16,
        (yaw * 100.0).round() as i16 as u16,
        0,
        0,
    ]);
    payload[4..8].copy_from_slice(&((speed * 1000.0).round() as u32).to_le_bytes());
    payload
}

fn words(values: [u16; 4]) -> [u8; PAYLOAD_SIZE] {
    let mut payload = [0u8; PAYLOAD_SIZE];
    for (chunk, value) in payload.chunks_exact_mut(2).zip(values) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    payload
}

fn dwords(values: [u32; 2]) -> [u8; PAYLOAD_SIZE] {
    let mut payload = [0u8; PAYLOAD_SIZE];
    for (chunk, value) in payload.chunks_exact_mut(4).zip(values) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    payload
}
