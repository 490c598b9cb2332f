//! Signal state management
//!
//! Holds the value of every port on the DUT boundary. Values are stored
//! little-endian and truncated to the declared width on every write.

use crate::simulator::{PortDirection, PortSpec, SimulationError, SimulationResult};
use indexmap::{IndexMap, IndexSet};

/// A fixed-width bit vector on the DUT boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub width: usize,
    pub direction: PortDirection,
    value: Vec<u8>,
}

impl Signal {
    pub fn new(width: usize, direction: PortDirection) -> Self {
        Signal {
            width,
            direction,
            value: vec![0; width.div_ceil(8)],
        }
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn as_u128(&self) -> u128 {
        bytes_to_u128(&self.value)
    }

    pub fn is_high(&self) -> bool {
        self.value.first().is_some_and(|b| b & 1 == 1)
    }
}

/// Resize a little-endian value to the byte size of `width_bits` and mask
/// off the bits above the width
pub fn truncate_to_width(value: &[u8], width_bits: usize) -> Vec<u8> {
    let byte_size = width_bits.div_ceil(8);
    let mut result = value.to_vec();
    result.resize(byte_size, 0);

    let excess_bits = byte_size * 8 - width_bits;
    if excess_bits > 0 {
        if let Some(last) = result.last_mut() {
            *last &= (1u8 << (8 - excess_bits)) - 1;
        }
    }

    result
}

/// Little-endian bytes to u128; bytes past the 16th are ignored
pub fn bytes_to_u128(bytes: &[u8]) -> u128 {
    let mut buf = [0u8; 16];
    let len = bytes.len().min(16);
    buf[..len].copy_from_slice(&bytes[..len]);
    u128::from_le_bytes(buf)
}

/// All signals of one simulated design, in port declaration order
#[derive(Debug, Clone, Default)]
pub struct SignalState {
    signals: IndexMap<String, Signal>,
    changed_signals: IndexSet<String>,
}

impl SignalState {
    pub fn from_ports(ports: &[PortSpec]) -> SimulationResult<Self> {
        let mut signals = IndexMap::with_capacity(ports.len());
        for port in ports {
            if port.width == 0 {
                return Err(SimulationError::InvalidInput(format!(
                    "port '{}' has zero width",
                    port.name
                )));
            }
            let signal = Signal::new(port.width, port.direction);
            let previous = signals.insert(port.name.clone(), signal);
            if previous.is_some() {
                return Err(SimulationError::InvalidInput(format!(
                    "port '{}' declared twice",
                    port.name
                )));
            }
        }

        Ok(SignalState {
            signals,
            changed_signals: IndexSet::new(),
        })
    }

    pub fn signal(&self, name: &str) -> SimulationResult<&Signal> {
        self.signals
            .get(name)
            .ok_or_else(|| SimulationError::UnknownSignal(name.to_string()))
    }

    pub fn get(&self, name: &str) -> SimulationResult<&[u8]> {
        self.signal(name).map(Signal::value)
    }

    pub fn get_u128(&self, name: &str) -> SimulationResult<u128> {
        self.signal(name).map(Signal::as_u128)
    }

    pub fn get_u64(&self, name: &str) -> SimulationResult<u64> {
        self.get_u128(name).map(|v| v as u64)
    }

    pub fn is_high(&self, name: &str) -> SimulationResult<bool> {
        self.signal(name).map(Signal::is_high)
    }

    /// Drive a signal regardless of direction. Returns whether the value
    /// changed.
    pub fn drive(&mut self, name: &str, value: &[u8]) -> SimulationResult<bool> {
        let signal = self
            .signals
            .get_mut(name)
            .ok_or_else(|| SimulationError::UnknownSignal(name.to_string()))?;

        let value = truncate_to_width(value, signal.width);
        if signal.value == value {
            return Ok(false);
        }

        signal.value = value;
        self.changed_signals.insert(name.to_string());
        Ok(true)
    }

    pub fn drive_u128(&mut self, name: &str, value: u128) -> SimulationResult<bool> {
        self.drive(name, &value.to_le_bytes())
    }

    pub fn drive_bool(&mut self, name: &str, value: bool) -> SimulationResult<bool> {
        self.drive(name, &[value as u8])
    }

    /// Check if signal has changed since the last advance
    pub fn has_signal_changed(&self, name: &str) -> bool {
        self.changed_signals.contains(name)
    }

    pub fn clear_changed_signals(&mut self) {
        self.changed_signals.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Signal)> {
        self.signals.iter()
    }

    pub fn snapshot(&self) -> IndexMap<String, Vec<u8>> {
        self.signals
            .iter()
            .map(|(name, signal)| (name.clone(), signal.value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SignalState {
        SignalState::from_ports(&[
            PortSpec::input("a", 3),
            PortSpec::input("wide", 128),
            PortSpec::output("y", 1),
        ])
        .unwrap()
    }

    #[test]
    fn test_truncate_masks_excess_bits() {
        assert_eq!(truncate_to_width(&[0xFF], 3), vec![0x07]);
        assert_eq!(truncate_to_width(&[0xFF, 0xFF, 0xFF], 12), vec![0xFF, 0x0F]);
        assert_eq!(truncate_to_width(&[0x01], 16), vec![0x01, 0x00]);
    }

    #[test]
    fn test_drive_tracks_changes() {
        let mut s = state();
        assert!(s.drive("a", &[0xFF]).unwrap());
        assert_eq!(s.get_u128("a").unwrap(), 7);
        assert!(s.has_signal_changed("a"));

        s.clear_changed_signals();
        assert!(!s.drive("a", &[0x07]).unwrap());
        assert!(!s.has_signal_changed("a"));
    }

    #[test]
    fn test_wide_signal_round_trips_top_bit() {
        let mut s = state();
        s.drive_u128("wide", 1u128 << 127).unwrap();
        assert_eq!(s.get_u128("wide").unwrap(), 1u128 << 127);
        assert_eq!(s.get("wide").unwrap().len(), 16);
    }

    #[test]
    fn test_duplicate_and_unknown_ports() {
        let err = SignalState::from_ports(&[PortSpec::input("a", 1), PortSpec::output("a", 1)])
            .unwrap_err();
        assert!(matches!(err, SimulationError::InvalidInput(_)));

        let s = state();
        assert!(matches!(s.get("missing"), Err(SimulationError::UnknownSignal(_))));
    }
}
