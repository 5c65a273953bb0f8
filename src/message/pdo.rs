//! Power data objects (PDOs), advertised in a capability list.
//!
//! See [6.4.1].
use proc_bitfield::bitfield;
use uom::si::electric_current::centiampere;

use super::_50millivolts_mod::_50millivolts;
use super::_250milliwatts_mod::_250milliwatts;
use super::units::{ElectricCurrent, ElectricPotential, Power};

/// Supply type of a PDO, encoded in its two topmost bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Kind {
    /// Fixed voltage supply.
    FixedSupply,
    /// Battery supply.
    Battery,
    /// Variable supply (non-battery).
    VariableSupply,
    /// Augmented PDO, not supported by this emulator.
    Augmented,
}

impl From<u8> for Kind {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::FixedSupply,
            0b01 => Self::Battery,
            0b10 => Self::VariableSupply,
            _ => Self::Augmented,
        }
    }
}

bitfield! {
    /// View of a PDO that only decodes the supply type.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct RawPowerDataObject(pub u32): Debug, FromStorage, IntoStorage {
        /// Supply type.
        pub kind: u8 [get Kind] @ 30..=31,
    }
}

bitfield! {
    /// Fixed supply PDO.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct FixedSupply(pub u32): Debug, FromStorage, IntoStorage {
        /// Fixed supply (0b00).
        pub kind: u8 @ 30..=31,
        /// Dual-role power.
        pub dual_role_power: bool @ 29,
        /// USB suspend supported.
        pub usb_suspend_supported: bool @ 28,
        /// Unconstrained power.
        pub unconstrained_power: bool @ 27,
        /// USB communications capable.
        pub usb_communications_capable: bool @ 26,
        /// Dual-role data.
        pub dual_role_data: bool @ 25,
        /// Voltage in 50 mV units.
        pub raw_voltage: u16 @ 10..=19,
        /// Maximum current in 10 mA units.
        pub raw_max_current: u16 @ 0..=9,
    }
}

impl FixedSupply {
    /// Create a fixed supply PDO from a voltage in mV and a current in mA.
    pub fn new(voltage_mv: u32, max_current_ma: u32) -> Self {
        Self(0)
            .with_raw_voltage((voltage_mv / 50) as u16)
            .with_raw_max_current((max_current_ma / 10) as u16)
    }

    /// Supply voltage.
    pub fn voltage(&self) -> ElectricPotential {
        ElectricPotential::new::<_50millivolts>(self.raw_voltage().into())
    }

    /// Supply voltage in millivolts.
    pub fn voltage_mv(&self) -> u32 {
        u32::from(self.raw_voltage()) * 50
    }

    /// Maximum supply current.
    pub fn max_current(&self) -> ElectricCurrent {
        ElectricCurrent::new::<centiampere>(self.raw_max_current().into())
    }
}

bitfield! {
    /// Battery supply PDO.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Battery(pub u32): Debug, FromStorage, IntoStorage {
        /// Battery (0b01).
        pub kind: u8 @ 30..=31,
        /// Maximum voltage in 50 mV units.
        pub raw_max_voltage: u16 @ 20..=29,
        /// Minimum voltage in 50 mV units.
        pub raw_min_voltage: u16 @ 10..=19,
        /// Maximum allowable power in 250 mW units.
        pub raw_max_power: u16 @ 0..=9,
    }
}

impl Battery {
    /// Create a battery PDO from voltages in mV and a power in mW.
    pub fn new(min_voltage_mv: u32, max_voltage_mv: u32, max_power_mw: u32) -> Self {
        Self(0)
            .with_kind(0b01)
            .with_raw_min_voltage((min_voltage_mv / 50) as u16)
            .with_raw_max_voltage((max_voltage_mv / 50) as u16)
            .with_raw_max_power((max_power_mw / 250) as u16)
    }

    /// Maximum supply voltage.
    pub fn max_voltage(&self) -> ElectricPotential {
        ElectricPotential::new::<_50millivolts>(self.raw_max_voltage().into())
    }

    /// Minimum supply voltage.
    pub fn min_voltage(&self) -> ElectricPotential {
        ElectricPotential::new::<_50millivolts>(self.raw_min_voltage().into())
    }

    /// Maximum allowable power.
    pub fn max_power(&self) -> Power {
        Power::new::<_250milliwatts>(self.raw_max_power().into())
    }
}

bitfield! {
    /// Variable supply (non-battery) PDO.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct VariableSupply(pub u32): Debug, FromStorage, IntoStorage {
        /// Variable supply (0b10).
        pub kind: u8 @ 30..=31,
        /// Maximum voltage in 50 mV units.
        pub raw_max_voltage: u16 @ 20..=29,
        /// Minimum voltage in 50 mV units.
        pub raw_min_voltage: u16 @ 10..=19,
        /// Maximum current in 10 mA units.
        pub raw_max_current: u16 @ 0..=9,
    }
}

impl VariableSupply {
    /// Create a variable supply PDO from voltages in mV and a current in mA.
    pub fn new(min_voltage_mv: u32, max_voltage_mv: u32, max_current_ma: u32) -> Self {
        Self(0)
            .with_kind(0b10)
            .with_raw_min_voltage((min_voltage_mv / 50) as u16)
            .with_raw_max_voltage((max_voltage_mv / 50) as u16)
            .with_raw_max_current((max_current_ma / 10) as u16)
    }

    /// Maximum supply voltage.
    pub fn max_voltage(&self) -> ElectricPotential {
        ElectricPotential::new::<_50millivolts>(self.raw_max_voltage().into())
    }

    /// Minimum supply voltage.
    pub fn min_voltage(&self) -> ElectricPotential {
        ElectricPotential::new::<_50millivolts>(self.raw_min_voltage().into())
    }

    /// Maximum supply current.
    pub fn max_current(&self) -> ElectricCurrent {
        ElectricCurrent::new::<centiampere>(self.raw_max_current().into())
    }
}
