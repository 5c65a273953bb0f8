//! Validation of an advertised source capability list.
//!
//! The PD specification requires capability lists to be monotonically
//! structured, so a policy engine can short-circuit its scan. The check
//! exists to catch malformed test fixtures before they corrupt a run.

use crate::message::MAX_DATA_OBJECTS;
use crate::message::pdo::{Battery, FixedSupply, Kind, RawPowerDataObject, VariableSupply};

/// Fixed supply flags that only the first PDO may carry: dual-role
/// power, unconstrained power, USB communications capable, dual-role
/// data.
const FIRST_PDO_FLAGS_MASK: u32 = (1 << 29) | (1 << 27) | (1 << 26) | (1 << 25);

/// vSafe5V in millivolts, required of the first PDO.
const VSAFE_5V_MV: u32 = 5000;

/// Result of checking a PDO list against the PD ordering rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PdoCheckResult {
    /// The list is well-formed.
    Ok,
    /// The first PDO is not a fixed supply at 5 V.
    FirstPdoNotFixed5V,
    /// A fixed supply voltage occurs more than once.
    FixedVoltRepeated,
    /// Fixed supply voltages are not in increasing order.
    FixedVoltNotInOrder,
    /// A fixed PDO other than the first carries first-PDO flags.
    NonFirstPdoFixedFlags,
    /// A battery voltage range occurs more than once.
    BattVoltRepeated,
    /// Battery voltage ranges are not in order.
    BattVoltNotInOrder,
    /// A variable supply voltage range occurs more than once.
    VarVoltRepeated,
    /// Variable supply voltage ranges are not in order.
    VarVoltNotInOrder,
    /// A non-zero PDO follows the first zero entry.
    PdoAfterZero,
}

fn kind_at(pdos: &[u32; MAX_DATA_OBJECTS], index: usize) -> Kind {
    RawPowerDataObject(pdos[index]).kind()
}

/// Check a zero-terminated PDO list against the PD ordering rules.
///
/// The rules are applied in a fixed order: a fixed 5 V entry first, then
/// the remaining fixed supplies with strictly increasing voltage and no
/// first-PDO flags, then battery supplies ordered by (min, max) voltage,
/// then variable supplies ordered the same way, then zero padding only.
/// The input is never mutated; re-checking a list is deterministic.
pub fn check_pdos(pdos: &[u32; MAX_DATA_OBJECTS]) -> PdoCheckResult {
    // The first PDO must be a fixed supply at exactly 5 V.
    if kind_at(pdos, 0) != Kind::FixedSupply || FixedSupply(pdos[0]).voltage_mv() != VSAFE_5V_MV {
        return PdoCheckResult::FirstPdoNotFixed5V;
    }

    let mut index = 1;

    // Fixed supplies follow directly, with strictly increasing voltage.
    let mut prev_voltage: Option<u16> = None;
    while index < MAX_DATA_OBJECTS && pdos[index] != 0 && kind_at(pdos, index) == Kind::FixedSupply {
        let pdo = FixedSupply(pdos[index]);
        let voltage = pdo.raw_voltage();

        if Some(voltage) == prev_voltage || pdo.voltage_mv() == VSAFE_5V_MV {
            return PdoCheckResult::FixedVoltRepeated;
        }
        if prev_voltage.is_some_and(|prev| voltage < prev) {
            return PdoCheckResult::FixedVoltNotInOrder;
        }
        if pdos[index] & FIRST_PDO_FLAGS_MASK != 0 {
            return PdoCheckResult::NonFirstPdoFixedFlags;
        }

        prev_voltage = Some(voltage);
        index += 1;
    }

    // Battery supplies, ordered by (min, max) voltage.
    let mut prev_range: Option<(u16, u16)> = None;
    while index < MAX_DATA_OBJECTS && pdos[index] != 0 && kind_at(pdos, index) == Kind::Battery {
        let pdo = Battery(pdos[index]);
        let range = (pdo.raw_min_voltage(), pdo.raw_max_voltage());

        if Some(range) == prev_range {
            return PdoCheckResult::BattVoltRepeated;
        }
        if prev_range.is_some_and(|prev| range < prev) {
            return PdoCheckResult::BattVoltNotInOrder;
        }

        prev_range = Some(range);
        index += 1;
    }

    // Variable supplies last, with the same ordering rule.
    let mut prev_range: Option<(u16, u16)> = None;
    while index < MAX_DATA_OBJECTS && pdos[index] != 0 && kind_at(pdos, index) == Kind::VariableSupply {
        let pdo = VariableSupply(pdos[index]);
        let range = (pdo.raw_min_voltage(), pdo.raw_max_voltage());

        if Some(range) == prev_range {
            return PdoCheckResult::VarVoltRepeated;
        }
        if prev_range.is_some_and(|prev| range < prev) {
            return PdoCheckResult::VarVoltNotInOrder;
        }

        prev_range = Some(range);
        index += 1;
    }

    // Everything after the blocks above must be zero padding.
    if pdos[index..].iter().any(|&pdo| pdo != 0) {
        return PdoCheckResult::PdoAfterZero;
    }

    PdoCheckResult::Ok
}
