use derive_more::Display;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, EnumIter)]
pub enum Register {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

// Keyed by the lowercased register name.
static REGISTERS: Lazy<HashMap<String, Register>> = Lazy::new(|| {
    Register::iter()
        .map(|reg| (reg.to_string().to_lowercase(), reg))
        .collect()
});

impl Register {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Register> {
        Register::from_usize(index)
    }

    /// Looks up a register by name, ignoring case.
    pub fn by_name(name: &str) -> Option<Register> {
        REGISTERS.get(&name.to_lowercase()).copied()
    }
}

/// Returns the register index named by `name`, if any.
pub fn register_index(name: &str) -> Option<usize> {
    Register::by_name(name).map(Register::index)
}

#[cfg(test)]
mod tests {
    use super::{register_index, Register};

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(register_index("r0"), Some(0));
        assert_eq!(register_index("R7"), Some(7));
        assert_eq!(register_index("r15"), Some(15));
    }

    #[test]
    fn lookup_rejects_non_registers() {
        assert_eq!(register_index("r16"), None);
        assert_eq!(register_index("sp"), None);
        assert_eq!(register_index("rr0"), None);
        assert_eq!(register_index(""), None);
    }

    #[test]
    fn index_round_trip() {
        assert_eq!(Register::from_index(12), Some(Register::R12));
        assert_eq!(Register::from_index(16), None);
    }
}
