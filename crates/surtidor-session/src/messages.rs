//! User-facing display strings.
//!
//! These are the literal texts the front panel shows; downstream test rigs
//! match on them, so changing one is a breaking change.

pub const MSG_TIMEOUT: &str = "Timeout";
pub const MSG_PIN_MISMATCH: &str = "DNI-OK-PIN-NO";
pub const MSG_NOT_FOUND: &str = "USUARIO NO ENCONTRADO";
pub const MSG_DNI_FORMAT: &str = "DNI debe tener 8 digitos.";
pub const MSG_PIN_FORMAT: &str = "PIN debe tener 4 digitos.";
pub const MSG_DISPENSE_DONE: &str = "Extraccion completada";
pub const MSG_DISPENSE_MAX: &str = "Tiempo maximo alcanzado";
