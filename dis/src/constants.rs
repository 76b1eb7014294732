// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

/// Magic number of an unsigned module.
pub const XMAGIC: i32 = 819248;

/// Magic number of a signed module.
pub const SMAGIC: i32 = 923426;

/// Bytes per machine word.
pub const IBY2WD: i32 = 8;

pub const REGLINK: i32 = 0;
pub const REGFRAME: i32 = 1;
pub const REGMOD: i32 = 2;
pub const REGTYP: i32 = 3;
pub const REGRET: i32 = 4;
pub const NREG: i32 = 5;

/// Size of the fixed frame header: the registers plus three scratch temporaries.
/// User slots of a frame start here.
pub const MAX_TEMP: i32 = (NREG + 3) * IBY2WD;

/// Byte offset of the return-value pointer inside a callee frame.
pub const REGRET_OFFSET: i32 = REGRET * IBY2WD;

pub const DEFAULT_STACK_SIZE: i32 = 64 * 1024;

/// Data items with a count at or above this value store the count as a separate operand.
pub const DMAX: i32 = 1 << 4;

/// Smallest value the variable-length operand encoding can represent.
pub const OPERAND_MIN: i32 = -(1 << 29);

/// Largest value the variable-length operand encoding can represent.
pub const OPERAND_MAX: i32 = (1 << 29) - 1;
