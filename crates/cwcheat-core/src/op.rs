use crate::code::{CheatCode, CheatLine, CodeFormat};

/// Start of user RAM in the guest address space. Code addresses are offsets
/// from here.
pub const USER_MEMORY_BASE: u32 = 0x0880_0000;

/// Maps a 28-bit code offset to a guest address.
#[inline]
pub fn guest_address(value: u32) -> u32 {
    ((value & 0x0FFF_FFFF).wrapping_add(USER_MEMORY_BASE)) & 0x3FFF_FFFF
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    Byte,
    Half,
    Word,
}

impl Width {
    pub const fn bytes(self) -> u32 {
        match self {
            Width::Byte => 1,
            Width::Half => 2,
            Width::Word => 4,
        }
    }

    pub const fn mask(self) -> u32 {
        match self {
            Width::Byte => 0xFF,
            Width::Half => 0xFFFF,
            Width::Word => 0xFFFF_FFFF,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryOp {
    Add,
    Subtract,
    Or,
    And,
    Xor,
}

impl MemoryOp {
    pub fn apply(self, a: u32, b: u32) -> u32 {
        match self {
            MemoryOp::Add => a.wrapping_add(b),
            MemoryOp::Subtract => a.wrapping_sub(b),
            MemoryOp::Or => a | b,
            MemoryOp::And => a & b,
            MemoryOp::Xor => a ^ b,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Equal,
    NotEqual,
    Less,
    Greater,
}

impl Condition {
    fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0x0 => Some(Condition::Equal),
            0x1 => Some(Condition::NotEqual),
            0x2 => Some(Condition::Less),
            0x3 => Some(Condition::Greater),
            _ => None,
        }
    }

    /// Memory operands are compared as signed words.
    pub fn test(self, a: i32, b: i32) -> bool {
        match self {
            Condition::Equal => a == b,
            Condition::NotEqual => a != b,
            Condition::Less => a < b,
            Condition::Greater => a > b,
        }
    }
}

/// Final store performed by a pointer block, selected by the header's type
/// nibble.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerWrite {
    pub width: Width,
    /// Write at `base - offset` instead of `base + offset`.
    pub reverse: bool,
}

impl PointerWrite {
    fn from_type(ty: u32) -> Option<Self> {
        let (width, reverse) = match ty {
            0 => (Width::Byte, false),
            1 => (Width::Half, false),
            2 => (Width::Word, false),
            3 => (Width::Byte, true),
            4 => (Width::Half, true),
            5 => (Width::Word, true),
            _ => return None,
        };
        Some(Self { width, reverse })
    }
}

/// Value format for a shader uniform loaded from guest memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformFormat {
    U8,
    U16,
    U32,
    F32,
    Unknown(u8),
}

impl UniformFormat {
    fn from_bits(bits: u8) -> Self {
        match bits {
            0 => UniformFormat::U8,
            1 => UniformFormat::U16,
            2 => UniformFormat::U32,
            3 => UniformFormat::F32,
            other => UniformFormat::Unknown(other),
        }
    }

    /// Converts a raw guest word, `None` for unknown formats.
    pub fn convert(self, raw: u32) -> Option<f32> {
        match self {
            UniformFormat::U8 => Some((raw & 0xFF) as f32),
            UniformFormat::U16 => Some((raw & 0xFFFF) as f32),
            UniformFormat::U32 => Some(raw as f32),
            UniformFormat::F32 => Some(f32::from_bits(raw)),
            UniformFormat::Unknown(_) => None,
        }
    }
}

/// One decoded cheat instruction.
///
/// Produced by [`decode_next`] and consumed right away by
/// [`crate::execute::execute`]. Pointer blocks borrow their sub-records from
/// the code they were decoded from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CheatOp<'a> {
    /// Unknown or truncated instruction. Aborts the rest of the code.
    Invalid,
    Write {
        addr: u32,
        width: Width,
        value: u32,
    },
    Modify {
        op: MemoryOp,
        addr: u32,
        width: Width,
        value: u32,
    },
    MultiWrite {
        addr: u32,
        width: Width,
        value: u32,
        count: u32,
        step: u32,
        add: u32,
    },
    CopyBytesFrom {
        src: u32,
        dst: u32,
        len: u32,
    },
    Vibration {
        left: u16,
        right: u16,
        left_time: u8,
        right_time: u8,
    },
    VibrationFromMemory {
        addr: u32,
    },
    PostShader {
        shader: u8,
        uniform: u8,
        value: f32,
    },
    PostShaderFromMemory {
        addr: u32,
        shader: u8,
        uniform: u8,
        format: UniformFormat,
    },
    /// Reserved, does nothing.
    Delay {
        value: u32,
    },
    /// 32-bit code stopper: ends the code for this pass on mismatch.
    Assert {
        addr: u32,
        value: u32,
    },
    If {
        cond: Condition,
        addr: u32,
        width: Width,
        value: u32,
        skip: u32,
    },
    IfAddr {
        cond: Condition,
        addr: u32,
        compare_addr: u32,
        /// Operand size in bytes; only 1, 2 and 4 read real values.
        size: u32,
        skip: u32,
    },
    IfPressed {
        mask: u32,
        pressed: bool,
        skip: u32,
    },
    Pointer {
        addr: u32,
        value: u32,
        offset: i32,
        base_offset: i32,
        write: Option<PointerWrite>,
        lines: &'a [CheatLine],
    },
}

/// Decodes the instruction at `*i`, advancing `*i` past every record it
/// consumed (always at least one).
pub fn decode_next<'a>(code: &'a CheatCode, i: &mut usize) -> CheatOp<'a> {
    let op = match code.format {
        CodeFormat::CwCheat => decode_cwcheat(code, i),
        CodeFormat::TempAr => decode_tempar(code, i),
        CodeFormat::Undefined => {
            *i += 1;
            CheatOp::Invalid
        }
    };
    #[cfg(feature = "op-trace")]
    log::trace!("cheat op @{}: {op:?}", *i);
    op
}

fn decode_tempar<'a>(_code: &'a CheatCode, i: &mut usize) -> CheatOp<'a> {
    // TODO: decode the TempAR (`_M`) instruction set; such codes abort for now.
    *i += 1;
    CheatOp::Invalid
}

fn next_line(code: &CheatCode, i: &mut usize) -> Option<CheatLine> {
    let line = code.lines.get(*i).copied()?;
    *i += 1;
    Some(line)
}

fn decode_cwcheat<'a>(code: &'a CheatCode, i: &mut usize) -> CheatOp<'a> {
    let Some(line1) = next_line(code, i) else {
        *i += 1;
        return CheatOp::Invalid;
    };
    let arg = line1.part2;

    match line1.part1 >> 28 {
        // 8-bit write, widened to fit the value.
        0x0 => {
            let width = if arg & 0xFFFF_0000 != 0 {
                Width::Word
            } else if arg & 0x0000_FF00 != 0 {
                Width::Half
            } else {
                Width::Byte
            };
            CheatOp::Write {
                addr: guest_address(line1.part1),
                width,
                value: arg,
            }
        }
        0x1 => CheatOp::Write {
            addr: guest_address(line1.part1),
            width: Width::Half,
            value: arg,
        },
        0x2 => CheatOp::Write {
            addr: guest_address(line1.part1),
            width: Width::Word,
            value: arg,
        },

        // Increment/decrement.
        0x3 => {
            let addr = guest_address(arg);
            let selector = (line1.part1 >> 20) & 0xF;
            let (op, width, value) = match selector {
                1 => (MemoryOp::Add, Width::Byte, line1.part1 & 0xFF),
                2 => (MemoryOp::Subtract, Width::Byte, line1.part1 & 0xFF),
                3 => (MemoryOp::Add, Width::Half, line1.part1 & 0xFFFF),
                4 => (MemoryOp::Subtract, Width::Half, line1.part1 & 0xFFFF),
                5 | 6 => {
                    let Some(line2) = next_line(code, i) else {
                        return CheatOp::Invalid;
                    };
                    let op = if selector == 5 {
                        MemoryOp::Add
                    } else {
                        MemoryOp::Subtract
                    };
                    (op, Width::Word, line2.part1)
                }
                _ => return CheatOp::Invalid,
            };
            CheatOp::Modify {
                op,
                addr,
                width,
                value,
            }
        }

        // 32-bit multi-write.
        0x4 => {
            let Some(line2) = next_line(code, i) else {
                return CheatOp::Invalid;
            };
            CheatOp::MultiWrite {
                addr: guest_address(line1.part1),
                width: Width::Word,
                value: line2.part1,
                count: arg >> 16,
                step: (arg & 0xFFFF) * 4,
                add: line2.part2,
            }
        }

        // Memcpy.
        0x5 => {
            let Some(line2) = next_line(code, i) else {
                return CheatOp::Invalid;
            };
            CheatOp::CopyBytesFrom {
                src: guest_address(line1.part1),
                dst: guest_address(line2.part1),
                len: arg,
            }
        }

        // Pointer commands.
        0x6 => {
            let Some(line2) = next_line(code, i) else {
                return CheatOp::Invalid;
            };
            // The header counts itself.
            let count = (line2.part1 & 0xFFFF).saturating_sub(1) as usize;
            let start = *i;
            let Some(lines) = code.lines.get(start..start + count) else {
                return CheatOp::Invalid;
            };
            *i += count;

            CheatOp::Pointer {
                addr: guest_address(line1.part1),
                value: arg,
                offset: line2.part2 as i32,
                // Sign-extending shift of the top 12 bits.
                base_offset: ((line2.part1 as i32) >> 20).wrapping_mul(4),
                write: PointerWrite::from_type((line2.part1 >> 16) & 0xF),
                lines,
            }
        }

        // Boolean operations.
        0x7 => {
            let (op, width) = match arg >> 16 {
                0x0000 => (MemoryOp::Or, Width::Byte),
                0x0001 => (MemoryOp::Or, Width::Half),
                0x0002 => (MemoryOp::And, Width::Byte),
                0x0003 => (MemoryOp::And, Width::Half),
                0x0004 => (MemoryOp::Xor, Width::Byte),
                0x0005 => (MemoryOp::Xor, Width::Half),
                _ => return CheatOp::Invalid,
            };
            CheatOp::Modify {
                op,
                addr: guest_address(line1.part1),
                width,
                value: arg & width.mask(),
            }
        }

        // 8/16-bit multi-write.
        0x8 => {
            let Some(line2) = next_line(code, i) else {
                return CheatOp::Invalid;
            };
            let width = if line2.part1 & 0xFFFF_0000 == 0 {
                Width::Byte
            } else {
                Width::Half
            };
            CheatOp::MultiWrite {
                addr: guest_address(line1.part1),
                width,
                value: line2.part1 & width.mask(),
                count: arg >> 16,
                step: (arg & 0xFFFF) * width.bytes(),
                add: line2.part2,
            }
        }

        // Emulator-side effects.
        0xA => match (line1.part1 >> 24) & 0xF {
            0x0 => CheatOp::Vibration {
                left: (line1.part1 & 0xFFFF) as u16,
                right: (arg & 0xFFFF) as u16,
                left_time: (line1.part1 >> 16) as u8,
                right_time: (arg >> 16) as u8,
            },
            0x1 => CheatOp::VibrationFromMemory { addr: arg },
            0x2 => CheatOp::PostShader {
                shader: (line1.part1 >> 16) as u8,
                uniform: line1.part1 as u8,
                value: f32::from_bits(arg),
            },
            0x3 => CheatOp::PostShaderFromMemory {
                addr: arg,
                shader: (line1.part1 >> 16) as u8,
                uniform: line1.part1 as u8,
                format: UniformFormat::from_bits((line1.part1 >> 8) as u8),
            },
            _ => CheatOp::Invalid,
        },

        0xB => CheatOp::Delay { value: arg },

        0xC => CheatOp::Assert {
            addr: guest_address(line1.part1),
            value: arg,
        },

        // Line skip tests and joker codes.
        0xD => match arg >> 28 {
            0x0 | 0x2 => {
                let width = if arg >> 28 == 0x2 {
                    Width::Byte
                } else {
                    Width::Half
                };
                let Some(cond) = Condition::from_bits((arg >> 20) & 0xF) else {
                    return CheatOp::Invalid;
                };
                CheatOp::If {
                    cond,
                    addr: guest_address(line1.part1),
                    width,
                    value: arg & width.mask(),
                    skip: 1,
                }
            }
            0x1 | 0x3 => CheatOp::IfPressed {
                mask: arg & 0x0FFF_FFFF,
                pressed: arg >> 28 == 0x1,
                skip: (line1.part1 & 0xFF) + 1,
            },
            0x4..=0x7 => {
                let Some(line2) = next_line(code, i) else {
                    return CheatOp::Invalid;
                };
                let Some(cond) = Condition::from_bits((arg >> 28) - 0x4) else {
                    return CheatOp::Invalid;
                };
                CheatOp::IfAddr {
                    cond,
                    addr: guest_address(line1.part1),
                    compare_addr: guest_address(arg),
                    size: 1 << (line2.part2 & 0xF),
                    skip: line2.part1,
                }
            }
            _ => CheatOp::Invalid,
        },

        // Multi-line skip tests.
        0xE => {
            let byte = line1.part1 >> 24 == 0xE1;
            let (width, skip_mask) = if byte {
                (Width::Byte, 0xFF)
            } else {
                (Width::Half, 0xFFF)
            };
            let Some(cond) = Condition::from_bits(arg >> 28) else {
                return CheatOp::Invalid;
            };
            CheatOp::If {
                cond,
                addr: guest_address(arg),
                width,
                value: line1.part1 & width.mask(),
                skip: (line1.part1 >> 16) & skip_mask,
            }
        }

        _ => CheatOp::Invalid,
    }
}
