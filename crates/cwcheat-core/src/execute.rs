use log::trace;

use crate::code::{CheatCode, CheatLine};
use crate::host::{CheatHost, GuestMemory, InstructionCache};
use crate::op::{CheatOp, PointerWrite, Width};

/// Invalidates the guest's cached code over `addr..addr + size`, widened to
/// whole words.
pub fn invalidate_icache<H: InstructionCache + ?Sized>(host: &mut H, addr: u32, size: u32) {
    let aligned = addr & !3;
    let aligned_size = addr
        .wrapping_add(size)
        .wrapping_sub(aligned)
        .wrapping_add(3)
        & !3;
    host.invalidate_range(aligned, aligned_size);
}

fn read<H: GuestMemory + ?Sized>(host: &H, addr: u32, width: Width) -> u32 {
    match width {
        Width::Byte => host.read_u8(addr) as u32,
        Width::Half => host.read_u16(addr) as u32,
        Width::Word => host.read_u32(addr),
    }
}

fn write<H: GuestMemory + ?Sized>(host: &mut H, addr: u32, width: Width, value: u32) {
    match width {
        Width::Byte => host.write_u8(addr, value as u8),
        Width::Half => host.write_u16(addr, value as u16),
        Width::Word => host.write_u32(addr, value),
    }
}

/// Reads a compare operand of arbitrary byte size. Sizes other than 1, 2 and
/// 4 read as zero.
fn read_sized<H: GuestMemory + ?Sized>(host: &H, addr: u32, size: u32) -> u32 {
    match size {
        1 => read(host, addr, Width::Byte),
        2 => read(host, addr, Width::Half),
        4 => read(host, addr, Width::Word),
        _ => 0,
    }
}

/// Unmapped words read as zero, like the bus does for stray CPU loads.
fn read_u32_or_zero<H: GuestMemory + ?Sized>(host: &H, addr: u32) -> u32 {
    if host.is_valid_range(addr, 4) {
        host.read_u32(addr)
    } else {
        0
    }
}

fn skip_lines(i: &mut usize, skip: u32) {
    *i = i.saturating_add(skip as usize);
}

/// Applies one decoded instruction. `*i` must already point past the
/// records `op` was decoded from; branches and aborts move it further.
pub fn execute<H: CheatHost + ?Sized>(
    op: CheatOp<'_>,
    code: &CheatCode,
    i: &mut usize,
    host: &mut H,
) {
    match op {
        CheatOp::Invalid => {
            trace!("invalid cheat instruction before line {}, aborting code", *i);
            *i = code.lines.len();
        }

        CheatOp::Write { addr, width, value } => {
            invalidate_icache(host, addr, width.bytes());
            if host.is_valid_range(addr, width.bytes()) {
                write(host, addr, width, value);
            }
        }

        CheatOp::Modify {
            op,
            addr,
            width,
            value,
        } => {
            invalidate_icache(host, addr, width.bytes());
            if host.is_valid_range(addr, width.bytes()) {
                let old = read(host, addr, width);
                write(host, addr, width, op.apply(old, value));
            }
        }

        CheatOp::MultiWrite {
            addr,
            width,
            value,
            count,
            step,
            add,
        } => {
            invalidate_icache(
                host,
                addr,
                count.wrapping_mul(step).wrapping_add(width.bytes()),
            );

            let mut data = value;
            let mut target = addr;
            for _ in 0..count {
                if host.is_valid_range(target, width.bytes()) {
                    write(host, target, width, data);
                }
                target = target.wrapping_add(step);
                data = data.wrapping_add(add);
            }
        }

        CheatOp::CopyBytesFrom { src, dst, len } => {
            invalidate_icache(host, src, len);
            invalidate_icache(host, dst, len);
            if host.is_valid_range(src, len) && host.is_valid_range(dst, len) {
                host.memcpy(dst, src, len);
            }
        }

        CheatOp::Vibration {
            left,
            right,
            left_time,
            right_time,
        } => {
            if left > 0 {
                host.set_left(left);
                host.set_left_dropout(left_time);
            }
            if right > 0 {
                host.set_right(right);
                host.set_right_dropout(right_time);
            }
        }

        CheatOp::VibrationFromMemory { addr } => {
            if host.is_valid_range(addr, 8) {
                let left = host.read_u16(addr);
                let right = host.read_u16(addr.wrapping_add(2));
                if left > 0 {
                    host.set_left(left);
                    let time = host.read_u8(addr.wrapping_add(4));
                    host.set_left_dropout(time);
                }
                if right > 0 {
                    host.set_right(right);
                    let time = host.read_u8(addr.wrapping_add(6));
                    host.set_right_dropout(time);
                }
            }
        }

        CheatOp::PostShader {
            shader,
            uniform,
            value,
        } => {
            if let Some(section) = host.post_shader_section(shader as usize) {
                host.set_post_shader_setting(uniform_key(&section, uniform), value);
            }
        }

        CheatOp::PostShaderFromMemory {
            addr,
            shader,
            uniform,
            format,
        } => {
            if !host.is_valid_range(addr, 4) {
                return;
            }
            let Some(section) = host.post_shader_section(shader as usize) else {
                return;
            };
            if let Some(value) = format.convert(host.read_u32(addr)) {
                host.set_post_shader_setting(uniform_key(&section, uniform), value);
            }
        }

        CheatOp::Delay { .. } => {}

        CheatOp::Assert { addr, value } => {
            invalidate_icache(host, addr, 4);
            if host.is_valid_range(addr, 4) && host.read_u32(addr) != value {
                *i = code.lines.len();
            }
        }

        CheatOp::If {
            cond,
            addr,
            width,
            value,
            skip,
        } => {
            invalidate_icache(host, addr, width.bytes());
            let passed = host.is_valid_range(addr, width.bytes())
                && cond.test(read(host, addr, width) as i32, value as i32);
            if !passed {
                skip_lines(i, skip);
            }
        }

        CheatOp::IfAddr {
            cond,
            addr,
            compare_addr,
            size,
            skip,
        } => {
            invalidate_icache(host, addr, size);
            invalidate_icache(host, compare_addr, size);
            let passed = host.is_valid_range(addr, size)
                && host.is_valid_range(compare_addr, size)
                && cond.test(
                    read_sized(host, addr, size) as i32,
                    read_sized(host, compare_addr, size) as i32,
                );
            if !passed {
                skip_lines(i, skip);
            }
        }

        CheatOp::IfPressed {
            mask,
            pressed,
            skip,
        } => {
            let held = host.peek_buttons() & mask == mask;
            if held != pressed {
                skip_lines(i, skip);
            }
        }

        CheatOp::Pointer {
            addr,
            value,
            offset,
            base_offset,
            write,
            lines,
        } => run_pointer(host, addr, value, offset, base_offset, write, lines),
    }
}

fn uniform_key(section: &str, uniform: u8) -> String {
    format!("{section}SettingCurrentValue{}", uniform as u32 + 1)
}

/// Follows one pointer-walk word (`2` forward, `3` backward) from `base`.
fn walk<H: CheatHost + ?Sized>(host: &mut H, base: u32, word: u32) -> u32 {
    let mut offset = (word & 0x0FFF_FFFF) as i32;
    if word >> 28 == 0x3 {
        offset = -offset;
    }
    let at = base.wrapping_add_signed(offset);
    invalidate_icache(host, at, 4);
    read_u32_or_zero(host, at)
}

fn run_pointer<H: CheatHost + ?Sized>(
    host: &mut H,
    addr: u32,
    value: u32,
    offset: i32,
    base_offset: i32,
    write: Option<PointerWrite>,
    lines: &[CheatLine],
) {
    let base_addr = addr.wrapping_add_signed(base_offset);
    invalidate_icache(host, base_addr, 4);
    let mut base = read_u32_or_zero(host, base_addr);
    let mut value = value;
    let mut write = write;

    for line in lines {
        match line.part1 >> 28 {
            // Copy between two dereferenced addresses; replaces the final store.
            0x1 => {
                invalidate_icache(host, addr, 4);
                let src = read_u32_or_zero(host, addr).wrapping_add_signed(offset);
                let dst = read_u32_or_zero(host, base_addr).wrapping_add(line.part1 & 0x0FFF_FFFF);
                invalidate_icache(host, dst, value);
                invalidate_icache(host, src, value);
                if host.is_valid_range(dst, value) && host.is_valid_range(src, value) {
                    host.memcpy(dst, src, value);
                }
                write = None;
            }
            0x2 | 0x3 => {
                base = walk(host, base, line.part1);
                if matches!(line.part2 >> 28, 0x2 | 0x3) {
                    base = walk(host, base, line.part2);
                }
            }
            0x9 => {
                base = base.wrapping_add(line.part1 & 0x0FFF_FFFF);
                value = value.wrapping_add(line.part2);
            }
            _ => {}
        }
    }

    let Some(PointerWrite { width, reverse }) = write else {
        return;
    };
    let target = if reverse {
        base.wrapping_sub(offset as u32)
    } else {
        base.wrapping_add(offset as u32)
    };
    invalidate_icache(host, target, width.bytes());
    if host.is_valid_range(target, width.bytes()) {
        self::write(host, target, width, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::host::{Controller, PostShaderSettings, Vibration};
    use crate::op::{Condition, MemoryOp};

    const BASE: u32 = 0x0880_0000;

    #[derive(Default)]
    struct Ram {
        bytes: Vec<u8>,
        invalidated: Vec<(u32, u32)>,
        buttons: u32,
    }

    impl Ram {
        fn new() -> Self {
            Self {
                bytes: vec![0; 0x1000],
                ..Default::default()
            }
        }
    }

    impl GuestMemory for Ram {
        fn is_valid_range(&self, addr: u32, size: u32) -> bool {
            addr >= BASE && (addr as u64 + size as u64) <= BASE as u64 + self.bytes.len() as u64
        }
        fn read_u8(&self, addr: u32) -> u8 {
            self.bytes[(addr - BASE) as usize]
        }
        fn read_u16(&self, addr: u32) -> u16 {
            let a = (addr - BASE) as usize;
            u16::from_le_bytes([self.bytes[a], self.bytes[a + 1]])
        }
        fn read_u32(&self, addr: u32) -> u32 {
            let a = (addr - BASE) as usize;
            u32::from_le_bytes([
                self.bytes[a],
                self.bytes[a + 1],
                self.bytes[a + 2],
                self.bytes[a + 3],
            ])
        }
        fn write_u8(&mut self, addr: u32, value: u8) {
            self.bytes[(addr - BASE) as usize] = value;
        }
        fn write_u16(&mut self, addr: u32, value: u16) {
            let a = (addr - BASE) as usize;
            self.bytes[a..a + 2].copy_from_slice(&value.to_le_bytes());
        }
        fn write_u32(&mut self, addr: u32, value: u32) {
            let a = (addr - BASE) as usize;
            self.bytes[a..a + 4].copy_from_slice(&value.to_le_bytes());
        }
    }

    impl InstructionCache for Ram {
        fn invalidate_range(&mut self, addr: u32, size: u32) {
            self.invalidated.push((addr, size));
        }
    }

    impl Controller for Ram {
        fn peek_buttons(&self) -> u32 {
            self.buttons
        }
    }

    impl Vibration for Ram {
        fn set_left(&mut self, _magnitude: u16) {}
        fn set_right(&mut self, _magnitude: u16) {}
        fn set_left_dropout(&mut self, _frames: u8) {}
        fn set_right_dropout(&mut self, _frames: u8) {}
    }

    impl PostShaderSettings for Ram {
        fn post_shader_section(&self, _index: usize) -> Option<String> {
            None
        }
        fn set_post_shader_setting(&mut self, _key: String, _value: f32) {}
    }

    impl CheatHost for Ram {}

    fn empty_code(len: usize) -> CheatCode {
        CheatCode::new(crate::code::CodeFormat::CwCheat, vec![CheatLine::default(); len])
    }

    #[test]
    fn icache_invalidation_is_word_aligned() {
        let mut ram = Ram::new();
        invalidate_icache(&mut ram, 0x0880_0001, 1);
        invalidate_icache(&mut ram, 0x0880_0002, 4);
        assert_eq!(ram.invalidated, vec![(0x0880_0000, 4), (0x0880_0000, 8)]);
    }

    #[test]
    fn modify_truncates_to_width() {
        let mut ram = Ram::new();
        ram.write_u16(BASE + 0x10, 0xFFFF);
        let code = empty_code(1);
        let mut i = 1;
        execute(
            CheatOp::Modify {
                op: MemoryOp::Add,
                addr: BASE + 0x10,
                width: Width::Byte,
                value: 2,
            },
            &code,
            &mut i,
            &mut ram,
        );
        assert_eq!(ram.read_u16(BASE + 0x10), 0xFF01);
        assert_eq!(i, 1);
    }

    #[test]
    fn failed_condition_skips() {
        let mut ram = Ram::new();
        ram.write_u8(BASE, 5);
        let code = empty_code(8);
        let op = |cond| CheatOp::If {
            cond,
            addr: BASE,
            width: Width::Byte,
            value: 5,
            skip: 3,
        };

        let mut i = 1;
        execute(op(Condition::Equal), &code, &mut i, &mut ram);
        assert_eq!(i, 1);

        execute(op(Condition::NotEqual), &code, &mut i, &mut ram);
        assert_eq!(i, 4);
    }

    #[test]
    fn unreadable_condition_counts_as_failed() {
        let mut ram = Ram::new();
        let code = empty_code(4);
        let mut i = 1;
        execute(
            CheatOp::If {
                cond: Condition::Equal,
                addr: 0x0400_0000,
                width: Width::Half,
                value: 0,
                skip: 1,
            },
            &code,
            &mut i,
            &mut ram,
        );
        assert_eq!(i, 2);
    }

    #[test]
    fn odd_sized_address_compare_reads_zero() {
        let mut ram = Ram::new();
        ram.write_u32(BASE, 1);
        ram.write_u32(BASE + 0x10, 2);
        let code = empty_code(4);
        let mut i = 2;
        execute(
            CheatOp::IfAddr {
                cond: Condition::Equal,
                addr: BASE,
                compare_addr: BASE + 0x10,
                size: 8,
                skip: 2,
            },
            &code,
            &mut i,
            &mut ram,
        );
        assert_eq!(i, 2);
    }

    #[test]
    fn joker_polarity() {
        let mut ram = Ram::new();
        let code = empty_code(8);
        let op = |pressed| CheatOp::IfPressed {
            mask: 0x4008,
            pressed,
            skip: 2,
        };

        ram.buttons = 0x4008 | 0x1;
        let mut i = 1;
        execute(op(true), &code, &mut i, &mut ram);
        assert_eq!(i, 1);
        execute(op(false), &code, &mut i, &mut ram);
        assert_eq!(i, 3);

        ram.buttons = 0x4000;
        let mut i = 1;
        execute(op(true), &code, &mut i, &mut ram);
        assert_eq!(i, 3);
        execute(op(false), &code, &mut i, &mut ram);
        assert_eq!(i, 3);
    }

    #[test]
    fn assert_mismatch_aborts() {
        let mut ram = Ram::new();
        ram.write_u32(BASE + 8, 0x1234);
        let code = empty_code(5);

        let mut i = 1;
        execute(
            CheatOp::Assert {
                addr: BASE + 8,
                value: 0x1234,
            },
            &code,
            &mut i,
            &mut ram,
        );
        assert_eq!(i, 1);

        execute(
            CheatOp::Assert {
                addr: BASE + 8,
                value: 0x1235,
            },
            &code,
            &mut i,
            &mut ram,
        );
        assert_eq!(i, 5);
    }

    #[test]
    fn pointer_walk_and_reverse_write() {
        let mut ram = Ram::new();
        // Pointer at BASE+0x100 -> BASE+0x200, which holds a pointer to BASE+0x300.
        ram.write_u32(BASE + 0x100, BASE + 0x200);
        ram.write_u32(BASE + 0x208, BASE + 0x300);

        let lines = [CheatLine::new(0x2000_0008, 0)];
        let code = empty_code(3);
        let mut i = 3;
        execute(
            CheatOp::Pointer {
                addr: BASE + 0x100,
                value: 0xAB,
                offset: 4,
                base_offset: 0,
                write: Some(PointerWrite {
                    width: Width::Byte,
                    reverse: true,
                }),
                lines: &lines,
            },
            &code,
            &mut i,
            &mut ram,
        );
        assert_eq!(ram.read_u8(BASE + 0x2FC), 0xAB);
        assert_eq!(i, 3);
    }

    #[test]
    fn pointer_copy_suppresses_final_write() {
        let mut ram = Ram::new();
        ram.write_u32(BASE + 0x100, BASE + 0x400);
        ram.write_u32(BASE + 0x110, BASE + 0x500);
        ram.write_u32(BASE + 0x400, 0xDEAD_BEEF);

        let lines = [CheatLine::new(0x1000_0000, 0)];
        let code = empty_code(3);
        let mut i = 3;
        execute(
            CheatOp::Pointer {
                addr: BASE + 0x100,
                value: 4,
                offset: 0,
                base_offset: 0x10,
                write: Some(PointerWrite {
                    width: Width::Word,
                    reverse: false,
                }),
                lines: &lines,
            },
            &code,
            &mut i,
            &mut ram,
        );
        // Without the copy line, the final store would have put 4 at BASE+0x500.
        assert_eq!(ram.read_u32(BASE + 0x500), 0xDEAD_BEEF);
    }
}
