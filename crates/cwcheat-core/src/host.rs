/// Guest address space as seen by cheat codes.
///
/// Reads and writes are only issued after `is_valid_range` succeeded for the
/// bytes involved, so implementations don't need to guard them again.
pub trait GuestMemory {
    fn is_valid_range(&self, addr: u32, size: u32) -> bool;

    fn is_valid_address(&self, addr: u32) -> bool {
        self.is_valid_range(addr, 1)
    }

    fn read_u8(&self, addr: u32) -> u8;
    fn read_u16(&self, addr: u32) -> u16;
    fn read_u32(&self, addr: u32) -> u32;

    fn write_u8(&mut self, addr: u32, value: u8);
    fn write_u16(&mut self, addr: u32, value: u16);
    fn write_u32(&mut self, addr: u32, value: u32);

    /// Copy `len` bytes from `src` to `dst`. Overlapping ranges behave like
    /// `memmove`.
    fn memcpy(&mut self, dst: u32, src: u32, len: u32) {
        if dst <= src || dst >= src.wrapping_add(len) {
            for i in 0..len {
                let b = self.read_u8(src.wrapping_add(i));
                self.write_u8(dst.wrapping_add(i), b);
            }
        } else {
            for i in (0..len).rev() {
                let b = self.read_u8(src.wrapping_add(i));
                self.write_u8(dst.wrapping_add(i), b);
            }
        }
    }

    fn memset(&mut self, addr: u32, value: u8, len: u32) {
        for i in 0..len {
            self.write_u8(addr.wrapping_add(i), value);
        }
    }
}

/// Invalidation hook for the guest CPU's cached/recompiled code.
pub trait InstructionCache {
    fn invalidate_range(&mut self, addr: u32, size: u32);
}

/// Live controller state.
pub trait Controller {
    /// Currently held buttons, see [`buttons`].
    fn peek_buttons(&self) -> u32;
}

/// Rumble motors.
pub trait Vibration {
    fn set_left(&mut self, magnitude: u16);
    fn set_right(&mut self, magnitude: u16);
    /// Frames until the left motor stops.
    fn set_left_dropout(&mut self, frames: u8);
    /// Frames until the right motor stops.
    fn set_right_dropout(&mut self, frames: u8);
}

/// Post-processing shader parameter store.
pub trait PostShaderSettings {
    /// Section name of the shader at `index` in the active chain.
    fn post_shader_section(&self, index: usize) -> Option<String>;
    fn set_post_shader_setting(&mut self, key: String, value: f32);
}

/// Everything the engine needs from the emulator.
pub trait CheatHost:
    GuestMemory + InstructionCache + Controller + Vibration + PostShaderSettings
{
    /// Competitive (achievements hardcore) mode. Cheats never run while set.
    fn hardcore_mode_active(&self) -> bool {
        false
    }
}

/// Button masks reported by [`Controller::peek_buttons`], as used by joker
/// codes.
pub mod buttons {
    pub const SELECT: u32 = 0x0000_0001;
    pub const START: u32 = 0x0000_0008;
    pub const UP: u32 = 0x0000_0010;
    pub const RIGHT: u32 = 0x0000_0020;
    pub const DOWN: u32 = 0x0000_0040;
    pub const LEFT: u32 = 0x0000_0080;
    pub const LTRIGGER: u32 = 0x0000_0100;
    pub const RTRIGGER: u32 = 0x0000_0200;
    pub const TRIANGLE: u32 = 0x0000_1000;
    pub const CIRCLE: u32 = 0x0000_2000;
    pub const CROSS: u32 = 0x0000_4000;
    pub const SQUARE: u32 = 0x0000_8000;
    pub const HOME: u32 = 0x0001_0000;
    pub const HOLD: u32 = 0x0002_0000;
    pub const WLAN: u32 = 0x0004_0000;
    pub const REMOTE_HOLD: u32 = 0x0008_0000;
    pub const VOL_UP: u32 = 0x0010_0000;
    pub const VOL_DOWN: u32 = 0x0020_0000;
    pub const SCREEN: u32 = 0x0040_0000;
    pub const NOTE: u32 = 0x0080_0000;
}
