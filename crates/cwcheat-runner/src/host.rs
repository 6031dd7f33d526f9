use std::collections::BTreeMap;

use cwcheat_core::host::{
    CheatHost, Controller, GuestMemory, InstructionCache, PostShaderSettings, Vibration,
};
use cwcheat_core::op::USER_MEMORY_BASE;
use log::{debug, info, warn};

pub const RAM_BASE: u32 = 0x0800_0000;
pub const RAM_SIZE: usize = 32 * 1024 * 1024;

const USER_OFFSET: usize = (USER_MEMORY_BASE - RAM_BASE) as usize;

/// Headless stand-in for the emulator: flat little-endian RAM plus logging
/// stubs for rumble and shader settings.
pub struct RamHost {
    ram: Vec<u8>,
    pub buttons: u32,
    pub hardcore: bool,
    post_shaders: Vec<String>,
    pub shader_settings: BTreeMap<String, f32>,
    pub invalidations: u64,
}

impl RamHost {
    pub fn new(post_shaders: Vec<String>) -> Self {
        Self {
            ram: vec![0; RAM_SIZE],
            buttons: 0,
            hardcore: false,
            post_shaders,
            shader_settings: BTreeMap::new(),
            invalidations: 0,
        }
    }

    /// Copies `image` into user memory. Anything past the end of RAM is
    /// dropped.
    pub fn load_user_image(&mut self, image: &[u8]) {
        let room = RAM_SIZE - USER_OFFSET;
        if image.len() > room {
            warn!(
                "RAM image is {} bytes, only the first {room} fit in user memory",
                image.len()
            );
        }
        let len = image.len().min(room);
        self.ram[USER_OFFSET..USER_OFFSET + len].copy_from_slice(&image[..len]);
    }

    pub fn user_ram(&self) -> &[u8] {
        &self.ram[USER_OFFSET..]
    }

    fn offset(addr: u32) -> usize {
        (addr - RAM_BASE) as usize
    }
}

impl GuestMemory for RamHost {
    fn is_valid_range(&self, addr: u32, size: u32) -> bool {
        addr >= RAM_BASE && addr as u64 + size as u64 <= RAM_BASE as u64 + RAM_SIZE as u64
    }

    fn read_u8(&self, addr: u32) -> u8 {
        self.ram[Self::offset(addr)]
    }

    fn read_u16(&self, addr: u32) -> u16 {
        let a = Self::offset(addr);
        u16::from_le_bytes([self.ram[a], self.ram[a + 1]])
    }

    fn read_u32(&self, addr: u32) -> u32 {
        let a = Self::offset(addr);
        u32::from_le_bytes([self.ram[a], self.ram[a + 1], self.ram[a + 2], self.ram[a + 3]])
    }

    fn write_u8(&mut self, addr: u32, value: u8) {
        self.ram[Self::offset(addr)] = value;
    }

    fn write_u16(&mut self, addr: u32, value: u16) {
        let a = Self::offset(addr);
        self.ram[a..a + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn write_u32(&mut self, addr: u32, value: u32) {
        let a = Self::offset(addr);
        self.ram[a..a + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn memcpy(&mut self, dst: u32, src: u32, len: u32) {
        let src = Self::offset(src);
        self.ram
            .copy_within(src..src + len as usize, Self::offset(dst));
    }

    fn memset(&mut self, addr: u32, value: u8, len: u32) {
        let a = Self::offset(addr);
        self.ram[a..a + len as usize].fill(value);
    }
}

impl InstructionCache for RamHost {
    fn invalidate_range(&mut self, addr: u32, size: u32) {
        debug!("icache invalidate {addr:08X}+{size:X}");
        self.invalidations += 1;
    }
}

impl Controller for RamHost {
    fn peek_buttons(&self) -> u32 {
        self.buttons
    }
}

impl Vibration for RamHost {
    fn set_left(&mut self, magnitude: u16) {
        info!("Vibration: left motor {magnitude:#06X}");
    }

    fn set_right(&mut self, magnitude: u16) {
        info!("Vibration: right motor {magnitude:#06X}");
    }

    fn set_left_dropout(&mut self, frames: u8) {
        info!("Vibration: left motor stops after {frames} frame(s)");
    }

    fn set_right_dropout(&mut self, frames: u8) {
        info!("Vibration: right motor stops after {frames} frame(s)");
    }
}

impl PostShaderSettings for RamHost {
    fn post_shader_section(&self, index: usize) -> Option<String> {
        self.post_shaders.get(index).cloned()
    }

    fn set_post_shader_setting(&mut self, key: String, value: f32) {
        if self.shader_settings.get(&key) != Some(&value) {
            info!("Post shader: {key} = {value}");
        }
        self.shader_settings.insert(key, value);
    }
}

impl CheatHost for RamHost {
    fn hardcore_mode_active(&self) -> bool {
        self.hardcore
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_image_lands_at_user_base() {
        let mut host = RamHost::new(Vec::new());
        host.load_user_image(&[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(host.read_u32(USER_MEMORY_BASE), 0x1234_5678);
        assert_eq!(host.user_ram()[..4], [0x78, 0x56, 0x34, 0x12]);
        assert_eq!(host.user_ram().len(), 24 * 1024 * 1024);
    }

    #[test]
    fn range_check_covers_whole_ram() {
        let host = RamHost::new(Vec::new());
        assert!(host.is_valid_range(RAM_BASE, 4));
        assert!(host.is_valid_range(RAM_BASE + RAM_SIZE as u32 - 4, 4));
        assert!(!host.is_valid_range(RAM_BASE + RAM_SIZE as u32 - 2, 4));
        assert!(!host.is_valid_range(RAM_BASE - 1, 1));
    }

    #[test]
    fn overlapping_memcpy_behaves_like_memmove() {
        let mut host = RamHost::new(Vec::new());
        host.load_user_image(&[1, 2, 3, 4, 5]);
        host.memcpy(USER_MEMORY_BASE + 1, USER_MEMORY_BASE, 4);
        assert_eq!(host.user_ram()[..5], [1, 1, 2, 3, 4]);
    }

    #[test]
    fn shader_lookup_follows_chain_order() {
        let mut host = RamHost::new(vec!["Bloom".into(), "Scanlines".into()]);
        assert_eq!(host.post_shader_section(1).as_deref(), Some("Scanlines"));
        assert_eq!(host.post_shader_section(2), None);

        host.set_post_shader_setting("ScanlinesSettingCurrentValue1".into(), 0.5);
        assert_eq!(
            host.shader_settings.get("ScanlinesSettingCurrentValue1"),
            Some(&0.5)
        );
    }
}
