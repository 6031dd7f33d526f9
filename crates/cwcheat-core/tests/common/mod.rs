#![allow(dead_code)]

use std::collections::HashMap;

use cwcheat_core::host::{
    CheatHost, Controller, GuestMemory, InstructionCache, PostShaderSettings, Vibration,
};

pub const RAM_BASE: u32 = 0x0880_0000;
pub const RAM_SIZE: usize = 0x0020_0000;

/// Flat little-endian guest RAM at `RAM_BASE` that records every side effect
/// the engine produces.
#[derive(Default)]
pub struct TestHost {
    pub ram: Vec<u8>,
    pub invalidated: Vec<(u32, u32)>,
    pub buttons: u32,
    pub left: Option<(u16, u8)>,
    pub right: Option<(u16, u8)>,
    pub shaders: Vec<String>,
    pub settings: HashMap<String, f32>,
    pub hardcore: bool,
}

impl TestHost {
    pub fn new() -> Self {
        Self {
            ram: vec![0; RAM_SIZE],
            ..Default::default()
        }
    }

    fn offset(addr: u32) -> usize {
        (addr - RAM_BASE) as usize
    }

    pub fn peek32(&self, addr: u32) -> u32 {
        self.read_u32(addr)
    }

    pub fn poke32(&mut self, addr: u32, value: u32) {
        self.write_u32(addr, value);
    }
}

impl GuestMemory for TestHost {
    fn is_valid_range(&self, addr: u32, size: u32) -> bool {
        addr >= RAM_BASE && addr as u64 + size as u64 <= RAM_BASE as u64 + self.ram.len() as u64
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
}

impl InstructionCache for TestHost {
    fn invalidate_range(&mut self, addr: u32, size: u32) {
        self.invalidated.push((addr, size));
    }
}

impl Controller for TestHost {
    fn peek_buttons(&self) -> u32 {
        self.buttons
    }
}

impl Vibration for TestHost {
    fn set_left(&mut self, magnitude: u16) {
        self.left = Some((magnitude, self.left.map_or(0, |(_, t)| t)));
    }

    fn set_right(&mut self, magnitude: u16) {
        self.right = Some((magnitude, self.right.map_or(0, |(_, t)| t)));
    }

    fn set_left_dropout(&mut self, frames: u8) {
        if let Some((_, t)) = self.left.as_mut() {
            *t = frames;
        }
    }

    fn set_right_dropout(&mut self, frames: u8) {
        if let Some((_, t)) = self.right.as_mut() {
            *t = frames;
        }
    }
}

impl PostShaderSettings for TestHost {
    fn post_shader_section(&self, index: usize) -> Option<String> {
        self.shaders.get(index).cloned()
    }

    fn set_post_shader_setting(&mut self, key: String, value: f32) {
        self.settings.insert(key, value);
    }
}

impl CheatHost for TestHost {
    fn hardcore_mode_active(&self) -> bool {
        self.hardcore
    }
}
