// Licensed under the Apache-2.0 license

//! Behavioural model of a GENERIC_I2C block with devices on its bus.
//!
//! The model keeps a flat register file and reacts to the writes the engine
//! performs: DATA writes fill the transfer buffer, GO runs the programmed
//! transaction against the attached devices and latches STATUS, DATA reads in
//! read mode drain the buffer. Each device is a 256-byte register file with
//! an auto-incrementing pointer set by the first written byte.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::vec::Vec;

use crate::asic::AsicDescriptor;
use crate::reg::{get_field, set_field, RegisterBackend};

const WINDOW: usize = 0x1_0000;

const STATUS_DONE: u32 = 0x010;
const STATUS_ABORTED: u32 = 0x020;
const STATUS_STOPPED_ON_NACK: u32 = 0x200;
const STATUS_NACK: u32 = 0x400;

struct Device {
    memory: [u8; 256],
    pointer: u8,
}

struct State {
    registers: HashMap<u32, u32>,
    buffer: [u8; 16],
    index: usize,
    read_mode: bool,
    devices: HashMap<u8, Device>,
    transactions: Vec<(u8, Vec<u8>)>,
    go_count: u32,
    fail_on_go: Option<u32>,
}

pub struct SimulatedGpu {
    asic: &'static AsicDescriptor,
    state: RefCell<State>,
    soft_resets: Cell<u32>,
    done_acks: Cell<u32>,
}

impl SimulatedGpu {
    pub fn new(asic: &'static AsicDescriptor) -> Self {
        let mut registers = HashMap::new();
        registers.insert(asic.registers.status, STATUS_DONE);
        Self {
            asic,
            state: RefCell::new(State {
                registers,
                buffer: [0; 16],
                index: 0,
                read_mode: false,
                devices: HashMap::new(),
                transactions: Vec::new(),
                go_count: 0,
                fail_on_go: None,
            }),
            soft_resets: Cell::new(0),
            done_acks: Cell::new(0),
        }
    }

    pub fn attach_device(&self, address: u8) {
        self.state.borrow_mut().devices.insert(
            address,
            Device {
                memory: [0; 256],
                pointer: 0,
            },
        );
    }

    /// Preloads a device register range.
    pub fn load(&self, address: u8, offset: u8, bytes: &[u8]) {
        let mut state = self.state.borrow_mut();
        let device = state.devices.get_mut(&address).expect("device attached");
        for (i, byte) in bytes.iter().enumerate() {
            device.memory[(offset as usize + i) & 0xFF] = *byte;
        }
    }

    pub fn device_register(&self, address: u8, offset: u8) -> u8 {
        self.state.borrow().devices[&address].memory[offset as usize]
    }

    /// Makes the `n`th GO (1-based) abort.
    pub fn fail_on_go(&self, n: u32) {
        self.state.borrow_mut().fail_on_go = Some(n);
    }

    /// Current value of a register, by dword index, without side effects.
    pub fn register(&self, addr: u32) -> u32 {
        self.state
            .borrow()
            .registers
            .get(&addr)
            .copied()
            .unwrap_or(0)
    }

    /// Every transaction run: wire address byte and the bytes written.
    pub fn transactions(&self) -> Vec<(u8, Vec<u8>)> {
        self.state.borrow().transactions.clone()
    }

    pub fn go_count(&self) -> u32 {
        self.state.borrow().go_count
    }

    pub fn soft_reset_pulses(&self) -> u32 {
        self.soft_resets.get()
    }

    pub fn done_acks(&self) -> u32 {
        self.done_acks.get()
    }

    fn write_data(&self, state: &mut State, value: u32) {
        let f = self.asic.fields;
        let byte = get_field(value, f.data.mask, f.data.shift) as u8;
        if value & f.index_write.mask != 0 {
            state.index = get_field(value, f.index.mask, f.index.shift) as usize;
            state.read_mode = value & f.data_rw.mask != 0;
        }
        if !state.read_mode {
            let slot = state.index & 0xF;
            state.buffer[slot] = byte;
            state.index += 1;
        }
    }

    fn read_data(&self, state: &mut State) -> u32 {
        let f = self.asic.fields;
        let slot = state.index & 0xF;
        let byte = u32::from(state.buffer[slot]);
        if state.read_mode {
            state.index += 1;
        }
        set_field(f.data_rw.mask, f.data.mask, f.data.shift, byte)
    }

    fn run_transaction(&self, state: &mut State) {
        let f = self.asic.fields;
        let regs = &self.asic.registers;
        state.go_count += 1;

        let transaction = state.registers.get(&regs.transaction).copied().unwrap_or(0);
        let read = transaction & f.rw.mask != 0;
        let count = get_field(transaction, f.count.mask, f.count.shift) as usize;
        let address_byte = state.buffer[0];
        let address = address_byte >> 1;

        let status = if state.fail_on_go == Some(state.go_count) {
            STATUS_ABORTED
        } else if let Some(device) = state.devices.get_mut(&address) {
            if read {
                for slot in 1..=count {
                    state.buffer[slot] = device.memory[device.pointer as usize];
                    device.pointer = device.pointer.wrapping_add(1);
                }
                state.transactions.push((address_byte, Vec::new()));
            } else {
                let written = state.buffer[1..=count].to_vec();
                if let Some((first, rest)) = written.split_first() {
                    device.pointer = *first;
                    for byte in rest {
                        device.memory[device.pointer as usize] = *byte;
                        device.pointer = device.pointer.wrapping_add(1);
                    }
                }
                state.transactions.push((address_byte, written));
            }
            STATUS_DONE
        } else {
            STATUS_STOPPED_ON_NACK | STATUS_NACK
        };
        state.registers.insert(regs.status, status);
    }
}

impl RegisterBackend for SimulatedGpu {
    fn window_size(&self) -> usize {
        WINDOW
    }

    fn read32(&self, offset: usize) -> u32 {
        let addr = (offset / 4) as u32;
        let mut state = self.state.borrow_mut();
        if addr == self.asic.registers.data {
            return self.read_data(&mut state);
        }
        state.registers.get(&addr).copied().unwrap_or(0)
    }

    fn write32(&self, offset: usize, value: u32) {
        let addr = (offset / 4) as u32;
        let regs = &self.asic.registers;
        let f = self.asic.fields;
        let mut state = self.state.borrow_mut();

        if addr == regs.data {
            self.write_data(&mut state, value);
            state.registers.insert(addr, value);
        } else if addr == regs.control {
            let previous = state.registers.get(&addr).copied().unwrap_or(0);
            if value & f.soft_reset.mask != 0 && previous & f.soft_reset.mask == 0 {
                self.soft_resets.set(self.soft_resets.get() + 1);
            }
            state.registers.insert(addr, value & !f.go.mask);
            if value & f.go.mask != 0 {
                self.run_transaction(&mut state);
            }
        } else if addr == regs.interrupt_control {
            if value & f.done_ack.mask != 0 {
                self.done_acks.set(self.done_acks.get() + 1);
            }
            state.registers.insert(addr, value & !f.done_ack.mask);
        } else {
            state.registers.insert(addr, value);
        }
    }
}
