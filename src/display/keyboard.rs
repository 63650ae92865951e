// src/display/keyboard.rs

//! Scancode decoding backing the standby shell's raw keyboard loop
//! ([`crate::display::shell::run_shell`]).

use lazy_static::lazy_static;
use pc_keyboard::{layouts, DecodedKey, HandleControl, Keyboard, ScancodeSet1};
use spin::Mutex;

lazy_static! {
    static ref DECODER: Mutex<Keyboard<layouts::Us104Key, ScancodeSet1>> = Mutex::new(Keyboard::new(
        ScancodeSet1::new(),
        layouts::Us104Key,
        HandleControl::Ignore,
    ));
}

/// Feeds one raw PS/2 scancode byte into the shell's keyboard decoder,
/// returning a character once a full key event resolves to one.
///
/// Stateful across calls (a single shared [`pc_keyboard::Keyboard`]) so
/// extended, `0xE0`-prefixed scancode sequences accumulate correctly one
/// byte at a time, matching how [`crate::arch::Keyboard::read_scancode`]
/// hands bytes to the caller one at a time.
pub fn scancode_to_char(scancode: u8) -> Option<char> {
    let mut keyboard = DECODER.lock();
    let key_event = keyboard.add_byte(scancode).ok().flatten()?;
    match keyboard.process_keyevent(key_event)? {
        DecodedKey::Unicode(c) => Some(c),
        DecodedKey::RawKey(_) => None,
    }
}
