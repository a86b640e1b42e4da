/*!
Shared test builders.

Kept deliberately small: most modules stage their own scenarios inline;
these helpers cover the two chores that repeat across suites — seeding
bus memory with program words and shaping word lists into the byte
layout disk images use.
*/

use crate::bus::{AddressSpace, Unibus};

/// Store `words` into the bus starting at physical `addr`.
pub fn load_words(bus: &mut Unibus, addr: u32, words: &[u16]) {
    for (i, word) in words.iter().enumerate() {
        bus.write_word(addr + (i as u32) * 2, *word)
            .expect("test memory store");
    }
}

/// Little-endian byte image for a word list, as a mountable disk image.
pub fn image_bytes(words: &[u16]) -> Vec<u8> {
    words
        .iter()
        .flat_map(|w| [(*w & 0xff) as u8, (*w >> 8) as u8])
        .collect()
}
