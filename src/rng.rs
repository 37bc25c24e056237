//! Small xorshift generator for picking the lit indicator.

pub struct Rng(u32);

impl Rng {
    pub const fn new(seed: u32) -> Self {
        // xorshift never leaves zero
        Self(if seed == 0 { 0x9E37_79B9 } else { seed })
    }

    pub fn next(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }

    /// Uniform-ish value in `0..max`. `max` must be non-zero.
    pub fn below(&mut self, max: u32) -> u32 {
        self.next() % max
    }

    /// Stir in outside entropy, such as the time of a button press.
    pub fn mix(&mut self, entropy: u32) {
        *self = Self::new(self.0 ^ entropy.rotate_left(7));
        self.next();
    }
}
