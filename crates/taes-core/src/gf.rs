//! GF(2^8) arithmetic modulo the AES polynomial `x^8 + x^4 + x^3 + x + 1`.

/// Multiplies a field element by `x` (i.e. by 2).
#[inline]
pub const fn xtime(byte: u8) -> u8 {
    let shifted = byte << 1;
    if byte & 0x80 != 0 {
        shifted ^ 0x1b
    } else {
        shifted
    }
}

/// General field multiplication (shift-and-add).
pub const fn gmul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0u8;
    while b != 0 {
        if b & 1 != 0 {
            product ^= a;
        }
        a = xtime(a);
        b >>= 1;
    }
    product
}
