// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! Helpful primitives for developing the crate.

pub mod cached_chain;
mod impl_const_id;

use std::{
    io::{Read, Result, Write},
    mem::{size_of, MaybeUninit},
    ptr::write_volatile,
    slice::{from_raw_parts, from_raw_parts_mut},
};

/// Overwrites secret bytes with zeros in a way the compiler keeps.
pub(crate) fn wipe(buf: &mut [u8]) {
    for b in buf.iter_mut() {
        unsafe {
            write_volatile(b as *mut u8, 0u8);
        }
    }
}

pub trait FromLe: Sized {
    fn from_le(value: &[u8]) -> Result<Self>;
}

pub trait AsLeBytes<T> {
    fn as_le_bytes(&self) -> T;
}

impl FromLe for openssl::bn::BigNum {
    #[inline]
    fn from_le(value: &[u8]) -> Result<Self> {
        Ok(Self::from_slice(
            &value.iter().rev().cloned().collect::<Vec<_>>(),
        )?)
    }
}

/// Writes the number little-endian into a zero-padded buffer of `N`
/// bytes. Numbers wider than `N` bytes are truncated to their low bytes.
impl<const N: usize> AsLeBytes<[u8; N]> for openssl::bn::BigNumRef {
    fn as_le_bytes(&self) -> [u8; N] {
        let mut buf = [0u8; N];

        for (i, b) in self.to_vec().iter().rev().cloned().take(N).enumerate() {
            buf[i] = b;
        }

        buf
    }
}

/// Loads plain-old-data values straight out of a reader.
///
/// Only use with types for which every bit pattern is valid
/// (integers, byte arrays and `repr(C)` aggregates of them).
pub trait TypeLoad: Read {
    fn load<T: Sized + Copy>(&mut self) -> Result<T> {
        let mut t = MaybeUninit::<T>::zeroed();
        let p = t.as_mut_ptr() as *mut u8;
        let s = unsafe { from_raw_parts_mut(p, size_of::<T>()) };
        self.read_exact(s)?;
        Ok(unsafe { t.assume_init() })
    }
}

pub trait TypeSave: Write {
    fn save<T: Sized + Copy>(&mut self, value: &T) -> Result<()> {
        let p = value as *const T as *const u8;
        let s = unsafe { from_raw_parts(p, size_of::<T>()) };
        self.write_all(s)
    }
}

impl<T: Read> TypeLoad for T {}
impl<T: Write> TypeSave for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::bn::BigNum;

    #[test]
    fn le_round_trip() {
        let n = BigNum::from_u32(0x0102_0304).unwrap();
        let le: [u8; 8] = n.as_le_bytes();
        assert_eq!(le, [4, 3, 2, 1, 0, 0, 0, 0]);
        assert_eq!(BigNum::from_le(&le).unwrap(), n);
    }

    #[test]
    fn wipe_zeroes() {
        let mut buf = [0xa5u8; 33];
        wipe(&mut buf[1..]);
        assert_eq!(buf[0], 0xa5);
        assert!(buf[1..].iter().all(|b| *b == 0));
    }

    #[test]
    fn load_save() {
        let mut buf = Vec::new();
        buf.save(&0x1003u32.to_le()).unwrap();
        buf.save(&[7u8; 3]).unwrap();
        assert_eq!(buf, [0x03, 0x10, 0, 0, 7, 7, 7]);

        let mut reader = &buf[..];
        assert_eq!(u32::from_le(reader.load().unwrap()), 0x1003);
        assert_eq!(reader.load::<[u8; 3]>().unwrap(), [7u8; 3]);
    }
}
