//! Pixel samples and the borrowed buffer view the pipeline reads from.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single 4-channel 8-bit pixel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Sample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Sample {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_array([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn channel(&self, channel: Channel) -> u8 {
        match channel {
            Channel::Red => self.r,
            Channel::Green => self.g,
            Channel::Blue => self.b,
            Channel::Alpha => self.a,
        }
    }
}

/// One of the four channels of a [`Sample`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Red,
    Green,
    Blue,
    Alpha,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Red, Channel::Green, Channel::Blue, Channel::Alpha];
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
            Channel::Alpha => "alpha",
        };
        f.write_str(name)
    }
}

/// Immutable view over caller-owned samples.
///
/// The view is `Copy` and never clones the underlying pixels. Indices are stable
/// for the lifetime `'a`, and the shared borrow rules out mutation during a run.
#[derive(Debug, Clone, Copy)]
pub struct SampleBuffer<'a> {
    samples: &'a [Sample],
}

impl<'a> SampleBuffer<'a> {
    pub fn new(samples: &'a [Sample]) -> Self {
        Self { samples }
    }

    /// View tightly packed RGBA bytes as samples without copying.
    pub fn from_rgba_bytes(bytes: &'a [u8]) -> Result<Self> {
        // Sample has alignment 1, so the cast only fails on length.
        let samples: &[Sample] = bytemuck::try_cast_slice(bytes)
            .map_err(|_| Error::MisalignedBytes { len: bytes.len() })?;
        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a Sample> {
        self.samples.get(index)
    }

    pub fn as_slice(&self) -> &'a [Sample] {
        self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'a, Sample> {
        self.samples.iter()
    }
}

impl<'a> From<&'a [Sample]> for SampleBuffer<'a> {
    fn from(samples: &'a [Sample]) -> Self {
        Self::new(samples)
    }
}

impl<'a> From<&'a Vec<Sample>> for SampleBuffer<'a> {
    fn from(samples: &'a Vec<Sample>) -> Self {
        Self::new(samples)
    }
}

impl<'a> IntoIterator for SampleBuffer<'a> {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
