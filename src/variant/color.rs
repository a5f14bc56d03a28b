//! Color pixel payloads.

/// Three-channel color.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color<T> {
    pub r: T,
    pub g: T,
    pub b: T,
}

impl<T> Color<T> {
    pub const fn new(r: T, g: T, b: T) -> Self {
        Self { r, g, b }
    }
}

/// Four-channel color. The fourth channel is usually alpha.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color4<T> {
    pub r: T,
    pub g: T,
    pub b: T,
    pub a: T,
}

impl<T> Color4<T> {
    pub const fn new(r: T, g: T, b: T, a: T) -> Self {
        Self { r, g, b, a }
    }
}
