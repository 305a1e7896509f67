//! Temperature scale conversion.
//!
//! Conversions return new values and keep the shape of their input: a scalar stays a
//! scalar, a sequence stays a sequence of the same length and order.

use heapless::Vec;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TemperatureUnit {
    Celsius,
    #[default]
    Fahrenheit,
}

impl TemperatureUnit {
    /// Express a Celsius value in this unit.
    pub fn from_celsius(self, celsius: f32) -> f32 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius_to_fahrenheit(celsius),
        }
    }

    /// Parse the single-letter form used in build configuration (`C` or `F`).
    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter.trim() {
            "C" | "c" => Some(Self::Celsius),
            "F" | "f" => Some(Self::Fahrenheit),
            _ => None,
        }
    }
}

impl core::fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Celsius => write!(f, "°C"),
            Self::Fahrenheit => write!(f, "°F"),
        }
    }
}

/// Values that can be moved between temperature scales.
pub trait Temperatures: Sized {
    fn map_values(&self, f: impl Fn(f32) -> f32) -> Self;
}

impl Temperatures for f32 {
    fn map_values(&self, f: impl Fn(f32) -> f32) -> Self {
        f(*self)
    }
}

impl<const N: usize> Temperatures for [f32; N] {
    fn map_values(&self, f: impl Fn(f32) -> f32) -> Self {
        (*self).map(f)
    }
}

impl<const N: usize> Temperatures for Vec<f32, N> {
    fn map_values(&self, f: impl Fn(f32) -> f32) -> Self {
        self.iter().copied().map(f).collect()
    }
}

pub fn celsius_to_fahrenheit<T: Temperatures>(celsius: T) -> T {
    celsius.map_values(|c| 1.8 * c + 32.0)
}

pub fn fahrenheit_to_celsius<T: Temperatures>(fahrenheit: T) -> T {
    fahrenheit.map_values(|f| (f - 32.0) / 1.8)
}
