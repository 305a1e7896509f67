use heapless::Vec;

use crate::{
    address::{Address, MAX_ADDRESSES},
    convert::TemperatureUnit,
};

/// Room for a temperature and a humidity value per address.
pub const MAX_SAMPLES: usize = 2 * MAX_ADDRESSES;

/// Physical quantity of a [`Sample`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Label {
    Temperature,
    Humidity,
}

impl core::fmt::Display for Label {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Temperature => write!(f, "Temperature"),
            Self::Humidity => write!(f, "Humidity"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    pub address: Address,
    pub label: Label,
    pub value: f32,
}

/// Last accepted measurement of one sensor or bus, in address order.
///
/// Temperatures are expressed in [`Reading::unit`]; humidity is always %RH.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    unit: TemperatureUnit,
    samples: Vec<Sample, MAX_SAMPLES>,
}

impl Reading {
    pub(crate) fn new(unit: TemperatureUnit, samples: Vec<Sample, MAX_SAMPLES>) -> Self {
        Self { unit, samples }
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// All values in sample order.
    pub fn values(&self) -> impl ExactSizeIterator<Item = f32> + '_ {
        self.samples.iter().map(|sample| sample.value)
    }

    pub fn temperatures(&self) -> impl Iterator<Item = f32> + '_ {
        self.labelled(Label::Temperature)
    }

    pub fn humidities(&self) -> impl Iterator<Item = f32> + '_ {
        self.labelled(Label::Humidity)
    }

    /// Value of one quantity for one sensor.
    pub fn get(&self, address: Address, label: Label) -> Option<f32> {
        self.samples
            .iter()
            .find(|sample| sample.address == address && sample.label == label)
            .map(|sample| sample.value)
    }

    /// Number of distinct sensors contributing to this reading.
    pub fn sensor_count(&self) -> usize {
        self.samples
            .iter()
            .enumerate()
            .filter(|(i, sample)| {
                !self.samples[..*i]
                    .iter()
                    .any(|earlier| earlier.address == sample.address)
            })
            .count()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn labelled(&self, label: Label) -> impl Iterator<Item = f32> + '_ {
        self.samples
            .iter()
            .filter(move |sample| sample.label == label)
            .map(|sample| sample.value)
    }
}

/// One line per sample, e.g. `28ff4c011604009a Temperature: 72.5 °F`.
impl core::fmt::Display for Reading {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (i, sample) in self.samples.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{} {}: {:.1} ", sample.address, sample.label, sample.value)?;
            match sample.label {
                Label::Temperature => write!(f, "{}", self.unit)?,
                Label::Humidity => write!(f, "%RH")?,
            }
        }
        Ok(())
    }
}
