use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use strum_macros::Display;

/// Telemetry quantities reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateField {
    ChargeLevel,
    ChargeSpeed,
    ChargeThMin,
    ChargeThMax,
    AcOutputIsOn,
    DcOutputIsOn,
    UsbOutputIsOn,
    RemainingTime,
    AcInput,
}

/// Time left until the battery is full or empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemainingTime {
    pub hours: u16,
    pub minutes: u8,
}

impl RemainingTime {
    pub fn from_minutes(total: u16) -> Self {
        Self {
            hours: total / 60,
            minutes: (total % 60) as u8,
        }
    }

    pub fn total_minutes(&self) -> u32 {
        self.hours as u32 * 60 + self.minutes as u32
    }
}

impl fmt::Display for RemainingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {:02}m", self.hours, self.minutes)
    }
}

/// A decoded field value, tagged with its semantic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StateValue {
    Percent(u8),
    Watts(u16),
    Switch(bool),
    Duration(RemainingTime),
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Percent(v) => write!(f, "{v}%"),
            StateValue::Watts(v) => write!(f, "{v} W"),
            StateValue::Switch(true) => write!(f, "on"),
            StateValue::Switch(false) => write!(f, "off"),
            StateValue::Duration(t) => write!(f, "{t}"),
        }
    }
}

/// Fields decoded from one notification payload.
///
/// A fresh value is built for every notification. Callers that want a running
/// picture of the device merge successive states themselves with [`DecodedState::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DecodedState {
    fields: BTreeMap<StateField, StateValue>,
}

impl DecodedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: StateField, value: StateValue) -> Option<StateValue> {
        self.fields.insert(field, value)
    }

    pub fn get(&self, field: StateField) -> Option<StateValue> {
        self.fields.get(&field).copied()
    }

    pub fn contains(&self, field: StateField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy every field of `other` into `self`; values from `other` win.
    pub fn merge(&mut self, other: DecodedState) {
        self.fields.extend(other.fields);
    }

    pub fn iter(&self) -> btree_map::Iter<'_, StateField, StateValue> {
        self.fields.iter()
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn charge_level(&self) -> Option<u8> {
        self.percent(StateField::ChargeLevel)
    }

    pub fn charge_threshold_min(&self) -> Option<u8> {
        self.percent(StateField::ChargeThMin)
    }

    pub fn charge_threshold_max(&self) -> Option<u8> {
        self.percent(StateField::ChargeThMax)
    }

    pub fn charge_speed_w(&self) -> Option<u16> {
        self.watts(StateField::ChargeSpeed)
    }

    pub fn ac_input_w(&self) -> Option<u16> {
        self.watts(StateField::AcInput)
    }

    pub fn ac_output_is_on(&self) -> Option<bool> {
        self.switch(StateField::AcOutputIsOn)
    }

    pub fn dc_output_is_on(&self) -> Option<bool> {
        self.switch(StateField::DcOutputIsOn)
    }

    pub fn usb_output_is_on(&self) -> Option<bool> {
        self.switch(StateField::UsbOutputIsOn)
    }

    pub fn remaining_time(&self) -> Option<RemainingTime> {
        match self.get(StateField::RemainingTime) {
            Some(StateValue::Duration(t)) => Some(t),
            _ => None,
        }
    }

    fn percent(&self, field: StateField) -> Option<u8> {
        match self.get(field) {
            Some(StateValue::Percent(v)) => Some(v),
            _ => None,
        }
    }

    fn watts(&self, field: StateField) -> Option<u16> {
        match self.get(field) {
            Some(StateValue::Watts(v)) => Some(v),
            _ => None,
        }
    }

    fn switch(&self, field: StateField) -> Option<bool> {
        match self.get(field) {
            Some(StateValue::Switch(v)) => Some(v),
            _ => None,
        }
    }
}

impl FromIterator<(StateField, StateValue)> for DecodedState {
    fn from_iter<I: IntoIterator<Item = (StateField, StateValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DecodedState {
    type Item = (&'a StateField, &'a StateValue);
    type IntoIter = btree_map::Iter<'a, StateField, StateValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl fmt::Display for DecodedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return write!(f, "(no fields)");
        }
        let mut first = true;
        for (field, value) in &self.fields {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{field}: {value}")?;
            first = false;
        }
        Ok(())
    }
}
