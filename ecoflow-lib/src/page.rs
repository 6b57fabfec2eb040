//! Telemetry page splitting and decoding.
//!
//! A state notification carries one or more pages back to back. Every page
//! starts with [`PAGE_MAGIC`] followed by a one byte type code; the rest is a
//! fixed layout that depends on the type. There is no length prefix, so page
//! boundaries are recovered from the position of the next magic marker.

use crate::constants::{
    CHARGE_RATE_PAGE_SIZE, MAX_PERCENT, PAGE_MAGIC, PAGE_TYPE_OFFSET, SETTINGS_PAGE_SIZE, STATUS_PAGE_SIZE,
};
use crate::error::{EcoflowError, Result};
use crate::state::{DecodedState, RemainingTime, StateField, StateValue};
use bytes::Bytes;
use num_enum::{FromPrimitive, IntoPrimitive};
use std::mem::size_of;
use tracing::{debug, warn};
use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum PageType {
    /// Charge level, output switches and AC input power
    Status = 0x85,
    /// Charging power
    ChargeRate = 0x5e,
    /// Charge thresholds and remaining time
    Settings = 0x2e,

    #[num_enum(catch_all)]
    Unknown(u8),
}

impl PageType {
    /// Read the type code of a page, if the page is long enough to have one.
    pub fn of(page: &[u8]) -> Option<Self> {
        page.get(PAGE_TYPE_OFFSET).map(|&code| PageType::from_primitive(code))
    }

    pub fn code(self) -> u8 {
        self.into()
    }

    /// Decode the fields of a page of this type.
    ///
    /// Unknown pages and the boot-time settings glitch produce an empty state;
    /// pages shorter than their layout produce [`EcoflowError::PageTooShort`].
    pub fn decode(self, page: &[u8]) -> Result<DecodedState> {
        match self {
            PageType::Status => decode_status(page),
            PageType::ChargeRate => decode_charge_rate(page),
            PageType::Settings => decode_settings(page),
            PageType::Unknown(code) => {
                warn!("skipped a data page {code:#04x}");
                Ok(DecodedState::new())
            }
        }
    }
}

/// Layout of the 0x85 status page.
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct StatusPageRaw {
    _head: [u8; 30],
    charge_level: u8, // Percent
    _reserved0: [u8; 2],
    ac_input_w: U16, // Watts
    _reserved1: [u8; 5],
    usb_output: u8,
    _reserved2: [u8; 8],
    dc_output: u8,
    _reserved3: [u8; 86],
    ac_output: u8,
    _tail: u8,
}

/// Layout of the 0x5e charge rate page.
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct ChargeRatePageRaw {
    _head: [u8; 89],
    charge_speed_w: U16, // Watts
}

/// Layout of the 0x2e settings page.
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct SettingsPageRaw {
    _head: [u8; 28],
    charge_th_max: u8, // Percent
    _reserved0: [u8; 4],
    remaining_min: U16, // Minutes
    _reserved1: [u8; 24],
    charge_th_min: u8, // Percent
}

const _: () = assert!(size_of::<StatusPageRaw>() == STATUS_PAGE_SIZE);
const _: () = assert!(size_of::<ChargeRatePageRaw>() == CHARGE_RATE_PAGE_SIZE);
const _: () = assert!(size_of::<SettingsPageRaw>() == SETTINGS_PAGE_SIZE);

fn layout<T>(page: &[u8], page_type: PageType) -> Result<&T>
where
    T: FromBytes + KnownLayout + Immutable,
{
    T::ref_from_prefix(page)
        .map(|(raw, _rest)| raw)
        .map_err(|_| EcoflowError::PageTooShort {
            page_type: page_type.code(),
            expected: size_of::<T>(),
            actual: page.len(),
        })
}

fn decode_status(page: &[u8]) -> Result<DecodedState> {
    let raw: &StatusPageRaw = layout(page, PageType::Status)?;

    Ok(DecodedState::from_iter([
        (StateField::ChargeLevel, StateValue::Percent(raw.charge_level)),
        (StateField::AcOutputIsOn, StateValue::Switch(raw.ac_output != 0)),
        (StateField::DcOutputIsOn, StateValue::Switch(raw.dc_output != 0)),
        (StateField::UsbOutputIsOn, StateValue::Switch(raw.usb_output != 0)),
        (StateField::AcInput, StateValue::Watts(raw.ac_input_w.get())),
    ]))
}

fn decode_charge_rate(page: &[u8]) -> Result<DecodedState> {
    let raw: &ChargeRatePageRaw = layout(page, PageType::ChargeRate)?;

    Ok(DecodedState::from_iter([(
        StateField::ChargeSpeed,
        StateValue::Watts(raw.charge_speed_w.get()),
    )]))
}

fn decode_settings(page: &[u8]) -> Result<DecodedState> {
    let raw: &SettingsPageRaw = layout(page, PageType::Settings)?;

    // For several seconds after power-on the device sends this page with a
    // different structure; the minimum threshold is then out of range.
    if raw.charge_th_min > MAX_PERCENT {
        debug!(
            charge_th_min = raw.charge_th_min,
            "ignoring settings page with out of range threshold"
        );
        return Ok(DecodedState::new());
    }

    let remaining = RemainingTime::from_minutes(raw.remaining_min.get());
    Ok(DecodedState::from_iter([
        (StateField::ChargeThMin, StateValue::Percent(raw.charge_th_min)),
        (StateField::ChargeThMax, StateValue::Percent(raw.charge_th_max)),
        (StateField::RemainingTime, StateValue::Duration(remaining)),
    ]))
}

/// Decode a single page, logging and discarding any failure.
///
/// Never fails: a page that cannot be decoded contributes no fields, so one
/// bad page cannot hide the others of the same notification.
pub fn decode_page(page: &[u8]) -> DecodedState {
    let Some(page_type) = PageType::of(page) else {
        let err = EcoflowError::MissingPageType(page.len());
        warn!(data = %hex::encode(page), "could not parse a page: {err}");
        return DecodedState::new();
    };

    debug!(page_type = page_type.code(), len = page.len(), "decoding page");
    match page_type.decode(page) {
        Ok(state) => state,
        Err(err) => {
            warn!(
                page_type = page_type.code(),
                data = %hex::encode(page),
                "could not parse a page: {err}"
            );
            DecodedState::new()
        }
    }
}

/// Split a notification payload into pages, in arrival order.
///
/// Works right to left: the last magic marker in the unconsumed prefix starts
/// the last page, which runs to the end of what remains. Bytes before the first
/// marker form a page of their own. The output concatenates back to `data`.
///
/// Boundaries are wrong if the marker bytes happen to occur inside a page's
/// field data; the protocol gives nothing better to split on.
pub fn split_pages(data: &Bytes) -> Vec<Bytes> {
    let mut pages = Vec::new();
    let mut end = data.len();

    while end > 0 {
        let start = find_last_magic(&data[..end]).unwrap_or(0);
        pages.push(data.slice(start..end));
        end = start;
    }

    pages.reverse();
    pages
}

fn find_last_magic(data: &[u8]) -> Option<usize> {
    data.windows(PAGE_MAGIC.len()).rposition(|window| window == PAGE_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_last_magic() {
        assert_eq!(find_last_magic(&[]), None);
        assert_eq!(find_last_magic(&[0xaa]), None);
        assert_eq!(find_last_magic(&[0xaa, 0x02]), Some(0));
        assert_eq!(find_last_magic(&[0xaa, 0x02, 0x85, 0xaa, 0x02, 0x5e]), Some(3));
        assert_eq!(find_last_magic(&[0x02, 0xaa]), None);
    }

    #[test]
    fn test_page_type_codes() {
        assert_eq!(PageType::from_primitive(0x85), PageType::Status);
        assert_eq!(PageType::from_primitive(0x5e), PageType::ChargeRate);
        assert_eq!(PageType::from_primitive(0x2e), PageType::Settings);
        assert_eq!(PageType::from_primitive(0x13), PageType::Unknown(0x13));
        assert_eq!(PageType::Unknown(0x13).code(), 0x13);
        assert_eq!(PageType::of(&[0xaa, 0x02]), None);
        assert_eq!(PageType::of(&[0xaa, 0x02, 0x85]), Some(PageType::Status));
    }

    #[test]
    fn test_short_page_is_an_error() {
        let mut page = vec![0u8; STATUS_PAGE_SIZE - 1];
        page[..3].copy_from_slice(&[0xaa, 0x02, 0x85]);

        match PageType::Status.decode(&page) {
            Err(EcoflowError::PageTooShort {
                page_type,
                expected,
                actual,
            }) => {
                assert_eq!(page_type, 0x85);
                assert_eq!(expected, STATUS_PAGE_SIZE);
                assert_eq!(actual, STATUS_PAGE_SIZE - 1);
            }
            other => panic!("Expected PageTooShort, got {:?}", other),
        }

        assert!(decode_page(&page).is_empty());
    }
}
