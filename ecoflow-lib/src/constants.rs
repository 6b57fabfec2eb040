// Protocol constants for the EcoFlow Delta 2 BLE link

/// GATT characteristic handle that accepts circuit commands
pub const COMMAND_CHAR_HANDLE: u16 = 0x0029;

/// GATT characteristic handle that emits state notifications
pub const STATE_CHAR_HANDLE: u16 = 0x002b;

/// Marker at the start of every page
pub const PAGE_MAGIC: [u8; 2] = [0xAA, 0x02];

/// Offset of the page type code (right after the magic)
pub const PAGE_TYPE_OFFSET: usize = 2;

/// Minimum size of a 0x85 status page
pub const STATUS_PAGE_SIZE: usize = 138;

/// Minimum size of a 0x5e charge rate page
pub const CHARGE_RATE_PAGE_SIZE: usize = 91;

/// Minimum size of a 0x2e settings page
pub const SETTINGS_PAGE_SIZE: usize = 60;

/// Highest valid charge threshold, in percent
pub const MAX_PERCENT: u8 = 100;
