// Hard caps that keep one tenant or one request from exhausting the server.

pub const MAX_TENANTS: usize = 256;
pub const MAX_TENANT_NAME_LEN: usize = 128;

pub const MAX_ROSTER_SIZE: usize = 10_000;
pub const MAX_NAME_LEN: usize = 128;

pub const MAX_LABEL_LEN: usize = 64;
pub const MAX_REASON_LEN: usize = 128;
pub const MAX_CATALOG_LEN: usize = 1_000;

/// Shift and leave entries combined on one day.
pub const MAX_ENTRIES_PER_DAY: usize = 256;

pub const MAX_PASTE_TARGETS: usize = 400;
