// -
// Operations

pub const SET_COMMAND: &str = "SET";
pub const DEL_COMMAND: &str = "DEL";

// -
// Key layout

/// Separator between table name and key body when none is configured
pub const DEFAULT_TABLE_SEPARATOR: &str = ":";

/// Separator used by configuration-style databases
pub const CONFIG_TABLE_SEPARATOR: &str = "|";

/// Suffix of the per-table notification queue; the queue name is
/// `_{table}_KEY_QUEUE`
pub(crate) const NOTIFICATION_QUEUE_SUFFIX: &str = "_KEY_QUEUE";

/// Suffix of the set of keys currently waiting in a table's queue
pub(crate) const PENDING_SET_SUFFIX: &str = "_KEY_SET";

// -
// Well-known databases

pub const APPL_DB: &str = "APPL_DB";
pub const ASIC_DB: &str = "ASIC_DB";
pub const CONFIG_DB: &str = "CONFIG_DB";
pub const STATE_DB: &str = "STATE_DB";

// -
// Well-known application tables

pub const APP_PORT_TABLE_NAME: &str = "PORT_TABLE";
pub const APP_VLAN_TABLE_NAME: &str = "VLAN_TABLE";
pub const APP_LAG_TABLE_NAME: &str = "LAG_TABLE";
pub const APP_INTF_TABLE_NAME: &str = "INTF_TABLE";
pub const APP_NEIGH_TABLE_NAME: &str = "NEIGH_TABLE";
pub const APP_ROUTE_TABLE_NAME: &str = "ROUTE_TABLE";
pub const APP_QUEUE_TABLE_NAME: &str = "QUEUE_TABLE";
pub const APP_SCHEDULER_TABLE_NAME: &str = "SCHEDULER_TABLE";

// -
// Reactor

/// Size of the counter read from timerfd/eventfd
pub(crate) const COUNTER_SIZE: usize = std::mem::size_of::<u64>();

/// Default database config location
pub const DEFAULT_DB_CONFIG_FILE: &str = "/var/run/state-relay/database_config.json";
