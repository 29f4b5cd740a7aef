pub mod alert;
pub mod frame;

pub use alert::{AlertMessage, AlertSeverity};
pub use frame::{HEARTBEAT_PING, HEARTBEAT_PONG, is_heartbeat_ack};
