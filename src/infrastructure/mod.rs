pub mod hid;
pub mod logging;
pub mod sensor;
