pub mod factory;
pub mod http;
pub mod opera;
pub mod oracle_ohip;
pub mod rooms;
pub mod wire;

pub use factory::{authenticate_all, build_adapter, build_adapters, AdapterSettings, ConfiguredProvider};
pub use opera::OperaAdapter;
pub use oracle_ohip::OracleOhipAdapter;
