
pub use mock_devices::*;
pub use mock_signaling::*;
pub use mock_transport::*;
pub use signal_helpers::*;
