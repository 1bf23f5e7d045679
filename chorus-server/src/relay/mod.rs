mod negotiator;
mod relay_command;
mod relay_config;
mod relay_event;
mod relay_session;
mod webrtc_negotiator;

pub use negotiator::*;
pub use relay_command::*;
pub use relay_config::*;
pub use relay_event::*;
pub use relay_session::*;
pub use webrtc_negotiator::*;
