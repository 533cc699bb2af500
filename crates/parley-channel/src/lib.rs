//! Shared, multiplexed event channel routing inbound events by conversation id

mod channel;
mod subscription;

pub use channel::{ChannelError, EventChannel, Handler};
pub use subscription::Subscription;
