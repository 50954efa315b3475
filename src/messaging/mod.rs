// Messaging - Lock-free channels into and out of the engine thread

pub mod channels;
pub mod command;
pub mod notification;

pub use channels::{
    CommandConsumer, CommandProducer, NotificationConsumer, NotificationProducer,
    create_command_channel, create_notification_channel, push_until,
};
pub use command::Command;
pub use notification::{Notification, NotificationCategory, NotificationLevel};
