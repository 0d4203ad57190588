mod channel;
mod notification;

pub use channel::{Handler, NotificationChannel, NotificationProducer, NotificationProducers};
pub use notification::{Notification, ADMIN_AUDIENCE};
