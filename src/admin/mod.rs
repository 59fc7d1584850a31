pub mod topics;

pub use topics::{AdminError, AdminOutcome, TopicAdmin, TopicSpec};
