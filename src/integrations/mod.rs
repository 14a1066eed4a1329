//! External service integrations.

pub mod report_client {
    pub use crate::report_client::*;
}

pub mod saver {
    pub use crate::saver::*;
}
