// Domain-layer modules and shared errors/models
pub mod store {
    pub use crate::store::*;
}

pub mod projection {
    pub use crate::projection::*;
}

pub mod controller {
    pub use crate::controller::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
