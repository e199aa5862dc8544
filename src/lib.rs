mod database {
    pub mod actions;
    pub mod error;
    pub mod schema;
}
mod authentication {
    pub mod permissions;
    pub mod session;
}
mod config;
mod constants;

mod cache {
    pub mod cache;
}

pub use authentication::*;
pub use cache::cache::*;
pub use config::*;
pub use constants::*;
pub use database::*;
