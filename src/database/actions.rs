mod composer;
mod ingredients;
mod recipes;
mod relations;
mod shopping_list;
mod tags;
mod users;

pub use composer::*;
pub use ingredients::*;
pub use recipes::*;
pub use relations::*;
pub use shopping_list::*;
pub use tags::*;
pub use users::*;

use sqlx::{Pool, Postgres};

use crate::error::QueryError;

pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<(), QueryError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| QueryError::new(format!("{e}")))?;

    log::info!("> Database migrations applied");
    Ok(())
}
