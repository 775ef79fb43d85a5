use std::sync::Arc;

use crate::app::{clock::Clock, db::DbPool};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(db_pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { db_pool, clock }
    }
}
