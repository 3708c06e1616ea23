pub use diesel;

pub mod adapters;
pub mod models;

mod schema;

use anyhow::Context;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

const CIRCULATION_DATABASE: &str = "circulation_database";

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Handle to the circulation store. Cheap to clone, all clones share one pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool<ConnectionManager<SqliteConnection>>,
}

impl Database {
    /// Opens the database (creating the file if needed) and brings the schema
    /// up to date.
    pub fn connect(database_url: &str) -> anyhow::Result<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .with_context(|| format!("Failed to open connection pool for {database_url}"))?;
        let database = Self { pool };
        let mut conn = database.conn()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| anyhow::anyhow!("Failed to run migrations: {err}"))?;
        Ok(database)
    }

    pub fn conn(&self) -> anyhow::Result<DbConnection> {
        self.pool
            .get()
            .context("Failed to get a database connection from the pool")
    }
}
