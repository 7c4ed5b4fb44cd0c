mod repo;

pub use repo::{Migratable, Repo, RepoError, SQLikeMigrations};

#[cfg(feature = "postgres")]
mod postgres_repo;

#[cfg(feature = "postgres")]
pub use postgres_repo::{Conn as PostgresRepoConn, Pool as PostgresRepoPool, PostgresRepo};

#[cfg(feature = "postgres")]
pub use diesel_async::AsyncConnection as PostgresRepoAsyncConnection;
