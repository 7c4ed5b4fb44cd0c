use chrono::{DateTime, Utc};

use diesel::{sql_query, ExpressionMethods, QueryDsl};
use diesel_async::{pooled_connection::AsyncDieselConnectionManager, AsyncPgConnection, RunQueryDsl};

use crate::discovery::{Feed, UnsavedFeed};

use super::repo::{Migratable, Repo, RepoError};

pub type Conn<'a> = bb8::PooledConnection<'a, AsyncDieselConnectionManager<AsyncPgConnection>>;
pub type Pool = bb8::Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

#[derive(Clone)]
pub struct PostgresRepo {
    url: String,
}

#[async_trait::async_trait]
impl Repo for PostgresRepo {
    type Pool = Pool;
    type Conn<'a> = Conn<'a>;

    async fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }

    async fn get_pool(&self, max_size: u32) -> Pool {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(self.url.as_str());

        bb8::Pool::builder().max_size(max_size).build_unchecked(manager)
    }

    async fn get_conn<'a>(pool: &'a Pool) -> Result<Conn<'a>, RepoError> {
        pool.get().await.map_err(|error| RepoError::NotConnected(error.to_string()))
    }

    async fn load_discoverable_feeds<'a>(
        conn: &mut Conn<'a>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Feed>, RepoError> {
        use crate::diesel::schema::feeds::dsl::*;

        let mut query = feeds
            .filter(status.eq("active"))
            .filter(ignored.eq(false))
            .filter(aggregator_address.is_not_null())
            .order(created_at.asc())
            .into_boxed();

        if let Some(min_created_at) = since {
            query = query.filter(created_at.gt(min_created_at));
        }

        query
            .load(conn)
            .await
            .map_err(|error| RepoError::QueryFailed(error.to_string()))
    }

    async fn create_feeds<'a>(conn: &mut Conn<'a>, unsaved_feeds: &[UnsavedFeed]) {
        use crate::diesel::schema::feeds::dsl::*;

        diesel::insert_into(feeds)
            .values(unsaved_feeds)
            .on_conflict((chain_id, address))
            .do_nothing()
            .execute(conn)
            .await
            .unwrap();
    }
}

#[async_trait::async_trait]
impl Migratable for PostgresRepo {
    async fn migrate<'a>(
        conn: &mut Conn<'a>,
        migrations: Vec<impl AsRef<str> + Send + Sync>,
    ) {
        for migration in migrations {
            sql_query(migration.as_ref()).execute(conn).await.unwrap();
        }
    }
}
