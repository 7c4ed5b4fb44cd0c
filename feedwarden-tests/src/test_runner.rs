use crate::db;
use dotenvy::dotenv;
use feedwarden::{
    FeedwardenRepo, FeedwardenRepoAsyncConnection, FeedwardenRepoConn, FeedwardenRepoPool,
    Migratable, Repo,
};
use std::env;
use std::future::Future;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();
}

pub async fn get_pool() -> FeedwardenRepoPool {
    new_repo().await.get_pool(1).await
}

pub async fn run_test<'a, TestFn, Fut>(pool: &'a FeedwardenRepoPool, test_fn: TestFn)
where
    TestFn: Fn(FeedwardenRepoConn<'a>) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut conn = FeedwardenRepo::get_conn(pool).await.unwrap();

    if should_setup_test_db() {
        db::setup();

        FeedwardenRepo::create_feeds_migration(&mut conn).await;
    }

    conn.begin_test_transaction().await.unwrap();

    test_fn(conn).await;
}

pub async fn new_repo() -> FeedwardenRepo {
    FeedwardenRepo::new(db::database_url().as_str()).await
}

fn should_setup_test_db() -> bool {
    dotenv().ok();

    env::var("SETUP_TEST_DB").is_ok()
}
