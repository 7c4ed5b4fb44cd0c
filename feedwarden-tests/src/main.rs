use feedwarden::{FeedwardenRepo, Migratable, Repo};
use feedwarden_tests::db;

#[tokio::main]
async fn main() {
    db::setup();

    let repo = FeedwardenRepo::new(db::database_url().as_str()).await;
    let pool = repo.get_pool(1).await;
    let mut conn = FeedwardenRepo::get_conn(&pool).await.unwrap();

    FeedwardenRepo::create_feeds_migration(&mut conn).await;
}
