//! Store queries against a live `PostgreSQL` + `PostGIS` database.
//!
//! These run the SQL side of search, nearby, tag and rating aggregation that
//! the in-memory backend does in Rust. Point `DELICIOUS_TEST_DATABASE_URL` at
//! a scratch database (it is truncated) and run with `--ignored`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use secrecy::SecretString;
use sqlx::PgPool;
use tokio::sync::{Mutex, MutexGuard};

use delicious_core::{Email, StoreId, UserId};
use delicious_web::db::{Repositories, create_pool};
use delicious_web::models::Populate;
use delicious_web::services::stores::{StoreInput, StoreService};

const TORONTO: (f64, f64) = (-79.3832, 43.6532);

/// Tests share one database; each holds this while it runs.
static DATABASE: Mutex<()> = Mutex::const_new(());

struct PgContext {
    repos: Repositories,
    author: UserId,
    _guard: MutexGuard<'static, ()>,
}

impl PgContext {
    /// Migrate, empty the tables and create one author.
    async fn new() -> Self {
        let guard = DATABASE.lock().await;
        let url = std::env::var("DELICIOUS_TEST_DATABASE_URL")
            .expect("DELICIOUS_TEST_DATABASE_URL must point at a scratch database");
        let pool: PgPool = create_pool(&SecretString::from(url)).await.unwrap();

        sqlx::migrate!("../web/migrations").run(&pool).await.unwrap();
        sqlx::query(
            "TRUNCATE delicious.review, delicious.store, delicious.user RESTART IDENTITY CASCADE",
        )
        .execute(&pool)
        .await
        .unwrap();

        let repos = Repositories::postgres(pool);
        let author = repos
            .users
            .create("Wes", &Email::parse("wes@example.com").unwrap(), "hash")
            .await
            .unwrap()
            .id;

        Self {
            repos,
            author,
            _guard: guard,
        }
    }

    fn service(&self) -> StoreService<'_> {
        StoreService::new(&self.repos)
    }

    async fn add_store(
        &self,
        name: &str,
        description: &str,
        tags: &[&str],
        (lng, lat): (f64, f64),
    ) -> StoreId {
        let input = StoreInput {
            name: name.to_owned(),
            description: description.to_owned(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            address: format!("{name} Street"),
            lng: Some(lng.to_string()),
            lat: Some(lat.to_string()),
        };
        self.service()
            .create(self.author, &input, None)
            .await
            .unwrap()
            .id
    }

    async fn review(&self, store: StoreId, ratings: &[i64]) {
        for &rating in ratings {
            self.service()
                .add_review(self.author, store, "Worth the trip", Some(rating))
                .await
                .unwrap();
        }
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL with PostGIS"]
async fn test_search_matches_any_term_and_ranks_names_first() {
    let ctx = PgContext::new().await;
    ctx.add_store("Coffee Corner", "Espresso bar", &[], TORONTO).await;
    ctx.add_store("Tea House", "Loose leaf tea and some coffee", &[], TORONTO)
        .await;
    ctx.add_store("Bike Shop", "Tune ups and repairs", &[], TORONTO)
        .await;
    ctx.add_store("Bookstore", "Used paperbacks", &[], TORONTO).await;

    let found = ctx.service().search("coffee repairs").await.unwrap();
    let slugs: Vec<&str> = found.iter().map(|s| s.slug.as_str()).collect();

    assert_eq!(slugs.len(), 3);
    assert_eq!(slugs[0], "coffee-corner");
    assert!(slugs.contains(&"tea-house"));
    assert!(slugs.contains(&"bike-shop"));

    assert!(ctx.service().search("zeppelin").await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL with PostGIS"]
async fn test_near_is_radius_bounded_and_nearest_first() {
    let ctx = PgContext::new().await;
    let (lng, lat) = TORONTO;
    ctx.add_store("Hamilton Diner", "", &[], (-79.8711, 43.2557)).await;
    ctx.add_store("Two Km Cafe", "", &[], (lng + 0.025, lat)).await;
    ctx.add_store("Next Door Deli", "", &[], (lng + 0.003, lat)).await;

    let (lng_text, lat_text) = (lng.to_string(), lat.to_string());
    let nearby = ctx
        .service()
        .near(Some(lng_text.as_str()), Some(lat_text.as_str()))
        .await
        .unwrap();
    let slugs: Vec<&str> = nearby.iter().map(|s| s.slug.as_str()).collect();

    assert_eq!(slugs, vec!["next-door-deli", "two-km-cafe"]);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL with PostGIS"]
async fn test_tag_counts_break_ties_by_tag() {
    let ctx = PgContext::new().await;
    ctx.add_store("Alpha", "", &["Wifi", "Licensed"], TORONTO).await;
    ctx.add_store("Bravo", "", &["Licensed", "Wifi", "Vegetarian"], TORONTO)
        .await;
    ctx.add_store("Charlie", "", &["Open Late"], TORONTO).await;
    ctx.add_store("Delta", "", &[], TORONTO).await;

    let page = ctx.service().tags_page(None, Populate::None).await.unwrap();
    let counts: Vec<(&str, u64)> = page
        .tags
        .iter()
        .map(|t| (t.tag.as_str(), t.count))
        .collect();
    assert_eq!(
        counts,
        vec![("Licensed", 2), ("Wifi", 2), ("Open Late", 1), ("Vegetarian", 1)]
    );
    // untagged stores are left out of the unfiltered list
    assert_eq!(page.stores.len(), 3);

    let wifi = ctx
        .service()
        .tags_page(Some("Wifi"), Populate::None)
        .await
        .unwrap();
    assert_eq!(wifi.stores.len(), 2);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL with PostGIS"]
async fn test_top_rated_needs_two_reviews_and_breaks_ties_by_id() {
    let ctx = PgContext::new().await;
    let first = ctx.add_store("First", "", &[], TORONTO).await;
    let single = ctx.add_store("Single", "", &[], TORONTO).await;
    let second = ctx.add_store("Second", "", &[], TORONTO).await;
    let steady = ctx.add_store("Steady", "", &[], TORONTO).await;
    ctx.add_store("Unreviewed", "", &[], TORONTO).await;

    ctx.review(first, &[5, 4]).await;
    ctx.review(single, &[5]).await;
    ctx.review(second, &[4, 5]).await;
    ctx.review(steady, &[3, 3, 3]).await;

    let top = ctx.service().top_rated().await.unwrap();
    let rows: Vec<(StoreId, i64)> = top.iter().map(|s| (s.id, s.review_count)).collect();

    assert_eq!(rows, vec![(first, 2), (second, 2), (steady, 3)]);
    assert!((top[0].average_rating - 4.5).abs() < f64::EPSILON);
    assert!((top[2].average_rating - 3.0).abs() < f64::EPSILON);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL with PostGIS"]
async fn test_heart_toggle_and_huge_page_numbers() {
    let ctx = PgContext::new().await;
    let store = ctx.add_store("Hearted", "", &[], TORONTO).await;

    let once = ctx.service().toggle_heart(ctx.author, store).await.unwrap();
    assert!(once.hearts.contains(store));
    let twice = ctx.service().toggle_heart(ctx.author, store).await.unwrap();
    assert!(!twice.hearts.contains(store));

    let page = ctx
        .service()
        .list_page(u64::MAX, Populate::None)
        .await
        .unwrap();
    assert_eq!(page.page.number, 1);
    assert!(page.page.clamped);
    assert_eq!(page.stores.len(), 1);
}
