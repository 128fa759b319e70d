#![allow(dead_code)]

use chrono::{DateTime, Utc};
use std::path::Path;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{Credits, Engine};
use migration::MigratorTrait;

pub async fn migrated_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

/// A SQLite file under `dir` behind a pool of several connections.
pub async fn pooled_file_db(dir: &Path) -> DatabaseConnection {
    let url = format!("sqlite://{}?mode=rwc", dir.join("packdesk.db").display());
    let mut options = ConnectOptions::new(url);
    options.max_connections(4).min_connections(2);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = migrated_db().await;
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

/// Creates a user holding `balance` whole credits.
pub async fn user_with_balance(engine: &Engine, username: &str, balance: i64) -> i64 {
    let user = engine
        .create_user(username, &username.to_uppercase(), None)
        .await
        .unwrap();
    if balance > 0 {
        engine
            .purchase_credits(user.id, Credits::whole(balance))
            .await
            .unwrap();
    }
    user.id
}

pub async fn count(db: &DatabaseConnection, sql: &str, values: Vec<sea_orm::Value>) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_sql_and_values(backend, sql, values))
        .await
        .unwrap()
        .unwrap();
    row.try_get_by_index::<i64>(0).unwrap()
}

pub async fn insert_support_request(
    db: &DatabaseConnection,
    storefront_id: i64,
    user_id: i64,
    store_name: &str,
    status: &str,
    created_at: DateTime<Utc>,
) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO storefront_support_requests \
         (storefront_id, user_id, software_name, store_name, welcome_message, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            storefront_id.into(),
            user_id.into(),
            "Analytics Desktop".into(),
            store_name.into(),
            "welcome".into(),
            status.into(),
            created_at.into(),
            created_at.into(),
        ],
    ))
    .await
    .unwrap();
}
