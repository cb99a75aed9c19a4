use sqlx::PgPool;

use super::models::Dive;

const DIVE_COLUMNS: &str = "id, user_id, name, lat, lon, notes, is_public, water_temp_f, created_at";

/// Public dives, newest first, capped at `limit`.
pub async fn list_public_dives(pool: &PgPool, limit: i64) -> Result<Vec<Dive>, sqlx::Error> {
    sqlx::query_as::<_, Dive>(&format!(
        "SELECT {DIVE_COLUMNS} FROM dive WHERE is_public = TRUE ORDER BY created_at DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Every public dive (nearby-spot candidates).
pub async fn all_public_dives(pool: &PgPool) -> Result<Vec<Dive>, sqlx::Error> {
    sqlx::query_as::<_, Dive>(&format!(
        "SELECT {DIVE_COLUMNS} FROM dive WHERE is_public = TRUE"
    ))
    .fetch_all(pool)
    .await
}

/// All dives owned by a user, newest first.
pub async fn dives_by_owner(pool: &PgPool, user_id: i64) -> Result<Vec<Dive>, sqlx::Error> {
    sqlx::query_as::<_, Dive>(&format!(
        "SELECT {DIVE_COLUMNS} FROM dive WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}
