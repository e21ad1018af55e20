use async_trait::async_trait;
use sqlx::PgPool;

use marquee_core::{StoreError, UserStore};
use marquee_shared::pii::Masked;
use marquee_shared::User;

pub struct StoreUserRepository {
    pool: PgPool,
}

impl StoreUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    email: String,
    image_url: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: Masked(row.email),
            image_url: row.image_url,
        }
    }
}

#[async_trait]
impl UserStore for StoreUserRepository {
    async fn upsert(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, image_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                email = EXCLUDED.email,
                image_url = EXCLUDED.image_url,
                updated_at = NOW()
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(user.email.as_inner())
        .bind(&user.image_url)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Transient(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, image_url FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Transient(e.to_string()))?;
        Ok(row.map(User::from))
    }
}
