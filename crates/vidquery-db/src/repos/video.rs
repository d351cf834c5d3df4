//! Video repository

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::{DbResult, DbVideo};

/// Rows per multi-row INSERT; keeps bind parameters well under the protocol limit
const INSERT_CHUNK: usize = 1000;

pub struct VideoRepo {
    pool: PgPool,
}

impl VideoRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM videos")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Insert videos on an existing connection (usually inside a transaction).
    /// Rows whose id already exists are left untouched. Returns rows inserted.
    pub async fn insert_ignoring_existing(
        conn: &mut PgConnection,
        videos: &[DbVideo],
    ) -> DbResult<u64> {
        let mut inserted = 0;

        for chunk in videos.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO videos (id, creator_id, video_created_at, views_count, likes_count, \
                 comments_count, reports_count, created_at, updated_at) ",
            );
            builder.push_values(chunk, |mut row, v| {
                row.push_bind(v.id)
                    .push_bind(v.creator_id)
                    .push_bind(v.video_created_at)
                    .push_bind(v.views_count)
                    .push_bind(v.likes_count)
                    .push_bind(v.comments_count)
                    .push_bind(v.reports_count)
                    .push_bind(v.created_at)
                    .push_bind(v.updated_at);
            });
            builder.push(" ON CONFLICT (id) DO NOTHING");

            let result = builder.build().execute(&mut *conn).await?;
            inserted += result.rows_affected();
        }

        Ok(inserted)
    }
}
