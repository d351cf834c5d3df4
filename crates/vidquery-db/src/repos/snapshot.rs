//! Video snapshot repository

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::{DbResult, DbVideoSnapshot};

const INSERT_CHUNK: usize = 1000;

pub struct SnapshotRepo {
    pool: PgPool,
}

impl SnapshotRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM video_snapshots")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Insert snapshots on an existing connection (usually inside a transaction).
    /// Rows whose id already exists are left untouched. Returns rows inserted.
    pub async fn insert_ignoring_existing(
        conn: &mut PgConnection,
        snapshots: &[DbVideoSnapshot],
    ) -> DbResult<u64> {
        let mut inserted = 0;

        for chunk in snapshots.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO video_snapshots (id, video_id, views_count, likes_count, \
                 comments_count, reports_count, delta_views_count, delta_likes_count, \
                 delta_comments_count, delta_reports_count, created_at, updated_at) ",
            );
            builder.push_values(chunk, |mut row, s| {
                row.push_bind(s.id)
                    .push_bind(s.video_id)
                    .push_bind(s.views_count)
                    .push_bind(s.likes_count)
                    .push_bind(s.comments_count)
                    .push_bind(s.reports_count)
                    .push_bind(s.delta_views_count)
                    .push_bind(s.delta_likes_count)
                    .push_bind(s.delta_comments_count)
                    .push_bind(s.delta_reports_count)
                    .push_bind(s.created_at)
                    .push_bind(s.updated_at);
            });
            builder.push(" ON CONFLICT (id) DO NOTHING");

            let result = builder.build().execute(&mut *conn).await?;
            inserted += result.rows_affected();
        }

        Ok(inserted)
    }
}
