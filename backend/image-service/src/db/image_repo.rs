/// Image repository - Postgres operations for image metadata
use super::ImageRepository;
use crate::error::{AppError, Result};
use crate::models::{Action, Image, ImageStatus};
use async_trait::async_trait;
use resilience::{presets, with_retry};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;

const UPSERT_IMAGE: &str = r#"
    INSERT INTO images (
        id, filename, file_size, raw_image_object_key,
        processed_image_object_key, actions, status
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    ON CONFLICT (id) DO UPDATE SET
        filename = EXCLUDED.filename,
        file_size = EXCLUDED.file_size,
        raw_image_object_key = EXCLUDED.raw_image_object_key,
        processed_image_object_key = EXCLUDED.processed_image_object_key,
        actions = EXCLUDED.actions,
        status = EXCLUDED.status
"#;

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    id: String,
    filename: String,
    file_size: i64,
    raw_image_object_key: String,
    processed_image_object_key: String,
    actions: Json<Vec<Action>>,
    status: String,
}

impl TryFrom<ImageRow> for Image {
    type Error = AppError;

    fn try_from(row: ImageRow) -> Result<Self> {
        let status = ImageStatus::from_str(&row.status).ok_or_else(|| {
            AppError::MetaRead(format!("image {} has unknown status {}", row.id, row.status))
        })?;

        Ok(Image {
            id: row.id,
            filename: row.filename,
            file_size: row.file_size,
            raw_object_key: row.raw_image_object_key,
            processed_object_key: row.processed_image_object_key,
            actions: row.actions.0,
            status,
        })
    }
}

/// Writes go to the master pool; reads go to the replica when one is configured
#[derive(Clone)]
pub struct PgImageRepository {
    master: PgPool,
    replica: Option<PgPool>,
}

impl PgImageRepository {
    pub fn new(master: PgPool, replica: Option<PgPool>) -> Self {
        Self { master, replica }
    }

    fn read_pool(&self) -> &PgPool {
        self.replica.as_ref().unwrap_or(&self.master)
    }
}

#[async_trait]
impl ImageRepository for PgImageRepository {
    async fn save(&self, image: &Image) -> Result<()> {
        let pool = &self.master;

        with_retry(presets::metadata_write(), || async move {
            sqlx::query(UPSERT_IMAGE)
                .bind(&image.id)
                .bind(&image.filename)
                .bind(image.file_size)
                .bind(&image.raw_object_key)
                .bind(&image.processed_object_key)
                .bind(Json(image.actions.clone()))
                .bind(image.status.as_str())
                .execute(pool)
                .await
        })
        .await
        .map_err(|e| AppError::MetaWrite(e.to_string()))?;

        debug!(image_id = %image.id, "Image metadata saved");
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Image> {
        let row = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT id, filename, file_size, raw_image_object_key,
                   processed_image_object_key, actions, status
            FROM images
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.read_pool())
        .await
        .map_err(|e| AppError::MetaRead(e.to_string()))?;

        match row {
            Some(row) => row.try_into(),
            None => Err(AppError::NotFound(format!("image {}", id))),
        }
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        let pool = &self.master;

        let result = with_retry(presets::metadata_write(), || async move {
            sqlx::query("DELETE FROM images WHERE id = $1")
                .bind(id)
                .execute(pool)
                .await
        })
        .await
        .map_err(|e| AppError::MetaWrite(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("image {}", id)));
        }

        debug!(image_id = %id, "Image metadata deleted");
        Ok(())
    }

    async fn update_processed(&self, id: &str, processed_key: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE images
            SET status = $2, processed_image_object_key = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(ImageStatus::Done.as_str())
        .bind(processed_key)
        .execute(&self.master)
        .await
        .map_err(|e| AppError::MetaWrite(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("image {}", id)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> ImageRow {
        ImageRow {
            id: "abc".into(),
            filename: "cat.png".into(),
            file_size: 2048,
            raw_image_object_key: "raw/abc/1".into(),
            processed_image_object_key: String::new(),
            actions: Json(vec![Action::Grayscale, Action::Resize]),
            status: status.into(),
        }
    }

    #[test]
    fn test_row_conversion_keeps_action_order() {
        let image: Image = row("Pending").try_into().unwrap();
        assert_eq!(image.status, ImageStatus::Pending);
        assert_eq!(image.actions, vec![Action::Grayscale, Action::Resize]);
        assert_eq!(image.raw_object_key, "raw/abc/1");
    }

    #[test]
    fn test_row_with_unknown_status_is_read_error() {
        let result: Result<Image> = row("Archived").try_into();
        assert!(matches!(result, Err(AppError::MetaRead(_))));
    }
}
