use async_trait::async_trait;
use cas_client_sdk::{PgtMapping, PgtStore, StoreError};
use sea_orm::sea_query::{OnConflict, Query};
use sea_orm::{
    ActiveValue, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter,
};
use sea_orm_migration::MigratorTrait;
use secrecy::{ExposeSecret, SecretString};
use time::OffsetDateTime;

use super::entity::{self, Entity as PgtEntity};
use super::migrations::Migrator;

/// Map database errors to store errors.
fn map_db_error(e: DbErr) -> StoreError {
    match e {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => StoreError::Unavailable(e.to_string()),
        other => StoreError::Internal(format!("database error: {other}")),
    }
}

/// Relational PGT store shared by every instance of the application.
pub struct SeaOrmPgtStore {
    db: DatabaseConnection,
}

impl SeaOrmPgtStore {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Connect and bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Connection or migration failures.
    pub async fn connect(options: impl Into<ConnectOptions>) -> Result<Self, DbErr> {
        let db = Database::connect(options).await?;
        Migrator::up(&db, None).await?;
        Ok(Self::new(db))
    }

    /// Delete mappings stored before `cutoff` that no login ever claimed.
    ///
    /// # Errors
    ///
    /// Database failures.
    pub async fn purge_older_than(&self, cutoff: OffsetDateTime) -> Result<u64, StoreError> {
        let res = PgtEntity::delete_many()
            .filter(entity::Column::CreatedAt.lt(cutoff))
            .exec(&self.db)
            .await
            .map_err(map_db_error)?;
        Ok(res.rows_affected)
    }

    /// Single `DELETE ... RETURNING` statement, so concurrent takers of the
    /// same IOU cannot both see the row.
    async fn take_returning(&self, pgt_iou: &str) -> Result<Option<String>, DbErr> {
        let backend = self.db.get_database_backend();
        let stmt = Query::delete()
            .from_table(PgtEntity)
            .and_where(entity::Column::PgtIou.eq(pgt_iou))
            .returning_col(entity::Column::Pgt)
            .to_owned();
        let row = self.db.query_one(backend.build(&stmt)).await?;
        row.map(|r| r.try_get::<String>("", "pgt")).transpose()
    }
}

#[async_trait]
impl PgtStore for SeaOrmPgtStore {
    async fn save(&self, mapping: PgtMapping) -> Result<(), StoreError> {
        let (pgt_iou, pgt) = mapping.into_parts();
        let model = entity::ActiveModel {
            pgt_iou: ActiveValue::Set(pgt_iou),
            pgt: ActiveValue::Set(pgt.expose_secret().to_owned()),
            created_at: ActiveValue::Set(OffsetDateTime::now_utc()),
        };

        let on_conflict = OnConflict::column(entity::Column::PgtIou)
            .update_columns([entity::Column::Pgt, entity::Column::CreatedAt])
            .to_owned();

        PgtEntity::insert(model)
            .on_conflict(on_conflict)
            .exec_without_returning(&self.db)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    async fn take(&self, pgt_iou: &str) -> Result<Option<SecretString>, StoreError> {
        let pgt = self.take_returning(pgt_iou).await.map_err(map_db_error)?;
        Ok(pgt.map(SecretString::from))
    }
}
