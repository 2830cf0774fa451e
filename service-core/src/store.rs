use crate::error::AppError;
use crate::models::{PaymentRecord, PaymentStatus};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    options::{FindOneOptions, FindOptions, IndexOptions, ReplaceOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};

/// Repository over the `payment_requests` collection.
///
/// Both services share this: intake writes records and status updates, the
/// bot resolves the current code from the same collection.
#[derive(Clone)]
pub struct PaymentStore {
    client: MongoClient,
    db: Database,
}

impl PaymentStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to create MongoDB client for {}: {}", uri, e);
            AppError::StoreError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        Ok(Self { client, db })
    }

    /// Index on (status, created_at desc) backing the current-code query.
    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        let status_created_index = IndexModel::builder()
            .keys(doc! { "status": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("status_created_at_idx".to_string())
                    .build(),
            )
            .build();

        self.records()
            .create_index(status_created_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create status/created_at index: {}", e);
                AppError::StoreError(anyhow::anyhow!(e.to_string()))
            })?;

        tracing::info!("Payment store indexes initialized");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::StoreError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }

    pub fn records(&self) -> Collection<PaymentRecord> {
        self.db.collection("payment_requests")
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Full-overwrite upsert keyed by `unique_id`. A second intake with the
    /// same id silently replaces the first document.
    pub async fn upsert(&self, record: &PaymentRecord) -> Result<(), AppError> {
        let options = ReplaceOptions::builder().upsert(true).build();
        self.records()
            .replace_one(doc! { "_id": &record.unique_id }, record, options)
            .await
            .map_err(|e| {
                tracing::error!(unique_id = %record.unique_id, "Failed to save payment record: {}", e);
                AppError::StoreError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }

    pub async fn find_by_id(&self, unique_id: &str) -> Result<Option<PaymentRecord>, AppError> {
        self.records()
            .find_one(doc! { "_id": unique_id }, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to find payment record: {}", e);
                AppError::StoreError(anyhow::anyhow!(e.to_string()))
            })
    }

    /// Update a record's status. Returns `false` when no document matched,
    /// which the confirmation handler reports as a failed update.
    pub async fn update_status(
        &self,
        unique_id: &str,
        status: PaymentStatus,
    ) -> Result<bool, AppError> {
        let now = BsonDateTime::now();

        let mut set = doc! {
            "status": status.as_str(),
            "updated_at": now,
        };
        if status == PaymentStatus::QrGenerated {
            set.insert("qr_generated_at", now);
        }

        let result = self
            .records()
            .update_one(doc! { "_id": unique_id }, doc! { "$set": set }, None)
            .await
            .map_err(|e| {
                tracing::error!(unique_id = %unique_id, "Failed to update payment status: {}", e);
                AppError::StoreError(anyhow::anyhow!(e.to_string()))
            })?;

        Ok(result.matched_count > 0)
    }

    /// The single newest pending record by server-assigned creation time.
    /// Expiry is the caller's concern; only recency and status are queried.
    pub async fn newest_pending(&self) -> Result<Option<PaymentRecord>, AppError> {
        let options = FindOneOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        self.records()
            .find_one(doc! { "status": PaymentStatus::Pending.as_str() }, options)
            .await
            .map_err(|e| {
                tracing::error!("Failed to query newest pending record: {}", e);
                AppError::StoreError(anyhow::anyhow!(e.to_string()))
            })
    }

    /// All records, newest first.
    pub async fn list_all(&self) -> Result<Vec<PaymentRecord>, AppError> {
        let options = FindOptions::builder().sort(doc! { "created_at": -1 }).build();

        let cursor = self.records().find(doc! {}, options).await.map_err(|e| {
            tracing::error!("Failed to list payment records: {}", e);
            AppError::StoreError(anyhow::anyhow!(e.to_string()))
        })?;

        cursor.try_collect().await.map_err(|e| {
            tracing::error!("Failed to collect payment records: {}", e);
            AppError::StoreError(anyhow::anyhow!(e.to_string()))
        })
    }

    /// Cheap connectivity probe: read up to `limit` records.
    pub async fn sample_count(&self, limit: i64) -> Result<usize, AppError> {
        let options = FindOptions::builder().limit(limit).build();
        let cursor = self.records().find(doc! {}, options).await.map_err(|e| {
            tracing::error!("Store connectivity test failed: {}", e);
            AppError::StoreError(anyhow::anyhow!(e.to_string()))
        })?;
        let records: Vec<PaymentRecord> = cursor.try_collect().await.map_err(|e| {
            tracing::error!("Store connectivity test failed: {}", e);
            AppError::StoreError(anyhow::anyhow!(e.to_string()))
        })?;
        Ok(records.len())
    }
}
