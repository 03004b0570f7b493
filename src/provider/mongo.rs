//! MongoDB lease provider.
//!
//! One document per lease, keyed by `_id`. Acquisition is a filtered upsert:
//! insert when the document is absent, overwrite when its expiry has passed,
//! and let the unique-index duplicate-key error signal a live holder. That
//! error code is the only condition translated into a denial; everything
//! else the server reports re-propagates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::{Client, Collection};

use crate::error::LeaseError;
use crate::outcome::AcquireOutcome;
use crate::record::{LeaseRecord, LeaseRequest};

use super::LeaseProvider;

const DEFAULT_DATABASE: &str = "leaselock";
const DEFAULT_COLLECTION: &str = "leases";

const ID_FIELD: &str = "_id";
const OWNER_FIELD: &str = "owner";
const ACQUIRED_AT_FIELD: &str = "acquiredAt";
const EXPIRES_AT_FIELD: &str = "expiresAt";

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Lease provider backed by a MongoDB collection.
#[derive(Clone)]
pub struct MongoLeaseProvider {
    collection: Collection<Document>,
}

impl MongoLeaseProvider {
    /// Use the default database and collection names on an existing client.
    pub fn new(client: &Client) -> Self {
        Self::with_names(client, DEFAULT_DATABASE, DEFAULT_COLLECTION)
    }

    pub fn with_names(client: &Client, database: &str, collection: &str) -> Self {
        MongoLeaseProvider {
            collection: client.database(database).collection(collection),
        }
    }

    /// Connect to the given URI and use the default names.
    pub async fn connect(uri: &str) -> Result<Self, LeaseError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| LeaseError::Unavailable(format!("mongodb connection: {}", e)))?;
        Ok(Self::new(&client))
    }
}

#[async_trait]
impl LeaseProvider for MongoLeaseProvider {
    /// Three possible situations:
    /// 1. no lease document yet - the upsert inserts it - granted
    /// 2. the document exists with `expiresAt` in the past - updated - granted
    /// 3. the document exists with `expiresAt` in the future - the upsert
    ///    collides with the `_id` index - denied
    async fn try_acquire(&self, challenger: &LeaseRequest) -> Result<AcquireOutcome, LeaseError> {
        let now = Utc::now();

        match self
            .collection
            .find_one_and_update(acquire_filter(&challenger.name, now), acquire_update(challenger, now))
            .upsert(true)
            .await
        {
            Ok(_) => Ok(AcquireOutcome::Granted(challenger.granted(now))),
            Err(err) if is_duplicate_key(&err) => Ok(AcquireOutcome::Denied {
                reason: Some(format!("a live lease occupies {:?}", challenger.name)),
            }),
            Err(err) => Err(map_error(err)),
        }
    }

    async fn release(&self, record: &LeaseRecord) -> Result<(), LeaseError> {
        self.collection
            .find_one_and_update(
                doc! { ID_FIELD: &record.name },
                doc! { "$set": { EXPIRES_AT_FIELD: bson_time(record.expires_at) } },
            )
            .await
            .map_err(map_error)?;
        Ok(())
    }
}

impl std::fmt::Debug for MongoLeaseProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoLeaseProvider")
            .field("collection", &self.collection.name())
            .finish()
    }
}

fn acquire_filter(name: &str, now: DateTime<Utc>) -> Document {
    doc! {
        ID_FIELD: name,
        EXPIRES_AT_FIELD: { "$lte": bson_time(now) },
    }
}

fn acquire_update(challenger: &LeaseRequest, now: DateTime<Utc>) -> Document {
    doc! {
        "$set": {
            OWNER_FIELD: &challenger.owner,
            ACQUIRED_AT_FIELD: bson_time(now),
            EXPIRES_AT_FIELD: bson_time(challenger.expires_at),
        }
    }
}

/// BSON datetimes carry millisecond precision; that is the declared wire
/// precision for this backend.
fn bson_time(at: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(at.timestamp_millis())
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match &*err.kind {
        ErrorKind::Command(command) => command.code == DUPLICATE_KEY_CODE,
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

fn map_error(err: MongoError) -> LeaseError {
    match &*err.kind {
        ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } | ErrorKind::ConnectionPoolCleared { .. } => {
            LeaseError::Unavailable(err.to_string())
        }
        _ => LeaseError::Protocol(err.to_string()),
    }
}
