use crate::models::{
    Block, Gender, Location, Match, Profile, ProfileFilter, ProfilePage, SwipeRecord, MIN_LEGAL_AGE,
};
use crate::services::ports::{BlockSource, MatchAuthority, ProfileSource, RemoteError, SwipeAuthority};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use uuid::Uuid;

/// Appwrite API client
///
/// Implements every remote collaborator the engine needs:
/// - Querying candidate profiles (profile directory + geo pre-filter)
/// - Reading and writing swipes (swipe authority)
/// - Writing matches (match authority)
/// - Reading blocks (block source)
pub struct AppwriteClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: AppwriteCollections,
}

/// Collection IDs in Appwrite
#[derive(Debug, Clone)]
pub struct AppwriteCollections {
    pub profiles: String,
    pub swipes: String,
    pub matches: String,
    pub blocks: String,
}

/// Result of a create call that may hit an existing document id
enum Created {
    New,
    AlreadyExists,
}

/// Flat profile document as stored in Appwrite
#[derive(Debug, Deserialize)]
struct ProfileDocument {
    #[serde(rename = "userId")]
    user_id: String,
    name: String,
    #[serde(default)]
    age: Option<u8>,
    #[serde(default)]
    bio: Option<String>,
    gender: Gender,
    #[serde(default)]
    interests: BTreeSet<String>,
    #[serde(default)]
    photos: Vec<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(rename = "lastActive", default)]
    last_active: Option<DateTime<Utc>>,
    #[serde(rename = "isOnline", default)]
    is_online: bool,
}

impl From<ProfileDocument> for Profile {
    fn from(doc: ProfileDocument) -> Self {
        let location = match (doc.latitude, doc.longitude) {
            (Some(latitude), Some(longitude)) => Some(Location {
                latitude,
                longitude,
                city: doc.city,
                country: doc.country,
            }),
            _ => None,
        };

        Profile {
            user_id: doc.user_id,
            name: doc.name,
            age: doc.age,
            bio: doc.bio,
            gender: doc.gender,
            interests: doc.interests,
            photos: doc.photos,
            location,
            last_active: doc.last_active,
            is_online: doc.is_online,
        }
    }
}

/// Match document; unread counters are owned by the chat service
#[derive(Debug, Serialize)]
struct MatchDocument<'a> {
    #[serde(rename = "matchId")]
    match_id: &'a str,
    #[serde(rename = "userA")]
    user_a: &'a str,
    #[serde(rename = "userB")]
    user_b: &'a str,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
}

impl AppwriteClient {
    /// Create a new Appwrite client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: AppwriteCollections,
        request_timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
        })
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            collection
        )
    }

    fn document_url(&self, collection: &str, document_id: &str) -> String {
        format!("{}/{}", self.documents_url(collection), document_id)
    }

    /// Appwrite document ids are limited to 36 characters, so pair keys are
    /// hashed into a name-based UUID
    fn document_id(kind: &str, key: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{}:{}", kind, key).as_bytes()).to_string()
    }

    async fn check_status(response: Response, context: &str) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read body".to_string());
        tracing::debug!("Appwrite {} failed: {} - {}", context, status, body);

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized,
            StatusCode::NOT_FOUND => RemoteError::NotFound(context.to_string()),
            _ => RemoteError::ApiError(format!("Failed to {}: {}", context, status)),
        })
    }

    /// List documents matching the given Appwrite queries
    async fn list_documents(
        &self,
        collection: &str,
        queries: &[String],
    ) -> Result<Vec<Value>, RemoteError> {
        let encoded = queries
            .iter()
            .map(|q| format!("queries[]={}", urlencoding::encode(q)))
            .collect::<Vec<_>>()
            .join("&");
        let url = if encoded.is_empty() {
            self.documents_url(collection)
        } else {
            format!("{}?{}", self.documents_url(collection), encoded)
        };

        let response = self
            .client
            .get(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;
        let response = Self::check_status(response, "list documents").await?;

        let json: Value = response.json().await?;

        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| RemoteError::InvalidResponse("Missing documents array".into()))?;

        // Documents either carry their fields at top level or under "data"
        Ok(documents
            .iter()
            .map(|doc| doc.get("data").unwrap_or(doc).clone())
            .collect())
    }

    async fn get_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Value, RemoteError> {
        let response = self
            .client
            .get(self.document_url(collection, document_id))
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;
        let response = Self::check_status(response, "get document").await?;

        let json: Value = response.json().await?;
        Ok(json.get("data").cloned().unwrap_or(json))
    }

    async fn create_document(
        &self,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> Result<Created, RemoteError> {
        let payload = json!({ "documentId": document_id, "data": data });

        let response = self
            .client
            .post(self.documents_url(collection))
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .json(&payload)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            return Ok(Created::AlreadyExists);
        }
        Self::check_status(response, "create document").await?;
        Ok(Created::New)
    }

    async fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        data: Value,
    ) -> Result<(), RemoteError> {
        let response = self
            .client
            .patch(self.document_url(collection, document_id))
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .json(&json!({ "data": data }))
            .send()
            .await?;
        Self::check_status(response, "update document").await?;
        Ok(())
    }
}

fn profile_queries(filter: &ProfileFilter) -> Vec<String> {
    let mut queries = vec![format!("notEqual(\"userId\", \"{}\")", filter.viewer_id)];

    // Add gender preference filter
    if !filter.genders.is_empty() {
        let gender_filter = filter
            .genders
            .iter()
            .map(|g| format!("\"{}\"", g.as_str()))
            .collect::<Vec<_>>()
            .join(",");
        queries.push(format!("equal(\"gender\", [{}])", gender_filter));
    }

    // Appwrite comparisons never match a null age, and an unset age counts
    // as the legal minimum, so the range is only pushed down when it already
    // rules those profiles out
    if filter.min_age > MIN_LEGAL_AGE {
        queries.push(format!("greaterThanEqual(\"age\", {})", filter.min_age));
        queries.push(format!("lessThanEqual(\"age\", {})", filter.max_age));
    }

    // Add geospatial bounding box filter
    if let Some(bbox) = &filter.bounding_box {
        queries.push(format!("greaterThan(\"latitude\", {})", bbox.min_lat));
        queries.push(format!("lessThan(\"latitude\", {})", bbox.max_lat));
        queries.push(format!("greaterThan(\"longitude\", {})", bbox.min_lon));
        queries.push(format!("lessThan(\"longitude\", {})", bbox.max_lon));
    }

    queries.push("orderDesc(\"lastActive\")".to_string());
    queries.push(format!("limit({})", filter.limit));
    if filter.offset > 0 {
        queries.push(format!("offset({})", filter.offset));
    }
    queries
}

#[async_trait]
impl ProfileSource for AppwriteClient {
    async fn fetch_profiles(&self, filter: &ProfileFilter) -> Result<ProfilePage, RemoteError> {
        let documents = self
            .list_documents(&self.collections.profiles, &profile_queries(filter))
            .await?;
        let has_more = filter.limit > 0 && documents.len() >= filter.limit;

        let profiles: Vec<Profile> = documents
            .into_iter()
            .filter_map(|doc| match serde_json::from_value::<ProfileDocument>(doc) {
                Ok(doc) => Some(Profile::from(doc)),
                Err(e) => {
                    tracing::warn!("Skipping malformed profile document: {}", e);
                    None
                }
            })
            .filter(|p| p.user_id != filter.viewer_id && !filter.exclude_user_ids.contains(&p.user_id))
            .collect();

        tracing::debug!(
            "Fetched {} profiles for {} at offset {}",
            profiles.len(),
            filter.viewer_id,
            filter.offset
        );

        Ok(ProfilePage { profiles, has_more })
    }
}

#[async_trait]
impl SwipeAuthority for AppwriteClient {
    async fn fetch_reciprocal_swipe(
        &self,
        target_id: &str,
        actor_id: &str,
    ) -> Result<Option<SwipeRecord>, RemoteError> {
        let queries = vec![
            format!("equal(\"actorId\", [\"{}\"])", target_id),
            format!("equal(\"targetId\", [\"{}\"])", actor_id),
            "orderDesc(\"timestamp\")".to_string(),
            "limit(1)".to_string(),
        ];

        let documents = self.list_documents(&self.collections.swipes, &queries).await?;

        match documents.into_iter().next() {
            Some(doc) => serde_json::from_value(doc)
                .map(Some)
                .map_err(|e| RemoteError::InvalidResponse(format!("Failed to parse swipe: {}", e))),
            None => Ok(None),
        }
    }

    async fn persist_swipe(&self, record: &SwipeRecord) -> Result<(), RemoteError> {
        let document_id = Self::document_id(
            "swipe",
            &format!("{}:{}", record.actor_id, record.target_id),
        );
        let data = serde_json::to_value(record)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

        match self
            .create_document(&self.collections.swipes, &document_id, data.clone())
            .await?
        {
            Created::New => {}
            Created::AlreadyExists => {
                // Never let a delayed retry overwrite a newer remote decision
                let existing = self
                    .get_document(&self.collections.swipes, &document_id)
                    .await?;
                let newer_remote = serde_json::from_value::<SwipeRecord>(existing)
                    .map(|remote| remote.timestamp > record.timestamp)
                    .unwrap_or(false);

                if newer_remote {
                    tracing::debug!(
                        "Remote swipe {} -> {} is newer, keeping it",
                        record.actor_id,
                        record.target_id
                    );
                    return Ok(());
                }
                self.update_document(&self.collections.swipes, &document_id, data)
                    .await?;
            }
        }

        tracing::debug!("Persisted swipe: {} -> {}", record.actor_id, record.target_id);
        Ok(())
    }
}

#[async_trait]
impl MatchAuthority for AppwriteClient {
    async fn persist_match(&self, m: &Match) -> Result<(), RemoteError> {
        let document = MatchDocument {
            match_id: &m.id,
            user_a: &m.user_a,
            user_b: &m.user_b,
            created_at: m.created_at,
        };
        let data = serde_json::to_value(&document)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

        match self
            .create_document(&self.collections.matches, &Self::document_id("match", &m.id), data)
            .await?
        {
            Created::New => tracing::debug!("Persisted match {}", m.id),
            Created::AlreadyExists => tracing::debug!("Match {} already stored remotely", m.id),
        }

        Ok(())
    }
}

#[async_trait]
impl BlockSource for AppwriteClient {
    async fn current_blocks(&self, user_id: &str) -> Result<HashSet<String>, RemoteError> {
        let by_user = vec![format!("equal(\"blockerId\", [\"{}\"])", user_id)];
        let of_user = vec![format!("equal(\"blockedUserId\", [\"{}\"])", user_id)];

        let mut documents = self.list_documents(&self.collections.blocks, &by_user).await?;
        documents.extend(self.list_documents(&self.collections.blocks, &of_user).await?);

        let blocked: HashSet<String> = documents
            .into_iter()
            .filter_map(|doc| serde_json::from_value::<Block>(doc).ok())
            .filter_map(|block| block.counterpart(user_id).map(str::to_string))
            .collect();

        tracing::debug!("User {} has {} blocks", user_id, blocked.len());
        Ok(blocked)
    }
}
