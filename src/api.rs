//! HTTP wire types
//!
//! Request and response bodies for the `/api` surface. Resources themselves
//! serialize directly from [`Resource`].

use serde::{Deserialize, Serialize};

use crate::resource::Resource;

/// Body of `GET /api/resources`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListResponse {
    /// `{count, message, data}`
    Envelope(ResourceEnvelope),
    /// Bare array, for clients that predate the envelope
    Legacy(Vec<Resource>),
}

impl ListResponse {
    /// Build the configured shape
    pub fn new(resources: Vec<Resource>, message: String, legacy: bool) -> Self {
        if legacy {
            Self::Legacy(resources)
        } else {
            Self::Envelope(ResourceEnvelope {
                count: resources.len(),
                message,
                data: resources,
            })
        }
    }

    /// The listed resources, whatever the shape
    pub fn resources(&self) -> &[Resource] {
        match self {
            Self::Envelope(envelope) => &envelope.data,
            Self::Legacy(resources) => resources,
        }
    }
}

/// Listing with the classifier's message attached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceEnvelope {
    pub count: usize,
    pub message: String,
    pub data: Vec<Resource>,
}

/// Body of `POST /api/auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Plain acknowledgement, e.g. after a delete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
