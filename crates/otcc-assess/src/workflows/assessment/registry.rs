//! Companies, facilities, and registered documents.
//!
//! Uploading and storing files happens elsewhere; this catalog only keeps the metadata the
//! assessment core reads.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::domain::{CompanyId, Document, DocumentCategory, DocumentId, FacilityId};

pub const MAX_DOCUMENT_BYTES: u64 = 50 * 1024 * 1024;

pub const ALLOWED_MEDIA_TYPES: [&str; 9] = [
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "text/plain",
    "text/markdown",
    "image/png",
    "image/jpeg",
];

/// Keys `Company` writes itself; client copies are dropped from the profile.
const RESERVED_PROFILE_KEYS: [&str; 3] = ["id", "name", "createdAt"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDraft {
    pub name: String,
    /// Any further profile fields (industry, contacts, ...) are kept verbatim.
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityDraft {
    pub company_id: CompanyId,
    pub name: String,
    #[serde(default)]
    pub criticality_level: Option<String>,
    #[serde(default)]
    pub systems: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    pub id: FacilityId,
    pub company_id: CompanyId,
    pub name: String,
    pub criticality_level: Option<String>,
    pub systems: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Metadata for a file the upload layer has already stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    pub company_id: CompanyId,
    pub path: PathBuf,
    pub original_name: String,
    pub size: u64,
    pub mimetype: String,
    #[serde(default)]
    pub category: Option<DocumentCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{0}")]
    Validation(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

impl RegistryError {
    fn company(id: &CompanyId) -> Self {
        Self::NotFound {
            kind: "company",
            id: id.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct Catalog {
    companies: HashMap<CompanyId, Company>,
    facilities: Vec<Facility>,
    documents: Vec<Document>,
}

#[derive(Debug, Default, Clone)]
pub struct CompanyRegistry {
    catalog: Arc<Mutex<Catalog>>,
}

impl CompanyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_company(&self, draft: CompanyDraft) -> Result<Company, RegistryError> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(RegistryError::Validation("company name is required".to_string()));
        }

        let mut profile = draft.profile;
        for key in RESERVED_PROFILE_KEYS {
            if profile.remove(key).is_some() {
                debug!(field = key, "reserved company field ignored in profile");
            }
        }

        let company = Company {
            id: CompanyId::generate(),
            name,
            profile,
            created_at: Utc::now(),
        };

        let mut catalog = self.catalog.lock().expect("registry mutex poisoned");
        catalog.companies.insert(company.id.clone(), company.clone());
        info!(company_id = %company.id, name = %company.name, "company created");
        Ok(company)
    }

    pub fn company(&self, id: &CompanyId) -> Result<Company, RegistryError> {
        let catalog = self.catalog.lock().expect("registry mutex poisoned");
        catalog
            .companies
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::company(id))
    }

    pub fn create_facility(&self, draft: FacilityDraft) -> Result<Facility, RegistryError> {
        if draft.name.trim().is_empty() {
            return Err(RegistryError::Validation("facility name is required".to_string()));
        }

        let mut catalog = self.catalog.lock().expect("registry mutex poisoned");
        if !catalog.companies.contains_key(&draft.company_id) {
            return Err(RegistryError::company(&draft.company_id));
        }

        let facility = Facility {
            id: FacilityId::generate(),
            company_id: draft.company_id,
            name: draft.name.trim().to_string(),
            criticality_level: draft.criticality_level,
            systems: draft.systems,
            created_at: Utc::now(),
        };
        catalog.facilities.push(facility.clone());
        info!(facility_id = %facility.id, company_id = %facility.company_id, "facility created");
        Ok(facility)
    }

    pub fn facilities_for(&self, company_id: &CompanyId) -> Vec<Facility> {
        let catalog = self.catalog.lock().expect("registry mutex poisoned");
        catalog
            .facilities
            .iter()
            .filter(|facility| &facility.company_id == company_id)
            .cloned()
            .collect()
    }

    pub fn register_document(&self, draft: DocumentDraft) -> Result<Document, RegistryError> {
        if !ALLOWED_MEDIA_TYPES.contains(&draft.mimetype.as_str()) {
            return Err(RegistryError::Validation(format!(
                "unsupported media type '{}': only PDF, DOCX, XLSX, TXT, MD, PNG, and JPG files are allowed",
                draft.mimetype
            )));
        }
        if draft.size > MAX_DOCUMENT_BYTES {
            return Err(RegistryError::Validation(format!(
                "'{}' exceeds the 50MB document limit",
                draft.original_name
            )));
        }

        let mut catalog = self.catalog.lock().expect("registry mutex poisoned");
        if !catalog.companies.contains_key(&draft.company_id) {
            return Err(RegistryError::company(&draft.company_id));
        }

        let category = draft
            .category
            .unwrap_or_else(|| DocumentCategory::infer(&draft.original_name));
        let document = Document {
            id: DocumentId::generate(),
            company_id: draft.company_id,
            path: draft.path,
            original_name: draft.original_name,
            size: draft.size,
            mimetype: draft.mimetype,
            category,
            uploaded_at: Utc::now(),
        };
        catalog.documents.push(document.clone());
        info!(
            document_id = %document.id,
            name = %document.original_name,
            category = document.category.label(),
            "document registered"
        );
        Ok(document)
    }

    pub fn document(&self, id: &DocumentId) -> Result<Document, RegistryError> {
        let catalog = self.catalog.lock().expect("registry mutex poisoned");
        catalog
            .documents
            .iter()
            .find(|document| &document.id == id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                kind: "document",
                id: id.to_string(),
            })
    }

    pub fn documents_for(&self, company_id: &CompanyId) -> Vec<Document> {
        let catalog = self.catalog.lock().expect("registry mutex poisoned");
        catalog
            .documents
            .iter()
            .filter(|document| &document.company_id == company_id)
            .cloned()
            .collect()
    }
}
