//! Document references and subject context.

use serde::{Deserialize, Serialize};

use crate::types::claim::{Criticality, SchemaKind};

/// What kind of document this is, which selects the extraction schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Regulatory filing (10-K style); yields metrics.
    Filing,

    /// Legislative bill; yields legislative impacts.
    Bill,

    /// Text describing the subject's supply chain; yields suppliers.
    SupplierProfile,
}

impl DocumentKind {
    /// The schema used to extract claims from this kind of document.
    pub fn schema_kind(self) -> SchemaKind {
        match self {
            Self::Filing => SchemaKind::Metric,
            Self::Bill => SchemaKind::LegislativeImpact,
            Self::SupplierProfile => SchemaKind::Supplier,
        }
    }

    /// Processing priority; supplier profiles feed the context of later documents.
    pub(crate) fn priority(self) -> u8 {
        match self {
            Self::SupplierProfile => 0,
            Self::Filing => 1,
            Self::Bill => 2,
        }
    }
}

/// A reference to a document the pipeline should analyze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Display name, recorded on every claim extracted from this document.
    pub name: String,

    /// Opaque reference handed to the document source (path, key, URL).
    pub source_ref: String,

    /// Document kind
    pub kind: DocumentKind,
}

impl DocumentRef {
    /// Create a new document reference.
    pub fn new(name: impl Into<String>, source_ref: impl Into<String>, kind: DocumentKind) -> Self {
        Self {
            name: name.into(),
            source_ref: source_ref.into(),
            kind,
        }
    }

    /// A bill whose name is derived from its reference.
    pub fn bill(source_ref: impl Into<String>) -> Self {
        let source_ref = source_ref.into();
        Self::new(display_name(&source_ref), source_ref, DocumentKind::Bill)
    }

    /// A filing whose name is derived from its reference.
    pub fn filing(source_ref: impl Into<String>) -> Self {
        let source_ref = source_ref.into();
        Self::new(display_name(&source_ref), source_ref, DocumentKind::Filing)
    }

    /// A supplier profile whose name is derived from its reference.
    pub fn supplier_profile(source_ref: impl Into<String>) -> Self {
        let source_ref = source_ref.into();
        Self::new(
            display_name(&source_ref),
            source_ref,
            DocumentKind::SupplierProfile,
        )
    }
}

/// Last path segment of a reference, or the whole reference.
fn display_name(source_ref: &str) -> String {
    source_ref
        .rsplit(|c: char| c == '/' || c == '\\')
        .find(|s| !s.is_empty())
        .unwrap_or(source_ref)
        .to_string()
}

/// An entity related to the subject, used as prompt context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownEntity {
    pub name: String,

    #[serde(default)]
    pub country: Option<String>,

    #[serde(default)]
    pub criticality: Criticality,
}

impl KnownEntity {
    /// Create a new known entity.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            country: None,
            criticality: Criticality::default(),
        }
    }

    /// Set the country.
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Set the criticality.
    pub fn with_criticality(mut self, criticality: Criticality) -> Self {
        self.criticality = criticality;
        self
    }
}

/// Domain hints for the extractor about the subject under analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectContext {
    /// Subject display name (e.g. "Acme Corp")
    pub name: String,

    #[serde(default)]
    pub sector: Option<String>,

    #[serde(default)]
    pub industry: Option<String>,

    /// Related entities (suppliers, subsidiaries)
    #[serde(default)]
    pub known_entities: Vec<KnownEntity>,
}

impl SubjectContext {
    /// Create a new context for a subject.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the sector.
    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    /// Set the industry.
    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    /// Add a known entity.
    pub fn with_entity(mut self, entity: KnownEntity) -> Self {
        self.known_entities.push(entity);
        self
    }

    /// Add an entity unless one with the same name (case-insensitive) exists.
    pub fn add_entity(&mut self, entity: KnownEntity) -> bool {
        let name = entity.name.to_lowercase();
        if self
            .known_entities
            .iter()
            .any(|e| e.name.to_lowercase() == name)
        {
            return false;
        }
        self.known_entities.push(entity);
        true
    }

    /// The entities included in a prompt, capped at `max`.
    pub fn prompt_entities(&self, max: usize) -> &[KnownEntity] {
        &self.known_entities[..self.known_entities.len().min(max)]
    }
}

/// A subject to analyze, with the documents that describe it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Key the record is stored under (e.g. a ticker)
    pub id: String,

    pub context: SubjectContext,

    #[serde(default)]
    pub documents: Vec<DocumentRef>,
}

impl Subject {
    /// Create a subject with no documents.
    pub fn new(id: impl Into<String>, context: SubjectContext) -> Self {
        Self {
            id: id.into(),
            context,
            documents: Vec::new(),
        }
    }

    /// Add a document.
    pub fn with_document(mut self, document: DocumentRef) -> Self {
        self.documents.push(document);
        self
    }
}
