//! Curated subjects and the catalog they are loaded from.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::errors::RelevanceError;
use crate::lemma::LemmaSequence;
use crate::lemmatizer::{Lemmatizer, normalize_keyword};
use crate::taxonomy::{DescriptorTreeIndex, TreeNumber, TreeNumberRegistry};
use crate::types::{ChemicalKey, DescriptorKey, Keyword, SubjectKey};

/// Topic that articles are scored against.
///
/// `keywords()` and `keyword_lemma_sequences()` are index-aligned; index 0 is the
/// preferred term. Subjects are immutable once built and safe to share across workers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subject {
    key: SubjectKey,
    taxonomy_key: Option<DescriptorKey>,
    tree_numbers: Vec<Arc<TreeNumber>>,
    chemical_key: Option<ChemicalKey>,
    keywords: Vec<Keyword>,
    normalized_keywords: Vec<Keyword>,
    keyword_lemmas: Vec<LemmaSequence>,
}

impl Subject {
    /// Start building a subject with `key`.
    pub fn builder(key: impl Into<SubjectKey>) -> SubjectBuilder {
        SubjectBuilder {
            key: key.into(),
            taxonomy_key: None,
            tree_numbers: Vec::new(),
            chemical_key: None,
            keywords: Vec::new(),
            keyword_lemmas: Vec::new(),
        }
    }

    /// Unique subject key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Taxonomy descriptor identity, absent for free-text-only subjects.
    pub fn taxonomy_key(&self) -> Option<&str> {
        self.taxonomy_key.as_deref()
    }

    /// Tree numbers reachable through the taxonomy identity.
    pub fn tree_numbers(&self) -> &[Arc<TreeNumber>] {
        &self.tree_numbers
    }

    /// Chemical-substance identity, if any.
    pub fn chemical_key(&self) -> Option<&str> {
        self.chemical_key.as_deref()
    }

    /// Raw keywords, preferred term first.
    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    /// Normalized keywords, index-aligned with [`Subject::keywords`].
    pub fn normalized_keywords(&self) -> &[Keyword] {
        &self.normalized_keywords
    }

    /// Lemma sequences, index-aligned with [`Subject::keywords`].
    pub fn keyword_lemma_sequences(&self) -> &[LemmaSequence] {
        &self.keyword_lemmas
    }

    /// Preferred keyword, if the subject has any.
    pub fn preferred_keyword(&self) -> Option<&str> {
        self.keywords.first().map(String::as_str)
    }
}

/// Builder for [`Subject`].
pub struct SubjectBuilder {
    key: SubjectKey,
    taxonomy_key: Option<DescriptorKey>,
    tree_numbers: Vec<Arc<TreeNumber>>,
    chemical_key: Option<ChemicalKey>,
    keywords: Vec<Keyword>,
    keyword_lemmas: Vec<LemmaSequence>,
}

impl SubjectBuilder {
    /// Set the taxonomy descriptor identity.
    pub fn with_taxonomy_key(mut self, descriptor: impl Into<DescriptorKey>) -> Self {
        self.taxonomy_key = Some(descriptor.into());
        self
    }

    /// Add a tree number reachable through the taxonomy identity.
    pub fn with_tree_number(mut self, tree: Arc<TreeNumber>) -> Self {
        if !self.tree_numbers.contains(&tree) {
            self.tree_numbers.push(tree);
        }
        self
    }

    /// Set the chemical-substance identity.
    pub fn with_chemical_key(mut self, chemical: impl Into<ChemicalKey>) -> Self {
        self.chemical_key = Some(chemical.into());
        self
    }

    /// Append a keyword together with its lemma sequence.
    pub fn with_keyword(mut self, keyword: impl Into<Keyword>, lemmas: LemmaSequence) -> Self {
        self.keywords.push(keyword.into());
        self.keyword_lemmas.push(lemmas);
        self
    }

    /// Append a keyword, lemmatizing it with `lemmatizer`.
    pub fn with_lemmatized_keyword(
        self,
        keyword: impl Into<Keyword>,
        lemmatizer: &dyn Lemmatizer,
    ) -> Self {
        let keyword = keyword.into();
        let lemmas = lemmatizer.lemmatize(&keyword);
        self.with_keyword(keyword, lemmas)
    }

    /// Validate and build.
    pub fn build(self) -> Result<Subject, RelevanceError> {
        if self.key.trim().is_empty() {
            return Err(RelevanceError::Configuration(
                "subject key must not be empty".to_string(),
            ));
        }
        if self.taxonomy_key.is_none() && !self.tree_numbers.is_empty() {
            return Err(RelevanceError::Configuration(format!(
                "subject '{}' lists tree numbers without a taxonomy key",
                self.key
            )));
        }
        let normalized_keywords = self.keywords.iter().map(|k| normalize_keyword(k)).collect();
        Ok(Subject {
            key: self.key,
            taxonomy_key: self.taxonomy_key,
            tree_numbers: self.tree_numbers,
            chemical_key: self.chemical_key,
            keywords: self.keywords,
            normalized_keywords,
            keyword_lemmas: self.keyword_lemmas,
        })
    }
}

/// Serialized subject definition as found in a catalog file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubjectSpec {
    /// Unique subject key.
    pub key: SubjectKey,
    /// Optional taxonomy descriptor identity.
    #[serde(default)]
    pub descriptor: Option<DescriptorKey>,
    /// Explicit tree numbers; when empty they are looked up through `descriptor`.
    #[serde(default)]
    pub tree_numbers: Vec<String>,
    /// Optional chemical key.
    #[serde(default)]
    pub chemical: Option<ChemicalKey>,
    /// Keywords, preferred term first.
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}

impl SubjectSpec {
    /// Resolve into a [`Subject`], lemmatizing keywords and interning tree numbers.
    pub fn resolve(
        &self,
        lemmatizer: &dyn Lemmatizer,
        registry: &mut TreeNumberRegistry,
        descriptors: &DescriptorTreeIndex,
    ) -> Result<Subject, RelevanceError> {
        let mut builder = Subject::builder(self.key.clone());
        if let Some(descriptor) = &self.descriptor {
            builder = builder.with_taxonomy_key(descriptor.clone());
            if self.tree_numbers.is_empty() {
                for tree in descriptors.tree_numbers(descriptor) {
                    builder = builder.with_tree_number(tree.clone());
                }
            }
        }
        for code in &self.tree_numbers {
            builder = builder.with_tree_number(registry.intern(code)?);
        }
        if let Some(chemical) = &self.chemical {
            builder = builder.with_chemical_key(chemical.clone());
        }
        for keyword in &self.keywords {
            builder = builder.with_lemmatized_keyword(keyword.clone(), lemmatizer);
        }
        builder.build()
    }
}

/// Ordered set of subjects keyed by subject key.
#[derive(Clone, Debug, Default)]
pub struct SubjectCatalog {
    subjects: IndexMap<SubjectKey, Arc<Subject>>,
}

impl SubjectCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subject; a duplicate key is a configuration error.
    pub fn insert(&mut self, subject: Subject) -> Result<(), RelevanceError> {
        if self.subjects.contains_key(subject.key()) {
            return Err(RelevanceError::Configuration(format!(
                "duplicate subject key '{}'",
                subject.key()
            )));
        }
        self.subjects.insert(subject.key.clone(), Arc::new(subject));
        Ok(())
    }

    /// Resolve a list of specs into a catalog.
    pub fn from_specs(
        specs: &[SubjectSpec],
        lemmatizer: &dyn Lemmatizer,
        registry: &mut TreeNumberRegistry,
        descriptors: &DescriptorTreeIndex,
    ) -> Result<Self, RelevanceError> {
        let mut catalog = Self::new();
        for spec in specs {
            catalog.insert(spec.resolve(lemmatizer, registry, descriptors)?)?;
        }
        Ok(catalog)
    }

    /// Load a JSON array of [`SubjectSpec`] values.
    pub fn load(
        path: &Path,
        lemmatizer: &dyn Lemmatizer,
        registry: &mut TreeNumberRegistry,
        descriptors: &DescriptorTreeIndex,
    ) -> Result<Self, RelevanceError> {
        let text = fs::read_to_string(path)?;
        let specs: Vec<SubjectSpec> = serde_json::from_str(&text)?;
        Self::from_specs(&specs, lemmatizer, registry, descriptors)
    }

    /// Look up a subject by key.
    pub fn get(&self, key: &str) -> Option<&Arc<Subject>> {
        self.subjects.get(key)
    }

    /// Subjects in catalog order.
    pub fn subjects(&self) -> impl Iterator<Item = &Arc<Subject>> {
        self.subjects.values()
    }

    /// Subjects in catalog order, as a shareable vector.
    pub fn to_vec(&self) -> Vec<Arc<Subject>> {
        self.subjects.values().cloned().collect()
    }

    /// Number of subjects.
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    /// Returns `true` when the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lemmatizer::BasicLemmatizer;

    #[test]
    fn tree_numbers_without_identity_are_rejected() {
        let mut registry = TreeNumberRegistry::new();
        let result = Subject::builder("orphan")
            .with_tree_number(registry.intern("C01").unwrap())
            .build();
        assert!(matches!(result, Err(RelevanceError::Configuration(_))));
    }

    #[test]
    fn subject_spec_pulls_tree_numbers_through_descriptor() {
        let mut registry = TreeNumberRegistry::new();
        let mut descriptors = DescriptorTreeIndex::new();
        descriptors
            .insert(&mut registry, "D000069059", ["D02.455.426.559.389.657.410.595.500"])
            .unwrap();
        let spec = SubjectSpec {
            key: "atorvastatin".to_string(),
            descriptor: Some("D000069059".to_string()),
            tree_numbers: Vec::new(),
            chemical: Some("D000069059".to_string()),
            keywords: vec!["Atorvastatin".to_string(), "Lipitor".to_string()],
        };
        let subject = spec
            .resolve(&BasicLemmatizer, &mut registry, &descriptors)
            .unwrap();
        assert_eq!(subject.tree_numbers().len(), 1);
        assert_eq!(subject.preferred_keyword(), Some("Atorvastatin"));
        assert_eq!(subject.keyword_lemma_sequences()[1].to_string(), "lipitor");
        assert_eq!(subject.normalized_keywords()[0], "atorvastatin");
    }

    #[test]
    fn catalog_rejects_duplicate_keys() {
        let mut catalog = SubjectCatalog::new();
        catalog.insert(Subject::builder("x").build().unwrap()).unwrap();
        assert!(catalog.insert(Subject::builder("x").build().unwrap()).is_err());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn catalog_parses_json_specs() {
        let json = r#"[{"key": "long_covid", "keywords": ["long COVID", "post-COVID condition"]}]"#;
        let specs: Vec<SubjectSpec> = serde_json::from_str(json).unwrap();
        let mut registry = TreeNumberRegistry::new();
        let catalog = SubjectCatalog::from_specs(
            &specs,
            &BasicLemmatizer,
            &mut registry,
            &DescriptorTreeIndex::new(),
        )
        .unwrap();
        let subject = catalog.get("long_covid").unwrap();
        assert!(subject.taxonomy_key().is_none());
        assert_eq!(subject.keywords().len(), 2);
    }
}
