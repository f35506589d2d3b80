//! Validation service for checking schema integrity.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::hierarchy::{EndpointMatch, HierarchyResolver, ResolvedSchema};
use crate::config::AliasPolicy;
use crate::context::Context;
use crate::di::FromContext;
use crate::error::AppError;
use crate::models::{Entity, Representation, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A validation issue with a schema entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// Entity name.
    pub entity: String,
    pub severity: Severity,
    /// Description of the issue.
    pub issue: String,
}

impl ValidationIssue {
    fn error(entity: &str, issue: impl Into<String>) -> Self {
        Self {
            entity: entity.to_string(),
            severity: Severity::Error,
            issue: issue.into(),
        }
    }

    fn warning(entity: &str, issue: impl Into<String>) -> Self {
        Self {
            entity: entity.to_string(),
            severity: Severity::Warning,
            issue: issue.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Fails with [`AppError::Validation`] when any issue has error severity.
pub fn fail_on_errors(issues: &[ValidationIssue]) -> Result<(), AppError> {
    match issues.iter().filter(|i| i.is_error()).count() {
        0 => Ok(()),
        errors => Err(AppError::Validation(errors)),
    }
}

/// Service for validating a loaded schema.
///
/// Checks for empty required fields, edge endpoints that name no node type,
/// ambiguous input labels and unknown `is_a` parents.
#[derive(FromContext, Clone)]
pub struct ValidationService {
    schema: Arc<Schema>,
    resolver: HierarchyResolver,
    policy: AliasPolicy,
}

impl ValidationService {
    pub fn new(schema: Arc<Schema>, resolver: HierarchyResolver, policy: AliasPolicy) -> Self {
        Self {
            schema,
            resolver,
            policy,
        }
    }

    /// Runs every check and returns the issues, errors first.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = self.find_empty_fields();
        issues.extend(self.find_unknown_parents());
        issues.extend(self.find_unresolved_endpoints());
        issues.extend(self.find_duplicate_input_labels());
        issues.sort_by_key(|issue| !issue.is_error());

        tracing::info!(
            "Validated {} entities: {} error(s), {} warning(s)",
            self.schema.len(),
            issues.iter().filter(|i| i.is_error()).count(),
            issues.iter().filter(|i| !i.is_error()).count()
        );
        issues
    }

    /// Validates and fails when any issue is an error.
    ///
    /// Error issues are logged before returning; warnings are handed back.
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] with the number of error issues.
    pub fn check(&self) -> Result<Vec<ValidationIssue>, AppError> {
        let issues = self.validate();
        for issue in issues.iter().filter(|i| i.is_error()) {
            tracing::error!("{}: {}", issue.entity, issue.issue);
        }
        fail_on_errors(&issues)?;
        Ok(issues)
    }

    /// Find required fields that are present but empty.
    pub fn find_empty_fields(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for entity in self.schema.entities() {
            let mut fields: Vec<(&str, bool)> =
                vec![("label_in_input", Self::blank_list(entity.label_in_input().as_slice()))];
            match entity {
                Entity::Node(node) => {
                    fields.push(("preferred_id", Self::blank_list(node.preferred_id.as_slice())));
                }
                Entity::Edge(edge) => {
                    fields.push(("source", Self::blank_list(edge.source.as_slice())));
                    fields.push(("target", Self::blank_list(edge.target.as_slice())));
                    fields.push(("label_as_edge", edge.label_as_edge.trim().is_empty()));
                }
            }
            for (field, empty) in fields {
                if empty {
                    issues.push(ValidationIssue::error(
                        entity.name(),
                        format!("Required field '{}' is empty", field),
                    ));
                }
            }
        }
        issues
    }

    /// Find `is_a` values naming neither an ontology element nor a declared entity.
    pub fn find_unknown_parents(&self) -> Vec<ValidationIssue> {
        self.schema
            .entities()
            .filter_map(|entity| {
                let parent = entity.is_a()?;
                let known = self.schema.get(parent).is_some()
                    || self.resolver.ontology().contains(parent);
                (!known).then(|| {
                    ValidationIssue::error(
                        entity.name(),
                        format!("is_a '{}' is neither an ontology class nor a declared entity", parent),
                    )
                })
            })
            .collect()
    }

    /// Find edge endpoints that do not name a declared node type.
    ///
    /// Ontology ancestors of declared node types are accepted. Names that are
    /// only an input label alias are handled per the configured policy.
    pub fn find_unresolved_endpoints(&self) -> Vec<ValidationIssue> {
        let resolved = match self.resolver.resolve_all(&self.schema) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!("Hierarchy resolution failed during validation: {}", e);
                let mut issues = vec![ValidationIssue::error("<schema>", e.to_string())];
                issues.extend(self.endpoints_without_hierarchy());
                return issues;
            }
        };

        let mut issues = Vec::new();
        for edge in self.schema.edges() {
            for (side, names) in [("source", &edge.source), ("target", &edge.target)] {
                for name in names {
                    if let Some(issue) = self.check_endpoint(&resolved, &edge.name, side, name) {
                        issues.push(issue);
                    }
                }
            }
        }
        issues
    }

    /// Find input labels claimed by more than one entity of the same kind.
    pub fn find_duplicate_input_labels(&self) -> Vec<ValidationIssue> {
        let mut claims: HashMap<(Representation, &str), Vec<&str>> = HashMap::new();
        for entity in self.schema.entities() {
            for label in entity.label_in_input() {
                claims
                    .entry((entity.representation(), label.as_str()))
                    .or_default()
                    .push(entity.name());
            }
        }

        let mut issues = Vec::new();
        for entity in self.schema.entities() {
            for label in entity.label_in_input() {
                let owners = &claims[&(entity.representation(), label.as_str())];
                if owners.len() > 1 && owners[0] != entity.name() {
                    issues.push(ValidationIssue::warning(
                        entity.name(),
                        format!(
                            "Input label '{}' is also mapped by {}; records go to {}",
                            label,
                            owners[0],
                            owners[0]
                        ),
                    ));
                }
            }
        }
        issues
    }

    fn check_endpoint(
        &self,
        resolved: &ResolvedSchema,
        edge: &str,
        side: &str,
        name: &str,
    ) -> Option<ValidationIssue> {
        match self.resolver.match_endpoint(&self.schema, resolved, name) {
            EndpointMatch::Declared(_) => None,
            EndpointMatch::Ancestor(nodes) => {
                tracing::debug!("{} {} '{}' expands to {}", edge, side, name, nodes.join(", "));
                None
            }
            EndpointMatch::Alias(nodes) => {
                let message = format!(
                    "{} '{}' is not a node type but an input label of {}",
                    side,
                    name,
                    nodes.join(", ")
                );
                match self.policy {
                    AliasPolicy::Deny => Some(ValidationIssue::error(edge, message)),
                    AliasPolicy::Warn => Some(ValidationIssue::warning(edge, message)),
                    AliasPolicy::Allow => None,
                }
            }
            EndpointMatch::Unresolved => Some(ValidationIssue::error(
                edge,
                format!("{} '{}' does not name a declared node type", side, name),
            )),
        }
    }

    /// Declared-name check used when the hierarchy cannot be resolved.
    fn endpoints_without_hierarchy(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for edge in self.schema.edges() {
            for (side, names) in [("source", &edge.source), ("target", &edge.target)] {
                for name in names.iter().filter(|n| self.schema.node(n).is_none()) {
                    issues.push(ValidationIssue::warning(
                        &edge.name,
                        format!("{} '{}' could not be checked against the ontology", side, name),
                    ));
                }
            }
        }
        issues
    }

    fn blank_list(values: &[String]) -> bool {
        values.is_empty() || values.iter().all(|v| v.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{embedded_ontology, parse_schema};

    fn service(doc: &str, policy: AliasPolicy) -> ValidationService {
        let schema = Arc::new(parse_schema(doc).unwrap());
        let resolver = HierarchyResolver::new(embedded_ontology().unwrap(), false, false);
        ValidationService::new(schema, resolver, policy)
    }

    const ALIASED: &str = r#"
Protein:
  represented_as: node
  preferred_id: UniProtKB
  label_in_input: protein
SmallMolecule:
  represented_as: node
  preferred_id: DRUGBANK
  label_in_input: Drug
Targets:
  represented_as: edge
  source: Drug
  target: Protein
  label_as_edge: Targets
  label_in_input: drug_target
"#;

    #[test]
    fn test_alias_endpoint_policies() {
        let issues = service(ALIASED, AliasPolicy::Warn).validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].entity, "Targets");
        assert!(issues[0].issue.contains("SmallMolecule"));

        let issues = service(ALIASED, AliasPolicy::Deny).validate();
        assert!(issues[0].is_error());

        assert!(service(ALIASED, AliasPolicy::Allow).validate().is_empty());
    }

    #[test]
    fn test_ancestor_endpoint_is_accepted() {
        let doc = ALIASED.replace("source: Drug", "source: ChemicalEntity");
        assert!(service(&doc, AliasPolicy::Deny).validate().is_empty());
    }

    #[test]
    fn test_unresolved_endpoint() {
        let doc = ALIASED.replace("target: Protein", "target: Enzyme");
        let issues = service(&doc, AliasPolicy::Allow).validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
        assert!(issues[0].issue.contains("Enzyme"));
    }

    #[test]
    fn test_check_fails_on_error_issues() {
        let err = service(ALIASED, AliasPolicy::Deny).check().unwrap_err();
        assert!(matches!(err, AppError::Validation(1)));

        // warnings alone pass and are handed back
        let issues = service(ALIASED, AliasPolicy::Warn).check().unwrap();
        assert_eq!(issues.len(), 1);
        assert!(fail_on_errors(&issues).is_ok());
    }

    #[test]
    fn test_empty_fields() {
        let doc = r#"
Protein:
  represented_as: node
  preferred_id: []
  label_in_input: ""
"#;
        let issues = service(doc, AliasPolicy::Warn).find_empty_fields();
        let fields: Vec<_> = issues.iter().map(|i| i.issue.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "Required field 'label_in_input' is empty",
                "Required field 'preferred_id' is empty"
            ]
        );
    }

    #[test]
    fn test_duplicate_input_labels_warn_on_later_entity() {
        let doc = r#"
Pathway:
  represented_as: node
  preferred_id: REACT
  label_in_input: pathway
KeggPathway:
  represented_as: node
  preferred_id: KEGG.PATHWAY
  label_in_input: [kegg, pathway]
"#;
        let issues = service(doc, AliasPolicy::Warn).find_duplicate_input_labels();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].entity, "KeggPathway");
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_unknown_parent() {
        let doc = r#"
Widget:
  represented_as: node
  preferred_id: W
  label_in_input: widget
  is_a: gizmo
"#;
        let issues = service(doc, AliasPolicy::Warn).validate();
        assert!(issues
            .iter()
            .any(|i| i.is_error() && i.issue.contains("is_a 'gizmo'")));
    }
}
