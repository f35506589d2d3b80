//! Identifier normalization by `preferred_id` precedence.

use crate::models::OneOrMany;

/// Prefix spellings that name the same namespace. The first entry of each
/// group is the key used for comparison.
const PREFIX_SYNONYMS: &[&[&str]] = &[
    &["uniprotkb", "uniprot", "swissprot", "trembl"],
    &["ncbigene", "geneid", "entrez", "entrezgene", "ncbi.gene"],
    &["ncbitaxon", "taxon", "taxid", "ncbi.taxon"],
    &["chembl.compound", "chembl"],
    &["drugbank"],
    &["react", "reactome"],
    &["kegg.pathway", "kegg_pathway", "path"],
    &["kegg.disease", "kegg_disease"],
    &["orphanet", "orpha"],
    &["interpro", "ipr"],
    &["hp", "hpo"],
    &["mondo"],
    &["efo"],
    &["go"],
    &["ensembl", "ensg"],
];

/// Splits `PREFIX:local` on the first colon.
///
/// Returns `None` for bare ids and for ids with an empty prefix or local part.
pub fn split_curie(id: &str) -> Option<(&str, &str)> {
    let (prefix, local) = id.split_once(':')?;
    if prefix.is_empty() || local.is_empty() || prefix.contains(char::is_whitespace) {
        return None;
    }
    Some((prefix, local))
}

/// Comparison key for a prefix, folding case and known synonyms.
pub fn prefix_key(prefix: &str) -> String {
    let lower = prefix.trim().to_lowercase();
    PREFIX_SYNONYMS
        .iter()
        .find(|group| group.contains(&lower.as_str()))
        .map(|group| group[0].to_string())
        .unwrap_or(lower)
}

pub fn same_namespace(a: &str, b: &str) -> bool {
    prefix_key(a) == prefix_key(b)
}

/// Key under which an id is indexed for endpoint lookups.
pub fn lookup_key(id: &str) -> String {
    match split_curie(id) {
        Some((prefix, local)) => format!("{}:{}", prefix_key(prefix), local),
        None => id.to_string(),
    }
}

/// Picks the canonical id for a record.
///
/// Namespaces are tried in `preferred` order; for each, the record id and then
/// its xrefs are checked. The first match is rewritten with the declared
/// namespace spelling. A bare record id takes the first preferred namespace.
/// Anything else keeps the record id as is.
///
/// # Arguments
///
/// * `preferred` - namespaces in precedence order, as declared on the node type
/// * `id` - the record id
/// * `xrefs` - alternative ids of the same record
///
/// # Example
///
/// ```ignore
/// let preferred = OneOrMany::One("UniProtKB".to_string());
/// assert_eq!(canonical_id(&preferred, "uniprot:P04637", &[]), "UniProtKB:P04637");
/// ```
pub fn canonical_id(preferred: &OneOrMany<String>, id: &str, xrefs: &[String]) -> String {
    let candidates: Vec<&str> = std::iter::once(id)
        .chain(xrefs.iter().map(String::as_str))
        .collect();

    for namespace in preferred {
        for candidate in &candidates {
            if let Some((prefix, local)) = split_curie(candidate) {
                if same_namespace(prefix, namespace) {
                    return format!("{}:{}", namespace, local);
                }
            }
        }
    }

    match (split_curie(id), preferred.first()) {
        (None, Some(namespace)) if !id.trim().is_empty() => format!("{}:{}", namespace, id.trim()),
        _ => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn many(values: &[&str]) -> OneOrMany<String> {
        OneOrMany::Many(values.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_split_curie() {
        assert_eq!(split_curie("GO:0008150"), Some(("GO", "0008150")));
        assert_eq!(split_curie("KEGG.DISEASE:H00001"), Some(("KEGG.DISEASE", "H00001")));
        assert_eq!(split_curie("P04637"), None);
        assert_eq!(split_curie(":x"), None);
    }

    #[test]
    fn test_prefix_synonyms() {
        assert!(same_namespace("uniprot", "UniProtKB"));
        assert!(same_namespace("GeneID", "NCBIGene"));
        assert!(same_namespace("Entrez", "ncbigene"));
        assert!(same_namespace("taxon", "NCBITaxon"));
        assert!(!same_namespace("MONDO", "EFO"));
        assert_eq!(prefix_key("SomethingElse"), "somethingelse");
    }

    #[test]
    fn test_canonical_id_rewrites_prefix_spelling() {
        let preferred = OneOrMany::One("UniProtKB".to_string());
        assert_eq!(canonical_id(&preferred, "uniprot:P04637", &[]), "UniProtKB:P04637");
    }

    #[test]
    fn test_canonical_id_follows_precedence() {
        let preferred = many(&["MONDO", "EFO", "ORPHANET", "KEGG.DISEASE"]);
        let xrefs = vec!["ORPHANET:558".to_string(), "MONDO:0007947".to_string()];
        assert_eq!(canonical_id(&preferred, "EFO:0000311", &xrefs), "MONDO:0007947");
        assert_eq!(canonical_id(&preferred, "EFO:0000311", &[]), "EFO:0000311");
    }

    #[test]
    fn test_canonical_id_bare_and_foreign() {
        let preferred = OneOrMany::One("NCBIGene".to_string());
        assert_eq!(canonical_id(&preferred, "7157", &[]), "NCBIGene:7157");
        assert_eq!(canonical_id(&preferred, "HGNC:11998", &[]), "HGNC:11998");
    }

    #[test]
    fn test_lookup_key_folds_synonyms() {
        assert_eq!(lookup_key("UNIPROT:P04637"), lookup_key("UniProtKB:P04637"));
        assert_eq!(lookup_key("plain"), "plain");
    }
}
