//! Cypher statement builders for batched writes.
//!
//! Labels and relationship types come from the schema, so they are always
//! backtick-quoted; values travel as parameters.

/// Quotes a label or relationship type, doubling embedded backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Renders `:`A`:`B`` for a label set.
pub fn label_expression<S: AsRef<str>>(labels: &[S]) -> String {
    labels
        .iter()
        .map(|label| format!(":{}", quote_identifier(label.as_ref())))
        .collect()
}

pub const WIPE_STATEMENT: &str = "MATCH (n) DETACH DELETE n";

/// Uniqueness constraint on `id` for one node label.
pub fn constraint_statement(label: &str) -> String {
    let name: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!(
        "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE n.id IS UNIQUE",
        quote_identifier(&format!("{}_id", name)),
        quote_identifier(label)
    )
}

/// Merges a batch of nodes sharing one label set.
///
/// Rows are `{id, properties}`. The node is merged on its leaf label and
/// the ancestor labels are added afterwards.
pub fn merge_nodes_statement<S: AsRef<str>>(labels: &[S]) -> String {
    let (leaf, rest) = match labels.split_first() {
        Some((leaf, rest)) => (leaf.as_ref(), rest),
        None => ("Node", &[][..]),
    };
    let mut statement = format!(
        "UNWIND $rows AS row MERGE (n:{} {{id: row.id}}) SET n += row.properties",
        quote_identifier(leaf)
    );
    if !rest.is_empty() {
        statement.push_str(&format!(" SET n{}", label_expression(rest)));
    }
    statement
}

/// Merges a batch of relationships of one type.
///
/// Rows are `{source, target, properties}`. Endpoint labels narrow the
/// lookup when known.
pub fn merge_edges_statement(
    relationship: &str,
    source_label: Option<&str>,
    target_label: Option<&str>,
) -> String {
    let endpoint = |var: &str, label: Option<&str>, key: &str| match label {
        Some(label) => format!("MATCH ({}:{} {{id: row.{}}})", var, quote_identifier(label), key),
        None => format!("MATCH ({} {{id: row.{}}})", var, key),
    };
    format!(
        "UNWIND $rows AS row {} {} MERGE (s)-[r:{}]->(t) SET r += row.properties",
        endpoint("s", source_label, "source"),
        endpoint("t", target_label, "target"),
        quote_identifier(relationship)
    )
}
