//! DS-012: Declaration plan, in the order a render hands it to the engine.
//!
//! The plan is a listing. It never compares against deployed or previously
//! rendered state; the engine owns that diff.

use super::types::*;
use crate::tripwire::hasher;
use indexmap::IndexMap;

/// Build the plan from a declared stack and its topological order.
pub fn plan(stack: &Stack, execution_order: &[String]) -> DeclarationPlan {
    let mut entries = Vec::with_capacity(execution_order.len());
    let mut group_counts: IndexMap<Group, u32> = IndexMap::new();
    let mut resources = 0u32;
    let mut lookups = 0u32;

    for id in execution_order {
        let decl = match stack.declarations.get(id) {
            Some(d) => d,
            None => continue,
        };

        if decl.kind.is_lookup() {
            lookups += 1;
        } else {
            resources += 1;
        }
        *group_counts.entry(decl.group).or_insert(0) += 1;

        entries.push(PlannedDeclaration {
            id: id.clone(),
            kind: decl.kind,
            group: decl.group,
            description: decl.description.clone(),
            depends_on: decl.dependencies(),
        });
    }

    DeclarationPlan {
        name: stack.name.clone(),
        region: stack.region.clone(),
        entries,
        group_counts,
        resources,
        lookups,
    }
}

/// Hash of one declaration's kind and properties, as rendered.
pub fn hash_declaration(decl: &Declaration) -> String {
    let mut components = vec![decl.kind.type_token().to_string()];
    for (key, value) in &decl.properties {
        let rendered = serde_json::to_string(value).unwrap_or_default();
        components.push(format!("{}={}", key, rendered));
    }
    components.extend(decl.depends_on.iter().cloned());
    let refs: Vec<&str> = components.iter().map(|s| s.as_str()).collect();
    hasher::composite_hash(&refs)
}
