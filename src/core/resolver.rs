//! DS-005: Dependency DAG construction over stack declarations.
//!
//! Edges come from property references (`${dev-vpc.id}`) and explicit
//! `depends_on`. Topological order uses Kahn's algorithm; ties are broken by
//! declaration order so the output follows the stack as written.

use super::types::*;
use std::collections::BTreeSet;

/// Check that every reference and `depends_on` names a declared resource.
pub fn check_references(stack: &Stack) -> Result<(), String> {
    for (id, decl) in &stack.declarations {
        for dep in decl.dependencies() {
            if dep == *id {
                return Err(format!("declaration '{}' depends on itself", id));
            }
            if !stack.declarations.contains_key(&dep) {
                return Err(format!("declaration '{}' depends on unknown '{}'", id, dep));
            }
        }
    }
    for (name, value) in &stack.outputs {
        let mut refs = Vec::new();
        value.collect_references(&mut refs);
        if let Some(r) = refs
            .iter()
            .find(|r| !stack.declarations.contains_key(&r.target))
        {
            return Err(format!("output '{}' references unknown '{}'", name, r.target));
        }
    }
    Ok(())
}

/// Build a topological order of declaration ids.
pub fn build_execution_order(stack: &Stack) -> Result<Vec<String>, String> {
    check_references(stack)?;

    let n = stack.declarations.len();
    let mut in_degree = vec![0usize; n];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (idx, decl) in stack.declarations.values().enumerate() {
        for dep in decl.dependencies() {
            if let Some(dep_idx) = stack.declarations.get_index_of(&dep) {
                adjacency[dep_idx].push(idx);
                in_degree[idx] += 1;
            }
        }
    }

    // Smallest declaration index first
    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(current) = ready.pop_first() {
        order.push(current);
        for &next in &adjacency[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.insert(next);
            }
        }
    }

    if order.len() != n {
        let cycle_members: Vec<&str> = stack
            .declarations
            .keys()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] > 0)
            .map(|(_, id)| id.as_str())
            .collect();
        return Err(format!(
            "dependency cycle detected involving: {}",
            cycle_members.join(", ")
        ));
    }

    tracing::debug!(declarations = n, "execution order resolved");
    Ok(order
        .into_iter()
        .filter_map(|i| stack.declarations.get_index(i).map(|(id, _)| id.clone()))
        .collect())
}
