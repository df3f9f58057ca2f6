//! DS-013: Program generation — the stack as a Pulumi YAML program.
//!
//! Lookups become `variables` (`fn::invoke`), everything else becomes a
//! `resources` entry in topological order. References render as `${id.attr}`
//! interpolations, so the engine derives the same edges the resolver did;
//! explicit `depends_on` is carried as `options.dependsOn`. Plain strings
//! have every `$` doubled so the engine reads them literally.

use super::types::*;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct Program<'a> {
    name: &'a str,
    runtime: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    config: IndexMap<&'static str, ConfigValue<'a>>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    variables: IndexMap<&'a str, Variable>,
    resources: IndexMap<&'a str, ProgramResource>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    outputs: IndexMap<String, Property>,
}

#[derive(Debug, Serialize)]
struct ConfigValue<'a> {
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct Variable {
    #[serde(rename = "fn::invoke")]
    invoke: Invoke,
}

#[derive(Debug, Serialize)]
struct Invoke {
    function: &'static str,
    arguments: IndexMap<String, Property>,
}

#[derive(Debug, Serialize)]
struct ProgramResource {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    properties: IndexMap<String, Property>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ResourceOptions>,
}

#[derive(Debug, Serialize)]
struct ResourceOptions {
    #[serde(rename = "dependsOn")]
    depends_on: Vec<String>,
}

/// Double `$` in a plain string; `$$` is the engine's literal dollar.
pub fn escape_literal(value: &str) -> String {
    value.replace('$', "$$")
}

fn escape_property(property: &Property) -> Property {
    match property {
        Property::Str(s) => Property::Str(escape_literal(s)),
        Property::List(items) => Property::List(items.iter().map(escape_property).collect()),
        Property::Map(entries) => Property::Map(escape_properties(entries)),
        Property::Int(_) | Property::Bool(_) | Property::Ref(_) => property.clone(),
    }
}

fn escape_properties(entries: &IndexMap<String, Property>) -> IndexMap<String, Property> {
    entries
        .iter()
        .map(|(k, v)| (k.clone(), escape_property(v)))
        .collect()
}

/// Render the program for a stack in the given order.
pub fn render_program(stack: &Stack, execution_order: &[String]) -> Result<String, String> {
    let mut variables = IndexMap::new();
    let mut resources = IndexMap::new();

    for id in execution_order {
        let decl = stack
            .declarations
            .get(id)
            .ok_or_else(|| format!("execution order names undeclared '{}'", id))?;

        if decl.kind.is_lookup() {
            variables.insert(
                id.as_str(),
                Variable {
                    invoke: Invoke {
                        function: decl.kind.type_token(),
                        arguments: escape_properties(&decl.properties),
                    },
                },
            );
            continue;
        }

        for dep in &decl.depends_on {
            if stack.declarations.get(dep).is_some_and(|d| d.kind.is_lookup()) {
                return Err(format!(
                    "'{}' cannot depend on lookup '{}' explicitly",
                    id, dep
                ));
            }
        }
        let options = (!decl.depends_on.is_empty()).then(|| ResourceOptions {
            depends_on: decl.depends_on.iter().map(|d| format!("${{{}}}", d)).collect(),
        });

        resources.insert(
            id.as_str(),
            ProgramResource {
                kind: decl.kind.type_token(),
                properties: escape_properties(&decl.properties),
                options,
            },
        );
    }

    let program = Program {
        name: &stack.name,
        runtime: "yaml",
        description: stack.description.as_deref(),
        config: IndexMap::from([(
            "aws:region",
            ConfigValue {
                value: &stack.region,
            },
        )]),
        variables,
        resources,
        outputs: escape_properties(&stack.outputs),
    };

    serde_yaml_ng::to_string(&program).map_err(|e| format!("program serialize error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::build_execution_order;
    use crate::core::stack::tests::{generated_key_inputs, stock_config, stock_stack, PEM};
    use serde_yaml_ng::Value;

    fn rendered() -> (String, Value) {
        let stack = stock_stack();
        let order = build_execution_order(&stack).unwrap();
        let text = render_program(&stack, &order).unwrap();
        let value: Value = serde_yaml_ng::from_str(&text).unwrap();
        (text, value)
    }

    #[test]
    fn test_ds013_program_header() {
        let (_, v) = rendered();
        assert_eq!(v["name"], Value::from("dev"));
        assert_eq!(v["runtime"], Value::from("yaml"));
        assert_eq!(v["config"]["aws:region"]["value"], Value::from("ap-south-1"));
        assert!(v.get("description").is_none());
    }

    #[test]
    fn test_ds013_ami_is_a_variable() {
        let (_, v) = rendered();
        let invoke = &v["variables"]["ubuntu"]["fn::invoke"];
        assert_eq!(invoke["function"], Value::from("aws:ec2:getAmi"));
        assert_eq!(invoke["arguments"]["mostRecent"], Value::from(true));
        assert!(v["resources"].get("ubuntu").is_none());
        assert_eq!(v["resources"]["dev-server"]["properties"]["ami"], Value::from("${ubuntu.id}"));
    }

    #[test]
    fn test_ds013_resources_in_order() {
        let (_, v) = rendered();
        let keys: Vec<&str> = v["resources"]
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(keys.len(), 19);
        assert_eq!(keys[0], "dev-vpc");
        assert_eq!(keys.last().copied(), Some("server-public-ip"));
        assert_eq!(v["resources"]["dev-vpc"]["type"], Value::from("aws:ec2:Vpc"));
    }

    #[test]
    fn test_ds013_references_interpolated() {
        let (_, v) = rendered();
        let param = &v["resources"]["server-public-ip"]["properties"];
        assert_eq!(param["name"], Value::from("publicIP"));
        assert_eq!(param["value"], Value::from("${dev-server.publicIp}"));
        assert_eq!(v["outputs"]["publicIp"], Value::from("${dev-server.publicIp}"));
        assert_eq!(
            v["resources"]["dev-server"]["properties"]["keyName"],
            Value::from("${key.keyName}")
        );
    }

    #[test]
    fn test_ds013_trust_policy_embedded_as_json() {
        let (_, v) = rendered();
        let doc = v["resources"]["ssm-parameter-role"]["properties"]["assumeRolePolicy"]
            .as_str()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(doc).unwrap();
        assert_eq!(
            json["Statement"][0]["Principal"]["Service"],
            serde_json::Value::from("ec2.amazonaws.com")
        );
    }

    #[test]
    fn test_ds013_user_data_survives_roundtrip() {
        let stack = stock_stack();
        let (_, v) = rendered();
        let user_data = v["resources"]["dev-server"]["properties"]["userData"]
            .as_str()
            .unwrap();
        assert!(user_data.contains("$$(lsb_release -cs)"));
        assert_eq!(user_data.replace("$$", "$"), stack.bootstrap_script);
    }

    #[test]
    fn test_ds013_literal_dollars_escaped() {
        let mut config = stock_config();
        config.bootstrap.containers[0].env.insert(
            "GREETING".to_string(),
            EnvValue::Literal("hi ${USER}".to_string()),
        );
        let stack = crate::core::stack::declare(&config, &generated_key_inputs()).unwrap();
        let order = build_execution_order(&stack).unwrap();
        let text = render_program(&stack, &order).unwrap();
        let v: Value = serde_yaml_ng::from_str(&text).unwrap();

        let user_data = v["resources"]["dev-server"]["properties"]["userData"]
            .as_str()
            .unwrap();
        assert!(user_data.contains("'GREETING=hi $${USER}'"));
        assert!(!user_data.contains("hi ${USER}"));
        assert_eq!(user_data.replace("$$", "$"), stack.bootstrap_script);
        assert_eq!(
            v["resources"]["server-public-ip"]["properties"]["value"],
            Value::from("${dev-server.publicIp}")
        );
    }

    #[test]
    fn test_ds013_escape_literal() {
        assert_eq!(escape_literal("plain"), "plain");
        assert_eq!(escape_literal("${x}"), "$${x}");
        assert_eq!(escape_literal("$$"), "$$$$");
    }

    #[test]
    fn test_ds013_private_key_never_rendered() {
        let (text, _) = rendered();
        assert!(!text.contains("PRIVATE KEY"));
        assert!(!text.contains(PEM.trim()));
    }

    #[test]
    fn test_ds013_explicit_depends_on() {
        let mut stack = stock_stack();
        stack
            .declarations
            .get_mut("server-public-ip")
            .unwrap()
            .depends_on
            .push("dev-public-rt".to_string());
        let order = build_execution_order(&stack).unwrap();
        let v: Value = serde_yaml_ng::from_str(&render_program(&stack, &order).unwrap()).unwrap();
        let deps = &v["resources"]["server-public-ip"]["options"]["dependsOn"];
        assert_eq!(deps[0], Value::from("${dev-public-rt}"));
        assert!(v["resources"]["dev-vpc"].get("options").is_none());
    }

    #[test]
    fn test_ds013_unknown_order_entry() {
        let stack = stock_stack();
        let err = render_program(&stack, &["ghost".to_string()]).unwrap_err();
        assert!(err.contains("undeclared 'ghost'"));
    }
}
