//! DS-008: IAM role and the instance profile that carries it.
//!
//! Policy documents are typed and serialized to compact JSON, which is what the
//! provider expects in `assumeRolePolicy` / `policy`.

use crate::core::types::{Declaration, Group, IdentityConfig, InlinePolicy, Property, ResourceKind};
use serde::{Deserialize, Serialize};

pub const ROLE: &str = "ssm-parameter-role";
pub const INSTANCE_PROFILE: &str = "myInstanceProfile";

pub const POLICY_VERSION: &str = "2012-10-17";

/// IAM policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

/// One policy statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: String,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

/// Single action or action list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    One(String),
    Many(Vec<String>),
}

/// Service principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Principal {
    pub service: String,
}

impl PolicyDocument {
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string(self).map_err(|e| format!("policy serialize error: {}", e))
    }
}

/// Trust policy: only `service_principal` may assume the role.
pub fn trust_policy(service_principal: &str) -> PolicyDocument {
    PolicyDocument {
        version: POLICY_VERSION.to_string(),
        statement: vec![Statement {
            sid: Some(String::new()),
            effect: "Allow".to_string(),
            action: Action::One("sts:AssumeRole".to_string()),
            principal: Some(Principal {
                service: service_principal.to_string(),
            }),
            resource: None,
        }],
    }
}

/// Allow-list permission policy for an inline policy entry.
pub fn permission_policy(policy: &InlinePolicy) -> PolicyDocument {
    PolicyDocument {
        version: POLICY_VERSION.to_string(),
        statement: vec![Statement {
            sid: None,
            effect: "Allow".to_string(),
            action: Action::Many(policy.actions.clone()),
            principal: None,
            resource: Some(policy.resource.clone()),
        }],
    }
}

/// Declare the role, its policies and attachments, and the instance profile.
pub fn declare(identity: &IdentityConfig) -> Result<Vec<(String, Declaration)>, String> {
    let mut decls = Vec::new();

    decls.push((
        ROLE.to_string(),
        Declaration::new(
            ResourceKind::IamRole,
            Group::Identity,
            format!("role assumable by {}", identity.service_principal),
        )
        .with(
            "assumeRolePolicy",
            Property::str(trust_policy(&identity.service_principal).to_json()?),
        ),
    ));

    for policy in &identity.inline_policies {
        decls.push((
            policy.name.clone(),
            Declaration::new(
                ResourceKind::IamPolicy,
                Group::Identity,
                format!("policy allowing {}", policy.actions.join(", ")),
            )
            .with("policy", Property::str(permission_policy(policy).to_json()?)),
        ));
        decls.push((
            policy.attachment.clone(),
            attachment(
                Property::reference(&policy.name, "arn"),
                format!("attach {} to {}", policy.name, ROLE),
            ),
        ));
    }

    for managed in &identity.managed_policies {
        decls.push((
            managed.attachment.clone(),
            attachment(
                Property::str(&managed.arn),
                format!("attach {} to {}", managed.arn, ROLE),
            ),
        ));
    }

    decls.push((
        INSTANCE_PROFILE.to_string(),
        Declaration::new(
            ResourceKind::InstanceProfile,
            Group::Identity,
            format!("instance profile {} wrapping {}", identity.instance_profile_name, ROLE),
        )
        .with("name", Property::str(&identity.instance_profile_name))
        .with("role", Property::reference(ROLE, "name")),
    ));

    Ok(decls)
}

fn attachment(policy_arn: Property, description: String) -> Declaration {
    Declaration::new(ResourceKind::RolePolicyAttachment, Group::Identity, description)
        .with("policyArn", policy_arn)
        .with("role", Property::reference(ROLE, "name"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn declared() -> IndexMap<String, Declaration> {
        declare(&IdentityConfig::default()).unwrap().into_iter().collect()
    }

    fn trust_from_role(decls: &IndexMap<String, Declaration>) -> PolicyDocument {
        let json = decls[ROLE]
            .property("assumeRolePolicy")
            .and_then(Property::as_str)
            .unwrap();
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_ds008_trust_policy_ec2_only() {
        let doc = trust_from_role(&declared());
        assert_eq!(doc.version, "2012-10-17");
        assert_eq!(doc.statement.len(), 1);
        let st = &doc.statement[0];
        assert_eq!(st.effect, "Allow");
        assert_eq!(st.action, Action::One("sts:AssumeRole".to_string()));
        assert_eq!(
            st.principal,
            Some(Principal {
                service: "ec2.amazonaws.com".to_string()
            })
        );
    }

    #[test]
    fn test_ds008_trust_policy_json_shape() {
        let json = trust_policy("ec2.amazonaws.com").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["Statement"][0]["Principal"], serde_json::json!({"Service": "ec2.amazonaws.com"}));
        assert_eq!(value["Statement"][0]["Action"], "sts:AssumeRole");
        assert_eq!(value["Statement"][0]["Sid"], "");
        assert!(value["Statement"][0].get("Resource").is_none());
    }

    #[test]
    fn test_ds008_three_attachments_on_role() {
        let decls = declared();
        let attachments: Vec<_> = decls
            .iter()
            .filter(|(_, d)| d.kind == ResourceKind::RolePolicyAttachment)
            .collect();
        assert_eq!(attachments.len(), 3);
        for (_, d) in &attachments {
            assert_eq!(d.property("role"), Some(&Property::reference(ROLE, "name")));
        }
        assert_eq!(
            decls["ECR-Readonly-policy-attachment"].property("policyArn"),
            Some(&Property::str("arn:aws:iam::623865992637:policy/ECR_FullAccess"))
        );
        assert_eq!(
            decls["ssm-parameter-policy-attachment"].property("policyArn"),
            Some(&Property::reference("ssm-parameter-policy", "arn"))
        );
    }

    #[test]
    fn test_ds008_ssm_read_policy_actions() {
        let decls = declared();
        let json = decls["ssm-parameter-policy"]
            .property("policy")
            .and_then(Property::as_str)
            .unwrap();
        let doc: PolicyDocument = serde_json::from_str(json).unwrap();
        assert_eq!(
            doc.statement[0].action,
            Action::Many(vec![
                "ssm:GetParameter".to_string(),
                "ssm:GetParameters".to_string(),
                "ssm:GetParametersByPath".to_string(),
            ])
        );
        assert_eq!(doc.statement[0].resource.as_deref(), Some("*"));
    }

    #[test]
    fn test_ds008_instance_profile_wraps_role() {
        let decls = declared();
        let profile = &decls[INSTANCE_PROFILE];
        assert_eq!(profile.kind, ResourceKind::InstanceProfile);
        assert_eq!(profile.property("name"), Some(&Property::str("myProfile")));
        assert_eq!(profile.dependencies(), vec![ROLE]);
    }
}
