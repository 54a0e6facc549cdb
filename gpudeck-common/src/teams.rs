use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub member_count: u32,
    /// Role of the signed-in user inside this team.
    #[serde(default)]
    pub user_role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDetail {
    #[serde(flatten)]
    pub team: Team,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Role {
    pub fn permission_set(&self) -> BTreeSet<&str> {
        self.permissions.iter().map(|p| p.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "general".to_string()
}

/// Group permissions by category. Categories are sorted; order inside a
/// category follows the backend list.
pub fn group_permissions(permissions: &[Permission]) -> BTreeMap<String, Vec<Permission>> {
    let mut grouped: BTreeMap<String, Vec<Permission>> = BTreeMap::new();
    for p in permissions {
        grouped.entry(p.category.clone()).or_default().push(p.clone());
    }
    grouped
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

/// URL-safe slug: lowercase ascii alphanumerics separated by single dashes.
pub fn slugify(input: &str) -> String {
    let mut out = String::new();
    let mut last_dash = false;
    for ch in input.trim().to_ascii_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_dash = false;
            continue;
        }
        let is_sep = ch.is_ascii_whitespace() || ch == '_' || ch == '-' || ch == '.';
        if is_sep && !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.len() > 64 {
        out.truncate(64);
        while out.ends_with('-') {
            out.pop();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(name: &str, category: &str) -> Permission {
        Permission {
            name: name.into(),
            description: None,
            category: category.into(),
        }
    }

    #[test]
    fn grouping_keeps_every_permission_once() {
        let perms = vec![
            perm("machines.create", "machines"),
            perm("billing.view", "billing"),
            perm("machines.delete", "machines"),
        ];
        let grouped = group_permissions(&perms);
        assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["billing", "machines"]);
        assert_eq!(
            grouped["machines"]
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>(),
            vec!["machines.create", "machines.delete"]
        );
        assert_eq!(grouped.values().map(|v| v.len()).sum::<usize>(), 3);
    }

    #[test]
    fn missing_category_falls_back_to_general() {
        let p: Permission = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(p.category, "general");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  ML Research__Team. "), "ml-research-team");
        assert_eq!(slugify("Ünïcode!"), "ncode");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn team_detail_flattens_team_fields() {
        let d: TeamDetail = serde_json::from_value(serde_json::json!({
            "id": 4, "name": "Infra", "slug": "infra", "member_count": 3,
            "roles": [{"name": "viewer", "permissions": ["machines.view"]}]
        }))
        .unwrap();
        assert_eq!(d.team.slug, "infra");
        assert_eq!(d.roles[0].permission_set().len(), 1);
    }
}
