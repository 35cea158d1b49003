//! JSON payloads exchanged with the control plane.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub name: String,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub address_list: Vec<String>,
    #[serde(default)]
    pub scale: Option<i64>,
    #[serde(default)]
    pub env_vars: Vec<EnvVar>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub apps: Vec<App>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub teams: Vec<Team>,
}

/// Body of `POST /apps`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewApp {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    pub scale: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
}

/// One operation of a partial app update. Only env vars are patchable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchAppRequest {
    pub op: PatchOp,
    pub path: &'static str,
    pub value: Vec<EnvVar>,
}

impl PatchAppRequest {
    pub const ENV_VARS: &'static str = "/envvars";

    pub fn set_env(vars: Vec<EnvVar>) -> Self {
        Self {
            op: PatchOp::Add,
            path: Self::ENV_VARS,
            value: vars,
        }
    }

    /// Removal only needs the keys; values are sent empty.
    pub fn unset_env<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            op: PatchOp::Remove,
            path: Self::ENV_VARS,
            value: keys
                .into_iter()
                .map(|key| EnvVar {
                    key: key.into(),
                    value: String::new(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_decodes_with_missing_optional_fields() {
        let app: App = serde_json::from_str(r#"{"name": "webapi"}"#).unwrap();
        assert_eq!(app.name, "webapi");
        assert!(app.address_list.is_empty());
        assert_eq!(app.team, None);
    }

    #[test]
    fn env_patch_serializes_as_operation_list() {
        let ops = vec![
            PatchAppRequest::set_env(vec![EnvVar {
                key: "PORT".to_string(),
                value: "8080".to_string(),
            }]),
            PatchAppRequest::unset_env(["DEBUG"]),
        ];
        let json = serde_json::to_value(&ops).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"op": "add", "path": "/envvars", "value": [{"key": "PORT", "value": "8080"}]},
                {"op": "remove", "path": "/envvars", "value": [{"key": "DEBUG", "value": ""}]}
            ])
        );
    }

    #[test]
    fn new_app_omits_missing_team() {
        let app = NewApp {
            name: "webapi".to_string(),
            team: None,
            scale: 2,
        };
        assert_eq!(
            serde_json::to_value(&app).unwrap(),
            serde_json::json!({"name": "webapi", "scale": 2})
        );
    }

    #[test]
    fn user_decodes_nested_teams() {
        let user: User = serde_json::from_str(
            r#"{
                "email": "dev@example.com",
                "isAdmin": true,
                "teams": [
                    {"id": 1, "name": "site", "apps": [{"name": "webapi", "addressList": ["webapi.example.com"]}]}
                ]
            }"#,
        )
        .unwrap();
        assert!(user.is_admin);
        assert_eq!(user.teams[0].apps[0].address_list, vec!["webapi.example.com"]);
    }
}
