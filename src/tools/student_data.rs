//! The `get_student_data` tool and the `user://` resources built on it.
//!
//! Tool arguments bind to [`StudentDataArgs`], which maps them onto the
//! backend's flat query parameters:
//!
//! - `all_modules` wins: only `user_id`, `all=1` and the filters are sent
//! - boolean module flags are sent as `1`
//! - `activitati_recente` / `utilizatori_compatibili` are clamped into `1..=10`
//! - `only` / `focus` outside their enumerations are dropped without error

use serde::Deserialize;
use serde_json::{json, Number, Value};

use crate::backend::{BackendClient, BackendQuery};
use crate::error::ArgumentError;
use crate::tools::{HandlerFuture, ResourceDescriptor, ToolContext, ToolDescriptor};

/// Registered tool name.
pub const TOOL_NAME: &str = "get_student_data";

/// Accepted values for the `focus` filter.
pub const FOCUS_VALUES: [&str; 4] = ["toate", "judet", "an_admitere", "judet_si_an"];

/// Accepted values for the `only` activity-type filter.
pub const ONLY_VALUES: [&str; 7] = [
    "a_citit_materia",
    "a_simulat_examenul",
    "s_a_testat_pe_lectie_capitol",
    "are_lacune_de_clarificat",
    "a_notat_la_lectii",
    "are_provocari_sustinute",
    "este_in_eroare_la",
];

/// Lower bound for the bounded count modules.
pub const MIN_COUNT: i64 = 1;

/// Upper bound for the bounded count modules.
pub const MAX_COUNT: i64 = 10;

/// URI of the profile resource.
pub const PROFILE_RESOURCE_URI: &str = "user://profile/{user_id}";

/// URI of the complete-data resource.
pub const COMPLETE_DATA_RESOURCE_URI: &str = "user://data/{user_id}";

/// Typed arguments of `get_student_data`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudentDataArgs {
    /// User whose data is requested.
    pub user_id: i64,
    /// Include the user profile.
    #[serde(default)]
    pub user_profile: bool,
    /// Number of recent activities (clamped to `1..=10`).
    #[serde(default)]
    pub activitati_recente: Option<Number>,
    /// Include the behavioural profile.
    #[serde(default)]
    pub profil_comportamental: bool,
    /// Include theory progress.
    #[serde(default)]
    pub progres_teorie: bool,
    /// Include the knowledge-gap analysis.
    #[serde(default)]
    pub analiza_lacunelor: bool,
    /// Number of compatible peers (clamped to `1..=10`).
    #[serde(default)]
    pub utilizatori_compatibili: Option<Number>,
    /// Subject id filter.
    #[serde(default)]
    pub materie: Option<i64>,
    /// Activity-type filter.
    #[serde(default)]
    pub only: Option<String>,
    /// Geographic/temporal filter for compatible peers.
    #[serde(default)]
    pub focus: Option<String>,
    /// Turn recommendations into LLM instructions.
    #[serde(default)]
    pub instructiuni_llm: bool,
    /// Request every module.
    #[serde(default)]
    pub all_modules: bool,
}

impl StudentDataArgs {
    /// Creates arguments for `user_id` with every module off.
    #[must_use]
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    /// Binds raw `tools/call` arguments.
    ///
    /// A missing `arguments` value (`null`) binds like an empty object, so
    /// the required `user_id` is reported as missing.
    ///
    /// # Errors
    ///
    /// Returns an error if `arguments` is not an object, `user_id` is
    /// missing, a field has the wrong type, or an unknown field is present.
    pub fn bind(arguments: Value) -> Result<Self, ArgumentError> {
        let arguments = match arguments {
            Value::Null => Value::Object(serde_json::Map::new()),
            Value::Object(_) => arguments,
            _ => return Err(ArgumentError::NotAnObject { tool: TOOL_NAME }),
        };
        serde_json::from_value(arguments).map_err(|source| ArgumentError::Invalid {
            tool: TOOL_NAME,
            source,
        })
    }

    /// Builds the backend query for these arguments.
    #[must_use]
    pub fn to_query(&self) -> BackendQuery {
        let mut query = BackendQuery::new();
        query.insert("user_id", self.user_id);

        if self.all_modules {
            query.insert("all", 1_i64);
        } else {
            if self.user_profile {
                query.insert("user_profile", 1_i64);
            }
            if let Some(count) = &self.activitati_recente {
                query.insert("activitati_recente", clamp_count(count));
            }
            if self.profil_comportamental {
                query.insert("profil_comportamental", 1_i64);
            }
            if self.progres_teorie {
                query.insert("progres_teorie", 1_i64);
            }
            if self.analiza_lacunelor {
                query.insert("analiza_lacunelor", 1_i64);
            }
            if let Some(count) = &self.utilizatori_compatibili {
                query.insert("utilizatori_compatibili", clamp_count(count));
            }
            if self.instructiuni_llm {
                query.insert("instructiuni_llm", 1_i64);
            }
        }

        // Subject 0 means "no filter".
        if let Some(materie) = self.materie.filter(|&m| m != 0) {
            query.insert("materie", materie);
        }
        if let Some(focus) = accepted(self.focus.as_deref(), &FOCUS_VALUES) {
            query.insert("focus", focus);
        }
        if let Some(only) = accepted(self.only.as_deref(), &ONLY_VALUES) {
            query.insert("only", only);
        }

        query
    }

    /// Echo of the requested modules, as received.
    fn modules_requested(&self) -> Value {
        json!({
            "user_profile": self.user_profile,
            "activitati_recente": self.activitati_recente,
            "profil_comportamental": self.profil_comportamental,
            "progres_teorie": self.progres_teorie,
            "analiza_lacunelor": self.analiza_lacunelor,
            "utilizatori_compatibili": self.utilizatori_compatibili,
            "instructiuni_llm": self.instructiuni_llm,
            "all_modules": self.all_modules,
        })
    }

    fn filters(&self) -> Value {
        json!({
            "materie": self.materie,
            "only": self.only,
            "focus": self.focus,
        })
    }
}

/// Saturates any JSON number into `MIN_COUNT..=MAX_COUNT`.
#[allow(clippy::cast_possible_truncation)] // `as` saturates out-of-range floats
fn clamp_count(count: &Number) -> i64 {
    count
        .as_i64()
        .or_else(|| count.as_f64().map(|f| f as i64))
        .unwrap_or(MAX_COUNT)
        .clamp(MIN_COUNT, MAX_COUNT)
}

fn accepted<'a>(value: Option<&'a str>, allowed: &[&str]) -> Option<&'a str> {
    value.filter(|v| allowed.iter().any(|a| a == v))
}

/// Fetches student data and shapes the tool result.
///
/// Backend failures, and backend payloads carrying an `error` key, come
/// back as `{"error": ...}`. This is a normal tool result, not a fault.
pub async fn get_student_data(backend: &BackendClient, args: &StudentDataArgs) -> Value {
    let query = args.to_query();

    let data = match backend.fetch(&query).await {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(user_id = args.user_id, error = %e, "Backend call failed");
            return json!({ "error": e.to_string() });
        }
    };

    if let Some(error) = data.get("error") {
        tracing::warn!(user_id = args.user_id, "Backend reported an error");
        return json!({ "error": error });
    }

    let metadata = data.get("metadata").cloned().unwrap_or_else(|| json!({}));

    json!({
        "tool": TOOL_NAME,
        "user_id": args.user_id,
        "modules_requested": args.modules_requested(),
        "filters": args.filters(),
        "data": data,
        "metadata": metadata,
    })
}

fn call_get_student_data(
    context: &ToolContext,
    arguments: Value,
) -> HandlerFuture<'_, Result<Value, ArgumentError>> {
    Box::pin(async move {
        let args = StudentDataArgs::bind(arguments)?;
        Ok(get_student_data(&context.backend, &args).await)
    })
}

fn read_profile_resource(context: &ToolContext) -> HandlerFuture<'_, String> {
    Box::pin(async move {
        let args = StudentDataArgs {
            user_profile: true,
            ..StudentDataArgs::for_user(context.resource_user_id)
        };
        render(&get_student_data(&context.backend, &args).await)
    })
}

fn read_complete_data_resource(context: &ToolContext) -> HandlerFuture<'_, String> {
    Box::pin(async move {
        let args = StudentDataArgs {
            all_modules: true,
            ..StudentDataArgs::for_user(context.resource_user_id)
        };
        render(&get_student_data(&context.backend, &args).await)
    })
}

fn render(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to render resource");
        json!({ "error": e.to_string() }).to_string()
    })
}

/// Descriptor for `get_student_data`.
#[must_use]
pub fn tool_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: TOOL_NAME,
        description: "Retrieve a student's data from the AcademiaDePolitie internal modular API. \
                      Select individual modules or request all of them, optionally filtered by \
                      subject, activity type or peer-matching focus.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "user_id": {
                    "type": "integer",
                    "description": "User id (required)"
                },
                "user_profile": {
                    "type": "boolean",
                    "description": "Include the user profile"
                },
                "activitati_recente": {
                    "type": "integer",
                    "minimum": MIN_COUNT,
                    "maximum": MAX_COUNT,
                    "description": "Number of recent activities (1 = last activity, 10 = last ten)"
                },
                "profil_comportamental": {
                    "type": "boolean",
                    "description": "Include the behavioural profile (needs materie)"
                },
                "progres_teorie": {
                    "type": "boolean",
                    "description": "Include theory progress"
                },
                "analiza_lacunelor": {
                    "type": "boolean",
                    "description": "Include the knowledge-gap analysis"
                },
                "utilizatori_compatibili": {
                    "type": "integer",
                    "minimum": MIN_COUNT,
                    "maximum": MAX_COUNT,
                    "description": "Number of compatible users for peer matching"
                },
                "materie": {
                    "type": "integer",
                    "description": "Subject id filter"
                },
                "only": {
                    "type": "string",
                    "enum": ONLY_VALUES,
                    "description": "Filter by activity type"
                },
                "focus": {
                    "type": "string",
                    "enum": FOCUS_VALUES,
                    "description": "Geographic/temporal filter for utilizatori_compatibili"
                },
                "instructiuni_llm": {
                    "type": "boolean",
                    "description": "Turn recommendations into instructions for the LLM"
                },
                "all_modules": {
                    "type": "boolean",
                    "description": "Include every module"
                }
            },
            "required": ["user_id"]
        }),
        handler: call_get_student_data,
    }
}

/// Descriptors for the `user://` resources, in registration order.
#[must_use]
pub fn resource_descriptors() -> Vec<ResourceDescriptor> {
    vec![
        ResourceDescriptor {
            uri: PROFILE_RESOURCE_URI,
            name: "User Profile",
            description: "The user's profile",
            producer: read_profile_resource,
        },
        ResourceDescriptor {
            uri: COMPLETE_DATA_RESOURCE_URI,
            name: "User Complete Data",
            description: "Every data module for the user",
            producer: read_complete_data_resource,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::QueryValue;
    use crate::config::ApiConfig;
    use httpmock::prelude::*;

    fn bind(arguments: Value) -> StudentDataArgs {
        StudentDataArgs::bind(arguments).unwrap()
    }

    fn int(query: &BackendQuery, key: &str) -> Option<i64> {
        match query.get(key) {
            Some(QueryValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    fn backend_for(server: &MockServer) -> BackendClient {
        let config = ApiConfig {
            base_url: server.base_url(),
            timeout_secs: 5,
            ..ApiConfig::default()
        };
        BackendClient::new(&config, Some("test-token".to_string())).unwrap()
    }

    #[test]
    fn user_id_is_required() {
        let err = StudentDataArgs::bind(json!({"user_profile": true})).unwrap_err();
        assert!(err.to_string().contains("user_id"));
    }

    #[test]
    fn missing_arguments_report_user_id() {
        let err = StudentDataArgs::bind(Value::Null).unwrap_err();
        assert!(err.to_string().contains("user_id"));
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        let err = StudentDataArgs::bind(json!([4001])).unwrap_err();
        assert!(matches!(err, ArgumentError::NotAnObject { .. }));
    }

    #[test]
    fn unknown_argument_is_rejected() {
        let err = StudentDataArgs::bind(json!({"user_id": 1, "colour": "red"})).unwrap_err();
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn wrong_type_is_rejected() {
        assert!(StudentDataArgs::bind(json!({"user_id": "4001"})).is_err());
    }

    #[test]
    fn bare_user_id_sends_only_user_id() {
        let query = bind(json!({"user_id": 4001})).to_query();
        assert_eq!(query.keys().collect::<Vec<_>>(), ["user_id"]);
        assert_eq!(int(&query, "user_id"), Some(4001));
    }

    #[test]
    fn all_modules_overrides_individual_flags() {
        let query = bind(json!({
            "user_id": 4001,
            "all_modules": true,
            "user_profile": true,
            "activitati_recente": 3,
            "instructiuni_llm": true,
            "materie": 2,
            "focus": "judet",
            "only": "a_citit_materia"
        }))
        .to_query();

        assert_eq!(int(&query, "all"), Some(1));
        assert!(!query.contains("user_profile"));
        assert!(!query.contains("activitati_recente"));
        assert!(!query.contains("instructiuni_llm"));
        assert_eq!(
            query.keys().collect::<Vec<_>>(),
            ["user_id", "all", "materie", "focus", "only"]
        );
    }

    #[test]
    fn flags_are_encoded_as_one() {
        let query = bind(json!({
            "user_id": 4001,
            "user_profile": true,
            "profil_comportamental": true,
            "progres_teorie": true,
            "analiza_lacunelor": true,
            "instructiuni_llm": true
        }))
        .to_query();

        for key in [
            "user_profile",
            "profil_comportamental",
            "progres_teorie",
            "analiza_lacunelor",
            "instructiuni_llm",
        ] {
            assert_eq!(int(&query, key), Some(1), "{key}");
        }
        assert!(!query.contains("all"));
    }

    #[test]
    fn false_flags_are_omitted() {
        let query = bind(json!({"user_id": 4001, "user_profile": false})).to_query();
        assert!(!query.contains("user_profile"));
    }

    #[test]
    fn counts_are_clamped() {
        let high = bind(json!({"user_id": 4001, "activitati_recente": 15})).to_query();
        assert_eq!(int(&high, "activitati_recente"), Some(10));

        let low = bind(json!({"user_id": 4001, "activitati_recente": 0})).to_query();
        assert_eq!(int(&low, "activitati_recente"), Some(1));

        let peers = bind(json!({"user_id": 4001, "utilizatori_compatibili": -5})).to_query();
        assert_eq!(int(&peers, "utilizatori_compatibili"), Some(1));

        let in_range = bind(json!({"user_id": 4001, "utilizatori_compatibili": 7})).to_query();
        assert_eq!(int(&in_range, "utilizatori_compatibili"), Some(7));
    }

    #[test]
    fn counts_outside_i64_are_clamped() {
        let huge: Value = serde_json::from_str(
            r#"{"user_id": 4001, "activitati_recente": 99999999999999999999}"#,
        )
        .unwrap();
        assert_eq!(int(&bind(huge).to_query(), "activitati_recente"), Some(10));

        let float = bind(json!({"user_id": 4001, "activitati_recente": 1e20})).to_query();
        assert_eq!(int(&float, "activitati_recente"), Some(10));

        let negative = bind(json!({"user_id": 4001, "utilizatori_compatibili": -1e20})).to_query();
        assert_eq!(int(&negative, "utilizatori_compatibili"), Some(1));

        let fraction = bind(json!({"user_id": 4001, "utilizatori_compatibili": 4.5})).to_query();
        assert_eq!(int(&fraction, "utilizatori_compatibili"), Some(4));
    }

    #[test]
    fn huge_count_is_echoed_as_received() {
        let args = bind(json!({"user_id": 4001, "activitati_recente": 1e20}));
        assert_eq!(args.modules_requested()["activitati_recente"], json!(1e20));
    }

    #[test]
    fn invalid_only_is_dropped() {
        let query = bind(json!({"user_id": 4001, "only": "not_a_real_value"})).to_query();
        assert!(!query.contains("only"));

        let query = bind(json!({"user_id": 4001, "only": "este_in_eroare_la"})).to_query();
        assert_eq!(
            query.get("only"),
            Some(&QueryValue::Str("este_in_eroare_la".to_string()))
        );
    }

    #[test]
    fn focus_is_checked_against_enum() {
        let query = bind(json!({"user_id": 4001, "focus": "judet"})).to_query();
        assert_eq!(query.get("focus"), Some(&QueryValue::Str("judet".to_string())));

        let query = bind(json!({"user_id": 4001, "focus": "invalid"})).to_query();
        assert!(!query.contains("focus"));
    }

    #[test]
    fn zero_materie_is_omitted() {
        let query = bind(json!({"user_id": 4001, "materie": 0})).to_query();
        assert!(!query.contains("materie"));

        let query = bind(json!({"user_id": 4001, "materie": 3})).to_query();
        assert_eq!(int(&query, "materie"), Some(3));
    }

    #[test]
    fn key_order_follows_module_order() {
        let query = bind(json!({
            "user_id": 4001,
            "instructiuni_llm": true,
            "utilizatori_compatibili": 2,
            "user_profile": true,
            "activitati_recente": 2,
            "focus": "judet",
            "materie": 1
        }))
        .to_query();

        assert_eq!(
            query.keys().collect::<Vec<_>>(),
            [
                "user_id",
                "user_profile",
                "activitati_recente",
                "utilizatori_compatibili",
                "instructiuni_llm",
                "materie",
                "focus",
            ]
        );
    }

    #[test]
    fn schema_lists_every_argument() {
        let descriptor = tool_descriptor();
        let properties = descriptor.input_schema["properties"].as_object().unwrap();
        assert_eq!(properties.len(), 12);
        assert_eq!(descriptor.input_schema["required"], json!(["user_id"]));
        assert_eq!(properties["focus"]["enum"].as_array().unwrap().len(), 4);
        assert_eq!(properties["only"]["enum"].as_array().unwrap().len(), 7);
        assert_eq!(properties["activitati_recente"]["maximum"], json!(10));
    }

    #[tokio::test]
    async fn success_envelope_echoes_request() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/profile_for_conversation.php")
                .query_param("user_id", "4001")
                .query_param("activitati_recente", "10");
            then.status(200).json_body(json!({
                "activitati": [],
                "metadata": {"generated": "now"}
            }));
        });

        let args = bind(json!({"user_id": 4001, "activitati_recente": 15, "only": "bogus"}));
        let result = get_student_data(&backend_for(&server), &args).await;

        assert_eq!(result["tool"], "get_student_data");
        assert_eq!(result["user_id"], 4001);
        // Echo is unclamped.
        assert_eq!(result["modules_requested"]["activitati_recente"], 15);
        assert_eq!(result["modules_requested"]["all_modules"], false);
        assert_eq!(result["filters"]["only"], "bogus");
        assert_eq!(result["filters"]["materie"], Value::Null);
        assert_eq!(result["data"]["activitati"], json!([]));
        assert_eq!(result["metadata"], json!({"generated": "now"}));
    }

    #[tokio::test]
    async fn missing_metadata_defaults_to_empty_object() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/profile_for_conversation.php");
            then.status(200).json_body(json!({"profile": {}}));
        });

        let result = get_student_data(&backend_for(&server), &StudentDataArgs::for_user(1)).await;
        assert_eq!(result["metadata"], json!({}));
    }

    #[tokio::test]
    async fn backend_error_field_becomes_tool_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/profile_for_conversation.php");
            then.status(200).json_body(json!({"error": "Invalid token"}));
        });

        let result = get_student_data(&backend_for(&server), &StudentDataArgs::for_user(1)).await;
        assert_eq!(result, json!({"error": "Invalid token"}));
    }

    #[tokio::test]
    async fn http_failure_becomes_tool_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/profile_for_conversation.php");
            then.status(500);
        });

        let result = get_student_data(&backend_for(&server), &StudentDataArgs::for_user(1)).await;
        let message = result["error"].as_str().unwrap();
        assert!(message.starts_with("API call failed"));
        assert!(result.get("tool").is_none());
    }
}
