use k8s_openapi::api::authentication::v1::UserInfo;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::verdict::Verdict;

/// The only envelope kind accepted by the webhook.
pub const ADMISSION_REVIEW_KIND: &str = "AdmissionReview";

/// The only envelope version accepted by the webhook.
pub const ADMISSION_REVIEW_API_VERSION: &str = "admissionregistration.k8s.io/v1alpha1";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupVersionResource {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub resource: String,
}

/// An embedded object, kept as the exact JSON text sent by the caller.
///
/// A missing object is represented by the JSON `null` literal.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawExtension(Box<RawValue>);

impl RawExtension {
    pub fn new(raw: Box<RawValue>) -> Self {
        RawExtension(raw)
    }

    pub fn from_value<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        serde_json::value::to_raw_value(value).map(RawExtension)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.get().as_bytes()
    }

    pub fn is_null(&self) -> bool {
        self.0.get().trim() == "null"
    }
}

impl Default for RawExtension {
    fn default() -> Self {
        RawExtension(RawValue::NULL.to_owned())
    }
}

impl PartialEq for RawExtension {
    fn eq(&self, other: &Self) -> bool {
        self.0.get() == other.0.get()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReviewSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub resource: GroupVersionResource,
    #[serde(default)]
    pub sub_resource: String,
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub object: RawExtension,
    #[serde(default)]
    pub old_object: RawExtension,
    #[serde(default)]
    pub kind: GroupVersionKind,
    #[serde(default)]
    pub user_info: UserInfo,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionReviewResult {
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionReviewStatus {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AdmissionReviewResult>,
}

impl From<Verdict> for AdmissionReviewStatus {
    fn from(verdict: Verdict) -> Self {
        let result = if verdict.allowed {
            None
        } else {
            Some(AdmissionReviewResult {
                reason: verdict.reason.unwrap_or_default(),
            })
        };

        AdmissionReviewStatus {
            allowed: verdict.allowed,
            result,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    #[serde(default)]
    pub spec: AdmissionReviewSpec,

    #[serde(default)]
    pub status: AdmissionReviewStatus,
}

impl AdmissionReview {
    pub fn from_slice(raw: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(raw)
    }

    /// Returns true when the envelope type tag is the one this webhook speaks.
    pub fn is_supported(&self) -> bool {
        self.kind == ADMISSION_REVIEW_KIND && self.api_version == ADMISSION_REVIEW_API_VERSION
    }

    /// Echo the envelope back to the caller, replacing only its status.
    pub fn with_verdict(self, verdict: Verdict) -> Self {
        AdmissionReview {
            status: verdict.into(),
            ..self
        }
    }

    pub fn to_json_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeMap;

    pub(crate) const ADMISSION_REVIEW: &str = r#"
        {
            "kind": "AdmissionReview",
            "apiVersion": "admissionregistration.k8s.io/v1alpha1",
            "spec": {
                "name": "pod0",
                "namespace": "namespace1",
                "resource": {"group":"","version":"v1","resource":"pods"},
                "subResource": "status",
                "operation": "UPDATE",
                "kind": {"group":"","version":"v1","kind":"Pod"},
                "userInfo": {
                    "username": "admin",
                    "uid": "014fbff9a07c",
                    "groups": ["system:authenticated","my-admin-group"],
                    "extra": {
                        "some-key":["some-value1", "some-value2"]
                    }
                },
                "object": {"apiVersion":"v1","kind":"Pod","metadata":{"name":"pod0"}},
                "oldObject": {"apiVersion":"v1","kind":"Pod","metadata":{"name":"pod0"}}
            }
        }
    "#;

    #[test]
    fn good_input() {
        let ar = AdmissionReview::from_slice(ADMISSION_REVIEW.as_bytes())
            .expect("deserialization should work");
        assert!(ar.is_supported());

        let spec = ar.spec;
        assert_eq!(spec.name, "pod0");
        assert_eq!(spec.namespace, "namespace1");
        assert_eq!(spec.operation, "UPDATE");
        assert_eq!(spec.sub_resource, "status");
        assert_eq!(spec.kind.group, "");
        assert_eq!(spec.kind.version, "v1");
        assert_eq!(spec.kind.kind, "Pod");
        assert_eq!(spec.resource.resource, "pods");
        assert_eq!(spec.resource.version, "v1");

        assert_eq!(spec.user_info.username.unwrap(), "admin");
        assert_eq!(spec.user_info.uid.unwrap(), "014fbff9a07c");
        assert_eq!(
            spec.user_info.groups.unwrap(),
            vec!["system:authenticated", "my-admin-group"]
        );
        let mut expected_extra_values = BTreeMap::new();
        expected_extra_values.insert(
            String::from("some-key"),
            vec![String::from("some-value1"), String::from("some-value2")],
        );
        assert_eq!(spec.user_info.extra.unwrap(), expected_extra_values);

        assert!(!spec.object.is_null());
        assert_eq!(
            spec.object.as_bytes(),
            br#"{"apiVersion":"v1","kind":"Pod","metadata":{"name":"pod0"}}"#
        );
        assert!(!spec.old_object.is_null());
    }

    #[test]
    fn missing_and_null_objects_are_null_literals() {
        let input = r#"
            {
                "kind": "AdmissionReview",
                "apiVersion": "admissionregistration.k8s.io/v1alpha1",
                "spec": { "operation": "CREATE", "oldObject": null }
            }
        "#;
        let ar = AdmissionReview::from_slice(input.as_bytes()).unwrap();

        assert!(ar.spec.object.is_null());
        assert!(ar.spec.old_object.is_null());
        assert_eq!(ar.spec.old_object.as_bytes(), b"null");
    }

    #[test]
    fn unsupported_envelopes() {
        let mut ar = AdmissionReview::from_slice(ADMISSION_REVIEW.as_bytes()).unwrap();
        ar.api_version = "bad.meta/reject".to_owned();
        assert!(!ar.is_supported());

        ar.api_version = ADMISSION_REVIEW_API_VERSION.to_owned();
        ar.kind = "BadKind".to_owned();
        assert!(!ar.is_supported());
    }

    #[test]
    fn verdict_replaces_only_the_status() {
        let ar = AdmissionReview::from_slice(ADMISSION_REVIEW.as_bytes()).unwrap();
        let spec = ar.spec.clone();

        let allowed = ar.clone().with_verdict(Verdict::allow());
        assert_eq!(allowed.kind, ADMISSION_REVIEW_KIND);
        assert_eq!(allowed.api_version, ADMISSION_REVIEW_API_VERSION);
        assert_eq!(allowed.spec, spec);
        assert_eq!(
            allowed.status,
            AdmissionReviewStatus {
                allowed: true,
                result: None
            }
        );

        let denied = ar.with_verdict(Verdict::deny("nope"));
        assert_eq!(denied.spec, spec);
        assert_eq!(
            denied.status,
            AdmissionReviewStatus {
                allowed: false,
                result: Some(AdmissionReviewResult {
                    reason: "nope".to_owned()
                })
            }
        );
    }

    #[test]
    fn encoded_status() {
        let ar = AdmissionReview::from_slice(ADMISSION_REVIEW.as_bytes()).unwrap();

        let encoded = ar.clone().with_verdict(Verdict::allow()).to_json_vec().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(value["status"], serde_json::json!({"allowed": true}));
        assert_eq!(
            value["spec"]["object"],
            serde_json::json!({"apiVersion":"v1","kind":"Pod","metadata":{"name":"pod0"}})
        );

        let encoded = ar.with_verdict(Verdict::deny("nope")).to_json_vec().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(
            value["status"],
            serde_json::json!({"allowed": false, "result": {"reason": "nope"}})
        );
    }
}
