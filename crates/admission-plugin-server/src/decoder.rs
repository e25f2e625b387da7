use std::{fmt, marker::PhantomData};

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;

use crate::admission_review::GroupVersionKind;

/// Turns the raw payload of an embedded object into a domain value.
///
/// The decoded objects are compared before and after the admission plugin
/// runs, hence the `Clone + PartialEq` requirement.
pub trait Decoder: Send + Sync + 'static {
    type Object: Clone + PartialEq + fmt::Debug + Send + 'static;

    fn decode(&self, raw: &[u8], kind: &GroupVersionKind) -> Result<Self::Object>;
}

/// Decodes objects as generic JSON documents.
///
/// When both the type hint and the document carry a kind, they must agree.
#[derive(Clone, Debug, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    type Object = serde_json::Value;

    fn decode(&self, raw: &[u8], kind: &GroupVersionKind) -> Result<Self::Object> {
        let value: serde_json::Value = serde_json::from_slice(raw)?;
        if !value.is_object() {
            return Err(anyhow!("decoded object is not a JSON object: {value}"));
        }
        if let Some(object_kind) = value.get("kind").and_then(|k| k.as_str()) {
            if !kind.kind.is_empty() && object_kind != kind.kind {
                return Err(anyhow!(
                    "decoded object is a {object_kind}, expected a {}",
                    kind.kind
                ));
            }
        }

        Ok(value)
    }
}

/// Decodes objects into a typed Kubernetes resource, like
/// `k8s_openapi::api::core::v1::Pod`.
///
/// The type hint is not consulted: the decoded object must be a `K`.
pub struct TypedDecoder<K> {
    _kind: PhantomData<fn() -> K>,
}

impl<K> TypedDecoder<K> {
    pub fn new() -> Self {
        TypedDecoder { _kind: PhantomData }
    }
}

impl<K> Default for TypedDecoder<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Decoder for TypedDecoder<K>
where
    K: k8s_openapi::Resource + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + 'static,
{
    type Object = K;

    fn decode(&self, raw: &[u8], _kind: &GroupVersionKind) -> Result<Self::Object> {
        let value: serde_json::Value = serde_json::from_slice(raw)?;
        match value.get("kind").and_then(|k| k.as_str()) {
            Some(object_kind) if object_kind == K::KIND => {}
            Some(object_kind) => {
                return Err(anyhow!(
                    "decoded object is not a {}, got {object_kind}",
                    K::KIND
                ))
            }
            None => return Err(anyhow!("decoded object is not a {}", K::KIND)),
        }

        serde_json::from_value(value).map_err(|e| anyhow!("cannot decode {}: {e}", K::KIND))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Pod;
    use rstest::*;

    fn pod_kind() -> GroupVersionKind {
        GroupVersionKind {
            group: String::new(),
            version: "v1".to_owned(),
            kind: "Pod".to_owned(),
        }
    }

    #[test]
    fn typed_decoder_decodes_pods() {
        let raw = br#"{"apiVersion":"v1","kind":"Pod","metadata":{"name":"pod0"},"spec":{"nodeName":"node0","containers":[]}}"#;

        let pod = TypedDecoder::<Pod>::new()
            .decode(raw, &pod_kind())
            .expect("cannot decode pod");
        assert_eq!(pod.metadata.name.as_deref(), Some("pod0"));
        assert_eq!(
            pod.spec.and_then(|spec| spec.node_name).as_deref(),
            Some("node0")
        );
    }

    #[rstest]
    #[case::service(br#"{"apiVersion":"v1","kind":"Service","metadata":{"name":"service"}}"#.as_slice())]
    #[case::no_kind(br#"{"metadata":{"name":"pod0"}}"#.as_slice())]
    #[case::null(b"null".as_slice())]
    #[case::garbage(b"not json".as_slice())]
    fn typed_decoder_rejects(#[case] raw: &[u8]) {
        assert!(TypedDecoder::<Pod>::new().decode(raw, &pod_kind()).is_err());
    }

    #[rstest]
    #[case::matching_kind(br#"{"kind":"Pod"}"#.as_slice(), pod_kind(), true)]
    #[case::no_object_kind(br#"{"metadata":{}}"#.as_slice(), pod_kind(), true)]
    #[case::no_hint(br#"{"kind":"Service"}"#.as_slice(), GroupVersionKind::default(), true)]
    #[case::mismatch(br#"{"kind":"Service"}"#.as_slice(), pod_kind(), false)]
    #[case::null(b"null".as_slice(), pod_kind(), false)]
    #[case::array(b"[]".as_slice(), pod_kind(), false)]
    fn json_decoder(#[case] raw: &[u8], #[case] kind: GroupVersionKind, #[case] ok: bool) {
        assert_eq!(ok, JsonDecoder.decode(raw, &kind).is_ok());
    }
}
