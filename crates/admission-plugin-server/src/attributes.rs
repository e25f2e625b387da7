use std::collections::BTreeMap;

use crate::{
    admission_review::{AdmissionReviewSpec, GroupVersionKind, GroupVersionResource},
    decoder::Decoder,
    errors::{DecodeError, Phase},
};

/// The identity of the user that issued the request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserIdentity {
    pub name: String,
    pub uid: String,
    pub groups: Vec<String>,
    pub extra: BTreeMap<String, Vec<String>>,
}

/// The decision request handed over to an admission plugin: what is being
/// done, to which object, and by whom.
#[derive(Clone, Debug, PartialEq)]
pub struct Attributes<O> {
    pub kind: GroupVersionKind,
    pub resource: GroupVersionResource,
    pub sub_resource: String,
    pub namespace: String,
    pub name: String,
    pub operation: String,
    pub user_info: UserIdentity,
    pub object: O,
    /// Not set for creation requests.
    pub old_object: Option<O>,
}

impl<O> Attributes<O> {
    /// Build the decision request out of the `spec` field of an admission review.
    ///
    /// Both embedded objects are decoded using `decoder`, with the kind of the
    /// review as type hint. An `oldObject` holding the `null` literal is not
    /// decoded at all: that's what CREATE requests carry.
    pub fn from_spec<D>(spec: &AdmissionReviewSpec, decoder: &D) -> Result<Self, DecodeError>
    where
        D: Decoder<Object = O>,
    {
        let user_info = UserIdentity {
            name: spec.user_info.username.clone().unwrap_or_default(),
            uid: spec.user_info.uid.clone().unwrap_or_default(),
            groups: spec.user_info.groups.clone().unwrap_or_default(),
            extra: spec
                .user_info
                .extra
                .iter()
                .flatten()
                .map(|(key, values)| (key.clone(), values.clone()))
                .collect(),
        };

        let object = decoder
            .decode(spec.object.as_bytes(), &spec.kind)
            .map_err(|source| DecodeError {
                phase: Phase::Object,
                source,
            })?;

        let old_object = if spec.old_object.is_null() {
            None
        } else {
            let old_object = decoder
                .decode(spec.old_object.as_bytes(), &spec.kind)
                .map_err(|source| DecodeError {
                    phase: Phase::OldObject,
                    source,
                })?;
            Some(old_object)
        };

        Ok(Attributes {
            kind: spec.kind.clone(),
            resource: spec.resource.clone(),
            sub_resource: spec.sub_resource.clone(),
            namespace: spec.namespace.clone(),
            name: spec.name.clone(),
            operation: spec.operation.clone(),
            user_info,
            object,
            old_object,
        })
    }
}
