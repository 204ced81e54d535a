//! The closed set of resource kinds a referral bundle may carry.
//!
//! Resources are a tagged union keyed on `resourceType`. Elements outside the referral
//! profiles are kept verbatim in each struct's `extra` map.

use crate::datatypes::{
    Address, CodeableConcept, Coding, ExtraElements, Extension, Identifier, Meta, Reference,
    RequestPriority, Timing,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDestination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Reference>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_coding: Option<Coding>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destination: Vec<MessageDestination>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<MessageSource>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<CodeableConcept>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub focus: Vec<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub based_on: Vec<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<RequestPriority>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_detail: Vec<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrence_timing: Option<Timing>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authored_on: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<Reference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub performer: Vec<Reference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub location_code: Vec<CodeableConcept>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub general_practitioner: Vec<Reference>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Practitioner {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<Coding>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub appointment: Vec<Reference>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentParticipant {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participant: Vec<AppointmentParticipant>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarePlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Reference>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

/// Any resource a referral bundle entry can hold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resourceType")]
pub enum Resource {
    MessageHeader(MessageHeader),
    ServiceRequest(ServiceRequest),
    Patient(Patient),
    Practitioner(Practitioner),
    Organization(Organization),
    Encounter(Encounter),
    Appointment(Appointment),
    CarePlan(CarePlan),
}

impl Resource {
    /// The `resourceType` of this resource.
    pub fn type_name(&self) -> &'static str {
        match self {
            Resource::MessageHeader(_) => MessageHeader::TYPE_NAME,
            Resource::ServiceRequest(_) => ServiceRequest::TYPE_NAME,
            Resource::Patient(_) => Patient::TYPE_NAME,
            Resource::Practitioner(_) => Practitioner::TYPE_NAME,
            Resource::Organization(_) => Organization::TYPE_NAME,
            Resource::Encounter(_) => Encounter::TYPE_NAME,
            Resource::Appointment(_) => Appointment::TYPE_NAME,
            Resource::CarePlan(_) => CarePlan::TYPE_NAME,
        }
    }

    /// The resource's local `id`, used as a role marker within a bundle.
    pub fn local_id(&self) -> Option<&str> {
        match self {
            Resource::MessageHeader(r) => r.id.as_deref(),
            Resource::ServiceRequest(r) => r.id.as_deref(),
            Resource::Patient(r) => r.id.as_deref(),
            Resource::Practitioner(r) => r.id.as_deref(),
            Resource::Organization(r) => r.id.as_deref(),
            Resource::Encounter(r) => r.id.as_deref(),
            Resource::Appointment(r) => r.id.as_deref(),
            Resource::CarePlan(r) => r.id.as_deref(),
        }
    }
}

/// A concrete resource kind that can be projected out of a [`Resource`].
///
/// This is what lets the bundle accessors be generic over the resource they look for while
/// the bundle itself stays a closed sum type.
pub trait BundleResource: Sized {
    const TYPE_NAME: &'static str;

    fn from_resource(resource: &Resource) -> Option<&Self>;

    fn from_resource_mut(resource: &mut Resource) -> Option<&mut Self>;

    fn into_resource(self) -> Resource;

    fn local_id(&self) -> Option<&str>;
}

macro_rules! bundle_resource {
    ($($kind:ident),+ $(,)?) => {
        $(
            impl BundleResource for $kind {
                const TYPE_NAME: &'static str = stringify!($kind);

                fn from_resource(resource: &Resource) -> Option<&Self> {
                    match resource {
                        Resource::$kind(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn from_resource_mut(resource: &mut Resource) -> Option<&mut Self> {
                    match resource {
                        Resource::$kind(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn into_resource(self) -> Resource {
                    Resource::$kind(self)
                }

                fn local_id(&self) -> Option<&str> {
                    self.id.as_deref()
                }
            }

            impl From<$kind> for Resource {
                fn from(value: $kind) -> Self {
                    Resource::$kind(value)
                }
            }
        )+
    };
}

bundle_resource!(
    MessageHeader,
    ServiceRequest,
    Patient,
    Practitioner,
    Organization,
    Encounter,
    Appointment,
    CarePlan,
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resource_type_tag_selects_variant() {
        let resource: Resource = serde_json::from_value(json!({
            "resourceType": "Practitioner",
            "id": "RequestingPractitioner",
            "identifier": [{ "system": "https://fhir.hl7.org.uk/Id/gmc-number", "value": "G1234567" }]
        }))
        .expect("parse practitioner");

        assert_eq!(resource.type_name(), "Practitioner");
        assert_eq!(resource.local_id(), Some("RequestingPractitioner"));
        assert!(Practitioner::from_resource(&resource).is_some());
        assert!(Organization::from_resource(&resource).is_none());
    }

    #[test]
    fn rendered_resource_carries_resource_type() {
        let resource: Resource = CarePlan {
            status: Some("completed".into()),
            ..Default::default()
        }
        .into();

        let rendered = serde_json::to_value(&resource).expect("render");
        assert_eq!(rendered["resourceType"], "CarePlan");
        assert_eq!(rendered["status"], "completed");
    }

    #[test]
    fn unknown_resource_type_is_rejected() {
        let result = serde_json::from_value::<Resource>(json!({ "resourceType": "Condition" }));
        assert!(result.is_err());
    }
}
