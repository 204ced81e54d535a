//! FHIR complex datatypes used by referral bundles.
//!
//! Every struct keeps the elements it does not model in an `extra` map so that a
//! client-submitted bundle survives a parse/patch/render cycle without losing content.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Catch-all for elements a wire struct does not model.
pub type ExtraElements = Map<String, Value>;

/// A (system, value) pair used as a typed business key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

impl Identifier {
    pub fn new(system: impl Into<String>, value: Option<String>) -> Self {
        Self {
            system: Some(system.into()),
            value,
            ..Default::default()
        }
    }
}

/// A single code from a code system.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

impl Coding {
    pub fn new(system: impl Into<String>, code: Option<String>) -> Self {
        Self {
            system: Some(system.into()),
            code,
            ..Default::default()
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

/// One or more alternative codings for the same concept.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

impl CodeableConcept {
    /// A concept carrying exactly one coding.
    pub fn single(coding: Coding) -> Self {
        Self {
            coding: vec![coding],
            ..Default::default()
        }
    }
}

/// A link to another resource, either by local URL or by logical identifier.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

impl Reference {
    pub fn to(url: impl Into<String>) -> Self {
        Self {
            reference: Some(url.into()),
            ..Default::default()
        }
    }

    /// A logical reference: a typed pointer carried by identifier rather than URL.
    pub fn logical(type_name: impl Into<String>, identifier: Identifier) -> Self {
        Self {
            type_name: Some(type_name.into()),
            identifier: Some(identifier),
            ..Default::default()
        }
    }
}

/// An extension element.
///
/// `value[x]` is polymorphic on the wire (`valueReference`, `valueCodeableConcept`, ...). The
/// two shapes the referral profiles use are modelled; any other `value[x]` lands in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_reference: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_codeable_concept: Option<CodeableConcept>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

impl Extension {
    pub fn reference(url: impl Into<String>, value: Reference) -> Self {
        Self {
            url: url.into(),
            value_reference: Some(value),
            ..Default::default()
        }
    }

    pub fn codeable_concept(url: impl Into<String>, value: CodeableConcept) -> Self {
        Self {
            url: url.into(),
            value_codeable_concept: Some(value),
            ..Default::default()
        }
    }

    /// Reads a primitive string child of this extension's value by element name.
    ///
    /// For `{"valueReference": {"reference": "urn:uuid:..."}}` the element `reference` yields
    /// the URL. Element names compare case-insensitively; non-string children yield `None`.
    pub fn value_string_by_element_name(&self, element_name: &str) -> Option<String> {
        if let Some(reference) = &self.value_reference {
            let children = [
                ("reference", reference.reference.as_deref()),
                ("type", reference.type_name.as_deref()),
                ("display", reference.display.as_deref()),
            ];
            return children
                .into_iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(element_name))
                .and_then(|(_, value)| value.map(str::to_owned));
        }

        if let Some(concept) = &self.value_codeable_concept {
            return if "text".eq_ignore_ascii_case(element_name) {
                concept.text.clone()
            } else {
                None
            };
        }

        self.extra
            .iter()
            .filter(|(key, _)| key.starts_with("value"))
            .find_map(|(_, value)| match value {
                Value::Object(children) => children
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(element_name))
                    .and_then(|(_, child)| child.as_str().map(str::to_owned)),
                _ => None,
            })
    }
}

/// Resource metadata. Only the declared profiles are modelled.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profile: Vec<String>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

impl Meta {
    pub fn profile(url: impl Into<String>) -> Self {
        Self {
            profile: vec![url.into()],
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

/// Request urgency (`ServiceRequest.priority`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestPriority {
    Routine,
    Urgent,
    Asap,
    Stat,
}

impl RequestPriority {
    pub const ALL: [RequestPriority; 4] = [Self::Routine, Self::Urgent, Self::Asap, Self::Stat];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Routine => "routine",
            Self::Urgent => "urgent",
            Self::Asap => "asap",
            Self::Stat => "stat",
        }
    }
}

/// Units of time used by `Timing.repeat.periodUnit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitsOfTime {
    #[serde(rename = "s")]
    Second,
    #[serde(rename = "min")]
    Minute,
    #[serde(rename = "h")]
    Hour,
    #[serde(rename = "d")]
    Day,
    #[serde(rename = "wk")]
    Week,
    #[serde(rename = "mo")]
    Month,
    #[serde(rename = "a")]
    Year,
}

impl UnitsOfTime {
    pub const ALL: [UnitsOfTime; 7] = [
        Self::Second,
        Self::Minute,
        Self::Hour,
        Self::Day,
        Self::Week,
        Self::Month,
        Self::Year,
    ];

    /// The UCUM code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Second => "s",
            Self::Minute => "min",
            Self::Hour => "h",
            Self::Day => "d",
            Self::Week => "wk",
            Self::Month => "mo",
            Self::Year => "a",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingRepeat {
    /// Kept as a JSON number so integer and decimal periods render back unchanged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Number>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_unit: Option<UnitsOfTime>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

/// A schedule: explicit event times plus an optional repeat rule.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat: Option<TimingRepeat>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reference_extension_exposes_reference_by_element_name() {
        let ext = Extension::reference("BookingOrganization", Reference::to("urn:uuid:abc"));

        assert_eq!(
            ext.value_string_by_element_name("Reference").as_deref(),
            Some("urn:uuid:abc")
        );
        assert_eq!(ext.value_string_by_element_name("display"), None);
    }

    #[test]
    fn unmodelled_value_is_read_from_extra() {
        let ext: Extension = serde_json::from_value(json!({
            "url": "x",
            "valueIdentifier": { "system": "s", "value": "v" }
        }))
        .expect("parse extension");

        assert_eq!(ext.value_string_by_element_name("value").as_deref(), Some("v"));
        assert_eq!(ext.value_string_by_element_name("missing"), None);
    }

    #[test]
    fn unknown_elements_survive_serialisation() {
        let input = json!({
            "system": "https://fhir.nhs.uk/Id/nhs-number",
            "value": "9449305552",
            "use": "official",
            "period": { "start": "2020-01-01" }
        });

        let identifier: Identifier = serde_json::from_value(input.clone()).expect("parse");
        assert_eq!(identifier.extra.len(), 2);
        assert_eq!(serde_json::to_value(&identifier).expect("render"), input);
    }

    #[test]
    fn units_of_time_use_ucum_codes_on_the_wire() {
        for unit in UnitsOfTime::ALL {
            let rendered = serde_json::to_value(unit).expect("render unit");
            assert_eq!(rendered, json!(unit.code()));
        }
    }
}
