//! Bundle wire model and JSON translation helpers.

use crate::datatypes::ExtraElements;
use crate::resources::Resource;
use crate::{FhirError, FhirResult};
use serde::{Deserialize, Serialize};

/// `resourceType` carried by every bundle document.
pub const BUNDLE_RESOURCE_TYPE: &str = "Bundle";

/// Media type for FHIR JSON payloads.
pub const FHIR_JSON_MEDIA_TYPE: &str = "application/fhir+json";

/// An ordered collection of resources, each addressed by a local `fullUrl`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub bundle_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

impl Default for Bundle {
    fn default() -> Self {
        Self {
            resource_type: BUNDLE_RESOURCE_TYPE.to_string(),
            id: None,
            bundle_type: None,
            timestamp: None,
            entry: Vec::new(),
            extra: ExtraElements::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,

    #[serde(flatten)]
    pub extra: ExtraElements,
}

impl BundleEntry {
    pub fn new(full_url: impl Into<String>, resource: impl Into<Resource>) -> Self {
        Self {
            full_url: Some(full_url.into()),
            resource: Some(resource.into()),
            extra: ExtraElements::new(),
        }
    }
}

impl Bundle {
    /// Parse a bundle from FHIR JSON text.
    ///
    /// Syntactically broken JSON is reported as [`FhirError::InvalidJson`]. JSON that does not
    /// match the bundle schema is reported as [`FhirError::Deserialization`] with a best-effort
    /// path (for example `entry[2].resource.priority`) to the failing element, surfaced by
    /// `serde_path_to_error`.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - the text is not valid JSON,
    /// - any element has an unexpected type, or an entry holds an unsupported `resourceType`,
    /// - the document's `resourceType` is not `Bundle`.
    pub fn parse(json_text: &str) -> FhirResult<Bundle> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);

        let bundle = match serde_path_to_error::deserialize::<_, Bundle>(&mut deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                if source.is_syntax() || source.is_eof() {
                    return Err(FhirError::InvalidJson(source.to_string()));
                }
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(FhirError::Deserialization(format!(
                    "Bundle schema mismatch at {path}: {source}"
                )));
            }
        };
        deserializer
            .end()
            .map_err(|e| FhirError::InvalidJson(e.to_string()))?;

        if bundle.resource_type != BUNDLE_RESOURCE_TYPE {
            return Err(FhirError::InvalidInput(format!(
                "Expected resourceType 'Bundle', got '{}'",
                bundle.resource_type
            )));
        }

        Ok(bundle)
    }

    /// Render this bundle as pretty-printed FHIR JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Translation`] if serialisation fails.
    pub fn render(&self) -> FhirResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FhirError::Translation(format!("Failed to serialise bundle: {e}")))
    }

    /// Iterate the resources of all entries that carry one.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.entry.iter().filter_map(|entry| entry.resource.as_ref())
    }
}
