//! Lookups over an in-memory bundle.
//!
//! Every comparison here is a case-insensitive exact match, and every lookup that finds
//! nothing returns `None`. Deciding whether absence is acceptable is the caller's job.
//!
//! References are resolved by a linear scan over the bundle entries; referral bundles hold a
//! handful of entries, so no index is built.

use crate::bundle::Bundle;
use crate::datatypes::{CodeableConcept, Coding, Extension, Identifier, Reference};
use crate::resources::BundleResource;

/// Case-insensitive exact comparison of an optional property against an expected value.
pub fn matches_ignore_case(actual: Option<&str>, expected: &str) -> bool {
    actual.is_some_and(|actual| actual.eq_ignore_ascii_case(expected))
}

// Property accessors for the selectors below.

pub fn identifier_system(identifier: &Identifier) -> Option<&str> {
    identifier.system.as_deref()
}

pub fn coding_system(coding: &Coding) -> Option<&str> {
    coding.system.as_deref()
}

pub fn reference_type(reference: &Reference) -> Option<&str> {
    reference.type_name.as_deref()
}

pub fn extension_url(extension: &Extension) -> Option<&str> {
    Some(extension.url.as_str())
}

pub fn concept_codings(concept: &CodeableConcept) -> &[Coding] {
    &concept.coding
}

impl Bundle {
    /// First resource of kind `T` in entry order.
    pub fn resource_by_type<T: BundleResource>(&self) -> Option<&T> {
        self.resources().find_map(T::from_resource)
    }

    pub fn resource_by_type_mut<T: BundleResource>(&mut self) -> Option<&mut T> {
        self.entry
            .iter_mut()
            .filter_map(|entry| entry.resource.as_mut())
            .find_map(T::from_resource_mut)
    }

    /// The resource at the entry whose `fullUrl` equals `url`, if it is a `T`.
    ///
    /// Only the first entry with a matching `fullUrl` is considered; if that entry holds a
    /// different resource kind the lookup yields `None`.
    pub fn resource_by_url<T: BundleResource>(&self, url: Option<&str>) -> Option<&T> {
        let url = url?;
        self.entry
            .iter()
            .find(|entry| matches_ignore_case(entry.full_url.as_deref(), url))
            .and_then(|entry| entry.resource.as_ref())
            .and_then(T::from_resource)
    }

    pub fn resource_by_url_mut<T: BundleResource>(&mut self, url: Option<&str>) -> Option<&mut T> {
        let url = url?;
        self.entry
            .iter_mut()
            .find(|entry| matches_ignore_case(entry.full_url.as_deref(), url))
            .and_then(|entry| entry.resource.as_mut())
            .and_then(T::from_resource_mut)
    }

    /// As [`Bundle::resource_by_url`], but only if `property` of the resolved resource equals
    /// `expected`.
    pub fn resource_by_url_with_condition<T, F>(
        &self,
        url: Option<&str>,
        property: F,
        expected: &str,
    ) -> Option<&T>
    where
        T: BundleResource,
        F: Fn(&T) -> Option<&str>,
    {
        check_property_value(self.resource_by_url::<T>(url), property, expected)
    }

    /// Resolves each reference in turn and returns the first `T` whose local `id` equals
    /// `local_id`.
    ///
    /// This is how a resource playing a particular role is picked out of a reference list
    /// that mixes several roles (for example a ServiceRequest's `performer` list).
    pub fn resource_by_id_from_references<T: BundleResource>(
        &self,
        references: &[Reference],
        local_id: &str,
    ) -> Option<&T> {
        references
            .iter()
            .filter_map(|reference| self.resource_by_url::<T>(reference.reference.as_deref()))
            .find(|resource| matches_ignore_case(resource.local_id(), local_id))
    }
}

/// Returns `item` only if `property` of it equals `expected`.
pub fn check_property_value<'a, T, F>(item: Option<&'a T>, property: F, expected: &str) -> Option<&'a T>
where
    F: Fn(&T) -> Option<&str>,
{
    item.filter(|&item| matches_ignore_case(property(item), expected))
}

/// First element whose `property` equals `expected`.
pub fn select_with_condition<'a, T, F>(items: &'a [T], property: F, expected: &str) -> Option<&'a T>
where
    F: Fn(&T) -> Option<&str>,
{
    items
        .iter()
        .find(|&item| matches_ignore_case(property(item), expected))
}

pub fn select_with_condition_mut<'a, T, F>(
    items: &'a mut [T],
    property: F,
    expected: &str,
) -> Option<&'a mut T>
where
    F: Fn(&T) -> Option<&str>,
{
    items
        .iter_mut()
        .find(|item| matches_ignore_case(property(&**item), expected))
}

/// A property accessor paired with the value it must equal.
pub type Condition<'c, T> = (&'c dyn Fn(&T) -> Option<&str>, &'c str);

/// First element satisfying every condition.
pub fn select_with_conditions<'a, T>(items: &'a [T], conditions: &[Condition<'_, T>]) -> Option<&'a T> {
    items.iter().find(|&item| {
        conditions
            .iter()
            .all(|(property, expected)| matches_ignore_case(property(item), expected))
    })
}

/// Flattens `items` through `nested` and returns the first inner element whose `property`
/// equals `expected`.
///
/// Used to scan the codings of several CodeableConcepts at once.
pub fn select_nested_with_condition<'a, T, U, N, F>(
    items: &'a [T],
    nested: N,
    property: F,
    expected: &str,
) -> Option<&'a U>
where
    N: Fn(&'a T) -> &'a [U],
    F: Fn(&U) -> Option<&str>,
{
    items
        .iter()
        .flat_map(nested)
        .find(|&inner| matches_ignore_case(property(inner), expected))
}
