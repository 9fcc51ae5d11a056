//! Options shared by collection queries and single-item fetches.

use crate::error::QueryResult;
use crate::field::{validate_all, validate_field_path};
use crate::params::{validate_param_key, WireParameters};
use crate::projection::{string_array, Projection, BASE_SCOPE};
use serde_json::Value;
use std::collections::BTreeSet;

/// Raw key that encodes the same instruction as [`ConfigureRequest::include_content_type`].
pub const RAW_INCLUDE_SCHEMA: &str = "include_schema";

/// Projection, reference inclusion, locale and feature flags of a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    projection: Projection,
    references: BTreeSet<String>,
    locale: Option<String>,
    include_fallback: bool,
    include_metadata: bool,
    include_embedded_items: bool,
    include_branch: bool,
    include_content_type: bool,
    raw: WireParameters,
}

impl RequestOptions {
    /// Returns the projection spec.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Returns the reference paths to resolve and embed.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.references.iter().map(String::as_str)
    }

    /// Returns the requested locale.
    pub fn requested_locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Returns true if the content type schema was requested alongside the result.
    pub fn includes_content_type(&self) -> bool {
        self.include_content_type
    }

    /// Returns parameters added through the raw escape hatch.
    pub fn raw_params(&self) -> &WireParameters {
        &self.raw
    }

    /// Writes these options into `params`. Raw parameters go first so
    /// canonical keys of the same name win.
    pub(crate) fn write_params(&self, params: &mut WireParameters) {
        params.extend(&self.raw);
        self.projection.write_params(params);
        if !self.references.is_empty() {
            params.insert(
                "include[]",
                string_array(self.references.iter().cloned()),
            );
        }
        if let Some(locale) = &self.locale {
            params.insert("locale", locale.clone());
        }
        if self.include_fallback {
            params.insert("include_fallback", true);
        }
        if self.include_metadata {
            params.insert("include_metadata", true);
        }
        if self.include_embedded_items {
            params.insert("include_embedded_items[]", string_array([BASE_SCOPE.to_string()]));
        }
        if self.include_branch {
            params.insert("include_branch", true);
        }
        if self.include_content_type {
            params.insert("include_content_type", true);
            params.insert("include_global_field_schema", true);
        }
    }
}

/// Fluent option methods for anything that owns [`RequestOptions`].
pub trait ConfigureRequest: Sized {
    /// Returns the options this builder writes into.
    fn options_mut(&mut self) -> &mut RequestOptions;

    /// Restricts the result to `fields`.
    fn only<I, S>(&mut self, fields: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields = validate_all(fields)?;
        self.options_mut().projection.add_only(BASE_SCOPE, fields);
        Ok(self)
    }

    /// Restricts the embedded `reference` to `fields` and includes it.
    fn only_in_reference<I, S>(&mut self, reference: &str, fields: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        validate_field_path(reference)?;
        let fields = validate_all(fields)?;
        let options = self.options_mut();
        options.projection.add_only(reference, fields);
        options.references.insert(reference.to_string());
        Ok(self)
    }

    /// Removes `fields` from the result. Exclusion wins over [`only`](Self::only).
    fn except<I, S>(&mut self, fields: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields = validate_all(fields)?;
        self.options_mut().projection.add_except(BASE_SCOPE, fields);
        Ok(self)
    }

    /// Removes `fields` from the embedded `reference` and includes it.
    fn except_in_reference<I, S>(&mut self, reference: &str, fields: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        validate_field_path(reference)?;
        let fields = validate_all(fields)?;
        let options = self.options_mut();
        options.projection.add_except(reference, fields);
        options.references.insert(reference.to_string());
        Ok(self)
    }

    /// Resolves the reference field at `path` and embeds the referenced record.
    fn include_reference(&mut self, path: &str) -> QueryResult<&mut Self> {
        validate_field_path(path)?;
        self.options_mut().references.insert(path.to_string());
        Ok(self)
    }

    /// Resolves several reference fields. Nothing is added if any path is invalid.
    fn include_references<I, S>(&mut self, paths: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = validate_all(paths)?;
        self.options_mut().references.extend(paths);
        Ok(self)
    }

    /// Requests content in `locale`.
    fn locale(&mut self, locale: impl Into<String>) -> &mut Self {
        self.options_mut().locale = Some(locale.into());
        self
    }

    /// Falls back to the master locale for unlocalized content.
    fn include_fallback(&mut self) -> &mut Self {
        self.options_mut().include_fallback = true;
        self
    }

    /// Includes entry metadata.
    fn include_metadata(&mut self) -> &mut Self {
        self.options_mut().include_metadata = true;
        self
    }

    /// Includes items embedded in rich-text fields.
    fn include_embedded_items(&mut self) -> &mut Self {
        self.options_mut().include_embedded_items = true;
        self
    }

    /// Includes the branch the content was served from.
    fn include_branch(&mut self) -> &mut Self {
        self.options_mut().include_branch = true;
        self
    }

    /// Includes the content type schema alongside the result.
    ///
    /// A raw `include_schema` parameter set earlier through
    /// [`add_param`](Self::add_param) is removed first.
    fn include_content_type(&mut self) -> &mut Self {
        let options = self.options_mut();
        options.raw.remove(RAW_INCLUDE_SCHEMA);
        options.include_content_type = true;
        self
    }

    /// Adds an arbitrary parameter. Canonical keys set through other
    /// methods take precedence at compile time.
    fn add_param(&mut self, key: &str, value: impl Into<Value>) -> QueryResult<&mut Self> {
        validate_param_key(key)?;
        self.options_mut().raw.insert(key, value);
        Ok(self)
    }

    /// Removes a parameter added through [`add_param`](Self::add_param).
    fn remove_param(&mut self, key: &str) -> &mut Self {
        self.options_mut().raw.remove(key);
        self
    }
}

impl ConfigureRequest for RequestOptions {
    fn options_mut(&mut self) -> &mut RequestOptions {
        self
    }
}
