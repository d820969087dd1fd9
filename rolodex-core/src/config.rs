//! Rolodex configuration (§6): the set of flags that control circular
//! reference handling, document validation strictness, and where relative
//! file references are rooted.

use std::path::PathBuf;

use crate::error::{InvalidConfiguration, InvalidConfigurationSnafu};

/// Configuration accepted by [`Rolodex::new`](crate::index::Rolodex::new).
///
/// Construct via [`RolodexConfig::builder`]; the builder validates field
/// combinations that the plain struct can't enforce (e.g. `ignore_array_circular`
/// without `allow_circular_references` is a contradiction).
#[derive(Debug, Clone)]
pub struct RolodexConfig {
    /// If `false`, any detected cycle not covered by the `ignore_*_circular`
    /// flags is also recorded as an [`UnresolvedReference`](crate::error::UnresolvedReference),
    /// hard-erroring that one reference without aborting the rest of the
    /// resolution pass; if `true`, cycles are recorded but traversal
    /// continues and nothing is added to `unresolved` (§4.4).
    pub allow_circular_references: bool,
    /// Cycles that live strictly inside an `items`/array construct are
    /// marked *ignored-circular* rather than surfaced as errors.
    pub ignore_array_circular: bool,
    /// Cycles that live strictly inside `oneOf`/`anyOf`/`allOf` are marked
    /// *ignored-circular* rather than surfaced as errors.
    pub ignore_polymorphic_circular: bool,
    /// Skips the lightweight "is this even an OpenAPI/Swagger document"
    /// sniff performed before indexing.
    pub skip_document_check: bool,
    /// Root directory relative file references resolve against.
    pub base_directory: PathBuf,
}

impl Default for RolodexConfig {
    fn default() -> Self {
        Self {
            allow_circular_references: true,
            ignore_array_circular: false,
            ignore_polymorphic_circular: false,
            skip_document_check: false,
            base_directory: PathBuf::from("."),
        }
    }
}

impl RolodexConfig {
    #[must_use]
    pub fn builder() -> RolodexConfigBuilder {
        RolodexConfigBuilder::default()
    }
}

/// Builder for [`RolodexConfig`].
#[derive(Debug, Clone, Default)]
pub struct RolodexConfigBuilder {
    config: RolodexConfig,
}

impl RolodexConfigBuilder {
    #[must_use]
    pub fn allow_circular_references(mut self, value: bool) -> Self {
        self.config.allow_circular_references = value;
        self
    }

    #[must_use]
    pub fn ignore_array_circular(mut self, value: bool) -> Self {
        self.config.ignore_array_circular = value;
        self
    }

    #[must_use]
    pub fn ignore_polymorphic_circular(mut self, value: bool) -> Self {
        self.config.ignore_polymorphic_circular = value;
        self
    }

    #[must_use]
    pub fn skip_document_check(mut self, value: bool) -> Self {
        self.config.skip_document_check = value;
        self
    }

    #[must_use]
    pub fn base_directory(mut self, value: impl Into<PathBuf>) -> Self {
        self.config.base_directory = value.into();
        self
    }

    /// Validates the assembled configuration.
    ///
    /// # Errors
    /// Returns [`InvalidConfiguration`] if an `ignore_*_circular` flag is set
    /// while `allow_circular_references` is `false` — there would be nothing
    /// left for it to ignore.
    pub fn build(self) -> Result<RolodexConfig, InvalidConfiguration> {
        let config = self.config;
        if !config.allow_circular_references
            && (config.ignore_array_circular || config.ignore_polymorphic_circular)
        {
            return InvalidConfigurationSnafu {
                message: "ignore_array_circular/ignore_polymorphic_circular require allow_circular_references"
                    .to_string(),
            }
            .fail();
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_allows_cycles() {
        let config = RolodexConfig::default();
        assert!(config.allow_circular_references);
    }

    #[test]
    fn rejects_contradictory_ignore_flags() {
        let result = RolodexConfig::builder()
            .allow_circular_references(false)
            .ignore_array_circular(true)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_sets_base_directory() {
        let config = RolodexConfig::builder().base_directory("/specs").build().unwrap();
        assert_eq!(config.base_directory, PathBuf::from("/specs"));
    }
}
