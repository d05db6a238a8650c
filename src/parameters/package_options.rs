//! Per-package option overrides
//!
//! Overrides are an ordered list of `(pattern, partial override)` pairs. The first
//! rule whose pattern matches the whole package name supplies its set fields; any
//! field it leaves unset, and any package no rule matches, uses the source-set
//! default.

use crate::error::ConfigurationError;
use crate::parameters::Visibility;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Partial override for packages matching `matching_regex`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageOptions {
    pub matching_regex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppress: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documented_visibilities: Option<BTreeSet<Visibility>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_deprecated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_undocumented: Option<bool>,
}

impl PackageOptions {
    pub fn matching(pattern: impl Into<String>) -> Self {
        Self {
            matching_regex: pattern.into(),
            suppress: None,
            documented_visibilities: None,
            skip_deprecated: None,
            report_undocumented: None,
        }
    }

    pub fn suppress(mut self, suppress: bool) -> Self {
        self.suppress = Some(suppress);
        self
    }

    pub fn skip_deprecated(mut self, skip: bool) -> Self {
        self.skip_deprecated = Some(skip);
        self
    }

    pub fn report_undocumented(mut self, report: bool) -> Self {
        self.report_undocumented = Some(report);
        self
    }

    pub fn documented_visibilities<I>(mut self, visibilities: I) -> Self
    where
        I: IntoIterator<Item = Visibility>,
    {
        self.documented_visibilities = Some(visibilities.into_iter().collect());
        self
    }
}

/// Options in force for one package after override resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePackageOptions {
    pub suppress: bool,
    pub documented_visibilities: BTreeSet<Visibility>,
    pub skip_deprecated: bool,
    pub report_undocumented: bool,
}

/// Compiled override rules plus the defaults they fall back to.
#[derive(Debug)]
pub struct PackageMatcher<'a> {
    rules: Vec<(Regex, &'a PackageOptions)>,
    defaults: EffectivePackageOptions,
}

impl<'a> PackageMatcher<'a> {
    /// Compile every rule; the first malformed pattern is reported.
    pub fn compile(
        source_set: &str,
        options: &'a [PackageOptions],
        defaults: EffectivePackageOptions,
    ) -> Result<Self, ConfigurationError> {
        let rules = options
            .iter()
            .map(|option| {
                compile_pattern(&option.matching_regex)
                    .map(|regex| (regex, option))
                    .map_err(|e| ConfigurationError::InvalidPackagePattern {
                        source_set: source_set.to_string(),
                        pattern: option.matching_regex.clone(),
                        reason: e,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules, defaults })
    }

    pub fn options_for(&self, package: &str) -> EffectivePackageOptions {
        let Some((_, rule)) = self.rules.iter().find(|(regex, _)| regex.is_match(package)) else {
            return self.defaults.clone();
        };
        EffectivePackageOptions {
            suppress: rule.suppress.unwrap_or(self.defaults.suppress),
            documented_visibilities: rule
                .documented_visibilities
                .clone()
                .unwrap_or_else(|| self.defaults.documented_visibilities.clone()),
            skip_deprecated: rule.skip_deprecated.unwrap_or(self.defaults.skip_deprecated),
            report_undocumented: rule
                .report_undocumented
                .unwrap_or(self.defaults.report_undocumented),
        }
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, String> {
    if pattern.trim().is_empty() {
        return Err("pattern is empty".to_string());
    }
    Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| e.to_string())
}
